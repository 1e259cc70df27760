//! Lay four angle images out as a printable portrait sheet.

use super::calculations::{fit_within, sheet_layout, Rect, SheetLayout};
use super::decompose::encode_jpeg;
use super::params::{Quality, Rgb, SheetStyle};
use super::text::{blend_onto, render_text_layer, TextLine, Weight};
use super::SheetError;
use crate::types::{Angle, AngleSet, ImagePayload};
use image::imageops::{self, FilterType};
use image::{DynamicImage, GenericImageView, RgbaImage};
use rayon::prelude::*;
use tracing::debug;

/// Compose a sheet from four images and their captions.
pub fn compose(
    images: &AngleSet<ImagePayload>,
    captions: &AngleSet<String>,
    style: &SheetStyle,
    quality: Quality,
) -> Result<ImagePayload, SheetError> {
    let layout = sheet_layout(style.width, style.height);

    // Decode and scale every photo up front; the canvas is only touched once
    // all four are known to be usable.
    let photos: Vec<(Rect, RgbaImage)> = Angle::ALL
        .par_iter()
        .map(|&angle| prepare_photo(angle, &images[angle], layout.cells[angle].photo))
        .collect::<Result<_, _>>()?;

    let mut canvas = RgbaImage::from_pixel(layout.width, layout.height, style.background.to_rgba());
    let shadow = style.background.shade(0.86);
    let mat = style.frame.shade(0.94);

    for (angle, (fit, photo)) in Angle::ALL.iter().zip(&photos) {
        let cell = layout.cells[*angle];
        let offset = layout.shadow_offset;
        let shadow_rect = Rect::new(
            cell.frame.x + offset,
            cell.frame.y + offset,
            cell.frame.width,
            cell.frame.height,
        );
        fill_rect(&mut canvas, shadow_rect, shadow);
        fill_rect(&mut canvas, cell.frame, style.frame);
        fill_rect(&mut canvas, cell.photo, mat);
        imageops::replace(&mut canvas, photo, fit.x as i64, fit.y as i64);
    }

    let lines = text_lines(&layout, captions, style);
    if let Some(layer) = render_text_layer(layout.width, layout.height, &lines)? {
        blend_onto(&mut canvas, &layer);
    }

    debug!(width = layout.width, height = layout.height, "composed sheet");
    encode_jpeg(&DynamicImage::ImageRgba8(canvas), quality)
}

fn prepare_photo(
    angle: Angle,
    payload: &ImagePayload,
    bounds: Rect,
) -> Result<(Rect, RgbaImage), SheetError> {
    let img = image::load_from_memory(&payload.bytes)
        .map_err(|e| SheetError::Decode(format!("{angle} image: {e}")))?;
    let fit = fit_within(img.dimensions(), bounds);
    let scaled = img
        .resize_exact(fit.width, fit.height, FilterType::Lanczos3)
        .to_rgba8();
    Ok((fit, scaled))
}

fn fill_rect(canvas: &mut RgbaImage, rect: Rect, colour: Rgb) {
    let pixel = colour.to_rgba();
    let x_end = (rect.x + rect.width).min(canvas.width());
    let y_end = (rect.y + rect.height).min(canvas.height());
    for y in rect.y..y_end {
        for x in rect.x..x_end {
            canvas.put_pixel(x, y, pixel);
        }
    }
}

fn text_lines(layout: &SheetLayout, captions: &AngleSet<String>, style: &SheetStyle) -> Vec<TextLine> {
    let mut lines = vec![
        TextLine {
            text: style.title.clone(),
            anchor: layout.title,
            size: layout.title_size,
            weight: Weight::Bold,
            colour: style.ink,
        },
        TextLine {
            text: style.subtitle.clone(),
            anchor: layout.subtitle,
            size: layout.subtitle_size,
            weight: Weight::Regular,
            colour: style.muted,
        },
        TextLine {
            text: style.footer.clone(),
            anchor: layout.footer,
            size: layout.footer_size,
            weight: Weight::Regular,
            colour: style.muted,
        },
    ];
    lines.extend(captions.iter().map(|(angle, caption)| TextLine {
        text: caption.clone(),
        anchor: layout.cells[angle].caption,
        size: layout.caption_size,
        weight: Weight::Bold,
        colour: style.muted,
    }));
    lines
}
