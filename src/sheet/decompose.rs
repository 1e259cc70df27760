//! Split a 2x2 sheet into its four angle images.

use super::calculations::quadrant_rects;
use super::params::Quality;
use super::SheetError;
use crate::types::{Angle, AngleSet, ImagePayload};
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, GenericImageView};
use rayon::prelude::*;
use tracing::debug;

/// Crop the four quadrants of `sheet` and re-encode each as JPEG.
///
/// All-or-nothing: any decode or encode failure fails the whole call.
pub fn decompose(sheet: &ImagePayload, quality: Quality) -> Result<AngleSet<ImagePayload>, SheetError> {
    let img = image::load_from_memory(&sheet.bytes)
        .map_err(|e| SheetError::Decode(format!("sheet: {e}")))?;
    let (width, height) = img.dimensions();
    if width < 2 || height < 2 {
        return Err(SheetError::TooSmall { width, height });
    }

    let rects = quadrant_rects(width, height);
    debug!(width, height, quad_w = rects.front.width, quad_h = rects.front.height, "splitting sheet");

    let encoded: Vec<ImagePayload> = Angle::ALL
        .par_iter()
        .map(|&angle| {
            let r = rects[angle];
            encode_jpeg(&img.crop_imm(r.x, r.y, r.width, r.height), quality)
        })
        .collect::<Result<_, _>>()?;

    let [front, left, right, back]: [ImagePayload; 4] = encoded
        .try_into()
        .map_err(|_| SheetError::Encode("expected four quadrants".into()))?;
    Ok(AngleSet {
        front,
        left,
        right,
        back,
    })
}

/// Encode as baseline JPEG. Alpha is dropped.
pub(crate) fn encode_jpeg(img: &DynamicImage, quality: Quality) -> Result<ImagePayload, SheetError> {
    let rgb = DynamicImage::ImageRgb8(img.to_rgb8());
    let mut bytes = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut bytes, quality.value());
    rgb.write_with_encoder(encoder)
        .map_err(|e| SheetError::Encode(e.to_string()))?;
    Ok(ImagePayload::jpeg(bytes))
}
