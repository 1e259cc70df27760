//! Text rendering for composed sheets.
//!
//! Headings and captions are written into a transparent SVG the size of the
//! canvas, rasterized with resvg against the system font database, and then
//! alpha-blended over the sheet.

use super::SheetError;
use super::params::Rgb;
use image::RgbaImage;
use std::fmt::Write as _;
use std::sync::{Arc, LazyLock};
use tracing::debug;

static FONTS: LazyLock<Arc<usvg::fontdb::Database>> = LazyLock::new(|| {
    let mut db = usvg::fontdb::Database::new();
    db.load_system_fonts();
    debug!(faces = db.len(), "loaded system fonts");
    Arc::new(db)
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Weight {
    Regular,
    Bold,
}

/// One horizontally centred line of text.
#[derive(Debug, Clone, PartialEq)]
pub struct TextLine {
    pub text: String,
    /// Centre of the baseline.
    pub anchor: (u32, u32),
    pub size: u32,
    pub weight: Weight,
    pub colour: Rgb,
}

/// Rasterize `lines` into a transparent `width` x `height` layer.
///
/// Returns `None` when there is nothing to draw.
pub fn render_text_layer(
    width: u32,
    height: u32,
    lines: &[TextLine],
) -> Result<Option<RgbaImage>, SheetError> {
    let lines: Vec<&TextLine> = lines.iter().filter(|l| !l.text.trim().is_empty()).collect();
    if lines.is_empty() {
        return Ok(None);
    }

    let svg = build_svg(width, height, &lines);
    let options = usvg::Options {
        fontdb: Arc::clone(&FONTS),
        ..Default::default()
    };
    let tree = usvg::Tree::from_str(&svg, &options)
        .map_err(|e| SheetError::Render(format!("text layer: {e}")))?;

    let mut pixmap = resvg::tiny_skia::Pixmap::new(width, height)
        .ok_or_else(|| SheetError::Render(format!("cannot allocate {width}x{height} text layer")))?;
    resvg::render(&tree, resvg::tiny_skia::Transform::identity(), &mut pixmap.as_mut());

    let data: Vec<u8> = pixmap
        .pixels()
        .iter()
        .flat_map(|px| {
            let c = px.demultiply();
            [c.red(), c.green(), c.blue(), c.alpha()]
        })
        .collect();
    RgbaImage::from_raw(width, height, data)
        .map(Some)
        .ok_or_else(|| SheetError::Render("text layer size mismatch".into()))
}

fn build_svg(width: u32, height: u32, lines: &[&TextLine]) -> String {
    let mut svg = format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{width}" height="{height}" viewBox="0 0 {width} {height}">"#
    );
    for line in lines {
        let weight = match line.weight {
            Weight::Regular => "normal",
            Weight::Bold => "bold",
        };
        let _ = write!(
            svg,
            r#"<text x="{}" y="{}" font-family="sans-serif" font-size="{}" font-weight="{weight}" text-anchor="middle" fill="{}">{}</text>"#,
            line.anchor.0,
            line.anchor.1,
            line.size,
            line.colour,
            escape_xml(&line.text),
        );
    }
    svg.push_str("</svg>");
    svg
}

fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c if c.is_control() => {}
            c => out.push(c),
        }
    }
    out
}

/// Blend `layer` over `canvas` at the origin.
pub fn blend_onto(canvas: &mut RgbaImage, layer: &RgbaImage) {
    image::imageops::overlay(canvas, layer, 0, 0);
}
