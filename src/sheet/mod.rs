//! The 2x2 sheet format: splitting generated sheets and composing printable ones.
//!
//! | Operation | How |
//! |---|---|
//! | **Decompose** | quadrant crop at `(w/2, h/2)`, JPEG re-encode in parallel |
//! | **Compose** | portrait canvas, polaroid frames, letterboxed photos, SVG text overlay |
//!
//! The module is split into:
//! - **Calculations**: quadrant and layout geometry (unit testable)
//! - **Parameters**: [`Quality`], [`Rgb`], [`SheetStyle`]
//! - **Decompose / Compose**: the two pixel operations
//! - **Text**: heading and caption rasterization via resvg
//!
//! Grid order is fixed: front top-left, left top-right, right bottom-left,
//! back bottom-right (see [`Angle::grid_position`](crate::types::Angle::grid_position)).

mod calculations;
mod compose;
mod decompose;
mod params;
mod text;

pub use calculations::{fit_within, quadrant_rects, sheet_layout, CellLayout, Rect, SheetLayout};
pub use params::{Quality, Rgb, SheetStyle};

use crate::types::{AngleSet, ImagePayload};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SheetError {
    #[error("Failed to decode image: {0}")]
    Decode(String),
    #[error("Sheet is {width}x{height}; at least 2x2 is needed to split it")]
    TooSmall { width: u32, height: u32 },
    #[error("Failed to encode image: {0}")]
    Encode(String),
    #[error("Failed to render sheet: {0}")]
    Render(String),
    #[error("Invalid sheet style: {0}")]
    Style(String),
}

/// Splits and composes sheets with a fixed quality and look.
#[derive(Debug, Clone, Default)]
pub struct SheetCodec {
    pub quality: Quality,
    pub style: SheetStyle,
}

impl SheetCodec {
    pub fn new(quality: Quality, style: SheetStyle) -> Self {
        Self { quality, style }
    }

    /// Split a generated sheet into its four angle images.
    pub fn decompose(&self, sheet: &ImagePayload) -> Result<AngleSet<ImagePayload>, SheetError> {
        decompose::decompose(sheet, self.quality)
    }

    /// Lay four angle images out on a printable sheet with the given captions.
    pub fn compose(
        &self,
        images: &AngleSet<ImagePayload>,
        captions: &AngleSet<String>,
    ) -> Result<ImagePayload, SheetError> {
        compose::compose(images, captions, &self.style, self.quality)
    }

    /// Compose with each angle's standard label as its caption.
    pub fn compose_labelled(&self, images: &AngleSet<ImagePayload>) -> Result<ImagePayload, SheetError> {
        self.compose(images, &AngleSet::from_fn(|angle| angle.label().to_string()))
    }
}
