//! Shared test utilities for the hairsheet test suite.
//!
//! Synthetic image fixtures and pixel assertions. Fake capabilities live next
//! to their traits (`capability::tests`, `pause::tests`).
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let sheet = solid_quadrant_sheet(200, 120);
//! let parts = SheetCodec::default().decompose(&sheet).unwrap();
//! assert_pixel_near(&parts.front, (50, 30), COLOURS.front, 12);
//! ```

use crate::types::{Angle, AngleSet, ImagePayload};
use image::{ImageFormat, Rgb, RgbImage};
use std::io::Cursor;

// =========================================================================
// Fixtures
// =========================================================================

/// Distinct marker colour per angle.
pub const COLOURS: AngleSet<[u8; 3]> = AngleSet {
    front: [220, 40, 40],
    left: [40, 180, 60],
    right: [40, 70, 210],
    back: [230, 200, 40],
};

pub fn png_payload(img: &RgbImage) -> ImagePayload {
    let mut bytes = Vec::new();
    img.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .unwrap();
    ImagePayload::new(bytes, "image/png")
}

pub fn solid_png(width: u32, height: u32, colour: [u8; 3]) -> ImagePayload {
    png_payload(&RgbImage::from_pixel(width, height, Rgb(colour)))
}

/// A sheet whose quadrants are filled with [`COLOURS`] in grid order.
pub fn solid_quadrant_sheet(width: u32, height: u32) -> ImagePayload {
    let (half_w, half_h) = ((width / 2).max(1), (height / 2).max(1));
    let img = RgbImage::from_fn(width, height, |x, y| {
        let cell = ((x / half_w).min(1), (y / half_h).min(1));
        let angle = Angle::ALL
            .into_iter()
            .find(|a| a.grid_position() == cell)
            .unwrap();
        Rgb(COLOURS[angle])
    });
    png_payload(&img)
}

// =========================================================================
// Assertions
// =========================================================================

pub fn assert_close(actual: [u8; 3], expected: [u8; 3], tolerance: u8) {
    for (a, e) in actual.iter().zip(expected) {
        assert!(
            a.abs_diff(e) <= tolerance,
            "pixel {actual:?} not within {tolerance} of {expected:?}"
        );
    }
}

/// Decode `payload` and check one pixel.
pub fn assert_pixel_near(payload: &ImagePayload, at: (u32, u32), expected: [u8; 3], tolerance: u8) {
    let img = image::load_from_memory(&payload.bytes)
        .expect("payload decodes")
        .to_rgb8();
    assert_close(img.get_pixel(at.0, at.1).0, expected, tolerance);
}
