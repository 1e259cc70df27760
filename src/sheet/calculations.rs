//! Pure geometry for splitting and laying out sheets.
//!
//! Nothing here touches pixels; every function is testable with plain numbers.

use crate::types::{Angle, AngleSet};

/// An axis-aligned pixel rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn center(&self) -> (u32, u32) {
        (self.x + self.width / 2, self.y + self.height / 2)
    }

    /// Shrink by `left`/`right`/`top`/`bottom` pixels, never below 1x1.
    pub fn inset(&self, left: u32, top: u32, right: u32, bottom: u32) -> Rect {
        let width = self.width.saturating_sub(left + right).max(1);
        let height = self.height.saturating_sub(top + bottom).max(1);
        Rect::new(self.x + left, self.y + top, width, height)
    }
}

/// Quadrant rectangles of a `width` x `height` sheet.
///
/// Each quadrant is `width / 2` x `height / 2` (integer division); the
/// origins are `(0,0)`, `(w/2,0)`, `(0,h/2)` and `(w/2,h/2)`. With odd
/// dimensions the last row or column is dropped.
///
/// ```
/// # use hairsheet::sheet::quadrant_rects;
/// let quads = quadrant_rects(201, 100);
/// assert_eq!((quads.back.x, quads.back.y), (100, 50));
/// assert_eq!((quads.back.width, quads.back.height), (100, 50));
/// ```
pub fn quadrant_rects(width: u32, height: u32) -> AngleSet<Rect> {
    let (half_w, half_h) = (width / 2, height / 2);
    AngleSet::from_fn(|angle| {
        let (col, row) = angle.grid_position();
        Rect::new(col * half_w, row * half_h, half_w, half_h)
    })
}

/// Largest rectangle with the source's aspect ratio that fits inside
/// `bounds`, centred in it (letterboxing).
///
/// ```
/// # use hairsheet::sheet::{fit_within, Rect};
/// // A 2:1 image in a square box is centred vertically.
/// let fit = fit_within((200, 100), Rect::new(0, 0, 100, 100));
/// assert_eq!(fit, Rect::new(0, 25, 100, 50));
/// ```
pub fn fit_within(source: (u32, u32), bounds: Rect) -> Rect {
    let (src_w, src_h) = (source.0.max(1) as f64, source.1.max(1) as f64);
    let scale = (bounds.width as f64 / src_w).min(bounds.height as f64 / src_h);

    let width = ((src_w * scale).round() as u32).clamp(1, bounds.width.max(1));
    let height = ((src_h * scale).round() as u32).clamp(1, bounds.height.max(1));

    Rect::new(
        bounds.x + (bounds.width.saturating_sub(width)) / 2,
        bounds.y + (bounds.height.saturating_sub(height)) / 2,
        width,
        height,
    )
}

/// Placement of one polaroid on the sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellLayout {
    /// The white frame, including its caption strip.
    pub frame: Rect,
    /// The area the photo is letterboxed into.
    pub photo: Rect,
    /// Centre point of the caption baseline.
    pub caption: (u32, u32),
}

/// Where everything goes on a composed sheet.
#[derive(Debug, Clone, PartialEq)]
pub struct SheetLayout {
    pub width: u32,
    pub height: u32,
    pub title: (u32, u32),
    pub subtitle: (u32, u32),
    pub footer: (u32, u32),
    pub title_size: u32,
    pub subtitle_size: u32,
    pub caption_size: u32,
    pub footer_size: u32,
    /// Offset of the drop shadow behind each frame.
    pub shadow_offset: u32,
    pub cells: AngleSet<CellLayout>,
}

/// Lay out a portrait sheet: a header band, a 2x2 grid of framed cells in
/// [`Angle::grid_position`] order, and a footer line.
///
/// All proportions scale with the canvas so any size works.
pub fn sheet_layout(width: u32, height: u32) -> SheetLayout {
    let width = width.max(16);
    let height = height.max(16);
    let scale = |total: u32, fraction: f64| ((total as f64) * fraction).round() as u32;

    let margin = scale(width, 0.06);
    let header = scale(height, 0.13);
    let footer_band = scale(height, 0.05);
    let gap = scale(width, 0.04);

    let grid_top = margin + header;
    let grid_bottom = height.saturating_sub(margin + footer_band);
    let grid_w = width.saturating_sub(2 * margin);
    let grid_h = grid_bottom.saturating_sub(grid_top);
    let cell_w = (grid_w.saturating_sub(gap) / 2).max(1);
    let cell_h = (grid_h.saturating_sub(gap) / 2).max(1);

    let padding = scale(cell_w, 0.05);
    let caption_band = scale(cell_h, 0.14);

    let cells = AngleSet::from_fn(|angle: Angle| {
        let (col, row) = angle.grid_position();
        let frame = Rect::new(
            margin + col * (cell_w + gap),
            grid_top + row * (cell_h + gap),
            cell_w,
            cell_h,
        );
        let photo = frame.inset(padding, padding, padding, caption_band);
        let caption_y = photo.y + photo.height + caption_band * 3 / 5;
        CellLayout {
            frame,
            photo,
            caption: (frame.x + frame.width / 2, caption_y),
        }
    });

    SheetLayout {
        width,
        height,
        title: (width / 2, margin + scale(header, 0.45)),
        subtitle: (width / 2, margin + scale(header, 0.8)),
        footer: (width / 2, height.saturating_sub(margin / 2 + footer_band / 2)),
        title_size: scale(header, 0.34).max(8),
        subtitle_size: scale(header, 0.15).max(6),
        caption_size: scale(caption_band, 0.45).max(6),
        footer_size: scale(footer_band, 0.35).max(6),
        shadow_offset: scale(width, 0.006).max(1),
        cells,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quadrants_of_even_sheet_tile_exactly() {
        let quads = quadrant_rects(200, 120);
        assert_eq!(quads.front, Rect::new(0, 0, 100, 60));
        assert_eq!(quads.left, Rect::new(100, 0, 100, 60));
        assert_eq!(quads.right, Rect::new(0, 60, 100, 60));
        assert_eq!(quads.back, Rect::new(100, 60, 100, 60));
    }

    #[test]
    fn quadrants_of_odd_sheet_use_floor_halves() {
        let quads = quadrant_rects(201, 121);
        for rect in quads.iter().map(|(_, r)| r) {
            assert_eq!((rect.width, rect.height), (100, 60));
        }
        assert_eq!((quads.back.x, quads.back.y), (100, 60));
    }

    #[test]
    fn fit_portrait_in_landscape_box_is_pillarboxed() {
        let fit = fit_within((100, 200), Rect::new(10, 10, 200, 100));
        assert_eq!(fit, Rect::new(85, 10, 50, 100));
    }

    #[test]
    fn fit_same_aspect_fills_box() {
        let bounds = Rect::new(5, 7, 300, 150);
        assert_eq!(fit_within((600, 300), bounds), bounds);
    }

    #[test]
    fn fit_upscales_small_sources() {
        let fit = fit_within((10, 10), Rect::new(0, 0, 80, 40));
        assert_eq!(fit, Rect::new(20, 0, 40, 40));
    }

    #[test]
    fn fit_never_returns_empty_rect() {
        let fit = fit_within((10_000, 1), Rect::new(0, 0, 10, 10));
        assert!(fit.width >= 1 && fit.height >= 1);
    }

    #[test]
    fn inset_clamps_to_one_pixel() {
        let rect = Rect::new(0, 0, 10, 10).inset(8, 8, 8, 8);
        assert_eq!((rect.width, rect.height), (1, 1));
    }

    #[test]
    fn layout_cells_follow_grid_order() {
        let layout = sheet_layout(1240, 1754);
        let cells = &layout.cells;
        assert!(cells.front.frame.x < cells.left.frame.x);
        assert_eq!(cells.front.frame.y, cells.left.frame.y);
        assert_eq!(cells.front.frame.x, cells.right.frame.x);
        assert!(cells.front.frame.y < cells.right.frame.y);
        assert_eq!(cells.back.frame.x, cells.left.frame.x);
        assert_eq!(cells.back.frame.y, cells.right.frame.y);
    }

    #[test]
    fn layout_stays_inside_canvas_and_cells_do_not_overlap() {
        let layout = sheet_layout(1240, 1754);
        for (_, cell) in layout.cells.iter() {
            let f = cell.frame;
            assert!(f.x + f.width <= layout.width);
            assert!(f.y + f.height <= layout.height);
            let p = cell.photo;
            assert!(p.x >= f.x && p.x + p.width <= f.x + f.width);
            assert!(p.y >= f.y && p.y + p.height <= f.y + f.height);
            assert!(cell.caption.1 > p.y + p.height);
            assert!(cell.caption.1 < f.y + f.height);
        }
        let (front, left) = (layout.cells.front.frame, layout.cells.left.frame);
        assert!(front.x + front.width < left.x);
    }

    #[test]
    fn header_sits_above_grid_and_footer_below() {
        let layout = sheet_layout(1240, 1754);
        assert!(layout.subtitle.1 < layout.cells.front.frame.y);
        assert!(layout.title.1 < layout.subtitle.1);
        let bottom = layout.cells.back.frame;
        assert!(layout.footer.1 > bottom.y + bottom.height);
        assert!(layout.footer.1 < layout.height);
    }
}
