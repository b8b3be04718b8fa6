use crate::model::{BoundingBox, ProductLocation};
use serde::Serialize;

/// Highlight rectangle positioned in percent of the page size.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct OverlayRect {
    pub left_pct: f64,
    pub top_pct: f64,
    pub width_pct: f64,
    pub height_pct: f64,
}

impl OverlayRect {
    pub fn from_bbox(bbox: &BoundingBox) -> Self {
        let pct = |v: f64| (v * 100.0).clamp(0.0, 100.0);
        OverlayRect {
            left_pct: pct(bbox.x),
            top_pct: pct(bbox.y),
            width_pct: pct(bbox.width),
            height_pct: pct(bbox.height),
        }
    }

    /// Top edge and height in pixels for a page rendered at the given height.
    pub fn vertical_pixels(&self, page_height_px: f64) -> (f64, f64) {
        (
            self.top_pct / 100.0 * page_height_px,
            self.height_pct / 100.0 * page_height_px,
        )
    }
}

/// Overlay for `page`, present only when the location points at it.
pub fn overlay_for_page(location: Option<&ProductLocation>, page: u32) -> Option<OverlayRect> {
    location
        .filter(|loc| loc.page == page)
        .map(|loc| OverlayRect::from_bbox(&loc.bbox))
}

/// Scroll offset that puts the middle of a box at the middle of the viewport.
pub fn centering_offset(box_top_px: f64, box_height_px: f64, viewport_height_px: f64) -> f64 {
    (box_top_px + box_height_px / 2.0 - viewport_height_px / 2.0).max(0.0)
}
