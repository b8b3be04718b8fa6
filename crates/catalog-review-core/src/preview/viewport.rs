//! Page layout, zoom, paging and key handling for the preview dialog.

pub const MIN_ZOOM: f64 = 0.75;
pub const MAX_ZOOM: f64 = 2.5;
pub const ZOOM_STEP: f64 = 0.25;

pub const MIN_PAGE_WIDTH: f64 = 320.0;
pub const MAX_PAGE_WIDTH: f64 = 1100.0;
/// Horizontal space taken by the dialog chrome around the page.
pub const PAGE_PADDING: f64 = 48.0;

/// Zoom factor, always on the 0.25 grid inside `[MIN_ZOOM, MAX_ZOOM]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Zoom(f64);

impl Default for Zoom {
    fn default() -> Self {
        Zoom(1.0)
    }
}

impl Zoom {
    pub fn new(factor: f64) -> Self {
        if !factor.is_finite() {
            return Zoom::default();
        }
        let snapped = (factor / ZOOM_STEP).round() * ZOOM_STEP;
        Zoom(snapped.clamp(MIN_ZOOM, MAX_ZOOM))
    }

    pub fn factor(&self) -> f64 {
        self.0
    }

    pub fn zoom_in(&mut self) {
        *self = Zoom::new(self.0 + ZOOM_STEP);
    }

    pub fn zoom_out(&mut self) {
        *self = Zoom::new(self.0 - ZOOM_STEP);
    }

    pub fn reset(&mut self) {
        *self = Zoom::default();
    }

    pub fn can_zoom_in(&self) -> bool {
        self.0 < MAX_ZOOM
    }

    pub fn can_zoom_out(&self) -> bool {
        self.0 > MIN_ZOOM
    }

    pub fn percent(&self) -> u32 {
        (self.0 * 100.0).round() as u32
    }
}

/// Base page width in pixels for a container of the given width.
pub fn page_width_for(container_width: f64) -> f64 {
    let available = if container_width.is_finite() {
        container_width - PAGE_PADDING
    } else {
        MAX_PAGE_WIDTH
    };
    available.clamp(MIN_PAGE_WIDTH, MAX_PAGE_WIDTH)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ViewMode {
    #[default]
    Single,
    Continuous,
}

/// Current page, kept inside `[1, total]` once the page count is known.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageNavigator {
    current: u32,
    total: Option<u32>,
}

impl PageNavigator {
    /// Navigator waiting for the document, holding the requested page.
    pub fn pending(requested: u32) -> Self {
        PageNavigator {
            current: requested.max(1),
            total: None,
        }
    }

    /// Called once the page count is known; clamps the requested page.
    pub fn set_total(&mut self, total: u32) {
        let total = total.max(1);
        self.total = Some(total);
        self.current = self.current.clamp(1, total);
    }

    pub fn current(&self) -> u32 {
        self.current
    }

    pub fn total(&self) -> Option<u32> {
        self.total
    }

    pub fn go_to(&mut self, page: u32) {
        let upper = self.total.unwrap_or(u32::MAX);
        self.current = page.clamp(1, upper);
    }

    pub fn next(&mut self) {
        self.go_to(self.current.saturating_add(1));
    }

    pub fn prev(&mut self) {
        self.go_to(self.current.saturating_sub(1));
    }

    pub fn has_next(&self) -> bool {
        self.total.is_some_and(|t| self.current < t)
    }

    pub fn has_prev(&self) -> bool {
        self.current > 1
    }

    /// Pages to render for the given mode.
    pub fn visible_pages(&self, mode: ViewMode) -> Vec<u32> {
        match (mode, self.total) {
            (ViewMode::Continuous, Some(total)) => (1..=total).collect(),
            _ => vec![self.current],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreviewKey {
    ArrowLeft,
    ArrowRight,
    ArrowUp,
    ArrowDown,
    PageUp,
    PageDown,
    Escape,
    Other,
}

impl PreviewKey {
    /// Parse a DOM-style key name (`"ArrowLeft"`, `"Escape"`, ...).
    pub fn from_name(name: &str) -> PreviewKey {
        match name {
            "ArrowLeft" | "Left" => PreviewKey::ArrowLeft,
            "ArrowRight" | "Right" => PreviewKey::ArrowRight,
            "ArrowUp" | "Up" => PreviewKey::ArrowUp,
            "ArrowDown" | "Down" => PreviewKey::ArrowDown,
            "PageUp" => PreviewKey::PageUp,
            "PageDown" => PreviewKey::PageDown,
            "Escape" | "Esc" => PreviewKey::Escape,
            _ => PreviewKey::Other,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    PrevPage,
    NextPage,
    Close,
    Ignore,
}

pub fn key_action(key: PreviewKey, mode: ViewMode) -> KeyAction {
    match (key, mode) {
        (PreviewKey::Escape, _) => KeyAction::Close,
        (PreviewKey::ArrowLeft | PreviewKey::ArrowUp | PreviewKey::PageUp, ViewMode::Single) => {
            KeyAction::PrevPage
        }
        (
            PreviewKey::ArrowRight | PreviewKey::ArrowDown | PreviewKey::PageDown,
            ViewMode::Single,
        ) => KeyAction::NextPage,
        _ => KeyAction::Ignore,
    }
}
