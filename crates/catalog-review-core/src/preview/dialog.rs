use crate::model::{BoundingBox, ProductLocation};
use crate::preview::load_error::{classify_load_error, LoadErrorKind};
use crate::preview::overlay::{centering_offset, overlay_for_page, OverlayRect};
use crate::preview::scroll::{Debounce, ScrollOnce, HIGHLIGHT_SCROLL_DELAY};
use crate::preview::source::PreviewSource;
use crate::preview::text_layer::{TextLayer, TextLayerSource};
use crate::preview::viewport::{
    key_action, page_width_for, KeyAction, PageNavigator, PreviewKey, ViewMode, Zoom,
};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

/// Page body whose scrolling is suspended while the dialog is open.
pub trait ScrollLockHost: Send + Sync {
    fn lock_scroll(&self);
    fn unlock_scroll(&self);
}

/// Held for as long as the dialog is open; unlocks on drop.
pub struct ScrollLock {
    host: Arc<dyn ScrollLockHost>,
}

impl ScrollLock {
    pub fn acquire(host: Arc<dyn ScrollLockHost>) -> Self {
        host.lock_scroll();
        ScrollLock { host }
    }
}

impl Drop for ScrollLock {
    fn drop(&mut self) {
        self.host.unlock_scroll();
    }
}

/// What the dialog should point the reader at.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum PreviewTarget {
    #[default]
    None,
    /// Highlight every text span containing the term.
    Highlight(String),
    /// Draw a box over an extracted product.
    Location(ProductLocation),
}

#[derive(Debug, Clone, PartialEq)]
pub enum LoadStatus {
    Loading,
    Ready { page_count: u32 },
    Failed { kind: LoadErrorKind, raw: String },
}

#[derive(Debug, Clone, Default)]
pub struct PreviewOptions {
    pub initial_page: u32,
    pub target: PreviewTarget,
    /// Product the dialog was opened for; part of the auto-scroll key.
    pub product_id: Option<String>,
    pub container_width: f64,
    pub mode: ViewMode,
}

/// Where the front end should scroll to.
#[derive(Debug, Clone, PartialEq)]
pub enum ScrollRequest {
    TextMatch {
        page: u32,
        line_index: usize,
        bbox: Option<BoundingBox>,
    },
    CenterOverlay {
        page: u32,
        rect: OverlayRect,
    },
}

type HighlightKey = (String, u32, Option<String>);
type OverlayKey = (Option<String>, u32, [u64; 4]);

/// State of the document preview dialog.
pub struct PreviewDialog {
    source: PreviewSource,
    status: LoadStatus,
    navigator: PageNavigator,
    mode: ViewMode,
    zoom: Zoom,
    container_width: f64,
    target: PreviewTarget,
    product_id: Option<String>,
    text_layers: BTreeMap<u32, TextLayer>,
    highlight_scroll: ScrollOnce<HighlightKey>,
    overlay_scroll: ScrollOnce<OverlayKey>,
    debounce: Debounce,
    scroll_lock: Option<ScrollLock>,
}

impl PreviewDialog {
    pub fn open(
        source: PreviewSource,
        options: PreviewOptions,
        host: Arc<dyn ScrollLockHost>,
    ) -> Self {
        PreviewDialog {
            source,
            status: LoadStatus::Loading,
            navigator: PageNavigator::pending(options.initial_page),
            mode: options.mode,
            zoom: Zoom::default(),
            container_width: options.container_width,
            target: options.target,
            product_id: options.product_id,
            text_layers: BTreeMap::new(),
            highlight_scroll: ScrollOnce::default(),
            overlay_scroll: ScrollOnce::default(),
            debounce: Debounce::new(HIGHLIGHT_SCROLL_DELAY),
            scroll_lock: Some(ScrollLock::acquire(host)),
        }
    }

    pub fn close(&mut self) {
        self.debounce.cancel();
        self.scroll_lock = None;
    }

    pub fn is_open(&self) -> bool {
        self.scroll_lock.is_some()
    }

    pub fn title(&self) -> &str {
        self.source.display_name()
    }

    pub fn source(&self) -> &PreviewSource {
        &self.source
    }

    pub fn status(&self) -> &LoadStatus {
        &self.status
    }

    pub fn error_message(&self) -> Option<&'static str> {
        match &self.status {
            LoadStatus::Failed { kind, .. } => Some(kind.message()),
            _ => None,
        }
    }

    pub fn document_loaded(&mut self, page_count: u32) {
        self.navigator.set_total(page_count);
        self.status = LoadStatus::Ready {
            page_count: self.navigator.total().unwrap_or(1),
        };
        debug!(page_count, page = self.navigator.current(), "preview document loaded");
    }

    pub fn document_failed(&mut self, raw: &str) {
        let kind = classify_load_error(raw);
        warn!(?kind, raw, "preview document failed to load");
        self.status = LoadStatus::Failed {
            kind,
            raw: raw.to_string(),
        };
    }

    /// Load the text layers from PDF bytes and mark the document ready.
    pub fn load_text_layers(&mut self, extractor: &dyn TextLayerSource, pdf_bytes: &[u8]) {
        match extractor.text_layers(pdf_bytes) {
            Ok(layers) => {
                let count = layers.len() as u32;
                self.text_layers = layers.into_iter().map(|l| (l.page_number, l)).collect();
                self.document_loaded(count);
            }
            Err(e) => self.document_failed(&e.raw_message()),
        }
    }

    pub fn text_layer(&self, page: u32) -> Option<&TextLayer> {
        self.text_layers.get(&page)
    }

    pub fn current_page(&self) -> u32 {
        self.navigator.current()
    }

    pub fn page_count(&self) -> Option<u32> {
        self.navigator.total()
    }

    pub fn visible_pages(&self) -> Vec<u32> {
        self.navigator.visible_pages(self.mode)
    }

    pub fn mode(&self) -> ViewMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: ViewMode) {
        self.mode = mode;
    }

    pub fn next_page(&mut self) {
        self.navigator.next();
    }

    pub fn prev_page(&mut self) {
        self.navigator.prev();
    }

    pub fn go_to_page(&mut self, page: u32) {
        self.navigator.go_to(page);
    }

    pub fn has_next(&self) -> bool {
        self.navigator.has_next()
    }

    pub fn has_prev(&self) -> bool {
        self.navigator.has_prev()
    }

    pub fn zoom(&self) -> Zoom {
        self.zoom
    }

    pub fn zoom_in(&mut self) {
        self.zoom.zoom_in();
    }

    pub fn zoom_out(&mut self) {
        self.zoom.zoom_out();
    }

    pub fn reset_zoom(&mut self) {
        self.zoom.reset();
    }

    /// Jump to a zoom factor, snapped and clamped like the buttons.
    pub fn set_zoom(&mut self, factor: f64) {
        self.zoom = Zoom::new(factor);
    }

    pub fn resize(&mut self, container_width: f64) {
        self.container_width = container_width;
    }

    /// Unzoomed page width for the current container.
    pub fn page_width(&self) -> f64 {
        page_width_for(self.container_width)
    }

    pub fn rendered_width(&self) -> f64 {
        self.page_width() * self.zoom.factor()
    }

    pub fn handle_key(&mut self, key: PreviewKey) -> KeyAction {
        let action = key_action(key, self.mode);
        match action {
            KeyAction::PrevPage => self.prev_page(),
            KeyAction::NextPage => self.next_page(),
            KeyAction::Close => self.close(),
            KeyAction::Ignore => {}
        }
        action
    }

    pub fn target(&self) -> &PreviewTarget {
        &self.target
    }

    pub fn set_target(&mut self, target: PreviewTarget, product_id: Option<String>) {
        self.target = target;
        self.product_id = product_id;
        for layer in self.text_layers.values_mut() {
            layer.clear_highlight();
        }
    }

    /// Bounding-box overlay to draw on `page`.
    pub fn overlay(&self, page: u32) -> Option<OverlayRect> {
        match &self.target {
            PreviewTarget::Location(loc) => overlay_for_page(Some(loc), page),
            _ => None,
        }
    }

    /// Scroll offset within `page` that centers its overlay in a viewport
    /// `viewport_height_px` tall. The page height comes from the text
    /// layer's aspect ratio, or A4 when the page has no text layer.
    pub fn overlay_scroll_offset(&self, page: u32, viewport_height_px: f64) -> Option<f64> {
        let rect = self.overlay(page)?;
        let aspect = self
            .text_layers
            .get(&page)
            .filter(|l| l.width > 0.0 && l.height > 0.0)
            .map(|l| l.height / l.width)
            .unwrap_or(std::f64::consts::SQRT_2);
        let (top, height) = rect.vertical_pixels(self.rendered_width() * aspect);
        Some(centering_offset(top, height, viewport_height_px))
    }

    /// Notify that `page` finished rendering.
    ///
    /// Applies the text highlight to the page and schedules the debounced
    /// match scroll. A bounding-box target on this page is centered at once.
    pub fn page_rendered(&mut self, page: u32, now: Instant) -> Option<ScrollRequest> {
        match self.target.clone() {
            PreviewTarget::Highlight(term) => {
                if let Some(layer) = self.text_layers.get_mut(&page) {
                    layer.apply_highlight(&term);
                }
                self.debounce.schedule(now);
                None
            }
            PreviewTarget::Location(loc) if loc.page == page => {
                let b = loc.bbox;
                let key = (
                    self.product_id.clone(),
                    page,
                    [b.x.to_bits(), b.y.to_bits(), b.width.to_bits(), b.height.to_bits()],
                );
                if !self.overlay_scroll.should_scroll(&key) {
                    return None;
                }
                Some(ScrollRequest::CenterOverlay {
                    page,
                    rect: OverlayRect::from_bbox(&b),
                })
            }
            _ => None,
        }
    }

    /// Poll the debounced highlight scroll.
    pub fn poll_scroll(&mut self, now: Instant) -> Option<ScrollRequest> {
        if !self.debounce.poll(now) {
            return None;
        }
        let PreviewTarget::Highlight(term) = &self.target else {
            return None;
        };
        let term = term.trim().to_lowercase();
        if term.is_empty() {
            return None;
        }

        let (page, line_index, bbox) = self.visible_pages().into_iter().find_map(|page| {
            let layer = self.text_layers.get(&page)?;
            let index = layer.spans.iter().position(|s| s.highlighted)?;
            Some((page, layer.spans[index].line_index, layer.span_bbox(index)))
        })?;

        let key = (term, self.navigator.current(), self.product_id.clone());
        if !self.highlight_scroll.should_scroll(&key) {
            return None;
        }
        Some(ScrollRequest::TextMatch {
            page,
            line_index,
            bbox,
        })
    }
}
