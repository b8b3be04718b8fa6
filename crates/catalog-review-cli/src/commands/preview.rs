use catalog_review_core::error::ReviewError;
use catalog_review_core::model::{BoundingBox, ProductLocation};
use catalog_review_core::preview::overlay::OverlayRect;
use catalog_review_core::preview::scroll::HIGHLIGHT_SCROLL_DELAY;
use catalog_review_core::preview::text_layer::PdftotextTextLayers;
use catalog_review_core::preview::{
    LoadStatus, PreviewDialog, PreviewOptions, PreviewSource, PreviewTarget, ScrollLockHost,
    ScrollRequest,
};
use catalog_review_core::service::cache::DownloadUrlCache;
use catalog_review_core::ReviewConfig;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use crate::output;

pub struct PreviewArgs {
    pub input_file: Option<PathBuf>,
    pub url: Option<String>,
    pub key: Option<String>,
    pub page: u32,
    pub highlight: Option<String>,
    pub location: Option<String>,
    pub width: f64,
    pub viewport_height: f64,
    pub zoom: f64,
}

/// A terminal has no page body to lock.
struct Terminal;

impl ScrollLockHost for Terminal {
    fn lock_scroll(&self) {}
    fn unlock_scroll(&self) {}
}

#[derive(Debug, Serialize)]
pub struct PreviewReport {
    pub title: String,
    pub page: u32,
    pub page_count: Option<u32>,
    pub zoom_percent: u32,
    pub page_width: f64,
    pub rendered_width: f64,
    pub error: Option<String>,
    pub matches: Vec<MatchLine>,
    pub scroll_to: Option<MatchLine>,
    pub overlay: Option<OverlayLine>,
}

#[derive(Debug, Clone, Serialize)]
pub struct OverlayLine {
    pub page: u32,
    pub rect: OverlayRect,
    /// Offset within the page that centers the box in the viewport.
    pub scroll_offset: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct MatchLine {
    pub page: u32,
    pub line_index: usize,
    pub text: String,
}

pub fn run(store: Option<&Path>, args: PreviewArgs, output_format: &str) -> Result<(), ReviewError> {
    let location = args.location.as_deref().map(parse_location).transpose()?;
    let target = match (&location, &args.highlight) {
        (Some(loc), _) => PreviewTarget::Location(*loc),
        (None, Some(term)) if !term.trim().is_empty() => PreviewTarget::Highlight(term.clone()),
        _ => PreviewTarget::None,
    };
    let options = PreviewOptions {
        initial_page: location.as_ref().map_or(args.page, |loc| loc.page),
        target,
        container_width: args.width,
        ..Default::default()
    };
    let source = match (&args.input_file, &args.url, &args.key) {
        (Some(path), _, _) => PreviewSource::Url(path.display().to_string()),
        (None, Some(url), _) => PreviewSource::Url(url.clone()),
        (None, None, Some(key)) => PreviewSource::StorageKey(key.clone()),
        (None, None, None) => {
            return Err(ReviewError::Validation(
                "pass a PDF path, --url or --key".into(),
            ))
        }
    };

    let mut dialog = PreviewDialog::open(source, options, Arc::new(Terminal));
    dialog.set_zoom(args.zoom);
    let extractor = PdftotextTextLayers::new();

    match &args.input_file {
        Some(path) => match std::fs::read(path) {
            Ok(bytes) => {
                // Rejected bytes are recorded on the dialog and reported below.
                let _ = catalog_review_core::load_preview_bytes(&mut dialog, &bytes, &extractor);
            }
            Err(e) => dialog.document_failed(&format!("Missing PDF {}: {e}", path.display())),
        },
        None => {
            let config = ReviewConfig::from_env()?;
            let service = super::backend(store, &config)?;
            let urls = DownloadUrlCache::new(config.url_cache_ttl);
            catalog_review_core::load_preview(
                &mut dialog,
                config.storage.as_ref(),
                service.as_ref(),
                &urls,
                &extractor,
                config.request_timeout,
            );
        }
    }

    let report = build_report(&mut dialog, args.viewport_height);
    match output_format {
        "json" => output::json::print(&report)?,
        _ => output::table::print_preview(&report),
    }

    if let LoadStatus::Failed { kind, raw } = dialog.status() {
        return Err(ReviewError::Load {
            kind: *kind,
            raw: raw.clone(),
        });
    }
    Ok(())
}

fn build_report(dialog: &mut PreviewDialog, viewport_height: f64) -> PreviewReport {
    let now = Instant::now();
    let mut overlay = None;
    for page in dialog.visible_pages() {
        if let Some(ScrollRequest::CenterOverlay { page, rect }) = dialog.page_rendered(page, now) {
            overlay = dialog
                .overlay_scroll_offset(page, viewport_height)
                .map(|scroll_offset| OverlayLine {
                    page,
                    rect,
                    scroll_offset,
                });
        }
    }
    let scroll_to = match dialog.poll_scroll(now + HIGHLIGHT_SCROLL_DELAY) {
        Some(ScrollRequest::TextMatch {
            page, line_index, ..
        }) => line_text(dialog, page, line_index),
        _ => None,
    };

    let matches = dialog
        .visible_pages()
        .into_iter()
        .filter_map(|page| dialog.text_layer(page))
        .flat_map(|layer| {
            layer.highlighted().map(move |span| MatchLine {
                page: layer.page_number,
                line_index: span.line_index,
                text: span.text.clone(),
            })
        })
        .collect();

    PreviewReport {
        title: dialog.source().display_name().to_string(),
        page: dialog.current_page(),
        page_count: dialog.page_count(),
        zoom_percent: dialog.zoom().percent(),
        page_width: dialog.page_width(),
        rendered_width: dialog.rendered_width(),
        error: dialog.error_message().map(str::to_string),
        matches,
        scroll_to,
        overlay,
    }
}

/// Parse `PAGE:X,Y,W,H` with the box in fractions of the page size.
fn parse_location(text: &str) -> Result<ProductLocation, ReviewError> {
    let invalid = || {
        ReviewError::Validation(format!(
            "invalid location '{text}': expected PAGE:X,Y,W,H with fractions of the page"
        ))
    };
    let (page, bbox) = text.split_once(':').ok_or_else(invalid)?;
    let page: u32 = page.trim().parse().map_err(|_| invalid())?;
    let values = bbox
        .split(',')
        .map(|v| v.trim().parse::<f64>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|_| invalid())?;
    let &[x, y, width, height] = values.as_slice() else {
        return Err(invalid());
    };
    if page == 0 {
        return Err(invalid());
    }
    Ok(ProductLocation {
        page,
        bbox: BoundingBox {
            x,
            y,
            width,
            height,
        },
    })
}

fn line_text(dialog: &PreviewDialog, page: u32, line_index: usize) -> Option<MatchLine> {
    let layer = dialog.text_layer(page)?;
    let span = layer.spans.iter().find(|s| s.line_index == line_index)?;
    Some(MatchLine {
        page,
        line_index,
        text: span.text.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_location() {
        let loc = parse_location("3:0.1, 0.5,0.3,0.1").unwrap();
        assert_eq!(loc.page, 3);
        assert_eq!(loc.bbox.y, 0.5);
        assert!(parse_location("0:0.1,0.5,0.3,0.1").is_err());
        assert!(parse_location("3:0.1,0.5,0.3").is_err());
        assert!(parse_location("0.1,0.5,0.3,0.1").is_err());
    }
}
