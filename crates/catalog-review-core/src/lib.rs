pub mod config;
pub mod consolidation;
pub mod error;
pub mod model;
pub mod preview;
pub mod review;
pub mod service;

use error::ReviewError;
use preview::text_layer::TextLayerSource;
use preview::{PreviewDialog, StorageLocation};
use service::cache::DownloadUrlCache;
use service::CatalogService;
use std::time::Duration;

pub use config::ReviewConfig;
pub use review::ReviewSession;

/// Main API entry point for the preview: resolve the dialog's source,
/// download the document and load its text layers.
///
/// Load failures are recorded on the dialog as a classified status rather
/// than returned, so the dialog can show the matching message.
pub fn load_preview(
    dialog: &mut PreviewDialog,
    storage: Option<&StorageLocation>,
    service: &dyn CatalogService,
    urls: &DownloadUrlCache,
    extractor: &dyn TextLayerSource,
    timeout: Duration,
) {
    let bytes = dialog
        .source()
        .resolve(storage, service, urls)
        .and_then(|url| preview::fetch_document(&url, timeout));

    match bytes {
        Ok(bytes) => dialog.load_text_layers(extractor, &bytes),
        Err(e) => dialog.document_failed(&e.raw_message()),
    }
}

/// Same as [`load_preview`] for bytes already in memory.
pub fn load_preview_bytes(
    dialog: &mut PreviewDialog,
    pdf_bytes: &[u8],
    extractor: &dyn TextLayerSource,
) -> Result<(), ReviewError> {
    if let Err(e) = preview::check_pdf(pdf_bytes) {
        dialog.document_failed(&e.raw_message());
        return Err(e);
    }
    dialog.load_text_layers(extractor, pdf_bytes);
    Ok(())
}
