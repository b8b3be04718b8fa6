//! Document preview dialog: paging, zoom, load-error messages, text-search
//! highlighting and bounding-box overlays.

pub mod dialog;
pub mod load_error;
pub mod overlay;
pub mod scroll;
pub mod source;
pub mod text_layer;
pub mod viewport;

pub use dialog::{
    LoadStatus, PreviewDialog, PreviewOptions, PreviewTarget, ScrollLock, ScrollLockHost,
    ScrollRequest,
};
pub use load_error::{classify_load_error, LoadErrorKind};
pub use source::{check_pdf, fetch_document, PreviewSource, StorageLocation};
