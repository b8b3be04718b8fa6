use crate::preview::load_error::LoadErrorKind;

#[derive(Debug, thiserror::Error)]
pub enum ReviewError {
    #[error("{}", .kind.message())]
    Load { kind: LoadErrorKind, raw: String },

    #[error("invalid product: {0}")]
    Validation(String),

    #[error("failed to save products: {0}")]
    Save(String),

    #[error("finish review failed while {stage}: {reason}")]
    Finalize { stage: FinishStage, reason: String },

    #[error("{count} conflict(s) still need a keep/replace choice")]
    ConsolidationUnresolved { count: usize },

    #[error("unknown product row '{0}'")]
    UnknownRow(String),

    #[error("API returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("request failed: {0}")]
    Transport(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("text extraction failed: {0}")]
    Extraction(String),

    #[error("pdftotext not found. Install poppler: brew install poppler (macOS) or apt install poppler-utils (Linux)")]
    PdftotextNotFound,

    #[error("pdftotext failed with exit code {code}: {stderr}")]
    PdftotextFailed { code: i32, stderr: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<reqwest::Error> for ReviewError {
    fn from(e: reqwest::Error) -> Self {
        match e.status() {
            Some(status) => ReviewError::Api {
                status: status.as_u16(),
                message: status.canonical_reason().unwrap_or("error").to_string(),
            },
            None => ReviewError::Transport(transport_message(&e)),
        }
    }
}

/// Describe a reqwest failure by its kind and cause chain.
///
/// reqwest's own `Display` is "error sending request for url (...)": it
/// names the URL and drops the cause. The URL stays out of the result so
/// digits in a document path cannot steer the load-error classifier.
pub(crate) fn transport_message(e: &reqwest::Error) -> String {
    let mut parts = Vec::new();
    if e.is_timeout() {
        parts.push("network request timed out".to_string());
    } else if e.is_connect() {
        parts.push("network connection failed".to_string());
    } else if e.is_request() {
        parts.push("network request failed".to_string());
    } else if e.is_body() || e.is_decode() {
        parts.push("network response body failed".to_string());
    } else if e.is_builder() {
        parts.push("invalid request".to_string());
    }

    let mut source = std::error::Error::source(e);
    while let Some(cause) = source {
        let text = cause.to_string();
        if !parts.contains(&text) {
            parts.push(text);
        }
        source = cause.source();
    }

    if parts.is_empty() {
        parts.push("network request failed".to_string());
    }
    parts.join(": ")
}

impl ReviewError {
    /// Raw text to feed the load-error classifier when a document fetch fails.
    pub fn raw_message(&self) -> String {
        match self {
            ReviewError::Load { raw, .. } => raw.clone(),
            other => other.to_string(),
        }
    }
}

/// Step of the finish-review sequence that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinishStage {
    SavingChanges,
    CheckingExisting,
    SavingProducts,
    Completing,
}

impl std::fmt::Display for FinishStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FinishStage::SavingChanges => write!(f, "saving changes"),
            FinishStage::CheckingExisting => write!(f, "checking existing products"),
            FinishStage::SavingProducts => write!(f, "saving products"),
            FinishStage::Completing => write!(f, "completing the review"),
        }
    }
}
