use serde::Serialize;
use std::fmt;

/// User-facing category of a document load failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadErrorKind {
    AccessDenied,
    NotFound,
    ServerError,
    Cors,
    Network,
    Corrupted,
    Generic,
}

impl LoadErrorKind {
    pub fn message(&self) -> &'static str {
        match self {
            LoadErrorKind::AccessDenied => {
                "Access denied. You do not have permission to view this document."
            }
            LoadErrorKind::NotFound => "Document not found. It may have been moved or deleted.",
            LoadErrorKind::ServerError => {
                "The server encountered an error while loading the document. Please try again later."
            }
            LoadErrorKind::Cors => {
                "The document could not be loaded because of a cross-origin (CORS) restriction."
            }
            LoadErrorKind::Network => "Network error. Check your connection and try again.",
            LoadErrorKind::Corrupted => {
                "The document appears to be corrupted or is not a valid PDF."
            }
            LoadErrorKind::Generic => "Failed to load the document.",
        }
    }
}

impl fmt::Display for LoadErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// Lowercase substrings, checked top to bottom. The first row with a
/// matching pattern decides the kind.
pub const LOAD_ERROR_PATTERNS: &[(&[&str], LoadErrorKind)] = &[
    (&["403", "forbidden", "access denied"], LoadErrorKind::AccessDenied),
    (
        &["404", "not found", "no such key", "nosuchkey", "missing pdf"],
        LoadErrorKind::NotFound,
    ),
    (
        &[
            "500",
            "502",
            "503",
            "504",
            "internal server error",
            "unexpected server response",
        ],
        LoadErrorKind::ServerError,
    ),
    (&["cors", "cross-origin"], LoadErrorKind::Cors),
    (
        &["network", "failed to fetch", "timed out", "timeout", "connection"],
        LoadErrorKind::Network,
    ),
    (
        &["invalid pdf", "corrupt", "bad xref", "unexpected end", "not a pdf"],
        LoadErrorKind::Corrupted,
    ),
];

/// Map a raw loader error into one of the fixed user-facing kinds.
pub fn classify_load_error(raw: &str) -> LoadErrorKind {
    let lower = raw.to_lowercase();
    LOAD_ERROR_PATTERNS
        .iter()
        .find(|(patterns, _)| patterns.iter().any(|p| lower.contains(p)))
        .map(|(_, kind)| *kind)
        .unwrap_or(LoadErrorKind::Generic)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            classify_load_error("Unexpected server response (403) while retrieving PDF"),
            LoadErrorKind::AccessDenied
        );
        assert_eq!(
            classify_load_error("Unexpected server response (404) while retrieving PDF"),
            LoadErrorKind::NotFound
        );
        assert_eq!(
            classify_load_error("Unexpected server response (500) while retrieving PDF"),
            LoadErrorKind::ServerError
        );
        assert_eq!(
            classify_load_error("Unexpected server response (418) while retrieving PDF"),
            LoadErrorKind::ServerError
        );
    }

    #[test]
    fn test_not_found_phrases_any_case() {
        for raw in [
            "Object NOT FOUND",
            "NoSuchKey: The specified key does not exist.",
            "no such key",
            "Missing PDF \"https://x/y.pdf\".",
        ] {
            assert_eq!(classify_load_error(raw), LoadErrorKind::NotFound, "{raw}");
        }
    }

    #[test]
    fn test_403_wins_over_later_rows() {
        assert_eq!(
            classify_load_error("403 Forbidden: network policy"),
            LoadErrorKind::AccessDenied
        );
    }

    #[test]
    fn test_cors_before_network() {
        assert_eq!(
            classify_load_error("NetworkError: blocked by CORS policy"),
            LoadErrorKind::Cors
        );
        assert_eq!(
            classify_load_error("NetworkError when attempting to fetch resource."),
            LoadErrorKind::Network
        );
        assert_eq!(classify_load_error("Failed to fetch"), LoadErrorKind::Network);
    }

    #[test]
    fn test_corrupted() {
        assert_eq!(
            classify_load_error("Invalid PDF structure."),
            LoadErrorKind::Corrupted
        );
        assert_eq!(
            classify_load_error("the file is corrupted"),
            LoadErrorKind::Corrupted
        );
    }

    #[test]
    fn test_unmatched_is_generic() {
        assert_eq!(classify_load_error("something odd"), LoadErrorKind::Generic);
        assert_eq!(classify_load_error(""), LoadErrorKind::Generic);
        assert_eq!(
            LoadErrorKind::Generic.message(),
            "Failed to load the document."
        );
    }
}
