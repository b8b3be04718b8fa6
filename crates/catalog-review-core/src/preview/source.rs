use crate::error::{transport_message, ReviewError};
use crate::preview::load_error::classify_load_error;
use crate::service::cache::DownloadUrlCache;
use crate::service::CatalogService;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// Object-storage bucket the catalog documents are uploaded to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageLocation {
    pub bucket: String,
    pub region: String,
}

impl StorageLocation {
    /// Path-style object URL with each key segment percent-encoded.
    pub fn object_url(&self, key: &str) -> Result<String, ReviewError> {
        let host = format!("https://s3.{}.amazonaws.com/", self.region);
        let mut url = Url::parse(&host).map_err(|e| {
            ReviewError::Config(format!("invalid storage region '{}': {e}", self.region))
        })?;
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|_| ReviewError::Config("storage URL cannot be a base".into()))?;
            path.clear().push(&self.bucket);
            for segment in key.trim_start_matches('/').split('/') {
                path.push(segment);
            }
        }
        Ok(url.into())
    }
}

/// Where the previewed document comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreviewSource {
    /// Absolute URL supplied by the caller.
    Url(String),
    /// Object key in the catalog bucket.
    StorageKey(String),
}

impl PreviewSource {
    /// Resolve into a fetchable URL. Keys are turned into object URLs when
    /// a storage location is configured, otherwise they go through the
    /// download-URL endpoint.
    pub fn resolve(
        &self,
        storage: Option<&StorageLocation>,
        service: &dyn CatalogService,
        urls: &DownloadUrlCache,
    ) -> Result<String, ReviewError> {
        match (self, storage) {
            (PreviewSource::Url(url), _) => Ok(url.clone()),
            (PreviewSource::StorageKey(key), Some(storage)) => storage.object_url(key),
            (PreviewSource::StorageKey(key), None) => urls.get(service, key),
        }
    }

    /// File name shown in the dialog title.
    pub fn display_name(&self) -> &str {
        let raw = match self {
            PreviewSource::Url(url) => url.split(['?', '#']).next().unwrap_or(url),
            PreviewSource::StorageKey(key) => key,
        };
        raw.rsplit('/').find(|s| !s.is_empty()).unwrap_or(raw)
    }
}

fn load_error(raw: String) -> ReviewError {
    ReviewError::Load {
        kind: classify_load_error(&raw),
        raw,
    }
}

/// Download a document. Every failure comes back as a classified
/// [`ReviewError::Load`].
pub fn fetch_document(url: &str, timeout: Duration) -> Result<Vec<u8>, ReviewError> {
    let client = reqwest::blocking::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| load_error(transport_message(&e)))?;
    let response = client.get(url).send().map_err(|e| {
        warn!(url, "document request failed");
        load_error(transport_message(&e))
    })?;

    let status = response.status();
    if !status.is_success() {
        warn!(url, %status, "document request rejected");
        return Err(load_error(format!("Unexpected server response ({status})")));
    }
    let bytes = response
        .bytes()
        .map_err(|e| load_error(transport_message(&e)))?;
    debug!(url, bytes = bytes.len(), "fetched document");
    check_pdf(&bytes)?;
    Ok(bytes.to_vec())
}

/// Reject bytes that do not start with a PDF header.
pub fn check_pdf(bytes: &[u8]) -> Result<(), ReviewError> {
    let head = &bytes[..bytes.len().min(1024)];
    if head.windows(5).any(|w| w == b"%PDF-") {
        Ok(())
    } else {
        Err(load_error("Invalid PDF structure: not a PDF file".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn location() -> StorageLocation {
        StorageLocation {
            bucket: "catalog-uploads".into(),
            region: "eu-central-1".into(),
        }
    }

    #[test]
    fn test_object_url_encodes_segments() {
        let url = location()
            .object_url("uploads/2024 spring/Valves #2.pdf")
            .unwrap();
        assert_eq!(
            url,
            "https://s3.eu-central-1.amazonaws.com/catalog-uploads/uploads/2024%20spring/Valves%20%232.pdf"
        );
    }

    #[test]
    fn test_object_url_leading_slash() {
        let url = location().object_url("/a.pdf").unwrap();
        assert_eq!(
            url,
            "https://s3.eu-central-1.amazonaws.com/catalog-uploads/a.pdf"
        );
    }

    #[test]
    fn test_check_pdf() {
        assert!(check_pdf(b"%PDF-1.7\n...").is_ok());
        let err = check_pdf(b"<html>login</html>").unwrap_err();
        assert!(matches!(
            err,
            ReviewError::Load {
                kind: crate::preview::LoadErrorKind::Corrupted,
                ..
            }
        ));
    }

    #[test]
    fn test_refused_connection_is_network_error() {
        // Nothing listens on port 1; the 404 in the path must not decide the kind.
        let err = fetch_document(
            "http://127.0.0.1:1/catalogs/2024-404.pdf",
            Duration::from_secs(5),
        )
        .unwrap_err();
        match err {
            ReviewError::Load { kind, raw } => {
                assert_eq!(kind, crate::preview::LoadErrorKind::Network);
                assert!(!raw.contains("127.0.0.1"), "raw text leaks the url: {raw}");
            }
            other => panic!("expected a load error, got {other:?}"),
        }
    }

    #[test]
    fn test_display_name() {
        assert_eq!(
            PreviewSource::Url("https://x.example.com/docs/cat.pdf?sig=1".into()).display_name(),
            "cat.pdf"
        );
        assert_eq!(
            PreviewSource::StorageKey("uploads/a/b.pdf".into()).display_name(),
            "b.pdf"
        );
    }
}
