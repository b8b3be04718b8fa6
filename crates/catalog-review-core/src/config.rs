use crate::error::ReviewError;
use crate::preview::source::StorageLocation;
use std::env;
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "http://localhost:8000/api";
pub const DEFAULT_REGION: &str = "us-east-1";
pub const DEFAULT_URL_CACHE_SECS: u64 = 300;
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone)]
pub struct ReviewConfig {
    pub api_url: String,
    /// Sent as `Authorization: Bearer <token>` when set.
    pub api_token: Option<String>,
    /// Storage location used to build preview URLs from object keys.
    /// When unset, keys are resolved through the download-URL endpoint.
    pub storage: Option<StorageLocation>,
    pub url_cache_ttl: Duration,
    pub request_timeout: Duration,
}

impl Default for ReviewConfig {
    fn default() -> Self {
        ReviewConfig {
            api_url: DEFAULT_API_URL.to_string(),
            api_token: None,
            storage: None,
            url_cache_ttl: Duration::from_secs(DEFAULT_URL_CACHE_SECS),
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl ReviewConfig {
    pub fn from_env() -> Result<Self, ReviewError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build a config from any variable lookup (environment, test map).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ReviewError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_url = non_blank(lookup("CATALOG_REVIEW_API_URL"))
            .unwrap_or_else(|| DEFAULT_API_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        let api_token = non_blank(lookup("CATALOG_REVIEW_API_TOKEN"));

        let storage = non_blank(lookup("CATALOG_REVIEW_BUCKET")).map(|bucket| StorageLocation {
            bucket,
            region: non_blank(lookup("CATALOG_REVIEW_REGION"))
                .unwrap_or_else(|| DEFAULT_REGION.to_string()),
        });

        let url_cache_ttl = Duration::from_secs(parse_secs(
            "CATALOG_REVIEW_URL_CACHE_SECS",
            lookup("CATALOG_REVIEW_URL_CACHE_SECS"),
            DEFAULT_URL_CACHE_SECS,
        )?);

        let request_timeout = Duration::from_secs(parse_secs(
            "CATALOG_REVIEW_TIMEOUT_SECS",
            lookup("CATALOG_REVIEW_TIMEOUT_SECS"),
            DEFAULT_TIMEOUT_SECS,
        )?);

        Ok(ReviewConfig {
            api_url,
            api_token,
            storage,
            url_cache_ttl,
            request_timeout,
        })
    }
}

/// Treat missing, empty and whitespace-only values as unset.
fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn parse_secs(name: &str, value: Option<String>, default: u64) -> Result<u64, ReviewError> {
    match non_blank(value) {
        None => Ok(default),
        Some(v) => v.parse::<u64>().map_err(|_| {
            ReviewError::Config(format!(
                "{name} must be a whole number of seconds, got '{v}'"
            ))
        }),
    }
}
