use crate::config::ReviewConfig;
use crate::error::ReviewError;
use crate::model::{CatalogProduct, CatalogProducts, FileInfo, Product};
use crate::service::CatalogService;
use reqwest::blocking::{Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;
use url::Url;

/// Synchronous client for the catalog review REST API.
#[derive(Clone)]
pub struct HttpCatalogService {
    client: Client,
    base: Url,
    api_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DownloadUrlResponse {
    url: String,
}

#[derive(Debug, Serialize)]
struct ProductsBody<'a, T> {
    products: &'a [T],
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CheckExistingRequest<'a> {
    ordering_numbers: &'a [String],
}

impl HttpCatalogService {
    pub fn new(config: &ReviewConfig) -> Result<Self, ReviewError> {
        let base = Url::parse(&config.api_url).map_err(|e| {
            ReviewError::Config(format!("invalid API URL '{}': {e}", config.api_url))
        })?;
        if base.cannot_be_a_base() {
            return Err(ReviewError::Config(format!(
                "API URL '{}' cannot be used as a base",
                config.api_url
            )));
        }

        let client = Client::builder()
            .user_agent(concat!("catalog-review/", env!("CARGO_PKG_VERSION")))
            .timeout(config.request_timeout)
            .build()?;

        Ok(HttpCatalogService {
            client,
            base,
            api_token: config.api_token.clone(),
        })
    }

    /// Append percent-encoded path segments to the base URL.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn send(&self, request: RequestBuilder) -> Result<Response, ReviewError> {
        let request = match &self.api_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        };
        let response = request.send()?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(ReviewError::Api {
                status: status.as_u16(),
                message: api_error_message(&body, status.canonical_reason()),
            });
        }
        Ok(response)
    }
}

/// Pull a readable message out of an error body (`message`, `error` or
/// `detail` field of a JSON object, or the raw text).
fn api_error_message(body: &str, reason: Option<&str>) -> String {
    if let Ok(serde_json::Value::Object(map)) = serde_json::from_str::<serde_json::Value>(body) {
        for field in ["message", "error", "detail"] {
            if let Some(serde_json::Value::String(s)) = map.get(field) {
                return s.clone();
            }
        }
    }
    let trimmed = body.trim();
    if trimmed.is_empty() {
        reason.unwrap_or("request failed").to_string()
    } else {
        trimmed.to_string()
    }
}

impl CatalogService for HttpCatalogService {
    fn fetch_download_url(&self, key: &str) -> Result<String, ReviewError> {
        let mut url = self.endpoint(&["storage", "download-url"]);
        url.query_pairs_mut().append_pair("key", key);
        debug!(%url, "fetching download URL");

        let response: DownloadUrlResponse = self.send(self.client.get(url))?.json()?;
        Ok(response.url)
    }

    fn fetch_catalog_products(&self, file_id: &str) -> Result<CatalogProducts, ReviewError> {
        let url = self.endpoint(&["catalog-files", file_id, "products"]);
        Ok(self.send(self.client.get(url))?.json()?)
    }

    fn update_catalog_products(
        &self,
        file_id: &str,
        products: &[CatalogProduct],
    ) -> Result<(), ReviewError> {
        let url = self.endpoint(&["catalog-files", file_id, "products"]);
        self.send(self.client.put(url).json(&ProductsBody { products }))?;
        Ok(())
    }

    fn fetch_file_info(&self, file_id: &str) -> Result<FileInfo, ReviewError> {
        let url = self.endpoint(&["catalog-files", file_id]);
        Ok(self.send(self.client.get(url))?.json()?)
    }

    fn complete_file_review(&self, file_id: &str) -> Result<(), ReviewError> {
        let url = self.endpoint(&["catalog-files", file_id, "complete-review"]);
        self.send(self.client.post(url))?;
        Ok(())
    }

    fn check_existing_products(
        &self,
        ordering_numbers: &[String],
    ) -> Result<BTreeMap<String, Product>, ReviewError> {
        let url = self.endpoint(&["products", "check-existing"]);
        let body = CheckExistingRequest { ordering_numbers };
        Ok(self.send(self.client.post(url).json(&body))?.json()?)
    }

    fn save_products(&self, products: &[Product]) -> Result<(), ReviewError> {
        let url = self.endpoint(&["products"]);
        self.send(self.client.post(url).json(&ProductsBody { products }))?;
        Ok(())
    }

    fn backend_name(&self) -> &str {
        "http"
    }
}
