pub mod cache;
pub mod http;
pub mod local;

use crate::error::ReviewError;
use crate::model::{CatalogProduct, CatalogProducts, FileInfo, Product};
use std::collections::BTreeMap;

/// Backend calls the review workflow depends on.
///
/// Every call is a plain request/response; the workflow issues them one at
/// a time and never retries on its own.
pub trait CatalogService: Send + Sync {
    /// Resolve a storage key into a URL the document can be fetched from.
    fn fetch_download_url(&self, key: &str) -> Result<String, ReviewError>;

    fn fetch_catalog_products(&self, file_id: &str) -> Result<CatalogProducts, ReviewError>;

    /// Replace the stored product set of a file.
    fn update_catalog_products(
        &self,
        file_id: &str,
        products: &[CatalogProduct],
    ) -> Result<(), ReviewError>;

    fn fetch_file_info(&self, file_id: &str) -> Result<FileInfo, ReviewError>;

    fn complete_file_review(&self, file_id: &str) -> Result<(), ReviewError>;

    /// Look up canonical products by ordering number. Unknown numbers are
    /// simply absent from the returned map.
    fn check_existing_products(
        &self,
        ordering_numbers: &[String],
    ) -> Result<BTreeMap<String, Product>, ReviewError>;

    fn save_products(&self, products: &[Product]) -> Result<(), ReviewError>;

    /// Name of this backend (for diagnostics).
    fn backend_name(&self) -> &str;
}
