pub mod explain;
pub mod finish;
pub mod mark;
pub mod preview;
pub mod products;

use catalog_review_core::error::ReviewError;
use catalog_review_core::service::http::HttpCatalogService;
use catalog_review_core::service::local::LocalCatalogService;
use catalog_review_core::service::CatalogService;
use catalog_review_core::{ReviewConfig, ReviewSession};
use std::path::Path;
use tracing::debug;

/// Pick the backend: the local JSON store when `--store` is given,
/// otherwise the HTTP API configured from the environment.
pub fn backend(
    store: Option<&Path>,
    config: &ReviewConfig,
) -> Result<Box<dyn CatalogService>, ReviewError> {
    let service: Box<dyn CatalogService> = match store {
        Some(path) => Box::new(LocalCatalogService::open(path)?),
        None => Box::new(HttpCatalogService::new(config)?),
    };
    debug!(backend = service.backend_name(), "using catalog backend");
    Ok(service)
}

pub fn load_session(
    service: &dyn CatalogService,
    file_id: &str,
) -> Result<ReviewSession, ReviewError> {
    let mut session = ReviewSession::new(file_id);
    session.load(service)?;
    Ok(session)
}
