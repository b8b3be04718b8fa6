use crate::error::ReviewError;
use crate::model::{CatalogProduct, CatalogProducts, FileInfo, Product, SourceFile};
use crate::service::CatalogService;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use tracing::info;

/// One uploaded catalog file and its extracted products.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredFile {
    pub info: FileInfo,
    #[serde(default)]
    pub products: Vec<CatalogProduct>,
    #[serde(default)]
    pub source_file: Option<SourceFile>,
    #[serde(default)]
    pub review_completed: bool,
}

/// On-disk layout of the local store.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalStore {
    #[serde(default)]
    pub files: BTreeMap<String, StoredFile>,
    /// Canonical products keyed by ordering number.
    #[serde(default)]
    pub products: BTreeMap<String, Product>,
    /// Storage key -> URL.
    #[serde(default)]
    pub download_urls: BTreeMap<String, String>,
}

/// [`CatalogService`] backed by a single JSON file.
///
/// Every write is flushed to disk through a temp file in the same
/// directory, so the store is never left half-written.
#[derive(Debug)]
pub struct LocalCatalogService {
    path: Option<PathBuf>,
    store: Mutex<LocalStore>,
}

impl LocalCatalogService {
    /// Open a store file. A missing file starts an empty store.
    pub fn open(path: &Path) -> Result<Self, ReviewError> {
        let store = if path.exists() {
            let content = std::fs::read_to_string(path)?;
            serde_json::from_str(&content)?
        } else {
            LocalStore::default()
        };
        info!(path = %path.display(), files = store.files.len(), "opened local store");
        Ok(LocalCatalogService {
            path: Some(path.to_path_buf()),
            store: Mutex::new(store),
        })
    }

    /// Store that lives only in memory.
    pub fn in_memory(store: LocalStore) -> Self {
        LocalCatalogService {
            path: None,
            store: Mutex::new(store),
        }
    }

    pub fn snapshot(&self) -> Result<LocalStore, ReviewError> {
        Ok(self.lock()?.clone())
    }

    fn lock(&self) -> Result<MutexGuard<'_, LocalStore>, ReviewError> {
        self.store
            .lock()
            .map_err(|_| ReviewError::Transport("local store lock poisoned".into()))
    }

    /// Apply `change` to a copy of the store, write the copy, then swap it
    /// in. A failed write leaves memory as it was.
    fn update<F>(&self, change: F) -> Result<(), ReviewError>
    where
        F: FnOnce(&mut LocalStore) -> Result<(), ReviewError>,
    {
        let mut store = self.lock()?;
        let mut next = store.clone();
        change(&mut next)?;
        self.persist(&next)?;
        *store = next;
        Ok(())
    }

    fn persist(&self, store: &LocalStore) -> Result<(), ReviewError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let mut tmp = tempfile::NamedTempFile::new_in(&dir)?;
        tmp.write_all(serde_json::to_string_pretty(store)?.as_bytes())?;
        tmp.persist(path).map_err(|e| ReviewError::Io(e.error))?;
        Ok(())
    }
}

fn not_found(what: &str, id: &str) -> ReviewError {
    ReviewError::Api {
        status: 404,
        message: format!("{what} '{id}' not found"),
    }
}

impl CatalogService for LocalCatalogService {
    fn fetch_download_url(&self, key: &str) -> Result<String, ReviewError> {
        let store = self.lock()?;
        store
            .download_urls
            .get(key)
            .cloned()
            .ok_or_else(|| ReviewError::Api {
                status: 404,
                message: format!("NoSuchKey: The specified key does not exist: {key}"),
            })
    }

    fn fetch_catalog_products(&self, file_id: &str) -> Result<CatalogProducts, ReviewError> {
        let store = self.lock()?;
        let file = store
            .files
            .get(file_id)
            .ok_or_else(|| not_found("catalog file", file_id))?;
        Ok(CatalogProducts {
            products: file.products.clone(),
            source_file: file.source_file.clone(),
        })
    }

    fn update_catalog_products(
        &self,
        file_id: &str,
        products: &[CatalogProduct],
    ) -> Result<(), ReviewError> {
        self.update(|store| {
            let file = store
                .files
                .get_mut(file_id)
                .ok_or_else(|| not_found("catalog file", file_id))?;
            file.products = products.to_vec();
            Ok(())
        })
    }

    fn fetch_file_info(&self, file_id: &str) -> Result<FileInfo, ReviewError> {
        let store = self.lock()?;
        store
            .files
            .get(file_id)
            .map(|f| f.info.clone())
            .ok_or_else(|| not_found("catalog file", file_id))
    }

    fn complete_file_review(&self, file_id: &str) -> Result<(), ReviewError> {
        self.update(|store| {
            let file = store
                .files
                .get_mut(file_id)
                .ok_or_else(|| not_found("catalog file", file_id))?;
            file.review_completed = true;
            Ok(())
        })
    }

    fn check_existing_products(
        &self,
        ordering_numbers: &[String],
    ) -> Result<BTreeMap<String, Product>, ReviewError> {
        let store = self.lock()?;
        Ok(ordering_numbers
            .iter()
            .filter_map(|n| store.products.get(n).map(|p| (n.clone(), p.clone())))
            .collect())
    }

    fn save_products(&self, products: &[Product]) -> Result<(), ReviewError> {
        self.update(|store| {
            for product in products {
                store
                    .products
                    .insert(product.ordering_number.clone(), product.clone());
            }
            Ok(())
        })
    }

    fn backend_name(&self) -> &str {
        "local"
    }
}
