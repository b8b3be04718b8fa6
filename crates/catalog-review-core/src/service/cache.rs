use crate::error::ReviewError;
use crate::service::CatalogService;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::debug;

#[derive(Debug, Clone)]
struct CachedUrl {
    url: String,
    fetched_at: Instant,
}

/// Download URLs keyed by storage key, reused for a bounded time window.
#[derive(Debug)]
pub struct DownloadUrlCache {
    ttl: Duration,
    entries: Mutex<HashMap<String, CachedUrl>>,
}

impl DownloadUrlCache {
    pub fn new(ttl: Duration) -> Self {
        DownloadUrlCache {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn get(&self, service: &dyn CatalogService, key: &str) -> Result<String, ReviewError> {
        self.get_at(service, key, Instant::now())
    }

    fn get_at(
        &self,
        service: &dyn CatalogService,
        key: &str,
        now: Instant,
    ) -> Result<String, ReviewError> {
        if let Some(hit) = self.lookup(key, now) {
            debug!(key, "download URL cache hit");
            return Ok(hit);
        }

        // Failures are not cached; the next call asks the backend again.
        let url = service.fetch_download_url(key)?;
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(
                key.to_string(),
                CachedUrl {
                    url: url.clone(),
                    fetched_at: now,
                },
            );
        }
        Ok(url)
    }

    fn lookup(&self, key: &str, now: Instant) -> Option<String> {
        let mut entries = self.entries.lock().ok()?;
        match entries.get(key) {
            Some(entry) if now.saturating_duration_since(entry.fetched_at) < self.ttl => {
                Some(entry.url.clone())
            }
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    pub fn invalidate(&self, key: &str) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.remove(key);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
