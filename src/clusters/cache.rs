use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};

/// Configuration for HTTP response caching
#[derive(Clone, Debug)]
pub struct CacheConfig {
    pub enabled: bool, // false when --no-cache
}

/// Get the platform-appropriate cache directory for cluster-curator
pub fn get_cache_path() -> PathBuf {
    dirs::cache_dir()
        .map(|p| p.join("cluster-curator/http-cache"))
        .unwrap_or_else(|| crate::config::get_config_dir().join("http-cache"))
}

/// Clear the HTTP cache directory
pub fn clear_cache() -> Result<()> {
    let cache_path = get_cache_path();
    match std::fs::remove_dir_all(&cache_path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e).context("Failed to remove cache directory"),
    }
}

/// A cached API response with the validator used for revalidation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedResponse {
    pub etag: Option<String>,
    pub body: Vec<u8>,
    pub fetched_at: DateTime<Utc>,
}

/// Response cache backed by cacache on disk with an in-memory layer.
///
/// Entries are keyed by request URL. Responses without an ETag are still
/// stored but can never be revalidated, so they are only useful as a record.
#[derive(Clone)]
pub struct ResponseCache {
    memory: Arc<Mutex<HashMap<String, CachedResponse>>>,
    cache_path: PathBuf,
}

impl ResponseCache {
    pub fn new(cache_path: PathBuf) -> Self {
        // Don't pre-load disk cache - entries are loaded on demand
        Self {
            memory: Arc::new(Mutex::new(HashMap::new())),
            cache_path,
        }
    }

    fn memory(&self) -> MutexGuard<'_, HashMap<String, CachedResponse>> {
        self.memory.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Clear the in-memory layer to force revalidation on next fetch
    pub fn clear_memory(&self) {
        self.memory().clear();
    }

    pub fn lookup(&self, url: &str) -> Option<CachedResponse> {
        if let Some(hit) = self.memory().get(url) {
            return Some(hit.clone());
        }

        let bytes = cacache::read_sync(&self.cache_path, url).ok()?;
        let entry: CachedResponse = serde_json::from_slice(&bytes).ok()?;

        // Populate in-memory cache for subsequent hits
        self.memory().insert(url.to_string(), entry.clone());
        Some(entry)
    }

    pub fn store(&self, url: &str, entry: CachedResponse) {
        // Disk writes are best-effort, a failed write only costs a refetch
        match serde_json::to_vec(&entry) {
            Ok(serialized) => {
                if let Err(e) = cacache::write_sync(&self.cache_path, url, &serialized) {
                    tracing::debug!(url, error = %e, "failed to persist cached response");
                }
            }
            Err(e) => tracing::debug!(url, error = %e, "failed to serialize cached response"),
        }

        self.memory().insert(url.to_string(), entry);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_cache(name: &str) -> (ResponseCache, PathBuf) {
        let path = std::env::temp_dir().join(format!("cluster_curator_test_cache_{}", name));
        let _ = std::fs::remove_dir_all(&path);
        (ResponseCache::new(path.clone()), path)
    }

    fn entry(body: &str) -> CachedResponse {
        CachedResponse {
            etag: Some("\"abc\"".to_string()),
            body: body.as_bytes().to_vec(),
            fetched_at: Utc::now(),
        }
    }

    #[test]
    fn test_lookup_miss() {
        let (cache, path) = temp_cache("miss");
        assert!(cache.lookup("https://example.org/a").is_none());
        let _ = std::fs::remove_dir_all(&path);
    }

    #[test]
    fn test_store_then_lookup() {
        let (cache, path) = temp_cache("store");
        cache.store("https://example.org/a", entry("[]"));
        let hit = cache.lookup("https://example.org/a").unwrap();
        assert_eq!(hit.body, b"[]".to_vec());
        assert_eq!(hit.etag.as_deref(), Some("\"abc\""));
        let _ = std::fs::remove_dir_all(&path);
    }

    #[test]
    fn test_disk_survives_memory_clear() {
        let (cache, path) = temp_cache("disk");
        cache.store("https://example.org/b", entry("[1]"));
        cache.clear_memory();

        // A fresh handle on the same directory sees the entry too
        let reopened = ResponseCache::new(path.clone());
        assert_eq!(reopened.lookup("https://example.org/b").unwrap().body, b"[1]".to_vec());
        assert!(cache.lookup("https://example.org/b").is_some());
        let _ = std::fs::remove_dir_all(&path);
    }
}
