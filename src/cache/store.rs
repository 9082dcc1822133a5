//! Cache storage.
//!
//! [`CacheStore`] is the seam to the shared key-value cache. [`MemoryCacheStore`] keeps one
//! LRU map per region and expires entries lazily on read.

use std::sync::RwLock;
use std::time::Duration;

use async_trait::async_trait;
use lru::LruCache;
use thiserror::Error;
use tokio::time::Instant;

use super::config::{CacheConfig, MAX_REGION_TTL};
use super::lock::{rw_read, rw_write};
use super::regions::CacheRegion;

const SOURCE: &str = "cache::store";

#[derive(Debug, Error)]
pub enum CacheStoreError {
    #[error("cache store unavailable: {message}")]
    Unavailable { message: String },
}

impl CacheStoreError {
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }
}

/// Region-scoped key-value storage of serialized payloads.
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, region: CacheRegion, key: &str) -> Result<Option<String>, CacheStoreError>;

    async fn put(
        &self,
        region: CacheRegion,
        key: &str,
        payload: String,
        ttl: Duration,
    ) -> Result<(), CacheStoreError>;

    /// Drop every entry of the region.
    async fn clear_region(&self, region: CacheRegion) -> Result<(), CacheStoreError>;
}

#[derive(Debug, Clone)]
struct StoredEntry {
    payload: String,
    expires_at: Instant,
}

/// In-process [`CacheStore`] with a bounded LRU per region.
pub struct MemoryCacheStore {
    regions: Vec<RwLock<LruCache<String, StoredEntry>>>,
}

impl MemoryCacheStore {
    pub fn new(config: &CacheConfig) -> Self {
        let capacity = config.max_entries_non_zero();
        let regions = CacheRegion::ALL
            .iter()
            .map(|_| RwLock::new(LruCache::new(capacity)))
            .collect();
        Self { regions }
    }

    /// Live and expired entries currently held by the region.
    pub fn len(&self, region: CacheRegion) -> usize {
        rw_read(self.slot(region), SOURCE, "len").len()
    }

    pub fn is_empty(&self, region: CacheRegion) -> bool {
        self.len(region) == 0
    }

    fn slot(&self, region: CacheRegion) -> &RwLock<LruCache<String, StoredEntry>> {
        &self.regions[region.index()]
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn get(&self, region: CacheRegion, key: &str) -> Result<Option<String>, CacheStoreError> {
        let mut entries = rw_write(self.slot(region), SOURCE, "get");
        let expired = match entries.get(key) {
            None => return Ok(None),
            Some(entry) if entry.expires_at > Instant::now() => {
                return Ok(Some(entry.payload.clone()));
            }
            Some(_) => true,
        };
        if expired {
            entries.pop(key);
        }
        Ok(None)
    }

    async fn put(
        &self,
        region: CacheRegion,
        key: &str,
        payload: String,
        ttl: Duration,
    ) -> Result<(), CacheStoreError> {
        let now = Instant::now();
        let entry = StoredEntry {
            payload,
            expires_at: now.checked_add(ttl.min(MAX_REGION_TTL)).unwrap_or(now),
        };
        rw_write(self.slot(region), SOURCE, "put").put(key.to_string(), entry);
        Ok(())
    }

    async fn clear_region(&self, region: CacheRegion) -> Result<(), CacheStoreError> {
        rw_write(self.slot(region), SOURCE, "clear_region").clear();
        Ok(())
    }
}
