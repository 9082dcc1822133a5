//! Read-through memoization of catalog queries.

use std::future::Future;
use std::sync::Arc;

use metrics::counter;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::application::pagination::Page;
use crate::domain::entities::{ChapterRecord, MangaRecord, TagList};

use super::config::CacheConfig;
use super::keys::QueryKey;
use super::regions::CacheRegion;
use super::store::CacheStore;

pub const METRIC_CACHE_HIT: &str = "catalog_cache_hit_total";
pub const METRIC_CACHE_MISS: &str = "catalog_cache_miss_total";
pub const METRIC_CACHE_STORE_ERROR: &str = "catalog_cache_store_error_total";

/// Marker for values allowed into the query cache.
///
/// Only relative-path shaped data implements it; response views holding
/// [`AbsoluteUrl`](crate::domain::assets::AbsoluteUrl) never do.
pub trait CachePayload: Serialize + DeserializeOwned + Send + Sync {}

impl CachePayload for MangaRecord {}
impl CachePayload for ChapterRecord {}
impl CachePayload for TagList {}
impl<T: CachePayload> CachePayload for Page<T> {}
impl<T: CachePayload> CachePayload for Vec<T> {}

pub struct QueryCache {
    config: CacheConfig,
    store: Arc<dyn CacheStore>,
}

impl QueryCache {
    pub fn new(config: CacheConfig, store: Arc<dyn CacheStore>) -> Self {
        Self { config, store }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Return the cached value for `key`, or run `compute`, cache its success and return it.
    ///
    /// Errors from `compute` are returned as-is and leave the region untouched. Store
    /// failures never surface: a failed read is a miss, a failed write is logged.
    pub async fn get_or_compute<T, E, F, Fut>(
        &self,
        region: CacheRegion,
        key: &QueryKey,
        compute: F,
    ) -> Result<T, E>
    where
        T: CachePayload,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if !self.config.enabled {
            return compute().await;
        }

        if let Some(value) = self.lookup::<T>(region, key).await {
            counter!(METRIC_CACHE_HIT, "region" => region.name()).increment(1);
            debug!(region = region.name(), key = %key, "Query cache hit");
            return Ok(value);
        }

        counter!(METRIC_CACHE_MISS, "region" => region.name()).increment(1);
        let value = compute().await?;
        self.store_value(region, key, &value).await;
        Ok(value)
    }

    async fn lookup<T: CachePayload>(&self, region: CacheRegion, key: &QueryKey) -> Option<T> {
        let payload = match self.store.get(region, key.as_str()).await {
            Ok(payload) => payload?,
            Err(err) => {
                counter!(METRIC_CACHE_STORE_ERROR, "region" => region.name()).increment(1);
                warn!(
                    region = region.name(),
                    key = %key,
                    error = %err,
                    "Cache read failed; computing from store"
                );
                return None;
            }
        };

        match serde_json::from_str(&payload) {
            Ok(value) => Some(value),
            Err(err) => {
                warn!(
                    region = region.name(),
                    key = %key,
                    error = %err,
                    "Discarding undecodable cache payload"
                );
                None
            }
        }
    }

    async fn store_value<T: CachePayload>(&self, region: CacheRegion, key: &QueryKey, value: &T) {
        let payload = match serde_json::to_string(value) {
            Ok(payload) => payload,
            Err(err) => {
                warn!(
                    region = region.name(),
                    key = %key,
                    error = %err,
                    "Cache payload could not be serialized"
                );
                return;
            }
        };

        let ttl = self.config.ttl_for(region);
        if let Err(err) = self.store.put(region, key.as_str(), payload, ttl).await {
            counter!(METRIC_CACHE_STORE_ERROR, "region" => region.name()).increment(1);
            warn!(
                region = region.name(),
                key = %key,
                error = %err,
                "Cache write failed; returning uncached result"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;

    use super::*;
    use crate::cache::store::{CacheStoreError, MemoryCacheStore};

    fn cache(config: CacheConfig) -> QueryCache {
        let store = Arc::new(MemoryCacheStore::new(&config));
        QueryCache::new(config, store)
    }

    fn key(name: &'static str) -> QueryKey {
        QueryKey::builder(name).build()
    }

    async fn counted(
        cache: &QueryCache,
        calls: &AtomicUsize,
        region: CacheRegion,
        key: &QueryKey,
    ) -> Result<TagList, String> {
        cache
            .get_or_compute(region, key, || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(TagList {
                    tags: vec!["action".into()],
                })
            })
            .await
    }

    #[tokio::test]
    async fn second_call_is_served_from_cache() {
        let cache = cache(CacheConfig::default());
        let calls = AtomicUsize::new(0);
        let key = key("tags");

        let first = counted(&cache, &calls, CacheRegion::Tags, &key).await.unwrap();
        let second = counted(&cache, &calls, CacheRegion::Tags, &key).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn compute_errors_are_not_cached() {
        let cache = cache(CacheConfig::default());
        let calls = AtomicUsize::new(0);
        let key = key("detail");

        let miss: Result<TagList, String> = cache
            .get_or_compute(CacheRegion::MangaDetail, &key, || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err("not found".to_string())
            })
            .await;
        assert!(miss.is_err());

        counted(&cache, &calls, CacheRegion::MangaDetail, &key)
            .await
            .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn disabled_cache_always_computes() {
        let cache = cache(CacheConfig {
            enabled: false,
            ..Default::default()
        });
        let calls = AtomicUsize::new(0);
        let key = key("tags");

        for _ in 0..3 {
            counted(&cache, &calls, CacheRegion::Tags, &key).await.unwrap();
        }
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn expired_entry_is_recomputed() {
        let cache = cache(CacheConfig::default());
        let calls = AtomicUsize::new(0);
        let key = key("tags");

        counted(&cache, &calls, CacheRegion::Tags, &key).await.unwrap();
        tokio::time::advance(Duration::from_secs(3599)).await;
        counted(&cache, &calls, CacheRegion::Tags, &key).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        tokio::time::advance(Duration::from_secs(2)).await;
        counted(&cache, &calls, CacheRegion::Tags, &key).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    struct CorruptStore;

    #[async_trait]
    impl CacheStore for CorruptStore {
        async fn get(&self, _: CacheRegion, _: &str) -> Result<Option<String>, CacheStoreError> {
            Ok(Some("not json".to_string()))
        }

        async fn put(
            &self,
            _: CacheRegion,
            _: &str,
            _: String,
            _: Duration,
        ) -> Result<(), CacheStoreError> {
            Ok(())
        }

        async fn clear_region(&self, _: CacheRegion) -> Result<(), CacheStoreError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn undecodable_payload_is_a_miss() {
        let cache = QueryCache::new(CacheConfig::default(), Arc::new(CorruptStore));
        let calls = AtomicUsize::new(0);

        let value = counted(&cache, &calls, CacheRegion::Tags, &key("tags"))
            .await
            .unwrap();
        assert_eq!(value.tags, vec!["action".to_string()]);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
