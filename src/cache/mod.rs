//! Catalog query cache.
//!
//! Read results are memoized per [`CacheRegion`] under deterministic [`QueryKey`]s and hold
//! relative asset paths only. Writes evict whole regions through the
//! [`InvalidationCoordinator`].
//!
//! ## Configuration
//!
//! ```toml
//! [cache]
//! enabled = true
//! max_entries_per_region = 1000
//! # ... see config.rs for all options
//! ```

mod config;
mod invalidation;
mod keys;
mod lock;
mod query;
mod regions;
mod store;

pub use config::{CacheConfig, MAX_REGION_TTL, RegionTtlOverrides};
pub use invalidation::{InvalidationCoordinator, METRIC_REGION_CLEAR, Mutation};
pub use keys::{CatalogQuery, QueryKey, QueryKeyBuilder};
pub use query::{
    CachePayload, METRIC_CACHE_HIT, METRIC_CACHE_MISS, METRIC_CACHE_STORE_ERROR, QueryCache,
};
pub use regions::CacheRegion;
pub use store::{CacheStore, CacheStoreError, MemoryCacheStore};
