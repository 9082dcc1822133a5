//! Query cache configuration.
//!
//! Controlled by the `[cache]` table of `manga-catalog.toml`:
//!
//! ```toml
//! [cache]
//! enabled = true
//! max_entries_per_region = 1000
//!
//! [cache.ttl_seconds]
//! recommended = 600
//! ```

use std::num::NonZeroUsize;
use std::time::Duration;

use serde::Deserialize;

use super::regions::CacheRegion;

const DEFAULT_MAX_ENTRIES_PER_REGION: usize = 1000;

/// Longest freshness window any region may be configured with (30 days).
pub const MAX_REGION_TTL: Duration = Duration::from_secs(30 * 24 * 60 * 60);

/// Per-region TTL overrides in seconds. Unset regions keep their default window.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RegionTtlOverrides {
    pub manga_list: Option<u64>,
    pub manga_detail: Option<u64>,
    pub manga_search: Option<u64>,
    pub chapter_list: Option<u64>,
    pub recommended: Option<u64>,
    pub featured: Option<u64>,
    pub tags: Option<u64>,
}

impl RegionTtlOverrides {
    fn get(&self, region: CacheRegion) -> Option<u64> {
        match region {
            CacheRegion::MangaList => self.manga_list,
            CacheRegion::MangaDetail => self.manga_detail,
            CacheRegion::MangaSearch => self.manga_search,
            CacheRegion::ChapterList => self.chapter_list,
            CacheRegion::Recommended => self.recommended,
            CacheRegion::Featured => self.featured,
            CacheRegion::Tags => self.tags,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// When false every lookup computes and nothing is stored.
    pub enabled: bool,
    /// LRU capacity of each region in the in-memory store.
    pub max_entries_per_region: usize,
    pub ttl_seconds: RegionTtlOverrides,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_entries_per_region: DEFAULT_MAX_ENTRIES_PER_REGION,
            ttl_seconds: RegionTtlOverrides::default(),
        }
    }
}

impl From<&crate::config::CacheSettings> for CacheConfig {
    fn from(settings: &crate::config::CacheSettings) -> Self {
        Self {
            enabled: settings.enabled,
            max_entries_per_region: settings.max_entries_per_region.get(),
            ttl_seconds: settings.ttl_seconds.clone(),
        }
    }
}

impl CacheConfig {
    /// Effective TTL of a region: the configured override or the region default, capped at
    /// [`MAX_REGION_TTL`].
    pub fn ttl_for(&self, region: CacheRegion) -> Duration {
        self.ttl_seconds
            .get(region)
            .map(Duration::from_secs)
            .unwrap_or_else(|| region.default_ttl())
            .min(MAX_REGION_TTL)
    }

    /// Returns the region capacity as NonZeroUsize, clamping to 1 if zero.
    pub fn max_entries_non_zero(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.max_entries_per_region).unwrap_or(NonZeroUsize::MIN)
    }
}
