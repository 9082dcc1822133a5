//! Region eviction after catalog writes.
//!
//! Each [`Mutation`] names the regions whose entries may now be stale. Eviction is coarse:
//! a whole region is cleared, never a single key.

use std::sync::Arc;

use metrics::counter;
use tracing::{debug, info, warn};

use super::config::CacheConfig;
use super::regions::CacheRegion;
use super::store::CacheStore;

pub const METRIC_REGION_CLEAR: &str = "catalog_cache_region_clear_total";

const MANGA_REGIONS: &[CacheRegion] = &[
    CacheRegion::MangaList,
    CacheRegion::MangaDetail,
    CacheRegion::MangaSearch,
    CacheRegion::Featured,
    CacheRegion::Recommended,
    CacheRegion::Tags,
];

const MANGA_DELETE_REGIONS: &[CacheRegion] = &[
    CacheRegion::MangaList,
    CacheRegion::MangaDetail,
    CacheRegion::MangaSearch,
    CacheRegion::Featured,
    CacheRegion::Recommended,
    CacheRegion::Tags,
    CacheRegion::ChapterList,
];

const CHAPTER_REGIONS: &[CacheRegion] = &[CacheRegion::ChapterList, CacheRegion::MangaDetail];

/// A committed catalog write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    MangaImported { manga_id: i64 },
    MangaBatchImported { count: usize },
    /// Chapters cascade with the manga, so chapter lookups go stale too.
    MangaDeleted { manga_id: i64 },
    ChapterCreated { manga_id: i64, chapter_id: i64 },
    ChapterDeleted { manga_id: i64, chapter_id: i64 },
}

impl Mutation {
    pub fn kind(&self) -> &'static str {
        match self {
            Mutation::MangaImported { .. } => "manga_imported",
            Mutation::MangaBatchImported { .. } => "manga_batch_imported",
            Mutation::MangaDeleted { .. } => "manga_deleted",
            Mutation::ChapterCreated { .. } => "chapter_created",
            Mutation::ChapterDeleted { .. } => "chapter_deleted",
        }
    }

    pub fn regions(&self) -> &'static [CacheRegion] {
        match self {
            Mutation::MangaImported { .. } | Mutation::MangaBatchImported { .. } => MANGA_REGIONS,
            Mutation::MangaDeleted { .. } => MANGA_DELETE_REGIONS,
            Mutation::ChapterCreated { .. } | Mutation::ChapterDeleted { .. } => CHAPTER_REGIONS,
        }
    }
}

pub struct InvalidationCoordinator {
    config: CacheConfig,
    store: Arc<dyn CacheStore>,
}

impl InvalidationCoordinator {
    pub fn new(config: CacheConfig, store: Arc<dyn CacheStore>) -> Self {
        Self { config, store }
    }

    /// Evict the regions tagged by a committed mutation.
    pub async fn apply(&self, mutation: &Mutation) {
        if !self.config.enabled {
            debug!(mutation = mutation.kind(), "Invalidation skipped: cache disabled");
            return;
        }
        info!(
            mutation = mutation.kind(),
            regions = mutation.regions().len(),
            "Invalidating cache regions"
        );
        self.invalidate(mutation.regions()).await;
    }

    /// Clear every listed region. A failure on one region does not stop the others.
    pub async fn invalidate(&self, regions: &[CacheRegion]) {
        for region in regions {
            match self.store.clear_region(*region).await {
                Ok(()) => {
                    counter!(METRIC_REGION_CLEAR, "region" => region.name()).increment(1);
                    debug!(region = region.name(), "Cache region cleared");
                }
                Err(err) => {
                    warn!(
                        region = region.name(),
                        error = %err,
                        "Failed to clear cache region; entries expire by TTL"
                    );
                }
            }
        }
    }

    pub async fn manga_imported(&self, manga_id: i64) {
        self.apply(&Mutation::MangaImported { manga_id }).await;
    }

    pub async fn manga_batch_imported(&self, count: usize) {
        self.apply(&Mutation::MangaBatchImported { count }).await;
    }

    pub async fn manga_deleted(&self, manga_id: i64) {
        self.apply(&Mutation::MangaDeleted { manga_id }).await;
    }

    pub async fn chapter_created(&self, manga_id: i64, chapter_id: i64) {
        self.apply(&Mutation::ChapterCreated {
            manga_id,
            chapter_id,
        })
        .await;
    }

    pub async fn chapter_deleted(&self, manga_id: i64, chapter_id: i64) {
        self.apply(&Mutation::ChapterDeleted {
            manga_id,
            chapter_id,
        })
        .await;
    }
}
