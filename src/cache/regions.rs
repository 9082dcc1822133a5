//! Named cache regions and their freshness windows.

use std::fmt;
use std::time::Duration;

const MINUTE: u64 = 60;
const HOUR: u64 = 60 * MINUTE;

/// A partition of the query cache with one TTL and whole-region eviction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CacheRegion {
    MangaList,
    MangaDetail,
    MangaSearch,
    ChapterList,
    Recommended,
    Featured,
    Tags,
}

impl CacheRegion {
    pub const ALL: [CacheRegion; 7] = [
        CacheRegion::MangaList,
        CacheRegion::MangaDetail,
        CacheRegion::MangaSearch,
        CacheRegion::ChapterList,
        CacheRegion::Recommended,
        CacheRegion::Featured,
        CacheRegion::Tags,
    ];

    /// Stable region name, used in logs and metric labels.
    pub fn name(&self) -> &'static str {
        match self {
            CacheRegion::MangaList => "mangaList",
            CacheRegion::MangaDetail => "mangaDetail",
            CacheRegion::MangaSearch => "mangaSearch",
            CacheRegion::ChapterList => "chapterList",
            CacheRegion::Recommended => "recommended",
            CacheRegion::Featured => "featured",
            CacheRegion::Tags => "tags",
        }
    }

    pub fn default_ttl(&self) -> Duration {
        let seconds = match self {
            CacheRegion::MangaList => HOUR,
            CacheRegion::MangaDetail => 2 * HOUR,
            CacheRegion::MangaSearch => HOUR,
            CacheRegion::ChapterList => 2 * HOUR,
            CacheRegion::Recommended => 30 * MINUTE,
            CacheRegion::Featured => 30 * MINUTE,
            CacheRegion::Tags => HOUR,
        };
        Duration::from_secs(seconds)
    }

    pub(crate) fn index(&self) -> usize {
        match self {
            CacheRegion::MangaList => 0,
            CacheRegion::MangaDetail => 1,
            CacheRegion::MangaSearch => 2,
            CacheRegion::ChapterList => 3,
            CacheRegion::Recommended => 4,
            CacheRegion::Featured => 5,
            CacheRegion::Tags => 6,
        }
    }
}

impl fmt::Display for CacheRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
