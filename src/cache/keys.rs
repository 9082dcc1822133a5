//! Cache key definitions.
//!
//! Every catalog read is described by a [`CatalogQuery`]. Its [`QueryKey`] is built from the
//! operation name and every discriminating parameter, so two calls share an entry exactly
//! when they would return the same data.

use std::fmt;

use crate::application::pagination::PageRequest;
use crate::domain::filters::{SearchSort, TagFilter};

use super::regions::CacheRegion;

const SEPARATOR: char = ':';

/// Deterministic cache key inside one region.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QueryKey(String);

impl QueryKey {
    pub fn builder(operation: &'static str) -> QueryKeyBuilder {
        QueryKeyBuilder {
            buf: operation.to_string(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub struct QueryKeyBuilder {
    buf: String,
}

impl QueryKeyBuilder {
    /// Append one component, escaping the separator and the escape character.
    pub fn part(mut self, value: impl fmt::Display) -> Self {
        self.buf.push(SEPARATOR);
        for ch in value.to_string().chars() {
            match ch {
                '%' => self.buf.push_str("%25"),
                ':' => self.buf.push_str("%3A"),
                other => self.buf.push(other),
            }
        }
        self
    }

    pub fn page(self, request: PageRequest) -> Self {
        self.part(request.page()).part(request.size())
    }

    pub fn build(self) -> QueryKey {
        QueryKey(self.buf)
    }
}

/// A cacheable catalog read.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CatalogQuery {
    All(PageRequest),
    Latest(PageRequest),
    Popular(PageRequest),
    Curated(PageRequest),
    Recommended(PageRequest),
    NewReleases(PageRequest),
    ByCountry {
        country: String,
        page: PageRequest,
    },
    ByAudience {
        tendency: String,
        page: PageRequest,
    },
    ByTag {
        tag: String,
        page: PageRequest,
    },
    Search {
        keyword: String,
        tag: TagFilter,
        sort: SearchSort,
        page: PageRequest,
    },
    Related {
        exclude_id: i64,
        limit: u32,
    },
    Tags,
    Detail(i64),
    ChaptersByManga(i64),
    Chapter(i64),
    ChapterByNumber {
        manga_id: i64,
        number: i32,
    },
}

impl CatalogQuery {
    pub fn operation(&self) -> &'static str {
        match self {
            CatalogQuery::All(_) => "all",
            CatalogQuery::Latest(_) => "latest",
            CatalogQuery::Popular(_) => "popular",
            CatalogQuery::Curated(_) => "choiceness",
            CatalogQuery::Recommended(_) => "recommended",
            CatalogQuery::NewReleases(_) => "new",
            CatalogQuery::ByCountry { .. } => "country",
            CatalogQuery::ByAudience { .. } => "tendency",
            CatalogQuery::ByTag { .. } => "tag",
            CatalogQuery::Search { .. } => "search",
            CatalogQuery::Related { .. } => "related",
            CatalogQuery::Tags => "tags",
            CatalogQuery::Detail(_) => "detail",
            CatalogQuery::ChaptersByManga(_) => "manga",
            CatalogQuery::Chapter(_) => "chapter",
            CatalogQuery::ChapterByNumber { .. } => "mangaChapter",
        }
    }

    pub fn region(&self) -> CacheRegion {
        match self {
            CatalogQuery::All(_)
            | CatalogQuery::Latest(_)
            | CatalogQuery::NewReleases(_)
            | CatalogQuery::ByCountry { .. }
            | CatalogQuery::ByAudience { .. }
            | CatalogQuery::ByTag { .. } => CacheRegion::MangaList,
            CatalogQuery::Popular(_) | CatalogQuery::Curated(_) => CacheRegion::Featured,
            CatalogQuery::Recommended(_) | CatalogQuery::Related { .. } => {
                CacheRegion::Recommended
            }
            CatalogQuery::Search { .. } => CacheRegion::MangaSearch,
            CatalogQuery::Detail(_) => CacheRegion::MangaDetail,
            CatalogQuery::Tags => CacheRegion::Tags,
            CatalogQuery::ChaptersByManga(_)
            | CatalogQuery::Chapter(_)
            | CatalogQuery::ChapterByNumber { .. } => CacheRegion::ChapterList,
        }
    }

    pub fn key(&self) -> QueryKey {
        let builder = QueryKey::builder(self.operation());
        match self {
            CatalogQuery::All(page)
            | CatalogQuery::Latest(page)
            | CatalogQuery::Popular(page)
            | CatalogQuery::Curated(page)
            | CatalogQuery::Recommended(page)
            | CatalogQuery::NewReleases(page) => builder.page(*page),
            CatalogQuery::ByCountry { country, page } => builder.part(country).page(*page),
            CatalogQuery::ByAudience { tendency, page } => builder.part(tendency).page(*page),
            CatalogQuery::ByTag { tag, page } => builder.part(tag).page(*page),
            CatalogQuery::Search {
                keyword,
                tag,
                sort,
                page,
            } => builder
                .part(keyword)
                .part(tag.token())
                .part(sort)
                .page(*page),
            CatalogQuery::Related { exclude_id, limit } => builder.part(exclude_id).part(limit),
            CatalogQuery::Tags => builder.part("list"),
            CatalogQuery::Detail(id) | CatalogQuery::Chapter(id) => builder.part(id),
            CatalogQuery::ChaptersByManga(manga_id) => builder.part(manga_id),
            CatalogQuery::ChapterByNumber { manga_id, number } => {
                builder.part(manga_id).part(number)
            }
        }
        .build()
    }
}
