//! Catalog browsing.
//!
//! Every read validates its input, goes through the query cache with relative-path records,
//! and translates asset paths only after the cache has answered.

use std::sync::Arc;

use crate::application::cdn::PathTranslator;
use crate::application::error::AppError;
use crate::application::pagination::{Page, PageRequest};
use crate::application::repos::{CatalogRepo, MangaFacet, MangaSearch};
use crate::application::views::{MangaView, TagsView};
use crate::cache::{CatalogQuery, QueryCache};
use crate::domain::entities::{MangaRecord, TagList};
use crate::domain::filters::{self, SearchSort, TagFilter};

pub const DEFAULT_RELATED_LIMIT: u32 = 6;
pub const MAX_RELATED_LIMIT: u32 = 50;

/// Raw search parameters as received from a client.
#[derive(Debug, Clone, Default)]
pub struct SearchParams {
    pub keyword: String,
    pub tag: Option<String>,
    pub sort: Option<String>,
}

pub struct CatalogReadService {
    repo: Arc<dyn CatalogRepo>,
    cache: Arc<QueryCache>,
    cdn: Arc<PathTranslator>,
}

impl CatalogReadService {
    pub fn new(repo: Arc<dyn CatalogRepo>, cache: Arc<QueryCache>, cdn: Arc<PathTranslator>) -> Self {
        Self { repo, cache, cdn }
    }

    pub async fn all(&self, page: PageRequest) -> Result<Page<MangaView>, AppError> {
        self.facet(CatalogQuery::All(page), MangaFacet::All, page).await
    }

    pub async fn latest(&self, page: PageRequest) -> Result<Page<MangaView>, AppError> {
        self.facet(CatalogQuery::Latest(page), MangaFacet::Latest, page)
            .await
    }

    pub async fn popular(&self, page: PageRequest) -> Result<Page<MangaView>, AppError> {
        self.facet(CatalogQuery::Popular(page), MangaFacet::Popular, page)
            .await
    }

    pub async fn curated(&self, page: PageRequest) -> Result<Page<MangaView>, AppError> {
        self.facet(CatalogQuery::Curated(page), MangaFacet::Curated, page)
            .await
    }

    pub async fn recommended(&self, page: PageRequest) -> Result<Page<MangaView>, AppError> {
        self.facet(CatalogQuery::Recommended(page), MangaFacet::Recommended, page)
            .await
    }

    pub async fn new_releases(&self, page: PageRequest) -> Result<Page<MangaView>, AppError> {
        self.facet(CatalogQuery::NewReleases(page), MangaFacet::NewReleases, page)
            .await
    }

    pub async fn by_country(
        &self,
        country: &str,
        page: PageRequest,
    ) -> Result<Page<MangaView>, AppError> {
        let country = filters::classification_code("country", country)?;
        let query = CatalogQuery::ByCountry {
            country: country.clone(),
            page,
        };
        self.facet(query, MangaFacet::Country(country), page).await
    }

    pub async fn by_audience(
        &self,
        tendency: &str,
        page: PageRequest,
    ) -> Result<Page<MangaView>, AppError> {
        let tendency = filters::classification_code("tendency", tendency)?;
        let query = CatalogQuery::ByAudience {
            tendency: tendency.clone(),
            page,
        };
        self.facet(query, MangaFacet::Audience(tendency), page).await
    }

    pub async fn by_tag(&self, tag: &str, page: PageRequest) -> Result<Page<MangaView>, AppError> {
        let tag = filters::tag_name(tag)?;
        let query = CatalogQuery::ByTag {
            tag: tag.clone(),
            page,
        };
        self.facet(query, MangaFacet::Tag(tag), page).await
    }

    /// Keyword search; an absent tag equals `all` and an absent sort equals `default`.
    pub async fn search(
        &self,
        params: &SearchParams,
        page: PageRequest,
    ) -> Result<Page<MangaView>, AppError> {
        let keyword = filters::keyword(&params.keyword)?;
        let tag = TagFilter::parse_optional(params.tag.as_deref())?;
        let sort = SearchSort::parse_optional(params.sort.as_deref())?;

        let search = MangaSearch {
            keyword: keyword.clone(),
            tag: tag.as_tag().map(str::to_string),
            sort,
        };
        let query = CatalogQuery::Search {
            keyword,
            tag,
            sort,
            page,
        };
        let records: Page<MangaRecord> = self
            .cache
            .get_or_compute(query.region(), &query.key(), || async {
                self.repo
                    .search_manga(&search, page)
                    .await
                    .map_err(AppError::from)
            })
            .await?;
        Ok(self.translate_page(records))
    }

    /// Random selection excluding `id`; stable for one `(id, limit)` until the entry expires.
    pub async fn related(&self, id: i64, limit: Option<u32>) -> Result<Vec<MangaView>, AppError> {
        let limit = limit.unwrap_or(DEFAULT_RELATED_LIMIT);
        if limit == 0 || limit > MAX_RELATED_LIMIT {
            return Err(AppError::validation(format!(
                "limit must be between 1 and {MAX_RELATED_LIMIT}"
            )));
        }
        let query = CatalogQuery::Related {
            exclude_id: id,
            limit,
        };
        let records: Vec<MangaRecord> = self
            .cache
            .get_or_compute(query.region(), &query.key(), || async {
                self.repo
                    .sample_manga(id, limit)
                    .await
                    .map_err(AppError::from)
            })
            .await?;
        Ok(self.translate_all(records))
    }

    pub async fn tags(&self) -> Result<TagsView, AppError> {
        let query = CatalogQuery::Tags;
        let list: TagList = self
            .cache
            .get_or_compute(query.region(), &query.key(), || async {
                let tags = self.repo.list_tags().await?;
                Ok::<_, AppError>(TagList { tags })
            })
            .await?;
        Ok(TagsView { tags: list.tags })
    }

    /// Missing manga are reported as [`AppError::NotFound`] and never cached.
    pub async fn detail(&self, id: i64) -> Result<MangaView, AppError> {
        let query = CatalogQuery::Detail(id);
        let record: MangaRecord = self
            .cache
            .get_or_compute(query.region(), &query.key(), || async {
                self.repo
                    .find_manga(id)
                    .await?
                    .ok_or_else(|| AppError::not_found("manga"))
            })
            .await?;
        Ok(MangaView::from_record(record, &self.cdn))
    }

    async fn facet(
        &self,
        query: CatalogQuery,
        facet: MangaFacet,
        page: PageRequest,
    ) -> Result<Page<MangaView>, AppError> {
        let records: Page<MangaRecord> = self
            .cache
            .get_or_compute(query.region(), &query.key(), || async {
                self.repo
                    .list_manga(&facet, page)
                    .await
                    .map_err(AppError::from)
            })
            .await?;
        Ok(self.translate_page(records))
    }

    fn translate_page(&self, records: Page<MangaRecord>) -> Page<MangaView> {
        records.map(|record| MangaView::from_record(record, &self.cdn))
    }

    fn translate_all(&self, records: Vec<MangaRecord>) -> Vec<MangaView> {
        records
            .into_iter()
            .map(|record| MangaView::from_record(record, &self.cdn))
            .collect()
    }
}
