use std::sync::Arc;

use crate::application::cdn::PathTranslator;
use crate::application::error::AppError;
use crate::application::repos::CatalogRepo;
use crate::application::views::ChapterView;
use crate::cache::{CatalogQuery, QueryCache};
use crate::domain::entities::ChapterRecord;

/// Chapter reads, cached in the chapter region and translated after the cache.
pub struct ChapterReadService {
    repo: Arc<dyn CatalogRepo>,
    cache: Arc<QueryCache>,
    cdn: Arc<PathTranslator>,
}

impl ChapterReadService {
    pub fn new(repo: Arc<dyn CatalogRepo>, cache: Arc<QueryCache>, cdn: Arc<PathTranslator>) -> Self {
        Self { repo, cache, cdn }
    }

    pub async fn by_manga(&self, manga_id: i64) -> Result<Vec<ChapterView>, AppError> {
        let query = CatalogQuery::ChaptersByManga(manga_id);
        let records: Vec<ChapterRecord> = self
            .cache
            .get_or_compute(query.region(), &query.key(), || async {
                self.repo
                    .list_chapters(manga_id)
                    .await
                    .map_err(AppError::from)
            })
            .await?;
        Ok(records
            .into_iter()
            .map(|record| ChapterView::from_record(record, &self.cdn))
            .collect())
    }

    pub async fn by_id(&self, id: i64) -> Result<ChapterView, AppError> {
        let query = CatalogQuery::Chapter(id);
        let record: ChapterRecord = self
            .cache
            .get_or_compute(query.region(), &query.key(), || async {
                self.repo
                    .find_chapter(id)
                    .await?
                    .ok_or_else(|| AppError::not_found("chapter"))
            })
            .await?;
        Ok(ChapterView::from_record(record, &self.cdn))
    }

    pub async fn by_number(&self, manga_id: i64, number: i32) -> Result<ChapterView, AppError> {
        let query = CatalogQuery::ChapterByNumber { manga_id, number };
        let record: ChapterRecord = self
            .cache
            .get_or_compute(query.region(), &query.key(), || async {
                self.repo
                    .find_chapter_by_number(manga_id, number)
                    .await?
                    .ok_or_else(|| AppError::not_found("chapter"))
            })
            .await?;
        Ok(ChapterView::from_record(record, &self.cdn))
    }
}
