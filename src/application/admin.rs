//! Catalog writes.
//!
//! Incoming asset locators may be delivery URLs or relative paths; both are reduced to
//! normalized relative paths before they reach the store. Cache regions are evicted only
//! after the store has committed.

use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

use serde::Deserialize;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{OffsetDateTime, PrimitiveDateTime};
use tracing::info;

use crate::application::cdn::PathTranslator;
use crate::application::error::AppError;
use crate::application::repos::{CatalogWriteRepo, RepoError};
use crate::application::views::{ChapterView, MangaView};
use crate::cache::InvalidationCoordinator;
use crate::domain::assets::RelativePath;
use crate::domain::entities::{NewChapter, NewManga};
use crate::domain::filters;

// Column widths of the `manga` and `chapters` tables, in characters.
const MAX_TITLE_LEN: usize = 255;
const MAX_OLD_NAME_LEN: usize = 255;
const MAX_AUTHOR_LEN: usize = 100;
const MAX_SLOGAN_LEN: usize = 200;
const MAX_PERIOD_LEN: usize = 50;
const MAX_IS_FINISH_LEN: usize = 2;
const MAX_SOURCE_LEN: usize = 100;
pub const MAX_BATCH_SIZE: usize = 200;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MangaImportRequest {
    pub title: String,
    pub old_name: Option<String>,
    pub description: Option<String>,
    pub cover_image_url: String,
    pub detail_images: Option<Vec<String>>,
    pub author: Option<String>,
    pub slogan: Option<String>,
    pub is_choiceness: Option<bool>,
    pub is_recommend: Option<bool>,
    pub is_new: Option<bool>,
    pub period: Option<String>,
    pub is_putaway: Option<bool>,
    pub putaway_time: Option<String>,
    pub online_time: Option<String>,
    pub tendency: Option<String>,
    pub country: Option<String>,
    pub is_finish: Option<String>,
    pub sort_order: Option<i32>,
    pub tags: Option<Vec<String>>,
    pub labels: Option<Vec<String>>,
    pub source: Option<String>,
    pub chapters: Option<Vec<ChapterImportRequest>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChapterImportRequest {
    pub title: String,
    pub chapter_number: i32,
    pub page_urls: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChapterCreateRequest {
    pub manga_id: i64,
    pub title: String,
    pub chapter_number: i32,
    pub page_urls: Vec<String>,
}

pub struct CatalogWriteService {
    repo: Arc<dyn CatalogWriteRepo>,
    invalidation: Arc<InvalidationCoordinator>,
    cdn: Arc<PathTranslator>,
}

impl CatalogWriteService {
    pub fn new(
        repo: Arc<dyn CatalogWriteRepo>,
        invalidation: Arc<InvalidationCoordinator>,
        cdn: Arc<PathTranslator>,
    ) -> Self {
        Self {
            repo,
            invalidation,
            cdn,
        }
    }

    pub async fn import(&self, request: MangaImportRequest) -> Result<MangaView, AppError> {
        let manga = self.prepare_manga(request)?;
        let record = self.repo.insert_manga(manga).await.map_err(write_error)?;
        info!(manga_id = record.id, title = %record.title, "Imported manga");
        self.invalidation.manga_imported(record.id).await;
        Ok(MangaView::from_record(record, &self.cdn))
    }

    /// Import every request or none of them.
    pub async fn batch_import(
        &self,
        requests: Vec<MangaImportRequest>,
    ) -> Result<Vec<MangaView>, AppError> {
        if requests.is_empty() {
            return Err(AppError::validation("batch must contain at least one manga"));
        }
        if requests.len() > MAX_BATCH_SIZE {
            return Err(AppError::validation(format!(
                "batch exceeds {MAX_BATCH_SIZE} manga"
            )));
        }
        let batch = requests
            .into_iter()
            .enumerate()
            .map(|(index, request)| {
                self.prepare_manga(request).map_err(|err| match err {
                    AppError::Validation(message) => {
                        AppError::Validation(format!("item {index}: {message}"))
                    }
                    other => other,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let records = self
            .repo
            .insert_manga_batch(batch)
            .await
            .map_err(write_error)?;
        info!(count = records.len(), "Imported manga batch");
        self.invalidation.manga_batch_imported(records.len()).await;
        Ok(records
            .into_iter()
            .map(|record| MangaView::from_record(record, &self.cdn))
            .collect())
    }

    pub async fn delete(&self, id: i64) -> Result<(), AppError> {
        if !self.repo.delete_manga(id).await? {
            return Err(AppError::not_found("manga"));
        }
        info!(manga_id = id, "Deleted manga");
        self.invalidation.manga_deleted(id).await;
        Ok(())
    }

    pub async fn create_chapter(
        &self,
        request: ChapterCreateRequest,
    ) -> Result<ChapterView, AppError> {
        let chapter = self.prepare_chapter(ChapterImportRequest {
            title: request.title,
            chapter_number: request.chapter_number,
            page_urls: request.page_urls,
        })?;
        let record = match self.repo.insert_chapter(request.manga_id, chapter).await {
            Ok(record) => record,
            Err(RepoError::NotFound) => return Err(AppError::not_found("manga")),
            Err(err) => return Err(write_error(err)),
        };
        info!(
            manga_id = record.manga_id,
            chapter_id = record.id,
            chapter_number = record.chapter_number,
            "Created chapter"
        );
        self.invalidation
            .chapter_created(record.manga_id, record.id)
            .await;
        Ok(ChapterView::from_record(record, &self.cdn))
    }

    pub async fn delete_chapter(&self, id: i64) -> Result<(), AppError> {
        let Some(removed) = self.repo.delete_chapter(id).await? else {
            return Err(AppError::not_found("chapter"));
        };
        info!(manga_id = removed.manga_id, chapter_id = id, "Deleted chapter");
        self.invalidation.chapter_deleted(removed.manga_id, id).await;
        Ok(())
    }

    /// Bump a manga's view counter. Cached listings pick it up when their entries expire.
    pub async fn record_manga_view(&self, id: i64) -> Result<(), AppError> {
        if !self.repo.increment_manga_views(id).await? {
            return Err(AppError::not_found("manga"));
        }
        Ok(())
    }

    pub async fn record_chapter_view(&self, id: i64) -> Result<(), AppError> {
        if !self.repo.increment_chapter_views(id).await? {
            return Err(AppError::not_found("chapter"));
        }
        Ok(())
    }

    fn prepare_manga(&self, request: MangaImportRequest) -> Result<NewManga, AppError> {
        let title = within("title", required("title", &request.title)?, MAX_TITLE_LEN)?;
        let cover = required("coverImageUrl", &request.cover_image_url)?;

        let chapters = request
            .chapters
            .unwrap_or_default()
            .into_iter()
            .map(|chapter| self.prepare_chapter(chapter))
            .collect::<Result<Vec<_>, _>>()?;
        let mut numbers = HashSet::new();
        if let Some(duplicate) = chapters
            .iter()
            .find(|chapter| !numbers.insert(chapter.chapter_number))
        {
            return Err(AppError::validation(format!(
                "chapter number {} appears more than once",
                duplicate.chapter_number
            )));
        }

        Ok(NewManga {
            title,
            old_name: bounded("oldName", request.old_name, MAX_OLD_NAME_LEN)?,
            description: optional(request.description),
            cover_image: self.cdn.relative(&cover),
            detail_images: self.relative_all(request.detail_images.unwrap_or_default()),
            author: bounded("author", request.author, MAX_AUTHOR_LEN)?,
            slogan: bounded("slogan", request.slogan, MAX_SLOGAN_LEN)?,
            is_choiceness: request.is_choiceness.unwrap_or(false),
            is_recommend: request.is_recommend.unwrap_or(false),
            is_new: request.is_new.unwrap_or(false),
            period: bounded("period", request.period, MAX_PERIOD_LEN)?,
            is_putaway: request.is_putaway.unwrap_or(true),
            putaway_time: parse_time("putawayTime", request.putaway_time)?,
            online_time: parse_time("onlineTime", request.online_time)?,
            tendency: code("tendency", request.tendency)?,
            country: code("country", request.country)?,
            is_finish: bounded("isFinish", request.is_finish, MAX_IS_FINISH_LEN)?,
            sort_order: request.sort_order.unwrap_or(0),
            tags: distinct(request.tags),
            labels: distinct(request.labels),
            source: bounded("source", request.source, MAX_SOURCE_LEN)?,
            chapters,
        })
    }

    fn prepare_chapter(&self, request: ChapterImportRequest) -> Result<NewChapter, AppError> {
        let title = within(
            "chapter title",
            required("chapter title", &request.title)?,
            MAX_TITLE_LEN,
        )?;
        if request.chapter_number < 0 {
            return Err(AppError::validation("chapter number must not be negative"));
        }
        let page_urls = self.relative_all(request.page_urls);
        if page_urls.is_empty() {
            return Err(AppError::validation("chapter needs at least one page"));
        }
        Ok(NewChapter {
            title,
            chapter_number: request.chapter_number,
            page_urls,
        })
    }

    /// Blank entries are dropped.
    fn relative_all(&self, inputs: Vec<String>) -> Vec<RelativePath> {
        inputs
            .iter()
            .filter(|input| !input.trim().is_empty())
            .map(|input| self.cdn.relative(input))
            .collect()
    }
}

fn write_error(err: RepoError) -> AppError {
    match err {
        RepoError::Duplicate { constraint } => {
            AppError::conflict(format!("record already exists ({constraint})"))
        }
        other => AppError::Repo(other),
    }
}

fn required(field: &str, value: &str) -> Result<String, AppError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::validation(format!("{field} is required")));
    }
    Ok(trimmed.to_string())
}

fn optional(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn within(field: &str, value: String, max: usize) -> Result<String, AppError> {
    if value.chars().count() > max {
        return Err(AppError::validation(format!(
            "{field} exceeds {max} characters"
        )));
    }
    Ok(value)
}

/// Trimmed optional text that must fit its column.
fn bounded(field: &str, value: Option<String>, max: usize) -> Result<Option<String>, AppError> {
    optional(value)
        .map(|value| within(field, value, max))
        .transpose()
}

fn code(field: &'static str, value: Option<String>) -> Result<Option<String>, AppError> {
    optional(value)
        .map(|value| filters::classification_code(field, &value))
        .transpose()
        .map_err(AppError::from)
}

fn distinct(values: Option<Vec<String>>) -> Vec<String> {
    values
        .unwrap_or_default()
        .into_iter()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Accepts RFC 3339, or a local `YYYY-MM-DDTHH:MM:SS` timestamp taken as UTC.
fn parse_time(field: &str, value: Option<String>) -> Result<Option<OffsetDateTime>, AppError> {
    let Some(raw) = optional(value) else {
        return Ok(None);
    };
    if let Ok(parsed) = OffsetDateTime::parse(&raw, &Rfc3339) {
        return Ok(Some(parsed));
    }
    let local = format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]");
    PrimitiveDateTime::parse(&raw, local)
        .map(|parsed| Some(parsed.assume_utc()))
        .map_err(|err| AppError::validation(format!("{field} `{raw}` is not a timestamp: {err}")))
}
