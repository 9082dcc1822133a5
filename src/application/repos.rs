use async_trait::async_trait;
use thiserror::Error;

use crate::application::pagination::{Page, PageRequest};
use crate::domain::entities::{ChapterRecord, MangaRecord, NewChapter, NewManga};
use crate::domain::filters::SearchSort;

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("duplicate record violates unique constraint `{constraint}`")]
    Duplicate { constraint: String },
    #[error("resource not found")]
    NotFound,
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
    #[error("integrity error: {message}")]
    Integrity { message: String },
    #[error("database timeout")]
    Timeout,
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }
}

/// Listing facets over manga that are on the shelf (`is_putaway`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MangaFacet {
    /// Manual sort order, newest first.
    All,
    /// Newest first.
    Latest,
    /// Most viewed first.
    Popular,
    /// Editor's choice only.
    Curated,
    Recommended,
    /// Flagged as new, newest first.
    NewReleases,
    Country(String),
    Audience(String),
    Tag(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MangaSearch {
    /// Case-insensitive substring over title, former name, author and description.
    pub keyword: String,
    pub tag: Option<String>,
    pub sort: SearchSort,
}

#[async_trait]
pub trait CatalogRepo: Send + Sync {
    async fn list_manga(
        &self,
        facet: &MangaFacet,
        page: PageRequest,
    ) -> Result<Page<MangaRecord>, RepoError>;

    async fn search_manga(
        &self,
        search: &MangaSearch,
        page: PageRequest,
    ) -> Result<Page<MangaRecord>, RepoError>;

    async fn find_manga(&self, id: i64) -> Result<Option<MangaRecord>, RepoError>;

    /// Random listed manga other than `exclude_id`.
    async fn sample_manga(&self, exclude_id: i64, limit: u32)
    -> Result<Vec<MangaRecord>, RepoError>;

    /// Distinct tags of listed manga, sorted.
    async fn list_tags(&self) -> Result<Vec<String>, RepoError>;

    /// Chapters of one manga ordered by chapter number.
    async fn list_chapters(&self, manga_id: i64) -> Result<Vec<ChapterRecord>, RepoError>;

    async fn find_chapter(&self, id: i64) -> Result<Option<ChapterRecord>, RepoError>;

    async fn find_chapter_by_number(
        &self,
        manga_id: i64,
        number: i32,
    ) -> Result<Option<ChapterRecord>, RepoError>;
}

#[async_trait]
pub trait CatalogWriteRepo: Send + Sync {
    /// Insert one manga with its chapters atomically.
    async fn insert_manga(&self, manga: NewManga) -> Result<MangaRecord, RepoError>;

    /// Insert every manga or none of them.
    async fn insert_manga_batch(&self, batch: Vec<NewManga>)
    -> Result<Vec<MangaRecord>, RepoError>;

    /// Delete a manga and its chapters. Returns `false` when no such manga exists.
    async fn delete_manga(&self, id: i64) -> Result<bool, RepoError>;

    /// Fails with [`RepoError::NotFound`] for an unknown manga and
    /// [`RepoError::Duplicate`] when the chapter number is taken.
    async fn insert_chapter(
        &self,
        manga_id: i64,
        chapter: NewChapter,
    ) -> Result<ChapterRecord, RepoError>;

    /// Returns the removed chapter, or `None` when it did not exist.
    async fn delete_chapter(&self, id: i64) -> Result<Option<ChapterRecord>, RepoError>;

    async fn increment_manga_views(&self, id: i64) -> Result<bool, RepoError>;

    async fn increment_chapter_views(&self, id: i64) -> Result<bool, RepoError>;
}
