//! Domain entities mirrored from persistent storage.
//!
//! Every asset field is a [`RelativePath`]; these records are safe to cache as-is.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::domain::assets::RelativePath;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MangaRecord {
    pub id: i64,
    pub title: String,
    pub old_name: Option<String>,
    pub description: Option<String>,
    pub cover_image: RelativePath,
    pub detail_images: Vec<RelativePath>,
    pub author: Option<String>,
    pub slogan: Option<String>,
    pub is_choiceness: bool,
    pub is_recommend: bool,
    pub is_new: bool,
    pub period: Option<String>,
    pub is_putaway: bool,
    #[serde(with = "time::serde::rfc3339::option")]
    pub putaway_time: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub online_time: Option<OffsetDateTime>,
    pub tendency: Option<String>,
    pub country: Option<String>,
    pub is_finish: Option<String>,
    pub sort_order: i32,
    pub view_count: i64,
    pub favorite_count: i64,
    pub chapter_count: i64,
    pub tags: Vec<String>,
    pub labels: Vec<String>,
    pub source: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChapterRecord {
    pub id: i64,
    pub manga_id: i64,
    pub title: String,
    pub chapter_number: i32,
    pub view_count: i64,
    pub page_urls: Vec<RelativePath>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Distinct tag names across listed manga, in lexical order.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TagList {
    pub tags: Vec<String>,
}

/// A manga ready to be inserted, with asset locators already reduced to relative form.
#[derive(Debug, Clone)]
pub struct NewManga {
    pub title: String,
    pub old_name: Option<String>,
    pub description: Option<String>,
    pub cover_image: RelativePath,
    pub detail_images: Vec<RelativePath>,
    pub author: Option<String>,
    pub slogan: Option<String>,
    pub is_choiceness: bool,
    pub is_recommend: bool,
    pub is_new: bool,
    pub period: Option<String>,
    pub is_putaway: bool,
    pub putaway_time: Option<OffsetDateTime>,
    pub online_time: Option<OffsetDateTime>,
    pub tendency: Option<String>,
    pub country: Option<String>,
    pub is_finish: Option<String>,
    pub sort_order: i32,
    pub tags: Vec<String>,
    pub labels: Vec<String>,
    pub source: Option<String>,
    pub chapters: Vec<NewChapter>,
}

#[derive(Debug, Clone)]
pub struct NewChapter {
    pub title: String,
    pub chapter_number: i32,
    pub page_urls: Vec<RelativePath>,
}
