//! Response shapes. Asset locators here are delivery URLs and are never cached.

use serde::Serialize;
use time::OffsetDateTime;

use crate::application::cdn::PathTranslator;
use crate::domain::assets::AbsoluteUrl;
use crate::domain::entities::{ChapterRecord, MangaRecord};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MangaView {
    pub id: i64,
    pub title: String,
    pub old_name: Option<String>,
    pub description: Option<String>,
    pub cover_image_url: AbsoluteUrl,
    pub detail_images: Vec<AbsoluteUrl>,
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

impl MangaView {
    pub fn from_record(record: MangaRecord, cdn: &PathTranslator) -> Self {
        Self {
            cover_image_url: cdn.absolute(&record.cover_image),
            detail_images: record
                .detail_images
                .iter()
                .map(|path| cdn.absolute(path))
                .collect(),
            id: record.id,
            title: record.title,
            old_name: record.old_name,
            description: record.description,
            author: record.author,
            slogan: record.slogan,
            is_choiceness: record.is_choiceness,
            is_recommend: record.is_recommend,
            is_new: record.is_new,
            period: record.period,
            is_putaway: record.is_putaway,
            putaway_time: record.putaway_time,
            online_time: record.online_time,
            tendency: record.tendency,
            country: record.country,
            is_finish: record.is_finish,
            sort_order: record.sort_order,
            view_count: record.view_count,
            favorite_count: record.favorite_count,
            chapter_count: record.chapter_count,
            tags: record.tags,
            labels: record.labels,
            source: record.source,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChapterView {
    pub id: i64,
    pub manga_id: i64,
    pub title: String,
    pub chapter_number: i32,
    pub view_count: i64,
    pub page_urls: Vec<AbsoluteUrl>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl ChapterView {
    pub fn from_record(record: ChapterRecord, cdn: &PathTranslator) -> Self {
        Self {
            page_urls: record.page_urls.iter().map(|path| cdn.absolute(path)).collect(),
            id: record.id,
            manga_id: record.manga_id,
            title: record.title,
            chapter_number: record.chapter_number,
            view_count: record.view_count,
            created_at: record.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BannerView {
    pub image_url: AbsoluteUrl,
    pub title: Option<String>,
    pub link: Option<String>,
    pub manga_id: Option<i64>,
    pub sort_order: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnouncementView {
    pub title: String,
    pub content: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub link: Option<String>,
    pub sort_order: i32,
}

#[derive(Debug, Clone, Serialize)]
pub struct AvatarView {
    pub urls: Vec<AbsoluteUrl>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TagsView {
    pub tags: Vec<String>,
}
