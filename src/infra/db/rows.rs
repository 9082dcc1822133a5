use time::OffsetDateTime;

use crate::domain::assets::RelativePath;
use crate::domain::entities::{ChapterRecord, MangaRecord};

#[derive(sqlx::FromRow)]
pub(super) struct MangaRow {
    id: i64,
    title: String,
    old_name: Option<String>,
    description: Option<String>,
    cover_image: String,
    detail_images: Vec<String>,
    author: Option<String>,
    slogan: Option<String>,
    is_choiceness: bool,
    is_recommend: bool,
    is_new: bool,
    period: Option<String>,
    is_putaway: bool,
    putaway_time: Option<OffsetDateTime>,
    online_time: Option<OffsetDateTime>,
    tendency: Option<String>,
    country: Option<String>,
    is_finish: Option<String>,
    sort_order: i32,
    view_count: i64,
    favorite_count: i64,
    chapter_count: i64,
    tags: Vec<String>,
    labels: Vec<String>,
    source: Option<String>,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

impl From<MangaRow> for MangaRecord {
    fn from(row: MangaRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            old_name: row.old_name,
            description: row.description,
            cover_image: RelativePath::new(row.cover_image),
            detail_images: row.detail_images.iter().map(RelativePath::new).collect(),
            author: row.author,
            slogan: row.slogan,
            is_choiceness: row.is_choiceness,
            is_recommend: row.is_recommend,
            is_new: row.is_new,
            period: row.period,
            is_putaway: row.is_putaway,
            putaway_time: row.putaway_time,
            online_time: row.online_time,
            tendency: row.tendency,
            country: row.country,
            is_finish: row.is_finish,
            sort_order: row.sort_order,
            view_count: row.view_count,
            favorite_count: row.favorite_count,
            chapter_count: row.chapter_count,
            tags: row.tags,
            labels: row.labels,
            source: row.source,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
pub(super) struct ChapterRow {
    id: i64,
    manga_id: i64,
    title: String,
    chapter_number: i32,
    view_count: i64,
    page_urls: Vec<String>,
    created_at: OffsetDateTime,
}

impl From<ChapterRow> for ChapterRecord {
    fn from(row: ChapterRow) -> Self {
        Self {
            id: row.id,
            manga_id: row.manga_id,
            title: row.title,
            chapter_number: row.chapter_number,
            view_count: row.view_count,
            page_urls: row.page_urls.iter().map(RelativePath::new).collect(),
            created_at: row.created_at,
        }
    }
}
