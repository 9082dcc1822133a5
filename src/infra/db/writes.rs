use async_trait::async_trait;
use sqlx::{PgConnection, QueryBuilder};

use crate::application::repos::{CatalogWriteRepo, RepoError};
use crate::domain::assets::RelativePath;
use crate::domain::entities::{ChapterRecord, MangaRecord, NewChapter, NewManga};

use super::rows::{ChapterRow, MangaRow};
use super::{CHAPTER_COLUMNS, MANGA_COLUMNS, PostgresRepositories, map_sqlx_error};

fn into_strings(paths: Vec<RelativePath>) -> Vec<String> {
    paths.into_iter().map(RelativePath::into_inner).collect()
}

async fn insert_manga_row(conn: &mut PgConnection, manga: NewManga) -> Result<i64, RepoError> {
    let NewManga {
        title,
        old_name,
        description,
        cover_image,
        detail_images,
        author,
        slogan,
        is_choiceness,
        is_recommend,
        is_new,
        period,
        is_putaway,
        putaway_time,
        online_time,
        tendency,
        country,
        is_finish,
        sort_order,
        tags,
        labels,
        source,
        chapters,
    } = manga;

    let id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO manga (
            title, old_name, description, cover_image, detail_images, author, slogan,
            is_choiceness, is_recommend, is_new, period, is_putaway, putaway_time,
            online_time, tendency, country, is_finish, sort_order, tags, labels, source
        )
        VALUES (
            $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11,
            $12, $13, $14, $15, $16, $17, $18, $19, $20, $21
        )
        RETURNING id
        "#,
    )
    .bind(title)
    .bind(old_name)
    .bind(description)
    .bind(cover_image.into_inner())
    .bind(into_strings(detail_images))
    .bind(author)
    .bind(slogan)
    .bind(is_choiceness)
    .bind(is_recommend)
    .bind(is_new)
    .bind(period)
    .bind(is_putaway)
    .bind(putaway_time)
    .bind(online_time)
    .bind(tendency)
    .bind(country)
    .bind(is_finish)
    .bind(sort_order)
    .bind(tags)
    .bind(labels)
    .bind(source)
    .fetch_one(&mut *conn)
    .await
    .map_err(map_sqlx_error)?;

    for chapter in chapters {
        insert_chapter_row(&mut *conn, id, chapter).await?;
    }

    Ok(id)
}

async fn insert_chapter_row(
    conn: &mut PgConnection,
    manga_id: i64,
    chapter: NewChapter,
) -> Result<ChapterRecord, RepoError> {
    let mut qb = QueryBuilder::new(
        "INSERT INTO chapters AS c (manga_id, title, chapter_number, page_urls) VALUES (",
    );
    qb.push_bind(manga_id);
    qb.push(", ");
    qb.push_bind(chapter.title);
    qb.push(", ");
    qb.push_bind(chapter.chapter_number);
    qb.push(", ");
    qb.push_bind(into_strings(chapter.page_urls));
    qb.push(") RETURNING ");
    qb.push(CHAPTER_COLUMNS);

    let row = qb
        .build_query_as::<ChapterRow>()
        .fetch_one(&mut *conn)
        .await
        .map_err(map_sqlx_error)?;

    Ok(ChapterRecord::from(row))
}

async fn fetch_manga_row(conn: &mut PgConnection, id: i64) -> Result<MangaRecord, RepoError> {
    let mut qb = QueryBuilder::new("SELECT ");
    qb.push(MANGA_COLUMNS);
    qb.push(" FROM manga m WHERE m.id = ");
    qb.push_bind(id);

    let row = qb
        .build_query_as::<MangaRow>()
        .fetch_one(&mut *conn)
        .await
        .map_err(map_sqlx_error)?;

    Ok(MangaRecord::from(row))
}

#[async_trait]
impl CatalogWriteRepo for PostgresRepositories {
    async fn insert_manga(&self, manga: NewManga) -> Result<MangaRecord, RepoError> {
        let mut tx = self.begin().await.map_err(map_sqlx_error)?;
        let id = insert_manga_row(&mut tx, manga).await?;
        let record = fetch_manga_row(&mut tx, id).await?;
        tx.commit().await.map_err(map_sqlx_error)?;
        Ok(record)
    }

    async fn insert_manga_batch(
        &self,
        batch: Vec<NewManga>,
    ) -> Result<Vec<MangaRecord>, RepoError> {
        let mut tx = self.begin().await.map_err(map_sqlx_error)?;
        let mut records = Vec::with_capacity(batch.len());
        for manga in batch {
            let id = insert_manga_row(&mut tx, manga).await?;
            records.push(fetch_manga_row(&mut tx, id).await?);
        }
        tx.commit().await.map_err(map_sqlx_error)?;
        Ok(records)
    }

    async fn delete_manga(&self, id: i64) -> Result<bool, RepoError> {
        let result = sqlx::query("DELETE FROM manga WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(result.rows_affected() > 0)
    }

    async fn insert_chapter(
        &self,
        manga_id: i64,
        chapter: NewChapter,
    ) -> Result<ChapterRecord, RepoError> {
        let mut tx = self.begin().await.map_err(map_sqlx_error)?;

        let touched = sqlx::query("UPDATE manga SET updated_at = now() WHERE id = $1")
            .bind(manga_id)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;
        if touched.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }

        let record = insert_chapter_row(&mut tx, manga_id, chapter).await?;
        tx.commit().await.map_err(map_sqlx_error)?;
        Ok(record)
    }

    async fn delete_chapter(&self, id: i64) -> Result<Option<ChapterRecord>, RepoError> {
        let mut qb = QueryBuilder::new("DELETE FROM chapters AS c WHERE c.id = ");
        qb.push_bind(id);
        qb.push(" RETURNING ");
        qb.push(CHAPTER_COLUMNS);

        let row = qb
            .build_query_as::<ChapterRow>()
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(row.map(ChapterRecord::from))
    }

    async fn increment_manga_views(&self, id: i64) -> Result<bool, RepoError> {
        let result = sqlx::query("UPDATE manga SET view_count = view_count + 1 WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(result.rows_affected() > 0)
    }

    async fn increment_chapter_views(&self, id: i64) -> Result<bool, RepoError> {
        let result =
            sqlx::query("UPDATE chapters SET view_count = view_count + 1 WHERE id = $1")
                .bind(id)
                .execute(self.pool())
                .await
                .map_err(map_sqlx_error)?;
        Ok(result.rows_affected() > 0)
    }
}
