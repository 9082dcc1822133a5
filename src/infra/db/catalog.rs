use async_trait::async_trait;
use sqlx::{Postgres, QueryBuilder};

use crate::application::pagination::{Page, PageRequest};
use crate::application::repos::{CatalogRepo, MangaFacet, MangaSearch, RepoError};
use crate::domain::entities::{ChapterRecord, MangaRecord};

use super::rows::{ChapterRow, MangaRow};
use super::{CHAPTER_COLUMNS, MANGA_COLUMNS, PostgresRepositories, map_sqlx_error};

impl PostgresRepositories {
    async fn fetch_page(
        &self,
        mut select: QueryBuilder<'_, Postgres>,
        mut count: QueryBuilder<'_, Postgres>,
        page: PageRequest,
    ) -> Result<Page<MangaRecord>, RepoError> {
        let total: i64 = count
            .build_query_scalar()
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        let total = Self::convert_count(total)?;

        if total == 0 || page.offset() >= total {
            return Ok(Page::new(Vec::new(), page, total));
        }

        select.push(" LIMIT ");
        select.push_bind(page.limit());
        select.push(" OFFSET ");
        select.push_bind(page.offset());

        let rows = select
            .build_query_as::<MangaRow>()
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(Page::new(
            rows.into_iter().map(MangaRecord::from).collect(),
            page,
            total,
        ))
    }
}

fn listed_select() -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new("SELECT ");
    qb.push(MANGA_COLUMNS);
    qb.push(" FROM manga m WHERE m.is_putaway");
    qb
}

fn listed_count() -> QueryBuilder<'static, Postgres> {
    QueryBuilder::new("SELECT COUNT(*) FROM manga m WHERE m.is_putaway")
}

#[async_trait]
impl CatalogRepo for PostgresRepositories {
    async fn list_manga(
        &self,
        facet: &MangaFacet,
        page: PageRequest,
    ) -> Result<Page<MangaRecord>, RepoError> {
        let mut select = listed_select();
        Self::push_facet_conditions(&mut select, facet);
        select.push(Self::facet_order(facet));

        let mut count = listed_count();
        Self::push_facet_conditions(&mut count, facet);

        self.fetch_page(select, count, page).await
    }

    async fn search_manga(
        &self,
        search: &MangaSearch,
        page: PageRequest,
    ) -> Result<Page<MangaRecord>, RepoError> {
        let tag = search.tag.as_deref();

        let mut select = listed_select();
        Self::push_search_conditions(&mut select, &search.keyword, tag);
        select.push(Self::search_order(search.sort));

        let mut count = listed_count();
        Self::push_search_conditions(&mut count, &search.keyword, tag);

        self.fetch_page(select, count, page).await
    }

    async fn find_manga(&self, id: i64) -> Result<Option<MangaRecord>, RepoError> {
        let mut qb = QueryBuilder::new("SELECT ");
        qb.push(MANGA_COLUMNS);
        qb.push(" FROM manga m WHERE m.id = ");
        qb.push_bind(id);

        let row = qb
            .build_query_as::<MangaRow>()
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(row.map(MangaRecord::from))
    }

    async fn sample_manga(
        &self,
        exclude_id: i64,
        limit: u32,
    ) -> Result<Vec<MangaRecord>, RepoError> {
        let mut qb = listed_select();
        qb.push(" AND m.id <> ");
        qb.push_bind(exclude_id);
        qb.push(" ORDER BY random() LIMIT ");
        qb.push_bind(i64::from(limit));

        let rows = qb
            .build_query_as::<MangaRow>()
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(MangaRecord::from).collect())
    }

    async fn list_tags(&self) -> Result<Vec<String>, RepoError> {
        sqlx::query_scalar::<_, String>(
            r#"
            SELECT DISTINCT t.tag
            FROM manga m
            CROSS JOIN LATERAL unnest(m.tags) AS t(tag)
            WHERE m.is_putaway
            ORDER BY t.tag
            "#,
        )
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)
    }

    async fn list_chapters(&self, manga_id: i64) -> Result<Vec<ChapterRecord>, RepoError> {
        let mut qb = QueryBuilder::new("SELECT ");
        qb.push(CHAPTER_COLUMNS);
        qb.push(" FROM chapters c WHERE c.manga_id = ");
        qb.push_bind(manga_id);
        qb.push(" ORDER BY c.chapter_number ASC");

        let rows = qb
            .build_query_as::<ChapterRow>()
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(ChapterRecord::from).collect())
    }

    async fn find_chapter(&self, id: i64) -> Result<Option<ChapterRecord>, RepoError> {
        let mut qb = QueryBuilder::new("SELECT ");
        qb.push(CHAPTER_COLUMNS);
        qb.push(" FROM chapters c WHERE c.id = ");
        qb.push_bind(id);

        let row = qb
            .build_query_as::<ChapterRow>()
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(row.map(ChapterRecord::from))
    }

    async fn find_chapter_by_number(
        &self,
        manga_id: i64,
        number: i32,
    ) -> Result<Option<ChapterRecord>, RepoError> {
        let mut qb = QueryBuilder::new("SELECT ");
        qb.push(CHAPTER_COLUMNS);
        qb.push(" FROM chapters c WHERE c.manga_id = ");
        qb.push_bind(manga_id);
        qb.push(" AND c.chapter_number = ");
        qb.push_bind(number);

        let row = qb
            .build_query_as::<ChapterRow>()
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(row.map(ChapterRecord::from))
    }
}
