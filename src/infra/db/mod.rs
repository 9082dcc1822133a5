//! Postgres-backed repository implementations.

mod catalog;
mod rows;
mod util;
mod writes;

pub use util::map_sqlx_error;

use std::sync::Arc;
use std::time::Duration;

use sqlx::{
    Postgres, QueryBuilder, Transaction,
    postgres::{PgPool, PgPoolOptions},
    query,
};

use crate::application::repos::{MangaFacet, RepoError};
use crate::domain::filters::SearchSort;

const MANGA_COLUMNS: &str = "m.id, m.title, m.old_name, m.description, m.cover_image, \
    m.detail_images, m.author, m.slogan, m.is_choiceness, m.is_recommend, m.is_new, m.period, \
    m.is_putaway, m.putaway_time, m.online_time, m.tendency, m.country, m.is_finish, \
    m.sort_order, m.view_count, m.favorite_count, \
    (SELECT COUNT(*) FROM chapters c WHERE c.manga_id = m.id) AS chapter_count, \
    m.tags, m.labels, m.source, m.created_at, m.updated_at";

const CHAPTER_COLUMNS: &str =
    "c.id, c.manga_id, c.title, c.chapter_number, c.view_count, c.page_urls, c.created_at";

const SHELF_ORDER: &str = " ORDER BY m.sort_order ASC, m.created_at DESC, m.id DESC";
const NEWEST_ORDER: &str = " ORDER BY m.created_at DESC, m.id DESC";

#[derive(Clone)]
pub struct PostgresRepositories {
    pool: Arc<PgPool>,
}

impl PostgresRepositories {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn begin(&self) -> Result<Transaction<'_, Postgres>, sqlx::Error> {
        self.pool.begin().await
    }

    pub async fn connect(
        url: &str,
        max_connections: u32,
        acquire_timeout: Duration,
    ) -> Result<PgPool, sqlx::Error> {
        PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(acquire_timeout)
            .connect(url)
            .await
    }

    pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
        sqlx::migrate!("./migrations")
            .run(pool)
            .await
            .map_err(Into::into)
    }

    pub async fn health_check(&self) -> Result<(), sqlx::Error> {
        query("SELECT 1").execute(self.pool()).await.map(|_| ())
    }

    /// Appends `AND ...` conditions after a `WHERE m.is_putaway` clause.
    fn push_facet_conditions(qb: &mut QueryBuilder<'_, Postgres>, facet: &MangaFacet) {
        match facet {
            MangaFacet::All | MangaFacet::Latest | MangaFacet::Popular => {}
            MangaFacet::Curated => {
                qb.push(" AND m.is_choiceness");
            }
            MangaFacet::Recommended => {
                qb.push(" AND m.is_recommend");
            }
            MangaFacet::NewReleases => {
                qb.push(" AND m.is_new");
            }
            MangaFacet::Country(country) => {
                qb.push(" AND m.country = ");
                qb.push_bind(country.clone());
            }
            MangaFacet::Audience(tendency) => {
                qb.push(" AND m.tendency = ");
                qb.push_bind(tendency.clone());
            }
            MangaFacet::Tag(tag) => {
                qb.push(" AND ");
                qb.push_bind(tag.clone());
                qb.push(" = ANY(m.tags)");
            }
        }
    }

    fn facet_order(facet: &MangaFacet) -> &'static str {
        match facet {
            MangaFacet::Latest | MangaFacet::NewReleases => NEWEST_ORDER,
            MangaFacet::Popular => " ORDER BY m.view_count DESC, m.id DESC",
            MangaFacet::All
            | MangaFacet::Curated
            | MangaFacet::Recommended
            | MangaFacet::Country(_)
            | MangaFacet::Audience(_)
            | MangaFacet::Tag(_) => SHELF_ORDER,
        }
    }

    fn push_search_conditions(
        qb: &mut QueryBuilder<'_, Postgres>,
        keyword: &str,
        tag: Option<&str>,
    ) {
        let pattern = format!("%{}%", escape_like(keyword));
        qb.push(" AND (m.title ILIKE ");
        qb.push_bind(pattern.clone());
        qb.push(" OR m.old_name ILIKE ");
        qb.push_bind(pattern.clone());
        qb.push(" OR m.author ILIKE ");
        qb.push_bind(pattern.clone());
        qb.push(" OR m.description ILIKE ");
        qb.push_bind(pattern);
        qb.push(")");

        if let Some(tag) = tag {
            qb.push(" AND ");
            qb.push_bind(tag.to_string());
            qb.push(" = ANY(m.tags)");
        }
    }

    fn search_order(sort: SearchSort) -> &'static str {
        match sort {
            SearchSort::Default => SHELF_ORDER,
            SearchSort::Updated => " ORDER BY m.updated_at DESC, m.id DESC",
            SearchSort::Created => NEWEST_ORDER,
        }
    }

    fn convert_count(value: i64) -> Result<i64, RepoError> {
        if value < 0 {
            return Err(RepoError::from_persistence("negative row count"));
        }
        Ok(value)
    }
}

/// `ILIKE` treats `%` and `_` as wildcards; a keyword matches them literally.
fn escape_like(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}
