use std::sync::Arc;

use axum::{
    Router,
    extract::{
        Path, Query, State,
        rejection::{PathRejection, QueryRejection},
    },
    http::{
        HeaderValue, StatusCode,
        header::{CACHE_CONTROL, LOCATION},
    },
    middleware,
    response::{IntoResponse, Response},
    routing::get,
};
use serde::Deserialize;
use tracing::warn;

use crate::application::{
    admin::CatalogWriteService,
    catalog::{CatalogReadService, SearchParams},
    cdn::PathTranslator,
    chapters::ChapterReadService,
    pagination::PageRequest,
    showcase::ShowcaseService,
};
use crate::domain::assets::RelativePath;

use super::{
    HealthCheck, db_health_response,
    middleware::{log_responses, set_request_context},
    response::{ApiError, ApiResponse},
};

const SOURCE: &str = "infra::http::public";

#[derive(Clone)]
pub struct HttpState {
    pub catalog: Arc<CatalogReadService>,
    pub chapters: Arc<ChapterReadService>,
    pub showcase: Arc<ShowcaseService>,
    /// View counters only; catalog writes live on the admin listener.
    pub views: Arc<CatalogWriteService>,
    pub cdn: Arc<PathTranslator>,
    pub health: Arc<dyn HealthCheck>,
}

pub fn build_router(state: HttpState) -> Router {
    Router::new()
        .route("/api/manga", get(all_manga))
        .route("/api/manga/latest", get(latest_manga))
        .route("/api/manga/popular", get(popular_manga))
        .route("/api/manga/choiceness", get(curated_manga))
        .route("/api/manga/recommended", get(recommended_manga))
        .route("/api/manga/new", get(new_manga))
        .route("/api/manga/country/{country}", get(manga_by_country))
        .route("/api/manga/tendency/{tendency}", get(manga_by_audience))
        .route("/api/manga/tag/{tag}", get(manga_by_tag))
        .route("/api/manga/search", get(search_manga))
        .route("/api/manga/tags", get(list_tags))
        .route("/api/manga/{id}", get(manga_detail))
        .route("/api/manga/{id}/related", get(related_manga))
        .route("/api/chapters/manga/{manga_id}", get(chapters_by_manga))
        .route(
            "/api/chapters/manga/{manga_id}/chapter/{number}",
            get(chapter_by_number),
        )
        .route("/api/chapters/{id}", get(chapter_by_id))
        .route("/api/banners", get(banners))
        .route("/api/avatars", get(avatars))
        .route("/api/announcements", get(announcements))
        .route("/assets/{*path}", get(asset_redirect))
        .route("/health", get(health))
        .with_state(state)
        .layer(middleware::from_fn(log_responses))
        .layer(middleware::from_fn(set_request_context))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PageQuery {
    page: Option<u32>,
    size: Option<u32>,
}

impl PageQuery {
    fn request(&self) -> Result<PageRequest, ApiError> {
        PageRequest::from_query(self.page, self.size)
            .map_err(|err| ApiError::from_app(SOURCE, err.into()))
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SearchQuery {
    keyword: String,
    tag: Option<String>,
    sort: Option<String>,
    page: Option<u32>,
    size: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RelatedQuery {
    limit: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct AssetQuery {
    fallback: bool,
}

type HandlerResult = Result<Response, ApiError>;

async fn all_manga(
    State(state): State<HttpState>,
    query: Result<Query<PageQuery>, QueryRejection>,
) -> HandlerResult {
    let Query(query) = query?;
    let page = state
        .catalog
        .all(query.request()?)
        .await
        .map_err(|err| ApiError::from_app(SOURCE, err))?;
    Ok(ApiResponse::ok(page).into_response())
}

async fn latest_manga(
    State(state): State<HttpState>,
    query: Result<Query<PageQuery>, QueryRejection>,
) -> HandlerResult {
    let Query(query) = query?;
    let page = state
        .catalog
        .latest(query.request()?)
        .await
        .map_err(|err| ApiError::from_app(SOURCE, err))?;
    Ok(ApiResponse::ok(page).into_response())
}

async fn popular_manga(
    State(state): State<HttpState>,
    query: Result<Query<PageQuery>, QueryRejection>,
) -> HandlerResult {
    let Query(query) = query?;
    let page = state
        .catalog
        .popular(query.request()?)
        .await
        .map_err(|err| ApiError::from_app(SOURCE, err))?;
    Ok(ApiResponse::ok(page).into_response())
}

async fn curated_manga(
    State(state): State<HttpState>,
    query: Result<Query<PageQuery>, QueryRejection>,
) -> HandlerResult {
    let Query(query) = query?;
    let page = state
        .catalog
        .curated(query.request()?)
        .await
        .map_err(|err| ApiError::from_app(SOURCE, err))?;
    Ok(ApiResponse::ok(page).into_response())
}

async fn recommended_manga(
    State(state): State<HttpState>,
    query: Result<Query<PageQuery>, QueryRejection>,
) -> HandlerResult {
    let Query(query) = query?;
    let page = state
        .catalog
        .recommended(query.request()?)
        .await
        .map_err(|err| ApiError::from_app(SOURCE, err))?;
    Ok(ApiResponse::ok(page).into_response())
}

async fn new_manga(
    State(state): State<HttpState>,
    query: Result<Query<PageQuery>, QueryRejection>,
) -> HandlerResult {
    let Query(query) = query?;
    let page = state
        .catalog
        .new_releases(query.request()?)
        .await
        .map_err(|err| ApiError::from_app(SOURCE, err))?;
    Ok(ApiResponse::ok(page).into_response())
}

async fn manga_by_country(
    State(state): State<HttpState>,
    Path(country): Path<String>,
    query: Result<Query<PageQuery>, QueryRejection>,
) -> HandlerResult {
    let Query(query) = query?;
    let page = state
        .catalog
        .by_country(&country, query.request()?)
        .await
        .map_err(|err| ApiError::from_app(SOURCE, err))?;
    Ok(ApiResponse::ok(page).into_response())
}

async fn manga_by_audience(
    State(state): State<HttpState>,
    Path(tendency): Path<String>,
    query: Result<Query<PageQuery>, QueryRejection>,
) -> HandlerResult {
    let Query(query) = query?;
    let page = state
        .catalog
        .by_audience(&tendency, query.request()?)
        .await
        .map_err(|err| ApiError::from_app(SOURCE, err))?;
    Ok(ApiResponse::ok(page).into_response())
}

async fn manga_by_tag(
    State(state): State<HttpState>,
    Path(tag): Path<String>,
    query: Result<Query<PageQuery>, QueryRejection>,
) -> HandlerResult {
    let Query(query) = query?;
    let page = state
        .catalog
        .by_tag(&tag, query.request()?)
        .await
        .map_err(|err| ApiError::from_app(SOURCE, err))?;
    Ok(ApiResponse::ok(page).into_response())
}

async fn search_manga(
    State(state): State<HttpState>,
    query: Result<Query<SearchQuery>, QueryRejection>,
) -> HandlerResult {
    let Query(query) = query?;
    let page = PageRequest::from_query(query.page, query.size)
        .map_err(|err| ApiError::from_app(SOURCE, err.into()))?;
    let params = SearchParams {
        keyword: query.keyword,
        tag: query.tag,
        sort: query.sort,
    };
    let results = state
        .catalog
        .search(&params, page)
        .await
        .map_err(|err| ApiError::from_app(SOURCE, err))?;
    Ok(ApiResponse::ok(results).into_response())
}

async fn list_tags(State(state): State<HttpState>) -> HandlerResult {
    let tags = state
        .catalog
        .tags()
        .await
        .map_err(|err| ApiError::from_app(SOURCE, err))?;
    Ok(ApiResponse::ok(tags).into_response())
}

async fn manga_detail(
    State(state): State<HttpState>,
    path: Result<Path<i64>, PathRejection>,
) -> HandlerResult {
    let Path(id) = path?;
    let manga = state
        .catalog
        .detail(id)
        .await
        .map_err(|err| ApiError::from_app(SOURCE, err))?;

    if let Err(err) = state.views.record_manga_view(id).await {
        warn!(
            target = "manga_catalog::http::views",
            manga_id = id,
            error = %err,
            "failed to record manga view"
        );
    }

    Ok(ApiResponse::ok(manga).into_response())
}

async fn related_manga(
    State(state): State<HttpState>,
    path: Result<Path<i64>, PathRejection>,
    query: Result<Query<RelatedQuery>, QueryRejection>,
) -> HandlerResult {
    let Path(id) = path?;
    let Query(query) = query?;
    let related = state
        .catalog
        .related(id, query.limit)
        .await
        .map_err(|err| ApiError::from_app(SOURCE, err))?;
    Ok(ApiResponse::ok(related).into_response())
}

async fn chapters_by_manga(
    State(state): State<HttpState>,
    path: Result<Path<i64>, PathRejection>,
) -> HandlerResult {
    let Path(manga_id) = path?;
    let chapters = state
        .chapters
        .by_manga(manga_id)
        .await
        .map_err(|err| ApiError::from_app(SOURCE, err))?;
    Ok(ApiResponse::ok(chapters).into_response())
}

async fn chapter_by_id(
    State(state): State<HttpState>,
    path: Result<Path<i64>, PathRejection>,
) -> HandlerResult {
    let Path(id) = path?;
    let chapter = state
        .chapters
        .by_id(id)
        .await
        .map_err(|err| ApiError::from_app(SOURCE, err))?;

    record_chapter_view(&state, chapter.id).await;
    Ok(ApiResponse::ok(chapter).into_response())
}

async fn chapter_by_number(
    State(state): State<HttpState>,
    path: Result<Path<(i64, i32)>, PathRejection>,
) -> HandlerResult {
    let Path((manga_id, number)) = path?;
    let chapter = state
        .chapters
        .by_number(manga_id, number)
        .await
        .map_err(|err| ApiError::from_app(SOURCE, err))?;

    record_chapter_view(&state, chapter.id).await;
    Ok(ApiResponse::ok(chapter).into_response())
}

async fn record_chapter_view(state: &HttpState, chapter_id: i64) {
    if let Err(err) = state.views.record_chapter_view(chapter_id).await {
        warn!(
            target = "manga_catalog::http::views",
            chapter_id,
            error = %err,
            "failed to record chapter view"
        );
    }
}

async fn banners(State(state): State<HttpState>) -> Response {
    ApiResponse::ok(state.showcase.banners()).into_response()
}

async fn avatars(State(state): State<HttpState>) -> Response {
    ApiResponse::ok(state.showcase.avatars()).into_response()
}

async fn announcements(State(state): State<HttpState>) -> Response {
    ApiResponse::ok(state.showcase.announcements()).into_response()
}

/// Redirects a stored relative path to its delivery URL.
async fn asset_redirect(
    State(state): State<HttpState>,
    Path(path): Path<String>,
    query: Result<Query<AssetQuery>, QueryRejection>,
) -> HandlerResult {
    let Query(query) = query?;
    let relative = RelativePath::new(&path);
    if relative.is_empty() {
        return Err(ApiError::bad_request(SOURCE, "asset path is empty"));
    }

    let location = state
        .cdn
        .redirect_location(&relative, query.fallback)
        .and_then(|target| HeaderValue::from_str(&target).ok())
        .ok_or_else(|| ApiError::bad_request(SOURCE, "asset path is not a valid location"))?;
    let cache_control =
        HeaderValue::from_str(&format!("public, max-age={}", state.cdn.cache_max_age()))
            .map_err(|err| ApiError::bad_request(SOURCE, err.to_string()))?;

    Ok((
        StatusCode::FOUND,
        [(LOCATION, location), (CACHE_CONTROL, cache_control)],
    )
        .into_response())
}

async fn health(State(state): State<HttpState>) -> Response {
    db_health_response(state.health.ping().await)
}
