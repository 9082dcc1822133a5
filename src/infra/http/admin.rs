use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{
        DefaultBodyLimit, Path, State,
        rejection::{JsonRejection, PathRejection},
    },
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
};

use crate::application::admin::{CatalogWriteService, ChapterCreateRequest, MangaImportRequest};

use super::{
    HealthCheck, db_health_response,
    middleware::{log_responses, set_request_context},
    response::{ApiError, ApiResponse},
};

const SOURCE: &str = "infra::http::admin";

/// Batch imports carry full chapter page lists.
const ADMIN_BODY_LIMIT_BYTES: usize = 16 * 1024 * 1024;

#[derive(Clone)]
pub struct AdminState {
    pub writes: Arc<CatalogWriteService>,
    pub health: Arc<dyn HealthCheck>,
}

pub fn build_admin_router(state: AdminState) -> Router {
    Router::new()
        .route("/api/admin/manga/import", post(import_manga))
        .route("/api/admin/manga/batch-import", post(batch_import_manga))
        .route("/api/admin/manga/{id}", delete(delete_manga))
        .route("/api/admin/chapters/{id}", delete(delete_chapter))
        .route("/api/chapters", post(create_chapter))
        .route("/health", get(health))
        .with_state(state)
        .layer(DefaultBodyLimit::max(ADMIN_BODY_LIMIT_BYTES))
        .layer(middleware::from_fn(log_responses))
        .layer(middleware::from_fn(set_request_context))
}

async fn import_manga(
    State(state): State<AdminState>,
    body: Result<Json<MangaImportRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(request) = body?;
    let manga = state
        .writes
        .import(request)
        .await
        .map_err(|err| ApiError::from_app(SOURCE, err))?;
    Ok((
        StatusCode::CREATED,
        ApiResponse::ok_with_message(manga, "manga imported"),
    )
        .into_response())
}

async fn batch_import_manga(
    State(state): State<AdminState>,
    body: Result<Json<Vec<MangaImportRequest>>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(requests) = body?;
    let imported = state
        .writes
        .batch_import(requests)
        .await
        .map_err(|err| ApiError::from_app(SOURCE, err))?;
    let message = format!("{} manga imported", imported.len());
    Ok((
        StatusCode::CREATED,
        ApiResponse::ok_with_message(imported, message),
    )
        .into_response())
}

async fn delete_manga(
    State(state): State<AdminState>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<Response, ApiError> {
    let Path(id) = path?;
    state
        .writes
        .delete(id)
        .await
        .map_err(|err| ApiError::from_app(SOURCE, err))?;
    Ok(ApiResponse::done("manga deleted").into_response())
}

async fn create_chapter(
    State(state): State<AdminState>,
    body: Result<Json<ChapterCreateRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(request) = body?;
    let chapter = state
        .writes
        .create_chapter(request)
        .await
        .map_err(|err| ApiError::from_app(SOURCE, err))?;
    Ok((
        StatusCode::CREATED,
        ApiResponse::ok_with_message(chapter, "chapter created"),
    )
        .into_response())
}

async fn delete_chapter(
    State(state): State<AdminState>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<Response, ApiError> {
    let Path(id) = path?;
    state
        .writes
        .delete_chapter(id)
        .await
        .map_err(|err| ApiError::from_app(SOURCE, err))?;
    Ok(ApiResponse::done("chapter deleted").into_response())
}

async fn health(State(state): State<AdminState>) -> Response {
    db_health_response(state.health.ping().await)
}
