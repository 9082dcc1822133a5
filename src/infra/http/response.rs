use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::application::error::{AppError, ErrorReport};
use crate::application::repos::RepoError;

pub mod codes {
    pub const BAD_REQUEST: &str = "bad_request";
    pub const NOT_FOUND: &str = "not_found";
    pub const VALIDATION: &str = "validation_error";
    pub const CONFLICT: &str = "conflict";
    pub const DUPLICATE: &str = "duplicate";
    pub const INVALID_INPUT: &str = "invalid_input";
    pub const INTEGRITY: &str = "integrity_error";
    pub const DB_TIMEOUT: &str = "db_timeout";
    pub const REPO: &str = "repo_error";
}

/// JSON envelope shared by every catalog endpoint.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Json<Self> {
        Json(Self {
            success: true,
            message: None,
            code: None,
            data: Some(data),
        })
    }

    pub fn ok_with_message(data: T, message: impl Into<String>) -> Json<Self> {
        Json(Self {
            success: true,
            message: Some(message.into()),
            code: None,
            data: Some(data),
        })
    }
}

impl ApiResponse<()> {
    pub fn done(message: impl Into<String>) -> Json<Self> {
        Json(Self {
            success: true,
            message: Some(message.into()),
            code: None,
            data: None,
        })
    }
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: String,
    report: ErrorReport,
}

impl ApiError {
    pub fn new(
        source: &'static str,
        status: StatusCode,
        code: &'static str,
        message: impl Into<String>,
    ) -> Self {
        let message = message.into();
        Self {
            status,
            code,
            report: ErrorReport::from_message(source, status, format!("{code}: {message}")),
            message,
        }
    }

    pub fn bad_request(source: &'static str, message: impl Into<String>) -> Self {
        Self::new(source, StatusCode::BAD_REQUEST, codes::BAD_REQUEST, message)
    }

    /// Map a service error; server-side failures keep their detail out of the body.
    pub fn from_app(source: &'static str, err: AppError) -> Self {
        let status = err.status_code();
        let (code, message) = match &err {
            AppError::NotFound { .. } => (codes::NOT_FOUND, err.to_string()),
            AppError::Validation(message) => (codes::VALIDATION, message.clone()),
            AppError::Conflict(message) => (codes::CONFLICT, message.clone()),
            AppError::Repo(repo) => repo_code_and_message(repo),
        };
        Self {
            status,
            code,
            message,
            report: ErrorReport::from_error(source, status, &err),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn code(&self) -> &'static str {
        self.code
    }
}

fn repo_code_and_message(err: &RepoError) -> (&'static str, String) {
    match err {
        RepoError::NotFound => (codes::NOT_FOUND, "resource not found".to_string()),
        RepoError::Duplicate { .. } => (codes::DUPLICATE, "record already exists".to_string()),
        RepoError::InvalidInput { message } => (codes::INVALID_INPUT, message.clone()),
        RepoError::Integrity { .. } => (
            codes::INTEGRITY,
            "integrity constraint violated".to_string(),
        ),
        RepoError::Timeout => (codes::DB_TIMEOUT, "catalog store timed out".to_string()),
        RepoError::Persistence(_) => (codes::REPO, "catalog store unavailable".to_string()),
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::new(
            "infra::http::json",
            rejection.status(),
            codes::BAD_REQUEST,
            rejection.body_text(),
        )
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::bad_request("infra::http::query", rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self::bad_request("infra::http::path", rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ApiResponse::<()> {
            success: false,
            message: Some(self.message),
            code: Some(self.code),
            data: None,
        };
        let mut response = (self.status, Json(body)).into_response();
        self.report.attach(&mut response);
        response
    }
}
