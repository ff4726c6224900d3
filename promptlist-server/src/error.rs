//! Error types for promptlist-server
//!
//! Upstream failures are classified in their client modules
//! (`CompletionError`, `CatalogError`). Most of them never reach a caller:
//! the assembler degrades instead. `ApiError` is what an HTTP handler
//! returns when it cannot degrade.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use promptlist_common::api::ErrorResponse;
use thiserror::Error;

use crate::services::catalog_client::CatalogError;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Missing or invalid request input (400)
    #[error("{0}")]
    BadRequest(String),

    /// Missing or rejected catalog credential (401)
    #[error("{0}")]
    Unauthorized(String),

    /// Upstream service failed and no fallback applies (502)
    #[error("Upstream error: {0}")]
    Upstream(String),
}

impl From<CatalogError> for ApiError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::Unauthorized => {
                ApiError::Unauthorized("Catalog rejected the access token".to_string())
            }
            other => ApiError::Upstream(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code) = match &self {
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            ApiError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            ApiError::Upstream(_) => (StatusCode::BAD_GATEWAY, "UPSTREAM_ERROR"),
        };

        let body = Json(ErrorResponse::new(error_code, self.to_string()));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
