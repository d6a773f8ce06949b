//! Error types for i23d-studio
//!
//! Two layers: service modules carry their own error enums; this ApiError
//! maps them onto HTTP responses with a stable JSON shape.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::services::{ConvertError, MeshyError};

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Resource not found (404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Invalid request (400) - e.g. missing or unsupported image
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Conflict (409) - a generation session is already running
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Missing or unusable service configuration (503)
    #[error("Configuration error: {0}")]
    Config(String),

    /// The remote generation service rejected or failed a call (502)
    #[error(transparent)]
    Upstream(#[from] MeshyError),

    /// Mesh conversion failed (422)
    #[error(transparent)]
    Conversion(#[from] ConvertError),

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),

    /// Generic error
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg),
            ApiError::Config(msg) => (StatusCode::SERVICE_UNAVAILABLE, "CONFIG_ERROR", msg),
            ApiError::Upstream(ref err) => (
                StatusCode::BAD_GATEWAY,
                "UPSTREAM_ERROR",
                err.to_string(),
            ),
            ApiError::Conversion(ref err) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "CONVERSION_ERROR",
                err.to_string(),
            ),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", msg),
            ApiError::Other(ref err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                err.to_string(),
            ),
        };

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
