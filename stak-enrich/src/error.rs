//! Error types for stak-enrich HTTP handlers

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::services::enrichment_orchestrator::EnrichmentError;
use crate::services::enrichment_queue::QueueError;
use crate::services::match_scorer::MatchScoreError;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Resource not found (404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Conflict (409) - e.g., profile id already taken
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Background queue cannot accept work (503)
    #[error("Service unavailable: {0}")]
    Unavailable(String),

    /// Generative-text service failed (502)
    #[error("Upstream error: {0}")]
    Upstream(String),

    /// stak-common error
    #[error("Common error: {0}")]
    Common(#[from] stak_common::Error),
}

impl From<EnrichmentError> for ApiError {
    fn from(err: EnrichmentError) -> Self {
        match err {
            EnrichmentError::NotFound(id) => ApiError::NotFound(format!("profile {}", id)),
            EnrichmentError::ConsentDenied => ApiError::BadRequest(err.to_string()),
            EnrichmentError::Persistence(e) => ApiError::Common(e),
        }
    }
}

impl From<QueueError> for ApiError {
    fn from(err: QueueError) -> Self {
        ApiError::Unavailable(err.to_string())
    }
}

impl From<MatchScoreError> for ApiError {
    fn from(err: MatchScoreError) -> Self {
        match err {
            MatchScoreError::NotFound(id) => ApiError::NotFound(format!("profile {}", id)),
            MatchScoreError::Llm(e) => ApiError::Upstream(e.to_string()),
            MatchScoreError::Malformed(msg) => ApiError::Upstream(msg),
            MatchScoreError::Persistence(e) => ApiError::Common(e),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg),
            ApiError::Unavailable(msg) => {
                (StatusCode::SERVICE_UNAVAILABLE, "QUEUE_UNAVAILABLE", msg)
            }
            ApiError::Upstream(msg) => (StatusCode::BAD_GATEWAY, "UPSTREAM_ERROR", msg),
            ApiError::Common(stak_common::Error::NotFound(msg)) => {
                (StatusCode::NOT_FOUND, "NOT_FOUND", msg)
            }
            ApiError::Common(stak_common::Error::InvalidInput(msg)) => {
                (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg)
            }
            ApiError::Common(ref err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "COMMON_ERROR",
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
