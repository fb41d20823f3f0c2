//! Shared error taxonomy for the server crate. Each module that needs its
//! own kind defines one (`ProviderError` in `providers`, `QueueError` in
//! `queue`); this module holds the ones that cross the HTTP boundary.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),
    #[error("row had an invalid value: {0}")]
    InvalidRow(String),
}

/// Errors surfaced to an HTTP client by the dispatcher.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("a job is already active")]
    Conflict { existing_job_id: String },
    #[error("not found")]
    NotFound,
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
    #[error("internal error")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for DispatchError {
    fn into_response(self) -> Response {
        match self {
            DispatchError::Validation(msg) => {
                (StatusCode::BAD_REQUEST, Json(json!({ "error": msg }))).into_response()
            }
            DispatchError::Conflict { existing_job_id } => (
                StatusCode::CONFLICT,
                Json(json!({ "error": "job already active", "job_id": existing_job_id })),
            )
                .into_response(),
            DispatchError::NotFound => {
                (StatusCode::NOT_FOUND, Json(json!({ "error": "not found" }))).into_response()
            }
            other => {
                tracing::error!(error = %other, "unhandled dispatch error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": "internal error" })),
                )
                    .into_response()
            }
        }
    }
}
