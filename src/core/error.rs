use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::shared::types::ApiResponse;

#[derive(Debug, Error)]
pub enum AppError {
    /// No authenticated identity, or the presented token is invalid
    #[error("Authentication required: {0}")]
    AuthRequired(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// A query, subscription or transport call to the document store failed.
    /// Callers degrade to an empty list rather than crash.
    #[error("Fetch failed: {0}")]
    TransientFetch(String),

    /// Bad resolution-submission input. Raised before any external side effect.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The resolution photo was uploaded but the document patch failed.
    /// The orphaned blob is not cleaned up; retrying uploads under a new key.
    #[error("Partial failure: {0}")]
    PartialFailure(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message, errors) = match self {
            AppError::AuthRequired(ref msg) => (StatusCode::UNAUTHORIZED, msg.clone(), None),
            AppError::NotFound(ref msg) => (StatusCode::NOT_FOUND, msg.clone(), None),
            AppError::TransientFetch(ref msg) => {
                tracing::error!("Store fetch failed: {}", msg);
                (StatusCode::BAD_GATEWAY, msg.clone(), None)
            }
            AppError::Validation(ref msg) => (
                StatusCode::BAD_REQUEST,
                msg.clone(),
                Some(vec![msg.clone()]),
            ),
            AppError::PartialFailure(ref msg) => {
                tracing::error!("Partial resolution failure: {}", msg);
                // Generic message only; the caller may retry
                (
                    StatusCode::BAD_GATEWAY,
                    "Failed to update report. Please try again.".to_string(),
                    None,
                )
            }
            AppError::BadRequest(ref msg) => (StatusCode::BAD_REQUEST, msg.clone(), None),
            AppError::Internal(ref msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                    None,
                )
            }
        };

        let body = Json(ApiResponse::<()>::error(Some(message), errors));

        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
