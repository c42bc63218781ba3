//! API Errors

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;
use wishtree_storage::StorageError;

/// Message returned to clients for any internal failure
pub const INTERNAL_ERROR_MESSAGE: &str = "Internal server error";

/// Errors returned by route handlers
#[derive(Debug, Error)]
pub enum ApiError {
    /// Rejected client input
    #[error("{0}")]
    Validation(String),
    /// Requested data does not exist
    #[error("{0}")]
    NotFound(String),
    /// Storage or other server-side failure; the detail stays in the logs
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Failure envelope
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub success: bool,
    pub error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Validation(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::Internal(detail) => {
                error!("Request failed: {}", detail);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    INTERNAL_ERROR_MESSAGE.to_string(),
                )
            }
        };

        let body = ErrorBody {
            success: false,
            error: message,
        };
        (status, Json(body)).into_response()
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        ApiError::Internal(err.to_string())
    }
}
