/// Unified error types for Kindred
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for the service
#[derive(Error, Debug)]
pub enum KindredError {
    /// Single-statement store errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A multi-statement transaction aborted and was rolled back
    #[error("Transaction aborted: {0}")]
    Transaction(String),

    /// Malformed input, rejected before any store mutation
    #[error("Validation error: {0}")]
    Validation(String),

    /// Missing row, or a row owned by another user
    #[error("Not found: {0}")]
    NotFound(String),

    /// Caller identity missing or unknown
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Invite token past its expiry
    #[error("Expired: {0}")]
    Expired(String),

    /// Internal server errors
    #[error("Internal error: {0}")]
    Internal(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl KindredError {
    /// Wrap a store error raised inside a transaction
    pub fn transaction(err: impl std::fmt::Display) -> Self {
        KindredError::Transaction(err.to_string())
    }
}

/// JSON error response format
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

impl IntoResponse for KindredError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            KindredError::Validation(_) => {
                (StatusCode::BAD_REQUEST, "InvalidRequest", self.to_string())
            }
            KindredError::NotFound(_) => (StatusCode::NOT_FOUND, "NotFound", self.to_string()),
            KindredError::Unauthorized(_) => (
                StatusCode::UNAUTHORIZED,
                "AuthenticationRequired",
                self.to_string(),
            ),
            KindredError::Expired(_) => (StatusCode::GONE, "Expired", self.to_string()),
            KindredError::Transaction(_) => {
                tracing::error!("{}", self);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "TransactionAborted",
                    "The operation was rolled back".to_string(),
                )
            }
            KindredError::Database(_) | KindredError::Internal(_) | KindredError::Io(_) => {
                tracing::error!("{}", self);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "InternalServerError",
                    "Internal server error".to_string(), // Don't leak details
                )
            }
        };

        let body = Json(ErrorResponse {
            error: error_code.to_string(),
            message,
        });

        (status, body).into_response()
    }
}

/// Result type alias for Kindred operations
pub type KindredResult<T> = Result<T, KindredError>;
