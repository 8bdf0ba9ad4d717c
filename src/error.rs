/// Unified error types for the CMS
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for the CMS
#[derive(Error, Debug)]
pub enum CmsError {
    /// Database errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Authentication errors
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Validation errors (bad or missing fields, unknown category)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Rejected upload: content type outside the allow-list, or the
    /// extension and declared type disagree
    #[error("Invalid file type: {0}")]
    InvalidFileType(String),

    /// Rejected upload: file exceeds the configured size limit
    #[error("File too large: {0}")]
    TooLarge(String),

    /// Underlying storage is unreachable; surfaced as 503 and safe to
    /// retry for idempotent operations
    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    /// Rate limiting errors
    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    /// Not found errors
    #[error("Not found: {0}")]
    NotFound(String),

    /// Conflict errors (e.g., duplicate email)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Internal server errors
    #[error("Internal error: {0}")]
    Internal(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Structured error response body
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

/// Convert CmsError to HTTP response
impl IntoResponse for CmsError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match &self {
            CmsError::Authentication(_) => (
                StatusCode::UNAUTHORIZED,
                "AuthenticationRequired",
                self.to_string(),
            ),
            CmsError::Validation(_) => (
                StatusCode::BAD_REQUEST,
                "InvalidRequest",
                self.to_string(),
            ),
            CmsError::InvalidFileType(_) => (
                StatusCode::BAD_REQUEST,
                "InvalidFileType",
                self.to_string(),
            ),
            CmsError::TooLarge(_) => (
                StatusCode::PAYLOAD_TOO_LARGE,
                "FileTooLarge",
                self.to_string(),
            ),
            CmsError::NotFound(_) => (StatusCode::NOT_FOUND, "NotFound", self.to_string()),
            CmsError::Conflict(_) => (StatusCode::CONFLICT, "Conflict", self.to_string()),
            CmsError::Unavailable(_) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "StorageUnavailable",
                self.to_string(),
            ),
            CmsError::RateLimitExceeded => (
                StatusCode::TOO_MANY_REQUESTS,
                "RateLimitExceeded",
                "Rate limit exceeded".to_string(),
            ),
            // A dead pool means the store is unreachable, not broken
            CmsError::Database(
                sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_),
            ) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "StorageUnavailable",
                "Storage temporarily unavailable".to_string(),
            ),
            CmsError::Database(_) | CmsError::Internal(_) | CmsError::Io(_) => {
                tracing::error!("internal error: {}", self);
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

/// Result type alias for CMS operations
pub type CmsResult<T> = Result<T, CmsError>;
