use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Main error type for the application.
///
/// `Traversal` and `NotFound` carry no path; their response bodies are fixed
/// strings.
#[derive(Error, Debug)]
pub enum AppError {
    /// Resource not found error.
    #[error("Not found")]
    NotFound,

    /// Requested path resolves outside the book root.
    #[error("Path escapes the book root")]
    Traversal,

    /// Book root could not be scanned.
    #[error("Scan failed: {0}")]
    Scan(String),

    /// Cache entry could not be persisted.
    #[error("Cache write failed: {0}")]
    CacheWrite(String),

    /// I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// ZIP archive error.
    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// XML parsing error.
    #[error("XML parsing error: {0}")]
    Xml(#[from] roxmltree::Error),

    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            AppError::NotFound => (StatusCode::NOT_FOUND, "Not found"),
            AppError::Traversal => (StatusCode::FORBIDDEN, "Forbidden"),
            AppError::Scan(_) => (StatusCode::SERVICE_UNAVAILABLE, "Catalog unavailable"),
            _ => (StatusCode::INTERNAL_SERVER_ERROR, "Internal error"),
        };

        if status.is_server_error() {
            tracing::error!(error = %self, "Request error");
        } else {
            tracing::debug!(error = %self, "Request rejected");
        }

        (status, body).into_response()
    }
}

/// Result type alias for the application.
pub type Result<T> = std::result::Result<T, AppError>;
