//! Error types for ragline-client

use thiserror::Error;

/// Result type alias using ragline-client Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur when talking to a RAG backend
#[derive(Error, Debug)]
pub enum Error {
    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Server answered with a non-success status
    #[error("HTTP {status} {reason}")]
    Status { status: u16, reason: String },

    /// Server-sent events error
    #[error("SSE error: {0}")]
    Sse(String),

    /// Endpoint could not be used as a request target
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

impl Error {
    /// Build a status error from a reqwest status code
    pub fn status(status: reqwest::StatusCode) -> Self {
        Self::Status {
            status: status.as_u16(),
            reason: status.canonical_reason().unwrap_or_default().to_string(),
        }
    }
}
