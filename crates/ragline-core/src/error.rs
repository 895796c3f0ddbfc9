//! Error types for ragline-core

use thiserror::Error;

/// Result type alias using ragline-core Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the conversation runtime
#[derive(Error, Debug)]
pub enum Error {
    /// An error from the client layer
    #[error(transparent)]
    Client(#[from] ragline_client::Error),

    /// Reading or writing the storage substrate failed
    #[error("Storage error: {0}")]
    Storage(#[from] std::io::Error),

    /// The storage substrate refused a write because it is full
    #[error("Storage quota exceeded ({needed} bytes needed, {available} available)")]
    QuotaExceeded { needed: usize, available: usize },

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
