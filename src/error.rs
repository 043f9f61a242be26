//! Error types for mentorchat.

use thiserror::Error;

/// Common error type for mentorchat.
#[derive(Error, Debug)]
pub enum ChatError {
    /// HTTP request to the backend failed or returned a non-success status.
    #[error("HTTP error: {0}")]
    Http(String),

    /// The backend rejected the session cookie.
    #[error("not authenticated: {0}")]
    Unauthorized(String),

    /// Real-time transport error.
    #[error("transport error: {0}")]
    Transport(String),

    /// Inbound frame could not be decoded.
    #[error("frame error: {0}")]
    Frame(#[from] crate::chat::FrameError),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Validation error for user input.
    #[error("validation error: {0}")]
    Validation(String),

    /// Resource not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding or decoding error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<reqwest::Error> for ChatError {
    fn from(e: reqwest::Error) -> Self {
        ChatError::Http(e.to_string())
    }
}

/// Result type alias for mentorchat operations.
pub type Result<T> = std::result::Result<T, ChatError>;
