//! Error types for the stream client

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StreamError {
    /// The relay answered with an error envelope
    #[error("{message}")]
    Relay { status: u16, message: String },

    /// The byte stream failed while reading
    #[error("Stream error: {0}")]
    Transport(String),

    #[error("A question or an image is required")]
    EmptyTurn,

    /// Only `data:` images travel inside a relay request
    #[error("Images must be attached inline as data URLs")]
    RemoteImage,

    #[error("Store error: {0}")]
    Store(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl StreamError {
    /// HTTP status reported by the relay, if this error came from one
    pub fn relay_status(&self) -> Option<u16> {
        match self {
            StreamError::Relay { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Result type alias for stream client operations
pub type Result<T> = std::result::Result<T, StreamError>;
