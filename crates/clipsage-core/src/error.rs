//! Error types for ClipSage.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// The backend answered with a failure. The message is user-facing.
    #[error("{0}")]
    Backend(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Backend channel disconnected")]
    Disconnected,

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
