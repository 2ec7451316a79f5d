//! Error types for log distribution.

use crate::types::Level;
use thiserror::Error;

/// Main error type for logger, medium and transport operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed record: {0}")]
    MalformedRecord(String),

    #[error("Level {0} cannot be attached to a record")]
    InvalidLevel(Level),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Sink failed: {0}")]
    Sink(String),

    #[error("Background delivery thread panicked")]
    WorkerPanicked,

    #[error("Unknown medium: {0}")]
    UnknownMedium(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::MalformedRecord(e.to_string())
    }
}

/// Result type for logcast operations.
pub type Result<T> = std::result::Result<T, Error>;
