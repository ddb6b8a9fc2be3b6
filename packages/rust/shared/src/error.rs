//! Error types for chatdesk.
//!
//! Library crates use [`ChatdeskError`] via `thiserror`.
//! The CLI app wraps this with `color-eyre` for rich diagnostics.
//!
//! The taxonomy mirrors how each failure degrades: a channel error costs one
//! message, an ingestion error costs one batch, a persistence error costs one
//! save. None of them are process-fatal and none trigger automatic retries.

use std::path::PathBuf;

/// Top-level error type for all chatdesk operations.
#[derive(Debug, thiserror::Error)]
pub enum ChatdeskError {
    /// Chat transport failure (send or receive on the session channel).
    #[error("channel error: {0}")]
    Channel(String),

    /// Scrape or upload batch failure; the staging buffer is left untouched.
    #[error("ingestion error: {0}")]
    Ingestion(String),

    /// Department CRUD failure; caller keeps form state for retry.
    #[error("persistence error: {0}")]
    Persistence(String),

    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Data validation error (bad provenance source, malformed input, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, ChatdeskError>;

impl ChatdeskError {
    /// Create a channel error from any displayable message.
    pub fn channel(msg: impl Into<String>) -> Self {
        Self::Channel(msg.into())
    }

    /// Create an ingestion error from any displayable message.
    pub fn ingestion(msg: impl Into<String>) -> Self {
        Self::Ingestion(msg.into())
    }

    /// Create a persistence error from any displayable message.
    pub fn persistence(msg: impl Into<String>) -> Self {
        Self::Persistence(msg.into())
    }

    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
