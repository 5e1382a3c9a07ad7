//! Error types for dailypaper.
//!
//! Library crates use [`DailyPaperError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all dailypaper operations.
#[derive(Debug, thiserror::Error)]
pub enum DailyPaperError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Network/HTTP error while talking to a source or the document API.
    #[error("network error: {0}")]
    Network(String),

    /// Payload parsing error (JSON, Atom XML, Markdown structure).
    #[error("parse error: {message}")]
    Parse { message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Data validation error (missing field, unexpected shape, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },

    /// The document API rejected a request.
    #[error("publish error: {0}")]
    Publish(String),

    /// An external retrieval command failed to run or timed out.
    #[error("process error: {0}")]
    Process(String),
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, DailyPaperError>;

impl DailyPaperError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
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
