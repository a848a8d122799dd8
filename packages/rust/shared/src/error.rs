//! Error types for doku.
//!
//! Library crates use [`DokuError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all doku operations.
#[derive(Debug, thiserror::Error)]
pub enum DokuError {
    /// Missing or invalid manifest, configuration, or template descriptor.
    #[error("config error: {message}")]
    Config { message: String },

    /// A staging step could not complete (missing source, bad layout).
    #[error("staging error: {message}")]
    Staging { message: String },

    /// The site generator could not be located, launched, or failed.
    #[error("tool error: {message}")]
    Tool { message: String },

    /// Malformed document path passed to TOC synthesis.
    #[error("toc error: {message}")]
    Toc { message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// JSON (de)serialization error.
    #[error("invalid JSON in {path:?}: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, DokuError>;

impl DokuError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a staging error from any displayable message.
    pub fn staging(msg: impl Into<String>) -> Self {
        Self::Staging {
            message: msg.into(),
        }
    }

    /// Create a tool error from any displayable message.
    pub fn tool(msg: impl Into<String>) -> Self {
        Self::Tool {
            message: msg.into(),
        }
    }

    /// Create a TOC synthesis error from any displayable message.
    pub fn toc(msg: impl Into<String>) -> Self {
        Self::Toc {
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

    /// Wrap a `serde_json::Error` with the path of the offending file.
    pub fn json(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        Self::Json {
            path: path.into(),
            source,
        }
    }
}
