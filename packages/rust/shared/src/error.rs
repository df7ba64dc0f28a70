//! Error types for Frontpage.
//!
//! Library crates use [`FrontpageError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all Frontpage operations.
#[derive(Debug, thiserror::Error)]
pub enum FrontpageError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// A raw record could not be normalized into an Article.
    /// Per-record failures are collected into the run report; they never
    /// abort a batch.
    #[error("validation error: {message}")]
    Validation { message: String },

    /// A category assignment would exceed a configured cardinality limit.
    #[error("category limit exceeded: {message}")]
    LimitExceeded { message: String },

    /// Two records in one batch resolved to the same identity with
    /// materially different fields.
    #[error("conflict: {message}")]
    Conflict { message: String },

    /// Reading or writing the collection/artifact failed. Fatal to the run.
    #[error("persistence error: {message}")]
    Persistence { message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Network error from the publish-notification boundary.
    #[error("network error: {0}")]
    Network(String),
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, FrontpageError>;

impl FrontpageError {
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

    /// Create a limit-exceeded error from any displayable message.
    pub fn limit_exceeded(msg: impl Into<String>) -> Self {
        Self::LimitExceeded {
            message: msg.into(),
        }
    }

    /// Create a conflict error from any displayable message.
    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict {
            message: msg.into(),
        }
    }

    /// Create a persistence error from any displayable message.
    pub fn persistence(msg: impl Into<String>) -> Self {
        Self::Persistence {
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formatting() {
        let err = FrontpageError::validation("markdown document has no title heading");
        assert_eq!(
            err.to_string(),
            "validation error: markdown document has no title heading"
        );

        let err = FrontpageError::limit_exceeded("3 heroes already flagged (max 3)");
        assert!(err.to_string().contains("max 3"));

        let err = FrontpageError::persistence("collection document is not valid JSON");
        assert!(err.to_string().starts_with("persistence error:"));
    }
}
