//! Error types for drivesite.
//!
//! Library crates use [`DriveSiteError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all drivesite operations.
#[derive(Debug, thiserror::Error)]
pub enum DriveSiteError {
    /// Missing or invalid configuration (credentials, folder ids, config file).
    /// Fatal: raised before any remote or output I/O.
    #[error("config error: {message}")]
    Config { message: String },

    /// Listing a remote folder failed. The folder is skipped for this run.
    #[error("failed to list folder {folder_id}: {message}")]
    RemoteList { folder_id: String, message: String },

    /// Fetching, exporting, or authenticating against the remote store failed.
    #[error("remote error: {0}")]
    Remote(String),

    /// No unique output name could be produced for an item.
    #[error("could not allocate a unique name for '{original}' after {attempts} attempts")]
    AllocationExhausted { original: String, attempts: usize },

    /// Rewriting the footer of one output document failed.
    #[error("footer refresh failed for {file}: {message}")]
    FooterRefresh { file: String, message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Persisted state could not be (de)serialized.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Data validation error (bad state file, invalid input).
    #[error("validation error: {message}")]
    Validation { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, DriveSiteError>;

impl DriveSiteError {
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

    /// Create a folder listing error.
    pub fn remote_list(folder_id: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::RemoteList {
            folder_id: folder_id.into(),
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

    /// Whether this error must abort the whole run.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Config { .. } | Self::Io { .. } | Self::Serialization(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formatting() {
        let err = DriveSiteError::config("GDRIVE_FOLDER_ID is not set");
        assert_eq!(err.to_string(), "config error: GDRIVE_FOLDER_ID is not set");

        let err = DriveSiteError::remote_list("abc123", "HTTP 404");
        assert!(err.to_string().contains("abc123"));
        assert!(err.to_string().contains("HTTP 404"));

        let err = DriveSiteError::AllocationExhausted {
            original: "My Doc.txt".into(),
            attempts: 32,
        };
        assert!(err.to_string().contains("My Doc.txt"));
    }

    #[test]
    fn fatal_classification() {
        assert!(DriveSiteError::config("x").is_fatal());
        assert!(!DriveSiteError::remote_list("f", "x").is_fatal());
        assert!(!DriveSiteError::Remote("x".into()).is_fatal());
        assert!(
            !DriveSiteError::FooterRefresh {
                file: "a.html".into(),
                message: "x".into()
            }
            .is_fatal()
        );
    }
}
