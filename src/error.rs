//! Error types for the video library

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Error kinds that can occur in library operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// File or directory not found
    NotFound,
    /// Permission denied when accessing a file or directory
    PermissionDenied,
    /// I/O error during file operations
    Io,
    /// Catalog database operation failed
    Database,
    /// Duration probing failed
    Probe,
    /// Input rejected before any side effect
    Validation,
    /// Rename target already occupied
    DestinationExists,
    /// External tool could not be started or exited unsuccessfully
    ToolFailed,
    /// Operation cancelled by the caller
    Cancelled,
    /// Another instance of the operation is already running
    Busy,
    /// Configuration could not be loaded or saved
    Config,
}

/// Represents an error raised by the library
#[derive(Debug, Error)]
#[error("{kind:?}: {message} (path: {path:?})")]
pub struct LibraryError {
    /// The kind of error
    pub kind: ErrorKind,
    /// The path involved, if any
    pub path: Option<PathBuf>,
    /// Human-readable error message
    pub message: String,
}

/// Result alias used across the crate
pub type Result<T> = std::result::Result<T, LibraryError>;

impl LibraryError {
    /// Create a new error
    pub fn new(kind: ErrorKind, path: Option<PathBuf>, message: impl Into<String>) -> Self {
        Self {
            kind,
            path,
            message: message.into(),
        }
    }

    /// Wrap an I/O error, keeping the path it happened on
    pub fn io(path: &Path, err: std::io::Error) -> Self {
        let mut error = Self::from(err);
        error.path = Some(path.to_path_buf());
        error
    }

    /// Create a database error
    pub fn database_error(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Database, None, message)
    }

    /// Create a probe error
    pub fn probe_error(path: &Path, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Probe, Some(path.to_path_buf()), message)
    }

    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, None, message)
    }

    /// Create a destination-exists error
    pub fn destination_exists(path: &Path) -> Self {
        Self::new(
            ErrorKind::DestinationExists,
            Some(path.to_path_buf()),
            format!("Destination already exists: {}", path.display()),
        )
    }

    /// Create a tool failure carrying the tool's diagnostic output
    pub fn tool_failed(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ToolFailed, None, message)
    }

    /// Create a cancellation outcome
    pub fn cancelled() -> Self {
        Self::new(ErrorKind::Cancelled, None, "Operation cancelled")
    }

    /// Create a busy error for single-flight operations
    pub fn busy(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Busy, None, message)
    }

    /// Create a configuration error
    pub fn config_error(path: Option<PathBuf>, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Config, path, message)
    }

    /// Whether this error is a user-initiated cancellation
    pub fn is_cancelled(&self) -> bool {
        self.kind == ErrorKind::Cancelled
    }
}

impl From<std::io::Error> for LibraryError {
    fn from(err: std::io::Error) -> Self {
        let kind = match err.kind() {
            std::io::ErrorKind::PermissionDenied => ErrorKind::PermissionDenied,
            std::io::ErrorKind::NotFound => ErrorKind::NotFound,
            _ => ErrorKind::Io,
        };
        Self::new(kind, None, err.to_string())
    }
}

impl From<rusqlite::Error> for LibraryError {
    fn from(err: rusqlite::Error) -> Self {
        Self::database_error(err.to_string())
    }
}

impl From<serde_json::Error> for LibraryError {
    fn from(err: serde_json::Error) -> Self {
        Self::config_error(None, err.to_string())
    }
}

impl From<rayon::ThreadPoolBuildError> for LibraryError {
    fn from(err: rayon::ThreadPoolBuildError) -> Self {
        Self::new(ErrorKind::Io, None, format!("Failed to build scan pool: {}", err))
    }
}
