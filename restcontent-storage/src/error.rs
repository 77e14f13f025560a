//! Storage error types.

use std::io;
use thiserror::Error;

/// Blob storage errors.
#[derive(Error, Debug)]
pub enum StorageError {
    /// I/O error during storage operation
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Blob not found
    #[error("Blob not found: {0}")]
    NotFound(String),

    /// Invalid store path
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;

impl StorageError {
    /// Check if this is a "not found" error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::NotFound(_))
            || matches!(self, StorageError::Io(e) if e.kind() == io::ErrorKind::NotFound)
    }
}
