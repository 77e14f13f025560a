//! Core storage trait definitions.
//!
//! `BlobStorage` is the interface the media library uses to persist uploaded
//! files and exported archives.

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::Result;
use crate::path::StorePath;

/// Metadata about a stored blob.
#[derive(Debug, Clone)]
pub struct BlobMeta {
    /// Full path to the blob
    pub path: StorePath,
    /// Size in bytes
    pub size: u64,
    /// Last modified timestamp (Unix epoch seconds)
    pub last_modified: Option<i64>,
}

/// Unified blob storage trait.
///
/// All implementations must be `Send + Sync` so one instance can be shared
/// between request handlers and background jobs.
#[async_trait]
pub trait BlobStorage: Send + Sync {
    /// Write data to the specified path.
    ///
    /// Creates parent directories as needed and overwrites existing data.
    async fn write(&self, path: &StorePath, data: Bytes) -> Result<()>;

    /// Read data from the specified path.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the path does not exist.
    async fn read(&self, path: &StorePath) -> Result<Bytes>;

    /// Check if a path exists.
    async fn exists(&self, path: &StorePath) -> Result<bool>;

    /// Delete data at the specified path.
    ///
    /// No-op if the path does not exist.
    async fn delete(&self, path: &StorePath) -> Result<()>;

    /// Get metadata for a blob without reading its contents.
    async fn head(&self, path: &StorePath) -> Result<BlobMeta>;

    /// List blobs under a prefix, sorted by path.
    async fn list(&self, prefix: &str) -> Result<Vec<BlobMeta>>;

    /// Backend name for logging.
    fn backend_name(&self) -> &'static str;
}
