//! Blob storage abstraction for restcontent.
//!
//! Media uploads and exported archives are persisted through the
//! [`BlobStorage`] trait. Every blob is addressed by a [`StorePath`], the
//! relative path recorded on the owning media record:
//!
//! ```text
//! <upload_dir>/<storePath>
//!
//! ./data/uploads/aZ3kq9XbLm.png
//! ./data/uploads/Q81kdLp0aa.zip
//! ```
//!
//! # Quick Start
//!
//! ```no_run
//! use restcontent_storage::{BlobStorage, LocalStorage, StorePath};
//! use bytes::Bytes;
//!
//! # async fn example() -> restcontent_storage::Result<()> {
//! let storage = LocalStorage::new("./data/uploads");
//!
//! let path = StorePath::parse("aZ3kq9XbLm.png")?;
//! storage.write(&path, Bytes::from("binary data")).await?;
//!
//! let data = storage.read(&path).await?;
//! # Ok(())
//! # }
//! ```

mod error;
mod local;
mod path;
mod traits;

pub use error::{Result, StorageError};
pub use local::LocalStorage;
pub use path::StorePath;
pub use traits::{BlobMeta, BlobStorage};

// Re-export bytes for convenience
pub use bytes::Bytes;

use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Create a storage backend from configuration.
pub fn create_storage(config: &StorageConfig) -> Result<Arc<dyn BlobStorage>> {
    match config {
        StorageConfig::Local { path } => {
            if path.as_os_str().is_empty() {
                return Err(StorageError::Config(
                    "local storage requires a path".to_string(),
                ));
            }
            Ok(Arc::new(LocalStorage::new(path)))
        }
    }
}

/// Storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum StorageConfig {
    /// Local filesystem storage
    Local {
        /// Base path for blobs
        path: std::path::PathBuf,
    },
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig::Local {
            path: std::path::PathBuf::from("./data/uploads"),
        }
    }
}
