//! Local filesystem storage implementation.
//!
//! Blobs live under the configured upload directory, one file per
//! [`StorePath`].

use async_trait::async_trait;
use bytes::Bytes;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, instrument};

use crate::error::{Result, StorageError};
use crate::path::StorePath;
use crate::traits::{BlobMeta, BlobStorage};

/// Local filesystem storage backend.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    base_path: PathBuf,
}

impl LocalStorage {
    /// Create a new local storage backend rooted at `base_path`.
    ///
    /// Directories are created lazily on first write.
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    /// Get the base path for this storage.
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn to_fs_path(&self, path: &StorePath) -> PathBuf {
        path.to_path_buf(&self.base_path)
    }

    async fn ensure_parent(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        Ok(())
    }

    fn meta(path: StorePath, metadata: &std::fs::Metadata) -> BlobMeta {
        BlobMeta {
            path,
            size: metadata.len(),
            last_modified: metadata
                .modified()
                .ok()
                .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
                .map(|d| d.as_secs() as i64),
        }
    }
}

#[async_trait]
impl BlobStorage for LocalStorage {
    #[instrument(skip(self, data), fields(path = %path, size = data.len()))]
    async fn write(&self, path: &StorePath, data: Bytes) -> Result<()> {
        let fs_path = self.to_fs_path(path);
        self.ensure_parent(&fs_path).await?;

        debug!("Writing {} bytes to {:?}", data.len(), fs_path);
        fs::write(&fs_path, &data).await?;
        Ok(())
    }

    #[instrument(skip(self), fields(path = %path))]
    async fn read(&self, path: &StorePath) -> Result<Bytes> {
        let fs_path = self.to_fs_path(path);
        debug!("Reading from {:?}", fs_path);

        match fs::read(&fs_path).await {
            Ok(data) => Ok(Bytes::from(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(path.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    #[instrument(skip(self), fields(path = %path))]
    async fn exists(&self, path: &StorePath) -> Result<bool> {
        Ok(fs::try_exists(self.to_fs_path(path)).await?)
    }

    #[instrument(skip(self), fields(path = %path))]
    async fn delete(&self, path: &StorePath) -> Result<()> {
        let fs_path = self.to_fs_path(path);
        debug!("Deleting {:?}", fs_path);

        match fs::remove_file(&fs_path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    #[instrument(skip(self), fields(path = %path))]
    async fn head(&self, path: &StorePath) -> Result<BlobMeta> {
        let fs_path = self.to_fs_path(path);

        let metadata = match fs::metadata(&fs_path).await {
            Ok(m) if m.is_file() => m,
            Ok(_) => return Err(StorageError::NotFound(path.to_string())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StorageError::NotFound(path.to_string()));
            }
            Err(e) => return Err(e.into()),
        };

        Ok(Self::meta(path.clone(), &metadata))
    }

    #[instrument(skip(self), fields(prefix = %prefix))]
    async fn list(&self, prefix: &str) -> Result<Vec<BlobMeta>> {
        let mut results = Vec::new();
        if !fs::try_exists(&self.base_path).await? {
            return Ok(results);
        }

        let mut pending = vec![self.base_path.clone()];
        while let Some(dir) = pending.pop() {
            let mut entries = fs::read_dir(&dir).await?;
            while let Some(entry) = entries.next_entry().await? {
                let path = entry.path();
                let metadata = entry.metadata().await?;

                if metadata.is_dir() {
                    pending.push(path);
                    continue;
                }
                if !metadata.is_file() {
                    continue;
                }

                let relative = path
                    .strip_prefix(&self.base_path)
                    .map_err(|_| StorageError::InvalidPath(path.display().to_string()))?;
                let path_str = relative
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy())
                    .collect::<Vec<_>>()
                    .join("/");

                if let Ok(store_path) = StorePath::parse(&path_str) {
                    if store_path.starts_with(prefix) {
                        results.push(Self::meta(store_path, &metadata));
                    }
                }
            }
        }

        results.sort_by(|a, b| a.path.as_str().cmp(b.path.as_str()));
        Ok(results)
    }

    fn backend_name(&self) -> &'static str {
        "local"
    }
}
