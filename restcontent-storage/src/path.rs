//! Blob path handling.
//!
//! A [`StorePath`] is the relative location of one blob under the storage
//! root, e.g. `aZ3kq9XbLm.png` or `exports/aZ3kq9XbLm.zip`. Paths always use
//! forward slashes so they can be used verbatim as archive entry names.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::{Result, StorageError};

/// Validated relative path of a stored blob.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StorePath(String);

impl StorePath {
    /// Parse and validate a store path.
    ///
    /// Rejects empty paths, absolute paths, backslashes and any `.`, `..`
    /// or empty component.
    pub fn parse(s: &str) -> Result<Self> {
        if s.is_empty() {
            return Err(StorageError::InvalidPath("empty path".to_string()));
        }
        if s.starts_with('/') || s.contains('\\') {
            return Err(StorageError::InvalidPath(s.to_string()));
        }
        for part in s.split('/') {
            if part.is_empty() || part == "." || part == ".." {
                return Err(StorageError::InvalidPath(s.to_string()));
            }
        }
        Ok(Self(s.to_string()))
    }

    /// Path as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Final component of the path.
    pub fn file_name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }

    /// Check whether this path lives under `prefix` (component-wise).
    pub fn starts_with(&self, prefix: &str) -> bool {
        let prefix = prefix.trim_end_matches('/');
        prefix.is_empty()
            || self.0 == prefix
            || (self.0.starts_with(prefix) && self.0[prefix.len()..].starts_with('/'))
    }

    /// Convert to filesystem path.
    pub fn to_path_buf(&self, base: &Path) -> PathBuf {
        self.0.split('/').fold(base.to_path_buf(), |p, part| p.join(part))
    }
}

impl fmt::Display for StorePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for StorePath {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}
