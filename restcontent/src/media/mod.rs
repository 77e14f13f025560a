//! Media library: stores uploaded files as blobs and builds their public URLs.

mod kind;

pub use kind::{
    classify, extension, image_dimensions, CONTENT_TYPE_AUDIO, CONTENT_TYPE_FILE,
    CONTENT_TYPE_IMAGE, CONTENT_TYPE_VIDEO,
};

use bytes::Bytes;
use restcontent_storage::{BlobStorage, StorePath};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::Result;
use crate::model::Media;
use crate::util::random_text;

/// Length of the random part of a fresh store path.
const STORE_NAME_LEN: usize = 10;

/// Outcome of storing one file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResult {
    pub path: String,
    pub name: String,
    pub ext: String,
    pub size: u64,
    pub content_type: String,
    pub store_path: String,
    pub dimensions: String,
    pub thumbnail: String,
    pub external: bool,
}

impl UploadResult {
    /// Overwrite the storage-derived fields of `media`.
    pub fn apply_to(&self, media: &mut Media) {
        media.size = self.size;
        media.base.content_type = self.content_type.clone();
        media.ext = self.ext.clone();
        media.external = self.external;
        media.dimensions = self.dimensions.clone();
        media.base.thumbnail = self.thumbnail.clone();
        media.store_path = self.store_path.clone();
    }
}

/// Uploaded files and exported archives, addressed by store path.
pub struct MediaLibrary {
    storage: Arc<dyn BlobStorage>,
    prefix: String,
}

impl MediaLibrary {
    pub fn new(storage: Arc<dyn BlobStorage>, prefix: &str) -> Self {
        Self {
            storage,
            prefix: normalize_prefix(prefix),
        }
    }

    /// URL prefix media is served under, always `/…/`.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Store `data` under a fresh store path.
    pub async fn upload(&self, path: &str, name: &str, data: Bytes) -> Result<UploadResult> {
        let ext = extension(name);
        let (content_type, can_get_dimensions) = classify(&ext);

        let store_path = StorePath::parse(&format!("{}{}", random_text(STORE_NAME_LEN), ext))?;

        let dimensions = if can_get_dimensions {
            match image_dimensions(&data) {
                Some((w, h)) => format!("{w}X{h}"),
                None => {
                    tracing::warn!("Cannot decode image header of {}", name);
                    "X".to_string()
                }
            }
        } else {
            String::new()
        };

        let size = data.len() as u64;
        self.storage.write(&store_path, data).await?;
        tracing::debug!(
            "Stored {} ({} bytes) at {} on {}",
            name,
            size,
            store_path,
            self.storage.backend_name()
        );

        Ok(UploadResult {
            path: if path.is_empty() { "/".to_string() } else { path.to_string() },
            name: name.to_string(),
            ext,
            size,
            content_type: content_type.to_string(),
            store_path: store_path.to_string(),
            dimensions,
            thumbnail: String::new(),
            external: false,
        })
    }

    pub async fn read(&self, store_path: &str) -> Result<Bytes> {
        let path = StorePath::parse(store_path)?;
        Ok(self.storage.read(&path).await?)
    }

    pub async fn delete(&self, store_path: &str) -> Result<()> {
        let path = StorePath::parse(store_path)?;
        Ok(self.storage.delete(&path).await?)
    }

    /// `host` + prefix + `path` + `name`, with duplicate slashes collapsed.
    pub fn public_url(&self, host: &str, path: &str, name: &str) -> String {
        let joined = [self.prefix.as_str(), path, name]
            .iter()
            .flat_map(|part| part.split('/'))
            .filter(|seg| !seg.is_empty())
            .collect::<Vec<_>>()
            .join("/");
        format!("{}/{}", host.trim_end_matches('/'), joined)
    }

    /// Public URL of a media record; images without a thumbnail get the
    /// URL as thumbnail. Directories have no URL.
    pub fn build_public_url(&self, host: &str, media: &mut Media) -> Option<String> {
        if media.directory {
            return None;
        }
        let url = if media.external {
            media.store_path.clone()
        } else {
            self.public_url(host, &media.path, &media.name)
        };
        if media.base.content_type == CONTENT_TYPE_IMAGE && media.base.thumbnail.is_empty() {
            media.base.thumbnail = url.clone();
        }
        Some(url)
    }
}

fn normalize_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        format!("/{trimmed}/")
    }
}
