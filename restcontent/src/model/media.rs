use serde::{Deserialize, Serialize};

use super::BaseContent;

/// Name prefixes of archives produced by the backup engine itself.
pub const RESERVED_ARCHIVE_PREFIXES: [&str; 2] = ["restcontent_export_", "restcontent_backup_"];

/// A media library entry: an uploaded file, an external link or a folder.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Media {
    #[serde(flatten)]
    pub base: BaseContent,
    pub size: u64,
    pub directory: bool,
    pub path: String,
    pub name: String,
    pub ext: String,
    /// `"<W>X<H>"`, or `"X"` when unknown
    pub dimensions: String,
    pub store_path: String,
    pub external: bool,
}

impl Media {
    /// True for records that own a blob in local storage.
    pub fn is_active(&self) -> bool {
        !self.directory && !self.external
    }

    /// True for `restcontent_export_*.zip` / `restcontent_backup_*.zip`.
    pub fn is_reserved_archive(&self) -> bool {
        is_reserved_archive_name(&self.name)
    }
}

pub fn is_reserved_archive_name(name: &str) -> bool {
    name.ends_with(".zip")
        && RESERVED_ARCHIVE_PREFIXES
            .iter()
            .any(|prefix| name.starts_with(prefix))
}
