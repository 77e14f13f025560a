//! Archive layout.
//!
//! ```text
//! meta.json              ExportManifest
//! <table>.json           JSON array of field maps, one per row
//! media/<storePath>      blob of every exported local media record
//! ```

mod manifest;
mod reader;
mod writer;

pub use manifest::{ExportManifest, GroupSummary};
pub use reader::ArchiveReader;
pub use writer::ArchiveWriter;

use restcontent_storage::StorePath;

pub const MANIFEST_ENTRY: &str = "meta.json";
pub const MEDIA_DIR: &str = "media";

pub fn group_entry(table: &str) -> String {
    format!("{table}.json")
}

pub fn blob_entry(store_path: &StorePath) -> String {
    format!("{MEDIA_DIR}/{store_path}")
}
