use std::io::{Cursor, Write};

use restcontent_storage::StorePath;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use super::{blob_entry, group_entry, ExportManifest, MANIFEST_ENTRY};
use crate::error::Result;
use crate::store::FieldMap;

/// Builds an export archive in memory.
pub struct ArchiveWriter {
    zip: ZipWriter<Cursor<Vec<u8>>>,
    options: SimpleFileOptions,
}

impl ArchiveWriter {
    pub fn new(compress: bool) -> Self {
        let method = if compress {
            CompressionMethod::Deflated
        } else {
            CompressionMethod::Stored
        };
        Self {
            zip: ZipWriter::new(Cursor::new(Vec::new())),
            options: SimpleFileOptions::default().compression_method(method),
        }
    }

    /// Write `<table>.json`. Returns the JSON size in bytes.
    pub fn write_group(&mut self, table: &str, rows: &[FieldMap]) -> Result<u64> {
        let data = serde_json::to_vec(rows)?;
        self.write_raw(&group_entry(table), &data)?;
        Ok(data.len() as u64)
    }

    /// Write `media/<storePath>`. Returns the blob size in bytes.
    pub fn write_blob(&mut self, store_path: &StorePath, data: &[u8]) -> Result<u64> {
        self.write_raw(&blob_entry(store_path), data)?;
        Ok(data.len() as u64)
    }

    pub fn write_manifest(&mut self, manifest: &ExportManifest) -> Result<()> {
        let data = serde_json::to_vec_pretty(manifest)?;
        self.write_raw(MANIFEST_ENTRY, &data)
    }

    /// Close the archive and return its bytes.
    pub fn finish(self) -> Result<Vec<u8>> {
        Ok(self.zip.finish()?.into_inner())
    }

    /// Write an arbitrary entry.
    pub fn write_raw(&mut self, name: &str, data: &[u8]) -> Result<()> {
        self.zip.start_file(name, self.options)?;
        self.zip.write_all(data)?;
        Ok(())
    }
}
