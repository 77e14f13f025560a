use std::io::{Read, Seek};

use restcontent_storage::StorePath;
use serde_json::Value;
use zip::result::ZipError;
use zip::ZipArchive;

use super::{blob_entry, group_entry, ExportManifest, MANIFEST_ENTRY};
use crate::error::{Error, Result};

const MAX_PREALLOC: u64 = 1 << 20;

/// Buffer capacity for an entry. The declared size comes from the uploader.
fn prealloc_len(declared: u64) -> usize {
    declared.min(MAX_PREALLOC) as usize
}

/// Random access to the parts of an uploaded archive.
pub struct ArchiveReader<R> {
    zip: ZipArchive<R>,
}

impl<R: Read + Seek> ArchiveReader<R> {
    pub fn new(reader: R) -> Result<Self> {
        Ok(Self {
            zip: ZipArchive::new(reader)?,
        })
    }

    /// Parse `meta.json`. An archive without one is rejected.
    pub fn manifest(&mut self) -> Result<ExportManifest> {
        match self.read_entry(MANIFEST_ENTRY)? {
            Some(data) => serde_json::from_slice(&data)
                .map_err(|e| Error::Validation(format!("parse {MANIFEST_ENTRY} failed: {e}"))),
            None => Err(Error::Validation(format!(
                "archive has no {MANIFEST_ENTRY}"
            ))),
        }
    }

    /// Rows of `<table>.json`, or `None` when the archive has no such entry.
    pub fn read_group(&mut self, table: &str) -> Result<Option<Vec<Value>>> {
        let name = group_entry(table);
        let Some(data) = self.read_entry(&name)? else {
            return Ok(None);
        };
        match serde_json::from_slice::<Value>(&data)? {
            Value::Array(rows) => Ok(Some(rows)),
            Value::Null => Ok(Some(Vec::new())),
            _ => Err(Error::Validation(format!("{name} is not a JSON array"))),
        }
    }

    /// Bytes of `media/<storePath>`.
    pub fn read_blob(&mut self, store_path: &StorePath) -> Result<Vec<u8>> {
        let name = blob_entry(store_path);
        self.read_entry(&name)?
            .ok_or_else(|| Error::NotFound(format!("archive entry {name}")))
    }

    /// Names of all entries, in archive order.
    pub fn entry_names(&self) -> Vec<String> {
        self.zip.file_names().map(str::to_string).collect()
    }

    fn read_entry(&mut self, name: &str) -> Result<Option<Vec<u8>>> {
        match self.zip.by_name(name) {
            Ok(mut file) => {
                let mut buffer = Vec::with_capacity(prealloc_len(file.size()));
                file.read_to_end(&mut buffer)?;
                Ok(Some(buffer))
            }
            Err(ZipError::FileNotFound) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
