use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Per-group entry of the manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupSummary {
    pub name: String,
    pub count: u64,
    /// JSON bytes plus blob bytes written for the group
    pub size: u64,
}

/// Contents of `meta.json`: where an archive came from and what it holds.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExportManifest {
    pub build_time: String,
    pub options: Vec<GroupSummary>,
    pub from: String,
    pub media_host: String,
    pub media_prefix: String,
    pub export_time: DateTime<Utc>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub author: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub key: String,
}

impl ExportManifest {
    pub fn group(&self, name: &str) -> Option<&GroupSummary> {
        self.options.iter().find(|o| o.name == name)
    }
}
