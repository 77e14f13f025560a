use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Site {
    pub updated_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub domain: String,
    pub name: String,
    pub preview: String,
    pub disallow: bool,
}

/// One node of a category tree.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CategoryItem {
    pub path: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<CategoryItem>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Category {
    pub site_id: String,
    pub uuid: String,
    pub name: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub items: Vec<CategoryItem>,
}

impl Category {
    /// Find an item anywhere in the tree by its path.
    pub fn find_item(&self, path: &str) -> Option<&CategoryItem> {
        if path.is_empty() {
            return None;
        }
        let mut pending: Vec<&CategoryItem> = self.items.iter().collect();
        while let Some(item) = pending.pop() {
            if item.path == path {
                return Some(item);
            }
            pending.extend(item.children.iter());
        }
        None
    }
}
