use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Fields shared by every publishable record (pages, posts, media).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BaseContent {
    pub updated_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub thumbnail: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub tags: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub title: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub alt: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub keywords: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creator_id: Option<i64>,
    pub author: String,
    pub published: bool,
    pub published_at: Option<DateTime<Utc>>,
    pub content_type: String,
    pub remark: String,
}

impl BaseContent {
    /// Attribute the record to `user_id`.
    pub fn stamp_creator(&mut self, user_id: i64) {
        self.creator_id = Some(user_id);
    }

    /// Mark the record as published now unless it already carries a date.
    pub fn publish(&mut self) {
        self.published = true;
        if self.published_at.is_none() {
            self.published_at = Some(Utc::now());
        }
    }
}
