use serde::{Deserialize, Serialize};
use std::ops::{Deref, DerefMut};

use super::BaseContent;

/// Body shared by pages and posts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Article {
    #[serde(flatten)]
    pub base: BaseContent,
    pub site_id: String,
    pub id: String,
    pub is_draft: bool,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub draft: String,
    pub body: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub preview_url: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub category_id: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub category_path: String,
}

impl Article {
    /// Apply `f` to every text field that may embed absolute media URLs.
    pub fn rewrite_text(&mut self, f: impl Fn(&str) -> String) {
        self.base.thumbnail = f(&self.base.thumbnail);
        self.body = f(&self.body);
        self.draft = f(&self.draft);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Page(pub Article);

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Post(pub Article);

impl Deref for Page {
    type Target = Article;

    fn deref(&self) -> &Article {
        &self.0
    }
}

impl DerefMut for Page {
    fn deref_mut(&mut self) -> &mut Article {
        &mut self.0
    }
}

impl Deref for Post {
    type Target = Article;

    fn deref(&self) -> &Article {
        &self.0
    }
}

impl DerefMut for Post {
    fn deref_mut(&mut self) -> &mut Article {
        &mut self.0
    }
}
