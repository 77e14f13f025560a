//! Rewriting of absolute media URLs when content moves between hosts.

use crate::model::Article;

/// `host` without trailing slash followed by `prefix`, ending in exactly one `/`.
pub fn media_base(host: &str, prefix: &str) -> String {
    let host = host.trim_end_matches('/');
    let prefix = prefix.trim_matches('/');
    if prefix.is_empty() {
        format!("{host}/")
    } else {
        format!("{host}/{prefix}/")
    }
}

/// Replaces one absolute media URL base with another.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaRehomer {
    from: String,
    to: String,
}

impl MediaRehomer {
    /// An empty `from_host` means the source is unknown and nothing is rewritten.
    pub fn new(from_host: &str, from_prefix: &str, to_host: &str, to_prefix: &str) -> Self {
        let to = media_base(to_host, to_prefix);
        let from = if from_host.trim().is_empty() {
            to.clone()
        } else {
            media_base(from_host, from_prefix)
        };
        Self { from, to }
    }

    /// True when source and destination bases are identical.
    pub fn is_noop(&self) -> bool {
        self.from == self.to
    }

    pub fn rewrite(&self, text: &str) -> String {
        if self.is_noop() || text.is_empty() {
            return text.to_string();
        }
        text.replace(&self.from, &self.to)
    }

    /// Rewrite the thumbnail, body and draft of an article.
    pub fn apply(&self, article: &mut Article) {
        if self.is_noop() {
            return;
        }
        article.rewrite_text(|s| self.rewrite(s));
    }
}
