//! Record types persisted by the entity store and carried in archives.
//!
//! Every type serializes to the camelCase field map used in `<group>.json`.

mod article;
mod content;
mod media;
mod site;
mod users;

pub use article::{Article, Page, Post};
pub use content::BaseContent;
pub use media::{is_reserved_archive_name, Media, RESERVED_ARCHIVE_PREFIXES};
pub use site::{Category, CategoryItem, Site};
pub use users::{GroupMember, User, UserGroup};
