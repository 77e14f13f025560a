use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::model::{Category, GroupMember, Media, Page, Post, Site, User, UserGroup};

/// A row of any table, as handed between the store, the archive codec and
/// the job hooks.
#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    User(User),
    Group(UserGroup),
    GroupMember(GroupMember),
    Site(Site),
    Category(Category),
    Page(Page),
    Post(Post),
    Media(Media),
}

impl Record {
    /// Table the record belongs to.
    pub fn table(&self) -> &'static str {
        match self {
            Record::User(_) => User::TABLE,
            Record::Group(_) => UserGroup::TABLE,
            Record::GroupMember(_) => GroupMember::TABLE,
            Record::Site(_) => Site::TABLE,
            Record::Category(_) => Category::TABLE,
            Record::Page(_) => Page::TABLE,
            Record::Post(_) => Post::TABLE,
            Record::Media(_) => Media::TABLE,
        }
    }
}

/// A record type stored in its own table with a natural unique key.
pub trait Entity: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    const TABLE: &'static str;
    /// Columns forming the natural key, in `natural_key` order
    const KEY_COLUMNS: &'static [&'static str];

    fn natural_key(&self) -> Vec<String>;

    fn into_record(self) -> Record;

    fn from_record(record: &Record) -> Option<&Self>;
}

macro_rules! entity {
    ($ty:ty, $variant:ident, $table:literal, [$($col:literal),+], |$s:ident| $key:expr) => {
        impl Entity for $ty {
            const TABLE: &'static str = $table;
            const KEY_COLUMNS: &'static [&'static str] = &[$($col),+];

            fn natural_key(&self) -> Vec<String> {
                let $s = self;
                $key
            }

            fn into_record(self) -> Record {
                Record::$variant(self)
            }

            fn from_record(record: &Record) -> Option<&Self> {
                match record {
                    Record::$variant(inner) => Some(inner),
                    _ => None,
                }
            }
        }
    };
}

entity!(User, User, "users", ["email"], |u| vec![u.email.clone()]);
entity!(UserGroup, Group, "groups", ["name"], |g| vec![g.name.clone()]);
entity!(GroupMember, GroupMember, "group_members", ["user_id", "group_id"], |m| vec![
    m.user_id.to_string(),
    m.group_id.to_string()
]);
entity!(Site, Site, "sites", ["domain"], |s| vec![s.domain.clone()]);
entity!(Category, Category, "categories", ["site_id", "uuid"], |c| vec![
    c.site_id.clone(),
    c.uuid.clone()
]);
entity!(Page, Page, "pages", ["site_id", "id"], |p| vec![p.site_id.clone(), p.id.clone()]);
entity!(Post, Post, "posts", ["site_id", "id"], |p| vec![p.site_id.clone(), p.id.clone()]);
entity!(Media, Media, "media", ["path", "name"], |m| vec![m.path.clone(), m.name.clone()]);
