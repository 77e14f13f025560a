use serde::{Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;
use crate::model::{Category, GroupMember, Media, Page, Post, Site, User, UserGroup};
use crate::store::Entity;

/// A selectable unit of export and import.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Group {
    Users,
    Groups,
    GroupMembers,
    Sites,
    Categories,
    Pages,
    Posts,
    Media,
}

impl Group {
    pub const ALL: [Group; 8] = [
        Group::Users,
        Group::Groups,
        Group::GroupMembers,
        Group::Sites,
        Group::Categories,
        Group::Pages,
        Group::Posts,
        Group::Media,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Group::Users => "users",
            Group::Groups => "groups",
            Group::GroupMembers => "group_members",
            Group::Sites => "sites",
            Group::Categories => "categories",
            Group::Pages => "pages",
            Group::Posts => "posts",
            Group::Media => "media",
        }
    }

    /// Tables dumped or restored for this group, in processing order.
    ///
    /// `users` carries the groups and memberships along with it.
    pub fn tables(&self) -> &'static [&'static str] {
        match self {
            Group::Users => &[User::TABLE, UserGroup::TABLE, GroupMember::TABLE],
            Group::Groups => &[UserGroup::TABLE],
            Group::GroupMembers => &[GroupMember::TABLE],
            Group::Sites => &[Site::TABLE],
            Group::Categories => &[Category::TABLE],
            Group::Pages => &[Page::TABLE],
            Group::Posts => &[Post::TABLE],
            Group::Media => &[Media::TABLE],
        }
    }

    /// Parse a caller-supplied selection. Empty or unknown names are rejected.
    ///
    /// Repeats are dropped, as are `groups` and `group_members` when `users`
    /// already covers them, so no table is processed twice.
    pub fn parse_list<S: AsRef<str>>(names: &[S]) -> Result<Vec<Group>, Error> {
        if names.is_empty() {
            return Err(Error::Validation("no groups selected".to_string()));
        }
        let parsed = names
            .iter()
            .map(|n| n.as_ref().parse())
            .collect::<Result<Vec<Group>, Error>>()?;

        let with_users = parsed.contains(&Group::Users);
        let mut selected: Vec<Group> = Vec::with_capacity(parsed.len());
        for group in parsed {
            let covered = with_users && Group::Users.tables().contains(&group.as_str());
            if selected.contains(&group) || (covered && group != Group::Users) {
                continue;
            }
            selected.push(group);
        }
        Ok(selected)
    }
}

impl FromStr for Group {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Group::ALL
            .into_iter()
            .find(|g| g.as_str() == s)
            .ok_or_else(|| Error::Validation(format!("unknown group: {s}")))
    }
}

impl fmt::Display for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Group {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}
