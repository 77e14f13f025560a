use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An account of the admin framework.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct User {
    pub id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub email: String,
    /// Password hash, never a clear-text password
    #[serde(skip_serializing_if = "String::is_empty")]
    pub password: String,
    pub display_name: String,
    pub first_name: String,
    pub last_name: String,
    pub locale: String,
    pub timezone: String,
    pub source: String,
    pub is_super_user: bool,
    pub is_staff: bool,
    pub enabled: bool,
    pub activated: bool,
    pub last_login: Option<DateTime<Utc>>,
    pub last_login_ip: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserGroup {
    pub id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extra: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GroupMember {
    pub id: i64,
    pub created_at: DateTime<Utc>,
    pub user_id: i64,
    pub group_id: i64,
    pub role: String,
}
