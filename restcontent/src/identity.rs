use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// The user a request acts as.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub user_id: i64,
    pub name: String,
    pub superuser: bool,
}

impl Identity {
    /// Used for every request when authentication is disabled.
    pub fn local_admin() -> Self {
        Self {
            user_id: 1,
            name: "admin".to_string(),
            superuser: true,
        }
    }

    pub fn require_superuser(&self) -> Result<()> {
        if self.superuser {
            Ok(())
        } else {
            Err(Error::Forbidden(format!(
                "{} is not allowed to manage backups",
                self.name
            )))
        }
    }
}
