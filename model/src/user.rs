use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::PayloadError;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub name: Option<String>,
    pub avatar_url: Option<String>,
    pub is_admin: bool,
    pub is_active: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// Row of the admin user listing.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminUser {
    #[serde(flatten)]
    pub user: User,
    pub template_count: i64,
    pub submission_count: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSearchHit {
    pub id: Uuid,
    pub email: String,
    pub name: Option<String>,
    pub avatar_url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

impl ProfileUpdate {
    pub fn validate(&self) -> Result<(), PayloadError> {
        if let Some(name) = &self.name {
            let len = name.trim().chars().count();
            if len < 2 {
                return Err(PayloadError::new("Name must be at least 2 characters"));
            }
            if len > 50 {
                return Err(PayloadError::new("Name cannot exceed 50 characters"));
            }
        }
        Ok(())
    }
}

/// Role and status change requested by an admin.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStatusUpdate {
    pub user_id: Uuid,
    #[serde(default)]
    pub is_admin: Option<bool>,
    #[serde(default)]
    pub is_active: Option<bool>,
}

impl UserStatusUpdate {
    pub fn validate(&self) -> Result<(), PayloadError> {
        if self.is_admin.is_none() && self.is_active.is_none() {
            return Err(PayloadError::new(
                "At least one status (isAdmin or isActive) must be provided and be a boolean",
            ));
        }
        Ok(())
    }

    /// Admins may not change the role or status of their own account.
    pub fn targets(&self, actor: Uuid) -> bool {
        self.user_id == actor
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profile_name_bounds() {
        let short = ProfileUpdate {
            name: Some("a".into()),
            avatar_url: None,
        };
        assert_eq!(
            short.validate().unwrap_err().message(),
            "Name must be at least 2 characters"
        );
        let long = ProfileUpdate {
            name: Some("x".repeat(51)),
            avatar_url: None,
        };
        assert_eq!(
            long.validate().unwrap_err().message(),
            "Name cannot exceed 50 characters"
        );
        assert!(ProfileUpdate::default().validate().is_ok());
    }

    #[test]
    fn status_update_needs_a_change() {
        let me = Uuid::new_v4();
        let empty = UserStatusUpdate {
            user_id: me,
            is_admin: None,
            is_active: None,
        };
        assert!(empty.validate().is_err());

        let block = UserStatusUpdate {
            user_id: me,
            is_admin: None,
            is_active: Some(false),
        };
        assert!(block.validate().is_ok());
        assert!(block.targets(me));
        assert!(!block.targets(Uuid::new_v4()));
    }
}
