use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{error::PayloadError, template::OwnerSummary};

pub const MAX_COMMENT_LEN: usize = 1000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Tag {
    pub id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Topic {
    pub id: Uuid,
    pub name: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewTag {
    pub name: String,
}

impl NewTag {
    /// Trimmed name of the tag, rejected when blank or too long.
    pub fn normalized(&self) -> Result<&str, PayloadError> {
        let name = self.name.trim();
        if name.chars().count() < 2 {
            return Err(PayloadError::new("Tag name must be at least 2 characters"));
        }
        if name.chars().count() > 30 {
            return Err(PayloadError::new("Tag name cannot exceed 30 characters"));
        }
        Ok(name)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: Uuid,
    pub template_id: Uuid,
    pub content: String,
    pub user: OwnerSummary,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewComment {
    pub content: String,
}

impl NewComment {
    pub fn validate(&self) -> Result<(), PayloadError> {
        let len = self.content.chars().count();
        if self.content.trim().is_empty() {
            return Err(PayloadError::new("Comment cannot be empty"));
        }
        if len > MAX_COMMENT_LEN {
            return Err(PayloadError::new("Comment cannot exceed 1000 characters"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LikeStatus {
    pub has_liked: bool,
    pub like_count: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comment_bounds() {
        assert!(NewComment { content: "nice".into() }.validate().is_ok());
        assert!(NewComment { content: "   ".into() }.validate().is_err());
        assert!(NewComment {
            content: "a".repeat(1001)
        }
        .validate()
        .is_err());
    }

    #[test]
    fn tag_name_is_trimmed() {
        let tag = NewTag {
            name: "  rust ".into(),
        };
        assert_eq!(tag.normalized().unwrap(), "rust");
        assert!(NewTag { name: "x".into() }.normalized().is_err());
    }
}
