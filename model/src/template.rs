use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    error::PayloadError, reconcile::check_unique_titles, FieldDescriptor, Tag, TemplateField,
    MAX_DESCRIPTION_LEN, MAX_FIELDS, MAX_FIELD_TITLE_LEN,
};

pub const MIN_TEMPLATE_TITLE_LEN: usize = 3;
pub const MAX_TEMPLATE_TITLE_LEN: usize = 200;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnerSummary {
    pub id: Uuid,
    pub name: Option<String>,
    pub avatar_url: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TopicSummary {
    pub id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct TemplateCounts {
    pub likes: i64,
    pub comments: i64,
    pub submissions: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateSummary {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub is_public: bool,
    pub image_url: Option<String>,
    pub topic: Option<TopicSummary>,
    pub owner: OwnerSummary,
    #[serde(rename = "_count")]
    pub counts: TemplateCounts,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateDetail {
    #[serde(flatten)]
    pub summary: TemplateSummary,
    pub template_fields: Vec<TemplateField>,
    pub template_tags: Vec<Tag>,
    pub access_grants: Vec<Uuid>,
}

/// Who may see, fill or edit a template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TemplateAccess {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub is_public: bool,
}

impl TemplateAccess {
    pub fn can_edit(&self, user_id: Uuid, is_admin: bool) -> bool {
        is_admin || self.owner_id == user_id
    }

    /// `granted` tells whether the user holds an access grant.
    pub fn can_view(&self, user_id: Option<Uuid>, is_admin: bool, granted: bool) -> bool {
        if self.is_public || is_admin || granted {
            return true;
        }
        user_id.is_some_and(|id| id == self.owner_id)
    }
}

fn default_public() -> bool {
    true
}

/// Body of template create and update requests.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplatePayload {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "default_public")]
    pub is_public: bool,
    #[serde(default)]
    pub topic_id: Option<Uuid>,
    #[serde(default)]
    pub image_url: Option<String>,
    pub template_fields: Vec<FieldDescriptor>,
    #[serde(default)]
    pub template_tags: Option<Vec<Uuid>>,
    #[serde(default)]
    pub access_grants: Option<Vec<Uuid>>,
}

impl TemplatePayload {
    pub fn validate(&self) -> Result<(), PayloadError> {
        let title_len = self.title.chars().count();
        if title_len < MIN_TEMPLATE_TITLE_LEN {
            return Err(PayloadError::new("Title must be at least 3 characters"));
        }
        if title_len > MAX_TEMPLATE_TITLE_LEN {
            return Err(PayloadError::new("Title must be less than 200 characters"));
        }
        check_description(self.description.as_deref())?;
        if self.template_fields.is_empty() {
            return Err(PayloadError::new("At least one field is required"));
        }
        if self.template_fields.len() > MAX_FIELDS {
            return Err(PayloadError::new("Maximum of 30 fields allowed"));
        }
        for field in &self.template_fields {
            let len = field.title.chars().count();
            if len == 0 {
                return Err(PayloadError::new("Title is required"));
            }
            if len > MAX_FIELD_TITLE_LEN {
                return Err(PayloadError::new("Title must be less than 200 characters"));
            }
            check_description(field.description.as_deref())?;
        }
        check_unique_titles(self.template_fields.iter().map(|f| f.title.as_str()))
            .map_err(|_| PayloadError::new("Field titles must be unique"))?;
        Ok(())
    }

    pub fn tags(&self) -> &[Uuid] {
        self.template_tags.as_deref().unwrap_or_default()
    }

    /// Grants only apply to templates that are not public.
    pub fn grants(&self) -> &[Uuid] {
        if self.is_public {
            &[]
        } else {
            self.access_grants.as_deref().unwrap_or_default()
        }
    }
}

fn check_description(description: Option<&str>) -> Result<(), PayloadError> {
    match description {
        Some(d) if d.chars().count() > MAX_DESCRIPTION_LEN => Err(PayloadError::new(
            "Description must be less than 500 characters",
        )),
        _ => Ok(()),
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SearchStats {
    pub likes: i64,
    pub submissions: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub owner: OwnerSummary,
    pub topic: Option<TopicSummary>,
    pub stats: SearchStats,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn payload(value: serde_json::Value) -> TemplatePayload {
        serde_json::from_value(value).unwrap()
    }

    fn message(payload: &TemplatePayload) -> String {
        payload.validate().unwrap_err().message().to_owned()
    }

    #[test]
    fn accepts_minimal_template() {
        let payload = payload(json!({
            "title": "Survey",
            "templateFields": [{ "type": "STRING", "title": "Name" }]
        }));
        assert!(payload.validate().is_ok());
        assert!(payload.is_public);
        assert!(payload.tags().is_empty());
    }

    #[test]
    fn rejects_short_title() {
        let payload = payload(json!({
            "title": "ab",
            "templateFields": [{ "type": "STRING", "title": "Name" }]
        }));
        assert_eq!(message(&payload), "Title must be at least 3 characters");
    }

    #[test]
    fn rejects_too_many_fields() {
        let fields: Vec<_> = (0..31)
            .map(|i| json!({ "type": "INTEGER", "title": format!("Q{i}") }))
            .collect();
        let payload = payload(json!({ "title": "Survey", "templateFields": fields }));
        assert_eq!(message(&payload), "Maximum of 30 fields allowed");
    }

    #[test]
    fn rejects_case_insensitive_duplicate_titles() {
        let payload = payload(json!({
            "title": "Survey",
            "templateFields": [
                { "type": "STRING", "title": "Name" },
                { "type": "TEXT", "title": "name" }
            ]
        }));
        assert_eq!(message(&payload), "Field titles must be unique");
    }

    #[test]
    fn grants_ignored_for_public_templates() {
        let user = Uuid::new_v4();
        let public = payload(json!({
            "title": "Survey",
            "isPublic": true,
            "accessGrants": [user],
            "templateFields": [{ "type": "STRING", "title": "Name" }]
        }));
        assert!(public.grants().is_empty());

        let private = payload(json!({
            "title": "Survey",
            "isPublic": false,
            "accessGrants": [user],
            "templateFields": [{ "type": "STRING", "title": "Name" }]
        }));
        assert_eq!(private.grants(), &[user]);
    }

    #[test]
    fn private_template_visibility() {
        let owner = Uuid::new_v4();
        let other = Uuid::new_v4();
        let access = TemplateAccess {
            id: Uuid::new_v4(),
            owner_id: owner,
            is_public: false,
        };
        assert!(access.can_view(Some(owner), false, false));
        assert!(!access.can_view(Some(other), false, false));
        assert!(access.can_view(Some(other), false, true));
        assert!(access.can_view(Some(other), true, false));
        assert!(!access.can_view(None, false, false));
        assert!(access.can_edit(owner, false));
        assert!(!access.can_edit(other, false));
    }
}
