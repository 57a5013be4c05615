use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{template::OwnerSummary, FieldType, FieldValue};

/// Body of a submission request: raw values keyed by field id.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionPayload {
    pub template_id: Uuid,
    #[serde(default)]
    pub values: Map<String, Value>,
}

/// A stored answer together with the field it answers.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldAnswer {
    pub field_id: Uuid,
    pub title: String,
    #[serde(rename = "type")]
    pub kind: FieldType,
    pub show_in_results: bool,
    pub value: FieldValue,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    pub id: Uuid,
    pub template_id: Uuid,
    pub submitter: OwnerSummary,
    pub answers: Vec<FieldAnswer>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// A submission as listed for the submitter.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSubmission {
    pub id: Uuid,
    pub template_id: Uuid,
    pub template_title: String,
    pub template_description: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize)]
pub struct SubmissionCreated {
    pub id: Uuid,
    pub message: &'static str,
}
