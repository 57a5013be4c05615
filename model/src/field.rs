use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::UnsupportedFieldType;

pub const MAX_FIELDS: usize = 30;
pub const MAX_FIELD_TITLE_LEN: usize = 200;
pub const MAX_DESCRIPTION_LEN: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FieldType {
    String,
    Text,
    Integer,
    Checkbox,
}

impl FieldType {
    pub const fn as_str(&self) -> &'static str {
        match self {
            FieldType::String => "STRING",
            FieldType::Text => "TEXT",
            FieldType::Integer => "INTEGER",
            FieldType::Checkbox => "CHECKBOX",
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FieldType {
    type Err = UnsupportedFieldType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "STRING" => Ok(FieldType::String),
            "TEXT" => Ok(FieldType::Text),
            "INTEGER" => Ok(FieldType::Integer),
            "CHECKBOX" => Ok(FieldType::Checkbox),
            other => Err(UnsupportedFieldType::new(other)),
        }
    }
}

/// A persisted question of a template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateField {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub kind: FieldType,
    pub title: String,
    pub description: Option<String>,
    pub required: bool,
    pub show_in_results: bool,
    pub order: i32,
}

impl TemplateField {
    pub fn attributes(&self) -> FieldAttributes {
        FieldAttributes {
            kind: self.kind,
            title: self.title.clone(),
            description: self.description.clone(),
            required: self.required,
            show_in_results: self.show_in_results,
        }
    }
}

/// A field as sent by a client when creating or editing a template.
/// A missing `id` marks a field that does not exist yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDescriptor {
    #[serde(default)]
    pub id: Option<Uuid>,
    #[serde(rename = "type")]
    pub kind: FieldType,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub required: bool,
    #[serde(default = "default_show_in_results")]
    pub show_in_results: bool,
}

fn default_show_in_results() -> bool {
    true
}

impl FieldDescriptor {
    pub fn attributes(&self) -> FieldAttributes {
        FieldAttributes {
            kind: self.kind,
            title: self.title.clone(),
            description: self.description.clone(),
            required: self.required,
            show_in_results: self.show_in_results,
        }
    }
}

/// The mutable part of a field row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldAttributes {
    pub kind: FieldType,
    pub title: String,
    pub description: Option<String>,
    pub required: bool,
    pub show_in_results: bool,
}

impl FieldAttributes {
    pub fn into_field(self, id: Uuid, order: i32) -> TemplateField {
        TemplateField {
            id,
            kind: self.kind,
            title: self.title,
            description: self.description,
            required: self.required,
            show_in_results: self.show_in_results,
            order,
        }
    }
}

/// The slice of a field the submission validator cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub id: Uuid,
    pub kind: FieldType,
    pub required: bool,
}

impl From<&TemplateField> for FieldSpec {
    fn from(field: &TemplateField) -> Self {
        Self {
            id: field.id,
            kind: field.kind,
            required: field.required,
        }
    }
}
