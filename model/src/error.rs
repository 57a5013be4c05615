use derive_more::{Display, Error};
use serde::Serialize;
use uuid::Uuid;

pub const MSG_REQUIRED: &str = "This field is required";
pub const MSG_EMPTY: &str = "This field cannot be empty";
pub const MSG_NOT_STRING: &str = "Expected a string";
pub const MSG_NOT_INTEGER: &str = "Value must be an integer";
pub const MSG_NOT_BOOLEAN: &str = "Expected a boolean";
pub const MSG_UNCHECKED: &str = "This field must be checked";

#[derive(Debug, Clone, PartialEq, Eq, Error, Display, Serialize)]
#[display("{field_id}: {message}")]
#[serde(rename_all = "camelCase")]
pub struct FieldError {
    pub field_id: Uuid,
    pub message: String,
}

impl FieldError {
    pub fn new(field_id: Uuid, message: impl Into<String>) -> Self {
        Self {
            field_id,
            message: message.into(),
        }
    }
}

/// One or more submitted values violated the rules of their field.
#[derive(Debug, Clone, PartialEq, Eq, Error, Display, Serialize)]
#[display("{} field(s) failed validation", errors.len())]
pub struct ValidationFailure {
    pub errors: Vec<FieldError>,
}

/// A field row carries a type outside of the known set. This is a broken
/// invariant of the stored data, not something a user can fix.
#[derive(Debug, Clone, PartialEq, Eq, Error, Display)]
#[display("Unsupported field type: {label}")]
pub struct UnsupportedFieldType {
    label: String,
}

impl UnsupportedFieldType {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }
}

/// A request body broke one of the static payload rules. Only the first
/// violation is reported.
#[derive(Debug, Clone, PartialEq, Eq, Error, Display)]
#[display("{message}")]
pub struct PayloadError {
    message: String,
}

impl PayloadError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}
