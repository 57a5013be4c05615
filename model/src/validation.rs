//! Submission validation built at runtime from a template's fields.
//!
//! Every field becomes a [`FieldRule`] derived from its type and `required`
//! flag. A [`SubmissionContract`] is the ordered list of those rules and is
//! applied to a payload keyed by field id.

use std::collections::HashMap;

use serde::{ser::SerializeMap, Serialize, Serializer};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::{
    error::{
        FieldError, ValidationFailure, MSG_EMPTY, MSG_NOT_BOOLEAN, MSG_NOT_INTEGER,
        MSG_NOT_STRING, MSG_REQUIRED, MSG_UNCHECKED,
    },
    FieldSpec, FieldType, TemplateField,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presence {
    Required,
    Optional,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    String,
    Integer,
    Boolean,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldRule {
    pub presence: Presence,
    pub value: ValueKind,
}

/// A submitted value after normalization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    String(String),
    Integer(i64),
    Boolean(bool),
    Null,
}

impl FieldValue {
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }
}

impl FieldRule {
    pub const fn for_field(kind: FieldType, required: bool) -> Self {
        let presence = if required {
            Presence::Required
        } else {
            Presence::Optional
        };
        let value = match kind {
            FieldType::String | FieldType::Text => ValueKind::String,
            FieldType::Integer => ValueKind::Integer,
            FieldType::Checkbox => ValueKind::Boolean,
        };
        Self { presence, value }
    }

    pub const fn is_required(&self) -> bool {
        matches!(self.presence, Presence::Required)
    }

    /// Checks a single value. `None` and JSON `null` both mean absent.
    pub fn check(&self, value: Option<&Value>) -> Result<FieldValue, &'static str> {
        let value = value.filter(|v| !v.is_null());
        match self.value {
            ValueKind::String => match value {
                None => self.absent(),
                Some(Value::String(s)) if s.is_empty() && self.is_required() => Err(MSG_EMPTY),
                Some(Value::String(s)) => Ok(FieldValue::String(s.clone())),
                Some(_) => Err(MSG_NOT_STRING),
            },
            ValueKind::Integer => match value {
                None => self.absent(),
                Some(Value::String(s)) if s.trim().is_empty() => self.absent(),
                Some(Value::String(s)) => s
                    .trim()
                    .parse::<i64>()
                    .map(FieldValue::Integer)
                    .map_err(|_| MSG_NOT_INTEGER),
                Some(Value::Number(n)) => integer_from_number(n)
                    .map(FieldValue::Integer)
                    .ok_or(MSG_NOT_INTEGER),
                Some(_) => Err(MSG_NOT_INTEGER),
            },
            ValueKind::Boolean => match value {
                None => self.absent(),
                Some(Value::Bool(true)) => Ok(FieldValue::Boolean(true)),
                Some(Value::Bool(false)) if self.is_required() => Err(MSG_UNCHECKED),
                Some(Value::Bool(false)) => Ok(FieldValue::Boolean(false)),
                Some(_) => Err(MSG_NOT_BOOLEAN),
            },
        }
    }

    fn absent(&self) -> Result<FieldValue, &'static str> {
        match self.presence {
            Presence::Required => Err(MSG_REQUIRED),
            Presence::Optional => Ok(FieldValue::Null),
        }
    }
}

fn integer_from_number(n: &serde_json::Number) -> Option<i64> {
    if let Some(i) = n.as_i64() {
        return Some(i);
    }
    // `i64::MAX as f64` rounds up to 2^63, which is already out of range.
    n.as_f64()
        .filter(|f| f.fract() == 0.0 && *f >= i64::MIN as f64 && *f < i64::MAX as f64)
        .map(|f| f as i64)
}

/// The field id named by a payload key. Only the canonical hyphenated
/// lowercase form counts, so no two keys can name the same field.
fn field_key(key: &str) -> Option<Uuid> {
    Uuid::parse_str(key)
        .ok()
        .filter(|id| id.to_string() == key)
}

/// Accepted values in field order. Every field of the contract is present;
/// optional fields without a value hold [`FieldValue::Null`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NormalizedValues(Vec<(Uuid, FieldValue)>);

impl NormalizedValues {
    pub fn get(&self, field_id: &Uuid) -> Option<&FieldValue> {
        self.0
            .iter()
            .find(|(id, _)| id == field_id)
            .map(|(_, value)| value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Uuid, &FieldValue)> {
        self.0.iter().map(|(id, value)| (id, value))
    }

    /// Values that end up as rows, skipping explicit nulls.
    pub fn present(&self) -> impl Iterator<Item = (&Uuid, &FieldValue)> {
        self.iter().filter(|(_, value)| !value.is_null())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for NormalizedValues {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (id, value) in &self.0 {
            map.serialize_entry(id, value)?;
        }
        map.end()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SubmissionContract {
    rules: Vec<(Uuid, FieldRule)>,
}

impl SubmissionContract {
    pub fn build(fields: impl IntoIterator<Item = FieldSpec>) -> Self {
        Self {
            rules: fields
                .into_iter()
                .map(|spec| (spec.id, FieldRule::for_field(spec.kind, spec.required)))
                .collect(),
        }
    }

    pub fn from_fields(fields: &[TemplateField]) -> Self {
        Self::build(fields.iter().map(FieldSpec::from))
    }

    pub fn rule(&self, field_id: &Uuid) -> Option<&FieldRule> {
        self.rules
            .iter()
            .find(|(id, _)| id == field_id)
            .map(|(_, rule)| rule)
    }

    pub fn contains(&self, field_id: &Uuid) -> bool {
        self.rule(field_id).is_some()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Payload keys that are not ids of this contract's fields.
    pub fn unknown_keys<'a>(&self, payload: &'a Map<String, Value>) -> Vec<&'a str> {
        payload
            .keys()
            .filter(|key| match field_key(key) {
                Some(id) => !self.contains(&id),
                None => true,
            })
            .map(String::as_str)
            .collect()
    }

    /// Applies every rule. Keys outside the contract are ignored here, callers
    /// reject them beforehand with [`SubmissionContract::unknown_keys`].
    pub fn apply(&self, payload: &Map<String, Value>) -> Result<NormalizedValues, ValidationFailure> {
        let by_id: HashMap<Uuid, &Value> = payload
            .iter()
            .filter_map(|(key, value)| field_key(key).map(|id| (id, value)))
            .collect();

        let mut values = Vec::with_capacity(self.rules.len());
        let mut errors = Vec::new();
        for (id, rule) in &self.rules {
            match rule.check(by_id.get(id).copied()) {
                Ok(value) => values.push((*id, value)),
                Err(message) => errors.push(FieldError::new(*id, message)),
            }
        }

        if errors.is_empty() {
            Ok(NormalizedValues(values))
        } else {
            Err(ValidationFailure { errors })
        }
    }
}
