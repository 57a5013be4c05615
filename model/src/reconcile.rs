//! Planning of field-set changes for a template edit.
//!
//! The plan is computed purely from the persisted rows and the submitted
//! descriptor list; the storage layer executes it inside a transaction.

use std::collections::{HashMap, HashSet};

use derive_more::{Display, Error};
use uuid::Uuid;

use crate::{FieldAttributes, FieldDescriptor, TemplateField};

#[derive(Debug, Clone, PartialEq, Eq, Display, Error)]
pub enum ReconcileError {
    #[display("Field titles must be unique (duplicate '{title}')")]
    DuplicateTitle { title: String },
    #[display("Field {id} is listed more than once")]
    DuplicateField { id: Uuid },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldUpdate {
    pub id: Uuid,
    pub attributes: FieldAttributes,
    pub order: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldInsert {
    pub attributes: FieldAttributes,
    pub order: i32,
}

/// Writes needed to turn the persisted field set into the submitted one.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ReconcilePlan {
    pub updates: Vec<FieldUpdate>,
    pub inserts: Vec<FieldInsert>,
    /// Existing ids that survive, in submitted order.
    pub kept: Vec<Uuid>,
    pub deletes: Vec<Uuid>,
}

impl ReconcilePlan {
    pub fn is_noop(&self) -> bool {
        self.updates.is_empty() && self.inserts.is_empty() && self.deletes.is_empty()
    }

    pub fn write_count(&self) -> usize {
        self.updates.len() + self.inserts.len() + self.deletes.len()
    }
}

/// Fails when two submitted titles collide ignoring case.
pub fn check_unique_titles<'a>(
    titles: impl IntoIterator<Item = &'a str>,
) -> Result<(), ReconcileError> {
    let mut seen = HashSet::new();
    for title in titles {
        if !seen.insert(title.to_lowercase()) {
            return Err(ReconcileError::DuplicateTitle {
                title: title.to_owned(),
            });
        }
    }
    Ok(())
}

pub fn plan(
    existing: &[TemplateField],
    submitted: &[FieldDescriptor],
) -> Result<ReconcilePlan, ReconcileError> {
    check_unique_titles(submitted.iter().map(|d| d.title.as_str()))?;

    let by_id: HashMap<Uuid, &TemplateField> = existing.iter().map(|f| (f.id, f)).collect();
    let mut kept = Vec::new();
    let mut kept_set = HashSet::new();
    let mut updates = Vec::new();
    let mut inserts = Vec::new();

    for (index, descriptor) in submitted.iter().enumerate() {
        let order = index as i32;
        let attributes = descriptor.attributes();
        match descriptor.id.and_then(|id| by_id.get(&id)) {
            Some(current) => {
                if !kept_set.insert(current.id) {
                    return Err(ReconcileError::DuplicateField { id: current.id });
                }
                kept.push(current.id);
                if current.order != order || current.attributes() != attributes {
                    updates.push(FieldUpdate {
                        id: current.id,
                        attributes,
                        order,
                    });
                }
            }
            None => inserts.push(FieldInsert { attributes, order }),
        }
    }

    let deletes = existing
        .iter()
        .map(|f| f.id)
        .filter(|id| !kept_set.contains(id))
        .collect();

    Ok(ReconcilePlan {
        updates,
        inserts,
        kept,
        deletes,
    })
}
