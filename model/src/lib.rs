pub mod catalog;
pub mod error;
mod field;
pub mod reconcile;
pub mod submission;
pub mod template;
pub mod user;
pub mod validation;

pub use catalog::{Comment, Tag, Topic};
pub use field::*;
pub use validation::{FieldValue, NormalizedValues, SubmissionContract};
