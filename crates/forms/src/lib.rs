//! Form templates, form entries and their boundary models.
//!
//! This crate holds the in-memory side of the assessment workflow:
//! - [`FormTemplate`]: a versioned instrument definition with a [`FormSchema`]
//! - [`FormEntry`]: one patient's submission against a template, with a status lifecycle
//! - [`FormData`]: the typed payload an entry carries
//! - [`wire`]: request/response payloads and storage rows, and translation to/from the domain
//!
//! Entities do no I/O and raise no errors. Validation happens at the boundary: request payloads
//! are checked when converted into domain inputs, and submitted data is checked against the
//! template schema with [`FormSchema::validate`].

pub mod data;
pub mod entry;
pub mod schema;
pub mod template;
pub mod wire;

pub use data::{FieldValue, FormData};
pub use entry::{EntryPatch, EntryStatus, FormEntry, NewFormEntry, TransitionPolicy};
pub use schema::{FieldKind, FormSchema, SchemaField, SchemaSection};
pub use template::{FormTemplate, FormType, NewFormTemplate, TemplatePatch, TemplateStatus};

pub use rehab_uuid::RecordId;

use std::fmt;

/// A single schema violation found while validating submitted data.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldViolation {
    /// Field id the violation refers to.
    pub field: String,
    /// Human-readable reason.
    pub reason: String,
}

impl FieldViolation {
    pub fn new(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for FieldViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.reason)
    }
}

fn join_violations(violations: &[FieldViolation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Errors returned by the `rehab-forms` crate.
#[derive(Debug, thiserror::Error)]
pub enum FormsError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("invalid schema: {0}")]
    InvalidSchema(String),

    #[error("schema mismatch: {0}")]
    SchemaMismatch(String),

    #[error("unsupported value for field '{field}'")]
    UnsupportedValue { field: String },

    #[error("form data failed validation: {}", join_violations(.0))]
    Validation(Vec<FieldViolation>),

    #[error("entry cannot move from {from} to {to}")]
    InvalidTransition { from: EntryStatus, to: EntryStatus },

    #[error("invalid identifier: {0}")]
    Uuid(#[from] rehab_uuid::UuidError),
}

/// Type alias for Results that can fail with a [`FormsError`].
pub type FormsResult<T> = Result<T, FormsError>;
