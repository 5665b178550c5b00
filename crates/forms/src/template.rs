//! Form templates and their versioning.
//!
//! A template is the definition of an assessment instrument. Templates are revised by creating
//! a new, independent draft with the next version number; the source is never mutated.

use crate::schema::FormSchema;
use crate::{FormsError, FormsResult};
use chrono::{DateTime, Utc};
use rehab_uuid::RecordId;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Instrument type enumeration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormType {
    Assessment,
    Questionnaire,
    Survey,
    /// Therapeutic exercise programme (LFK).
    Lfk,
    /// Functional Independence Measure.
    Fim,
}

impl FormType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Assessment => "assessment",
            Self::Questionnaire => "questionnaire",
            Self::Survey => "survey",
            Self::Lfk => "lfk",
            Self::Fim => "fim",
        }
    }

    /// Parses a form type from its wire representation (case-insensitive).
    pub fn parse(s: &str) -> FormsResult<Self> {
        match s.trim().to_lowercase().as_str() {
            "assessment" => Ok(Self::Assessment),
            "questionnaire" => Ok(Self::Questionnaire),
            "survey" => Ok(Self::Survey),
            "lfk" => Ok(Self::Lfk),
            "fim" => Ok(Self::Fim),
            _ => Err(FormsError::InvalidInput(format!("Invalid form type: {s}"))),
        }
    }
}

impl fmt::Display for FormType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FormType {
    type Err = FormsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Template status enumeration.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemplateStatus {
    /// Being authored; the schema may still change.
    #[default]
    Draft,
    /// Published and in use for new entries.
    Active,
    /// Retired; kept for existing entries.
    Archived,
}

impl TemplateStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Active => "active",
            Self::Archived => "archived",
        }
    }

    /// Parses a template status from its wire representation (case-insensitive).
    pub fn parse(s: &str) -> FormsResult<Self> {
        match s.trim().to_lowercase().as_str() {
            "draft" => Ok(Self::Draft),
            "active" => Ok(Self::Active),
            "archived" => Ok(Self::Archived),
            _ => Err(FormsError::InvalidInput(format!(
                "Invalid template status: {s}"
            ))),
        }
    }
}

impl fmt::Display for TemplateStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TemplateStatus {
    type Err = FormsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Construction input for [`FormTemplate::new`].
///
/// Missing values fall back to permissive defaults: a generated id, `Draft`, version 1 and an
/// empty schema.
#[derive(Clone, Debug, PartialEq)]
pub struct NewFormTemplate {
    pub id: Option<RecordId>,
    pub title: String,
    pub description: String,
    pub form_type: FormType,
    pub status: Option<TemplateStatus>,
    pub version: Option<u32>,
    pub schema: Option<FormSchema>,
    pub created_by: Option<RecordId>,
    pub updated_by: Option<RecordId>,
}

impl NewFormTemplate {
    pub fn new(title: impl Into<String>, form_type: FormType) -> Self {
        Self {
            id: None,
            title: title.into(),
            description: String::new(),
            form_type,
            status: None,
            version: None,
            schema: None,
            created_by: None,
            updated_by: None,
        }
    }
}

/// Partial update for [`FormTemplate::update`]. `None` leaves a field untouched.
///
/// The version is deliberately absent: it only advances through
/// [`FormTemplate::create_new_version`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TemplatePatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub form_type: Option<FormType>,
    pub status: Option<TemplateStatus>,
    pub schema: Option<FormSchema>,
    pub updated_by: Option<RecordId>,
}

impl TemplatePatch {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

/// A versioned assessment instrument definition.
#[derive(Clone, Debug, PartialEq)]
pub struct FormTemplate {
    pub(crate) id: RecordId,
    pub(crate) title: String,
    pub(crate) description: String,
    pub(crate) form_type: FormType,
    pub(crate) status: TemplateStatus,
    pub(crate) version: u32,
    pub(crate) schema: FormSchema,
    pub(crate) created_by: Option<RecordId>,
    pub(crate) updated_by: Option<RecordId>,
    pub(crate) created_at: DateTime<Utc>,
    pub(crate) updated_at: DateTime<Utc>,
}

impl FormTemplate {
    /// Creates a template, applying the defaults documented on [`NewFormTemplate`].
    ///
    /// A version of 0 is raised to 1.
    pub fn new(input: NewFormTemplate) -> Self {
        let now = Utc::now();
        Self {
            id: input.id.unwrap_or_default(),
            title: input.title,
            description: input.description,
            form_type: input.form_type,
            status: input.status.unwrap_or_default(),
            version: input.version.unwrap_or(1).max(1),
            schema: input.schema.unwrap_or_default(),
            created_by: input.created_by,
            updated_by: input.updated_by,
            created_at: now,
            updated_at: now,
        }
    }

    /// Returns the next version of this template as a new draft.
    ///
    /// The result has a fresh id and timestamps, `version + 1` and `Draft` status whatever this
    /// template's status is. Title, description, type, schema and actor references are copied.
    /// `self` is left untouched and nothing is persisted.
    pub fn create_new_version(&self) -> Self {
        let now = Utc::now();
        Self {
            id: RecordId::new(),
            title: self.title.clone(),
            description: self.description.clone(),
            form_type: self.form_type,
            status: TemplateStatus::Draft,
            version: self.version.saturating_add(1),
            schema: self.schema.clone(),
            created_by: self.created_by.clone(),
            updated_by: self.updated_by.clone(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Applies the fields present in `patch` and refreshes `updated_at`.
    ///
    /// Values are not validated here.
    pub fn update(&mut self, patch: TemplatePatch) {
        if let Some(title) = patch.title {
            self.title = title;
        }
        if let Some(description) = patch.description {
            self.description = description;
        }
        if let Some(form_type) = patch.form_type {
            self.form_type = form_type;
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(schema) = patch.schema {
            self.schema = schema;
        }
        if let Some(updated_by) = patch.updated_by {
            self.updated_by = Some(updated_by);
        }
        self.touch();
    }

    /// Marks the template active.
    pub fn publish(&mut self) {
        self.status = TemplateStatus::Active;
        self.touch();
    }

    /// Marks the template archived.
    pub fn archive(&mut self) {
        self.status = TemplateStatus::Archived;
        self.touch();
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now().max(self.updated_at);
    }

    pub fn id(&self) -> &RecordId {
        &self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn form_type(&self) -> FormType {
        self.form_type
    }

    pub fn status(&self) -> TemplateStatus {
        self.status
    }

    pub fn is_draft(&self) -> bool {
        self.status == TemplateStatus::Draft
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn schema(&self) -> &FormSchema {
        &self.schema
    }

    pub fn created_by(&self) -> Option<&RecordId> {
        self.created_by.as_ref()
    }

    pub fn updated_by(&self) -> Option<&RecordId> {
        self.updated_by.as_ref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}
