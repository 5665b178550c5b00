//! Form schema definitions and boundary validation.
//!
//! A schema is a list of sections, each holding typed fields. Schemas are authored as YAML or
//! JSON and parsed strictly: unknown keys are rejected and the failing path is reported.
//!
//! ```yaml
//! sections:
//!   - id: mobility
//!     title: Mobility
//!     fields:
//!       - id: transfers
//!         label: Bed to chair transfer
//!         type: rating
//!         required: true
//!         min: 1
//!         max: 7
//!       - id: aids
//!         label: Walking aids
//!         type: checkbox-group
//!         options: [cane, frame, rail]
//! ```

use crate::data::{FieldValue, FormData};
use crate::{FieldViolation, FormsError, FormsResult};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;

/// Date format accepted by `date` fields.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Field type enumeration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FieldKind {
    Text,
    Date,
    Select,
    Rating,
    Number,
    Textarea,
    Checkbox,
    CheckboxGroup,
}

impl FieldKind {
    /// True for kinds whose answers must come from the declared options.
    pub fn has_options(self) -> bool {
        matches!(self, Self::Select | Self::CheckboxGroup)
    }

    /// True for kinds that accept `min`/`max` bounds.
    pub fn is_numeric(self) -> bool {
        matches!(self, Self::Rating | Self::Number)
    }
}

/// Structured field/section definition of a form template.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FormSchema {
    #[serde(default)]
    pub sections: Vec<SchemaSection>,
}

/// A titled group of fields.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SchemaSection {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub fields: Vec<SchemaField>,
}

/// A single typed field.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SchemaField {
    pub id: String,
    #[serde(default)]
    pub label: String,
    #[serde(rename = "type")]
    pub kind: FieldKind,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
}

impl FormSchema {
    /// Parse and check a schema from YAML (or JSON) text.
    ///
    /// # Errors
    ///
    /// Returns [`FormsError::SchemaMismatch`] with the failing path if the text does not match
    /// the schema structure, or [`FormsError::InvalidSchema`] if [`FormSchema::check`] fails.
    pub fn parse(text: &str) -> FormsResult<Self> {
        let deserializer = serde_yaml::Deserializer::from_str(text);
        let schema: Self = serde_path_to_error::deserialize(deserializer)
            .map_err(|err| mismatch(err.path().to_string(), err.into_inner()))?;
        schema.check()?;
        Ok(schema)
    }

    /// Parse and check a schema already decoded as JSON.
    ///
    /// # Errors
    ///
    /// As [`FormSchema::parse`].
    pub fn from_json(value: &Value) -> FormsResult<Self> {
        let schema: Self = serde_path_to_error::deserialize(value)
            .map_err(|err| mismatch(err.path().to_string(), err.into_inner()))?;
        schema.check()?;
        Ok(schema)
    }

    /// Structural checks that serde cannot express.
    ///
    /// - section and field ids are non-empty
    /// - field ids are unique across all sections
    /// - `min <= max` where both are set, and bounds only appear on numeric kinds
    /// - `select` and `checkbox-group` fields declare at least one option
    pub fn check(&self) -> FormsResult<()> {
        let mut seen = HashSet::new();

        for section in &self.sections {
            if section.id.trim().is_empty() {
                return Err(FormsError::InvalidSchema("section id cannot be empty".into()));
            }

            for field in &section.fields {
                if field.id.trim().is_empty() {
                    return Err(FormsError::InvalidSchema(format!(
                        "field id cannot be empty (section '{}')",
                        section.id
                    )));
                }
                if !seen.insert(field.id.as_str()) {
                    return Err(FormsError::InvalidSchema(format!(
                        "duplicate field id '{}'",
                        field.id
                    )));
                }
                if !field.kind.is_numeric() && (field.min.is_some() || field.max.is_some()) {
                    return Err(FormsError::InvalidSchema(format!(
                        "field '{}' declares bounds but is not numeric",
                        field.id
                    )));
                }
                if let (Some(min), Some(max)) = (field.min, field.max) {
                    if min > max {
                        return Err(FormsError::InvalidSchema(format!(
                            "field '{}' has min {min} greater than max {max}",
                            field.id
                        )));
                    }
                }
                if field.kind.has_options() && field.options.is_empty() {
                    return Err(FormsError::InvalidSchema(format!(
                        "field '{}' must declare options",
                        field.id
                    )));
                }
            }
        }

        Ok(())
    }

    /// Iterates over every field in declaration order.
    pub fn fields(&self) -> impl Iterator<Item = &SchemaField> {
        self.sections.iter().flat_map(|s| s.fields.iter())
    }

    /// Looks up a field by id.
    pub fn field(&self, id: &str) -> Option<&SchemaField> {
        self.fields().find(|f| f.id == id)
    }

    /// Validates submitted data against this schema and returns the typed payload.
    ///
    /// Every violation is collected, so a caller can report all problems at once.
    ///
    /// # Errors
    ///
    /// Returns [`FormsError::InvalidInput`] if `raw` is not a JSON object, otherwise
    /// [`FormsError::Validation`] listing each field that is undeclared, missing while
    /// required, or of the wrong shape for its kind.
    pub fn validate(&self, raw: &Value) -> FormsResult<FormData> {
        let Value::Object(map) = raw else {
            return Err(FormsError::InvalidInput(
                "form data must be a JSON object".into(),
            ));
        };

        let mut violations = Vec::new();
        let mut data = FormData::new();

        for key in map.keys() {
            if self.field(key).is_none() {
                violations.push(FieldViolation::new(key, "field is not declared in the schema"));
            }
        }

        for field in self.fields() {
            match map.get(&field.id) {
                None | Some(Value::Null) => {
                    if field.required {
                        violations.push(FieldViolation::new(&field.id, "required field is missing"));
                    }
                }
                Some(value) => match field.coerce(value) {
                    Ok(v) if field.required && v.is_blank() => {
                        violations.push(FieldViolation::new(&field.id, "required field is empty"));
                    }
                    Ok(v) => {
                        data.insert(field.id.clone(), v);
                    }
                    Err(reason) => violations.push(FieldViolation::new(&field.id, reason)),
                },
            }
        }

        if violations.is_empty() {
            Ok(data)
        } else {
            Err(FormsError::Validation(violations))
        }
    }
}

impl SchemaField {
    /// Converts a non-null JSON value according to this field's kind.
    fn coerce(&self, value: &Value) -> Result<FieldValue, String> {
        match self.kind {
            FieldKind::Text | FieldKind::Textarea => value
                .as_str()
                .map(|s| FieldValue::Text(s.to_owned()))
                .ok_or_else(|| "expected text".to_string()),
            FieldKind::Date => {
                let s = value.as_str().ok_or("expected a date string")?;
                NaiveDate::parse_from_str(s, DATE_FORMAT)
                    .map_err(|_| format!("'{s}' is not a YYYY-MM-DD date"))?;
                Ok(FieldValue::Text(s.to_owned()))
            }
            FieldKind::Select => {
                let s = value.as_str().ok_or("expected a single option")?;
                self.check_option(s)?;
                Ok(FieldValue::Text(s.to_owned()))
            }
            FieldKind::Checkbox => value
                .as_bool()
                .map(FieldValue::Flag)
                .ok_or_else(|| "expected true or false".to_string()),
            FieldKind::CheckboxGroup => {
                let items = value.as_array().ok_or("expected a list of options")?;
                let mut chosen = Vec::with_capacity(items.len());
                for item in items {
                    let s = item.as_str().ok_or("expected a list of options")?;
                    self.check_option(s)?;
                    chosen.push(s.to_owned());
                }
                Ok(FieldValue::Options(chosen))
            }
            FieldKind::Number => {
                let n = value.as_f64().ok_or("expected a number")?;
                self.check_bounds(n)?;
                Ok(FieldValue::Number(n))
            }
            FieldKind::Rating => {
                let n = value.as_f64().ok_or("expected a whole-number rating")?;
                if n.fract() != 0.0 {
                    return Err("expected a whole-number rating".into());
                }
                self.check_bounds(n)?;
                Ok(FieldValue::Number(n))
            }
        }
    }

    fn check_option(&self, choice: &str) -> Result<(), String> {
        if self.options.iter().any(|o| o == choice) {
            Ok(())
        } else {
            Err(format!("'{choice}' is not one of the declared options"))
        }
    }

    fn check_bounds(&self, n: f64) -> Result<(), String> {
        if let Some(min) = self.min {
            if n < min {
                return Err(format!("{n} is below the minimum {min}"));
            }
        }
        if let Some(max) = self.max {
            if n > max {
                return Err(format!("{n} is above the maximum {max}"));
            }
        }
        Ok(())
    }
}

fn mismatch(path: String, source: impl std::fmt::Display) -> FormsError {
    let path = if path.is_empty() || path == "." {
        "<root>".to_string()
    } else {
        path
    };
    FormsError::SchemaMismatch(format!("at {path}: {source}"))
}
