//! Typed form payloads.
//!
//! An entry's data is a flat map of field id to [`FieldValue`]. On the wire a value is a plain
//! JSON scalar or string array, so payloads look the same as an untyped JSON object while the
//! in-memory side stays closed over the shapes a schema can declare.

use crate::{FormsError, FormsResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// A single answer in a form payload.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// Checkbox answer.
    Flag(bool),
    /// Number or rating answer.
    Number(f64),
    /// Free text, date (`YYYY-MM-DD`) or single select answer.
    Text(String),
    /// Checkbox-group answer.
    Options(Vec<String>),
}

impl FieldValue {
    /// Converts a JSON value without a schema.
    ///
    /// Returns `Ok(None)` for `null`. Objects and arrays containing anything but strings have no
    /// counterpart and are rejected.
    pub fn from_json(field: &str, value: &Value) -> FormsResult<Option<Self>> {
        let converted = match value {
            Value::Null => return Ok(None),
            Value::Bool(b) => Self::Flag(*b),
            Value::Number(n) => match n.as_f64() {
                Some(n) => Self::Number(n),
                None => return Err(unsupported(field)),
            },
            Value::String(s) => Self::Text(s.clone()),
            Value::Array(items) => {
                let options = items
                    .iter()
                    .map(|item| item.as_str().map(str::to_owned))
                    .collect::<Option<Vec<_>>>()
                    .ok_or_else(|| unsupported(field))?;
                Self::Options(options)
            }
            Value::Object(_) => return Err(unsupported(field)),
        };
        Ok(Some(converted))
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_flag(&self) -> Option<bool> {
        match self {
            Self::Flag(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_options(&self) -> Option<&[String]> {
        match self {
            Self::Options(o) => Some(o),
            _ => None,
        }
    }

    /// True for whitespace-only text and empty option lists.
    pub fn is_blank(&self) -> bool {
        match self {
            Self::Text(s) => s.trim().is_empty(),
            Self::Options(o) => o.is_empty(),
            Self::Flag(_) | Self::Number(_) => false,
        }
    }
}

fn unsupported(field: &str) -> FormsError {
    FormsError::UnsupportedValue {
        field: field.to_owned(),
    }
}

/// Field id to answer map carried by a form entry.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FormData(BTreeMap<String, FieldValue>);

impl FormData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Converts a JSON object without consulting a schema.
    ///
    /// `null` members are dropped. Use [`crate::FormSchema::validate`] when the template schema
    /// is at hand.
    ///
    /// # Errors
    ///
    /// Returns [`FormsError::InvalidInput`] if `value` is not an object and
    /// [`FormsError::UnsupportedValue`] for members with no [`FieldValue`] counterpart.
    pub fn from_json(value: &Value) -> FormsResult<Self> {
        let Value::Object(map) = value else {
            return Err(FormsError::InvalidInput(
                "form data must be a JSON object".into(),
            ));
        };

        let mut data = Self::new();
        for (key, raw) in map {
            if let Some(v) = FieldValue::from_json(key, raw)? {
                data.insert(key.clone(), v);
            }
        }
        Ok(data)
    }

    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.0.get(field)
    }

    pub fn insert(&mut self, field: impl Into<String>, value: FieldValue) -> Option<FieldValue> {
        self.0.insert(field.into(), value)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
