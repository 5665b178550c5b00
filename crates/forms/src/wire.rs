//! Wire models and translation helpers.
//!
//! Two families of wire types live here:
//! - **Payloads** (camelCase) exchanged with API clients: responses mirror the entities,
//!   requests carry optional, loosely-typed fields that are validated on conversion.
//! - **Rows** (snake_case) written to storage, one per record. This is where the
//!   `formId ↔ form_id` column mapping lives.
//!
//! Rows use `deny_unknown_fields`; request payloads do not, so clients can send extra keys.

use crate::data::FormData;
use crate::entry::{EntryPatch, EntryStatus, FormEntry, NewFormEntry};
use crate::schema::FormSchema;
use crate::template::{FormTemplate, FormType, NewFormTemplate, TemplatePatch, TemplateStatus};
use crate::{FormsError, FormsResult};
use chrono::{DateTime, Utc};
use rehab_uuid::RecordId;
use serde::{Deserialize, Serialize};
use serde_json::Value;

// ============================================================================
// Response payloads
// ============================================================================

/// Template as returned to API clients.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormTemplatePayload {
    pub id: RecordId,
    pub title: String,
    pub description: String,
    #[serde(rename = "type")]
    pub form_type: FormType,
    pub status: TemplateStatus,
    pub version: u32,
    pub schema: FormSchema,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<RecordId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_by: Option<RecordId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&FormTemplate> for FormTemplatePayload {
    fn from(t: &FormTemplate) -> Self {
        Self {
            id: t.id.clone(),
            title: t.title.clone(),
            description: t.description.clone(),
            form_type: t.form_type,
            status: t.status,
            version: t.version,
            schema: t.schema.clone(),
            created_by: t.created_by.clone(),
            updated_by: t.updated_by.clone(),
            created_at: t.created_at,
            updated_at: t.updated_at,
        }
    }
}

/// Entry as returned to API clients.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormEntryPayload {
    pub id: RecordId,
    pub form_id: RecordId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patient_id: Option<RecordId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_id: Option<RecordId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clinic_id: Option<RecordId>,
    pub status: EntryStatus,
    pub data: FormData,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<RecordId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_by: Option<RecordId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&FormEntry> for FormEntryPayload {
    fn from(e: &FormEntry) -> Self {
        Self {
            id: e.id.clone(),
            form_id: e.form_id.clone(),
            patient_id: e.patient_id.clone(),
            device_id: e.device_id.clone(),
            clinic_id: e.clinic_id.clone(),
            status: e.status,
            data: e.data.clone(),
            score: e.score,
            completed_at: e.completed_at,
            created_by: e.created_by.clone(),
            updated_by: e.updated_by.clone(),
            created_at: e.created_at,
            updated_at: e.updated_at,
        }
    }
}

// ============================================================================
// Request payloads
// ============================================================================

/// Body of a create-template request.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateFormTemplateReq {
    pub id: Option<String>,
    pub title: String,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub form_type: String,
    pub status: Option<String>,
    pub version: Option<u32>,
    pub schema: Option<Value>,
    pub created_by: Option<String>,
}

impl CreateFormTemplateReq {
    /// Validates the request and converts it into construction input.
    ///
    /// # Errors
    ///
    /// Returns [`FormsError::InvalidInput`] for an empty title, unknown type/status or a
    /// malformed id, and the schema errors of [`FormSchema::from_json`].
    pub fn into_new_template(self) -> FormsResult<NewFormTemplate> {
        let title = required_text("title", &self.title)?;
        let form_type = FormType::parse(&self.form_type)?;
        let status = self.status.as_deref().map(TemplateStatus::parse).transpose()?;
        let schema = self.schema.as_ref().map(FormSchema::from_json).transpose()?;
        let created_by = parse_id("createdBy", self.created_by)?;

        Ok(NewFormTemplate {
            id: parse_id("id", self.id)?,
            title,
            description: self.description.unwrap_or_default(),
            form_type,
            status,
            version: self.version,
            schema,
            updated_by: created_by.clone(),
            created_by,
        })
    }
}

/// Body of an update-template request. Absent fields are left untouched.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateFormTemplateReq {
    pub title: Option<String>,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub form_type: Option<String>,
    pub status: Option<String>,
    pub schema: Option<Value>,
    pub updated_by: Option<String>,
}

impl UpdateFormTemplateReq {
    /// Validates the request and converts it into a [`TemplatePatch`].
    pub fn into_patch(self) -> FormsResult<TemplatePatch> {
        Ok(TemplatePatch {
            title: self
                .title
                .as_deref()
                .map(|t| required_text("title", t))
                .transpose()?,
            description: self.description,
            form_type: self.form_type.as_deref().map(FormType::parse).transpose()?,
            status: self.status.as_deref().map(TemplateStatus::parse).transpose()?,
            schema: self.schema.as_ref().map(FormSchema::from_json).transpose()?,
            updated_by: parse_id("updatedBy", self.updated_by)?,
        })
    }
}

/// Body of a create-entry request.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateFormEntryReq {
    pub id: Option<String>,
    pub form_id: String,
    pub patient_id: Option<String>,
    pub device_id: Option<String>,
    pub clinic_id: Option<String>,
    pub status: Option<String>,
    pub data: Option<Value>,
    pub score: Option<f64>,
    pub created_by: Option<String>,
}

impl CreateFormEntryReq {
    /// Validates the request and converts it into construction input.
    ///
    /// `data` is converted without a schema; see [`FormData::from_json`].
    pub fn into_new_entry(self) -> FormsResult<NewFormEntry> {
        let form_id = parse_id("formId", Some(self.form_id))?
            .ok_or_else(|| FormsError::InvalidInput("formId is required".into()))?;
        let data = match self.data {
            Some(raw) => FormData::from_json(&raw)?,
            None => FormData::new(),
        };
        let created_by = parse_id("createdBy", self.created_by)?;

        Ok(NewFormEntry {
            id: parse_id("id", self.id)?,
            form_id,
            patient_id: parse_id("patientId", self.patient_id)?,
            device_id: parse_id("deviceId", self.device_id)?,
            clinic_id: parse_id("clinicId", self.clinic_id)?,
            status: self.status.as_deref().map(EntryStatus::parse).transpose()?,
            data,
            score: finite_score(self.score)?,
            updated_by: created_by.clone(),
            created_by,
        })
    }
}

/// Body of an update-entry request. Absent fields are left untouched.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateFormEntryReq {
    pub data: Option<Value>,
    pub score: Option<f64>,
    pub status: Option<String>,
    pub patient_id: Option<String>,
    pub device_id: Option<String>,
    pub clinic_id: Option<String>,
    pub updated_by: Option<String>,
}

impl UpdateFormEntryReq {
    /// Validates the request and converts it into an [`EntryPatch`].
    pub fn into_patch(self) -> FormsResult<EntryPatch> {
        Ok(EntryPatch {
            data: self.data.as_ref().map(FormData::from_json).transpose()?,
            score: finite_score(self.score)?,
            status: self.status.as_deref().map(EntryStatus::parse).transpose()?,
            patient_id: parse_id("patientId", self.patient_id)?,
            device_id: parse_id("deviceId", self.device_id)?,
            clinic_id: parse_id("clinicId", self.clinic_id)?,
            updated_by: parse_id("updatedBy", self.updated_by)?,
        })
    }
}

// ============================================================================
// Storage rows
// ============================================================================

/// Stored form template row.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FormTemplateRow {
    pub id: RecordId,
    pub title: String,
    pub description: String,
    #[serde(rename = "type")]
    pub form_type: FormType,
    pub status: TemplateStatus,
    pub version: u32,
    pub schema: FormSchema,
    pub created_by: Option<RecordId>,
    pub updated_by: Option<RecordId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&FormTemplate> for FormTemplateRow {
    fn from(t: &FormTemplate) -> Self {
        Self {
            id: t.id.clone(),
            title: t.title.clone(),
            description: t.description.clone(),
            form_type: t.form_type,
            status: t.status,
            version: t.version,
            schema: t.schema.clone(),
            created_by: t.created_by.clone(),
            updated_by: t.updated_by.clone(),
            created_at: t.created_at,
            updated_at: t.updated_at,
        }
    }
}

/// Restores a stored template. The schema is re-checked, so a row edited by hand into an
/// invalid schema fails with [`FormsError::InvalidSchema`].
impl TryFrom<FormTemplateRow> for FormTemplate {
    type Error = FormsError;

    fn try_from(row: FormTemplateRow) -> FormsResult<Self> {
        row.schema.check()?;
        Ok(Self {
            id: row.id,
            title: row.title,
            description: row.description,
            form_type: row.form_type,
            status: row.status,
            version: row.version.max(1),
            schema: row.schema,
            created_by: row.created_by,
            updated_by: row.updated_by,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Stored form entry row.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FormEntryRow {
    pub id: RecordId,
    pub form_id: RecordId,
    pub patient_id: Option<RecordId>,
    pub device_id: Option<RecordId>,
    pub clinic_id: Option<RecordId>,
    pub status: EntryStatus,
    pub data: FormData,
    pub score: Option<f64>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_by: Option<RecordId>,
    pub updated_by: Option<RecordId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&FormEntry> for FormEntryRow {
    fn from(e: &FormEntry) -> Self {
        Self {
            id: e.id.clone(),
            form_id: e.form_id.clone(),
            patient_id: e.patient_id.clone(),
            device_id: e.device_id.clone(),
            clinic_id: e.clinic_id.clone(),
            status: e.status,
            data: e.data.clone(),
            score: e.score,
            completed_at: e.completed_at,
            created_by: e.created_by.clone(),
            updated_by: e.updated_by.clone(),
            created_at: e.created_at,
            updated_at: e.updated_at,
        }
    }
}

impl From<FormEntryRow> for FormEntry {
    fn from(row: FormEntryRow) -> Self {
        Self {
            id: row.id,
            form_id: row.form_id,
            patient_id: row.patient_id,
            device_id: row.device_id,
            clinic_id: row.clinic_id,
            status: row.status,
            data: row.data,
            score: row.score,
            completed_at: row.completed_at,
            created_by: row.created_by,
            updated_by: row.updated_by,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

// ============================================================================
// Helper functions (internal)
// ============================================================================

/// Passes a score through if it is finite.
///
/// JSON has no encoding for `NaN` or infinities; serde_json writes them as `null`, so such a
/// score would silently vanish once stored.
///
/// # Errors
///
/// Returns [`FormsError::InvalidInput`] for `NaN` or an infinite score.
pub fn finite_score(score: Option<f64>) -> FormsResult<Option<f64>> {
    match score {
        Some(s) if !s.is_finite() => Err(FormsError::InvalidInput(format!(
            "score must be a finite number, got {s}"
        ))),
        other => Ok(other),
    }
}

fn parse_id(field: &str, value: Option<String>) -> FormsResult<Option<RecordId>> {
    value
        .map(|v| {
            RecordId::parse(&v)
                .map_err(|e| FormsError::InvalidInput(format!("{field}: {e}")))
        })
        .transpose()
}

fn required_text(field: &str, value: &str) -> FormsResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(FormsError::InvalidInput(format!("{field} cannot be empty")));
    }
    Ok(trimmed.to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::FieldValue;
    use serde_json::json;

    fn entry() -> FormEntry {
        let mut e = FormEntry::new(NewFormEntry {
            patient_id: Some(RecordId::parse("p1").unwrap()),
            clinic_id: Some(RecordId::parse("c1").unwrap()),
            ..NewFormEntry::new(RecordId::parse("f1").unwrap())
        });
        e.complete(Some(88.0));
        e
    }

    #[test]
    fn entry_payload_uses_camel_case() {
        let payload = FormEntryPayload::from(&entry());
        let value = serde_json::to_value(&payload).expect("serialize");

        assert_eq!(value["formId"], json!("f1"));
        assert_eq!(value["patientId"], json!("p1"));
        assert_eq!(value["clinicId"], json!("c1"));
        assert_eq!(value["status"], json!("completed"));
        assert_eq!(value["score"], json!(88.0));
        assert!(value.get("completedAt").is_some());
        assert!(value.get("deviceId").is_none());
        assert!(value.get("form_id").is_none());
    }

    #[test]
    fn entry_row_uses_snake_case_and_restores_entity() {
        let original = entry();
        let row = FormEntryRow::from(&original);
        let value = serde_json::to_value(&row).expect("serialize");

        assert_eq!(value["form_id"], json!("f1"));
        assert_eq!(value["status"], json!("completed"));
        assert!(value.get("formId").is_none());

        let back: FormEntryRow = serde_json::from_value(value).expect("deserialize");
        assert_eq!(FormEntry::from(back), original);
    }

    #[test]
    fn rows_reject_unknown_columns() {
        let mut value = serde_json::to_value(FormEntryRow::from(&entry())).unwrap();
        value["legacy"] = json!(true);
        assert!(serde_json::from_value::<FormEntryRow>(value).is_err());
    }

    #[test]
    fn template_payload_and_row_field_names() {
        let t = FormTemplate::new(NewFormTemplate::new("Barthel", FormType::Assessment));

        let payload = serde_json::to_value(FormTemplatePayload::from(&t)).unwrap();
        assert_eq!(payload["type"], json!("assessment"));
        assert_eq!(payload["status"], json!("draft"));
        assert!(payload.get("createdAt").is_some());

        let row = FormTemplateRow::from(&t);
        let value = serde_json::to_value(&row).unwrap();
        assert!(value.get("created_at").is_some());
        assert_eq!(FormTemplate::try_from(row).expect("restore"), t);
    }

    #[test]
    fn template_row_with_invalid_schema_is_rejected() {
        let t = FormTemplate::new(NewFormTemplate::new("Barthel", FormType::Assessment));
        let mut value = serde_json::to_value(FormTemplateRow::from(&t)).unwrap();
        value["schema"] = json!({
            "sections": [{
                "id": "s",
                "fields": [
                    {"id": "vas", "type": "rating"},
                    {"id": "vas", "type": "text"}
                ]
            }]
        });

        let row: FormTemplateRow = serde_json::from_value(value).expect("row shape is valid");
        let err = FormTemplate::try_from(row).expect_err("duplicate field ids");
        assert!(matches!(err, FormsError::InvalidSchema(_)));
    }

    #[test]
    fn create_entry_request_converts_with_defaults() {
        let req: CreateFormEntryReq = serde_json::from_value(json!({
            "formId": "f1",
            "patientId": "p1",
            "data": {"vas": 4, "note": null},
            "createdBy": "nurse-1"
        }))
        .expect("deserialize");

        let input = req.into_new_entry().expect("convert");
        assert_eq!(input.form_id.as_str(), "f1");
        assert_eq!(input.status, None);
        assert_eq!(input.data.get("vas"), Some(&FieldValue::Number(4.0)));
        assert_eq!(input.data.len(), 1);
        assert_eq!(input.created_by, input.updated_by);

        let e = FormEntry::new(input);
        assert_eq!(e.status(), EntryStatus::InProgress);
    }

    #[test]
    fn create_entry_request_rejects_bad_values() {
        let bad_status = CreateFormEntryReq {
            form_id: "f1".into(),
            status: Some("done".into()),
            ..CreateFormEntryReq::default()
        };
        assert!(matches!(
            bad_status.into_new_entry(),
            Err(FormsError::InvalidInput(_))
        ));

        let bad_id = CreateFormEntryReq {
            form_id: "f 1".into(),
            ..CreateFormEntryReq::default()
        };
        let err = bad_id.into_new_entry().expect_err("bad id");
        assert!(err.to_string().contains("formId"));
    }

    #[test]
    fn create_template_request_validates_schema_and_title() {
        let req: CreateFormTemplateReq = serde_json::from_value(json!({
            "title": "  Pain  ",
            "type": "questionnaire",
            "schema": {"sections": [{"id": "s", "fields": [{"id": "vas", "type": "rating", "min": 0, "max": 10}]}]}
        }))
        .unwrap();
        let input = req.into_new_template().expect("convert");
        assert_eq!(input.title, "Pain");
        assert_eq!(input.form_type, FormType::Questionnaire);
        assert_eq!(input.schema.as_ref().map(|s| s.fields().count()), Some(1));

        let blank = CreateFormTemplateReq {
            title: "   ".into(),
            form_type: "fim".into(),
            ..CreateFormTemplateReq::default()
        };
        assert!(matches!(
            blank.into_new_template(),
            Err(FormsError::InvalidInput(_))
        ));
    }

    #[test]
    fn requests_reject_non_finite_scores() {
        for bad in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let create = CreateFormEntryReq {
                form_id: "f1".into(),
                score: Some(bad),
                ..CreateFormEntryReq::default()
            };
            assert!(matches!(
                create.into_new_entry(),
                Err(FormsError::InvalidInput(_))
            ));

            let update = UpdateFormEntryReq {
                score: Some(bad),
                ..UpdateFormEntryReq::default()
            };
            assert!(matches!(update.into_patch(), Err(FormsError::InvalidInput(_))));
        }
        assert_eq!(finite_score(Some(-2.5)).unwrap(), Some(-2.5));
        assert_eq!(finite_score(None).unwrap(), None);
    }

    #[test]
    fn update_requests_convert_to_patches() {
        let patch = UpdateFormEntryReq {
            status: Some("cancelled".into()),
            score: Some(3.0),
            ..UpdateFormEntryReq::default()
        }
        .into_patch()
        .expect("convert");
        assert_eq!(patch.status, Some(EntryStatus::Cancelled));
        assert_eq!(patch.score, Some(3.0));
        assert!(patch.data.is_none());

        let patch = UpdateFormTemplateReq {
            status: Some("active".into()),
            ..UpdateFormTemplateReq::default()
        }
        .into_patch()
        .expect("convert");
        assert_eq!(patch.status, Some(TemplateStatus::Active));
        assert!(patch.title.is_none());
    }
}
