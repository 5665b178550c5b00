//! Form entries and the submission lifecycle.
//!
//! ```text
//! InProgress ──complete──▶ Completed
//!     │                        │
//!     └──────cancel──────▶ Cancelled
//! ```
//!
//! The entity itself accepts every transition. Whether `Completed ↔ Cancelled` or a return to
//! `InProgress` is allowed is a policy decision made by the caller through
//! [`EntryStatus::check_transition`].

use crate::data::FormData;
use crate::{FormsError, FormsResult};
use chrono::{DateTime, Utc};
use rehab_uuid::RecordId;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Entry status enumeration.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryStatus {
    #[default]
    InProgress,
    Completed,
    Cancelled,
}

/// Which status transitions the service layer accepts.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransitionPolicy {
    /// Every transition is allowed.
    #[default]
    Permissive,
    /// Terminal states stay terminal; repeating the current state is allowed.
    Guarded,
}

impl TransitionPolicy {
    pub fn parse(s: &str) -> FormsResult<Self> {
        match s.trim().to_lowercase().as_str() {
            "permissive" => Ok(Self::Permissive),
            "guarded" => Ok(Self::Guarded),
            _ => Err(FormsError::InvalidInput(format!(
                "Invalid transition policy: {s}"
            ))),
        }
    }
}

impl EntryStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Parses an entry status from its wire representation (case-insensitive).
    pub fn parse(s: &str) -> FormsResult<Self> {
        match s.trim().to_lowercase().as_str() {
            "in_progress" => Ok(Self::InProgress),
            "completed" => Ok(Self::Completed),
            "cancelled" => Ok(Self::Cancelled),
            _ => Err(FormsError::InvalidInput(format!(
                "Invalid entry status: {s}"
            ))),
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    /// Transition table.
    ///
    /// | from \ to   | InProgress | Completed | Cancelled |
    /// |-------------|------------|-----------|-----------|
    /// | InProgress  | yes        | yes       | yes       |
    /// | Completed   | permissive | yes       | permissive|
    /// | Cancelled   | permissive | permissive| yes       |
    pub fn transition_allowed(self, to: EntryStatus, policy: TransitionPolicy) -> bool {
        match policy {
            TransitionPolicy::Permissive => true,
            TransitionPolicy::Guarded => self == to || !self.is_terminal(),
        }
    }

    /// Returns [`FormsError::InvalidTransition`] when the table rejects `self → to`.
    pub fn check_transition(self, to: EntryStatus, policy: TransitionPolicy) -> FormsResult<()> {
        if self.transition_allowed(to, policy) {
            Ok(())
        } else {
            Err(FormsError::InvalidTransition { from: self, to })
        }
    }
}

impl fmt::Display for EntryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntryStatus {
    type Err = FormsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Construction input for [`FormEntry::new`].
#[derive(Clone, Debug, PartialEq)]
pub struct NewFormEntry {
    pub id: Option<RecordId>,
    pub form_id: RecordId,
    pub patient_id: Option<RecordId>,
    pub device_id: Option<RecordId>,
    pub clinic_id: Option<RecordId>,
    pub status: Option<EntryStatus>,
    pub data: FormData,
    pub score: Option<f64>,
    pub created_by: Option<RecordId>,
    pub updated_by: Option<RecordId>,
}

impl NewFormEntry {
    pub fn new(form_id: RecordId) -> Self {
        Self {
            id: None,
            form_id,
            patient_id: None,
            device_id: None,
            clinic_id: None,
            status: None,
            data: FormData::new(),
            score: None,
            created_by: None,
            updated_by: None,
        }
    }
}

/// Partial update for [`FormEntry::update`]. `None` leaves a field untouched.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EntryPatch {
    /// Replaces the whole payload.
    pub data: Option<FormData>,
    pub score: Option<f64>,
    pub status: Option<EntryStatus>,
    pub patient_id: Option<RecordId>,
    pub device_id: Option<RecordId>,
    pub clinic_id: Option<RecordId>,
    pub updated_by: Option<RecordId>,
}

/// One patient's submission against a form template.
#[derive(Clone, Debug, PartialEq)]
pub struct FormEntry {
    pub(crate) id: RecordId,
    pub(crate) form_id: RecordId,
    pub(crate) patient_id: Option<RecordId>,
    pub(crate) device_id: Option<RecordId>,
    pub(crate) clinic_id: Option<RecordId>,
    pub(crate) status: EntryStatus,
    pub(crate) data: FormData,
    pub(crate) score: Option<f64>,
    pub(crate) completed_at: Option<DateTime<Utc>>,
    pub(crate) created_by: Option<RecordId>,
    pub(crate) updated_by: Option<RecordId>,
    pub(crate) created_at: DateTime<Utc>,
    pub(crate) updated_at: DateTime<Utc>,
}

impl FormEntry {
    /// Creates an entry. Missing id is generated and missing status is `InProgress`.
    ///
    /// An entry created directly as `Completed` is stamped with `completed_at` at creation.
    pub fn new(input: NewFormEntry) -> Self {
        let now = Utc::now();
        let status = input.status.unwrap_or_default();
        Self {
            id: input.id.unwrap_or_default(),
            form_id: input.form_id,
            patient_id: input.patient_id,
            device_id: input.device_id,
            clinic_id: input.clinic_id,
            status,
            data: input.data,
            score: input.score,
            completed_at: (status == EntryStatus::Completed).then_some(now),
            created_by: input.created_by,
            updated_by: input.updated_by,
            created_at: now,
            updated_at: now,
        }
    }

    /// Marks the entry completed and stamps `completed_at`.
    ///
    /// A provided score replaces the previous one; `None` keeps whatever score was set.
    /// Calling this again re-stamps `completed_at`.
    pub fn complete(&mut self, score: Option<f64>) {
        self.enter(EntryStatus::Completed);
        if let Some(score) = score {
            self.score = Some(score);
        }
        self.touch();
    }

    /// Marks the entry cancelled. Score and `completed_at` are kept.
    pub fn cancel(&mut self) {
        self.enter(EntryStatus::Cancelled);
        self.touch();
    }

    /// Applies the fields present in `patch` and refreshes `updated_at`, even for an empty patch.
    ///
    /// A status in the patch goes through the same path as [`complete`](Self::complete) and
    /// [`cancel`](Self::cancel), so moving to `Completed` stamps `completed_at`.
    pub fn update(&mut self, patch: EntryPatch) {
        if let Some(data) = patch.data {
            self.data = data;
        }
        if let Some(score) = patch.score {
            self.score = Some(score);
        }
        if let Some(patient_id) = patch.patient_id {
            self.patient_id = Some(patient_id);
        }
        if let Some(device_id) = patch.device_id {
            self.device_id = Some(device_id);
        }
        if let Some(clinic_id) = patch.clinic_id {
            self.clinic_id = Some(clinic_id);
        }
        if let Some(updated_by) = patch.updated_by {
            self.updated_by = Some(updated_by);
        }
        if let Some(status) = patch.status {
            self.enter(status);
        }
        self.touch();
    }

    fn enter(&mut self, status: EntryStatus) {
        self.status = status;
        if status == EntryStatus::Completed {
            self.completed_at = Some(Utc::now());
        }
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now().max(self.updated_at);
    }

    pub fn id(&self) -> &RecordId {
        &self.id
    }

    pub fn form_id(&self) -> &RecordId {
        &self.form_id
    }

    pub fn patient_id(&self) -> Option<&RecordId> {
        self.patient_id.as_ref()
    }

    pub fn device_id(&self) -> Option<&RecordId> {
        self.device_id.as_ref()
    }

    pub fn clinic_id(&self) -> Option<&RecordId> {
        self.clinic_id.as_ref()
    }

    pub fn status(&self) -> EntryStatus {
        self.status
    }

    pub fn data(&self) -> &FormData {
        &self.data
    }

    pub fn score(&self) -> Option<f64> {
        self.score
    }

    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::FieldValue;

    fn id(s: &str) -> RecordId {
        RecordId::parse(s).unwrap()
    }

    fn new_entry() -> FormEntry {
        FormEntry::new(NewFormEntry {
            patient_id: Some(id("p1")),
            ..NewFormEntry::new(id("f1"))
        })
    }

    #[test]
    fn new_entry_defaults() {
        let e = new_entry();
        assert_eq!(e.status(), EntryStatus::InProgress);
        assert!(e.data().is_empty());
        assert!(e.score().is_none());
        assert!(e.completed_at().is_none());
        assert_eq!(e.form_id().as_str(), "f1");
        assert_eq!(e.patient_id().map(RecordId::as_str), Some("p1"));
    }

    #[test]
    fn generated_ids_differ() {
        let a = new_entry();
        let b = new_entry();
        assert!(!a.id().as_str().is_empty());
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn complete_sets_status_timestamp_and_score() {
        let mut e = new_entry();
        e.complete(Some(90.0));
        assert_eq!(e.status(), EntryStatus::Completed);
        assert!(e.completed_at().is_some());
        assert_eq!(e.score(), Some(90.0));
    }

    #[test]
    fn complete_without_score_keeps_prior_score() {
        let mut fresh = new_entry();
        fresh.complete(None);
        assert_eq!(fresh.score(), None);

        let mut e = new_entry();
        e.complete(Some(70.0));
        e.complete(None);
        assert_eq!(e.score(), Some(70.0));

        e.complete(Some(75.0));
        assert_eq!(e.score(), Some(75.0));
    }

    #[test]
    fn cancel_leaves_score_and_completion_alone() {
        let mut e = new_entry();
        e.update(EntryPatch {
            score: Some(12.0),
            ..EntryPatch::default()
        });
        e.cancel();
        assert_eq!(e.status(), EntryStatus::Cancelled);
        assert!(e.completed_at().is_none());
        assert_eq!(e.score(), Some(12.0));

        e.cancel();
        assert_eq!(e.status(), EntryStatus::Cancelled);
    }

    #[test]
    fn empty_update_advances_updated_at() {
        let mut e = new_entry();
        let before = e.updated_at();
        e.update(EntryPatch::default());
        assert!(e.updated_at() >= before);
    }

    #[test]
    fn update_merges_fields() {
        let mut e = new_entry();
        let mut data = FormData::new();
        data.insert("vas", FieldValue::Number(3.0));

        e.update(EntryPatch {
            data: Some(data.clone()),
            device_id: Some(id("dev-9")),
            clinic_id: Some(id("c1")),
            updated_by: Some(id("nurse-2")),
            ..EntryPatch::default()
        });

        assert_eq!(e.data(), &data);
        assert_eq!(e.device_id().map(RecordId::as_str), Some("dev-9"));
        assert_eq!(e.clinic_id().map(RecordId::as_str), Some("c1"));
        assert_eq!(e.updated_by().map(RecordId::as_str), Some("nurse-2"));
        assert_eq!(e.patient_id().map(RecordId::as_str), Some("p1"));
        assert_eq!(e.status(), EntryStatus::InProgress);
    }

    #[test]
    fn status_change_through_update_stamps_completion() {
        let mut e = new_entry();
        e.update(EntryPatch {
            status: Some(EntryStatus::Completed),
            ..EntryPatch::default()
        });
        assert_eq!(e.status(), EntryStatus::Completed);
        assert!(e.completed_at().is_some());
    }

    #[test]
    fn created_completed_is_stamped() {
        let e = FormEntry::new(NewFormEntry {
            status: Some(EntryStatus::Completed),
            ..NewFormEntry::new(id("f1"))
        });
        assert_eq!(e.completed_at(), Some(e.created_at()));
    }

    #[test]
    fn complete_then_cancel_keeps_score_and_completion() {
        let mut e = new_entry();
        assert_eq!(e.status(), EntryStatus::InProgress);
        assert!(e.data().is_empty());

        e.complete(Some(95.0));
        assert_eq!(e.status(), EntryStatus::Completed);
        assert_eq!(e.score(), Some(95.0));
        let completed_at = e.completed_at().expect("completed_at set");

        e.cancel();
        assert_eq!(e.status(), EntryStatus::Cancelled);
        assert_eq!(e.score(), Some(95.0));
        assert_eq!(e.completed_at(), Some(completed_at));
    }

    #[test]
    fn permissive_policy_allows_everything() {
        let all = [
            EntryStatus::InProgress,
            EntryStatus::Completed,
            EntryStatus::Cancelled,
        ];
        for from in all {
            for to in all {
                assert!(from.transition_allowed(to, TransitionPolicy::Permissive));
            }
        }
    }

    #[test]
    fn guarded_policy_keeps_terminal_states() {
        use EntryStatus::*;
        let guarded = TransitionPolicy::Guarded;

        assert!(InProgress.transition_allowed(Completed, guarded));
        assert!(InProgress.transition_allowed(Cancelled, guarded));
        assert!(Completed.transition_allowed(Completed, guarded));
        assert!(Cancelled.transition_allowed(Cancelled, guarded));

        assert!(!Completed.transition_allowed(Cancelled, guarded));
        assert!(!Cancelled.transition_allowed(Completed, guarded));
        assert!(!Completed.transition_allowed(InProgress, guarded));

        let err = Cancelled
            .check_transition(Completed, guarded)
            .expect_err("guarded");
        assert_eq!(err.to_string(), "entry cannot move from cancelled to completed");
    }

    #[test]
    fn parses_wire_strings() {
        assert_eq!(EntryStatus::parse("in_progress").unwrap(), EntryStatus::InProgress);
        assert_eq!("COMPLETED".parse::<EntryStatus>().unwrap(), EntryStatus::Completed);
        assert!(EntryStatus::parse("done").is_err());
        assert_eq!(TransitionPolicy::parse("Guarded").unwrap(), TransitionPolicy::Guarded);
        assert!(TransitionPolicy::parse("strict").is_err());
    }
}
