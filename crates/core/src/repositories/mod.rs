//! Repository abstractions and implementations.
//!
//! Entities do no I/O; repositories persist them. Two implementations are provided:
//! - [`memory::InMemoryRepository`]: process-local maps, for tests and embedding
//! - [`files::FileRepository`]: one JSON row per record in a sharded directory tree
//!
//! Both implement [`FormTemplateRepository`] and [`FormEntryRepository`]. Method names carry
//! the record kind so a single store can implement both traits without ambiguity.

pub mod files;
pub mod memory;
pub mod shared;

use crate::error::CoreResult;
use rehab_forms::{
    EntryStatus, FormEntry, FormTemplate, FormType, RecordId, TemplateStatus,
};

/// Persistence for form templates.
pub trait FormTemplateRepository: Send + Sync {
    /// Stores a new template. Fails with `DuplicateId` if the id is taken.
    fn insert_template(&self, template: &FormTemplate) -> CoreResult<()>;

    fn get_template(&self, id: &RecordId) -> CoreResult<Option<FormTemplate>>;

    /// Overwrites an existing template. Fails with `TemplateNotFound` if it does not exist.
    fn save_template(&self, template: &FormTemplate) -> CoreResult<()>;

    /// Removes a template, returning whether it existed.
    fn delete_template(&self, id: &RecordId) -> CoreResult<bool>;

    /// Templates matching `filter`, ordered by creation time then id.
    fn list_templates(&self, filter: &TemplateFilter) -> CoreResult<Vec<FormTemplate>>;
}

/// Persistence for form entries.
pub trait FormEntryRepository: Send + Sync {
    /// Stores a new entry. Fails with `DuplicateId` if the id is taken.
    fn insert_entry(&self, entry: &FormEntry) -> CoreResult<()>;

    fn get_entry(&self, id: &RecordId) -> CoreResult<Option<FormEntry>>;

    /// Overwrites an existing entry. Fails with `EntryNotFound` if it does not exist.
    fn save_entry(&self, entry: &FormEntry) -> CoreResult<()>;

    /// Removes an entry, returning whether it existed.
    fn delete_entry(&self, id: &RecordId) -> CoreResult<bool>;

    /// Entries matching `filter`, ordered by creation time then id.
    fn list_entries(&self, filter: &EntryFilter) -> CoreResult<Vec<FormEntry>>;
}

/// Template lookup criteria. Unset criteria match everything.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TemplateFilter {
    /// Exact title match (title lineage).
    pub title: Option<String>,
    pub form_type: Option<FormType>,
    pub status: Option<TemplateStatus>,
}

impl TemplateFilter {
    pub fn title(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Self::default()
        }
    }

    pub fn matches(&self, template: &FormTemplate) -> bool {
        self.title.as_deref().map_or(true, |t| template.title() == t)
            && self.form_type.map_or(true, |t| template.form_type() == t)
            && self.status.map_or(true, |s| template.status() == s)
    }
}

/// Entry lookup criteria. Unset criteria match everything.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EntryFilter {
    pub form_id: Option<RecordId>,
    pub patient_id: Option<RecordId>,
    pub device_id: Option<RecordId>,
    pub clinic_id: Option<RecordId>,
    pub status: Option<EntryStatus>,
}

impl EntryFilter {
    pub fn matches(&self, entry: &FormEntry) -> bool {
        fn same(want: Option<&RecordId>, have: Option<&RecordId>) -> bool {
            want.map_or(true, |w| have == Some(w))
        }

        same(self.form_id.as_ref(), Some(entry.form_id()))
            && same(self.patient_id.as_ref(), entry.patient_id())
            && same(self.device_id.as_ref(), entry.device_id())
            && same(self.clinic_id.as_ref(), entry.clinic_id())
            && self.status.map_or(true, |s| entry.status() == s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rehab_forms::{NewFormEntry, NewFormTemplate};

    fn id(s: &str) -> RecordId {
        RecordId::parse(s).unwrap()
    }

    #[test]
    fn template_filter_matches_on_every_set_criterion() {
        let t = FormTemplate::new(NewFormTemplate::new("Barthel", FormType::Assessment));

        assert!(TemplateFilter::default().matches(&t));
        assert!(TemplateFilter::title("Barthel").matches(&t));
        assert!(!TemplateFilter::title("FIM").matches(&t));

        let filter = TemplateFilter {
            form_type: Some(FormType::Assessment),
            status: Some(TemplateStatus::Active),
            ..TemplateFilter::default()
        };
        assert!(!filter.matches(&t));
    }

    #[test]
    fn entry_filter_matches_references() {
        let e = FormEntry::new(NewFormEntry {
            patient_id: Some(id("p1")),
            ..NewFormEntry::new(id("f1"))
        });

        assert!(EntryFilter::default().matches(&e));

        let by_patient = EntryFilter {
            patient_id: Some(id("p1")),
            status: Some(EntryStatus::InProgress),
            ..EntryFilter::default()
        };
        assert!(by_patient.matches(&e));

        let by_device = EntryFilter {
            device_id: Some(id("d1")),
            ..EntryFilter::default()
        };
        assert!(!by_device.matches(&e));

        let by_form = EntryFilter {
            form_id: Some(id("f2")),
            ..EntryFilter::default()
        };
        assert!(!by_form.matches(&e));
    }
}
