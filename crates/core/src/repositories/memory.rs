//! Process-local repository backed by `RwLock`-guarded maps.

use super::shared::{sort_entries, sort_templates};
use super::{EntryFilter, FormEntryRepository, FormTemplateRepository, TemplateFilter};
use crate::error::{CoreError, CoreResult};
use rehab_forms::{FormEntry, FormTemplate, RecordId};
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// In-memory store for templates and entries.
///
/// Readers share the lock; writers hold it exclusively, so at most one write is in flight per
/// record kind.
#[derive(Debug, Default)]
pub struct InMemoryRepository {
    templates: RwLock<HashMap<RecordId, FormTemplate>>,
    entries: RwLock<HashMap<RecordId, FormEntry>>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

fn read<T>(lock: &RwLock<T>) -> CoreResult<RwLockReadGuard<'_, T>> {
    lock.read().map_err(|_| CoreError::LockPoisoned)
}

fn write<T>(lock: &RwLock<T>) -> CoreResult<RwLockWriteGuard<'_, T>> {
    lock.write().map_err(|_| CoreError::LockPoisoned)
}

impl FormTemplateRepository for InMemoryRepository {
    fn insert_template(&self, template: &FormTemplate) -> CoreResult<()> {
        let mut map = write(&self.templates)?;
        if map.contains_key(template.id()) {
            return Err(CoreError::DuplicateId(template.id().clone()));
        }
        map.insert(template.id().clone(), template.clone());
        Ok(())
    }

    fn get_template(&self, id: &RecordId) -> CoreResult<Option<FormTemplate>> {
        Ok(read(&self.templates)?.get(id).cloned())
    }

    fn save_template(&self, template: &FormTemplate) -> CoreResult<()> {
        let mut map = write(&self.templates)?;
        match map.get_mut(template.id()) {
            Some(slot) => {
                *slot = template.clone();
                Ok(())
            }
            None => Err(CoreError::TemplateNotFound(template.id().clone())),
        }
    }

    fn delete_template(&self, id: &RecordId) -> CoreResult<bool> {
        Ok(write(&self.templates)?.remove(id).is_some())
    }

    fn list_templates(&self, filter: &TemplateFilter) -> CoreResult<Vec<FormTemplate>> {
        let mut found: Vec<FormTemplate> = read(&self.templates)?
            .values()
            .filter(|t| filter.matches(t))
            .cloned()
            .collect();
        sort_templates(&mut found);
        Ok(found)
    }
}

impl FormEntryRepository for InMemoryRepository {
    fn insert_entry(&self, entry: &FormEntry) -> CoreResult<()> {
        let mut map = write(&self.entries)?;
        if map.contains_key(entry.id()) {
            return Err(CoreError::DuplicateId(entry.id().clone()));
        }
        map.insert(entry.id().clone(), entry.clone());
        Ok(())
    }

    fn get_entry(&self, id: &RecordId) -> CoreResult<Option<FormEntry>> {
        Ok(read(&self.entries)?.get(id).cloned())
    }

    fn save_entry(&self, entry: &FormEntry) -> CoreResult<()> {
        let mut map = write(&self.entries)?;
        match map.get_mut(entry.id()) {
            Some(slot) => {
                *slot = entry.clone();
                Ok(())
            }
            None => Err(CoreError::EntryNotFound(entry.id().clone())),
        }
    }

    fn delete_entry(&self, id: &RecordId) -> CoreResult<bool> {
        Ok(write(&self.entries)?.remove(id).is_some())
    }

    fn list_entries(&self, filter: &EntryFilter) -> CoreResult<Vec<FormEntry>> {
        let mut found: Vec<FormEntry> = read(&self.entries)?
            .values()
            .filter(|e| filter.matches(e))
            .cloned()
            .collect();
        sort_entries(&mut found);
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rehab_forms::{EntryStatus, FormType, NewFormEntry, NewFormTemplate};

    fn template() -> FormTemplate {
        FormTemplate::new(NewFormTemplate::new("Barthel", FormType::Assessment))
    }

    #[test]
    fn template_crud() {
        let repo = InMemoryRepository::new();
        let mut t = template();

        repo.insert_template(&t).expect("insert");
        assert!(matches!(
            repo.insert_template(&t),
            Err(CoreError::DuplicateId(_))
        ));

        t.publish();
        repo.save_template(&t).expect("save");
        assert_eq!(repo.get_template(t.id()).unwrap(), Some(t.clone()));

        assert!(repo.delete_template(t.id()).unwrap());
        assert!(!repo.delete_template(t.id()).unwrap());
        assert!(matches!(
            repo.save_template(&t),
            Err(CoreError::TemplateNotFound(_))
        ));
    }

    #[test]
    fn entry_listing_filters_and_orders() {
        let repo = InMemoryRepository::new();
        let form = RecordId::parse("f1").unwrap();

        let mut ids = Vec::new();
        for patient in ["p1", "p2", "p1"] {
            let e = FormEntry::new(NewFormEntry {
                patient_id: Some(RecordId::parse(patient).unwrap()),
                ..NewFormEntry::new(form.clone())
            });
            ids.push(e.id().clone());
            repo.insert_entry(&e).unwrap();
        }

        let p1 = repo
            .list_entries(&EntryFilter {
                patient_id: Some(RecordId::parse("p1").unwrap()),
                ..EntryFilter::default()
            })
            .unwrap();
        assert_eq!(p1.len(), 2);
        assert!(p1[0].created_at() <= p1[1].created_at());

        let mut e = repo.get_entry(&ids[1]).unwrap().expect("entry");
        e.cancel();
        repo.save_entry(&e).unwrap();

        let cancelled = repo
            .list_entries(&EntryFilter {
                status: Some(EntryStatus::Cancelled),
                ..EntryFilter::default()
            })
            .unwrap();
        assert_eq!(cancelled.len(), 1);
        assert_eq!(cancelled[0].id(), &ids[1]);
        assert_eq!(repo.list_entries(&EntryFilter::default()).unwrap().len(), 3);
    }
}
