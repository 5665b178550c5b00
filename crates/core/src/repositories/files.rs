//! File-backed repository.
//!
//! ## Storage Layout
//!
//! ```text
//! <data_dir>/
//!   templates/<s1>/<s2>/<id>.json    # FormTemplateRow
//!   entries/<s1>/<s2>/<id>.json      # FormEntryRow
//! ```
//!
//! Rows are the snake_case storage models from `rehab_forms::wire`. A store-wide mutex
//! serialises writers so existence checks and writes cannot interleave between threads of one
//! process. Coordinating several processes over the same directory is out of scope.

use super::shared::{
    read_all_records, read_record, record_path, remove_record, sort_entries, sort_templates,
    write_record,
};
use super::{EntryFilter, FormEntryRepository, FormTemplateRepository, TemplateFilter};
use crate::config::CoreConfig;
use crate::error::{CoreError, CoreResult};
use rehab_forms::wire::{FormEntryRow, FormTemplateRow};
use rehab_forms::{FormEntry, FormTemplate, RecordId};
use std::fs;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};

/// Repository storing one JSON document per record under the configured data directory.
#[derive(Debug)]
pub struct FileRepository {
    templates_dir: PathBuf,
    entries_dir: PathBuf,
    write_lock: Mutex<()>,
}

impl FileRepository {
    /// Opens the store rooted at `cfg.data_dir()`, creating the record directories if needed.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::StorageDirCreation`] if a record directory cannot be created.
    pub fn open(cfg: &CoreConfig) -> CoreResult<Self> {
        let templates_dir = cfg.templates_dir();
        let entries_dir = cfg.entries_dir();
        fs::create_dir_all(&templates_dir).map_err(CoreError::StorageDirCreation)?;
        fs::create_dir_all(&entries_dir).map_err(CoreError::StorageDirCreation)?;

        tracing::debug!("file repository opened at {}", cfg.data_dir().display());

        Ok(Self {
            templates_dir,
            entries_dir,
            write_lock: Mutex::new(()),
        })
    }

    fn lock(&self) -> CoreResult<MutexGuard<'_, ()>> {
        self.write_lock.lock().map_err(|_| CoreError::LockPoisoned)
    }
}

impl FormTemplateRepository for FileRepository {
    fn insert_template(&self, template: &FormTemplate) -> CoreResult<()> {
        let _guard = self.lock()?;
        let path = record_path(&self.templates_dir, template.id());
        if path.exists() {
            return Err(CoreError::DuplicateId(template.id().clone()));
        }
        write_record(&path, &FormTemplateRow::from(template))
    }

    fn get_template(&self, id: &RecordId) -> CoreResult<Option<FormTemplate>> {
        let row: Option<FormTemplateRow> = read_record(&record_path(&self.templates_dir, id))?;
        Ok(row.map(FormTemplate::try_from).transpose()?)
    }

    fn save_template(&self, template: &FormTemplate) -> CoreResult<()> {
        let _guard = self.lock()?;
        let path = record_path(&self.templates_dir, template.id());
        if !path.is_file() {
            return Err(CoreError::TemplateNotFound(template.id().clone()));
        }
        write_record(&path, &FormTemplateRow::from(template))
    }

    fn delete_template(&self, id: &RecordId) -> CoreResult<bool> {
        let _guard = self.lock()?;
        remove_record(&record_path(&self.templates_dir, id))
    }

    fn list_templates(&self, filter: &TemplateFilter) -> CoreResult<Vec<FormTemplate>> {
        let mut found: Vec<FormTemplate> = read_all_records::<FormTemplateRow>(&self.templates_dir)
            .into_iter()
            .filter_map(|row| {
                let id = row.id.clone();
                FormTemplate::try_from(row)
                    .map_err(|e| tracing::warn!("skipping template {}: {}", id, e))
                    .ok()
            })
            .filter(|t| filter.matches(t))
            .collect();
        sort_templates(&mut found);
        Ok(found)
    }
}

impl FormEntryRepository for FileRepository {
    fn insert_entry(&self, entry: &FormEntry) -> CoreResult<()> {
        let _guard = self.lock()?;
        let path = record_path(&self.entries_dir, entry.id());
        if path.exists() {
            return Err(CoreError::DuplicateId(entry.id().clone()));
        }
        write_record(&path, &FormEntryRow::from(entry))
    }

    fn get_entry(&self, id: &RecordId) -> CoreResult<Option<FormEntry>> {
        let row: Option<FormEntryRow> = read_record(&record_path(&self.entries_dir, id))?;
        Ok(row.map(FormEntry::from))
    }

    fn save_entry(&self, entry: &FormEntry) -> CoreResult<()> {
        let _guard = self.lock()?;
        let path = record_path(&self.entries_dir, entry.id());
        if !path.is_file() {
            return Err(CoreError::EntryNotFound(entry.id().clone()));
        }
        write_record(&path, &FormEntryRow::from(entry))
    }

    fn delete_entry(&self, id: &RecordId) -> CoreResult<bool> {
        let _guard = self.lock()?;
        remove_record(&record_path(&self.entries_dir, id))
    }

    fn list_entries(&self, filter: &EntryFilter) -> CoreResult<Vec<FormEntry>> {
        let mut found: Vec<FormEntry> = read_all_records::<FormEntryRow>(&self.entries_dir)
            .into_iter()
            .map(FormEntry::from)
            .filter(|e| filter.matches(e))
            .collect();
        sort_entries(&mut found);
        Ok(found)
    }
}
