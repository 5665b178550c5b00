//! Form template and entry operations.
//!
//! [`FormService`] loads entities from a repository, applies one entity operation and stores
//! the result. It is where the checks that entities deliberately leave out are made:
//! - referenced templates must exist
//! - published templates keep their schema
//! - new versions stay monotonic within a title lineage
//! - status changes respect the configured [`TransitionPolicy`](rehab_forms::TransitionPolicy)
//!
//! Submitted data is validated here against the referenced template's schema.
//!
//! Every mutation runs load, check, mutate and store under one service-wide write lock, so a
//! check can never be invalidated by a concurrent write through the same service (or its
//! clones). Reads take no lock.

use crate::config::CoreConfig;
use crate::error::{CoreError, CoreResult};
use crate::repositories::{
    EntryFilter, FormEntryRepository, FormTemplateRepository, TemplateFilter,
};
use rehab_forms::wire::finite_score;
use rehab_forms::{
    EntryPatch, EntryStatus, FormEntry, FormTemplate, NewFormEntry, NewFormTemplate, RecordId,
    TemplatePatch, TemplateStatus,
};
use serde_json::Value;
use std::sync::{Arc, Mutex, MutexGuard};

/// A store that persists both templates and entries.
pub trait FormRepository: FormTemplateRepository + FormEntryRepository {}

impl<T: FormTemplateRepository + FormEntryRepository> FormRepository for T {}

/// Service for form template and entry operations.
#[derive(Debug)]
pub struct FormService<R> {
    cfg: Arc<CoreConfig>,
    repo: Arc<R>,
    write_lock: Arc<Mutex<()>>,
}

impl<R> Clone for FormService<R> {
    fn clone(&self) -> Self {
        Self {
            cfg: Arc::clone(&self.cfg),
            repo: Arc::clone(&self.repo),
            write_lock: Arc::clone(&self.write_lock),
        }
    }
}

impl<R: FormRepository> FormService<R> {
    pub fn new(cfg: Arc<CoreConfig>, repo: Arc<R>) -> Self {
        Self {
            cfg,
            repo,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn config(&self) -> &CoreConfig {
        &self.cfg
    }

    fn lock_writes(&self) -> CoreResult<MutexGuard<'_, ()>> {
        self.write_lock.lock().map_err(|_| CoreError::LockPoisoned)
    }

    // ------------------------------------------------------------------------
    // Templates
    // ------------------------------------------------------------------------

    /// Creates and stores a template.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::StaleVersion`] if a template with the same title and version
    /// already exists, plus any repository error.
    pub fn create_template(&self, input: NewFormTemplate) -> CoreResult<FormTemplate> {
        let _guard = self.lock_writes()?;
        let template = FormTemplate::new(input);

        let lineage = self
            .repo
            .list_templates(&TemplateFilter::title(template.title()))?;
        if lineage.iter().any(|t| t.version() == template.version()) {
            return Err(CoreError::StaleVersion {
                title: template.title().to_owned(),
                existing: template.version(),
                requested: template.version(),
            });
        }

        self.repo.insert_template(&template)?;
        tracing::info!(
            "form template created: {} ('{}' v{})",
            template.id(),
            template.title(),
            template.version()
        );
        Ok(template)
    }

    /// Fetches a template by id.
    pub fn get_template(&self, id: &RecordId) -> CoreResult<FormTemplate> {
        tracing::debug!("loading form template {}", id);
        self.repo
            .get_template(id)?
            .ok_or_else(|| CoreError::TemplateNotFound(id.clone()))
    }

    pub fn list_templates(&self, filter: &TemplateFilter) -> CoreResult<Vec<FormTemplate>> {
        self.repo.list_templates(filter)
    }

    /// Highest version in a title lineage, if any template carries `title`.
    pub fn latest_version(&self, title: &str) -> CoreResult<Option<FormTemplate>> {
        Ok(self
            .repo
            .list_templates(&TemplateFilter::title(title))?
            .into_iter()
            .max_by_key(FormTemplate::version))
    }

    /// Applies a partial update to a template.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::TemplateLocked`] if the template is no longer a draft and the patch
    /// changes its schema or sets it back to draft; [`revise_template`](Self::revise_template) is
    /// the only way to get a draft from published content. Returns [`CoreError::StaleVersion`]
    /// if a new title moves the template into a lineage that already holds its version.
    pub fn update_template(&self, id: &RecordId, patch: TemplatePatch) -> CoreResult<FormTemplate> {
        let _guard = self.lock_writes()?;
        let mut template = self.get_template(id)?;

        let reopens = patch.status == Some(TemplateStatus::Draft);
        if !template.is_draft() && (patch.schema.is_some() || reopens) {
            return Err(CoreError::TemplateLocked(id.clone()));
        }

        if let Some(title) = patch.title.as_deref().filter(|t| *t != template.title()) {
            let clash = self
                .repo
                .list_templates(&TemplateFilter::title(title))?
                .iter()
                .any(|t| t.version() == template.version());
            if clash {
                return Err(CoreError::StaleVersion {
                    title: title.to_owned(),
                    existing: template.version(),
                    requested: template.version(),
                });
            }
        }

        template.update(patch);
        self.repo.save_template(&template)?;
        tracing::info!("form template updated: {}", id);
        Ok(template)
    }

    /// Creates and stores the next version of a template as a new draft.
    ///
    /// `actor`, when given, is recorded as the new version's `updated_by`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::StaleVersion`] if the lineage already holds a version equal to or
    /// higher than the one that would be created (the source is not the latest version).
    pub fn revise_template(
        &self,
        id: &RecordId,
        actor: Option<RecordId>,
    ) -> CoreResult<FormTemplate> {
        let _guard = self.lock_writes()?;
        let source = self.get_template(id)?;
        let mut next = source.create_new_version();
        if actor.is_some() {
            next.update(TemplatePatch {
                updated_by: actor,
                ..TemplatePatch::default()
            });
        }

        if let Some(latest) = self.latest_version(source.title())? {
            if latest.version() >= next.version() {
                return Err(CoreError::StaleVersion {
                    title: source.title().to_owned(),
                    existing: latest.version(),
                    requested: next.version(),
                });
            }
        }

        self.repo.insert_template(&next)?;
        tracing::info!(
            "form template revised: {} v{} -> {} v{}",
            source.id(),
            source.version(),
            next.id(),
            next.version()
        );
        Ok(next)
    }

    /// Marks a template active.
    pub fn publish_template(&self, id: &RecordId) -> CoreResult<FormTemplate> {
        let _guard = self.lock_writes()?;
        let mut template = self.get_template(id)?;
        template.publish();
        self.repo.save_template(&template)?;
        tracing::info!("form template published: {}", id);
        Ok(template)
    }

    /// Marks a template archived.
    pub fn archive_template(&self, id: &RecordId) -> CoreResult<FormTemplate> {
        let _guard = self.lock_writes()?;
        let mut template = self.get_template(id)?;
        template.archive();
        self.repo.save_template(&template)?;
        tracing::info!("form template archived: {}", id);
        Ok(template)
    }

    /// Deletes a template that no entry references.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::TemplateInUse`] if entries still reference it and
    /// [`CoreError::TemplateNotFound`] if it does not exist.
    pub fn delete_template(&self, id: &RecordId) -> CoreResult<()> {
        let _guard = self.lock_writes()?;
        let referencing = self.repo.list_entries(&EntryFilter {
            form_id: Some(id.clone()),
            ..EntryFilter::default()
        })?;
        if !referencing.is_empty() {
            return Err(CoreError::TemplateInUse(id.clone()));
        }

        if !self.repo.delete_template(id)? {
            return Err(CoreError::TemplateNotFound(id.clone()));
        }
        tracing::info!("form template deleted: {}", id);
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Entries
    // ------------------------------------------------------------------------

    /// Creates and stores an entry against an existing template.
    ///
    /// Data is stored as given; use [`submit_entry_data`](Self::submit_entry_data) to validate
    /// it against the template schema.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::TemplateNotFound`] if `input.form_id` does not resolve.
    pub fn create_entry(&self, input: NewFormEntry) -> CoreResult<FormEntry> {
        let _guard = self.lock_writes()?;
        finite_score(input.score)?;
        if self.repo.get_template(&input.form_id)?.is_none() {
            return Err(CoreError::TemplateNotFound(input.form_id));
        }

        let entry = FormEntry::new(input);
        self.repo.insert_entry(&entry)?;
        tracing::info!(
            "form entry created: {} (form {})",
            entry.id(),
            entry.form_id()
        );
        Ok(entry)
    }

    /// Fetches an entry by id.
    pub fn get_entry(&self, id: &RecordId) -> CoreResult<FormEntry> {
        tracing::debug!("loading form entry {}", id);
        self.repo
            .get_entry(id)?
            .ok_or_else(|| CoreError::EntryNotFound(id.clone()))
    }

    pub fn list_entries(&self, filter: &EntryFilter) -> CoreResult<Vec<FormEntry>> {
        self.repo.list_entries(filter)
    }

    /// Applies a partial update to an entry.
    ///
    /// # Errors
    ///
    /// Returns [`rehab_forms::FormsError::InvalidTransition`] (wrapped) if the patch changes
    /// status in a way the configured policy rejects.
    pub fn update_entry(&self, id: &RecordId, patch: EntryPatch) -> CoreResult<FormEntry> {
        let _guard = self.lock_writes()?;
        finite_score(patch.score)?;
        let mut entry = self.get_entry(id)?;
        if let Some(to) = patch.status {
            self.check_transition(&entry, to)?;
        }

        entry.update(patch);
        self.repo.save_entry(&entry)?;
        tracing::info!("form entry updated: {}", id);
        Ok(entry)
    }

    /// Validates `raw` against the referenced template's schema and replaces the entry data
    /// with the typed result.
    ///
    /// # Errors
    ///
    /// Returns [`rehab_forms::FormsError::Validation`] (wrapped) listing every violation.
    pub fn submit_entry_data(
        &self,
        id: &RecordId,
        raw: &Value,
        actor: Option<RecordId>,
    ) -> CoreResult<FormEntry> {
        let _guard = self.lock_writes()?;
        let mut entry = self.get_entry(id)?;
        let template = self.get_template(entry.form_id())?;
        let data = template.schema().validate(raw)?;

        entry.update(EntryPatch {
            data: Some(data),
            updated_by: actor,
            ..EntryPatch::default()
        });
        self.repo.save_entry(&entry)?;
        tracing::info!(
            "form entry data submitted: {} ({} fields)",
            id,
            entry.data().len()
        );
        Ok(entry)
    }

    /// Completes an entry. `score`, when given, replaces the stored score.
    pub fn complete_entry(&self, id: &RecordId, score: Option<f64>) -> CoreResult<FormEntry> {
        let _guard = self.lock_writes()?;
        finite_score(score)?;
        let mut entry = self.get_entry(id)?;
        self.check_transition(&entry, EntryStatus::Completed)?;

        entry.complete(score);
        self.repo.save_entry(&entry)?;
        tracing::info!("form entry completed: {}", id);
        Ok(entry)
    }

    /// Cancels an entry. Score and completion time are kept.
    pub fn cancel_entry(&self, id: &RecordId) -> CoreResult<FormEntry> {
        let _guard = self.lock_writes()?;
        let mut entry = self.get_entry(id)?;
        self.check_transition(&entry, EntryStatus::Cancelled)?;

        entry.cancel();
        self.repo.save_entry(&entry)?;
        tracing::info!("form entry cancelled: {}", id);
        Ok(entry)
    }

    /// Deletes an entry.
    pub fn delete_entry(&self, id: &RecordId) -> CoreResult<()> {
        let _guard = self.lock_writes()?;
        if !self.repo.delete_entry(id)? {
            return Err(CoreError::EntryNotFound(id.clone()));
        }
        tracing::info!("form entry deleted: {}", id);
        Ok(())
    }

    fn check_transition(&self, entry: &FormEntry, to: EntryStatus) -> CoreResult<()> {
        entry
            .status()
            .check_transition(to, self.cfg.transition_policy())
            .map_err(|e| {
                tracing::warn!("rejected transition for entry {}: {}", entry.id(), e);
                CoreError::from(e)
            })
    }
}
