//! Shared repository utilities.
//!
//! Record documents are stored as:
//!
//! ```text
//! <base_dir>/
//!   <s1>/
//!     <s2>/
//!       <id>.json
//! ```
//!
//! where `s1`/`s2` come from [`RecordId::sharded_dir`]. Writes land in `<id>.json.tmp` first and
//! are renamed into place, so a reader never sees a half-written document.

use crate::constants::{RECORD_EXTENSION, TEMP_EXTENSION};
use crate::error::{CoreError, CoreResult};
use rehab_forms::{FormEntry, FormTemplate, RecordId};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Returns the document path for `id` under `base_dir`.
pub fn record_path(base_dir: &Path, id: &RecordId) -> PathBuf {
    id.sharded_dir(base_dir)
        .join(format!("{id}.{RECORD_EXTENSION}"))
}

/// Serialises `row` as pretty JSON and writes it to `path` atomically.
///
/// # Errors
///
/// Returns [`CoreError::StorageDirCreation`] if the shard directory cannot be created,
/// [`CoreError::Serialization`] if encoding fails and [`CoreError::FileWrite`] if writing or
/// renaming fails.
pub(crate) fn write_record<T: Serialize>(path: &Path, row: &T) -> CoreResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(CoreError::StorageDirCreation)?;
    }

    let json = serde_json::to_string_pretty(row).map_err(CoreError::Serialization)?;
    let tmp = path.with_extension(TEMP_EXTENSION);
    fs::write(&tmp, json).map_err(CoreError::FileWrite)?;
    if let Err(e) = fs::rename(&tmp, path) {
        let _ = fs::remove_file(&tmp);
        return Err(CoreError::FileWrite(e));
    }
    Ok(())
}

/// Reads and decodes the document at `path`. A missing file is `Ok(None)`.
pub(crate) fn read_record<T: DeserializeOwned>(path: &Path) -> CoreResult<Option<T>> {
    let contents = match fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(CoreError::FileRead(e)),
    };
    serde_json::from_str(&contents)
        .map(Some)
        .map_err(CoreError::Deserialization)
}

/// Removes the document at `path`, returning whether it existed.
pub(crate) fn remove_record(path: &Path) -> CoreResult<bool> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(CoreError::FileRemove(e)),
    }
}

/// Reads every record document under `base_dir`.
///
/// Documents that cannot be read or decoded are logged as warnings and skipped; a missing
/// `base_dir` yields no records.
pub(crate) fn read_all_records<T: DeserializeOwned>(base_dir: &Path) -> Vec<T> {
    let mut rows = Vec::new();

    let s1_iter = match fs::read_dir(base_dir) {
        Ok(it) => it,
        Err(_) => return rows,
    };
    for s1 in s1_iter.flatten() {
        let s1_path = s1.path();
        if !s1_path.is_dir() {
            continue;
        }

        let s2_iter = match fs::read_dir(&s1_path) {
            Ok(it) => it,
            Err(_) => continue,
        };

        for s2 in s2_iter.flatten() {
            let s2_path = s2.path();
            if !s2_path.is_dir() {
                continue;
            }

            let doc_iter = match fs::read_dir(&s2_path) {
                Ok(it) => it,
                Err(_) => continue,
            };

            for doc in doc_iter.flatten() {
                let doc_path = doc.path();
                let is_record = doc_path
                    .extension()
                    .is_some_and(|ext| ext == RECORD_EXTENSION);
                if !doc_path.is_file() || !is_record {
                    continue;
                }

                match read_record::<T>(&doc_path) {
                    Ok(Some(row)) => rows.push(row),
                    Ok(None) => {}
                    Err(e) => {
                        tracing::warn!(
                            "failed to load record: {} - {}",
                            doc_path.display(),
                            e
                        );
                    }
                }
            }
        }
    }

    rows
}

/// Orders templates by creation time, then id.
pub(crate) fn sort_templates(templates: &mut [FormTemplate]) {
    templates.sort_by(|a, b| {
        a.created_at()
            .cmp(&b.created_at())
            .then_with(|| a.id().cmp(b.id()))
    });
}

/// Orders entries by creation time, then id.
pub(crate) fn sort_entries(entries: &mut [FormEntry]) {
    entries.sort_by(|a, b| {
        a.created_at()
            .cmp(&b.created_at())
            .then_with(|| a.id().cmp(b.id()))
    });
}
