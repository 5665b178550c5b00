//! # Rehab Core
//!
//! Core business logic for rehabilitation form templates and form entries.
//!
//! This crate contains the storage and orchestration layer:
//! - Template versioning, publishing and archiving via [`FormService`]
//! - Entry lifecycle (create, submit data, complete, cancel) with a configurable
//!   transition policy
//! - Repositories: in-memory, and sharded JSON documents under `REHAB_DATA_DIR`
//!
//! **No interface concerns**: argument parsing, logging setup and reading the process
//! environment belong in `rehab-cli`. This crate receives a resolved [`CoreConfig`].

pub mod config;
pub mod constants;
pub mod error;
pub mod repositories;
pub mod service;

pub use config::CoreConfig;
pub use error::{CoreError, CoreResult};
pub use repositories::files::FileRepository;
pub use repositories::memory::InMemoryRepository;
pub use repositories::{EntryFilter, FormEntryRepository, FormTemplateRepository, TemplateFilter};
pub use service::{FormRepository, FormService};
