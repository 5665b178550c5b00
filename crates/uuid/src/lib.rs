//! Record identifiers and sharded-path utilities.
//!
//! Every template and entry carries an opaque [`RecordId`]. The same type is used for the
//! associative references an entry holds (form, patient, device, clinic, actor), because those
//! ids come from other services and are only ever compared, never interpreted.
//!
//! ## Identifier form
//! - 1 to 128 characters
//! - Characters: `A-Z`, `a-z`, `0-9`, `_` and `-`
//! - Generated ids are UUIDv4 in simple form, e.g. `550e8400e29b41d4a716446655440000`
//!
//! ## Sharded directory layout
//! For an id `i` with lowercase hex SHA-256 digest `h`, records are stored under:
//! `parent_dir/<h[0..2]>/<h[2..4]>/`
//!
//! Hashing first means short hand-picked ids (`f1`, `clinic-north`) spread as evenly as
//! generated ones.

mod record_id;

pub use record_id::RecordId;

/// Error type for identifier operations.
#[derive(Debug, thiserror::Error)]
pub enum UuidError {
    /// Invalid input provided
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type for identifier operations.
pub type UuidResult<T> = Result<T, UuidError>;
