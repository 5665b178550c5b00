//! Constants used throughout the core crate.
//!
//! Path and filename constants live here so storage layout stays consistent.

/// Default directory for record storage when no explicit directory is configured.
pub const DEFAULT_DATA_DIR: &str = "rehab_data";

/// Directory name for form template records.
pub const TEMPLATES_DIR_NAME: &str = "templates";

/// Directory name for form entry records.
pub const ENTRIES_DIR_NAME: &str = "entries";

/// Extension of stored record documents.
pub const RECORD_EXTENSION: &str = "json";

/// Extension used for in-flight writes before they are renamed into place.
pub const TEMP_EXTENSION: &str = "json.tmp";
