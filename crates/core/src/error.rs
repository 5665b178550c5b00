use rehab_forms::{FormsError, RecordId};

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("form template not found: {0}")]
    TemplateNotFound(RecordId),
    #[error("form entry not found: {0}")]
    EntryNotFound(RecordId),
    #[error("record already exists: {0}")]
    DuplicateId(RecordId),

    #[error("template {0} is not a draft; create a new version to change its schema or reopen it")]
    TemplateLocked(RecordId),
    #[error("template {0} is still referenced by form entries")]
    TemplateInUse(RecordId),
    #[error(
        "template '{title}' already has version {existing}; cannot create version {requested}"
    )]
    StaleVersion {
        title: String,
        existing: u32,
        requested: u32,
    },

    #[error("failed to create storage directory: {0}")]
    StorageDirCreation(std::io::Error),
    #[error("failed to write record file: {0}")]
    FileWrite(std::io::Error),
    #[error("failed to read record file: {0}")]
    FileRead(std::io::Error),
    #[error("failed to remove record file: {0}")]
    FileRemove(std::io::Error),
    #[error("failed to serialize record: {0}")]
    Serialization(serde_json::Error),
    #[error("failed to deserialize record: {0}")]
    Deserialization(serde_json::Error),
    #[error("repository lock poisoned")]
    LockPoisoned,

    #[error("forms error: {0}")]
    Forms(#[from] FormsError),
}

pub type CoreResult<T> = std::result::Result<T, CoreError>;
