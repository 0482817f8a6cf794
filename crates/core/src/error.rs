use std::fmt;

/// The kind of record an operation referred to, used in not-found errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Ward,
    Patient,
    Appointment,
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RecordKind::Ward => "ward",
            RecordKind::Patient => "patient",
            RecordKind::Appointment => "appointment",
        };
        f.write_str(name)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("{kind} not found: {id}")]
    NotFound { kind: RecordKind, id: String },
    #[error("{0}")]
    Capacity(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("invalid input: {0}")]
    Validation(String),

    #[error("failed to create storage directory: {0}")]
    StorageDirCreation(std::io::Error),
    #[error("failed to write document file: {0}")]
    FileWrite(std::io::Error),
    #[error("failed to read document file: {0}")]
    FileRead(std::io::Error),
    #[error("failed to remove document file: {0}")]
    FileRemove(std::io::Error),
    #[error("failed to serialize document: {0}")]
    Serialization(serde_json::Error),
    #[error("failed to deserialize document: {0}")]
    Deserialization(serde_json::Error),

    #[error("identifier error: {0}")]
    Uuid(#[from] ward_uuid::UuidError),
    #[error("text error: {0}")]
    Text(#[from] ward_types::TextError),
}

impl CoreError {
    pub(crate) fn not_found(kind: RecordKind, id: impl ToString) -> Self {
        CoreError::NotFound {
            kind,
            id: id.to_string(),
        }
    }

    /// Stable, machine-readable label for this error, suitable for API responses.
    pub fn kind(&self) -> &'static str {
        match self {
            CoreError::NotFound { .. } => "not_found",
            CoreError::Capacity(_) => "capacity",
            CoreError::Conflict(_) => "conflict",
            CoreError::Validation(_) | CoreError::Uuid(_) | CoreError::Text(_) => "validation",
            CoreError::StorageDirCreation(_)
            | CoreError::FileWrite(_)
            | CoreError::FileRead(_)
            | CoreError::FileRemove(_)
            | CoreError::Serialization(_)
            | CoreError::Deserialization(_) => "storage",
        }
    }
}

pub type CoreResult<T> = std::result::Result<T, CoreError>;
