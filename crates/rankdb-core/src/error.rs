use thiserror::Error;

use crate::types::Slot;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Unknown slot: {0}")]
    UnknownSlot(Slot),

    #[error("Document unavailable: {document}: {reason}")]
    DocumentUnavailable { document: String, reason: String },

    #[error("Persisted snapshot is corrupt: {0}")]
    PersistenceCorruption(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Operation failed: {0}")]
    Operation(String),
}

impl Error {
    pub fn unavailable(document: impl Into<String>, reason: impl ToString) -> Self {
        Self::DocumentUnavailable { document: document.into(), reason: reason.to_string() }
    }

    pub fn corrupt(reason: impl Into<String>) -> Self {
        Self::PersistenceCorruption(reason.into())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
