use common::ValidationError;
use sea_orm::DbErr;
use thiserror::Error;

/// A database failure with the driver error already rendered to text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("storage failure during {operation}: {detail}")]
pub struct StorageError {
    pub operation: &'static str,
    pub detail: String,
}

impl StorageError {
    pub fn new(operation: &'static str, err: DbErr) -> Self {
        Self {
            operation,
            detail: err.to_string(),
        }
    }
}

/// Why a message was not saved.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SaveError {
    #[error("invalid message: {0}")]
    Invalid(#[from] ValidationError),

    /// A row with this id already exists. Not a fault.
    #[error("message {0} already exists")]
    Duplicate(i64),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Anything that is not a storage failure, e.g. the content could not
    /// be rendered.
    #[error("unexpected failure: {0}")]
    Unexpected(String),
}
