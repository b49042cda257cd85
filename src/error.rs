use std::sync::PoisonError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, JournalError>;

#[derive(Error, Debug)]
pub enum JournalError {
    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Upload too large: {size} bytes exceeds the {limit} byte limit")]
    UploadTooLarge { size: usize, limit: i64 },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Database lock poisoned: {0}")]
    LockError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<rusqlite::Error> for JournalError {
    fn from(err: rusqlite::Error) -> Self {
        match err {
            rusqlite::Error::QueryReturnedNoRows => JournalError::NotFound(err.to_string()),
            other => JournalError::DatabaseError(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for JournalError {
    fn from(err: serde_json::Error) -> Self {
        JournalError::SerializationError(err.to_string())
    }
}

impl<T> From<PoisonError<T>> for JournalError {
    fn from(err: PoisonError<T>) -> Self {
        JournalError::LockError(err.to_string())
    }
}
