use thiserror::Error;

use crate::persistence::PersistenceError;

/// Recoverable failures of a player command. None of them is fatal; the
/// session reports them through the message log.
#[derive(Debug, Error)]
pub enum SimError {
    #[error("invalid input: {0}")]
    Validation(String),
    #[error("{0}")]
    InsufficientResource(String),
    #[error("{0}")]
    NotFound(String),
    #[error("save data is corrupt: {0}")]
    CorruptData(String),
    #[error("unknown event: {0}")]
    UnknownEvent(String),
    #[error("unknown action: {0}")]
    UnknownAction(String),
    #[error("storage unavailable: {0}")]
    Storage(String),
}

impl SimError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn insufficient(message: impl Into<String>) -> Self {
        Self::InsufficientResource(message.into())
    }
}

impl From<PersistenceError> for SimError {
    fn from(err: PersistenceError) -> Self {
        match err {
            PersistenceError::InvalidSlot(slot) => {
                SimError::Validation(format!("save slot {slot} does not exist (use 1-3)"))
            }
            PersistenceError::Malformed { .. } => SimError::CorruptData(err.to_string()),
            PersistenceError::Io { .. }
            | PersistenceError::Sqlite(_)
            | PersistenceError::Schema { .. } => {
                SimError::Storage(err.to_string())
            }
        }
    }
}
