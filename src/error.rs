use crate::domain::ids::{BoardId, ColumnId, TaskId};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, HlaviError>;

/// Rejected input on a name, WIP limit or column position.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field} must not be empty")]
    Empty { field: &'static str },

    #[error("{field} must be at most {max} characters (got {actual})")]
    TooLong {
        field: &'static str,
        max: usize,
        actual: usize,
    },

    #[error("WIP limit must be a positive integer")]
    InvalidWipLimit,

    #[error("Column position {position} is out of range 0..={max}")]
    PositionOutOfRange { position: usize, max: usize },
}

/// Errors returned by board operations. None of them leave the board modified.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Column not found: {0}")]
    ColumnNotFound(ColumnId),

    #[error("Column {id} still holds {count} card(s)")]
    ColumnNotEmpty { id: ColumnId, count: usize },

    #[error("Column {column_id} is at its WIP limit of {limit} ({count} card(s))")]
    WipLimitExceeded {
        column_id: ColumnId,
        limit: u32,
        count: usize,
    },

    #[error("Invalid placement: {0}")]
    InvalidPlacement(String),

    #[error("No card on this board for task {0}")]
    CardNotFound(TaskId),

    #[error("Inconsistent board state: {0}")]
    InconsistentState(String),
}

impl DomainError {
    pub(crate) fn invalid_placement(reason: impl Into<String>) -> Self {
        Self::InvalidPlacement(reason.into())
    }

    pub(crate) fn inconsistent(reason: impl Into<String>) -> Self {
        Self::InconsistentState(reason.into())
    }
}

#[derive(Debug, Error)]
pub enum HlaviError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("Board not found: {0}")]
    BoardNotFound(BoardId),

    #[error("Board storage not initialized")]
    BoardNotInitialized,

    #[error("Board {board_id} was modified concurrently (expected version {expected}, found {found})")]
    ConcurrencyConflict {
        board_id: BoardId,
        expected: u64,
        found: u64,
    },

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[cfg(feature = "sqlite-storage")]
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

impl From<ValidationError> for HlaviError {
    fn from(err: ValidationError) -> Self {
        Self::Domain(DomainError::Validation(err))
    }
}
