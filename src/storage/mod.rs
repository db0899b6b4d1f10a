use crate::{
    domain::{Applied, Board, BoardEvent, BoardId},
    error::Result,
};
use async_trait::async_trait;

#[cfg(feature = "file-storage")]
pub mod file_storage;

#[cfg(feature = "sqlite-storage")]
pub mod sqlite_storage;

/// Storage trait for persisting whole board aggregates
#[async_trait]
pub trait Storage: Send + Sync {
    /// Initializes the storage backend
    async fn initialize(&self) -> Result<()>;

    /// Saves a board if the stored version still equals `board.version()`.
    ///
    /// Returns the board carrying its new version. A stale board fails with
    /// `HlaviError::ConcurrencyConflict`; reload and re-issue the operation.
    async fn save_board(&self, board: &Board) -> Result<Board>;

    /// Loads a board by ID
    async fn load_board(&self, id: &BoardId) -> Result<Board>;

    /// Lists all board IDs
    async fn list_board_ids(&self) -> Result<Vec<BoardId>>;

    /// Checks if the storage is initialized
    async fn is_initialized(&self) -> bool;
}

/// An operation whose board has been persisted
#[derive(Debug, Clone)]
pub struct Committed<T> {
    pub board: Board,
    pub value: T,
    /// Safe to publish now that the board is saved
    pub events: Vec<BoardEvent>,
}

/// Persists the board of an applied operation and releases its events.
///
/// Events are dropped together with the error if the save fails, so nothing
/// is ever published for a change that was not stored.
pub async fn commit<T, S>(storage: &S, applied: Applied<T>) -> Result<Committed<T>>
where
    S: Storage + ?Sized,
{
    let board = storage.save_board(&applied.board).await?;
    Ok(Committed {
        board,
        value: applied.value,
        events: applied.events,
    })
}
