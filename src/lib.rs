//! # Hlavi Board
//!
//! Ordering engine for Hlavi kanban boards.
//!
//! Cards are placed in columns by sparse decimal rank keys, so moving a card
//! rewrites only that card. When the gap between two neighbours runs out the
//! column is rebalanced in one step. Columns may carry WIP limits, which are
//! enforced whenever a card enters a column.
//!
//! Every board operation is a pure function of the current board and returns
//! the next board together with the domain events it produced. Persist the
//! board through a [`Storage`] backend (see [`storage::commit`]) before
//! publishing those events.

pub mod config;
pub mod domain;
pub mod error;
pub mod storage;

// Re-export commonly used types
pub use config::{BoardConfig, ColumnTemplate};
pub use domain::{
    Applied, Board, BoardEvent, BoardId, Card, Column, ColumnId, ColumnListing, EventId,
    MoveOutcome, RankKey, RankedCard, TaskId, APPEND_STEP,
};
pub use error::{DomainError, HlaviError, Result, ValidationError};
pub use storage::{commit, Committed, Storage};
