//! Persisted representation of a board.
//!
//! Storage backends read and write these records; [`crate::Board::restore`]
//! turns them back into an aggregate after re-checking every invariant.

use crate::domain::{
    ids::{BoardId, ColumnId, TaskId},
    rank::RankKey,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardSnapshot {
    pub id: BoardId,
    pub name: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub version: u64,
    pub columns: Vec<ColumnRecord>,
    #[serde(default)]
    pub cards: Vec<CardRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnRecord {
    pub id: ColumnId,
    pub name: String,
    pub position: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wip_limit: Option<u32>,
    pub next_append_key: RankKey,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardRecord {
    pub task_id: TaskId,
    pub column_id: ColumnId,
    pub rank: RankKey,
}
