use crate::domain::{
    ids::{ColumnId, TaskId},
    rank::RankKey,
};
use serde::{Deserialize, Serialize};

/// Placement of one task on a board.
///
/// Cards are immutable values. The board replaces a card in its collection
/// instead of mutating it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Card {
    task_id: TaskId,
    column_id: ColumnId,
    rank: RankKey,
}

impl Card {
    pub fn new(task_id: TaskId, column_id: ColumnId, rank: RankKey) -> Self {
        Self {
            task_id,
            column_id,
            rank,
        }
    }

    pub fn task_id(&self) -> TaskId {
        self.task_id
    }

    pub fn column_id(&self) -> ColumnId {
        self.column_id
    }

    pub fn rank(&self) -> RankKey {
        self.rank
    }

    /// Same card at a new rank in the same column
    pub fn with_rank(&self, rank: RankKey) -> Self {
        Self { rank, ..*self }
    }

    /// Same card placed elsewhere
    pub fn placed(&self, column_id: ColumnId, rank: RankKey) -> Self {
        Self {
            task_id: self.task_id,
            column_id,
            rank,
        }
    }
}
