//! Domain events emitted by board operations.
//!
//! Events are returned alongside the new board state and must only be
//! published once that state has been persisted. Consumers (audit, analytics,
//! notifications) observe them; they never mutate the board.

use crate::domain::{
    ids::{BoardId, ColumnId, EventId, TaskId},
    rank::RankKey,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Fields shared by every event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventMeta {
    pub event_id: EventId,
    pub board_id: BoardId,
    pub occurred_at: DateTime<Utc>,
}

impl EventMeta {
    pub fn new(board_id: BoardId) -> Self {
        Self {
            event_id: EventId::new(),
            board_id,
            occurred_at: Utc::now(),
        }
    }
}

/// A task got its first card on the board
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardPlaced {
    #[serde(flatten)]
    pub meta: EventMeta,
    pub task_id: TaskId,
    pub column_id: ColumnId,
    pub rank: RankKey,
}

/// An existing card changed column and/or rank
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardMoved {
    #[serde(flatten)]
    pub meta: EventMeta,
    pub task_id: TaskId,
    pub from_column_id: ColumnId,
    pub to_column_id: ColumnId,
    pub rank: RankKey,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardRemoved {
    #[serde(flatten)]
    pub meta: EventMeta,
    pub task_id: TaskId,
    pub column_id: ColumnId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnAdded {
    #[serde(flatten)]
    pub meta: EventMeta,
    pub column_id: ColumnId,
    pub name: String,
    pub position: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnRenamed {
    #[serde(flatten)]
    pub meta: EventMeta,
    pub column_id: ColumnId,
    pub old_name: String,
    pub new_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnReordered {
    #[serde(flatten)]
    pub meta: EventMeta,
    pub column_id: ColumnId,
    pub old_position: usize,
    pub new_position: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnRemoved {
    #[serde(flatten)]
    pub meta: EventMeta,
    pub column_id: ColumnId,
    pub position: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WipLimitChanged {
    #[serde(flatten)]
    pub meta: EventMeta,
    pub column_id: ColumnId,
    pub old_limit: Option<u32>,
    pub new_limit: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardRenamed {
    #[serde(flatten)]
    pub meta: EventMeta,
    pub old_name: String,
    pub new_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BoardEvent {
    CardPlaced(CardPlaced),
    CardMoved(CardMoved),
    CardRemoved(CardRemoved),
    ColumnAdded(ColumnAdded),
    ColumnRenamed(ColumnRenamed),
    ColumnReordered(ColumnReordered),
    ColumnRemoved(ColumnRemoved),
    WipLimitChanged(WipLimitChanged),
    BoardRenamed(BoardRenamed),
}

impl BoardEvent {
    pub fn meta(&self) -> &EventMeta {
        match self {
            Self::CardPlaced(e) => &e.meta,
            Self::CardMoved(e) => &e.meta,
            Self::CardRemoved(e) => &e.meta,
            Self::ColumnAdded(e) => &e.meta,
            Self::ColumnRenamed(e) => &e.meta,
            Self::ColumnReordered(e) => &e.meta,
            Self::ColumnRemoved(e) => &e.meta,
            Self::WipLimitChanged(e) => &e.meta,
            Self::BoardRenamed(e) => &e.meta,
        }
    }

    pub fn board_id(&self) -> BoardId {
        self.meta().board_id
    }

    /// Stable name for routing and logging
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::CardPlaced(_) => "card_placed",
            Self::CardMoved(_) => "card_moved",
            Self::CardRemoved(_) => "card_removed",
            Self::ColumnAdded(_) => "column_added",
            Self::ColumnRenamed(_) => "column_renamed",
            Self::ColumnReordered(_) => "column_reordered",
            Self::ColumnRemoved(_) => "column_removed",
            Self::WipLimitChanged(_) => "wip_limit_changed",
            Self::BoardRenamed(_) => "board_renamed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serialization_is_tagged() {
        let event = BoardEvent::CardMoved(CardMoved {
            meta: EventMeta::new(BoardId::new()),
            task_id: TaskId::new(),
            from_column_id: ColumnId::new(),
            to_column_id: ColumnId::new(),
            rank: RankKey::from(1500),
        });

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "card_moved");
        assert_eq!(json["rank"], "1500");
        assert!(json.get("board_id").is_some());
        assert!(json.get("occurred_at").is_some());

        let back: BoardEvent = serde_json::from_value(json).unwrap();
        assert_eq!(back, event);
        assert_eq!(back.event_type(), "card_moved");
    }
}
