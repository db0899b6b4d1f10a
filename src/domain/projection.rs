//! Read-only views a caller uses to pick `previous`/`next` for a move.

use crate::{
    domain::{
        board::Board,
        ids::{ColumnId, TaskId},
        rank::RankKey,
    },
    error::DomainError,
};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RankedCard {
    pub task_id: TaskId,
    pub rank: RankKey,
}

/// A column with its cards, top to bottom
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnListing {
    pub column_id: ColumnId,
    pub name: String,
    pub position: usize,
    pub wip_limit: Option<u32>,
    pub cards: Vec<RankedCard>,
}

impl Board {
    /// Cards of a column ascending by rank
    pub fn ordered_cards(&self, column_id: ColumnId) -> Result<Vec<RankedCard>, DomainError> {
        if self.column(column_id).is_none() {
            return Err(DomainError::ColumnNotFound(column_id));
        }
        Ok(self
            .sorted_cards(column_id, None)
            .iter()
            .map(|card| RankedCard {
                task_id: card.task_id(),
                rank: card.rank(),
            })
            .collect())
    }

    /// Every column in position order with its ordered cards
    pub fn listing(&self) -> Vec<ColumnListing> {
        self.columns()
            .iter()
            .map(|column| ColumnListing {
                column_id: column.id(),
                name: column.name().to_string(),
                position: column.position(),
                wip_limit: column.wip_limit(),
                cards: self
                    .sorted_cards(column.id(), None)
                    .iter()
                    .map(|card| RankedCard {
                        task_id: card.task_id(),
                        rank: card.rank(),
                    })
                    .collect(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_listing_orders_by_rank() {
        let board = Board::new("Test").unwrap();
        let todo = board.columns()[0].id();
        let (t1, t2, t3) = (TaskId::new(), TaskId::new(), TaskId::new());

        let board = board.move_card(t1, todo, None, None).unwrap().board;
        let board = board.move_card(t2, todo, None, Some(t1)).unwrap().board;
        let board = board.move_card(t3, todo, Some(t2), Some(t1)).unwrap().board;

        let cards = board.ordered_cards(todo).unwrap();
        let ids: Vec<TaskId> = cards.iter().map(|c| c.task_id).collect();
        assert_eq!(ids, vec![t2, t3, t1]);
        assert!(cards.windows(2).all(|w| w[0].rank < w[1].rank));

        let listing = board.listing();
        assert_eq!(listing.len(), 3);
        assert_eq!(listing[0].cards, cards);
        assert!(listing[1].cards.is_empty());
        assert_eq!(listing[2].name, "Done");
    }

    #[test]
    fn test_ordered_cards_unknown_column() {
        let board = Board::new("Test").unwrap();
        let missing = ColumnId::new();
        assert_eq!(
            board.ordered_cards(missing).unwrap_err(),
            DomainError::ColumnNotFound(missing)
        );
    }
}
