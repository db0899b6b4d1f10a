//! The board aggregate.
//!
//! A [`Board`] owns its columns and cards and is the only place their
//! invariants are enforced:
//!
//! - column positions form `0..n` with no gaps or duplicates
//! - every card references a column of the same board
//! - a task has at most one card, and ranks are distinct within a column
//! - a column with a WIP limit never holds more cards than the limit
//!
//! Every mutating operation borrows the board immutably and returns an
//! [`Applied`] carrying the new board and the events it produced. A failed
//! operation returns an error and leaves nothing behind, so callers persist
//! `Applied::board` and publish `Applied::events` only after the save succeeds.

use crate::{
    config::BoardConfig,
    domain::{
        card::Card,
        column::{validate_name, Column},
        event::{
            BoardEvent, BoardRenamed, CardMoved, CardPlaced, CardRemoved, ColumnAdded,
            ColumnRemoved, ColumnRenamed, ColumnReordered, EventMeta, WipLimitChanged,
        },
        ids::{BoardId, ColumnId, TaskId},
        rank::RankKey,
        rebalance::rebalance,
        snapshot::{BoardSnapshot, CardRecord, ColumnRecord},
    },
    error::{DomainError, ValidationError},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use tracing::{debug, info, warn};

pub const MAX_BOARD_NAME_LEN: usize = 100;

/// Result of a successful board operation
#[derive(Debug, Clone)]
pub struct Applied<T> {
    pub board: Board,
    pub value: T,
    pub events: Vec<BoardEvent>,
}

impl<T> Applied<T> {
    fn new(board: Board, value: T, event: BoardEvent) -> Self {
        Self {
            board,
            value,
            events: vec![event],
        }
    }

    pub fn into_board(self) -> Board {
        self.board
    }
}

/// Value returned by [`Board::move_card`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveOutcome {
    /// The card as placed
    pub card: Card,
    /// Column the card came from, `None` on first placement
    pub from_column: Option<ColumnId>,
    /// Whether the target column had to be rebalanced to make room
    pub rebalanced: bool,
}

/// Kanban board state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "BoardSnapshot", into = "BoardSnapshot")]
pub struct Board {
    id: BoardId,
    name: String,
    /// Sorted by position; `columns[i].position() == i`
    columns: Vec<Column>,
    cards: BTreeMap<TaskId, Card>,
    created_at: DateTime<Utc>,
    version: u64,
}

impl Board {
    /// Creates a board with the default columns
    pub fn new(name: &str) -> Result<Self, DomainError> {
        Self::from_config(&BoardConfig {
            name: name.to_string(),
            ..BoardConfig::default()
        })
    }

    /// Creates a board from a template
    pub fn from_config(config: &BoardConfig) -> Result<Self, DomainError> {
        let name = validate_name("board name", &config.name, MAX_BOARD_NAME_LEN)?;
        let columns = config
            .columns
            .iter()
            .enumerate()
            .map(|(position, template)| Column::create(&template.name, position, template.wip_limit))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            id: BoardId::new(),
            name,
            columns,
            cards: BTreeMap::new(),
            created_at: Utc::now(),
            version: 0,
        })
    }

    /// Rebuilds a board from its persisted form, re-checking every invariant
    pub fn restore(snapshot: BoardSnapshot) -> Result<Self, DomainError> {
        let name = validate_name("board name", &snapshot.name, MAX_BOARD_NAME_LEN)?;

        let mut records = snapshot.columns;
        records.sort_by_key(|record| record.position);
        let mut columns = Vec::with_capacity(records.len());
        for (index, record) in records.into_iter().enumerate() {
            if record.position != index {
                return Err(DomainError::inconsistent(format!(
                    "column positions are not contiguous: expected {index}, found {}",
                    record.position
                )));
            }
            columns.push(Column::restore(
                record.id,
                &record.name,
                record.position,
                record.wip_limit,
                record.next_append_key,
            )?);
        }

        let mut cards = BTreeMap::new();
        for record in snapshot.cards {
            let card = Card::new(record.task_id, record.column_id, record.rank);
            if cards.insert(record.task_id, card).is_some() {
                return Err(DomainError::inconsistent(format!(
                    "task {} has more than one card",
                    record.task_id
                )));
            }
        }

        let mut board = Self {
            id: snapshot.id,
            name,
            columns,
            cards,
            created_at: snapshot.created_at,
            version: snapshot.version,
        };
        board.check_invariants()?;

        for index in 0..board.columns.len() {
            if let Some(last) = board.last_rank(board.columns[index].id()) {
                board.columns[index].advance_append_key_past(last);
            }
        }

        Ok(board)
    }

    pub fn to_snapshot(&self) -> BoardSnapshot {
        BoardSnapshot {
            id: self.id,
            name: self.name.clone(),
            created_at: self.created_at,
            version: self.version,
            columns: self
                .columns
                .iter()
                .map(|column| ColumnRecord {
                    id: column.id(),
                    name: column.name().to_string(),
                    position: column.position(),
                    wip_limit: column.wip_limit(),
                    next_append_key: column.next_append_key(),
                })
                .collect(),
            cards: self
                .cards
                .values()
                .map(|card| CardRecord {
                    task_id: card.task_id(),
                    column_id: card.column_id(),
                    rank: card.rank(),
                })
                .collect(),
        }
    }

    pub fn id(&self) -> BoardId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Optimistic concurrency token, bumped by storage on every save
    pub fn version(&self) -> u64 {
        self.version
    }

    pub(crate) fn with_version(mut self, version: u64) -> Self {
        self.version = version;
        self
    }

    /// Columns in position order
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, column_id: ColumnId) -> Option<&Column> {
        self.columns.iter().find(|column| column.id() == column_id)
    }

    pub fn column_by_name(&self, name: &str) -> Option<&Column> {
        let name = name.trim();
        self.columns
            .iter()
            .find(|column| column.name().eq_ignore_ascii_case(name))
    }

    pub fn card(&self, task_id: TaskId) -> Option<&Card> {
        self.cards.get(&task_id)
    }

    pub fn cards(&self) -> impl Iterator<Item = &Card> {
        self.cards.values()
    }

    pub fn card_count(&self, column_id: ColumnId) -> usize {
        self.count_cards(column_id, None)
    }

    /// Places `task_id` in `target`, between `previous` and `next`.
    ///
    /// The neighbours are the cards the new position falls between, taken
    /// from a fresh ordered listing of the target column:
    ///
    /// - both: insert between them; they must be adjacent in that order
    /// - only `previous`: append after it; it must be the last card
    /// - only `next`: insert before it; it must be the first card
    /// - neither: append at the end of the column
    ///
    /// A card entering a column with a WIP limit is rejected when the column
    /// is full. Re-issuing a move to the slot a card already occupies keeps
    /// its rank and still reports a move.
    pub fn move_card(
        &self,
        task_id: TaskId,
        target: ColumnId,
        previous: Option<TaskId>,
        next: Option<TaskId>,
    ) -> Result<Applied<MoveOutcome>, DomainError> {
        let column_index = self.column_index(target)?;
        if previous == Some(task_id) || next == Some(task_id) {
            return Err(DomainError::invalid_placement(format!(
                "task {task_id} cannot be its own neighbour"
            )));
        }

        let existing = self.cards.get(&task_id).copied();
        let entering = existing.map_or(true, |card| card.column_id() != target);
        if entering {
            self.admit(column_index, task_id)?;
        }

        let siblings = self.sorted_cards(target, Some(task_id));
        let slot = placement_slot(&siblings, previous, next)?;

        let mut board = self.clone();
        let mut rebalanced = false;
        let rank = match existing {
            Some(card) if !entering && occupies_slot(&siblings, slot, card.rank()) => card.rank(),
            _ => {
                let computed = match (previous, next) {
                    (Some(_), Some(_)) => siblings[slot - 1].rank().midpoint(&siblings[slot].rank()),
                    (None, Some(_)) => siblings[slot].rank().before_first(),
                    _ => {
                        // the counter saturates at the numeric bound
                        let floor = siblings.last().map(Card::rank);
                        let key = board.columns[column_index].reserve_append_key_above(floor);
                        floor.map_or(true, |floor| key > floor).then_some(key)
                    }
                };
                match computed {
                    Some(rank) => rank,
                    None => {
                        rebalanced = true;
                        board.rebalance_column(column_index, &siblings, slot)
                    }
                }
            }
        };

        let card = existing.map_or_else(
            || Card::new(task_id, target, rank),
            |prior| prior.placed(target, rank),
        );
        board.cards.insert(task_id, card);

        let meta = EventMeta::new(self.id);
        let event = match existing {
            None => BoardEvent::CardPlaced(CardPlaced {
                meta,
                task_id,
                column_id: target,
                rank,
            }),
            Some(prior) => BoardEvent::CardMoved(CardMoved {
                meta,
                task_id,
                from_column_id: prior.column_id(),
                to_column_id: target,
                rank,
            }),
        };

        debug!(
            board_id = %self.id,
            task_id = %task_id,
            column_id = %target,
            rank = %rank,
            rebalanced,
            "card placed"
        );

        Ok(Applied::new(
            board,
            MoveOutcome {
                card,
                from_column: existing.map(|card| card.column_id()),
                rebalanced,
            },
            event,
        ))
    }

    /// Takes a task's card off the board
    pub fn remove_card(&self, task_id: TaskId) -> Result<Applied<Card>, DomainError> {
        let card = *self
            .cards
            .get(&task_id)
            .ok_or(DomainError::CardNotFound(task_id))?;

        let mut board = self.clone();
        board.cards.remove(&task_id);

        debug!(board_id = %self.id, task_id = %task_id, "card removed");

        let event = BoardEvent::CardRemoved(CardRemoved {
            meta: EventMeta::new(self.id),
            task_id,
            column_id: card.column_id(),
        });
        Ok(Applied::new(board, card, event))
    }

    /// Adds a column at `position`, or at the end when omitted
    pub fn add_column(
        &self,
        name: &str,
        position: Option<usize>,
    ) -> Result<Applied<Column>, DomainError> {
        let count = self.columns.len();
        let position = position.unwrap_or(count);
        if position > count {
            return Err(ValidationError::PositionOutOfRange {
                position,
                max: count,
            }
            .into());
        }
        let column = Column::create(name, position, None)?;

        let mut board = self.clone();
        board.columns.insert(position, column.clone());
        board.renumber_columns();

        debug!(board_id = %self.id, column_id = %column.id(), position, "column added");

        let event = BoardEvent::ColumnAdded(ColumnAdded {
            meta: EventMeta::new(self.id),
            column_id: column.id(),
            name: column.name().to_string(),
            position,
        });
        Ok(Applied::new(board, column, event))
    }

    pub fn rename_column(
        &self,
        column_id: ColumnId,
        new_name: &str,
    ) -> Result<Applied<Column>, DomainError> {
        let index = self.column_index(column_id)?;

        let mut board = self.clone();
        let old_name = board.columns[index].name().to_string();
        board.columns[index].rename(new_name)?;
        let column = board.columns[index].clone();

        let event = BoardEvent::ColumnRenamed(ColumnRenamed {
            meta: EventMeta::new(self.id),
            column_id,
            old_name,
            new_name: column.name().to_string(),
        });
        Ok(Applied::new(board, column, event))
    }

    /// Moves a column to `new_position`, shifting the columns in between.
    /// Card ranks are untouched.
    pub fn reorder_column(
        &self,
        column_id: ColumnId,
        new_position: usize,
    ) -> Result<Applied<Column>, DomainError> {
        let old_position = self.column_index(column_id)?;
        let max = self.columns.len() - 1;
        if new_position > max {
            return Err(ValidationError::PositionOutOfRange {
                position: new_position,
                max,
            }
            .into());
        }

        let mut board = self.clone();
        let column = board.columns.remove(old_position);
        board.columns.insert(new_position, column);
        board.renumber_columns();
        let column = board.columns[new_position].clone();

        debug!(
            board_id = %self.id,
            column_id = %column_id,
            old_position,
            new_position,
            "column reordered"
        );

        let event = BoardEvent::ColumnReordered(ColumnReordered {
            meta: EventMeta::new(self.id),
            column_id,
            old_position,
            new_position,
        });
        Ok(Applied::new(board, column, event))
    }

    /// Removes an empty column. Cards have to be moved out first.
    pub fn remove_column(&self, column_id: ColumnId) -> Result<Applied<Column>, DomainError> {
        let index = self.column_index(column_id)?;
        let count = self.card_count(column_id);
        if count > 0 {
            return Err(DomainError::ColumnNotEmpty {
                id: column_id,
                count,
            });
        }

        let mut board = self.clone();
        let column = board.columns.remove(index);
        board.renumber_columns();

        debug!(board_id = %self.id, column_id = %column_id, "column removed");

        let event = BoardEvent::ColumnRemoved(ColumnRemoved {
            meta: EventMeta::new(self.id),
            column_id,
            position: index,
        });
        Ok(Applied::new(board, column, event))
    }

    /// Sets or clears a column's WIP limit. A limit below the column's
    /// current card count is rejected.
    pub fn set_wip_limit(
        &self,
        column_id: ColumnId,
        limit: Option<u32>,
    ) -> Result<Applied<Column>, DomainError> {
        let index = self.column_index(column_id)?;

        let mut board = self.clone();
        let old_limit = board.columns[index].wip_limit();
        board.columns[index].set_wip_limit(limit)?;

        if let Some(limit) = limit {
            let count = self.card_count(column_id);
            if count > limit as usize {
                warn!(
                    board_id = %self.id,
                    column_id = %column_id,
                    limit,
                    count,
                    "WIP limit below current card count, change rejected"
                );
                return Err(DomainError::WipLimitExceeded {
                    column_id,
                    limit,
                    count,
                });
            }
        }
        let column = board.columns[index].clone();

        let event = BoardEvent::WipLimitChanged(WipLimitChanged {
            meta: EventMeta::new(self.id),
            column_id,
            old_limit,
            new_limit: limit,
        });
        Ok(Applied::new(board, column, event))
    }

    pub fn rename(&self, new_name: &str) -> Result<Applied<()>, DomainError> {
        let name = validate_name("board name", new_name, MAX_BOARD_NAME_LEN)?;

        let mut board = self.clone();
        let old_name = std::mem::replace(&mut board.name, name.clone());

        let event = BoardEvent::BoardRenamed(BoardRenamed {
            meta: EventMeta::new(self.id),
            old_name,
            new_name: name,
        });
        Ok(Applied::new(board, (), event))
    }

    /// Verifies every aggregate invariant
    pub fn check_invariants(&self) -> Result<(), DomainError> {
        let mut column_ids = HashSet::new();
        for (index, column) in self.columns.iter().enumerate() {
            if column.position() != index {
                return Err(DomainError::inconsistent(format!(
                    "column {} has position {} at index {index}",
                    column.id(),
                    column.position()
                )));
            }
            if !column_ids.insert(column.id()) {
                return Err(DomainError::inconsistent(format!(
                    "duplicate column {}",
                    column.id()
                )));
            }
            if !column.next_append_key().is_positive() {
                return Err(DomainError::inconsistent(format!(
                    "column {} has non-positive append key {}",
                    column.id(),
                    column.next_append_key()
                )));
            }
        }

        let mut ranks = HashSet::new();
        for (task_id, card) in &self.cards {
            if *task_id != card.task_id() {
                return Err(DomainError::inconsistent(format!(
                    "card for task {} is filed under task {task_id}",
                    card.task_id()
                )));
            }
            if !column_ids.contains(&card.column_id()) {
                return Err(DomainError::inconsistent(format!(
                    "card for task {task_id} references unknown column {}",
                    card.column_id()
                )));
            }
            if !card.rank().is_positive() {
                return Err(DomainError::inconsistent(format!(
                    "card for task {task_id} has non-positive rank {}",
                    card.rank()
                )));
            }
            if !ranks.insert((card.column_id(), card.rank())) {
                return Err(DomainError::inconsistent(format!(
                    "rank {} is used twice in column {}",
                    card.rank(),
                    card.column_id()
                )));
            }
        }

        for column in &self.columns {
            if let Some(limit) = column.wip_limit() {
                let count = self.card_count(column.id());
                if count > limit as usize {
                    return Err(DomainError::inconsistent(format!(
                        "column {} holds {count} cards over its WIP limit of {limit}",
                        column.id()
                    )));
                }
            }
        }

        Ok(())
    }

    fn column_index(&self, column_id: ColumnId) -> Result<usize, DomainError> {
        self.columns
            .iter()
            .position(|column| column.id() == column_id)
            .ok_or(DomainError::ColumnNotFound(column_id))
    }

    fn count_cards(&self, column_id: ColumnId, exclude: Option<TaskId>) -> usize {
        self.cards
            .values()
            .filter(|card| card.column_id() == column_id && Some(card.task_id()) != exclude)
            .count()
    }

    /// Cards of a column ascending by rank, optionally leaving one task out
    pub(crate) fn sorted_cards(&self, column_id: ColumnId, exclude: Option<TaskId>) -> Vec<Card> {
        let mut cards: Vec<Card> = self
            .cards
            .values()
            .filter(|card| card.column_id() == column_id && Some(card.task_id()) != exclude)
            .copied()
            .collect();
        cards.sort_by_key(Card::rank);
        cards
    }

    fn last_rank(&self, column_id: ColumnId) -> Option<RankKey> {
        self.cards
            .values()
            .filter(|card| card.column_id() == column_id)
            .map(Card::rank)
            .max()
    }

    fn admit(&self, column_index: usize, task_id: TaskId) -> Result<(), DomainError> {
        let column = &self.columns[column_index];
        if let Some(limit) = column.wip_limit() {
            let count = self.count_cards(column.id(), Some(task_id));
            if count >= limit as usize {
                warn!(
                    board_id = %self.id,
                    column_id = %column.id(),
                    task_id = %task_id,
                    limit,
                    "WIP limit reached, card rejected"
                );
                return Err(DomainError::WipLimitExceeded {
                    column_id: column.id(),
                    limit,
                    count,
                });
            }
        }
        Ok(())
    }

    /// Re-spaces a column with the moving card at `slot` and returns its rank
    fn rebalance_column(&mut self, column_index: usize, siblings: &[Card], slot: usize) -> RankKey {
        let mut order: Vec<Option<&Card>> = siblings.iter().map(Some).collect();
        order.insert(slot, None);
        let ranks = rebalance(&order);

        let mut moving_rank = RankKey::nth_step(slot + 1);
        for (entry, rank) in order.iter().zip(&ranks) {
            match entry {
                Some(card) => {
                    self.cards.insert(card.task_id(), card.with_rank(*rank));
                }
                None => moving_rank = *rank,
            }
        }
        if let Some(last) = ranks.last() {
            self.columns[column_index].restart_append_key_after(*last);
        }

        info!(
            board_id = %self.id,
            column_id = %self.columns[column_index].id(),
            cards = ranks.len(),
            "column rebalanced"
        );
        moving_rank
    }

    fn renumber_columns(&mut self) {
        for (position, column) in self.columns.iter_mut().enumerate() {
            column.set_position(position);
        }
    }
}

/// Index among `siblings` at which the moving card lands
fn placement_slot(
    siblings: &[Card],
    previous: Option<TaskId>,
    next: Option<TaskId>,
) -> Result<usize, DomainError> {
    let find = |task_id: TaskId, role: &str| {
        siblings
            .iter()
            .position(|card| card.task_id() == task_id)
            .ok_or_else(|| {
                DomainError::invalid_placement(format!(
                    "{role} task {task_id} is not in the target column"
                ))
            })
    };

    match (previous, next) {
        (Some(previous), Some(next)) => {
            let before = find(previous, "previous")?;
            let after = find(next, "next")?;
            if after != before + 1 {
                return Err(DomainError::invalid_placement(format!(
                    "tasks {previous} and {next} are not adjacent in that order"
                )));
            }
            Ok(after)
        }
        (Some(previous), None) => {
            let before = find(previous, "previous")?;
            if before + 1 != siblings.len() {
                return Err(DomainError::invalid_placement(format!(
                    "previous task {previous} is not the last card"
                )));
            }
            Ok(siblings.len())
        }
        (None, Some(next)) => {
            if find(next, "next")? != 0 {
                return Err(DomainError::invalid_placement(format!(
                    "next task {next} is not the first card"
                )));
            }
            Ok(0)
        }
        (None, None) => Ok(siblings.len()),
    }
}

/// Whether `rank` already sits between `siblings[slot - 1]` and `siblings[slot]`
fn occupies_slot(siblings: &[Card], slot: usize, rank: RankKey) -> bool {
    let after_previous = slot
        .checked_sub(1)
        .and_then(|index| siblings.get(index))
        .map_or(true, |previous| previous.rank() < rank);
    let before_next = siblings.get(slot).map_or(true, |next| rank < next.rank());
    after_previous && before_next
}

impl TryFrom<BoardSnapshot> for Board {
    type Error = DomainError;

    fn try_from(snapshot: BoardSnapshot) -> Result<Self, Self::Error> {
        Self::restore(snapshot)
    }
}

impl From<Board> for BoardSnapshot {
    fn from(board: Board) -> Self {
        board.to_snapshot()
    }
}
