use crate::{
    domain::{ids::ColumnId, rank::RankKey},
    error::ValidationError,
};
use serde::Serialize;

pub const MAX_COLUMN_NAME_LEN: usize = 50;

/// A column of a kanban board
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Column {
    id: ColumnId,
    name: String,
    position: usize,
    wip_limit: Option<u32>,
    next_append_key: RankKey,
}

impl Column {
    /// Creates a column, trimming and validating its name
    pub fn create(
        name: &str,
        position: usize,
        wip_limit: Option<u32>,
    ) -> Result<Self, ValidationError> {
        Ok(Self {
            id: ColumnId::new(),
            name: validate_column_name(name)?,
            position,
            wip_limit: validate_wip_limit(wip_limit)?,
            next_append_key: RankKey::step(),
        })
    }

    /// Rebuilds a column from persisted fields
    pub fn restore(
        id: ColumnId,
        name: &str,
        position: usize,
        wip_limit: Option<u32>,
        next_append_key: RankKey,
    ) -> Result<Self, ValidationError> {
        Ok(Self {
            id,
            name: validate_column_name(name)?,
            position,
            wip_limit: validate_wip_limit(wip_limit)?,
            next_append_key,
        })
    }

    pub fn id(&self) -> ColumnId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn wip_limit(&self) -> Option<u32> {
        self.wip_limit
    }

    pub fn next_append_key(&self) -> RankKey {
        self.next_append_key
    }

    pub fn rename(&mut self, new_name: &str) -> Result<(), ValidationError> {
        self.name = validate_column_name(new_name)?;
        Ok(())
    }

    /// Hands out the current append key and advances the counter by one step
    pub fn reserve_append_key(&mut self) -> RankKey {
        let key = self.next_append_key;
        self.next_append_key = key.after_last();
        key
    }

    /// Like [`Column::reserve_append_key`], but never returns a key at or
    /// below `floor` (the column's current last rank).
    pub(crate) fn reserve_append_key_above(&mut self, floor: Option<RankKey>) -> RankKey {
        if let Some(floor) = floor {
            if floor >= self.next_append_key {
                self.next_append_key = floor.after_last();
            }
        }
        self.reserve_append_key()
    }

    /// Moves the append counter past `rank` if it is not already beyond it
    pub(crate) fn advance_append_key_past(&mut self, rank: RankKey) {
        if rank >= self.next_append_key {
            self.next_append_key = rank.after_last();
        }
    }

    /// Restarts the append counter one step after `rank`, used once a
    /// rebalance has rewritten every rank of the column
    pub(crate) fn restart_append_key_after(&mut self, rank: RankKey) {
        self.next_append_key = rank.after_last();
    }

    pub(crate) fn set_position(&mut self, position: usize) {
        self.position = position;
    }

    pub(crate) fn set_wip_limit(&mut self, wip_limit: Option<u32>) -> Result<(), ValidationError> {
        self.wip_limit = validate_wip_limit(wip_limit)?;
        Ok(())
    }
}

fn validate_column_name(name: &str) -> Result<String, ValidationError> {
    validate_name("column name", name, MAX_COLUMN_NAME_LEN)
}

fn validate_wip_limit(wip_limit: Option<u32>) -> Result<Option<u32>, ValidationError> {
    match wip_limit {
        Some(0) => Err(ValidationError::InvalidWipLimit),
        other => Ok(other),
    }
}

/// Trims `value` and checks it is non-empty and at most `max` characters
pub(crate) fn validate_name(
    field: &'static str,
    value: &str,
    max: usize,
) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::Empty { field });
    }
    let actual = trimmed.chars().count();
    if actual > max {
        return Err(ValidationError::TooLong { field, max, actual });
    }
    Ok(trimmed.to_string())
}
