//! Sparse decimal rank keys used to order cards inside a column.
//!
//! A rank is a bounded-precision decimal (`rust_decimal::Decimal`, at most 28
//! fractional digits). Inserting between two cards takes their midpoint, so a
//! move rewrites a single card. Every midpoint consumes precision; once two
//! neighbours are adjacent (nothing representable lies strictly between them)
//! the column has to be rebalanced, see [`crate::domain::rebalance`].

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Gap left between consecutive keys on append and after a rebalance.
///
/// With 28 fractional digits available, a gap of 1000 allows roughly 80
/// successive midpoint insertions at the same spot before it is exhausted.
pub const APPEND_STEP: i64 = 1000;

/// A totally ordered position of a card within its column
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "Decimal", into = "Decimal")]
pub struct RankKey(Decimal);

impl RankKey {
    /// Wraps a decimal, normalizing it so equal keys share one textual form
    pub fn new(value: Decimal) -> Self {
        Self(value.normalize())
    }

    /// The first key handed out by a fresh column
    pub fn step() -> Self {
        Self(Decimal::from(APPEND_STEP))
    }

    /// `n * APPEND_STEP`
    pub fn nth_step(n: usize) -> Self {
        Self(Decimal::from(n as u64).saturating_mul(Decimal::from(APPEND_STEP)))
    }

    pub fn value(&self) -> Decimal {
        self.0
    }

    pub fn is_positive(&self) -> bool {
        self.0 > Decimal::ZERO
    }

    /// Returns a key strictly between `self` and `upper`, or `None` when the
    /// decimal precision cannot represent one. Also `None` if `self >= upper`.
    pub fn midpoint(&self, upper: &RankKey) -> Option<RankKey> {
        if self >= upper {
            return None;
        }
        let mid = self
            .0
            .checked_add(upper.0)?
            .checked_div(Decimal::from(2))?;
        let mid = RankKey::new(mid);
        (*self < mid && mid < *upper).then_some(mid)
    }

    /// Key for a card appended after `self`.
    ///
    /// Saturates at `Decimal::MAX`; the board rebalances when an appended key
    /// is not above the current last card.
    pub fn after_last(&self) -> RankKey {
        RankKey::new(self.0.saturating_add(Decimal::from(APPEND_STEP)))
    }

    /// Key for a card inserted before `self` (the current first card), halving
    /// towards zero. `None` once the half rounds to zero or back to `self`.
    pub fn before_first(&self) -> Option<RankKey> {
        let half = RankKey::new(self.0.checked_div(Decimal::from(2))?);
        (half.is_positive() && half < *self).then_some(half)
    }

    /// True when no distinct key exists strictly between the two keys
    pub fn is_adjacent(&self, other: &RankKey) -> bool {
        let (low, high) = if self <= other {
            (self, other)
        } else {
            (other, self)
        };
        low.midpoint(high).is_none()
    }
}

impl From<i64> for RankKey {
    fn from(value: i64) -> Self {
        Self::new(Decimal::from(value))
    }
}

impl From<Decimal> for RankKey {
    fn from(value: Decimal) -> Self {
        Self::new(value)
    }
}

impl From<RankKey> for Decimal {
    fn from(key: RankKey) -> Self {
        key.0
    }
}

impl FromStr for RankKey {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Decimal::from_str(s.trim()).map(Self::new)
    }
}

impl fmt::Display for RankKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
