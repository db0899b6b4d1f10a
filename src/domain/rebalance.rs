//! Fixed-step redistribution of a column's ranks.

use crate::domain::rank::RankKey;

/// Assigns `i * APPEND_STEP` for `i = 1..=N` to `N` items given in ascending
/// rank order. Only the count matters; relative order is kept by construction.
pub fn rebalance<T>(ordered: &[T]) -> Vec<RankKey> {
    (1..=ordered.len()).map(RankKey::nth_step).collect()
}
