pub mod board;
pub mod card;
pub mod column;
pub mod event;
pub mod ids;
pub mod projection;
pub mod rank;
pub mod rebalance;
pub mod snapshot;

pub use board::{Applied, Board, MoveOutcome};
pub use card::Card;
pub use column::Column;
pub use event::BoardEvent;
pub use ids::{BoardId, ColumnId, EventId, TaskId};
pub use projection::{ColumnListing, RankedCard};
pub use rank::{RankKey, APPEND_STEP};
pub use rebalance::rebalance;
pub use snapshot::{BoardSnapshot, CardRecord, ColumnRecord};
