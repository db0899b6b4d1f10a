use crate::{
    domain::{Board, BoardId, BoardSnapshot, CardRecord, ColumnRecord},
    error::{HlaviError, Result},
    storage::Storage,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::{
    fmt::Display,
    path::Path,
    str::FromStr,
    sync::{Mutex, MutexGuard},
};
use tracing::debug;

/// Tables backing a board aggregate. Ranks are stored as normalized decimal
/// text, which makes the `(column_id, rank)` constraint exact.
const SCHEMA_SQL: &str = r#"
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS boards (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL CHECK (length(trim(name)) > 0),
    created_at TEXT NOT NULL,
    version INTEGER NOT NULL CHECK (version >= 0)
);

CREATE TABLE IF NOT EXISTS board_columns (
    id TEXT PRIMARY KEY,
    board_id TEXT NOT NULL REFERENCES boards(id) ON DELETE CASCADE,
    name TEXT NOT NULL CHECK (length(trim(name)) > 0),
    position INTEGER NOT NULL CHECK (position >= 0),
    wip_limit INTEGER CHECK (wip_limit IS NULL OR wip_limit > 0),
    next_append_key TEXT NOT NULL,
    UNIQUE (board_id, position)
);

CREATE TABLE IF NOT EXISTS board_cards (
    task_id TEXT NOT NULL,
    board_id TEXT NOT NULL REFERENCES boards(id) ON DELETE CASCADE,
    column_id TEXT NOT NULL REFERENCES board_columns(id) ON DELETE CASCADE,
    rank TEXT NOT NULL,
    UNIQUE (column_id, rank),
    UNIQUE (board_id, task_id)
);

CREATE INDEX IF NOT EXISTS idx_board_cards_board ON board_cards(board_id);
"#;

/// SQLite-based storage backend for board aggregates
pub struct SqliteStorage {
    connection: Mutex<Connection>,
}

impl SqliteStorage {
    /// Opens (or creates) a database file
    pub fn new(database_path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self {
            connection: Mutex::new(Connection::open(database_path)?),
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        Ok(Self {
            connection: Mutex::new(Connection::open_in_memory()?),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.connection
            .lock()
            .map_err(|_| HlaviError::StorageError("SQLite connection lock poisoned".to_string()))
    }
}

fn parse<T>(value: &str, what: &str) -> Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    value
        .parse()
        .map_err(|e| HlaviError::StorageError(format!("invalid {what} '{value}': {e}")))
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| HlaviError::StorageError(format!("invalid timestamp '{value}': {e}")))
}

fn to_count(value: i64, what: &str) -> Result<usize> {
    usize::try_from(value)
        .map_err(|_| HlaviError::StorageError(format!("invalid {what} {value}")))
}

fn to_version(value: i64) -> Result<u64> {
    u64::try_from(value)
        .map_err(|_| HlaviError::StorageError(format!("invalid board version {value}")))
}

fn to_sql_version(version: u64) -> Result<i64> {
    i64::try_from(version)
        .map_err(|_| HlaviError::StorageError(format!("board version {version} out of range")))
}

#[async_trait]
impl Storage for SqliteStorage {
    async fn initialize(&self) -> Result<()> {
        self.lock()?.execute_batch(SCHEMA_SQL)?;
        Ok(())
    }

    async fn save_board(&self, board: &Board) -> Result<Board> {
        let mut connection = self.lock()?;
        let tx = connection.transaction()?;
        let board_id = board.id().to_string();

        let found = tx
            .query_row(
                "SELECT version FROM boards WHERE id = ?1",
                params![board_id],
                |row| row.get::<_, i64>(0),
            )
            .optional()?
            .map_or(Ok(0), to_version)?;
        if found != board.version() {
            return Err(HlaviError::ConcurrencyConflict {
                board_id: board.id(),
                expected: board.version(),
                found,
            });
        }

        let saved = board.clone().with_version(found + 1);
        let snapshot = saved.to_snapshot();

        // Replace all rows; in-place updates could trip the rank constraint
        // midway through a rebalance
        tx.execute("DELETE FROM board_cards WHERE board_id = ?1", params![board_id])?;
        tx.execute("DELETE FROM board_columns WHERE board_id = ?1", params![board_id])?;
        tx.execute(
            "INSERT INTO boards (id, name, created_at, version) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(id) DO UPDATE SET name = excluded.name, version = excluded.version",
            params![
                board_id,
                snapshot.name,
                snapshot.created_at.to_rfc3339(),
                to_sql_version(snapshot.version)?
            ],
        )?;

        for column in &snapshot.columns {
            tx.execute(
                "INSERT INTO board_columns (id, board_id, name, position, wip_limit, next_append_key)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    column.id.to_string(),
                    board_id,
                    column.name,
                    column.position as i64,
                    column.wip_limit,
                    column.next_append_key.to_string()
                ],
            )?;
        }

        for card in &snapshot.cards {
            tx.execute(
                "INSERT INTO board_cards (task_id, board_id, column_id, rank) VALUES (?1, ?2, ?3, ?4)",
                params![
                    card.task_id.to_string(),
                    board_id,
                    card.column_id.to_string(),
                    card.rank.to_string()
                ],
            )?;
        }

        tx.commit()?;
        debug!(board_id = %saved.id(), version = saved.version(), "board saved");
        Ok(saved)
    }

    async fn load_board(&self, id: &BoardId) -> Result<Board> {
        let connection = self.lock()?;
        let board_id = id.to_string();

        let header = connection
            .query_row(
                "SELECT name, created_at, version FROM boards WHERE id = ?1",
                params![board_id],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, i64>(2)?,
                    ))
                },
            )
            .optional()?;
        let Some((name, created_at, version)) = header else {
            return Err(HlaviError::BoardNotFound(*id));
        };

        let mut stmt = connection.prepare(
            "SELECT id, name, position, wip_limit, next_append_key
             FROM board_columns WHERE board_id = ?1 ORDER BY position",
        )?;
        let rows = stmt.query_map(params![board_id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, i64>(2)?,
                row.get::<_, Option<u32>>(3)?,
                row.get::<_, String>(4)?,
            ))
        })?;
        let mut columns = Vec::new();
        for row in rows {
            let (column_id, name, position, wip_limit, next_append_key) = row?;
            columns.push(ColumnRecord {
                id: parse(&column_id, "column id")?,
                name,
                position: to_count(position, "column position")?,
                wip_limit,
                next_append_key: parse(&next_append_key, "rank")?,
            });
        }

        let mut stmt = connection
            .prepare("SELECT task_id, column_id, rank FROM board_cards WHERE board_id = ?1")?;
        let rows = stmt.query_map(params![board_id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
            ))
        })?;
        let mut cards = Vec::new();
        for row in rows {
            let (task_id, column_id, rank) = row?;
            cards.push(CardRecord {
                task_id: parse(&task_id, "task id")?,
                column_id: parse(&column_id, "column id")?,
                rank: parse(&rank, "rank")?,
            });
        }

        let snapshot = BoardSnapshot {
            id: *id,
            name,
            created_at: parse_timestamp(&created_at)?,
            version: to_version(version)?,
            columns,
            cards,
        };
        Ok(Board::restore(snapshot)?)
    }

    async fn list_board_ids(&self) -> Result<Vec<BoardId>> {
        let connection = self.lock()?;
        let mut stmt = connection.prepare("SELECT id FROM boards")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;

        let mut ids = Vec::new();
        for row in rows {
            ids.push(parse(&row?, "board id")?);
        }
        ids.sort();
        Ok(ids)
    }

    async fn is_initialized(&self) -> bool {
        let Ok(connection) = self.lock() else {
            return false;
        };
        connection
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'boards'",
                [],
                |row| row.get::<_, i64>(0),
            )
            .map(|count| count > 0)
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{RankKey, TaskId};

    async fn setup() -> SqliteStorage {
        let storage = SqliteStorage::open_in_memory().unwrap();
        assert!(!storage.is_initialized().await);
        storage.initialize().await.unwrap();
        assert!(storage.is_initialized().await);
        storage
    }

    #[tokio::test]
    async fn test_board_save_and_load() {
        let storage = setup().await;
        let board = Board::new("Test").unwrap();
        let todo = board.columns()[0].id();
        let (t1, t2) = (TaskId::new(), TaskId::new());
        let board = board.move_card(t1, todo, None, None).unwrap().board;
        let board = board.move_card(t2, todo, Some(t1), None).unwrap().board;
        let board = board.set_wip_limit(todo, Some(4)).unwrap().board;

        let saved = storage.save_board(&board).await.unwrap();
        assert_eq!(saved.version(), 1);

        let loaded = storage.load_board(&board.id()).await.unwrap();
        assert_eq!(loaded, saved);
        assert_eq!(storage.list_board_ids().await.unwrap(), vec![board.id()]);
    }

    #[tokio::test]
    async fn test_resave_reuses_freed_rank() {
        let storage = setup().await;
        let board = Board::new("Test").unwrap();
        let todo = board.columns()[0].id();
        let (t1, t2, t3) = (TaskId::new(), TaskId::new(), TaskId::new());
        let board = board.move_card(t1, todo, None, None).unwrap().board;
        let board = board.move_card(t2, todo, None, None).unwrap().board;
        let board = storage.save_board(&board).await.unwrap();

        // t3 takes a rank another card used to hold
        let board = board.remove_card(t1).unwrap().board;
        let board = board.move_card(t3, todo, None, Some(t2)).unwrap().board;
        let board = storage.save_board(&board).await.unwrap();

        let loaded = storage.load_board(&board.id()).await.unwrap();
        assert_eq!(loaded.card(t3).unwrap().rank(), RankKey::from(1000));
        assert_eq!(loaded.version(), 2);
    }

    #[tokio::test]
    async fn test_stale_save_conflicts() {
        let storage = setup().await;
        let board = Board::new("Test").unwrap();
        let todo = board.columns()[0].id();
        storage.save_board(&board).await.unwrap();

        let result = storage
            .save_board(&board.move_card(TaskId::new(), todo, None, None).unwrap().board)
            .await;
        assert!(matches!(
            result,
            Err(HlaviError::ConcurrencyConflict {
                expected: 0,
                found: 1,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_load_missing_board() {
        let storage = setup().await;
        assert!(matches!(
            storage.load_board(&BoardId::new()).await,
            Err(HlaviError::BoardNotFound(_))
        ));
    }

    #[test]
    fn test_version_conversion_is_checked() {
        assert_eq!(to_version(7).unwrap(), 7);
        assert!(matches!(to_version(-1), Err(HlaviError::StorageError(_))));
        assert_eq!(to_sql_version(7).unwrap(), 7);
        assert!(matches!(
            to_sql_version(u64::MAX),
            Err(HlaviError::StorageError(_))
        ));
    }

    #[tokio::test]
    async fn test_schema_enforces_rank_uniqueness() {
        let storage = setup().await;
        let board = Board::new("Test").unwrap();
        let todo = board.columns()[0].id();
        let board = board.move_card(TaskId::new(), todo, None, None).unwrap().board;
        storage.save_board(&board).await.unwrap();

        let connection = storage.lock().unwrap();
        let result = connection.execute(
            "INSERT INTO board_cards (task_id, board_id, column_id, rank) VALUES (?1, ?2, ?3, ?4)",
            params![
                TaskId::new().to_string(),
                board.id().to_string(),
                todo.to_string(),
                "1000"
            ],
        );
        assert!(result.is_err());
    }
}
