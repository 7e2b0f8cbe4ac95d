use crate::{
    domain::{Board, BoardId, Card, CardId, List, ListId},
    error::{RankboardError, Result},
    rank::OrderKey,
    storage::{LockMode, Storage, Transaction},
};
use async_trait::async_trait;
use rusqlite::{params, types::Type, Connection, OptionalExtension, Row};
use std::{path::Path, sync::Arc, time::Duration};
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS boards (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    description TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    deleted_at TEXT
);

CREATE TABLE IF NOT EXISTS lists (
    id TEXT PRIMARY KEY,
    board_id TEXT NOT NULL REFERENCES boards(id),
    name TEXT NOT NULL,
    position TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    deleted_at TEXT
);

CREATE TABLE IF NOT EXISTS cards (
    id TEXT PRIMARY KEY,
    list_id TEXT NOT NULL REFERENCES lists(id),
    title TEXT NOT NULL,
    description TEXT,
    position TEXT NOT NULL,
    version INTEGER NOT NULL DEFAULT 1,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    deleted_at TEXT
);

CREATE INDEX IF NOT EXISTS idx_lists_board_position ON lists(board_id, position);
CREATE INDEX IF NOT EXISTS idx_cards_list_position ON cards(list_id, position);
"#;

const BOARD_COLUMNS: &str = "id, name, description, created_at, updated_at, deleted_at";
const LIST_COLUMNS: &str = "id, board_id, name, position, created_at, updated_at, deleted_at";
const CARD_COLUMNS: &str =
    "id, list_id, title, description, position, version, created_at, updated_at, deleted_at";

/// SQLite-based storage backend
///
/// Each transaction runs as `BEGIN IMMEDIATE`, which takes the database write lock
/// up front; that subsumes the row locks requested through [`LockMode`]. Positions
/// use the default `BINARY` collation, i.e. the same byte-wise order as [`OrderKey`].
pub struct SqliteStorage {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStorage {
    /// Opens (or creates) a database file
    pub fn open(database_path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(database_path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Opens a private in-memory database
    pub fn open_in_memory() -> Result<Self> {
        Ok(Self {
            conn: Arc::new(Mutex::new(Connection::open_in_memory()?)),
        })
    }
}

#[async_trait]
impl Storage for SqliteStorage {
    async fn initialize(&self) -> Result<()> {
        self.conn.lock().await.execute_batch(SCHEMA)?;
        Ok(())
    }

    async fn begin(&self) -> Result<Box<dyn Transaction>> {
        let conn = Arc::clone(&self.conn).lock_owned().await;
        conn.execute_batch("BEGIN IMMEDIATE")?;
        Ok(Box::new(SqliteTransaction { conn, open: true }))
    }

    async fn is_initialized(&self) -> bool {
        let conn = self.conn.lock().await;
        conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'cards'",
            [],
            |row| row.get::<_, i64>(0),
        )
        .map(|count| count > 0)
        .unwrap_or(false)
    }
}

struct SqliteTransaction {
    conn: OwnedMutexGuard<Connection>,
    open: bool,
}

impl Drop for SqliteTransaction {
    fn drop(&mut self) {
        if self.open {
            if let Err(err) = self.conn.execute_batch("ROLLBACK") {
                tracing::warn!(error = %err, "failed to roll back sqlite transaction");
            }
        }
    }
}

fn id_column<T: From<Uuid>>(row: &Row<'_>, index: usize) -> rusqlite::Result<T> {
    let text: String = row.get(index)?;
    Uuid::parse_str(&text)
        .map(T::from)
        .map_err(|err| rusqlite::Error::FromSqlConversionFailure(index, Type::Text, Box::new(err)))
}

fn board_from_row(row: &Row<'_>) -> rusqlite::Result<Board> {
    Ok(Board {
        id: id_column(row, 0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        created_at: row.get(3)?,
        updated_at: row.get(4)?,
        deleted_at: row.get(5)?,
    })
}

fn list_from_row(row: &Row<'_>) -> rusqlite::Result<List> {
    Ok(List {
        id: id_column(row, 0)?,
        board_id: id_column(row, 1)?,
        name: row.get(2)?,
        position: OrderKey::new(row.get::<_, String>(3)?),
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
        deleted_at: row.get(6)?,
    })
}

fn card_from_row(row: &Row<'_>) -> rusqlite::Result<Card> {
    let version: i64 = row.get(5)?;
    Ok(Card {
        id: id_column(row, 0)?,
        list_id: id_column(row, 1)?,
        title: row.get(2)?,
        description: row.get(3)?,
        position: OrderKey::new(row.get::<_, String>(4)?),
        version: u64::try_from(version).map_err(|err| {
            rusqlite::Error::FromSqlConversionFailure(5, Type::Integer, Box::new(err))
        })?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
        deleted_at: row.get(8)?,
    })
}

#[async_trait]
impl Transaction for SqliteTransaction {
    async fn board(&mut self, id: &BoardId, _lock: LockMode) -> Result<Option<Board>> {
        let sql = format!(
            "SELECT {} FROM boards WHERE id = ?1 AND deleted_at IS NULL",
            BOARD_COLUMNS
        );
        Ok(self
            .conn
            .query_row(&sql, params![id.to_string()], board_from_row)
            .optional()?)
    }

    async fn list(&mut self, id: &ListId, _lock: LockMode) -> Result<Option<List>> {
        let sql = format!(
            "SELECT {} FROM lists WHERE id = ?1 AND deleted_at IS NULL",
            LIST_COLUMNS
        );
        Ok(self
            .conn
            .query_row(&sql, params![id.to_string()], list_from_row)
            .optional()?)
    }

    async fn card(&mut self, id: &CardId, _lock: LockMode) -> Result<Option<Card>> {
        let sql = format!(
            "SELECT {} FROM cards WHERE id = ?1 AND deleted_at IS NULL",
            CARD_COLUMNS
        );
        Ok(self
            .conn
            .query_row(&sql, params![id.to_string()], card_from_row)
            .optional()?)
    }

    async fn boards(&mut self) -> Result<Vec<Board>> {
        let sql = format!(
            "SELECT {} FROM boards WHERE deleted_at IS NULL ORDER BY created_at DESC",
            BOARD_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let boards = stmt
            .query_map([], board_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(boards)
    }

    async fn lists_in_board(&mut self, board_id: &BoardId, _lock: LockMode) -> Result<Vec<List>> {
        let sql = format!(
            "SELECT {} FROM lists WHERE board_id = ?1 AND deleted_at IS NULL ORDER BY position",
            LIST_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let lists = stmt
            .query_map(params![board_id.to_string()], list_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(lists)
    }

    async fn cards_in_list(&mut self, list_id: &ListId, _lock: LockMode) -> Result<Vec<Card>> {
        let sql = format!(
            "SELECT {} FROM cards WHERE list_id = ?1 AND deleted_at IS NULL ORDER BY position",
            CARD_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let cards = stmt
            .query_map(params![list_id.to_string()], card_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(cards)
    }

    async fn put_board(&mut self, board: &Board) -> Result<()> {
        self.conn.execute(
            r#"
            INSERT INTO boards (id, name, description, created_at, updated_at, deleted_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                description = excluded.description,
                updated_at = excluded.updated_at,
                deleted_at = excluded.deleted_at
            "#,
            params![
                board.id.to_string(),
                board.name,
                board.description,
                board.created_at,
                board.updated_at,
                board.deleted_at,
            ],
        )?;
        Ok(())
    }

    async fn put_list(&mut self, list: &List) -> Result<()> {
        self.conn.execute(
            r#"
            INSERT INTO lists (id, board_id, name, position, created_at, updated_at, deleted_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ON CONFLICT(id) DO UPDATE SET
                board_id = excluded.board_id,
                name = excluded.name,
                position = excluded.position,
                updated_at = excluded.updated_at,
                deleted_at = excluded.deleted_at
            "#,
            params![
                list.id.to_string(),
                list.board_id.to_string(),
                list.name,
                list.position.as_str(),
                list.created_at,
                list.updated_at,
                list.deleted_at,
            ],
        )?;
        Ok(())
    }

    async fn put_card(&mut self, card: &Card) -> Result<()> {
        let version = i64::try_from(card.version).map_err(|_| {
            RankboardError::StorageError(format!("card version {} out of range", card.version))
        })?;
        self.conn.execute(
            r#"
            INSERT INTO cards
                (id, list_id, title, description, position, version, created_at, updated_at, deleted_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            ON CONFLICT(id) DO UPDATE SET
                list_id = excluded.list_id,
                title = excluded.title,
                description = excluded.description,
                position = excluded.position,
                version = excluded.version,
                updated_at = excluded.updated_at,
                deleted_at = excluded.deleted_at
            "#,
            params![
                card.id.to_string(),
                card.list_id.to_string(),
                card.title,
                card.description,
                card.position.as_str(),
                version,
                card.created_at,
                card.updated_at,
                card.deleted_at,
            ],
        )?;
        Ok(())
    }

    async fn commit(mut self: Box<Self>) -> Result<()> {
        self.conn.execute_batch("COMMIT")?;
        self.open = false;
        Ok(())
    }
}
