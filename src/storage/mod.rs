//! Storage collaborator for boards, lists and cards.
//!
//! Every unit of work runs inside a [`Transaction`]: reads may take exclusive locks,
//! writes are buffered until [`Transaction::commit`], and dropping an uncommitted
//! transaction discards everything it wrote. Soft-deleted rows are invisible to every
//! read.

use crate::{
    config::StorageConfig,
    domain::{Board, BoardId, Card, CardId, List, ListId},
    error::{RankboardError, Result},
};
use async_trait::async_trait;
use std::sync::Arc;

#[cfg(feature = "file-storage")]
pub mod file_storage;
pub mod memory;

#[cfg(feature = "sqlite-storage")]
pub mod sqlite_storage;

#[cfg(feature = "file-storage")]
pub use file_storage::FileStorage;
pub use memory::MemoryStorage;
#[cfg(feature = "sqlite-storage")]
pub use sqlite_storage::SqliteStorage;

/// How a read should lock the rows it returns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockMode {
    /// Plain read
    Shared,
    /// Hold the rows exclusively until the transaction ends (`SELECT ... FOR UPDATE`)
    Exclusive,
}

/// Storage trait for persisting boards, lists and cards
#[async_trait]
pub trait Storage: Send + Sync {
    /// Initializes the storage backend
    async fn initialize(&self) -> Result<()>;

    /// Starts a unit of work; may wait for locks held by other transactions
    async fn begin(&self) -> Result<Box<dyn Transaction>>;

    /// Checks if the backend has been initialized
    async fn is_initialized(&self) -> bool;
}

/// A single atomic unit of work against the store
#[async_trait]
pub trait Transaction: Send {
    /// Loads a live board by ID
    async fn board(&mut self, id: &BoardId, lock: LockMode) -> Result<Option<Board>>;

    /// Loads a live list by ID
    async fn list(&mut self, id: &ListId, lock: LockMode) -> Result<Option<List>>;

    /// Loads a live card by ID
    async fn card(&mut self, id: &CardId, lock: LockMode) -> Result<Option<Card>>;

    /// Lists all live boards, newest first
    async fn boards(&mut self) -> Result<Vec<Board>>;

    /// Live lists of a board in ascending key order
    async fn lists_in_board(&mut self, board_id: &BoardId, lock: LockMode) -> Result<Vec<List>>;

    /// Live cards of a list in ascending key order
    async fn cards_in_list(&mut self, list_id: &ListId, lock: LockMode) -> Result<Vec<Card>>;

    /// Inserts or replaces a board
    async fn put_board(&mut self, board: &Board) -> Result<()>;

    /// Inserts or replaces a list
    async fn put_list(&mut self, list: &List) -> Result<()>;

    /// Inserts or replaces a card
    async fn put_card(&mut self, card: &Card) -> Result<()>;

    /// Atomically applies every write made in this transaction
    async fn commit(self: Box<Self>) -> Result<()>;
}

/// Builds and initializes the configured storage backend
pub async fn open(config: &StorageConfig) -> Result<Arc<dyn Storage>> {
    let storage: Arc<dyn Storage> = match config {
        StorageConfig::Memory => Arc::new(MemoryStorage::new()),
        #[cfg(feature = "file-storage")]
        StorageConfig::File { path } => Arc::new(FileStorage::new(path)),
        #[cfg(feature = "sqlite-storage")]
        StorageConfig::Sqlite { path } => Arc::new(SqliteStorage::open(path)?),
        #[allow(unreachable_patterns)]
        other => {
            return Err(RankboardError::ConfigError(format!(
                "storage backend '{}' is not enabled in this build",
                other.backend_name()
            )))
        }
    };

    storage.initialize().await?;
    tracing::info!(backend = config.backend_name(), "storage initialized");
    Ok(storage)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_open_memory_backend() {
        let storage = open(&StorageConfig::Memory).await.unwrap();
        assert!(storage.is_initialized().await);

        let mut tx = storage.begin().await.unwrap();
        assert!(tx.boards().await.unwrap().is_empty());
    }

    #[cfg(feature = "file-storage")]
    #[tokio::test]
    async fn test_open_file_backend() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let storage = open(&StorageConfig::File {
            path: temp_dir.path().to_path_buf(),
        })
        .await
        .unwrap();
        assert!(storage.is_initialized().await);
    }

    #[cfg(not(feature = "sqlite-storage"))]
    #[tokio::test]
    async fn test_open_disabled_backend_fails() {
        let result = open(&StorageConfig::Sqlite {
            path: "unused.db".into(),
        })
        .await;
        assert!(matches!(result, Err(RankboardError::ConfigError(_))));
    }
}
