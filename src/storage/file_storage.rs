use crate::{
    error::{RankboardError, Result},
    storage::{
        memory::{write_snapshot, Snapshot, Workspace, WorkspaceTransaction},
        Storage, Transaction,
    },
};
use async_trait::async_trait;
use std::{
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};
use tokio::{fs, sync::Mutex};

/// File-based storage implementation
///
/// The whole store lives in memory and every commit rewrites a JSON snapshot
/// (`<root>/.rankboard/workspace.json`) before the new state becomes visible, so a
/// failed write leaves both the file and the in-memory state untouched.
pub struct FileStorage {
    root_path: PathBuf,
    state: Arc<Mutex<Workspace>>,
    loaded: AtomicBool,
}

impl FileStorage {
    const RANKBOARD_DIR: &'static str = ".rankboard";
    const SNAPSHOT_FILE: &'static str = "workspace.json";

    /// Creates a new FileStorage instance for the given project root
    pub fn new(project_root: impl AsRef<Path>) -> Self {
        Self {
            root_path: project_root.as_ref().join(Self::RANKBOARD_DIR),
            state: Arc::new(Mutex::new(Workspace::default())),
            loaded: AtomicBool::new(false),
        }
    }

    fn snapshot_file(&self) -> PathBuf {
        self.root_path.join(Self::SNAPSHOT_FILE)
    }

    async fn ensure_directory_exists(&self, path: &Path) -> Result<()> {
        if !path.exists() {
            fs::create_dir_all(path).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl Storage for FileStorage {
    async fn initialize(&self) -> Result<()> {
        self.ensure_directory_exists(&self.root_path).await?;

        let snapshot_file = self.snapshot_file();
        let mut state = self.state.lock().await;

        if snapshot_file.exists() {
            let contents = fs::read_to_string(&snapshot_file).await?;
            let snapshot: Snapshot = serde_json::from_str(&contents)?;
            *state = Workspace::from_snapshot(snapshot);
            tracing::debug!(path = %snapshot_file.display(), "loaded snapshot");
        } else {
            *state = Workspace::default();
            write_snapshot(&snapshot_file, &state).await?;
            tracing::debug!(path = %snapshot_file.display(), "created empty snapshot");
        }

        self.loaded.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn begin(&self) -> Result<Box<dyn Transaction>> {
        if !self.loaded.load(Ordering::SeqCst) {
            return Err(RankboardError::StorageError(format!(
                "file storage at {} is not initialized",
                self.root_path.display()
            )));
        }

        let guard = Arc::clone(&self.state).lock_owned().await;
        Ok(Box::new(WorkspaceTransaction::new(
            guard,
            Some(self.snapshot_file()),
        )))
    }

    async fn is_initialized(&self) -> bool {
        self.loaded.load(Ordering::SeqCst) && self.snapshot_file().exists()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Board, Card, List};
    use crate::rank::OrderKey;
    use crate::storage::LockMode;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_storage_initialization() {
        let temp_dir = TempDir::new().unwrap();
        let storage = FileStorage::new(temp_dir.path());

        assert!(!storage.is_initialized().await);

        storage.initialize().await.unwrap();

        assert!(storage.is_initialized().await);
        assert!(storage.snapshot_file().exists());
    }

    #[tokio::test]
    async fn test_begin_requires_initialization() {
        let temp_dir = TempDir::new().unwrap();
        let storage = FileStorage::new(temp_dir.path());

        let result = storage.begin().await;
        assert!(matches!(result, Err(RankboardError::StorageError(_))));
    }

    #[tokio::test]
    async fn test_committed_state_survives_reopen() {
        let temp_dir = TempDir::new().unwrap();
        let board = Board::new("Board".to_string());
        let list = List::new(board.id, "List".to_string(), OrderKey::from("n"));
        let card = Card::new(list.id, "Card".to_string(), OrderKey::from("n"));

        {
            let storage = FileStorage::new(temp_dir.path());
            storage.initialize().await.unwrap();

            let mut tx = storage.begin().await.unwrap();
            tx.put_board(&board).await.unwrap();
            tx.put_list(&list).await.unwrap();
            tx.put_card(&card).await.unwrap();
            tx.commit().await.unwrap();
        }

        let storage = FileStorage::new(temp_dir.path());
        storage.initialize().await.unwrap();

        let mut tx = storage.begin().await.unwrap();
        let loaded = tx.card(&card.id, LockMode::Shared).await.unwrap().unwrap();
        assert_eq!(loaded.title, "Card");
        assert_eq!(loaded.position.as_str(), "n");
        assert_eq!(loaded.version, 1);
    }

    #[tokio::test]
    async fn test_uncommitted_writes_never_reach_disk() {
        let temp_dir = TempDir::new().unwrap();
        let board = Board::new("Board".to_string());

        let storage = FileStorage::new(temp_dir.path());
        storage.initialize().await.unwrap();
        {
            let mut tx = storage.begin().await.unwrap();
            tx.put_board(&board).await.unwrap();
        }

        let reopened = FileStorage::new(temp_dir.path());
        reopened.initialize().await.unwrap();
        let mut tx = reopened.begin().await.unwrap();
        assert!(tx.boards().await.unwrap().is_empty());
    }
}
