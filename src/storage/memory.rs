use crate::{
    domain::{sort_sequence, Board, BoardId, Card, CardId, List, ListId},
    error::Result,
    storage::{LockMode, Storage, Transaction},
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::Arc,
};
use tokio::{
    fs,
    sync::{Mutex, OwnedMutexGuard},
};

/// Every row of the store, keyed by ID
#[derive(Debug, Clone, Default)]
pub(crate) struct Workspace {
    boards: HashMap<BoardId, Board>,
    lists: HashMap<ListId, List>,
    cards: HashMap<CardId, Card>,
}

/// On-disk form of a [`Workspace`]
#[derive(Debug, Default, Serialize, Deserialize)]
pub(crate) struct Snapshot {
    #[serde(default)]
    boards: Vec<Board>,
    #[serde(default)]
    lists: Vec<List>,
    #[serde(default)]
    cards: Vec<Card>,
}

impl Workspace {
    fn apply(&mut self, staged: Workspace) {
        self.boards.extend(staged.boards);
        self.lists.extend(staged.lists);
        self.cards.extend(staged.cards);
    }

    fn is_empty(&self) -> bool {
        self.boards.is_empty() && self.lists.is_empty() && self.cards.is_empty()
    }

    pub(crate) fn to_snapshot(&self) -> Snapshot {
        let mut snapshot = Snapshot {
            boards: self.boards.values().cloned().collect(),
            lists: self.lists.values().cloned().collect(),
            cards: self.cards.values().cloned().collect(),
        };
        // Stable file contents for identical state
        snapshot.boards.sort_by_key(|board| board.id);
        snapshot.lists.sort_by_key(|list| list.id);
        snapshot.cards.sort_by_key(|card| card.id);
        snapshot
    }

    pub(crate) fn from_snapshot(snapshot: Snapshot) -> Self {
        Self {
            boards: snapshot.boards.into_iter().map(|b| (b.id, b)).collect(),
            lists: snapshot.lists.into_iter().map(|l| (l.id, l)).collect(),
            cards: snapshot.cards.into_iter().map(|c| (c.id, c)).collect(),
        }
    }
}

/// Writes a workspace as JSON, replacing `path` only once the new contents are on disk
pub(crate) async fn write_snapshot(path: &Path, workspace: &Workspace) -> Result<()> {
    let json = serde_json::to_string_pretty(&workspace.to_snapshot())?;
    let temp_path = path.with_extension("json.tmp");

    fs::write(&temp_path, json).await?;
    fs::rename(&temp_path, path).await?;
    Ok(())
}

/// Transaction over a shared [`Workspace`]
///
/// Owns the workspace lock for its whole lifetime, so transactions are fully
/// serialized and every read is effectively exclusive. Writes go to an overlay that
/// is merged on commit and simply dropped otherwise.
pub(crate) struct WorkspaceTransaction {
    state: OwnedMutexGuard<Workspace>,
    staged: Workspace,
    snapshot_path: Option<PathBuf>,
}

impl WorkspaceTransaction {
    pub(crate) fn new(state: OwnedMutexGuard<Workspace>, snapshot_path: Option<PathBuf>) -> Self {
        Self {
            state,
            staged: Workspace::default(),
            snapshot_path,
        }
    }
}

#[async_trait]
impl Transaction for WorkspaceTransaction {
    async fn board(&mut self, id: &BoardId, _lock: LockMode) -> Result<Option<Board>> {
        Ok(self
            .staged
            .boards
            .get(id)
            .or_else(|| self.state.boards.get(id))
            .filter(|board| board.is_live())
            .cloned())
    }

    async fn list(&mut self, id: &ListId, _lock: LockMode) -> Result<Option<List>> {
        Ok(self
            .staged
            .lists
            .get(id)
            .or_else(|| self.state.lists.get(id))
            .filter(|list| list.is_live())
            .cloned())
    }

    async fn card(&mut self, id: &CardId, _lock: LockMode) -> Result<Option<Card>> {
        Ok(self
            .staged
            .cards
            .get(id)
            .or_else(|| self.state.cards.get(id))
            .filter(|card| card.is_live())
            .cloned())
    }

    async fn boards(&mut self) -> Result<Vec<Board>> {
        let staged = &self.staged.boards;
        let mut boards: Vec<Board> = self
            .state
            .boards
            .values()
            .filter(|board| !staged.contains_key(&board.id))
            .chain(staged.values())
            .filter(|board| board.is_live())
            .cloned()
            .collect();
        boards.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(boards)
    }

    async fn lists_in_board(&mut self, board_id: &BoardId, _lock: LockMode) -> Result<Vec<List>> {
        let staged = &self.staged.lists;
        let mut lists: Vec<List> = self
            .state
            .lists
            .values()
            .filter(|list| !staged.contains_key(&list.id))
            .chain(staged.values())
            .filter(|list| list.board_id == *board_id && list.is_live())
            .cloned()
            .collect();
        sort_sequence(&mut lists);
        Ok(lists)
    }

    async fn cards_in_list(&mut self, list_id: &ListId, _lock: LockMode) -> Result<Vec<Card>> {
        let staged = &self.staged.cards;
        let mut cards: Vec<Card> = self
            .state
            .cards
            .values()
            .filter(|card| !staged.contains_key(&card.id))
            .chain(staged.values())
            .filter(|card| card.list_id == *list_id && card.is_live())
            .cloned()
            .collect();
        sort_sequence(&mut cards);
        Ok(cards)
    }

    async fn put_board(&mut self, board: &Board) -> Result<()> {
        self.staged.boards.insert(board.id, board.clone());
        Ok(())
    }

    async fn put_list(&mut self, list: &List) -> Result<()> {
        self.staged.lists.insert(list.id, list.clone());
        Ok(())
    }

    async fn put_card(&mut self, card: &Card) -> Result<()> {
        self.staged.cards.insert(card.id, card.clone());
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        let WorkspaceTransaction {
            mut state,
            staged,
            snapshot_path,
        } = *self;

        if staged.is_empty() {
            return Ok(());
        }

        let rows = staged.boards.len() + staged.lists.len() + staged.cards.len();
        match snapshot_path {
            Some(path) => {
                let mut next = Workspace::clone(&state);
                next.apply(staged);
                write_snapshot(&path, &next).await?;
                *state = next;
                tracing::debug!(rows, path = %path.display(), "committed snapshot");
            }
            None => {
                state.apply(staged);
                tracing::debug!(rows, "committed in memory");
            }
        }
        Ok(())
    }
}

/// Process-local storage backend
///
/// Cloning shares the underlying store.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    state: Arc<Mutex<Workspace>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn initialize(&self) -> Result<()> {
        Ok(())
    }

    async fn begin(&self) -> Result<Box<dyn Transaction>> {
        let guard = Arc::clone(&self.state).lock_owned().await;
        Ok(Box::new(WorkspaceTransaction::new(guard, None)))
    }

    async fn is_initialized(&self) -> bool {
        true
    }
}
