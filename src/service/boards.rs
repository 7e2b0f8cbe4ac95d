use crate::{
    config::{NeighborPolicy, RankboardConfig},
    domain::{Board, BoardDetail, BoardId, Card, CardId, List, ListDetail, ListId},
    error::{EntityKind, RankboardError, Result},
    rank::RankEngine,
    service::placement::{insertion_index, neighbor_index, place},
    storage::{LockMode, Storage},
};
use std::sync::Arc;

/// Board, list and card lifecycle operations
///
/// New lists and cards are placed with the same key protocol as moves: after a given
/// sibling or at the end, rebalancing the sequence first when it has run out of room.
pub struct BoardService {
    storage: Arc<dyn Storage>,
    engine: RankEngine,
    neighbor_policy: NeighborPolicy,
}

impl BoardService {
    pub fn new(storage: Arc<dyn Storage>, engine: RankEngine) -> Self {
        Self {
            storage,
            engine,
            neighbor_policy: NeighborPolicy::default(),
        }
    }

    pub fn from_config(storage: Arc<dyn Storage>, config: &RankboardConfig) -> Result<Self> {
        Ok(Self::new(storage, RankEngine::new(config.rank.clone())?)
            .with_neighbor_policy(config.neighbor_policy))
    }

    pub fn with_neighbor_policy(mut self, neighbor_policy: NeighborPolicy) -> Self {
        self.neighbor_policy = neighbor_policy;
        self
    }

    pub async fn create_board(&self, name: String, description: Option<String>) -> Result<Board> {
        let board = Board::new(name).with_description(description);

        let mut tx = self.storage.begin().await?;
        tx.put_board(&board).await?;
        tx.commit().await?;

        tracing::info!(board_id = %board.id, "board created");
        Ok(board)
    }

    /// Live boards, newest first
    pub async fn list_boards(&self) -> Result<Vec<Board>> {
        let mut tx = self.storage.begin().await?;
        tx.boards().await
    }

    pub async fn update_board(
        &self,
        board_id: BoardId,
        name: Option<String>,
        description: Option<String>,
    ) -> Result<Board> {
        let mut tx = self.storage.begin().await?;
        let mut board = tx
            .board(&board_id, LockMode::Exclusive)
            .await?
            .ok_or_else(|| RankboardError::not_found(EntityKind::Board, board_id))?;

        if let Some(name) = name {
            board.set_name(name);
        }
        if let Some(description) = description {
            board.set_description(description);
        }

        tx.put_board(&board).await?;
        tx.commit().await?;
        Ok(board)
    }

    /// Soft-deletes a board; its lists and cards become unreachable through it
    pub async fn delete_board(&self, board_id: BoardId) -> Result<()> {
        let mut tx = self.storage.begin().await?;
        let mut board = tx
            .board(&board_id, LockMode::Exclusive)
            .await?
            .ok_or_else(|| RankboardError::not_found(EntityKind::Board, board_id))?;

        board.mark_deleted();
        tx.put_board(&board).await?;
        tx.commit().await?;

        tracing::info!(board_id = %board_id, "board deleted");
        Ok(())
    }

    /// The board with its live lists and cards, each in display order
    pub async fn board_detail(&self, board_id: BoardId) -> Result<BoardDetail> {
        let mut tx = self.storage.begin().await?;
        let board = tx
            .board(&board_id, LockMode::Shared)
            .await?
            .ok_or_else(|| RankboardError::not_found(EntityKind::Board, board_id))?;

        let mut lists = Vec::new();
        for list in tx.lists_in_board(&board_id, LockMode::Shared).await? {
            let cards = tx.cards_in_list(&list.id, LockMode::Shared).await?;
            lists.push(ListDetail { list, cards });
        }

        Ok(BoardDetail { board, lists })
    }

    /// Creates a list after `after_list_id`, or at the end of the board
    pub async fn create_list(
        &self,
        board_id: BoardId,
        name: String,
        after_list_id: Option<ListId>,
    ) -> Result<List> {
        let mut tx = self.storage.begin().await?;
        tx.board(&board_id, LockMode::Exclusive)
            .await?
            .ok_or_else(|| RankboardError::not_found(EntityKind::Board, board_id))?;

        let mut siblings = tx.lists_in_board(&board_id, LockMode::Exclusive).await?;
        let before = neighbor_index(
            &siblings,
            after_list_id,
            |l| l.id,
            EntityKind::List,
            self.neighbor_policy,
        )?;
        let index = insertion_index(&siblings, before, None)?;

        let placement = place(&self.engine, &mut siblings, index, &board_id)?;
        if placement.rebalanced {
            for sibling in &siblings {
                tx.put_list(sibling).await?;
            }
        }

        let list = List::new(board_id, name, placement.key);
        tx.put_list(&list).await?;
        tx.commit().await?;

        tracing::info!(
            list_id = %list.id,
            board_id = %board_id,
            position = %list.position,
            "list created"
        );
        Ok(list)
    }

    pub async fn rename_list(&self, list_id: ListId, name: String) -> Result<List> {
        let mut tx = self.storage.begin().await?;
        let mut list = tx
            .list(&list_id, LockMode::Exclusive)
            .await?
            .ok_or_else(|| RankboardError::not_found(EntityKind::List, list_id))?;

        list.set_name(name);
        tx.put_list(&list).await?;
        tx.commit().await?;
        Ok(list)
    }

    pub async fn delete_list(&self, list_id: ListId) -> Result<()> {
        let mut tx = self.storage.begin().await?;
        let mut list = tx
            .list(&list_id, LockMode::Exclusive)
            .await?
            .ok_or_else(|| RankboardError::not_found(EntityKind::List, list_id))?;

        list.mark_deleted();
        tx.put_list(&list).await?;
        tx.commit().await?;

        tracing::info!(list_id = %list_id, "list deleted");
        Ok(())
    }

    /// Creates a card after `after_card_id`, or at the end of the list, at version 1
    pub async fn create_card(
        &self,
        list_id: ListId,
        title: String,
        description: Option<String>,
        after_card_id: Option<CardId>,
    ) -> Result<Card> {
        let mut tx = self.storage.begin().await?;
        let list = tx
            .list(&list_id, LockMode::Exclusive)
            .await?
            .ok_or_else(|| RankboardError::not_found(EntityKind::List, list_id))?;
        tx.board(&list.board_id, LockMode::Shared)
            .await?
            .ok_or_else(|| RankboardError::not_found(EntityKind::Board, list.board_id))?;

        let mut siblings = tx.cards_in_list(&list_id, LockMode::Exclusive).await?;
        let before = neighbor_index(
            &siblings,
            after_card_id,
            |c| c.id,
            EntityKind::Card,
            self.neighbor_policy,
        )?;
        let index = insertion_index(&siblings, before, None)?;

        let placement = place(&self.engine, &mut siblings, index, &list_id)?;
        if placement.rebalanced {
            for sibling in &siblings {
                tx.put_card(sibling).await?;
            }
        }

        let mut card = Card::new(list_id, title, placement.key);
        card.description = description;
        tx.put_card(&card).await?;
        tx.commit().await?;

        tracing::info!(
            card_id = %card.id,
            list_id = %list_id,
            position = %card.position,
            "card created"
        );
        Ok(card)
    }

    /// Loads a card whose list and board are both live
    pub async fn get_card(&self, card_id: CardId) -> Result<Card> {
        let mut tx = self.storage.begin().await?;
        let card = tx
            .card(&card_id, LockMode::Shared)
            .await?
            .ok_or_else(|| RankboardError::not_found(EntityKind::Card, card_id))?;
        let list = tx
            .list(&card.list_id, LockMode::Shared)
            .await?
            .ok_or_else(|| RankboardError::not_found(EntityKind::List, card.list_id))?;
        tx.board(&list.board_id, LockMode::Shared)
            .await?
            .ok_or_else(|| RankboardError::not_found(EntityKind::Board, list.board_id))?;
        Ok(card)
    }

    /// Edits card content; the key and version are left alone
    pub async fn update_card(
        &self,
        card_id: CardId,
        title: Option<String>,
        description: Option<String>,
    ) -> Result<Card> {
        let mut tx = self.storage.begin().await?;
        let mut card = tx
            .card(&card_id, LockMode::Exclusive)
            .await?
            .ok_or_else(|| RankboardError::not_found(EntityKind::Card, card_id))?;

        if let Some(title) = title {
            card.set_title(title);
        }
        if let Some(description) = description {
            card.set_description(description);
        }

        tx.put_card(&card).await?;
        tx.commit().await?;
        Ok(card)
    }

    pub async fn delete_card(&self, card_id: CardId) -> Result<()> {
        let mut tx = self.storage.begin().await?;
        let mut card = tx
            .card(&card_id, LockMode::Exclusive)
            .await?
            .ok_or_else(|| RankboardError::not_found(EntityKind::Card, card_id))?;

        card.mark_deleted();
        tx.put_card(&card).await?;
        tx.commit().await?;

        tracing::info!(card_id = %card_id, "card deleted");
        Ok(())
    }
}
