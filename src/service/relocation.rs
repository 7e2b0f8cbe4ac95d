use crate::{
    config::{NeighborPolicy, RankboardConfig},
    domain::{BoardId, Card, CardId, List, ListId},
    error::{EntityKind, RankboardError, Result},
    rank::RankEngine,
    service::placement::{insertion_index, neighbor_index, place},
    storage::{LockMode, Storage},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Request to move a card into a list between two neighbors
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveCard {
    pub card_id: CardId,
    pub target_list_id: ListId,
    /// Card the moved card should follow
    #[serde(default)]
    pub before_card_id: Option<CardId>,
    /// Card the moved card should precede
    #[serde(default)]
    pub after_card_id: Option<CardId>,
    /// Version the caller last saw; the move is rejected if the card has moved since
    pub expected_version: u64,
}

/// Request to reorder a list within its board
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveList {
    pub list_id: ListId,
    #[serde(default)]
    pub before_list_id: Option<ListId>,
    #[serde(default)]
    pub after_list_id: Option<ListId>,
}

/// Moves cards between and within lists, and lists within boards
///
/// Each move runs as one storage transaction: the moved item and its destination
/// sequence are locked, any rebalancing of the destination is written in the same
/// transaction as the move itself, and an error at any step rolls everything back.
pub struct RelocationService {
    storage: Arc<dyn Storage>,
    engine: RankEngine,
    neighbor_policy: NeighborPolicy,
}

impl RelocationService {
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

    pub fn engine(&self) -> &RankEngine {
        &self.engine
    }

    /// Moves a card, returning it with its new list, key and version
    ///
    /// Fails with `NotFound` when the card or target list is missing or deleted, and
    /// with `VersionConflict` when `expected_version` is stale. Neither is retried.
    pub async fn move_card(&self, request: &MoveCard) -> Result<Card> {
        tracing::debug!(
            card_id = %request.card_id,
            target_list_id = %request.target_list_id,
            expected_version = request.expected_version,
            "move requested"
        );

        let mut tx = self.storage.begin().await?;

        let mut card = tx
            .card(&request.card_id, LockMode::Exclusive)
            .await?
            .ok_or_else(|| RankboardError::not_found(EntityKind::Card, request.card_id))?;

        if card.version != request.expected_version {
            tracing::warn!(
                card_id = %card.id,
                current_version = card.version,
                expected_version = request.expected_version,
                "version conflict"
            );
            return Err(RankboardError::VersionConflict {
                current_version: card.version,
                expected_version: request.expected_version,
            });
        }

        tx.list(&request.target_list_id, LockMode::Exclusive)
            .await?
            .ok_or_else(|| RankboardError::not_found(EntityKind::List, request.target_list_id))?;

        let mut siblings: Vec<Card> = tx
            .cards_in_list(&request.target_list_id, LockMode::Exclusive)
            .await?
            .into_iter()
            .filter(|sibling| sibling.id != card.id)
            .collect();

        let before = self.card_index(&siblings, request.before_card_id)?;
        let after = self.card_index(&siblings, request.after_card_id)?;
        let index = insertion_index(&siblings, before, after)?;

        let placement = place(
            &self.engine,
            &mut siblings,
            index,
            &request.target_list_id,
        )?;
        if placement.rebalanced {
            for sibling in &siblings {
                tx.put_card(sibling).await?;
            }
        }

        card.relocate(request.target_list_id, placement.key);
        tx.put_card(&card).await?;
        tx.commit().await?;

        tracing::info!(
            card_id = %card.id,
            list_id = %card.list_id,
            position = %card.position,
            version = card.version,
            rebalanced = placement.rebalanced,
            "card moved"
        );
        Ok(card)
    }

    /// Moves a list within its board
    ///
    /// Lists carry no version, so there is no conflict check; the list row lock still
    /// serializes concurrent moves of the same list.
    pub async fn move_list(&self, request: &MoveList) -> Result<List> {
        tracing::debug!(
            list_id = %request.list_id,
            before_list_id = ?request.before_list_id,
            after_list_id = ?request.after_list_id,
            "list move requested"
        );

        let mut tx = self.storage.begin().await?;

        let mut list = tx
            .list(&request.list_id, LockMode::Exclusive)
            .await?
            .ok_or_else(|| RankboardError::not_found(EntityKind::List, request.list_id))?;
        let board_id: BoardId = list.board_id;

        tx.board(&board_id, LockMode::Shared)
            .await?
            .ok_or_else(|| RankboardError::not_found(EntityKind::Board, board_id))?;

        let mut siblings: Vec<List> = tx
            .lists_in_board(&board_id, LockMode::Exclusive)
            .await?
            .into_iter()
            .filter(|sibling| sibling.id != list.id)
            .collect();

        let before = self.list_index(&siblings, request.before_list_id)?;
        let after = self.list_index(&siblings, request.after_list_id)?;
        let index = insertion_index(&siblings, before, after)?;

        let placement = place(&self.engine, &mut siblings, index, &board_id)?;
        if placement.rebalanced {
            for sibling in &siblings {
                tx.put_list(sibling).await?;
            }
        }

        list.reposition(placement.key);
        tx.put_list(&list).await?;
        tx.commit().await?;

        tracing::info!(
            list_id = %list.id,
            board_id = %board_id,
            position = %list.position,
            rebalanced = placement.rebalanced,
            "list moved"
        );
        Ok(list)
    }

    fn card_index(&self, cards: &[Card], id: Option<CardId>) -> Result<Option<usize>> {
        neighbor_index(cards, id, |c| c.id, EntityKind::Card, self.neighbor_policy)
    }

    fn list_index(&self, lists: &[List], id: Option<ListId>) -> Result<Option<usize>> {
        neighbor_index(lists, id, |l| l.id, EntityKind::List, self.neighbor_policy)
    }
}
