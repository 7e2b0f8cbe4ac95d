use crate::domain::{ids::CardId, ids::ListId, sequence::Orderable};
use crate::rank::OrderKey;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A card, ordered within its list by `position`
///
/// `version` is the optimistic-concurrency counter: it increases by exactly one on
/// every accepted move and is untouched by content edits and rebalancing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Card {
    pub id: CardId,
    pub list_id: ListId,
    pub title: String,
    pub description: Option<String>,
    pub position: OrderKey,
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Card {
    pub const INITIAL_VERSION: u64 = 1;

    /// Creates a new card at the given position
    pub fn new(list_id: ListId, title: String, position: OrderKey) -> Self {
        let now = Utc::now();
        Self {
            id: CardId::new(),
            list_id,
            title,
            description: None,
            position,
            version: Self::INITIAL_VERSION,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    /// Sets the title
    pub fn set_title(&mut self, title: String) {
        self.title = title;
        self.updated_at = Utc::now();
    }

    /// Sets the description
    pub fn set_description(&mut self, description: String) {
        self.description = Some(description);
        self.updated_at = Utc::now();
    }

    /// Moves the card into `list_id` at `position`, bumping the version once
    pub fn relocate(&mut self, list_id: ListId, position: OrderKey) {
        self.list_id = list_id;
        self.position = position;
        self.version += 1;
        self.updated_at = Utc::now();
    }

    /// Soft-deletes the card
    pub fn mark_deleted(&mut self) {
        let now = Utc::now();
        self.deleted_at = Some(now);
        self.updated_at = now;
    }

    pub fn is_live(&self) -> bool {
        self.deleted_at.is_none()
    }
}

impl Orderable for Card {
    fn order_key(&self) -> &OrderKey {
        &self.position
    }

    fn set_order_key(&mut self, key: OrderKey) {
        self.position = key;
    }
}
