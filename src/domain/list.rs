use crate::domain::{ids::BoardId, ids::ListId, sequence::Orderable};
use crate::rank::OrderKey;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A list of cards, ordered within its board by `position`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct List {
    pub id: ListId,
    pub board_id: BoardId,
    pub name: String,
    pub position: OrderKey,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl List {
    pub fn new(board_id: BoardId, name: String, position: OrderKey) -> Self {
        let now = Utc::now();
        Self {
            id: ListId::new(),
            board_id,
            name,
            position,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    pub fn set_name(&mut self, name: String) {
        self.name = name;
        self.updated_at = Utc::now();
    }

    /// Moves the list to a new position within its board
    pub fn reposition(&mut self, position: OrderKey) {
        self.position = position;
        self.updated_at = Utc::now();
    }

    pub fn mark_deleted(&mut self) {
        let now = Utc::now();
        self.deleted_at = Some(now);
        self.updated_at = now;
    }

    pub fn is_live(&self) -> bool {
        self.deleted_at.is_none()
    }
}

impl Orderable for List {
    fn order_key(&self) -> &OrderKey {
        &self.position
    }

    fn set_order_key(&mut self, key: OrderKey) {
        self.position = key;
    }
}
