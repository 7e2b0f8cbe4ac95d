use crate::domain::{card::Card, ids::BoardId, list::List};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A board owning an ordered sequence of lists
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Board {
    pub id: BoardId,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Board {
    pub fn new(name: String) -> Self {
        let now = Utc::now();
        Self {
            id: BoardId::new(),
            name,
            description: None,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    pub fn with_description(mut self, description: Option<String>) -> Self {
        self.description = description;
        self
    }

    pub fn set_name(&mut self, name: String) {
        self.name = name;
        self.updated_at = Utc::now();
    }

    pub fn set_description(&mut self, description: String) {
        self.description = Some(description);
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

/// A list together with its live cards in display order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListDetail {
    #[serde(flatten)]
    pub list: List,
    pub cards: Vec<Card>,
}

/// A board together with its live lists and cards in display order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardDetail {
    #[serde(flatten)]
    pub board: Board,
    pub lists: Vec<ListDetail>,
}

impl BoardDetail {
    /// Total number of live cards across all lists
    pub fn card_count(&self) -> usize {
        self.lists.iter().map(|list| list.cards.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rank::OrderKey;

    #[test]
    fn test_board_creation() {
        let board = Board::new("Roadmap".to_string()).with_description(Some("Q3".to_string()));
        assert_eq!(board.name, "Roadmap");
        assert_eq!(board.description.as_deref(), Some("Q3"));
        assert!(board.is_live());
    }

    #[test]
    fn test_board_detail_serializes_flat() {
        let board = Board::new("Roadmap".to_string());
        let list = List::new(board.id, "Todo".to_string(), OrderKey::from("n"));
        let card = Card::new(list.id, "Card".to_string(), OrderKey::from("n"));
        let detail = BoardDetail {
            board,
            lists: vec![ListDetail {
                list,
                cards: vec![card],
            }],
        };

        assert_eq!(detail.card_count(), 1);

        let value = serde_json::to_value(&detail).unwrap();
        assert_eq!(value["name"], "Roadmap");
        assert_eq!(value["lists"][0]["name"], "Todo");
        assert_eq!(value["lists"][0]["cards"][0]["version"], 1);
    }
}
