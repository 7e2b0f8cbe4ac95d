//! # Rankboard Core
//!
//! Ordering and relocation engine for collaborative boards of lists and cards.
//!
//! Lists within a board and cards within a list are ordered purely by string order
//! keys ([`OrderKey`]), so an item can be inserted between any two neighbors without
//! renumbering the rest of its sequence. [`RankEngine`] computes those keys and
//! rebalances a sequence once its keys grow too long; [`RelocationService`] moves cards
//! under an optimistic version check, rejecting stale concurrent moves instead of
//! merging them.
//!
//! Storage is pluggable through the [`Storage`] trait, with in-memory, JSON file and
//! (feature `sqlite-storage`) SQLite backends.

pub mod config;
pub mod domain;
pub mod error;
pub mod rank;
pub mod service;
pub mod storage;

// Re-export commonly used types
pub use config::{NeighborPolicy, RankboardConfig, StorageConfig};
pub use domain::{Board, BoardDetail, BoardId, Card, CardId, List, ListDetail, ListId};
pub use error::{EntityKind, ErrorKind, RankboardError, Result};
pub use rank::{OrderKey, RankConfig, RankEngine};
pub use service::{BoardService, MoveCard, MoveList, RelocationService};
pub use storage::{MemoryStorage, Storage, Transaction};
