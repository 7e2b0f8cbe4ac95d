//! Lexicographic order keys ("lexorank") for sequences that are reordered in place.
//!
//! A new item is placed by computing a key strictly between its neighbors' keys, so
//! no other item in the sequence has to be renumbered. When keys grow past the
//! configured length the whole sequence is re-keyed with [`RankEngine::balanced_keys`].

pub mod engine;
pub mod key;

pub use engine::{RankConfig, RankEngine};
pub use key::OrderKey;
