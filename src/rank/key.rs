use serde::{Deserialize, Serialize};
use std::fmt;

/// A lexicographic sort key for an item within a sequence (e.g. "n", "an", "aan")
///
/// Keys compare byte-by-byte, so the display order of a sequence is simply the
/// ascending order of its members' keys. Validation against an alphabet happens in
/// [`RankEngine`](super::RankEngine); this type only carries the string.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderKey(String);

impl OrderKey {
    /// Wraps a key as read from storage without checking it against an alphabet
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Returns the string representation
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    /// Number of symbols in the key
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for OrderKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for OrderKey {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl AsRef<str> for OrderKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
