use std::fmt;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, RankboardError>;

/// Kind of entity a lookup failed for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Board,
    List,
    Card,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Board => write!(f, "Board"),
            Self::List => write!(f, "List"),
            Self::Card => write!(f, "Card"),
        }
    }
}

/// Caller-facing classification of an error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Neighbors passed out of order; a caller bug
    InvalidOrder,
    /// Referenced item or sequence is missing or soft-deleted
    NotFound,
    /// Optimistic-lock mismatch; the caller should refresh and retry
    VersionConflict,
    /// Anything else, reported opaquely
    Internal,
}

#[derive(Debug, Error)]
pub enum RankboardError {
    #[error("Invalid order: '{before}' must sort before '{after}'")]
    InvalidOrder { before: String, after: String },

    #[error("Invalid order key '{key}': {reason}")]
    InvalidKey { key: String, reason: String },

    #[error("{entity} not found: {id}")]
    NotFound { entity: EntityKind, id: String },

    #[error(
        "Version conflict: item is at version {current_version}, request expected {expected_version}"
    )]
    VersionConflict {
        current_version: u64,
        expected_version: u64,
    },

    #[error("Rebalance invariant violated: {0}")]
    RebalanceInvariant(String),

    #[error("Invalid ID format: {0}")]
    InvalidId(String),

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[cfg(feature = "sqlite-storage")]
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

impl RankboardError {
    pub fn not_found(entity: EntityKind, id: impl fmt::Display) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Collapses the error into the taxonomy exposed to callers
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidOrder { .. } => ErrorKind::InvalidOrder,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::VersionConflict { .. } => ErrorKind::VersionConflict,
            _ => ErrorKind::Internal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_mapping() {
        let err = RankboardError::VersionConflict {
            current_version: 2,
            expected_version: 1,
        };
        assert_eq!(err.kind(), ErrorKind::VersionConflict);

        let err = RankboardError::not_found(EntityKind::List, "abc");
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(err.to_string(), "List not found: abc");

        let err = RankboardError::RebalanceInvariant("short".to_string());
        assert_eq!(err.kind(), ErrorKind::Internal);
    }

    #[test]
    fn test_version_conflict_reports_both_versions() {
        let err = RankboardError::VersionConflict {
            current_version: 2,
            expected_version: 1,
        };
        let message = err.to_string();
        assert!(message.contains("version 2"));
        assert!(message.contains("expected 1"));
    }
}
