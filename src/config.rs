use crate::error::{RankboardError, Result};
use crate::rank::RankConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level configuration, loadable from TOML
///
/// Every section is optional:
///
/// ```toml
/// neighbor_policy = "strict"
///
/// [rank]
/// max_key_length = 12
///
/// [storage]
/// backend = "file"
/// path = "/var/lib/rankboard"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RankboardConfig {
    pub rank: RankConfig,
    pub storage: StorageConfig,
    pub neighbor_policy: NeighborPolicy,
}

impl RankboardConfig {
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        toml::from_str(contents).map_err(|e| RankboardError::ConfigError(e.to_string()))
    }

    /// Reads and parses a TOML config file
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = tokio::fs::read_to_string(path).await?;
        let config = Self::from_toml_str(&contents)?;
        tracing::debug!(
            path = %path.display(),
            backend = config.storage.backend_name(),
            "loaded config"
        );
        Ok(config)
    }
}

/// Which storage backend to open, see [`crate::storage::open`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum StorageConfig {
    #[default]
    Memory,
    /// JSON snapshot under `<path>/.rankboard/`
    File { path: PathBuf },
    /// SQLite database file
    Sqlite { path: PathBuf },
}

impl StorageConfig {
    pub fn backend_name(&self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::File { .. } => "file",
            Self::Sqlite { .. } => "sqlite",
        }
    }
}

/// How a move treats a neighbor reference that cannot be resolved
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NeighborPolicy {
    /// A missing, deleted or foreign neighbor imposes no constraint on that side
    #[default]
    Lenient,
    /// A missing, deleted or foreign neighbor fails the move with `NotFound`
    Strict,
}
