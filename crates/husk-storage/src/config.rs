//! Store configuration.

use crate::{CompressionLevel, Result, StorageError};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Name of the repository marker directory.
pub const DEFAULT_MARKER_DIR: &str = ".git";

/// Configuration for an [`ObjectStore`](crate::ObjectStore) and the snapshotter.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct StoreConfig {
    /// Compression level for newly written objects.
    pub compression: CompressionLevel,
    /// Mark object files read-only after writing them.
    pub read_only_objects: bool,
    /// Entry names the snapshotter skips at every level.
    pub ignore: Vec<String>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            compression: CompressionLevel::Default,
            read_only_objects: true,
            ignore: vec![DEFAULT_MARKER_DIR.to_string()],
        }
    }
}

impl StoreConfig {
    /// Loads configuration from a YAML file.
    pub fn load_yaml(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content =
            std::fs::read_to_string(path).map_err(|e| StorageError::io(path, e))?;
        Self::from_yaml(&content)
    }

    /// Parses configuration from YAML text.
    pub fn from_yaml(content: &str) -> Result<Self> {
        let config: StoreConfig =
            serde_yaml::from_str(content).map_err(|e| StorageError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<()> {
        for name in &self.ignore {
            if name.is_empty() || name.contains('/') || name.contains('\0') {
                return Err(StorageError::Config(format!(
                    "ignore entries must be plain names, got {name:?}"
                )));
            }
        }
        Ok(())
    }

    /// Returns true if the snapshotter should skip an entry with this name.
    pub fn is_ignored(&self, name: &[u8]) -> bool {
        self.ignore.iter().any(|ignored| ignored.as_bytes() == name)
    }
}
