//! Storage error types.

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The repository marker directory has no `objects/` directory.
    #[error("repository not initialized: {} has no objects directory", .0.display())]
    RepositoryNotInitialized(PathBuf),

    /// The requested object has no backing file.
    #[error("object not found: {0}")]
    ObjectNotFound(String),

    /// The provided string is not a valid object id.
    #[error("invalid object id: {0}")]
    InvalidId(String),

    /// The object could not be decompressed or its contents are malformed.
    #[error("corrupt object {id}: {reason}")]
    CorruptObject {
        /// Hex id of the object, or `-` when decoding detached bytes.
        id: String,
        /// What was wrong with it.
        reason: String,
    },

    /// A tree entry name contains a path separator or NUL, or is empty.
    #[error("invalid tree entry name: {0:?}")]
    InvalidEntryName(String),

    /// The deflate stream could not be produced.
    #[error("compression error: {0}")]
    Compression(String),

    /// The store configuration could not be loaded.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// An I/O error occurred.
    #[error("I/O error at {}: {source}", .path.display())]
    Io {
        /// The path being accessed.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },
}

impl StorageError {
    /// Wraps an I/O error with the path that produced it.
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// A corruption not yet tied to a particular object id.
    pub(crate) fn corrupt(reason: impl Into<String>) -> Self {
        Self::CorruptObject {
            id: "-".to_string(),
            reason: reason.into(),
        }
    }

    /// Attaches an object id to a detached corruption error.
    pub(crate) fn with_id(self, hex: &str) -> Self {
        match self {
            Self::CorruptObject { reason, .. } => Self::CorruptObject {
                id: hex.to_string(),
                reason,
            },
            other => other,
        }
    }

    /// Returns true if this is a `CorruptObject` error.
    pub fn is_corrupt(&self) -> bool {
        matches!(self, Self::CorruptObject { .. })
    }
}
