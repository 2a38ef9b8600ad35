//! Loose object storage for Husk.
//!
//! This crate provides a content-addressed store for blobs and trees laid out
//! like git's loose objects, and builds tree snapshots of working directories.

pub mod codec;
mod config;
mod error;
mod object;
mod oid;
mod reader;
mod repo;
mod snapshot;
mod store;
pub mod tree;

pub use codec::CompressionLevel;
pub use config::{StoreConfig, DEFAULT_MARKER_DIR};
pub use error::StorageError;
pub use object::{Object, ObjectType};
pub use oid::{HexId, ObjectId};
pub use reader::{ObjectReader, TreeRow};
pub use repo::{hash_file, Repository};
pub use snapshot::{snapshot, SnapshotStats, Snapshotter};
pub use store::ObjectStore;
pub use tree::{FileMode, TreeEntry, TreeObject};

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;
