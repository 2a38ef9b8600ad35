//! Hex-id facing entry points used by the command line.

use crate::{
    HexId, ObjectId, ObjectReader, ObjectStore, ObjectType, Result, Snapshotter, StorageError,
    StoreConfig,
};
use bytes::Bytes;
use std::path::Path;

/// Computes a file's blob id without touching any store.
pub fn hash_file(file: impl AsRef<Path>) -> Result<HexId> {
    let file = file.as_ref();
    let content = std::fs::read(file).map_err(|e| StorageError::io(file, e))?;
    Ok(ObjectId::for_object(ObjectType::Blob, &content).to_hex())
}

/// A repository: an object store plus the operations exposed to callers that
/// speak in hex ids and paths.
#[derive(Debug, Clone)]
pub struct Repository {
    store: ObjectStore,
}

impl Repository {
    /// Opens the repository whose marker directory is `git_dir`.
    pub fn open(git_dir: impl AsRef<Path>, config: StoreConfig) -> Result<Self> {
        Ok(Self {
            store: ObjectStore::open(git_dir, config)?,
        })
    }

    /// The underlying object store.
    pub fn store(&self) -> &ObjectStore {
        &self.store
    }

    /// Snapshots a working directory and returns the root tree id.
    pub fn snapshot(&self, path: impl AsRef<Path>) -> Result<HexId> {
        Ok(Snapshotter::new(&self.store).snapshot(path)?.to_hex())
    }

    /// Stores a file as a blob and returns its id.
    pub fn store_blob(&self, file: impl AsRef<Path>) -> Result<HexId> {
        Ok(self.store.write_blob_file(file)?.to_hex())
    }

    /// Computes a file's blob id, storing it only when `write` is set.
    pub fn hash_file(&self, file: impl AsRef<Path>, write: bool) -> Result<HexId> {
        if write {
            return self.store_blob(file);
        }
        hash_file(file)
    }

    /// Returns an object's type and payload.
    pub fn read_object(&self, hex: &str) -> Result<(ObjectType, Bytes)> {
        let id = ObjectId::from_hex(hex)?;
        ObjectReader::new(&self.store).read(&id)
    }

    /// Lists a tree's entries as display rows.
    pub fn list_tree(&self, hex: &str, name_only: bool) -> Result<Vec<String>> {
        let id = ObjectId::from_hex(hex)?;
        ObjectReader::new(&self.store).list(&id, name_only)
    }

    /// Renders an object for display.
    pub fn pretty(&self, hex: &str) -> Result<Bytes> {
        let id = ObjectId::from_hex(hex)?;
        ObjectReader::new(&self.store).pretty(&id)
    }
}
