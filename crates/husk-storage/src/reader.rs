//! Inspection of stored objects.

use crate::tree::{self, FileMode, TreeEntry};
use crate::{ObjectId, ObjectStore, ObjectType, Result, StorageError};
use bytes::Bytes;
use std::fmt;

/// One row of a tree listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeRow {
    /// Mode of the entry.
    pub mode: FileMode,
    /// Type of the child object, derived from the mode.
    pub object_type: ObjectType,
    /// Id of the child object.
    pub id: ObjectId,
    /// Entry name, lossily decoded for display.
    pub name: String,
}

impl TreeRow {
    fn from_entry(entry: &TreeEntry) -> Self {
        Self {
            mode: entry.mode(),
            object_type: entry.mode().object_type(),
            id: entry.id(),
            name: entry.name_lossy().into_owned(),
        }
    }
}

impl fmt::Display for TreeRow {
    /// Formats as `<mode> <type> <hex id>\t<name>`.
    ///
    /// The mode is the six-digit listing form, so subtrees print as `040000`
    /// even though tree payloads store `40000`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {}\t{}",
            self.mode.padded(),
            self.object_type,
            self.id,
            self.name
        )
    }
}

/// Read-side view over an [`ObjectStore`].
#[derive(Debug, Clone, Copy)]
pub struct ObjectReader<'a> {
    store: &'a ObjectStore,
}

impl<'a> ObjectReader<'a> {
    /// Creates a reader over `store`.
    pub fn new(store: &'a ObjectStore) -> Self {
        Self { store }
    }

    /// Returns an object's type and payload.
    pub fn read(&self, id: &ObjectId) -> Result<(ObjectType, Bytes)> {
        let object = self.store.read(id)?;
        Ok((object.object_type, object.data))
    }

    /// Reads and decodes a tree. Entries come back in tree order, whatever
    /// order the payload used.
    pub fn tree_entries(&self, id: &ObjectId) -> Result<Vec<TreeEntry>> {
        let (object_type, payload) = self.read(id)?;
        if object_type != ObjectType::Tree {
            return Err(StorageError::CorruptObject {
                id: id.to_hex().to_string(),
                reason: format!("expected a tree, found a {object_type}"),
            });
        }
        decode_sorted(id, &payload)
    }

    /// Lists a tree as typed rows.
    pub fn list_entries(&self, id: &ObjectId) -> Result<Vec<TreeRow>> {
        Ok(self
            .tree_entries(id)?
            .iter()
            .map(TreeRow::from_entry)
            .collect())
    }

    /// Lists a tree as display rows: names only, or full
    /// `<mode> <type> <hex id>\t<name>` lines.
    pub fn list(&self, id: &ObjectId, name_only: bool) -> Result<Vec<String>> {
        let rows = self.list_entries(id)?;
        Ok(rows
            .into_iter()
            .map(|row| if name_only { row.name } else { row.to_string() })
            .collect())
    }

    /// Renders an object for people: blobs verbatim, trees as listing rows.
    pub fn pretty(&self, id: &ObjectId) -> Result<Bytes> {
        let (object_type, payload) = self.read(id)?;
        match object_type {
            ObjectType::Blob => Ok(payload),
            ObjectType::Tree => {
                let mut out = String::new();
                for entry in decode_sorted(id, &payload)? {
                    out.push_str(&TreeRow::from_entry(&entry).to_string());
                    out.push('\n');
                }
                Ok(Bytes::from(out))
            }
        }
    }
}

fn decode_sorted(id: &ObjectId, payload: &[u8]) -> Result<Vec<TreeEntry>> {
    let mut entries = tree::decode(payload).map_err(|e| e.with_id(id.to_hex().as_str()))?;
    tree::sort_entries(&mut entries);
    Ok(entries)
}
