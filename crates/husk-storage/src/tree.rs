//! Tree objects: the binary encoding of a directory listing.
//!
//! A tree payload is a run of entries with no separators beyond their own
//! structure:
//!
//! ```text
//! <mode ascii> SP <name> NUL <20 raw id bytes>
//! ```
//!
//! Entries are ordered byte-wise by name, with subtree names compared as if
//! they ended in `/`. The order is part of the hashed bytes, so it decides
//! the tree's id.

use crate::{Object, ObjectId, ObjectType, Result, StorageError};
use std::cmp::Ordering;
use std::fmt;

/// Mode of a tree entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileMode {
    /// Regular file (`100644`).
    Regular,
    /// Executable file (`100755`).
    Executable,
    /// Symbolic link (`120000`).
    Symlink,
    /// Subdirectory (`40000`).
    Tree,
}

impl FileMode {
    /// Returns the mode as written inside a tree payload.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Regular => "100644",
            Self::Executable => "100755",
            Self::Symlink => "120000",
            Self::Tree => "40000",
        }
    }

    /// Returns the six-digit form used in listings (`040000` for trees).
    pub fn padded(&self) -> &'static str {
        match self {
            Self::Tree => "040000",
            other => other.as_str(),
        }
    }

    /// Parses one of the four recognized modes.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        match bytes {
            b"100644" => Ok(Self::Regular),
            b"100755" => Ok(Self::Executable),
            b"120000" => Ok(Self::Symlink),
            b"40000" => Ok(Self::Tree),
            other => Err(StorageError::corrupt(format!(
                "unrecognized mode {:?}",
                String::from_utf8_lossy(other)
            ))),
        }
    }

    /// Returns true for subtree entries.
    pub fn is_tree(&self) -> bool {
        matches!(self, Self::Tree)
    }

    /// The type of object an entry with this mode points at.
    pub fn object_type(&self) -> ObjectType {
        if self.is_tree() {
            ObjectType::Tree
        } else {
            ObjectType::Blob
        }
    }
}

impl fmt::Display for FileMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One record of a tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeEntry {
    mode: FileMode,
    name: Vec<u8>,
    id: ObjectId,
}

impl TreeEntry {
    /// Creates an entry, rejecting names that are empty or contain `/` or NUL.
    pub fn new(mode: FileMode, name: impl Into<Vec<u8>>, id: ObjectId) -> Result<Self> {
        let name = name.into();
        if !is_valid_name(&name) {
            return Err(StorageError::InvalidEntryName(
                String::from_utf8_lossy(&name).into_owned(),
            ));
        }
        Ok(Self { mode, name, id })
    }

    /// The entry's mode.
    pub fn mode(&self) -> FileMode {
        self.mode
    }

    /// The entry's name as raw bytes.
    pub fn name(&self) -> &[u8] {
        &self.name
    }

    /// The entry's name, with invalid UTF-8 replaced.
    pub fn name_lossy(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.name)
    }

    /// Id of the child object.
    pub fn id(&self) -> ObjectId {
        self.id
    }

    fn encode_into(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(self.mode.as_str().as_bytes());
        out.push(b' ');
        out.extend_from_slice(&self.name);
        out.push(0);
        out.extend_from_slice(self.id.as_bytes());
    }
}

fn is_valid_name(name: &[u8]) -> bool {
    !name.is_empty() && !name.contains(&b'/') && !name.contains(&0)
}

/// Compares two entries by tree order.
///
/// Names compare byte-wise; a subtree's name behaves as if suffixed with `/`.
pub fn entry_order(a: &TreeEntry, b: &TreeEntry) -> Ordering {
    name_order(&a.name, a.mode.is_tree(), &b.name, b.mode.is_tree())
}

/// Tree order over bare names, given whether each one names a subtree.
pub fn name_order(a: &[u8], a_is_tree: bool, b: &[u8], b_is_tree: bool) -> Ordering {
    let a_key = a.iter().copied().chain(a_is_tree.then_some(b'/'));
    let b_key = b.iter().copied().chain(b_is_tree.then_some(b'/'));
    a_key.cmp(b_key)
}

/// Sorts entries into tree order.
pub fn sort_entries(entries: &mut [TreeEntry]) {
    entries.sort_by(entry_order);
}

/// Encodes entries into a tree payload.
///
/// Entries are written in the order given; callers sort them first.
pub fn encode(entries: &[TreeEntry]) -> Vec<u8> {
    let size = entries
        .iter()
        .map(|e| e.mode.as_str().len() + e.name.len() + 2 + ObjectId::LEN)
        .sum();
    let mut out = Vec::with_capacity(size);
    for entry in entries {
        entry.encode_into(&mut out);
    }
    out
}

/// Decodes a tree payload into its entries, in payload order.
pub fn decode(payload: &[u8]) -> Result<Vec<TreeEntry>> {
    let mut cursor = EntryCursor::new(payload);
    let mut entries = Vec::new();
    while let Some(entry) = cursor.next_entry()? {
        entries.push(entry);
    }
    Ok(entries)
}

/// Reads entries off the front of an immutable tree payload.
struct EntryCursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> EntryCursor<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn remaining(&self) -> &'a [u8] {
        &self.buf[self.pos..]
    }

    /// Takes bytes up to `delim` and steps over it.
    fn take_until(&mut self, delim: u8, what: &str) -> Result<&'a [u8]> {
        let rest = self.remaining();
        let end = rest.iter().position(|&b| b == delim).ok_or_else(|| {
            StorageError::corrupt(format!("entry at offset {}: unterminated {what}", self.pos))
        })?;
        self.pos += end + 1;
        Ok(&rest[..end])
    }

    fn take_id(&mut self) -> Result<ObjectId> {
        let rest = self.remaining();
        if rest.len() < ObjectId::LEN {
            return Err(StorageError::corrupt(format!(
                "entry at offset {}: {} of {} id bytes present",
                self.pos,
                rest.len(),
                ObjectId::LEN
            )));
        }
        let (raw, _) = rest.split_at(ObjectId::LEN);
        self.pos += ObjectId::LEN;
        ObjectId::from_slice(raw).ok_or_else(|| StorageError::corrupt("bad id slice"))
    }

    fn next_entry(&mut self) -> Result<Option<TreeEntry>> {
        if self.remaining().is_empty() {
            return Ok(None);
        }
        let start = self.pos;
        let mode = FileMode::parse(self.take_until(b' ', "mode")?)?;
        let name = self.take_until(0, "name")?;
        if name.is_empty() || name.contains(&b'/') {
            return Err(StorageError::corrupt(format!(
                "entry at offset {start}: invalid name {:?}",
                String::from_utf8_lossy(name)
            )));
        }
        let id = self.take_id()?;
        Ok(Some(TreeEntry {
            mode,
            name: name.to_vec(),
            id,
        }))
    }
}

/// A sorted directory listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TreeObject {
    entries: Vec<TreeEntry>,
}

impl TreeObject {
    /// Builds a tree, sorting the entries into tree order.
    pub fn from_entries(mut entries: Vec<TreeEntry>) -> Self {
        sort_entries(&mut entries);
        Self { entries }
    }

    /// Decodes a tree payload. Entries keep their payload order.
    pub fn decode(payload: &[u8]) -> Result<Self> {
        Ok(Self {
            entries: decode(payload)?,
        })
    }

    /// The entries in order.
    pub fn entries(&self) -> &[TreeEntry] {
        &self.entries
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the tree has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Encodes the tree payload.
    pub fn encode(&self) -> Vec<u8> {
        encode(&self.entries)
    }

    /// Wraps the payload as a storable object.
    pub fn to_object(&self) -> Object {
        Object::tree(self.encode())
    }

    /// Computes the tree's id.
    pub fn id(&self) -> ObjectId {
        ObjectId::for_object(ObjectType::Tree, &self.encode())
    }
}
