//! Object types and the `"<type> <len>\0<payload>"` frame.

use crate::{ObjectId, Result, StorageError};
use bytes::Bytes;
use std::fmt;

/// Object types held by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectType {
    /// File content.
    Blob,
    /// Directory listing.
    Tree,
}

impl ObjectType {
    /// Returns the string representation used in frames.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Blob => "blob",
            Self::Tree => "tree",
        }
    }

    /// Parses an object type from its frame name.
    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "blob" => Ok(Self::Blob),
            "tree" => Ok(Self::Tree),
            _ => Err(StorageError::corrupt(format!("unknown object type: {s:?}"))),
        }
    }

    /// Builds the frame header for a payload of `len` bytes.
    pub fn header(&self, len: usize) -> Vec<u8> {
        format!("{} {}\0", self.as_str(), len).into_bytes()
    }
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A typed object payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Object {
    /// The type of object.
    pub object_type: ObjectType,
    /// The raw payload (unframed, uncompressed).
    pub data: Bytes,
}

impl Object {
    /// Creates a new object.
    pub fn new(object_type: ObjectType, data: impl Into<Bytes>) -> Self {
        Self {
            object_type,
            data: data.into(),
        }
    }

    /// Creates a blob object.
    pub fn blob(content: impl Into<Bytes>) -> Self {
        Self::new(ObjectType::Blob, content)
    }

    /// Creates a tree object from an encoded tree payload.
    pub fn tree(payload: impl Into<Bytes>) -> Self {
        Self::new(ObjectType::Tree, payload)
    }

    /// Returns the size of the payload.
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Computes the object's id.
    pub fn id(&self) -> ObjectId {
        ObjectId::for_object(self.object_type, &self.data)
    }

    /// Serializes to `"<type> <len>\0<payload>"`.
    pub fn to_frame(&self) -> Vec<u8> {
        let mut frame = self.object_type.header(self.data.len());
        frame.extend_from_slice(&self.data);
        frame
    }

    /// Parses a frame produced by [`Object::to_frame`].
    ///
    /// The header ends at the first NUL. The declared length must be a plain
    /// decimal number equal to the number of bytes that follow.
    pub fn from_frame(frame: &[u8]) -> Result<Self> {
        let nul = frame
            .iter()
            .position(|&b| b == 0)
            .ok_or_else(|| StorageError::corrupt("missing NUL after header"))?;

        let header = std::str::from_utf8(&frame[..nul])
            .map_err(|_| StorageError::corrupt("header is not ASCII"))?;
        let (type_name, len_field) = header
            .split_once(' ')
            .ok_or_else(|| StorageError::corrupt(format!("invalid header: {header:?}")))?;

        let object_type = ObjectType::parse(type_name)?;
        let declared = parse_length(len_field)?;

        let payload = &frame[nul + 1..];
        if declared != payload.len() {
            return Err(StorageError::corrupt(format!(
                "declared length {declared} but payload has {} bytes",
                payload.len()
            )));
        }

        Ok(Self::new(object_type, Bytes::copy_from_slice(payload)))
    }
}

fn parse_length(field: &str) -> Result<usize> {
    let canonical = !field.is_empty()
        && field.bytes().all(|b| b.is_ascii_digit())
        && (field == "0" || !field.starts_with('0'));
    if !canonical {
        return Err(StorageError::corrupt(format!("invalid length field: {field:?}")));
    }
    field
        .parse()
        .map_err(|_| StorageError::corrupt(format!("length out of range: {field}")))
}
