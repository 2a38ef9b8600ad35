//! Object identifiers.
//!
//! An object is addressed by the SHA-1 digest of its frame. The raw 20-byte
//! form ([`ObjectId`]) is what trees embed; the 40-character hex form
//! ([`HexId`]) is what users type and what names files on disk. The two are
//! separate types so one can never stand in for the other.

use crate::{ObjectType, Result, StorageError};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha1::{Digest, Sha1};
use std::fmt;
use std::str::FromStr;

/// A 20-byte SHA-1 object identifier.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId([u8; 20]);

impl ObjectId {
    /// The length of an object id in bytes.
    pub const LEN: usize = 20;

    /// The length of the hex form.
    pub const HEX_LEN: usize = 40;

    /// Creates an ObjectId from raw bytes.
    pub const fn from_bytes(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    /// Creates an ObjectId from a slice holding exactly 20 raw bytes.
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        <[u8; 20]>::try_from(bytes).ok().map(Self)
    }

    /// Returns the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Computes the id of a complete object frame.
    pub fn compute(frame: &[u8]) -> Self {
        let digest = Sha1::digest(frame);
        let mut bytes = [0u8; 20];
        bytes.copy_from_slice(&digest);
        Self(bytes)
    }

    /// Computes the id an object would have, without building its frame.
    pub fn for_object(object_type: ObjectType, payload: &[u8]) -> Self {
        let mut hasher = Sha1::new();
        hasher.update(object_type.header(payload.len()));
        hasher.update(payload);
        let mut bytes = [0u8; 20];
        bytes.copy_from_slice(&hasher.finalize());
        Self(bytes)
    }

    /// Returns the hex representation.
    pub fn to_hex(&self) -> HexId {
        HexId {
            text: hex::encode(self.0),
            raw: self.0,
        }
    }

    /// Parses an ObjectId from its 40-character hex form.
    pub fn from_hex(s: &str) -> Result<Self> {
        HexId::parse(s).map(|hex| hex.to_object_id())
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectId({})", self.to_hex())
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_hex().as_str())
    }
}

impl FromStr for ObjectId {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_hex(s)
    }
}

impl Serialize for ObjectId {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.to_hex().as_str())
    }
}

impl<'de> Deserialize<'de> for ObjectId {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        ObjectId::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// A validated, lowercase, 40-character hex object id.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HexId {
    text: String,
    raw: [u8; 20],
}

impl HexId {
    /// Validates `s` as a hex object id. Uppercase digits are normalized.
    pub fn parse(s: &str) -> Result<Self> {
        if s.len() != ObjectId::HEX_LEN {
            return Err(StorageError::InvalidId(format!(
                "{s:?}: expected {} hex characters, got {}",
                ObjectId::HEX_LEN,
                s.len()
            )));
        }
        let mut raw = [0u8; 20];
        hex::decode_to_slice(s, &mut raw)
            .map_err(|e| StorageError::InvalidId(format!("{s:?}: {e}")))?;
        Ok(Self {
            text: s.to_ascii_lowercase(),
            raw,
        })
    }

    /// Returns the hex string.
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// The raw id this hex string names.
    pub fn to_object_id(&self) -> ObjectId {
        ObjectId(self.raw)
    }

    /// Splits into the fan-out directory name and the file name.
    pub fn fan_out(&self) -> (&str, &str) {
        self.text.split_at(2)
    }
}

impl fmt::Debug for HexId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HexId({})", self.text)
    }
}

impl fmt::Display for HexId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

impl FromStr for HexId {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl AsRef<str> for HexId {
    fn as_ref(&self) -> &str {
        &self.text
    }
}

impl From<ObjectId> for HexId {
    fn from(id: ObjectId) -> Self {
        id.to_hex()
    }
}

impl From<&HexId> for ObjectId {
    fn from(hex: &HexId) -> Self {
        hex.to_object_id()
    }
}
