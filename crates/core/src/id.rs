//! Opaque content identifiers for commits, trees, and blobs

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A 32-byte content id
///
/// The all-zero id is the "absent" sentinel: it denotes a path or commit
/// that does not exist in a given variant.
#[derive(Copy, Clone, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
pub struct ObjectId([u8; 32]);

/// Id of a commit object
pub type CommitId = ObjectId;

/// Id of a tree object
pub type TreeId = ObjectId;

/// Error parsing an id from hex
#[derive(Debug, Error)]
pub enum ParseIdError {
    #[error("invalid hex length: expected 64 characters, got {0}")]
    InvalidLength(usize),
    #[error("invalid hex: {0}")]
    InvalidHex(#[from] hex::FromHexError),
}

impl ObjectId {
    /// The absent sentinel
    pub const ZERO: ObjectId = ObjectId([0u8; 32]);

    /// Create an id from raw bytes
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get the id as a byte slice
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Whether this id is the absent sentinel
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }

    /// Convert to a lowercase hex string
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse from a 64-character hex string
    pub fn from_hex(s: &str) -> Result<Self, ParseIdError> {
        if s.len() != 64 {
            return Err(ParseIdError::InvalidLength(s.len()));
        }
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(s, &mut bytes)?;
        Ok(Self(bytes))
    }
}

impl std::fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ObjectId({})", self.to_hex())
    }
}

impl std::fmt::Display for ObjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Abbreviated form, enough for log lines
        write!(f, "{}", &self.to_hex()[..12])
    }
}

/// Hash bytes into a content id using BLAKE3
pub fn hash_bytes(data: &[u8]) -> ObjectId {
    let hash = blake3::hash(data);
    ObjectId::from_bytes(*hash.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_consistency() {
        let data = b"hello world";
        assert_eq!(hash_bytes(data), hash_bytes(data));
        assert_ne!(hash_bytes(b"hello"), hash_bytes(b"world"));
    }

    #[test]
    fn test_hex_roundtrip() {
        let original = ObjectId::from_bytes([42; 32]);
        let hex = original.to_hex();
        assert_eq!(hex.len(), 64);
        let decoded = ObjectId::from_hex(&hex).unwrap();
        assert_eq!(original, decoded);
    }

    #[test]
    fn test_hex_invalid() {
        assert!(ObjectId::from_hex("abc").is_err());
        assert!(ObjectId::from_hex(&"g".repeat(64)).is_err());
    }

    #[test]
    fn test_zero_sentinel() {
        assert!(ObjectId::ZERO.is_zero());
        assert!(!hash_bytes(b"x").is_zero());
    }
}
