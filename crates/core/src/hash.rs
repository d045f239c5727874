//! Blake3 hashing utilities for the ledger.

use crate::entry::Entry;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// A named alias for a 32-byte(u8) array, used to represent a 256-bit hash.
pub type H256 = [u8; 32];

/// A wrapper type for H256 with Display and Debug formatting.
///
/// Serialized as a lowercase hex string so block records stay readable
/// in their JSON form.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Hash(pub H256);

impl Hash {
    /// The zero hash (all zeros). Used as the genesis block's parent.
    pub const ZERO: Self = Self([0u8; 32]);

    /// Convert to a hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse from a hex string.
    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        let s = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(s)?;
        if bytes.len() != 32 {
            return Err(hex::FromHexError::InvalidStringLength);
        }
        let mut arr = [0u8; 32];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }

    /// The form this hash takes when it is fed to [`block_hash`] as a parent link.
    ///
    /// The genesis block's parent is written as the literal `"0"`.
    pub fn link(&self) -> String {
        if *self == Self::ZERO {
            "0".to_string()
        } else {
            self.to_hex()
        }
    }
}

impl fmt::Debug for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash(0x{})", &self.to_hex()[..8])
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", self.to_hex())
    }
}

impl Serialize for Hash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Hash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Hash::from_hex(&s).map_err(de::Error::custom)
    }
}

/// Hash arbitrary data using Blake3.
pub fn hash(data: &[u8]) -> Hash {
    Hash(blake3::hash(data).into())
}

/// Hash multiple pieces of data by concatenating them.
pub fn hash_concat(parts: &[&[u8]]) -> Hash {
    let mut hasher = blake3::Hasher::new();
    for part in parts {
        hasher.update(part);
    }
    Hash(hasher.finalize().into())
}

/// Compute the content hash of a block.
///
/// The digest covers, in order: the decimal index, the parent link
/// (see [`Hash::link`]), the canonical JSON of the payload and the
/// timestamp. Timestamps use the shortest representation that parses
/// back to the same `f64`, so a stored block always re-hashes identically.
pub fn block_hash(index: u64, prev_hash: &Hash, payload: &Entry, timestamp: f64) -> Hash {
    let index = index.to_string();
    let link = prev_hash.link();
    let payload = payload.canonical_json();
    let timestamp = timestamp.to_string();
    hash_concat(&[
        index.as_bytes(),
        link.as_bytes(),
        payload.as_bytes(),
        timestamp.as_bytes(),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_deterministic() {
        let data = b"hello world";
        let h1 = hash(data);
        let h2 = hash(data);
        assert_eq!(h1, h2);
    }

    #[test]
    fn test_hash_hex_roundtrip() {
        let h = hash(b"test data");
        let parsed = Hash::from_hex(&h.to_hex()).unwrap();
        assert_eq!(h, parsed);

        let prefixed = Hash::from_hex(&h.to_string()).unwrap();
        assert_eq!(h, prefixed);
    }

    #[test]
    fn test_hash_display() {
        let h = hash(b"test");
        let display = format!("{}", h);
        assert!(display.starts_with("0x"));
        assert_eq!(display.len(), 66); // "0x" + 64 hex chars
    }

    #[test]
    fn test_hash_concat() {
        let h1 = hash_concat(&[b"hello", b"world"]);
        let h2 = hash(b"helloworld");
        assert_eq!(h1, h2);
    }

    #[test]
    fn test_zero_link_is_literal_zero() {
        assert_eq!(Hash::ZERO.link(), "0");
        let h = hash(b"parent");
        assert_eq!(h.link(), h.to_hex());
    }

    #[test]
    fn test_block_hash_deterministic() {
        let entry = Entry::deposit("alice", 25.0);
        let h1 = block_hash(3, &Hash::ZERO, &entry, 1_700_000_000.123456);
        let h2 = block_hash(3, &Hash::ZERO, &entry, 1_700_000_000.123456);
        assert_eq!(h1, h2);
    }

    #[test]
    fn test_block_hash_covers_every_field() {
        let entry = Entry::deposit("alice", 25.0);
        let parent = hash(b"parent");
        let base = block_hash(3, &parent, &entry, 1_700_000_000.5);

        assert_ne!(base, block_hash(4, &parent, &entry, 1_700_000_000.5));
        assert_ne!(base, block_hash(3, &Hash::ZERO, &entry, 1_700_000_000.5));
        assert_ne!(
            base,
            block_hash(3, &parent, &Entry::deposit("alice", 25.5), 1_700_000_000.5)
        );
        // Sub-microsecond difference must still change the digest.
        assert_ne!(base, block_hash(3, &parent, &entry, 1_700_000_000.500001));
    }

    #[test]
    fn test_hash_serde_as_hex() {
        let h = hash(b"serde");
        let json = serde_json::to_string(&h).unwrap();
        assert_eq!(json, format!("\"{}\"", h.to_hex()));
        let back: Hash = serde_json::from_str(&json).unwrap();
        assert_eq!(back, h);

        let bad: Result<Hash, _> = serde_json::from_str("\"abcd\"");
        assert!(bad.is_err());
    }
}
