//! # Hashing & Commitments
//!
//! One hash function, two jobs:
//!
//! - **Content addressing.** Every record in Agora (payments, transfers, view
//!   sections, governments) is identified by the hash of its own canonical
//!   bytes. Two structurally equal contents hash identically, always.
//! - **Amount blinding.** A transfer never carries its amount in the clear.
//!   It carries `H(seed || decimal(amount))`, which only someone holding the
//!   seed can open.
//!
//! Content addressing is fixed to BLAKE3 ([`blake3_hash`]): record hashes
//! are storage keys and signed messages, so they must not change with how an
//! orchestrator is wired. Blinding and owner hashing go through the
//! [`HashAdapter`] trait instead, whose default [`Blake3Adapter`] uses the
//! same function.
//!
//! ## Commitment input order
//!
//! `from_multi_bytes` concatenates its inputs in order. For blinding, the
//! order is seed first, then the amount's decimal string. Swap them and every
//! previously issued disclosure package stops opening.

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

use crate::config::HASH_OUTPUT_LENGTH;

// ---------------------------------------------------------------------------
// Hash
// ---------------------------------------------------------------------------

/// A 32-byte digest. The identity of every content object in the protocol.
///
/// Serializes as a lowercase hex string so that JSON disclosure files stay
/// readable.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Hash([u8; HASH_OUTPUT_LENGTH]);

impl Hash {
    /// Wrap raw digest bytes.
    pub const fn from_array(bytes: [u8; HASH_OUTPUT_LENGTH]) -> Self {
        Self(bytes)
    }

    /// The raw digest bytes.
    pub fn as_bytes(&self) -> &[u8; HASH_OUTPUT_LENGTH] {
        &self.0
    }

    /// Hex-encoded digest. 64 characters.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse a 64-character hex digest.
    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        let bytes = hex::decode(s)?;
        let arr: [u8; HASH_OUTPUT_LENGTH] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| hex::FromHexError::InvalidStringLength)?;
        Ok(Self(arr))
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash({})", &self.to_hex()[..16])
    }
}

impl AsRef<[u8]> for Hash {
    fn as_ref(&self) -> &[u8] {
        &self.0
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

// ---------------------------------------------------------------------------
// HashAdapter
// ---------------------------------------------------------------------------

/// The hashing contract the orchestrator consumes for amount blinding and
/// owner hashes. Content hashes never go through it.
///
/// Pure and deterministic. There is no error path: the only way a hash can
/// fail is an allocation failure, and that aborts the process anyway.
pub trait HashAdapter: Send + Sync {
    /// Hash a single byte string.
    fn from_bytes(&self, data: &[u8]) -> Hash;

    /// Hash the in-order concatenation of several byte strings.
    fn from_multi_bytes(&self, parts: &[&[u8]]) -> Hash;
}

/// Default [`HashAdapter`] backed by BLAKE3.
#[derive(Debug, Clone, Copy, Default)]
pub struct Blake3Adapter;

impl HashAdapter for Blake3Adapter {
    fn from_bytes(&self, data: &[u8]) -> Hash {
        Hash(blake3_hash(data))
    }

    fn from_multi_bytes(&self, parts: &[&[u8]]) -> Hash {
        Hash(blake3_hash_multi(parts))
    }
}

// ---------------------------------------------------------------------------
// Free functions
// ---------------------------------------------------------------------------

/// Compute the BLAKE3 hash of the input data.
///
/// # Example
///
/// ```
/// use agora_protocol::crypto::hash::blake3_hash;
///
/// let hash = blake3_hash(b"agora");
/// assert_eq!(hash.len(), 32);
/// ```
pub fn blake3_hash(data: &[u8]) -> [u8; 32] {
    *blake3::hash(data).as_bytes()
}

/// Hash multiple byte slices as if they were concatenated, without building
/// the concatenation.
pub fn blake3_hash_multi(parts: &[&[u8]]) -> [u8; 32] {
    let mut hasher = blake3::Hasher::new();
    for part in parts {
        hasher.update(part);
    }
    *hasher.finalize().as_bytes()
}

/// Blind an amount under a seed: `H(seed || decimal(amount))`.
///
/// The amount is rendered as its base-10 string, not as little-endian bytes.
/// That keeps commitments stable regardless of integer width.
///
/// Seed and amount are not separated, so `("s1", 50)` and `("s15", 0)` blind
/// to the same hash. Use seeds that do not end in a digit.
pub fn blind_amount(adapter: &dyn HashAdapter, seed: &str, amount: u64) -> Hash {
    let amount_str = amount.to_string();
    adapter.from_multi_bytes(&[seed.as_bytes(), amount_str.as_bytes()])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blake3_deterministic() {
        let a = blake3_hash(b"agora");
        let b = blake3_hash(b"agora");
        assert_eq!(a, b);
    }

    #[test]
    fn multi_bytes_equals_concatenation() {
        let adapter = Blake3Adapter;
        let multi = adapter.from_multi_bytes(&[b"hello", b" world"]);
        let single = adapter.from_bytes(b"hello world");
        assert_eq!(multi, single);
    }

    #[test]
    fn multi_bytes_order_matters() {
        let adapter = Blake3Adapter;
        let ab = adapter.from_multi_bytes(&[b"a", b"b"]);
        let ba = adapter.from_multi_bytes(&[b"b", b"a"]);
        assert_ne!(ab, ba);
    }

    #[test]
    fn blind_amount_uses_seed_then_decimal() {
        let adapter = Blake3Adapter;
        let blinded = blind_amount(&adapter, "s1", 50);
        assert_eq!(blinded, adapter.from_bytes(b"s150"));
    }

    #[test]
    fn blind_amount_no_collisions_in_small_corpus() {
        // Different (seed, amount) pairs must not collide. The concatenation
        // is ambiguous in principle ("s1"+"50" vs "s15"+"0"), so the corpus
        // keeps seeds of equal length.
        let adapter = Blake3Adapter;
        let mut seen = std::collections::HashSet::new();
        for seed in ["aa", "ab", "ba", "zz"] {
            for amount in [0u64, 1, 50, 100, u64::MAX] {
                assert!(seen.insert(blind_amount(&adapter, seed, amount)));
            }
        }
    }

    #[test]
    fn hash_hex_roundtrip() {
        let h = Hash::from_array(blake3_hash(b"roundtrip"));
        assert_eq!(Hash::from_hex(&h.to_hex()).unwrap(), h);
        assert!(Hash::from_hex("deadbeef").is_err());
    }

    #[test]
    fn hash_serializes_as_hex_string() {
        let h = Hash::from_array([0xAB; 32]);
        let json = serde_json::to_string(&h).unwrap();
        assert_eq!(json, format!("\"{}\"", "ab".repeat(32)));
        let back: Hash = serde_json::from_str(&json).unwrap();
        assert_eq!(back, h);
    }
}
