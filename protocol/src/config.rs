//! # Protocol Configuration & Constants
//!
//! Every tunable number in Agora lives here. Ring sizes, owner-hash minimums,
//! domain tags: if you're hardcoding one of these somewhere else, move it.
//!
//! Two kinds of things live in this module:
//!
//! - **Constants** that are baked into the wire format (hash lengths, domain
//!   separation tags). Changing them invalidates every record ever produced.
//! - **[`TransferConfig`]**, the runtime knobs an operator can turn without
//!   breaking old records: ring size and the minimum number of owner hashes a
//!   view transfer must carry.

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Protocol Version
// ---------------------------------------------------------------------------

/// The full version string of the transfer protocol.
pub const PROTOCOL_VERSION: &str = "0.1.0";

// ---------------------------------------------------------------------------
// Cryptographic Parameters
// ---------------------------------------------------------------------------

/// Content hashes and commitments are BLAKE3. 32 bytes, no exceptions.
pub const PRIMARY_HASH_FUNCTION: &str = "BLAKE3";

/// Hash output length in bytes.
pub const HASH_OUTPUT_LENGTH: usize = 32;

/// Plain signatures are Ed25519 over the record's content hash.
pub const SIGNING_ALGORITHM: &str = "Ed25519";

/// Ring signatures are Schnorr-style SAG over the Ed25519 group, so the same
/// key pair can produce both kinds of signature.
pub const RING_SIGNING_ALGORITHM: &str = "SAG-Ed25519-SHA512";

/// Public key length in bytes (compressed Edwards Y).
pub const PUBLIC_KEY_LENGTH: usize = 32;

/// Secret key length in bytes (Ed25519 seed).
pub const SECRET_KEY_LENGTH: usize = 32;

/// Ed25519 signature length.
pub const SIGNATURE_LENGTH: usize = 64;

/// Domain tag mixed into every ring-signature challenge.
pub const RING_CHALLENGE_DOMAIN_TAG: &[u8] = b"agora-ring-challenge-v1";

// ---------------------------------------------------------------------------
// Ring Parameters
// ---------------------------------------------------------------------------

/// Default number of public keys in a signing ring (one real, ten decoys).
pub const DEFAULT_RING_SIZE: usize = 11;

/// A ring of one is legal. It is also not anonymous; that's the caller's call.
pub const MIN_RING_SIZE: usize = 1;

/// Upper bound on ring size. Signing and verification are linear in ring
/// size and every ring member ends up as an owner hash on the record.
pub const MAX_RING_SIZE: usize = 64;

/// Minimum number of owner hashes a view transfer must name.
pub const DEFAULT_MIN_HASHES_IN_OWNER: usize = 1;

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// Maximum note length in bytes for identity ledger entries.
pub const MAX_NOTE_LENGTH: usize = 512;

// ---------------------------------------------------------------------------
// TransferConfig
// ---------------------------------------------------------------------------

/// Errors produced while loading or validating a [`TransferConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("ring size {got} out of range [{min}, {max}]")]
    RingSizeOutOfRange { got: usize, min: usize, max: usize },

    #[error("min_hashes_in_owner must be at least 1")]
    ZeroMinHashes,

    #[error("min_hashes_in_owner ({min_hashes}) exceeds ring size ({ring_size})")]
    MinHashesExceedRing { min_hashes: usize, ring_size: usize },

    #[error("invalid config document: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Runtime parameters of the transfer orchestrator.
///
/// `ring_size` is the number of public keys in every ring built for a
/// ring-signing operation. `min_hashes_in_owner` is enforced by the view
/// transfer content builder. Since a `receive` derives its owners from a
/// freshly built ring, `min_hashes_in_owner` can never exceed `ring_size`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransferConfig {
    /// Keys per ring (the real one plus decoys).
    pub ring_size: usize,

    /// Minimum length of `new_owner` in a view transfer.
    pub min_hashes_in_owner: usize,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            ring_size: DEFAULT_RING_SIZE,
            min_hashes_in_owner: DEFAULT_MIN_HASHES_IN_OWNER,
        }
    }
}

impl TransferConfig {
    /// Config with a specific ring size and default everything else.
    pub fn with_ring_size(ring_size: usize) -> Self {
        Self {
            ring_size,
            ..Default::default()
        }
    }

    /// Check the parameters against the protocol bounds.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(MIN_RING_SIZE..=MAX_RING_SIZE).contains(&self.ring_size) {
            return Err(ConfigError::RingSizeOutOfRange {
                got: self.ring_size,
                min: MIN_RING_SIZE,
                max: MAX_RING_SIZE,
            });
        }
        if self.min_hashes_in_owner == 0 {
            return Err(ConfigError::ZeroMinHashes);
        }
        if self.min_hashes_in_owner > self.ring_size {
            return Err(ConfigError::MinHashesExceedRing {
                min_hashes: self.min_hashes_in_owner,
                ring_size: self.ring_size,
            });
        }
        Ok(())
    }

    /// Parse and validate a JSON config document. Missing fields take their
    /// defaults.
    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(s)?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = TransferConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.ring_size, DEFAULT_RING_SIZE);
    }

    #[test]
    fn ring_size_bounds_enforced() {
        assert!(matches!(
            TransferConfig::with_ring_size(0).validate(),
            Err(ConfigError::RingSizeOutOfRange { got: 0, .. })
        ));
        assert!(TransferConfig::with_ring_size(MAX_RING_SIZE + 1)
            .validate()
            .is_err());
        assert!(TransferConfig::with_ring_size(1).validate().is_ok());
    }

    #[test]
    fn min_hashes_cannot_exceed_ring() {
        let config = TransferConfig {
            ring_size: 3,
            min_hashes_in_owner: 4,
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::MinHashesExceedRing { .. })
        ));
    }

    #[test]
    fn json_missing_fields_take_defaults() {
        let config = TransferConfig::from_json_str(r#"{ "ring_size": 5 }"#).unwrap();
        assert_eq!(config.ring_size, 5);
        assert_eq!(config.min_hashes_in_owner, DEFAULT_MIN_HASHES_IN_OWNER);
    }

    #[test]
    fn json_invalid_values_rejected() {
        assert!(TransferConfig::from_json_str(r#"{ "ring_size": 0 }"#).is_err());
        assert!(TransferConfig::from_json_str("not json").is_err());
    }

    #[test]
    fn crypto_parameter_sizes() {
        assert_eq!(HASH_OUTPUT_LENGTH, 32);
        assert_eq!(PUBLIC_KEY_LENGTH, 32);
        assert_eq!(SECRET_KEY_LENGTH, 32);
        assert_eq!(SIGNATURE_LENGTH, 64);
    }
}
