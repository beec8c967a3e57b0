//! # Key Management
//!
//! Ed25519 key pairs for shareholders, and the factory that mints decoys.
//!
//! A single [`PrivateKey`] does double duty:
//!
//! - **Plain signing** (payments) is textbook Ed25519 via `ed25519-dalek`.
//! - **Ring signing** (transfers) needs the raw secret scalar and the public
//!   key as a curve point. We derive the scalar the same way RFC 8032 does
//!   (SHA-512 of the seed, clamp the lower half) so the ring-signing public
//!   key is byte-for-byte the Ed25519 verifying key. One key, one identity,
//!   two signature schemes.
//!
//! ## Security considerations
//!
//! - Secret keys are generated from `OsRng`.
//! - `PrivateKey` does not implement `Serialize`. Exporting secret material
//!   goes through [`PrivateKey::to_hex`] on purpose.
//! - Key bytes are never logged. `Debug` prints the public half only.

use curve25519_dalek::edwards::{CompressedEdwardsY, EdwardsPoint};
use curve25519_dalek::scalar::Scalar;
use ed25519_dalek::{Signature as DalekSignature, Signer, SigningKey, Verifier, VerifyingKey};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha512};
use std::fmt;
use thiserror::Error;

use crate::config::{PUBLIC_KEY_LENGTH, SECRET_KEY_LENGTH, SIGNATURE_LENGTH};

use super::ring_signature::{self, RingSignature, RingSignatureError};

/// Errors that can occur during key operations.
///
/// These are intentionally vague about *why* something failed.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum KeyError {
    #[error("invalid secret key bytes")]
    InvalidSecretKey,

    #[error("invalid public key bytes: not a valid Ed25519 point")]
    InvalidPublicKey,
}

// ---------------------------------------------------------------------------
// PrivateKey
// ---------------------------------------------------------------------------

/// A shareholder's signing key pair.
///
/// # Examples
///
/// ```
/// use agora_protocol::crypto::keys::PrivateKey;
///
/// let pk = PrivateKey::generate();
/// let sig = pk.sign(b"pay the treasury");
/// assert!(pk.public_key().verify(b"pay the treasury", &sig));
/// ```
pub struct PrivateKey {
    signing_key: SigningKey,
}

impl PrivateKey {
    /// Generate a fresh key pair from the OS RNG.
    pub fn generate() -> Self {
        Self {
            signing_key: SigningKey::generate(&mut OsRng),
        }
    }

    /// Deterministic key pair from a 32-byte seed. Tests and fixtures only;
    /// a weak seed is a weak key.
    pub fn from_seed(seed: &[u8; SECRET_KEY_LENGTH]) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(seed),
        }
    }

    /// Parse a hex-encoded 32-byte seed.
    pub fn from_hex(hex_str: &str) -> Result<Self, KeyError> {
        let bytes = hex::decode(hex_str).map_err(|_| KeyError::InvalidSecretKey)?;
        let seed: [u8; SECRET_KEY_LENGTH] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| KeyError::InvalidSecretKey)?;
        Ok(Self::from_seed(&seed))
    }

    /// Export the seed as hex. Handle with care.
    pub fn to_hex(&self) -> String {
        hex::encode(self.signing_key.to_bytes())
    }

    /// The public half of this key pair.
    pub fn public_key(&self) -> PublicKey {
        PublicKey {
            bytes: self.signing_key.verifying_key().to_bytes(),
        }
    }

    /// Plain Ed25519 signature over `message`.
    pub fn sign(&self, message: &[u8]) -> Signature {
        Signature {
            bytes: self.signing_key.sign(message).to_bytes().to_vec(),
        }
    }

    /// Ring-sign `message` over `ring`.
    ///
    /// The ring must contain this key's own public key, otherwise the
    /// signature would prove nothing and we refuse with
    /// [`RingSignatureError::InvalidRing`].
    pub fn ring_sign(
        &self,
        message: &[u8],
        ring: &[PublicKey],
    ) -> Result<RingSignature, RingSignatureError> {
        ring_signature::sign(message, ring, self)
    }

    /// The secret scalar `a` with `A = a * B`, derived per RFC 8032.
    pub(crate) fn secret_scalar(&self) -> Scalar {
        let digest = Sha512::digest(self.signing_key.to_bytes());
        let mut lower = [0u8; 32];
        lower.copy_from_slice(&digest[..32]);
        lower[0] &= 248;
        lower[31] &= 127;
        lower[31] |= 64;
        Scalar::from_bytes_mod_order(lower)
    }
}

impl Clone for PrivateKey {
    fn clone(&self) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(&self.signing_key.to_bytes()),
        }
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PrivateKey(pub={})", self.public_key().to_hex())
    }
}

impl PartialEq for PrivateKey {
    /// Compares public keys, never secret material.
    fn eq(&self, other: &Self) -> bool {
        self.public_key() == other.public_key()
    }
}

impl Eq for PrivateKey {}

// ---------------------------------------------------------------------------
// PrivateKeyFactory
// ---------------------------------------------------------------------------

/// Source of fresh, independently random key pairs. Rings are padded with
/// the public halves of these.
pub trait PrivateKeyFactory: Send + Sync {
    fn create(&self) -> PrivateKey;
}

/// [`PrivateKeyFactory`] backed by the OS CSPRNG.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsKeyFactory;

impl PrivateKeyFactory for OsKeyFactory {
    fn create(&self) -> PrivateKey {
        PrivateKey::generate()
    }
}

// ---------------------------------------------------------------------------
// PublicKey
// ---------------------------------------------------------------------------

/// A public key. Safe to share, safe to log, and (as an owner hash) safe to
/// put on the record.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PublicKey {
    bytes: [u8; PUBLIC_KEY_LENGTH],
}

impl PublicKey {
    /// Validate and wrap 32 bytes. Rejects bytes that don't decompress to a
    /// curve point.
    pub fn from_bytes(bytes: [u8; PUBLIC_KEY_LENGTH]) -> Result<Self, KeyError> {
        VerifyingKey::from_bytes(&bytes).map_err(|_| KeyError::InvalidPublicKey)?;
        Ok(Self { bytes })
    }

    /// Parse a hex-encoded public key.
    pub fn from_hex(s: &str) -> Result<Self, KeyError> {
        let bytes = hex::decode(s).map_err(|_| KeyError::InvalidPublicKey)?;
        let arr: [u8; PUBLIC_KEY_LENGTH] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| KeyError::InvalidPublicKey)?;
        Self::from_bytes(arr)
    }

    pub fn as_bytes(&self) -> &[u8; PUBLIC_KEY_LENGTH] {
        &self.bytes
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.bytes)
    }

    /// Base58 form, for display in the CLI.
    pub fn to_base58(&self) -> String {
        bs58::encode(self.bytes).into_string()
    }

    /// Verify a plain Ed25519 signature. A boolean, not a `Result`: callers
    /// want yes or no.
    pub fn verify(&self, message: &[u8], signature: &Signature) -> bool {
        let Ok(verifying_key) = VerifyingKey::from_bytes(&self.bytes) else {
            return false;
        };
        let Some(dalek_sig) = signature.to_dalek_signature() else {
            return false;
        };
        verifying_key.verify(message, &dalek_sig).is_ok()
    }

    /// Decompress to an Edwards point for ring arithmetic.
    pub(crate) fn to_point(&self) -> Result<EdwardsPoint, KeyError> {
        CompressedEdwardsY(self.bytes)
            .decompress()
            .ok_or(KeyError::InvalidPublicKey)
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({})", &self.to_hex()[..16])
    }
}

// ---------------------------------------------------------------------------
// Signature
// ---------------------------------------------------------------------------

/// A plain Ed25519 signature. Always 64 bytes when produced by us; anything
/// else simply fails verification.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    bytes: Vec<u8>,
}

impl Signature {
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn to_hex(&self) -> String {
        hex::encode(&self.bytes)
    }

    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        let bytes = hex::decode(s)?;
        if bytes.len() != SIGNATURE_LENGTH {
            return Err(hex::FromHexError::InvalidStringLength);
        }
        Ok(Self { bytes })
    }

    fn to_dalek_signature(&self) -> Option<DalekSignature> {
        let arr: [u8; SIGNATURE_LENGTH] = self.bytes.as_slice().try_into().ok()?;
        Some(DalekSignature::from_bytes(&arr))
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hex_str = self.to_hex();
        if hex_str.len() >= 128 {
            write!(f, "Signature({}...{})", &hex_str[..8], &hex_str[120..])
        } else {
            write!(f, "Signature({})", hex_str)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_verify_roundtrip() {
        let pk = PrivateKey::generate();
        let sig = pk.sign(b"dues");
        assert!(pk.public_key().verify(b"dues", &sig));
    }

    #[test]
    fn wrong_key_fails_verification() {
        let a = PrivateKey::generate();
        let b = PrivateKey::generate();
        let sig = a.sign(b"message");
        assert!(!b.public_key().verify(b"message", &sig));
    }

    #[test]
    fn secret_scalar_matches_verifying_key() {
        // The ring-signing key must be the same point as the Ed25519 key,
        // otherwise a shareholder would have two identities.
        let pk = PrivateKey::generate();
        let derived = EdwardsPoint::mul_base(&pk.secret_scalar()).compress();
        assert_eq!(derived.to_bytes(), *pk.public_key().as_bytes());
    }

    #[test]
    fn hex_roundtrip_preserves_identity() {
        let pk = PrivateKey::generate();
        let restored = PrivateKey::from_hex(&pk.to_hex()).unwrap();
        assert_eq!(pk, restored);

        let public = pk.public_key();
        assert_eq!(PublicKey::from_hex(&public.to_hex()).unwrap(), public);
    }

    #[test]
    fn invalid_hex_rejected() {
        assert_eq!(
            PrivateKey::from_hex("deadbeef").unwrap_err(),
            KeyError::InvalidSecretKey
        );
        assert!(PublicKey::from_hex("not-hex").is_err());
    }

    #[test]
    fn factory_keys_are_distinct() {
        let factory = OsKeyFactory;
        assert_ne!(factory.create().public_key(), factory.create().public_key());
    }

    #[test]
    fn debug_does_not_leak_secret() {
        let pk = PrivateKey::generate();
        let debug_str = format!("{:?}", pk);
        assert!(debug_str.starts_with("PrivateKey(pub="));
        assert!(!debug_str.contains(&pk.to_hex()));
    }

    #[test]
    fn deterministic_from_seed() {
        let a = PrivateKey::from_seed(&[7u8; 32]);
        let b = PrivateKey::from_seed(&[7u8; 32]);
        assert_eq!(a.public_key(), b.public_key());
        assert_eq!(a.sign(b"x"), b.sign(b"x"));
    }
}
