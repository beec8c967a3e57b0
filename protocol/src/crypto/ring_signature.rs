//! # Ring Signatures
//!
//! Spontaneous anonymous group (SAG) signatures over the Ed25519 group.
//! A ring signature proves "one of these `n` public keys signed this
//! message" without saying which one.
//!
//! ## Construction
//!
//! For a ring `P_0 .. P_{n-1}`, signer index `π` with secret `x` (`P_π = xB`):
//!
//! ```text
//! α            <- random
//! c_{π+1}      =  H(ring, m, αB)
//! for i = π+1 .. π-1 (mod n):
//!     s_i      <- random
//!     c_{i+1}  =  H(ring, m, s_i B + c_i P_i)
//! s_π          =  α - c_π x
//! σ            =  (c_0, s_0 .. s_{n-1})
//! ```
//!
//! Verification recomputes every `c_{i+1}` from `(s_i, c_i)` starting at
//! `c_0` and accepts iff the loop closes back to `c_0`.
//!
//! `H` is SHA-512 reduced mod ℓ, prefixed with a domain tag and the full ring
//! so a signature can't be replayed under a different ring.
//!
//! The signature is **not linkable**: two signatures by the same key look
//! unrelated. Double-spend detection is out of scope here.

use curve25519_dalek::edwards::EdwardsPoint;
use curve25519_dalek::scalar::Scalar;
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha512};
use thiserror::Error;

use crate::config::RING_CHALLENGE_DOMAIN_TAG;

use super::keys::{KeyError, PrivateKey, PublicKey};

/// Errors from ring signing and ring-signature parsing.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RingSignatureError {
    /// The signer's own public key is not a member of the ring.
    #[error("invalid ring: signer's public key is not a ring member")]
    InvalidRing,

    #[error("ring must contain at least one public key")]
    EmptyRing,

    #[error("ring contains an invalid public key")]
    InvalidPublicKey(#[from] KeyError),

    /// Response count doesn't match the ring, or a scalar isn't canonical.
    #[error("malformed ring signature")]
    MalformedSignature,

    #[error("ring signature does not verify")]
    VerificationFailed,
}

/// A ring signature together with the ring it was produced over.
///
/// Scalars are stored as canonical 32-byte encodings so the struct
/// serializes without pulling curve types into the wire format.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RingSignature {
    ring: Vec<PublicKey>,
    challenge: [u8; 32],
    responses: Vec<[u8; 32]>,
}

impl RingSignature {
    /// The ring of public keys this signature was produced over.
    pub fn ring(&self) -> &[PublicKey] {
        &self.ring
    }

    /// Canonical bytes, used when a record's hash has to cover its signature.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(32 * (2 * self.ring.len() + 1) + 4);
        buf.extend_from_slice(&(self.ring.len() as u32).to_le_bytes());
        for pk in &self.ring {
            buf.extend_from_slice(pk.as_bytes());
        }
        buf.extend_from_slice(&self.challenge);
        for s in &self.responses {
            buf.extend_from_slice(s);
        }
        buf
    }

    /// Verify against `message` over the embedded ring.
    pub fn verify(&self, message: &[u8]) -> bool {
        self.check(message).is_ok()
    }

    /// Like [`verify`](Self::verify) but tells you why it failed.
    pub fn check(&self, message: &[u8]) -> Result<(), RingSignatureError> {
        if self.ring.is_empty() {
            return Err(RingSignatureError::EmptyRing);
        }
        if self.responses.len() != self.ring.len() {
            return Err(RingSignatureError::MalformedSignature);
        }

        let points = decompress_ring(&self.ring)?;
        let c_zero = parse_scalar(&self.challenge)?;
        let prefix = challenge_prefix(&self.ring, message);

        let mut c = c_zero;
        for (point, s_bytes) in points.iter().zip(&self.responses) {
            let s = parse_scalar(s_bytes)?;
            let l = EdwardsPoint::mul_base(&s) + point * c;
            c = round_challenge(&prefix, &l);
        }

        if c == c_zero {
            Ok(())
        } else {
            Err(RingSignatureError::VerificationFailed)
        }
    }
}

impl std::fmt::Debug for RingSignature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "RingSignature(n={}, c0={}..)",
            self.ring.len(),
            &hex::encode(self.challenge)[..8]
        )
    }
}

/// Ring-sign `message` with `key` over `ring`.
///
/// Fails with [`RingSignatureError::InvalidRing`] if `key`'s public key is
/// not in `ring`. If it appears more than once, the first occurrence is used.
pub fn sign(
    message: &[u8],
    ring: &[PublicKey],
    key: &PrivateKey,
) -> Result<RingSignature, RingSignatureError> {
    if ring.is_empty() {
        return Err(RingSignatureError::EmptyRing);
    }
    let signer = key.public_key();
    let real_index = ring
        .iter()
        .position(|pk| *pk == signer)
        .ok_or(RingSignatureError::InvalidRing)?;

    let points = decompress_ring(ring)?;
    let prefix = challenge_prefix(ring, message);
    let n = ring.len();

    let mut challenges = vec![Scalar::ZERO; n];
    let mut responses = vec![Scalar::ZERO; n];

    let alpha = random_scalar();
    challenges[(real_index + 1) % n] = round_challenge(&prefix, &EdwardsPoint::mul_base(&alpha));

    let mut i = (real_index + 1) % n;
    while i != real_index {
        responses[i] = random_scalar();
        let l = EdwardsPoint::mul_base(&responses[i]) + points[i] * challenges[i];
        challenges[(i + 1) % n] = round_challenge(&prefix, &l);
        i = (i + 1) % n;
    }

    responses[real_index] = alpha - challenges[real_index] * key.secret_scalar();

    Ok(RingSignature {
        ring: ring.to_vec(),
        challenge: challenges[0].to_bytes(),
        responses: responses.iter().map(Scalar::to_bytes).collect(),
    })
}

/// Verify `signature` over `message` and check it was made over exactly
/// `ring`.
pub fn verify(message: &[u8], ring: &[PublicKey], signature: &RingSignature) -> bool {
    signature.ring == ring && signature.verify(message)
}

fn decompress_ring(ring: &[PublicKey]) -> Result<Vec<EdwardsPoint>, RingSignatureError> {
    ring.iter()
        .map(|pk| pk.to_point().map_err(RingSignatureError::from))
        .collect()
}

fn parse_scalar(bytes: &[u8; 32]) -> Result<Scalar, RingSignatureError> {
    Option::<Scalar>::from(Scalar::from_canonical_bytes(*bytes))
        .ok_or(RingSignatureError::MalformedSignature)
}

fn random_scalar() -> Scalar {
    let mut wide = [0u8; 64];
    OsRng.fill_bytes(&mut wide);
    Scalar::from_bytes_mod_order_wide(&wide)
}

/// Hash state after absorbing the domain tag, the ring and the message.
/// Cloned once per round.
fn challenge_prefix(ring: &[PublicKey], message: &[u8]) -> Sha512 {
    let mut hasher = Sha512::new();
    hasher.update(RING_CHALLENGE_DOMAIN_TAG);
    hasher.update((ring.len() as u32).to_le_bytes());
    for pk in ring {
        hasher.update(pk.as_bytes());
    }
    hasher.update((message.len() as u64).to_le_bytes());
    hasher.update(message);
    hasher
}

fn round_challenge(prefix: &Sha512, l: &EdwardsPoint) -> Scalar {
    let mut hasher = prefix.clone();
    hasher.update(l.compress().as_bytes());
    let mut wide = [0u8; 64];
    wide.copy_from_slice(&hasher.finalize());
    Scalar::from_bytes_mod_order_wide(&wide)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ring_with(signer: &PrivateKey, size: usize, position: usize) -> Vec<PublicKey> {
        let mut ring: Vec<PublicKey> = (0..size - 1)
            .map(|_| PrivateKey::generate().public_key())
            .collect();
        ring.insert(position, signer.public_key());
        ring
    }

    #[test]
    fn sign_and_verify_at_every_position() {
        let key = PrivateKey::generate();
        for position in 0..5 {
            let ring = ring_with(&key, 5, position);
            let sig = key.ring_sign(b"content hash", &ring).unwrap();
            assert!(sig.verify(b"content hash"), "position {position}");
            assert!(verify(b"content hash", &ring, &sig));
        }
    }

    #[test]
    fn ring_of_one_works() {
        let key = PrivateKey::generate();
        let ring = vec![key.public_key()];
        let sig = key.ring_sign(b"alone", &ring).unwrap();
        assert!(sig.verify(b"alone"));
    }

    #[test]
    fn signer_outside_ring_is_rejected() {
        let key = PrivateKey::generate();
        let ring: Vec<PublicKey> = (0..3).map(|_| PrivateKey::generate().public_key()).collect();
        assert_eq!(
            key.ring_sign(b"msg", &ring).unwrap_err(),
            RingSignatureError::InvalidRing
        );
    }

    #[test]
    fn empty_ring_is_rejected() {
        let key = PrivateKey::generate();
        assert_eq!(
            key.ring_sign(b"msg", &[]).unwrap_err(),
            RingSignatureError::EmptyRing
        );
    }

    #[test]
    fn wrong_message_fails() {
        let key = PrivateKey::generate();
        let ring = ring_with(&key, 4, 2);
        let sig = key.ring_sign(b"original", &ring).unwrap();
        assert_eq!(
            sig.check(b"tampered"),
            Err(RingSignatureError::VerificationFailed)
        );
    }

    #[test]
    fn different_ring_fails() {
        let key = PrivateKey::generate();
        let ring = ring_with(&key, 4, 1);
        let sig = key.ring_sign(b"msg", &ring).unwrap();

        let other = ring_with(&key, 4, 1);
        assert!(!verify(b"msg", &other, &sig));

        let mut swapped = sig.clone();
        swapped.ring.swap(0, 3);
        assert!(!swapped.verify(b"msg"));
    }

    #[test]
    fn truncated_responses_are_malformed() {
        let key = PrivateKey::generate();
        let ring = ring_with(&key, 3, 0);
        let mut sig = key.ring_sign(b"msg", &ring).unwrap();
        sig.responses.pop();
        assert_eq!(
            sig.check(b"msg"),
            Err(RingSignatureError::MalformedSignature)
        );
    }

    #[test]
    fn signatures_are_randomized() {
        // Same key, same ring, same message: the nonces differ, so the
        // signatures must too.
        let key = PrivateKey::generate();
        let ring = ring_with(&key, 3, 1);
        let a = key.ring_sign(b"msg", &ring).unwrap();
        let b = key.ring_sign(b"msg", &ring).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn serde_roundtrip_still_verifies() {
        let key = PrivateKey::generate();
        let ring = ring_with(&key, 3, 2);
        let sig = key.ring_sign(b"msg", &ring).unwrap();
        let json = serde_json::to_string(&sig).unwrap();
        let back: RingSignature = serde_json::from_str(&json).unwrap();
        assert!(back.verify(b"msg"));
    }
}
