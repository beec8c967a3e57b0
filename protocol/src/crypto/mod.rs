//! # Cryptographic Primitives
//!
//! Everything security-relevant in Agora flows through here:
//!
//! - **BLAKE3** for content addressing and amount blinding ([`hash`]).
//! - **Ed25519** for plain signatures on payments ([`keys`]).
//! - **SAG ring signatures** over the same curve for transfers
//!   ([`ring_signature`]), so one shareholder key serves both.
//! - **Ring construction** with decoys from a key factory ([`ring`]).
//!
//! These are thin, typed wrappers around `ed25519-dalek`, `curve25519-dalek`,
//! `sha2` and `blake3`. The only protocol logic here is the ring loop.

pub mod hash;
pub mod keys;
pub mod ring;
pub mod ring_signature;

pub use hash::{blind_amount, Blake3Adapter, Hash, HashAdapter};
pub use keys::{KeyError, OsKeyFactory, PrivateKey, PrivateKeyFactory, PublicKey, Signature};
pub use ring::{build_ring, owner_hashes, RingError};
pub use ring_signature::{RingSignature, RingSignatureError};
