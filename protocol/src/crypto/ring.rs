//! Ring construction: one real key, `size - 1` freshly minted decoys.
//!
//! The real key lands at a uniformly random index. Always putting it first
//! (or last) would make the ring signature's anonymity decorative.

use rand::rngs::OsRng;
use rand::Rng;
use thiserror::Error;

use super::hash::{Hash, HashAdapter};
use super::keys::{PrivateKeyFactory, PublicKey};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RingError {
    #[error("invalid ring size {0}: a ring needs at least one key")]
    InvalidRingSize(usize),
}

/// Build a ring of `size` public keys containing `real_key` exactly once.
pub fn build_ring(
    factory: &dyn PrivateKeyFactory,
    real_key: &PublicKey,
    size: usize,
) -> Result<Vec<PublicKey>, RingError> {
    if size < 1 {
        return Err(RingError::InvalidRingSize(size));
    }

    let real_index = OsRng.gen_range(0..size);
    let mut ring = Vec::with_capacity(size);
    for i in 0..size {
        if i == real_index {
            ring.push(*real_key);
        } else {
            ring.push(factory.create().public_key());
        }
    }
    Ok(ring)
}

/// Owner hashes of a ring: `[H(pk) for pk in ring]`, same order.
///
/// These go on the public record in place of the keys themselves.
pub fn owner_hashes(adapter: &dyn HashAdapter, ring: &[PublicKey]) -> Vec<Hash> {
    ring.iter()
        .map(|pk| adapter.from_bytes(pk.as_bytes()))
        .collect()
}
