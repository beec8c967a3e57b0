//! Stage one of a confidential transfer: the ring-signed "send".
//!
//! The public record carries:
//!
//! - `origin`: the sending shareholder's content hash,
//! - `blinded_amount`: `H(seed || amount)`, opaque without the seed,
//! - `owners`: one hash per ring key, never the keys themselves.
//!
//! The ring signature proves one of those owners signed without saying which.

use serde::{Deserialize, Serialize};

use crate::crypto::hash::{blake3_hash, Hash, HashAdapter};
use crate::crypto::ring::owner_hashes;
use crate::crypto::ring_signature::RingSignature;
use crate::error::BuilderError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferContent {
    hash: Hash,
    origin: Hash,
    blinded_amount: Hash,
    owners: Vec<Hash>,
}

impl TransferContent {
    pub fn hash(&self) -> Hash {
        self.hash
    }

    pub fn origin(&self) -> Hash {
        self.origin
    }

    pub fn blinded_amount(&self) -> Hash {
        self.blinded_amount
    }

    pub fn owners(&self) -> &[Hash] {
        &self.owners
    }

    /// `H(origin || blinded_amount || n_owners_le || owners...)`.
    pub fn compute_hash(&self) -> Hash {
        let mut buf = Vec::with_capacity(32 * (2 + self.owners.len()) + 4);
        buf.extend_from_slice(self.origin.as_bytes());
        buf.extend_from_slice(self.blinded_amount.as_bytes());
        buf.extend_from_slice(&(self.owners.len() as u32).to_le_bytes());
        for owner in &self.owners {
            buf.extend_from_slice(owner.as_bytes());
        }
        Hash::from_array(blake3_hash(&buf))
    }
}

#[derive(Debug, Default)]
pub struct TransferContentBuilder {
    origin: Option<Hash>,
    blinded_amount: Option<Hash>,
    owners: Option<Vec<Hash>>,
}

impl TransferContentBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn origin(mut self, origin: Hash) -> Self {
        self.origin = Some(origin);
        self
    }

    pub fn blinded_amount(mut self, blinded_amount: Hash) -> Self {
        self.blinded_amount = Some(blinded_amount);
        self
    }

    pub fn owners(mut self, owners: Vec<Hash>) -> Self {
        self.owners = Some(owners);
        self
    }

    pub fn build(self) -> Result<TransferContent, BuilderError> {
        let origin = self.origin.ok_or(BuilderError::MissingField("origin"))?;
        let blinded_amount = self
            .blinded_amount
            .ok_or(BuilderError::MissingField("blinded_amount"))?;
        let owners = self.owners.ok_or(BuilderError::MissingField("owners"))?;
        if owners.is_empty() {
            return Err(BuilderError::EmptyField("owners"));
        }

        let mut content = TransferContent {
            hash: Hash::default(),
            origin,
            blinded_amount,
            owners,
        };
        content.hash = content.compute_hash();
        Ok(content)
    }
}

/// A ring-signed [`TransferContent`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transfer {
    hash: Hash,
    content: TransferContent,
    signature: RingSignature,
}

impl Transfer {
    pub fn hash(&self) -> Hash {
        self.hash
    }

    pub fn content(&self) -> &TransferContent {
        &self.content
    }

    pub fn signature(&self) -> &RingSignature {
        &self.signature
    }

    /// Checks, in order:
    ///
    /// 1. the content hash matches the content,
    /// 2. `owners[i] == H(ring[i])` for the signature's ring,
    /// 3. the ring signature verifies over the content hash.
    pub fn verify(&self, adapter: &dyn HashAdapter) -> bool {
        let content_hash = self.content.compute_hash();
        content_hash == self.content.hash()
            && owner_hashes(adapter, self.signature.ring()) == self.content.owners()
            && self.signature.verify(content_hash.as_bytes())
    }
}

#[derive(Debug, Default)]
pub struct TransferBuilder {
    content: Option<TransferContent>,
    signature: Option<RingSignature>,
}

impl TransferBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn content(mut self, content: TransferContent) -> Self {
        self.content = Some(content);
        self
    }

    pub fn signature(mut self, signature: RingSignature) -> Self {
        self.signature = Some(signature);
        self
    }

    pub fn build(self) -> Result<Transfer, BuilderError> {
        let content = self.content.ok_or(BuilderError::MissingField("content"))?;
        let signature = self
            .signature
            .ok_or(BuilderError::MissingField("signature"))?;
        let hash = Hash::from_array(blake3_hash(
            &[content.hash().as_bytes().to_vec(), signature.to_bytes()].concat(),
        ));
        Ok(Transfer {
            hash,
            content,
            signature,
        })
    }
}
