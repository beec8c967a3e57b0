//! Disclosure and claim: [`ViewSection`] and [`ViewTransfer`].
//!
//! A [`ViewSection`] is what a sender hands a recipient out of band. It wraps
//! the stage-one [`Transfer`] together with everything needed to open it: the
//! sender's plain public key, the blinding seed and the clear amount.
//!
//! A [`ViewTransfer`] is stage two. It embeds a section and reassigns the
//! value to a new set of owner hashes under a fresh ring signature.

use serde::{Deserialize, Serialize};

use crate::config::DEFAULT_MIN_HASHES_IN_OWNER;
use crate::crypto::hash::{blake3_hash, blind_amount, Hash, HashAdapter};
use crate::crypto::keys::PublicKey;
use crate::crypto::ring_signature::RingSignature;
use crate::error::BuilderError;

use super::send::Transfer;

// ---------------------------------------------------------------------------
// ViewSection
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewSection {
    hash: Hash,
    transfer: Transfer,
    origin: PublicKey,
    seed: String,
    amount: u64,
}

impl ViewSection {
    pub fn hash(&self) -> Hash {
        self.hash
    }

    pub fn transfer(&self) -> &Transfer {
        &self.transfer
    }

    /// The sender's plain public key.
    pub fn origin(&self) -> &PublicKey {
        &self.origin
    }

    pub fn seed(&self) -> &str {
        &self.seed
    }

    pub fn amount(&self) -> u64 {
        self.amount
    }

    pub fn compute_hash(&self) -> Hash {
        let mut buf = Vec::with_capacity(32 + 32 + 4 + self.seed.len() + 8);
        buf.extend_from_slice(self.transfer.hash().as_bytes());
        buf.extend_from_slice(self.origin.as_bytes());
        buf.extend_from_slice(&(self.seed.len() as u32).to_le_bytes());
        buf.extend_from_slice(self.seed.as_bytes());
        buf.extend_from_slice(&self.amount.to_le_bytes());
        Hash::from_array(blake3_hash(&buf))
    }

    /// Does the seed and amount open the transfer's commitment?
    pub fn opens(&self, adapter: &dyn HashAdapter) -> bool {
        blind_amount(adapter, &self.seed, self.amount) == self.transfer.content().blinded_amount()
    }

    /// A section is valid when:
    ///
    /// - its own hash is intact,
    /// - `seed`/`amount` open the blinded amount,
    /// - the origin key hashes to one of the transfer's owners,
    /// - the wrapped transfer verifies.
    pub fn verify(&self, adapter: &dyn HashAdapter) -> bool {
        let origin_hash = adapter.from_bytes(self.origin.as_bytes());
        self.compute_hash() == self.hash
            && self.opens(adapter)
            && self.transfer.content().owners().contains(&origin_hash)
            && self.transfer.verify(adapter)
    }
}

#[derive(Debug, Default)]
pub struct ViewSectionBuilder {
    transfer: Option<Transfer>,
    origin: Option<PublicKey>,
    seed: Option<String>,
    amount: Option<u64>,
}

impl ViewSectionBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn transfer(mut self, transfer: Transfer) -> Self {
        self.transfer = Some(transfer);
        self
    }

    pub fn origin(mut self, origin: PublicKey) -> Self {
        self.origin = Some(origin);
        self
    }

    pub fn seed(mut self, seed: impl Into<String>) -> Self {
        self.seed = Some(seed.into());
        self
    }

    pub fn amount(mut self, amount: u64) -> Self {
        self.amount = Some(amount);
        self
    }

    pub fn build(self) -> Result<ViewSection, BuilderError> {
        let transfer = self.transfer.ok_or(BuilderError::MissingField("transfer"))?;
        let origin = self.origin.ok_or(BuilderError::MissingField("origin"))?;
        let seed = self.seed.ok_or(BuilderError::MissingField("seed"))?;
        if seed.is_empty() {
            return Err(BuilderError::EmptyField("seed"));
        }
        let amount = self.amount.ok_or(BuilderError::MissingField("amount"))?;

        let mut section = ViewSection {
            hash: Hash::default(),
            transfer,
            origin,
            seed,
            amount,
        };
        section.hash = section.compute_hash();
        Ok(section)
    }
}

// ---------------------------------------------------------------------------
// ViewTransferContent
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewTransferContent {
    hash: Hash,
    section: ViewSection,
    new_owner: Vec<Hash>,
}

impl ViewTransferContent {
    pub fn hash(&self) -> Hash {
        self.hash
    }

    pub fn section(&self) -> &ViewSection {
        &self.section
    }

    pub fn new_owner(&self) -> &[Hash] {
        &self.new_owner
    }

    pub fn compute_hash(&self) -> Hash {
        let mut buf = Vec::with_capacity(32 + 4 + 32 * self.new_owner.len());
        buf.extend_from_slice(self.section.hash().as_bytes());
        buf.extend_from_slice(&(self.new_owner.len() as u32).to_le_bytes());
        for owner in &self.new_owner {
            buf.extend_from_slice(owner.as_bytes());
        }
        Hash::from_array(blake3_hash(&buf))
    }
}

/// Builds a [`ViewTransferContent`], requiring at least `min_hashes` new
/// owners.
#[derive(Debug)]
pub struct ViewTransferContentBuilder {
    min_hashes: usize,
    section: Option<ViewSection>,
    new_owner: Option<Vec<Hash>>,
}

impl Default for ViewTransferContentBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ViewTransferContentBuilder {
    pub fn new() -> Self {
        Self::with_min_hashes(DEFAULT_MIN_HASHES_IN_OWNER)
    }

    pub fn with_min_hashes(min_hashes: usize) -> Self {
        Self {
            min_hashes,
            section: None,
            new_owner: None,
        }
    }

    pub fn section(mut self, section: ViewSection) -> Self {
        self.section = Some(section);
        self
    }

    pub fn new_owner(mut self, new_owner: Vec<Hash>) -> Self {
        self.new_owner = Some(new_owner);
        self
    }

    pub fn build(self) -> Result<ViewTransferContent, BuilderError> {
        let section = self.section.ok_or(BuilderError::MissingField("section"))?;
        let new_owner = self
            .new_owner
            .ok_or(BuilderError::MissingField("new_owner"))?;
        if new_owner.is_empty() {
            return Err(BuilderError::EmptyField("new_owner"));
        }
        if new_owner.len() < self.min_hashes {
            return Err(BuilderError::TooFewOwners {
                min: self.min_hashes,
                got: new_owner.len(),
            });
        }

        let mut content = ViewTransferContent {
            hash: Hash::default(),
            section,
            new_owner,
        };
        content.hash = content.compute_hash();
        Ok(content)
    }
}

// ---------------------------------------------------------------------------
// ViewTransfer
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewTransfer {
    hash: Hash,
    content: ViewTransferContent,
    signature: RingSignature,
}

impl ViewTransfer {
    pub fn hash(&self) -> Hash {
        self.hash
    }

    pub fn content(&self) -> &ViewTransferContent {
        &self.content
    }

    pub fn signature(&self) -> &RingSignature {
        &self.signature
    }

    /// Valid iff the content hash is intact, the embedded section is valid
    /// and the claim's own ring signature verifies.
    ///
    /// `new_owner` is not tied to the signing ring: a sender may reassign to
    /// hashes of keys it has never seen.
    pub fn verify(&self, adapter: &dyn HashAdapter) -> bool {
        let content_hash = self.content.compute_hash();
        content_hash == self.content.hash()
            && self.content.section().verify(adapter)
            && self.signature.verify(content_hash.as_bytes())
    }
}

#[derive(Debug, Default)]
pub struct ViewTransferBuilder {
    content: Option<ViewTransferContent>,
    signature: Option<RingSignature>,
}

impl ViewTransferBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn content(mut self, content: ViewTransferContent) -> Self {
        self.content = Some(content);
        self
    }

    pub fn signature(mut self, signature: RingSignature) -> Self {
        self.signature = Some(signature);
        self
    }

    pub fn build(self) -> Result<ViewTransfer, BuilderError> {
        let content = self.content.ok_or(BuilderError::MissingField("content"))?;
        let signature = self
            .signature
            .ok_or(BuilderError::MissingField("signature"))?;
        let hash = Hash::from_array(blake3_hash(
            &[content.hash().as_bytes().to_vec(), signature.to_bytes()].concat(),
        ));
        Ok(ViewTransfer {
            hash,
            content,
            signature,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::hash::Blake3Adapter;
    use crate::crypto::keys::{OsKeyFactory, PrivateKey};
    use crate::crypto::ring::{build_ring, owner_hashes};
    use crate::transfer::send::{TransferBuilder, TransferContentBuilder};

    fn section(key: &PrivateKey, seed: &str, amount: u64) -> ViewSection {
        let ring = build_ring(&OsKeyFactory, &key.public_key(), 4).unwrap();
        let content = TransferContentBuilder::new()
            .origin(Hash::from_array([3; 32]))
            .blinded_amount(blind_amount(&Blake3Adapter, seed, amount))
            .owners(owner_hashes(&Blake3Adapter, &ring))
            .build()
            .unwrap();
        let signature = key.ring_sign(content.hash().as_bytes(), &ring).unwrap();
        let transfer = TransferBuilder::new()
            .content(content)
            .signature(signature)
            .build()
            .unwrap();
        ViewSectionBuilder::new()
            .transfer(transfer)
            .origin(key.public_key())
            .seed(seed)
            .amount(amount)
            .build()
            .unwrap()
    }

    #[test]
    fn section_opens_commitment() {
        let key = PrivateKey::generate();
        let section = section(&key, "s1", 50);
        assert!(section.opens(&Blake3Adapter));
        assert!(section.verify(&Blake3Adapter));
    }

    #[test]
    fn section_with_wrong_amount_does_not_verify() {
        let key = PrivateKey::generate();
        let good = section(&key, "s1", 50);
        let forged = ViewSectionBuilder::new()
            .transfer(good.transfer().clone())
            .origin(key.public_key())
            .seed("s1")
            .amount(51)
            .build()
            .unwrap();
        assert!(!forged.opens(&Blake3Adapter));
        assert!(!forged.verify(&Blake3Adapter));
    }

    #[test]
    fn section_with_foreign_origin_does_not_verify() {
        let key = PrivateKey::generate();
        let good = section(&key, "s1", 50);
        let forged = ViewSectionBuilder::new()
            .transfer(good.transfer().clone())
            .origin(PrivateKey::generate().public_key())
            .seed("s1")
            .amount(50)
            .build()
            .unwrap();
        assert!(forged.opens(&Blake3Adapter));
        assert!(!forged.verify(&Blake3Adapter));
    }

    #[test]
    fn empty_seed_rejected() {
        let key = PrivateKey::generate();
        let good = section(&key, "s1", 50);
        let err = ViewSectionBuilder::new()
            .transfer(good.transfer().clone())
            .origin(key.public_key())
            .seed("")
            .amount(50)
            .build()
            .unwrap_err();
        assert_eq!(err, BuilderError::EmptyField("seed"));
    }

    #[test]
    fn missing_amount_rejected() {
        let key = PrivateKey::generate();
        let good = section(&key, "s1", 50);
        let err = ViewSectionBuilder::new()
            .transfer(good.transfer().clone())
            .origin(key.public_key())
            .seed("s1")
            .build()
            .unwrap_err();
        assert_eq!(err, BuilderError::MissingField("amount"));
    }

    #[test]
    fn content_enforces_min_hashes() {
        let key = PrivateKey::generate();
        let err = ViewTransferContentBuilder::with_min_hashes(3)
            .section(section(&key, "s1", 50))
            .new_owner(vec![Hash::default(); 2])
            .build()
            .unwrap_err();
        assert_eq!(err, BuilderError::TooFewOwners { min: 3, got: 2 });

        let err = ViewTransferContentBuilder::new()
            .section(section(&key, "s1", 50))
            .new_owner(vec![])
            .build()
            .unwrap_err();
        assert_eq!(err, BuilderError::EmptyField("new_owner"));
    }

    #[test]
    fn view_transfer_verifies_with_chained_section() {
        let sender = PrivateKey::generate();
        let section = section(&sender, "s1", 50);
        let to = vec![Hash::from_array([1; 32]), Hash::from_array([2; 32])];
        let content = ViewTransferContentBuilder::new()
            .section(section.clone())
            .new_owner(to.clone())
            .build()
            .unwrap();

        let ring = build_ring(&OsKeyFactory, &sender.public_key(), 4).unwrap();
        let signature = sender.ring_sign(content.hash().as_bytes(), &ring).unwrap();
        let claim = ViewTransferBuilder::new()
            .content(content)
            .signature(signature)
            .build()
            .unwrap();

        assert!(claim.verify(&Blake3Adapter));
        assert_eq!(claim.content().section(), &section);
        assert_eq!(claim.content().new_owner(), to.as_slice());
    }

    #[test]
    fn view_transfer_over_invalid_section_fails() {
        let sender = PrivateKey::generate();
        let good = section(&sender, "s1", 50);
        let forged = ViewSectionBuilder::new()
            .transfer(good.transfer().clone())
            .origin(sender.public_key())
            .seed("s2")
            .amount(50)
            .build()
            .unwrap();
        let content = ViewTransferContentBuilder::new()
            .section(forged)
            .new_owner(vec![Hash::default()])
            .build()
            .unwrap();
        let ring = vec![sender.public_key()];
        let signature = sender.ring_sign(content.hash().as_bytes(), &ring).unwrap();
        let claim = ViewTransferBuilder::new()
            .content(content)
            .signature(signature)
            .build()
            .unwrap();
        assert!(!claim.verify(&Blake3Adapter));
    }
}
