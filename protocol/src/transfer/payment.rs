//! Treasury payments.
//!
//! A payment is the non-anonymous path: the shareholder signs with its plain
//! Ed25519 key and the record names the shareholding it came from. Once paid,
//! value is treasury-bound and never moves again through this protocol.

use serde::{Deserialize, Serialize};

use crate::crypto::hash::{blake3_hash, Hash};
use crate::crypto::keys::Signature;
use crate::error::BuilderError;
use crate::identity::ShareHolderPublic;

/// What was paid, and by whom.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentContent {
    hash: Hash,
    shareholder: ShareHolderPublic,
    amount: u64,
}

impl PaymentContent {
    pub fn hash(&self) -> Hash {
        self.hash
    }

    pub fn shareholder(&self) -> &ShareHolderPublic {
        &self.shareholder
    }

    pub fn amount(&self) -> u64 {
        self.amount
    }

    /// `H(shareholder.hash || amount_le)`.
    pub fn compute_hash(&self) -> Hash {
        let mut buf = Vec::with_capacity(40);
        buf.extend_from_slice(self.shareholder.hash().as_bytes());
        buf.extend_from_slice(&self.amount.to_le_bytes());
        Hash::from_array(blake3_hash(&buf))
    }
}

#[derive(Debug, Default)]
pub struct PaymentContentBuilder {
    shareholder: Option<ShareHolderPublic>,
    amount: Option<u64>,
}

impl PaymentContentBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shareholder(mut self, shareholder: ShareHolderPublic) -> Self {
        self.shareholder = Some(shareholder);
        self
    }

    pub fn amount(mut self, amount: u64) -> Self {
        self.amount = Some(amount);
        self
    }

    pub fn build(self) -> Result<PaymentContent, BuilderError> {
        let shareholder = self
            .shareholder
            .ok_or(BuilderError::MissingField("shareholder"))?;
        let amount = self.amount.ok_or(BuilderError::MissingField("amount"))?;

        let mut content = PaymentContent {
            hash: Hash::default(),
            shareholder,
            amount,
        };
        content.hash = content.compute_hash();
        Ok(content)
    }
}

/// A signed payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    hash: Hash,
    content: PaymentContent,
    signature: Signature,
}

impl Payment {
    pub fn hash(&self) -> Hash {
        self.hash
    }

    pub fn content(&self) -> &PaymentContent {
        &self.content
    }

    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    /// The content hash is intact and the signature verifies against the
    /// paying shareholder's key.
    pub fn verify(&self) -> bool {
        let content_hash = self.content.compute_hash();
        content_hash == self.content.hash()
            && self
                .content
                .shareholder()
                .key()
                .verify(content_hash.as_bytes(), &self.signature)
    }
}

#[derive(Debug, Default)]
pub struct PaymentBuilder {
    content: Option<PaymentContent>,
    signature: Option<Signature>,
}

impl PaymentBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn content(mut self, content: PaymentContent) -> Self {
        self.content = Some(content);
        self
    }

    pub fn signature(mut self, signature: Signature) -> Self {
        self.signature = Some(signature);
        self
    }

    pub fn build(self) -> Result<Payment, BuilderError> {
        let content = self.content.ok_or(BuilderError::MissingField("content"))?;
        let signature = self
            .signature
            .ok_or(BuilderError::MissingField("signature"))?;
        let hash = Hash::from_array(blake3_hash(
            &[content.hash().as_bytes().as_slice(), signature.as_bytes()].concat(),
        ));
        Ok(Payment {
            hash,
            content,
            signature,
        })
    }
}
