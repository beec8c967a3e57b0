//! # Transfer Orchestrator
//!
//! Composes hashing, ring construction, record builders and the external
//! collaborators into the user-facing operations:
//!
//! | Operation         | Records written             | Returns          |
//! |-------------------|-----------------------------|------------------|
//! | [`payment`]       | one `IdentityPayment`       | the entry        |
//! | [`view`]          | none                        | a `ViewSection`  |
//! | [`view_transfer`] | none                        | a `ViewTransfer` |
//! | [`transfer`]      | one `IdentityTransfer`      | the entry        |
//! | [`receive`]       | one `IdentityTransfer`      | the entry        |
//!
//! The orchestrator holds no mutable state. Every call is fail-fast: the
//! first error is returned as-is and nothing is written, because a ledger
//! insert is always the last step.
//!
//! Seeds, confidential amounts and key material never reach the log.
//!
//! [`payment`]: TransferOrchestrator::payment
//! [`view`]: TransferOrchestrator::view
//! [`view_transfer`]: TransferOrchestrator::view_transfer
//! [`transfer`]: TransferOrchestrator::transfer
//! [`receive`]: TransferOrchestrator::receive

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::{ConfigError, TransferConfig};
use crate::crypto::hash::{blind_amount, Blake3Adapter, Hash, HashAdapter};
use crate::crypto::keys::{OsKeyFactory, PrivateKey, PrivateKeyFactory, PublicKey};
use crate::crypto::ring::{build_ring, owner_hashes, RingError};
use crate::crypto::ring_signature::{RingSignature, RingSignatureError};
use crate::error::BuilderError;
use crate::government::{Government, GovernmentRepository, RepositoryError};
use crate::identity::{Identity, IdentityApp, IdentityError, ShareHolder};
use crate::ledger::{
    IdentityPayment, IdentityPaymentBuilder, IdentityPaymentService, IdentityTransfer,
    IdentityTransferBuilder, IdentityTransferService, LedgerError,
};
use crate::transfer::{
    PaymentBuilder, PaymentContentBuilder, TransferBuilder, TransferContentBuilder, ViewSection,
    ViewSectionBuilder, ViewTransfer, ViewTransferBuilder, ViewTransferContentBuilder,
};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Everything an orchestrator call can fail with. Each variant carries the
/// collaborator's own error untouched.
#[derive(Debug, Error)]
pub enum TransactionError {
    #[error(transparent)]
    Government(#[from] RepositoryError),

    #[error(transparent)]
    Identity(#[from] IdentityError),

    #[error(transparent)]
    Builder(#[from] BuilderError),

    #[error(transparent)]
    Ring(#[from] RingError),

    #[error(transparent)]
    Signing(#[from] RingSignatureError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A view section that does not open its commitment or whose transfer
    /// does not verify.
    #[error("view section {0} does not verify")]
    InvalidSection(Hash),
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

pub struct TransferOrchestrator {
    governments: Arc<dyn GovernmentRepository>,
    identities: Arc<dyn IdentityApp>,
    payments: Arc<dyn IdentityPaymentService>,
    transfers: Arc<dyn IdentityTransferService>,
    key_factory: Arc<dyn PrivateKeyFactory>,
    hash_adapter: Arc<dyn HashAdapter>,
    config: TransferConfig,
}

impl std::fmt::Debug for TransferOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransferOrchestrator")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl TransferOrchestrator {
    pub fn builder() -> TransferOrchestratorBuilder {
        TransferOrchestratorBuilder::default()
    }

    pub fn config(&self) -> &TransferConfig {
        &self.config
    }

    /// Pay `amount` into the government's treasury.
    ///
    /// Signs the payment content hash with the shareholder's plain key and
    /// appends the result to the caller's payment ledger.
    pub fn payment(
        &self,
        gov_id: &Uuid,
        amount: u64,
        note: &str,
    ) -> Result<IdentityPayment, TransactionError> {
        let (identity, holder) = self.resolve(gov_id)?;

        let content = PaymentContentBuilder::new()
            .shareholder(holder.public())
            .amount(amount)
            .build()?;
        let signature = holder.sig_pk().sign(content.hash().as_bytes());
        let payment = PaymentBuilder::new()
            .content(content)
            .signature(signature)
            .build()?;
        let entry = IdentityPaymentBuilder::new()
            .payment(payment)
            .note(note)
            .build()?;

        self.payments.insert(&identity.id(), &entry)?;
        info!(
            government = %gov_id,
            identity = %identity.id(),
            entry = %entry.hash(),
            amount,
            "payment recorded"
        );
        Ok(entry)
    }

    /// Build the "send" half of a confidential transfer and its disclosure
    /// package. Nothing is recorded.
    ///
    /// The caller must not reuse `seed` for two transfers from the same
    /// shareholder; identical `(seed, amount)` pairs produce identical
    /// commitments.
    pub fn view(
        &self,
        gov_id: &Uuid,
        amount: u64,
        seed: &str,
    ) -> Result<ViewSection, TransactionError> {
        let (_, holder) = self.resolve(gov_id)?;

        let blinded = blind_amount(self.hash_adapter.as_ref(), seed, amount);
        let key = holder.sig_pk();
        let ring = self.ring_for(&key.public_key())?;
        let owners = owner_hashes(self.hash_adapter.as_ref(), &ring);

        let content = TransferContentBuilder::new()
            .origin(holder.hash())
            .blinded_amount(blinded)
            .owners(owners)
            .build()?;
        debug!(content = %content.hash(), ring = ring.len(), "transfer content built");

        let signature = key.ring_sign(content.hash().as_bytes(), &ring)?;
        let transfer = TransferBuilder::new()
            .content(content)
            .signature(signature)
            .build()?;
        let section = ViewSectionBuilder::new()
            .transfer(transfer)
            .origin(key.public_key())
            .seed(seed)
            .amount(amount)
            .build()?;

        info!(
            government = %gov_id,
            transfer = %section.transfer().hash(),
            ring = self.config.ring_size,
            "view section created"
        );
        Ok(section)
    }

    /// Reassign the value behind `section` to the owner hashes `to`,
    /// ring-signed by the caller's shareholder key. Nothing is recorded.
    pub fn view_transfer(
        &self,
        section: &ViewSection,
        gov_id: &Uuid,
        to: &[Hash],
    ) -> Result<ViewTransfer, TransactionError> {
        let (_, holder) = self.resolve(gov_id)?;
        let key = holder.sig_pk();
        let ring = self.ring_for(&key.public_key())?;
        self.claim(section, to.to_vec(), key, &ring)
    }

    /// [`view`](Self::view) then [`view_transfer`](Self::view_transfer),
    /// recorded in the sender's transfer ledger.
    pub fn transfer(
        &self,
        gov_id: &Uuid,
        amount: u64,
        seed: &str,
        to: &[Hash],
        note: &str,
    ) -> Result<IdentityTransfer, TransactionError> {
        let section = self.view(gov_id, amount, seed)?;
        let view = self.view_transfer(&section, gov_id, to)?;
        let identity = self.identities.retrieve()?;
        let entry = IdentityTransferBuilder::new()
            .transfer(view)
            .note(note)
            .build()?;

        self.transfers.insert(&identity.id(), &entry)?;
        info!(
            government = %gov_id,
            identity = %identity.id(),
            entry = %entry.hash(),
            recipients = to.len(),
            "transfer recorded"
        );
        Ok(entry)
    }

    /// Claim a disclosed transfer with the recipient's own key.
    ///
    /// The new owners are the hashes of a fresh ring around `key`, and the
    /// claim is signed over that same ring, so `new_owner[i] == H(ring[i])`
    /// holds for the recorded claim. Any `to` chosen by the sender plays no
    /// part here, so whoever holds `section` can claim it. Hand sections only
    /// to their recipient.
    pub fn receive(
        &self,
        section: &ViewSection,
        key: &PrivateKey,
        note: &str,
    ) -> Result<IdentityTransfer, TransactionError> {
        let identity = self.identities.retrieve()?;
        let ring = self.ring_for(&key.public_key())?;
        let to = owner_hashes(self.hash_adapter.as_ref(), &ring);

        let view = self.claim(section, to, key, &ring)?;
        let entry = IdentityTransferBuilder::new()
            .transfer(view)
            .note(note)
            .build()?;

        self.transfers.insert(&identity.id(), &entry)?;
        info!(
            identity = %identity.id(),
            section = %section.hash(),
            entry = %entry.hash(),
            "transfer received"
        );
        Ok(entry)
    }

    // -- internals ----------------------------------------------------------

    /// Government, then identity, then the identity's shareholding in it.
    fn resolve(&self, gov_id: &Uuid) -> Result<(Identity, ShareHolder), TransactionError> {
        let government: Government = self.governments.retrieve(gov_id)?;
        let identity = self.identities.retrieve()?;
        let holder = identity.shareholders().fetch(&government)?.clone();
        debug!(government = %government.hash(), shareholder = %holder.hash(), "shareholder resolved");
        Ok((identity, holder))
    }

    fn ring_for(&self, real_key: &PublicKey) -> Result<Vec<PublicKey>, RingError> {
        build_ring(self.key_factory.as_ref(), real_key, self.config.ring_size)
    }

    fn claim(
        &self,
        section: &ViewSection,
        new_owner: Vec<Hash>,
        key: &PrivateKey,
        ring: &[PublicKey],
    ) -> Result<ViewTransfer, TransactionError> {
        if !section.verify(self.hash_adapter.as_ref()) {
            return Err(TransactionError::InvalidSection(section.hash()));
        }

        let content = ViewTransferContentBuilder::with_min_hashes(self.config.min_hashes_in_owner)
            .section(section.clone())
            .new_owner(new_owner)
            .build()?;
        let signature: RingSignature = key.ring_sign(content.hash().as_bytes(), ring)?;
        let view = ViewTransferBuilder::new()
            .content(content)
            .signature(signature)
            .build()?;
        debug!(view = %view.hash(), section = %section.hash(), "view transfer signed");
        Ok(view)
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Wires collaborators into a [`TransferOrchestrator`].
///
/// The four storage/identity collaborators are mandatory. The key factory
/// defaults to [`OsKeyFactory`], the hash adapter to [`Blake3Adapter`] and
/// the config to [`TransferConfig::default`].
#[derive(Default)]
pub struct TransferOrchestratorBuilder {
    governments: Option<Arc<dyn GovernmentRepository>>,
    identities: Option<Arc<dyn IdentityApp>>,
    payments: Option<Arc<dyn IdentityPaymentService>>,
    transfers: Option<Arc<dyn IdentityTransferService>>,
    key_factory: Option<Arc<dyn PrivateKeyFactory>>,
    hash_adapter: Option<Arc<dyn HashAdapter>>,
    config: Option<TransferConfig>,
}

impl TransferOrchestratorBuilder {
    pub fn governments(mut self, repository: Arc<dyn GovernmentRepository>) -> Self {
        self.governments = Some(repository);
        self
    }

    pub fn identities(mut self, app: Arc<dyn IdentityApp>) -> Self {
        self.identities = Some(app);
        self
    }

    pub fn payments(mut self, service: Arc<dyn IdentityPaymentService>) -> Self {
        self.payments = Some(service);
        self
    }

    pub fn transfers(mut self, service: Arc<dyn IdentityTransferService>) -> Self {
        self.transfers = Some(service);
        self
    }

    pub fn key_factory(mut self, factory: Arc<dyn PrivateKeyFactory>) -> Self {
        self.key_factory = Some(factory);
        self
    }

    pub fn hash_adapter(mut self, adapter: Arc<dyn HashAdapter>) -> Self {
        self.hash_adapter = Some(adapter);
        self
    }

    pub fn config(mut self, config: TransferConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn build(self) -> Result<TransferOrchestrator, TransactionError> {
        let config = self.config.unwrap_or_default();
        config.validate()?;

        Ok(TransferOrchestrator {
            governments: self
                .governments
                .ok_or(BuilderError::MissingField("governments"))?,
            identities: self
                .identities
                .ok_or(BuilderError::MissingField("identities"))?,
            payments: self.payments.ok_or(BuilderError::MissingField("payments"))?,
            transfers: self
                .transfers
                .ok_or(BuilderError::MissingField("transfers"))?,
            key_factory: self.key_factory.unwrap_or_else(|| Arc::new(OsKeyFactory)),
            hash_adapter: self.hash_adapter.unwrap_or_else(|| Arc::new(Blake3Adapter)),
            config,
        })
    }
}
