//! Identity ledgers: what a participant has paid and transferred.
//!
//! These are the participant's own books, not the public record. Each entry
//! wraps a finalized record with a free-form note and a timestamp, and is
//! content-addressed like everything else.
//!
//! Records are deterministic (Ed25519 signing is), so two identical payments
//! can share a record hash. Every entry therefore carries its own random `id`,
//! and the entry hash covers it.
//!
//! Storage sits behind [`IdentityPaymentService`] and
//! [`IdentityTransferService`]. Implementations must serialize concurrent
//! inserts for the same identity; see [`crate::storage`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::config::MAX_NOTE_LENGTH;
use crate::crypto::hash::{blake3_hash, Hash};
use crate::error::BuilderError;
use crate::transfer::{Payment, ViewTransfer};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("storage error: {0}")]
    Storage(String),

    /// The same entry was inserted twice for one identity.
    #[error("duplicate ledger entry {0}")]
    Duplicate(Hash),
}

fn check_note(note: &str) -> Result<(), BuilderError> {
    if note.len() > MAX_NOTE_LENGTH {
        return Err(BuilderError::InvalidField {
            field: "note",
            reason: format!("{} bytes exceeds the {MAX_NOTE_LENGTH}-byte limit", note.len()),
        });
    }
    Ok(())
}

fn entry_hash(id: &Uuid, record: &Hash, note: &str, created_on: &DateTime<Utc>) -> Hash {
    let mut buf = Vec::with_capacity(16 + 32 + 4 + note.len() + 8);
    buf.extend_from_slice(id.as_bytes());
    buf.extend_from_slice(record.as_bytes());
    buf.extend_from_slice(&(note.len() as u32).to_le_bytes());
    buf.extend_from_slice(note.as_bytes());
    buf.extend_from_slice(&created_on.timestamp_millis().to_le_bytes());
    Hash::from_array(blake3_hash(&buf))
}

fn now_millis() -> DateTime<Utc> {
    // Truncated so the hash survives a serde round trip.
    let now = Utc::now();
    DateTime::<Utc>::from_timestamp_millis(now.timestamp_millis()).unwrap_or(now)
}

// ---------------------------------------------------------------------------
// IdentityPayment
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityPayment {
    hash: Hash,
    id: Uuid,
    payment: Payment,
    note: String,
    created_on: DateTime<Utc>,
}

impl IdentityPayment {
    pub fn hash(&self) -> Hash {
        self.hash
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn payment(&self) -> &Payment {
        &self.payment
    }

    pub fn note(&self) -> &str {
        &self.note
    }

    pub fn created_on(&self) -> DateTime<Utc> {
        self.created_on
    }
}

#[derive(Debug, Default)]
pub struct IdentityPaymentBuilder {
    id: Option<Uuid>,
    payment: Option<Payment>,
    note: Option<String>,
    created_on: Option<DateTime<Utc>>,
}

impl IdentityPaymentBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Entry id. A fresh v4 id is drawn when unset.
    pub fn id(mut self, id: Uuid) -> Self {
        self.id = Some(id);
        self
    }

    pub fn payment(mut self, payment: Payment) -> Self {
        self.payment = Some(payment);
        self
    }

    pub fn note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    pub fn created_on(mut self, created_on: DateTime<Utc>) -> Self {
        self.created_on = Some(created_on);
        self
    }

    pub fn build(self) -> Result<IdentityPayment, BuilderError> {
        let payment = self.payment.ok_or(BuilderError::MissingField("payment"))?;
        let note = self.note.unwrap_or_default();
        check_note(&note)?;
        let created_on = self.created_on.unwrap_or_else(now_millis);
        let id = self.id.unwrap_or_else(Uuid::new_v4);

        Ok(IdentityPayment {
            hash: entry_hash(&id, &payment.hash(), &note, &created_on),
            id,
            payment,
            note,
            created_on,
        })
    }
}

// ---------------------------------------------------------------------------
// IdentityTransfer
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityTransfer {
    hash: Hash,
    id: Uuid,
    transfer: ViewTransfer,
    note: String,
    created_on: DateTime<Utc>,
}

impl IdentityTransfer {
    pub fn hash(&self) -> Hash {
        self.hash
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn transfer(&self) -> &ViewTransfer {
        &self.transfer
    }

    pub fn note(&self) -> &str {
        &self.note
    }

    pub fn created_on(&self) -> DateTime<Utc> {
        self.created_on
    }
}

#[derive(Debug, Default)]
pub struct IdentityTransferBuilder {
    id: Option<Uuid>,
    transfer: Option<ViewTransfer>,
    note: Option<String>,
    created_on: Option<DateTime<Utc>>,
}

impl IdentityTransferBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Entry id. A fresh v4 id is drawn when unset.
    pub fn id(mut self, id: Uuid) -> Self {
        self.id = Some(id);
        self
    }

    pub fn transfer(mut self, transfer: ViewTransfer) -> Self {
        self.transfer = Some(transfer);
        self
    }

    pub fn note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    pub fn created_on(mut self, created_on: DateTime<Utc>) -> Self {
        self.created_on = Some(created_on);
        self
    }

    pub fn build(self) -> Result<IdentityTransfer, BuilderError> {
        let transfer = self
            .transfer
            .ok_or(BuilderError::MissingField("transfer"))?;
        let note = self.note.unwrap_or_default();
        check_note(&note)?;
        let created_on = self.created_on.unwrap_or_else(now_millis);
        let id = self.id.unwrap_or_else(Uuid::new_v4);

        Ok(IdentityTransfer {
            hash: entry_hash(&id, &transfer.hash(), &note, &created_on),
            id,
            transfer,
            note,
            created_on,
        })
    }
}

// ---------------------------------------------------------------------------
// Services
// ---------------------------------------------------------------------------

/// Anything a ledger can hold. Storage backends dedupe on [`entry_hash`].
///
/// [`entry_hash`]: LedgerEntry::entry_hash
pub trait LedgerEntry: Clone + Serialize + for<'de> Deserialize<'de> + Send + Sync {
    fn entry_hash(&self) -> Hash;
}

impl LedgerEntry for IdentityPayment {
    fn entry_hash(&self) -> Hash {
        self.hash
    }
}

impl LedgerEntry for IdentityTransfer {
    fn entry_hash(&self) -> Hash {
        self.hash
    }
}

/// Append-only payment ledger, one per identity.
pub trait IdentityPaymentService: Send + Sync {
    fn insert(&self, identity: &Uuid, payment: &IdentityPayment) -> Result<(), LedgerError>;

    /// Entries in insertion order.
    fn list(&self, identity: &Uuid) -> Result<Vec<IdentityPayment>, LedgerError>;
}

/// Append-only transfer ledger, one per identity.
pub trait IdentityTransferService: Send + Sync {
    fn insert(&self, identity: &Uuid, transfer: &IdentityTransfer) -> Result<(), LedgerError>;

    /// Entries in insertion order.
    fn list(&self, identity: &Uuid) -> Result<Vec<IdentityTransfer>, LedgerError>;
}
