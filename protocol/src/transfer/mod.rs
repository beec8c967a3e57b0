//! # Transfer Records
//!
//! The three kinds of value movement a shareholder can record:
//!
//! | Record           | Signature | Reveals sender? | Module      |
//! |------------------|-----------|-----------------|-------------|
//! | [`Payment`]      | Ed25519   | yes             | [`payment`] |
//! | [`Transfer`]     | ring      | no              | [`send`]    |
//! | [`ViewTransfer`] | ring      | to section holders only | [`view`] |
//!
//! Every content type is built through a consuming builder that validates
//! mandatory fields and stamps the content hash. Records then wrap a content
//! with its signature and get a hash of their own covering both.
//!
//! [`TransferRecord`] is the sum of the three, for code that stores or
//! displays records without caring which kind it has.

pub mod payment;
pub mod send;
pub mod view;

use serde::{Deserialize, Serialize};

use crate::crypto::hash::{Hash, HashAdapter};

pub use payment::{Payment, PaymentBuilder, PaymentContent, PaymentContentBuilder};
pub use send::{Transfer, TransferBuilder, TransferContent, TransferContentBuilder};
pub use view::{
    ViewSection, ViewSectionBuilder, ViewTransfer, ViewTransferBuilder, ViewTransferContent,
    ViewTransferContentBuilder,
};

/// Any finalized transfer record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransferRecord {
    Payment(Payment),
    Transfer(Transfer),
    ViewTransfer(ViewTransfer),
}

impl TransferRecord {
    pub fn hash(&self) -> Hash {
        match self {
            Self::Payment(p) => p.hash(),
            Self::Transfer(t) => t.hash(),
            Self::ViewTransfer(v) => v.hash(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Payment(_) => "payment",
            Self::Transfer(_) => "transfer",
            Self::ViewTransfer(_) => "view-transfer",
        }
    }

    pub fn verify(&self, adapter: &dyn HashAdapter) -> bool {
        match self {
            Self::Payment(p) => p.verify(),
            Self::Transfer(t) => t.verify(adapter),
            Self::ViewTransfer(v) => v.verify(adapter),
        }
    }
}

impl From<Payment> for TransferRecord {
    fn from(payment: Payment) -> Self {
        Self::Payment(payment)
    }
}

impl From<Transfer> for TransferRecord {
    fn from(transfer: Transfer) -> Self {
        Self::Transfer(transfer)
    }
}

impl From<ViewTransfer> for TransferRecord {
    fn from(view: ViewTransfer) -> Self {
        Self::ViewTransfer(view)
    }
}
