//! # Identities & Shareholdings
//!
//! An [`Identity`] is the authenticated caller. It holds zero or more
//! [`ShareHolder`]s, one per government it has a stake in. A shareholder
//! carries:
//!
//! - the signing key pair used for payments and transfers (`sig_pk`),
//! - a public description ([`ShareHolderPublic`]: government, power, public
//!   key) that payments reference,
//! - a content hash, which transfers use as their `origin`.
//!
//! Authentication itself is somebody else's problem: the orchestrator only
//! sees the [`IdentityApp`] trait.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::crypto::hash::{blake3_hash, Hash};
use crate::crypto::keys::{PrivateKey, PublicKey};
use crate::government::Government;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IdentityError {
    /// No authenticated identity is available to act on behalf of.
    #[error("not authenticated")]
    Unauthenticated,

    /// The identity holds no shares in the requested government.
    #[error("no shareholding in government {0}")]
    NoShareHolding(Uuid),
}

// ---------------------------------------------------------------------------
// ShareHolderPublic
// ---------------------------------------------------------------------------

/// The public face of a shareholding. This is what a payment points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShareHolderPublic {
    government: Uuid,
    power: u64,
    key: PublicKey,
}

impl ShareHolderPublic {
    pub fn new(government: Uuid, power: u64, key: PublicKey) -> Self {
        Self {
            government,
            power,
            key,
        }
    }

    pub fn government(&self) -> Uuid {
        self.government
    }

    pub fn power(&self) -> u64 {
        self.power
    }

    pub fn key(&self) -> &PublicKey {
        &self.key
    }

    /// Content hash: `H(government || power || key)`.
    pub fn hash(&self) -> Hash {
        let mut buf = Vec::with_capacity(16 + 8 + 32);
        buf.extend_from_slice(self.government.as_bytes());
        buf.extend_from_slice(&self.power.to_le_bytes());
        buf.extend_from_slice(self.key.as_bytes());
        Hash::from_array(blake3_hash(&buf))
    }
}

// ---------------------------------------------------------------------------
// ShareHolder
// ---------------------------------------------------------------------------

/// A shareholding in one government, with the key that controls it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShareHolder {
    government: Uuid,
    power: u64,
    sig_pk: PrivateKey,
}

impl ShareHolder {
    pub fn new(government: Uuid, power: u64, sig_pk: PrivateKey) -> Self {
        Self {
            government,
            power,
            sig_pk,
        }
    }

    pub fn government(&self) -> Uuid {
        self.government
    }

    pub fn power(&self) -> u64 {
        self.power
    }

    /// The signing key pair.
    pub fn sig_pk(&self) -> &PrivateKey {
        &self.sig_pk
    }

    pub fn public(&self) -> ShareHolderPublic {
        ShareHolderPublic::new(self.government, self.power, self.sig_pk.public_key())
    }

    /// Same as `self.public().hash()`; the secret key never feeds a hash.
    pub fn hash(&self) -> Hash {
        self.public().hash()
    }
}

/// All shareholdings of one identity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShareHolders {
    list: Vec<ShareHolder>,
}

impl ShareHolders {
    pub fn new(list: Vec<ShareHolder>) -> Self {
        Self { list }
    }

    pub fn all(&self) -> &[ShareHolder] {
        &self.list
    }

    /// The shareholding bound to `government`.
    pub fn fetch(&self, government: &Government) -> Result<&ShareHolder, IdentityError> {
        self.list
            .iter()
            .find(|holder| holder.government == government.id())
            .ok_or(IdentityError::NoShareHolding(government.id()))
    }
}

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// An authenticated participant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    id: Uuid,
    name: String,
    shareholders: ShareHolders,
}

impl Identity {
    pub fn new(id: Uuid, name: impl Into<String>, shareholders: ShareHolders) -> Self {
        Self {
            id,
            name: name.into(),
            shareholders,
        }
    }

    /// Stable id. Identity ledgers are keyed by this.
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn shareholders(&self) -> &ShareHolders {
        &self.shareholders
    }
}

/// Resolves the identity the current call acts for.
pub trait IdentityApp: Send + Sync {
    fn retrieve(&self) -> Result<Identity, IdentityError>;
}
