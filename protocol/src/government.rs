//! # Governments
//!
//! A government is an organization whose governance parameters (voting
//! thresholds, share cap, share velocity) are recorded on a content-addressed
//! history chain. Amending a parameter never mutates anything: a new
//! [`Government`] node is appended whose `previous` points at the old head.
//!
//! ```text
//!   head ──previous──▶ amendment 1 ──previous──▶ genesis
//!   (id = G)            (id = G)                  (id = G)
//! ```
//!
//! `previous` is a [`Hash`] reference into the repository, not an owning
//! pointer. The repository is the arena; walking history means looking each
//! hash up again. No ownership cycles, trivially serializable.
//!
//! A node's hash covers its government id, its content hash and its
//! `previous` link. Two governments with identical parameters get distinct
//! nodes, and a node can only point at nodes that existed before it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::crypto::hash::{blake3_hash, Hash};
use crate::error::BuilderError;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors returned by a [`GovernmentRepository`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RepositoryError {
    #[error("government not found: {0}")]
    NotFound(Uuid),

    #[error("no government node with hash {0}")]
    HashNotFound(Hash),

    /// An amendment was saved whose `previous` is not the current head.
    #[error("stale amendment for {id}: previous {previous} is not the current head")]
    StaleHead { id: Uuid, previous: Hash },

    #[error("government node {0} already exists")]
    AlreadyExists(Hash),

    #[error("storage error: {0}")]
    Storage(String),
}

// ---------------------------------------------------------------------------
// GovernmentContent
// ---------------------------------------------------------------------------

/// The governance parameters of one version of a government.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GovernmentContent {
    hash: Hash,
    /// The chain this government's resolutions are anchored on.
    chain: Uuid,
    min_power_to_pass_resolution: u64,
    min_power_to_propose: u64,
    can_cancel_vote: bool,
    shares_velocity: u64,
    shares_cap: u64,
    created_on: DateTime<Utc>,
}

impl GovernmentContent {
    pub fn hash(&self) -> Hash {
        self.hash
    }

    pub fn chain(&self) -> Uuid {
        self.chain
    }

    pub fn min_power_to_pass_resolution(&self) -> u64 {
        self.min_power_to_pass_resolution
    }

    pub fn min_power_to_propose(&self) -> u64 {
        self.min_power_to_propose
    }

    pub fn can_cancel_vote(&self) -> bool {
        self.can_cancel_vote
    }

    pub fn shares_velocity(&self) -> u64 {
        self.shares_velocity
    }

    pub fn shares_cap(&self) -> u64 {
        self.shares_cap
    }

    pub fn created_on(&self) -> DateTime<Utc> {
        self.created_on
    }

    /// Recompute the content hash from the fields.
    pub fn compute_hash(&self) -> Hash {
        let mut buf = Vec::with_capacity(96);
        buf.extend_from_slice(self.chain.as_bytes());
        buf.extend_from_slice(&self.min_power_to_pass_resolution.to_le_bytes());
        buf.extend_from_slice(&self.min_power_to_propose.to_le_bytes());
        buf.push(self.can_cancel_vote as u8);
        buf.extend_from_slice(&self.shares_velocity.to_le_bytes());
        buf.extend_from_slice(&self.shares_cap.to_le_bytes());
        buf.extend_from_slice(&self.created_on.timestamp_millis().to_le_bytes());
        Hash::from_array(blake3_hash(&buf))
    }
}

/// Builder for [`GovernmentContent`].
///
/// `chain`, `shares_cap`, `min_power_to_pass_resolution` and
/// `min_power_to_propose` are mandatory. `created_on` defaults to now.
#[derive(Debug, Default)]
pub struct GovernmentContentBuilder {
    chain: Option<Uuid>,
    min_power_to_pass_resolution: Option<u64>,
    min_power_to_propose: Option<u64>,
    can_cancel_vote: bool,
    shares_velocity: u64,
    shares_cap: Option<u64>,
    created_on: Option<DateTime<Utc>>,
}

impl GovernmentContentBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn chain(mut self, chain: Uuid) -> Self {
        self.chain = Some(chain);
        self
    }

    pub fn min_power_to_pass_resolution(mut self, power: u64) -> Self {
        self.min_power_to_pass_resolution = Some(power);
        self
    }

    pub fn min_power_to_propose(mut self, power: u64) -> Self {
        self.min_power_to_propose = Some(power);
        self
    }

    pub fn can_cancel_vote(mut self) -> Self {
        self.can_cancel_vote = true;
        self
    }

    pub fn shares_velocity(mut self, velocity: u64) -> Self {
        self.shares_velocity = velocity;
        self
    }

    pub fn shares_cap(mut self, cap: u64) -> Self {
        self.shares_cap = Some(cap);
        self
    }

    pub fn created_on(mut self, created_on: DateTime<Utc>) -> Self {
        self.created_on = Some(created_on);
        self
    }

    pub fn build(self) -> Result<GovernmentContent, BuilderError> {
        let chain = self.chain.ok_or(BuilderError::MissingField("chain"))?;
        let shares_cap = self
            .shares_cap
            .ok_or(BuilderError::MissingField("shares_cap"))?;
        let min_power_to_pass_resolution = self
            .min_power_to_pass_resolution
            .ok_or(BuilderError::MissingField("min_power_to_pass_resolution"))?;
        let min_power_to_propose = self
            .min_power_to_propose
            .ok_or(BuilderError::MissingField("min_power_to_propose"))?;

        for (field, power) in [
            ("min_power_to_pass_resolution", min_power_to_pass_resolution),
            ("min_power_to_propose", min_power_to_propose),
        ] {
            if power == 0 || power > shares_cap {
                return Err(BuilderError::InvalidField {
                    field,
                    reason: format!("must be in [1, {}], got {}", shares_cap, power),
                });
            }
        }

        // Millisecond precision: that's what the hash covers, so that's what
        // we keep. Otherwise a serde round-trip could change the hash.
        let created_on = self.created_on.unwrap_or_else(Utc::now);
        let created_on = DateTime::<Utc>::from_timestamp_millis(created_on.timestamp_millis())
            .unwrap_or(created_on);

        let mut content = GovernmentContent {
            hash: Hash::default(),
            chain,
            min_power_to_pass_resolution,
            min_power_to_propose,
            can_cancel_vote: self.can_cancel_vote,
            shares_velocity: self.shares_velocity,
            shares_cap,
            created_on,
        };
        content.hash = content.compute_hash();
        Ok(content)
    }
}

// ---------------------------------------------------------------------------
// Government
// ---------------------------------------------------------------------------

/// One node of a government's history chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Government {
    hash: Hash,
    id: Uuid,
    current: GovernmentContent,
    previous: Option<Hash>,
}

impl Government {
    /// Node hash: `H(id || current.hash || previous)`.
    pub fn hash(&self) -> Hash {
        self.hash
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn current(&self) -> &GovernmentContent {
        &self.current
    }

    /// Hash of the node this one amends, if any.
    pub fn previous(&self) -> Option<Hash> {
        self.previous
    }

    pub fn is_genesis(&self) -> bool {
        self.previous.is_none()
    }

    /// Recompute the node hash from the fields.
    pub fn compute_hash(&self) -> Hash {
        let mut buf = Vec::with_capacity(16 + 32 + 1 + 32);
        buf.extend_from_slice(self.id.as_bytes());
        buf.extend_from_slice(self.current.hash().as_bytes());
        match &self.previous {
            Some(previous) => {
                buf.push(1);
                buf.extend_from_slice(previous.as_bytes());
            }
            None => buf.push(0),
        }
        Hash::from_array(blake3_hash(&buf))
    }
}

/// Builder for [`Government`] nodes.
#[derive(Debug, Default)]
pub struct GovernmentBuilder {
    id: Option<Uuid>,
    current: Option<GovernmentContent>,
    previous: Option<Previous>,
}

#[derive(Debug)]
struct Previous {
    id: Uuid,
    hash: Hash,
    content: Hash,
}

impl GovernmentBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn id(mut self, id: Uuid) -> Self {
        self.id = Some(id);
        self
    }

    pub fn current(mut self, current: GovernmentContent) -> Self {
        self.current = Some(current);
        self
    }

    /// The node being amended. Must belong to the same government.
    pub fn previous(mut self, previous: &Government) -> Self {
        self.previous = Some(Previous {
            id: previous.id(),
            hash: previous.hash(),
            content: previous.current().hash(),
        });
        self
    }

    pub fn build(self) -> Result<Government, BuilderError> {
        let id = self.id.ok_or(BuilderError::MissingField("id"))?;
        let current = self.current.ok_or(BuilderError::MissingField("current"))?;

        let previous = match self.previous {
            Some(prev) if prev.id != id => {
                return Err(BuilderError::InvalidField {
                    field: "previous",
                    reason: format!("belongs to government {}, not {}", prev.id, id),
                });
            }
            Some(prev) if prev.content == current.hash() => {
                return Err(BuilderError::InvalidField {
                    field: "previous",
                    reason: "amendment does not change any parameter".to_string(),
                });
            }
            Some(prev) => Some(prev.hash),
            None => None,
        };

        let mut government = Government {
            hash: Hash::default(),
            id,
            current,
            previous,
        };
        government.hash = government.compute_hash();
        Ok(government)
    }
}

// ---------------------------------------------------------------------------
// Repository
// ---------------------------------------------------------------------------

/// Persistence of government history chains.
///
/// `retrieve` returns the head (latest amendment) for an id.
pub trait GovernmentRepository: Send + Sync {
    fn retrieve(&self, id: &Uuid) -> Result<Government, RepositoryError>;

    fn retrieve_by_hash(&self, hash: &Hash) -> Result<Government, RepositoryError>;

    /// Append a node. A genesis node may only be saved for an unknown id; an
    /// amendment's `previous` must be the current head. A node hash is never
    /// overwritten.
    fn save(&self, government: &Government) -> Result<(), RepositoryError>;
}

/// Walk a government's history from head to genesis.
pub fn history(
    repository: &dyn GovernmentRepository,
    id: &Uuid,
) -> Result<Vec<Government>, RepositoryError> {
    let mut chain = vec![repository.retrieve(id)?];
    while let Some(previous) = chain.last().and_then(Government::previous) {
        chain.push(repository.retrieve_by_hash(&previous)?);
    }
    Ok(chain)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_content(cap: u64) -> GovernmentContent {
        GovernmentContentBuilder::new()
            .chain(Uuid::nil())
            .min_power_to_pass_resolution(cap / 2 + 1)
            .min_power_to_propose(1)
            .shares_velocity(10)
            .shares_cap(cap)
            .created_on(DateTime::<Utc>::from_timestamp_millis(1_700_000_000_000).unwrap())
            .build()
            .unwrap()
    }

    #[test]
    fn content_hash_is_deterministic() {
        assert_eq!(sample_content(100).hash(), sample_content(100).hash());
        assert_ne!(sample_content(100).hash(), sample_content(200).hash());
    }

    #[test]
    fn content_hash_matches_recomputation() {
        let content = sample_content(100);
        assert_eq!(content.hash(), content.compute_hash());
    }

    #[test]
    fn missing_fields_reported() {
        let err = GovernmentContentBuilder::new()
            .shares_cap(10)
            .build()
            .unwrap_err();
        assert_eq!(err, BuilderError::MissingField("chain"));

        let err = GovernmentBuilder::new().id(Uuid::new_v4()).build().unwrap_err();
        assert_eq!(err, BuilderError::MissingField("current"));
    }

    #[test]
    fn power_thresholds_bounded_by_cap() {
        let err = GovernmentContentBuilder::new()
            .chain(Uuid::nil())
            .min_power_to_pass_resolution(101)
            .min_power_to_propose(1)
            .shares_cap(100)
            .build()
            .unwrap_err();
        assert!(matches!(
            err,
            BuilderError::InvalidField {
                field: "min_power_to_pass_resolution",
                ..
            }
        ));
    }

    #[test]
    fn amendment_links_previous_by_hash() {
        let id = Uuid::new_v4();
        let genesis = GovernmentBuilder::new()
            .id(id)
            .current(sample_content(100))
            .build()
            .unwrap();
        assert!(genesis.is_genesis());

        let amended = GovernmentBuilder::new()
            .id(id)
            .current(sample_content(200))
            .previous(&genesis)
            .build()
            .unwrap();
        assert_eq!(amended.previous(), Some(genesis.hash()));
    }

    #[test]
    fn amendment_of_other_government_rejected() {
        let genesis = GovernmentBuilder::new()
            .id(Uuid::new_v4())
            .current(sample_content(100))
            .build()
            .unwrap();
        let err = GovernmentBuilder::new()
            .id(Uuid::new_v4())
            .current(sample_content(200))
            .previous(&genesis)
            .build()
            .unwrap_err();
        assert!(matches!(err, BuilderError::InvalidField { field: "previous", .. }));
    }

    #[test]
    fn node_hash_covers_id_and_previous() {
        let genesis = |id| {
            GovernmentBuilder::new()
                .id(id)
                .current(sample_content(100))
                .build()
                .unwrap()
        };
        let (a, b) = (genesis(Uuid::new_v4()), genesis(Uuid::new_v4()));
        assert_eq!(a.current().hash(), b.current().hash());
        assert_ne!(a.hash(), b.hash());
        assert_eq!(a.hash(), a.compute_hash());

        let amended = GovernmentBuilder::new()
            .id(a.id())
            .current(sample_content(200))
            .previous(&a)
            .build()
            .unwrap();
        let reverted = GovernmentBuilder::new()
            .id(a.id())
            .current(sample_content(100))
            .previous(&amended)
            .build()
            .unwrap();
        assert_eq!(reverted.current().hash(), a.current().hash());
        assert_ne!(reverted.hash(), a.hash());
    }

    #[test]
    fn serde_roundtrip_preserves_hash() {
        let content = GovernmentContentBuilder::new()
            .chain(Uuid::new_v4())
            .min_power_to_pass_resolution(3)
            .min_power_to_propose(1)
            .shares_cap(5)
            .build()
            .unwrap();
        let json = serde_json::to_string(&content).unwrap();
        let back: GovernmentContent = serde_json::from_str(&json).unwrap();
        assert_eq!(back.compute_hash(), content.hash());
    }
}
