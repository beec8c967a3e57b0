//! In-memory collaborators.
//!
//! Used by tests and by anything that wants the orchestrator without a disk.
//! Nothing here survives a restart.

use std::collections::HashMap;
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::RwLock;
use uuid::Uuid;

use crate::crypto::hash::Hash;
use crate::government::{Government, GovernmentRepository, RepositoryError};
use crate::identity::{Identity, IdentityApp, IdentityError};
use crate::ledger::{
    IdentityPayment, IdentityPaymentService, IdentityTransfer, IdentityTransferService,
    LedgerEntry, LedgerError,
};

// ---------------------------------------------------------------------------
// Governments
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct Arena {
    heads: HashMap<Uuid, Hash>,
    nodes: HashMap<Hash, Government>,
}

/// Government history arena. Nodes are keyed by node hash; `heads` points each
/// id at its latest amendment.
#[derive(Debug, Default)]
pub struct MemoryGovernmentRepository {
    arena: RwLock<Arena>,
}

impl MemoryGovernmentRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.arena.read().heads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl GovernmentRepository for MemoryGovernmentRepository {
    fn retrieve(&self, id: &Uuid) -> Result<Government, RepositoryError> {
        let arena = self.arena.read();
        arena
            .heads
            .get(id)
            .and_then(|head| arena.nodes.get(head))
            .cloned()
            .ok_or(RepositoryError::NotFound(*id))
    }

    fn retrieve_by_hash(&self, hash: &Hash) -> Result<Government, RepositoryError> {
        self.arena
            .read()
            .nodes
            .get(hash)
            .cloned()
            .ok_or(RepositoryError::HashNotFound(*hash))
    }

    fn save(&self, government: &Government) -> Result<(), RepositoryError> {
        let mut arena = self.arena.write();
        check_head(arena.heads.get(&government.id()), government)?;
        if arena.nodes.contains_key(&government.hash()) {
            return Err(RepositoryError::AlreadyExists(government.hash()));
        }
        arena.heads.insert(government.id(), government.hash());
        arena.nodes.insert(government.hash(), government.clone());
        Ok(())
    }
}

/// An amendment must extend the current head; a genesis node must not
/// replace an existing chain.
pub(crate) fn check_head(head: Option<&Hash>, government: &Government) -> Result<(), RepositoryError> {
    match (head, government.previous()) {
        (None, None) => Ok(()),
        (Some(head), Some(previous)) if *head == previous => Ok(()),
        (_, previous) => Err(RepositoryError::StaleHead {
            id: government.id(),
            previous: previous.unwrap_or_default(),
        }),
    }
}

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// Hands out whichever identity was last logged in.
#[derive(Debug, Default)]
pub struct StaticIdentityApp {
    current: RwLock<Option<Identity>>,
}

impl StaticIdentityApp {
    pub fn new(identity: Identity) -> Self {
        Self {
            current: RwLock::new(Some(identity)),
        }
    }

    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn login(&self, identity: Identity) {
        *self.current.write() = Some(identity);
    }

    pub fn logout(&self) {
        *self.current.write() = None;
    }
}

impl IdentityApp for StaticIdentityApp {
    fn retrieve(&self) -> Result<Identity, IdentityError> {
        self.current
            .read()
            .clone()
            .ok_or(IdentityError::Unauthenticated)
    }
}

// ---------------------------------------------------------------------------
// Ledgers
// ---------------------------------------------------------------------------

/// Append-only per-identity ledger.
///
/// Inserts for one identity hold that identity's shard lock for the whole
/// duplicate check and push, so concurrent inserts are serialized.
#[derive(Debug)]
pub struct MemoryLedger<T> {
    entries: DashMap<Uuid, Vec<T>>,
}

impl<T> Default for MemoryLedger<T> {
    fn default() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }
}

impl<T: LedgerEntry> MemoryLedger<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Total entries across all identities.
    pub fn total(&self) -> usize {
        self.entries.iter().map(|e| e.value().len()).sum()
    }

    fn append(&self, identity: &Uuid, entry: &T) -> Result<(), LedgerError> {
        let mut list = self.entries.entry(*identity).or_default();
        let hash = entry.entry_hash();
        if list.iter().any(|e| e.entry_hash() == hash) {
            return Err(LedgerError::Duplicate(hash));
        }
        list.push(entry.clone());
        Ok(())
    }

    fn snapshot(&self, identity: &Uuid) -> Vec<T> {
        self.entries
            .get(identity)
            .map(|list| list.value().clone())
            .unwrap_or_default()
    }
}

pub type MemoryPaymentLedger = MemoryLedger<IdentityPayment>;
pub type MemoryTransferLedger = MemoryLedger<IdentityTransfer>;

impl IdentityPaymentService for MemoryLedger<IdentityPayment> {
    fn insert(&self, identity: &Uuid, payment: &IdentityPayment) -> Result<(), LedgerError> {
        self.append(identity, payment)
    }

    fn list(&self, identity: &Uuid) -> Result<Vec<IdentityPayment>, LedgerError> {
        Ok(self.snapshot(identity))
    }
}

impl IdentityTransferService for MemoryLedger<IdentityTransfer> {
    fn insert(&self, identity: &Uuid, transfer: &IdentityTransfer) -> Result<(), LedgerError> {
        self.append(identity, transfer)
    }

    fn list(&self, identity: &Uuid) -> Result<Vec<IdentityTransfer>, LedgerError> {
        Ok(self.snapshot(identity))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::keys::PrivateKey;
    use crate::government::{history, GovernmentBuilder, GovernmentContentBuilder};
    use crate::identity::{ShareHolderPublic, ShareHolders};
    use crate::ledger::IdentityPaymentBuilder;
    use crate::transfer::{PaymentBuilder, PaymentContentBuilder};

    fn content(cap: u64) -> crate::government::GovernmentContent {
        GovernmentContentBuilder::new()
            .chain(Uuid::nil())
            .min_power_to_pass_resolution(1)
            .min_power_to_propose(1)
            .shares_cap(cap)
            .build()
            .unwrap()
    }

    fn genesis(id: Uuid) -> Government {
        GovernmentBuilder::new()
            .id(id)
            .current(content(10))
            .build()
            .unwrap()
    }

    fn entry(amount: u64) -> IdentityPayment {
        let key = PrivateKey::generate();
        let content = PaymentContentBuilder::new()
            .shareholder(ShareHolderPublic::new(Uuid::nil(), 1, key.public_key()))
            .amount(amount)
            .build()
            .unwrap();
        let sig = key.sign(content.hash().as_bytes());
        let payment = PaymentBuilder::new()
            .content(content)
            .signature(sig)
            .build()
            .unwrap();
        IdentityPaymentBuilder::new()
            .payment(payment)
            .note("dues")
            .build()
            .unwrap()
    }

    #[test]
    fn unknown_government_is_not_found() {
        let repo = MemoryGovernmentRepository::new();
        let id = Uuid::new_v4();
        assert_eq!(repo.retrieve(&id).unwrap_err(), RepositoryError::NotFound(id));
    }

    #[test]
    fn amendments_move_the_head() {
        let repo = MemoryGovernmentRepository::new();
        let id = Uuid::new_v4();
        let first = genesis(id);
        repo.save(&first).unwrap();

        let second = GovernmentBuilder::new()
            .id(id)
            .current(content(20))
            .previous(&first)
            .build()
            .unwrap();
        repo.save(&second).unwrap();

        assert_eq!(repo.retrieve(&id).unwrap(), second);
        let chain = history(&repo, &id).unwrap();
        assert_eq!(chain, vec![second, first]);
    }

    #[test]
    fn stale_amendment_rejected() {
        let repo = MemoryGovernmentRepository::new();
        let id = Uuid::new_v4();
        let first = genesis(id);
        repo.save(&first).unwrap();
        let second = GovernmentBuilder::new()
            .id(id)
            .current(content(20))
            .previous(&first)
            .build()
            .unwrap();
        repo.save(&second).unwrap();

        // Forks off `first` again.
        let fork = GovernmentBuilder::new()
            .id(id)
            .current(content(30))
            .previous(&first)
            .build()
            .unwrap();
        assert!(matches!(
            repo.save(&fork),
            Err(RepositoryError::StaleHead { .. })
        ));
        // A second genesis for the same id is stale too.
        assert!(repo.save(&genesis(id)).is_err());
    }

    #[test]
    fn same_parameters_under_two_ids_stay_apart() {
        let repo = MemoryGovernmentRepository::new();
        let at = chrono::DateTime::<chrono::Utc>::from_timestamp_millis(1_700_000_000_000).unwrap();
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let build = |id| {
            let content = GovernmentContentBuilder::new()
                .chain(Uuid::nil())
                .min_power_to_pass_resolution(1)
                .min_power_to_propose(1)
                .shares_cap(10)
                .created_on(at)
                .build()
                .unwrap();
            GovernmentBuilder::new().id(id).current(content).build().unwrap()
        };
        repo.save(&build(a)).unwrap();
        repo.save(&build(b)).unwrap();

        assert_eq!(repo.retrieve(&a).unwrap().id(), a);
        assert_eq!(repo.retrieve(&b).unwrap().id(), b);
        assert_eq!(history(&repo, &a).unwrap().len(), 1);
    }

    #[test]
    fn reverting_amendment_keeps_history_finite() {
        let repo = MemoryGovernmentRepository::new();
        let id = Uuid::new_v4();
        let first = genesis(id);
        repo.save(&first).unwrap();
        let second = GovernmentBuilder::new()
            .id(id)
            .current(content(20))
            .previous(&first)
            .build()
            .unwrap();
        repo.save(&second).unwrap();
        // Same content as `first`, byte for byte.
        let third = GovernmentBuilder::new()
            .id(id)
            .current(first.current().clone())
            .previous(&second)
            .build()
            .unwrap();
        repo.save(&third).unwrap();

        let chain = history(&repo, &id).unwrap();
        assert_eq!(chain, vec![third, second, first.clone()]);
        assert_eq!(repo.retrieve_by_hash(&first.hash()).unwrap(), first);
    }

    #[test]
    fn existing_node_is_never_overwritten() {
        let repo = MemoryGovernmentRepository::new();
        let first = genesis(Uuid::new_v4());
        repo.save(&first).unwrap();

        // Same node hash claimed by another id.
        let mut json = serde_json::to_value(&first).unwrap();
        json["id"] = serde_json::json!(Uuid::new_v4());
        let forged: Government = serde_json::from_value(json).unwrap();
        assert_eq!(
            repo.save(&forged).unwrap_err(),
            RepositoryError::AlreadyExists(first.hash())
        );
        assert_eq!(repo.retrieve_by_hash(&first.hash()).unwrap(), first);
    }

    #[test]
    fn identity_app_login_logout() {
        let app = StaticIdentityApp::anonymous();
        assert_eq!(app.retrieve().unwrap_err(), IdentityError::Unauthenticated);

        let identity = Identity::new(Uuid::new_v4(), "alice", ShareHolders::default());
        app.login(identity.clone());
        assert_eq!(app.retrieve().unwrap(), identity);
        app.logout();
        assert!(app.retrieve().is_err());
    }

    #[test]
    fn ledger_keeps_order_and_rejects_duplicates() {
        let ledger = MemoryPaymentLedger::new();
        let who = Uuid::new_v4();
        let (a, b) = (entry(1), entry(2));
        ledger.insert(&who, &a).unwrap();
        ledger.insert(&who, &b).unwrap();
        assert_eq!(
            ledger.insert(&who, &a).unwrap_err(),
            LedgerError::Duplicate(a.hash())
        );
        assert_eq!(ledger.list(&who).unwrap(), vec![a, b]);
        assert!(ledger.list(&Uuid::new_v4()).unwrap().is_empty());
    }

    #[test]
    fn concurrent_inserts_are_all_kept() {
        let ledger = MemoryPaymentLedger::shared();
        let who = Uuid::new_v4();
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let ledger = Arc::clone(&ledger);
                std::thread::spawn(move || ledger.insert(&who, &entry(i)).unwrap())
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(ledger.list(&who).unwrap().len(), 8);
        assert_eq!(ledger.total(), 8);
    }
}
