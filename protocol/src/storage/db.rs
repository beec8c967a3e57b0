//! # AgoraDb
//!
//! sled-backed implementation of every persistence contract the
//! orchestrator consumes: government history, identity records and the two
//! identity ledgers.
//!
//! ## Tree Layout
//!
//! | Tree               | Key                          | Value                     |
//! |--------------------|------------------------------|---------------------------|
//! | `governments`      | node hash (32B)              | `bincode(Government)`     |
//! | `government_heads` | government id (16B)          | head hash (32B)           |
//! | `identities`       | identity id (16B)            | `bincode(IdentityRecord)` |
//! | `payments`         | identity id ‖ seq (8B BE)    | `bincode(IdentityPayment)`|
//! | `payment_index`    | identity id ‖ entry hash     | seq (8B BE)               |
//! | `transfers`        | identity id ‖ seq (8B BE)    | `bincode(IdentityTransfer)`|
//! | `transfer_index`   | identity id ‖ entry hash     | seq (8B BE)               |
//! | `metadata`         | key (UTF-8)                  | value (bytes)             |
//!
//! Sequence numbers come from sled's monotonic id generator and are stored
//! big-endian, so a prefix scan over one identity returns entries in
//! insertion order.
//!
//! ## Atomicity
//!
//! A ledger insert writes the entry and its index row in one sled
//! transaction. Two concurrent inserts of the same entry for one identity
//! conflict on the index row; exactly one wins and the other gets
//! [`LedgerError::Duplicate`]. Government amendments are checked against the
//! current head inside a transaction the same way.

use std::path::Path;

use serde::{Deserialize, Serialize};
use sled::transaction::{ConflictableTransactionError, TransactionError, TransactionResult};
use sled::{Db, IVec, Transactional, Tree};
use uuid::Uuid;

use crate::crypto::hash::Hash;
use crate::crypto::keys::{PrivateKey, PublicKey};
use crate::government::{Government, GovernmentRepository, RepositoryError};
use crate::identity::{Identity, ShareHolder, ShareHolderPublic, ShareHolders};
use crate::ledger::{
    IdentityPayment, IdentityPaymentService, IdentityTransfer, IdentityTransferService,
    LedgerEntry, LedgerError,
};

use super::memory::check_head;

// ---------------------------------------------------------------------------
// Error Type
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("key not found: {0}")]
    NotFound(String),
}

pub type DbResult<T> = Result<T, DbError>;

fn encode<T: Serialize>(value: &T) -> DbResult<Vec<u8>> {
    bincode::serialize(value).map_err(|e| DbError::Serialization(e.to_string()))
}

fn decode<T: for<'de> Deserialize<'de>>(bytes: &[u8]) -> DbResult<T> {
    bincode::deserialize(bytes).map_err(|e| DbError::Serialization(e.to_string()))
}

fn decode_hash(bytes: &IVec) -> DbResult<Hash> {
    let arr: [u8; 32] = bytes
        .as_ref()
        .try_into()
        .map_err(|_| DbError::Serialization(format!("bad hash length {}", bytes.len())))?;
    Ok(Hash::from_array(arr))
}

/// Metadata key holding the id of the identity `init` created.
pub const META_DEFAULT_IDENTITY: &str = "default_identity";

// ---------------------------------------------------------------------------
// IdentityRecord
// ---------------------------------------------------------------------------

/// The persisted half of an [`Identity`]. Secret keys are never stored;
/// [`AgoraDb::unlock`] pairs the public holdings with keys supplied at
/// runtime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityRecord {
    pub id: Uuid,
    pub name: String,
    pub holdings: Vec<ShareHolderPublic>,
}

// ---------------------------------------------------------------------------
// AgoraDb
// ---------------------------------------------------------------------------

/// `AgoraDb` is `Clone` and cheap to share: sled trees are reference
/// counted and thread-safe.
#[derive(Debug, Clone)]
pub struct AgoraDb {
    db: Db,
    governments: Tree,
    government_heads: Tree,
    identities: Tree,
    payments: Tree,
    payment_index: Tree,
    transfers: Tree,
    transfer_index: Tree,
    metadata: Tree,
}

impl AgoraDb {
    /// Open or create a database at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        let db = sled::open(path)?;
        Self::from_db(db)
    }

    /// A database that lives in memory and vanishes on drop.
    pub fn open_temporary() -> DbResult<Self> {
        let config = sled::Config::new().temporary(true);
        let db = config.open()?;
        Self::from_db(db)
    }

    fn from_db(db: Db) -> DbResult<Self> {
        Ok(Self {
            governments: db.open_tree("governments")?,
            government_heads: db.open_tree("government_heads")?,
            identities: db.open_tree("identities")?,
            payments: db.open_tree("payments")?,
            payment_index: db.open_tree("payment_index")?,
            transfers: db.open_tree("transfers")?,
            transfer_index: db.open_tree("transfer_index")?,
            metadata: db.open_tree("metadata")?,
            db,
        })
    }

    // -- Identities ---------------------------------------------------------

    pub fn put_identity(&self, record: &IdentityRecord) -> DbResult<()> {
        self.identities.insert(record.id.as_bytes(), encode(record)?)?;
        Ok(())
    }

    pub fn get_identity(&self, id: &Uuid) -> DbResult<Option<IdentityRecord>> {
        self.identities
            .get(id.as_bytes())?
            .map(|bytes| decode(&bytes))
            .transpose()
    }

    /// The identity whose holdings include `key`, if any.
    pub fn identity_holding(&self, key: &PublicKey) -> DbResult<Option<Uuid>> {
        for item in self.identities.iter() {
            let (_, bytes) = item?;
            let record: IdentityRecord = decode(&bytes)?;
            if record.holdings.iter().any(|h| h.key() == key) {
                return Ok(Some(record.id));
            }
        }
        Ok(None)
    }

    /// Rebuild a live [`Identity`] from its record, keeping the holdings
    /// whose public key matches one of `keys`.
    pub fn unlock(&self, id: &Uuid, keys: &[PrivateKey]) -> DbResult<Identity> {
        let record = self
            .get_identity(id)?
            .ok_or_else(|| DbError::NotFound(format!("identity {id}")))?;
        let holders = record
            .holdings
            .iter()
            .filter_map(|holding| {
                keys.iter()
                    .find(|key| key.public_key() == *holding.key())
                    .map(|key| ShareHolder::new(holding.government(), holding.power(), key.clone()))
            })
            .collect();
        Ok(Identity::new(record.id, record.name, ShareHolders::new(holders)))
    }

    // -- Metadata -----------------------------------------------------------

    pub fn set_meta(&self, key: &str, value: &[u8]) -> DbResult<()> {
        self.metadata.insert(key.as_bytes(), value)?;
        Ok(())
    }

    pub fn get_meta(&self, key: &str) -> DbResult<Option<Vec<u8>>> {
        Ok(self.metadata.get(key.as_bytes())?.map(|v| v.to_vec()))
    }

    pub fn government_count(&self) -> usize {
        self.government_heads.len()
    }

    /// Block until all pending writes are durable.
    pub fn flush(&self) -> DbResult<()> {
        self.db.flush()?;
        Ok(())
    }

    // -- Ledgers ------------------------------------------------------------

    fn append<T: LedgerEntry>(
        &self,
        entries: &Tree,
        index: &Tree,
        identity: &Uuid,
        entry: &T,
    ) -> Result<(), LedgerError> {
        let hash = entry.entry_hash();
        let seq = self.db.generate_id().map_err(storage_err)?;
        let bytes = encode(entry).map_err(storage_err)?;
        let entry_key = prefixed(identity, &seq.to_be_bytes());
        let index_key = prefixed(identity, hash.as_bytes());

        let result: TransactionResult<(), LedgerError> =
            (entries, index).transaction(|(entries, index)| {
                if index.get(index_key.as_slice())?.is_some() {
                    return Err(ConflictableTransactionError::Abort(LedgerError::Duplicate(
                        hash,
                    )));
                }
                entries.insert(entry_key.as_slice(), bytes.as_slice())?;
                index.insert(index_key.as_slice(), seq.to_be_bytes().to_vec())?;
                Ok(())
            });

        match result {
            Ok(()) => Ok(()),
            Err(TransactionError::Abort(e)) => Err(e),
            Err(TransactionError::Storage(e)) => Err(storage_err(e)),
        }
    }

    fn scan<T: LedgerEntry>(&self, entries: &Tree, identity: &Uuid) -> Result<Vec<T>, LedgerError> {
        entries
            .scan_prefix(identity.as_bytes())
            .map(|item| {
                let (_, bytes) = item.map_err(storage_err)?;
                decode(&bytes).map_err(storage_err)
            })
            .collect()
    }
}

fn prefixed(identity: &Uuid, suffix: &[u8]) -> Vec<u8> {
    let mut key = Vec::with_capacity(16 + suffix.len());
    key.extend_from_slice(identity.as_bytes());
    key.extend_from_slice(suffix);
    key
}

fn storage_err(e: impl std::fmt::Display) -> LedgerError {
    LedgerError::Storage(e.to_string())
}

fn repo_err(e: impl std::fmt::Display) -> RepositoryError {
    RepositoryError::Storage(e.to_string())
}

// ---------------------------------------------------------------------------
// Contract implementations
// ---------------------------------------------------------------------------

impl GovernmentRepository for AgoraDb {
    fn retrieve(&self, id: &Uuid) -> Result<Government, RepositoryError> {
        let head = self
            .government_heads
            .get(id.as_bytes())
            .map_err(repo_err)?
            .ok_or(RepositoryError::NotFound(*id))?;
        let hash = decode_hash(&head).map_err(repo_err)?;
        self.retrieve_by_hash(&hash)
    }

    fn retrieve_by_hash(&self, hash: &Hash) -> Result<Government, RepositoryError> {
        let bytes = self
            .governments
            .get(hash.as_bytes())
            .map_err(repo_err)?
            .ok_or(RepositoryError::HashNotFound(*hash))?;
        decode(&bytes).map_err(repo_err)
    }

    fn save(&self, government: &Government) -> Result<(), RepositoryError> {
        let bytes = encode(government).map_err(repo_err)?;
        let id = government.id();
        let hash = government.hash();

        let result: TransactionResult<(), RepositoryError> = (&self.governments, &self.government_heads)
            .transaction(|(nodes, heads)| {
                let head = match heads.get(id.as_bytes())? {
                    Some(bytes) => Some(
                        decode_hash(&bytes)
                            .map_err(|e| ConflictableTransactionError::Abort(repo_err(e)))?,
                    ),
                    None => None,
                };
                check_head(head.as_ref(), government).map_err(ConflictableTransactionError::Abort)?;
                if nodes.get(hash.as_bytes())?.is_some() {
                    return Err(ConflictableTransactionError::Abort(
                        RepositoryError::AlreadyExists(hash),
                    ));
                }
                nodes.insert(hash.as_bytes().to_vec(), bytes.as_slice())?;
                heads.insert(id.as_bytes().to_vec(), hash.as_bytes().to_vec())?;
                Ok(())
            });

        match result {
            Ok(()) => Ok(()),
            Err(TransactionError::Abort(e)) => Err(e),
            Err(TransactionError::Storage(e)) => Err(repo_err(e)),
        }
    }
}

impl IdentityPaymentService for AgoraDb {
    fn insert(&self, identity: &Uuid, payment: &IdentityPayment) -> Result<(), LedgerError> {
        self.append(&self.payments, &self.payment_index, identity, payment)
    }

    fn list(&self, identity: &Uuid) -> Result<Vec<IdentityPayment>, LedgerError> {
        self.scan(&self.payments, identity)
    }
}

impl IdentityTransferService for AgoraDb {
    fn insert(&self, identity: &Uuid, transfer: &IdentityTransfer) -> Result<(), LedgerError> {
        self.append(&self.transfers, &self.transfer_index, identity, transfer)
    }

    fn list(&self, identity: &Uuid) -> Result<Vec<IdentityTransfer>, LedgerError> {
        self.scan(&self.transfers, identity)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::government::{history, GovernmentBuilder, GovernmentContentBuilder};
    use crate::ledger::IdentityPaymentBuilder;
    use crate::transfer::{PaymentBuilder, PaymentContentBuilder};

    fn genesis(id: Uuid, cap: u64) -> Government {
        let content = GovernmentContentBuilder::new()
            .chain(Uuid::nil())
            .min_power_to_pass_resolution(1)
            .min_power_to_propose(1)
            .shares_cap(cap)
            .build()
            .unwrap();
        GovernmentBuilder::new().id(id).current(content).build().unwrap()
    }

    fn payment_entry(key: &PrivateKey, amount: u64) -> IdentityPayment {
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
        IdentityPaymentBuilder::new().payment(payment).build().unwrap()
    }

    #[test]
    fn open_temporary_database() {
        let db = AgoraDb::open_temporary().expect("should create temp db");
        assert_eq!(db.government_count(), 0);
    }

    #[test]
    fn governments_survive_reopen() {
        let dir = tempfile::tempdir().expect("tempdir");
        let id = Uuid::new_v4();
        let gov = genesis(id, 10);
        {
            let db = AgoraDb::open(dir.path()).expect("should open db");
            db.save(&gov).unwrap();
            db.flush().unwrap();
        }
        let db = AgoraDb::open(dir.path()).expect("should reopen db");
        assert_eq!(db.retrieve(&id).unwrap(), gov);
        assert_eq!(history(&db, &id).unwrap().len(), 1);
    }

    #[test]
    fn amendment_chain_and_stale_head() {
        let db = AgoraDb::open_temporary().unwrap();
        let id = Uuid::new_v4();
        let first = genesis(id, 10);
        db.save(&first).unwrap();

        let content = GovernmentContentBuilder::new()
            .chain(Uuid::nil())
            .min_power_to_pass_resolution(5)
            .min_power_to_propose(1)
            .shares_cap(50)
            .build()
            .unwrap();
        let second = GovernmentBuilder::new()
            .id(id)
            .current(content)
            .previous(&first)
            .build()
            .unwrap();
        db.save(&second).unwrap();
        assert_eq!(db.retrieve(&id).unwrap(), second);
        assert_eq!(db.retrieve_by_hash(&first.hash()).unwrap(), first);

        assert!(matches!(
            db.save(&genesis(id, 10)),
            Err(RepositoryError::StaleHead { .. })
        ));
    }

    #[test]
    fn same_parameters_under_two_ids_stay_apart() {
        let db = AgoraDb::open_temporary().unwrap();
        let at = chrono::DateTime::<chrono::Utc>::from_timestamp_millis(1_700_000_000_000).unwrap();
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        for id in [a, b] {
            let content = GovernmentContentBuilder::new()
                .chain(Uuid::nil())
                .min_power_to_pass_resolution(1)
                .min_power_to_propose(1)
                .shares_cap(10)
                .created_on(at)
                .build()
                .unwrap();
            db.save(&GovernmentBuilder::new().id(id).current(content).build().unwrap())
                .unwrap();
        }
        assert_eq!(db.retrieve(&a).unwrap().id(), a);
        assert_eq!(db.retrieve(&b).unwrap().id(), b);
    }

    #[test]
    fn existing_node_is_never_overwritten() {
        let db = AgoraDb::open_temporary().unwrap();
        let first = genesis(Uuid::new_v4(), 10);
        db.save(&first).unwrap();

        let mut json = serde_json::to_value(&first).unwrap();
        json["id"] = serde_json::json!(Uuid::new_v4());
        let forged: Government = serde_json::from_value(json).unwrap();
        assert_eq!(
            db.save(&forged).unwrap_err(),
            RepositoryError::AlreadyExists(first.hash())
        );
        assert_eq!(db.retrieve_by_hash(&first.hash()).unwrap(), first);
    }

    #[test]
    fn missing_government() {
        let db = AgoraDb::open_temporary().unwrap();
        let id = Uuid::new_v4();
        assert_eq!(db.retrieve(&id).unwrap_err(), RepositoryError::NotFound(id));
    }

    #[test]
    fn ledger_scan_is_per_identity_and_ordered() {
        let db = AgoraDb::open_temporary().unwrap();
        let key = PrivateKey::generate();
        let (alice, bob) = (Uuid::new_v4(), Uuid::new_v4());
        let entries: Vec<_> = (1..=3).map(|amount| payment_entry(&key, amount)).collect();
        for entry in &entries {
            IdentityPaymentService::insert(&db, &alice, entry).unwrap();
        }
        IdentityPaymentService::insert(&db, &bob, &payment_entry(&key, 9)).unwrap();

        assert_eq!(IdentityPaymentService::list(&db, &alice).unwrap(), entries);
        assert_eq!(IdentityPaymentService::list(&db, &bob).unwrap().len(), 1);
        assert!(IdentityTransferService::list(&db, &alice).unwrap().is_empty());
    }

    #[test]
    fn duplicate_entry_rejected() {
        let db = AgoraDb::open_temporary().unwrap();
        let who = Uuid::new_v4();
        let entry = payment_entry(&PrivateKey::generate(), 5);
        IdentityPaymentService::insert(&db, &who, &entry).unwrap();
        assert_eq!(
            IdentityPaymentService::insert(&db, &who, &entry).unwrap_err(),
            LedgerError::Duplicate(entry.hash())
        );
        assert_eq!(IdentityPaymentService::list(&db, &who).unwrap().len(), 1);
    }

    #[test]
    fn unlock_pairs_holdings_with_keys() {
        let db = AgoraDb::open_temporary().unwrap();
        let (k1, k2) = (PrivateKey::generate(), PrivateKey::generate());
        let (g1, g2) = (Uuid::new_v4(), Uuid::new_v4());
        let record = IdentityRecord {
            id: Uuid::new_v4(),
            name: "alice".into(),
            holdings: vec![
                ShareHolderPublic::new(g1, 3, k1.public_key()),
                ShareHolderPublic::new(g2, 4, k2.public_key()),
            ],
        };
        db.put_identity(&record).unwrap();

        let identity = db.unlock(&record.id, &[k2.clone()]).unwrap();
        assert_eq!(identity.name(), "alice");
        assert_eq!(identity.shareholders().all().len(), 1);
        assert_eq!(identity.shareholders().all()[0].government(), g2);

        assert!(matches!(
            db.unlock(&Uuid::new_v4(), &[k1]),
            Err(DbError::NotFound(_))
        ));
    }

    #[test]
    fn identity_found_by_holding_key() {
        let db = AgoraDb::open_temporary().unwrap();
        let (alice, bob) = (PrivateKey::generate(), PrivateKey::generate());
        for (name, key) in [("alice", &alice), ("bob", &bob)] {
            db.put_identity(&IdentityRecord {
                id: Uuid::new_v4(),
                name: name.into(),
                holdings: vec![ShareHolderPublic::new(Uuid::new_v4(), 1, key.public_key())],
            })
            .unwrap();
        }

        let id = db.identity_holding(&bob.public_key()).unwrap().unwrap();
        assert_eq!(db.get_identity(&id).unwrap().unwrap().name, "bob");
        assert_eq!(
            db.identity_holding(&PrivateKey::generate().public_key()).unwrap(),
            None
        );
    }
}
