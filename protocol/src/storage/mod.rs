//! # Storage Module
//!
//! Implementations of the persistence contracts the orchestrator consumes:
//!
//! ```text
//! memory.rs — parking_lot / dashmap arenas, for tests and embedding
//! db.rs     — sled trees with bincode values, for anything that restarts
//! ```
//!
//! Both honour the same ordering rule: concurrent ledger inserts for one
//! identity are serialized, and an insert either lands completely or not at
//! all.
//!
//! Bincode is for storage; JSON is for disclosure files and debugging.

pub mod db;
pub mod memory;

pub use db::{AgoraDb, DbError, IdentityRecord};
pub use memory::{
    MemoryGovernmentRepository, MemoryLedger, MemoryPaymentLedger, MemoryTransferLedger,
    StaticIdentityApp,
};
