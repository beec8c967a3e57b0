// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Agora Protocol — Core Library
//!
//! Confidential, sender-anonymous value transfer between the shareholders of
//! a government. A government is an organization whose governance parameters
//! live on a content-addressed history chain; its shareholders can either pay
//! into its treasury in the open, or move value to one another so that the
//! public record never says who sent it.
//!
//! ## Architecture
//!
//! Leaves first:
//!
//! - **crypto** — BLAKE3 content hashing and amount blinding, Ed25519 keys,
//!   SAG ring signatures over the same curve, ring construction.
//! - **error** — builder validation errors shared by every record type.
//! - **government** — governance parameters and their amendment chain.
//! - **identity** — callers, their shareholdings and signing keys.
//! - **transfer** — payments, ring-signed transfers, view sections and
//!   view transfers, each with a validating builder.
//! - **ledger** — a participant's own payment and transfer books.
//! - **storage** — in-memory and sled-backed collaborators.
//! - **orchestrator** — the four operations: payment, view/transfer,
//!   view transfer and receive.
//! - **config** — protocol constants and [`TransferConfig`].
//!
//! ## Lifecycle of a value
//!
//! ```text
//! payment ─────────────────────────────▶ Paid (treasury-bound, final)
//! view ──▶ ViewSection ──(out of band)──▶ receive ──▶ Claimed
//!                 └──────▶ view_transfer ─▶ reassigned to `to`
//! ```
//!
//! ## Design Philosophy
//!
//! 1. Every record is identified by the hash of its own fields.
//! 2. The public record carries owner *hashes*, never ring keys.
//! 3. Fail fast. Ledger writes happen last, so an error leaves nothing behind.

pub mod config;
pub mod crypto;
pub mod error;
pub mod government;
pub mod identity;
pub mod ledger;
pub mod orchestrator;
pub mod storage;
pub mod transfer;

pub use config::TransferConfig;
pub use crypto::{Hash, HashAdapter, PrivateKey, PublicKey};
pub use error::BuilderError;
pub use orchestrator::{TransactionError, TransferOrchestrator};
