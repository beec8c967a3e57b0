//! Terminal walkthrough of one value's lifecycle in Agora.
//!
//! Creates a government with two shareholders, pays into the treasury, sends
//! a confidential transfer, hands the disclosure to a recipient who claims
//! it, and shows what the public record does and does not reveal.
//!
//! Run with:
//!   cargo run --example demo --release

use std::sync::Arc;
use std::time::Instant;

use uuid::Uuid;

use agora_protocol::config::TransferConfig;
use agora_protocol::crypto::hash::{blind_amount, Blake3Adapter, HashAdapter};
use agora_protocol::crypto::keys::PrivateKey;
use agora_protocol::government::{GovernmentBuilder, GovernmentContentBuilder, GovernmentRepository};
use agora_protocol::identity::{Identity, ShareHolder, ShareHolders};
use agora_protocol::orchestrator::TransferOrchestrator;
use agora_protocol::storage::{
    MemoryGovernmentRepository, MemoryPaymentLedger, MemoryTransferLedger, StaticIdentityApp,
};

// ---------------------------------------------------------------------------
// ANSI color constants
// ---------------------------------------------------------------------------

const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";

const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";
const MAGENTA: &str = "\x1b[35m";
const CYAN: &str = "\x1b[36m";
const WHITE: &str = "\x1b[37m";

// ---------------------------------------------------------------------------
// Display helpers
// ---------------------------------------------------------------------------

fn step(num: u32, title: &str) {
    println!();
    println!("{BOLD}{CYAN}===[{YELLOW} Step {num} {CYAN}]============================================={RESET}");
    println!("{BOLD}{WHITE}  {title}{RESET}");
}

fn success(text: &str) {
    println!("{GREEN}  [OK] {text}{RESET}");
}

fn info(label: &str, value: impl std::fmt::Display) {
    println!("{WHITE}  {BOLD}{label}:{RESET} {YELLOW}{value}{RESET}");
}

fn timing(label: &str, elapsed: std::time::Duration) {
    let ms = elapsed.as_secs_f64() * 1000.0;
    println!("{DIM}{MAGENTA}  [{label}: {ms:.2} ms]{RESET}");
}

fn main() {
    println!("{BOLD}{WHITE}AGORA PROTOCOL  --  confidential shareholder transfers{RESET}");

    step(1, "Found a government");
    let governments = Arc::new(MemoryGovernmentRepository::new());
    let gov_id = Uuid::new_v4();
    let content = GovernmentContentBuilder::new()
        .chain(Uuid::new_v4())
        .min_power_to_pass_resolution(51)
        .min_power_to_propose(5)
        .shares_cap(100)
        .build()
        .expect("valid government content");
    let government = GovernmentBuilder::new()
        .id(gov_id)
        .current(content)
        .build()
        .expect("valid government");
    governments.save(&government).expect("save government");
    info("government", gov_id);
    info("head hash", government.hash());

    step(2, "Seat two shareholders");
    let alice_key = PrivateKey::generate();
    let bob_key = PrivateKey::generate();
    let alice = Identity::new(
        Uuid::new_v4(),
        "alice",
        ShareHolders::new(vec![ShareHolder::new(gov_id, 40, alice_key.clone())]),
    );
    let bob = Identity::new(
        Uuid::new_v4(),
        "bob",
        ShareHolders::new(vec![ShareHolder::new(gov_id, 25, bob_key.clone())]),
    );
    info("alice", alice_key.public_key().to_base58());
    info("bob", bob_key.public_key().to_base58());

    let identities = Arc::new(StaticIdentityApp::new(alice.clone()));
    let payments = MemoryPaymentLedger::shared();
    let transfers = MemoryTransferLedger::shared();
    let orchestrator = TransferOrchestrator::builder()
        .governments(governments)
        .identities(identities.clone())
        .payments(payments.clone())
        .transfers(transfers.clone())
        .config(TransferConfig::default())
        .build()
        .expect("orchestrator");

    step(3, "Alice pays dues into the treasury");
    let start = Instant::now();
    let paid = orchestrator
        .payment(&gov_id, 100, "annual dues")
        .expect("payment");
    timing("payment", start.elapsed());
    success(&format!("payment {} signed by alice, verifies={}", paid.hash(), paid.payment().verify()));

    step(4, "Alice sends 50 to bob, confidentially");
    let start = Instant::now();
    let section = orchestrator.view(&gov_id, 50, "alice->bob #1").expect("view");
    timing("view (ring sign)", start.elapsed());
    let public = section.transfer().content();
    info("ring size", public.owners().len());
    info("blinded amount", public.blinded_amount());
    info(
        "alice's key in owners?",
        public
            .owners()
            .contains(&Blake3Adapter.from_bytes(alice_key.public_key().as_bytes())),
    );
    println!("{DIM}  The record shows one of {} owners signed; not which.{RESET}", public.owners().len());

    step(5, "Bob opens the disclosure and claims it");
    identities.login(bob.clone());
    let opened = blind_amount(&Blake3Adapter, section.seed(), section.amount()) == public.blinded_amount();
    info("commitment opens", opened);
    let start = Instant::now();
    let claim = orchestrator.receive(&section, &bob_key, "from alice").expect("receive");
    timing("receive (ring sign)", start.elapsed());
    success(&format!(
        "claim {} reassigned to {} owner hashes, verifies={}",
        claim.hash(),
        claim.transfer().content().new_owner().len(),
        claim.transfer().verify(&Blake3Adapter)
    ));

    step(6, "Books");
    info("payments", payments.total());
    info("transfers", transfers.total());
}
