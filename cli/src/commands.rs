//! Subcommand handlers.
//!
//! Each handler returns what it produced so `main` can print it and tests
//! can inspect it. All state goes through [`App`], which owns the database
//! handle and the resolved transfer config.

use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use uuid::Uuid;

use agora_protocol::config::{self, TransferConfig};
use agora_protocol::crypto::hash::{Blake3Adapter, Hash};
use agora_protocol::crypto::keys::PrivateKey;
use agora_protocol::government::{
    history as government_history, Government, GovernmentBuilder, GovernmentContentBuilder,
    GovernmentRepository,
};
use agora_protocol::identity::ShareHolderPublic;
use agora_protocol::ledger::{
    IdentityPayment, IdentityPaymentService, IdentityTransfer, IdentityTransferService,
};
use agora_protocol::orchestrator::TransferOrchestrator;
use agora_protocol::storage::db::META_DEFAULT_IDENTITY;
use agora_protocol::storage::{AgoraDb, IdentityRecord, StaticIdentityApp};
use agora_protocol::transfer::ViewSection;

use crate::cli::{
    GlobalArgs, HistoryArgs, InitArgs, PayArgs, ReceiveArgs, TransferArgs, VerifyArgs, ViewArgs,
};

pub struct App {
    db: Arc<AgoraDb>,
    config: TransferConfig,
    identity: Option<Uuid>,
}

impl App {
    pub fn open(global: &GlobalArgs) -> Result<Self> {
        let config = load_config(global)?;
        std::fs::create_dir_all(&global.data_dir).with_context(|| {
            format!("failed to create data directory: {}", global.data_dir.display())
        })?;
        let db = AgoraDb::open(&global.data_dir).with_context(|| {
            format!("failed to open database at {}", global.data_dir.display())
        })?;
        tracing::debug!(path = %global.data_dir.display(), ring_size = config.ring_size, "database opened");

        Ok(Self {
            db: Arc::new(db),
            config,
            identity: global.identity,
        })
    }

    pub fn flush(&self) -> Result<()> {
        self.db.flush().context("failed to flush database")
    }

    fn identity_id(&self) -> Result<Uuid> {
        if let Some(id) = self.identity {
            return Ok(id);
        }
        let bytes = self
            .db
            .get_meta(META_DEFAULT_IDENTITY)?
            .context("no identity selected; run `agora init` or pass --identity")?;
        Uuid::from_slice(&bytes).context("corrupt default identity id")
    }

    /// Orchestrator acting as the selected identity, unlocked with `key`.
    fn orchestrator(&self, key: &PrivateKey) -> Result<TransferOrchestrator> {
        let id = self.identity_id()?;
        self.orchestrator_for(&id, key)
    }

    /// `--identity` when given, otherwise the identity holding `key`. The
    /// default identity is never used, so a claim can't land in someone
    /// else's books.
    fn recipient_id(&self, key: &PrivateKey) -> Result<Uuid> {
        if let Some(id) = self.identity {
            return Ok(id);
        }
        self.db
            .identity_holding(&key.public_key())?
            .context("no identity holds this key; run `agora init` with it or pass --identity")
    }

    fn orchestrator_for(&self, id: &Uuid, key: &PrivateKey) -> Result<TransferOrchestrator> {
        let identity = self
            .db
            .unlock(id, std::slice::from_ref(key))
            .with_context(|| format!("failed to load identity {id}"))?;

        let orchestrator = TransferOrchestrator::builder()
            .governments(self.db.clone())
            .identities(Arc::new(StaticIdentityApp::new(identity)))
            .payments(self.db.clone())
            .transfers(self.db.clone())
            .config(self.config)
            .build()?;
        Ok(orchestrator)
    }
}

/// Config file first, then the `--ring-size` override, then validation.
pub fn load_config(global: &GlobalArgs) -> Result<TransferConfig> {
    let mut config = match &global.config {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read config {}", path.display()))?;
            TransferConfig::from_json_str(&raw)
                .with_context(|| format!("invalid config {}", path.display()))?
        }
        None => TransferConfig::default(),
    };
    if let Some(ring_size) = global.ring_size {
        config.ring_size = ring_size;
    }
    config.validate()?;
    Ok(config)
}

pub fn parse_key(hex_key: &str) -> Result<PrivateKey> {
    PrivateKey::from_hex(hex_key.trim()).context("invalid secret key (expected 64 hex chars)")
}

fn parse_owner(hex_hash: &str) -> Result<Hash> {
    Hash::from_hex(hex_hash.trim()).with_context(|| format!("invalid owner hash {hex_hash}"))
}

pub fn read_section(path: &Path) -> Result<ViewSection> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("{} is not a view section", path.display()))
}

fn write_section(path: &Path, section: &ViewSection) -> Result<()> {
    let json = serde_json::to_string_pretty(section)?;
    std::fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

pub fn keygen() -> PrivateKey {
    PrivateKey::generate()
}

/// `(label, value)` pairs printed by `agora version`.
pub fn version() -> Vec<(&'static str, &'static str)> {
    vec![
        ("agora", env!("CARGO_PKG_VERSION")),
        ("protocol", config::PROTOCOL_VERSION),
        ("hash", config::PRIMARY_HASH_FUNCTION),
        ("signing", config::SIGNING_ALGORITHM),
        ("ring", config::RING_SIGNING_ALGORITHM),
    ]
}

/// Create a government and give the selected identity (or a new one) a
/// shareholding in it. Returns `(government id, identity id)`.
pub fn init(app: &App, args: &InitArgs) -> Result<(Uuid, Uuid)> {
    let key = parse_key(&args.key.key)?;

    let content = GovernmentContentBuilder::new()
        .chain(Uuid::new_v4())
        .min_power_to_pass_resolution(args.min_power_to_pass_resolution)
        .min_power_to_propose(args.min_power_to_propose)
        .shares_cap(args.shares_cap)
        .build()?;
    if args.power > args.shares_cap {
        bail!("power {} exceeds the shares cap {}", args.power, args.shares_cap);
    }
    let government = GovernmentBuilder::new()
        .id(Uuid::new_v4())
        .current(content)
        .build()?;
    app.db.save(&government)?;

    let holding = ShareHolderPublic::new(government.id(), args.power, key.public_key());
    let record = match app.identity {
        Some(id) => {
            let mut record = app
                .db
                .get_identity(&id)?
                .with_context(|| format!("unknown identity {id}"))?;
            record.holdings.push(holding);
            record
        }
        None => IdentityRecord {
            id: Uuid::new_v4(),
            name: args.name.clone(),
            holdings: vec![holding],
        },
    };
    app.db.put_identity(&record)?;
    if app.db.get_meta(META_DEFAULT_IDENTITY)?.is_none() {
        app.db.set_meta(META_DEFAULT_IDENTITY, record.id.as_bytes())?;
    }

    tracing::info!(government = %government.id(), identity = %record.id, "government initialized");
    Ok((government.id(), record.id))
}

pub fn pay(app: &App, args: &PayArgs) -> Result<IdentityPayment> {
    let key = parse_key(&args.key.key)?;
    let entry = app
        .orchestrator(&key)?
        .payment(&args.government, args.amount, &args.note)?;
    Ok(entry)
}

pub fn view(app: &App, args: &ViewArgs) -> Result<ViewSection> {
    let key = parse_key(&args.key.key)?;
    let section = app
        .orchestrator(&key)?
        .view(&args.government, args.amount, &args.seed)?;
    write_section(&args.out, &section)?;
    Ok(section)
}

pub fn transfer(app: &App, args: &TransferArgs) -> Result<IdentityTransfer> {
    let key = parse_key(&args.key.key)?;
    let to = args
        .to
        .iter()
        .map(|h| parse_owner(h))
        .collect::<Result<Vec<_>>>()?;
    let entry = app.orchestrator(&key)?.transfer(
        &args.government,
        args.amount,
        &args.seed,
        &to,
        &args.note,
    )?;
    if let Some(out) = &args.out {
        write_section(out, entry.transfer().content().section())?;
    }
    Ok(entry)
}

/// Files the claim under the identity holding `--key`, or under
/// `--identity` when given.
pub fn receive(app: &App, args: &ReceiveArgs) -> Result<IdentityTransfer> {
    let key = parse_key(&args.key.key)?;
    let section = read_section(&args.section)?;
    let recipient = app.recipient_id(&key)?;
    let entry = app
        .orchestrator_for(&recipient, &key)?
        .receive(&section, &key, &args.note)?;
    Ok(entry)
}

/// Returns the section when it verifies.
pub fn verify(args: &VerifyArgs) -> Result<ViewSection> {
    let section = read_section(&args.section)?;
    if !section.verify(&Blake3Adapter) {
        bail!("view section {} does not verify", section.hash());
    }
    Ok(section)
}

pub fn history(app: &App, args: &HistoryArgs) -> Result<Vec<Government>> {
    Ok(government_history(app.db.as_ref(), &args.government)?)
}

pub fn ledger(app: &App) -> Result<(Vec<IdentityPayment>, Vec<IdentityTransfer>)> {
    let id = app.identity_id()?;
    let payments = IdentityPaymentService::list(app.db.as_ref(), &id)?;
    let transfers = IdentityTransferService::list(app.db.as_ref(), &id)?;
    Ok((payments, transfers))
}
