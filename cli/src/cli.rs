//! # CLI Interface
//!
//! Command-line structure for `agora` using `clap` derive. Global options
//! select the data directory, logging format and transfer config; each
//! subcommand maps onto one protocol operation or a helper around it.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use uuid::Uuid;

/// Agora shareholder transfer client.
///
/// Pays into government treasuries and moves value between shareholders
/// without revealing the sender on the record. State lives in a local sled
/// database; secret keys are passed per invocation and never stored.
#[derive(Parser, Debug)]
#[command(
    name = "agora",
    about = "Confidential shareholder transfers",
    version,
    propagate_version = true
)]
pub struct AgoraCli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Directory holding the sled database.
    #[arg(long, short = 'd', global = true, env = "AGORA_DATA_DIR", default_value = ".agora")]
    pub data_dir: PathBuf,

    /// JSON file with a transfer config (`ring_size`, `min_hashes_in_owner`).
    #[arg(long, short = 'c', global = true, env = "AGORA_CONFIG")]
    pub config: Option<PathBuf>,

    /// Override the ring size from the config file.
    #[arg(long, global = true, env = "AGORA_RING_SIZE")]
    pub ring_size: Option<usize>,

    /// Log format: `pretty` or `json`.
    #[arg(long, global = true, env = "AGORA_LOG_FORMAT", default_value = "pretty")]
    pub log_format: String,

    /// Identity to act as. Defaults to the one created by `init`.
    #[arg(long, global = true, env = "AGORA_IDENTITY")]
    pub identity: Option<Uuid>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate a fresh key pair and print it.
    Keygen,
    /// Create a government and an identity holding shares in it.
    Init(InitArgs),
    /// Pay into a government's treasury.
    Pay(PayArgs),
    /// Produce a disclosure file for a confidential transfer without
    /// recording anything.
    View(ViewArgs),
    /// Send value to a set of owner hashes and record it.
    Transfer(TransferArgs),
    /// Claim a disclosure file with a recipient key.
    Receive(ReceiveArgs),
    /// Check a disclosure file.
    Verify(VerifyArgs),
    /// Print a government's amendment chain.
    History(HistoryArgs),
    /// Print the identity's payment and transfer ledgers.
    Ledger,
    /// Print version and protocol parameters.
    Version,
}

/// The shareholder's secret key, hex-encoded.
#[derive(Args, Debug, Clone)]
pub struct KeyArg {
    #[arg(long, env = "AGORA_KEY", hide_env_values = true)]
    pub key: String,
}

#[derive(Args, Debug)]
pub struct InitArgs {
    #[command(flatten)]
    pub key: KeyArg,

    /// Display name of the identity.
    #[arg(long)]
    pub name: String,

    /// Shares held by the identity.
    #[arg(long, default_value_t = 10)]
    pub power: u64,

    #[arg(long, default_value_t = 100)]
    pub shares_cap: u64,

    #[arg(long, default_value_t = 51)]
    pub min_power_to_pass_resolution: u64,

    #[arg(long, default_value_t = 1)]
    pub min_power_to_propose: u64,
}

#[derive(Args, Debug)]
pub struct PayArgs {
    #[command(flatten)]
    pub key: KeyArg,

    #[arg(long, short = 'g')]
    pub government: Uuid,

    #[arg(long)]
    pub amount: u64,

    #[arg(long, default_value = "")]
    pub note: String,
}

#[derive(Args, Debug)]
pub struct ViewArgs {
    #[command(flatten)]
    pub key: KeyArg,

    #[arg(long, short = 'g')]
    pub government: Uuid,

    #[arg(long)]
    pub amount: u64,

    /// Blinding seed. Never reuse one for two transfers.
    #[arg(long)]
    pub seed: String,

    /// Where to write the disclosure JSON. Anyone holding the file can
    /// claim the transfer.
    #[arg(long, short = 'o')]
    pub out: PathBuf,
}

#[derive(Args, Debug)]
pub struct TransferArgs {
    #[command(flatten)]
    pub key: KeyArg,

    #[arg(long, short = 'g')]
    pub government: Uuid,

    #[arg(long)]
    pub amount: u64,

    #[arg(long)]
    pub seed: String,

    /// Hex owner hashes of the recipients. Repeatable.
    #[arg(long = "to", required = true)]
    pub to: Vec<String>,

    #[arg(long, default_value = "")]
    pub note: String,

    /// Also write the disclosure JSON here.
    #[arg(long, short = 'o')]
    pub out: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct ReceiveArgs {
    /// Recipient key that will own the claim. The claim is recorded under
    /// the identity holding this key unless `--identity` is given.
    #[command(flatten)]
    pub key: KeyArg,

    /// Disclosure JSON produced by `view` or `transfer --out`.
    #[arg(long)]
    pub section: PathBuf,

    #[arg(long, default_value = "")]
    pub note: String,
}

#[derive(Args, Debug)]
pub struct VerifyArgs {
    #[arg(long)]
    pub section: PathBuf,
}

#[derive(Args, Debug)]
pub struct HistoryArgs {
    #[arg(long, short = 'g')]
    pub government: Uuid,
}
