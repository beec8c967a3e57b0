// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Agora CLI
//!
//! Entry point for the `agora` binary. Parses arguments, initializes logging,
//! opens the local database and dispatches to a subcommand handler.
//!
//! Secret keys are supplied per call through `--key` / `AGORA_KEY` and are
//! never written to disk.

mod cli;
mod commands;
mod logging;

use anyhow::Result;
use clap::Parser;

use cli::{AgoraCli, Commands};
use commands::App;
use logging::LogFormat;

fn main() -> Result<()> {
    let cli = AgoraCli::parse();
    logging::init_logging(
        logging::DEFAULT_FILTER,
        LogFormat::from_str_lossy(&cli.global.log_format),
    );

    match &cli.command {
        Commands::Keygen => {
            let key = commands::keygen();
            println!("secret key : {}", key.to_hex());
            println!("public key : {}", key.public_key().to_hex());
            println!("base58     : {}", key.public_key().to_base58());
            Ok(())
        }
        Commands::Version => {
            for (label, value) in commands::version() {
                println!("{label:<9} {value}");
            }
            Ok(())
        }
        Commands::Verify(args) => {
            let section = commands::verify(args)?;
            println!("valid view section {}", section.hash());
            println!("  transfer : {}", section.transfer().hash());
            println!("  origin   : {}", section.origin().to_hex());
            println!("  amount   : {}", section.amount());
            Ok(())
        }
        command => {
            let app = App::open(&cli.global)?;
            run(&app, command)?;
            app.flush()
        }
    }
}

fn run(app: &App, command: &Commands) -> Result<()> {
    match command {
        Commands::Init(args) => {
            let (government, identity) = commands::init(app, args)?;
            println!("Government initialized.");
            println!("  Government : {government}");
            println!("  Identity   : {identity}");
        }
        Commands::Pay(args) => {
            let entry = commands::pay(app, args)?;
            println!("payment {} recorded", entry.hash());
        }
        Commands::View(args) => {
            let section = commands::view(app, args)?;
            println!("view section {} written to {}", section.hash(), args.out.display());
        }
        Commands::Transfer(args) => {
            let entry = commands::transfer(app, args)?;
            println!("transfer {} recorded", entry.hash());
            if let Some(out) = &args.out {
                println!("disclosure written to {}", out.display());
            }
        }
        Commands::Receive(args) => {
            let entry = commands::receive(app, args)?;
            println!("claim {} recorded", entry.hash());
            for owner in entry.transfer().content().new_owner() {
                println!("  owner {owner}");
            }
        }
        Commands::History(args) => {
            for (depth, government) in commands::history(app, args)?.iter().enumerate() {
                let current = government.current();
                println!(
                    "#{depth} {} cap={} pass={} propose={} created={}",
                    government.hash(),
                    current.shares_cap(),
                    current.min_power_to_pass_resolution(),
                    current.min_power_to_propose(),
                    current.created_on().to_rfc3339(),
                );
            }
        }
        Commands::Ledger => {
            let (payments, transfers) = commands::ledger(app)?;
            println!("payments ({}):", payments.len());
            for p in &payments {
                println!(
                    "  {} amount={} note={:?}",
                    p.hash(),
                    p.payment().content().amount(),
                    p.note()
                );
            }
            println!("transfers ({}):", transfers.len());
            for t in &transfers {
                println!(
                    "  {} owners={} note={:?}",
                    t.hash(),
                    t.transfer().content().new_owner().len(),
                    t.note()
                );
            }
        }
        // No database needed; handled in `main`.
        Commands::Keygen | Commands::Verify(_) | Commands::Version => {}
    }
    Ok(())
}
