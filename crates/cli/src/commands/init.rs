//! Initialize ledger command.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use gridledger_chain::{Ledger, LedgerConfig};
use std::fs;
use std::path::PathBuf;

use super::print_block;

#[derive(Args)]
pub struct InitArgs {
    /// Directory to store ledger data
    #[arg(short, long, default_value = "./data")]
    data_dir: PathBuf,

    /// Starting balance for newly registered accounts
    #[arg(short, long, default_value = "1000")]
    initial_balance: f64,
}

pub fn run(args: InitArgs) -> Result<()> {
    println!("{}", "Initializing gridledger...".bold().cyan());
    println!();

    fs::create_dir_all(&args.data_dir)
        .with_context(|| format!("Failed to create data directory: {:?}", args.data_dir))?;

    println!("{}  Created data directory", "✓".green().bold());

    // An existing config wins so that re-running init never changes settings
    let config_file = args.data_dir.join(LedgerConfig::FILE_NAME);
    let config = if config_file.exists() {
        LedgerConfig::load(&config_file).with_context(|| "Failed to read existing config.json")?
    } else {
        let config = LedgerConfig {
            initial_balance: args.initial_balance,
            ..LedgerConfig::default()
        };
        config.validate()?;
        config.save(&config_file)?;
        println!(
            "{}  Saved config to: {}",
            "✓".green().bold(),
            config_file.display().to_string().bright_black()
        );
        config
    };

    let ledger = Ledger::open(&args.data_dir, config).with_context(|| "Failed to open storage")?;
    let created = ledger
        .initialize()
        .with_context(|| "Failed to initialize genesis block")?;
    let genesis = ledger
        .get_block(0)?
        .context("Genesis block missing after initialization")?;

    println!();
    if created {
        println!("{}  Created genesis block", "✓".green().bold());
    } else {
        println!("{}  Genesis block already present", "•".yellow().bold());
    }
    print_block(&genesis);

    println!();
    println!("{}", "Ledger initialized successfully!".green().bold());
    println!();
    println!("Next steps:");
    println!(
        "  • Use {} to create accounts",
        "gridledger account register".bright_cyan()
    );
    println!(
        "  • Use {} to record production",
        "gridledger produce".bright_cyan()
    );
    println!(
        "  • Use {} to explore blocks",
        "gridledger chain list".bright_cyan()
    );

    Ok(())
}
