//! CLI commands module.

use anyhow::{Context, Result};
use chrono::DateTime;
use clap::Subcommand;
use colored::Colorize;
use gridledger_chain::{Ledger, LedgerConfig};
use gridledger_core::{Block, Entry};
use std::path::Path;

mod account;
mod chain;
mod init;
mod market;
mod price;

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new ledger
    Init(init::InitArgs),
    /// Account management
    Account(account::AccountArgs),
    /// Record energy produced by an account
    Produce(market::ProduceArgs),
    /// Buy tokens from a producer at the market price
    Buy(market::BuyArgs),
    /// Add funds to an account
    Deposit(market::FundsArgs),
    /// Withdraw funds from an account
    Withdraw(market::FundsArgs),
    /// Chain inspection
    Chain(chain::ChainArgs),
    /// Show the market price
    Price(price::PriceArgs),
}

pub fn run(cmd: Commands) -> Result<()> {
    match cmd {
        Commands::Init(args) => init::run(args),
        Commands::Account(args) => account::run(args),
        Commands::Produce(args) => market::produce(args),
        Commands::Buy(args) => market::buy(args),
        Commands::Deposit(args) => market::deposit(args),
        Commands::Withdraw(args) => market::withdraw(args),
        Commands::Chain(args) => chain::run(args),
        Commands::Price(args) => price::run(args),
    }
}

/// Open the ledger in `data_dir` with the config written by `init`.
fn open_ledger(data_dir: &Path) -> Result<Ledger> {
    let config = LedgerConfig::load(data_dir.join(LedgerConfig::FILE_NAME))
        .with_context(|| "Failed to read config.json. Did you run 'gridledger init'?")?;

    Ledger::open(data_dir, config)
        .with_context(|| "Failed to open storage. Did you run 'gridledger init'?")
}

fn format_timestamp(timestamp: f64) -> String {
    DateTime::from_timestamp_millis((timestamp * 1000.0) as i64)
        .map(|t| t.format("%Y-%m-%d %H:%M:%S%.3f UTC").to_string())
        .unwrap_or_else(|| timestamp.to_string())
}

fn describe_entry(entry: &Entry) -> String {
    match entry {
        Entry::Genesis => "genesis".to_string(),
        Entry::Production { username, energy } => {
            format!("{} produced {}", username, energy)
        }
        Entry::Transfer {
            sender,
            recipient,
            tokens,
            price,
        } => format!(
            "{} sold {} tokens to {} at {} ({} total)",
            sender,
            tokens,
            recipient,
            price,
            tokens * price
        ),
        Entry::Deposit { username, amount } => format!("{} deposited {}", username, amount),
        Entry::Withdrawal { username, amount } => format!("{} withdrew {}", username, amount),
    }
}

/// One-line block summary, as used in listings.
fn print_block_line(block: &Block) {
    println!(
        "  {} {} {} {}",
        format!("#{}", block.index).bright_black(),
        block.hash.to_hex()[..16].bright_yellow(),
        format!("[{}]", block.payload.kind()).bright_cyan(),
        describe_entry(&block.payload)
    );
}

fn print_block(block: &Block) {
    println!("    Index:     {}", block.index.to_string().bright_cyan());
    println!("    Hash:      {}", block.hash.to_hex().bright_yellow());
    println!("    Prev Hash: {}", block.prev_hash.link().bright_black());
    println!(
        "    Timestamp: {}",
        format_timestamp(block.timestamp).bright_black()
    );
    println!("    Entry:     {}", describe_entry(&block.payload));
}
