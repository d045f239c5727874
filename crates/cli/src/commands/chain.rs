//! Chain inspection command.

use anyhow::Result;
use clap::{Args, Subcommand};
use colored::Colorize;
use std::path::PathBuf;

use super::{open_ledger, print_block_line};

#[derive(Args)]
pub struct ChainArgs {
    #[command(subcommand)]
    command: ChainCommand,
}

#[derive(Subcommand)]
enum ChainCommand {
    /// List recent blocks
    List {
        /// Directory to store ledger data
        #[arg(short, long, default_value = "./data")]
        data_dir: PathBuf,

        /// Number of blocks to show
        #[arg(short, long, default_value = "10")]
        count: usize,
    },
    /// List recent blocks involving an account
    History {
        /// Directory to store ledger data
        #[arg(short, long, default_value = "./data")]
        data_dir: PathBuf,

        /// Account name
        username: String,

        /// Number of blocks to show
        #[arg(short, long, default_value = "10")]
        count: usize,
    },
    /// Re-hash every block and check the links between them
    Verify {
        /// Directory to store ledger data
        #[arg(short, long, default_value = "./data")]
        data_dir: PathBuf,
    },
}

pub fn run(args: ChainArgs) -> Result<()> {
    match args.command {
        ChainCommand::List { data_dir, count } => list_blocks(data_dir, count),
        ChainCommand::History {
            data_dir,
            username,
            count,
        } => history(data_dir, username, count),
        ChainCommand::Verify { data_dir } => verify(data_dir),
    }
}

fn list_blocks(data_dir: PathBuf, count: usize) -> Result<()> {
    let ledger = open_ledger(&data_dir)?;
    let blocks = ledger.chain_tail(count)?;

    println!();
    println!("{}", "Recent Blocks:".bold().cyan());
    println!();
    if blocks.is_empty() {
        println!("  {}", "No blocks yet.".yellow());
    }
    for block in &blocks {
        print_block_line(block);
    }
    println!();

    Ok(())
}

fn history(data_dir: PathBuf, username: String, count: usize) -> Result<()> {
    let ledger = open_ledger(&data_dir)?;
    let blocks = ledger.history(&username, count)?;

    println!();
    println!(
        "{} {}",
        "History for".bold().cyan(),
        username.bright_yellow()
    );
    println!();
    if blocks.is_empty() {
        println!("  {}", "No entries.".yellow());
    }
    for block in &blocks {
        print_block_line(block);
    }
    println!();

    Ok(())
}

fn verify(data_dir: PathBuf) -> Result<()> {
    let ledger = open_ledger(&data_dir)?;

    println!("{}", "Verifying chain...".bold().cyan());
    let report = ledger.verify_chain()?;

    println!();
    println!(
        "{}  Chain is valid ({} blocks)",
        "✓".green().bold(),
        report.length.to_string().bright_cyan()
    );
    if let Some(tip) = report.tip {
        println!("    Tip: #{} {}", tip.index, tip.hash.to_hex().bright_yellow());
    }
    println!();

    Ok(())
}
