//! Market commands: production, purchases and fund movements.

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use gridledger_chain::Ledger;
use gridledger_core::{Block, Entry};
use std::path::PathBuf;

use super::{open_ledger, print_block};

#[derive(Args)]
pub struct ProduceArgs {
    /// Directory to store ledger data
    #[arg(short, long, default_value = "./data")]
    data_dir: PathBuf,

    /// Producing account
    username: String,

    /// Energy produced, minted one token per unit
    energy: f64,
}

#[derive(Args)]
pub struct BuyArgs {
    /// Directory to store ledger data
    #[arg(short, long, default_value = "./data")]
    data_dir: PathBuf,

    /// Buying account
    buyer: String,

    /// Selling account
    seller: String,

    /// Number of tokens to buy
    tokens: f64,
}

#[derive(Args)]
pub struct FundsArgs {
    /// Directory to store ledger data
    #[arg(short, long, default_value = "./data")]
    data_dir: PathBuf,

    /// Account name
    username: String,

    /// Amount of currency
    amount: f64,
}

pub fn produce(args: ProduceArgs) -> Result<()> {
    let ledger = open_ledger(&args.data_dir)?;
    let block = ledger.produce(&args.username, args.energy)?;
    report(&ledger, &block, &args.username)
}

pub fn buy(args: BuyArgs) -> Result<()> {
    let ledger = open_ledger(&args.data_dir)?;

    // This process has not seen earlier trades, so price off the chain
    let price = ledger.replay_market()?.current();
    println!(
        "  Market price: {}",
        format!("{:.4}", price).bright_cyan()
    );

    let entry = Entry::transfer(&args.seller, &args.buyer, args.tokens, price);
    let block = ledger.append(entry)?;
    report(&ledger, &block, &args.buyer)
}

pub fn deposit(args: FundsArgs) -> Result<()> {
    let ledger = open_ledger(&args.data_dir)?;
    let block = ledger.deposit(&args.username, args.amount)?;
    report(&ledger, &block, &args.username)
}

pub fn withdraw(args: FundsArgs) -> Result<()> {
    let ledger = open_ledger(&args.data_dir)?;
    let block = ledger.withdraw(&args.username, args.amount)?;
    report(&ledger, &block, &args.username)
}

fn report(ledger: &Ledger, block: &Block, username: &str) -> Result<()> {
    let account = ledger.get_account(username)?;

    println!();
    println!("{}  Appended block", "✓".green().bold());
    print_block(block);
    println!();
    println!(
        "  {} tokens={} balance={}",
        account.username.bright_yellow(),
        account.tokens.to_string().bright_cyan(),
        account.balance.to_string().bright_cyan()
    );
    println!();

    Ok(())
}
