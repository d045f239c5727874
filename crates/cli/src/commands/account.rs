//! Account management command.

use anyhow::Result;
use clap::{Args, Subcommand};
use colored::Colorize;
use gridledger_core::{Account, Role};
use std::path::PathBuf;

use super::open_ledger;

#[derive(Args)]
pub struct AccountArgs {
    #[command(subcommand)]
    command: AccountCommand,
}

#[derive(Subcommand)]
enum AccountCommand {
    /// Register a new account
    Register {
        /// Directory to store ledger data
        #[arg(short, long, default_value = "./data")]
        data_dir: PathBuf,

        /// Unique account name
        username: String,

        /// Account role (producer or buyer)
        #[arg(short, long, default_value = "buyer")]
        role: Role,
    },
    /// Show account information
    Show {
        /// Directory to store ledger data
        #[arg(short, long, default_value = "./data")]
        data_dir: PathBuf,

        /// Account name
        username: String,
    },
    /// List all accounts
    List {
        /// Directory to store ledger data
        #[arg(short, long, default_value = "./data")]
        data_dir: PathBuf,
    },
}

pub fn run(args: AccountArgs) -> Result<()> {
    match args.command {
        AccountCommand::Register {
            data_dir,
            username,
            role,
        } => register(data_dir, username, role),
        AccountCommand::Show { data_dir, username } => show(data_dir, username),
        AccountCommand::List { data_dir } => list(data_dir),
    }
}

fn register(data_dir: PathBuf, username: String, role: Role) -> Result<()> {
    let ledger = open_ledger(&data_dir)?;
    let account = ledger.register(&username, role)?;

    println!();
    println!(
        "{}  Registered {} as {}",
        "✓".green().bold(),
        account.username.bright_yellow(),
        account.role.to_string().bright_cyan()
    );
    println!(
        "    Balance: {}",
        account.balance.to_string().bright_cyan()
    );
    println!();

    Ok(())
}

fn show(data_dir: PathBuf, username: String) -> Result<()> {
    let ledger = open_ledger(&data_dir)?;
    let account = ledger.get_account(&username)?;

    println!();
    println!("{}", "Account Information:".bold().cyan());
    println!();
    println!("  Username: {}", account.username.bright_yellow());
    println!("  Role:     {}", account.role.to_string().bright_cyan());
    println!("  Tokens:   {}", account.tokens.to_string().bright_cyan());
    println!("  Balance:  {}", account.balance.to_string().bright_cyan());
    println!();

    Ok(())
}

fn list(data_dir: PathBuf) -> Result<()> {
    let ledger = open_ledger(&data_dir)?;
    let accounts = ledger.list_accounts()?;

    if accounts.is_empty() {
        println!("{}", "No accounts found.".yellow());
        println!(
            "Use {} to create one.",
            "gridledger account register".bright_cyan()
        );
        return Ok(());
    }

    println!("{}", "Accounts:".bold().cyan());
    println!();
    for account in &accounts {
        print_account_line(account);
    }
    println!();

    Ok(())
}

fn print_account_line(account: &Account) {
    println!(
        "  {} {} tokens={} balance={}",
        account.username.bright_yellow(),
        format!("({})", account.role).bright_black(),
        account.tokens.to_string().bright_cyan(),
        account.balance.to_string().bright_cyan()
    );
}
