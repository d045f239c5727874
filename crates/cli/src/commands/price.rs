//! Market price command.

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use std::path::PathBuf;

use super::open_ledger;

#[derive(Args)]
pub struct PriceArgs {
    /// Directory to store ledger data
    #[arg(short, long, default_value = "./data")]
    data_dir: PathBuf,
}

pub fn run(args: PriceArgs) -> Result<()> {
    let ledger = open_ledger(&args.data_dir)?;
    let market = ledger.replay_market()?;
    let config = market.config();

    println!();
    println!("{}", "Market Price:".bold().cyan());
    println!();
    println!(
        "  Current: {}",
        format!("{:.4}", market.current()).bright_yellow()
    );
    println!(
        "  Band:    {}",
        format!("[{}, {}]", config.floor, config.ceiling).bright_black()
    );
    println!();

    println!("{}", "Recent Prices:".bold());
    println!();
    for point in market.history() {
        println!(
            "  {} {}",
            point.time.format("%Y-%m-%d %H:%M:%S").to_string().bright_black(),
            format!("{:.4}", point.price).bright_cyan()
        );
    }
    println!();
    println!(
        "{}",
        "Replayed from the chain; times are block times.".bright_black()
    );

    Ok(())
}
