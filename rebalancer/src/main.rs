//! CLI entry point for the folio rebalancer.

use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};

use folio::{Price, TargetAllocation, Ticker};
use folio_rebalancer::config::Config;
use folio_rebalancer::error::Error;
use folio_rebalancer::execution::{self, RunOptions};

#[derive(Parser)]
#[command(name = "rebalancer")]
#[command(about = "Portfolio tracker and target-weight rebalancer")]
#[command(version)]
struct Cli {
    /// Path to folio.toml
    #[arg(long, default_value = "folio.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create a new, empty portfolio
    Create {
        id: String,
        name: String,
        /// Starting cash
        #[arg(long, default_value = "0", value_parser = parse_amount)]
        cash: Price,
    },

    /// List stored portfolios
    List,

    /// Show holdings and allocation of a portfolio
    Show {
        id: String,
        /// Holdings shown individually in the allocation breakdown
        #[arg(long)]
        top: Option<usize>,
    },

    /// Add shares of a ticker (merges into an existing holding)
    Add {
        id: String,
        #[arg(value_parser = parse_ticker)]
        ticker: Ticker,
        shares: u64,
        #[arg(value_parser = parse_price)]
        avg_buy_price: Price,
        /// Current market price (defaults to the buy price)
        #[arg(long, value_parser = parse_price)]
        price: Option<Price>,
        /// Display name
        #[arg(long)]
        name: Option<String>,
    },

    /// Remove a holding
    Remove {
        id: String,
        #[arg(value_parser = parse_ticker)]
        ticker: Ticker,
    },

    /// Add cash
    Deposit {
        id: String,
        #[arg(value_parser = parse_amount)]
        amount: Price,
    },

    /// Take out cash
    Withdraw {
        id: String,
        #[arg(value_parser = parse_amount)]
        amount: Price,
    },

    /// Refresh current prices from a Ticker,Price CSV
    Prices { id: String, prices: PathBuf },

    /// Compute a plan toward a target CSV, confirm, and apply it
    Rebalance {
        id: String,
        /// Path to target.csv (Ticker, Weightage columns)
        target: PathBuf,

        /// Ticker,Price CSV overriding stored prices
        #[arg(long)]
        prices: Option<PathBuf>,

        /// Show plan without applying
        #[arg(long)]
        dry_run: bool,

        /// Skip confirmation prompt (for automation/cron)
        #[arg(long)]
        force: bool,
    },

    /// Compare holdings vs target
    Reconcile {
        id: String,
        /// Path to target.csv
        target: PathBuf,

        /// Ticker,Price CSV overriding stored prices
        #[arg(long)]
        prices: Option<PathBuf>,
    },
}

fn parse_amount(s: &str) -> Result<Price, String> {
    match Price::parse_decimal(s) {
        Some(p) if p.0 >= 0 => Ok(p),
        _ => Err(format!("invalid amount {s:?}: expected a non-negative number")),
    }
}

fn parse_price(s: &str) -> Result<Price, String> {
    match Price::parse_decimal(s) {
        Some(p) if p.is_positive() => Ok(p),
        _ => Err(format!("invalid price {s:?}: expected a number > 0")),
    }
}

fn parse_ticker(s: &str) -> Result<Ticker, String> {
    Ticker::try_new(s).ok_or_else(|| format!("invalid ticker {s:?}"))
}

fn load_target(path: &Path) -> TargetAllocation {
    match TargetAllocation::load(path) {
        Ok(t) => t,
        Err(e) => {
            eprintln!("Error loading target: {e}");
            process::exit(1);
        }
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_secs()
        .init();

    let cli = Cli::parse();

    let config = match Config::load_or_default(&cli.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error loading config: {e}");
            process::exit(1);
        }
    };

    let result = match cli.command {
        Command::Create { id, name, cash } => execution::create(&config, &id, &name, cash),
        Command::List => execution::list(&config),
        Command::Show { id, top } => execution::show(&config, &id, top),
        Command::Add {
            id,
            ticker,
            shares,
            avg_buy_price,
            price,
            name,
        } => execution::add(
            &config,
            &id,
            ticker,
            shares,
            avg_buy_price,
            price,
            name.as_deref(),
        ),
        Command::Remove { id, ticker } => execution::remove(&config, &id, ticker),
        Command::Deposit { id, amount } => execution::adjust_cash(&config, &id, amount.0),
        Command::Withdraw { id, amount } => execution::adjust_cash(&config, &id, -amount.0),
        Command::Prices { id, prices } => execution::refresh_prices(&config, &id, &prices),
        Command::Rebalance {
            id,
            target,
            prices,
            dry_run,
            force,
        } => {
            let targets = load_target(&target);
            let opts = RunOptions {
                dry_run,
                force,
                target_file: target.display().to_string(),
                prices_file: prices,
            };
            execution::run(&config, &id, &targets, &opts).map(|_| ())
        }
        Command::Reconcile { id, target, prices } => {
            let targets = load_target(&target);
            execution::run_reconcile(&config, &id, &targets, prices.as_deref()).map(|_| ())
        }
    };

    if let Err(e) = result {
        match &e {
            Error::Aborted(msg) => {
                eprintln!("{msg}");
                process::exit(0);
            }
            _ => {
                eprintln!("Error: {e}");
                process::exit(1);
            }
        }
    }
}
