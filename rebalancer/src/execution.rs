//! Command orchestration: load → change → confirm → save → audit.
//!
//! Each public function backs one CLI subcommand.

use std::path::{Path, PathBuf};

use folio::{
    compute_plan, load_prices, merge_prices, Portfolio, Price, RebalancePlan, TargetAllocation,
    Ticker,
};
use log::{debug, info, warn};

use crate::audit::{self, AuditLog};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::reconcile;
use crate::store::Store;

/// Options for a rebalance run.
pub struct RunOptions {
    pub dry_run: bool,
    pub force: bool,
    pub target_file: String,
    /// Optional price table overriding every other price source
    pub prices_file: Option<PathBuf>,
}

/// What a rebalance run ended with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Portfolio already at target; nothing to do
    NoChange,
    /// Plan shown, portfolio untouched
    DryRun(RebalancePlan),
    /// User declined the plan
    Declined(RebalancePlan),
    /// Plan applied and saved
    Applied(RebalancePlan),
}

fn open_store(config: &Config) -> Store {
    Store::new(config.store_dir())
}

fn open_audit(config: &Config) -> Result<AuditLog> {
    AuditLog::open(&config.audit_path())
}

/// Create and store a new portfolio.
pub fn create(config: &Config, id: &str, name: &str, cash: Price) -> Result<()> {
    let store = open_store(config);
    let portfolio = Portfolio::new(id, name, cash.0)?;
    store.create(&portfolio)?;

    let mut audit = open_audit(config)?;
    audit::log_portfolio_created(&mut audit, &portfolio)?;

    info!("Created portfolio {}", portfolio.id());
    println!(
        "Created {} ({}) with {} cash",
        portfolio.id(),
        portfolio.name(),
        config.money(portfolio.cash())
    );
    Ok(())
}

/// Print one summary card per stored portfolio.
pub fn list(config: &Config) -> Result<()> {
    let portfolios = open_store(config).list()?;
    if portfolios.is_empty() {
        println!("No portfolios in {}.", config.store.dir);
        return Ok(());
    }

    println!(
        "  {:16} {:30} {:>16} {:>16} {:>9} {:>8}",
        "ID", "Name", "Value", "Returns", "Return%", "Holdings"
    );
    for p in &portfolios {
        let s = p.summary();
        println!(
            "  {:16} {:30} {:>16} {:>16} {:>+8.2}% {:>8}",
            s.id,
            s.name,
            config.money(s.total_value),
            config.money(s.total_returns),
            s.return_pct,
            s.num_holdings,
        );
    }
    Ok(())
}

/// Print summary, holdings table and allocation breakdown.
pub fn show(config: &Config, id: &str, top: Option<usize>) -> Result<()> {
    let portfolio = open_store(config).load(id)?;
    display_summary(config, &portfolio);
    println!();
    display_holdings(config, &portfolio);
    println!();
    display_allocation(config, &portfolio, top.unwrap_or(config.display.top_holdings));
    Ok(())
}

/// Add shares of a ticker. Without `current_price`, the buy price is used.
pub fn add(
    config: &Config,
    id: &str,
    ticker: Ticker,
    shares: u64,
    avg_buy_price: Price,
    current_price: Option<Price>,
    name: Option<&str>,
) -> Result<()> {
    let store = open_store(config);
    let mut portfolio = store.load(id)?;

    let holding = portfolio
        .add_holding(
            ticker,
            shares,
            avg_buy_price,
            current_price.unwrap_or(avg_buy_price),
        )?
        .clone();
    if let Some(name) = name {
        portfolio.set_holding_name(&ticker, name)?;
    }
    store.save(&portfolio)?;

    let mut audit = open_audit(config)?;
    audit::log_holding_added(&mut audit, portfolio.id(), shares, &holding)?;

    println!(
        "{}: {} now {} shares @ {} avg",
        portfolio.id(),
        holding.ticker,
        holding.shares,
        config.money(holding.avg_buy_price.0)
    );
    Ok(())
}

/// Remove a holding entirely.
pub fn remove(config: &Config, id: &str, ticker: Ticker) -> Result<()> {
    let store = open_store(config);
    let mut portfolio = store.load(id)?;
    let removed = portfolio.remove_holding(&ticker)?;
    store.save(&portfolio)?;

    let mut audit = open_audit(config)?;
    audit::log_holding_removed(&mut audit, portfolio.id(), &removed)?;

    println!(
        "{}: removed {} ({} shares)",
        portfolio.id(),
        removed.ticker,
        removed.shares
    );
    Ok(())
}

/// Add (`delta > 0`) or withdraw (`delta < 0`) cash.
pub fn adjust_cash(config: &Config, id: &str, delta: i64) -> Result<()> {
    let store = open_store(config);
    let mut portfolio = store.load(id)?;
    if delta >= 0 {
        portfolio.deposit(delta)?;
    } else {
        portfolio.withdraw(-delta)?;
    }
    store.save(&portfolio)?;

    let mut audit = open_audit(config)?;
    audit::log_cash_adjusted(&mut audit, portfolio.id(), delta, portfolio.cash())?;

    println!("{}: cash now {}", portfolio.id(), config.money(portfolio.cash()));
    Ok(())
}

/// Refresh current prices from a price table file.
pub fn refresh_prices(config: &Config, id: &str, prices_file: &Path) -> Result<()> {
    let store = open_store(config);
    let mut portfolio = store.load(id)?;
    let quotes = load_prices(prices_file)?;

    let unquoted = portfolio.refresh_prices(&quotes)?;
    store.save(&portfolio)?;

    let updated = portfolio.num_holdings() - unquoted.len();
    let mut audit = open_audit(config)?;
    audit::log_prices_refreshed(&mut audit, portfolio.id(), updated, &unquoted)?;

    for ticker in &unquoted {
        warn!("No quote for {ticker}; keeping last price");
    }
    println!(
        "{}: {updated} prices updated, value now {}",
        portfolio.id(),
        config.money(portfolio.total_value())
    );
    Ok(())
}

/// Build the price lookup for a rebalance.
///
/// Sources, later ones winning: the portfolio's stored current prices, the
/// target table's `Current Price` column, then `overrides`.
pub fn build_price_table(
    portfolio: &Portfolio,
    targets: &TargetAllocation,
    overrides: &[(Ticker, Price)],
) -> Vec<(Ticker, Price)> {
    let stored = portfolio.price_table();
    let quoted = targets.quoted_prices();
    merge_prices(&[&stored[..], &quoted[..], overrides])
}

fn load_overrides(prices_file: Option<&Path>) -> Result<Vec<(Ticker, Price)>> {
    match prices_file {
        Some(path) => {
            let quotes = load_prices(path)?;
            debug!("loaded {} quotes from {}", quotes.len(), path.display());
            Ok(quotes)
        }
        None => Ok(Vec::new()),
    }
}

/// Execute a full rebalance run.
pub fn run(
    config: &Config,
    id: &str,
    targets: &TargetAllocation,
    opts: &RunOptions,
) -> Result<RunOutcome> {
    let store = open_store(config);
    let portfolio = store.load(id)?;

    let mut audit = open_audit(config)?;
    audit::log_run_started(&mut audit, portfolio.id(), &opts.target_file)?;

    display_summary(config, &portfolio);

    // Price lookup: stored → target table → --prices
    let overrides = load_overrides(opts.prices_file.as_deref())?;
    let prices = build_price_table(&portfolio, targets, &overrides);

    let plan = compute_plan(&portfolio.share_counts(), portfolio.cash(), targets, &prices)?;

    if plan.is_empty() {
        println!("\nNo rebalancing needed: portfolio matches target.");
        audit.log_simple("no_rebalance_needed")?;
        return Ok(RunOutcome::NoChange);
    }

    audit::log_plan(&mut audit, portfolio.id(), &plan)?;
    print!("\n{plan}");
    if targets.cash_weight() > 0.0 {
        println!(
            "  Target cash: {:.2}% of {}",
            targets.cash_weight() * 100.0,
            config.money(plan.total_value)
        );
    }
    println!();

    if opts.dry_run {
        println!("[DRY RUN] Portfolio not modified.");
        return Ok(RunOutcome::DryRun(plan));
    }

    if !opts.force {
        let confirmed = dialoguer::Confirm::new()
            .with_prompt("Execute?")
            .default(false)
            .interact()
            .map_err(|e| Error::Aborted(format!("confirmation prompt failed: {e}")))?;

        audit::log_user_confirmed(&mut audit, confirmed)?;
        if !confirmed {
            println!("Aborted.");
            return Ok(RunOutcome::Declined(plan));
        }
    }

    // Apply on a copy so a failure leaves the stored portfolio untouched.
    let mut updated = portfolio.clone();
    updated.refresh_prices(&prices)?;
    updated.apply_plan(&plan)?;
    store.save(&updated)?;
    audit::log_plan_applied(&mut audit, &updated, plan.len())?;

    info!(
        "Applied {} actions to {} ({} sells, {} buys)",
        plan.len(),
        updated.id(),
        plan.sells().count(),
        plan.buys().count()
    );
    println!(
        "Applied {} actions. Cash {} -> {}. Audit logged to {}",
        plan.len(),
        config.money(portfolio.cash()),
        config.money(updated.cash()),
        config.audit_path().display()
    );

    let report = reconcile::reconcile(&updated.share_counts(), updated.cash(), targets, &prices);
    print!("\n{report}");

    Ok(RunOutcome::Applied(plan))
}

/// Print the drift between a stored portfolio and a target allocation.
pub fn run_reconcile(
    config: &Config,
    id: &str,
    targets: &TargetAllocation,
    prices_file: Option<&Path>,
) -> Result<reconcile::ReconcileReport> {
    let portfolio = open_store(config).load(id)?;
    let overrides = load_overrides(prices_file)?;
    let prices = build_price_table(&portfolio, targets, &overrides);

    let report = reconcile::reconcile(&portfolio.share_counts(), portfolio.cash(), targets, &prices);
    print!("{report}");
    Ok(report)
}

// === Display ===

fn display_summary(config: &Config, portfolio: &Portfolio) {
    let s = portfolio.summary();
    println!("{} ({})", s.name, s.id);
    println!(
        "  Value {}  (holdings {}, cash {})",
        config.money(s.total_value),
        config.money(s.market_value),
        config.money(s.cash),
    );
    println!(
        "  Invested {}  Returns {} ({:+.2}%)  Holdings {}",
        config.money(s.total_investment),
        config.money(s.total_returns),
        s.return_pct,
        s.num_holdings,
    );
}

fn display_holdings(config: &Config, portfolio: &Portfolio) {
    if portfolio.num_holdings() == 0 {
        println!("No holdings.");
        return;
    }

    println!("HOLDINGS:");
    println!(
        "  {:12} {:30} {:>12} {:>12} {:>9} {:>9} {:>8} {:>16}",
        "Ticker", "Name", "Price", "Avg Buy", "Returns%", "Weight%", "Shares", "Value"
    );
    for h in portfolio.holdings() {
        println!(
            "  {:12} {:30} {:>12} {:>12} {:>+8.2}% {:>8.2}% {:>8} {:>16}",
            h.ticker,
            h.name,
            config.money(h.current_price.0),
            config.money(h.avg_buy_price.0),
            h.returns_pct(),
            portfolio.weightage(&h.ticker) * 100.0,
            h.shares,
            config.money(h.current_value()),
        );
    }
}

fn display_allocation(config: &Config, portfolio: &Portfolio, top_n: usize) {
    let slices = portfolio.allocation(top_n);
    if slices.is_empty() {
        return;
    }
    println!("ALLOCATION:");
    for slice in &slices {
        println!(
            "  {:12} {:>16} {:>7.2}%",
            slice.label,
            config.money(slice.value),
            slice.fraction * 100.0
        );
    }
}
