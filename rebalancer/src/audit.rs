//! JSONL audit trail logging.
//!
//! Every state-changing command appends events to an audit.jsonl file,
//! one JSON object per line.

use std::fs::{self, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;

use chrono::{DateTime, Utc};
use folio::{Holding, Portfolio, RebalancePlan, Ticker};
use serde::Serialize;

use crate::error::Result;

/// An audit event written to the JSONL trail.
#[derive(Debug, Clone, Serialize)]
pub struct AuditEvent {
    pub event: &'static str,
    pub ts: DateTime<Utc>,
    #[serde(flatten)]
    pub data: serde_json::Value,
}

/// Append-only audit logger.
pub struct AuditLog {
    writer: BufWriter<std::fs::File>,
}

impl AuditLog {
    /// Open (or create) the audit log file for appending.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new().create(true).append(true).open(path)?;

        Ok(Self {
            writer: BufWriter::new(file),
        })
    }

    /// Log an event with arbitrary JSON data.
    pub fn log(&mut self, event: &'static str, data: serde_json::Value) -> Result<()> {
        let entry = AuditEvent {
            event,
            ts: Utc::now(),
            data,
        };
        let json = serde_json::to_string(&entry).map_err(std::io::Error::other)?;
        writeln!(self.writer, "{json}")?;
        self.writer.flush()?;
        Ok(())
    }

    /// Log a simple event with no additional data.
    pub fn log_simple(&mut self, event: &'static str) -> Result<()> {
        self.log(event, serde_json::json!({}))
    }
}

fn units(amount: i64) -> f64 {
    amount as f64 / 100.0
}

/// Convenience: log a rebalance run start.
pub fn log_run_started(audit: &mut AuditLog, portfolio_id: &str, target_file: &str) -> Result<()> {
    audit.log(
        "run_started",
        serde_json::json!({
            "portfolio": portfolio_id,
            "target_file": target_file,
        }),
    )
}

/// Convenience: log a computed plan.
pub fn log_plan(audit: &mut AuditLog, portfolio_id: &str, plan: &RebalancePlan) -> Result<()> {
    let actions: Vec<_> = plan
        .actions
        .iter()
        .map(|a| {
            serde_json::json!({
                "ticker": a.ticker.as_str(),
                "side": a.side.to_string(),
                "shares": a.shares,
                "price": units(a.estimated_price.0),
            })
        })
        .collect();

    audit.log(
        "plan_computed",
        serde_json::json!({
            "portfolio": portfolio_id,
            "total_value": units(plan.total_value),
            "cash_before": units(plan.cash_before),
            "cash_after": units(plan.cash_after),
            "actions": actions,
        }),
    )
}

/// Convenience: log the confirmation answer.
pub fn log_user_confirmed(audit: &mut AuditLog, approved: bool) -> Result<()> {
    audit.log("user_confirmed", serde_json::json!({ "approved": approved }))
}

/// Convenience: log a plan applied to a portfolio.
pub fn log_plan_applied(audit: &mut AuditLog, portfolio: &Portfolio, actions: usize) -> Result<()> {
    audit.log(
        "plan_applied",
        serde_json::json!({
            "portfolio": portfolio.id(),
            "actions": actions,
            "cash": units(portfolio.cash()),
            "total_value": units(portfolio.total_value()),
            "holdings": portfolio.num_holdings(),
        }),
    )
}

/// Convenience: log portfolio creation.
pub fn log_portfolio_created(audit: &mut AuditLog, portfolio: &Portfolio) -> Result<()> {
    audit.log(
        "portfolio_created",
        serde_json::json!({
            "portfolio": portfolio.id(),
            "name": portfolio.name(),
            "cash": units(portfolio.cash()),
        }),
    )
}

/// Convenience: log a holding added (or topped up).
pub fn log_holding_added(
    audit: &mut AuditLog,
    portfolio_id: &str,
    shares: u64,
    holding: &Holding,
) -> Result<()> {
    audit.log(
        "holding_added",
        serde_json::json!({
            "portfolio": portfolio_id,
            "ticker": holding.ticker.as_str(),
            "shares_added": shares,
            "shares": holding.shares,
            "avg_buy_price": units(holding.avg_buy_price.0),
        }),
    )
}

/// Convenience: log a holding removed.
pub fn log_holding_removed(audit: &mut AuditLog, portfolio_id: &str, holding: &Holding) -> Result<()> {
    audit.log(
        "holding_removed",
        serde_json::json!({
            "portfolio": portfolio_id,
            "ticker": holding.ticker.as_str(),
            "shares": holding.shares,
        }),
    )
}

/// Convenience: log a price refresh.
pub fn log_prices_refreshed(
    audit: &mut AuditLog,
    portfolio_id: &str,
    updated: usize,
    unquoted: &[Ticker],
) -> Result<()> {
    let unquoted: Vec<_> = unquoted.iter().map(|t| t.as_str()).collect();
    audit.log(
        "prices_refreshed",
        serde_json::json!({
            "portfolio": portfolio_id,
            "updated": updated,
            "unquoted": unquoted,
        }),
    )
}

/// Convenience: log a deposit or withdrawal.
pub fn log_cash_adjusted(
    audit: &mut AuditLog,
    portfolio_id: &str,
    delta: i64,
    cash_after: i64,
) -> Result<()> {
    audit.log(
        "cash_adjusted",
        serde_json::json!({
            "portfolio": portfolio_id,
            "delta": units(delta),
            "cash": units(cash_after),
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio::{Price, Side, TradeAction};

    fn read_lines(path: &Path) -> Vec<serde_json::Value> {
        std::fs::read_to_string(path)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    #[test]
    fn audit_log_writes_jsonl() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test_audit.jsonl");

        {
            let mut log = AuditLog::open(&path).unwrap();
            log.log_simple("test_event").unwrap();
            log.log("test_data", serde_json::json!({"key": "value"}))
                .unwrap();
        }

        let lines = read_lines(&path);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["event"], "test_event");
        assert!(lines[0]["ts"].is_string());
        assert_eq!(lines[1]["key"], "value");
    }

    #[test]
    fn audit_log_appends_across_opens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.jsonl");
        AuditLog::open(&path).unwrap().log_simple("first").unwrap();
        AuditLog::open(&path).unwrap().log_simple("second").unwrap();
        assert_eq!(read_lines(&path).len(), 2);
    }

    #[test]
    fn audit_log_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("subdir").join("deep").join("audit.jsonl");

        let mut log = AuditLog::open(&path).unwrap();
        log.log_simple("test").unwrap();

        assert!(path.exists());
    }

    #[test]
    fn plan_event_lists_actions() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.jsonl");
        let plan = RebalancePlan {
            actions: vec![TradeAction {
                ticker: Ticker::new("AAPL"),
                side: Side::Sell,
                shares: 5,
                estimated_price: Price(100_00),
            }],
            total_value: 1000_00,
            cash_before: 0,
            cash_after: 500_00,
        };

        let mut log = AuditLog::open(&path).unwrap();
        log_plan(&mut log, "CORE", &plan).unwrap();

        let lines = read_lines(&path);
        let event = &lines[0];
        assert_eq!(event["event"], "plan_computed");
        assert_eq!(event["portfolio"], "CORE");
        assert_eq!(event["cash_after"], 500.0);
        assert_eq!(event["actions"][0]["side"], "SELL");
        assert_eq!(event["actions"][0]["shares"], 5);
    }

    #[test]
    fn cash_event_records_delta() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.jsonl");
        let mut log = AuditLog::open(&path).unwrap();
        log_cash_adjusted(&mut log, "CORE", -25_50, 74_50).unwrap();

        let lines = read_lines(&path);
        assert_eq!(lines[0]["event"], "cash_adjusted");
        assert_eq!(lines[0]["delta"], -25.5);
        assert_eq!(lines[0]["cash"], 74.5);
    }
}
