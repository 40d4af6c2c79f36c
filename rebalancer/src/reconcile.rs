//! Drift report: compare actual holdings against target weights.

use std::collections::BTreeSet;

use folio::{rebalance, Price, TargetAllocation, Ticker};
use rustc_hash::FxHashMap;
use serde::Serialize;

/// Reconciliation report comparing actual vs target.
#[derive(Debug, Clone, Serialize)]
pub struct ReconcileReport {
    pub entries: Vec<ReconcileEntry>,
    pub target_cash_weight: f64,
    pub actual_cash_weight: f64,
    pub tracking_error_pct: f64,
}

/// One ticker's reconciliation entry.
#[derive(Debug, Clone, Serialize)]
pub struct ReconcileEntry {
    pub ticker: String,
    pub target_weight: f64,
    pub actual_weight: f64,
    pub diff_weight: f64,
    pub target_shares: u64,
    pub actual_shares: u64,
    pub diff_shares: i64,
}

/// Compare actual holdings against targets.
///
/// Weights are measured against `cash + Σ shares × price`. Tickers without a
/// price count as worth nothing. The report covers the union of held and
/// targeted tickers, sorted by ticker.
pub fn reconcile(
    holdings: &[(Ticker, u64)],
    cash: i64,
    targets: &TargetAllocation,
    prices: &[(Ticker, Price)],
) -> ReconcileReport {
    let price_map: FxHashMap<Ticker, Price> = prices.iter().copied().collect();
    let actual_map: FxHashMap<Ticker, u64> = holdings.iter().copied().collect();
    let price_of = |t: &Ticker| price_map.get(t).copied().unwrap_or(Price::ZERO);

    let total: i64 = holdings
        .iter()
        .fold(cash, |acc, (t, shares)| acc.saturating_add(price_of(t).value_of(*shares)));

    let all_tickers: BTreeSet<Ticker> = actual_map.keys().copied().chain(targets.tickers()).collect();

    let mut entries = Vec::new();
    let mut sum_sq_diff = 0.0_f64;

    for ticker in &all_tickers {
        let price = price_of(ticker);
        let target_weight = targets.weight(ticker);
        let actual_shares = actual_map.get(ticker).copied().unwrap_or(0);

        let actual_weight = if total > 0 {
            price.value_of(actual_shares) as f64 / total as f64
        } else {
            0.0
        };

        let target_shares = if price.is_positive() {
            rebalance::target_shares(target_weight, total, price)
        } else {
            0
        };

        let diff_weight = actual_weight - target_weight;
        sum_sq_diff += diff_weight * diff_weight;

        entries.push(ReconcileEntry {
            ticker: ticker.as_str().to_string(),
            target_weight,
            actual_weight,
            diff_weight,
            target_shares,
            actual_shares,
            diff_shares: actual_shares as i64 - target_shares as i64,
        });
    }

    let tracking_error_pct = (sum_sq_diff / all_tickers.len().max(1) as f64).sqrt() * 100.0;
    let actual_cash_weight = if total > 0 {
        cash as f64 / total as f64
    } else {
        0.0
    };

    ReconcileReport {
        entries,
        target_cash_weight: targets.cash_weight(),
        actual_cash_weight,
        tracking_error_pct,
    }
}

impl std::fmt::Display for ReconcileReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "RECONCILIATION:")?;
        writeln!(
            f,
            "  {:12} {:>10} {:>10} {:>10} {:>10} {:>10}",
            "Ticker", "Target%", "Actual%", "Diff%", "TargetQty", "ActualQty"
        )?;
        for e in &self.entries {
            writeln!(
                f,
                "  {:12} {:>9.2}% {:>9.2}% {:>+9.2}% {:>10} {:>10}",
                e.ticker,
                e.target_weight * 100.0,
                e.actual_weight * 100.0,
                e.diff_weight * 100.0,
                e.target_shares,
                e.actual_shares,
            )?;
        }
        writeln!(
            f,
            "  {:12} {:>9.2}% {:>9.2}% {:>+9.2}%",
            "(cash)",
            self.target_cash_weight * 100.0,
            self.actual_cash_weight * 100.0,
            (self.actual_cash_weight - self.target_cash_weight) * 100.0,
        )?;
        writeln!(f, "\n  Tracking error: {:.3}%", self.tracking_error_pct)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn aapl() -> Ticker {
        Ticker::new("AAPL")
    }
    fn msft() -> Ticker {
        Ticker::new("MSFT")
    }

    fn half_aapl() -> TargetAllocation {
        TargetAllocation::from_weights([(aapl(), 0.5)]).unwrap()
    }

    #[test]
    fn perfect_match() {
        let report = reconcile(&[(aapl(), 50)], 5000_00, &half_aapl(), &[(aapl(), 100_00)]);
        assert!(report.tracking_error_pct < 1e-9);
        assert_eq!(report.entries[0].target_shares, 50);
        assert_eq!(report.entries[0].diff_shares, 0);
        assert_eq!(report.actual_cash_weight, 0.5);
        assert_eq!(report.target_cash_weight, 0.5);
    }

    #[test]
    fn missing_position() {
        let report = reconcile(&[], 10_000_00, &half_aapl(), &[(aapl(), 185_00)]);
        assert!(report.tracking_error_pct > 1.0);
        assert_eq!(report.entries[0].actual_shares, 0);
        assert_eq!(report.entries[0].target_shares, 27);
        assert_eq!(report.entries[0].diff_shares, -27);
    }

    #[test]
    fn target_shares_floor_like_the_plan() {
        // 50% of 100001 is half a unit short of one 50001 share.
        let a = Ticker::new("A");
        let targets = TargetAllocation::from_weights([(a, 0.5)]).unwrap();
        let report = reconcile(&[(a, 1)], 50_000, &targets, &[(a, Price(50_001))]);
        assert_eq!(report.entries[0].target_shares, 0);
        assert_eq!(report.entries[0].diff_shares, 1);
    }

    #[test]
    fn extra_position() {
        let report = reconcile(
            &[(aapl(), 27), (msft(), 10)],
            5000_00,
            &half_aapl(),
            &[(aapl(), 185_00), (msft(), 410_00)],
        );
        let msft_entry = report.entries.iter().find(|e| e.ticker == "MSFT").unwrap();
        assert_eq!(msft_entry.target_weight, 0.0);
        assert_eq!(msft_entry.target_shares, 0);
        assert!(msft_entry.actual_weight > 0.0);
    }

    #[test]
    fn entries_sorted_by_ticker() {
        let targets = TargetAllocation::from_weights([(msft(), 0.3), (aapl(), 0.3)]).unwrap();
        let report = reconcile(&[], 100_00, &targets, &[(aapl(), 1_00), (msft(), 1_00)]);
        let tickers: Vec<_> = report.entries.iter().map(|e| e.ticker.as_str()).collect();
        assert_eq!(tickers, ["AAPL", "MSFT"]);
    }

    #[test]
    fn worthless_portfolio() {
        let report = reconcile(&[], 0, &half_aapl(), &[(aapl(), 1_00)]);
        assert_eq!(report.actual_cash_weight, 0.0);
        assert_eq!(report.entries[0].target_shares, 0);
    }

    #[test]
    fn display_format() {
        let report = ReconcileReport {
            entries: vec![ReconcileEntry {
                ticker: "AAPL".into(),
                target_weight: 0.5,
                actual_weight: 0.49,
                diff_weight: -0.01,
                target_shares: 2702,
                actual_shares: 2648,
                diff_shares: -54,
            }],
            target_cash_weight: 0.5,
            actual_cash_weight: 0.51,
            tracking_error_pct: 1.0,
        };
        let s = format!("{report}");
        assert!(s.contains("AAPL"));
        assert!(s.contains("(cash)"));
        assert!(s.contains("Tracking error"));
    }
}
