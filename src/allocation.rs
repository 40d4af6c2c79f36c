//! Target allocation: ticker -> weight, parsed from an uploaded CSV table.
//!
//! The expected table is the one the holdings view exports:
//!
//! ```text
//! Name,Ticker,Current Price,Avg Buy Price,Returns (%),Weightage,Shares
//! Fortis Healthcare Ltd,FORTIS,929.75,750.45,23.89,4.02,106
//! ```
//!
//! Only `Ticker` and `Weightage` are required. `Weightage` is a percentage
//! and is divided by 100 to form a weight. `Name` and `Current Price` are
//! kept when present; everything else is ignored.

use std::io::Read;
use std::path::Path;

use rustc_hash::FxHashMap;

use crate::error::ParseError;
use crate::types::{Price, Ticker};

/// Slack allowed when checking that weights sum to at most 1.
const WEIGHT_SUM_TOLERANCE: f64 = 1e-9;

/// One row of a target allocation.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TargetEntry {
    pub ticker: Ticker,
    /// Target weight as a fraction in `[0, 1]`
    pub weight: f64,
    /// `Name` column, if the table had one
    pub name: Option<String>,
    /// `Current Price` column, if the table had one and it parsed
    pub price: Option<Price>,
}

/// A validated target allocation.
///
/// Invariants: tickers are unique, every weight is finite and in `[0, 1]`,
/// and the weights sum to at most 1. The remainder is held as cash.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct TargetAllocation {
    entries: Vec<TargetEntry>,
    /// ticker -> (entry index, source line)
    #[cfg_attr(feature = "serde", serde(skip))]
    index: FxHashMap<Ticker, (usize, u64)>,
}

impl TargetAllocation {
    /// Build from `(ticker, weight)` pairs, with weights as fractions.
    pub fn from_weights(
        weights: impl IntoIterator<Item = (Ticker, f64)>,
    ) -> Result<Self, ParseError> {
        let mut alloc = TargetAllocation::default();
        for (i, (ticker, weight)) in weights.into_iter().enumerate() {
            let line = i as u64 + 1;
            if !weight.is_finite() || !(0.0..=1.0).contains(&weight) {
                return Err(ParseError::row(
                    line,
                    format!("weight for {ticker} ({weight}) must be in [0, 1]"),
                ));
            }
            alloc.push(
                line,
                TargetEntry {
                    ticker,
                    weight,
                    name: None,
                    price: None,
                },
            )?;
        }
        alloc.check_sum()?;
        Ok(alloc)
    }

    /// Parse a CSV table from any reader.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, ParseError> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers = rdr.headers()?.clone();
        let column = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim().eq_ignore_ascii_case(name))
        };
        let ticker_col = column("Ticker").ok_or(ParseError::MissingColumn("Ticker"))?;
        let weight_col = column("Weightage").ok_or(ParseError::MissingColumn("Weightage"))?;
        let name_col = column("Name");
        let price_col = column("Current Price");

        let mut alloc = TargetAllocation::default();
        for record in rdr.records() {
            let record = record?;
            let line = record.position().map(|p| p.line()).unwrap_or(0);

            let raw_ticker = record.get(ticker_col).unwrap_or("");
            let ticker = Ticker::try_new(raw_ticker)
                .ok_or_else(|| ParseError::row(line, format!("invalid ticker {raw_ticker:?}")))?;

            let raw_weight = record.get(weight_col).unwrap_or("");
            let weight = parse_weightage(raw_weight).ok_or_else(|| {
                ParseError::row(
                    line,
                    format!("weightage for {ticker} ({raw_weight:?}) is not a percentage in [0, 100]"),
                )
            })?;

            let name = name_col
                .and_then(|c| record.get(c))
                .filter(|s| !s.is_empty())
                .map(str::to_string);
            let price = price_col
                .and_then(|c| record.get(c))
                .and_then(Price::parse_decimal)
                .filter(|p| p.is_positive());

            alloc.push(
                line,
                TargetEntry {
                    ticker,
                    weight,
                    name,
                    price,
                },
            )?;
        }

        alloc.check_sum()?;
        Ok(alloc)
    }

    /// Parse a CSV string.
    pub fn from_csv(csv: &str) -> Result<Self, ParseError> {
        Self::from_reader(csv.as_bytes())
    }

    /// Load and validate a CSV file.
    pub fn load(path: &Path) -> Result<Self, ParseError> {
        let file = std::fs::File::open(path).map_err(|e| ParseError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_reader(file)
    }

    /// Target weight for `ticker`; 0 if the allocation omits it.
    pub fn weight(&self, ticker: &Ticker) -> f64 {
        self.get(ticker).map(|e| e.weight).unwrap_or(0.0)
    }

    /// Entry for `ticker`, if present.
    pub fn get(&self, ticker: &Ticker) -> Option<&TargetEntry> {
        self.index.get(ticker).map(|&(i, _)| &self.entries[i])
    }

    /// Entries in input order.
    pub fn entries(&self) -> &[TargetEntry] {
        &self.entries
    }

    /// Tickers in input order.
    pub fn tickers(&self) -> impl Iterator<Item = Ticker> + '_ {
        self.entries.iter().map(|e| e.ticker)
    }

    /// Sum of all target weights.
    pub fn total_weight(&self) -> f64 {
        self.entries.iter().map(|e| e.weight).sum()
    }

    /// Fraction of the portfolio the allocation leaves in cash.
    pub fn cash_weight(&self) -> f64 {
        (1.0 - self.total_weight()).max(0.0)
    }

    /// `(ticker, price)` pairs for rows that carried a `Current Price`.
    pub fn quoted_prices(&self) -> Vec<(Ticker, Price)> {
        self.entries
            .iter()
            .filter_map(|e| e.price.map(|p| (e.ticker, p)))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn push(&mut self, line: u64, entry: TargetEntry) -> Result<(), ParseError> {
        if let Some(&(_, first_line)) = self.index.get(&entry.ticker) {
            return Err(ParseError::row(
                line,
                format!(
                    "duplicate ticker {} (first seen on line {first_line})",
                    entry.ticker
                ),
            ));
        }
        self.index.insert(entry.ticker, (self.entries.len(), line));
        self.entries.push(entry);
        Ok(())
    }

    fn check_sum(&self) -> Result<(), ParseError> {
        let total = self.total_weight();
        if total > 1.0 + WEIGHT_SUM_TOLERANCE {
            return Err(ParseError::WeightSum(total));
        }
        Ok(())
    }
}

/// Parse a `Weightage` cell: a percentage in `[0, 100]`, optional trailing `%`.
fn parse_weightage(raw: &str) -> Option<f64> {
    let cleaned = raw.trim().trim_end_matches('%').trim();
    let pct: f64 = cleaned.parse().ok()?;
    if !pct.is_finite() || !(0.0..=100.0).contains(&pct) {
        return None;
    }
    Some(pct / 100.0)
}
