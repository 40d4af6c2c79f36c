//! Error types for allocation parsing, plan computation and portfolio updates.

use crate::types::{Price, Ticker};

/// Errors from [`compute_plan`](crate::rebalance::compute_plan).
///
/// Any error aborts the whole computation; no partial plan is returned.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RebalanceError {
    #[error("no current price for {0}")]
    MissingPrice(Ticker),

    #[error("invalid price for {ticker}: {price} (must be > 0)")]
    InvalidPrice { ticker: Ticker, price: Price },

    #[error("cash must be non-negative, got {0}")]
    NegativeCash(Price),

    #[error("portfolio value overflows at {0}")]
    Overflow(Ticker),
}

/// Errors from parsing a target allocation or price table.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("missing required column '{0}'")]
    MissingColumn(&'static str),

    /// A data row failed validation. `line` is the 1-based line in the input
    /// (the header is line 1).
    #[error("line {line}: {reason}")]
    Row { line: u64, reason: String },

    #[error("target weights sum to {:.4}% (> 100%)", .0 * 100.0)]
    WeightSum(f64),

    #[error("malformed CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("failed to read {path}: {source}")]
    Io {
        path: std::path::PathBuf,
        source: std::io::Error,
    },
}

impl ParseError {
    pub(crate) fn row(line: u64, reason: impl Into<String>) -> Self {
        ParseError::Row {
            line,
            reason: reason.into(),
        }
    }
}

/// Errors from portfolio construction and mutation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PortfolioError {
    #[error("invalid portfolio id {0:?}: use letters, digits, '_' or '-'")]
    InvalidId(String),

    #[error("portfolio name must not be empty")]
    EmptyName,

    #[error("invalid price for {ticker}: {price} (must be > 0)")]
    InvalidPrice { ticker: Ticker, price: Price },

    #[error("quantity for {0} must be greater than zero")]
    ZeroQuantity(Ticker),

    #[error("amount must be non-negative, got {0}")]
    NegativeAmount(Price),

    #[error("no holding for {0}")]
    HoldingNotFound(Ticker),

    #[error("cannot sell {requested} {ticker}: only {held} held")]
    InsufficientShares {
        ticker: Ticker,
        requested: u64,
        held: u64,
    },

    #[error("insufficient cash: need {needed}, have {available}")]
    InsufficientCash { needed: Price, available: Price },

    #[error("portfolio value out of range")]
    Overflow,
}
