// Allow our units.cents digit grouping convention (e.g., 100_00 = 100.00)
#![allow(clippy::inconsistent_digit_grouping)]

//! folio-rebalancer: command-line portfolio manager built on `folio`.
//!
//! Keeps portfolios as JSON files, reads target allocations and price tables
//! from CSV, computes whole-share rebalance plans, applies them after
//! confirmation and keeps a JSONL audit trail.

pub mod audit;
pub mod config;
pub mod error;
pub mod execution;
pub mod reconcile;
pub mod store;
