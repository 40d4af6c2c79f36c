// Allow our units.cents digit grouping convention (e.g., 100_00 = 100.00)
#![allow(clippy::inconsistent_digit_grouping)]

//! # folio
//!
//! Portfolio tracking and target-weight rebalancing with fixed-point money.
//!
//! ## Features
//!
//! - **Holdings**: shares, weighted-average cost, current price, realized PnL
//! - **Target allocations**: parsed from CSV (`Ticker`, `Weightage` in percent)
//! - **Rebalance plans**: whole-share SELL/BUY actions that never overdraw cash
//! - **All-or-nothing updates**: a failed plan or price refresh changes nothing
//! - **Fixed-point prices**: integer cents, no floating-point drift in cash
//!
//! ## Quick Start
//!
//! ```
//! use folio::{compute_plan, Price, Side, TargetAllocation, Ticker};
//!
//! let aapl = Ticker::new("AAPL");
//! let msft = Ticker::new("MSFT");
//!
//! let targets = TargetAllocation::from_csv("Ticker,Weightage\nAAPL,50\nMSFT,50\n").unwrap();
//! let prices = [(aapl, Price(100_00)), (msft, Price(200_00))];
//!
//! // 10 AAPL, no cash: sell half the AAPL, buy what fits of MSFT
//! let plan = compute_plan(&[(aapl, 10)], 0, &targets, &prices).unwrap();
//!
//! assert_eq!(plan.actions.len(), 2);
//! assert_eq!(plan.actions[0].side, Side::Sell);
//! assert_eq!(plan.actions[0].shares, 5);
//! assert_eq!(plan.actions[1].ticker, msft);
//! assert_eq!(plan.actions[1].shares, 2);
//! assert_eq!(plan.cash_after, 100_00);
//! ```
//!
//! ## Price Representation
//!
//! Prices are stored as [`i64`] in the smallest currency unit:
//!
//! ```
//! use folio::Price;
//!
//! let price = Price(929_75);
//! assert_eq!(price.to_string(), "929.75");
//! assert_eq!(Price::parse_decimal("₹2,896.70"), Some(Price(2896_70)));
//! ```

pub mod allocation;
mod error;
pub mod portfolio;
pub mod prices;
pub mod rebalance;
mod side;
mod types;

// Re-export public API
pub use allocation::{TargetAllocation, TargetEntry};
pub use error::{ParseError, PortfolioError, RebalanceError};
pub use portfolio::{AllocationSlice, Holding, Portfolio, PortfolioSummary};
pub use prices::{load_prices, merge_prices, parse_prices};
pub use rebalance::{compute_plan, RebalancePlan, TradeAction};
pub use side::Side;
pub use types::{Price, Ticker, MAX_TICKER_LEN};
