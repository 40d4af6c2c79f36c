//! Portfolio tracking: holdings, cash, summaries and allocation breakdowns.
//!
//! A [`Portfolio`] is mutated only by explicit actions: adding or removing a
//! holding, refreshing prices, moving cash, or applying a
//! [`RebalancePlan`] computed by [`compute_plan`](crate::rebalance::compute_plan).
//!
//! # Example
//!
//! ```
//! use folio::portfolio::Portfolio;
//! use folio::rebalance::compute_plan;
//! use folio::{Price, TargetAllocation, Ticker};
//!
//! let mut portfolio = Portfolio::new("CORE", "Core Portfolio", 0).unwrap();
//! portfolio
//!     .add_holding(Ticker::new("AAPL"), 10, Price(90_00), Price(100_00))
//!     .unwrap();
//!
//! let targets = TargetAllocation::from_csv("Ticker,Weightage\nAAPL,50\nMSFT,50\n").unwrap();
//! let prices = [(Ticker::new("AAPL"), Price(100_00)), (Ticker::new("MSFT"), Price(200_00))];
//!
//! let plan = compute_plan(&portfolio.share_counts(), portfolio.cash(), &targets, &prices).unwrap();
//! portfolio.apply_plan(&plan).unwrap();
//!
//! assert_eq!(portfolio.holding(&Ticker::new("AAPL")).unwrap().shares, 5);
//! assert_eq!(portfolio.holding(&Ticker::new("MSFT")).unwrap().shares, 2);
//! assert_eq!(portfolio.cash(), 100_00);
//! ```

pub mod holding;

pub use holding::Holding;

use chrono::{DateTime, Utc};
use rustc_hash::FxHashMap;

use crate::error::PortfolioError;
use crate::rebalance::RebalancePlan;
use crate::side::Side;
use crate::types::{Price, Ticker};

/// Default number of holdings shown individually in an allocation breakdown.
pub const DEFAULT_TOP_HOLDINGS: usize = 5;

/// Label of the aggregated slice in an allocation breakdown.
pub const OTHERS_LABEL: &str = "OTHERS";

/// Serde helper for `FxHashMap<Ticker, Holding>`: serializes as a ticker-sorted `Vec<Holding>`.
#[cfg(feature = "serde")]
mod serde_holdings {
    use super::{FxHashMap, Holding, Ticker};
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(
        map: &FxHashMap<Ticker, Holding>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        let mut vec: Vec<&Holding> = map.values().collect();
        vec.sort_by_key(|h| h.ticker);
        vec.serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<FxHashMap<Ticker, Holding>, D::Error> {
        let vec: Vec<Holding> = Vec::deserialize(deserializer)?;
        let mut map = FxHashMap::default();
        for h in vec {
            if map.insert(h.ticker, h).is_some() {
                return Err(serde::de::Error::custom("duplicate holding ticker"));
            }
        }
        Ok(map)
    }
}

/// On-disk form of a [`Portfolio`], checked by `TryFrom` before use.
#[cfg(feature = "serde")]
#[derive(serde::Deserialize)]
struct PortfolioRecord {
    id: String,
    name: String,
    cash: i64,
    #[serde(deserialize_with = "serde_holdings::deserialize")]
    holdings: FxHashMap<Ticker, Holding>,
    created_at: DateTime<Utc>,
}

#[cfg(feature = "serde")]
impl TryFrom<PortfolioRecord> for Portfolio {
    type Error = PortfolioError;

    fn try_from(record: PortfolioRecord) -> Result<Self, Self::Error> {
        Portfolio::validate_id(&record.id)?;
        let mut portfolio = Portfolio::new(&record.id, &record.name, record.cash)?;
        for h in record.holdings.values() {
            if h.shares == 0 {
                return Err(PortfolioError::ZeroQuantity(h.ticker));
            }
            Holding::new(h.ticker, h.shares, h.avg_buy_price, h.current_price)?;
        }
        check_totals(record.cash, record.holdings.values())?;
        portfolio.holdings = record.holdings;
        portfolio.created_at = record.created_at;
        Ok(portfolio)
    }
}

/// Checks that total value and cost basis both fit in an `i64`.
fn check_totals<'a>(
    cash: i64,
    holdings: impl IntoIterator<Item = &'a Holding>,
) -> Result<(), PortfolioError> {
    let mut total = cash;
    let mut invested = 0i64;
    for h in holdings {
        total = h
            .current_price
            .checked_value_of(h.shares)
            .and_then(|value| total.checked_add(value))
            .ok_or(PortfolioError::Overflow)?;
        invested = h
            .avg_buy_price
            .checked_value_of(h.shares)
            .and_then(|value| invested.checked_add(value))
            .ok_or(PortfolioError::Overflow)?;
    }
    Ok(())
}

/// A named portfolio of holdings plus uninvested cash.
///
/// All monetary values are in the smallest currency unit.
/// Invariant: `cash >= 0`, `total_value() == cash + market_value()`, and
/// total value and cost basis fit in an `i64`. Loading from JSON checks the
/// same rules as construction and mutation.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(try_from = "PortfolioRecord")
)]
pub struct Portfolio {
    id: String,
    name: String,
    /// Uninvested cash
    cash: i64,
    /// Holdings indexed by ticker
    #[cfg_attr(feature = "serde", serde(serialize_with = "serde_holdings::serialize"))]
    holdings: FxHashMap<Ticker, Holding>,
    created_at: DateTime<Utc>,
}

/// Headline figures for a portfolio (the dashboard card).
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct PortfolioSummary {
    pub id: String,
    pub name: String,
    /// Σ current value of holdings
    pub market_value: i64,
    pub cash: i64,
    /// market value + cash
    pub total_value: i64,
    /// Σ shares × average buy price
    pub total_investment: i64,
    /// market value - total investment
    pub total_returns: i64,
    /// total returns / total investment, in percent (0 when nothing is invested)
    pub return_pct: f64,
    pub num_holdings: usize,
}

/// One slice of an allocation chart.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct AllocationSlice {
    /// Ticker, or [`OTHERS_LABEL`] for the aggregated remainder
    pub label: String,
    pub value: i64,
    /// Fraction of the holdings' market value
    pub fraction: f64,
}

impl Portfolio {
    /// Create an empty portfolio.
    ///
    /// `id` is trimmed and must be non-empty ASCII letters, digits, `_` or `-`
    /// (it doubles as a file name). `name` is trimmed and must be non-empty.
    /// `cash` must be non-negative.
    pub fn new(id: &str, name: &str, cash: i64) -> Result<Self, PortfolioError> {
        let id = id.trim();
        Self::validate_id(id)?;
        let name = name.trim();
        if name.is_empty() {
            return Err(PortfolioError::EmptyName);
        }
        if cash < 0 {
            return Err(PortfolioError::NegativeAmount(Price(cash)));
        }
        Ok(Self {
            id: id.to_string(),
            name: name.to_string(),
            cash,
            holdings: FxHashMap::default(),
            created_at: Utc::now(),
        })
    }

    /// Check that `id` is non-empty ASCII letters, digits, `_` or `-`, with
    /// no surrounding whitespace.
    pub fn validate_id(id: &str) -> Result<(), PortfolioError> {
        let valid = !id.is_empty()
            && id
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-');
        if valid {
            Ok(())
        } else {
            Err(PortfolioError::InvalidId(id.to_string()))
        }
    }

    // === Queries ===

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Uninvested cash.
    #[inline]
    pub fn cash(&self) -> i64 {
        self.cash
    }

    /// Get a holding by ticker, if it exists.
    pub fn holding(&self, ticker: &Ticker) -> Option<&Holding> {
        self.holdings.get(ticker)
    }

    /// Holdings sorted by ticker.
    pub fn holdings(&self) -> Vec<&Holding> {
        let mut v: Vec<&Holding> = self.holdings.values().collect();
        v.sort_by_key(|h| h.ticker);
        v
    }

    /// Holdings sorted by current value, largest first (ties by ticker).
    pub fn holdings_by_value(&self) -> Vec<&Holding> {
        let mut v: Vec<&Holding> = self.holdings.values().collect();
        v.sort_by(|a, b| {
            b.current_value()
                .cmp(&a.current_value())
                .then_with(|| a.ticker.cmp(&b.ticker))
        });
        v
    }

    pub fn num_holdings(&self) -> usize {
        self.holdings.len()
    }

    /// Σ current value of all holdings.
    pub fn market_value(&self) -> i64 {
        self.holdings.values().map(Holding::current_value).sum()
    }

    /// Cash plus market value.
    pub fn total_value(&self) -> i64 {
        self.cash + self.market_value()
    }

    /// Σ cost basis of all holdings.
    pub fn total_investment(&self) -> i64 {
        self.holdings.values().map(Holding::invested_value).sum()
    }

    /// Fraction of total value held in `ticker` (0 if not held or the
    /// portfolio is worth nothing).
    pub fn weightage(&self, ticker: &Ticker) -> f64 {
        let total = self.total_value();
        if total == 0 {
            return 0.0;
        }
        self.holdings
            .get(ticker)
            .map(|h| h.current_value() as f64 / total as f64)
            .unwrap_or(0.0)
    }

    /// Current `(ticker, weight)` pairs, ticker-sorted. Cash is implicitly
    /// `1 - Σ weights`.
    pub fn current_weights(&self) -> Vec<(Ticker, f64)> {
        self.holdings()
            .into_iter()
            .map(|h| (h.ticker, self.weightage(&h.ticker)))
            .collect()
    }

    /// Headline figures.
    pub fn summary(&self) -> PortfolioSummary {
        let market_value = self.market_value();
        let total_investment = self.total_investment();
        let total_returns = market_value - total_investment;
        let return_pct = if total_investment > 0 {
            total_returns as f64 / total_investment as f64 * 100.0
        } else {
            0.0
        };
        PortfolioSummary {
            id: self.id.clone(),
            name: self.name.clone(),
            market_value,
            cash: self.cash,
            total_value: market_value + self.cash,
            total_investment,
            total_returns,
            return_pct,
            num_holdings: self.holdings.len(),
        }
    }

    /// Allocation breakdown: the `top_n` largest holdings by value, then one
    /// [`OTHERS_LABEL`] slice for the rest if it is worth anything.
    pub fn allocation(&self, top_n: usize) -> Vec<AllocationSlice> {
        let market_value = self.market_value();
        let fraction = |value: i64| {
            if market_value > 0 {
                value as f64 / market_value as f64
            } else {
                0.0
            }
        };

        let by_value = self.holdings_by_value();
        let mut slices: Vec<AllocationSlice> = by_value
            .iter()
            .take(top_n)
            .map(|h| AllocationSlice {
                label: h.ticker.as_str().to_string(),
                value: h.current_value(),
                fraction: fraction(h.current_value()),
            })
            .collect();

        let others: i64 = by_value.iter().skip(top_n).map(|h| h.current_value()).sum();
        if others > 0 {
            slices.push(AllocationSlice {
                label: OTHERS_LABEL.to_string(),
                value: others,
                fraction: fraction(others),
            });
        }
        slices
    }

    /// `(ticker, shares)` for every holding, ticker-sorted. Input for
    /// [`compute_plan`](crate::rebalance::compute_plan).
    pub fn share_counts(&self) -> Vec<(Ticker, u64)> {
        self.holdings().into_iter().map(|h| (h.ticker, h.shares)).collect()
    }

    /// `(ticker, current price)` for every holding, ticker-sorted.
    pub fn price_table(&self) -> Vec<(Ticker, Price)> {
        self.holdings()
            .into_iter()
            .map(|h| (h.ticker, h.current_price))
            .collect()
    }

    // === Mutation ===

    /// Rename the portfolio.
    pub fn rename(&mut self, name: &str) -> Result<(), PortfolioError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(PortfolioError::EmptyName);
        }
        self.name = name.to_string();
        Ok(())
    }

    /// Add shares of `ticker`.
    ///
    /// If the ticker is already held, shares are added, the average buy price
    /// becomes the share-weighted average and the current price is replaced.
    /// Returns the updated holding. Fails without change if the portfolio
    /// value would overflow.
    pub fn add_holding(
        &mut self,
        ticker: Ticker,
        shares: u64,
        avg_buy_price: Price,
        current_price: Price,
    ) -> Result<&Holding, PortfolioError> {
        if shares == 0 {
            return Err(PortfolioError::ZeroQuantity(ticker));
        }
        // Validates both prices before touching existing state.
        let lot = Holding::new(ticker, shares, avg_buy_price, current_price)?;

        let updated = match self.holdings.get(&ticker) {
            Some(existing) => {
                let mut h = existing.clone();
                h.buy(shares, avg_buy_price)?;
                h.current_price = current_price;
                h
            }
            None => lot,
        };
        check_totals(
            self.cash,
            self.holdings
                .values()
                .filter(|h| h.ticker != ticker)
                .chain(std::iter::once(&updated)),
        )?;

        let holding = match self.holdings.entry(ticker) {
            std::collections::hash_map::Entry::Occupied(mut e) => {
                e.insert(updated);
                e.into_mut()
            }
            std::collections::hash_map::Entry::Vacant(e) => e.insert(updated),
        };
        Ok(holding)
    }

    /// Set the display name of a held ticker.
    pub fn set_holding_name(&mut self, ticker: &Ticker, name: &str) -> Result<(), PortfolioError> {
        let h = self
            .holdings
            .get_mut(ticker)
            .ok_or(PortfolioError::HoldingNotFound(*ticker))?;
        h.name = name.trim().to_string();
        Ok(())
    }

    /// Remove a holding entirely, returning it.
    pub fn remove_holding(&mut self, ticker: &Ticker) -> Result<Holding, PortfolioError> {
        self.holdings
            .remove(ticker)
            .ok_or(PortfolioError::HoldingNotFound(*ticker))
    }

    /// Update current prices from a quote table.
    ///
    /// Every quote for a held ticker must be positive and the repriced
    /// portfolio must not overflow, otherwise nothing is updated. Quotes for
    /// tickers not held are ignored. Returns the held tickers that had no
    /// quote, ticker-sorted.
    pub fn refresh_prices(&mut self, prices: &[(Ticker, Price)]) -> Result<Vec<Ticker>, PortfolioError> {
        let price_map: FxHashMap<Ticker, Price> = prices.iter().copied().collect();
        for (ticker, &price) in &price_map {
            if self.holdings.contains_key(ticker) && !price.is_positive() {
                return Err(PortfolioError::InvalidPrice {
                    ticker: *ticker,
                    price,
                });
            }
        }

        let mut holdings = self.holdings.clone();
        let mut unquoted = Vec::new();
        for (ticker, h) in holdings.iter_mut() {
            match price_map.get(ticker) {
                Some(&price) => h.current_price = price,
                None => unquoted.push(*ticker),
            }
        }
        check_totals(self.cash, holdings.values())?;

        self.holdings = holdings;
        unquoted.sort();
        Ok(unquoted)
    }

    /// Add uninvested cash.
    pub fn deposit(&mut self, amount: i64) -> Result<(), PortfolioError> {
        if amount < 0 {
            return Err(PortfolioError::NegativeAmount(Price(amount)));
        }
        let cash = self.cash.checked_add(amount).ok_or(PortfolioError::Overflow)?;
        check_totals(cash, self.holdings.values())?;
        self.cash = cash;
        Ok(())
    }

    /// Take out uninvested cash.
    pub fn withdraw(&mut self, amount: i64) -> Result<(), PortfolioError> {
        if amount < 0 {
            return Err(PortfolioError::NegativeAmount(Price(amount)));
        }
        if amount > self.cash {
            return Err(PortfolioError::InsufficientCash {
                needed: Price(amount),
                available: Price(self.cash),
            });
        }
        self.cash -= amount;
        Ok(())
    }

    /// Apply a rebalance plan, all-or-nothing.
    ///
    /// Actions execute in plan order at their estimated prices. A SELL
    /// reduces shares (holdings sold down to zero are removed); a BUY adds
    /// shares at a weighted-average cost, creating the holding if needed.
    /// Traded tickers take the trade price as their current price.
    ///
    /// If any action fails (selling more than held, buying beyond cash, a
    /// non-positive price or an out-of-range value) the portfolio is left
    /// exactly as it was.
    pub fn apply_plan(&mut self, plan: &RebalancePlan) -> Result<(), PortfolioError> {
        let mut cash = self.cash;
        let mut holdings = self.holdings.clone();

        for action in &plan.actions {
            let ticker = action.ticker;
            let price = action.estimated_price;
            if !price.is_positive() {
                return Err(PortfolioError::InvalidPrice { ticker, price });
            }
            if action.shares == 0 {
                return Err(PortfolioError::ZeroQuantity(ticker));
            }
            let notional = price
                .checked_value_of(action.shares)
                .ok_or(PortfolioError::Overflow)?;

            match action.side {
                Side::Sell => {
                    let h = holdings.get_mut(&ticker).ok_or(PortfolioError::InsufficientShares {
                        ticker,
                        requested: action.shares,
                        held: 0,
                    })?;
                    h.sell(action.shares, price)?;
                    h.current_price = price;
                    if h.is_empty() {
                        holdings.remove(&ticker);
                    }
                    cash = cash.checked_add(notional).ok_or(PortfolioError::Overflow)?;
                }
                Side::Buy => {
                    if notional > cash {
                        return Err(PortfolioError::InsufficientCash {
                            needed: Price(notional),
                            available: Price(cash),
                        });
                    }
                    match holdings.get_mut(&ticker) {
                        Some(h) => {
                            h.buy(action.shares, price)?;
                            h.current_price = price;
                        }
                        None => {
                            let h = Holding::new(ticker, action.shares, price, price)?;
                            holdings.insert(ticker, h);
                        }
                    }
                    cash -= notional;
                }
            }
        }

        check_totals(cash, holdings.values())?;

        self.cash = cash;
        self.holdings = holdings;
        Ok(())
    }

    // === Persistence ===

    /// Save the portfolio to a JSON file.
    #[cfg(feature = "persistence")]
    pub fn save_json(&self, path: &std::path::Path) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(path, json)
    }

    /// Load a portfolio from a JSON file.
    #[cfg(feature = "persistence")]
    pub fn load_json(path: &std::path::Path) -> std::io::Result<Self> {
        let json = std::fs::read_to_string(path)?;
        serde_json::from_str(&json).map_err(std::io::Error::other)
    }
}
