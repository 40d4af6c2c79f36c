//! CURRENT -> TARGET rebalance plan computation.
//!
//! Given share counts, uninvested cash, a [`TargetAllocation`] and a price for
//! every relevant ticker, [`compute_plan`] produces the whole-share trades that
//! move the portfolio toward its target weights:
//!
//! 1. `total = cash + Σ shares × price`
//! 2. `target_shares = floor(weight × total / price)` for every ticker that is
//!    held or targeted (absent targets weigh 0, i.e. full liquidation)
//! 3. overweight tickers are sold, in ticker order
//! 4. sale proceeds are added to the projected cash
//! 5. underweight tickers are bought, largest weight deviation first, each
//!    capped by what the projected cash can still afford
//!
//! The computation is pure: it never mutates a portfolio. Applying the plan is
//! left to the caller (see [`Portfolio::apply_plan`](crate::portfolio::Portfolio::apply_plan)).
//!
//! Flooring means the realized allocation undershoots each target by less than
//! one share's value. Rounding up instead could overspend cash.

use std::collections::BTreeSet;
use std::fmt;

use rustc_hash::FxHashMap;

use crate::allocation::TargetAllocation;
use crate::error::RebalanceError;
use crate::side::Side;
use crate::types::{Price, Ticker};

/// A single whole-share trade in a rebalance plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TradeAction {
    pub ticker: Ticker,
    pub side: Side,
    /// Always > 0
    pub shares: u64,
    pub estimated_price: Price,
}

impl TradeAction {
    /// Estimated cash value of the trade.
    #[inline]
    pub fn notional(&self) -> i64 {
        self.estimated_price.value_of(self.shares)
    }

    /// Signed cash effect: positive for sells, negative for buys.
    #[inline]
    pub fn cash_effect(&self) -> i64 {
        self.side.cash_sign() * self.notional()
    }
}

impl fmt::Display for TradeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} qty={} @ {}",
            self.side, self.ticker, self.shares, self.estimated_price
        )
    }
}

/// Ordered trade plan: every SELL precedes every BUY.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RebalancePlan {
    pub actions: Vec<TradeAction>,
    /// Portfolio value (cash + holdings) the targets were sized against
    pub total_value: i64,
    /// Cash before any trade
    pub cash_before: i64,
    /// Projected cash once every action has executed at its estimated price
    pub cash_after: i64,
}

impl RebalancePlan {
    fn empty(cash: i64, total_value: i64) -> Self {
        Self {
            actions: Vec::new(),
            total_value,
            cash_before: cash,
            cash_after: cash,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn sells(&self) -> impl Iterator<Item = &TradeAction> {
        self.actions.iter().filter(|a| a.side == Side::Sell)
    }

    pub fn buys(&self) -> impl Iterator<Item = &TradeAction> {
        self.actions.iter().filter(|a| a.side == Side::Buy)
    }

    /// Total value traded in either direction.
    pub fn turnover(&self) -> i64 {
        self.actions.iter().map(TradeAction::notional).sum()
    }

    /// Projected cash after the sells, before any buy.
    pub fn cash_after_sells(&self) -> i64 {
        self.cash_before + self.sells().map(TradeAction::notional).sum::<i64>()
    }
}

impl fmt::Display for RebalancePlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "REBALANCE PLAN:")?;
        if self.actions.is_empty() {
            writeln!(f, "  (no trades)")?;
        }
        for (i, a) in self.actions.iter().enumerate() {
            writeln!(
                f,
                "  {:>3}  {:4} {:12} {:>8} @ {:>10} = {:>14}",
                i + 1,
                a.side,
                a.ticker,
                a.shares,
                a.estimated_price,
                Price(a.notional()),
            )?;
        }
        writeln!(
            f,
            "  Cash: {} -> {} (turnover {})",
            Price(self.cash_before),
            Price(self.cash_after),
            Price(self.turnover()),
        )
    }
}

/// Slack below an integer share count that still counts as reaching it.
///
/// Far below one share, so it only absorbs float error in `weight × total`.
const SHARE_EPSILON: f64 = 1e-9;

/// Whole shares of a `price` instrument that fit in `weight` of `total`:
/// `floor(weight × total / price)`, never rounded up past the target value.
///
/// `price` must be positive.
pub fn target_shares(weight: f64, total: i64, price: Price) -> u64 {
    let exact = weight * total as f64 / price.0 as f64;
    // Saturating cast: NaN and negatives become 0.
    (exact + SHARE_EPSILON).floor() as u64
}

/// A buy that is wanted but not yet funded.
struct PendingBuy {
    ticker: Ticker,
    shares: u64,
    price: Price,
    /// |target weight - current weight|
    deviation: f64,
}

/// Compute the trades that move `holdings` + `cash` toward `targets`.
///
/// # Arguments
/// - `holdings`: current `(ticker, shares)`; repeated tickers are summed
/// - `cash`: uninvested cash in the smallest currency unit, must be ≥ 0
/// - `targets`: validated target weights (sum ≤ 1, remainder stays in cash)
/// - `prices`: current `(ticker, price)`; must cover every held or targeted ticker
///
/// # Errors
/// [`RebalanceError::MissingPrice`] or [`RebalanceError::InvalidPrice`] for
/// the first (by ticker order) ticker without a usable price.
/// [`RebalanceError::NegativeCash`] for negative cash.
/// [`RebalanceError::Overflow`] when share counts or the portfolio value do
/// not fit. No partial plan is ever returned.
///
/// A portfolio worth nothing yields an empty plan.
pub fn compute_plan(
    holdings: &[(Ticker, u64)],
    cash: i64,
    targets: &TargetAllocation,
    prices: &[(Ticker, Price)],
) -> Result<RebalancePlan, RebalanceError> {
    if cash < 0 {
        return Err(RebalanceError::NegativeCash(Price(cash)));
    }

    let price_map: FxHashMap<Ticker, Price> = prices.iter().copied().collect();
    let mut current: FxHashMap<Ticker, u64> = FxHashMap::default();
    for &(ticker, shares) in holdings {
        let held = current.entry(ticker).or_insert(0);
        *held = held
            .checked_add(shares)
            .ok_or(RebalanceError::Overflow(ticker))?;
    }

    // Sorted universe gives deterministic SELL order and error reporting.
    let universe: BTreeSet<Ticker> = current.keys().copied().chain(targets.tickers()).collect();

    let mut quoted: Vec<(Ticker, Price)> = Vec::with_capacity(universe.len());
    for &ticker in &universe {
        let price = *price_map
            .get(&ticker)
            .ok_or(RebalanceError::MissingPrice(ticker))?;
        if !price.is_positive() {
            return Err(RebalanceError::InvalidPrice { ticker, price });
        }
        quoted.push((ticker, price));
    }

    let mut total = cash;
    for &(ticker, price) in &quoted {
        let held = current.get(&ticker).copied().unwrap_or(0);
        total = price
            .checked_value_of(held)
            .and_then(|value| total.checked_add(value))
            .ok_or(RebalanceError::Overflow(ticker))?;
    }
    if total == 0 {
        return Ok(RebalancePlan::empty(cash, total));
    }

    let mut actions = Vec::new();
    let mut pending = Vec::new();
    let mut projected_cash = cash;

    for &(ticker, price) in &quoted {
        let weight = targets.weight(&ticker);
        let held = current.get(&ticker).copied().unwrap_or(0);

        let wanted = target_shares(weight, total, price);

        if wanted < held {
            let shares = held - wanted;
            // Bounded by `total`, which fits.
            projected_cash += price.value_of(shares);
            actions.push(TradeAction {
                ticker,
                side: Side::Sell,
                shares,
                estimated_price: price,
            });
        } else if wanted > held {
            let current_weight = price.value_of(held) as f64 / total as f64;
            pending.push(PendingBuy {
                ticker,
                shares: wanted - held,
                price,
                deviation: (weight - current_weight).abs(),
            });
        }
    }

    pending.sort_by(|a, b| {
        b.deviation
            .total_cmp(&a.deviation)
            .then_with(|| a.ticker.cmp(&b.ticker))
    });

    for buy in pending {
        let affordable = (projected_cash / buy.price.0) as u64;
        let shares = buy.shares.min(affordable);
        if shares == 0 {
            continue;
        }
        // At most `projected_cash`, so never below zero.
        projected_cash -= buy.price.value_of(shares);
        actions.push(TradeAction {
            ticker: buy.ticker,
            side: Side::Buy,
            shares,
            estimated_price: buy.price,
        });
    }

    Ok(RebalancePlan {
        actions,
        total_value: total,
        cash_before: cash,
        cash_after: projected_cash,
    })
}
