//! A single long holding in a portfolio.

use crate::error::PortfolioError;
use crate::types::{Price, Ticker};

/// Shares of one instrument held in a portfolio.
///
/// All monetary values are in the smallest currency unit.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Holding {
    /// Ticker this holding is for
    pub ticker: Ticker,
    /// Display name (may be empty)
    #[cfg_attr(feature = "serde", serde(default))]
    pub name: String,
    /// Number of shares held
    pub shares: u64,
    /// Volume-weighted average buy price
    pub avg_buy_price: Price,
    /// Last known market price
    pub current_price: Price,
    /// Cumulative realized PnL from sells
    #[cfg_attr(feature = "serde", serde(default))]
    pub realized_pnl: i64,
}

impl Holding {
    /// Create a holding. Both prices must be positive.
    pub fn new(
        ticker: Ticker,
        shares: u64,
        avg_buy_price: Price,
        current_price: Price,
    ) -> Result<Self, PortfolioError> {
        for price in [avg_buy_price, current_price] {
            if !price.is_positive() {
                return Err(PortfolioError::InvalidPrice { ticker, price });
            }
        }
        Ok(Self {
            ticker,
            name: String::new(),
            shares,
            avg_buy_price,
            current_price,
            realized_pnl: 0,
        })
    }

    /// Attach a display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Market value at the current price.
    #[inline]
    pub fn current_value(&self) -> i64 {
        self.current_price.value_of(self.shares)
    }

    /// Cost basis: shares at the average buy price.
    #[inline]
    pub fn invested_value(&self) -> i64 {
        self.avg_buy_price.value_of(self.shares)
    }

    /// Unrealized PnL at the current price.
    #[inline]
    pub fn unrealized_pnl(&self) -> i64 {
        self.current_value() - self.invested_value()
    }

    /// Price return since purchase, in percent.
    pub fn returns_pct(&self) -> f64 {
        if self.avg_buy_price.0 == 0 {
            return 0.0;
        }
        (self.current_price.0 - self.avg_buy_price.0) as f64 / self.avg_buy_price.0 as f64 * 100.0
    }

    /// Add `qty` shares bought at `price`.
    ///
    /// The average buy price becomes the share-weighted average of the old
    /// cost basis and the new lot (integer division, truncating). Fails
    /// without change if the cost basis would overflow.
    pub fn buy(&mut self, qty: u64, price: Price) -> Result<(), PortfolioError> {
        if qty == 0 {
            return Ok(());
        }
        if self.shares == 0 {
            self.shares = qty;
            self.avg_buy_price = price;
            return Ok(());
        }
        let shares = self.shares.checked_add(qty).ok_or(PortfolioError::Overflow)?;
        let total_cost = self
            .avg_buy_price
            .checked_value_of(self.shares)
            .zip(price.checked_value_of(qty))
            .and_then(|(old, new)| old.checked_add(new))
            .ok_or(PortfolioError::Overflow)?;
        let divisor = i64::try_from(shares).map_err(|_| PortfolioError::Overflow)?;
        self.shares = shares;
        self.avg_buy_price = Price(total_cost / divisor);
        Ok(())
    }

    /// Remove `qty` shares sold at `price`, recording realized PnL.
    ///
    /// The average buy price of the remaining shares is unchanged.
    pub fn sell(&mut self, qty: u64, price: Price) -> Result<(), PortfolioError> {
        if qty > self.shares {
            return Err(PortfolioError::InsufficientShares {
                ticker: self.ticker,
                requested: qty,
                held: self.shares,
            });
        }
        let realized = Price(price.0 - self.avg_buy_price.0)
            .checked_value_of(qty)
            .and_then(|pnl| self.realized_pnl.checked_add(pnl))
            .ok_or(PortfolioError::Overflow)?;
        self.realized_pnl = realized;
        self.shares -= qty;
        Ok(())
    }

    /// Returns true if no shares are held.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.shares == 0
    }
}
