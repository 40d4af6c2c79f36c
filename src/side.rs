//! Trade side: Buy or Sell

use std::fmt;

/// Direction of a trade action.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "UPPERCASE"))]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    /// Sign of the cash movement caused by a trade on this side:
    /// buys spend cash (`-1`), sells raise it (`+1`).
    #[inline]
    pub fn cash_sign(self) -> i64 {
        match self {
            Side::Buy => -1,
            Side::Sell => 1,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Buy => f.pad("BUY"),
            Side::Sell => f.pad("SELL"),
        }
    }
}
