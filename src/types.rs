//! Core types: Price, Ticker

use std::fmt;

/// Price in smallest currency units (e.g., paise, cents).
///
/// `Price(92975)` represents 929.75 with two decimal places.
/// Using fixed-point avoids floating-point errors in financial calculations.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Price(pub i64);

impl Price {
    pub const ZERO: Price = Price(0);

    /// True if the price is strictly positive.
    #[inline]
    pub fn is_positive(self) -> bool {
        self.0 > 0
    }

    /// Parse a decimal string such as `"929.75"`, `"1,394.20"` or `"₹ 736.95"`.
    ///
    /// Currency symbols and thousands separators are stripped. The value is
    /// rounded half-up to two decimals. Returns `None` for anything that is
    /// not a finite number.
    pub fn parse_decimal(s: &str) -> Option<Price> {
        let cleaned: String = s
            .chars()
            .filter(|c| !matches!(c, '$' | '₹' | ',' | ' '))
            .collect();
        if cleaned.is_empty() {
            return None;
        }
        let value: f64 = cleaned.parse().ok()?;
        if !value.is_finite() {
            return None;
        }
        let units = (value * 100.0).round();
        if units.abs() >= i64::MAX as f64 {
            return None;
        }
        Some(Price(units as i64))
    }

    /// Value of `shares` units at this price, or `None` if it does not fit in
    /// an `i64`.
    #[inline]
    pub fn checked_value_of(self, shares: u64) -> Option<i64> {
        i64::try_from(shares).ok()?.checked_mul(self.0)
    }

    /// Value of `shares` units at this price, saturating at the `i64` bounds.
    ///
    /// [`Portfolio`](crate::portfolio::Portfolio) and
    /// [`compute_plan`](crate::rebalance::compute_plan) reject values out of
    /// range, so for their holdings and plans this is exact.
    #[inline]
    pub fn value_of(self, shares: u64) -> i64 {
        self.checked_value_of(shares)
            .unwrap_or(if self.0 < 0 { i64::MIN } else { i64::MAX })
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = (self.0 / 100).abs();
        let frac = (self.0 % 100).abs();
        let sign = if self.0 < 0 { "-" } else { "" };
        f.pad(&format!("{sign}{whole}.{frac:02}"))
    }
}

/// Maximum ticker length in bytes.
pub const MAX_TICKER_LEN: usize = 16;

/// An exchange ticker stored inline (no heap allocation, `Copy`).
///
/// Tickers are ASCII, 1..=16 bytes, made of letters, digits and `. - & _`.
/// Letters are upper-cased on construction so `"aapl"` and `"AAPL"` compare equal.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Ticker {
    // Zero-padded, so the derived ordering is lexicographic.
    bytes: [u8; MAX_TICKER_LEN],
    len: u8,
}

impl Ticker {
    /// Build a ticker, returning `None` if `s` is empty, too long, or contains
    /// characters outside the allowed set.
    pub fn try_new(s: &str) -> Option<Ticker> {
        let s = s.trim();
        if s.is_empty() || s.len() > MAX_TICKER_LEN {
            return None;
        }
        let mut bytes = [0u8; MAX_TICKER_LEN];
        for (slot, b) in bytes.iter_mut().zip(s.bytes()) {
            if !(b.is_ascii_alphanumeric() || matches!(b, b'.' | b'-' | b'&' | b'_')) {
                return None;
            }
            *slot = b.to_ascii_uppercase();
        }
        Some(Ticker {
            bytes,
            len: s.len() as u8,
        })
    }

    /// Build a ticker from a literal.
    ///
    /// # Panics
    ///
    /// Panics if `s` is not a valid ticker. Use [`Ticker::try_new`] for untrusted input.
    #[track_caller]
    pub fn new(s: &str) -> Ticker {
        match Ticker::try_new(s) {
            Some(t) => t,
            None => panic!("invalid ticker: {s:?}"),
        }
    }

    /// The ticker as a string slice.
    pub fn as_str(&self) -> &str {
        // Only ASCII bytes are ever stored.
        std::str::from_utf8(&self.bytes[..self.len as usize]).unwrap_or_default()
    }
}

impl fmt::Display for Ticker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl fmt::Debug for Ticker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Ticker({:?})", self.as_str())
    }
}

impl std::str::FromStr for Ticker {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ticker::try_new(s).ok_or_else(|| format!("invalid ticker: {s:?}"))
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for Ticker {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for Ticker {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = <std::borrow::Cow<'de, str>>::deserialize(deserializer)?;
        Ticker::try_new(&s).ok_or_else(|| serde::de::Error::custom(format!("invalid ticker: {s:?}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn price_ordering() {
        assert!(Price(100) < Price(200));
        assert!(Price(-50) < Price(50));
        assert_eq!(Price(100), Price(100));
    }

    #[test]
    fn price_display() {
        assert_eq!(format!("{}", Price(92975)), "929.75");
        assert_eq!(format!("{}", Price(100)), "1.00");
        assert_eq!(format!("{}", Price(5)), "0.05");
        assert_eq!(format!("{}", Price(-250)), "-2.50");
        assert_eq!(format!("{}", Price(-50)), "-0.50");
        assert_eq!(format!("{:>8}", Price(100)), "    1.00");
    }

    #[test]
    fn parse_decimal_prices() {
        assert_eq!(Price::parse_decimal("929.75"), Some(Price(92975)));
        assert_eq!(Price::parse_decimal("1,394.20"), Some(Price(139420)));
        assert_eq!(Price::parse_decimal("₹ 736.95"), Some(Price(73695)));
        assert_eq!(Price::parse_decimal("$100"), Some(Price(10000)));
        assert_eq!(Price::parse_decimal(""), None);
        assert_eq!(Price::parse_decimal("abc"), None);
        assert_eq!(Price::parse_decimal("NaN"), None);
    }

    #[test]
    fn value_of_shares() {
        assert_eq!(Price(929_75).value_of(106), 98553_50);
    }

    #[test]
    fn value_of_out_of_range() {
        assert_eq!(Price(10_000_00).checked_value_of(20_000_000_000_000), None);
        assert_eq!(Price(1).checked_value_of(u64::MAX), None);
        assert_eq!(Price(10_000_00).value_of(20_000_000_000_000), i64::MAX);
        assert_eq!(Price(-1).value_of(u64::MAX), i64::MIN);
        assert_eq!(Price(2).checked_value_of(3), Some(6));
    }

    #[test]
    fn ticker_normalises_case() {
        assert_eq!(Ticker::new("aapl"), Ticker::new("AAPL"));
        assert_eq!(Ticker::new(" kims ").as_str(), "KIMS");
    }

    #[test]
    fn ticker_accepts_exchange_symbols() {
        assert!(Ticker::try_new("ICICIBANK").is_some());
        assert!(Ticker::try_new("M&M").is_some());
        assert!(Ticker::try_new("BRK.B").is_some());
        assert!(Ticker::try_new("BAJAJ-AUTO").is_some());
    }

    #[test]
    fn ticker_rejects_bad_input() {
        assert!(Ticker::try_new("").is_none());
        assert!(Ticker::try_new("   ").is_none());
        assert!(Ticker::try_new("A B").is_none());
        assert!(Ticker::try_new("ABCDEFGHIJKLMNOPQ").is_none()); // 17 bytes
        assert!(Ticker::try_new("ÄPPL").is_none());
    }

    #[test]
    fn ticker_ordering_is_lexicographic() {
        let mut v = vec![
            Ticker::new("MSFT"),
            Ticker::new("B"),
            Ticker::new("AAPL"),
            Ticker::new("AA"),
        ];
        v.sort();
        let names: Vec<_> = v.iter().map(|t| t.as_str()).collect();
        assert_eq!(names, ["AA", "AAPL", "B", "MSFT"]);
    }

    #[test]
    fn ticker_display_pads() {
        assert_eq!(format!("{:6}|", Ticker::new("NH")), "NH    |");
    }
}
