//! Price table parsing: `Ticker,Price` CSV -> `(Ticker, Price)` quotes.
//!
//! The price feed itself is outside this crate; callers export quotes to a
//! CSV file and hand it over. `Current Price` is accepted as an alias for
//! the `Price` column so a holdings export can double as a quote sheet.

use std::io::Read;
use std::path::Path;

use rustc_hash::FxHashMap;

use crate::error::ParseError;
use crate::types::{Price, Ticker};

/// Parse a price table from any reader.
///
/// Rows keep input order. Duplicate tickers, unparsable or non-positive
/// prices fail with the offending line.
pub fn parse_prices<R: Read>(reader: R) -> Result<Vec<(Ticker, Price)>, ParseError> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = rdr.headers()?.clone();
    let column = |name: &str| headers.iter().position(|h| h.eq_ignore_ascii_case(name));
    let ticker_col = column("Ticker").ok_or(ParseError::MissingColumn("Ticker"))?;
    let price_col = column("Price")
        .or_else(|| column("Current Price"))
        .ok_or(ParseError::MissingColumn("Price"))?;

    let mut seen: FxHashMap<Ticker, u64> = FxHashMap::default();
    let mut quotes = Vec::new();
    for record in rdr.records() {
        let record = record?;
        let line = record.position().map(|p| p.line()).unwrap_or(0);

        let raw_ticker = record.get(ticker_col).unwrap_or("");
        let ticker = Ticker::try_new(raw_ticker)
            .ok_or_else(|| ParseError::row(line, format!("invalid ticker {raw_ticker:?}")))?;

        let raw_price = record.get(price_col).unwrap_or("");
        let price = Price::parse_decimal(raw_price)
            .filter(|p| p.is_positive())
            .ok_or_else(|| {
                ParseError::row(line, format!("price for {ticker} ({raw_price:?}) must be > 0"))
            })?;

        if let Some(first) = seen.insert(ticker, line) {
            return Err(ParseError::row(
                line,
                format!("duplicate ticker {ticker} (first seen on line {first})"),
            ));
        }
        quotes.push((ticker, price));
    }
    Ok(quotes)
}

/// Load a price table from a CSV file.
pub fn load_prices(path: &Path) -> Result<Vec<(Ticker, Price)>, ParseError> {
    let file = std::fs::File::open(path).map_err(|e| ParseError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    parse_prices(file)
}

/// Overlay quote tables: later tables win for tickers they share.
///
/// The result is sorted by ticker.
pub fn merge_prices(tables: &[&[(Ticker, Price)]]) -> Vec<(Ticker, Price)> {
    let mut merged: FxHashMap<Ticker, Price> = FxHashMap::default();
    for table in tables {
        merged.extend(table.iter().copied());
    }
    let mut out: Vec<_> = merged.into_iter().collect();
    out.sort_by_key(|(t, _)| *t);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_simple_table() {
        let quotes = parse_prices("Ticker,Price\nFORTIS,929.75\nkims,736.95\n".as_bytes()).unwrap();
        assert_eq!(
            quotes,
            vec![
                (Ticker::new("FORTIS"), Price(929_75)),
                (Ticker::new("KIMS"), Price(736_95)),
            ]
        );
    }

    #[test]
    fn current_price_alias() {
        let input = "Name,Ticker,Current Price\nRadico Khaitan Ltd,RADICO,\"2,896.70\"\n";
        let quotes = parse_prices(input.as_bytes()).unwrap();
        assert_eq!(quotes, vec![(Ticker::new("RADICO"), Price(2896_70))]);
    }

    #[test]
    fn missing_price_column() {
        let err = parse_prices("Ticker,Last\nA,1\n".as_bytes()).unwrap_err();
        assert!(matches!(err, ParseError::MissingColumn("Price")));
    }

    #[test]
    fn rejects_non_positive_price() {
        let err = parse_prices("Ticker,Price\nA,1\nB,0\n".as_bytes()).unwrap_err();
        assert!(matches!(err, ParseError::Row { line: 3, .. }));
        assert!(parse_prices("Ticker,Price\nA,-5\n".as_bytes()).is_err());
        assert!(parse_prices("Ticker,Price\nA,n/a\n".as_bytes()).is_err());
    }

    #[test]
    fn rejects_duplicates() {
        let err = parse_prices("Ticker,Price\nA,1\nB,2\na,3\n".as_bytes()).unwrap_err();
        match err {
            ParseError::Row { line, reason } => {
                assert_eq!(line, 4);
                assert!(reason.contains("line 2"), "{reason}");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn merge_later_wins() {
        let a = Ticker::new("A");
        let b = Ticker::new("B");
        let base = [(a, Price(1_00)), (b, Price(2_00))];
        let fresh = [(b, Price(3_00))];
        assert_eq!(
            merge_prices(&[&base[..], &fresh[..]]),
            vec![(a, Price(1_00)), (b, Price(3_00))]
        );
    }
}
