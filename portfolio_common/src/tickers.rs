//! Ticker symbols and the sheet row mapper.
//!
//! The ticker column of a portfolio sheet is read top-to-bottom, header
//! included. `map_tickers` turns that raw column into the set of symbols to
//! request quotes for.
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::PortfolioError;

/// Default header text above the ticker column.
pub const DEFAULT_HEADER_LABEL: &str = "Company";

/// Upper-cased ticker symbol (e.g. `AAPL`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TickerSymbol(String);

impl TickerSymbol {
    /// Builds a symbol from cell text. Surrounding whitespace is dropped and the
    /// text is upper-cased; blank text is rejected.
    pub fn new(raw: &str) -> Result<Self, PortfolioError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(PortfolioError::SheetAccess(
                "empty ticker symbol".to_string(),
            ));
        }
        Ok(TickerSymbol(trimmed.to_ascii_uppercase()))
    }

    /// Borrow the symbol text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TickerSymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for TickerSymbol {
    type Err = PortfolioError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TickerSymbol::new(s)
    }
}

impl TryFrom<String> for TickerSymbol {
    type Error = PortfolioError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        TickerSymbol::new(&value)
    }
}

impl From<TickerSymbol> for String {
    fn from(value: TickerSymbol) -> Self {
        value.0
    }
}

/// Maps the raw contents of a ticker column to the distinct symbols it names.
///
/// The header label and blank cells are dropped; duplicates collapse. The
/// result is ordered so that the batched quote query is deterministic.
pub fn map_tickers<S: AsRef<str>>(column_values: &[S], header_label: &str) -> BTreeSet<TickerSymbol> {
    column_values
        .iter()
        .map(|value| value.as_ref().trim())
        .filter(|value| !value.is_empty() && *value != header_label.trim())
        .filter_map(|value| TickerSymbol::new(value).ok())
        .collect()
}

/// Joins symbols with commas, the shape quote endpoints take them in.
pub fn join_symbols<'a, I>(symbols: I) -> String
where
    I: IntoIterator<Item = &'a TickerSymbol>,
{
    symbols
        .into_iter()
        .map(TickerSymbol::as_str)
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(symbols: &[&str]) -> BTreeSet<TickerSymbol> {
        symbols.iter().map(|s| TickerSymbol::new(s).unwrap()).collect()
    }

    #[test]
    fn drops_header_blanks_and_duplicates() {
        let column = ["Company", "AAPL", "AAPL", "", "MSFT"];
        assert_eq!(map_tickers(&column, DEFAULT_HEADER_LABEL), set(&["AAPL", "MSFT"]));
    }

    #[test]
    fn header_and_blanks_only_is_empty() {
        let column = ["Company", "", "  ", ""];
        assert!(map_tickers(&column, DEFAULT_HEADER_LABEL).is_empty());
    }

    #[test]
    fn custom_header_label_is_removed() {
        let column = vec!["Symbol".to_string(), "tsla".to_string()];
        assert_eq!(map_tickers(&column, "Symbol"), set(&["TSLA"]));
    }

    #[test]
    fn symbol_is_trimmed_and_uppercased() {
        let symbol: TickerSymbol = " brk.b ".parse().unwrap();
        assert_eq!(symbol.as_str(), "BRK.B");
        assert!(TickerSymbol::new("   ").is_err());
    }

    #[test]
    fn joins_in_set_order() {
        assert_eq!(join_symbols(&set(&["MSFT", "AAPL", "GOOG"])), "AAPL,GOOG,MSFT");
    }
}
