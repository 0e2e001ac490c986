//! Quote payload written into the portfolio sheet.
//!
//! Prices and changes travel as text because that is what ends up in the
//! cells. `QuoteRecord::from_decimals` fixes the rendering: two decimals for the
//! price, an explicit sign for the change.
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::tickers::TickerSymbol;

/// Last trade and day change for a single ticker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteRecord {
    /// Symbol the quote belongs to.
    pub symbol: TickerSymbol,
    /// Last traded price, e.g. `150.00`.
    pub last_price: String,
    /// Change from the previous close, e.g. `+1.20`.
    pub change: String,
}

impl QuoteRecord {
    /// Builds a record from already formatted text.
    pub fn new(symbol: TickerSymbol, last_price: impl Into<String>, change: impl Into<String>) -> Self {
        QuoteRecord {
            symbol,
            last_price: last_price.into(),
            change: change.into(),
        }
    }

    /// Builds a record from numeric values.
    pub fn from_decimals(symbol: TickerSymbol, last_price: Decimal, change: Decimal) -> Self {
        QuoteRecord {
            symbol,
            last_price: format!("{:.2}", last_price.round_dp(2)),
            change: signed(change),
        }
    }
}

/// Renders a change with two decimals and an explicit sign (`+0.00` for flat).
pub fn signed(change: Decimal) -> String {
    let rounded = change.round_dp(2);
    if rounded.is_sign_negative() && !rounded.is_zero() {
        format!("-{:.2}", rounded.abs())
    } else {
        format!("+{:.2}", rounded.abs())
    }
}

/// Parses change text such as `+1.20` or `-0.50`.
pub fn parse_change(text: &str) -> Option<Decimal> {
    let trimmed = text.trim();
    let unsigned = trimmed.strip_prefix('+').unwrap_or(trimmed);
    unsigned.parse::<Decimal>().ok()
}
