//! Currency amounts as they appear in sheet cells.
//!
//! Sheet totals are formatted like `$1,234.56`. The canonical value is what is
//! left after removing the leading currency symbol and the grouping commas.
//! Anything else is rejected instead of being sliced blindly.
use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;

use crate::error::ReportFormatError;

/// Symbol every sheet amount starts with.
pub const CURRENCY_SYMBOL: char = '$';

/// A sheet amount: the text as read plus its canonical decimal value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrencyAmount {
    text: String,
    value: Decimal,
}

impl CurrencyAmount {
    /// Parses `$1,234.56`, `$-12.00` or `-$12.00`.
    pub fn parse(raw: &str) -> Result<Self, ReportFormatError> {
        let text = raw.trim();
        let malformed = || ReportFormatError::MalformedAmount(raw.to_string());

        let (negative, rest) = match text.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, text),
        };
        let digits = rest.strip_prefix(CURRENCY_SYMBOL).ok_or_else(malformed)?;
        let canonical: String = digits.chars().filter(|c| *c != ',').collect();
        if canonical.is_empty() || canonical.starts_with('+') {
            return Err(malformed());
        }

        let mut value = Decimal::from_str(&canonical).map_err(|_| malformed())?;
        if negative {
            if value.is_sign_negative() {
                return Err(malformed());
            }
            value.set_sign_negative(true);
        }

        Ok(CurrencyAmount {
            text: text.to_string(),
            value,
        })
    }

    /// Renders a value in sheet style, e.g. `$1,234.56` or `-$12.00`.
    pub fn from_value(value: Decimal) -> Self {
        let rounded = value.round_dp(2);
        let plain = format!("{:.2}", rounded.abs());
        let (whole, cents) = plain.split_once('.').unwrap_or((plain.as_str(), "00"));
        let sign = if rounded.is_sign_negative() && !rounded.is_zero() { "-" } else { "" };
        CurrencyAmount {
            text: format!("{sign}{CURRENCY_SYMBOL}{}.{cents}", group_thousands(whole)),
            value: rounded,
        }
    }

    /// Canonical numeric value.
    pub fn value(&self) -> Decimal {
        self.value
    }

    /// The text as read from (or rendered for) the sheet.
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// True when the canonical value is zero.
    pub fn is_zero(&self) -> bool {
        self.value.is_zero()
    }
}

impl fmt::Display for CurrencyAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

impl FromStr for CurrencyAmount {
    type Err = ReportFormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CurrencyAmount::parse(s)
    }
}

fn group_thousands(digits: &str) -> String {
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (index, ch) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    grouped
}
