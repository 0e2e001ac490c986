//! Daily report text.
//!
//! Computes the day-over-day change between two sheet totals and renders the
//! message mailed to the portfolio owner. Dates are spelled out the way a person
//! would write them: `Monday, January 2nd`.
use chrono::{Datelike, Local, NaiveDate};
use rust_decimal::Decimal;

use crate::currency::CurrencyAmount;
use crate::error::ReportFormatError;
use crate::quote::{parse_change, signed};

/// Width the signed change is right-aligned to in the movers block.
pub const MOVER_CHANGE_WIDTH: usize = 10;
/// Width the symbol column is padded to in the movers block.
pub const MOVER_SYMBOL_WIDTH: usize = 6;

/// A ticker and its change for the day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mover {
    /// Ticker text as shown in the sheet.
    pub symbol: String,
    /// Signed change from the previous close.
    pub change: Decimal,
}

impl Mover {
    /// Builds a mover from the ticker and change cells of a portfolio row.
    /// Returns `None` when either cell is blank or the change is not numeric.
    pub fn from_cells(symbol: &str, change: &str) -> Option<Self> {
        let symbol = symbol.trim();
        if symbol.is_empty() {
            return None;
        }
        Some(Mover {
            symbol: symbol.to_string(),
            change: parse_change(change)?,
        })
    }
}

/// Optional report sections.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportExtras {
    /// A named value from the sheet, e.g. `("Cash:", "$2,000.00")`.
    pub custom_value: Option<(String, String)>,
    /// Tracked tickers with their change for the day.
    pub movers: Vec<Mover>,
}

/// Rendered report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    /// Mail subject line.
    pub subject: String,
    /// Mail body.
    pub body: String,
    /// Percentage change, rounded to two decimals.
    pub change_percent: Decimal,
}

/// Percentage change from `previous` to `current`, rounded to two decimals.
pub fn percent_change(previous: &CurrencyAmount, current: &CurrencyAmount) -> Result<Decimal, ReportFormatError> {
    if previous.is_zero() {
        return Err(ReportFormatError::DivisionByZero);
    }
    let delta = current.value() - previous.value();
    let ratio = delta
        .checked_div(previous.value())
        .ok_or(ReportFormatError::DivisionByZero)?;
    Ok((ratio * Decimal::ONE_HUNDRED).round_dp(2))
}

/// Formats a report dated today (local time).
pub fn format_report(
    previous: &str,
    current: &str,
    extras: &ReportExtras,
) -> Result<Report, ReportFormatError> {
    format_report_on(Local::now().date_naive(), previous, current, extras)
}

/// Formats a report for an explicit date.
pub fn format_report_on(
    date: NaiveDate,
    previous: &str,
    current: &str,
    extras: &ReportExtras,
) -> Result<Report, ReportFormatError> {
    let previous = CurrencyAmount::parse(previous)?;
    let current = CurrencyAmount::parse(current)?;
    let change_percent = percent_change(&previous, &current)?;

    let subject = format!("Daily Stock Report For {}", long_date(date));

    let mut lines = vec![
        "Daily Stock Report".to_string(),
        String::new(),
        format!("Yesterday's ending value: {previous}"),
        format!("Today's ending value: {current}"),
        format!("Overall increase/decrease: {}%", render_percent(change_percent)),
    ];
    if let Some((name, value)) = &extras.custom_value {
        lines.push(format!("{} {}", name.trim(), value.trim()));
    }
    if !extras.movers.is_empty() {
        lines.push(String::new());
        lines.push("Biggest movers:".to_string());
        lines.extend(movers_block(&extras.movers));
    }
    lines.push(String::new());
    lines.push("Have a great day!".to_string());

    Ok(Report {
        subject,
        body: lines.join("\n"),
        change_percent,
    })
}

/// `Monday, January 2nd`
pub fn long_date(date: NaiveDate) -> String {
    format!("{} {}", date.format("%A, %B"), ordinal(date.day()))
}

/// `1` → `1st`, `12` → `12th`, `22` → `22nd`.
pub fn ordinal(day: u32) -> String {
    let suffix = if (4..=20).contains(&(day % 100)) {
        "th"
    } else {
        match day % 10 {
            1 => "st",
            2 => "nd",
            3 => "rd",
            _ => "th",
        }
    };
    format!("{day}{suffix}")
}

/// Renders `5` as `5.0` and `2.50` as `2.5`.
fn render_percent(value: Decimal) -> String {
    let normalized = value.normalize();
    if normalized.scale() == 0 {
        format!("{normalized}.0")
    } else {
        normalized.to_string()
    }
}

fn movers_block(movers: &[Mover]) -> Vec<String> {
    let mut sorted = movers.to_vec();
    sorted.sort_by(|a, b| {
        b.change
            .abs()
            .cmp(&a.change.abs())
            .then_with(|| a.symbol.cmp(&b.symbol))
    });
    sorted
        .iter()
        .map(|mover| {
            format!(
                "{:<sw$}{:>cw$}",
                mover.symbol,
                signed(mover.change),
                sw = MOVER_SYMBOL_WIDTH,
                cw = MOVER_CHANGE_WIDTH
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn monday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2023, 1, 2).unwrap()
    }

    #[test]
    fn five_percent_increase() {
        let report = format_report_on(monday(), "$1,000.00", "$1,050.00", &ReportExtras::default()).unwrap();
        assert_eq!(report.change_percent, Decimal::new(5, 0));
        assert!(report.body.contains("Overall increase/decrease: 5.0%"));
        assert_eq!(report.subject, "Daily Stock Report For Monday, January 2nd");
    }

    #[test]
    fn zero_previous_total_is_an_error() {
        let err = format_report_on(monday(), "$0.00", "$1,050.00", &ReportExtras::default()).unwrap_err();
        assert_eq!(err, ReportFormatError::DivisionByZero);
    }

    #[test]
    fn malformed_total_is_an_error() {
        let err = format_report_on(monday(), "1000", "$1,050.00", &ReportExtras::default()).unwrap_err();
        assert_eq!(err, ReportFormatError::MalformedAmount("1000".to_string()));
    }

    #[test]
    fn decrease_is_rounded_to_two_places() {
        let previous = CurrencyAmount::parse("$3,000.00").unwrap();
        let current = CurrencyAmount::parse("$2,900.00").unwrap();
        assert_eq!(percent_change(&previous, &current).unwrap(), Decimal::new(-333, 2));
        assert_eq!(render_percent(Decimal::new(-333, 2)), "-3.33");
        assert_eq!(render_percent(Decimal::new(250, 2)), "2.5");
    }

    #[test]
    fn ordinals() {
        let cases = [
            (1, "1st"), (2, "2nd"), (3, "3rd"), (4, "4th"), (11, "11th"), (12, "12th"),
            (13, "13th"), (20, "20th"), (21, "21st"), (22, "22nd"), (23, "23rd"), (30, "30th"), (31, "31st"),
        ];
        for (day, expected) in cases {
            assert_eq!(ordinal(day), expected);
        }
    }

    #[test]
    fn custom_value_and_movers_sections() {
        let extras = ReportExtras {
            custom_value: Some(("Cash:".to_string(), "$2,000.00".to_string())),
            movers: vec![
                Mover::from_cells("MSFT", "-0.50").unwrap(),
                Mover::from_cells("AAPL", "+1.20").unwrap(),
            ],
        };
        let report = format_report_on(monday(), "$1,000.00", "$1,050.00", &extras).unwrap();
        let lines: Vec<&str> = report.body.lines().collect();

        assert!(lines.contains(&"Cash: $2,000.00"));
        let header = lines.iter().position(|l| *l == "Biggest movers:").unwrap();
        assert_eq!(lines[header + 1], "AAPL       +1.20");
        assert_eq!(lines[header + 2], "MSFT       -0.50");
        assert_eq!(lines.last(), Some(&"Have a great day!"));
    }

    #[test]
    fn blank_cells_are_not_movers() {
        assert!(Mover::from_cells("", "+1.00").is_none());
        assert!(Mover::from_cells("AAPL", "").is_none());
    }
}
