//! Error types shared between the library and the updater binary.
//!
//! The `PortfolioError` enum names the component that failed so a run can abort
//! with a message the sheet owner can act on. Every variant aborts the current
//! run; nothing is recovered into a partially updated portfolio.
use thiserror::Error;

/// Failures while turning sheet text into a report.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReportFormatError {
    /// The cell text is not a `$1,234.56`-style amount.
    #[error("malformed currency amount: {0:?}")]
    MalformedAmount(String),

    /// The previous total is zero, so no percentage change exists.
    #[error("division by zero: previous total is zero")]
    DivisionByZero,
}

/// Unified error type for a portfolio run.
#[derive(Error, Debug)]
pub enum PortfolioError {
    /// A required option is missing or invalid for the selected mode.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Credentials could not be loaded or were rejected by the backing store.
    #[error("Authentication error: {0}")]
    Authentication(String),

    /// The remote quote source failed, returned garbage, or answered short.
    #[error("Quote fetch error: {0}")]
    QuoteFetch(String),

    /// A portfolio row holds a ticker that has no fetched quote.
    #[error("Unknown ticker {symbol:?} in row {row}")]
    UnknownTicker {
        /// 1-based sheet row.
        row: u32,
        /// Ticker text found in the row.
        symbol: String,
    },

    /// Reading from or writing to the spreadsheet failed.
    #[error("Sheet access error: {0}")]
    SheetAccess(String),

    /// Amount parsing or percentage computation failed.
    #[error("Report format error: {0}")]
    ReportFormat(#[from] ReportFormatError),

    /// The mail transport refused or failed to deliver the report.
    #[error("Mail delivery error: {0}")]
    MailDelivery(String),
}

impl PortfolioError {
    /// Shorthand for a missing label on a sheet.
    pub fn label_not_found(sheet: &str, label: &str) -> Self {
        PortfolioError::SheetAccess(format!("label {label:?} not found on sheet {sheet:?}"))
    }

    /// Whether a retry of the same call could plausibly succeed.
    ///
    /// Only remote fetch and sheet access failures qualify. Unknown tickers,
    /// bad amounts and rejected credentials will fail the same way again.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            PortfolioError::QuoteFetch(_) | PortfolioError::SheetAccess(_)
        )
    }
}
