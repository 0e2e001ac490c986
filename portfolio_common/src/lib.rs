//!
//! Common types and logic shared by the portfolio updater.
//!
//! This crate aggregates:
//! - `error`: unified error type `PortfolioError` used across the workspace.
//! - `result`: handy `Result<T, PortfolioError>` alias.
//! - `tickers`: ticker symbols and the ticker column mapper.
//! - `currency`: `$1,234.56` amounts and their canonical values.
//! - `quote`: quote records as written into the sheet.
//! - `cell`: A1 cell addressing and batched cell writes.
//! - `sheet`: the spreadsheet store trait and its in-memory implementation.
//! - `history`: the append-only end-of-day log.
//! - `report`: the daily report text.
#![warn(missing_docs)]
pub mod cell;
pub mod currency;
pub mod error;
pub mod history;
pub mod quote;
pub mod report;
pub mod result;
pub mod sheet;
pub mod tickers;

pub use cell::{CellRange, CellRef, CellWrite};
pub use currency::CurrencyAmount;
pub use error::{PortfolioError, ReportFormatError};
pub use history::{HistoryEntry, HistoryLog, Snapshot, archive_snapshot};
pub use quote::QuoteRecord;
pub use report::{Mover, Report, ReportExtras, format_report, format_report_on};
pub use result::Result;
pub use sheet::{ColumnRange, DryRun, MemoryWorkbook, SheetStore};
pub use tickers::{TickerSymbol, map_tickers};
