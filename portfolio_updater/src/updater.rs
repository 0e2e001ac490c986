//! Batch updater: writes live prices into the portfolio sheet.
//!
//! Every write is planned before the first one is issued. An unknown ticker or
//! a missing "Last updated:" label aborts the run with the sheet untouched.
use std::collections::HashMap;

use chrono::NaiveDateTime;
use log::{debug, info};
use portfolio_common::{
    CellRange, CellRef, CellWrite, PortfolioError, QuoteRecord, Result, SheetStore, TickerSymbol, map_tickers,
};

use crate::fetcher::{QuoteSource, fetch_quotes};
use crate::retry::Retry;

/// Timestamp written next to the "Last updated:" label.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Where the ticker rows are.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowSource {
    /// A named range, or an A1 range, of ticker cells.
    Named(String),
    /// A fixed block of the ticker column.
    Span(CellRange),
}

/// Columns, rows and labels the updater works with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceLayout {
    pub sheet: String,
    pub header_label: String,
    pub price_column: u32,
    pub change_column: u32,
    pub rows: RowSource,
    pub last_updated_label: String,
}

/// One ticker row of the portfolio sheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortfolioRow {
    pub row: u32,
    pub ticker: String,
}

/// Reads the ticker cells the layout points at, blank cells included.
pub fn read_rows<S: SheetStore + ?Sized>(store: &S, layout: &PriceLayout) -> Result<Vec<PortfolioRow>> {
    let column = match &layout.rows {
        RowSource::Named(range) => store.read_range(&layout.sheet, range)?,
        RowSource::Span(span) => store.read_range(&layout.sheet, &span.to_a1())?,
    };
    Ok(column
        .rows()
        .map(|(row, ticker)| PortfolioRow {
            row,
            ticker: ticker.to_string(),
        })
        .collect())
}

/// Plans the price and change writes for `rows`.
///
/// Blank ticker cells and the header label are skipped. A ticker with no quote
/// fails the whole plan.
pub fn plan_price_writes(
    rows: &[PortfolioRow],
    quotes: &HashMap<TickerSymbol, QuoteRecord>,
    layout: &PriceLayout,
) -> Result<Vec<CellWrite>> {
    let mut writes = Vec::with_capacity(rows.len() * 2);
    for portfolio_row in rows {
        let ticker = portfolio_row.ticker.trim();
        if ticker.is_empty() || ticker == layout.header_label.trim() {
            continue;
        }
        let unknown = || PortfolioError::UnknownTicker {
            row: portfolio_row.row,
            symbol: ticker.to_string(),
        };
        let symbol = TickerSymbol::new(ticker).map_err(|_| unknown())?;
        let quote = quotes.get(&symbol).ok_or_else(unknown)?;
        debug!("Row {}: {} {} {}", portfolio_row.row, symbol, quote.last_price, quote.change);
        writes.push(CellWrite::new(
            CellRef::new(portfolio_row.row, layout.price_column)?,
            quote.last_price.clone(),
        ));
        writes.push(CellWrite::new(
            CellRef::new(portfolio_row.row, layout.change_column)?,
            quote.change.clone(),
        ));
    }
    Ok(writes)
}

/// Writes prices, changes and the update timestamp; returns the rows updated.
pub fn update_prices<S: SheetStore + ?Sized>(
    store: &mut S,
    layout: &PriceLayout,
    quotes: &HashMap<TickerSymbol, QuoteRecord>,
    now: NaiveDateTime,
) -> Result<usize> {
    let rows = read_rows(store, layout)?;
    apply_prices(store, layout, &rows, quotes, now)
}

/// Plans every write for `rows`, then sends prices, changes and the timestamp
/// in one batch.
fn apply_prices<S: SheetStore + ?Sized>(
    store: &mut S,
    layout: &PriceLayout,
    rows: &[PortfolioRow],
    quotes: &HashMap<TickerSymbol, QuoteRecord>,
    now: NaiveDateTime,
) -> Result<usize> {
    let mut writes = plan_price_writes(rows, quotes, layout)?;
    let updated = writes.len() / 2;
    let label = store
        .find_cell(&layout.sheet, &layout.last_updated_label)?
        .ok_or_else(|| PortfolioError::label_not_found(&layout.sheet, &layout.last_updated_label))?;
    writes.push(CellWrite::new(label.right(), now.format(TIMESTAMP_FORMAT).to_string()));

    store.write_cells(&layout.sheet, &writes)?;
    info!("Updated {updated} rows on {:?}", layout.sheet);
    Ok(updated)
}

/// Update mode end to end: tickers from the sheet, one quote fetch, one batch.
pub fn run_update<S, Q>(store: &mut S, layout: &PriceLayout, source: &Q, retry: Retry, now: NaiveDateTime) -> Result<usize>
where
    S: SheetStore + ?Sized,
    Q: QuoteSource + ?Sized,
{
    let rows = read_rows(store, layout)?;
    let tickers: Vec<&str> = rows.iter().map(|row| row.ticker.as_str()).collect();
    let symbols = map_tickers(&tickers, &layout.header_label);
    info!("Tracking {} tickers on {:?}", symbols.len(), layout.sheet);

    let quotes = retry.run("quote fetch", || fetch_quotes(source, &symbols))?;
    apply_prices(store, layout, &rows, &quotes, now)
}
