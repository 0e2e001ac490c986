//! End-of-day archiver.
//!
//! Copies the portfolio total into the next free row of the history sheet and
//! mails the daily report. Everything is read and the report is rendered before
//! the first write, so a bad amount or a zero previous total leaves the history
//! sheet as it was and sends nothing. A blank row between archived entries can
//! point the append at a row that is already taken; the run then stops instead
//! of overwriting it.
use std::collections::HashSet;

use chrono::NaiveDate;
use log::{debug, info};
use portfolio_common::report::Mover;
use portfolio_common::{
    CellRange, CellRef, CellWrite, CurrencyAmount, HistoryLog, PortfolioError, Report, ReportExtras, Result,
    SheetStore, Snapshot, archive_snapshot, format_report_on,
};

use crate::mailer::{MailTransport, OutgoingMail};
use crate::updater::{PriceLayout, read_rows};

/// Cells and sheets the archiver reads and appends to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveLayout {
    pub portfolio_sheet: String,
    pub history_sheet: String,
    pub value_column: u32,
    pub date_column: u32,
    pub snapshot_cell: CellRef,
    /// `None` takes the previous total from the last history entry.
    pub yesterday_label: Option<String>,
    pub custom_value_label: Option<String>,
    /// Ticker and change columns for the movers block.
    pub movers: Option<PriceLayout>,
}

/// Sender and recipients of the report.
#[derive(Debug, Clone)]
pub struct Envelope {
    pub from: String,
    pub to: String,
}

/// What a successful archive run did.
#[derive(Debug)]
pub struct Archived {
    pub snapshot: Snapshot,
    pub report: Report,
}

/// Archives today's total and mails the report.
pub fn archive_and_report<S, M>(
    store: &mut S,
    layout: &ArchiveLayout,
    mailer: &M,
    envelope: &Envelope,
    today: NaiveDate,
) -> Result<Archived>
where
    S: SheetStore + ?Sized,
    M: MailTransport + ?Sized,
{
    let current_text = store.read_cell(&layout.portfolio_sheet, layout.snapshot_cell)?;
    let current = CurrencyAmount::parse(&current_text)?;
    info!("End-of-day value from {}: {current}", layout.snapshot_cell);

    let history = read_history(store, layout)?;
    let snapshot = archive_snapshot(current, &history, today);
    let previous = previous_total(store, layout, &snapshot)?;
    let extras = read_extras(store, layout)?;

    let report = format_report_on(today, &previous, snapshot.entry.value.as_str(), &extras)?;
    debug!("Report:\n{}", report.body);

    let row = snapshot.row;
    let value_cell = CellRef::new(row, layout.value_column)?;
    let date_cell = CellRef::new(row, layout.date_column)?;
    ensure_free(store, &layout.history_sheet, row, &[value_cell, date_cell])?;
    store.write_cells(
        &layout.history_sheet,
        &[
            CellWrite::new(value_cell, snapshot.entry.value.as_str()),
            CellWrite::new(date_cell, snapshot.entry.date_text()),
        ],
    )?;
    info!("Archived {} for {} at row {row} of {:?}", snapshot.entry.value, snapshot.entry.date_text(), layout.history_sheet);

    mailer.send(&OutgoingMail::from_report(&envelope.from, &envelope.to, &report))?;
    Ok(Archived { snapshot, report })
}

fn read_history<S: SheetStore + ?Sized>(store: &S, layout: &ArchiveLayout) -> Result<HistoryLog> {
    let dates = store.read_column(&layout.history_sheet, layout.date_column)?;
    let values = store.read_column(&layout.history_sheet, layout.value_column)?;
    // Both columns are expected to start at row 1; pad so indices line up by row.
    let offset = |start: CellRef| start.row.saturating_sub(1) as usize;
    let mut date_cells = vec![String::new(); offset(dates.start)];
    date_cells.extend(dates.values);
    let mut value_cells = vec![String::new(); offset(values.start)];
    value_cells.extend(values.values);
    Ok(HistoryLog::from_columns(&date_cells, &value_cells))
}

/// Fails when any of `cells` on the append row already holds text.
fn ensure_free<S: SheetStore + ?Sized>(store: &S, sheet: &str, row: u32, cells: &[CellRef]) -> Result<()> {
    for &cell in cells {
        let existing = store.read_cell(sheet, cell)?;
        if !existing.trim().is_empty() {
            return Err(PortfolioError::SheetAccess(format!(
                "history row {row} of {sheet:?} is not free: {cell} holds {:?}",
                existing.trim()
            )));
        }
    }
    Ok(())
}

fn previous_total<S: SheetStore + ?Sized>(store: &S, layout: &ArchiveLayout, snapshot: &Snapshot) -> Result<String> {
    match &layout.yesterday_label {
        Some(label) => Ok(store.read_labeled(&layout.portfolio_sheet, label)?.1),
        None => snapshot
            .previous
            .as_ref()
            .map(|amount| amount.as_str().to_string())
            .ok_or_else(|| {
                PortfolioError::SheetAccess(format!(
                    "no previous total: {:?} has no archived values",
                    layout.history_sheet
                ))
            }),
    }
}

fn read_extras<S: SheetStore + ?Sized>(store: &S, layout: &ArchiveLayout) -> Result<ReportExtras> {
    let custom_value = match &layout.custom_value_label {
        Some(label) => Some((label.clone(), store.read_labeled(&layout.portfolio_sheet, label)?.1)),
        None => None,
    };
    let movers = match &layout.movers {
        Some(prices) => read_movers(store, prices)?,
        None => Vec::new(),
    };
    Ok(ReportExtras { custom_value, movers })
}

/// Tickers with their change cells, read as two column slices. A ticker held on
/// several rows is listed once, from its first row.
fn read_movers<S: SheetStore + ?Sized>(store: &S, layout: &PriceLayout) -> Result<Vec<Mover>> {
    let rows = read_rows(store, layout)?;
    let (Some(first), Some(last)) = (rows.first(), rows.last()) else {
        return Ok(Vec::new());
    };
    let changes_range = CellRange {
        start: CellRef::new(first.row, layout.change_column)?,
        end: CellRef::new(last.row, layout.change_column)?,
    };
    let changes = store.read_range(&layout.sheet, &changes_range.to_a1())?;
    let header = layout.header_label.trim();
    let mut seen = HashSet::new();

    Ok(rows
        .iter()
        .filter(|row| row.ticker.trim() != header)
        .filter_map(|row| {
            let change = changes.rows().find(|(r, _)| *r == row.row).map_or("", |(_, text)| text);
            Mover::from_cells(&row.ticker, change)
        })
        .filter(|mover| seen.insert(mover.symbol.to_uppercase()))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::updater::RowSource;
    use portfolio_common::{MemoryWorkbook, ReportFormatError};
    use std::cell::RefCell;

    const PORTFOLIO: &str = "Current Portfolio Value";
    const HISTORY: &str = "Portfolio Value over Time";

    #[derive(Default)]
    struct Outbox {
        sent: RefCell<Vec<OutgoingMail>>,
    }

    impl MailTransport for Outbox {
        fn send(&self, mail: &OutgoingMail) -> Result<()> {
            self.sent.borrow_mut().push(mail.clone());
            Ok(())
        }
    }

    fn layout() -> ArchiveLayout {
        ArchiveLayout {
            portfolio_sheet: PORTFOLIO.to_string(),
            history_sheet: HISTORY.to_string(),
            value_column: 2,
            date_column: 1,
            snapshot_cell: "G6".parse().unwrap(),
            yesterday_label: Some("Yesterday's Total:".to_string()),
            custom_value_label: None,
            movers: None,
        }
    }

    fn envelope() -> Envelope {
        Envelope {
            from: "bot@example.com".to_string(),
            to: "me@example.com".to_string(),
        }
    }

    fn workbook(today: &str, yesterday: &str) -> MemoryWorkbook {
        let mut book = MemoryWorkbook::new();
        book.set(PORTFOLIO, "G6", today).unwrap();
        book.set(PORTFOLIO, "I2", "Yesterday's Total:").unwrap();
        book.set(PORTFOLIO, "J2", yesterday).unwrap();
        book.set_column(HISTORY, 1, &["Date"]).unwrap();
        book.set_column(HISTORY, 2, &["Value"]).unwrap();
        book
    }

    fn tuesday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 2).unwrap()
    }

    #[test]
    fn appends_after_header_and_mails_report() {
        let mut book = workbook("$1,050.00", "$1,000.00");
        let outbox = Outbox::default();

        let archived = archive_and_report(&mut book, &layout(), &outbox, &envelope(), tuesday()).unwrap();

        assert_eq!(archived.snapshot.row, 2);
        assert_eq!(book.get(HISTORY, "B2"), Some("$1,050.00"));
        assert_eq!(book.get(HISTORY, "A2"), Some("2024-01-02"));
        assert_eq!(book.write_calls(), 1);

        let sent = outbox.sent.borrow();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].subject, "Daily Stock Report For Tuesday, January 2nd");
        assert!(sent[0].body.contains("Overall increase/decrease: 5.0%"));
        assert_eq!(sent[0].to, "me@example.com");
    }

    #[test]
    fn zero_previous_total_writes_and_sends_nothing() {
        let mut book = workbook("$1,050.00", "$0.00");
        let outbox = Outbox::default();

        let err = archive_and_report(&mut book, &layout(), &outbox, &envelope(), tuesday()).unwrap_err();

        assert!(matches!(err, PortfolioError::ReportFormat(ReportFormatError::DivisionByZero)));
        assert_eq!(book.write_calls(), 0);
        assert!(outbox.sent.borrow().is_empty());
    }

    #[test]
    fn malformed_snapshot_value_is_a_report_error() {
        let mut book = workbook("#REF!", "$1,000.00");
        let err = archive_and_report(&mut book, &layout(), &Outbox::default(), &envelope(), tuesday()).unwrap_err();
        assert!(matches!(err, PortfolioError::ReportFormat(ReportFormatError::MalformedAmount(_))));
        assert_eq!(book.write_calls(), 0);
    }

    #[test]
    fn previous_total_falls_back_to_history() {
        let mut book = workbook("$990.00", "");
        book.set(HISTORY, "A2", "2024-01-01").unwrap();
        book.set(HISTORY, "B2", "$1,100.00").unwrap();
        let layout = ArchiveLayout {
            yesterday_label: None,
            ..layout()
        };
        let outbox = Outbox::default();

        let archived = archive_and_report(&mut book, &layout, &outbox, &envelope(), tuesday()).unwrap();

        assert_eq!(archived.snapshot.row, 3);
        assert_eq!(archived.snapshot.previous.as_ref().map(CurrencyAmount::as_str), Some("$1,100.00"));
        assert!(archived.report.body.contains("Yesterday's ending value: $1,100.00"));
        assert_eq!(book.get(HISTORY, "B2"), Some("$1,100.00"));
        assert_eq!(book.get(HISTORY, "B3"), Some("$990.00"));
    }

    #[test]
    fn occupied_append_row_is_refused() {
        let mut book = workbook("$1,050.00", "$1,000.00");
        book.set_column(HISTORY, 1, &["Date", "2023-12-28", "", "2023-12-29"]).unwrap();
        book.set_column(HISTORY, 2, &["Value", "$1,000.00", "", "$1,100.00"]).unwrap();
        let outbox = Outbox::default();

        let err = archive_and_report(&mut book, &layout(), &outbox, &envelope(), tuesday()).unwrap_err();

        assert!(matches!(err, PortfolioError::SheetAccess(ref m) if m.contains("row 4")), "{err}");
        assert_eq!(book.write_calls(), 0);
        assert!(outbox.sent.borrow().is_empty());
        assert_eq!(book.get(HISTORY, "B4"), Some("$1,100.00"));
        assert_eq!(book.get(HISTORY, "A4"), Some("2023-12-29"));
    }

    #[test]
    fn missing_yesterday_label_is_a_sheet_error() {
        let mut book = MemoryWorkbook::new();
        book.set(PORTFOLIO, "G6", "$1,050.00").unwrap();
        book.add_sheet(HISTORY);

        let err = archive_and_report(&mut book, &layout(), &Outbox::default(), &envelope(), tuesday()).unwrap_err();
        assert!(matches!(err, PortfolioError::SheetAccess(ref m) if m.contains("Yesterday's Total:")));
    }

    #[test]
    fn report_carries_custom_value_and_movers() {
        let mut book = workbook("$1,050.00", "$1,000.00");
        book.set_column(PORTFOLIO, 3, &["Company", "AAPL", "MSFT", "", "TSLA"]).unwrap();
        book.set(PORTFOLIO, "M2", "+1.20").unwrap();
        book.set(PORTFOLIO, "M3", "-3.50").unwrap();
        book.set(PORTFOLIO, "M5", "0.10").unwrap();
        book.set(PORTFOLIO, "I3", "Cash:").unwrap();
        book.set(PORTFOLIO, "J3", "$2,000.00").unwrap();
        let layout = ArchiveLayout {
            custom_value_label: Some("Cash:".to_string()),
            movers: Some(PriceLayout {
                sheet: PORTFOLIO.to_string(),
                header_label: "Company".to_string(),
                price_column: 6,
                change_column: 13,
                rows: RowSource::Span(CellRange::column_span(3, 2, 10).unwrap()),
                last_updated_label: "Last updated:".to_string(),
            }),
            ..layout()
        };

        let archived =
            archive_and_report(&mut book, &layout, &Outbox::default(), &envelope(), tuesday()).unwrap();

        let body = &archived.report.body;
        assert!(body.contains("Cash: $2,000.00"));
        let msft = body.find("MSFT").unwrap();
        let aapl = body.find("AAPL").unwrap();
        let tsla = body.find("TSLA").unwrap();
        assert!(msft < aapl && aapl < tsla, "movers out of order:\n{body}");
    }

    #[test]
    fn ticker_on_two_rows_is_one_mover() {
        let mut book = workbook("$1,050.00", "$1,000.00");
        book.set_column(PORTFOLIO, 3, &["Company", "AAPL", "MSFT", "aapl"]).unwrap();
        book.set(PORTFOLIO, "M2", "+1.20").unwrap();
        book.set(PORTFOLIO, "M3", "-3.50").unwrap();
        book.set(PORTFOLIO, "M4", "+1.20").unwrap();
        let prices = PriceLayout {
            sheet: PORTFOLIO.to_string(),
            header_label: "Company".to_string(),
            price_column: 6,
            change_column: 13,
            rows: RowSource::Span(CellRange::column_span(3, 2, 10).unwrap()),
            last_updated_label: "Last updated:".to_string(),
        };

        let movers = read_movers(&book, &prices).unwrap();

        let symbols: Vec<&str> = movers.iter().map(|m| m.symbol.as_str()).collect();
        assert_eq!(symbols, ["AAPL", "MSFT"]);
    }
}
