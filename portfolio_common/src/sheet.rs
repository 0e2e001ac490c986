//! Spreadsheet backing store.
//!
//! `SheetStore` is the seam between the portfolio logic and wherever the grid
//! actually lives. Reads return cell text as displayed; writes are batched so a
//! whole update lands in one call.
//!
//! Two implementations live here:
//! - `MemoryWorkbook`: an in-memory grid, used by tests.
//! - `DryRun`: wraps any store, forwards reads and only logs writes.
use std::collections::{BTreeMap, HashMap};

use log::info;

use crate::cell::{CellRange, CellRef, CellWrite};
use crate::error::PortfolioError;
use crate::result::Result;

/// First column of a range, read top-to-bottom.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnRange {
    /// Address of the first cell (the row of `values[0]`).
    pub start: CellRef,
    /// Cell text; trailing blanks may be omitted by the store.
    pub values: Vec<String>,
}

impl ColumnRange {
    /// `(row, text)` pairs for every returned cell.
    pub fn rows(&self) -> impl Iterator<Item = (u32, &str)> + '_ {
        (self.start.row..).zip(self.values.iter().map(String::as_str))
    }
}

/// Operations the updater and archiver need from a spreadsheet.
pub trait SheetStore {
    /// Whole column, row 1 first. Trailing empty cells may be omitted.
    fn read_column(&self, sheet: &str, column: u32) -> Result<ColumnRange>;

    /// First column of an A1 range (`C2:C10`) or a named range (`Tickers`).
    fn read_range(&self, sheet: &str, range: &str) -> Result<ColumnRange>;

    /// Text of a single cell; empty when the cell is blank.
    fn read_cell(&self, sheet: &str, cell: CellRef) -> Result<String>;

    /// First cell, scanning row by row, whose text equals `label`.
    fn find_cell(&self, sheet: &str, label: &str) -> Result<Option<CellRef>>;

    /// Applies every write in one call.
    fn write_cells(&mut self, sheet: &str, writes: &[CellWrite]) -> Result<()>;

    /// Single-cell convenience over `write_cells`.
    fn write_cell(&mut self, sheet: &str, write: CellWrite) -> Result<()> {
        self.write_cells(sheet, std::slice::from_ref(&write))
    }

    /// Value in the cell right of `label`.
    fn read_labeled(&self, sheet: &str, label: &str) -> Result<(CellRef, String)> {
        let label_cell = self
            .find_cell(sheet, label)?
            .ok_or_else(|| PortfolioError::label_not_found(sheet, label))?;
        let value_cell = label_cell.right();
        Ok((value_cell, self.read_cell(sheet, value_cell)?))
    }
}

/// In-memory workbook keyed by sheet title.
#[derive(Debug, Default, Clone)]
pub struct MemoryWorkbook {
    sheets: HashMap<String, BTreeMap<CellRef, String>>,
    named_ranges: HashMap<String, (String, CellRange)>,
    write_calls: usize,
}

impl MemoryWorkbook {
    /// Empty workbook.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an empty sheet (reads against unknown sheets fail like a real store).
    pub fn add_sheet(&mut self, sheet: &str) -> &mut Self {
        self.sheets.entry(sheet.to_string()).or_default();
        self
    }

    /// Seeds a cell without counting it as a write call.
    pub fn set(&mut self, sheet: &str, a1: &str, value: &str) -> Result<&mut Self> {
        let cell = a1.parse::<CellRef>()?;
        self.sheets
            .entry(sheet.to_string())
            .or_default()
            .insert(cell, value.to_string());
        Ok(self)
    }

    /// Seeds a column top-down starting at row 1.
    pub fn set_column(&mut self, sheet: &str, column: u32, values: &[&str]) -> Result<&mut Self> {
        let grid = self.sheets.entry(sheet.to_string()).or_default();
        for (row, value) in (1u32..).zip(values) {
            grid.insert(CellRef::new(row, column)?, value.to_string());
        }
        Ok(self)
    }

    /// Registers a named range.
    pub fn define_range(&mut self, name: &str, sheet: &str, range: &str) -> Result<&mut Self> {
        let range = range.parse::<CellRange>()?;
        self.named_ranges
            .insert(name.to_string(), (sheet.to_string(), range));
        Ok(self)
    }

    /// Cell text, `None` when never written.
    pub fn get(&self, sheet: &str, a1: &str) -> Option<&str> {
        let cell = a1.parse::<CellRef>().ok()?;
        self.sheets.get(sheet)?.get(&cell).map(String::as_str)
    }

    /// Number of `write_cells` calls made so far.
    pub fn write_calls(&self) -> usize {
        self.write_calls
    }

    fn grid(&self, sheet: &str) -> Result<&BTreeMap<CellRef, String>> {
        self.sheets
            .get(sheet)
            .ok_or_else(|| PortfolioError::SheetAccess(format!("no sheet named {sheet:?}")))
    }

    fn column_values(grid: &BTreeMap<CellRef, String>, column: u32, rows: std::ops::RangeInclusive<u32>) -> Vec<String> {
        let mut values: Vec<String> = rows
            .map(|row| {
                grid.get(&CellRef { row, column })
                    .cloned()
                    .unwrap_or_default()
            })
            .collect();
        while values.last().is_some_and(String::is_empty) {
            values.pop();
        }
        values
    }
}

impl SheetStore for MemoryWorkbook {
    fn read_column(&self, sheet: &str, column: u32) -> Result<ColumnRange> {
        let grid = self.grid(sheet)?;
        let last_row = grid
            .keys()
            .filter(|cell| cell.column == column)
            .map(|cell| cell.row)
            .max()
            .unwrap_or(0);
        Ok(ColumnRange {
            start: CellRef::new(1, column)?,
            values: Self::column_values(grid, column, 1..=last_row),
        })
    }

    fn read_range(&self, sheet: &str, range: &str) -> Result<ColumnRange> {
        let (sheet, range) = match self.named_ranges.get(range) {
            Some((named_sheet, named)) => (named_sheet.as_str(), *named),
            None => (sheet, CellRange::from_qualified(range)?),
        };
        let grid = self.grid(sheet)?;
        Ok(ColumnRange {
            start: range.start,
            values: Self::column_values(grid, range.start.column, range.start.row..=range.end.row),
        })
    }

    fn read_cell(&self, sheet: &str, cell: CellRef) -> Result<String> {
        Ok(self.grid(sheet)?.get(&cell).cloned().unwrap_or_default())
    }

    fn find_cell(&self, sheet: &str, label: &str) -> Result<Option<CellRef>> {
        let label = label.trim();
        Ok(self
            .grid(sheet)?
            .iter()
            .find(|(_, value)| value.trim() == label)
            .map(|(cell, _)| *cell))
    }

    fn write_cells(&mut self, sheet: &str, writes: &[CellWrite]) -> Result<()> {
        let grid = self
            .sheets
            .get_mut(sheet)
            .ok_or_else(|| PortfolioError::SheetAccess(format!("no sheet named {sheet:?}")))?;
        for write in writes {
            grid.insert(write.cell, write.value.clone());
        }
        self.write_calls += 1;
        Ok(())
    }
}

/// Forwards reads to `inner`, logs writes instead of applying them.
pub struct DryRun<S> {
    inner: S,
    skipped: Vec<(String, CellWrite)>,
}

impl<S: SheetStore> DryRun<S> {
    /// Wraps a store.
    pub fn new(inner: S) -> Self {
        DryRun {
            inner,
            skipped: Vec::new(),
        }
    }

    /// Writes that would have been sent, with their sheet titles.
    pub fn skipped(&self) -> &[(String, CellWrite)] {
        &self.skipped
    }
}

impl<S: SheetStore> SheetStore for DryRun<S> {
    fn read_column(&self, sheet: &str, column: u32) -> Result<ColumnRange> {
        self.inner.read_column(sheet, column)
    }

    fn read_range(&self, sheet: &str, range: &str) -> Result<ColumnRange> {
        self.inner.read_range(sheet, range)
    }

    fn read_cell(&self, sheet: &str, cell: CellRef) -> Result<String> {
        self.inner.read_cell(sheet, cell)
    }

    fn find_cell(&self, sheet: &str, label: &str) -> Result<Option<CellRef>> {
        self.inner.find_cell(sheet, label)
    }

    fn write_cells(&mut self, sheet: &str, writes: &[CellWrite]) -> Result<()> {
        for write in writes {
            info!("[dry-run] {sheet}!{} <- {:?}", write.cell, write.value);
            self.skipped.push((sheet.to_string(), write.clone()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn workbook() -> MemoryWorkbook {
        let mut book = MemoryWorkbook::new();
        book.set_column("Portfolio", 3, &["Company", "AAPL", "", "MSFT"]).unwrap();
        book.set("Portfolio", "A12", "Last updated:").unwrap();
        book.define_range("Tickers", "Portfolio", "C2:C6").unwrap();
        book
    }

    #[test]
    fn reads_column_without_trailing_blanks() {
        let column = workbook().read_column("Portfolio", 3).unwrap();
        assert_eq!(column.start.row, 1);
        assert_eq!(column.values, vec!["Company", "AAPL", "", "MSFT"]);
    }

    #[test]
    fn named_range_resolves_to_its_sheet_rows() {
        let range = workbook().read_range("ignored", "Tickers").unwrap();
        let rows: Vec<(u32, &str)> = range.rows().collect();
        assert_eq!(rows, vec![(2, "AAPL"), (3, ""), (4, "MSFT")]);
    }

    #[test]
    fn labeled_value_is_right_of_label() {
        let mut book = workbook();
        book.set("Portfolio", "B12", "2024-01-01 10:00:00").unwrap();
        let (cell, value) = book.read_labeled("Portfolio", "Last updated:").unwrap();
        assert_eq!(cell.to_a1(), "B12");
        assert_eq!(value, "2024-01-01 10:00:00");
        assert!(matches!(
            book.read_labeled("Portfolio", "Missing:"),
            Err(PortfolioError::SheetAccess(_))
        ));
    }

    #[test]
    fn batch_counts_as_one_call() {
        let mut book = workbook();
        let writes = vec![
            CellWrite::new("F2".parse().unwrap(), "150.00"),
            CellWrite::new("F4".parse().unwrap(), "300.00"),
        ];
        book.write_cells("Portfolio", &writes).unwrap();
        assert_eq!(book.write_calls(), 1);
        assert_eq!(book.get("Portfolio", "F4"), Some("300.00"));
    }

    #[test]
    fn unknown_sheet_is_an_access_error() {
        let book = workbook();
        assert!(matches!(book.read_column("Nope", 1), Err(PortfolioError::SheetAccess(_))));
    }

    #[test]
    fn dry_run_does_not_touch_inner_store() {
        let mut dry = DryRun::new(workbook());
        dry.write_cell("Portfolio", CellWrite::new("F2".parse().unwrap(), "1.00")).unwrap();
        assert_eq!(dry.skipped().len(), 1);
        assert_eq!(dry.inner.get("Portfolio", "F2"), None);
        assert_eq!(dry.inner.write_calls(), 0);
    }
}
