//! Cell addressing in A1 notation.
//!
//! Rows and columns are 1-based like the sheet UI: column 1 is `A`, column 27
//! is `AA`. A `CellWrite` pairs an address with the text to place there and is
//! the unit of every batched write.
use std::fmt;
use std::str::FromStr;

use crate::error::PortfolioError;

/// 1-based sheet coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CellRef {
    /// 1-based row number.
    pub row: u32,
    /// 1-based column number (`A` = 1).
    pub column: u32,
}

impl CellRef {
    /// Creates a cell address. Both coordinates must be at least 1.
    pub fn new(row: u32, column: u32) -> Result<Self, PortfolioError> {
        if row == 0 || column == 0 {
            return Err(PortfolioError::Configuration(format!(
                "cell coordinates are 1-based, got row {row} column {column}"
            )));
        }
        Ok(CellRef { row, column })
    }

    /// The cell immediately to the right, where label values live.
    pub fn right(self) -> Self {
        CellRef {
            row: self.row,
            column: self.column + 1,
        }
    }

    /// Renders the address as `G6`.
    pub fn to_a1(self) -> String {
        format!("{}{}", column_letters(self.column), self.row)
    }
}

impl fmt::Display for CellRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_a1())
    }
}

impl FromStr for CellRef {
    type Err = PortfolioError;

    /// Parses `G6`, `g6` or `$G$6`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || PortfolioError::Configuration(format!("invalid cell reference: {s:?}"));
        let cleaned: String = s.trim().chars().filter(|c| *c != '$').collect();
        let split = cleaned
            .find(|c: char| c.is_ascii_digit())
            .ok_or_else(invalid)?;
        let (letters, digits) = cleaned.split_at(split);
        let column = column_index(letters).ok_or_else(invalid)?;
        let row: u32 = digits.parse().map_err(|_| invalid())?;
        CellRef::new(row, column).map_err(|_| invalid())
    }
}

/// Converts a 1-based column number to letters (`1` → `A`, `28` → `AB`).
pub fn column_letters(column: u32) -> String {
    let mut n = column;
    let mut letters = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push(char::from(b'A' + rem as u8));
        n = (n - 1) / 26;
    }
    letters.iter().rev().collect()
}

/// Converts column letters to a 1-based column number (`AB` → `28`).
pub fn column_index(letters: &str) -> Option<u32> {
    if letters.is_empty() {
        return None;
    }
    letters.chars().try_fold(0u32, |acc, ch| {
        if !ch.is_ascii_alphabetic() {
            return None;
        }
        let digit = u32::from(ch.to_ascii_uppercase() as u8 - b'A') + 1;
        acc.checked_mul(26)?.checked_add(digit)
    })
}

/// A rectangular block of cells, e.g. `C2:C10`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellRange {
    /// Top-left cell.
    pub start: CellRef,
    /// Bottom-right cell.
    pub end: CellRef,
}

impl CellRange {
    /// A block spanning `first_row..=last_row` of one column.
    pub fn column_span(column: u32, first_row: u32, last_row: u32) -> Result<Self, PortfolioError> {
        if last_row < first_row {
            return Err(PortfolioError::Configuration(format!(
                "row range is empty: {first_row}..={last_row}"
            )));
        }
        Ok(CellRange {
            start: CellRef::new(first_row, column)?,
            end: CellRef::new(last_row, column)?,
        })
    }

    /// Parses a range that may carry a sheet prefix, like the ranges a sheet
    /// API echoes back: `'Current Portfolio Value'!C2:C10`.
    pub fn from_qualified(text: &str) -> Result<Self, PortfolioError> {
        let local = text.rsplit_once('!').map_or(text, |(_, range)| range);
        local.parse()
    }

    /// Renders the block as `C2:C10`.
    pub fn to_a1(self) -> String {
        format!("{}:{}", self.start.to_a1(), self.end.to_a1())
    }

    /// Whether `cell` lies inside the block.
    pub fn contains(self, cell: CellRef) -> bool {
        (self.start.row..=self.end.row).contains(&cell.row)
            && (self.start.column..=self.end.column).contains(&cell.column)
    }
}

impl fmt::Display for CellRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_a1())
    }
}

impl FromStr for CellRange {
    type Err = PortfolioError;

    /// Parses `C2:C10` or a single cell `G6`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (start, end) = match s.split_once(':') {
            Some((start, end)) => (start.parse::<CellRef>()?, end.parse::<CellRef>()?),
            None => {
                let cell = s.parse::<CellRef>()?;
                (cell, cell)
            }
        };
        Ok(CellRange {
            start: CellRef {
                row: start.row.min(end.row),
                column: start.column.min(end.column),
            },
            end: CellRef {
                row: start.row.max(end.row),
                column: start.column.max(end.column),
            },
        })
    }
}

/// A single pending cell update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellWrite {
    /// Target cell.
    pub cell: CellRef,
    /// Text to place in the cell, interpreted as if typed by a user.
    pub value: String,
}

impl CellWrite {
    /// Pairs an address with a value.
    pub fn new(cell: CellRef, value: impl Into<String>) -> Self {
        CellWrite {
            cell,
            value: value.into(),
        }
    }
}
