//! End-of-day history log.
//!
//! The history sheet is an append-only list of `(date, value)` rows. The next
//! row to write is one past the count of non-empty cells in the value column,
//! header included. Existing rows are never rewritten.
use chrono::NaiveDate;

use crate::currency::CurrencyAmount;

/// Date format written into the history sheet.
pub const HISTORY_DATE_FORMAT: &str = "%Y-%m-%d";

/// Formats other than ISO that sheets commonly display dates in.
const LEGACY_DATE_FORMATS: [&str; 2] = ["%m/%d/%Y", "%-m/%-d/%Y"];

/// One archived snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    /// Day the value was archived.
    pub date: NaiveDate,
    /// Portfolio total on that day.
    pub value: CurrencyAmount,
}

impl HistoryEntry {
    /// Date cell text for this entry.
    pub fn date_text(&self) -> String {
        self.date.format(HISTORY_DATE_FORMAT).to_string()
    }
}

/// Contents of the history columns as read from the sheet.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HistoryLog {
    /// Non-empty cells in the value column, header and unparsable rows included.
    pub occupied_rows: usize,
    /// Rows that parsed as a dated amount, in sheet order.
    pub entries: Vec<HistoryEntry>,
}

impl HistoryLog {
    /// A log made only of well-formed entries (no header row).
    pub fn from_entries(entries: Vec<HistoryEntry>) -> Self {
        HistoryLog {
            occupied_rows: entries.len(),
            entries,
        }
    }

    /// Builds the log from the raw date and value columns.
    ///
    /// Every non-empty value cell counts toward the append position, even when
    /// it is a header or has no parsable date next to it.
    pub fn from_columns<S: AsRef<str>>(dates: &[S], values: &[S]) -> Self {
        let mut log = HistoryLog::default();
        for (index, value) in values.iter().enumerate() {
            let value = value.as_ref().trim();
            if value.is_empty() {
                continue;
            }
            log.occupied_rows += 1;

            let date = dates.get(index).and_then(|d| parse_history_date(d.as_ref()));
            if let (Some(date), Ok(value)) = (date, CurrencyAmount::parse(value)) {
                log.entries.push(HistoryEntry { date, value });
            }
        }
        log
    }

    /// 1-based row the next entry goes to.
    pub fn next_row(&self) -> u32 {
        u32::try_from(self.occupied_rows).unwrap_or(u32::MAX - 1) + 1
    }

    /// Most recent archived entry.
    pub fn last(&self) -> Option<&HistoryEntry> {
        self.entries.last()
    }
}

/// Result of archiving today's value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    /// Value of the latest existing entry, if any.
    pub previous: Option<CurrencyAmount>,
    /// Entry to append.
    pub entry: HistoryEntry,
    /// 1-based row the entry is appended at.
    pub row: u32,
}

/// Prepares the append of `today_value` to `history`.
pub fn archive_snapshot(today_value: CurrencyAmount, history: &HistoryLog, today: NaiveDate) -> Snapshot {
    Snapshot {
        previous: history.last().map(|entry| entry.value.clone()),
        entry: HistoryEntry {
            date: today,
            value: today_value,
        },
        row: history.next_row(),
    }
}

fn parse_history_date(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    std::iter::once(HISTORY_DATE_FORMAT)
        .chain(LEGACY_DATE_FORMATS)
        .find_map(|format| NaiveDate::parse_from_str(text, format).ok())
}
