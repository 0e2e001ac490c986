//! Google Sheets store.
//!
//! Talks to the v4 `values` API with a bearer token. Reads ask for formatted
//! values so amounts come back exactly as the sheet shows them (`$1,234.56`);
//! writes go through one `values:batchUpdate` call with `USER_ENTERED` so the
//! sheet parses numbers and dates as if typed.
use std::time::Duration;

use log::debug;
use portfolio_common::cell::column_letters;
use portfolio_common::{CellRange, CellRef, CellWrite, ColumnRange, PortfolioError, Result, SheetStore};
use reqwest::StatusCode;
use reqwest::Url;
use reqwest::blocking::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};

use crate::config::SheetsSettings;
use crate::retry::Retry;

/// One spreadsheet reached through the Sheets API.
pub struct GoogleSheets {
    client: Client,
    base_url: Url,
    spreadsheet: String,
    token: String,
    retry: Retry,
}

#[derive(Debug, Deserialize)]
struct ValueRange {
    range: String,
    #[serde(default)]
    values: Vec<Vec<String>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct BatchUpdate<'a> {
    value_input_option: &'static str,
    data: Vec<RangeData<'a>>,
}

#[derive(Debug, Serialize)]
struct RangeData<'a> {
    range: String,
    values: [[&'a str; 1]; 1],
}

impl GoogleSheets {
    pub fn new(settings: &SheetsSettings, spreadsheet: &str, token: String, retry: Retry) -> Result<Self> {
        let base_url = Url::parse(&settings.base_url)
            .map_err(|e| PortfolioError::Configuration(format!("invalid sheets.base_url: {e}")))?;
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|e| PortfolioError::SheetAccess(format!("failed to build HTTP client: {e}")))?;
        Ok(GoogleSheets {
            client,
            base_url,
            spreadsheet: spreadsheet.to_string(),
            token,
            retry,
        })
    }

    fn url(&self, tail: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| PortfolioError::Configuration(format!("sheets.base_url cannot be a base: {}", self.base_url)))?
            .pop_if_empty()
            .extend(["v4", "spreadsheets", self.spreadsheet.as_str()])
            .extend(tail);
        Ok(url)
    }

    /// Sends the request built by `build`, retrying transient failures, and
    /// returns the body of a successful response.
    fn execute<F>(&self, what: &str, build: F) -> Result<String>
    where
        F: Fn() -> RequestBuilder,
    {
        self.retry.run(what, || {
            let response = build()
                .bearer_auth(&self.token)
                .send()
                .map_err(|e| PortfolioError::SheetAccess(format!("{what}: {e}")))?;
            let status = response.status();
            let body = response
                .text()
                .map_err(|e| PortfolioError::SheetAccess(format!("{what}: failed to read response: {e}")))?;
            if status.is_success() {
                Ok(body)
            } else if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
                Err(PortfolioError::Authentication(format!(
                    "{what}: spreadsheet rejected the credentials (HTTP {status})"
                )))
            } else {
                Err(PortfolioError::SheetAccess(format!("{what}: HTTP {status}: {}", body.trim())))
            }
        })
    }

    fn get_values(&self, range: &str, major_dimension: &str) -> Result<ValueRange> {
        let url = self.url(&["values", range])?;
        debug!("GET {url}");
        let body = self.execute(&format!("read {range}"), || {
            self.client
                .get(url.clone())
                .query(&[("majorDimension", major_dimension), ("valueRenderOption", "FORMATTED_VALUE")])
        })?;
        serde_json::from_str(&body)
            .map_err(|e| PortfolioError::SheetAccess(format!("malformed values response for {range}: {e}")))
    }

    fn first_column(values: ValueRange) -> Result<ColumnRange> {
        let start = CellRange::from_qualified(&values.range)
            .map_err(|_| PortfolioError::SheetAccess(format!("unexpected range in response: {}", values.range)))?
            .start;
        Ok(ColumnRange {
            start,
            values: values.values.into_iter().next().unwrap_or_default(),
        })
    }
}

/// A bare sheet title selects the whole grid.
fn quote_title(sheet: &str) -> String {
    format!("'{}'", sheet.replace('\'', "''"))
}

/// `'Current Portfolio Value'!C2:C10`
fn qualify(sheet: &str, range: &str) -> String {
    format!("{}!{range}", quote_title(sheet))
}

impl SheetStore for GoogleSheets {
    fn read_column(&self, sheet: &str, column: u32) -> Result<ColumnRange> {
        let letters = column_letters(column);
        let values = self.get_values(&qualify(sheet, &format!("{letters}:{letters}")), "COLUMNS")?;
        Self::first_column(values)
    }

    fn read_range(&self, sheet: &str, range: &str) -> Result<ColumnRange> {
        // Anything that is not A1 notation is sent as-is and resolved as a named range.
        let request = if range.contains('!') || range.parse::<CellRange>().is_err() {
            range.to_string()
        } else {
            qualify(sheet, range)
        };
        Self::first_column(self.get_values(&request, "COLUMNS")?)
    }

    fn read_cell(&self, sheet: &str, cell: CellRef) -> Result<String> {
        let values = self.get_values(&qualify(sheet, &cell.to_a1()), "ROWS")?;
        Ok(values
            .values
            .into_iter()
            .next()
            .and_then(|row| row.into_iter().next())
            .unwrap_or_default())
    }

    fn find_cell(&self, sheet: &str, label: &str) -> Result<Option<CellRef>> {
        let values = self.get_values(&quote_title(sheet), "ROWS")?;
        let origin = CellRange::from_qualified(&values.range).map(|r| r.start).unwrap_or(CellRef { row: 1, column: 1 });
        let label = label.trim();
        for (row, cells) in (origin.row..).zip(&values.values) {
            for (column, text) in (origin.column..).zip(cells) {
                if text.trim() == label {
                    return Ok(Some(CellRef { row, column }));
                }
            }
        }
        Ok(None)
    }

    fn write_cells(&mut self, sheet: &str, writes: &[CellWrite]) -> Result<()> {
        if writes.is_empty() {
            return Ok(());
        }
        let payload = BatchUpdate {
            value_input_option: "USER_ENTERED",
            data: writes
                .iter()
                .map(|write| RangeData {
                    range: qualify(sheet, &write.cell.to_a1()),
                    values: [[write.value.as_str()]],
                })
                .collect(),
        };
        let url = self.url(&["values:batchUpdate"])?;
        debug!("POST {url} ({} cells)", writes.len());
        self.execute(&format!("write {} cells to {sheet}", writes.len()), || {
            self.client.post(url.clone()).json(&payload)
        })?;
        Ok(())
    }
}
