//! Run configuration.
//!
//! Values are layered with the `config` crate: the optional file named on the
//! command line first, then `PORTFOLIO_*` environment variables on top
//! (`PORTFOLIO_SMTP__PASSWORD` sets `smtp.password`). Defaults mirror the sheet
//! layout the updater was first written for.
//!
//! Validation runs before any network I/O so a missing option fails fast.
use std::path::{Path, PathBuf};
use std::time::Duration;

use ::config::{Config as Layers, Environment, File};
use portfolio_common::cell::CellRange;
use portfolio_common::{CellRef, PortfolioError, Result};
use serde::Deserialize;
use strum_macros::{Display, EnumString};

use crate::archiver::ArchiveLayout;
use crate::args::Args;
use crate::updater::{PriceLayout, RowSource};

const ENV_PREFIX: &str = "PORTFOLIO";

/// The two mutually exclusive things a run can do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum RunMode {
    /// Fetch quotes and write prices into the portfolio sheet.
    Update,
    /// Append the end-of-day total to the history sheet and mail the report.
    Archive,
}

/// Everything a run needs to know about the spreadsheet and its collaborators.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub spreadsheet_key: Option<String>,
    pub portfolio_sheet: String,
    pub header_label: String,
    pub ticker_column: u32,
    pub price_column: u32,
    pub change_column: u32,
    pub first_row: u32,
    pub last_row: u32,
    /// Named or A1 range of ticker cells; overrides `first_row`/`last_row`.
    pub ticker_range: Option<String>,
    pub last_updated_label: String,
    pub history_sheet: String,
    pub history_value_column: Option<u32>,
    pub history_date_column: Option<u32>,
    pub snapshot_cell: Option<String>,
    /// Empty disables the label lookup; the last history entry is used instead.
    pub yesterday_label: String,
    pub custom_value_label: Option<String>,
    pub include_movers: bool,
    pub to_addr: Option<String>,
    pub from_addr: Option<String>,
    pub smtp: SmtpSettings,
    pub quotes: QuoteSettings,
    pub sheets: SheetsSettings,
    pub retry: RetrySettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SmtpSettings {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct QuoteSettings {
    /// Root of a v7 `quoteResponse` endpoint. The Yahoo default may answer 401
    /// without a crumb; a compatible proxy can be set here instead.
    pub base_url: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SheetsSettings {
    pub base_url: String,
    pub access_token: Option<String>,
    pub credentials_path: Option<PathBuf>,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub attempts: u32,
    pub delay_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            spreadsheet_key: None,
            portfolio_sheet: "Current Portfolio Value".to_string(),
            header_label: portfolio_common::tickers::DEFAULT_HEADER_LABEL.to_string(),
            ticker_column: 3,
            price_column: 6,
            change_column: 13,
            first_row: 2,
            last_row: 10,
            ticker_range: None,
            last_updated_label: "Last updated:".to_string(),
            history_sheet: "Portfolio Value over Time".to_string(),
            history_value_column: None,
            history_date_column: None,
            snapshot_cell: None,
            yesterday_label: "Yesterday's Total:".to_string(),
            custom_value_label: None,
            include_movers: true,
            to_addr: None,
            from_addr: None,
            smtp: SmtpSettings::default(),
            quotes: QuoteSettings::default(),
            sheets: SheetsSettings::default(),
            retry: RetrySettings::default(),
        }
    }
}

impl Default for SmtpSettings {
    fn default() -> Self {
        SmtpSettings {
            host: "smtp.gmail.com".to_string(),
            port: 587,
            username: None,
            password: None,
        }
    }
}

impl Default for QuoteSettings {
    fn default() -> Self {
        QuoteSettings {
            base_url: "https://query1.finance.yahoo.com".to_string(),
            timeout_secs: 30,
        }
    }
}

impl Default for SheetsSettings {
    fn default() -> Self {
        SheetsSettings {
            base_url: "https://sheets.googleapis.com".to_string(),
            access_token: None,
            credentials_path: None,
            timeout_secs: 30,
        }
    }
}

impl Default for RetrySettings {
    fn default() -> Self {
        RetrySettings {
            attempts: 3,
            delay_ms: 500,
        }
    }
}

impl RetrySettings {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

impl Config {
    /// Loads the file at `path` (if it exists) and overlays the environment.
    pub fn load(path: &Path) -> Result<Self> {
        let layers = Layers::builder()
            .add_source(File::from(path).required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()
            .map_err(|e| PortfolioError::Configuration(e.to_string()))?;
        layers
            .try_deserialize()
            .map_err(|e| PortfolioError::Configuration(e.to_string()))
    }

    /// Applies the worksheet title overrides given on the command line.
    pub fn apply_args(mut self, args: &Args) -> Self {
        if let Some(title) = &args.portfolio_worksheet {
            self.portfolio_sheet = title.clone();
        }
        if let Some(title) = &args.value_worksheet {
            self.history_sheet = title.clone();
        }
        self
    }

    /// Checks that everything `mode` needs is present and well formed.
    ///
    /// Every missing key is reported at once.
    pub fn validate(&self, mode: RunMode) -> Result<()> {
        let mut missing = Vec::new();
        require(&mut missing, "spreadsheet_key", self.spreadsheet_key.as_deref());
        if mode == RunMode::Archive {
            if self.history_value_column.is_none() {
                missing.push("history_value_column");
            }
            if self.history_date_column.is_none() {
                missing.push("history_date_column");
            }
            require(&mut missing, "snapshot_cell", self.snapshot_cell.as_deref());
            require(&mut missing, "to_addr", self.to_addr.as_deref());
            require(&mut missing, "from_addr", self.from_addr.as_deref());
            require(&mut missing, "smtp.username", self.smtp.username.as_deref());
            require(&mut missing, "smtp.password", self.smtp.password.as_deref());
        }
        if !missing.is_empty() {
            return Err(PortfolioError::Configuration(format!(
                "missing required configuration for {mode} mode: {}",
                missing.join(", ")
            )));
        }

        match mode {
            RunMode::Update => self.price_layout().map(|_| ()),
            RunMode::Archive => self.archive_layout().map(|_| ()),
        }
    }

    /// Spreadsheet key; only valid after `validate`.
    pub fn spreadsheet_key(&self) -> Result<&str> {
        non_blank(self.spreadsheet_key.as_deref())
            .ok_or_else(|| PortfolioError::Configuration("spreadsheet_key is not set".to_string()))
    }

    /// Where the updater finds tickers and writes prices.
    pub fn price_layout(&self) -> Result<PriceLayout> {
        for (key, column) in [
            ("ticker_column", self.ticker_column),
            ("price_column", self.price_column),
            ("change_column", self.change_column),
        ] {
            if column == 0 {
                return Err(PortfolioError::Configuration(format!("{key} is 1-based, got 0")));
            }
        }
        let rows = match non_blank(self.ticker_range.as_deref()) {
            Some(range) => RowSource::Named(range.to_string()),
            None => RowSource::Span(CellRange::column_span(
                self.ticker_column,
                self.first_row,
                self.last_row,
            )?),
        };
        Ok(PriceLayout {
            sheet: self.portfolio_sheet.clone(),
            header_label: self.header_label.clone(),
            price_column: self.price_column,
            change_column: self.change_column,
            rows,
            last_updated_label: self.last_updated_label.clone(),
        })
    }

    /// Where the archiver reads totals and appends history.
    pub fn archive_layout(&self) -> Result<ArchiveLayout> {
        let column = |key: &str, value: Option<u32>| match value {
            Some(0) => Err(PortfolioError::Configuration(format!("{key} is 1-based, got 0"))),
            Some(column) => Ok(column),
            None => Err(PortfolioError::Configuration(format!("{key} is not set"))),
        };
        let snapshot_cell = non_blank(self.snapshot_cell.as_deref())
            .ok_or_else(|| PortfolioError::Configuration("snapshot_cell is not set".to_string()))?
            .parse::<CellRef>()?;

        Ok(ArchiveLayout {
            portfolio_sheet: self.portfolio_sheet.clone(),
            history_sheet: self.history_sheet.clone(),
            value_column: column("history_value_column", self.history_value_column)?,
            date_column: column("history_date_column", self.history_date_column)?,
            snapshot_cell,
            yesterday_label: non_blank(Some(self.yesterday_label.as_str())).map(str::to_string),
            custom_value_label: non_blank(self.custom_value_label.as_deref()).map(str::to_string),
            movers: if self.include_movers {
                Some(self.price_layout()?)
            } else {
                None
            },
        })
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn require(missing: &mut Vec<&'static str>, key: &'static str, value: Option<&str>) {
    if non_blank(value).is_none() {
        missing.push(key);
    }
}

#[cfg(test)]
pub(crate) fn from_toml(text: &str) -> Result<Config> {
    Layers::builder()
        .add_source(File::from_str(text, ::config::FileFormat::Toml))
        .build()
        .and_then(|layers| layers.try_deserialize::<Config>())
        .map_err(|e| PortfolioError::Configuration(e.to_string()))
}
