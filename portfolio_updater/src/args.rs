//! Command-line arguments for the portfolio updater.
//!
//! This module defines the CLI interface using `clap`. See `main` for end-to-end usage.
use std::path::PathBuf;

use clap::Parser;

use crate::config::RunMode;

/// Parsed command-line arguments.
#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Archive the end-of-day value and email the daily report instead of
    /// updating live prices.
    #[clap(short = 's', long)]
    pub save_value: bool,

    /// Path to the configuration file (TOML, YAML or JSON). Optional; every key
    /// can also come from `PORTFOLIO_*` environment variables.
    #[clap(short, long, default_value = "portfolio.toml")]
    pub config: PathBuf,

    /// Title of the worksheet holding the portfolio.
    #[clap(short, long)]
    pub portfolio_worksheet: Option<String>,

    /// Title of the worksheet the end-of-day values are appended to.
    #[clap(short, long)]
    pub value_worksheet: Option<String>,

    /// Read from the spreadsheet but only log writes and the report.
    #[clap(long)]
    pub dry_run: bool,
}

impl Args {
    /// Mode selected by the `--save-value` flag.
    pub fn mode(&self) -> RunMode {
        if self.save_value {
            RunMode::Archive
        } else {
            RunMode::Update
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_live_update() {
        let args = Args::parse_from(["portfolio_updater"]);
        assert_eq!(args.mode(), RunMode::Update);
        assert_eq!(args.config, PathBuf::from("portfolio.toml"));
        assert!(!args.dry_run);
    }

    #[test]
    fn save_value_selects_archive_with_overrides() {
        let args = Args::parse_from([
            "portfolio_updater",
            "-s",
            "-p",
            "Holdings",
            "--value-worksheet",
            "History",
        ]);
        assert_eq!(args.mode(), RunMode::Archive);
        assert_eq!(args.portfolio_worksheet.as_deref(), Some("Holdings"));
        assert_eq!(args.value_worksheet.as_deref(), Some("History"));
    }
}
