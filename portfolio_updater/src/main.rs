//! Portfolio Updater: keeps a stock portfolio spreadsheet current.
//!
//! Two modes, chosen per run:
//! - default: fetch live quotes for every ticker in the portfolio sheet and
//!   write price, change and a "Last updated:" timestamp back in one batch;
//! - `--save-value`: append the end-of-day total to the history sheet and mail
//!   a daily report comparing it with yesterday's total.
//!
//! Usage example (CLI):
//! ```bash
//! portfolio_updater --config portfolio.toml
//! portfolio_updater --save-value -p "Current Portfolio Value" -v "Portfolio Value over Time"
//! ```
//!
//! See `config` for every option and its environment variable.
#![warn(missing_docs)]
mod archiver;
mod args;
mod auth;
mod config;
mod fetcher;
mod mailer;
mod retry;
mod sheets;
mod updater;

use std::process::ExitCode;

use chrono::Local;
use clap::Parser;
use log::{error, info};
use portfolio_common::{DryRun, PortfolioError, Result, SheetStore};

use crate::archiver::{Envelope, archive_and_report};
use crate::args::Args;
use crate::config::{Config, RunMode};
use crate::fetcher::YahooQuotes;
use crate::mailer::{LogOnly, MailTransport, SmtpMailer};
use crate::retry::Retry;
use crate::sheets::GoogleSheets;
use crate::updater::run_update;

/// Exit status for configuration problems found before any I/O.
const EXIT_CONFIG: u8 = 2;

fn main() -> ExitCode {
    dotenv::dotenv().ok();
    init_logger();
    let args = Args::parse();
    let mode = args.mode();

    let config = match load_config(&args, mode) {
        Ok(config) => config,
        Err(e) => {
            error!("{e}");
            eprintln!("portfolio_updater: {e}");
            return ExitCode::from(EXIT_CONFIG);
        }
    };

    match run(&args, &config, mode) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{mode} run failed: {e}");
            eprintln!("portfolio_updater: {e}");
            ExitCode::FAILURE
        }
    }
}

fn init_logger() {
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();
}

fn load_config(args: &Args, mode: RunMode) -> Result<Config> {
    let config = Config::load(&args.config)?.apply_args(args);
    config.validate(mode)?;
    Ok(config)
}

fn run(args: &Args, config: &Config, mode: RunMode) -> Result<()> {
    info!("Starting {mode} run for spreadsheet {}", config.spreadsheet_key()?);
    let retry = Retry::new(config.retry.attempts, config.retry.delay());
    let token = auth::load_access_token(&config.sheets)?;
    let sheets = GoogleSheets::new(&config.sheets, config.spreadsheet_key()?, token, retry)?;

    if args.dry_run {
        info!("Dry run: writes and mail are logged only");
        let mut store = DryRun::new(sheets);
        dispatch(&mut store, config, mode, retry, &LogOnly)?;
        info!("Dry run skipped {} cell writes", store.skipped().len());
        Ok(())
    } else {
        let mut store = sheets;
        match mode {
            RunMode::Update => dispatch(&mut store, config, mode, retry, &LogOnly),
            RunMode::Archive => dispatch(&mut store, config, mode, retry, &SmtpMailer::new(&config.smtp)?),
        }
    }
}

fn dispatch<S, M>(store: &mut S, config: &Config, mode: RunMode, retry: Retry, mailer: &M) -> Result<()>
where
    S: SheetStore,
    M: MailTransport,
{
    match mode {
        RunMode::Update => {
            let layout = config.price_layout()?;
            let quotes = YahooQuotes::new(&config.quotes)?;
            let updated = run_update(store, &layout, &quotes, retry, Local::now().naive_local())?;
            info!("Portfolio updated: {updated} rows");
        }
        RunMode::Archive => {
            let layout = config.archive_layout()?;
            let envelope = Envelope {
                from: required(config.from_addr.as_deref(), "from_addr")?,
                to: required(config.to_addr.as_deref(), "to_addr")?,
            };
            let archived = archive_and_report(store, &layout, mailer, &envelope, Local::now().date_naive())?;
            info!(
                "End-of-day value {} archived ({}%)",
                archived.snapshot.entry.value, archived.report.change_percent
            );
        }
    }
    Ok(())
}

fn required(value: Option<&str>, key: &str) -> Result<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .ok_or_else(|| PortfolioError::Configuration(format!("{key} is not set")))
}
