//! Spreadsheet credentials.
//!
//! The token exchange itself happens outside this program (a service account
//! helper, `gcloud auth print-access-token`, ...). Here the resulting bearer
//! token is picked up from configuration, the environment, or a JSON file with
//! an `access_token` field.
use std::env;
use std::fs;
use std::path::Path;

use log::debug;
use portfolio_common::{PortfolioError, Result};
use serde::Deserialize;

use crate::config::SheetsSettings;

/// Environment variable checked when no token is configured.
pub const TOKEN_ENV: &str = "SHEETS_ACCESS_TOKEN";

#[derive(Debug, Deserialize)]
struct CredentialsFile {
    access_token: String,
}

/// Resolves the bearer token for the Sheets API.
pub fn load_access_token(settings: &SheetsSettings) -> Result<String> {
    if let Some(token) = settings.access_token.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
        debug!("Using configured Sheets access token");
        return Ok(token.to_string());
    }
    if let Ok(token) = env::var(TOKEN_ENV) {
        if !token.trim().is_empty() {
            debug!("Using Sheets access token from {TOKEN_ENV}");
            return Ok(token.trim().to_string());
        }
    }
    match &settings.credentials_path {
        Some(path) => read_credentials(path),
        None => Err(PortfolioError::Authentication(format!(
            "no Sheets credentials: set sheets.access_token, {TOKEN_ENV} or sheets.credentials_path"
        ))),
    }
}

fn read_credentials(path: &Path) -> Result<String> {
    let text = fs::read_to_string(path).map_err(|e| {
        PortfolioError::Authentication(format!("cannot read credentials {}: {e}", path.display()))
    })?;
    let parsed: CredentialsFile = serde_json::from_str(&text).map_err(|e| {
        PortfolioError::Authentication(format!("malformed credentials {}: {e}", path.display()))
    })?;
    let token = parsed.access_token.trim();
    if token.is_empty() {
        return Err(PortfolioError::Authentication(format!(
            "credentials {} hold an empty access_token",
            path.display()
        )));
    }
    debug!("Using Sheets access token from {}", path.display());
    Ok(token.to_string())
}
