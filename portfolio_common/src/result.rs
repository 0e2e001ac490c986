//! Result type alias shared across the workspace.
//!
//! Defaults the error type to `PortfolioError`, so functions can simply return
//! `Result<T>`.
use crate::error::PortfolioError;

/// Workspace-wide `Result` alias with `PortfolioError` as the default error.
pub type Result<T, E = PortfolioError> = std::result::Result<T, E>;
