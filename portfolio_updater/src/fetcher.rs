//! Quote fetcher.
//!
//! All symbols go out in one batched request. The response is matched back to
//! the request by symbol, and every requested symbol must be answered: a short
//! response aborts the run before anything is written.
//!
//! The public Yahoo v7 endpoint has started to demand a session crumb and
//! cookie and answers 401 without them. No crumb handshake is done here; point
//! `quotes.base_url` at a proxy or another source that serves the same
//! `quoteResponse` shape.
use std::collections::{BTreeSet, HashMap};
use std::time::Duration;

use log::{debug, info};
use portfolio_common::tickers::join_symbols;
use portfolio_common::{PortfolioError, QuoteRecord, Result, TickerSymbol};
use reqwest::StatusCode;
use reqwest::blocking::Client;
use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use serde::Deserialize;

use crate::config::QuoteSettings;

const QUOTE_PATH: &str = "/v7/finance/quote";
const QUOTE_FIELDS: &str = "symbol,regularMarketPrice,regularMarketChange";

/// Anything that can answer a batched quote query.
pub trait QuoteSource {
    /// Quotes for `symbols`, in any order, from a single request.
    fn fetch(&self, symbols: &BTreeSet<TickerSymbol>) -> Result<Vec<QuoteRecord>>;
}

/// Fetches quotes for `symbols` keyed by symbol.
///
/// An empty set is a no-op that never touches the network.
pub fn fetch_quotes<Q>(source: &Q, symbols: &BTreeSet<TickerSymbol>) -> Result<HashMap<TickerSymbol, QuoteRecord>>
where
    Q: QuoteSource + ?Sized,
{
    if symbols.is_empty() {
        info!("No tickers to quote");
        return Ok(HashMap::new());
    }

    let records = source.fetch(symbols)?;
    let mut quotes = HashMap::with_capacity(symbols.len());
    for record in records {
        if symbols.contains(&record.symbol) {
            quotes.insert(record.symbol.clone(), record);
        } else {
            debug!("Ignoring unrequested quote for {}", record.symbol);
        }
    }

    let missing: Vec<&TickerSymbol> = symbols.iter().filter(|s| !quotes.contains_key(*s)).collect();
    if !missing.is_empty() {
        return Err(PortfolioError::QuoteFetch(format!(
            "response covered {} of {} symbols; missing {}",
            quotes.len(),
            symbols.len(),
            join_symbols(missing)
        )));
    }

    info!("Fetched {} quotes", quotes.len());
    Ok(quotes)
}

/// Yahoo Finance quote endpoint.
pub struct YahooQuotes {
    client: Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuoteEnvelope {
    quote_response: QuoteResponse,
}

#[derive(Debug, Deserialize)]
struct QuoteResponse {
    #[serde(default)]
    result: Option<Vec<RawQuote>>,
    #[serde(default)]
    error: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawQuote {
    symbol: String,
    regular_market_price: Option<f64>,
    regular_market_change: Option<f64>,
}

impl YahooQuotes {
    pub fn new(settings: &QuoteSettings) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| PortfolioError::QuoteFetch(format!("failed to build HTTP client: {e}")))?;
        Ok(YahooQuotes {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn decode(body: &str) -> Result<Vec<QuoteRecord>> {
        let envelope: QuoteEnvelope = serde_json::from_str(body)
            .map_err(|e| PortfolioError::QuoteFetch(format!("malformed quote response: {e}")))?;
        if let Some(error) = envelope.quote_response.error.filter(|e| !e.is_null()) {
            return Err(PortfolioError::QuoteFetch(format!("quote source error: {error}")));
        }

        envelope
            .quote_response
            .result
            .unwrap_or_default()
            .into_iter()
            .map(|raw| -> Result<QuoteRecord> {
                let symbol = TickerSymbol::new(&raw.symbol)
                    .map_err(|_| PortfolioError::QuoteFetch("quote without a symbol".to_string()))?;
                let price = number(raw.regular_market_price, &symbol, "price")?;
                let change = number(raw.regular_market_change, &symbol, "change")?;
                Ok(QuoteRecord::from_decimals(symbol, price, change))
            })
            .collect()
    }
}

fn number(value: Option<f64>, symbol: &TickerSymbol, field: &str) -> Result<Decimal> {
    value
        .and_then(Decimal::from_f64)
        .ok_or_else(|| PortfolioError::QuoteFetch(format!("quote for {symbol} has no {field}")))
}

impl QuoteSource for YahooQuotes {
    fn fetch(&self, symbols: &BTreeSet<TickerSymbol>) -> Result<Vec<QuoteRecord>> {
        let url = format!("{}{}", self.base_url, QUOTE_PATH);
        let joined = join_symbols(symbols);
        debug!("GET {url} symbols={joined}");

        let response = self
            .client
            .get(&url)
            .query(&[("symbols", joined.as_str()), ("fields", QUOTE_FIELDS)])
            .send()
            .map_err(|e| PortfolioError::QuoteFetch(format!("request to {url} failed: {e}")))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(PortfolioError::QuoteFetch(format!(
                "quote source {} refused the request (HTTP {status}); set quotes.base_url to a source that needs no crumb",
                self.base_url
            )));
        }
        if !status.is_success() {
            return Err(PortfolioError::QuoteFetch(format!("quote source answered HTTP {status}")));
        }
        let body = response
            .text()
            .map_err(|e| PortfolioError::QuoteFetch(format!("failed to read quote response: {e}")))?;
        YahooQuotes::decode(&body)
    }
}
