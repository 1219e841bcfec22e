use super::{LookupError, PriceLookup};
use crate::error::{Error, Result};
use async_trait::async_trait;
use governor::{Quota, RateLimiter};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) stockwatch";
const NO_DATA: &str = "No data available - symbol may be invalid or market is closed";

// Type alias for the rate limiter to simplify signatures
type YahooRateLimiter = RateLimiter<
    governor::state::direct::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

/// Yahoo Finance chart API client
///
/// Makes exactly one request per `get_price` call; retries belong to the caller.
/// Cloneable, all clones share the same rate limiter.
#[derive(Clone)]
pub struct YahooFinanceClient {
    client: Client,
    base_url: String,
    rate_limiter: Arc<YahooRateLimiter>,
}

/// Response from /v8/finance/chart/{symbol}
#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: Chart,
}

#[derive(Debug, Deserialize)]
struct Chart {
    #[serde(default)]
    result: Option<Vec<ChartResult>>,
    #[serde(default)]
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    meta: ChartMeta,
    #[serde(default)]
    indicators: Option<Indicators>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChartMeta {
    #[serde(default)]
    regular_market_price: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    #[serde(default)]
    quote: Vec<QuoteSeries>,
}

#[derive(Debug, Deserialize)]
struct QuoteSeries {
    #[serde(default)]
    close: Vec<Option<f64>>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    #[serde(default)]
    description: String,
}

impl YahooFinanceClient {
    pub fn new(base_url: &str, timeout: Duration, requests_per_minute: u32) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| Error::Config(format!("Failed to build HTTP client: {}", e)))?;

        let rpm = NonZeroU32::new(requests_per_minute).unwrap_or(NonZeroU32::MIN);
        let rate_limiter = Arc::new(RateLimiter::direct(Quota::per_minute(rpm)));

        tracing::info!(base_url = %base_url, "Initialized Yahoo Finance client");

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            rate_limiter,
        })
    }
}

#[async_trait]
impl PriceLookup for YahooFinanceClient {
    async fn get_price(&self, symbol: &str) -> std::result::Result<f64, LookupError> {
        self.rate_limiter.until_ready().await;

        let url = format!(
            "{}/v8/finance/chart/{}",
            self.base_url,
            urlencoding::encode(symbol)
        );
        let response = self
            .client
            .get(&url)
            .query(&[("range", "1d"), ("interval", "1d")])
            .send()
            .await
            .map_err(|e| LookupError::Transient(format!("Request failed: {}", e)))?;

        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            return Err(LookupError::InvalidSymbol(NO_DATA.to_string()));
        }

        // Throttling, server errors and anything else unexpected may clear up
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LookupError::Transient(format!(
                "Yahoo Finance returned {}: {}",
                status,
                body.chars().take(200).collect::<String>()
            )));
        }

        let body: ChartResponse = response
            .json()
            .await
            .map_err(|e| LookupError::Transient(format!("Malformed chart response: {}", e)))?;

        let price = extract_price(body)?;
        tracing::debug!(symbol = %symbol, price, "Yahoo Finance quote");
        Ok(price)
    }

    fn name(&self) -> &str {
        "yahoo"
    }
}

/// Pull the latest price out of a chart response.
///
/// Prefers `regularMarketPrice`, falls back to the last non-null close.
fn extract_price(body: ChartResponse) -> std::result::Result<f64, LookupError> {
    if let Some(error) = body.chart.error {
        return Err(LookupError::InvalidSymbol(format!(
            "{}: {}",
            error.code, error.description
        )));
    }

    let result = body
        .chart
        .result
        .and_then(|r| r.into_iter().next())
        .ok_or_else(|| LookupError::InvalidSymbol(NO_DATA.to_string()))?;

    let last_close = || {
        result
            .indicators
            .as_ref()
            .and_then(|i| i.quote.first())
            .and_then(|q| q.close.iter().rev().find_map(|c| *c))
    };

    result
        .meta
        .regular_market_price
        .or_else(last_close)
        .filter(|p| p.is_finite() && *p > 0.0)
        .ok_or_else(|| LookupError::InvalidSymbol(NO_DATA.to_string()))
}
