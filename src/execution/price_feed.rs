use crate::api::{LookupError, PriceLookup};
use crate::error::{Error, Result};
use crate::models::normalize_symbol;
use std::sync::Arc;
use tokio::time::{sleep, Duration};

/// Bounded retry with a fixed pause between transient failures
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_secs(1))
    }
}

/// Fetches live prices through a `PriceLookup`, applying the retry policy
#[derive(Clone)]
pub struct PriceFeed {
    lookup: Arc<dyn PriceLookup>,
    policy: RetryPolicy,
}

impl PriceFeed {
    pub fn new(lookup: Arc<dyn PriceLookup>, policy: RetryPolicy) -> Self {
        Self { lookup, policy }
    }

    /// Latest price for `symbol`.
    ///
    /// An unknown symbol fails at once with `InvalidSymbol`. Transient
    /// failures are retried after `policy.delay` until `max_attempts` is
    /// used up, then reported as `MarketDataUnavailable` with the last cause.
    pub async fn fetch_price(&self, symbol: &str) -> Result<f64> {
        let symbol = normalize_symbol(symbol);
        let max_attempts = self.policy.max_attempts.max(1);
        let mut last_error = String::new();

        for attempt in 1..=max_attempts {
            tracing::debug!(
                symbol = %symbol,
                "Fetching price (attempt {}/{})",
                attempt,
                max_attempts
            );

            match self.lookup.get_price(&symbol).await {
                Ok(price) => {
                    if attempt > 1 {
                        tracing::info!(
                            "✓ Successfully fetched {} after {} attempts",
                            symbol,
                            attempt
                        );
                    }
                    tracing::info!(symbol = %symbol, "Fetched price: ${:.2}", price);
                    return Ok(price);
                }
                Err(LookupError::InvalidSymbol(reason)) => {
                    tracing::warn!(symbol = %symbol, reason = %reason, "Invalid symbol");
                    return Err(Error::InvalidSymbol { symbol, reason });
                }
                Err(LookupError::Transient(reason)) => {
                    tracing::warn!(
                        "Attempt {}/{} failed for {}: {}",
                        attempt,
                        max_attempts,
                        symbol,
                        reason
                    );
                    last_error = reason;

                    if attempt < max_attempts {
                        sleep(self.policy.delay).await;
                    }
                }
            }
        }

        Err(Error::MarketDataUnavailable {
            symbol,
            reason: last_error,
        })
    }
}


#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;

    fn feed(lookup: Arc<ScriptedLookup>, attempts: u32) -> PriceFeed {
        PriceFeed::new(lookup, RetryPolicy::new(attempts, Duration::from_millis(1)))
    }

    #[tokio::test]
    async fn test_success_first_try() {
        let lookup = Arc::new(ScriptedLookup::new().script("AAPL", vec![Ok(187.5)]));

        let price = feed(lookup.clone(), 3).fetch_price("aapl").await.unwrap();

        assert_eq!(price, 187.5);
        assert_eq!(lookup.calls("AAPL"), 1);
    }

    #[tokio::test]
    async fn test_invalid_symbol_never_retries() {
        let lookup = Arc::new(ScriptedLookup::new().script("BAD", vec![invalid(), Ok(1.0)]));

        let err = feed(lookup.clone(), 5).fetch_price("BAD").await.unwrap_err();

        assert!(matches!(err, Error::InvalidSymbol { ref symbol, .. } if symbol == "BAD"));
        assert_eq!(lookup.calls("BAD"), 1);
    }

    #[tokio::test]
    async fn test_transient_then_success_on_attempt_n() {
        let lookup = Arc::new(ScriptedLookup::new().script(
            "TCS.NS",
            vec![transient("timeout"), transient("reset"), Ok(3750.0)],
        ));

        let price = feed(lookup.clone(), 3).fetch_price("TCS.NS").await.unwrap();

        assert_eq!(price, 3750.0);
        assert_eq!(lookup.calls("TCS.NS"), 3);
    }

    #[tokio::test]
    async fn test_exhausted_attempts_report_last_error() {
        let lookup = Arc::new(ScriptedLookup::new().script(
            "AAPL",
            vec![transient("timeout"), transient("connection refused"), Ok(1.0)],
        ));

        let err = feed(lookup.clone(), 2).fetch_price("AAPL").await.unwrap_err();

        assert_eq!(
            err,
            Error::MarketDataUnavailable {
                symbol: "AAPL".to_string(),
                reason: "connection refused".to_string(),
            }
        );
        assert_eq!(lookup.calls("AAPL"), 2);
    }

    #[tokio::test]
    async fn test_invalid_after_transient_stops_immediately() {
        let lookup = Arc::new(
            ScriptedLookup::new().script("X", vec![transient("timeout"), invalid(), Ok(1.0)]),
        );

        let err = feed(lookup.clone(), 5).fetch_price("X").await.unwrap_err();

        assert_eq!(err.kind(), "invalid_symbol");
        assert_eq!(lookup.calls("X"), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fixed_delay_between_attempts_only() {
        let lookup = Arc::new(ScriptedLookup::new().script(
            "X",
            vec![transient("a"), transient("b"), transient("c")],
        ));
        let feed = PriceFeed::new(lookup.clone(), RetryPolicy::new(3, Duration::from_secs(1)));

        let start = tokio::time::Instant::now();
        let err = feed.fetch_price("X").await.unwrap_err();

        // two pauses for three attempts, none after the last
        assert_eq!(start.elapsed(), Duration::from_secs(2));
        assert_eq!(lookup.calls("X"), 3);
        assert_eq!(err.kind(), "market_data_unavailable");
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_delay_on_success_or_invalid() {
        let lookup = Arc::new(
            ScriptedLookup::new()
                .script("AAPL", vec![Ok(10.0)])
                .script("BAD", vec![invalid()]),
        );
        let feed = PriceFeed::new(lookup.clone(), RetryPolicy::new(3, Duration::from_secs(1)));

        let start = tokio::time::Instant::now();
        feed.fetch_price("AAPL").await.unwrap();
        feed.fetch_price("BAD").await.unwrap_err();

        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test]
    async fn test_zero_attempts_still_tries_once() {
        let lookup = Arc::new(ScriptedLookup::new().script("AAPL", vec![Ok(10.0)]));
        let feed = PriceFeed::new(
            lookup.clone(),
            RetryPolicy {
                max_attempts: 0,
                delay: Duration::from_millis(1),
            },
        );

        assert_eq!(feed.fetch_price("AAPL").await.unwrap(), 10.0);
        assert_eq!(lookup.calls("AAPL"), 1);
    }
}
