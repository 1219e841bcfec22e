//! Stock tracking facade shared by the CLI and the HTTP API.

use crate::api::{LogNotifier, Notifier, PriceLookup, TelegramNotifier, YahooFinanceClient};
use crate::config::Settings;
use crate::error::{Error, Result};
use crate::execution::{analyze, CycleRunner, PriceFeed, RetryPolicy};
use crate::models::{normalize_symbol, Analysis, CycleResult, PositionInput, TrackedPosition};
use crate::persistence::{JsonPositionStore, PositionStore};
use chrono::{DateTime, FixedOffset, TimeZone, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Well-known ticker looked up by the market data health check
const HEALTH_CHECK_SYMBOL: &str = "AAPL";

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct HealthReport {
    pub dependencies: BTreeMap<String, String>,
}

pub struct StockService {
    store: Arc<dyn PositionStore>,
    lookup: Arc<dyn PriceLookup>,
    feed: PriceFeed,
    notifier: Arc<dyn Notifier>,
    runner: CycleRunner,
    timezone: FixedOffset,
}

impl StockService {
    pub fn new(
        store: Arc<dyn PositionStore>,
        lookup: Arc<dyn PriceLookup>,
        notifier: Arc<dyn Notifier>,
        settings: &Settings,
    ) -> Self {
        let policy = RetryPolicy::new(settings.retry_attempts(), settings.retry_delay());
        let feed = PriceFeed::new(lookup.clone(), policy);
        let runner = CycleRunner::new(feed.clone(), notifier.clone(), settings.daily_window());

        tracing::info!(
            lookup = %lookup.name(),
            notifier_configured = notifier.is_configured(),
            "Initialized StockService"
        );

        Self {
            store,
            lookup,
            feed,
            notifier,
            runner,
            timezone: settings.timezone(),
        }
    }

    /// Wire up the JSON store, Yahoo Finance and Telegram (or log-only) notifier
    pub async fn from_settings(settings: &Settings) -> Result<Self> {
        settings.ensure_directories()?;

        let store = JsonPositionStore::open(&settings.data_file_path).await?;
        let lookup = YahooFinanceClient::new(
            &settings.market_data_base_url,
            settings.market_data_timeout(),
            settings.market_data_rate_limit_rpm,
        )?;

        let notifier: Arc<dyn Notifier> = match TelegramNotifier::from_settings(settings)? {
            Some(telegram) => {
                tracing::info!("Initialized AlertService with Telegram");
                Arc::new(telegram)
            }
            None => {
                tracing::warn!("Telegram not configured - alerts will be logged only");
                Arc::new(LogNotifier)
            }
        };

        Ok(Self::new(Arc::new(store), Arc::new(lookup), notifier, settings))
    }

    /// Current time in the configured offset
    pub fn now(&self) -> DateTime<FixedOffset> {
        Utc::now().with_timezone(&self.timezone)
    }

    /// Analyze without tracking. Lookup failures propagate as-is.
    pub async fn analyze(&self, input: PositionInput) -> Result<Analysis> {
        let input = input.validate()?;
        tracing::info!(symbol = %input.symbol, "Analyzing stock");

        let price = self.feed.fetch_price(&input.symbol).await?;
        let analysis = analyze(
            &input.symbol,
            input.buy_price,
            input.target_price,
            price,
            Utc::now(),
        );

        tracing::info!(symbol = %analysis.symbol, "Analysis complete: {}", analysis.decision);
        Ok(analysis)
    }

    pub async fn track(&self, input: PositionInput) -> Result<TrackedPosition> {
        let input = input.validate()?;
        tracing::info!(symbol = %input.symbol, "Adding stock to tracking");
        self.store.add(input).await
    }

    pub async fn list(&self) -> Result<Vec<TrackedPosition>> {
        let positions = self.store.list_all().await?;
        tracing::debug!("Retrieved {} tracked stocks", positions.len());
        Ok(positions)
    }

    pub async fn get(&self, symbol: &str) -> Result<TrackedPosition> {
        self.store
            .get_by_symbol(symbol)
            .await?
            .ok_or_else(|| Error::PositionNotFound(normalize_symbol(symbol)))
    }

    pub async fn update(&self, symbol: &str, input: PositionInput) -> Result<TrackedPosition> {
        let input = input.validate()?;
        self.store.update(symbol, input).await
    }

    pub async fn delete(&self, symbol: &str) -> Result<()> {
        self.store.delete(symbol).await
    }

    /// One cycle over every tracked position, as of now
    pub async fn run_cycle(&self) -> Result<CycleResult> {
        self.run_cycle_at(&self.now()).await
    }

    /// Only a failure to list positions fails the whole cycle
    pub async fn run_cycle_at<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> Result<CycleResult> {
        tracing::info!("Running autonomous agent");
        let positions = self.store.list_all().await?;
        Ok(self.runner.run(&positions, now).await)
    }

    /// Probe each dependency once. The market data check is a single
    /// unretried lookup of a well-known symbol.
    pub async fn health(&self) -> HealthReport {
        let market_data = match self.lookup.get_price(HEALTH_CHECK_SYMBOL).await {
            Ok(_) => "healthy",
            Err(e) => {
                tracing::warn!(lookup = %self.lookup.name(), error = %e, "Market data health check failed");
                "unhealthy"
            }
        };
        let storage = match self.store.list_all().await {
            Ok(_) => "healthy",
            Err(e) => {
                tracing::warn!(error = %e, "Storage health check failed");
                "unhealthy"
            }
        };
        let telegram = if self.notifier.is_configured() {
            "configured"
        } else {
            "not_configured"
        };

        let mut dependencies = BTreeMap::new();
        dependencies.insert("storage".to_string(), storage.to_string());
        dependencies.insert("telegram".to_string(), telegram.to_string());
        dependencies.insert("market_data".to_string(), market_data.to_string());

        HealthReport { dependencies }
    }
}
