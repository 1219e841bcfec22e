use super::alerts::{daily_update_message, target_reached_message};
use super::{analyze, DailyWindow, PriceFeed};
use crate::api::Notifier;
use crate::models::{CycleFailure, CycleResult, Decision, TrackedPosition};
use chrono::{DateTime, TimeZone, Utc};
use std::sync::Arc;

/// Runs one pass over every tracked position.
///
/// Positions are handled one after another. A failed lookup skips that
/// position only; notifier failures are logged and never stop the pass.
#[derive(Clone)]
pub struct CycleRunner {
    feed: PriceFeed,
    notifier: Arc<dyn Notifier>,
    window: DailyWindow,
}

impl CycleRunner {
    pub fn new(feed: PriceFeed, notifier: Arc<dyn Notifier>, window: DailyWindow) -> Self {
        Self {
            feed,
            notifier,
            window,
        }
    }

    /// Analyze `positions` in order, as of `now`.
    ///
    /// `now` decides the daily window, so it should carry the user's offset.
    pub async fn run<Tz: TimeZone>(
        &self,
        positions: &[TrackedPosition],
        now: &DateTime<Tz>,
    ) -> CycleResult {
        let mut result = CycleResult::default();

        if positions.is_empty() {
            tracing::info!("No stocks to analyze");
            return result;
        }

        let daily_due = self.window.contains(now);
        let analyzed_at = now.with_timezone(&Utc);

        if daily_due {
            tracing::info!(
                "Inside daily update window ({:02}:{:02})",
                self.window.hour,
                self.window.minute
            );
        }

        for position in positions {
            let price = match self.feed.fetch_price(&position.symbol).await {
                Ok(price) => price,
                Err(e) => {
                    tracing::error!(symbol = %position.symbol, error = %e, "Failed to analyze");
                    result.failures.push(CycleFailure::new(&position.symbol, &e));
                    continue;
                }
            };

            let analysis = analyze(
                &position.symbol,
                position.buy_price,
                position.target_price,
                price,
                analyzed_at,
            );

            tracing::info!(
                symbol = %analysis.symbol,
                price = %analysis.current_price,
                "Analysis complete: {}",
                analysis.decision
            );

            if analysis.decision == Decision::TargetReached {
                self.notify(&target_reached_message(&analysis), &analysis.symbol, "target alert")
                    .await;
            }

            if daily_due {
                self.notify(
                    &daily_update_message(&analysis, &self.window),
                    &analysis.symbol,
                    "daily update",
                )
                .await;
            }

            result.analyses.push(analysis);
        }

        tracing::info!(
            "Agent run complete: analyzed {} stocks, {} failed",
            result.analyses.len(),
            result.failed_count()
        );

        result
    }

    async fn notify(&self, text: &str, symbol: &str, what: &str) {
        match self.notifier.send(text).await {
            Ok(()) => tracing::info!(symbol = %symbol, "Sent {}", what),
            Err(e) => tracing::error!(symbol = %symbol, error = %e, "Failed to send {}", what),
        }
    }
}
