use crate::models::{Analysis, Decision};
use chrono::{DateTime, Utc};

/// Classify a price against a position.
///
/// Reaching the target wins over everything; sitting exactly on the buy
/// price is still a hold.
pub fn decide(buy_price: f64, target_price: f64, current_price: f64) -> Decision {
    if current_price >= target_price {
        Decision::TargetReached
    } else if current_price < buy_price {
        Decision::BelowBuyPrice
    } else {
        Decision::Hold
    }
}

/// Turn buy/target/current prices into an `Analysis`.
///
/// Pure: the same inputs always give the same result. The decision uses
/// the raw prices, only the reported figures are rounded to cents.
pub fn analyze(
    symbol: &str,
    buy_price: f64,
    target_price: f64,
    current_price: f64,
    analyzed_at: DateTime<Utc>,
) -> Analysis {
    let profit = current_price - buy_price;
    let profit_percent = profit / buy_price * 100.0;

    Analysis {
        symbol: symbol.to_string(),
        buy_price,
        current_price: round2(current_price),
        target_price,
        profit: round2(profit),
        profit_percent: round2(profit_percent),
        decision: decide(buy_price, target_price, current_price),
        analyzed_at,
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
