use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A stock the agent keeps watching, keyed by its uppercase symbol
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrackedPosition {
    pub symbol: String,
    pub buy_price: f64,
    pub target_price: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TrackedPosition {
    /// Build a fresh record from already validated input
    pub fn new(input: PositionInput, now: DateTime<Utc>) -> Self {
        Self {
            symbol: input.symbol,
            buy_price: input.buy_price,
            target_price: input.target_price,
            created_at: now,
            updated_at: now,
        }
    }
}

/// User supplied symbol + prices, as received from the CLI or HTTP body
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PositionInput {
    pub symbol: String,
    pub buy_price: f64,
    pub target_price: f64,
}

impl PositionInput {
    pub fn new(symbol: impl Into<String>, buy_price: f64, target_price: f64) -> Self {
        Self {
            symbol: symbol.into(),
            buy_price,
            target_price,
        }
    }

    /// Normalize the symbol and check the price invariants.
    ///
    /// Target must exceed buy here; analysis never re-checks it.
    pub fn validate(self) -> Result<Self> {
        let symbol = normalize_symbol(&self.symbol);
        if symbol.is_empty() {
            return Err(Error::Validation("Symbol must not be empty".to_string()));
        }
        if !self.buy_price.is_finite() || self.buy_price <= 0.0 {
            return Err(Error::Validation(
                "Buy price must be greater than 0".to_string(),
            ));
        }
        if !self.target_price.is_finite() || self.target_price <= 0.0 {
            return Err(Error::Validation(
                "Target price must be greater than 0".to_string(),
            ));
        }
        if self.target_price <= self.buy_price {
            return Err(Error::Validation(
                "Target price must be greater than buy price".to_string(),
            ));
        }

        Ok(Self { symbol, ..self })
    }
}

pub fn normalize_symbol(symbol: &str) -> String {
    symbol.trim().to_uppercase()
}

/// Outcome of comparing the live price with buy and target prices
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Decision {
    TargetReached,
    Hold,
    BelowBuyPrice,
}

impl Decision {
    pub fn label(&self) -> &'static str {
        match self {
            Decision::TargetReached => "🎯 TARGET REACHED",
            Decision::Hold => "⏳ HOLD",
            Decision::BelowBuyPrice => "🔻 BELOW BUY PRICE",
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One analysis of a symbol at a point in time. Never persisted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Analysis {
    pub symbol: String,
    pub buy_price: f64,
    pub current_price: f64,
    pub target_price: f64,
    pub profit: f64,
    pub profit_percent: f64,
    pub decision: Decision,
    pub analyzed_at: DateTime<Utc>,
}

/// A position skipped during a cycle
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CycleFailure {
    pub symbol: String,
    pub kind: String,
    pub reason: String,
}

impl CycleFailure {
    pub fn new(symbol: &str, error: &Error) -> Self {
        Self {
            symbol: symbol.to_string(),
            kind: error.kind().to_string(),
            reason: error.to_string(),
        }
    }
}

/// Everything one cycle produced, in store order
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CycleResult {
    pub analyses: Vec<Analysis>,
    pub failures: Vec<CycleFailure>,
}

impl CycleResult {
    pub fn failed_count(&self) -> usize {
        self.failures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.analyses.is_empty() && self.failures.is_empty()
    }
}
