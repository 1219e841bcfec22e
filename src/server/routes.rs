//! HTTP route handlers.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::Arc;

use super::AppState;
use crate::error::Error;
use crate::models::{Analysis, CycleFailure, PositionInput, TrackedPosition};

// ============================================================================
// Response Types
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub environment: String,
    pub dependencies: BTreeMap<String, String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AgentRunResponse {
    /// Local time of the run in the configured offset
    pub time: String,
    pub total_stocks: usize,
    pub results: Vec<Analysis>,
    pub failed: usize,
    pub errors: Vec<CycleFailure>,
}

/// Maps service errors onto status codes with a `{"detail": ...}` body
#[derive(Debug)]
pub struct ApiError(pub Error);

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        Self(e)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self.0 {
            Error::InvalidSymbol { .. } => StatusCode::BAD_REQUEST,
            Error::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Error::DuplicatePosition(_) => StatusCode::CONFLICT,
            Error::PositionNotFound(_) => StatusCode::NOT_FOUND,
            Error::MarketDataUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self.0, "Request failed");
        }
        (status, Json(json!({ "detail": self.0.to_string() }))).into_response()
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

// ============================================================================
// Route Handlers
// ============================================================================

pub async fn root(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(json!({
        "message": format!("{} API", state.settings.app_name),
        "version": state.settings.app_version,
        "health": "/health",
    }))
}

pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let report = state.service.health().await;

    Json(HealthResponse {
        status: "healthy".to_string(),
        version: state.settings.app_version.clone(),
        environment: state.settings.environment.clone(),
        dependencies: report.dependencies,
    })
}

/// Analyze a stock without tracking it
pub async fn analyze_stock(
    State(state): State<Arc<AppState>>,
    Json(input): Json<PositionInput>,
) -> ApiResult<Analysis> {
    Ok(Json(state.service.analyze(input).await?))
}

pub async fn track_stock(
    State(state): State<Arc<AppState>>,
    Json(input): Json<PositionInput>,
) -> ApiResult<MessageResponse> {
    let position = state.service.track(input).await?;

    Ok(Json(MessageResponse {
        message: format!("{} added successfully", position.symbol),
    }))
}

pub async fn list_stocks(State(state): State<Arc<AppState>>) -> ApiResult<Vec<TrackedPosition>> {
    Ok(Json(state.service.list().await?))
}

pub async fn get_stock(
    State(state): State<Arc<AppState>>,
    Path(symbol): Path<String>,
) -> ApiResult<TrackedPosition> {
    Ok(Json(state.service.get(&symbol).await?))
}

pub async fn update_stock(
    State(state): State<Arc<AppState>>,
    Path(symbol): Path<String>,
    Json(input): Json<PositionInput>,
) -> ApiResult<TrackedPosition> {
    Ok(Json(state.service.update(&symbol, input).await?))
}

pub async fn delete_stock(
    State(state): State<Arc<AppState>>,
    Path(symbol): Path<String>,
) -> ApiResult<MessageResponse> {
    state.service.delete(&symbol).await?;

    Ok(Json(MessageResponse {
        message: format!("{} removed", symbol.trim().to_uppercase()),
    }))
}

/// Run one cycle over all tracked stocks.
///
/// Meant to be hit periodically (cron) for unattended monitoring. Overlapping
/// calls wait for the running cycle to finish.
pub async fn run_agent(State(state): State<Arc<AppState>>) -> ApiResult<AgentRunResponse> {
    let _guard = state.cycle_lock.lock().await;

    let now = state.service.now();
    let result = state.service.run_cycle_at(&now).await?;

    Ok(Json(AgentRunResponse {
        time: now.format("%Y-%m-%d %H:%M:%S").to_string(),
        total_stocks: result.analyses.len(),
        failed: result.failed_count(),
        results: result.analyses,
        errors: result.failures,
    }))
}
