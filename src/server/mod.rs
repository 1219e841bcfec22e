//! HTTP API over `StockService`.

pub mod routes;

use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::config::Settings;
use crate::error::{Error, Result};
use crate::service::StockService;

/// Shared handler state
pub struct AppState {
    pub service: Arc<StockService>,
    pub settings: Arc<Settings>,
    /// Serializes cycle runs triggered over HTTP
    pub cycle_lock: Mutex<()>,
}

impl AppState {
    pub fn new(service: Arc<StockService>, settings: Arc<Settings>) -> Self {
        Self {
            service,
            settings,
            cycle_lock: Mutex::new(()),
        }
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(routes::root))
        .route("/health", get(routes::health))
        // Stocks
        .route("/api/v1/stocks", get(routes::list_stocks))
        .route("/api/v1/stocks/analyze", post(routes::analyze_stock))
        .route("/api/v1/stocks/track", post(routes::track_stock))
        .route(
            "/api/v1/stocks/:symbol",
            get(routes::get_stock)
                .put(routes::update_stock)
                .delete(routes::delete_stock),
        )
        // Agent
        .route("/api/v1/agent/run", get(routes::run_agent))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind and serve until Ctrl+C
pub async fn serve(state: Arc<AppState>, host: &str, port: u16) -> Result<()> {
    let addr: SocketAddr = format!("{}:{}", host, port)
        .parse()
        .map_err(|e| Error::Config(format!("Invalid listen address {}:{}: {}", host, port, e)))?;

    tracing::info!(
        "Starting {} v{}",
        state.settings.app_name,
        state.settings.app_version
    );
    tracing::info!("Environment: {}", state.settings.environment);
    tracing::info!(address = %addr, "Starting HTTP server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| Error::Config(format!("Failed to bind {}: {}", addr, e)))?;

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutting down application");
        })
        .await
        .map_err(|e| Error::Config(format!("HTTP server error: {}", e)))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::routes::{AgentRunResponse, HealthResponse, MessageResponse};
    use super::*;
    use crate::execution::price_feed::testing::{invalid, transient, ScriptedLookup};
    use crate::models::{Analysis, Decision, TrackedPosition};
    use crate::service::testing::service;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use serde::de::DeserializeOwned;
    use serde_json::{json, Value};
    use tempfile::TempDir;
    use tower::ServiceExt;

    async fn app(lookup: ScriptedLookup) -> (TempDir, Router) {
        let (dir, _lookup, _notifier, service) = service(lookup).await;
        let state = Arc::new(AppState::new(
            Arc::new(service),
            Arc::new(Settings::default()),
        ));
        (dir, router(state))
    }

    async fn call(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Vec<u8>) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, bytes.to_vec())
    }

    fn parse<T: DeserializeOwned>(bytes: &[u8]) -> T {
        serde_json::from_slice(bytes).unwrap()
    }

    #[tokio::test]
    async fn test_root_and_health() {
        let (_dir, app) = app(ScriptedLookup::new()).await;

        let (status, body) = call(&app, "GET", "/", None).await;
        assert_eq!(status, StatusCode::OK);
        let root: Value = parse(&body);
        assert_eq!(root["message"], "Stock Agent API");
        assert!(root["version"].is_string());

        let (status, body) = call(&app, "GET", "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        let health: HealthResponse = parse(&body);
        assert_eq!(health.status, "healthy");
        assert_eq!(health.dependencies["storage"], "healthy");
        // nothing scripted for the health check symbol
        assert_eq!(health.dependencies["market_data"], "unhealthy");
    }

    #[tokio::test]
    async fn test_analyze_endpoint() {
        let (_dir, app) = app(ScriptedLookup::new().script("AAPL", vec![Ok(150.0)])).await;

        let (status, body) = call(
            &app,
            "POST",
            "/api/v1/stocks/analyze",
            Some(json!({"symbol": "aapl", "buy_price": 100.0, "target_price": 200.0})),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        let analysis: Analysis = parse(&body);
        assert_eq!(analysis.symbol, "AAPL");
        assert_eq!(analysis.decision, Decision::Hold);
        assert_eq!(analysis.profit_percent, 50.0);
    }

    #[tokio::test]
    async fn test_analyze_error_statuses() {
        let (_dir, app) = app(
            ScriptedLookup::new()
                .script("BAD", vec![invalid()])
                .script("DOWN", vec![transient("x"), transient("y"), transient("z")]),
        )
        .await;

        let (status, body) = call(
            &app,
            "POST",
            "/api/v1/stocks/analyze",
            Some(json!({"symbol": "BAD", "buy_price": 1.0, "target_price": 2.0})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let detail: Value = parse(&body);
        assert!(detail["detail"].as_str().unwrap().contains("Invalid stock symbol 'BAD'"));

        let (status, _) = call(
            &app,
            "POST",
            "/api/v1/stocks/analyze",
            Some(json!({"symbol": "DOWN", "buy_price": 1.0, "target_price": 2.0})),
        )
        .await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

        let (status, _) = call(
            &app,
            "POST",
            "/api/v1/stocks/analyze",
            Some(json!({"symbol": "AAPL", "buy_price": 5.0, "target_price": 2.0})),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_track_crud_flow() {
        let (_dir, app) = app(ScriptedLookup::new()).await;
        let body = json!({"symbol": "tcs.ns", "buy_price": 3500.0, "target_price": 4000.0});

        let (status, bytes) = call(&app, "POST", "/api/v1/stocks/track", Some(body.clone())).await;
        assert_eq!(status, StatusCode::OK);
        let msg: MessageResponse = parse(&bytes);
        assert_eq!(msg.message, "TCS.NS added successfully");

        let (status, _) = call(&app, "POST", "/api/v1/stocks/track", Some(body)).await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, bytes) = call(&app, "GET", "/api/v1/stocks", None).await;
        assert_eq!(status, StatusCode::OK);
        let listed: Vec<TrackedPosition> = parse(&bytes);
        assert_eq!(listed.len(), 1);

        let (status, bytes) = call(
            &app,
            "PUT",
            "/api/v1/stocks/tcs.ns",
            Some(json!({"symbol": "TCS.NS", "buy_price": 3400.0, "target_price": 4100.0})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let updated: TrackedPosition = parse(&bytes);
        assert_eq!(updated.buy_price, 3400.0);

        let (status, _) = call(&app, "GET", "/api/v1/stocks/TCS.NS", None).await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = call(&app, "DELETE", "/api/v1/stocks/TCS.NS", None).await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = call(&app, "GET", "/api/v1/stocks/TCS.NS", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = call(&app, "DELETE", "/api/v1/stocks/TCS.NS", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_run_agent_reports_failures_per_symbol() {
        let (_dir, app) = app(
            ScriptedLookup::new()
                .script("AAPL", vec![Ok(150.0)])
                .script("BAD", vec![invalid()]),
        )
        .await;

        for symbol in ["AAPL", "BAD"] {
            let (status, _) = call(
                &app,
                "POST",
                "/api/v1/stocks/track",
                Some(json!({"symbol": symbol, "buy_price": 100.0, "target_price": 200.0})),
            )
            .await;
            assert_eq!(status, StatusCode::OK);
        }

        let (status, bytes) = call(&app, "GET", "/api/v1/agent/run", None).await;
        assert_eq!(status, StatusCode::OK);

        let run: AgentRunResponse = parse(&bytes);
        assert_eq!(run.total_stocks, 1);
        assert_eq!(run.results[0].symbol, "AAPL");
        assert_eq!(run.failed, 1);
        assert_eq!(run.errors[0].symbol, "BAD");
        assert_eq!(run.time.len(), "2024-01-01 12:00:00".len());
    }
}
