//! HTTP API for metrics evaluation, health checks and Prometheus metrics

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    routing::get,
    Json, Router,
};
use hostwatch_lib::{
    health::{ComponentStatus, HealthRegistry},
    ErrorResponse, MonitorPipeline,
};
use prometheus::{Encoder, TextEncoder};
use std::sync::Arc;
use tracing::{error, info};

/// Body returned when the host cannot be sampled
pub const SAMPLING_ERROR_MESSAGE: &str = "Unable to fetch system metrics";

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<MonitorPipeline>,
    pub health_registry: HealthRegistry,
}

impl AppState {
    pub fn new(pipeline: Arc<MonitorPipeline>) -> Self {
        let health_registry = pipeline.health_registry().clone();
        Self {
            pipeline,
            health_registry,
        }
    }
}

/// Evaluate the host once and report metrics plus the anomaly verdict
async fn report(State(state): State<Arc<AppState>>) -> Response {
    match state.pipeline.evaluate().await {
        Ok(evaluation) => (StatusCode::OK, Json(evaluation.report)).into_response(),
        Err(err) => {
            error!(error = %err, kind = err.kind(), "Metrics evaluation failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: SAMPLING_ERROR_MESSAGE.to_string(),
                }),
            )
                .into_response()
        }
    }
}

/// Health check response - returns 200 if healthy, 503 if degraded/unhealthy
async fn healthz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let health = state.health_registry.health().await;

    let status_code = match health.status {
        ComponentStatus::Healthy => StatusCode::OK,
        ComponentStatus::Degraded => StatusCode::OK, // Still operational
        ComponentStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status_code, Json(health))
}

/// Readiness check response - returns 200 if ready, 503 if not ready
async fn readyz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let readiness = state.health_registry.readiness().await;

    let status_code = if readiness.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(readiness))
}

/// Prometheus self-metrics endpoint
async fn prometheus_metrics() -> Response {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        error!(error = %e, "Failed to encode prometheus metrics");
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }

    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        buffer,
    )
        .into_response()
}

async fn index() -> Redirect {
    Redirect::temporary("/metrics")
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/metrics", get(report))
        .route("/metrics/prometheus", get(prometheus_metrics))
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .with_state(state)
}

/// Start the API server
pub async fn serve(port: u16, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = create_router(state);

    let addr = format!("0.0.0.0:{}", port);
    info!(addr = %addr, "Starting API server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
