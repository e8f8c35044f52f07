//! Status endpoints, registered ahead of the catch-all proxy so they
//! bypass authentication and the admission pipeline.

use crate::state::AppState;
use axum::{
    extract::State,
    http::header,
    response::IntoResponse,
    Json,
};
use serde::Serialize;
use std::collections::BTreeMap;

/// Liveness response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Service status
    pub status: String,
    /// Crate version
    pub version: String,
}

/// Liveness endpoint
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// One route's entry in the status snapshot
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteStatus {
    /// Breaker state: closed, open, or half-open
    pub circuit_state: String,
    /// Free bulkhead slots right now
    pub bulkhead_available: usize,
    /// Bulkhead capacity
    pub bulkhead_max: usize,
    /// Requests that reached the forwarding stage
    pub total_requests: u64,
    /// Of those, terminal status ≥ 500
    pub total_errors: u64,
    /// Mean forwarding latency in milliseconds
    pub avg_latency_ms: f64,
}

/// The full status snapshot
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusSnapshot {
    /// Seconds since startup
    pub uptime_seconds: u64,
    /// Per-route state, keyed by prefix
    pub routes: BTreeMap<String, RouteStatus>,
}

/// `GET /gateway/status`: JSON snapshot of per-route runtime state.
///
/// Scalars are individually consistent; the snapshot as a whole is not
/// linearizable across fields, which is fine for an operator's eyeball.
pub async fn gateway_status(State(state): State<AppState>) -> Json<StatusSnapshot> {
    let mut routes = BTreeMap::new();

    for route in state.routes.iter() {
        let counters = state.metrics.counters(&route.prefix).unwrap_or(
            breakwater_telemetry::RouteCounters {
                total_requests: 0,
                total_errors: 0,
                avg_latency_ms: 0.0,
            },
        );
        let circuit_state = state
            .breakers
            .get(&route.prefix)
            .map_or("closed", |b| b.state().label());
        let (available, max) = state
            .bulkheads
            .get(&route.prefix)
            .map_or((0, 0), |b| (b.available(), b.capacity()));

        routes.insert(
            route.prefix.clone(),
            RouteStatus {
                circuit_state: circuit_state.to_string(),
                bulkhead_available: available,
                bulkhead_max: max,
                total_requests: counters.total_requests,
                total_errors: counters.total_errors,
                avg_latency_ms: counters.avg_latency_ms,
            },
        );
    }

    Json(StatusSnapshot {
        uptime_seconds: state.metrics.uptime().as_secs(),
        routes,
    })
}

/// `GET /gateway/metrics`: Prometheus text exposition.
pub async fn metrics_endpoint(State(state): State<AppState>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.gather(),
    )
}
