//! Router assembly.
//!
//! The status endpoints are registered before the catch-all proxy, so they
//! are served directly and never enter the admission pipeline. The
//! correlation-id layer is outermost: every response carries the header,
//! whichever path produced it.

use crate::{handlers, middleware, proxy, state::AppState};
use axum::{routing::get, Router};

/// Build the gateway router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/gateway/status", get(handlers::gateway_status))
        .route("/gateway/health", get(handlers::health_check))
        .route("/gateway/metrics", get(handlers::metrics_endpoint))
        .fallback(proxy::handle)
        .layer(axum::middleware::from_fn(middleware::logging_middleware))
        .layer(axum::middleware::from_fn(
            middleware::correlation_id_middleware,
        ))
        .with_state(state)
}
