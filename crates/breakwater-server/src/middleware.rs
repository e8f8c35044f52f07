//! HTTP middleware for the gateway.
//!
//! Two layers wrap every route, including the status endpoints:
//! - Correlation-id ownership: resolve the inbound `X-Correlation-Id` (or
//!   mint one), stash it in request extensions, and stamp it on the
//!   response no matter which path produced it.
//! - Request logging: a span carrying method, path, and correlation id,
//!   with a completion line at info.

use axum::{
    extract::Request,
    http::HeaderValue,
    middleware::Next,
    response::Response,
};
use std::time::Instant;
use tracing::{info, info_span, Instrument};
use uuid::Uuid;

/// Header the gateway owns end to end.
pub const CORRELATION_ID_HEADER: &str = "x-correlation-id";

/// Correlation id resolved for this request, shared via extensions.
#[derive(Clone, Debug)]
pub struct CorrelationIdExt(pub String);

/// Resolve or generate the correlation id and echo it on the response.
///
/// A blank inbound header counts as absent.
pub async fn correlation_id_middleware(mut request: Request, next: Next) -> Response {
    let correlation_id = request
        .headers()
        .get(CORRELATION_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map_or_else(|| Uuid::new_v4().to_string(), String::from);

    request
        .extensions_mut()
        .insert(CorrelationIdExt(correlation_id.clone()));

    let mut response = next.run(request).await;

    if let Ok(value) = HeaderValue::from_str(&correlation_id) {
        response
            .headers_mut()
            .insert(CORRELATION_ID_HEADER, value);
    }

    response
}

/// Log every request under a span keyed by correlation id.
pub async fn logging_middleware(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let correlation_id = request
        .extensions()
        .get::<CorrelationIdExt>()
        .map_or_else(|| "unknown".to_string(), |c| c.0.clone());

    let span = info_span!(
        "request",
        method = %method,
        path = %path,
        correlation_id = %correlation_id,
    );

    let start = Instant::now();
    let response = next.run(request).instrument(span).await;
    let duration = start.elapsed();

    info!(
        method = %method,
        path = %path,
        status = response.status().as_u16(),
        duration_ms = duration.as_millis() as u64,
        correlation_id = %correlation_id,
        "request completed"
    );

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, routing::get, Router};
    use tower::ServiceExt;

    async fn test_handler() -> &'static str {
        "OK"
    }

    fn app() -> Router {
        Router::new()
            .route("/", get(test_handler))
            .layer(axum::middleware::from_fn(correlation_id_middleware))
    }

    #[tokio::test]
    async fn test_correlation_id_generated_when_absent() {
        let response = app()
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        let header = response
            .headers()
            .get(CORRELATION_ID_HEADER)
            .expect("correlation id header");
        assert!(!header.to_str().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_correlation_id_echoed_when_provided() {
        let response = app()
            .oneshot(
                Request::builder()
                    .uri("/")
                    .header(CORRELATION_ID_HEADER, "corr-123")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(
            response.headers().get(CORRELATION_ID_HEADER).unwrap(),
            "corr-123"
        );
    }

    #[tokio::test]
    async fn test_blank_correlation_id_replaced() {
        let response = app()
            .oneshot(
                Request::builder()
                    .uri("/")
                    .header(CORRELATION_ID_HEADER, "   ")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        let header = response
            .headers()
            .get(CORRELATION_ID_HEADER)
            .unwrap()
            .to_str()
            .unwrap();
        assert!(!header.trim().is_empty());
        assert_ne!(header, "   ");
    }
}
