//! The streaming proxy pipeline.
//!
//! One handler runs every inbound request through the full admission chain
//! and forwards it upstream without buffering either body:
//!
//! route match → auth → rate limit → breaker admission → bulkhead acquire
//! → retrying forward with a fresh per-attempt deadline → response stream
//! → breaker feedback → metrics → bulkhead release.
//!
//! Cancellation: the per-attempt deadline is explicit
//! (`tokio::time::timeout` via [`TimeoutExt`]); client disconnect and
//! server shutdown arrive as a dropped handler future, which aborts the
//! in-flight upstream call and releases the bulkhead permit through RAII.
//! [`AbandonGuard`] observes that drop to log the abandonment and hand back
//! a half-open probe grant nobody can report on anymore.

use crate::error::ApiError;
use crate::extractors::{ClientIp, CorrelationId};
use crate::forward::{self, API_KEY_HEADER};
use crate::state::AppState;
use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, HeaderValue},
    response::{IntoResponse, Response},
};
use breakwater_core::{auth, RouteMatch};
use breakwater_resilience::{rate_limiter, retry, CircuitBreaker, CircuitState, Decision, TimeoutExt};
use secrecy::ExposeSecret;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

/// Catch-all handler: the per-request pipeline.
pub async fn handle(
    State(state): State<AppState>,
    ClientIp(peer_ip): ClientIp,
    CorrelationId(correlation_id): CorrelationId,
    req: Request,
) -> Response {
    let path = req.uri().path().to_string();

    let Some(route) = state.routes.matches(&path) else {
        debug!(%path, %correlation_id, "no route matches");
        return ApiError::not_found("no route matches path").into_response();
    };
    let prefix = route.prefix.to_string();
    let cfg = route.config;

    let presented = req
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);

    let anonymous = auth::is_anonymous(&route.forward_path, &cfg.anonymous_prefixes);
    if !anonymous {
        let valid = presented
            .as_deref()
            .is_some_and(|key| auth::valid_api_key(key, state.api_key.expose_secret()));
        if !valid {
            warn!(route = %prefix, %correlation_id, "missing or invalid api key");
            return ApiError::unauthorized("missing or invalid api key").into_response();
        }
    }

    // Authenticated requests are throttled per credential; anonymous ones
    // per peer address.
    let client_id = if anonymous {
        peer_ip.unwrap_or_else(|| "unknown".to_string())
    } else {
        presented.unwrap_or_else(|| "unknown".to_string())
    };

    match state
        .limiter
        .check(&prefix, &client_id, cfg.requests_per_window, cfg.window)
    {
        Decision::Allowed => {}
        Decision::Denied { retry_after } => {
            warn!(route = %prefix, client = %client_id, %correlation_id, "rate limit exceeded");
            let mut response =
                ApiError::rate_limited("rate limit exceeded").into_response();
            response.headers_mut().insert(
                header::RETRY_AFTER,
                HeaderValue::from(rate_limiter::header_seconds(retry_after)),
            );
            return response;
        }
    }

    let Some(breaker) = state.breaker(&prefix) else {
        return ApiError::internal("no breaker for matched route").into_response();
    };
    if !breaker.allow_request() {
        // The protective outcome, not a failure: nothing is recorded.
        warn!(route = %prefix, %correlation_id, "circuit open, failing fast");
        return ApiError::service_unavailable("upstream temporarily unavailable")
            .into_response();
    }
    let holds_probe = matches!(breaker.state(), CircuitState::HalfOpen);

    let Some(bulkhead) = state.bulkhead(&prefix) else {
        return ApiError::internal("no bulkhead for matched route").into_response();
    };
    let Some(permit) = bulkhead.try_acquire() else {
        if holds_probe {
            breaker.cancel_probe();
        }
        warn!(route = %prefix, %correlation_id, "bulkhead full");
        return ApiError::bulkhead_full("too many concurrent requests").into_response();
    };
    // The permit is released through RAII on every exit path: it rides
    // inside the relayed body stream on success and drops right here on
    // rejection, panic, or a dropped handler future.

    let mut guard = AbandonGuard {
        route: prefix.clone(),
        correlation_id: correlation_id.clone(),
        breaker: Arc::clone(&breaker),
        holds_probe,
        armed: true,
    };
    let started = Instant::now();

    let outcome = run_attempts(&state, &route, &correlation_id, req).await;

    // Breaker feedback from the terminal status: the gateway's own 502/504
    // and any forwarded 5xx mean the upstream is sick; everything else that
    // completed counts as success.
    let status = match &outcome {
        Ok(upstream) => upstream.status().as_u16(),
        Err(rejection) => rejection.status.as_u16(),
    };
    if status >= 500 {
        breaker.record_failure();
    } else {
        breaker.record_success();
    }
    state.metrics.record(&prefix, status, started.elapsed());
    guard.armed = false;

    match outcome {
        Ok(upstream) => forward::relay_response(upstream, permit),
        Err(rejection) => rejection.into_response(),
    }
}

/// The retry loop: attempts 1..=N, each with a freshly built upstream
/// request and a fresh deadline. `Ok` is the terminal upstream response to
/// relay; `Err` is the gateway-originated 502/504.
async fn run_attempts(
    state: &AppState,
    route: &RouteMatch<'_>,
    correlation_id: &str,
    req: Request,
) -> Result<reqwest::Response, ApiError> {
    let cfg = route.config;
    let (parts, body) = req.into_parts();
    let method = parts.method;
    let attempts = retry::max_attempts(&method, cfg.max_retries);
    let uri = forward::upstream_uri(&cfg.upstream_base_url, &route.forward_path, parts.uri.query());
    let headers = forward::request_headers(&parts.headers, correlation_id);
    let has_body = declares_body(&parts.headers);

    // The client body is a stream and can be sent exactly once. Safe
    // methods carry no body in practice; a retried attempt that would need
    // one goes out body-less rather than replaying a drained stream.
    let mut body = Some(body);

    let mut attempt = 0u32;
    loop {
        attempt += 1;

        let mut builder = state
            .client
            .request(method.clone(), uri.as_str())
            .headers(headers.clone());
        if has_body {
            if let Some(b) = body.take() {
                builder = builder.body(reqwest::Body::wrap_stream(b.into_data_stream()));
            }
        }

        match builder.send().with_deadline(cfg.timeout).await {
            Ok(Ok(upstream)) => {
                let status = upstream.status();
                if retry::should_retry(Some(status), false) && attempt < attempts {
                    warn!(
                        route = %route.prefix,
                        correlation_id,
                        attempt,
                        status = status.as_u16(),
                        "upstream server error, retrying"
                    );
                    drop(upstream);
                    tokio::time::sleep(retry::backoff_delay(attempt, cfg.retry_delay)).await;
                    continue;
                }
                // Terminal: 2xx/3xx/4xx always, 5xx on the last attempt.
                return Ok(upstream);
            }
            Ok(Err(err)) if err.is_timeout() => {
                if attempt < attempts {
                    warn!(route = %route.prefix, correlation_id, attempt, "attempt timed out, retrying");
                    continue;
                }
                warn!(route = %route.prefix, correlation_id, "upstream timed out on last attempt");
                return Err(ApiError::gateway_timeout("upstream timed out"));
            }
            Ok(Err(err)) => {
                if attempt < attempts {
                    warn!(
                        route = %route.prefix,
                        correlation_id,
                        attempt,
                        error = %err,
                        "upstream transport error, retrying"
                    );
                    tokio::time::sleep(retry::backoff_delay(attempt, cfg.retry_delay)).await;
                    continue;
                }
                warn!(route = %route.prefix, correlation_id, error = %err, "upstream unreachable after all attempts");
                return Err(ApiError::bad_gateway("upstream unreachable"));
            }
            Err(_deadline) => {
                if attempt < attempts {
                    warn!(route = %route.prefix, correlation_id, attempt, "attempt deadline exceeded, retrying");
                    continue;
                }
                warn!(route = %route.prefix, correlation_id, "attempt deadline exceeded on last attempt");
                return Err(ApiError::gateway_timeout("upstream timed out"));
            }
        }
    }
}

fn declares_body(headers: &HeaderMap) -> bool {
    let has_length = headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok())
        .is_some_and(|n| n > 0);
    has_length || headers.contains_key(header::TRANSFER_ENCODING)
}

/// Observes a handler future that never completed.
///
/// When the client disconnects (or the server force-drops in-flight work at
/// shutdown) the handler future is dropped mid-pipeline: no response is
/// written and no breaker or metrics signal is recorded. This guard logs
/// the abandonment and, if this request held the half-open probe, hands the
/// grant back so the breaker cannot wedge waiting for a report.
struct AbandonGuard {
    route: String,
    correlation_id: String,
    breaker: Arc<CircuitBreaker>,
    holds_probe: bool,
    armed: bool,
}

impl Drop for AbandonGuard {
    fn drop(&mut self) {
        if self.armed {
            if self.holds_probe {
                self.breaker.cancel_probe();
            }
            tracing::info!(
                route = %self.route,
                correlation_id = %self.correlation_id,
                "client disconnected, request abandoned"
            );
        }
    }
}
