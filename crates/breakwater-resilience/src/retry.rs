//! Retry policy: method safety, failure classification, backoff.
//!
//! Only safe methods (GET, HEAD, OPTIONS) are retried; everything else gets
//! exactly one attempt no matter the configured budget. Retry triggers are
//! transport errors and ≥500 responses; 4xx are never retried.

use http::{Method, StatusCode};
use rand::Rng;
use std::time::Duration;

/// True for methods that are safe to retry: GET, HEAD, OPTIONS.
#[must_use]
pub fn is_safe_method(method: &Method) -> bool {
    matches!(*method, Method::GET | Method::HEAD | Method::OPTIONS)
}

/// Total attempts for a request: `max_retries + 1` for safe methods, 1 otherwise.
#[must_use]
pub fn max_attempts(method: &Method, max_retries: u32) -> u32 {
    if is_safe_method(method) {
        max_retries + 1
    } else {
        1
    }
}

/// True iff the attempt outcome warrants another try: a transport error
/// occurred, or the upstream answered with a server error.
#[must_use]
pub fn should_retry(status: Option<StatusCode>, transport_error: bool) -> bool {
    if transport_error {
        return true;
    }
    status.is_some_and(|s| s.is_server_error())
}

/// Delay before attempt `attempt + 1` (attempts are 1-indexed):
/// `base · 2^(attempt-1) · (1 + U)` with `U ~ Uniform[0, 0.5)`.
#[must_use]
pub fn backoff_delay(attempt: u32, base: Duration) -> Duration {
    let exponent = attempt.saturating_sub(1).min(16);
    let doubled = base.saturating_mul(2u32.saturating_pow(exponent));
    let jitter: f64 = rand::thread_rng().gen_range(0.0..0.5);
    doubled.mul_f64(1.0 + jitter)
}
