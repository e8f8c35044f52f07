//! # Breakwater Resilience
//!
//! Resilience patterns guarding the gateway's per-request pipeline:
//! - Fixed-window rate limiting keyed by `(route, client)`
//! - Bulkhead pattern for per-route concurrency isolation
//! - Circuit breaker preventing retry storms against sick upstreams
//! - Retry policy with exponential backoff and jitter
//! - Timeout helpers for per-attempt deadlines
//!
//! All admission operations are non-blocking: bounded CPU work, no I/O.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod bulkhead;
pub mod circuit_breaker;
pub mod rate_limiter;
pub mod retry;
pub mod timeout;

pub use bulkhead::{Bulkhead, BulkheadPermit};
pub use circuit_breaker::{CircuitBreaker, CircuitState};
pub use rate_limiter::{Decision, FixedWindowLimiter};
pub use retry::{backoff_delay, is_safe_method, max_attempts, should_retry};
pub use timeout::TimeoutExt;
