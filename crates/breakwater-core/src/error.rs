//! Error types and handling for the gateway.
//!
//! Every error the pipeline can surface to a client maps to exactly one HTTP
//! status code; admission errors never reach an upstream.

use http::StatusCode;
use std::time::Duration;
use thiserror::Error;

/// Result type alias using [`GatewayError`]
pub type GatewayResult<T> = Result<T, GatewayError>;

/// Gateway error type covering admission, upstream, and startup failures
#[derive(Debug, Error)]
pub enum GatewayError {
    /// API key missing or invalid on a non-anonymous route
    #[error("authentication failed: {message}")]
    Authentication {
        /// Error message
        message: String,
    },

    /// No route prefix matches the request path
    #[error("no route matches path: {path}")]
    RouteNotFound {
        /// The path that failed to match
        path: String,
    },

    /// Fixed-window rate limit exceeded for a `(route, client)` pair
    #[error("rate limit exceeded")]
    RateLimit {
        /// Time until the current window closes
        retry_after: Duration,
    },

    /// Per-route concurrency cap reached
    #[error("bulkhead full for route: {prefix}")]
    BulkheadFull {
        /// Route prefix whose bulkhead is exhausted
        prefix: String,
    },

    /// Circuit breaker is open (or its half-open probe is already taken)
    #[error("circuit open for route: {prefix}")]
    CircuitOpen {
        /// Route prefix with an open breaker
        prefix: String,
    },

    /// Per-attempt deadline exceeded on the last attempt
    #[error("upstream timed out after {duration:?}")]
    Timeout {
        /// The per-attempt deadline that was exceeded
        duration: Duration,
    },

    /// Upstream transport failure after all retries
    #[error("upstream unreachable: {message}")]
    Upstream {
        /// Error message from the transport layer
        message: String,
    },

    /// Invalid or missing configuration; fatal at startup
    #[error("configuration error: {message}")]
    Configuration {
        /// Error message
        message: String,
    },
}

impl GatewayError {
    /// Get the HTTP status code for this error
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Authentication { .. } => StatusCode::UNAUTHORIZED,
            Self::RouteNotFound { .. } => StatusCode::NOT_FOUND,
            Self::RateLimit { .. } | Self::BulkheadFull { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::CircuitOpen { .. } => StatusCode::SERVICE_UNAVAILABLE,
            Self::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            Self::Upstream { .. } => StatusCode::BAD_GATEWAY,
            Self::Configuration { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Create an authentication error
    #[must_use]
    pub fn authentication(message: impl Into<String>) -> Self {
        Self::Authentication {
            message: message.into(),
        }
    }

    /// Create a route-not-found error
    #[must_use]
    pub fn route_not_found(path: impl Into<String>) -> Self {
        Self::RouteNotFound { path: path.into() }
    }

    /// Create a rate-limit error carrying the remaining window time
    #[must_use]
    pub fn rate_limit(retry_after: Duration) -> Self {
        Self::RateLimit { retry_after }
    }

    /// Create a bulkhead-full error
    #[must_use]
    pub fn bulkhead_full(prefix: impl Into<String>) -> Self {
        Self::BulkheadFull {
            prefix: prefix.into(),
        }
    }

    /// Create a circuit-open error
    #[must_use]
    pub fn circuit_open(prefix: impl Into<String>) -> Self {
        Self::CircuitOpen {
            prefix: prefix.into(),
        }
    }

    /// Create a timeout error
    #[must_use]
    pub fn timeout(duration: Duration) -> Self {
        Self::Timeout { duration }
    }

    /// Create an upstream transport error
    #[must_use]
    pub fn upstream(message: impl Into<String>) -> Self {
        Self::Upstream {
            message: message.into(),
        }
    }

    /// Create a configuration error
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }
}
