//! API error responses.
//!
//! Gateway-originated rejections carry a terse JSON body; the interesting
//! detail goes to the logs, keyed by correlation id, not to the client.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use breakwater_core::GatewayError;
use breakwater_resilience::rate_limiter;
use serde::{Deserialize, Serialize};

/// JSON error body
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiErrorBody {
    /// Error details
    pub error: ApiErrorDetail,
}

/// Error detail
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiErrorDetail {
    /// Error type
    #[serde(rename = "type")]
    pub error_type: String,
    /// Error message
    pub message: String,
}

/// A gateway-originated error response
#[derive(Debug)]
pub struct ApiError {
    /// HTTP status code
    pub status: StatusCode,
    /// Error type
    pub error_type: String,
    /// Error message
    pub message: String,
}

impl ApiError {
    /// Create a new API error
    pub fn new(
        status: StatusCode,
        error_type: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            status,
            error_type: error_type.into(),
            message: message.into(),
        }
    }

    /// 401: missing or invalid API key
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "authentication_error", message)
    }

    /// 404: no route prefix matched
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, "not_found_error", message)
    }

    /// 429: fixed-window quota exhausted
    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::new(StatusCode::TOO_MANY_REQUESTS, "rate_limit_error", message)
    }

    /// 429: bulkhead full (no Retry-After; a slot may free at any moment)
    pub fn bulkhead_full(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::TOO_MANY_REQUESTS,
            "concurrency_limit_error",
            message,
        )
    }

    /// 503: circuit open or half-open probe already taken
    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::new(StatusCode::SERVICE_UNAVAILABLE, "circuit_open_error", message)
    }

    /// 502: upstream transport failure after all retries
    pub fn bad_gateway(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_GATEWAY, "upstream_error", message)
    }

    /// 504: per-attempt deadline exceeded on the last attempt
    pub fn gateway_timeout(message: impl Into<String>) -> Self {
        Self::new(StatusCode::GATEWAY_TIMEOUT, "timeout_error", message)
    }

    /// 500: broken gateway invariant
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "internal_error", message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ApiErrorBody {
            error: ApiErrorDetail {
                error_type: self.error_type,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<GatewayError> for ApiError {
    fn from(err: GatewayError) -> Self {
        match &err {
            GatewayError::Authentication { .. } => Self::unauthorized(err.to_string()),
            GatewayError::RouteNotFound { .. } => Self::not_found(err.to_string()),
            GatewayError::RateLimit { retry_after } => Self::rate_limited(format!(
                "rate limit exceeded, retry after {}s",
                rate_limiter::header_seconds(*retry_after)
            )),
            GatewayError::BulkheadFull { .. } => Self::bulkhead_full(err.to_string()),
            GatewayError::CircuitOpen { .. } => Self::service_unavailable(err.to_string()),
            GatewayError::Timeout { .. } => Self::gateway_timeout(err.to_string()),
            GatewayError::Upstream { .. } => Self::bad_gateway(err.to_string()),
            GatewayError::Configuration { .. } => Self::internal(err.to_string()),
        }
    }
}
