//! # Breakwater Telemetry
//!
//! Observability for the gateway:
//! - Structured logging via `tracing` with JSON or pretty output
//! - Per-route request/error counters and a latency accumulator,
//!   exported both as a JSON-friendly snapshot and in Prometheus text format

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod logging;
pub mod metrics;

pub use logging::{init_logging, LogFormat, LoggingConfig};
pub use metrics::{GatewayMetrics, RouteCounters};
