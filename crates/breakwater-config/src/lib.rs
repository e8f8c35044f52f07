//! # Breakwater Config
//!
//! Environment-driven configuration for the gateway. Routes are declared in
//! `GATEWAY_ROUTES` and configured per route via
//! `GATEWAY_ROUTE_<NAME>_*` variables; missing required values are a
//! startup error, never a silent default.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod loader;
pub mod schema;

pub use loader::{load, load_from, ConfigError};
pub use schema::{GatewayConfig, LoggingSettings, ServerSettings};
