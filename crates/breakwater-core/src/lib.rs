//! # Breakwater Core
//!
//! Shared building blocks for the breakwater gateway:
//! - Error taxonomy with HTTP status mapping
//! - Immutable route table with longest-prefix matching
//! - Client authentication (fixed-time API-key check, anonymous allowlist)

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod auth;
pub mod error;
pub mod route;

pub use error::{GatewayError, GatewayResult};
pub use route::{RouteConfig, RouteMatch, RouteTable};
