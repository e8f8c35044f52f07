//! # Breakwater Server
//!
//! The HTTP face of the gateway: an axum server whose catch-all handler is
//! the streaming proxy pipeline, plus the status endpoints that sit in
//! front of it.

#![forbid(unsafe_code)]

pub mod error;
pub mod extractors;
pub mod forward;
pub mod handlers;
pub mod middleware;
pub mod proxy;
pub mod routes;
pub mod server;
pub mod state;

pub use routes::create_router;
pub use server::{Server, ServerConfig, ServerError};
pub use state::AppState;
