//! Gateway entry point: load configuration, initialize logging, build the
//! shared state, and serve until a shutdown signal arrives.

use breakwater_server::{AppState, Server, ServerConfig};
use breakwater_telemetry::{init_logging, LoggingConfig};
use std::process::ExitCode;
use std::time::Duration;
use tracing::error;

/// How often the rate-limiter map is swept for dead windows.
const LIMITER_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> ExitCode {
    let config = match breakwater_config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("configuration error: {e}");
            return ExitCode::FAILURE;
        }
    };

    init_logging(&LoggingConfig::from_strings(
        &config.logging.level,
        &config.logging.format,
    ));

    let state = match AppState::from_config(&config) {
        Ok(state) => state,
        Err(e) => {
            error!(error = %e, "failed to build gateway state");
            return ExitCode::FAILURE;
        }
    };

    // Background GC for the rate-limiter map: entries are unbounded in
    // client id, so dead windows are swept once they are a grace period
    // past their close.
    let limiter = state.limiter.clone();
    let ttl = state.limiter_ttl();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(LIMITER_SWEEP_INTERVAL);
        interval.tick().await;
        loop {
            interval.tick().await;
            limiter.sweep(ttl);
        }
    });

    let server = Server::new(ServerConfig::from(&config.server), state);
    match server.run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "server exited with error");
            ExitCode::FAILURE
        }
    }
}
