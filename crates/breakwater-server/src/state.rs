//! Application state shared across handlers.
//!
//! Everything the pipeline touches is built once at startup and passed in
//! as one explicit handle: no ambient globals. The route table is
//! immutable; limiter, bulkheads, breakers, and metrics are the shared
//! mutable singletons, each safe for concurrent use on its own terms.

use breakwater_config::GatewayConfig;
use breakwater_core::{GatewayError, RouteTable};
use breakwater_resilience::{Bulkhead, CircuitBreaker, FixedWindowLimiter};
use breakwater_telemetry::GatewayMetrics;
use secrecy::SecretString;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Shared state handle, cheap to clone into every handler invocation.
#[derive(Clone)]
pub struct AppState {
    /// Immutable prefix → route configuration map
    pub routes: Arc<RouteTable>,
    /// The shared client credential
    pub api_key: Arc<SecretString>,
    /// Fixed-window rate limiter, keyed by `(prefix, client)`
    pub limiter: Arc<FixedWindowLimiter>,
    /// Per-route concurrency caps
    pub bulkheads: Arc<HashMap<String, Bulkhead>>,
    /// Per-route circuit breakers
    pub breakers: Arc<HashMap<String, Arc<CircuitBreaker>>>,
    /// Per-route counters and latency accumulators
    pub metrics: Arc<GatewayMetrics>,
    /// Pooled upstream HTTP client
    pub client: reqwest::Client,
}

impl AppState {
    /// Build the full state from a loaded configuration.
    ///
    /// # Errors
    /// Returns [`GatewayError::Configuration`] if the route table is
    /// inconsistent or the HTTP client cannot be constructed.
    pub fn from_config(config: &GatewayConfig) -> Result<Self, GatewayError> {
        let routes = RouteTable::new(config.routes.clone())?;

        let mut bulkheads = HashMap::new();
        let mut breakers = HashMap::new();
        for route in routes.iter() {
            bulkheads.insert(
                route.prefix.clone(),
                Bulkhead::new(route.max_concurrent_requests),
            );
            breakers.insert(
                route.prefix.clone(),
                Arc::new(CircuitBreaker::new(
                    route.prefix.as_str(),
                    route.breaker_threshold,
                    route.breaker_cooldown,
                )),
            );
        }

        let metrics = GatewayMetrics::new(&routes.prefixes())
            .map_err(|e| GatewayError::configuration(format!("metrics registry: {e}")))?;

        // Upstreams are internal services; never route them through an
        // egress proxy, and pass redirects back to the client untouched.
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .pool_idle_timeout(Duration::from_secs(90))
            .redirect(reqwest::redirect::Policy::none())
            .no_proxy()
            .build()
            .map_err(|e| GatewayError::configuration(format!("http client: {e}")))?;

        Ok(Self {
            routes: Arc::new(routes),
            api_key: Arc::new(config.api_key.clone()),
            limiter: Arc::new(FixedWindowLimiter::new()),
            bulkheads: Arc::new(bulkheads),
            breakers: Arc::new(breakers),
            metrics: Arc::new(metrics),
            client,
        })
    }

    /// Bulkhead for a configured prefix.
    #[must_use]
    pub fn bulkhead(&self, prefix: &str) -> Option<&Bulkhead> {
        self.bulkheads.get(prefix)
    }

    /// Breaker for a configured prefix.
    #[must_use]
    pub fn breaker(&self, prefix: &str) -> Option<Arc<CircuitBreaker>> {
        self.breakers.get(prefix).cloned()
    }

    /// Sweep interval state for the rate-limiter map: entries live for the
    /// longest configured window plus a fixed grace period.
    #[must_use]
    pub fn limiter_ttl(&self) -> Duration {
        let longest = self
            .routes
            .iter()
            .map(|r| r.window)
            .max()
            .unwrap_or(Duration::from_secs(60));
        longest + Duration::from_secs(60)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use breakwater_config::{LoggingSettings, ServerSettings};
    use breakwater_core::RouteConfig;

    fn config() -> GatewayConfig {
        GatewayConfig {
            server: ServerSettings::default(),
            logging: LoggingSettings::default(),
            api_key: SecretString::new("dev-secret-key".to_string()),
            routes: vec![
                RouteConfig::new("/api/a", "http://localhost:9001")
                    .with_max_concurrent_requests(3),
                RouteConfig::new("/api/b", "http://localhost:9002"),
            ],
        }
    }

    #[test]
    fn test_registries_built_per_route() {
        let state = AppState::from_config(&config()).expect("state");

        assert_eq!(state.routes.len(), 2);
        assert_eq!(state.bulkhead("/api/a").expect("bulkhead").capacity(), 3);
        assert!(state.breaker("/api/b").is_some());
        assert!(state.bulkhead("/other").is_none());
        assert!(state.metrics.counters("/api/a").is_some());
    }

    #[test]
    fn test_duplicate_routes_rejected() {
        let mut cfg = config();
        cfg.routes.push(RouteConfig::new("/api/a", "http://localhost:9003"));
        assert!(AppState::from_config(&cfg).is_err());
    }

    #[test]
    fn test_limiter_ttl_covers_longest_window() {
        let mut cfg = config();
        cfg.routes[1] = RouteConfig::new("/api/b", "http://localhost:9002")
            .with_rate_limit(10, Duration::from_secs(300));

        let state = AppState::from_config(&cfg).expect("state");
        assert_eq!(state.limiter_ttl(), Duration::from_secs(360));
    }
}
