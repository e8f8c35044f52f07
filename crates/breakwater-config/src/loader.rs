//! Configuration loading from the environment.
//!
//! The lookup is injectable so tests can feed a plain map instead of
//! mutating process-global environment variables.

use crate::schema::{GatewayConfig, LoggingSettings, ServerSettings};
use breakwater_core::RouteConfig;
use secrecy::SecretString;
use std::time::Duration;
use thiserror::Error;
use tracing::info;

/// Configuration loading errors. All are fatal at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required variable is absent
    #[error("missing required environment variable: {name}")]
    MissingVar {
        /// The variable that was not set
        name: String,
    },

    /// A variable is present but unparsable
    #[error("invalid value for {name}: {reason}")]
    InvalidValue {
        /// The offending variable
        name: String,
        /// Why it failed to parse
        reason: String,
    },

    /// The assembled route set is inconsistent
    #[error("invalid route configuration: {0}")]
    InvalidRoutes(String),
}

/// Environment lookup signature; `None` means unset.
pub type EnvLookup<'a> = &'a dyn Fn(&str) -> Option<String>;

/// Load configuration from the process environment.
///
/// # Errors
/// Returns [`ConfigError`] for any missing required variable or unparsable
/// value.
pub fn load() -> Result<GatewayConfig, ConfigError> {
    load_from(&|name| std::env::var(name).ok())
}

/// Load configuration through an injected lookup.
///
/// # Errors
/// Returns [`ConfigError`] for any missing required variable or unparsable
/// value.
pub fn load_from(lookup: EnvLookup<'_>) -> Result<GatewayConfig, ConfigError> {
    let api_key = require(lookup, "GATEWAY_API_KEY")?;
    if api_key.trim().is_empty() {
        return Err(ConfigError::InvalidValue {
            name: "GATEWAY_API_KEY".to_string(),
            reason: "must not be blank".to_string(),
        });
    }

    let server = ServerSettings {
        host: lookup("GATEWAY_HOST").unwrap_or_else(|| ServerSettings::default().host),
        port: parse_or(lookup, "GATEWAY_PORT", ServerSettings::default().port)?,
    };

    let logging = LoggingSettings {
        level: lookup("GATEWAY_LOG_LEVEL").unwrap_or_else(|| LoggingSettings::default().level),
        format: lookup("GATEWAY_LOG_FORMAT").unwrap_or_else(|| LoggingSettings::default().format),
    };

    let route_names = require(lookup, "GATEWAY_ROUTES")?;
    let mut routes = Vec::new();
    for name in route_names.split(',').map(str::trim).filter(|n| !n.is_empty()) {
        routes.push(load_route(lookup, name)?);
    }
    if routes.is_empty() {
        return Err(ConfigError::InvalidValue {
            name: "GATEWAY_ROUTES".to_string(),
            reason: "must declare at least one route".to_string(),
        });
    }

    // Same validation the route table applies, surfaced at load time.
    breakwater_core::RouteTable::new(routes.clone())
        .map_err(|e| ConfigError::InvalidRoutes(e.to_string()))?;

    info!(routes = routes.len(), "configuration loaded");

    Ok(GatewayConfig {
        server,
        logging,
        api_key: SecretString::new(api_key),
        routes,
    })
}

fn load_route(lookup: EnvLookup<'_>, name: &str) -> Result<RouteConfig, ConfigError> {
    let key = |suffix: &str| {
        format!(
            "GATEWAY_ROUTE_{}_{suffix}",
            name.to_ascii_uppercase().replace('-', "_")
        )
    };

    let prefix = require(lookup, &key("PREFIX"))?;
    let upstream = require(lookup, &key("UPSTREAM_BASE_URL"))?;
    if !upstream.starts_with("http://") && !upstream.starts_with("https://") {
        return Err(ConfigError::InvalidValue {
            name: key("UPSTREAM_BASE_URL"),
            reason: "must start with http:// or https://".to_string(),
        });
    }

    let defaults = RouteConfig::new(prefix.as_str(), upstream.as_str());
    let route = defaults
        .clone()
        .with_timeout(parse_ms_or(lookup, &key("TIMEOUT_MS"), defaults.timeout)?)
        .with_rate_limit(
            parse_or(lookup, &key("REQUESTS_PER_WINDOW"), defaults.requests_per_window)?,
            parse_ms_or(lookup, &key("WINDOW_MS"), defaults.window)?,
        )
        .with_max_concurrent_requests(parse_or(
            lookup,
            &key("MAX_CONCURRENT_REQUESTS"),
            defaults.max_concurrent_requests,
        )?)
        .with_retries(
            parse_or(lookup, &key("MAX_RETRIES"), defaults.max_retries)?,
            parse_ms_or(lookup, &key("RETRY_DELAY_MS"), defaults.retry_delay)?,
        )
        .with_breaker(
            parse_or(lookup, &key("CIRCUIT_BREAKER_THRESHOLD"), defaults.breaker_threshold)?,
            parse_ms_or(lookup, &key("CIRCUIT_BREAKER_COOLDOWN_MS"), defaults.breaker_cooldown)?,
        );

    Ok(route)
}

fn require(lookup: EnvLookup<'_>, name: &str) -> Result<String, ConfigError> {
    lookup(name).ok_or_else(|| ConfigError::MissingVar {
        name: name.to_string(),
    })
}

fn parse_or<T: std::str::FromStr>(
    lookup: EnvLookup<'_>,
    name: &str,
    default: T,
) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match lookup(name) {
        None => Ok(default),
        Some(raw) => raw.parse().map_err(|e| ConfigError::InvalidValue {
            name: name.to_string(),
            reason: format!("{e}"),
        }),
    }
}

fn parse_ms_or(
    lookup: EnvLookup<'_>,
    name: &str,
    default: Duration,
) -> Result<Duration, ConfigError> {
    let ms: u64 = parse_or(lookup, name, default.as_millis() as u64)?;
    Ok(Duration::from_millis(ms))
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    fn minimal() -> HashMap<String, String> {
        env(&[
            ("GATEWAY_API_KEY", "dev-secret-key"),
            ("GATEWAY_ROUTES", "api-a"),
            ("GATEWAY_ROUTE_API_A_PREFIX", "/api/a"),
            (
                "GATEWAY_ROUTE_API_A_UPSTREAM_BASE_URL",
                "http://localhost:9001",
            ),
        ])
    }

    fn load_map(map: &HashMap<String, String>) -> Result<GatewayConfig, ConfigError> {
        load_from(&|name| map.get(name).cloned())
    }

    #[test]
    fn test_minimal_config_with_defaults() {
        let config = load_map(&minimal()).expect("load");

        assert_eq!(config.api_key.expose_secret(), "dev-secret-key");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.routes.len(), 1);

        let route = &config.routes[0];
        assert_eq!(route.prefix, "/api/a");
        assert_eq!(route.upstream_base_url, "http://localhost:9001");
        assert_eq!(route.timeout, Duration::from_secs(10));
        assert_eq!(route.requests_per_window, 100);
        assert_eq!(route.max_retries, 2);
        assert_eq!(route.anonymous_prefixes, vec!["/health".to_string()]);
    }

    #[test]
    fn test_per_route_overrides() {
        let mut map = minimal();
        map.insert("GATEWAY_ROUTE_API_A_TIMEOUT_MS".into(), "2500".into());
        map.insert("GATEWAY_ROUTE_API_A_REQUESTS_PER_WINDOW".into(), "7".into());
        map.insert("GATEWAY_ROUTE_API_A_WINDOW_MS".into(), "1000".into());
        map.insert("GATEWAY_ROUTE_API_A_MAX_RETRIES".into(), "0".into());
        map.insert("GATEWAY_ROUTE_API_A_CIRCUIT_BREAKER_THRESHOLD".into(), "2".into());

        let config = load_map(&map).expect("load");
        let route = &config.routes[0];
        assert_eq!(route.timeout, Duration::from_millis(2500));
        assert_eq!(route.requests_per_window, 7);
        assert_eq!(route.window, Duration::from_secs(1));
        assert_eq!(route.max_retries, 0);
        assert_eq!(route.breaker_threshold, 2);
    }

    #[test]
    fn test_multiple_routes() {
        let mut map = minimal();
        map.insert("GATEWAY_ROUTES".into(), "api-a, api-b".into());
        map.insert("GATEWAY_ROUTE_API_B_PREFIX".into(), "/api/b".into());
        map.insert(
            "GATEWAY_ROUTE_API_B_UPSTREAM_BASE_URL".into(),
            "http://localhost:9002".into(),
        );

        let config = load_map(&map).expect("load");
        assert_eq!(config.routes.len(), 2);
        assert_eq!(config.routes[1].prefix, "/api/b");
    }

    #[test]
    fn test_missing_api_key_is_fatal() {
        let mut map = minimal();
        map.remove("GATEWAY_API_KEY");
        assert!(matches!(
            load_map(&map),
            Err(ConfigError::MissingVar { name }) if name == "GATEWAY_API_KEY"
        ));
    }

    #[test]
    fn test_missing_route_upstream_is_fatal() {
        let mut map = minimal();
        map.remove("GATEWAY_ROUTE_API_A_UPSTREAM_BASE_URL");
        assert!(matches!(load_map(&map), Err(ConfigError::MissingVar { .. })));
    }

    #[test]
    fn test_unparsable_number_is_fatal() {
        let mut map = minimal();
        map.insert("GATEWAY_ROUTE_API_A_TIMEOUT_MS".into(), "soon".into());
        assert!(matches!(
            load_map(&map),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_upstream_must_be_http() {
        let mut map = minimal();
        map.insert(
            "GATEWAY_ROUTE_API_A_UPSTREAM_BASE_URL".into(),
            "localhost:9001".into(),
        );
        assert!(matches!(
            load_map(&map),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_blank_api_key_rejected() {
        let mut map = minimal();
        map.insert("GATEWAY_API_KEY".into(), "  ".into());
        assert!(matches!(
            load_map(&map),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_duplicate_prefixes_rejected() {
        let mut map = minimal();
        map.insert("GATEWAY_ROUTES".into(), "api-a,api-b".into());
        map.insert("GATEWAY_ROUTE_API_B_PREFIX".into(), "/API/A".into());
        map.insert(
            "GATEWAY_ROUTE_API_B_UPSTREAM_BASE_URL".into(),
            "http://localhost:9002".into(),
        );
        assert!(matches!(
            load_map(&map),
            Err(ConfigError::InvalidRoutes(_))
        ));
    }

    #[test]
    fn test_empty_route_list_rejected() {
        let mut map = minimal();
        map.insert("GATEWAY_ROUTES".into(), " , ".into());
        assert!(matches!(
            load_map(&map),
            Err(ConfigError::InvalidValue { .. })
        ));
    }
}
