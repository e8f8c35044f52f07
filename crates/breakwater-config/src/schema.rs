//! Configuration schema.

use breakwater_core::RouteConfig;
use secrecy::SecretString;

/// Bind address settings.
#[derive(Debug, Clone)]
pub struct ServerSettings {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

/// Logging settings, interpreted by the telemetry crate.
#[derive(Debug, Clone)]
pub struct LoggingSettings {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Output format (json or pretty)
    pub format: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

/// Fully-resolved gateway configuration.
#[derive(Debug)]
pub struct GatewayConfig {
    /// Bind address
    pub server: ServerSettings,
    /// Logging setup
    pub logging: LoggingSettings,
    /// The shared client credential
    pub api_key: SecretString,
    /// One entry per route prefix
    pub routes: Vec<RouteConfig>,
}
