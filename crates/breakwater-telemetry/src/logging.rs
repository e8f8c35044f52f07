//! Structured logging configuration.
//!
//! Every log line carries the fields its span provides (correlation id,
//! route, method); the sink format is JSON for machines or pretty for
//! humans.

use serde::{Deserialize, Serialize};
use tracing::Level;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// JSON format (structured)
    Json,
    /// Pretty format (human-readable)
    #[default]
    Pretty,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Output format
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

impl LoggingConfig {
    /// Build from the raw level/format strings carried by the config crate.
    #[must_use]
    pub fn from_strings(level: &str, format: &str) -> Self {
        let format = match format.to_ascii_lowercase().as_str() {
            "json" => LogFormat::Json,
            _ => LogFormat::Pretty,
        };
        Self {
            level: level.to_string(),
            format,
        }
    }

    /// Get the tracing `Level`
    #[must_use]
    pub fn tracing_level(&self) -> Level {
        match self.level.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "warn" | "warning" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::INFO,
        }
    }
}

/// Install the global tracing subscriber.
///
/// Safe to call more than once; later calls are no-ops, which keeps tests
/// that each try to initialize logging from panicking.
pub fn init_logging(config: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.tracing_level().to_string().to_lowercase()));

    let registry = tracing_subscriber::registry().with(filter);

    let result = match config.format {
        LogFormat::Json => registry.with(fmt::layer().json()).try_init(),
        LogFormat::Pretty => registry.with(fmt::layer()).try_init(),
    };

    // Already initialized (tests, embedding): keep the existing subscriber.
    drop(result);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_parsing() {
        assert_eq!(
            LoggingConfig::from_strings("debug", "pretty").tracing_level(),
            Level::DEBUG
        );
        assert_eq!(
            LoggingConfig::from_strings("WARN", "json").tracing_level(),
            Level::WARN
        );
        assert_eq!(
            LoggingConfig::from_strings("bogus", "pretty").tracing_level(),
            Level::INFO
        );
    }

    #[test]
    fn test_format_parsing() {
        assert_eq!(
            LoggingConfig::from_strings("info", "json").format,
            LogFormat::Json
        );
        assert_eq!(
            LoggingConfig::from_strings("info", "anything-else").format,
            LogFormat::Pretty
        );
    }

    #[test]
    fn test_init_is_idempotent() {
        let config = LoggingConfig::default();
        init_logging(&config);
        init_logging(&config);
    }
}
