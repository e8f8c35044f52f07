//! Route table and longest-prefix matching.
//!
//! The table is built once at startup and never mutated. Matching is
//! case-insensitive on the prefix, longest match wins, and ties are
//! impossible because duplicate prefixes are rejected at construction.
//! No regex, so a lookup is O(routes · prefix length).

use crate::error::GatewayError;
use std::time::Duration;

/// Default per-attempt upstream timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
/// Default requests admitted per rate-limit window
pub const DEFAULT_REQUESTS_PER_WINDOW: u32 = 100;
/// Default rate-limit window length
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(60);
/// Default bulkhead capacity
pub const DEFAULT_MAX_CONCURRENT_REQUESTS: usize = 200;
/// Default retry count for safe methods
pub const DEFAULT_MAX_RETRIES: u32 = 2;
/// Default base delay between retry attempts
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(200);
/// Default consecutive failures before the breaker opens
pub const DEFAULT_BREAKER_THRESHOLD: u32 = 5;
/// Default breaker cooldown before a half-open probe
pub const DEFAULT_BREAKER_COOLDOWN: Duration = Duration::from_secs(30);

/// Forward paths that never require an API key
pub const DEFAULT_ANONYMOUS_PREFIXES: &[&str] = &["/health"];

/// Immutable configuration for a single route prefix
#[derive(Debug, Clone)]
pub struct RouteConfig {
    /// Path prefix this route owns (matched case-insensitively)
    pub prefix: String,
    /// Upstream base URL, no trailing slash
    pub upstream_base_url: String,
    /// Per-attempt upstream deadline
    pub timeout: Duration,
    /// Forward-path prefixes that skip authentication
    pub anonymous_prefixes: Vec<String>,
    /// Requests admitted per `(route, client)` window
    pub requests_per_window: u32,
    /// Fixed rate-limit window length
    pub window: Duration,
    /// Bulkhead capacity
    pub max_concurrent_requests: usize,
    /// Extra attempts for safe methods
    pub max_retries: u32,
    /// Base delay for exponential backoff
    pub retry_delay: Duration,
    /// Consecutive failures before the breaker opens
    pub breaker_threshold: u32,
    /// Cooldown before the breaker admits a half-open probe
    pub breaker_cooldown: Duration,
}

impl RouteConfig {
    /// Create a route with defaults for everything but prefix and upstream
    #[must_use]
    pub fn new(prefix: impl Into<String>, upstream_base_url: impl Into<String>) -> Self {
        let upstream = upstream_base_url.into();
        Self {
            prefix: prefix.into(),
            upstream_base_url: upstream.trim_end_matches('/').to_string(),
            timeout: DEFAULT_TIMEOUT,
            anonymous_prefixes: DEFAULT_ANONYMOUS_PREFIXES
                .iter()
                .map(|p| (*p).to_string())
                .collect(),
            requests_per_window: DEFAULT_REQUESTS_PER_WINDOW,
            window: DEFAULT_WINDOW,
            max_concurrent_requests: DEFAULT_MAX_CONCURRENT_REQUESTS,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_delay: DEFAULT_RETRY_DELAY,
            breaker_threshold: DEFAULT_BREAKER_THRESHOLD,
            breaker_cooldown: DEFAULT_BREAKER_COOLDOWN,
        }
    }

    /// Set the per-attempt timeout
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the anonymous forward-path prefixes
    #[must_use]
    pub fn with_anonymous_prefixes(mut self, prefixes: Vec<String>) -> Self {
        self.anonymous_prefixes = prefixes;
        self
    }

    /// Set the rate-limit quota
    #[must_use]
    pub fn with_rate_limit(mut self, requests_per_window: u32, window: Duration) -> Self {
        self.requests_per_window = requests_per_window;
        self.window = window;
        self
    }

    /// Set the bulkhead capacity
    #[must_use]
    pub fn with_max_concurrent_requests(mut self, max: usize) -> Self {
        self.max_concurrent_requests = max;
        self
    }

    /// Set the retry budget
    #[must_use]
    pub fn with_retries(mut self, max_retries: u32, retry_delay: Duration) -> Self {
        self.max_retries = max_retries;
        self.retry_delay = retry_delay;
        self
    }

    /// Set the circuit-breaker parameters
    #[must_use]
    pub fn with_breaker(mut self, threshold: u32, cooldown: Duration) -> Self {
        self.breaker_threshold = threshold;
        self.breaker_cooldown = cooldown;
        self
    }
}

/// Result of a successful route lookup
#[derive(Debug)]
pub struct RouteMatch<'a> {
    /// The matched prefix, as configured
    pub prefix: &'a str,
    /// Remainder of the request path after the prefix, always starting with `/`
    pub forward_path: String,
    /// Configuration for the matched route
    pub config: &'a RouteConfig,
}

/// Immutable map from path prefix to route configuration
#[derive(Debug)]
pub struct RouteTable {
    routes: Vec<RouteConfig>,
}

impl RouteTable {
    /// Build a table from route configurations.
    ///
    /// # Errors
    /// Returns [`GatewayError::Configuration`] if two routes share a prefix
    /// (case-insensitive) or a prefix does not start with `/`.
    pub fn new(routes: Vec<RouteConfig>) -> Result<Self, GatewayError> {
        for (i, route) in routes.iter().enumerate() {
            if !route.prefix.starts_with('/') {
                return Err(GatewayError::configuration(format!(
                    "route prefix must start with '/': {}",
                    route.prefix
                )));
            }
            for other in &routes[i + 1..] {
                if route.prefix.eq_ignore_ascii_case(&other.prefix) {
                    return Err(GatewayError::configuration(format!(
                        "duplicate route prefix: {}",
                        route.prefix
                    )));
                }
            }
        }
        Ok(Self { routes })
    }

    /// Find the longest prefix that matches `path`, case-insensitively.
    ///
    /// The forward path is the remainder after the prefix: empty becomes
    /// `/`, and a missing leading `/` is added.
    #[must_use]
    pub fn matches(&self, path: &str) -> Option<RouteMatch<'_>> {
        let best = self
            .routes
            .iter()
            .filter(|r| starts_with_ignore_case(path, &r.prefix))
            .max_by_key(|r| r.prefix.len())?;

        let remainder = &path[best.prefix.len()..];
        let forward_path = if remainder.is_empty() {
            "/".to_string()
        } else if remainder.starts_with('/') {
            remainder.to_string()
        } else {
            format!("/{remainder}")
        };

        Some(RouteMatch {
            prefix: &best.prefix,
            forward_path,
            config: best,
        })
    }

    /// Iterate over the configured routes
    pub fn iter(&self) -> impl Iterator<Item = &RouteConfig> {
        self.routes.iter()
    }

    /// Configured prefixes, in declaration order
    #[must_use]
    pub fn prefixes(&self) -> Vec<String> {
        self.routes.iter().map(|r| r.prefix.clone()).collect()
    }

    /// Number of configured routes
    #[must_use]
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Whether the table has no routes
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

// Byte-wise so a multibyte path can never split a char boundary; ASCII
// case folding leaves non-ASCII bytes alone.
fn starts_with_ignore_case(path: &str, prefix: &str) -> bool {
    path.len() >= prefix.len()
        && path.as_bytes()[..prefix.len()].eq_ignore_ascii_case(prefix.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(prefixes: &[&str]) -> RouteTable {
        RouteTable::new(
            prefixes
                .iter()
                .map(|p| RouteConfig::new(*p, "http://upstream:8080"))
                .collect(),
        )
        .expect("valid table")
    }

    #[test]
    fn test_longest_prefix_wins() {
        let t = table(&["/api", "/api/a", "/api/a/deep"]);

        let m = t.matches("/api/a/deep/ping").expect("match");
        assert_eq!(m.prefix, "/api/a/deep");
        assert_eq!(m.forward_path, "/ping");

        let m = t.matches("/api/a/ping").expect("match");
        assert_eq!(m.prefix, "/api/a");

        let m = t.matches("/api/other").expect("match");
        assert_eq!(m.prefix, "/api");
    }

    #[test]
    fn test_match_independent_of_insertion_order() {
        let forward = table(&["/api", "/api/a"]);
        let backward = table(&["/api/a", "/api"]);

        let f = forward.matches("/api/a/x").expect("match");
        let b = backward.matches("/api/a/x").expect("match");
        assert_eq!(f.prefix, b.prefix);
        assert_eq!(f.forward_path, b.forward_path);
    }

    #[test]
    fn test_case_insensitive_prefix() {
        let t = table(&["/api/a"]);

        let m = t.matches("/API/A/Ping").expect("match");
        assert_eq!(m.prefix, "/api/a");
        // Remainder keeps the caller's casing.
        assert_eq!(m.forward_path, "/Ping");
    }

    #[test]
    fn test_empty_remainder_becomes_root() {
        let t = table(&["/api/a"]);
        let m = t.matches("/api/a").expect("match");
        assert_eq!(m.forward_path, "/");
    }

    #[test]
    fn test_remainder_without_leading_slash() {
        let t = table(&["/api/a/"]);
        let m = t.matches("/api/a/ping").expect("match");
        assert_eq!(m.forward_path, "/ping");
    }

    #[test]
    fn test_no_match() {
        let t = table(&["/api/a"]);
        assert!(t.matches("/other").is_none());
    }

    #[test]
    fn test_duplicate_prefix_rejected() {
        let result = RouteTable::new(vec![
            RouteConfig::new("/api/a", "http://x:1"),
            RouteConfig::new("/API/A", "http://y:2"),
        ]);
        assert!(matches!(
            result,
            Err(GatewayError::Configuration { .. })
        ));
    }

    #[test]
    fn test_prefix_must_be_rooted() {
        let result = RouteTable::new(vec![RouteConfig::new("api/a", "http://x:1")]);
        assert!(result.is_err());
    }

    #[test]
    fn test_upstream_trailing_slash_trimmed() {
        let r = RouteConfig::new("/api/a", "http://upstream:8080/");
        assert_eq!(r.upstream_base_url, "http://upstream:8080");
    }
}
