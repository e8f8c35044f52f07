//! Per-route request metrics.
//!
//! Counters are `AtomicU64` so readers never observe torn values; the
//! latency accumulator is a `{sum, samples}` pair behind a short mutex
//! critical section. The same observations also feed a Prometheus registry
//! for the text-format endpoint. Readers of the snapshot see monotonic
//! per-field values; cross-field consistency is not promised.

use parking_lot::Mutex;
use prometheus::{CounterVec, Encoder, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tracing::debug;

/// Monotonic counters for one route, as read by the status endpoint.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RouteCounters {
    /// Requests that reached the forwarding stage
    pub total_requests: u64,
    /// Of those, requests whose terminal status was ≥ 500
    pub total_errors: u64,
    /// Mean latency over all samples, in milliseconds
    pub avg_latency_ms: f64,
}

#[derive(Default)]
struct LatencyAccumulator {
    sum_ms: f64,
    samples: u64,
}

struct RouteMetrics {
    total_requests: AtomicU64,
    total_errors: AtomicU64,
    latency: Mutex<LatencyAccumulator>,
}

impl RouteMetrics {
    fn new() -> Self {
        Self {
            total_requests: AtomicU64::new(0),
            total_errors: AtomicU64::new(0),
            latency: Mutex::new(LatencyAccumulator::default()),
        }
    }
}

/// Metrics registry for the gateway: per-route snapshot state plus the
/// Prometheus collectors behind the text endpoint.
pub struct GatewayMetrics {
    started_at: Instant,
    routes: HashMap<String, RouteMetrics>,
    registry: Registry,
    requests_total: CounterVec,
    errors_total: CounterVec,
    latency_seconds: HistogramVec,
}

impl GatewayMetrics {
    /// Create metrics for a fixed route set.
    ///
    /// # Errors
    /// Returns an error if the Prometheus collectors cannot be registered.
    pub fn new(prefixes: &[String]) -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let requests_total = CounterVec::new(
            Opts::new("gateway_requests_total", "Forwarded requests by terminal status class")
                .namespace("breakwater"),
            &["route", "status"],
        )?;
        registry.register(Box::new(requests_total.clone()))?;

        let errors_total = CounterVec::new(
            Opts::new("gateway_errors_total", "Requests with a terminal status of 500 or above")
                .namespace("breakwater"),
            &["route"],
        )?;
        registry.register(Box::new(errors_total.clone()))?;

        let latency_seconds = HistogramVec::new(
            HistogramOpts::new("gateway_request_duration_seconds", "Forwarding latency in seconds")
                .namespace("breakwater")
                .buckets(vec![0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]),
            &["route"],
        )?;
        registry.register(Box::new(latency_seconds.clone()))?;

        let routes = prefixes
            .iter()
            .map(|p| (p.clone(), RouteMetrics::new()))
            .collect();

        Ok(Self {
            started_at: Instant::now(),
            routes,
            registry,
            requests_total,
            errors_total,
            latency_seconds,
        })
    }

    /// Record one terminal request outcome for `prefix`.
    pub fn record(&self, prefix: &str, status: u16, latency: Duration) {
        let Some(route) = self.routes.get(prefix) else {
            debug!(prefix, "metrics record for unknown route ignored");
            return;
        };

        route.total_requests.fetch_add(1, Ordering::Relaxed);
        if status >= 500 {
            route.total_errors.fetch_add(1, Ordering::Relaxed);
            self.errors_total.with_label_values(&[prefix]).inc();
        }
        {
            let mut acc = route.latency.lock();
            acc.sum_ms += latency.as_secs_f64() * 1000.0;
            acc.samples += 1;
        }

        self.requests_total
            .with_label_values(&[prefix, status_class(status)])
            .inc();
        self.latency_seconds
            .with_label_values(&[prefix])
            .observe(latency.as_secs_f64());
    }

    /// Read one route's counters.
    #[must_use]
    pub fn counters(&self, prefix: &str) -> Option<RouteCounters> {
        let route = self.routes.get(prefix)?;
        let (sum_ms, samples) = {
            let acc = route.latency.lock();
            (acc.sum_ms, acc.samples)
        };
        Some(RouteCounters {
            total_requests: route.total_requests.load(Ordering::Relaxed),
            total_errors: route.total_errors.load(Ordering::Relaxed),
            avg_latency_ms: if samples == 0 { 0.0 } else { sum_ms / samples as f64 },
        })
    }

    /// Time since the metrics (and the process) started.
    #[must_use]
    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Render the Prometheus text exposition.
    #[must_use]
    pub fn gather(&self) -> String {
        let mut buffer = Vec::new();
        let encoder = TextEncoder::new();
        if encoder.encode(&self.registry.gather(), &mut buffer).is_err() {
            return String::new();
        }
        String::from_utf8(buffer).unwrap_or_default()
    }
}

fn status_class(status: u16) -> &'static str {
    match status {
        100..=199 => "1xx",
        200..=299 => "2xx",
        300..=399 => "3xx",
        400..=499 => "4xx",
        _ => "5xx",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics() -> GatewayMetrics {
        GatewayMetrics::new(&["/api/a".to_string(), "/api/b".to_string()]).expect("metrics")
    }

    #[test]
    fn test_counters_accumulate() {
        let m = metrics();

        m.record("/api/a", 200, Duration::from_millis(10));
        m.record("/api/a", 404, Duration::from_millis(20));
        m.record("/api/a", 502, Duration::from_millis(30));

        let c = m.counters("/api/a").expect("counters");
        assert_eq!(c.total_requests, 3);
        assert_eq!(c.total_errors, 1);
        assert!((c.avg_latency_ms - 20.0).abs() < 1.0);
    }

    #[test]
    fn test_routes_are_independent() {
        let m = metrics();

        m.record("/api/a", 200, Duration::from_millis(5));

        let a = m.counters("/api/a").expect("a");
        let b = m.counters("/api/b").expect("b");
        assert_eq!(a.total_requests, 1);
        assert_eq!(b.total_requests, 0);
        assert_eq!(b.avg_latency_ms, 0.0);
    }

    #[test]
    fn test_unknown_route_is_ignored() {
        let m = metrics();
        m.record("/unknown", 200, Duration::from_millis(5));
        assert!(m.counters("/unknown").is_none());
    }

    #[test]
    fn test_gather_contains_collectors() {
        let m = metrics();
        m.record("/api/a", 200, Duration::from_millis(5));
        m.record("/api/a", 500, Duration::from_millis(5));

        let text = m.gather();
        assert!(text.contains("breakwater_gateway_requests_total"));
        assert!(text.contains("breakwater_gateway_errors_total"));
        assert!(text.contains("breakwater_gateway_request_duration_seconds"));
    }

    #[test]
    fn test_only_5xx_count_as_errors() {
        let m = metrics();

        m.record("/api/a", 200, Duration::ZERO);
        m.record("/api/a", 401, Duration::ZERO);
        m.record("/api/a", 429, Duration::ZERO);
        m.record("/api/a", 504, Duration::ZERO);

        let c = m.counters("/api/a").expect("counters");
        assert_eq!(c.total_errors, 1);
    }
}
