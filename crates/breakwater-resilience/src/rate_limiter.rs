//! Fixed-window rate limiting keyed by `(route, client)`.
//!
//! A counter is installed on first sight of a key and replaced wholesale
//! when its window has elapsed. Increments within a live window are a single
//! atomic add under the map shard's read lock, so a check is O(1) with no
//! background timers. Concurrent rollovers may each install a fresh window;
//! the losing insert is overwritten and undercounts by at most one per
//! racing thread, which is accepted.

use dashmap::DashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{Duration, Instant};
use tracing::debug;

/// The outcome of a rate-limit check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// The request is admitted.
    Allowed,
    /// The request is rejected until the current window closes.
    Denied {
        /// Time remaining in the window.
        retry_after: Duration,
    },
}

impl Decision {
    /// True iff the request was admitted.
    #[must_use]
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed)
    }
}

/// `Retry-After` header value: whole seconds, rounded up, never zero.
///
/// A request arriving exactly at window close has zero remaining time but
/// the header still reads 1.
#[must_use]
pub fn header_seconds(retry_after: Duration) -> u64 {
    let secs = retry_after.as_secs_f64().ceil() as u64;
    secs.max(1)
}

struct WindowCounter {
    window_start: Instant,
    count: AtomicU32,
}

/// Per `(route, client)` fixed-window counters.
pub struct FixedWindowLimiter {
    windows: DashMap<String, WindowCounter>,
}

impl FixedWindowLimiter {
    /// Create an empty limiter.
    #[must_use]
    pub fn new() -> Self {
        Self {
            windows: DashMap::new(),
        }
    }

    /// Check the limit for one request.
    ///
    /// Installs a fresh `{window_start: now, count: 1}` on first sight or
    /// when the existing window has elapsed; otherwise atomically increments
    /// and admits iff the new count is within `limit`.
    pub fn check(&self, prefix: &str, client_id: &str, limit: u32, window: Duration) -> Decision {
        let key = format!("{prefix}:{client_id}");
        let now = Instant::now();

        if let Some(counter) = self.windows.get(&key) {
            if now.duration_since(counter.window_start) < window {
                let count = counter.count.fetch_add(1, Ordering::Relaxed) + 1;
                if count <= limit {
                    return Decision::Allowed;
                }
                let closes_at = counter.window_start + window;
                return Decision::Denied {
                    retry_after: closes_at.saturating_duration_since(now),
                };
            }
            // Window elapsed: fall through and replace wholesale.
        }

        self.windows.insert(
            key,
            WindowCounter {
                window_start: now,
                count: AtomicU32::new(1),
            },
        );
        Decision::Allowed
    }

    /// Remove counters older than `ttl`, measured from window start.
    ///
    /// Callers pass the route window plus a grace period, so a live window
    /// is never removed; a request racing the sweep at worst re-installs a
    /// fresh counter.
    pub fn sweep(&self, ttl: Duration) {
        let now = Instant::now();
        let before = self.windows.len();
        self.windows
            .retain(|_, counter| now.duration_since(counter.window_start) < ttl);
        let removed = before.saturating_sub(self.windows.len());
        if removed > 0 {
            debug!(removed, remaining = self.windows.len(), "swept expired rate-limit windows");
        }
    }

    /// Number of tracked `(route, client)` keys.
    #[must_use]
    pub fn key_count(&self) -> usize {
        self.windows.len()
    }
}

impl Default for FixedWindowLimiter {
    fn default() -> Self {
        Self::new()
    }
}
