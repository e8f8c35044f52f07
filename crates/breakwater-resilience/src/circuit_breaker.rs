//! Circuit breaker for upstream protection.
//!
//! # States
//! - Closed: normal operation, requests pass through
//! - Open: upstream assumed down, requests fail fast
//! - Half-open: one probe tests whether the upstream recovered
//!
//! # State transitions
//! ```text
//! Closed → Open:      consecutive failures reach the threshold
//! Open → Half-open:   cooldown elapsed; exactly one caller gets the probe
//! Half-open → Closed: probe succeeds
//! Half-open → Open:   probe fails
//! ```
//!
//! All transitions and reads run under one mutex per breaker, which is what
//! makes the single-probe rule hold: `allow_request` returns `true` for
//! exactly one caller on the Open → Half-open edge, and every other caller
//! sees Half-open and is denied until the probe reports back.
//!
//! The breaker is passive. The proxy calls `record_success` /
//! `record_failure`; the breaker never calls out.

use parking_lot::Mutex;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Breaker state. `opened_at` exists exactly when it is meaningful.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    /// Passing traffic; counting consecutive failures.
    Closed {
        /// Consecutive failures so far.
        failures: u32,
    },
    /// Failing fast until the cooldown elapses.
    Open {
        /// When the breaker opened.
        opened_at: Instant,
    },
    /// A single probe is in flight.
    HalfOpen,
}

impl CircuitState {
    /// Short name for logs and the status snapshot.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Closed { .. } => "closed",
            Self::Open { .. } => "open",
            Self::HalfOpen => "half-open",
        }
    }
}

/// Per-route circuit breaker.
pub struct CircuitBreaker {
    prefix: String,
    threshold: u32,
    cooldown: Duration,
    state: Mutex<CircuitState>,
}

impl CircuitBreaker {
    /// Create a closed breaker.
    ///
    /// `threshold` consecutive failures open it; after `cooldown` one probe
    /// is admitted.
    #[must_use]
    pub fn new(prefix: impl Into<String>, threshold: u32, cooldown: Duration) -> Self {
        Self {
            prefix: prefix.into(),
            threshold,
            cooldown,
            state: Mutex::new(CircuitState::Closed { failures: 0 }),
        }
    }

    /// Admission query.
    ///
    /// Returns `false` while Open within the cooldown and for every caller
    /// while a Half-open probe is outstanding. On the Open → Half-open edge
    /// exactly one caller receives `true`.
    #[must_use]
    pub fn allow_request(&self) -> bool {
        let mut state = self.state.lock();
        match *state {
            CircuitState::Closed { .. } => true,
            CircuitState::Open { opened_at } => {
                if opened_at.elapsed() >= self.cooldown {
                    *state = CircuitState::HalfOpen;
                    info!(route = %self.prefix, "circuit half-open, admitting probe");
                    true
                } else {
                    false
                }
            }
            CircuitState::HalfOpen => false,
        }
    }

    /// Record a successful outcome: reset to Closed from any state.
    pub fn record_success(&self) {
        let mut state = self.state.lock();
        if !matches!(*state, CircuitState::Closed { failures: 0 }) {
            if matches!(*state, CircuitState::HalfOpen) {
                info!(route = %self.prefix, "probe succeeded, circuit closed");
            }
            *state = CircuitState::Closed { failures: 0 };
        }
    }

    /// Record a failed outcome.
    ///
    /// In Closed, increments the consecutive-failure count and opens at the
    /// threshold. In Half-open, the failed probe reopens with a fresh
    /// cooldown. In Open (an admitted request finishing late), no change.
    pub fn record_failure(&self) {
        let mut state = self.state.lock();
        match *state {
            CircuitState::Closed { failures } => {
                let failures = failures + 1;
                if failures >= self.threshold {
                    warn!(route = %self.prefix, failures, "failure threshold reached, circuit open");
                    *state = CircuitState::Open {
                        opened_at: Instant::now(),
                    };
                } else {
                    *state = CircuitState::Closed { failures };
                }
            }
            CircuitState::HalfOpen => {
                warn!(route = %self.prefix, "probe failed, circuit re-opened");
                *state = CircuitState::Open {
                    opened_at: Instant::now(),
                };
            }
            CircuitState::Open { .. } => {}
        }
    }

    /// Return an unused probe grant.
    ///
    /// For the caller that won the Open → Half-open probe but was rejected
    /// by a later admission stage (or whose client vanished) before any
    /// upstream contact: the probe would otherwise stay outstanding forever
    /// with nobody left to report it. Restores Open with the cooldown
    /// already served, so the next caller can probe immediately.
    pub fn cancel_probe(&self) {
        let mut state = self.state.lock();
        if matches!(*state, CircuitState::HalfOpen) {
            let opened_at = Instant::now()
                .checked_sub(self.cooldown)
                .unwrap_or_else(Instant::now);
            *state = CircuitState::Open { opened_at };
        }
    }

    /// Consistent snapshot of the current state.
    #[must_use]
    pub fn state(&self) -> CircuitState {
        *self.state.lock()
    }

    /// The route prefix this breaker guards.
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }
}

impl std::fmt::Debug for CircuitBreaker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CircuitBreaker")
            .field("prefix", &self.prefix)
            .field("threshold", &self.threshold)
            .field("cooldown", &self.cooldown)
            .field("state", &self.state())
            .finish()
    }
}
