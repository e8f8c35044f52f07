//! Bulkhead pattern: a per-route cap on concurrent in-flight requests.
//!
//! Admission is non-blocking: a request either takes a slot immediately or
//! is rejected. There is no queue. The permit releases its slot on drop, so
//! every exit path (including panics) returns the slot.

use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Bounded-concurrency admission for one route.
#[derive(Clone)]
pub struct Bulkhead {
    slots: Arc<Semaphore>,
    capacity: usize,
}

impl Bulkhead {
    /// Create a bulkhead with `capacity` concurrent slots.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: Arc::new(Semaphore::new(capacity)),
            capacity,
        }
    }

    /// Take a slot without waiting. Returns `None` when the bulkhead is full.
    #[must_use]
    pub fn try_acquire(&self) -> Option<BulkheadPermit> {
        self.slots
            .clone()
            .try_acquire_owned()
            .ok()
            .map(|permit| BulkheadPermit { _permit: permit })
    }

    /// Currently free slots, in `[0, capacity]`.
    #[must_use]
    pub fn available(&self) -> usize {
        self.slots.available_permits()
    }

    /// Configured capacity.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl std::fmt::Debug for Bulkhead {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bulkhead")
            .field("capacity", &self.capacity)
            .field("available", &self.available())
            .finish()
    }
}

/// A held concurrency slot. Dropping it releases the slot.
#[derive(Debug)]
pub struct BulkheadPermit {
    _permit: OwnedSemaphorePermit,
}
