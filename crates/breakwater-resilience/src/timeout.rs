//! Per-attempt deadline helpers.
//!
//! Each proxy attempt gets a fresh deadline equal to the route timeout; the
//! deadline from one attempt never carries over to the next.

use breakwater_core::GatewayError;
use std::future::Future;
use std::time::Duration;

/// Extension trait for adding a deadline to a future.
#[allow(async_fn_in_trait)]
pub trait TimeoutExt: Sized {
    /// Run this future under `deadline`.
    ///
    /// # Errors
    /// Returns [`GatewayError::Timeout`] if the deadline elapses first.
    async fn with_deadline(self, deadline: Duration) -> Result<Self::Output, GatewayError>
    where
        Self: Future;
}

impl<F: Future> TimeoutExt for F {
    async fn with_deadline(self, deadline: Duration) -> Result<F::Output, GatewayError> {
        match tokio::time::timeout(deadline, self).await {
            Ok(output) => Ok(output),
            Err(_) => Err(GatewayError::timeout(deadline)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::sleep;

    #[tokio::test]
    async fn test_completes_within_deadline() {
        let result = async { 42 }.with_deadline(Duration::from_secs(1)).await;
        assert_eq!(result.expect("in time"), 42);
    }

    #[tokio::test]
    async fn test_deadline_exceeded() {
        let result = sleep(Duration::from_secs(10))
            .with_deadline(Duration::from_millis(20))
            .await;
        assert!(matches!(result, Err(GatewayError::Timeout { .. })));
    }
}
