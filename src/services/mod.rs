use std::future::Future;
use std::time::Duration;

use crate::errors::ServiceError;

// Checkout
pub mod transactions;

// Provider callbacks and queries
pub mod notifications;
pub mod status;

// Order status writes
pub mod order_locks;
pub mod order_status;
pub mod reconcile;

/// Bounds a provider call; elapsed calls fail with `ProviderTimeout` and are safe to retry.
pub async fn with_provider_timeout<T, F>(
    timeout: Duration,
    operation: &str,
    call: F,
) -> Result<T, ServiceError>
where
    F: Future<Output = Result<T, ServiceError>>,
{
    tokio::time::timeout(timeout, call).await.map_err(|_| {
        ServiceError::ProviderTimeout(format!("{} exceeded {:?}", operation, timeout))
    })?
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[tokio::test(start_paused = true)]
    async fn slow_provider_call_times_out() {
        let result: Result<(), ServiceError> = with_provider_timeout(
            Duration::from_secs(15),
            "snap token request",
            async {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok(())
            },
        )
        .await;
        assert_matches!(result, Err(ServiceError::ProviderTimeout(msg)) if msg.contains("snap"));
    }

    #[tokio::test]
    async fn fast_call_passes_through() {
        let result = with_provider_timeout(Duration::from_secs(1), "x", async {
            Ok::<_, ServiceError>(7)
        })
        .await;
        assert_eq!(result.unwrap(), 7);
    }
}
