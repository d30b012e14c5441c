//! Bounded, retryable calls against the external store.
//!
//! Every store call is capped by the configured timeout so no
//! operation in the core blocks indefinitely; an elapsed timer maps to
//! the retryable [`CoreError::StoreUnavailable`]. Idempotent reads may
//! additionally be retried exactly once after a short backoff — writes
//! and password submissions never are.

use std::time::Duration;

use comptoir_core::{CoreError, CoreResult};

/// Run a store call with an upper bound on its duration.
pub(crate) async fn bounded<T>(
    limit: Duration,
    fut: impl Future<Output = CoreResult<T>>,
) -> CoreResult<T> {
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(CoreError::StoreUnavailable(format!(
            "store call exceeded {}ms",
            limit.as_millis()
        ))),
    }
}

/// Run an idempotent store read, retrying once with backoff on a
/// retryable failure.
pub(crate) async fn retry_read<T, F, Fut>(
    limit: Duration,
    backoff: Duration,
    mut read: F,
) -> CoreResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = CoreResult<T>>,
{
    match bounded(limit, read()).await {
        Err(err) if err.is_retryable() => {
            tracing::warn!(error = %err, "store read failed, retrying once");
            tokio::time::sleep(backoff).await;
            bounded(limit, read()).await
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn timeout_maps_to_store_unavailable() {
        let result: CoreResult<()> = bounded(Duration::from_millis(10), async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await;
        assert!(matches!(result, Err(CoreError::StoreUnavailable(_))));
    }

    #[tokio::test]
    async fn read_retried_exactly_once() {
        let mut calls = 0u32;
        let result = retry_read(Duration::from_secs(1), Duration::from_millis(1), || {
            calls += 1;
            let attempt = calls;
            async move {
                if attempt == 1 {
                    Err(CoreError::StoreUnavailable("transient".into()))
                } else {
                    Ok(attempt)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 2);
        assert_eq!(calls, 2);
    }

    #[tokio::test]
    async fn non_retryable_error_not_retried() {
        let mut calls = 0u32;
        let result: CoreResult<()> =
            retry_read(Duration::from_secs(1), Duration::from_millis(1), || {
                calls += 1;
                async {
                    Err(CoreError::NotFound {
                        entity: "principal".into(),
                        id: "x".into(),
                    })
                }
            })
            .await;
        assert!(matches!(result, Err(CoreError::NotFound { .. })));
        assert_eq!(calls, 1);
    }
}
