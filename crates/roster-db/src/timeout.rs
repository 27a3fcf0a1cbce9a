//! Deadline for backend calls.
//!
//! Every Postgres and MongoDB repository method runs its whole body (including
//! the integrity lookups) through [`bounded`]. When the deadline fires the
//! in-flight driver future is dropped, which cancels it and returns its
//! connection to the pool.

use std::future::Future;
use std::time::Duration;

use roster_core::{RepoError, RepoResult};
use tracing::warn;

/// Default deadline for a single repository call.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Runs `fut` under `limit`, mapping expiry to [`RepoError::Timeout`].
pub async fn bounded<T, F>(operation: &str, limit: Duration, fut: F) -> RepoResult<T>
where
    F: Future<Output = RepoResult<T>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => {
            warn!(operation, timeout_ms = limit.as_millis() as u64, "Backend call timed out");
            Err(RepoError::Timeout {
                operation: operation.to_string(),
                millis: limit.as_millis() as u64,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_passes_result_through() {
        let value = bounded("get position", DEFAULT_TIMEOUT, async { Ok(7) }).await;
        assert_eq!(value.unwrap(), 7);
    }

    #[tokio::test]
    async fn test_expiry_is_timeout_not_not_found() {
        let result: RepoResult<()> = bounded("get position", Duration::from_millis(10), async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await;

        match result {
            Err(RepoError::Timeout { operation, millis }) => {
                assert_eq!(operation, "get position");
                assert_eq!(millis, 10);
            }
            other => panic!("expected timeout, got {:?}", other),
        }
    }
}
