//! Commit-or-rollback discipline shared by every engine.

use crate::domain::ports::UnitOfWork;
use crate::error::{LedgerError, Result};
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Finishes a unit of work according to the outcome of the work done in it.
///
/// A successful outcome is committed; a failed commit is reported instead of
/// the outcome. A failed outcome is rolled back and returned unchanged, even
/// if the rollback itself fails (the unit's locks are released on drop).
pub async fn finish<U, T>(unit: Box<U>, outcome: Result<T>) -> Result<T>
where
    U: UnitOfWork + ?Sized,
{
    match outcome {
        Ok(value) => {
            unit.commit().await?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = unit.rollback().await {
                warn!(error = %rollback_err, "rollback failed");
            }
            Err(err)
        }
    }
}

/// Runs `operation` under the configured deadline.
///
/// On expiry the operation's future is dropped, which drops any unit of work
/// it holds and with it every buffered write and row lock.
pub async fn with_deadline<T, F>(deadline: Option<Duration>, operation: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match deadline {
        Some(limit) => tokio::time::timeout(limit, operation)
            .await
            .map_err(|_| LedgerError::DeadlineExceeded(limit))?,
        None => operation.await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Counters {
        commits: AtomicUsize,
        rollbacks: AtomicUsize,
    }

    struct CountingUnit(Arc<Counters>);

    #[async_trait]
    impl UnitOfWork for CountingUnit {
        async fn commit(self: Box<Self>) -> Result<()> {
            self.0.commits.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn rollback(self: Box<Self>) -> Result<()> {
            self.0.rollbacks.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_success_commits() {
        let counters = Arc::new(Counters::default());
        let unit = Box::new(CountingUnit(Arc::clone(&counters)));
        let value = finish(unit, Ok(7)).await.unwrap();
        assert_eq!(value, 7);
        assert_eq!(counters.commits.load(Ordering::SeqCst), 1);
        assert_eq!(counters.rollbacks.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_failure_rolls_back_and_keeps_error() {
        let counters = Arc::new(Counters::default());
        let unit = Box::new(CountingUnit(Arc::clone(&counters)));
        let result: Result<()> = finish(unit, Err(LedgerError::ValidationError("x".into()))).await;
        assert!(matches!(result, Err(LedgerError::ValidationError(_))));
        assert_eq!(counters.commits.load(Ordering::SeqCst), 0);
        assert_eq!(counters.rollbacks.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_deadline_expiry() {
        let result: Result<()> = with_deadline(Some(Duration::from_millis(10)), async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await;
        assert!(matches!(result, Err(LedgerError::DeadlineExceeded(_))));
    }
}
