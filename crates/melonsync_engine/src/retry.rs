//! Single automatic retry mandated by the sync-framework contract.

use crate::error::SyncResult;
use tracing::warn;

/// Runs `operation`; on the first failure runs it once more with fresh
/// state. The second failure surfaces to the caller.
///
/// Retry is never compounded inside push or pull themselves - this
/// wrapper is the only place the engine retries anything. Broader backoff
/// policy belongs to the caller.
pub fn with_single_retry<T>(mut operation: impl FnMut() -> SyncResult<T>) -> SyncResult<T> {
    match operation() {
        Ok(value) => Ok(value),
        Err(first) => {
            warn!(error = %first, "sync attempt failed, retrying once");
            operation()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SyncError;
    use melonsync_store::StoreError;

    #[test]
    fn success_runs_once() {
        let mut calls = 0;
        let result = with_single_retry(|| {
            calls += 1;
            Ok(calls)
        });
        assert_eq!(result.unwrap(), 1);
    }

    #[test]
    fn first_failure_is_retried() {
        let mut calls = 0;
        let result = with_single_retry(|| {
            calls += 1;
            if calls == 1 {
                Err(SyncError::Store(StoreError::unavailable("flaky")))
            } else {
                Ok(calls)
            }
        });
        assert_eq!(result.unwrap(), 2);
    }

    #[test]
    fn second_failure_surfaces() {
        let mut calls = 0;
        let result: SyncResult<()> = with_single_retry(|| {
            calls += 1;
            Err(SyncError::Store(StoreError::unavailable("down")))
        });
        assert!(result.is_err());
        assert_eq!(calls, 2);
    }
}
