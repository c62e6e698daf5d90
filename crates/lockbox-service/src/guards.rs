use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Per-lock async mutexes.
///
/// Provider calls and activity writes for one lock run under its guard, so
/// they reach the device and the log in the same order. Different locks
/// never contend.
#[derive(Debug, Default)]
pub(crate) struct LockGuards {
    inner: Mutex<HashMap<i64, Arc<AsyncMutex<()>>>>,
}

impl LockGuards {
    /// Wait for exclusive access to `lock_id`.
    pub(crate) async fn acquire(&self, lock_id: i64) -> OwnedMutexGuard<()> {
        // The map guard is dropped before awaiting.
        let mutex = {
            let mut map = self.inner.lock().unwrap_or_else(|e| e.into_inner());
            map.entry(lock_id).or_default().clone()
        };
        mutex.lock_owned().await
    }

    /// Drop the entry of a removed lock.
    pub(crate) fn forget(&self, lock_id: i64) {
        let mut map = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        map.remove(&lock_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_same_lock_is_serialized() {
        let guards = Arc::new(LockGuards::default());
        let held = guards.acquire(1).await;

        let contender = {
            let guards = guards.clone();
            tokio::spawn(async move {
                let _guard = guards.acquire(1).await;
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!contender.is_finished());

        drop(held);
        contender.await.unwrap();
    }

    #[tokio::test]
    async fn test_different_locks_do_not_contend() {
        let guards = LockGuards::default();
        let _first = guards.acquire(1).await;
        let second = tokio::time::timeout(Duration::from_millis(100), guards.acquire(2)).await;
        assert!(second.is_ok());
    }
}
