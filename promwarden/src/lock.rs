//! Per-operation locks.
//!
//! A [`KeyedLock`] hands out one mutex per identifier. Servers lock by
//! operation kind (the API path), so at most one request of each kind is in
//! flight against a server at a time. Whoever waited for the lock then finds
//! the previous holder's result in the cache.

use std::sync::Arc;

use dashmap::DashMap;
use smol_str::SmolStr;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Table of lazily created mutexes, keyed by identifier.
#[derive(Debug, Default)]
pub struct KeyedLock {
    locks: DashMap<SmolStr, Arc<Mutex<()>>>,
}

impl KeyedLock {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits until the mutex for `id` is free and acquires it.
    ///
    /// The mutex is released when the returned guard is dropped, including
    /// when the future holding it is cancelled. Waiters are served in FIFO
    /// order.
    pub async fn lock(&self, id: &str) -> OwnedMutexGuard<()> {
        // Clone the mutex out so the shard lock is not held across the await.
        let mutex = self
            .locks
            .entry(SmolStr::new(id))
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        mutex.lock_owned().await
    }

    /// Number of identifiers that have been locked at least once.
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    /// Returns `true` if nothing has been locked yet.
    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn test_same_id_is_exclusive() {
        let locks = Arc::new(KeyedLock::new());
        let active = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let tasks: Vec<_> = (0..5)
            .map(|_| {
                let locks = locks.clone();
                let active = active.clone();
                let peak = peak.clone();
                tokio::spawn(async move {
                    let _guard = locks.lock("/api/v1/query").await;
                    let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(5)).await;
                    active.fetch_sub(1, Ordering::SeqCst);
                })
            })
            .collect();
        for task in tasks {
            task.await.unwrap();
        }

        assert_eq!(peak.load(Ordering::SeqCst), 1);
        assert_eq!(locks.len(), 1);
    }

    #[tokio::test]
    async fn test_different_ids_do_not_block() {
        let locks = KeyedLock::new();
        let _query = locks.lock("/api/v1/query").await;
        let range = tokio::time::timeout(
            Duration::from_millis(100),
            locks.lock("/api/v1/query_range"),
        )
        .await;
        assert!(range.is_ok());
        assert_eq!(locks.len(), 2);
    }

    #[tokio::test]
    async fn test_released_on_cancel() {
        let locks = KeyedLock::new();
        {
            let guard = locks.lock("/api/v1/query").await;
            let waiter =
                tokio::time::timeout(Duration::from_millis(10), locks.lock("/api/v1/query")).await;
            assert!(waiter.is_err(), "lock should still be held");
            drop(guard);
        }
        let again =
            tokio::time::timeout(Duration::from_millis(100), locks.lock("/api/v1/query")).await;
        assert!(again.is_ok());
    }
}
