//! Cache abstraction for query results.
//!
//! A [`Cache`] is a bounded key-value store. Entries are never modified in
//! place: replacing a value means removing the old entry and adding a new one,
//! which is what [`Cache::replace`] does.

use std::sync::Arc;

use async_trait::async_trait;

/// Result of removing an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteStatus {
    /// An entry existed and was removed.
    Deleted,
    /// No entry was stored under the key.
    Missing,
}

/// Bounded key-value store used by servers to remember query results.
#[async_trait]
pub trait Cache<K, V>: Send + Sync
where
    K: Send + Sync + 'static,
    V: Send + Sync + 'static,
{
    /// Returns a copy of the value stored under `key`.
    async fn get(&self, key: &K) -> Option<V>;

    /// Stores `value` under `key`.
    async fn add(&self, key: K, value: V);

    /// Removes the value stored under `key`.
    async fn remove(&self, key: &K) -> DeleteStatus;

    /// Removes whatever is stored under `key`, then stores `value`.
    async fn replace(&self, key: K, value: V) {
        self.remove(&key).await;
        self.add(key, value).await;
    }

    /// Label identifying this cache in logs and metrics.
    fn label(&self) -> &str {
        "cache"
    }
}

#[async_trait]
impl<K, V, C> Cache<K, V> for Arc<C>
where
    K: Send + Sync + 'static,
    V: Send + Sync + 'static,
    C: Cache<K, V> + ?Sized,
{
    async fn get(&self, key: &K) -> Option<V> {
        self.as_ref().get(key).await
    }

    async fn add(&self, key: K, value: V) {
        self.as_ref().add(key, value).await
    }

    async fn remove(&self, key: &K) -> DeleteStatus {
        self.as_ref().remove(key).await
    }

    fn label(&self) -> &str {
        self.as_ref().label()
    }
}

/// Approximate heap footprint, used by byte-bounded caches.
pub trait MemorySize {
    /// Approximate number of bytes this value occupies.
    fn memory_size(&self) -> usize;
}

impl MemorySize for std::time::Duration {
    fn memory_size(&self) -> usize {
        std::mem::size_of::<Self>()
    }
}
