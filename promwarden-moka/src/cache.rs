//! Moka cache implementation.

use std::hash::Hash;

use async_trait::async_trait;
use promwarden_core::{Cache, DeleteStatus};
use smol_str::SmolStr;

use crate::builder::{MokaCacheBuilder, NoCapacity};

/// Bounded in-memory cache powered by Moka.
///
/// Values are cloned out on every hit, so `V` should be cheap to clone or
/// wrapped in an `Arc`. Entries are evicted in least recently used order
/// once the configured capacity is exceeded, and expire after the optional
/// time to live.
///
/// # Caveats
///
/// - Expiration is best-effort: an expired entry may briefly remain readable
///   until Moka's housekeeping runs
/// - Entry counts are eventually consistent for the same reason
#[derive(Clone)]
pub struct MokaCache<K, V>
where
    K: Hash + Eq + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    pub(crate) cache: moka::future::Cache<K, V>,
    pub(crate) label: SmolStr,
}

impl<K, V> std::fmt::Debug for MokaCache<K, V>
where
    K: Hash + Eq + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MokaCache")
            .field("label", &self.label)
            .field("entries", &self.cache.entry_count())
            .finish()
    }
}

impl<K, V> MokaCache<K, V>
where
    K: Hash + Eq + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// Creates a new builder. Capacity must be set before building.
    pub fn builder() -> MokaCacheBuilder<K, V, NoCapacity> {
        MokaCacheBuilder::new()
    }

    /// Returns the underlying Moka cache.
    pub fn cache(&self) -> &moka::future::Cache<K, V> {
        &self.cache
    }

    fn record_size(&self) {
        crate::metrics::record_size(
            &self.label,
            self.cache.entry_count(),
            self.cache.weighted_size(),
        );
    }
}

#[async_trait]
impl<K, V> Cache<K, V> for MokaCache<K, V>
where
    K: Hash + Eq + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    async fn get(&self, key: &K) -> Option<V> {
        self.cache.get(key).await
    }

    async fn add(&self, key: K, value: V) {
        self.cache.insert(key, value).await;
        self.record_size();
    }

    async fn remove(&self, key: &K) -> DeleteStatus {
        let status = match self.cache.remove(key).await {
            Some(_) => DeleteStatus::Deleted,
            None => DeleteStatus::Missing,
        };
        self.record_size();
        status
    }

    fn label(&self) -> &str {
        &self.label
    }
}
