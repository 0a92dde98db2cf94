//! Builder for configuring [`MokaCache`].

use std::hash::Hash;
use std::marker::PhantomData;
use std::time::Duration;

use moka::future::CacheBuilder;
use moka::policy::EvictionPolicy;
use promwarden_core::MemorySize;
use smol_str::SmolStr;

use crate::cache::MokaCache;

/// Marker type: capacity has not been configured yet.
///
/// Call either [`max_entries()`](MokaCacheBuilder::max_entries) or
/// [`max_bytes()`](MokaCacheBuilder::max_bytes) before `build()`.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCapacity;

/// Marker type: the cache holds at most `n` entries.
#[derive(Debug, Clone, Copy)]
pub struct EntryCapacity(pub(crate) u64);

/// Marker type: the cache holds at most `n` bytes, as estimated by
/// [`MemorySize`].
#[derive(Debug, Clone, Copy)]
pub struct ByteCapacity(pub(crate) u64);

/// Builder for creating a [`MokaCache`].
///
/// Capacity is set with exactly one of [`max_entries`](Self::max_entries) or
/// [`max_bytes`](Self::max_bytes); `build()` only exists afterwards.
///
/// ```
/// use std::time::Duration;
/// use promwarden_core::CacheKey;
/// use promwarden_moka::{EvictionPolicy, MokaCache};
///
/// let cache = MokaCache::<CacheKey, Duration>::builder()
///     .label("results")
///     .time_to_live(Duration::from_secs(300))
///     .max_bytes(64 * 1024 * 1024)
///     .eviction_policy(EvictionPolicy::lru())
///     .build();
/// ```
pub struct MokaCacheBuilder<K, V, Cap> {
    capacity: Cap,
    label: SmolStr,
    time_to_live: Option<Duration>,
    eviction_policy: Option<EvictionPolicy>,
    _types: PhantomData<fn() -> (K, V)>,
}

impl<K, V> MokaCacheBuilder<K, V, NoCapacity> {
    /// Creates a new builder with no capacity configured.
    pub fn new() -> Self {
        Self {
            capacity: NoCapacity,
            label: SmolStr::new_static("moka"),
            time_to_live: None,
            eviction_policy: None,
            _types: PhantomData,
        }
    }

    /// Sets the maximum number of entries.
    pub fn max_entries(self, capacity: u64) -> MokaCacheBuilder<K, V, EntryCapacity> {
        MokaCacheBuilder {
            capacity: EntryCapacity(capacity),
            label: self.label,
            time_to_live: self.time_to_live,
            eviction_policy: self.eviction_policy,
            _types: PhantomData,
        }
    }

    /// Sets the approximate memory budget in bytes.
    ///
    /// Entries are weighed by the [`MemorySize`] of their key and value.
    pub fn max_bytes(self, bytes: u64) -> MokaCacheBuilder<K, V, ByteCapacity> {
        MokaCacheBuilder {
            capacity: ByteCapacity(bytes),
            label: self.label,
            time_to_live: self.time_to_live,
            eviction_policy: self.eviction_policy,
            _types: PhantomData,
        }
    }
}

impl<K, V> Default for MokaCacheBuilder<K, V, NoCapacity> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, Cap> MokaCacheBuilder<K, V, Cap> {
    /// Sets the label used in logs and metrics.
    ///
    /// # Default
    ///
    /// `"moka"`
    pub fn label(mut self, label: impl Into<SmolStr>) -> Self {
        self.label = label.into();
        self
    }

    /// Expires entries this long after they were added.
    ///
    /// Without a time to live entries only leave the cache when evicted.
    pub fn time_to_live(mut self, ttl: Duration) -> Self {
        self.time_to_live = Some(ttl);
        self
    }

    /// Sets the eviction policy.
    ///
    /// # Default
    ///
    /// - [`EvictionPolicy::tiny_lfu()`] for entry-based capacity
    /// - [`EvictionPolicy::lru()`] for byte-based capacity, since TinyLFU
    ///   admission may reject a heavy entry even when eviction could make room
    pub fn eviction_policy(mut self, policy: EvictionPolicy) -> Self {
        self.eviction_policy = Some(policy);
        self
    }
}

impl<K, V> MokaCacheBuilder<K, V, EntryCapacity>
where
    K: Hash + Eq + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// Builds an entry-bounded [`MokaCache`].
    pub fn build(self) -> MokaCache<K, V> {
        let policy = self.eviction_policy.unwrap_or_else(EvictionPolicy::tiny_lfu);
        let mut builder = CacheBuilder::new(self.capacity.0)
            .name(&self.label)
            .eviction_policy(policy);
        if let Some(ttl) = self.time_to_live {
            builder = builder.time_to_live(ttl);
        }

        MokaCache {
            cache: builder.build(),
            label: self.label,
        }
    }
}

impl<K, V> MokaCacheBuilder<K, V, ByteCapacity>
where
    K: Hash + Eq + Send + Sync + MemorySize + 'static,
    V: Clone + Send + Sync + MemorySize + 'static,
{
    /// Builds a byte-bounded [`MokaCache`].
    pub fn build(self) -> MokaCache<K, V> {
        let policy = self.eviction_policy.unwrap_or_else(EvictionPolicy::lru);
        let mut builder = CacheBuilder::new(self.capacity.0)
            .name(&self.label)
            .weigher(Self::byte_weigher)
            .eviction_policy(policy);
        if let Some(ttl) = self.time_to_live {
            builder = builder.time_to_live(ttl);
        }

        MokaCache {
            cache: builder.build(),
            label: self.label,
        }
    }

    fn byte_weigher(key: &K, value: &V) -> u32 {
        (key.memory_size() + value.memory_size()).min(u32::MAX as usize) as u32
    }
}
