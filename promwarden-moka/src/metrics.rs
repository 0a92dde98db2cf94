//! Moka cache size metrics.
//!
//! Enable the `metrics` feature to record them.
//!
//! ## Metrics
//!
//! - `promwarden_cache_entries` - Current number of entries in the cache (gauge)
//! - `promwarden_cache_size_bytes` - Current weighted size of the cache (gauge)
//!
//! Both carry a `cache` label holding the cache label.

#[cfg(feature = "metrics")]
use lazy_static::lazy_static;

#[cfg(feature = "metrics")]
lazy_static! {
    /// Metric name for the cache entry count gauge.
    pub static ref CACHE_ENTRIES: &'static str = {
        metrics::describe_gauge!(
            "promwarden_cache_entries",
            "Current number of entries in the query cache."
        );
        "promwarden_cache_entries"
    };

    /// Metric name for the cache weighted size gauge.
    pub static ref CACHE_SIZE_BYTES: &'static str = {
        metrics::describe_gauge!(
            "promwarden_cache_size_bytes",
            "Current weighted size of the query cache."
        );
        "promwarden_cache_size_bytes"
    };
}

/// Record current cache size.
///
/// `weighted_size` equals `entries` for entry bounded caches and approximate
/// bytes for byte bounded ones.
#[cfg(feature = "metrics")]
#[inline]
pub fn record_size(cache: &str, entries: u64, weighted_size: u64) {
    metrics::gauge!(*CACHE_ENTRIES, "cache" => cache.to_string()).set(entries as f64);
    metrics::gauge!(*CACHE_SIZE_BYTES, "cache" => cache.to_string()).set(weighted_size as f64);
}

/// Record current cache size (no-op when `metrics` feature disabled).
#[cfg(not(feature = "metrics"))]
#[inline]
pub fn record_size(_cache: &str, _entries: u64, _weighted_size: u64) {}
