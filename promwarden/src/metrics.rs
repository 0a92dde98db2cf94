//! Query counters.
//!
//! Servers report what they do through a [`QueryReporter`]. The default
//! [`MetricsReporter`] records counters with the `metrics` crate, so any
//! installed recorder (Prometheus exporter, statsd, ...) picks them up.
//!
//! ## Metrics
//!
//! - `promwarden_queries_total` - Requests sent to a server (counter)
//! - `promwarden_cache_hits_total` - Requests answered from the cache (counter)
//! - `promwarden_query_errors_total` - Failed requests (counter)
//!
//! All carry `name` and `endpoint` labels. Errors additionally carry a
//! `reason` label, see [`QueryError::reason`].

use std::fmt::Debug;

use lazy_static::lazy_static;
use promwarden_core::QueryError;

lazy_static! {
    /// Track number of requests sent to a server.
    pub static ref QUERIES_TOTAL: &'static str = {
        metrics::describe_counter!(
            "promwarden_queries_total",
            "Total number of queries sent to Prometheus."
        );
        "promwarden_queries_total"
    };
    /// Track number of requests answered from the cache.
    pub static ref CACHE_HITS_TOTAL: &'static str = {
        metrics::describe_counter!(
            "promwarden_cache_hits_total",
            "Total number of queries answered from the cache."
        );
        "promwarden_cache_hits_total"
    };
    /// Track number of failed requests.
    pub static ref QUERY_ERRORS_TOTAL: &'static str = {
        metrics::describe_counter!(
            "promwarden_query_errors_total",
            "Total number of failed queries."
        );
        "promwarden_query_errors_total"
    };
}

/// Receives query lifecycle events from a server.
///
/// `name` is the configured server name and `endpoint` the API path.
pub trait QueryReporter: Debug + Send + Sync {
    /// A request is about to be sent.
    fn query(&self, name: &str, endpoint: &str);

    /// A request was answered from the cache.
    fn cache_hit(&self, name: &str, endpoint: &str);

    /// A request failed.
    fn error(&self, name: &str, endpoint: &str, error: &QueryError);
}

/// Records counters through the `metrics` facade.
#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsReporter;

impl QueryReporter for MetricsReporter {
    #[inline]
    fn query(&self, name: &str, endpoint: &str) {
        metrics::counter!(
            *QUERIES_TOTAL,
            "name" => name.to_string(),
            "endpoint" => endpoint.to_string()
        )
        .increment(1);
    }

    #[inline]
    fn cache_hit(&self, name: &str, endpoint: &str) {
        metrics::counter!(
            *CACHE_HITS_TOTAL,
            "name" => name.to_string(),
            "endpoint" => endpoint.to_string()
        )
        .increment(1);
    }

    #[inline]
    fn error(&self, name: &str, endpoint: &str, error: &QueryError) {
        metrics::counter!(
            *QUERY_ERRORS_TOTAL,
            "name" => name.to_string(),
            "endpoint" => endpoint.to_string(),
            "reason" => error.reason().to_string()
        )
        .increment(1);
    }
}

/// Discards all events.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopReporter;

impl QueryReporter for NoopReporter {
    fn query(&self, _name: &str, _endpoint: &str) {}

    fn cache_hit(&self, _name: &str, _endpoint: &str) {}

    fn error(&self, _name: &str, _endpoint: &str, _error: &QueryError) {}
}

#[cfg(test)]
mod tests {
    use metrics_util::debugging::{DebugValue, DebuggingRecorder};
    use metrics_util::{CompositeKey, MetricKind};

    use super::*;

    type SnapshotEntry = (
        CompositeKey,
        Option<metrics::Unit>,
        Option<metrics::SharedString>,
        DebugValue,
    );

    fn counter(entries: &[SnapshotEntry], name: &str, labels: &[(&str, &str)]) -> Option<u64> {
        entries.iter().find_map(|(key, _, _, value)| {
            if key.kind() != MetricKind::Counter || key.key().name() != name {
                return None;
            }
            let matches = labels.iter().all(|(k, v)| {
                key.key()
                    .labels()
                    .any(|label| label.key() == *k && label.value() == *v)
            });
            match value {
                DebugValue::Counter(count) if matches => Some(*count),
                _ => None,
            }
        })
    }

    #[test]
    fn test_metrics_reporter_counters() {
        let recorder = DebuggingRecorder::new();
        let snapshotter = recorder.snapshotter();

        metrics::with_local_recorder(&recorder, || {
            let reporter = MetricsReporter;
            reporter.query("prom", "/api/v1/query");
            reporter.query("prom", "/api/v1/query");
            reporter.cache_hit("prom", "/api/v1/query");
            reporter.error(
                "prom",
                "/api/v1/query_range",
                &QueryError::api("bad_data", "parse error"),
            );
        });

        let entries = snapshotter.snapshot().into_vec();
        assert_eq!(
            counter(
                &entries,
                "promwarden_queries_total",
                &[("name", "prom"), ("endpoint", "/api/v1/query")]
            ),
            Some(2)
        );
        assert_eq!(
            counter(&entries, "promwarden_cache_hits_total", &[("name", "prom")]),
            Some(1)
        );
        assert_eq!(
            counter(
                &entries,
                "promwarden_query_errors_total",
                &[("endpoint", "/api/v1/query_range"), ("reason", "api/bad_data")]
            ),
            Some(1)
        );
    }
}
