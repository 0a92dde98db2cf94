#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]
//! # promwarden
//!
//! Query client for Prometheus compatible HTTP APIs, built for tools that
//! fire many overlapping queries at the same servers, like rule linters.
//!
//! - [`Prometheus`] talks to one server. Requests of the same kind are
//!   serialized and successful results cached, so repeated queries cost one
//!   round trip. Range queries refused as too large are retried over a
//!   smaller window, and the window that worked is remembered.
//! - [`FailoverGroup`] tries a list of replicas in order and is either
//!   required (failures are errors) or optional (failures are no result).
//! - [`QueryApi`] is implemented by both.
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use promwarden::{MetricsReporter, PrometheusConfig, QueryApi};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = PrometheusConfig::from_yaml(
//!     "name: prom\nuri: http://prometheus-a:9090\nfailover: [http://prometheus-b:9090]\nrequired: true\n",
//! )?;
//! let prom = config.build(Arc::new(MetricsReporter))?;
//!
//! if let Some(result) = prom
//!     .range_query("up", Duration::from_secs(7 * 86400), Duration::from_secs(300))
//!     .await?
//! {
//!     println!("{} series from {}", result.samples.len(), result.uri);
//! }
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod config;
pub mod error;
pub mod failover;
pub mod lock;
pub mod metrics;
pub mod prometheus;

pub use api::QueryApi;
pub use config::{CacheConfig, PrometheusConfig};
pub use error::{BackendError, ConfigError, GroupError};
pub use failover::FailoverGroup;
pub use lock::KeyedLock;
pub use metrics::{MetricsReporter, NoopReporter, QueryReporter};
pub use prometheus::{CachedValue, Prometheus, PrometheusBuilder};

pub use promwarden_core::{
    ConfigResult, ErrorKind, FlagsResult, GlobalConfig, Labels, NeverRetry, QueryError,
    QueryResult, RangeLimitPolicy, RangeQueryResult, RetryPolicy, Sample, SamplePair,
    SampleStream, Timestamp,
};
