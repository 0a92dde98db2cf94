//! A single Prometheus server.
//!
//! [`Prometheus`] owns everything needed to talk to one server: the HTTP
//! client, a result cache, a table of per-operation locks and a cache of
//! range query windows that previously had to be shrunk. It is created once
//! per configured server and shared by every check for the lifetime of the
//! process.

mod query;
mod range;
mod status;
mod transport;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use promwarden_core::{
    Cache, CacheKey, ConfigResult, FlagsResult, MemorySize, QueryError, QueryResult,
    RangeLimitPolicy, RangeQueryResult, RetryPolicy,
};
use promwarden_moka::MokaCache;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use smol_str::{SmolStr, format_smolstr};
use tokio::sync::Mutex;

use crate::api::QueryApi;
use crate::error::{BackendError, ConfigError, GroupError};
use crate::lock::KeyedLock;
use crate::metrics::{MetricsReporter, QueryReporter};

/// API path of instant queries, also used as their lock id.
pub const INSTANT_QUERY: &str = "/api/v1/query";
/// API path of range queries, also used as their lock id.
pub const RANGE_QUERY: &str = "/api/v1/query_range";
/// API path of the configuration endpoint, also used as its lock id.
pub const STATUS_CONFIG: &str = "/api/v1/status/config";
/// API path of the flags endpoint, also used as its lock id.
pub const STATUS_FLAGS: &str = "/api/v1/status/flags";

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);
/// Default number of cached results per server.
pub const DEFAULT_CACHE_ENTRIES: u64 = 10_000;

const SLOW_QUERY_ENTRIES: u64 = 1_000;

/// Anything a server caches.
#[derive(Debug, Clone, PartialEq)]
pub enum CachedValue {
    /// An instant query result.
    Instant(QueryResult),
    /// A range query result.
    Range(RangeQueryResult),
    /// A configuration lookup.
    Config(ConfigResult),
    /// A flags lookup.
    Flags(FlagsResult),
}

impl MemorySize for CachedValue {
    fn memory_size(&self) -> usize {
        match self {
            Self::Instant(result) => result.memory_size(),
            Self::Range(result) => result.memory_size(),
            Self::Config(result) => result.memory_size(),
            Self::Flags(result) => result.memory_size(),
        }
    }
}

/// Shared result cache of a server.
pub type ResultCache = Arc<dyn Cache<CacheKey, CachedValue>>;

/// Client for a single Prometheus server.
///
/// # Concurrency
///
/// Requests of the same kind are serialized: at most one instant query, one
/// range query and one lookup of each status endpoint is in flight at a
/// time. Callers queued behind a successful request get its result from
/// the cache. Failures are not cached, so every queued caller tries again.
///
/// # Examples
///
/// ```no_run
/// use std::time::Duration;
/// use promwarden::Prometheus;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let prom = Prometheus::builder("prom", "http://localhost:9090")
///     .timeout(Duration::from_secs(30))
///     .build()?;
///
/// let result = prom.query("up == 0").await?;
/// for sample in &result.series {
///     println!("{} is down", sample.metric);
/// }
/// # Ok(())
/// # }
/// ```
pub struct Prometheus {
    name: SmolStr,
    uri: String,
    timeout: Duration,
    client: reqwest::Client,
    headers: HeaderMap,
    cache: ResultCache,
    slow_queries: Mutex<MokaCache<SmolStr, Duration>>,
    locks: KeyedLock,
    retry_policy: Arc<dyn RetryPolicy>,
    reporter: Arc<dyn QueryReporter>,
}

impl fmt::Debug for Prometheus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Prometheus")
            .field("name", &self.name)
            .field("uri", &self.uri)
            .field("timeout", &self.timeout)
            .field("cache", &self.cache.label())
            .field("retry_policy", &self.retry_policy)
            .field("reporter", &self.reporter)
            .finish()
    }
}

impl Prometheus {
    /// Creates a builder for a server called `name` listening at `uri`.
    pub fn builder(name: impl Into<SmolStr>, uri: impl Into<String>) -> PrometheusBuilder {
        PrometheusBuilder::new(name.into(), uri.into())
    }

    /// Configured server name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Base URI of the server.
    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// Request timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn attribute(&self, source: QueryError) -> GroupError {
        BackendError {
            name: self.name.clone(),
            uri: self.uri.clone(),
            source,
        }
        .into()
    }
}

#[async_trait]
impl QueryApi for Prometheus {
    fn name(&self) -> &str {
        &self.name
    }

    async fn query(&self, expr: &str) -> Result<Option<QueryResult>, GroupError> {
        Prometheus::query(self, expr)
            .await
            .map(Some)
            .map_err(|e| self.attribute(e))
    }

    async fn range_query(
        &self,
        expr: &str,
        lookback: Duration,
        step: Duration,
    ) -> Result<Option<RangeQueryResult>, GroupError> {
        Prometheus::range_query(self, expr, lookback, step)
            .await
            .map(Some)
            .map_err(|e| self.attribute(e))
    }

    async fn config(&self) -> Result<Option<ConfigResult>, GroupError> {
        Prometheus::config(self)
            .await
            .map(Some)
            .map_err(|e| self.attribute(e))
    }

    async fn flags(&self) -> Result<Option<FlagsResult>, GroupError> {
        Prometheus::flags(self)
            .await
            .map(Some)
            .map_err(|e| self.attribute(e))
    }
}

/// Builder for [`Prometheus`].
///
/// # Defaults
///
/// | Setting | Default |
/// |---------|---------|
/// | timeout | 2 minutes |
/// | cache | [`MokaCache`] holding 10 000 results, no expiry |
/// | retry policy | [`RangeLimitPolicy`] |
/// | reporter | [`MetricsReporter`] |
pub struct PrometheusBuilder {
    name: SmolStr,
    uri: String,
    timeout: Duration,
    headers: HeaderMap,
    cache: Option<ResultCache>,
    retry_policy: Arc<dyn RetryPolicy>,
    reporter: Arc<dyn QueryReporter>,
    client: Option<reqwest::Client>,
}

impl PrometheusBuilder {
    fn new(name: SmolStr, uri: String) -> Self {
        Self {
            name,
            uri,
            timeout: DEFAULT_TIMEOUT,
            headers: HeaderMap::new(),
            cache: None,
            retry_policy: Arc::new(RangeLimitPolicy),
            reporter: Arc::new(MetricsReporter),
            client: None,
        }
    }

    /// Sets the timeout of every request.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Adds a header sent with every request.
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Adds headers sent with every request.
    pub fn headers(mut self, headers: HeaderMap) -> Self {
        self.headers.extend(headers);
        self
    }

    /// Replaces the result cache.
    pub fn cache<C>(mut self, cache: C) -> Self
    where
        C: Cache<CacheKey, CachedValue> + 'static,
    {
        self.cache = Some(Arc::new(cache));
        self
    }

    /// Decides when failed range queries are retried over a smaller window.
    pub fn retry_policy<P>(mut self, policy: P) -> Self
    where
        P: RetryPolicy + 'static,
    {
        self.retry_policy = Arc::new(policy);
        self
    }

    /// Receives query counters.
    pub fn reporter(mut self, reporter: Arc<dyn QueryReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    /// Uses an existing HTTP client instead of creating one.
    pub fn client(mut self, client: reqwest::Client) -> Self {
        self.client = Some(client);
        self
    }

    /// Validates the settings and creates the server.
    pub fn build(self) -> Result<Prometheus, ConfigError> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::EmptyName);
        }
        let uri = self.uri.trim_end_matches('/').to_owned();
        reqwest::Url::parse(&uri).map_err(|e| ConfigError::InvalidUri {
            uri: self.uri.clone(),
            message: e.to_string(),
        })?;

        let client = match self.client {
            Some(client) => client,
            None => reqwest::Client::builder().build()?,
        };
        let cache = self.cache.unwrap_or_else(|| {
            Arc::new(
                MokaCache::<CacheKey, CachedValue>::builder()
                    .label(self.name.clone())
                    .max_entries(DEFAULT_CACHE_ENTRIES)
                    .build(),
            )
        });
        let slow_queries = MokaCache::builder()
            .label(format_smolstr!("{}/slow-queries", self.name))
            .max_entries(SLOW_QUERY_ENTRIES)
            .build();

        Ok(Prometheus {
            name: self.name,
            uri,
            timeout: self.timeout,
            client,
            headers: self.headers,
            cache,
            slow_queries: Mutex::new(slow_queries),
            locks: KeyedLock::new(),
            retry_policy: self.retry_policy,
            reporter: self.reporter,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_trims_trailing_slash() {
        let prom = Prometheus::builder("prom", "http://localhost:9090/")
            .build()
            .unwrap();
        assert_eq!(prom.uri(), "http://localhost:9090");
        assert_eq!(prom.timeout(), DEFAULT_TIMEOUT);
    }

    #[test]
    fn test_build_rejects_invalid() {
        assert!(matches!(
            Prometheus::builder("", "http://localhost:9090").build(),
            Err(ConfigError::EmptyName)
        ));
        assert!(matches!(
            Prometheus::builder("prom", "localhost 9090").build(),
            Err(ConfigError::InvalidUri { .. })
        ));
    }
}
