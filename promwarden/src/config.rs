//! Server configuration.
//!
//! ```yaml
//! name: prom
//! uri: https://prometheus-a.example.com
//! failover:
//!   - https://prometheus-b.example.com
//! timeout: 30s
//! required: true
//! headers:
//!   X-Scope-OrgID: team-a
//! cache:
//!   max_entries: 5000
//!   ttl: 10m
//! ```
//!
//! Setting `cache.max_bytes` bounds each cache by the estimated memory held
//! by its results instead of by entry count:
//!
//! ```yaml
//! cache:
//!   max_bytes: 67108864
//! ```

use std::collections::BTreeMap;
use std::iter;
use std::sync::Arc;
use std::time::Duration;

use promwarden_core::CacheKey;
use promwarden_moka::MokaCache;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::failover::FailoverGroup;
use crate::metrics::QueryReporter;
use crate::prometheus::{CachedValue, DEFAULT_CACHE_ENTRIES, DEFAULT_TIMEOUT, Prometheus};

/// Result cache settings of each server.
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct CacheConfig {
    /// Maximum number of cached results per server.
    #[serde(default = "CacheConfig::default_max_entries")]
    pub max_entries: u64,
    /// Maximum estimated size in bytes of cached results per server.
    /// Overrides `max_entries` when set.
    #[serde(default)]
    pub max_bytes: Option<u64>,
    /// How long results stay cached (e.g. "30s", "10m"). Forever when unset.
    #[serde(default, with = "humantime_serde")]
    pub ttl: Option<Duration>,
}

impl CacheConfig {
    fn default_max_entries() -> u64 {
        DEFAULT_CACHE_ENTRIES
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: DEFAULT_CACHE_ENTRIES,
            max_bytes: None,
            ttl: None,
        }
    }
}

/// A named Prometheus server with optional failover replicas.
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct PrometheusConfig {
    /// Name used in problem reports and metrics.
    pub name: String,
    /// URI of the primary server.
    pub uri: String,
    /// URIs of replicas tried, in order, when the primary fails.
    #[serde(default)]
    pub failover: Vec<String>,
    /// Timeout of every request (e.g. "30s", "2m").
    #[serde(default = "PrometheusConfig::default_timeout", with = "humantime_serde")]
    pub timeout: Duration,
    /// Whether failing queries are reported as problems.
    #[serde(default)]
    pub required: bool,
    /// Headers sent with every request.
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    /// Result cache settings.
    #[serde(default)]
    pub cache: CacheConfig,
}

impl PrometheusConfig {
    fn default_timeout() -> Duration {
        DEFAULT_TIMEOUT
    }

    /// Parses a configuration from YAML.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        serde_saphyr::from_str(yaml).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Creates the server group described by this configuration.
    ///
    /// The primary `uri` comes first, followed by the `failover` replicas.
    /// All members share one HTTP client and report through `reporter`, but
    /// each has its own cache.
    pub fn build(&self, reporter: Arc<dyn QueryReporter>) -> Result<FailoverGroup, ConfigError> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::EmptyName);
        }
        let headers = self.header_map()?;
        let client = reqwest::Client::builder().build()?;

        let servers = iter::once(&self.uri)
            .chain(&self.failover)
            .map(|uri| {
                Prometheus::builder(self.name.as_str(), uri.as_str())
                    .timeout(self.timeout)
                    .headers(headers.clone())
                    .cache(self.result_cache())
                    .reporter(reporter.clone())
                    .client(client.clone())
                    .build()
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(FailoverGroup::new(self.name.as_str(), servers, self.required))
    }

    fn header_map(&self) -> Result<HeaderMap, ConfigError> {
        let mut headers = HeaderMap::with_capacity(self.headers.len());
        for (name, value) in &self.headers {
            let invalid = |message: String| ConfigError::InvalidHeader {
                name: name.clone(),
                message,
            };
            let header_name =
                HeaderName::from_bytes(name.as_bytes()).map_err(|e| invalid(e.to_string()))?;
            let header_value = HeaderValue::from_str(value).map_err(|e| invalid(e.to_string()))?;
            headers.insert(header_name, header_value);
        }
        Ok(headers)
    }

    fn result_cache(&self) -> MokaCache<CacheKey, CachedValue> {
        let builder = MokaCache::builder().label(self.name.as_str());
        let builder = match self.cache.ttl {
            Some(ttl) => builder.time_to_live(ttl),
            None => builder,
        };
        match self.cache.max_bytes {
            Some(bytes) => builder.max_bytes(bytes).build(),
            None => builder.max_entries(self.cache.max_entries).build(),
        }
    }
}
