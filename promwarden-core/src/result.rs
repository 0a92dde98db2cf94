//! Query results handed back to rule checks.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use crate::cache::MemorySize;
use crate::sample::{Sample, SampleStream};

/// Shape of the `data.result` field of a query response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultType {
    /// Instant vector: one sample per series.
    Vector,
    /// Range vector: a list of points per series.
    Matrix,
    /// A single number.
    Scalar,
    /// A single string.
    String,
}

impl ResultType {
    /// Returns the name used on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Vector => "vector",
            Self::Matrix => "matrix",
            Self::Scalar => "scalar",
            Self::String => "string",
        }
    }
}

impl fmt::Display for ResultType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of an instant query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryResult {
    /// URI of the server that answered.
    pub uri: String,
    /// Returned series, in the order the server sent them.
    pub series: Vec<Sample>,
}

/// Result of a range query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RangeQueryResult {
    /// URI of the server that answered.
    pub uri: String,
    /// Returned series, in the order the server sent them.
    pub samples: Vec<SampleStream>,
    /// Start of the window that was actually queried.
    ///
    /// May be later than `end - lookback` when the window had to be shrunk.
    pub start: DateTime<Utc>,
    /// End of the queried window.
    pub end: DateTime<Utc>,
    /// Wall clock time spent on the successful request.
    pub duration_seconds: f64,
}

impl RangeQueryResult {
    /// Width of the queried window.
    pub fn window(&self) -> Duration {
        (self.end - self.start).to_std().unwrap_or_default()
    }
}

/// Global section of the server configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalConfig {
    /// How often targets are scraped.
    #[serde(default = "GlobalConfig::default_scrape_interval", with = "humantime_serde")]
    pub scrape_interval: Duration,
    /// How long a scrape may take.
    #[serde(default = "GlobalConfig::default_scrape_timeout", with = "humantime_serde")]
    pub scrape_timeout: Duration,
    /// How often rules are evaluated.
    #[serde(default = "GlobalConfig::default_evaluation_interval", with = "humantime_serde")]
    pub evaluation_interval: Duration,
}

impl GlobalConfig {
    fn default_scrape_interval() -> Duration {
        Duration::from_secs(60)
    }

    fn default_scrape_timeout() -> Duration {
        Duration::from_secs(10)
    }

    fn default_evaluation_interval() -> Duration {
        Duration::from_secs(60)
    }
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            scrape_interval: Self::default_scrape_interval(),
            scrape_timeout: Self::default_scrape_timeout(),
            evaluation_interval: Self::default_evaluation_interval(),
        }
    }
}

/// Result of fetching `/api/v1/status/config`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConfigResult {
    /// URI of the server that answered.
    pub uri: String,
    /// Raw YAML configuration as loaded by the server.
    pub yaml: String,
    /// Parsed `global` section, with server defaults for missing keys.
    pub global: GlobalConfig,
}

/// Result of fetching `/api/v1/status/flags`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlagsResult {
    /// URI of the server that answered.
    pub uri: String,
    /// Command line flags of the server.
    pub flags: BTreeMap<SmolStr, SmolStr>,
}

impl MemorySize for QueryResult {
    fn memory_size(&self) -> usize {
        std::mem::size_of::<Self>()
            + self.uri.len()
            + self.series.iter().map(MemorySize::memory_size).sum::<usize>()
    }
}

impl MemorySize for RangeQueryResult {
    fn memory_size(&self) -> usize {
        std::mem::size_of::<Self>()
            + self.uri.len()
            + self.samples.iter().map(MemorySize::memory_size).sum::<usize>()
    }
}

impl MemorySize for ConfigResult {
    fn memory_size(&self) -> usize {
        std::mem::size_of::<Self>() + self.uri.len() + self.yaml.len()
    }
}

impl MemorySize for FlagsResult {
    fn memory_size(&self) -> usize {
        std::mem::size_of::<Self>()
            + self.uri.len()
            + self
                .flags
                .iter()
                .map(|(k, v)| 2 * std::mem::size_of::<SmolStr>() + k.len() + v.len())
                .sum::<usize>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_type_display() {
        assert_eq!(ResultType::Matrix.to_string(), "matrix");
        assert_eq!(ResultType::Vector.to_string(), "vector");
    }

    #[test]
    fn test_global_config_defaults() {
        let global: GlobalConfig =
            serde_json::from_str(r#"{"scrape_interval":"1m30s"}"#).unwrap();
        assert_eq!(global.scrape_interval, Duration::from_secs(90));
        assert_eq!(global.scrape_timeout, Duration::from_secs(10));
        assert_eq!(global.evaluation_interval, Duration::from_secs(60));
    }
}
