//! Cache keys for query results.
//!
//! Each server owns its own cache, so keys only describe the query:
//!
//! - instant queries are keyed by the expression alone
//! - range queries by expression, requested lookback and step, so the same
//!   expression asked for over two different windows misses
//! - status lookups by the endpoint they were fetched from
//!
//! ```
//! use std::time::Duration;
//! use promwarden_core::CacheKey;
//!
//! let key = CacheKey::range("up", Duration::from_secs(3600), Duration::from_secs(60));
//! assert_eq!(key.to_string(), "up\n3600s\n60s");
//! assert_ne!(key, CacheKey::range("up", Duration::from_secs(7200), Duration::from_secs(60)));
//! assert_ne!(CacheKey::instant("up"), CacheKey::status("up"));
//! ```

use std::fmt;
use std::time::Duration;

use smol_str::SmolStr;

use crate::cache::MemorySize;
use crate::labels::heap_len;

/// Identifies a cached query result.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    /// An instant query.
    Instant {
        /// PromQL expression.
        expr: SmolStr,
    },
    /// A range query.
    Range {
        /// PromQL expression.
        expr: SmolStr,
        /// Requested window width.
        lookback: Duration,
        /// Resolution step.
        step: Duration,
    },
    /// A status endpoint.
    Status {
        /// API path of the endpoint.
        endpoint: SmolStr,
    },
}

impl CacheKey {
    /// Key for an instant query.
    pub fn instant(expr: impl Into<SmolStr>) -> Self {
        Self::Instant { expr: expr.into() }
    }

    /// Key for a range query.
    pub fn range(expr: impl Into<SmolStr>, lookback: Duration, step: Duration) -> Self {
        Self::Range {
            expr: expr.into(),
            lookback,
            step,
        }
    }

    /// Key for a status endpoint.
    pub fn status(endpoint: impl Into<SmolStr>) -> Self {
        Self::Status {
            endpoint: endpoint.into(),
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Instant { expr } => f.write_str(expr),
            Self::Range {
                expr,
                lookback,
                step,
            } => write!(
                f,
                "{expr}\n{}s\n{}s",
                lookback.as_secs_f64(),
                step.as_secs_f64()
            ),
            Self::Status { endpoint } => write!(f, "status:{endpoint}"),
        }
    }
}

impl MemorySize for CacheKey {
    fn memory_size(&self) -> usize {
        std::mem::size_of::<Self>()
            + match self {
                Self::Instant { expr } | Self::Range { expr, .. } => heap_len(expr),
                Self::Status { endpoint } => heap_len(endpoint),
            }
    }
}
