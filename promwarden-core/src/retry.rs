//! Retry policies for range queries.
//!
//! Servers refuse range queries that would return or load too many points.
//! A [`RetryPolicy`] recognizes those refusals and proposes a narrower window;
//! the caller decides whether the proposal is still worth sending.

use std::fmt::Debug;
use std::time::Duration;

use crate::error::{ApiErrorType, QueryError};

/// Reported by Prometheus when `(end - start) / step` exceeds its point limit.
const MAX_RESOLUTION: &str = "exceeded maximum resolution of";

/// Reported by Prometheus when evaluation would exceed `--query.max-samples`.
const TOO_MANY_SAMPLES: &str = "query processing would load too many samples into memory";

/// Decides whether a failed range query can be retried over a smaller window.
pub trait RetryPolicy: Debug + Send + Sync {
    /// Returns the window width to try next, or `None` if `error` is not
    /// caused by the size of the queried `lookback`.
    fn retry_delta(&self, error: &QueryError, lookback: Duration) -> Option<Duration>;
}

/// Shrinks the window on range-limit and timeout failures.
///
/// | Failure | Next window |
/// |---------|-------------|
/// | `bad_data: exceeded maximum resolution of ...` | half |
/// | `execution: query processing would load too many samples ...` | three quarters |
/// | server side `timeout` | half |
/// | request deadline exceeded | half |
///
/// Everything else is not retried.
#[derive(Debug, Clone, Copy, Default)]
pub struct RangeLimitPolicy;

impl RetryPolicy for RangeLimitPolicy {
    fn retry_delta(&self, error: &QueryError, lookback: Duration) -> Option<Duration> {
        match error {
            QueryError::Api {
                error_type: ApiErrorType::BadData,
                message,
            } if message.contains(MAX_RESOLUTION) => Some(lookback / 2),
            QueryError::Api {
                error_type: ApiErrorType::Execution,
                message,
            } if message.contains(TOO_MANY_SAMPLES) => Some(lookback / 4 * 3),
            QueryError::Api {
                error_type: ApiErrorType::Timeout,
                ..
            } => Some(lookback / 2),
            QueryError::Timeout { .. } => Some(lookback / 2),
            _ => None,
        }
    }
}

/// Never retries.
#[derive(Debug, Clone, Copy, Default)]
pub struct NeverRetry;

impl RetryPolicy for NeverRetry {
    fn retry_delta(&self, _error: &QueryError, _lookback: Duration) -> Option<Duration> {
        None
    }
}
