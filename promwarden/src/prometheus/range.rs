//! Range queries with adaptive window shrinking.
//!
//! Servers cap how many points or samples one range query may touch. When a
//! query is refused for that reason the window is narrowed, keeping `end`
//! fixed, until the server accepts it or the window would hold fewer than
//! two steps. A window that had to be narrowed is remembered per expression,
//! so the next range query for the same expression starts from it instead of
//! repeating the failing attempts.

use std::time::{Duration, Instant};

use chrono::{DateTime, TimeDelta, Utc};
use promwarden_core::{Cache, CacheKey, QueryError, RangeQueryResult, response};
use serde::Serialize;
use smol_str::SmolStr;
use tracing::{debug, error, warn};

use super::{CachedValue, Prometheus, RANGE_QUERY};

#[derive(Serialize)]
struct RangeParams<'a> {
    query: &'a str,
    start: f64,
    end: f64,
    step: f64,
}

fn unix_seconds(time: DateTime<Utc>) -> f64 {
    time.timestamp_millis() as f64 / 1000.0
}

fn window_start(end: DateTime<Utc>, window: Duration) -> DateTime<Utc> {
    TimeDelta::from_std(window)
        .ok()
        .and_then(|delta| end.checked_sub_signed(delta))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

impl Prometheus {
    /// Evaluates `expr` over `[now - lookback, now]`, one point per `step`.
    ///
    /// The result must be a range vector. When the server refuses the window
    /// as too large, the configured [`RetryPolicy`](promwarden_core::RetryPolicy)
    /// proposes a smaller one and the query is sent again. Retrying stops
    /// with [`QueryError::RetryExhausted`] once the proposed window is
    /// shorter than two steps. The returned `start` and `end` describe the
    /// window that was actually queried.
    #[tracing::instrument(skip(self, expr), fields(uri = %self.uri, query = %expr))]
    pub async fn range_query(
        &self,
        expr: &str,
        lookback: Duration,
        step: Duration,
    ) -> Result<RangeQueryResult, QueryError> {
        let _guard = self.locks.lock(RANGE_QUERY).await;

        let key = CacheKey::range(expr, lookback, step);
        if let Some(CachedValue::Range(result)) = self.cache.get(&key).await {
            debug!("Range query returned from cache");
            self.reporter.cache_hit(&self.name, RANGE_QUERY);
            return Ok(result);
        }

        let end = Utc::now();
        let mut window = lookback;
        if let Some(delta) = self.slow_window(expr).await
            && delta < window
        {
            debug!(delta = ?delta, "Using remembered range for a slow query");
            window = delta;
        }

        let mut retry = false;
        loop {
            let start = window_start(end, window);
            debug!(
                start = %start,
                end = %end,
                step = ?step,
                retry,
                "Scheduling prometheus range query"
            );
            self.reporter.query(&self.name, RANGE_QUERY);
            let params = RangeParams {
                query: expr,
                start: unix_seconds(start),
                end: unix_seconds(end),
                step: step.as_secs_f64(),
            };

            let started = Instant::now();
            let err = match self.post(RANGE_QUERY, &params, response::decode_matrix).await {
                Ok(samples) => {
                    let duration = started.elapsed();
                    debug!(
                        duration = ?duration,
                        series = samples.len(),
                        "Prometheus range query completed"
                    );
                    if retry {
                        self.remember_slow_window(expr, window).await;
                    }
                    let result = RangeQueryResult {
                        uri: self.uri.clone(),
                        samples,
                        start,
                        end,
                        duration_seconds: duration.as_secs_f64(),
                    };
                    self.cache.add(key, CachedValue::Range(result.clone())).await;
                    return Ok(result);
                }
                Err(err) => err,
            };

            self.reporter.error(&self.name, RANGE_QUERY, &err);
            let Some(delta) = self
                .retry_policy
                .retry_delta(&err, window)
                .filter(|delta| *delta < window)
            else {
                error!(error = %err, "Prometheus range query failed");
                return Err(err);
            };

            if delta < step.saturating_mul(2) {
                error!(
                    error = %err,
                    delta = ?delta,
                    step = ?step,
                    "No more retries possible"
                );
                return Err(QueryError::RetryExhausted {
                    last: Box::new(err),
                });
            }

            warn!(
                error = %err,
                delta = ?delta,
                step = ?step,
                "Retrying range query with a smaller range"
            );
            window = delta;
            retry = true;
        }
    }

    async fn slow_window(&self, expr: &str) -> Option<Duration> {
        let slow_queries = self.slow_queries.lock().await;
        slow_queries.get(&SmolStr::new(expr)).await
    }

    async fn remember_slow_window(&self, expr: &str, window: Duration) {
        debug!(delta = ?window, "Remembering range for a slow query");
        let slow_queries = self.slow_queries.lock().await;
        slow_queries.replace(SmolStr::new(expr), window).await;
    }
}
