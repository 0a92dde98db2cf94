//! Instant queries.

use std::time::Instant;

use chrono::Utc;
use promwarden_core::{Cache, CacheKey, QueryError, QueryResult, response};
use serde::Serialize;
use tracing::{debug, error};

use super::{CachedValue, INSTANT_QUERY, Prometheus};

#[derive(Serialize)]
struct InstantParams<'a> {
    query: &'a str,
    time: f64,
}

impl Prometheus {
    /// Evaluates `expr` at the current time.
    ///
    /// The result must be an instant vector; anything else fails with
    /// `unknown result type`. Successful results are cached by expression.
    #[tracing::instrument(skip(self, expr), fields(uri = %self.uri, query = %expr))]
    pub async fn query(&self, expr: &str) -> Result<QueryResult, QueryError> {
        let _guard = self.locks.lock(INSTANT_QUERY).await;

        let key = CacheKey::instant(expr);
        if let Some(CachedValue::Instant(result)) = self.cache.get(&key).await {
            debug!("Query returned from cache");
            self.reporter.cache_hit(&self.name, INSTANT_QUERY);
            return Ok(result);
        }

        debug!("Scheduling prometheus query");
        self.reporter.query(&self.name, INSTANT_QUERY);
        let params = InstantParams {
            query: expr,
            time: Utc::now().timestamp_millis() as f64 / 1000.0,
        };

        let started = Instant::now();
        match self.post(INSTANT_QUERY, &params, response::decode_vector).await {
            Ok(series) => {
                debug!(
                    duration = ?started.elapsed(),
                    series = series.len(),
                    "Prometheus query completed"
                );
                let result = QueryResult {
                    uri: self.uri.clone(),
                    series,
                };
                self.cache
                    .add(key, CachedValue::Instant(result.clone()))
                    .await;
                Ok(result)
            }
            Err(err) => {
                error!(error = %err, "Prometheus query failed");
                self.reporter.error(&self.name, INSTANT_QUERY, &err);
                Err(err)
            }
        }
    }
}
