//! The query capability shared by single servers and server groups.

use std::time::Duration;

use async_trait::async_trait;
use promwarden_core::{ConfigResult, FlagsResult, QueryResult, RangeQueryResult};

use crate::error::GroupError;

/// Something that can answer PromQL queries.
///
/// Implemented by [`Prometheus`](crate::Prometheus) and
/// [`FailoverGroup`](crate::FailoverGroup), so checks do not care whether they
/// talk to one server or a group of replicas.
///
/// `Ok(None)` means there is no result and no error worth reporting, which
/// is what an optional group returns when all of its members failed.
#[async_trait]
pub trait QueryApi: Send + Sync {
    /// Name used in problem reports.
    fn name(&self) -> &str;

    /// Evaluates `expr` at the current time.
    async fn query(&self, expr: &str) -> Result<Option<QueryResult>, GroupError>;

    /// Evaluates `expr` over the last `lookback`, one point per `step`.
    async fn range_query(
        &self,
        expr: &str,
        lookback: Duration,
        step: Duration,
    ) -> Result<Option<RangeQueryResult>, GroupError>;

    /// Fetches the server configuration.
    async fn config(&self) -> Result<Option<ConfigResult>, GroupError>;

    /// Fetches the server command line flags.
    async fn flags(&self) -> Result<Option<FlagsResult>, GroupError>;
}
