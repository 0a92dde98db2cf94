//! Groups of redundant servers.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use promwarden_core::{ConfigResult, FlagsResult, QueryError, QueryResult, RangeQueryResult};
use smol_str::SmolStr;
use tracing::{debug, warn};

use crate::api::QueryApi;
use crate::error::{BackendError, GroupError};
use crate::prometheus::Prometheus;

/// Ordered list of servers holding the same data.
///
/// Every operation is tried against each member in order and the first
/// success is returned, so the result's `uri` tells which member answered.
/// What happens when all members fail depends on `required`:
///
/// - `required = true`: the failure is an error carrying every member's error
/// - `required = false`: the failure is reported as no result, `Ok(None)`
#[derive(Debug)]
pub struct FailoverGroup {
    name: SmolStr,
    servers: Vec<Prometheus>,
    required: bool,
}

impl FailoverGroup {
    /// Creates a group trying `servers` in the given order.
    pub fn new(name: impl Into<SmolStr>, servers: Vec<Prometheus>, required: bool) -> Self {
        Self {
            name: name.into(),
            servers,
            required,
        }
    }

    /// Members in the order they are tried.
    pub fn servers(&self) -> &[Prometheus] {
        &self.servers
    }

    /// Whether failures are surfaced as errors.
    pub fn is_required(&self) -> bool {
        self.required
    }

    async fn first_success<'a, T, F, Fut>(&'a self, op: F) -> Result<Option<T>, GroupError>
    where
        F: Fn(&'a Prometheus) -> Fut,
        Fut: Future<Output = Result<T, QueryError>>,
    {
        let mut errors = Vec::with_capacity(self.servers.len());
        for server in &self.servers {
            match op(server).await {
                Ok(result) => return Ok(Some(result)),
                Err(source) => {
                    if source.is_unavailable() {
                        debug!(group = %self.name, name = server.name(), uri = server.uri(), error = %source, "Server unavailable, trying next one");
                    } else {
                        warn!(group = %self.name, name = server.name(), uri = server.uri(), error = %source, "Server failed, trying next one");
                    }
                    errors.push(BackendError {
                        name: server.name().into(),
                        uri: server.uri().to_owned(),
                        source,
                    });
                }
            }
        }

        if self.required {
            Err(GroupError {
                name: self.name.clone(),
                errors,
            })
        } else {
            debug!(name = %self.name, failed = errors.len(), "All servers failed, group is optional");
            Ok(None)
        }
    }
}

#[async_trait]
impl QueryApi for FailoverGroup {
    fn name(&self) -> &str {
        &self.name
    }

    async fn query(&self, expr: &str) -> Result<Option<QueryResult>, GroupError> {
        self.first_success(|server| server.query(expr)).await
    }

    async fn range_query(
        &self,
        expr: &str,
        lookback: Duration,
        step: Duration,
    ) -> Result<Option<RangeQueryResult>, GroupError> {
        self.first_success(|server| server.range_query(expr, lookback, step))
            .await
    }

    async fn config(&self) -> Result<Option<ConfigResult>, GroupError> {
        self.first_success(|server| server.config()).await
    }

    async fn flags(&self) -> Result<Option<FlagsResult>, GroupError> {
        self.first_success(|server| server.flags()).await
    }
}
