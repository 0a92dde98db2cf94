//! HTTP round trips.

use promwarden_core::QueryError;
use reqwest::header::CONTENT_TYPE;
use serde::Serialize;
use tracing::trace;

use super::Prometheus;

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

impl Prometheus {
    /// Posts `params` as a form to `endpoint` and decodes the response.
    pub(super) async fn post<P, T, D>(
        &self,
        endpoint: &str,
        params: &P,
        decode: D,
    ) -> Result<T, QueryError>
    where
        P: Serialize + ?Sized,
        D: FnOnce(u16, &[u8]) -> Result<T, QueryError>,
    {
        let url = format!("{}{endpoint}", self.uri);
        let body = serde_urlencoded::to_string(params).map_err(|e| QueryError::Connection {
            method: "Post",
            url: url.clone(),
            message: e.to_string(),
        })?;
        let request = self
            .client
            .post(&url)
            .headers(self.headers.clone())
            .header(CONTENT_TYPE, FORM_CONTENT_TYPE)
            .body(body);
        self.execute("Post", url, request, decode).await
    }

    /// Fetches `endpoint` and decodes the response.
    pub(super) async fn get<T, D>(&self, endpoint: &str, decode: D) -> Result<T, QueryError>
    where
        D: FnOnce(u16, &[u8]) -> Result<T, QueryError>,
    {
        let url = format!("{}{endpoint}", self.uri);
        let request = self.client.get(&url).headers(self.headers.clone());
        self.execute("Get", url, request, decode).await
    }

    async fn execute<T, D>(
        &self,
        method: &'static str,
        url: String,
        request: reqwest::RequestBuilder,
        decode: D,
    ) -> Result<T, QueryError>
    where
        D: FnOnce(u16, &[u8]) -> Result<T, QueryError>,
    {
        let exchange = async {
            let response = request.send().await?;
            let status = response.status().as_u16();
            let body = response.bytes().await?;
            Ok::<_, reqwest::Error>((status, body))
        };

        let (status, body) = match tokio::time::timeout(self.timeout, exchange).await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) if e.is_timeout() => return Err(QueryError::Timeout { method, url }),
            Ok(Err(e)) => {
                return Err(QueryError::Connection {
                    method,
                    url,
                    message: e.to_string(),
                });
            }
            Err(_) => return Err(QueryError::Timeout { method, url }),
        };
        trace!(%url, status, bytes = body.len(), "Received response");
        decode(status, &body)
    }
}
