//! Range query tests against a mocked Prometheus.

mod common;

use std::time::Duration;

use futures::future::join_all;
use pretty_assertions::assert_eq;
use promwarden::ErrorKind;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

use common::{CALLERS, api_error, form, matrix, prometheus, requested_window, vector};

const HOUR: Duration = Duration::from_secs(3600);
const MINUTE: Duration = Duration::from_secs(60);

const MAX_RESOLUTION: &str = "exceeded maximum resolution of 11,000 points per timeseries. Try decreasing the query resolution (?step=XX)";
const TOO_MANY_SAMPLES: &str =
    "query processing would load too many samples into memory in query execution";

fn one_series() -> serde_json::Value {
    json!([
        {"metric": {"instance": "1"}, "values": [[1614859502, "1"], [1614859562, "2"]]}
    ])
}

/// Refuses every window wider than `max_window` seconds.
struct RangeLimit {
    max_window: u64,
    error_type: &'static str,
    error: &'static str,
}

impl RangeLimit {
    fn max_resolution(max_window: u64) -> Self {
        Self {
            max_window,
            error_type: "bad_data",
            error: MAX_RESOLUTION,
        }
    }
}

impl Respond for RangeLimit {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        if requested_window(request) > self.max_window {
            api_error(422, self.error_type, self.error)
        } else {
            matrix(one_series())
        }
    }
}

async fn requested_windows(server: &MockServer) -> Vec<(String, u64)> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .map(|request| (form(request)["query"].clone(), requested_window(request)))
        .collect()
}

#[tokio::test(flavor = "multi_thread")]
async fn test_success_is_shared() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/query_range"))
        .respond_with(matrix(one_series()))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v1/query_range"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let prom = prometheus(&server.uri());
    let results =
        join_all((0..CALLERS).map(|_| prom.range_query("once", HOUR, MINUTE))).await;

    let results: Vec<_> = results.into_iter().map(Result::unwrap).collect();
    for result in &results {
        assert_eq!(result, &results[0]);
        assert_eq!(result.uri, server.uri());
        assert_eq!(result.window(), HOUR);
        assert_eq!(result.samples.len(), 1);
        assert_eq!(result.samples[0].values.len(), 2);
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn test_every_caller_sees_errors() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/query_range"))
        .respond_with(ResponseTemplate::new(500))
        .expect(CALLERS as u64)
        .mount(&server)
        .await;

    let prom = prometheus(&server.uri());
    let results =
        join_all((0..CALLERS).map(|_| prom.range_query("always", HOUR, MINUTE))).await;

    for result in results {
        let err = result.unwrap_err();
        assert_eq!(err.to_string(), "server_error: server error: 500");
        assert_eq!(err.kind(), ErrorKind::ServerError);
    }
}

#[tokio::test]
async fn test_shrinks_and_remembers_window() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/query_range"))
        .respond_with(RangeLimit::max_resolution(2000))
        .mount(&server)
        .await;

    let prom = prometheus(&server.uri());

    let result = prom.range_query("slow", HOUR, MINUTE).await.unwrap();
    assert_eq!(result.window(), HOUR / 2);
    assert_eq!(
        requested_windows(&server).await,
        vec![("slow".to_owned(), 3600), ("slow".to_owned(), 1800)]
    );

    // A different lookback misses the cache but starts from the remembered window.
    let result = prom.range_query("slow", 2 * HOUR, MINUTE).await.unwrap();
    assert_eq!(result.window(), HOUR / 2);
    assert_eq!(requested_windows(&server).await.len(), 3);
    assert_eq!(requested_windows(&server).await[2], ("slow".to_owned(), 1800));

    // The remembered window never widens a shorter query.
    let result = prom.range_query("slow", 10 * MINUTE, MINUTE).await.unwrap();
    assert_eq!(result.window(), 10 * MINUTE);

    // Other expressions are not affected.
    let result = prom.range_query("fast", 2 * HOUR, MINUTE).await.unwrap();
    assert_eq!(result.window(), HOUR / 2);
    let windows: Vec<_> = requested_windows(&server)
        .await
        .into_iter()
        .filter(|(query, _)| query == "fast")
        .map(|(_, window)| window)
        .collect();
    assert_eq!(windows, vec![7200, 3600, 1800]);
}

#[tokio::test]
async fn test_too_many_samples_shrinks_by_quarter() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/query_range"))
        .respond_with(RangeLimit {
            max_window: 3000,
            error_type: "execution",
            error: TOO_MANY_SAMPLES,
        })
        .expect(2)
        .mount(&server)
        .await;

    let prom = prometheus(&server.uri());
    let result = prom.range_query("samples", HOUR, MINUTE).await.unwrap();
    assert_eq!(result.window(), Duration::from_secs(2700));
}

#[tokio::test]
async fn test_retry_exhausted() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/query_range"))
        .respond_with(api_error(422, "bad_data", MAX_RESOLUTION))
        .expect(2)
        .mount(&server)
        .await;

    let prom = prometheus(&server.uri());
    // 3600s fails, 1800s fails, 900s is less than two 600s steps.
    let err = prom
        .range_query("huge", HOUR, 10 * MINUTE)
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "no more retries possible");
    assert_eq!(err.kind(), ErrorKind::RetryExhausted);

    let source = std::error::Error::source(&err).unwrap();
    assert_eq!(source.to_string(), format!("bad_data: {MAX_RESOLUTION}"));
}

#[tokio::test]
async fn test_failed_windows_are_not_remembered() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/query_range"))
        .respond_with(api_error(422, "bad_data", MAX_RESOLUTION))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v1/query_range"))
        .respond_with(matrix(one_series()))
        .mount(&server)
        .await;

    let prom = prometheus(&server.uri());
    let err = prom
        .range_query("huge", HOUR, 10 * MINUTE)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::RetryExhausted);

    let result = prom
        .range_query("huge", 2 * HOUR, 10 * MINUTE)
        .await
        .unwrap();
    assert_eq!(result.window(), 2 * HOUR);
    let windows: Vec<_> = requested_windows(&server)
        .await
        .into_iter()
        .map(|(_, window)| window)
        .collect();
    assert_eq!(windows, vec![3600, 1800, 7200]);
}

#[tokio::test]
async fn test_other_errors_are_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/query_range"))
        .respond_with(api_error(400, "bad_data", "1:1: parse error: unexpected end of input"))
        .expect(1)
        .mount(&server)
        .await;

    let prom = prometheus(&server.uri());
    let err = prom.range_query("sum(", HOUR, MINUTE).await.unwrap_err();
    assert_eq!(
        err.to_string(),
        "bad_data: 1:1: parse error: unexpected end of input"
    );
    assert_eq!(err.kind(), ErrorKind::BadData);
}

#[tokio::test]
async fn test_vector_is_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/query_range"))
        .respond_with(vector(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let prom = prometheus(&server.uri());
    let err = prom.range_query("vector", HOUR, MINUTE).await.unwrap_err();
    assert_eq!(err.to_string(), "unknown result type: vector");
    assert_eq!(err.kind(), ErrorKind::UnknownResultType);
}

#[tokio::test]
async fn test_request_parameters() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/query_range"))
        .respond_with(matrix(json!([])))
        .mount(&server)
        .await;

    let prom = prometheus(&server.uri());
    let result = prom
        .range_query("rate(http_requests_total[5m])", HOUR, MINUTE)
        .await
        .unwrap();
    assert!(result.samples.is_empty());

    let requests = server.received_requests().await.unwrap();
    let params = form(&requests[0]);
    assert_eq!(params["query"], "rate(http_requests_total[5m])");
    assert_eq!(params["step"].parse::<f64>().unwrap(), 60.0);
    assert_eq!(requested_window(&requests[0]), 3600);
    assert_eq!(
        requests[0].headers.get("content-type").unwrap(),
        "application/x-www-form-urlencoded"
    );
}
