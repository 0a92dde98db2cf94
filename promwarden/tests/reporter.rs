//! Tests for the events a server reports.

mod common;

use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;
use promwarden::Prometheus;
use serde_json::json;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer};

use common::{Event, RecordingReporter, api_error, matrix, vector};

const MAX_RESOLUTION: &str = "exceeded maximum resolution of 11,000 points per timeseries";

fn recorded(uri: &str) -> (Prometheus, Arc<RecordingReporter>) {
    let reporter = Arc::new(RecordingReporter::default());
    let prom = Prometheus::builder("prom", uri)
        .reporter(reporter.clone())
        .build()
        .unwrap();
    (prom, reporter)
}

#[tokio::test]
async fn test_query_events() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/query"))
        .and(body_string_contains("query=up"))
        .respond_with(vector(json!([])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v1/query"))
        .respond_with(api_error(400, "bad_data", "parse error"))
        .mount(&server)
        .await;

    let (prom, reporter) = recorded(&server.uri());
    prom.query("up").await.unwrap();
    prom.query("up").await.unwrap();
    prom.query("sum(").await.unwrap_err();

    assert_eq!(
        reporter.events(),
        vec![
            Event::Query("/api/v1/query".to_owned()),
            Event::CacheHit("/api/v1/query".to_owned()),
            Event::Query("/api/v1/query".to_owned()),
            Event::Error("/api/v1/query".to_owned(), "api/bad_data".to_owned()),
        ]
    );
}

#[tokio::test]
async fn test_range_retry_events() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/query_range"))
        .respond_with(api_error(422, "bad_data", MAX_RESOLUTION))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v1/query_range"))
        .respond_with(matrix(json!([])))
        .mount(&server)
        .await;

    let (prom, reporter) = recorded(&server.uri());
    let lookback = Duration::from_secs(3600);
    let step = Duration::from_secs(60);
    prom.range_query("up", lookback, step).await.unwrap();
    prom.range_query("up", lookback, step).await.unwrap();

    let range = "/api/v1/query_range".to_owned();
    assert_eq!(
        reporter.events(),
        vec![
            Event::Query(range.clone()),
            Event::Error(range.clone(), "api/bad_data".to_owned()),
            Event::Query(range.clone()),
            Event::CacheHit(range),
        ]
    );
}
