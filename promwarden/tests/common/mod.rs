//! Shared helpers for integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use promwarden::{NoopReporter, Prometheus, QueryError, QueryReporter};
use serde_json::{Value, json};
use wiremock::{Request, ResponseTemplate};

/// Number of callers racing for the same query.
pub const CALLERS: usize = 5;

pub fn prometheus(uri: &str) -> Prometheus {
    prometheus_with_timeout(uri, Duration::from_secs(5))
}

pub fn prometheus_with_timeout(uri: &str, timeout: Duration) -> Prometheus {
    Prometheus::builder("prom", uri)
        .timeout(timeout)
        .reporter(Arc::new(NoopReporter))
        .build()
        .unwrap()
}

pub fn vector(result: Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "status": "success",
        "data": {"resultType": "vector", "result": result}
    }))
}

pub fn matrix(result: Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "status": "success",
        "data": {"resultType": "matrix", "result": result}
    }))
}

pub fn api_error(status: u16, error_type: &str, error: &str) -> ResponseTemplate {
    ResponseTemplate::new(status).set_body_json(json!({
        "status": "error",
        "errorType": error_type,
        "error": error
    }))
}

/// Decodes the form body of a query request.
pub fn form(request: &Request) -> HashMap<String, String> {
    serde_urlencoded::from_bytes(&request.body).unwrap()
}

/// Width in whole seconds of the window requested by a range query.
pub fn requested_window(request: &Request) -> u64 {
    let params = form(request);
    let start: f64 = params["start"].parse().unwrap();
    let end: f64 = params["end"].parse().unwrap();
    (end - start).round() as u64
}

/// Reporter event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Query(String),
    CacheHit(String),
    Error(String, String),
}

/// Reporter remembering every event in order.
#[derive(Debug, Default)]
pub struct RecordingReporter {
    events: Mutex<Vec<Event>>,
}

impl RecordingReporter {
    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }
}

impl QueryReporter for RecordingReporter {
    fn query(&self, _name: &str, endpoint: &str) {
        self.events
            .lock()
            .unwrap()
            .push(Event::Query(endpoint.to_owned()));
    }

    fn cache_hit(&self, _name: &str, endpoint: &str) {
        self.events
            .lock()
            .unwrap()
            .push(Event::CacheHit(endpoint.to_owned()));
    }

    fn error(&self, _name: &str, endpoint: &str, error: &QueryError) {
        self.events
            .lock()
            .unwrap()
            .push(Event::Error(endpoint.to_owned(), error.reason().to_string()));
    }
}
