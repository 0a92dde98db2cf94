//! Decoding of Prometheus HTTP API responses.
//!
//! Every endpoint wraps its payload in the same envelope:
//!
//! ```json
//! {"status": "success", "data": {...}}
//! {"status": "error", "errorType": "bad_data", "error": "parse error ..."}
//! ```
//!
//! Query endpoints additionally tag their payload with a `resultType`.
//! The decoders here check that tag and turn anything unexpected into a
//! [`QueryError`].

use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::error::{ApiErrorType, QueryError};
use crate::labels::Labels;
use crate::result::ResultType;
use crate::sample::{Sample, SamplePair, SampleStream};

#[derive(Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
enum Status {
    Success,
    Error,
}

#[derive(Debug, Deserialize)]
struct Envelope {
    status: Status,
    #[serde(default)]
    data: Option<serde_json::Value>,
    #[serde(default, rename = "errorType")]
    error_type: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct QueryData {
    #[serde(rename = "resultType")]
    result_type: ResultType,
    #[serde(default)]
    result: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct WireSample {
    metric: Labels,
    value: SamplePair,
}

#[derive(Debug, Deserialize)]
struct WireStream {
    metric: Labels,
    #[serde(default)]
    values: Vec<SamplePair>,
}

fn is_success(status: u16) -> bool {
    (200..300).contains(&status)
}

fn bad_response(message: impl std::fmt::Display) -> QueryError {
    QueryError::api(ApiErrorType::BadResponse, message.to_string())
}

/// Unwraps the response envelope and returns its `data` field.
///
/// `status` is the HTTP status code of the response. A non-2xx response
/// whose body is not an API error envelope is reported as
/// `server_error: server error: <code>` or `client_error: client error: <code>`.
pub fn decode_envelope(status: u16, body: &[u8]) -> Result<serde_json::Value, QueryError> {
    let envelope: Envelope = match serde_json::from_slice(body) {
        Ok(envelope) => envelope,
        Err(_) if !is_success(status) => return Err(QueryError::from_status(status)),
        Err(e) => return Err(bad_response(e)),
    };

    match envelope.status {
        Status::Error => {
            let error_type = match envelope.error_type {
                Some(error_type) => ApiErrorType::from(error_type.as_str()),
                None if status >= 500 => ApiErrorType::Server,
                None => ApiErrorType::Client,
            };
            Err(QueryError::Api {
                error_type,
                message: envelope.error.unwrap_or_default(),
            })
        }
        Status::Success if !is_success(status) => Err(QueryError::from_status(status)),
        Status::Success => envelope
            .data
            .ok_or_else(|| bad_response("response is missing the data field")),
    }
}

/// Decodes the payload of any endpoint into `T`.
pub fn decode_data<T: DeserializeOwned>(status: u16, body: &[u8]) -> Result<T, QueryError> {
    let data = decode_envelope(status, body)?;
    serde_json::from_value(data).map_err(bad_response)
}

fn decode_query(status: u16, body: &[u8], expected: ResultType) -> Result<serde_json::Value, QueryError> {
    let data: QueryData = decode_data(status, body)?;
    if data.result_type != expected {
        return Err(QueryError::UnknownResultType(data.result_type));
    }
    Ok(data.result)
}

/// Decodes an instant query response, which must hold a vector.
pub fn decode_vector(status: u16, body: &[u8]) -> Result<Vec<Sample>, QueryError> {
    let result = decode_query(status, body, ResultType::Vector)?;
    if result.is_null() {
        return Ok(Vec::new());
    }
    let series: Vec<WireSample> = serde_json::from_value(result).map_err(bad_response)?;
    Ok(series
        .into_iter()
        .map(|s| Sample {
            metric: s.metric,
            value: s.value.value,
            timestamp: s.value.timestamp,
        })
        .collect())
}

/// Decodes a range query response, which must hold a matrix.
pub fn decode_matrix(status: u16, body: &[u8]) -> Result<Vec<SampleStream>, QueryError> {
    let result = decode_query(status, body, ResultType::Matrix)?;
    if result.is_null() {
        return Ok(Vec::new());
    }
    let streams: Vec<WireStream> = serde_json::from_value(result).map_err(bad_response)?;
    Ok(streams
        .into_iter()
        .map(|s| SampleStream {
            metric: s.metric,
            values: s.values,
        })
        .collect())
}
