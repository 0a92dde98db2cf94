//! Samples as returned by instant and range queries.
//!
//! Prometheus encodes every sample as a `[<unix seconds>, "<value>"]` pair.
//! Timestamps carry millisecond precision and values are strings so that
//! `NaN` and the infinities survive JSON.

use std::fmt;

use chrono::{DateTime, TimeZone, Utc};
use serde::ser::{SerializeStruct, SerializeTuple};
use serde::{Deserialize, Serialize, Serializer};
use smol_str::SmolStr;

use crate::cache::MemorySize;
use crate::labels::Labels;

/// Millisecond precision timestamp, as used by Prometheus.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(i64);

impl Timestamp {
    /// Creates a timestamp from milliseconds since the Unix epoch.
    pub const fn from_millis(millis: i64) -> Self {
        Self(millis)
    }

    /// Creates a timestamp from fractional seconds since the Unix epoch.
    ///
    /// The value is rounded to the nearest millisecond, so `1614859502.068`
    /// becomes exactly `1614859502068`.
    pub fn from_seconds(seconds: f64) -> Self {
        Self((seconds * 1000.0).round() as i64)
    }

    /// Milliseconds since the Unix epoch.
    pub const fn as_millis(&self) -> i64 {
        self.0
    }

    /// Converts to a UTC date time.
    pub fn to_datetime(&self) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(self.0)
            .single()
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(value: DateTime<Utc>) -> Self {
        Self(value.timestamp_millis())
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:03}", self.0.div_euclid(1000), self.0.rem_euclid(1000))
    }
}

/// Parses a sample value string.
///
/// Accepts everything Prometheus emits, including `NaN`, `+Inf` and `-Inf`.
pub fn parse_value(raw: &str) -> Result<f64, String> {
    match raw {
        "NaN" => Ok(f64::NAN),
        "+Inf" | "Inf" => Ok(f64::INFINITY),
        "-Inf" => Ok(f64::NEG_INFINITY),
        other => other
            .parse::<f64>()
            .map_err(|e| format!("invalid sample value {other:?}: {e}")),
    }
}

/// Formats a sample value the way Prometheus writes it.
pub fn format_value(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_owned()
    } else if value == f64::INFINITY {
        "+Inf".to_owned()
    } else if value == f64::NEG_INFINITY {
        "-Inf".to_owned()
    } else {
        value.to_string()
    }
}

/// A single `(timestamp, value)` point of a range query series.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(try_from = "RawPair")]
pub struct SamplePair {
    /// When the value was evaluated.
    pub timestamp: Timestamp,
    /// The evaluated value.
    pub value: f64,
}

/// Wire representation of a sample pair.
#[derive(Deserialize)]
struct RawPair(f64, SmolStr);

impl TryFrom<RawPair> for SamplePair {
    type Error = String;

    fn try_from(RawPair(seconds, value): RawPair) -> Result<Self, Self::Error> {
        Ok(Self {
            timestamp: Timestamp::from_seconds(seconds),
            value: parse_value(&value)?,
        })
    }
}

impl Serialize for SamplePair {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut pair = serializer.serialize_tuple(2)?;
        pair.serialize_element(&(self.timestamp.as_millis() as f64 / 1000.0))?;
        pair.serialize_element(&format_value(self.value))?;
        pair.end()
    }
}

/// One series of an instant query result.
///
/// Serializes in the wire shape, `{"metric": {..}, "value": [ts, "v"]}`.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    /// Labels of the series.
    pub metric: Labels,
    /// Value at evaluation time.
    pub value: f64,
    /// Evaluation timestamp.
    pub timestamp: Timestamp,
}

/// One series of a range query result, with its points in time order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SampleStream {
    /// Labels of the series.
    pub metric: Labels,
    /// Points ordered by timestamp.
    pub values: Vec<SamplePair>,
}

impl Serialize for Sample {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut sample = serializer.serialize_struct("Sample", 2)?;
        sample.serialize_field("metric", &self.metric)?;
        sample.serialize_field(
            "value",
            &SamplePair {
                timestamp: self.timestamp,
                value: self.value,
            },
        )?;
        sample.end()
    }
}

impl MemorySize for Sample {
    fn memory_size(&self) -> usize {
        std::mem::size_of::<Self>() + self.metric.memory_size()
    }
}

impl MemorySize for SampleStream {
    fn memory_size(&self) -> usize {
        std::mem::size_of::<Self>()
            + self.metric.memory_size()
            + self.values.len() * std::mem::size_of::<SamplePair>()
    }
}
