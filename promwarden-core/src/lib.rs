#![warn(missing_docs)]
//! # promwarden-core
//!
//! Core types and traits for the promwarden Prometheus query client.
//!
//! This crate holds everything that does not need a network stack:
//!
//! - **Results** returned to rule checks ([`QueryResult`], [`RangeQueryResult`],
//!   [`ConfigResult`], [`FlagsResult`])
//! - **Wire decoding** of the Prometheus HTTP API envelope ([`response`])
//! - **Errors** and their classification ([`QueryError`], [`ErrorKind`])
//! - **Retry policies** deciding how far a failing range query shrinks ([`RetryPolicy`])
//! - **Cache** abstraction implemented by storage crates such as `promwarden-moka`
//!   ([`Cache`], [`CacheKey`])

pub mod cache;
pub mod error;
pub mod key;
pub mod labels;
pub mod response;
pub mod result;
pub mod retry;
pub mod sample;

pub use cache::{Cache, DeleteStatus, MemorySize};
pub use error::{ApiErrorType, ErrorKind, QueryError};
pub use key::CacheKey;
pub use labels::Labels;
pub use result::{ConfigResult, FlagsResult, GlobalConfig, QueryResult, RangeQueryResult, ResultType};
pub use retry::{NeverRetry, RangeLimitPolicy, RetryPolicy};
pub use sample::{Sample, SamplePair, SampleStream, Timestamp};
