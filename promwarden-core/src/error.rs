//! Query errors and their classification.
//!
//! Every failure of a query ends up as a [`QueryError`]. Rule checks match
//! on [`QueryError::kind`] to decide how to report a problem, and metrics use
//! [`QueryError::reason`] as a stable label value.

use std::fmt;

use smol_str::SmolStr;
use thiserror::Error;

use crate::result::ResultType;

/// Coarse classification of a failed query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The query itself is wrong; repeating it will not help.
    BadData,
    /// The server failed or could not be reached.
    ServerError,
    /// No response arrived before the deadline.
    Timeout,
    /// The server answered with a result of the wrong shape.
    UnknownResultType,
    /// A range query was shrunk until it could not be shrunk any more.
    RetryExhausted,
}

impl ErrorKind {
    /// Returns a stable name for this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BadData => "bad-data",
            Self::ServerError => "server-error",
            Self::Timeout => "timeout",
            Self::UnknownResultType => "unknown-result-type",
            Self::RetryExhausted => "retry-exhausted",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The `errorType` reported by the Prometheus HTTP API.
///
/// `Server` and `Client` are synthesized for non-2xx responses without a
/// decodable error body.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ApiErrorType {
    /// `bad_data`
    BadData,
    /// `timeout`
    Timeout,
    /// `canceled`
    Canceled,
    /// `execution`
    Execution,
    /// `bad_response`
    BadResponse,
    /// `internal`
    Internal,
    /// `unavailable`
    Unavailable,
    /// `not_found`
    NotFound,
    /// `server_error`
    Server,
    /// `client_error`
    Client,
    /// Anything else a server may send.
    Other(SmolStr),
}

impl ApiErrorType {
    /// Returns the name used on the wire.
    pub fn as_str(&self) -> &str {
        match self {
            Self::BadData => "bad_data",
            Self::Timeout => "timeout",
            Self::Canceled => "canceled",
            Self::Execution => "execution",
            Self::BadResponse => "bad_response",
            Self::Internal => "internal",
            Self::Unavailable => "unavailable",
            Self::NotFound => "not_found",
            Self::Server => "server_error",
            Self::Client => "client_error",
            Self::Other(other) => other,
        }
    }
}

impl From<&str> for ApiErrorType {
    fn from(value: &str) -> Self {
        match value {
            "bad_data" => Self::BadData,
            "timeout" => Self::Timeout,
            "canceled" => Self::Canceled,
            "execution" => Self::Execution,
            "bad_response" => Self::BadResponse,
            "internal" => Self::Internal,
            "unavailable" => Self::Unavailable,
            "not_found" => Self::NotFound,
            "server_error" => Self::Server,
            "client_error" => Self::Client,
            other => Self::Other(SmolStr::new(other)),
        }
    }
}

impl fmt::Display for ApiErrorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failed query against a single server.
///
/// Messages are stable so rule checks can embed them in problem reports.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum QueryError {
    /// The server answered with an API error or a non-2xx status.
    #[error("{error_type}: {message}")]
    Api {
        /// Error type reported by the server.
        error_type: ApiErrorType,
        /// Error message reported by the server.
        message: String,
    },

    /// The request did not complete before the deadline.
    #[error("{method} \"{url}\": context deadline exceeded")]
    Timeout {
        /// HTTP method, `Post` or `Get`.
        method: &'static str,
        /// URL of the request.
        url: String,
    },

    /// The request could not be sent or the response could not be read.
    #[error("{method} \"{url}\": {message}")]
    Connection {
        /// HTTP method, `Post` or `Get`.
        method: &'static str,
        /// URL of the request.
        url: String,
        /// Transport error description.
        message: String,
    },

    /// The response had a valid envelope but the wrong result shape.
    #[error("unknown result type: {0}")]
    UnknownResultType(ResultType),

    /// A range query could not be shrunk below twice its step.
    #[error("no more retries possible")]
    RetryExhausted {
        /// The error returned by the last attempt.
        #[source]
        last: Box<QueryError>,
    },
}

impl QueryError {
    /// Creates an API error.
    pub fn api(error_type: impl Into<ApiErrorType>, message: impl Into<String>) -> Self {
        Self::Api {
            error_type: error_type.into(),
            message: message.into(),
        }
    }

    /// Error for a non-2xx response without a usable body.
    pub fn from_status(status: u16) -> Self {
        if status >= 500 {
            Self::api(ApiErrorType::Server, format!("server error: {status}"))
        } else {
            Self::api(ApiErrorType::Client, format!("client error: {status}"))
        }
    }

    /// Classifies this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Api { error_type, .. } => match error_type {
                ApiErrorType::BadData | ApiErrorType::Client | ApiErrorType::NotFound => {
                    ErrorKind::BadData
                }
                ApiErrorType::Timeout => ErrorKind::Timeout,
                _ => ErrorKind::ServerError,
            },
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::Connection { .. } => ErrorKind::ServerError,
            Self::UnknownResultType(_) => ErrorKind::UnknownResultType,
            Self::RetryExhausted { .. } => ErrorKind::RetryExhausted,
        }
    }

    /// Label value used when counting this error.
    pub fn reason(&self) -> SmolStr {
        match self {
            Self::Api { error_type, .. } => smol_str::format_smolstr!("api/{error_type}"),
            Self::Timeout { .. } => SmolStr::new_static("connection/timeout"),
            Self::Connection { .. } => SmolStr::new_static("connection/error"),
            Self::UnknownResultType(_) => SmolStr::new_static("unknown result type"),
            Self::RetryExhausted { .. } => SmolStr::new_static("retry exhausted"),
        }
    }

    /// Returns `true` when the server could not be reached at all.
    ///
    /// Failover groups log these at a lower level since moving on to the
    /// next member is the expected outcome.
    pub fn is_unavailable(&self) -> bool {
        matches!(
            self,
            Self::Connection { .. }
                | Self::Api {
                    error_type: ApiErrorType::Unavailable,
                    ..
                }
        )
    }
}
