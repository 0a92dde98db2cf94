//! Errors surfaced to callers.

use std::fmt;

use promwarden_core::{ErrorKind, QueryError};
use smol_str::SmolStr;
use thiserror::Error;

/// A query error attributed to the server that produced it.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("\"{name}\" at {uri} failed with: {source}")]
pub struct BackendError {
    /// Configured server name.
    pub name: SmolStr,
    /// URI of the failing server.
    pub uri: String,
    /// The classified failure.
    #[source]
    pub source: QueryError,
}

impl BackendError {
    /// Classification of the underlying failure.
    pub fn kind(&self) -> ErrorKind {
        self.source.kind()
    }
}

/// Every member of a server group failed.
///
/// Holds one [`BackendError`] per member, in the order they were tried.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupError {
    /// Name of the group.
    pub name: SmolStr,
    /// Member errors in the order members were tried.
    pub errors: Vec<BackendError>,
}

impl GroupError {
    /// Returns the error of the last member tried.
    pub fn last(&self) -> Option<&BackendError> {
        self.errors.last()
    }

    /// Classification of the last failure, if any member was tried.
    pub fn kind(&self) -> Option<ErrorKind> {
        self.last().map(BackendError::kind)
    }
}

impl fmt::Display for GroupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.errors.is_empty() {
            return write!(f, "\"{}\" has no servers", self.name);
        }
        for (i, error) in self.errors.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{error}")?;
        }
        Ok(())
    }
}

impl std::error::Error for GroupError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.last().map(|e| e as &(dyn std::error::Error + 'static))
    }
}

impl From<BackendError> for GroupError {
    fn from(error: BackendError) -> Self {
        Self {
            name: error.name.clone(),
            errors: vec![error],
        }
    }
}

/// Invalid server configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration could not be parsed.
    #[error("invalid configuration: {0}")]
    Parse(String),

    /// A server has an empty name.
    #[error("server name cannot be empty")]
    EmptyName,

    /// A server URI is not a valid URL.
    #[error("invalid URI {uri:?}: {message}")]
    InvalidUri {
        /// The offending URI.
        uri: String,
        /// Why it was rejected.
        message: String,
    },

    /// A configured header name or value is not valid HTTP.
    #[error("invalid header {name:?}: {message}")]
    InvalidHeader {
        /// Header name.
        name: String,
        /// Why it was rejected.
        message: String,
    },

    /// The HTTP client could not be created.
    #[error("failed to create HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn backend_error(name: &str, uri: &str, source: QueryError) -> BackendError {
        BackendError {
            name: name.into(),
            uri: uri.to_owned(),
            source,
        }
    }

    #[test]
    fn test_backend_error_message() {
        let err = backend_error(
            "prom",
            "http://localhost:9090",
            QueryError::from_status(500),
        );
        assert_eq!(
            err.to_string(),
            r#""prom" at http://localhost:9090 failed with: server_error: server error: 500"#
        );
        assert_eq!(err.kind(), ErrorKind::ServerError);
    }

    #[test]
    fn test_group_error_lists_members() {
        let err = GroupError {
            name: "prom".into(),
            errors: vec![
                backend_error("prom", "http://a", QueryError::from_status(502)),
                backend_error("prom", "http://b", QueryError::api("bad_data", "parse error")),
            ],
        };
        assert_eq!(
            err.to_string(),
            r#""prom" at http://a failed with: server_error: server error: 502; "prom" at http://b failed with: bad_data: parse error"#
        );
        assert_eq!(err.kind(), Some(ErrorKind::BadData));
    }
}
