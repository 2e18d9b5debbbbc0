//! Error types for the ScyllaDB driver.

use prax_bundle::BundleError;
use thiserror::Error;

/// Result type for ScyllaDB driver operations.
pub type ScyllaResult<T> = Result<T, ScyllaError>;

/// Errors that can occur while assembling or talking to a ScyllaDB cluster.
#[derive(Error, Debug)]
pub enum ScyllaError {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Connection error.
    #[error("Connection error: {0}")]
    Connection(String),

    /// Query execution error.
    #[error("Query error: {0}")]
    Query(String),

    /// Timeout error.
    #[error("Operation timed out: {0}")]
    Timeout(String),

    /// Authentication error.
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// TLS setup error.
    #[error("TLS error: {0}")]
    Tls(String),

    /// The session has not been opened yet, or was shut down.
    #[error("Session is not started")]
    NotStarted,
}

impl ScyllaError {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }
}

// Conversion from scylla driver errors
impl From<scylla::transport::errors::NewSessionError> for ScyllaError {
    fn from(err: scylla::transport::errors::NewSessionError) -> Self {
        Self::Connection(err.to_string())
    }
}

impl From<scylla::transport::errors::QueryError> for ScyllaError {
    fn from(err: scylla::transport::errors::QueryError) -> Self {
        use scylla::transport::errors::{DbError, QueryError};

        match &err {
            QueryError::TimeoutError => Self::Timeout("Query timed out".into()),
            QueryError::DbError(DbError::AuthenticationError, msg) => {
                Self::Authentication(msg.clone())
            }
            QueryError::DbError(db_err, msg) => Self::Query(format!("{db_err}: {msg}")),
            _ => Self::Connection(err.to_string()),
        }
    }
}

#[cfg(feature = "ssl")]
impl From<openssl::error::ErrorStack> for ScyllaError {
    fn from(err: openssl::error::ErrorStack) -> Self {
        Self::Tls(err.to_string())
    }
}

// Conversion to the bundle's error type
impl From<ScyllaError> for BundleError {
    fn from(err: ScyllaError) -> Self {
        BundleError::driver(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scylla::transport::errors::{DbError, QueryError};

    #[test]
    fn test_query_error_conversion() {
        let err: ScyllaError = QueryError::TimeoutError.into();
        assert!(matches!(err, ScyllaError::Timeout(_)));

        let err: ScyllaError =
            QueryError::DbError(DbError::AuthenticationError, "bad credentials".into()).into();
        assert!(matches!(err, ScyllaError::Authentication(msg) if msg == "bad credentials"));

        let err: ScyllaError = QueryError::DbError(DbError::Overloaded, "busy".into()).into();
        assert!(matches!(err, ScyllaError::Query(_)));
    }

    #[test]
    fn test_into_bundle_error() {
        let err: BundleError = ScyllaError::NotStarted.into();
        assert!(matches!(err, BundleError::Driver(msg) if msg == "Session is not started"));
    }
}
