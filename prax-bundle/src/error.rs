//! Error types for bundle configuration, construction and lifecycle.

// These warnings are false positives - the fields are used by derive macros
#![allow(unused_assignments)]

use std::time::Duration;

use miette::Diagnostic;
use thiserror::Error;

/// Result type for bundle operations.
pub type BundleResult<T> = Result<T, BundleError>;

/// Errors that can occur while configuring, building or managing a cluster client.
#[derive(Error, Debug, Diagnostic)]
pub enum BundleError {
    /// The configuration violated one or more constraints.
    #[error("invalid cluster configuration: {}", violations.join("; "))]
    #[diagnostic(
        code(prax::bundle::validation),
        help("fix every listed field before the client is built")
    )]
    Validation {
        /// Every violated constraint, in field order.
        violations: Vec<String>,
    },

    /// The configuration file could not be parsed.
    #[error("failed to parse cluster configuration")]
    #[diagnostic(code(prax::bundle::parse))]
    Parse {
        /// Underlying TOML error.
        #[source]
        source: toml::de::Error,
    },

    /// A file could not be read.
    #[error("failed to read file: {path}")]
    #[diagnostic(code(prax::bundle::io))]
    Io {
        /// File that failed.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A certificate file did not contain a usable certificate.
    #[error("invalid certificate in {path}: {message}")]
    #[diagnostic(code(prax::bundle::certificate))]
    Certificate {
        /// Certificate file.
        path: String,
        /// What was wrong with it.
        message: String,
    },

    /// A node address could not be parsed.
    #[error("invalid node address `{address}`: {message}")]
    #[diagnostic(code(prax::bundle::address))]
    InvalidAddress {
        /// Address as configured.
        address: String,
        /// What was wrong with it.
        message: String,
    },

    /// The wrapped database client reported an error.
    #[error("cluster driver error: {0}")]
    #[diagnostic(code(prax::bundle::driver))]
    Driver(String),

    /// The cluster did not finish shutting down within the allowed time.
    #[error("cluster shutdown did not complete within {0:?}")]
    #[diagnostic(code(prax::bundle::shutdown_timeout))]
    ShutdownTimeout(Duration),

    /// A lifecycle transition was not allowed.
    #[error("lifecycle error: {0}")]
    #[diagnostic(code(prax::bundle::lifecycle))]
    Lifecycle(String),
}

impl BundleError {
    /// Create a validation error from a list of violations.
    pub fn validation(violations: Vec<String>) -> Self {
        Self::Validation { violations }
    }

    /// Create a driver error.
    pub fn driver(msg: impl Into<String>) -> Self {
        Self::Driver(msg.into())
    }

    /// Create a certificate error.
    pub fn certificate(path: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Certificate {
            path: path.into(),
            message: msg.into(),
        }
    }

    /// Create an address error.
    pub fn address(address: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::InvalidAddress {
            address: address.into(),
            message: msg.into(),
        }
    }

    /// Check if the error was raised before any network resource was touched.
    #[must_use]
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            Self::Validation { .. } | Self::Parse { .. } | Self::InvalidAddress { .. }
        )
    }

    /// Violations carried by a validation error, empty for every other kind.
    #[must_use]
    pub fn violations(&self) -> &[String] {
        match self {
            Self::Validation { violations } => violations,
            _ => &[],
        }
    }
}
