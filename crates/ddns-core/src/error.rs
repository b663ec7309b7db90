//! Error types for the DDNS system
//!
//! The variants mirror how far a failure reaches: `Config` and
//! `Connectivity` abort the whole run, while `Api` and `AmbiguousState`
//! are scoped to a single record and never stop the loop.

use crate::traits::{ApiOperation, RecordType};
use thiserror::Error;

/// Result type alias for DDNS operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the DDNS system
#[derive(Error, Debug)]
pub enum Error {
    /// Missing credentials, no records, or a bootstrap write failure
    #[error("Configuration error: {0}")]
    Config(String),

    /// Neither address family could be detected
    #[error("Connectivity error: {0}")]
    Connectivity(String),

    /// The provider rejected a call, answered with an unexpected shape,
    /// or could not be reached after all retries
    #[error("API error during {operation}: {cause}")]
    Api {
        /// Which endpoint was being called
        operation: ApiOperation,
        /// Short human-readable cause
        cause: String,
        /// Raw response body, kept for diagnosis
        detail: Option<String>,
    },

    /// More than one remote record matched a single target
    #[error("Ambiguous state: {count} {record_type} records match {fqdn}")]
    AmbiguousState {
        /// Display name of the target
        fqdn: String,
        /// Record type that was queried
        record_type: RecordType,
        /// Number of matches returned by the provider
        count: usize,
    },

    /// Filesystem errors (config bootstrap, run log)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP client construction errors
    #[error("HTTP error: {0}")]
    Http(String),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a connectivity error
    pub fn connectivity(msg: impl Into<String>) -> Self {
        Self::Connectivity(msg.into())
    }

    /// Create a provider API error
    pub fn api(operation: ApiOperation, cause: impl Into<String>, detail: Option<String>) -> Self {
        Self::Api {
            operation,
            cause: cause.into(),
            detail,
        }
    }

    /// Create an HTTP error
    pub fn http(msg: impl Into<String>) -> Self {
        Self::Http(msg.into())
    }

    /// Whether this error aborts the whole run rather than a single record
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Config(_) | Self::Connectivity(_))
    }
}

/// Helper for converting anyhow::Error to our Error type
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}
