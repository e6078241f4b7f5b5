//! Harness error types.

use std::time::Duration;

use thiserror::Error;

/// Errors raised by backends and by the harness itself.
///
/// Every variant is fatal to the enclosing benchmark run under the default
/// fail-fast policy.
#[derive(Debug, Error)]
pub enum Error {
    /// The backend could not be reached.
    #[error("connection error: {0}")]
    Connection(String),

    /// Schema, bucket or keyspace setup failed.
    #[error("provision error: {0}")]
    Provision(String),

    /// A single write failed.
    #[error("write error on key {key}: {cause}")]
    Write { key: String, cause: String },

    /// An add-if-absent write found the key already present.
    ///
    /// This points at a collision in the generated dataset, not at the backend.
    #[error("duplicate key {0}: generated dataset is not unique")]
    DuplicateKey(String),

    /// A single read failed.
    #[error("read error on key {key}: {cause}")]
    Read { key: String, cause: String },

    /// A read found no record under the key.
    #[error("key not found: {0}")]
    NotFound(String),

    /// A backend call exceeded the configured operation timeout.
    #[error("operation timed out after {0:?}")]
    Timeout(Duration),

    /// The prepared dataset cannot cover the requested iteration count.
    #[error("dataset holds {available} records but {requested} iterations were requested")]
    DatasetTooSmall { requested: u64, available: usize },

    /// Record encoding or decoding failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid configuration.
    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Build a write error from any displayable cause.
    pub fn write(key: &str, cause: impl std::fmt::Display) -> Self {
        Error::Write {
            key: key.to_string(),
            cause: cause.to_string(),
        }
    }

    /// Build a read error from any displayable cause.
    pub fn read(key: &str, cause: impl std::fmt::Display) -> Self {
        Error::Read {
            key: key.to_string(),
            cause: cause.to_string(),
        }
    }
}

/// Result alias for harness operations.
pub type Result<T> = std::result::Result<T, Error>;
