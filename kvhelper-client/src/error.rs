//! Error types for the kvhelper client.

use kvhelper_core::StoreError;
use thiserror::Error;

/// Errors that can occur when using the kvhelper client.
#[derive(Error, Debug)]
pub enum Error {
    /// Failed to connect to the server
    #[error("Connection error: {0}")]
    Connection(String),

    /// Connecting or waiting for a reply took too long
    #[error("Timed out: {0}")]
    Timeout(String),

    /// Client options could not be built from the supplied configuration
    #[error("Invalid options: {0}")]
    InvalidOptions(String),

    /// The key holds a different kind of value than the command expects
    #[error("Wrong type: {0}")]
    WrongType(String),

    /// The key pattern was rejected
    #[error("Invalid key pattern: {0}")]
    InvalidPattern(String),

    /// Any other error reported by the Redis client
    #[error("Redis error: {0}")]
    Redis(#[source] redis::RedisError),

    /// JSON serialization error (requires `json` feature)
    #[cfg(feature = "json")]
    #[error("Serialization error: {0}")]
    Serialization(#[source] serde_json::Error),

    /// JSON deserialization error (requires `json` feature)
    #[cfg(feature = "json")]
    #[error("Deserialization error: {0}")]
    Deserialization(#[source] serde_json::Error),
}

impl Error {
    /// Returns `true` if the key held a different kind of value.
    pub fn is_wrong_type(&self) -> bool {
        matches!(self, Error::WrongType(_))
    }

    /// Returns `true` if the error is a connect or response timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Timeout(_))
    }
}

impl From<redis::RedisError> for Error {
    /// Maps WRONGTYPE replies and timeouts to their own variants
    fn from(err: redis::RedisError) -> Self {
        if err.code() == Some("WRONGTYPE") {
            Error::WrongType(err.detail().unwrap_or("wrong kind of value").to_string())
        } else if err.is_timeout() {
            Error::Timeout(err.to_string())
        } else if err.is_connection_refusal() || err.is_connection_dropped() {
            Error::Connection(err.to_string())
        } else {
            Error::Redis(err)
        }
    }
}

impl From<StoreError> for Error {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::WrongType { .. } => Error::WrongType(err.to_string()),
            StoreError::InvalidPattern { .. } => Error::InvalidPattern(err.to_string()),
        }
    }
}
