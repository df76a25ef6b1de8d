//! # Cache Errors

use thiserror::Error;

/// Error raised by a cache backend.
#[derive(Debug, Clone, Error)]
pub enum CacheError {
    /// Backend unreachable.
    #[error("cache connection error: {0}")]
    Connection(String),

    /// Value could not be encoded or decoded.
    #[error("cache serialization error: {0}")]
    Serialization(String),

    /// Backend rejected the command.
    #[error("cache backend error: {0}")]
    Backend(String),
}

impl CacheError {
    /// Creates a connection error.
    #[must_use]
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    /// Creates a serialization error.
    #[must_use]
    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::Serialization(msg.into())
    }

    /// Creates a backend error.
    #[must_use]
    pub fn backend(msg: impl Into<String>) -> Self {
        Self::Backend(msg.into())
    }
}

impl From<serde_json::Error> for CacheError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

/// Result type for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;
