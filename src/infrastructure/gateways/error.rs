//! # Gateway Errors
//!
//! Error types for payment gateway and outbound HTTP operations.
//!
//! # Examples
//!
//! ```
//! use eventos::infrastructure::gateways::error::GatewayError;
//!
//! let error = GatewayError::timeout("charge timed out after 5000ms");
//! assert!(error.is_retryable());
//!
//! let error = GatewayError::declined("insufficient funds", Some("51".to_string()));
//! assert!(!error.is_retryable());
//! ```

use thiserror::Error;

/// Error type for payment gateway operations.
#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    /// Request timed out.
    #[error("gateway timeout: {message}")]
    Timeout {
        /// Error message.
        message: String,
    },

    /// Network or connection error, including provider 5xx responses.
    #[error("gateway connection error: {message}")]
    Connection {
        /// Error message.
        message: String,
    },

    /// Credentials refused by the provider.
    #[error("gateway authentication error: {message}")]
    Authentication {
        /// Error message.
        message: String,
    },

    /// Provider rate limit exceeded.
    #[error("gateway rate limit exceeded: {message}")]
    RateLimited {
        /// Error message.
        message: String,
        /// Retry after duration in milliseconds.
        retry_after_ms: Option<u64>,
    },

    /// Provider rejected the request parameters.
    #[error("gateway invalid request: {message}")]
    InvalidRequest {
        /// Error message.
        message: String,
    },

    /// Issuer or provider declined the operation.
    #[error("gateway declined: {message}")]
    Declined {
        /// Error message.
        message: String,
        /// Provider decline code.
        code: Option<String>,
    },

    /// Webhook signature missing, malformed or not matching the body.
    #[error("invalid webhook signature: {message}")]
    InvalidSignature {
        /// Error message.
        message: String,
    },

    /// Response could not be decoded.
    #[error("gateway protocol error: {message}")]
    Protocol {
        /// Error message.
        message: String,
    },

    /// Local failure building or sending a request.
    #[error("gateway internal error: {message}")]
    Internal {
        /// Error message.
        message: String,
    },
}

impl GatewayError {
    /// Creates a timeout error.
    #[must_use]
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::Timeout {
            message: message.into(),
        }
    }

    /// Creates a connection error.
    #[must_use]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Creates an authentication error.
    #[must_use]
    pub fn authentication(message: impl Into<String>) -> Self {
        Self::Authentication {
            message: message.into(),
        }
    }

    /// Creates a rate limited error.
    #[must_use]
    pub fn rate_limited(message: impl Into<String>, retry_after_ms: Option<u64>) -> Self {
        Self::RateLimited {
            message: message.into(),
            retry_after_ms,
        }
    }

    /// Creates an invalid request error.
    #[must_use]
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    /// Creates a decline.
    #[must_use]
    pub fn declined(message: impl Into<String>, code: Option<String>) -> Self {
        Self::Declined {
            message: message.into(),
            code,
        }
    }

    /// Creates an invalid signature error.
    #[must_use]
    pub fn invalid_signature(message: impl Into<String>) -> Self {
        Self::InvalidSignature {
            message: message.into(),
        }
    }

    /// Creates a protocol error.
    #[must_use]
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns true if this error is transient and may succeed on retry.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Timeout { .. } | Self::Connection { .. } | Self::RateLimited { .. }
        )
    }

    /// Returns true if the caller sent something the provider will never
    /// accept.
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidRequest { .. }
                | Self::Authentication { .. }
                | Self::InvalidSignature { .. }
        )
    }

    /// Returns the retry delay in milliseconds, if the provider sent one.
    #[must_use]
    pub fn retry_after_ms(&self) -> Option<u64> {
        match self {
            Self::RateLimited { retry_after_ms, .. } => *retry_after_ms,
            _ => None,
        }
    }

    /// Returns the decline code, if any.
    #[must_use]
    pub fn decline_code(&self) -> Option<&str> {
        match self {
            Self::Declined { code, .. } => code.as_deref(),
            _ => None,
        }
    }
}

/// Result type for gateway operations.
pub type GatewayResult<T> = Result<T, GatewayError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_errors_are_retryable() {
        assert!(GatewayError::timeout("t").is_retryable());
        assert!(GatewayError::connection("c").is_retryable());
        assert!(GatewayError::rate_limited("r", Some(500)).is_retryable());
    }

    #[test]
    fn decline_is_final() {
        let error = GatewayError::declined("do not honor", Some("05".to_string()));
        assert!(!error.is_retryable());
        assert!(!error.is_client_error());
        assert_eq!(error.decline_code(), Some("05"));
    }

    #[test]
    fn rate_limit_carries_delay() {
        let error = GatewayError::rate_limited("slow down", Some(1000));
        assert_eq!(error.retry_after_ms(), Some(1000));
        assert_eq!(GatewayError::timeout("t").retry_after_ms(), None);
    }

    #[test]
    fn signature_errors_are_client_errors() {
        assert!(GatewayError::invalid_signature("bad digest").is_client_error());
    }

    #[test]
    fn display_format() {
        let display = GatewayError::timeout("charge timed out").to_string();
        assert!(display.contains("timeout"));
        assert!(display.contains("charge timed out"));
    }
}
