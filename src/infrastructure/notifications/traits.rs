//! # Notification Sender Port
//!
//! [`NotificationSender`] delivers one persisted [`Notification`] through a
//! provider. Retries, rate limiting and status bookkeeping live in the
//! application layer; a sender makes exactly one attempt.

use crate::domain::entities::Notification;
use crate::domain::value_objects::NotificationChannel;
use crate::infrastructure::gateways::GatewayError;
use async_trait::async_trait;
use std::fmt;
use thiserror::Error;

/// Error returned by a single delivery attempt.
#[derive(Debug, Clone, Error)]
pub enum DeliveryError {
    /// Provider unreachable or temporarily failing.
    #[error("provider unavailable: {0}")]
    Unavailable(String),

    /// Provider refused the message; retrying will not help.
    #[error("message rejected: {0}")]
    Rejected(String),

    /// Sender misconfigured.
    #[error("sender configuration error: {0}")]
    Configuration(String),
}

impl DeliveryError {
    /// Returns true if another attempt may succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

impl From<GatewayError> for DeliveryError {
    fn from(e: GatewayError) -> Self {
        if e.is_retryable() {
            Self::Unavailable(e.to_string())
        } else if matches!(e, GatewayError::Internal { .. }) {
            Self::Configuration(e.to_string())
        } else {
            Self::Rejected(e.to_string())
        }
    }
}

/// Result of a delivery attempt.
pub type DeliveryResult<T> = Result<T, DeliveryError>;

/// Port for message providers.
#[async_trait]
pub trait NotificationSender: Send + Sync + fmt::Debug {
    /// Channels this sender delivers.
    fn channels(&self) -> &[NotificationChannel];

    /// Makes one delivery attempt.
    async fn send(&self, notification: &Notification) -> DeliveryResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gateway_errors_map_by_retryability() {
        assert!(DeliveryError::from(GatewayError::timeout("t")).is_retryable());
        assert!(matches!(
            DeliveryError::from(GatewayError::invalid_request("bad number")),
            DeliveryError::Rejected(_)
        ));
        assert!(matches!(
            DeliveryError::from(GatewayError::internal("no client")),
            DeliveryError::Configuration(_)
        ));
    }
}
