//! # Domain Errors
//!
//! Business rule violations raised by entities and domain services.
//!
//! Every variant is either a *validation* failure (the input can never be
//! accepted) or a *conflict* (the input is fine but the current state of an
//! aggregate refuses it). The API layer maps the first to 422 and the second
//! to 409.

use crate::domain::value_objects::{ArithmeticError, CpfError, Money};
use thiserror::Error;

/// Error raised by domain logic.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    /// Input failed a business validation rule.
    #[error("validation failed: {0}")]
    Validation(String),

    /// Monetary amount is not acceptable for the operation.
    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    /// CPF failed validation.
    #[error("invalid CPF: {0}")]
    InvalidCpf(#[from] CpfError),

    /// Aggregate refused a lifecycle transition.
    #[error("invalid {entity} transition from {from} to {to}")]
    InvalidStateTransition {
        /// Aggregate kind.
        entity: &'static str,
        /// Current state.
        from: String,
        /// Requested state.
        to: String,
    },

    /// Product does not have enough units.
    #[error("insufficient stock for {product}: requested {requested}, available {available}")]
    InsufficientStock {
        /// Product name.
        product: String,
        /// Units requested.
        requested: u32,
        /// Units on hand.
        available: u32,
    },

    /// Event is full.
    #[error("event capacity of {capacity} reached")]
    CapacityExceeded {
        /// Configured capacity.
        capacity: u32,
    },

    /// Participant already has an open check-in session.
    #[error("participant {0} is already checked in")]
    DuplicateCheckin(String),

    /// A unique key is already taken.
    #[error("{entity} with {key} already exists")]
    Duplicate {
        /// Aggregate kind.
        entity: &'static str,
        /// Offending key, already masked where it is personal data.
        key: String,
    },

    /// Refund would return more than was captured.
    #[error("refund of {requested} exceeds refundable amount {available}")]
    RefundExceedsAvailable {
        /// Requested amount.
        requested: Money,
        /// Amount still refundable.
        available: Money,
    },

    /// Operation refused by a business policy.
    #[error("not allowed: {0}")]
    NotAllowed(String),

    /// Checked arithmetic failed.
    #[error("arithmetic error: {0}")]
    Arithmetic(#[from] ArithmeticError),
}

impl DomainError {
    /// Creates a validation error.
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Creates an invalid amount error.
    #[must_use]
    pub fn invalid_amount(message: impl Into<String>) -> Self {
        Self::InvalidAmount(message.into())
    }

    /// Creates an invalid transition error.
    #[must_use]
    pub fn invalid_transition(
        entity: &'static str,
        from: impl ToString,
        to: impl ToString,
    ) -> Self {
        Self::InvalidStateTransition {
            entity,
            from: from.to_string(),
            to: to.to_string(),
        }
    }

    /// Creates a policy refusal.
    #[must_use]
    pub fn not_allowed(message: impl Into<String>) -> Self {
        Self::NotAllowed(message.into())
    }

    /// Returns true when the request conflicts with current aggregate state.
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            Self::InvalidStateTransition { .. }
                | Self::InsufficientStock { .. }
                | Self::CapacityExceeded { .. }
                | Self::DuplicateCheckin(_)
                | Self::Duplicate { .. }
        )
    }
}

/// Result type for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transition_message() {
        let err = DomainError::invalid_transition("event", "DRAFT", "FINISHED");
        assert_eq!(err.to_string(), "invalid event transition from DRAFT to FINISHED");
        assert!(err.is_conflict());
    }

    #[test]
    fn validation_is_not_conflict() {
        assert!(!DomainError::validation("name is required").is_conflict());
        assert!(!DomainError::not_allowed("outside window").is_conflict());
    }

    #[test]
    fn arithmetic_converts() {
        let err: DomainError = ArithmeticError::Overflow.into();
        assert!(matches!(err, DomainError::Arithmetic(_)));
    }
}
