//! # Application Errors
//!
//! Error types for the application layer.
//!
//! These errors represent failures that can occur during use case
//! execution, including validation failures, business rule violations, and
//! infrastructure errors.
//!
//! # Error Hierarchy
//!
//! ```text
//! ApplicationError
//! ├── Domain(DomainError)                 - Business rule violations
//! ├── Infrastructure(InfrastructureError) - Store, cache, senders
//! ├── Gateway(GatewayError)               - Payment provider failures
//! ├── Validation(String)                  - Input validation failures
//! ├── NotFound { .. }                     - Resource not found
//! ├── Conflict(String)                    - Concurrent modification
//! ├── Unauthorized / Forbidden            - Authentication/authorization
//! └── Internal(String)
//! ```
//!
//! # Examples
//!
//! ```
//! use eventos::application::error::{ApplicationError, InfrastructureError};
//!
//! let err = ApplicationError::validation("quantity must be positive");
//! let err = ApplicationError::not_found("Event", "evt-123");
//!
//! let infra_err = InfrastructureError::database("connection timeout");
//! let app_err: ApplicationError = infra_err.into();
//! ```

use crate::domain::errors::DomainError;
use crate::domain::value_objects::ArithmeticError;
use crate::infrastructure::cache::CacheError;
use crate::infrastructure::gateways::GatewayError;
use crate::infrastructure::notifications::DeliveryError;
use crate::infrastructure::persistence::{EventStoreError, RepositoryError};
use thiserror::Error;

/// Infrastructure layer error.
///
/// Represents errors from external systems and infrastructure components
/// such as databases, caches and message providers.
#[derive(Debug, Error)]
pub enum InfrastructureError {
    /// Database error.
    #[error("database error: {0}")]
    Database(String),

    /// Cache error.
    #[error("cache error: {0}")]
    Cache(String),

    /// External service error.
    #[error("external service error: {service} - {message}")]
    ExternalService {
        /// Service name.
        service: String,
        /// Error message.
        message: String,
    },

    /// Repository error.
    #[error("repository error: {0}")]
    Repository(#[from] RepositoryError),
}

impl InfrastructureError {
    /// Creates a database error.
    #[must_use]
    pub fn database(message: impl Into<String>) -> Self {
        Self::Database(message.into())
    }

    /// Creates a cache error.
    #[must_use]
    pub fn cache(message: impl Into<String>) -> Self {
        Self::Cache(message.into())
    }

    /// Creates an external service error.
    #[must_use]
    pub fn external_service(service: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ExternalService {
            service: service.into(),
            message: message.into(),
        }
    }

    /// Returns true if this error is retryable.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Repository(RepositoryError::Connection(_)))
    }
}

/// Application layer error.
#[derive(Debug, Error)]
pub enum ApplicationError {
    /// Domain error from business logic.
    #[error("domain error: {0}")]
    Domain(#[from] DomainError),

    /// Infrastructure error from external systems.
    #[error("infrastructure error: {0}")]
    Infrastructure(#[from] InfrastructureError),

    /// Payment provider error.
    #[error("gateway error: {0}")]
    Gateway(#[from] GatewayError),

    /// Request validation failed.
    #[error("validation error: {0}")]
    Validation(String),

    /// Resource not found.
    #[error("not found: {resource_type} with id {id}")]
    NotFound {
        /// Type of resource.
        resource_type: String,
        /// Resource identifier.
        id: String,
    },

    /// Concurrent modification or duplicate key.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Missing or invalid credentials.
    #[error("unauthorized")]
    Unauthorized,

    /// Authenticated, but the role is not sufficient.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Internal error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApplicationError {
    /// Creates a validation error.
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Creates a not found error.
    #[must_use]
    pub fn not_found(resource_type: impl Into<String>, id: impl ToString) -> Self {
        Self::NotFound {
            resource_type: resource_type.into(),
            id: id.to_string(),
        }
    }

    /// Creates a conflict error.
    #[must_use]
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    /// Creates an unauthorized error.
    #[must_use]
    pub fn unauthorized() -> Self {
        Self::Unauthorized
    }

    /// Creates a forbidden error.
    #[must_use]
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden(message.into())
    }

    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Returns true if this error is retryable.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Infrastructure(e) => e.is_retryable(),
            Self::Gateway(e) => e.is_retryable(),
            _ => false,
        }
    }

    /// Returns true if this is a not found error.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Returns true if this is a validation error.
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Returns true if the request conflicts with current state.
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        match self {
            Self::Conflict(_) => true,
            Self::Domain(e) => e.is_conflict(),
            _ => false,
        }
    }

    /// Returns true if this is an authorization error.
    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized | Self::Forbidden(_))
    }
}

impl From<RepositoryError> for ApplicationError {
    fn from(e: RepositoryError) -> Self {
        match e {
            RepositoryError::NotFound { entity_type, id } => Self::NotFound {
                resource_type: entity_type.to_string(),
                id,
            },
            RepositoryError::VersionConflict { .. } | RepositoryError::Duplicate { .. } => {
                Self::Conflict(e.to_string())
            }
            other => Self::Infrastructure(InfrastructureError::Repository(other)),
        }
    }
}

impl From<EventStoreError> for ApplicationError {
    fn from(e: EventStoreError) -> Self {
        Self::Infrastructure(InfrastructureError::database(e.to_string()))
    }
}

impl From<CacheError> for ApplicationError {
    fn from(e: CacheError) -> Self {
        Self::Infrastructure(InfrastructureError::cache(e.to_string()))
    }
}

impl From<DeliveryError> for ApplicationError {
    fn from(e: DeliveryError) -> Self {
        Self::Infrastructure(InfrastructureError::external_service(
            "notifications",
            e.to_string(),
        ))
    }
}

impl From<ArithmeticError> for ApplicationError {
    fn from(e: ArithmeticError) -> Self {
        Self::Domain(DomainError::from(e))
    }
}

/// Result type for application operations.
pub type ApplicationResult<T> = Result<T, ApplicationError>;
