//! # API Errors
//!
//! Maps [`ApplicationError`] onto HTTP responses with the body
//! `{"error": CODE, "message": text}`.
//!
//! | Error | Status |
//! |---|---|
//! | malformed body or query | 400 |
//! | missing or invalid token | 401 |
//! | role too low | 403 |
//! | unknown resource | 404 |
//! | state conflict (transition, stock, capacity, duplicate, version) | 409 |
//! | validation or policy refusal | 422 |
//! | payment provider failure | 502 |
//! | anything else | 500 |

use crate::application::error::{ApplicationError, InfrastructureError};
use crate::domain::errors::DomainError;
use crate::infrastructure::gateways::GatewayError;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::error;

/// Error body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct ErrorBody {
    /// Machine-readable code.
    pub error: String,
    /// Human-readable detail.
    pub message: String,
}

/// Error returned by every handler.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl ApiError {
    /// Creates an error.
    #[must_use]
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
        }
    }

    /// 400.
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "BAD_REQUEST", message)
    }

    /// 401.
    #[must_use]
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "UNAUTHORIZED", message)
    }

    /// 403.
    #[must_use]
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, "FORBIDDEN", message)
    }

    /// 404.
    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, "NOT_FOUND", message)
    }

    /// 500, without leaking the cause.
    #[must_use]
    pub fn internal() -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "INTERNAL_ERROR",
            "internal server error",
        )
    }

    /// HTTP status.
    #[inline]
    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Error code.
    #[inline]
    #[must_use]
    pub fn code(&self) -> &'static str {
        self.code
    }
}

fn from_domain(err: &DomainError) -> ApiError {
    let message = err.to_string();
    match err {
        DomainError::InvalidStateTransition { .. } => {
            ApiError::new(StatusCode::CONFLICT, "INVALID_STATE", message)
        }
        DomainError::InsufficientStock { .. } => {
            ApiError::new(StatusCode::CONFLICT, "INSUFFICIENT_STOCK", message)
        }
        DomainError::CapacityExceeded { .. } => {
            ApiError::new(StatusCode::CONFLICT, "CAPACITY_EXCEEDED", message)
        }
        DomainError::DuplicateCheckin(_) => {
            ApiError::new(StatusCode::CONFLICT, "DUPLICATE_CHECKIN", message)
        }
        DomainError::Duplicate { .. } => ApiError::new(StatusCode::CONFLICT, "DUPLICATE", message),
        DomainError::RefundExceedsAvailable { .. } => {
            ApiError::new(StatusCode::UNPROCESSABLE_ENTITY, "REFUND_EXCEEDS_AVAILABLE", message)
        }
        DomainError::NotAllowed(_) => {
            ApiError::new(StatusCode::UNPROCESSABLE_ENTITY, "NOT_ALLOWED", message)
        }
        DomainError::Arithmetic(_) => {
            ApiError::new(StatusCode::UNPROCESSABLE_ENTITY, "ARITHMETIC_ERROR", message)
        }
        DomainError::Validation(_) | DomainError::InvalidAmount(_) | DomainError::InvalidCpf(_) => {
            ApiError::new(StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR", message)
        }
    }
}

fn from_gateway(err: &GatewayError) -> ApiError {
    match err {
        GatewayError::InvalidSignature { .. } => ApiError::unauthorized(err.to_string()),
        GatewayError::InvalidRequest { .. } => ApiError::bad_request(err.to_string()),
        GatewayError::Declined { .. } => {
            ApiError::new(StatusCode::UNPROCESSABLE_ENTITY, "PAYMENT_DECLINED", err.to_string())
        }
        _ => ApiError::new(StatusCode::BAD_GATEWAY, "GATEWAY_ERROR", err.to_string()),
    }
}

impl From<ApplicationError> for ApiError {
    fn from(err: ApplicationError) -> Self {
        match &err {
            ApplicationError::Domain(e) => from_domain(e),
            ApplicationError::Gateway(e) => from_gateway(e),
            ApplicationError::Validation(m) => {
                Self::new(StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR", m.clone())
            }
            ApplicationError::NotFound { .. } => Self::not_found(err.to_string()),
            ApplicationError::Conflict(m) => Self::new(StatusCode::CONFLICT, "CONFLICT", m.clone()),
            ApplicationError::Unauthorized => Self::unauthorized("authentication required"),
            ApplicationError::Forbidden(m) => Self::forbidden(m.clone()),
            ApplicationError::Infrastructure(InfrastructureError::ExternalService {
                service,
                message,
            }) => Self::new(
                StatusCode::BAD_GATEWAY,
                "EXTERNAL_SERVICE_ERROR",
                format!("{service}: {message}"),
            ),
            ApplicationError::Infrastructure(_) | ApplicationError::Internal(_) => {
                error!(error = %err, "request failed");
                Self::internal()
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        match rejection {
            // Well-formed JSON whose values fail validation (e.g. an amount
            // out of range).
            JsonRejection::JsonDataError(e) => Self::new(
                StatusCode::UNPROCESSABLE_ENTITY,
                "VALIDATION_ERROR",
                e.body_text(),
            ),
            other => Self::bad_request(other.body_text()),
        }
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.code.to_string(),
            message: self.message,
        };
        (self.status, Json(body)).into_response()
    }
}

/// Result type of handlers.
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn status(err: ApplicationError) -> StatusCode {
        ApiError::from(err).status()
    }

    #[test]
    fn maps_application_errors() {
        assert_eq!(status(ApplicationError::not_found("Event", "1")), StatusCode::NOT_FOUND);
        assert_eq!(status(ApplicationError::validation("x")), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(status(ApplicationError::conflict("x")), StatusCode::CONFLICT);
        assert_eq!(status(ApplicationError::Unauthorized), StatusCode::UNAUTHORIZED);
        assert_eq!(status(ApplicationError::forbidden("x")), StatusCode::FORBIDDEN);
        assert_eq!(status(ApplicationError::internal("boom")), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn maps_domain_errors() {
        assert_eq!(
            status(DomainError::DuplicateCheckin("p".into()).into()),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status(DomainError::not_allowed("x").into()),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            status(DomainError::validation("x").into()),
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }

    #[test]
    fn maps_gateway_errors() {
        assert_eq!(
            status(GatewayError::connection("down").into()),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            status(GatewayError::invalid_signature("bad").into()),
            StatusCode::UNAUTHORIZED
        );
    }

    #[test]
    fn internal_errors_hide_details() {
        let err = ApiError::from(ApplicationError::internal("db password wrong"));
        assert_eq!(err.code(), "INTERNAL_ERROR");
        assert_eq!(err.message, "internal server error");
    }
}
