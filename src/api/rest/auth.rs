//! # Authentication
//!
//! Bearer JWTs (HS256) carrying the caller's user, tenant and role.
//!
//! Every authenticated handler takes an [`AuthUser`]; the tenant in the
//! token scopes every lookup the handler makes, so rows of other tenants
//! are simply not found.
//!
//! ```ignore
//! async fn publish(user: AuthUser, State(state): State<AppState>) -> ApiResult<Json<Event>> {
//!     user.require(Role::Manager)?;
//!     ...
//! }
//! ```

use crate::api::rest::error::ApiError;
use crate::api::rest::state::AppState;
use crate::domain::value_objects::{TenantId, UserId};
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum_extra::TypedHeader;
use axum_extra::headers::Authorization;
use axum_extra::headers::authorization::Bearer;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Caller role; each level includes the ones below it.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
    schemars::JsonSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Door and register staff.
    Operator,
    /// Event managers: lifecycle, refunds review, treasury.
    Manager,
    /// Tenant administrators.
    Admin,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Operator => f.write_str("operator"),
            Self::Manager => f.write_str("manager"),
            Self::Admin => f.write_str("admin"),
        }
    }
}

impl FromStr for Role {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "operator" => Ok(Self::Operator),
            "manager" => Ok(Self::Manager),
            "admin" => Ok(Self::Admin),
            other => Err(AuthError::UnknownRole(other.to_string())),
        }
    }
}

/// Token problems.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Signature, expiry or format check failed.
    #[error("invalid token: {0}")]
    InvalidToken(String),

    /// The token could not be produced.
    #[error("token encoding failed: {0}")]
    Encoding(String),

    /// Role name not recognised.
    #[error("unknown role: {0}")]
    UnknownRole(String),
}

/// JWT claims.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// User id.
    pub sub: UserId,
    /// Tenant the user belongs to.
    pub tenant_id: TenantId,
    /// Role.
    pub role: Role,
    /// Expiry, seconds since the epoch.
    pub exp: i64,
    /// Issue time, seconds since the epoch.
    #[serde(default)]
    pub iat: i64,
}

/// Issues and verifies API tokens.
#[derive(Clone)]
pub struct JwtAuth {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl_secs: i64,
}

impl fmt::Debug for JwtAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtAuth")
            .field("ttl_secs", &self.ttl_secs)
            .finish_non_exhaustive()
    }
}

impl JwtAuth {
    /// Creates a verifier for `secret`; issued tokens live `ttl_secs`.
    #[must_use]
    pub fn new(secret: &str, ttl_secs: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl_secs,
        }
    }

    /// Signs a token.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Encoding` if signing fails.
    pub fn issue(&self, user: UserId, tenant: TenantId, role: Role) -> Result<String, AuthError> {
        let now = chrono::Utc::now().timestamp();
        let claims = Claims {
            sub: user,
            tenant_id: tenant,
            role,
            exp: now + self.ttl_secs,
            iat: now,
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| AuthError::Encoding(e.to_string()))
    }

    /// Verifies a token and returns its claims.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidToken` for a bad signature, an expired
    /// token or malformed claims.
    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        decode::<Claims>(token, &self.decoding, &Validation::new(Algorithm::HS256))
            .map(|data| data.claims)
            .map_err(|e| AuthError::InvalidToken(e.to_string()))
    }
}

/// Authenticated caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthUser {
    /// User id.
    pub user_id: UserId,
    /// Tenant scope of every query.
    pub tenant: TenantId,
    /// Role.
    pub role: Role,
}

impl AuthUser {
    /// Fails with 403 unless the caller has at least `role`.
    ///
    /// # Errors
    ///
    /// Returns a forbidden [`ApiError`].
    pub fn require(&self, role: Role) -> Result<(), ApiError> {
        if self.role >= role {
            Ok(())
        } else {
            Err(ApiError::forbidden(format!(
                "{role} role required, caller is {}",
                self.role
            )))
        }
    }
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|_| ApiError::unauthorized("missing bearer token"))?;
        let claims = state
            .auth
            .verify(bearer.token())
            .map_err(|e| ApiError::unauthorized(e.to_string()))?;
        Ok(Self {
            user_id: claims.sub,
            tenant: claims.tenant_id,
            role: claims.role,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn roles_are_ordered() {
        assert!(Role::Admin > Role::Manager);
        assert!(Role::Manager > Role::Operator);
        assert_eq!("ADMIN".parse::<Role>().unwrap(), Role::Admin);
        assert!("guest".parse::<Role>().is_err());
    }

    #[test]
    fn issued_tokens_verify() {
        let auth = JwtAuth::new("secret", 3600);
        let (user, tenant) = (UserId::new_v4(), TenantId::new_v4());
        let token = auth.issue(user, tenant, Role::Manager).unwrap();
        let claims = auth.verify(&token).unwrap();
        assert_eq!(claims.sub, user);
        assert_eq!(claims.tenant_id, tenant);
        assert_eq!(claims.role, Role::Manager);
    }

    #[test]
    fn foreign_and_expired_tokens_fail() {
        let auth = JwtAuth::new("secret", 3600);
        let other = JwtAuth::new("other", 3600);
        let token = other
            .issue(UserId::new_v4(), TenantId::new_v4(), Role::Admin)
            .unwrap();
        assert!(auth.verify(&token).is_err());

        let expired = JwtAuth::new("secret", -3600)
            .issue(UserId::new_v4(), TenantId::new_v4(), Role::Admin)
            .unwrap();
        assert!(auth.verify(&expired).is_err());
    }

    #[test]
    fn require_checks_the_level() {
        let user = AuthUser {
            user_id: UserId::new_v4(),
            tenant: TenantId::new_v4(),
            role: Role::Manager,
        };
        assert!(user.require(Role::Operator).is_ok());
        assert!(user.require(Role::Manager).is_ok());
        assert_eq!(
            user.require(Role::Admin).unwrap_err().status(),
            axum::http::StatusCode::FORBIDDEN
        );
    }
}
