//! # Webhook Signatures
//!
//! Payment providers notify settlement through `POST /webhooks/payments`.
//! The `X-Webhook-Signature` header holds an HS256 JWT whose `sha256` claim
//! is the hex SHA-256 digest of the raw request body, so a signature cannot
//! be replayed onto a different body and expires with the token.

use crate::infrastructure::gateways::error::{GatewayError, GatewayResult};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Header carrying the signature.
pub const SIGNATURE_HEADER: &str = "x-webhook-signature";

/// Lifetime of a signature produced by [`WebhookVerifier::sign`].
const SIGNATURE_TTL_SECS: i64 = 300;

#[derive(Debug, Serialize, Deserialize)]
struct SignatureClaims {
    sha256: String,
    iat: i64,
    exp: i64,
}

/// Settlement outcome reported by the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WebhookStatus {
    /// Charge settled.
    Paid,
    /// Charge failed or expired.
    Failed,
    /// Charge cancelled by the payer or provider.
    Cancelled,
}

/// Body of a payment webhook.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookEvent {
    /// Provider reference of the charge.
    pub reference: String,
    /// New status.
    pub status: WebhookStatus,
    /// Failure reason, if any.
    #[serde(default)]
    pub reason: Option<String>,
}

/// Signs and verifies webhook bodies with a shared secret.
#[derive(Clone)]
pub struct WebhookVerifier {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl std::fmt::Debug for WebhookVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookVerifier").finish_non_exhaustive()
    }
}

fn body_digest(body: &[u8]) -> String {
    hex::encode(Sha256::digest(body))
}

impl WebhookVerifier {
    /// Creates a verifier for `secret`.
    #[must_use]
    pub fn new(secret: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    /// Produces a signature for `body`, as a provider would.
    ///
    /// # Errors
    ///
    /// Returns `GatewayError::Internal` if the token cannot be encoded.
    pub fn sign(&self, body: &[u8]) -> GatewayResult<String> {
        let now = chrono::Utc::now().timestamp();
        let claims = SignatureClaims {
            sha256: body_digest(body),
            iat: now,
            exp: now + SIGNATURE_TTL_SECS,
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| GatewayError::internal(e.to_string()))
    }

    /// Checks `signature` against `body`.
    ///
    /// # Errors
    ///
    /// Returns `GatewayError::InvalidSignature` if the token is malformed,
    /// expired, signed with another secret or covers a different body.
    pub fn verify(&self, signature: &str, body: &[u8]) -> GatewayResult<()> {
        let data = decode::<SignatureClaims>(
            signature.trim(),
            &self.decoding,
            &Validation::new(Algorithm::HS256),
        )
        .map_err(|e| GatewayError::invalid_signature(e.to_string()))?;
        if data.claims.sha256 != body_digest(body) {
            return Err(GatewayError::invalid_signature("body digest mismatch"));
        }
        Ok(())
    }

    /// Verifies and parses a webhook.
    ///
    /// # Errors
    ///
    /// Returns `GatewayError::InvalidSignature` on a bad signature and
    /// `GatewayError::InvalidRequest` if the body is not a webhook event.
    pub fn open(&self, signature: &str, body: &[u8]) -> GatewayResult<WebhookEvent> {
        self.verify(signature, body)?;
        serde_json::from_slice(body).map_err(|e| GatewayError::invalid_request(e.to_string()))
    }
}
