//! # Payment Gateway Port
//!
//! The [`PaymentGateway`] trait every payment provider integration
//! implements, and the request/response types it exchanges.
//!
//! Gateways only move money; transaction state lives in the application
//! layer. A charge either settles immediately (cards), waits for the payer
//! (PIX, boleto: a payment code is returned and a webhook arrives later) or
//! is declined.
//!
//! # Examples
//!
//! ```ignore
//! use eventos::infrastructure::gateways::traits::{PaymentGateway, ChargeRequest};
//!
//! let response = gateway.charge(&ChargeRequest::from_transaction(&tx, None)).await?;
//! ```

use crate::domain::entities::Transaction;
use crate::domain::value_objects::{Money, PaymentMethod, RefundId, TransactionId};
use crate::infrastructure::gateways::error::GatewayResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Outcome of a charge as reported by the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChargeStatus {
    /// Funds captured.
    Approved,
    /// Card funds reserved; capture is confirmed by webhook.
    Authorized,
    /// Waiting for the payer; settlement arrives by webhook.
    Pending,
    /// Refused by issuer or provider.
    Declined,
}

impl fmt::Display for ChargeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Approved => write!(f, "APPROVED"),
            Self::Authorized => write!(f, "AUTHORIZED"),
            Self::Pending => write!(f, "PENDING"),
            Self::Declined => write!(f, "DECLINED"),
        }
    }
}

/// A charge sent to the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChargeRequest {
    /// Our transaction id, used by the provider as idempotency key.
    pub transaction_id: TransactionId,
    /// Amount to charge.
    pub amount: Money,
    /// Payment method.
    pub method: PaymentMethod,
    /// Number of installments (cards only).
    pub installments: u8,
    /// Payer name.
    pub payer_name: String,
    /// Payer email.
    pub payer_email: String,
    /// Payer CPF digits, required for boleto.
    pub payer_cpf: Option<String>,
    /// Tokenized card, for card methods.
    pub card_token: Option<String>,
    /// Statement description.
    pub description: Option<String>,
}

impl ChargeRequest {
    /// Builds the charge for a pending transaction.
    #[must_use]
    pub fn from_transaction(tx: &Transaction, card_token: Option<String>) -> Self {
        Self {
            transaction_id: tx.id(),
            amount: tx.amount(),
            method: tx.method(),
            installments: tx.installments(),
            payer_name: tx.payer().name.clone(),
            payer_email: tx.payer().email.clone(),
            payer_cpf: tx.payer().cpf.as_ref().map(|c| c.as_str().to_string()),
            card_token,
            description: tx.description().map(str::to_string),
        }
    }
}

/// Provider answer to a charge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChargeResponse {
    /// Provider reference, used to match webhooks.
    pub reference: String,
    /// Charge outcome.
    pub status: ChargeStatus,
    /// PIX copy-and-paste code.
    #[serde(default)]
    pub pix_code: Option<String>,
    /// Boleto digitable line.
    #[serde(default)]
    pub boleto_line: Option<String>,
    /// Decline or informational message.
    #[serde(default)]
    pub message: Option<String>,
}

/// A refund sent to the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayRefundRequest {
    /// Our refund id, used as idempotency key.
    pub refund_id: RefundId,
    /// Provider reference of the original charge.
    pub charge_reference: String,
    /// Amount to return.
    pub amount: Money,
}

/// Provider answer to a refund.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayRefundResponse {
    /// Provider refund reference.
    pub reference: String,
}

/// Port for payment providers.
#[async_trait]
pub trait PaymentGateway: Send + Sync + fmt::Debug {
    /// Provider name for logs and health reports.
    fn name(&self) -> &str;

    /// Charges the payer.
    ///
    /// A declined charge is returned as `Ok` with
    /// [`ChargeStatus::Declined`]; `Err` means the outcome is unknown or the
    /// request was invalid.
    async fn charge(&self, request: &ChargeRequest) -> GatewayResult<ChargeResponse>;

    /// Returns money for a captured charge.
    async fn refund(&self, request: &GatewayRefundRequest)
    -> GatewayResult<GatewayRefundResponse>;

    /// Returns true if the provider is reachable.
    async fn health_check(&self) -> bool;
}
