//! # Commerce Events
//!
//! Events for PDV sales, payments and refunds.
//!
//! # Event Flow
//!
//! ```text
//! SaleCompleted -> SaleCancelled?
//! PaymentConfirmed | PaymentFailed
//! RefundRequested -> RefundCompleted | RefundRejected
//! ```

use crate::domain::events::domain_event::{EventMetadata, EventType, impl_domain_event};
use crate::domain::value_objects::{
    EventId, Money, PaymentMethod, RefundId, SaleId, TenantId, TransactionId,
};
use serde::{Deserialize, Serialize};

/// Emitted when a PDV sale is rung up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleCompleted {
    /// Event metadata; the aggregate is the sale.
    pub metadata: EventMetadata,
    /// Event where the sale happened.
    pub event_id: EventId,
    /// Amount charged.
    pub total: Money,
    /// Payment method.
    pub method: PaymentMethod,
    /// Number of units sold across all lines.
    pub units: u32,
}

impl SaleCompleted {
    /// Creates a new `SaleCompleted` event.
    #[must_use]
    pub fn new(
        tenant_id: TenantId,
        sale_id: SaleId,
        event_id: EventId,
        total: Money,
        method: PaymentMethod,
        units: u32,
    ) -> Self {
        Self {
            metadata: EventMetadata::new(tenant_id, sale_id.as_uuid()),
            event_id,
            total,
            method,
            units,
        }
    }
}

impl_domain_event!(SaleCompleted, EventType::Sales, "SaleCompleted");

/// Emitted when a PDV sale is voided.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleCancelled {
    /// Event metadata; the aggregate is the sale.
    pub metadata: EventMetadata,
    /// Amount reversed.
    pub total: Money,
}

impl SaleCancelled {
    /// Creates a new `SaleCancelled` event.
    #[must_use]
    pub fn new(tenant_id: TenantId, sale_id: SaleId, total: Money) -> Self {
        Self {
            metadata: EventMetadata::new(tenant_id, sale_id.as_uuid()),
            total,
        }
    }
}

impl_domain_event!(SaleCancelled, EventType::Sales, "SaleCancelled");

/// Emitted when a payment is captured.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentConfirmed {
    /// Event metadata; the aggregate is the transaction.
    pub metadata: EventMetadata,
    /// Captured amount.
    pub amount: Money,
    /// Payment method.
    pub method: PaymentMethod,
    /// Where the confirmation came from (`gateway`, `webhook`, `manual`).
    pub source: String,
}

impl PaymentConfirmed {
    /// Creates a new `PaymentConfirmed` event.
    #[must_use]
    pub fn new(
        tenant_id: TenantId,
        transaction_id: TransactionId,
        amount: Money,
        method: PaymentMethod,
        source: impl Into<String>,
    ) -> Self {
        Self {
            metadata: EventMetadata::new(tenant_id, transaction_id.as_uuid()),
            amount,
            method,
            source: source.into(),
        }
    }
}

impl_domain_event!(PaymentConfirmed, EventType::Payment, "PaymentConfirmed");

/// Emitted when a payment is refused.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentFailed {
    /// Event metadata; the aggregate is the transaction.
    pub metadata: EventMetadata,
    /// Refusal reason.
    pub reason: String,
}

impl PaymentFailed {
    /// Creates a new `PaymentFailed` event.
    #[must_use]
    pub fn new(tenant_id: TenantId, transaction_id: TransactionId, reason: impl Into<String>) -> Self {
        Self {
            metadata: EventMetadata::new(tenant_id, transaction_id.as_uuid()),
            reason: reason.into(),
        }
    }
}

impl_domain_event!(PaymentFailed, EventType::Payment, "PaymentFailed");

/// Emitted when a refund is requested.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefundRequested {
    /// Event metadata; the aggregate is the refund.
    pub metadata: EventMetadata,
    /// Transaction being refunded.
    pub transaction_id: TransactionId,
    /// Requested amount.
    pub amount: Money,
    /// Risk score assigned.
    pub risk_score: u8,
}

impl RefundRequested {
    /// Creates a new `RefundRequested` event.
    #[must_use]
    pub fn new(
        tenant_id: TenantId,
        refund_id: RefundId,
        transaction_id: TransactionId,
        amount: Money,
        risk_score: u8,
    ) -> Self {
        Self {
            metadata: EventMetadata::new(tenant_id, refund_id.as_uuid()),
            transaction_id,
            amount,
            risk_score,
        }
    }
}

impl_domain_event!(RefundRequested, EventType::Refund, "RefundRequested");

/// Emitted when the gateway confirms a refund.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefundCompleted {
    /// Event metadata; the aggregate is the refund.
    pub metadata: EventMetadata,
    /// Refunded amount.
    pub amount: Money,
    /// Gateway refund id.
    pub gateway_refund_id: String,
}

impl RefundCompleted {
    /// Creates a new `RefundCompleted` event.
    #[must_use]
    pub fn new(
        tenant_id: TenantId,
        refund_id: RefundId,
        amount: Money,
        gateway_refund_id: impl Into<String>,
    ) -> Self {
        Self {
            metadata: EventMetadata::new(tenant_id, refund_id.as_uuid()),
            amount,
            gateway_refund_id: gateway_refund_id.into(),
        }
    }
}

impl_domain_event!(RefundCompleted, EventType::Refund, "RefundCompleted");

/// Emitted when a refund is refused by policy or by a reviewer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefundRejected {
    /// Event metadata; the aggregate is the refund.
    pub metadata: EventMetadata,
    /// Rejection reason.
    pub reason: String,
}

impl RefundRejected {
    /// Creates a new `RefundRejected` event.
    #[must_use]
    pub fn new(tenant_id: TenantId, refund_id: RefundId, reason: impl Into<String>) -> Self {
        Self {
            metadata: EventMetadata::new(tenant_id, refund_id.as_uuid()),
            reason: reason.into(),
        }
    }
}

impl_domain_event!(RefundRejected, EventType::Refund, "RefundRejected");

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::domain::events::domain_event::DomainEvent;

    #[test]
    fn refund_events_share_aggregate() {
        let tenant = TenantId::new_v4();
        let refund = RefundId::new_v4();
        let requested = RefundRequested::new(
            tenant,
            refund,
            TransactionId::new_v4(),
            Money::from_cents(100),
            10,
        );
        let completed = RefundCompleted::new(tenant, refund, Money::from_cents(100), "gw-1");
        assert_eq!(requested.aggregate_id(), completed.aggregate_id());
        assert_ne!(requested.event_id(), completed.event_id());
    }

    #[test]
    fn payload_serializes_money_as_string() {
        let event = PaymentConfirmed::new(
            TenantId::new_v4(),
            TransactionId::new_v4(),
            Money::from_cents(1050),
            PaymentMethod::Pix,
            "webhook",
        );
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["amount"], "10.50");
        assert_eq!(json["method"], "PIX");
    }
}
