//! # Transaction Aggregate Root
//!
//! A payment charged to a payer, for a ticket, a PDV sale or a free-standing
//! charge. Tracks the gateway reference, PIX/boleto payment codes and how
//! much has already been refunded.
//!
//! # State Machine
//!
//! ```text
//! Pending → Authorized → Paid → PartiallyRefunded → Refunded
//!    │          │          └──────────────────────→ Refunded
//!    └──────────┴→ Failed | Cancelled
//! ```

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::value_objects::{
    Cpf, EventId, Money, ParticipantId, PaymentMethod, SaleId, TenantId, Timestamp,
    TransactionId, TransactionStatus,
};
use serde::{Deserialize, Serialize};

/// Maximum number of credit-card installments.
pub const MAX_INSTALLMENTS: u8 = 12;

/// Person being charged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct Payer {
    /// Full name.
    pub name: String,
    /// E-mail used for receipts and refund notices.
    pub email: String,
    /// CPF, required by boleto issuers.
    #[serde(default)]
    pub cpf: Option<Cpf>,
}

/// What the payment is for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct PaymentTarget {
    /// Ticket being paid for.
    #[serde(default)]
    pub participant_id: Option<ParticipantId>,
    /// PDV sale being paid for.
    #[serde(default)]
    pub sale_id: Option<SaleId>,
}

/// Payment transaction.
///
/// # Invariants
///
/// - `amount` is positive
/// - `installments` is 1..=12 and greater than 1 only for credit card
/// - `refunded_amount ≤ amount`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    id: TransactionId,
    tenant_id: TenantId,
    event_id: EventId,
    target: PaymentTarget,
    amount: Money,
    method: PaymentMethod,
    installments: u8,
    payer: Payer,
    description: Option<String>,
    gateway_reference: Option<String>,
    pix_code: Option<String>,
    boleto_line: Option<String>,
    status: TransactionStatus,
    refunded_amount: Money,
    fraud_score: u8,
    failure_reason: Option<String>,
    paid_at: Option<Timestamp>,
    version: u64,
    created_at: Timestamp,
    updated_at: Timestamp,
}

impl Transaction {
    /// Creates a pending transaction.
    ///
    /// # Errors
    ///
    /// - `DomainError::InvalidAmount` for a zero amount
    /// - `DomainError::Validation` for bad installments or payer data
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        tenant_id: TenantId,
        event_id: EventId,
        target: PaymentTarget,
        amount: Money,
        method: PaymentMethod,
        installments: u8,
        payer: Payer,
        description: Option<String>,
    ) -> DomainResult<Self> {
        if amount.is_zero() {
            return Err(DomainError::invalid_amount("payment amount must be positive"));
        }
        if installments == 0 || installments > MAX_INSTALLMENTS {
            return Err(DomainError::validation(format!(
                "installments must be between 1 and {MAX_INSTALLMENTS}"
            )));
        }
        if installments > 1 && !method.supports_installments() {
            return Err(DomainError::validation(format!(
                "{method} does not support installments"
            )));
        }
        if payer.name.trim().is_empty() || !payer.email.contains('@') {
            return Err(DomainError::validation("payer name and email are required"));
        }
        if method == PaymentMethod::Boleto && payer.cpf.is_none() {
            return Err(DomainError::validation("boleto requires the payer CPF"));
        }
        let now = Timestamp::now();
        Ok(Self {
            id: TransactionId::new_v4(),
            tenant_id,
            event_id,
            target,
            amount,
            method,
            installments,
            payer,
            description,
            gateway_reference: None,
            pix_code: None,
            boleto_line: None,
            status: TransactionStatus::Pending,
            refunded_amount: Money::ZERO,
            fraud_score: 0,
            failure_reason: None,
            paid_at: None,
            version: 1,
            created_at: now,
            updated_at: now,
        })
    }

    fn transition_to(&mut self, target: TransactionStatus) -> DomainResult<()> {
        if !self.status.can_transition_to(target) {
            return Err(DomainError::invalid_transition(
                "transaction",
                self.status,
                target,
            ));
        }
        self.status = target;
        self.touch();
        Ok(())
    }

    fn touch(&mut self) {
        self.updated_at = Timestamp::now();
        self.version = self.version.saturating_add(1);
    }

    // ========== Accessors ==========

    /// Returns the transaction ID.
    #[inline]
    #[must_use]
    pub fn id(&self) -> TransactionId {
        self.id
    }

    /// Returns the owning tenant.
    #[inline]
    #[must_use]
    pub fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }

    /// Returns the event.
    #[inline]
    #[must_use]
    pub fn event_id(&self) -> EventId {
        self.event_id
    }

    /// Returns what is being paid for.
    #[inline]
    #[must_use]
    pub fn target(&self) -> PaymentTarget {
        self.target
    }

    /// Returns the charged amount.
    #[inline]
    #[must_use]
    pub fn amount(&self) -> Money {
        self.amount
    }

    /// Returns the payment method.
    #[inline]
    #[must_use]
    pub fn method(&self) -> PaymentMethod {
        self.method
    }

    /// Returns the installment count.
    #[inline]
    #[must_use]
    pub fn installments(&self) -> u8 {
        self.installments
    }

    /// Returns the payer.
    #[inline]
    #[must_use]
    pub fn payer(&self) -> &Payer {
        &self.payer
    }

    /// Returns the free-text description.
    #[inline]
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Returns the gateway's charge id.
    #[inline]
    #[must_use]
    pub fn gateway_reference(&self) -> Option<&str> {
        self.gateway_reference.as_deref()
    }

    /// Returns the PIX copy-and-paste code.
    #[inline]
    #[must_use]
    pub fn pix_code(&self) -> Option<&str> {
        self.pix_code.as_deref()
    }

    /// Returns the boleto digitable line.
    #[inline]
    #[must_use]
    pub fn boleto_line(&self) -> Option<&str> {
        self.boleto_line.as_deref()
    }

    /// Returns the status.
    #[inline]
    #[must_use]
    pub fn status(&self) -> TransactionStatus {
        self.status
    }

    /// Returns the amount refunded so far.
    #[inline]
    #[must_use]
    pub fn refunded_amount(&self) -> Money {
        self.refunded_amount
    }

    /// Returns the fraud score assigned at creation.
    #[inline]
    #[must_use]
    pub fn fraud_score(&self) -> u8 {
        self.fraud_score
    }

    /// Returns why the payment failed.
    #[inline]
    #[must_use]
    pub fn failure_reason(&self) -> Option<&str> {
        self.failure_reason.as_deref()
    }

    /// Returns the capture time.
    #[inline]
    #[must_use]
    pub fn paid_at(&self) -> Option<Timestamp> {
        self.paid_at
    }

    /// Returns the optimistic-lock version.
    #[inline]
    #[must_use]
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Returns the creation time.
    #[inline]
    #[must_use]
    pub fn created_at(&self) -> Timestamp {
        self.created_at
    }

    /// Returns the last update time.
    #[inline]
    #[must_use]
    pub fn updated_at(&self) -> Timestamp {
        self.updated_at
    }

    /// Returns `amount − refunded_amount`.
    #[must_use]
    pub fn refundable_amount(&self) -> Money {
        self.amount.saturating_sub(self.refunded_amount)
    }

    /// Returns true once money has been captured.
    #[inline]
    #[must_use]
    pub fn is_paid(&self) -> bool {
        self.paid_at.is_some()
    }

    // ========== Commands ==========

    /// Stores the fraud score.
    pub fn set_fraud_score(&mut self, score: u8) {
        self.fraud_score = score.min(100);
    }

    /// Stores what the gateway returned when the charge was created.
    pub fn attach_gateway_response(
        &mut self,
        reference: impl Into<String>,
        pix_code: Option<String>,
        boleto_line: Option<String>,
    ) {
        self.gateway_reference = Some(reference.into());
        self.pix_code = pix_code;
        self.boleto_line = boleto_line;
        self.touch();
    }

    /// Marks a card authorization.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidStateTransition` unless Pending.
    pub fn authorize(&mut self) -> DomainResult<()> {
        self.transition_to(TransactionStatus::Authorized)
    }

    /// Marks the funds as captured.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidStateTransition` unless Pending or Authorized.
    pub fn mark_paid(&mut self) -> DomainResult<()> {
        self.transition_to(TransactionStatus::Paid)?;
        self.paid_at = Some(self.updated_at);
        Ok(())
    }

    /// Marks the charge as refused.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidStateTransition` unless Pending or Authorized.
    pub fn mark_failed(&mut self, reason: impl Into<String>) -> DomainResult<()> {
        self.transition_to(TransactionStatus::Failed)?;
        self.failure_reason = Some(reason.into());
        Ok(())
    }

    /// Cancels before capture.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidStateTransition` unless Pending or Authorized.
    pub fn cancel(&mut self) -> DomainResult<()> {
        self.transition_to(TransactionStatus::Cancelled)
    }

    /// Records money returned to the payer.
    ///
    /// # Errors
    ///
    /// - `DomainError::RefundExceedsAvailable` if `amount` is above the refundable amount
    /// - `DomainError::InvalidStateTransition` if the transaction is not refundable
    pub fn apply_refund(&mut self, amount: Money) -> DomainResult<()> {
        if !self.status.is_refundable() {
            return Err(DomainError::invalid_transition(
                "transaction",
                self.status,
                TransactionStatus::PartiallyRefunded,
            ));
        }
        let available = self.refundable_amount();
        if amount.is_zero() || amount > available {
            return Err(DomainError::RefundExceedsAvailable {
                requested: amount,
                available,
            });
        }
        let refunded = self.refunded_amount.checked_add(amount)?;
        let target = if refunded == self.amount {
            TransactionStatus::Refunded
        } else {
            TransactionStatus::PartiallyRefunded
        };
        self.transition_to(target)?;
        self.refunded_amount = refunded;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn payer() -> Payer {
        Payer {
            name: "João Souza".into(),
            email: "joao@example.com".into(),
            cpf: Some("111.444.777-35".parse().unwrap()),
        }
    }

    pub(crate) fn paid(cents: i64) -> Transaction {
        let mut tx = Transaction::new(
            TenantId::new_v4(),
            EventId::new_v4(),
            PaymentTarget::default(),
            Money::from_cents(cents),
            PaymentMethod::CreditCard,
            1,
            payer(),
            None,
        )
        .unwrap();
        tx.mark_paid().unwrap();
        tx
    }

    mod validation {
        use super::*;

        fn create(method: PaymentMethod, installments: u8, cents: i64) -> DomainResult<Transaction> {
            Transaction::new(
                TenantId::new_v4(),
                EventId::new_v4(),
                PaymentTarget::default(),
                Money::from_cents(cents),
                method,
                installments,
                payer(),
                None,
            )
        }

        #[test]
        fn zero_amount() {
            assert!(matches!(
                create(PaymentMethod::Pix, 1, 0),
                Err(DomainError::InvalidAmount(_))
            ));
        }

        #[test]
        fn installments_only_on_credit() {
            assert!(create(PaymentMethod::CreditCard, 12, 10_000).is_ok());
            assert!(create(PaymentMethod::CreditCard, 13, 10_000).is_err());
            assert!(create(PaymentMethod::Pix, 2, 10_000).is_err());
            assert!(create(PaymentMethod::Pix, 0, 10_000).is_err());
        }

        #[test]
        fn boleto_needs_cpf() {
            let mut p = payer();
            p.cpf = None;
            let result = Transaction::new(
                TenantId::new_v4(),
                EventId::new_v4(),
                PaymentTarget::default(),
                Money::from_cents(1000),
                PaymentMethod::Boleto,
                1,
                p,
                None,
            );
            assert!(result.is_err());
        }
    }

    mod refunds {
        use super::*;

        #[test]
        fn partial_then_full() {
            let mut tx = paid(10_000);
            tx.apply_refund(Money::from_cents(4_000)).unwrap();
            assert_eq!(tx.status(), TransactionStatus::PartiallyRefunded);
            assert_eq!(tx.refundable_amount(), Money::from_cents(6_000));
            tx.apply_refund(Money::from_cents(6_000)).unwrap();
            assert_eq!(tx.status(), TransactionStatus::Refunded);
            assert!(tx.refundable_amount().is_zero());
        }

        #[test]
        fn cannot_exceed_amount() {
            let mut tx = paid(10_000);
            let err = tx.apply_refund(Money::from_cents(10_001)).unwrap_err();
            assert!(matches!(err, DomainError::RefundExceedsAvailable { .. }));
            assert!(tx.refunded_amount().is_zero());
        }

        #[test]
        fn pending_is_not_refundable() {
            let mut tx = Transaction::new(
                TenantId::new_v4(),
                EventId::new_v4(),
                PaymentTarget::default(),
                Money::from_cents(1000),
                PaymentMethod::Pix,
                1,
                payer(),
                None,
            )
            .unwrap();
            assert!(tx.apply_refund(Money::from_cents(100)).is_err());
        }
    }

    #[test]
    fn lifecycle() {
        let mut tx = paid(500);
        assert!(tx.is_paid());
        assert!(tx.cancel().is_err());
        assert!(tx.mark_failed("late").is_err());
    }
}
