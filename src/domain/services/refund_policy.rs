//! # Refund Policy
//!
//! Sequential rule checks deciding what happens to a refund request.
//!
//! The checks run in order and the first one that applies wins:
//!
//! 1. The transaction must be paid or partially refunded (error).
//! 2. The amount must fit in what is still refundable once outstanding
//!    refunds are subtracted (error).
//! 3. The request must fall inside the consumer withdrawal window after
//!    payment **or** far enough ahead of the event start (reject).
//! 4. A risk score at or above the review threshold goes to review.
//! 5. An amount above the auto-approve limit goes to review.
//! 6. Anything else is approved automatically.
//!
//! Checks 1 and 2 are invariant violations and surface as errors; no refund
//! is recorded. Check 3 records a rejected refund so the requester can see
//! why.

use crate::domain::entities::Transaction;
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::value_objects::{Money, TransactionStatus, Timestamp};
use serde::{Deserialize, Serialize};

/// Tunable limits of the refund policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RefundPolicyConfig {
    /// Days after payment in which a refund is always within the window.
    pub withdrawal_window_days: i64,
    /// Minimum hours before the event start for a refund outside the
    /// withdrawal window.
    pub pre_event_cutoff_hours: i64,
    /// Largest amount approved without review.
    pub auto_approve_limit: Money,
    /// Risk score at or above which a human must review.
    pub review_risk_threshold: u8,
}

impl Default for RefundPolicyConfig {
    fn default() -> Self {
        Self {
            withdrawal_window_days: 7,
            pre_event_cutoff_hours: 48,
            auto_approve_limit: Money::from_cents(50_000),
            review_risk_threshold: 70,
        }
    }
}

/// Outcome of [`RefundPolicy::evaluate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefundDecision {
    /// Approve and process immediately.
    AutoApprove,
    /// Park for a manager, with the reason.
    Review(String),
    /// Refuse, with the reason.
    Reject(String),
}

/// Everything the policy looks at.
#[derive(Debug, Clone, Copy)]
pub struct RefundRequestContext<'a> {
    /// Transaction being refunded.
    pub transaction: &'a Transaction,
    /// Start of the event the transaction belongs to.
    pub event_starts_at: Timestamp,
    /// Requested amount.
    pub amount: Money,
    /// Sum of refunds on this transaction that are not yet completed or rejected.
    pub outstanding: Money,
    /// Risk score of the request.
    pub risk_score: u8,
    /// Evaluation time.
    pub now: Timestamp,
}

/// Refund policy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RefundPolicy {
    config: RefundPolicyConfig,
}

impl RefundPolicy {
    /// Creates a policy with explicit limits.
    #[must_use]
    pub fn new(config: RefundPolicyConfig) -> Self {
        Self { config }
    }

    /// Returns the configured limits.
    #[must_use]
    pub fn config(&self) -> &RefundPolicyConfig {
        &self.config
    }

    /// Evaluates a refund request.
    ///
    /// # Errors
    ///
    /// - `DomainError::InvalidStateTransition` if the transaction is not refundable
    /// - `DomainError::RefundExceedsAvailable` if the amount does not fit
    pub fn evaluate(&self, ctx: &RefundRequestContext<'_>) -> DomainResult<RefundDecision> {
        let tx = ctx.transaction;
        if !tx.status().is_refundable() {
            return Err(DomainError::invalid_transition(
                "transaction",
                tx.status(),
                TransactionStatus::PartiallyRefunded,
            ));
        }

        let available = tx.refundable_amount().saturating_sub(ctx.outstanding);
        if ctx.amount.is_zero() || ctx.amount > available {
            return Err(DomainError::RefundExceedsAvailable {
                requested: ctx.amount,
                available,
            });
        }

        let paid_at = tx.paid_at().unwrap_or_else(|| tx.created_at());
        let in_withdrawal_window = !ctx
            .now
            .is_after(&paid_at.add_days(self.config.withdrawal_window_days));
        let ahead_of_event = ctx.now.hours_until(&ctx.event_starts_at)
            >= self.config.pre_event_cutoff_hours;
        if !in_withdrawal_window && !ahead_of_event {
            return Ok(RefundDecision::Reject(format!(
                "outside the {}-day withdrawal window and less than {}h before the event",
                self.config.withdrawal_window_days, self.config.pre_event_cutoff_hours
            )));
        }

        if ctx.risk_score >= self.config.review_risk_threshold {
            return Ok(RefundDecision::Review(format!(
                "risk score {} at or above {}",
                ctx.risk_score, self.config.review_risk_threshold
            )));
        }
        if ctx.amount > self.config.auto_approve_limit {
            return Ok(RefundDecision::Review(format!(
                "amount {} above auto-approve limit {}",
                ctx.amount, self.config.auto_approve_limit
            )));
        }
        Ok(RefundDecision::AutoApprove)
    }
}
