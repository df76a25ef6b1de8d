//! # Refund Aggregate Root
//!
//! A request to return money from a paid transaction. The lifecycle is the
//! [`RefundState`] machine; every transition is kept in the refund's history
//! so reviewers can see who decided what and when.

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::value_objects::{
    Money, RefundId, RefundState, TenantId, Timestamp, TransactionId, UserId,
};
use serde::{Deserialize, Serialize};

/// One recorded state change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct RefundTransition {
    /// Previous state.
    pub from: RefundState,
    /// New state.
    pub to: RefundState,
    /// When it happened.
    pub at: Timestamp,
    /// Free-text note (reviewer comment, gateway error).
    pub note: Option<String>,
}

/// Refund aggregate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Refund {
    id: RefundId,
    tenant_id: TenantId,
    transaction_id: TransactionId,
    amount: Money,
    reason: String,
    requested_by: UserId,
    state: RefundState,
    risk_score: u8,
    reviewed_by: Option<UserId>,
    rejection_reason: Option<String>,
    gateway_refund_id: Option<String>,
    attempts: u32,
    last_error: Option<String>,
    history: Vec<RefundTransition>,
    version: u64,
    created_at: Timestamp,
    updated_at: Timestamp,
}

impl Refund {
    /// Creates a refund in the `Requested` state.
    ///
    /// # Errors
    ///
    /// - `DomainError::InvalidAmount` for a zero amount
    /// - `DomainError::Validation` for a blank reason
    pub fn request(
        tenant_id: TenantId,
        transaction_id: TransactionId,
        amount: Money,
        reason: impl Into<String>,
        requested_by: UserId,
    ) -> DomainResult<Self> {
        if amount.is_zero() {
            return Err(DomainError::invalid_amount("refund amount must be positive"));
        }
        let reason = reason.into().trim().to_string();
        if reason.is_empty() {
            return Err(DomainError::validation("refund reason is required"));
        }
        let now = Timestamp::now();
        Ok(Self {
            id: RefundId::new_v4(),
            tenant_id,
            transaction_id,
            amount,
            reason,
            requested_by,
            state: RefundState::Requested,
            risk_score: 0,
            reviewed_by: None,
            rejection_reason: None,
            gateway_refund_id: None,
            attempts: 0,
            last_error: None,
            history: Vec::new(),
            version: 1,
            created_at: now,
            updated_at: now,
        })
    }

    fn transition_to(&mut self, target: RefundState, note: Option<String>) -> DomainResult<()> {
        if !self.state.can_transition_to(target) {
            return Err(DomainError::invalid_transition("refund", self.state, target));
        }
        let now = Timestamp::now();
        self.history.push(RefundTransition {
            from: self.state,
            to: target,
            at: now,
            note,
        });
        self.state = target;
        self.updated_at = now;
        self.version = self.version.saturating_add(1);
        Ok(())
    }

    // ========== Accessors ==========

    /// Returns the refund ID.
    #[inline]
    #[must_use]
    pub fn id(&self) -> RefundId {
        self.id
    }

    /// Returns the owning tenant.
    #[inline]
    #[must_use]
    pub fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }

    /// Returns the refunded transaction.
    #[inline]
    #[must_use]
    pub fn transaction_id(&self) -> TransactionId {
        self.transaction_id
    }

    /// Returns the amount to return.
    #[inline]
    #[must_use]
    pub fn amount(&self) -> Money {
        self.amount
    }

    /// Returns the requester's reason.
    #[inline]
    #[must_use]
    pub fn reason(&self) -> &str {
        &self.reason
    }

    /// Returns who requested it.
    #[inline]
    #[must_use]
    pub fn requested_by(&self) -> UserId {
        self.requested_by
    }

    /// Returns the state.
    #[inline]
    #[must_use]
    pub fn state(&self) -> RefundState {
        self.state
    }

    /// Returns the risk score (0-100).
    #[inline]
    #[must_use]
    pub fn risk_score(&self) -> u8 {
        self.risk_score
    }

    /// Returns the reviewer, if a human decided.
    #[inline]
    #[must_use]
    pub fn reviewed_by(&self) -> Option<UserId> {
        self.reviewed_by
    }

    /// Returns why it was rejected.
    #[inline]
    #[must_use]
    pub fn rejection_reason(&self) -> Option<&str> {
        self.rejection_reason.as_deref()
    }

    /// Returns the gateway's refund id.
    #[inline]
    #[must_use]
    pub fn gateway_refund_id(&self) -> Option<&str> {
        self.gateway_refund_id.as_deref()
    }

    /// Returns how many times processing was attempted.
    #[inline]
    #[must_use]
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Returns the last gateway error.
    #[inline]
    #[must_use]
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Returns the transition history, oldest first.
    #[inline]
    #[must_use]
    pub fn history(&self) -> &[RefundTransition] {
        &self.history
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

    // ========== Commands ==========

    /// Stores the risk score computed at request time.
    pub fn set_risk_score(&mut self, score: u8) {
        self.risk_score = score.min(100);
    }

    /// Sends the refund to manual review.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidStateTransition` unless Requested.
    pub fn send_to_review(&mut self, note: impl Into<String>) -> DomainResult<()> {
        self.transition_to(RefundState::UnderReview, Some(note.into()))
    }

    /// Approves the refund. `reviewer` is `None` for automatic approval.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidStateTransition` unless Requested or UnderReview.
    pub fn approve(&mut self, reviewer: Option<UserId>) -> DomainResult<()> {
        let note = reviewer.map_or_else(|| "auto-approved".to_string(), |r| format!("approved by {r}"));
        self.transition_to(RefundState::Approved, Some(note))?;
        self.reviewed_by = reviewer;
        Ok(())
    }

    /// Rejects the refund.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidStateTransition` unless Requested or UnderReview.
    pub fn reject(&mut self, reviewer: Option<UserId>, reason: impl Into<String>) -> DomainResult<()> {
        let reason = reason.into();
        self.transition_to(RefundState::Rejected, Some(reason.clone()))?;
        self.reviewed_by = reviewer;
        self.rejection_reason = Some(reason);
        Ok(())
    }

    /// Starts a gateway attempt.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidStateTransition` unless Approved or Failed.
    pub fn start_processing(&mut self) -> DomainResult<()> {
        self.transition_to(RefundState::Processing, None)?;
        self.attempts = self.attempts.saturating_add(1);
        Ok(())
    }

    /// Records the gateway's confirmation.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidStateTransition` unless Processing.
    pub fn complete(&mut self, gateway_refund_id: impl Into<String>) -> DomainResult<()> {
        let id = gateway_refund_id.into();
        self.transition_to(RefundState::Completed, Some(id.clone()))?;
        self.gateway_refund_id = Some(id);
        self.last_error = None;
        Ok(())
    }

    /// Records a gateway failure; the refund can be retried later.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidStateTransition` unless Processing.
    pub fn fail(&mut self, error: impl Into<String>) -> DomainResult<()> {
        let error = error.into();
        self.transition_to(RefundState::Failed, Some(error.clone()))?;
        self.last_error = Some(error);
        Ok(())
    }
}
