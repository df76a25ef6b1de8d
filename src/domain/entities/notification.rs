//! # Notification
//!
//! An outbound message. Persisted before the first send so failures can be
//! retried later.

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::value_objects::{
    NotificationChannel, NotificationId, NotificationStatus, TenantId, Timestamp,
};
use serde::{Deserialize, Serialize};

/// Outbound message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    id: NotificationId,
    tenant_id: TenantId,
    channel: NotificationChannel,
    recipient: String,
    subject: Option<String>,
    body: String,
    status: NotificationStatus,
    attempts: u32,
    last_error: Option<String>,
    sent_at: Option<Timestamp>,
    created_at: Timestamp,
    updated_at: Timestamp,
}

impl Notification {
    /// Creates a pending notification.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` for a blank recipient or body, or an
    /// e-mail recipient without `@`.
    pub fn new(
        tenant_id: TenantId,
        channel: NotificationChannel,
        recipient: impl Into<String>,
        subject: Option<String>,
        body: impl Into<String>,
    ) -> DomainResult<Self> {
        let recipient = recipient.into().trim().to_string();
        let body = body.into();
        if recipient.is_empty() {
            return Err(DomainError::validation("recipient is required"));
        }
        if body.trim().is_empty() {
            return Err(DomainError::validation("message body is required"));
        }
        if channel == NotificationChannel::Email && !recipient.contains('@') {
            return Err(DomainError::validation("email recipient is invalid"));
        }
        let now = Timestamp::now();
        Ok(Self {
            id: NotificationId::new_v4(),
            tenant_id,
            channel,
            recipient,
            subject,
            body,
            status: NotificationStatus::Pending,
            attempts: 0,
            last_error: None,
            sent_at: None,
            created_at: now,
            updated_at: now,
        })
    }

    fn transition_to(&mut self, target: NotificationStatus) -> DomainResult<()> {
        if !self.status.can_transition_to(target) {
            return Err(DomainError::invalid_transition(
                "notification",
                self.status,
                target,
            ));
        }
        self.status = target;
        self.updated_at = Timestamp::now();
        Ok(())
    }

    /// Returns the notification ID.
    #[inline]
    #[must_use]
    pub fn id(&self) -> NotificationId {
        self.id
    }

    /// Returns the owning tenant.
    #[inline]
    #[must_use]
    pub fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }

    /// Returns the channel.
    #[inline]
    #[must_use]
    pub fn channel(&self) -> NotificationChannel {
        self.channel
    }

    /// Returns the address, phone number or device token.
    #[inline]
    #[must_use]
    pub fn recipient(&self) -> &str {
        &self.recipient
    }

    /// Returns the subject line.
    #[inline]
    #[must_use]
    pub fn subject(&self) -> Option<&str> {
        self.subject.as_deref()
    }

    /// Returns the message body.
    #[inline]
    #[must_use]
    pub fn body(&self) -> &str {
        &self.body
    }

    /// Returns the delivery status.
    #[inline]
    #[must_use]
    pub fn status(&self) -> NotificationStatus {
        self.status
    }

    /// Returns the number of send attempts.
    #[inline]
    #[must_use]
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Returns the last provider error.
    #[inline]
    #[must_use]
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Returns the delivery time.
    #[inline]
    #[must_use]
    pub fn sent_at(&self) -> Option<Timestamp> {
        self.sent_at
    }

    /// Returns the creation time.
    #[inline]
    #[must_use]
    pub fn created_at(&self) -> Timestamp {
        self.created_at
    }

    /// Counts one send attempt.
    pub fn record_attempt(&mut self) {
        self.attempts = self.attempts.saturating_add(1);
        self.updated_at = Timestamp::now();
    }

    /// Marks the message as delivered.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidStateTransition` if already sent.
    pub fn mark_sent(&mut self) -> DomainResult<()> {
        self.transition_to(NotificationStatus::Sent)?;
        self.sent_at = Some(self.updated_at);
        self.last_error = None;
        Ok(())
    }

    /// Marks the message as undeliverable for now.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidStateTransition` if already sent.
    pub fn mark_failed(&mut self, error: impl Into<String>) -> DomainResult<()> {
        self.transition_to(NotificationStatus::Failed)?;
        self.last_error = Some(error.into());
        Ok(())
    }
}
