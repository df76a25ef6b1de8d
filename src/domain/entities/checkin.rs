//! # Check-in Log
//!
//! One entry per entrance. A participant has at most one *active* entry
//! (no check-out yet); checking out closes it and allows re-entry.

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::value_objects::{
    CheckinId, CheckinMethod, EventId, ParticipantId, TenantId, Timestamp, UserId,
};
use serde::{Deserialize, Serialize};

/// Check-in log entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckinLog {
    id: CheckinId,
    tenant_id: TenantId,
    event_id: EventId,
    participant_id: ParticipantId,
    method: CheckinMethod,
    operator_id: UserId,
    device: Option<String>,
    checked_in_at: Timestamp,
    checked_out_at: Option<Timestamp>,
}

impl CheckinLog {
    /// Opens a new session.
    #[must_use]
    pub fn open(
        tenant_id: TenantId,
        event_id: EventId,
        participant_id: ParticipantId,
        method: CheckinMethod,
        operator_id: UserId,
        device: Option<String>,
    ) -> Self {
        Self {
            id: CheckinId::new_v4(),
            tenant_id,
            event_id,
            participant_id,
            method,
            operator_id,
            device,
            checked_in_at: Timestamp::now(),
            checked_out_at: None,
        }
    }

    /// Returns the log ID.
    #[inline]
    #[must_use]
    pub fn id(&self) -> CheckinId {
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

    /// Returns the participant.
    #[inline]
    #[must_use]
    pub fn participant_id(&self) -> ParticipantId {
        self.participant_id
    }

    /// Returns how the participant was identified.
    #[inline]
    #[must_use]
    pub fn method(&self) -> CheckinMethod {
        self.method
    }

    /// Returns the operator who let the participant in.
    #[inline]
    #[must_use]
    pub fn operator_id(&self) -> UserId {
        self.operator_id
    }

    /// Returns the scanning device, if reported.
    #[inline]
    #[must_use]
    pub fn device(&self) -> Option<&str> {
        self.device.as_deref()
    }

    /// Returns the entrance time.
    #[inline]
    #[must_use]
    pub fn checked_in_at(&self) -> Timestamp {
        self.checked_in_at
    }

    /// Returns the exit time.
    #[inline]
    #[must_use]
    pub fn checked_out_at(&self) -> Option<Timestamp> {
        self.checked_out_at
    }

    /// Returns true while the participant is inside.
    #[inline]
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.checked_out_at.is_none()
    }

    /// Closes the session.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidStateTransition` if already closed.
    pub fn check_out(&mut self) -> DomainResult<()> {
        if !self.is_active() {
            return Err(DomainError::invalid_transition(
                "checkin",
                "CHECKED_OUT",
                "CHECKED_OUT",
            ));
        }
        self.checked_out_at = Some(Timestamp::now());
        Ok(())
    }
}
