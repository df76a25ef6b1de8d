//! # Attendance Events
//!
//! Events for the event lifecycle, registrations and door movements.
//!
//! # Event Flow
//!
//! ```text
//! EventPublished -> ParticipantRegistered* -> ParticipantCheckedIn* -> ParticipantCheckedOut*
//!
//! At any point before finishing: EventCancelled
//! ```

use crate::domain::events::domain_event::{EventMetadata, EventType, impl_domain_event};
use crate::domain::value_objects::{CheckinMethod, EventId, ParticipantId, TenantId, UserId};
use serde::{Deserialize, Serialize};

/// Emitted when an event opens for registrations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventPublished {
    /// Event metadata.
    pub metadata: EventMetadata,
    /// Event name at publication time.
    pub name: String,
}

impl EventPublished {
    /// Creates a new `EventPublished` event.
    #[must_use]
    pub fn new(tenant_id: TenantId, event_id: EventId, name: impl Into<String>) -> Self {
        Self {
            metadata: EventMetadata::new(tenant_id, event_id.as_uuid()),
            name: name.into(),
        }
    }
}

impl_domain_event!(EventPublished, EventType::Event, "EventPublished");

/// Emitted when an event is cancelled (soft-deleted).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventCancelled {
    /// Event metadata.
    pub metadata: EventMetadata,
    /// Why it was cancelled.
    pub reason: String,
    /// Number of active participants that were notified.
    pub participants_notified: usize,
}

impl EventCancelled {
    /// Creates a new `EventCancelled` event.
    #[must_use]
    pub fn new(
        tenant_id: TenantId,
        event_id: EventId,
        reason: impl Into<String>,
        participants_notified: usize,
    ) -> Self {
        Self {
            metadata: EventMetadata::new(tenant_id, event_id.as_uuid()),
            reason: reason.into(),
            participants_notified,
        }
    }
}

impl_domain_event!(EventCancelled, EventType::Event, "EventCancelled");

/// Emitted when a participant registers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantRegistered {
    /// Event metadata; the aggregate is the participant.
    pub metadata: EventMetadata,
    /// Event registered for.
    pub event_id: EventId,
    /// Ticket type.
    pub ticket_type: String,
}

impl ParticipantRegistered {
    /// Creates a new `ParticipantRegistered` event.
    #[must_use]
    pub fn new(
        tenant_id: TenantId,
        participant_id: ParticipantId,
        event_id: EventId,
        ticket_type: impl Into<String>,
    ) -> Self {
        Self {
            metadata: EventMetadata::new(tenant_id, participant_id.as_uuid()),
            event_id,
            ticket_type: ticket_type.into(),
        }
    }
}

impl_domain_event!(
    ParticipantRegistered,
    EventType::Attendance,
    "ParticipantRegistered"
);

/// Emitted when a participant enters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantCheckedIn {
    /// Event metadata; the aggregate is the participant.
    pub metadata: EventMetadata,
    /// Event entered.
    pub event_id: EventId,
    /// Identification method.
    pub method: CheckinMethod,
    /// Operator at the door.
    pub operator_id: UserId,
}

impl ParticipantCheckedIn {
    /// Creates a new `ParticipantCheckedIn` event.
    #[must_use]
    pub fn new(
        tenant_id: TenantId,
        participant_id: ParticipantId,
        event_id: EventId,
        method: CheckinMethod,
        operator_id: UserId,
    ) -> Self {
        Self {
            metadata: EventMetadata::new(tenant_id, participant_id.as_uuid()),
            event_id,
            method,
            operator_id,
        }
    }
}

impl_domain_event!(
    ParticipantCheckedIn,
    EventType::Attendance,
    "ParticipantCheckedIn"
);

/// Emitted when a participant leaves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantCheckedOut {
    /// Event metadata; the aggregate is the participant.
    pub metadata: EventMetadata,
    /// Event left.
    pub event_id: EventId,
}

impl ParticipantCheckedOut {
    /// Creates a new `ParticipantCheckedOut` event.
    #[must_use]
    pub fn new(tenant_id: TenantId, participant_id: ParticipantId, event_id: EventId) -> Self {
        Self {
            metadata: EventMetadata::new(tenant_id, participant_id.as_uuid()),
            event_id,
        }
    }
}

impl_domain_event!(
    ParticipantCheckedOut,
    EventType::Attendance,
    "ParticipantCheckedOut"
);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::events::domain_event::DomainEvent;

    #[test]
    fn checked_in_targets_participant() {
        let participant = ParticipantId::new_v4();
        let event = ParticipantCheckedIn::new(
            TenantId::new_v4(),
            participant,
            EventId::new_v4(),
            CheckinMethod::Cpf,
            UserId::new_v4(),
        );
        assert_eq!(event.aggregate_id(), participant.as_uuid());
        assert_eq!(event.event_type(), EventType::Attendance);
        assert_eq!(event.event_name(), "ParticipantCheckedIn");
    }

    #[test]
    fn cancelled_targets_event() {
        let id = EventId::new_v4();
        let event = EventCancelled::new(TenantId::new_v4(), id, "rain", 3);
        assert_eq!(event.aggregate_id(), id.as_uuid());
        assert_eq!(event.event_type(), EventType::Event);
    }
}
