//! # Event Aggregate Root
//!
//! An event is the gathering that participants register for, that the PDV
//! sells at and that the door checks people into. Everything else in the
//! system hangs off an event and its tenant.
//!
//! # State Machine
//!
//! ```text
//! Draft → Published → InProgress → Finished
//!   ↓         ↓           ↓
//!   └─────────┴───────────┴→ Cancelled
//! ```
//!
//! Cancelling is a soft delete: the row stays, with the reason and time.
//!
//! # Examples
//!
//! ```
//! use eventos::domain::entities::event::{Event, EventDetails};
//! use eventos::domain::value_objects::{EventStatus, TenantId, Timestamp};
//!
//! let starts_at = Timestamp::now().add_days(10);
//! let mut event = Event::new(
//!     TenantId::new_v4(),
//!     EventDetails {
//!         name: "Tech Summit".into(),
//!         description: None,
//!         venue: "Expo Center".into(),
//!         starts_at,
//!         ends_at: starts_at.add_hours(8),
//!         capacity: Some(500),
//!     },
//! )
//! .unwrap();
//!
//! event.publish().unwrap();
//! assert_eq!(event.status(), EventStatus::Published);
//! ```

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::value_objects::{EventId, EventStatus, TenantId, Timestamp};
use serde::{Deserialize, Serialize};

/// Editable attributes of an event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct EventDetails {
    /// Display name.
    pub name: String,
    /// Free-text description.
    #[serde(default)]
    pub description: Option<String>,
    /// Venue name or address.
    pub venue: String,
    /// Start of the event.
    pub starts_at: Timestamp,
    /// End of the event; must be after `starts_at`.
    pub ends_at: Timestamp,
    /// Maximum active registrations; unlimited when absent.
    #[serde(default)]
    pub capacity: Option<u32>,
}

impl EventDetails {
    fn validate(&self) -> DomainResult<()> {
        if self.name.trim().is_empty() {
            return Err(DomainError::validation("name is required"));
        }
        if self.venue.trim().is_empty() {
            return Err(DomainError::validation("venue is required"));
        }
        if !self.ends_at.is_after(&self.starts_at) {
            return Err(DomainError::validation("ends_at must be after starts_at"));
        }
        if self.capacity == Some(0) {
            return Err(DomainError::validation("capacity must be positive"));
        }
        Ok(())
    }
}

/// Event aggregate root.
///
/// # Invariants
///
/// - Name and venue are never blank
/// - `ends_at` is strictly after `starts_at`
/// - Capacity, when set, is positive
/// - Finished and cancelled events are read-only
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    id: EventId,
    tenant_id: TenantId,
    name: String,
    description: Option<String>,
    venue: String,
    starts_at: Timestamp,
    ends_at: Timestamp,
    capacity: Option<u32>,
    status: EventStatus,
    cancellation_reason: Option<String>,
    cancelled_at: Option<Timestamp>,
    version: u64,
    created_at: Timestamp,
    updated_at: Timestamp,
}

impl Event {
    /// Creates a draft event.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if the details break an invariant.
    pub fn new(tenant_id: TenantId, details: EventDetails) -> DomainResult<Self> {
        details.validate()?;
        let now = Timestamp::now();
        Ok(Self {
            id: EventId::new_v4(),
            tenant_id,
            name: details.name.trim().to_string(),
            description: details.description,
            venue: details.venue.trim().to_string(),
            starts_at: details.starts_at,
            ends_at: details.ends_at,
            capacity: details.capacity,
            status: EventStatus::Draft,
            cancellation_reason: None,
            cancelled_at: None,
            version: 1,
            created_at: now,
            updated_at: now,
        })
    }

    fn transition_to(&mut self, target: EventStatus) -> DomainResult<()> {
        if !self.status.can_transition_to(target) {
            return Err(DomainError::invalid_transition("event", self.status, target));
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

    /// Returns the event ID.
    #[inline]
    #[must_use]
    pub fn id(&self) -> EventId {
        self.id
    }

    /// Returns the owning tenant.
    #[inline]
    #[must_use]
    pub fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }

    /// Returns the display name.
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the description.
    #[inline]
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Returns the venue.
    #[inline]
    #[must_use]
    pub fn venue(&self) -> &str {
        &self.venue
    }

    /// Returns the start time.
    #[inline]
    #[must_use]
    pub fn starts_at(&self) -> Timestamp {
        self.starts_at
    }

    /// Returns the end time.
    #[inline]
    #[must_use]
    pub fn ends_at(&self) -> Timestamp {
        self.ends_at
    }

    /// Returns the capacity, if limited.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> Option<u32> {
        self.capacity
    }

    /// Returns the lifecycle status.
    #[inline]
    #[must_use]
    pub fn status(&self) -> EventStatus {
        self.status
    }

    /// Returns why the event was cancelled.
    #[inline]
    #[must_use]
    pub fn cancellation_reason(&self) -> Option<&str> {
        self.cancellation_reason.as_deref()
    }

    /// Returns when the event was cancelled.
    #[inline]
    #[must_use]
    pub fn cancelled_at(&self) -> Option<Timestamp> {
        self.cancelled_at
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

    /// Returns true if the event was soft-deleted.
    #[inline]
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.status == EventStatus::Cancelled
    }

    /// Returns true if one more registration fits, given the current count
    /// of active registrations.
    #[must_use]
    pub fn has_room_for(&self, active_registrations: usize) -> bool {
        self.capacity
            .is_none_or(|cap| active_registrations < usize::try_from(cap).unwrap_or(usize::MAX))
    }

    // ========== Commands ==========

    /// Replaces the editable details.
    ///
    /// # Errors
    ///
    /// - `DomainError::InvalidStateTransition` if the event is finished or cancelled
    /// - `DomainError::Validation` if the new details are invalid
    pub fn update(&mut self, details: EventDetails) -> DomainResult<()> {
        if self.status.is_terminal() {
            return Err(DomainError::invalid_transition("event", self.status, "UPDATED"));
        }
        details.validate()?;
        self.name = details.name.trim().to_string();
        self.description = details.description;
        self.venue = details.venue.trim().to_string();
        self.starts_at = details.starts_at;
        self.ends_at = details.ends_at;
        self.capacity = details.capacity;
        self.touch();
        Ok(())
    }

    /// Opens registrations.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidStateTransition` unless in Draft.
    pub fn publish(&mut self) -> DomainResult<()> {
        self.transition_to(EventStatus::Published)
    }

    /// Opens the doors.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidStateTransition` unless Published.
    pub fn start(&mut self) -> DomainResult<()> {
        self.transition_to(EventStatus::InProgress)
    }

    /// Closes the event.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidStateTransition` unless in progress.
    pub fn finish(&mut self) -> DomainResult<()> {
        self.transition_to(EventStatus::Finished)
    }

    /// Soft-deletes the event.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidStateTransition` if already terminal.
    pub fn cancel(&mut self, reason: impl Into<String>) -> DomainResult<()> {
        self.transition_to(EventStatus::Cancelled)?;
        self.cancellation_reason = Some(reason.into());
        self.cancelled_at = Some(self.updated_at);
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn details() -> EventDetails {
        let starts_at = Timestamp::now().add_days(30);
        EventDetails {
            name: "Festival de Inverno".into(),
            description: Some("Três dias de música".into()),
            venue: "Parque da Cidade".into(),
            starts_at,
            ends_at: starts_at.add_hours(10),
            capacity: Some(2),
        }
    }

    mod creation {
        use super::*;

        #[test]
        fn starts_as_draft() {
            let event = Event::new(TenantId::new_v4(), details()).unwrap();
            assert_eq!(event.status(), EventStatus::Draft);
            assert_eq!(event.version(), 1);
        }

        #[test]
        fn rejects_blank_name() {
            let mut d = details();
            d.name = "  ".into();
            assert!(matches!(
                Event::new(TenantId::new_v4(), d),
                Err(DomainError::Validation(_))
            ));
        }

        #[test]
        fn rejects_end_before_start() {
            let mut d = details();
            d.ends_at = d.starts_at.add_hours(-1);
            assert!(Event::new(TenantId::new_v4(), d).is_err());
        }

        #[test]
        fn rejects_zero_capacity() {
            let mut d = details();
            d.capacity = Some(0);
            assert!(Event::new(TenantId::new_v4(), d).is_err());
        }
    }

    mod lifecycle {
        use super::*;

        #[test]
        fn full_lifecycle_bumps_version() {
            let mut event = Event::new(TenantId::new_v4(), details()).unwrap();
            event.publish().unwrap();
            event.start().unwrap();
            event.finish().unwrap();
            assert_eq!(event.status(), EventStatus::Finished);
            assert_eq!(event.version(), 4);
        }

        #[test]
        fn cannot_start_draft() {
            let mut event = Event::new(TenantId::new_v4(), details()).unwrap();
            assert!(matches!(
                event.start(),
                Err(DomainError::InvalidStateTransition { .. })
            ));
        }

        #[test]
        fn cancel_records_reason() {
            let mut event = Event::new(TenantId::new_v4(), details()).unwrap();
            event.cancel("venue flooded").unwrap();
            assert!(event.is_cancelled());
            assert_eq!(event.cancellation_reason(), Some("venue flooded"));
            assert!(event.cancelled_at().is_some());
            assert!(event.cancel("again").is_err());
        }

        #[test]
        fn finished_event_cannot_be_updated() {
            let mut event = Event::new(TenantId::new_v4(), details()).unwrap();
            event.publish().unwrap();
            event.start().unwrap();
            event.finish().unwrap();
            assert!(event.update(details()).is_err());
        }
    }

    #[test]
    fn capacity_check() {
        let event = Event::new(TenantId::new_v4(), details()).unwrap();
        assert!(event.has_room_for(1));
        assert!(!event.has_room_for(2));
    }
}
