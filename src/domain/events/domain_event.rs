//! # Domain Event Trait
//!
//! Base trait for all domain events.
//!
//! This module provides the [`DomainEvent`] trait that all domain events
//! must implement, along with common event metadata.
//!
//! # Examples
//!
//! ```
//! use eventos::domain::events::domain_event::{EventMetadata, EventType};
//! use eventos::domain::value_objects::TenantId;
//! use uuid::Uuid;
//!
//! let aggregate = Uuid::new_v4();
//! let metadata = EventMetadata::new(TenantId::new_v4(), aggregate);
//! assert_eq!(metadata.aggregate_id, aggregate);
//! assert_eq!(EventType::Refund.to_string(), "REFUND");
//! ```

use crate::domain::value_objects::{DomainEventId, TenantId, Timestamp};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Type of domain event.
///
/// Categorizes events by their domain area.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    /// Event lifecycle.
    Event,
    /// Registrations and door movements.
    Attendance,
    /// PDV sales.
    Sales,
    /// Payment transactions.
    Payment,
    /// Refunds.
    Refund,
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Event => write!(f, "EVENT"),
            Self::Attendance => write!(f, "ATTENDANCE"),
            Self::Sales => write!(f, "SALES"),
            Self::Payment => write!(f, "PAYMENT"),
            Self::Refund => write!(f, "REFUND"),
        }
    }
}

impl std::str::FromStr for EventType {
    type Err = crate::domain::value_objects::ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "EVENT" => Ok(Self::Event),
            "ATTENDANCE" => Ok(Self::Attendance),
            "SALES" => Ok(Self::Sales),
            "PAYMENT" => Ok(Self::Payment),
            "REFUND" => Ok(Self::Refund),
            _ => Err(crate::domain::value_objects::ParseEnumError::InvalidValue(
                "EventType",
                s.to_string(),
            )),
        }
    }
}

/// Trait for all domain events.
///
/// Domain events are immutable records of something that happened to an
/// aggregate. They feed the audit trail.
///
/// # Required Methods
///
/// - [`event_id`](DomainEvent::event_id) - Unique identifier for this event
/// - [`tenant_id`](DomainEvent::tenant_id) - Tenant the aggregate belongs to
/// - [`aggregate_id`](DomainEvent::aggregate_id) - The aggregate this event relates to
/// - [`timestamp`](DomainEvent::timestamp) - When the event occurred
/// - [`event_type`](DomainEvent::event_type) - Category of the event
/// - [`event_name`](DomainEvent::event_name) - Human-readable event name
pub trait DomainEvent: Send + Sync + fmt::Debug {
    /// Returns the unique identifier for this event.
    fn event_id(&self) -> DomainEventId;

    /// Returns the owning tenant.
    fn tenant_id(&self) -> TenantId;

    /// Returns the id of the aggregate this event relates to.
    fn aggregate_id(&self) -> Uuid;

    /// Returns when this event occurred.
    fn timestamp(&self) -> Timestamp;

    /// Returns the type/category of this event.
    fn event_type(&self) -> EventType;

    /// Returns the human-readable name of this event.
    fn event_name(&self) -> &'static str;
}

/// Common metadata for all domain events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventMetadata {
    /// Unique identifier for this event.
    pub event_id: DomainEventId,
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Aggregate the event belongs to.
    pub aggregate_id: Uuid,
    /// When this event occurred.
    pub timestamp: Timestamp,
}

impl EventMetadata {
    /// Creates new event metadata with a generated event ID.
    #[must_use]
    pub fn new(tenant_id: TenantId, aggregate_id: Uuid) -> Self {
        Self {
            event_id: DomainEventId::new_v4(),
            tenant_id,
            aggregate_id,
            timestamp: Timestamp::now(),
        }
    }
}

/// Implements [`DomainEvent`] for a struct with a `metadata: EventMetadata` field.
macro_rules! impl_domain_event {
    ($ty:ty, $event_type:expr, $name:literal) => {
        impl $crate::domain::events::domain_event::DomainEvent for $ty {
            fn event_id(&self) -> $crate::domain::value_objects::DomainEventId {
                self.metadata.event_id
            }

            fn tenant_id(&self) -> $crate::domain::value_objects::TenantId {
                self.metadata.tenant_id
            }

            fn aggregate_id(&self) -> ::uuid::Uuid {
                self.metadata.aggregate_id
            }

            fn timestamp(&self) -> $crate::domain::value_objects::Timestamp {
                self.metadata.timestamp
            }

            fn event_type(&self) -> $crate::domain::events::domain_event::EventType {
                $event_type
            }

            fn event_name(&self) -> &'static str {
                $name
            }
        }
    };
}

pub(crate) use impl_domain_event;
