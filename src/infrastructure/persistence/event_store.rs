//! # Event Store
//!
//! Append-only storage for domain events, used as the audit trail.
//!
//! Events are stored with a per-aggregate sequence number starting at 1.
//! Payloads are kept as JSON so the store does not need to know every event
//! type.

use crate::domain::events::domain_event::{DomainEvent, EventType};
use crate::domain::value_objects::{DomainEventId, TenantId, Timestamp};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

/// Error type for event store operations.
#[derive(Debug, Error)]
pub enum EventStoreError {
    /// Another writer already used this sequence number.
    #[error("sequence conflict on aggregate {aggregate_id}: {sequence}")]
    SequenceConflict {
        /// Aggregate.
        aggregate_id: Uuid,
        /// Sequence that was taken.
        sequence: u64,
    },

    /// Payload could not be serialized.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Stored row could not be decoded.
    #[error("deserialization error: {0}")]
    Deserialization(String),

    /// Query failed.
    #[error("query error: {0}")]
    Query(String),
}

impl EventStoreError {
    /// Creates a serialization error.
    #[must_use]
    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::Serialization(msg.into())
    }

    /// Creates a deserialization error.
    #[must_use]
    pub fn deserialization(msg: impl Into<String>) -> Self {
        Self::Deserialization(msg.into())
    }

    /// Creates a query error.
    #[must_use]
    pub fn query(msg: impl Into<String>) -> Self {
        Self::Query(msg.into())
    }
}

/// Result type for event store operations.
pub type EventStoreResult<T> = Result<T, EventStoreError>;

/// A persisted domain event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct StoredEvent {
    /// Event ID.
    pub event_id: DomainEventId,
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Aggregate the event belongs to.
    pub aggregate_id: Uuid,
    /// Event category.
    pub event_type: EventType,
    /// Event name, e.g. `RefundCompleted`.
    pub event_name: String,
    /// When the event occurred.
    pub timestamp: Timestamp,
    /// Full event as JSON.
    pub payload: serde_json::Value,
    /// Position within the aggregate's stream.
    pub sequence: u64,
}

impl StoredEvent {
    /// Serializes a domain event at the given sequence.
    ///
    /// # Errors
    ///
    /// Returns `EventStoreError::Serialization` if the payload cannot be
    /// encoded.
    pub fn from_event<E>(event: &E, sequence: u64) -> EventStoreResult<Self>
    where
        E: DomainEvent + Serialize,
    {
        let payload =
            serde_json::to_value(event).map_err(|e| EventStoreError::serialization(e.to_string()))?;
        Ok(Self {
            event_id: event.event_id(),
            tenant_id: event.tenant_id(),
            aggregate_id: event.aggregate_id(),
            event_type: event.event_type(),
            event_name: event.event_name().to_string(),
            timestamp: event.timestamp(),
            payload,
            sequence,
        })
    }
}

/// Append-only domain event storage.
#[async_trait]
pub trait EventStore: Send + Sync + fmt::Debug {
    /// Appends an event.
    ///
    /// # Errors
    ///
    /// Returns `EventStoreError::SequenceConflict` if the aggregate already
    /// has an event at that sequence.
    async fn append(&self, event: StoredEvent) -> EventStoreResult<()>;

    /// Returns the stream of one aggregate in sequence order.
    async fn get_events(
        &self,
        tenant: TenantId,
        aggregate_id: Uuid,
    ) -> EventStoreResult<Vec<StoredEvent>>;

    /// Returns the tenant's events after `since`, oldest first.
    async fn get_events_since(
        &self,
        tenant: TenantId,
        since: Timestamp,
    ) -> EventStoreResult<Vec<StoredEvent>>;

    /// Returns the tenant's events of one category, oldest first.
    async fn get_events_by_type(
        &self,
        tenant: TenantId,
        event_type: EventType,
    ) -> EventStoreResult<Vec<StoredEvent>>;

    /// Counts all stored events.
    async fn count(&self) -> EventStoreResult<u64>;

    /// Returns the next free sequence for an aggregate.
    async fn next_sequence(&self, aggregate_id: Uuid) -> EventStoreResult<u64>;
}

/// Number of times [`record`] retries after a sequence conflict.
const RECORD_ATTEMPTS: u32 = 3;

/// Appends `event` at the next free sequence of its aggregate.
///
/// # Errors
///
/// Returns the last store error if every attempt fails.
pub async fn record<E>(store: &dyn EventStore, event: &E) -> EventStoreResult<()>
where
    E: DomainEvent + Serialize,
{
    let mut attempt = 0;
    loop {
        attempt += 1;
        let sequence = store.next_sequence(event.aggregate_id()).await?;
        match store.append(StoredEvent::from_event(event, sequence)?).await {
            Err(EventStoreError::SequenceConflict { .. }) if attempt < RECORD_ATTEMPTS => continue,
            other => return other,
        }
    }
}
