//! # In-Memory Event Store
//!
//! In-memory implementation of [`EventStore`] for tests and development.

use crate::domain::events::domain_event::EventType;
use crate::domain::value_objects::{TenantId, Timestamp};
use crate::infrastructure::persistence::event_store::{
    EventStore, EventStoreError, EventStoreResult, StoredEvent,
};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// In-memory implementation of [`EventStore`].
#[derive(Debug, Clone, Default)]
pub struct InMemoryEventStore {
    events: Arc<RwLock<Vec<StoredEvent>>>,
}

impl InMemoryEventStore {
    /// Creates a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    async fn select(&self, pred: impl Fn(&StoredEvent) -> bool) -> Vec<StoredEvent> {
        let events = self.events.read().await;
        events.iter().filter(|e| pred(e)).cloned().collect()
    }
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    async fn append(&self, event: StoredEvent) -> EventStoreResult<()> {
        let mut events = self.events.write().await;
        let taken = events
            .iter()
            .any(|e| e.aggregate_id == event.aggregate_id && e.sequence == event.sequence);
        if taken {
            return Err(EventStoreError::SequenceConflict {
                aggregate_id: event.aggregate_id,
                sequence: event.sequence,
            });
        }
        events.push(event);
        Ok(())
    }

    async fn get_events(
        &self,
        tenant: TenantId,
        aggregate_id: Uuid,
    ) -> EventStoreResult<Vec<StoredEvent>> {
        let mut found = self
            .select(|e| e.tenant_id == tenant && e.aggregate_id == aggregate_id)
            .await;
        found.sort_by_key(|e| e.sequence);
        Ok(found)
    }

    async fn get_events_since(
        &self,
        tenant: TenantId,
        since: Timestamp,
    ) -> EventStoreResult<Vec<StoredEvent>> {
        Ok(self
            .select(|e| e.tenant_id == tenant && e.timestamp.is_after(&since))
            .await)
    }

    async fn get_events_by_type(
        &self,
        tenant: TenantId,
        event_type: EventType,
    ) -> EventStoreResult<Vec<StoredEvent>> {
        Ok(self
            .select(|e| e.tenant_id == tenant && e.event_type == event_type)
            .await)
    }

    async fn count(&self) -> EventStoreResult<u64> {
        Ok(self.events.read().await.len() as u64)
    }

    async fn next_sequence(&self, aggregate_id: Uuid) -> EventStoreResult<u64> {
        let events = self.events.read().await;
        let max = events
            .iter()
            .filter(|e| e.aggregate_id == aggregate_id)
            .map(|e| e.sequence)
            .max()
            .unwrap_or(0);
        Ok(max + 1)
    }
}
