//! # Audit Trail
//!
//! Thin wrapper over the [`EventStore`] shared by every service.
//!
//! Writing an audit record never fails the business operation that produced
//! it; a failed append is logged at `warn` and the operation continues.

use crate::application::error::{ApplicationError, ApplicationResult};
use crate::domain::events::{DomainEvent, EventType};
use crate::domain::value_objects::{TenantId, Timestamp};
use crate::infrastructure::persistence::event_store::record;
use crate::infrastructure::persistence::{EventStore, StoredEvent};
use serde::Serialize;
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

/// Filter for [`AuditLog::trail`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AuditQuery {
    /// One aggregate's stream, in sequence order.
    pub aggregate_id: Option<Uuid>,
    /// One category of events.
    pub event_type: Option<EventType>,
    /// Only events after this instant.
    pub since: Option<Timestamp>,
}

/// Records and reads domain events.
#[derive(Debug, Clone)]
pub struct AuditLog {
    store: Arc<dyn EventStore>,
}

impl AuditLog {
    /// Creates an audit log over `store`.
    #[must_use]
    pub fn new(store: Arc<dyn EventStore>) -> Self {
        Self { store }
    }

    /// Appends `event`, logging instead of failing.
    pub async fn record<E>(&self, event: &E)
    where
        E: DomainEvent + Serialize,
    {
        if let Err(e) = record(self.store.as_ref(), event).await {
            warn!(
                event = event.event_name(),
                aggregate_id = %event.aggregate_id(),
                error = %e,
                "audit record dropped"
            );
        }
    }

    /// Returns the tenant's events matching `query`.
    ///
    /// # Errors
    ///
    /// - `ApplicationError::Validation` when no filter is given
    /// - `ApplicationError::Infrastructure` if the store fails
    pub async fn trail(&self, tenant: TenantId, query: AuditQuery) -> ApplicationResult<Vec<StoredEvent>> {
        let mut events = match (query.aggregate_id, query.event_type, query.since) {
            (Some(aggregate), _, _) => self.store.get_events(tenant, aggregate).await?,
            (None, Some(kind), _) => self.store.get_events_by_type(tenant, kind).await?,
            (None, None, Some(since)) => self.store.get_events_since(tenant, since).await?,
            (None, None, None) => {
                return Err(ApplicationError::validation(
                    "one of aggregate_id, event_type or since is required",
                ));
            }
        };
        events.retain(|e| {
            query.event_type.is_none_or(|t| e.event_type == t)
                && query.since.is_none_or(|s| e.timestamp.is_after(&s))
        });
        Ok(events)
    }

    /// Total number of stored events; used by health checks.
    ///
    /// # Errors
    ///
    /// Returns an infrastructure error if the store fails.
    pub async fn count(&self) -> ApplicationResult<u64> {
        Ok(self.store.count().await?)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::domain::events::{EventPublished, RefundRejected};
    use crate::domain::value_objects::{EventId, RefundId};
    use crate::infrastructure::persistence::in_memory::InMemoryEventStore;

    #[tokio::test]
    async fn trail_filters_by_aggregate_and_type() {
        let audit = AuditLog::new(Arc::new(InMemoryEventStore::new()));
        let tenant = TenantId::new_v4();
        let event = EventId::new_v4();
        audit.record(&EventPublished::new(tenant, event, "Show")).await;
        audit
            .record(&RefundRejected::new(tenant, RefundId::new_v4(), "fora do prazo"))
            .await;

        let stream = audit
            .trail(
                tenant,
                AuditQuery {
                    aggregate_id: Some(event.as_uuid()),
                    ..AuditQuery::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(stream.len(), 1);
        assert_eq!(stream.first().unwrap().event_name, "EventPublished");

        let refunds = audit
            .trail(
                tenant,
                AuditQuery {
                    event_type: Some(EventType::Refund),
                    ..AuditQuery::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(refunds.len(), 1);
        assert_eq!(audit.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn empty_query_is_rejected() {
        let audit = AuditLog::new(Arc::new(InMemoryEventStore::new()));
        assert!(
            audit
                .trail(TenantId::new_v4(), AuditQuery::default())
                .await
                .unwrap_err()
                .is_validation()
        );
    }
}
