//! # PostgreSQL Event Store
//!
//! PostgreSQL implementation of [`EventStore`] using sqlx.
//!
//! Events are append-only rows with a JSONB payload. The unique index on
//! `(aggregate_id, sequence)` turns concurrent appends into
//! [`EventStoreError::SequenceConflict`].

use crate::domain::events::domain_event::EventType;
use crate::domain::value_objects::{DomainEventId, TenantId, Timestamp};
use crate::infrastructure::persistence::event_store::{
    EventStore, EventStoreError, EventStoreResult, StoredEvent,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

const SELECT_COLUMNS: &str = r#"
    SELECT event_id, tenant_id, aggregate_id, event_type, event_name,
           occurred_at, payload, sequence
    FROM domain_events
"#;

/// PostgreSQL implementation of [`EventStore`].
///
/// # Examples
///
/// ```ignore
/// use sqlx::PgPool;
/// use eventos::infrastructure::persistence::postgres::PostgresEventStore;
///
/// let pool = PgPool::connect("postgres://...").await?;
/// let store = PostgresEventStore::new(pool);
/// ```
#[derive(Debug, Clone)]
pub struct PostgresEventStore {
    pool: PgPool,
}

impl PostgresEventStore {
    /// Creates a new PostgreSQL event store.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch(
        &self,
        sql: String,
        tenant: TenantId,
        arg: Arg,
    ) -> EventStoreResult<Vec<StoredEvent>> {
        let query = sqlx::query_as::<_, EventRow>(&sql).bind(tenant.as_uuid());
        let query = match arg {
            Arg::Uuid(id) => query.bind(id),
            Arg::Time(ts) => query.bind(ts),
            Arg::Text(text) => query.bind(text),
        };
        let rows = query
            .fetch_all(&self.pool)
            .await
            .map_err(|e| EventStoreError::query(e.to_string()))?;
        rows.into_iter().map(EventRow::try_into_stored_event).collect()
    }
}

enum Arg {
    Uuid(Uuid),
    Time(DateTime<Utc>),
    Text(String),
}

#[async_trait]
impl EventStore for PostgresEventStore {
    async fn append(&self, event: StoredEvent) -> EventStoreResult<()> {
        let result = sqlx::query(
            r#"
            INSERT INTO domain_events (
                event_id, tenant_id, aggregate_id, event_type, event_name,
                occurred_at, payload, sequence
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(event.event_id.as_uuid())
        .bind(event.tenant_id.as_uuid())
        .bind(event.aggregate_id)
        .bind(event.event_type.to_string())
        .bind(&event.event_name)
        .bind(*event.timestamp.as_datetime())
        .bind(&event.payload)
        .bind(i64::try_from(event.sequence).unwrap_or(i64::MAX))
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                Err(EventStoreError::SequenceConflict {
                    aggregate_id: event.aggregate_id,
                    sequence: event.sequence,
                })
            }
            Err(e) => Err(EventStoreError::query(e.to_string())),
        }
    }

    async fn get_events(
        &self,
        tenant: TenantId,
        aggregate_id: Uuid,
    ) -> EventStoreResult<Vec<StoredEvent>> {
        let sql = format!(
            "{SELECT_COLUMNS} WHERE tenant_id = $1 AND aggregate_id = $2 ORDER BY sequence ASC"
        );
        self.fetch(sql, tenant, Arg::Uuid(aggregate_id)).await
    }

    async fn get_events_since(
        &self,
        tenant: TenantId,
        since: Timestamp,
    ) -> EventStoreResult<Vec<StoredEvent>> {
        let sql = format!(
            "{SELECT_COLUMNS} WHERE tenant_id = $1 AND occurred_at > $2 \
             ORDER BY occurred_at ASC, sequence ASC"
        );
        self.fetch(sql, tenant, Arg::Time(*since.as_datetime())).await
    }

    async fn get_events_by_type(
        &self,
        tenant: TenantId,
        event_type: EventType,
    ) -> EventStoreResult<Vec<StoredEvent>> {
        let sql = format!(
            "{SELECT_COLUMNS} WHERE tenant_id = $1 AND event_type = $2 \
             ORDER BY occurred_at ASC, sequence ASC"
        );
        self.fetch(sql, tenant, Arg::Text(event_type.to_string()))
            .await
    }

    async fn count(&self) -> EventStoreResult<u64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM domain_events")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| EventStoreError::query(e.to_string()))?;
        Ok(u64::try_from(count).unwrap_or_default())
    }

    async fn next_sequence(&self, aggregate_id: Uuid) -> EventStoreResult<u64> {
        let (max,): (Option<i64>,) =
            sqlx::query_as("SELECT MAX(sequence) FROM domain_events WHERE aggregate_id = $1")
                .bind(aggregate_id)
                .fetch_one(&self.pool)
                .await
                .map_err(|e| EventStoreError::query(e.to_string()))?;
        Ok(max.map_or(1, |m| u64::try_from(m).unwrap_or_default() + 1))
    }
}

/// Row type for event queries.
#[derive(Debug, sqlx::FromRow)]
struct EventRow {
    event_id: Uuid,
    tenant_id: Uuid,
    aggregate_id: Uuid,
    event_type: String,
    event_name: String,
    occurred_at: DateTime<Utc>,
    payload: serde_json::Value,
    sequence: i64,
}

impl EventRow {
    fn try_into_stored_event(self) -> EventStoreResult<StoredEvent> {
        let event_type: EventType = self
            .event_type
            .parse()
            .map_err(|e: crate::domain::value_objects::ParseEnumError| {
                EventStoreError::deserialization(e.to_string())
            })?;
        let timestamp = Timestamp::from_millis(self.occurred_at.timestamp_millis())
            .ok_or_else(|| EventStoreError::deserialization("invalid timestamp"))?;

        Ok(StoredEvent {
            event_id: DomainEventId::new(self.event_id),
            tenant_id: TenantId::new(self.tenant_id),
            aggregate_id: self.aggregate_id,
            event_type,
            event_name: self.event_name,
            timestamp,
            payload: self.payload,
            sequence: u64::try_from(self.sequence).unwrap_or_default(),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn row_decodes_into_stored_event() {
        let row = EventRow {
            event_id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            aggregate_id: Uuid::new_v4(),
            event_type: "REFUND".to_string(),
            event_name: "RefundRequested".to_string(),
            occurred_at: Utc::now(),
            payload: serde_json::json!({"amount": "10.00"}),
            sequence: 3,
        };
        let aggregate = row.aggregate_id;
        let stored = row.try_into_stored_event().unwrap();
        assert_eq!(stored.event_type, EventType::Refund);
        assert_eq!(stored.aggregate_id, aggregate);
        assert_eq!(stored.sequence, 3);
    }

    #[test]
    fn unknown_event_type_is_a_decode_error() {
        let row = EventRow {
            event_id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            aggregate_id: Uuid::new_v4(),
            event_type: "TRADE".to_string(),
            event_name: "X".to_string(),
            occurred_at: Utc::now(),
            payload: serde_json::Value::Null,
            sequence: 1,
        };
        assert!(matches!(
            row.try_into_stored_event(),
            Err(EventStoreError::Deserialization(_))
        ));
    }
}
