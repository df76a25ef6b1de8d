//! # PostgreSQL Repositories
//!
//! Repository traits implemented over the `documents` table plus the
//! append-only `ledger_entries` table.
//!
//! # Examples
//!
//! ```ignore
//! let pool = PgPool::connect("postgres://...").await?;
//! let repos = PostgresRepositories::new(pool);
//! repos.events.save(&event).await?;
//! ```

use crate::domain::entities::{
    CheckinLog, Event, LedgerEntry, Notification, Participant, Product, Refund, Sale, Transaction,
};
use crate::domain::value_objects::{
    CheckinId, Cpf, EventId, EventStatus, NotificationId, NotificationStatus, ParticipantId,
    ProductId, RefundId, RefundState, SaleId, TenantId, Timestamp, TransactionId,
};
use crate::infrastructure::persistence::postgres::documents::{
    Documents, Filter, Order, json_text, query_error,
};
use crate::infrastructure::persistence::traits::{
    CheckinRepository, EventRepository, LedgerRepository, NotificationRepository, Page,
    ParticipantRepository, ProductRepository, RefundRepository, RepositoryError,
    RepositoryResult, SaleRepository, TransactionFilter, TransactionRepository,
};
use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};

/// Every PostgreSQL repository sharing one pool.
#[derive(Debug, Clone)]
pub struct PostgresRepositories {
    /// Events.
    pub events: PgEventRepository,
    /// Participants.
    pub participants: PgParticipantRepository,
    /// Check-in logs.
    pub checkins: PgCheckinRepository,
    /// Products.
    pub products: PgProductRepository,
    /// Sales.
    pub sales: PgSaleRepository,
    /// Transactions.
    pub transactions: PgTransactionRepository,
    /// Refunds.
    pub refunds: PgRefundRepository,
    /// Notifications.
    pub notifications: PgNotificationRepository,
    /// Treasury ledger.
    pub ledger: PgLedgerRepository,
}

impl PostgresRepositories {
    /// Builds every repository over `pool`.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self {
            events: PgEventRepository(Documents::new(pool.clone(), "event")),
            participants: PgParticipantRepository(Documents::new(pool.clone(), "participant")),
            checkins: PgCheckinRepository {
                docs: Documents::new(pool.clone(), "checkin"),
                pool: pool.clone(),
            },
            products: PgProductRepository(Documents::new(pool.clone(), "product")),
            sales: PgSaleRepository(Documents::new(pool.clone(), "sale")),
            transactions: PgTransactionRepository(Documents::new(pool.clone(), "transaction")),
            refunds: PgRefundRepository(Documents::new(pool.clone(), "refund")),
            notifications: PgNotificationRepository(Documents::new(pool.clone(), "notification")),
            ledger: PgLedgerRepository { pool },
        }
    }
}

/// PostgreSQL [`EventRepository`].
#[derive(Debug, Clone)]
pub struct PgEventRepository(Documents);

fn status_filter(status: Option<EventStatus>) -> RepositoryResult<Vec<Filter>> {
    status
        .map(|s| Ok(Filter::Field("status", json_text(&s)?)))
        .into_iter()
        .collect()
}

#[async_trait]
impl EventRepository for PgEventRepository {
    async fn save(&self, event: &Event) -> RepositoryResult<()> {
        self.0
            .upsert(event.id().as_uuid(), event.tenant_id(), None, event.version(), event)
            .await
    }

    async fn get(&self, tenant: TenantId, id: EventId) -> RepositoryResult<Option<Event>> {
        self.0.get(tenant, id.as_uuid()).await
    }

    async fn list(
        &self,
        tenant: TenantId,
        status: Option<EventStatus>,
        page: Page,
    ) -> RepositoryResult<Vec<Event>> {
        let filters = status_filter(status)?;
        self.0
            .find(tenant, &filters, Order::TimeAsc("starts_at"), Some(page))
            .await
    }

    async fn count(&self, tenant: TenantId, status: Option<EventStatus>) -> RepositoryResult<u64> {
        self.0.count(tenant, &status_filter(status)?).await
    }
}

/// PostgreSQL [`ParticipantRepository`].
#[derive(Debug, Clone)]
pub struct PgParticipantRepository(Documents);

#[async_trait]
impl ParticipantRepository for PgParticipantRepository {
    async fn save(&self, participant: &Participant) -> RepositoryResult<()> {
        self.0
            .upsert(
                participant.id().as_uuid(),
                participant.tenant_id(),
                Some(participant.event_id().as_uuid()),
                0,
                participant,
            )
            .await
    }

    async fn get(
        &self,
        tenant: TenantId,
        id: ParticipantId,
    ) -> RepositoryResult<Option<Participant>> {
        self.0.get(tenant, id.as_uuid()).await
    }

    async fn find_by_qr_token(
        &self,
        tenant: TenantId,
        token: &str,
    ) -> RepositoryResult<Option<Participant>> {
        let found: Vec<Participant> = self
            .0
            .find(
                tenant,
                &[Filter::FieldCi("qr_token", token.trim().to_string())],
                Order::TimeAsc("registered_at"),
                Some(Page::new(1, 1)),
            )
            .await?;
        Ok(found.into_iter().next())
    }

    async fn find_by_cpf(
        &self,
        tenant: TenantId,
        event_id: EventId,
        cpf: &Cpf,
    ) -> RepositoryResult<Vec<Participant>> {
        self.0
            .find(
                tenant,
                &[
                    Filter::Scope(event_id.as_uuid()),
                    Filter::Field("cpf", cpf.as_str().to_string()),
                ],
                Order::TimeAsc("registered_at"),
                None,
            )
            .await
    }

    async fn list_by_event(
        &self,
        tenant: TenantId,
        event_id: EventId,
    ) -> RepositoryResult<Vec<Participant>> {
        self.0
            .find(
                tenant,
                &[Filter::Scope(event_id.as_uuid())],
                Order::TimeAsc("registered_at"),
                None,
            )
            .await
    }

    async fn count_active(&self, tenant: TenantId, event_id: EventId) -> RepositoryResult<usize> {
        let total = self.0.count(tenant, &[Filter::Scope(event_id.as_uuid())]).await?;
        let cancelled = self
            .0
            .count(
                tenant,
                &[
                    Filter::Scope(event_id.as_uuid()),
                    Filter::Field("status", "CANCELLED".to_string()),
                ],
            )
            .await?;
        Ok(usize::try_from(total.saturating_sub(cancelled)).unwrap_or(usize::MAX))
    }
}

/// PostgreSQL [`CheckinRepository`].
#[derive(Debug, Clone)]
pub struct PgCheckinRepository {
    docs: Documents,
    pool: PgPool,
}

#[async_trait]
impl CheckinRepository for PgCheckinRepository {
    async fn save(&self, log: &CheckinLog) -> RepositoryResult<()> {
        self.docs
            .upsert(
                log.id().as_uuid(),
                log.tenant_id(),
                Some(log.event_id().as_uuid()),
                0,
                log,
            )
            .await
    }

    async fn open_session(&self, log: &CheckinLog) -> RepositoryResult<()> {
        // The partial unique index `documents_open_checkin` rejects a second
        // open session for the same participant.
        let body = serde_json::to_value(log)?;
        let result = sqlx::query(
            r#"
            INSERT INTO documents (kind, id, tenant_id, scope_id, version, body)
            VALUES ('checkin', $1, $2, $3, 0, $4)
            "#,
        )
        .bind(log.id().as_uuid())
        .bind(log.tenant_id().as_uuid())
        .bind(log.event_id().as_uuid())
        .bind(body)
        .execute(&self.pool)
        .await;
        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => Err(
                RepositoryError::duplicate("CheckinSession", log.participant_id().to_string()),
            ),
            Err(e) => Err(query_error(e)),
        }
    }

    async fn get(&self, tenant: TenantId, id: CheckinId) -> RepositoryResult<Option<CheckinLog>> {
        self.docs.get(tenant, id.as_uuid()).await
    }

    async fn find_active(
        &self,
        tenant: TenantId,
        participant_id: ParticipantId,
    ) -> RepositoryResult<Option<CheckinLog>> {
        let logs: Vec<CheckinLog> = self
            .docs
            .find(
                tenant,
                &[Filter::Field("participant_id", participant_id.to_string())],
                Order::TimeDesc("checked_in_at"),
                None,
            )
            .await?;
        Ok(logs.into_iter().find(CheckinLog::is_active))
    }

    async fn list_by_event(
        &self,
        tenant: TenantId,
        event_id: EventId,
    ) -> RepositoryResult<Vec<CheckinLog>> {
        self.docs
            .find(
                tenant,
                &[Filter::Scope(event_id.as_uuid())],
                Order::TimeDesc("checked_in_at"),
                None,
            )
            .await
    }
}

/// PostgreSQL [`ProductRepository`].
#[derive(Debug, Clone)]
pub struct PgProductRepository(Documents);

#[async_trait]
impl ProductRepository for PgProductRepository {
    async fn save(&self, product: &Product) -> RepositoryResult<()> {
        self.0
            .upsert(
                product.id().as_uuid(),
                product.tenant_id(),
                Some(product.event_id().as_uuid()),
                product.version(),
                product,
            )
            .await
    }

    async fn get(&self, tenant: TenantId, id: ProductId) -> RepositoryResult<Option<Product>> {
        self.0.get(tenant, id.as_uuid()).await
    }

    async fn find_by_sku(
        &self,
        tenant: TenantId,
        event_id: EventId,
        sku: &str,
    ) -> RepositoryResult<Option<Product>> {
        let found: Vec<Product> = self
            .0
            .find(
                tenant,
                &[
                    Filter::Scope(event_id.as_uuid()),
                    Filter::FieldCi("sku", sku.trim().to_string()),
                ],
                Order::TextAsc("name"),
                Some(Page::new(1, 1)),
            )
            .await?;
        Ok(found.into_iter().next())
    }

    async fn list_by_event(
        &self,
        tenant: TenantId,
        event_id: EventId,
    ) -> RepositoryResult<Vec<Product>> {
        self.0
            .find(
                tenant,
                &[Filter::Scope(event_id.as_uuid())],
                Order::TextAsc("name"),
                None,
            )
            .await
    }
}

/// PostgreSQL [`SaleRepository`].
#[derive(Debug, Clone)]
pub struct PgSaleRepository(Documents);

#[async_trait]
impl SaleRepository for PgSaleRepository {
    async fn save(&self, sale: &Sale) -> RepositoryResult<()> {
        self.0
            .upsert(
                sale.id().as_uuid(),
                sale.tenant_id(),
                Some(sale.event_id().as_uuid()),
                0,
                sale,
            )
            .await
    }

    async fn get(&self, tenant: TenantId, id: SaleId) -> RepositoryResult<Option<Sale>> {
        self.0.get(tenant, id.as_uuid()).await
    }

    async fn list_by_event(
        &self,
        tenant: TenantId,
        event_id: EventId,
    ) -> RepositoryResult<Vec<Sale>> {
        self.0
            .find(
                tenant,
                &[Filter::Scope(event_id.as_uuid())],
                Order::TimeDesc("created_at"),
                None,
            )
            .await
    }
}

/// PostgreSQL [`TransactionRepository`].
#[derive(Debug, Clone)]
pub struct PgTransactionRepository(Documents);

#[async_trait]
impl TransactionRepository for PgTransactionRepository {
    async fn save(&self, tx: &Transaction) -> RepositoryResult<()> {
        self.0
            .upsert_versioned(
                tx.id().as_uuid(),
                tx.tenant_id(),
                Some(tx.event_id().as_uuid()),
                tx.version(),
                tx,
            )
            .await
    }

    async fn get(
        &self,
        tenant: TenantId,
        id: TransactionId,
    ) -> RepositoryResult<Option<Transaction>> {
        self.0.get(tenant, id.as_uuid()).await
    }

    async fn find_by_gateway_reference(
        &self,
        reference: &str,
    ) -> RepositoryResult<Option<Transaction>> {
        self.0.find_any_tenant("gateway_reference", reference).await
    }

    async fn list(
        &self,
        tenant: TenantId,
        filter: TransactionFilter,
        page: Page,
    ) -> RepositoryResult<Vec<Transaction>> {
        let mut filters = Vec::new();
        if let Some(event_id) = filter.event_id {
            filters.push(Filter::Scope(event_id.as_uuid()));
        }
        if let Some(status) = filter.status {
            filters.push(Filter::Field("status", json_text(&status)?));
        }
        self.0
            .find(tenant, &filters, Order::TimeDesc("created_at"), Some(page))
            .await
    }

    async fn list_by_payer(
        &self,
        tenant: TenantId,
        email: &str,
    ) -> RepositoryResult<Vec<Transaction>> {
        self.0
            .find(
                tenant,
                &[Filter::FieldCi("payer,email", email.to_string())],
                Order::TimeDesc("created_at"),
                None,
            )
            .await
    }

    async fn count_by_payer_since(
        &self,
        tenant: TenantId,
        email: &str,
        since: Timestamp,
    ) -> RepositoryResult<u32> {
        let count = self
            .0
            .count(
                tenant,
                &[
                    Filter::FieldCi("payer,email", email.to_string()),
                    Filter::After("created_at", since),
                ],
            )
            .await?;
        Ok(u32::try_from(count).unwrap_or(u32::MAX))
    }
}

/// PostgreSQL [`RefundRepository`].
#[derive(Debug, Clone)]
pub struct PgRefundRepository(Documents);

#[async_trait]
impl RefundRepository for PgRefundRepository {
    async fn save(&self, refund: &Refund) -> RepositoryResult<()> {
        self.0
            .upsert_versioned(
                refund.id().as_uuid(),
                refund.tenant_id(),
                Some(refund.transaction_id().as_uuid()),
                refund.version(),
                refund,
            )
            .await
    }

    async fn get(&self, tenant: TenantId, id: RefundId) -> RepositoryResult<Option<Refund>> {
        self.0.get(tenant, id.as_uuid()).await
    }

    async fn list_by_transaction(
        &self,
        tenant: TenantId,
        transaction_id: TransactionId,
    ) -> RepositoryResult<Vec<Refund>> {
        self.0
            .find(
                tenant,
                &[Filter::Scope(transaction_id.as_uuid())],
                Order::TimeAsc("created_at"),
                None,
            )
            .await
    }

    async fn list(
        &self,
        tenant: TenantId,
        state: Option<RefundState>,
        page: Page,
    ) -> RepositoryResult<Vec<Refund>> {
        let filters: Vec<Filter> = state
            .map(|s| Ok::<_, RepositoryError>(Filter::Field("state", json_text(&s)?)))
            .transpose()?
            .into_iter()
            .collect();
        self.0
            .find(tenant, &filters, Order::TimeDesc("created_at"), Some(page))
            .await
    }
}

/// PostgreSQL [`NotificationRepository`].
#[derive(Debug, Clone)]
pub struct PgNotificationRepository(Documents);

#[async_trait]
impl NotificationRepository for PgNotificationRepository {
    async fn save(&self, notification: &Notification) -> RepositoryResult<()> {
        self.0
            .upsert(
                notification.id().as_uuid(),
                notification.tenant_id(),
                None,
                u64::from(notification.attempts()),
                notification,
            )
            .await
    }

    async fn get(
        &self,
        tenant: TenantId,
        id: NotificationId,
    ) -> RepositoryResult<Option<Notification>> {
        self.0.get(tenant, id.as_uuid()).await
    }

    async fn list(
        &self,
        tenant: TenantId,
        status: Option<NotificationStatus>,
        page: Page,
    ) -> RepositoryResult<Vec<Notification>> {
        let filters: Vec<Filter> = status
            .map(|s| Ok::<_, RepositoryError>(Filter::Field("status", json_text(&s)?)))
            .transpose()?
            .into_iter()
            .collect();
        self.0
            .find(tenant, &filters, Order::TimeDesc("created_at"), Some(page))
            .await
    }
}

/// PostgreSQL [`LedgerRepository`].
#[derive(Debug, Clone)]
pub struct PgLedgerRepository {
    pool: PgPool,
}

#[async_trait]
impl LedgerRepository for PgLedgerRepository {
    async fn append(&self, entry: &LedgerEntry) -> RepositoryResult<()> {
        let body = serde_json::to_value(entry)?;
        sqlx::query(
            r#"
            INSERT INTO ledger_entries (id, tenant_id, created_at, body)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(entry.id().as_uuid())
        .bind(entry.tenant_id().as_uuid())
        .bind(*entry.created_at().as_datetime())
        .bind(body)
        .execute(&self.pool)
        .await
        .map_err(query_error)?;
        Ok(())
    }

    async fn list(
        &self,
        tenant: TenantId,
        from: Option<Timestamp>,
        to: Option<Timestamp>,
    ) -> RepositoryResult<Vec<LedgerEntry>> {
        let mut qb =
            QueryBuilder::<Postgres>::new("SELECT body FROM ledger_entries WHERE tenant_id = ");
        qb.push_bind(tenant.as_uuid());
        if let Some(from) = from {
            qb.push(" AND created_at >= ");
            qb.push_bind(*from.as_datetime());
        }
        if let Some(to) = to {
            qb.push(" AND created_at <= ");
            qb.push_bind(*to.as_datetime());
        }
        qb.push(" ORDER BY created_at ASC, seq ASC");
        let rows: Vec<(serde_json::Value,)> = qb
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .map_err(query_error)?;
        rows.into_iter()
            .map(|(body,)| serde_json::from_value(body).map_err(RepositoryError::from))
            .collect()
    }

    async fn tenants(&self) -> RepositoryResult<Vec<TenantId>> {
        let rows: Vec<(uuid::Uuid,)> =
            sqlx::query_as("SELECT DISTINCT tenant_id FROM ledger_entries ORDER BY tenant_id")
                .fetch_all(&self.pool)
                .await
                .map_err(query_error)?;
        Ok(rows.into_iter().map(|(id,)| TenantId::new(id)).collect())
    }
}
