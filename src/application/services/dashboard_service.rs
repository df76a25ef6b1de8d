//! # Dashboard Service
//!
//! Builds the [`EventDashboard`] of an event and keeps it in the cache for
//! a short while, since folding every row of a large event is expensive.

use crate::application::error::{ApplicationError, ApplicationResult};
use crate::application::services::cache_service::CacheService;
use crate::domain::services::{DashboardInput, EventDashboard};
use crate::domain::value_objects::{EventId, TenantId};
use crate::infrastructure::persistence::{
    CheckinRepository, EventRepository, Page, ParticipantRepository, RefundRepository,
    SaleRepository, TransactionFilter, TransactionRepository,
};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, warn};

/// Seconds a dashboard is served from cache.
pub const DEFAULT_DASHBOARD_TTL_SECS: u64 = 30;

/// Read side of every repository an event touches.
#[derive(Debug, Clone)]
pub struct DashboardSources {
    /// Events.
    pub events: Arc<dyn EventRepository>,
    /// Participants.
    pub participants: Arc<dyn ParticipantRepository>,
    /// Check-ins.
    pub checkins: Arc<dyn CheckinRepository>,
    /// PDV sales.
    pub sales: Arc<dyn SaleRepository>,
    /// Payments.
    pub transactions: Arc<dyn TransactionRepository>,
    /// Refunds.
    pub refunds: Arc<dyn RefundRepository>,
}

/// Cached event dashboards.
#[derive(Debug)]
pub struct DashboardService {
    sources: DashboardSources,
    cache: CacheService,
    ttl_secs: u64,
}

fn cache_key(event_id: EventId) -> String {
    format!("dashboard:{event_id}")
}

impl DashboardService {
    /// Creates the service.
    #[must_use]
    pub fn new(sources: DashboardSources, cache: CacheService, ttl_secs: u64) -> Self {
        Self {
            sources,
            cache,
            ttl_secs,
        }
    }

    /// Returns the dashboard, from cache when fresh.
    ///
    /// # Errors
    ///
    /// Returns `ApplicationError::NotFound` for an unknown event.
    pub async fn dashboard(&self, tenant: TenantId, event_id: EventId) -> ApplicationResult<EventDashboard> {
        self.cache
            .get_or_compute(tenant, &cache_key(event_id), Some(self.ttl_secs), || {
                self.compute(tenant, event_id)
            })
            .await
    }

    /// Drops the cached dashboard so the next read is fresh.
    pub async fn invalidate(&self, tenant: TenantId, event_id: EventId) {
        if let Err(e) = self.cache.delete(tenant, &cache_key(event_id)).await {
            warn!(%event_id, error = %e, "dashboard not invalidated");
        }
    }

    /// Folds the dashboard from the repositories, bypassing the cache.
    ///
    /// # Errors
    ///
    /// Returns `ApplicationError::NotFound` for an unknown event.
    pub async fn compute(&self, tenant: TenantId, event_id: EventId) -> ApplicationResult<EventDashboard> {
        let s = &self.sources;
        let event = s
            .events
            .get(tenant, event_id)
            .await?
            .ok_or_else(|| ApplicationError::not_found("Event", event_id))?;

        let participants = s.participants.list_by_event(tenant, event_id).await?;
        let checkins = s.checkins.list_by_event(tenant, event_id).await?;
        let sales = s.sales.list_by_event(tenant, event_id).await?;
        let transactions = s
            .transactions
            .list(
                tenant,
                TransactionFilter {
                    event_id: Some(event_id),
                    status: None,
                },
                Page::all(),
            )
            .await?;
        let ids: HashSet<_> = transactions.iter().map(|t| t.id()).collect();
        let mut refunds = s.refunds.list(tenant, None, Page::all()).await?;
        refunds.retain(|r| ids.contains(&r.transaction_id()));

        debug!(
            %event_id,
            participants = participants.len(),
            transactions = transactions.len(),
            "computing dashboard"
        );
        Ok(EventDashboard::compute(&DashboardInput {
            event: &event,
            participants: &participants,
            checkins: &checkins,
            sales: &sales,
            transactions: &transactions,
            refunds: &refunds,
        })?)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::application::services::cache_service::CacheServiceConfig;
    use crate::domain::entities::{Event, EventDetails, Participant, ParticipantDetails};
    use crate::domain::value_objects::Timestamp;
    use crate::infrastructure::cache::{EvictionPolicy, InMemoryCache};
    use crate::infrastructure::persistence::in_memory::{
        InMemoryCheckinRepository, InMemoryEventRepository, InMemoryParticipantRepository,
        InMemoryRefundRepository, InMemorySaleRepository, InMemoryTransactionRepository,
    };

    struct Fixture {
        service: DashboardService,
        participants: Arc<InMemoryParticipantRepository>,
        tenant: TenantId,
        event: EventId,
    }

    async fn fixture() -> Fixture {
        let tenant = TenantId::new_v4();
        let events = Arc::new(InMemoryEventRepository::new());
        let starts_at = Timestamp::now().add_days(3);
        let event = Event::new(
            tenant,
            EventDetails {
                name: "Simpósio".into(),
                description: None,
                venue: "Auditório".into(),
                starts_at,
                ends_at: starts_at.add_hours(4),
                capacity: Some(100),
            },
        )
        .unwrap();
        events.save(&event).await.unwrap();
        let participants = Arc::new(InMemoryParticipantRepository::new());
        let service = DashboardService::new(
            DashboardSources {
                events,
                participants: participants.clone(),
                checkins: Arc::new(InMemoryCheckinRepository::new()),
                sales: Arc::new(InMemorySaleRepository::new()),
                transactions: Arc::new(InMemoryTransactionRepository::new()),
                refunds: Arc::new(InMemoryRefundRepository::new()),
            },
            CacheService::new(
                Arc::new(InMemoryCache::new(50, EvictionPolicy::Lru)),
                CacheServiceConfig::default(),
            ),
            DEFAULT_DASHBOARD_TTL_SECS,
        );
        Fixture {
            service,
            participants,
            tenant,
            event: event.id(),
        }
    }

    async fn register(f: &Fixture, name: &str) {
        let p = Participant::register(
            f.tenant,
            f.event,
            ParticipantDetails {
                name: name.into(),
                email: format!("{}@example.com", name.to_lowercase()),
                cpf: None,
                phone: None,
                ticket_type: None,
            },
        )
        .unwrap();
        f.participants.save(&p).await.unwrap();
    }

    #[tokio::test]
    async fn cached_until_invalidated() {
        let f = fixture().await;
        register(&f, "Bruno").await;
        let first = f.service.dashboard(f.tenant, f.event).await.unwrap();
        assert_eq!(first.attendance.registered, 1);

        register(&f, "Clara").await;
        let cached = f.service.dashboard(f.tenant, f.event).await.unwrap();
        assert_eq!(cached.attendance.registered, 1);

        f.service.invalidate(f.tenant, f.event).await;
        let fresh = f.service.dashboard(f.tenant, f.event).await.unwrap();
        assert_eq!(fresh.attendance.registered, 2);
    }

    #[tokio::test]
    async fn unknown_event_is_not_found() {
        let f = fixture().await;
        let err = f
            .service
            .dashboard(f.tenant, EventId::new_v4())
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }
}
