//! # Application State
//!
//! The services shared by every handler, and the wiring that builds them
//! from settings and concrete backends.

use crate::api::rest::auth::JwtAuth;
use crate::application::services::{
    AuditLog, CacheService, CheckinService, DashboardService, DashboardSources, EventService,
    Monitor, NotificationService, PaymentService, PdvService, RefundOrchestrator,
    TreasuryService,
};
use crate::config::Settings;
use crate::domain::services::RefundPolicy;
use crate::infrastructure::cache::{CacheBackend, InMemoryCache};
use crate::infrastructure::gateways::{PaymentGateway, SimulatedGateway, WebhookVerifier};
use crate::infrastructure::notifications::{LogSender, NotificationSender};
use crate::infrastructure::persistence::in_memory::{
    InMemoryCheckinRepository, InMemoryEventRepository, InMemoryEventStore,
    InMemoryLedgerRepository, InMemoryNotificationRepository, InMemoryParticipantRepository,
    InMemoryProductRepository, InMemoryRefundRepository, InMemorySaleRepository,
    InMemoryTransactionRepository,
};
use crate::infrastructure::persistence::postgres::{PostgresEventStore, PostgresRepositories};
use crate::infrastructure::persistence::{
    CheckinRepository, EventRepository, EventStore, LedgerRepository, NotificationRepository,
    ParticipantRepository, ProductRepository, RefundRepository, SaleRepository,
    TransactionRepository,
};
use sqlx::PgPool;
use std::sync::Arc;

/// One handle per repository port.
#[derive(Debug, Clone)]
pub struct Repositories {
    /// Events.
    pub events: Arc<dyn EventRepository>,
    /// Participants.
    pub participants: Arc<dyn ParticipantRepository>,
    /// Check-in logs.
    pub checkins: Arc<dyn CheckinRepository>,
    /// Products.
    pub products: Arc<dyn ProductRepository>,
    /// Sales.
    pub sales: Arc<dyn SaleRepository>,
    /// Payments.
    pub transactions: Arc<dyn TransactionRepository>,
    /// Refunds.
    pub refunds: Arc<dyn RefundRepository>,
    /// Notifications.
    pub notifications: Arc<dyn NotificationRepository>,
    /// Treasury ledger.
    pub ledger: Arc<dyn LedgerRepository>,
    /// Audit trail.
    pub event_store: Arc<dyn EventStore>,
}

impl Repositories {
    /// Process-local storage.
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            events: Arc::new(InMemoryEventRepository::new()),
            participants: Arc::new(InMemoryParticipantRepository::new()),
            checkins: Arc::new(InMemoryCheckinRepository::new()),
            products: Arc::new(InMemoryProductRepository::new()),
            sales: Arc::new(InMemorySaleRepository::new()),
            transactions: Arc::new(InMemoryTransactionRepository::new()),
            refunds: Arc::new(InMemoryRefundRepository::new()),
            notifications: Arc::new(InMemoryNotificationRepository::new()),
            ledger: Arc::new(InMemoryLedgerRepository::new()),
            event_store: Arc::new(InMemoryEventStore::new()),
        }
    }

    /// PostgreSQL storage over `pool`.
    #[must_use]
    pub fn postgres(pool: PgPool) -> Self {
        let repos = PostgresRepositories::new(pool.clone());
        Self {
            events: Arc::new(repos.events),
            participants: Arc::new(repos.participants),
            checkins: Arc::new(repos.checkins),
            products: Arc::new(repos.products),
            sales: Arc::new(repos.sales),
            transactions: Arc::new(repos.transactions),
            refunds: Arc::new(repos.refunds),
            notifications: Arc::new(repos.notifications),
            ledger: Arc::new(repos.ledger),
            event_store: Arc::new(PostgresEventStore::new(pool)),
        }
    }
}

/// Concrete adapters the services are built on.
#[derive(Debug, Clone)]
pub struct Backends {
    /// Storage.
    pub repositories: Repositories,
    /// Cache backend.
    pub cache: Arc<dyn CacheBackend>,
    /// Payment provider.
    pub gateway: Arc<dyn PaymentGateway>,
    /// Notification senders; later ones win for shared channels.
    pub senders: Vec<Arc<dyn NotificationSender>>,
}

impl Backends {
    /// Everything in process: memory storage and cache, the sandbox gateway
    /// and the logging sender.
    #[must_use]
    pub fn in_memory(settings: &Settings) -> Self {
        let sender: Arc<dyn NotificationSender> = Arc::new(LogSender::new());
        Self {
            repositories: Repositories::in_memory(),
            cache: Arc::new(InMemoryCache::new(
                settings.cache.capacity,
                settings.cache.eviction,
            )),
            gateway: Arc::new(SimulatedGateway::new()),
            senders: vec![sender],
        }
    }
}

/// Shared state of the router.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Events and participants.
    pub events: Arc<EventService>,
    /// Check-in desk.
    pub checkins: Arc<CheckinService>,
    /// Point of sale.
    pub pdv: Arc<PdvService>,
    /// Payments.
    pub payments: Arc<PaymentService>,
    /// Refunds.
    pub refunds: Arc<RefundOrchestrator>,
    /// Ledger.
    pub treasury: Arc<TreasuryService>,
    /// Outbound messages.
    pub notifications: Arc<NotificationService>,
    /// Event dashboards.
    pub dashboards: Arc<DashboardService>,
    /// Metrics and health.
    pub monitor: Arc<Monitor>,
    /// Tenant cache.
    pub cache: CacheService,
    /// Audit trail.
    pub audit: AuditLog,
    /// API tokens.
    pub auth: JwtAuth,
}

impl AppState {
    /// Wires every service.
    #[must_use]
    pub fn build(settings: &Settings, backends: Backends) -> Self {
        let Backends {
            repositories: repos,
            cache,
            gateway,
            senders,
        } = backends;

        let audit = AuditLog::new(Arc::clone(&repos.event_store));
        let cache = CacheService::new(cache, settings.cache.service.clone());
        let notifications = Arc::new(NotificationService::new(
            Arc::clone(&repos.notifications),
            senders,
            settings.notifications.delivery,
        ));
        let treasury = Arc::new(TreasuryService::new(
            Arc::clone(&repos.ledger),
            settings.treasury.clone(),
        ));

        let events = Arc::new(EventService::new(
            Arc::clone(&repos.events),
            Arc::clone(&repos.participants),
            Arc::clone(&notifications),
            audit.clone(),
        ));
        let checkins = Arc::new(CheckinService::new(
            Arc::clone(&repos.events),
            Arc::clone(&repos.participants),
            Arc::clone(&repos.checkins),
            audit.clone(),
        ));
        let pdv = Arc::new(PdvService::new(
            Arc::clone(&repos.events),
            Arc::clone(&repos.products),
            Arc::clone(&repos.sales),
            Arc::clone(&treasury),
            audit.clone(),
        ));
        let payments = Arc::new(PaymentService::new(
            Arc::clone(&repos.events),
            Arc::clone(&repos.participants),
            Arc::clone(&repos.sales),
            Arc::clone(&repos.transactions),
            Arc::clone(&gateway),
            Arc::clone(&treasury),
            WebhookVerifier::new(&settings.payments.webhook_secret),
            audit.clone(),
            settings.payments.charges.clone(),
        ));
        let refunds = Arc::new(RefundOrchestrator::new(
            Arc::clone(&repos.refunds),
            Arc::clone(&repos.transactions),
            Arc::clone(&repos.events),
            Arc::clone(&gateway),
            Arc::clone(&treasury),
            Arc::clone(&notifications),
            audit.clone(),
            RefundPolicy::new(settings.refunds.policy),
            settings.refunds.retry,
        ));
        let dashboards = Arc::new(DashboardService::new(
            DashboardSources {
                events: Arc::clone(&repos.events),
                participants: Arc::clone(&repos.participants),
                checkins: Arc::clone(&repos.checkins),
                sales: Arc::clone(&repos.sales),
                transactions: Arc::clone(&repos.transactions),
                refunds: Arc::clone(&repos.refunds),
            },
            cache.clone(),
            settings.cache.dashboard_ttl_secs,
        ));
        let monitor = Arc::new(Monitor::new(audit.clone(), cache.clone(), gateway));

        Self {
            events,
            checkins,
            pdv,
            payments,
            refunds,
            treasury,
            notifications,
            dashboards,
            monitor,
            cache,
            audit,
            auth: JwtAuth::new(&settings.auth.jwt_secret, settings.auth.token_ttl_secs),
        }
    }

    /// State over in-process backends.
    #[must_use]
    pub fn in_memory(settings: &Settings) -> Self {
        Self::build(settings, Backends::in_memory(settings))
    }
}
