//! # Application Services
//!
//! Use cases of the platform. Each service owns the repositories it needs
//! as `Arc<dyn ...>` handles, records domain events through the shared
//! [`AuditLog`] and returns [`ApplicationResult`](crate::application::error::ApplicationResult).
//!
//! - [`EventService`]: event lifecycle and registrations
//! - [`CheckinService`]: door control by QR token, CPF or id
//! - [`PdvService`]: products, stock and point-of-sale sales
//! - [`PaymentService`]: charges, manual confirmation and webhooks
//! - [`RefundOrchestrator`]: refund policy, review and processing
//! - [`TreasuryService`]: ledger postings, balance, statement and sweep
//! - [`NotificationService`]: outbound messages with retry and rate limit
//! - [`CacheService`] and [`DashboardService`]: tenant cache and dashboards
//! - [`Monitor`]: request metrics and component health

pub mod audit;
pub mod cache_service;
pub mod checkin_service;
pub mod dashboard_service;
pub mod event_service;
pub mod monitoring;
pub mod notification_service;
pub mod payment_service;
pub mod pdv_service;
pub mod refund_orchestrator;
pub mod retry;
pub mod treasury_service;

pub use audit::{AuditLog, AuditQuery};
pub use cache_service::{CacheService, CacheServiceConfig};
pub use checkin_service::{CheckinRequest, CheckinService};
pub use dashboard_service::{DashboardService, DashboardSources};
pub use event_service::{EventCancellation, EventPage, EventService};
pub use monitoring::{HealthReport, HealthStatus, MetricsSnapshot, Monitor};
pub use notification_service::{
    NotificationConfig, NotificationRequest, NotificationService, RetryReport,
};
pub use payment_service::{CreatePayment, PaymentConfig, PaymentService, WebhookOutcome};
pub use pdv_service::{PdvService, SaleLine, SaleRequest};
pub use refund_orchestrator::{RefundOrchestrator, RefundRequest};
pub use retry::{RetryConfig, Retryable};
pub use treasury_service::{Statement, TreasuryConfig, TreasuryService};
