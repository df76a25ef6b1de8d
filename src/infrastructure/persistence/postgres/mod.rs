//! # PostgreSQL Persistence
//!
//! Repositories and the event store backed by PostgreSQL via sqlx.
//!
//! Aggregates live as JSONB documents (see [`documents`]); the ledger and the
//! event store have their own append-only tables. The schema is embedded
//! from `migrations/` and applied by [`migrate`].

pub(crate) mod documents;
pub mod event_store;
pub mod repositories;

pub use event_store::PostgresEventStore;
pub use repositories::{
    PgCheckinRepository, PgEventRepository, PgLedgerRepository, PgNotificationRepository,
    PgParticipantRepository, PgProductRepository, PgRefundRepository, PgSaleRepository,
    PgTransactionRepository, PostgresRepositories,
};

use crate::infrastructure::persistence::traits::{RepositoryError, RepositoryResult};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use std::time::Duration;

/// Opens a connection pool.
///
/// # Errors
///
/// Returns `RepositoryError::Connection` if the database is unreachable.
pub async fn connect(url: &str, max_connections: u32) -> RepositoryResult<PgPool> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(Duration::from_secs(5))
        .connect(url)
        .await
        .map_err(|e| RepositoryError::connection(e.to_string()))
}

/// Applies pending schema migrations.
///
/// # Errors
///
/// Returns `RepositoryError::Query` if a migration fails.
pub async fn migrate(pool: &PgPool) -> RepositoryResult<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| RepositoryError::query(e.to_string()))
}
