//! # Repository Traits
//!
//! Port definitions for persistence abstraction.
//!
//! Every lookup takes the caller's [`TenantId`]; a row owned by another
//! tenant is indistinguishable from a missing one. Implementations live in
//! [`in_memory`](super::in_memory) and [`postgres`](super::postgres).
//!
//! # Available Repositories
//!
//! - [`EventRepository`], [`ParticipantRepository`], [`CheckinRepository`]
//! - [`ProductRepository`], [`SaleRepository`]
//! - [`TransactionRepository`], [`RefundRepository`]
//! - [`NotificationRepository`], [`LedgerRepository`]
//!
//! # Examples
//!
//! ```ignore
//! use eventos::infrastructure::persistence::traits::EventRepository;
//!
//! async fn published(repo: &impl EventRepository, tenant: TenantId) {
//!     let events = repo.list(tenant, Some(EventStatus::Published), Page::default()).await?;
//!     println!("{} published events", events.len());
//! }
//! ```

use crate::domain::entities::{
    CheckinLog, Event, LedgerEntry, Notification, Participant, Product, Refund, Sale, Transaction,
};
use crate::domain::value_objects::{
    CheckinId, Cpf, EventId, EventStatus, NotificationId, NotificationStatus, ParticipantId,
    ProductId, RefundId, RefundState, SaleId, TenantId, Timestamp, TransactionId,
    TransactionStatus,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Error type for repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Entity not found.
    #[error("Entity not found: {entity_type} with id {id}")]
    NotFound {
        /// Type of entity.
        entity_type: &'static str,
        /// Entity identifier.
        id: String,
    },

    /// Duplicate entity.
    #[error("Duplicate entity: {entity_type} with id {id} already exists")]
    Duplicate {
        /// Type of entity.
        entity_type: &'static str,
        /// Entity identifier.
        id: String,
    },

    /// Optimistic locking conflict.
    #[error("Version conflict: {entity_type} with id {id} has been modified")]
    VersionConflict {
        /// Type of entity.
        entity_type: &'static str,
        /// Entity identifier.
        id: String,
        /// Version the writer expected to replace.
        expected: u64,
        /// Version found in storage.
        actual: u64,
    },

    /// Connection error.
    #[error("Connection error: {0}")]
    Connection(String),

    /// Query error.
    #[error("Query error: {0}")]
    Query(String),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl RepositoryError {
    /// Creates a not found error.
    #[must_use]
    pub fn not_found(entity_type: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type,
            id: id.into(),
        }
    }

    /// Creates a duplicate error.
    #[must_use]
    pub fn duplicate(entity_type: &'static str, id: impl Into<String>) -> Self {
        Self::Duplicate {
            entity_type,
            id: id.into(),
        }
    }

    /// Creates a version conflict error.
    #[must_use]
    pub fn version_conflict(
        entity_type: &'static str,
        id: impl Into<String>,
        expected: u64,
        actual: u64,
    ) -> Self {
        Self::VersionConflict {
            entity_type,
            id: id.into(),
            expected,
            actual,
        }
    }

    /// Creates a connection error.
    #[must_use]
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    /// Creates a query error.
    #[must_use]
    pub fn query(msg: impl Into<String>) -> Self {
        Self::Query(msg.into())
    }

    /// Creates a serialization error.
    #[must_use]
    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::Serialization(msg.into())
    }

    /// Creates an internal error.
    #[must_use]
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Returns true if this is a not found error.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Returns true if this is a duplicate error.
    #[must_use]
    pub fn is_duplicate(&self) -> bool {
        matches!(self, Self::Duplicate { .. })
    }

    /// Returns true if this is a version conflict error.
    #[must_use]
    pub fn is_version_conflict(&self) -> bool {
        matches!(self, Self::VersionConflict { .. })
    }
}

impl From<serde_json::Error> for RepositoryError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

/// Result type for repository operations.
pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Offset pagination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    /// Rows to skip.
    pub offset: usize,
    /// Maximum rows to return.
    pub limit: usize,
}

impl Page {
    /// Largest accepted page size.
    pub const MAX_LIMIT: usize = 200;

    /// Builds a page from 1-based page number and size, clamping the size.
    #[must_use]
    pub fn new(page: usize, per_page: usize) -> Self {
        let limit = per_page.clamp(1, Self::MAX_LIMIT);
        Self {
            offset: page.saturating_sub(1).saturating_mul(limit),
            limit,
        }
    }

    /// Every row; for internal sweeps, never for request input.
    #[must_use]
    pub const fn all() -> Self {
        Self {
            offset: 0,
            limit: usize::MAX,
        }
    }

    /// Applies the page to an already-sorted vector.
    #[must_use]
    pub fn slice<T>(&self, rows: Vec<T>) -> Vec<T> {
        rows.into_iter().skip(self.offset).take(self.limit).collect()
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new(1, 50)
    }
}

/// Filter for [`TransactionRepository::list`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransactionFilter {
    /// Only transactions of this event.
    pub event_id: Option<EventId>,
    /// Only transactions in this status.
    pub status: Option<TransactionStatus>,
}

/// Repository for events.
#[async_trait]
pub trait EventRepository: Send + Sync + fmt::Debug {
    /// Inserts or replaces an event.
    async fn save(&self, event: &Event) -> RepositoryResult<()>;

    /// Gets an event by ID.
    async fn get(&self, tenant: TenantId, id: EventId) -> RepositoryResult<Option<Event>>;

    /// Lists events ordered by start time, optionally filtered by status.
    async fn list(
        &self,
        tenant: TenantId,
        status: Option<EventStatus>,
        page: Page,
    ) -> RepositoryResult<Vec<Event>>;

    /// Counts events matching the filter.
    async fn count(&self, tenant: TenantId, status: Option<EventStatus>) -> RepositoryResult<u64>;
}

/// Repository for participants.
#[async_trait]
pub trait ParticipantRepository: Send + Sync + fmt::Debug {
    /// Inserts or replaces a participant.
    async fn save(&self, participant: &Participant) -> RepositoryResult<()>;

    /// Gets a participant by ID.
    async fn get(
        &self,
        tenant: TenantId,
        id: ParticipantId,
    ) -> RepositoryResult<Option<Participant>>;

    /// Finds a participant by QR token.
    async fn find_by_qr_token(
        &self,
        tenant: TenantId,
        token: &str,
    ) -> RepositoryResult<Option<Participant>>;

    /// Finds a participant of an event by CPF, cancelled ones included.
    async fn find_by_cpf(
        &self,
        tenant: TenantId,
        event_id: EventId,
        cpf: &Cpf,
    ) -> RepositoryResult<Vec<Participant>>;

    /// Lists every participant of an event ordered by registration.
    async fn list_by_event(
        &self,
        tenant: TenantId,
        event_id: EventId,
    ) -> RepositoryResult<Vec<Participant>>;

    /// Counts participants of an event that still hold a seat.
    async fn count_active(&self, tenant: TenantId, event_id: EventId) -> RepositoryResult<usize>;
}

/// Repository for check-in logs.
#[async_trait]
pub trait CheckinRepository: Send + Sync + fmt::Debug {
    /// Inserts or replaces a log entry.
    async fn save(&self, log: &CheckinLog) -> RepositoryResult<()>;

    /// Inserts a new session, failing if the participant already has an
    /// open one.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Duplicate` when an active session exists.
    async fn open_session(&self, log: &CheckinLog) -> RepositoryResult<()>;

    /// Gets a log entry by ID.
    async fn get(&self, tenant: TenantId, id: CheckinId) -> RepositoryResult<Option<CheckinLog>>;

    /// Returns the open session of a participant, if any.
    async fn find_active(
        &self,
        tenant: TenantId,
        participant_id: ParticipantId,
    ) -> RepositoryResult<Option<CheckinLog>>;

    /// Lists the log of an event, newest first.
    async fn list_by_event(
        &self,
        tenant: TenantId,
        event_id: EventId,
    ) -> RepositoryResult<Vec<CheckinLog>>;
}

/// Repository for PDV products.
#[async_trait]
pub trait ProductRepository: Send + Sync + fmt::Debug {
    /// Inserts or replaces a product.
    async fn save(&self, product: &Product) -> RepositoryResult<()>;

    /// Gets a product by ID.
    async fn get(&self, tenant: TenantId, id: ProductId) -> RepositoryResult<Option<Product>>;

    /// Finds a product of an event by SKU.
    async fn find_by_sku(
        &self,
        tenant: TenantId,
        event_id: EventId,
        sku: &str,
    ) -> RepositoryResult<Option<Product>>;

    /// Lists products of an event ordered by name.
    async fn list_by_event(
        &self,
        tenant: TenantId,
        event_id: EventId,
    ) -> RepositoryResult<Vec<Product>>;
}

/// Repository for PDV sales.
#[async_trait]
pub trait SaleRepository: Send + Sync + fmt::Debug {
    /// Inserts or replaces a sale.
    async fn save(&self, sale: &Sale) -> RepositoryResult<()>;

    /// Gets a sale by ID.
    async fn get(&self, tenant: TenantId, id: SaleId) -> RepositoryResult<Option<Sale>>;

    /// Lists sales of an event, newest first.
    async fn list_by_event(&self, tenant: TenantId, event_id: EventId)
    -> RepositoryResult<Vec<Sale>>;
}

/// Repository for payment transactions.
#[async_trait]
pub trait TransactionRepository: Send + Sync + fmt::Debug {
    /// Inserts or replaces a transaction.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::VersionConflict` if the stored version is
    /// not older than the one being written.
    async fn save(&self, tx: &Transaction) -> RepositoryResult<()>;

    /// Gets a transaction by ID.
    async fn get(&self, tenant: TenantId, id: TransactionId)
    -> RepositoryResult<Option<Transaction>>;

    /// Finds a transaction by gateway reference across all tenants.
    ///
    /// Only used by the webhook endpoint, which is not tenant-authenticated.
    async fn find_by_gateway_reference(
        &self,
        reference: &str,
    ) -> RepositoryResult<Option<Transaction>>;

    /// Lists transactions, newest first.
    async fn list(
        &self,
        tenant: TenantId,
        filter: TransactionFilter,
        page: Page,
    ) -> RepositoryResult<Vec<Transaction>>;

    /// Lists every transaction paid by an e-mail address.
    async fn list_by_payer(
        &self,
        tenant: TenantId,
        email: &str,
    ) -> RepositoryResult<Vec<Transaction>>;

    /// Counts transactions by an e-mail address created after `since`.
    async fn count_by_payer_since(
        &self,
        tenant: TenantId,
        email: &str,
        since: Timestamp,
    ) -> RepositoryResult<u32>;
}

/// Repository for refunds.
#[async_trait]
pub trait RefundRepository: Send + Sync + fmt::Debug {
    /// Inserts or replaces a refund with the same version rule as
    /// [`TransactionRepository::save`].
    async fn save(&self, refund: &Refund) -> RepositoryResult<()>;

    /// Gets a refund by ID.
    async fn get(&self, tenant: TenantId, id: RefundId) -> RepositoryResult<Option<Refund>>;

    /// Lists refunds of a transaction, oldest first.
    async fn list_by_transaction(
        &self,
        tenant: TenantId,
        transaction_id: TransactionId,
    ) -> RepositoryResult<Vec<Refund>>;

    /// Lists refunds, newest first, optionally filtered by state.
    async fn list(
        &self,
        tenant: TenantId,
        state: Option<RefundState>,
        page: Page,
    ) -> RepositoryResult<Vec<Refund>>;
}

/// Repository for notifications.
#[async_trait]
pub trait NotificationRepository: Send + Sync + fmt::Debug {
    /// Inserts or replaces a notification.
    async fn save(&self, notification: &Notification) -> RepositoryResult<()>;

    /// Gets a notification by ID.
    async fn get(
        &self,
        tenant: TenantId,
        id: NotificationId,
    ) -> RepositoryResult<Option<Notification>>;

    /// Lists notifications, newest first, optionally filtered by status.
    async fn list(
        &self,
        tenant: TenantId,
        status: Option<NotificationStatus>,
        page: Page,
    ) -> RepositoryResult<Vec<Notification>>;
}

/// Append-only treasury ledger.
#[async_trait]
pub trait LedgerRepository: Send + Sync + fmt::Debug {
    /// Appends an entry.
    async fn append(&self, entry: &LedgerEntry) -> RepositoryResult<()>;

    /// Lists entries created in `[from, to]`, oldest first. Both bounds are
    /// inclusive; `None` leaves that side open.
    async fn list(
        &self,
        tenant: TenantId,
        from: Option<Timestamp>,
        to: Option<Timestamp>,
    ) -> RepositoryResult<Vec<LedgerEntry>>;

    /// Lists the tenants that have at least one entry.
    async fn tenants(&self) -> RepositoryResult<Vec<TenantId>>;
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    mod repository_error {
        use super::*;

        #[test]
        fn not_found_error() {
            let err = RepositoryError::not_found("Event", "evt-123");
            assert!(err.is_not_found());
            assert!(!err.is_duplicate());
            assert!(!err.is_version_conflict());
            assert!(err.to_string().contains("Event"));
            assert!(err.to_string().contains("evt-123"));
        }

        #[test]
        fn version_conflict_error() {
            let err = RepositoryError::version_conflict("Transaction", "tx-1", 1, 2);
            assert!(err.is_version_conflict());
            assert!(err.to_string().contains("conflict"));
        }

        #[test]
        fn from_serde_error() {
            let err: RepositoryError = serde_json::from_str::<u8>("x").unwrap_err().into();
            assert!(matches!(err, RepositoryError::Serialization(_)));
        }
    }

    mod page {
        use super::*;

        #[test]
        fn clamps_and_offsets() {
            let p = Page::new(3, 10);
            assert_eq!(p.offset, 20);
            assert_eq!(p.limit, 10);
            assert_eq!(Page::new(0, 0), Page { offset: 0, limit: 1 });
            assert_eq!(Page::new(1, 10_000).limit, Page::MAX_LIMIT);
        }

        #[test]
        fn slices() {
            let rows: Vec<u32> = (0..25).collect();
            assert_eq!(Page::new(3, 10).slice(rows), vec![20, 21, 22, 23, 24]);
        }
    }
}
