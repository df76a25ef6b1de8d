//! # Persistence Layer
//!
//! Repository ports, their in-memory and PostgreSQL adapters, and the
//! domain event store.
//!
//! ## Repository Traits (Ports)
//!
//! - [`EventRepository`], [`ParticipantRepository`], [`CheckinRepository`]
//! - [`ProductRepository`], [`SaleRepository`]
//! - [`TransactionRepository`], [`RefundRepository`]
//! - [`NotificationRepository`], [`LedgerRepository`]
//!
//! ## Implementations
//!
//! - `in_memory`: single-process storage for tests and development
//! - `postgres`: JSONB document storage via sqlx
//! - `event_store`: append-only audit trail of domain events

pub mod event_store;
pub mod in_memory;
pub mod postgres;
pub mod traits;

pub use event_store::{EventStore, EventStoreError, EventStoreResult, StoredEvent};
pub use traits::{
    CheckinRepository, EventRepository, LedgerRepository, NotificationRepository, Page,
    ParticipantRepository, ProductRepository, RefundRepository, RepositoryError,
    RepositoryResult, SaleRepository, TransactionFilter, TransactionRepository,
};
