//! # In-Memory Repositories
//!
//! In-memory implementations for testing and single-node development.
//!
//! ## Available Repositories
//!
//! - [`InMemoryEventRepository`], [`InMemoryParticipantRepository`],
//!   [`InMemoryCheckinRepository`]
//! - [`InMemoryProductRepository`], [`InMemorySaleRepository`]
//! - [`InMemoryTransactionRepository`], [`InMemoryRefundRepository`]
//! - [`InMemoryNotificationRepository`], [`InMemoryLedgerRepository`]
//! - [`InMemoryEventStore`]
//!
//! ## Thread Safety
//!
//! All implementations use `Arc<RwLock<..>>` for thread-safe access.

pub mod attendance;
pub mod back_office;
pub mod commerce;
pub mod event_store;
pub mod payments;

pub use attendance::{
    InMemoryCheckinRepository, InMemoryEventRepository, InMemoryParticipantRepository,
};
pub use back_office::{InMemoryLedgerRepository, InMemoryNotificationRepository};
pub use commerce::{InMemoryProductRepository, InMemorySaleRepository};
pub use event_store::InMemoryEventStore;
pub use payments::{InMemoryRefundRepository, InMemoryTransactionRepository};
