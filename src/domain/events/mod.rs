//! # Domain Events
//!
//! Events emitted during domain operations for the audit trail.
//!
//! ## Attendance Events
//!
//! - [`EventPublished`], [`EventCancelled`]
//! - [`ParticipantRegistered`]
//! - [`ParticipantCheckedIn`], [`ParticipantCheckedOut`]
//!
//! ## Commerce Events
//!
//! - [`SaleCompleted`], [`SaleCancelled`]
//! - [`PaymentConfirmed`], [`PaymentFailed`]
//! - [`RefundRequested`], [`RefundCompleted`], [`RefundRejected`]

pub mod attendance_events;
pub mod commerce_events;
pub mod domain_event;

pub use attendance_events::{
    EventCancelled, EventPublished, ParticipantCheckedIn, ParticipantCheckedOut,
    ParticipantRegistered,
};
pub use commerce_events::{
    PaymentConfirmed, PaymentFailed, RefundCompleted, RefundRejected, RefundRequested,
    SaleCancelled, SaleCompleted,
};
pub use domain_event::{DomainEvent, EventMetadata, EventType};
