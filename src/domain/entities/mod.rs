//! # Domain Entities
//!
//! Aggregate roots and entities representing core business concepts.
//!
//! ## Aggregates
//!
//! - [`Event`]: the gathering, with its lifecycle
//! - [`Transaction`]: a payment and its refund tally
//! - [`Refund`]: refund request with state machine and history
//! - [`Sale`]: PDV sale with computed totals
//!
//! ## Entities
//!
//! - [`Participant`], [`CheckinLog`], [`Product`], [`Notification`]
//! - [`LedgerEntry`]: treasury movement

pub mod checkin;
pub mod event;
pub mod notification;
pub mod participant;
pub mod product;
pub mod refund;
pub mod sale;
pub mod transaction;
pub mod treasury;

pub use checkin::CheckinLog;
pub use event::{Event, EventDetails};
pub use notification::Notification;
pub use participant::{Participant, ParticipantDetails};
pub use product::{Product, ProductDetails, ProductUpdate};
pub use refund::{Refund, RefundTransition};
pub use sale::{Sale, SaleItem};
pub use transaction::{Payer, PaymentTarget, Transaction, MAX_INSTALLMENTS};
pub use treasury::{
    FeeSchedule, LedgerDirection, LedgerEntry, LedgerEntryKind, MethodFee, TreasuryBalance,
};
