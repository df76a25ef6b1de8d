//! # Value Objects
//!
//! Immutable types with validation and domain semantics.
//!
//! ## Identity Types
//!
//! - [`TenantId`], [`EventId`], [`ParticipantId`], ...: UUID-based identifiers
//! - [`DomainEventId`]: identifier of a recorded domain event
//!
//! ## Numeric Types
//!
//! - [`Money`]: non-negative BRL amount with cent precision
//!
//! ## Arithmetic
//!
//! - [`ArithmeticError`]: Error type for arithmetic failures
//! - [`CheckedArithmetic`]: Trait for safe arithmetic operations
//! - [`Rounding`]: Enum for explicit rounding direction
//!
//! ## Documents
//!
//! - [`Cpf`]: validated Brazilian taxpayer number
//!
//! ## Domain Enums
//!
//! - `PaymentMethod`, `CheckinMethod`, `NotificationChannel`
//! - `EventStatus`, `ParticipantStatus`, `TransactionStatus`, `SaleStatus`,
//!   `NotificationStatus`
//! - [`RefundState`]: refund lifecycle states

pub mod arithmetic;
pub mod cpf;
pub mod enums;
pub mod ids;
pub mod money;
pub mod refund_state;
pub mod timestamp;

pub use arithmetic::{ArithmeticError, ArithmeticResult, CheckedArithmetic, Rounding};
pub use cpf::{Cpf, CpfError};
pub use enums::{
    CheckinMethod, EventStatus, NotificationChannel, NotificationStatus, ParseEnumError,
    ParticipantStatus, PaymentMethod, SaleStatus, TransactionStatus,
};
pub use ids::{
    CheckinId, DomainEventId, EventId, LedgerEntryId, NotificationId, ParticipantId, ProductId,
    RefundId, SaleId, TenantId, TransactionId, UserId,
};
pub use money::Money;
pub use refund_state::RefundState;
pub use timestamp::Timestamp;
