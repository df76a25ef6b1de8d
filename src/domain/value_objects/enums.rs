//! # Domain Enums
//!
//! Enumeration types for domain concepts.
//!
//! - [`PaymentMethod`] - How a payer settles a charge
//! - [`CheckinMethod`] - How a participant was identified at the door
//! - [`NotificationChannel`] - Outbound delivery channel
//! - [`EventStatus`] - Event lifecycle
//! - [`ParticipantStatus`] - Registration lifecycle
//! - [`TransactionStatus`] - Payment lifecycle
//! - [`SaleStatus`] - PDV sale lifecycle
//! - [`NotificationStatus`] - Delivery lifecycle
//!
//! All enums implement `Display`, `FromStr` and serialize in
//! `SCREAMING_SNAKE_CASE`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

fn normalize(s: &str) -> String {
    s.trim().to_uppercase().replace(['-', ' '], "_")
}

/// Payment method accepted by the platform.
///
/// # Examples
///
/// ```
/// use eventos::domain::value_objects::enums::PaymentMethod;
///
/// assert_eq!(PaymentMethod::Pix.settlement_days(), 0);
/// assert!(PaymentMethod::CreditCard.supports_installments());
/// assert_eq!("pix".parse::<PaymentMethod>().unwrap(), PaymentMethod::Pix);
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
    schemars::JsonSchema,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(u8)]
pub enum PaymentMethod {
    /// Credit card, optionally in installments.
    CreditCard = 0,
    /// Debit card.
    DebitCard = 1,
    /// PIX instant payment.
    Pix = 2,
    /// Boleto bancário (bank slip).
    Boleto = 3,
    /// Bank transfer (TED), confirmed manually.
    BankTransfer = 4,
    /// Cash at the PDV.
    Cash = 5,
}

impl PaymentMethod {
    /// All methods, in declaration order.
    pub const ALL: [Self; 6] = [
        Self::CreditCard,
        Self::DebitCard,
        Self::Pix,
        Self::Boleto,
        Self::BankTransfer,
        Self::Cash,
    ];

    /// Business days until the acquirer makes funds available.
    #[must_use]
    pub const fn settlement_days(self) -> i64 {
        match self {
            Self::CreditCard => 30,
            Self::DebitCard | Self::BankTransfer => 1,
            Self::Boleto => 2,
            Self::Pix | Self::Cash => 0,
        }
    }

    /// Returns true if the charge may be split into installments.
    #[inline]
    #[must_use]
    pub const fn supports_installments(self) -> bool {
        matches!(self, Self::CreditCard)
    }

    /// Returns true for methods that an operator confirms by hand.
    #[inline]
    #[must_use]
    pub const fn requires_manual_confirmation(self) -> bool {
        matches!(self, Self::BankTransfer | Self::Cash)
    }

    /// Returns true for methods that go through the payment gateway.
    #[inline]
    #[must_use]
    pub const fn uses_gateway(self) -> bool {
        !self.requires_manual_confirmation()
    }

    /// Wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CreditCard => "CREDIT_CARD",
            Self::DebitCard => "DEBIT_CARD",
            Self::Pix => "PIX",
            Self::Boleto => "BOLETO",
            Self::BankTransfer => "BANK_TRANSFER",
            Self::Cash => "CASH",
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentMethod {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "CREDIT_CARD" | "CREDIT" | "CARTAO_CREDITO" => Ok(Self::CreditCard),
            "DEBIT_CARD" | "DEBIT" | "CARTAO_DEBITO" => Ok(Self::DebitCard),
            "PIX" => Ok(Self::Pix),
            "BOLETO" => Ok(Self::Boleto),
            "BANK_TRANSFER" | "TRANSFER" | "TED" => Ok(Self::BankTransfer),
            "CASH" | "DINHEIRO" => Ok(Self::Cash),
            _ => Err(ParseEnumError::InvalidValue("PaymentMethod", s.to_string())),
        }
    }
}

/// How a participant was identified at check-in.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
    schemars::JsonSchema,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(u8)]
pub enum CheckinMethod {
    /// Scanned ticket QR code.
    QrCode = 0,
    /// Typed CPF.
    Cpf = 1,
    /// Operator picked the participant from a list.
    Manual = 2,
}

impl CheckinMethod {
    /// Wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::QrCode => "QR_CODE",
            Self::Cpf => "CPF",
            Self::Manual => "MANUAL",
        }
    }
}

impl fmt::Display for CheckinMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CheckinMethod {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "QR_CODE" | "QR" | "QRCODE" => Ok(Self::QrCode),
            "CPF" => Ok(Self::Cpf),
            "MANUAL" => Ok(Self::Manual),
            _ => Err(ParseEnumError::InvalidValue("CheckinMethod", s.to_string())),
        }
    }
}

/// Outbound notification channel.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
    schemars::JsonSchema,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(u8)]
pub enum NotificationChannel {
    /// E-mail over SMTP.
    Email = 0,
    /// SMS through an HTTP provider.
    Sms = 1,
    /// Mobile push through an HTTP provider.
    Push = 2,
    /// WhatsApp message through the SMS provider's API.
    WhatsApp = 3,
}

impl NotificationChannel {
    /// Wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Email => "EMAIL",
            Self::Sms => "SMS",
            Self::Push => "PUSH",
            Self::WhatsApp => "WHATS_APP",
        }
    }
}

impl fmt::Display for NotificationChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NotificationChannel {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "EMAIL" | "E_MAIL" => Ok(Self::Email),
            "SMS" => Ok(Self::Sms),
            "PUSH" => Ok(Self::Push),
            "WHATS_APP" | "WHATSAPP" => Ok(Self::WhatsApp),
            _ => Err(ParseEnumError::InvalidValue(
                "NotificationChannel",
                s.to_string(),
            )),
        }
    }
}

/// Event lifecycle.
///
/// ```text
/// Draft → Published → InProgress → Finished
///   └────────┴────────────┴──────→ Cancelled
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize,
    schemars::JsonSchema,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(u8)]
pub enum EventStatus {
    /// Being prepared, not visible to the public.
    #[default]
    Draft = 0,
    /// Open for registrations.
    Published = 1,
    /// Doors open.
    InProgress = 2,
    /// Over (terminal).
    Finished = 3,
    /// Cancelled, soft-deleted (terminal).
    Cancelled = 4,
}

impl EventStatus {
    /// Returns true if this is a terminal state.
    #[inline]
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Finished | Self::Cancelled)
    }

    /// Returns true if this state can transition to the target state.
    #[must_use]
    pub const fn can_transition_to(self, target: Self) -> bool {
        matches!(
            (self, target),
            (Self::Draft, Self::Published)
                | (Self::Published, Self::InProgress)
                | (Self::InProgress, Self::Finished)
                | (Self::Draft | Self::Published | Self::InProgress, Self::Cancelled)
        )
    }

    /// Returns true if participants can register.
    #[inline]
    #[must_use]
    pub const fn accepts_registrations(self) -> bool {
        matches!(self, Self::Published | Self::InProgress)
    }

    /// Returns true if the door is open for check-ins.
    #[inline]
    #[must_use]
    pub const fn accepts_checkins(self) -> bool {
        matches!(self, Self::Published | Self::InProgress)
    }

    /// Wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "DRAFT",
            Self::Published => "PUBLISHED",
            Self::InProgress => "IN_PROGRESS",
            Self::Finished => "FINISHED",
            Self::Cancelled => "CANCELLED",
        }
    }
}

impl fmt::Display for EventStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "DRAFT" => Ok(Self::Draft),
            "PUBLISHED" => Ok(Self::Published),
            "IN_PROGRESS" | "INPROGRESS" => Ok(Self::InProgress),
            "FINISHED" => Ok(Self::Finished),
            "CANCELLED" | "CANCELED" => Ok(Self::Cancelled),
            _ => Err(ParseEnumError::InvalidValue("EventStatus", s.to_string())),
        }
    }
}

/// Participant registration status.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize,
    schemars::JsonSchema,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(u8)]
pub enum ParticipantStatus {
    /// Registered, payment not yet confirmed.
    #[default]
    Registered = 0,
    /// Ticket paid or otherwise confirmed.
    Confirmed = 1,
    /// Registration cancelled; does not hold a seat.
    Cancelled = 2,
}

impl ParticipantStatus {
    /// Returns true if this state can transition to the target state.
    #[must_use]
    pub const fn can_transition_to(self, target: Self) -> bool {
        matches!(
            (self, target),
            (Self::Registered, Self::Confirmed)
                | (Self::Registered | Self::Confirmed, Self::Cancelled)
        )
    }

    /// Returns true if the participant holds a seat.
    #[inline]
    #[must_use]
    pub const fn is_active(self) -> bool {
        !matches!(self, Self::Cancelled)
    }

    /// Wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Registered => "REGISTERED",
            Self::Confirmed => "CONFIRMED",
            Self::Cancelled => "CANCELLED",
        }
    }
}

impl fmt::Display for ParticipantStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payment transaction lifecycle.
///
/// ```text
/// Pending → Authorized → Paid → PartiallyRefunded → Refunded
///    │          │          └───────────────────────→ Refunded
///    └──────────┴→ Failed | Cancelled
/// Pending → Paid (instant methods)
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize,
    schemars::JsonSchema,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(u8)]
pub enum TransactionStatus {
    /// Created, waiting for the payer or the gateway.
    #[default]
    Pending = 0,
    /// Card authorized, not yet captured.
    Authorized = 1,
    /// Funds captured.
    Paid = 2,
    /// Part of the amount returned.
    PartiallyRefunded = 3,
    /// Whole amount returned (terminal).
    Refunded = 4,
    /// Gateway refused the charge (terminal).
    Failed = 5,
    /// Cancelled before capture (terminal).
    Cancelled = 6,
}

impl TransactionStatus {
    /// Returns true if this is a terminal state.
    #[inline]
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Refunded | Self::Failed | Self::Cancelled)
    }

    /// Returns true if this state can transition to the target state.
    #[must_use]
    pub const fn can_transition_to(self, target: Self) -> bool {
        matches!(
            (self, target),
            (Self::Pending, Self::Authorized)
                | (Self::Pending | Self::Authorized, Self::Paid)
                | (Self::Pending | Self::Authorized, Self::Failed)
                | (Self::Pending | Self::Authorized, Self::Cancelled)
                | (Self::Paid | Self::PartiallyRefunded, Self::PartiallyRefunded)
                | (Self::Paid | Self::PartiallyRefunded, Self::Refunded)
        )
    }

    /// Returns true if money has been captured and may be refunded.
    #[inline]
    #[must_use]
    pub const fn is_refundable(self) -> bool {
        matches!(self, Self::Paid | Self::PartiallyRefunded)
    }

    /// Wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Authorized => "AUTHORIZED",
            Self::Paid => "PAID",
            Self::PartiallyRefunded => "PARTIALLY_REFUNDED",
            Self::Refunded => "REFUNDED",
            Self::Failed => "FAILED",
            Self::Cancelled => "CANCELLED",
        }
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "PENDING" => Ok(Self::Pending),
            "AUTHORIZED" => Ok(Self::Authorized),
            "PAID" | "APPROVED" => Ok(Self::Paid),
            "PARTIALLY_REFUNDED" => Ok(Self::PartiallyRefunded),
            "REFUNDED" => Ok(Self::Refunded),
            "FAILED" | "DECLINED" => Ok(Self::Failed),
            "CANCELLED" | "CANCELED" => Ok(Self::Cancelled),
            _ => Err(ParseEnumError::InvalidValue(
                "TransactionStatus",
                s.to_string(),
            )),
        }
    }
}

/// PDV sale status.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize,
    schemars::JsonSchema,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(u8)]
pub enum SaleStatus {
    /// Paid and delivered.
    #[default]
    Completed = 0,
    /// Voided; stock returned.
    Cancelled = 1,
}

impl fmt::Display for SaleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Completed => f.write_str("COMPLETED"),
            Self::Cancelled => f.write_str("CANCELLED"),
        }
    }
}

/// Notification delivery status.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize,
    schemars::JsonSchema,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(u8)]
pub enum NotificationStatus {
    /// Persisted, not yet attempted.
    #[default]
    Pending = 0,
    /// Accepted by the provider (terminal).
    Sent = 1,
    /// Every attempt failed; eligible for a manual retry.
    Failed = 2,
}

impl NotificationStatus {
    /// Returns true if this state can transition to the target state.
    #[must_use]
    pub const fn can_transition_to(self, target: Self) -> bool {
        matches!(
            (self, target),
            (Self::Pending | Self::Failed, Self::Sent) | (Self::Pending | Self::Failed, Self::Failed)
        )
    }
}

impl fmt::Display for NotificationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => f.write_str("PENDING"),
            Self::Sent => f.write_str("SENT"),
            Self::Failed => f.write_str("FAILED"),
        }
    }
}

/// Error type for parsing enum values from strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseEnumError {
    /// The provided string value is not valid for the enum.
    InvalidValue(&'static str, String),
}

impl fmt::Display for ParseEnumError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidValue(enum_name, value) => {
                write!(f, "invalid {enum_name} value: '{value}'")
            }
        }
    }
}

impl std::error::Error for ParseEnumError {}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    mod payment_method {
        use super::*;

        #[test]
        fn settlement_days() {
            assert_eq!(PaymentMethod::CreditCard.settlement_days(), 30);
            assert_eq!(PaymentMethod::DebitCard.settlement_days(), 1);
            assert_eq!(PaymentMethod::Boleto.settlement_days(), 2);
            assert_eq!(PaymentMethod::Cash.settlement_days(), 0);
        }

        #[test]
        fn only_credit_card_has_installments() {
            for method in PaymentMethod::ALL {
                assert_eq!(
                    method.supports_installments(),
                    method == PaymentMethod::CreditCard
                );
            }
        }

        #[test]
        fn parse_aliases() {
            assert_eq!(
                "credit-card".parse::<PaymentMethod>().unwrap(),
                PaymentMethod::CreditCard
            );
            assert_eq!("ted".parse::<PaymentMethod>().unwrap(), PaymentMethod::BankTransfer);
            assert!("bitcoin".parse::<PaymentMethod>().is_err());
        }

        #[test]
        fn serde_uses_screaming_snake_case() {
            let json = serde_json::to_string(&PaymentMethod::BankTransfer).unwrap();
            assert_eq!(json, "\"BANK_TRANSFER\"");
        }
    }

    mod event_status {
        use super::*;

        #[test]
        fn happy_path() {
            assert!(EventStatus::Draft.can_transition_to(EventStatus::Published));
            assert!(EventStatus::Published.can_transition_to(EventStatus::InProgress));
            assert!(EventStatus::InProgress.can_transition_to(EventStatus::Finished));
        }

        #[test]
        fn terminal_states_are_final() {
            assert!(!EventStatus::Finished.can_transition_to(EventStatus::Cancelled));
            assert!(!EventStatus::Cancelled.can_transition_to(EventStatus::Draft));
        }

        #[test]
        fn draft_does_not_accept_registrations() {
            assert!(!EventStatus::Draft.accepts_registrations());
            assert!(EventStatus::Published.accepts_registrations());
        }
    }

    mod transaction_status {
        use super::*;

        #[test]
        fn refund_path() {
            assert!(TransactionStatus::Paid.can_transition_to(TransactionStatus::PartiallyRefunded));
            assert!(
                TransactionStatus::PartiallyRefunded.can_transition_to(TransactionStatus::Refunded)
            );
            assert!(!TransactionStatus::Pending.can_transition_to(TransactionStatus::Refunded));
        }

        #[test]
        fn refunded_is_terminal() {
            assert!(TransactionStatus::Refunded.is_terminal());
            assert!(!TransactionStatus::Paid.is_terminal());
        }
    }

    #[test]
    fn parse_error_display() {
        let err = "x".parse::<CheckinMethod>().unwrap_err();
        assert_eq!(err.to_string(), "invalid CheckinMethod value: 'x'");
    }
}
