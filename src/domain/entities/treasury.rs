//! # Treasury Ledger
//!
//! Append-only money movements per tenant and the balances derived from them.
//!
//! Every payment produces a gross credit that becomes available after the
//! method's settlement days, plus an immediate fee debit. Refunds and cash
//! sweeps are immediate debits. Balances are never stored; they are folded
//! from the entries at a point in time.
//!
//! # Examples
//!
//! ```
//! use eventos::domain::entities::treasury::FeeSchedule;
//! use eventos::domain::value_objects::{Money, PaymentMethod};
//!
//! let fees = FeeSchedule::default();
//! let fee = fees.fee_for(PaymentMethod::CreditCard, Money::from_cents(10_000)).unwrap();
//! assert_eq!(fee, Money::from_cents(399));
//! ```

use crate::domain::value_objects::{
    ArithmeticResult, CheckedArithmetic, EventId, LedgerEntryId, Money, PaymentMethod, Rounding,
    TenantId, Timestamp,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// What a ledger movement represents.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
    schemars::JsonSchema,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LedgerEntryKind {
    /// Gross amount of a captured payment.
    PaymentReceived,
    /// Acquirer/gateway fee for a payment.
    ProcessingFee,
    /// Money returned to a payer.
    RefundIssued,
    /// PDV sale revenue.
    SaleRevenue,
    /// Reversal of a voided PDV sale.
    SaleReversal,
    /// Transfer of available funds to the tenant's bank account.
    CashSweep,
    /// Manual correction.
    Adjustment,
}

impl fmt::Display for LedgerEntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::PaymentReceived => "PAYMENT_RECEIVED",
            Self::ProcessingFee => "PROCESSING_FEE",
            Self::RefundIssued => "REFUND_ISSUED",
            Self::SaleRevenue => "SALE_REVENUE",
            Self::SaleReversal => "SALE_REVERSAL",
            Self::CashSweep => "CASH_SWEEP",
            Self::Adjustment => "ADJUSTMENT",
        };
        f.write_str(s)
    }
}

/// Money in or money out.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, schemars::JsonSchema,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LedgerDirection {
    /// Increases the balance.
    Credit,
    /// Decreases the balance.
    Debit,
}

/// One immutable ledger line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct LedgerEntry {
    id: LedgerEntryId,
    tenant_id: TenantId,
    event_id: Option<EventId>,
    kind: LedgerEntryKind,
    direction: LedgerDirection,
    amount: Money,
    reference: Option<String>,
    description: String,
    available_at: Timestamp,
    created_at: Timestamp,
}

impl LedgerEntry {
    /// Creates an entry recorded now.
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        tenant_id: TenantId,
        event_id: Option<EventId>,
        kind: LedgerEntryKind,
        direction: LedgerDirection,
        amount: Money,
        reference: Option<String>,
        description: impl Into<String>,
        available_at: Timestamp,
    ) -> Self {
        Self {
            id: LedgerEntryId::new_v4(),
            tenant_id,
            event_id,
            kind,
            direction,
            amount,
            reference,
            description: description.into(),
            available_at,
            created_at: Timestamp::now(),
        }
    }

    /// Returns the entry ID.
    #[must_use]
    pub fn id(&self) -> LedgerEntryId {
        self.id
    }

    /// Returns the owning tenant.
    #[must_use]
    pub fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }

    /// Returns the event, when the movement belongs to one.
    #[must_use]
    pub fn event_id(&self) -> Option<EventId> {
        self.event_id
    }

    /// Returns the kind.
    #[must_use]
    pub fn kind(&self) -> LedgerEntryKind {
        self.kind
    }

    /// Returns the direction.
    #[must_use]
    pub fn direction(&self) -> LedgerDirection {
        self.direction
    }

    /// Returns the unsigned amount.
    #[must_use]
    pub fn amount(&self) -> Money {
        self.amount
    }

    /// Returns the external reference (transaction, sale, refund id).
    #[must_use]
    pub fn reference(&self) -> Option<&str> {
        self.reference.as_deref()
    }

    /// Returns the description.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Returns when the money becomes available.
    #[must_use]
    pub fn available_at(&self) -> Timestamp {
        self.available_at
    }

    /// Returns the recording time.
    #[must_use]
    pub fn created_at(&self) -> Timestamp {
        self.created_at
    }

    /// Returns the amount with its sign applied.
    #[must_use]
    pub fn signed_amount(&self) -> Decimal {
        match self.direction {
            LedgerDirection::Credit => self.amount.amount(),
            LedgerDirection::Debit => -self.amount.amount(),
        }
    }
}

/// Balance folded from ledger entries.
///
/// Amounts are signed: an early refund of a card payment can leave the
/// available balance negative until the card money settles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct TreasuryBalance {
    /// Settled money.
    pub available: Decimal,
    /// Money waiting for settlement.
    pub pending: Decimal,
    /// `available + pending`.
    pub total: Decimal,
    /// Point in time the balance was computed for.
    pub as_of: Timestamp,
}

impl TreasuryBalance {
    /// Folds `entries` as seen at `as_of`.
    ///
    /// # Errors
    ///
    /// Returns `ArithmeticError::Overflow` on overflow.
    pub fn from_entries<'a>(
        entries: impl IntoIterator<Item = &'a LedgerEntry>,
        as_of: Timestamp,
    ) -> ArithmeticResult<Self> {
        let mut available = Decimal::ZERO;
        let mut pending = Decimal::ZERO;
        for entry in entries {
            if entry.created_at.is_after(&as_of) {
                continue;
            }
            if entry.available_at.is_after(&as_of) {
                pending = pending.safe_add(entry.signed_amount())?;
            } else {
                available = available.safe_add(entry.signed_amount())?;
            }
        }
        Ok(Self {
            available,
            pending,
            total: available.safe_add(pending)?,
            as_of,
        })
    }
}

/// Fee charged for one payment method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct MethodFee {
    /// Fraction of the amount (`0.0399` = 3.99%).
    pub rate: Decimal,
    /// Flat fee per transaction.
    pub fixed: Money,
}

impl MethodFee {
    const fn free() -> Self {
        Self {
            rate: Decimal::ZERO,
            fixed: Money::ZERO,
        }
    }
}

/// Per-method fee table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct FeeSchedule {
    fees: BTreeMap<PaymentMethod, MethodFee>,
}

impl Default for FeeSchedule {
    fn default() -> Self {
        let fees = BTreeMap::from([
            (
                PaymentMethod::CreditCard,
                MethodFee {
                    rate: Decimal::new(399, 4),
                    fixed: Money::ZERO,
                },
            ),
            (
                PaymentMethod::DebitCard,
                MethodFee {
                    rate: Decimal::new(199, 4),
                    fixed: Money::ZERO,
                },
            ),
            (
                PaymentMethod::Pix,
                MethodFee {
                    rate: Decimal::new(99, 4),
                    fixed: Money::ZERO,
                },
            ),
            (
                PaymentMethod::Boleto,
                MethodFee {
                    rate: Decimal::ZERO,
                    fixed: Money::from_cents(349),
                },
            ),
            (PaymentMethod::BankTransfer, MethodFee::free()),
            (PaymentMethod::Cash, MethodFee::free()),
        ]);
        Self { fees }
    }
}

impl FeeSchedule {
    /// Builds a schedule from explicit fees; missing methods are free.
    #[must_use]
    pub fn new(fees: BTreeMap<PaymentMethod, MethodFee>) -> Self {
        Self { fees }
    }

    /// Returns the fee configured for a method.
    #[must_use]
    pub fn method_fee(&self, method: PaymentMethod) -> MethodFee {
        self.fees.get(&method).copied().unwrap_or(MethodFee::free())
    }

    /// Computes the fee for charging `amount`, capped at the amount itself.
    ///
    /// # Errors
    ///
    /// Returns an `ArithmeticError` on overflow.
    pub fn fee_for(&self, method: PaymentMethod, amount: Money) -> ArithmeticResult<Money> {
        let fee = self.method_fee(method);
        let variable = amount.percentage(fee.rate, Rounding::HalfEven)?;
        let total = variable.checked_add(fee.fixed)?;
        Ok(total.min(amount))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn entry(direction: LedgerDirection, cents: i64, available_at: Timestamp) -> LedgerEntry {
        LedgerEntry::new(
            TenantId::new_v4(),
            None,
            LedgerEntryKind::Adjustment,
            direction,
            Money::from_cents(cents),
            None,
            "test",
            available_at,
        )
    }

    #[test]
    fn fees_per_method() {
        let fees = FeeSchedule::default();
        let amount = Money::from_cents(10_000);
        assert_eq!(
            fees.fee_for(PaymentMethod::Pix, amount).unwrap(),
            Money::from_cents(99)
        );
        assert_eq!(
            fees.fee_for(PaymentMethod::Boleto, amount).unwrap(),
            Money::from_cents(349)
        );
        assert!(fees.fee_for(PaymentMethod::Cash, amount).unwrap().is_zero());
    }

    #[test]
    fn fee_never_exceeds_amount() {
        let fees = FeeSchedule::default();
        let tiny = Money::from_cents(100);
        assert_eq!(fees.fee_for(PaymentMethod::Boleto, tiny).unwrap(), tiny);
    }

    #[test]
    fn balance_splits_available_and_pending() {
        let now = Timestamp::now();
        let entries = vec![
            entry(LedgerDirection::Credit, 10_000, now.sub_days(1)),
            entry(LedgerDirection::Credit, 5_000, now.add_days(30)),
            entry(LedgerDirection::Debit, 300, now.sub_days(1)),
        ];
        let balance = TreasuryBalance::from_entries(&entries, now.add_secs(1)).unwrap();
        assert_eq!(balance.available, Decimal::new(9_700, 2));
        assert_eq!(balance.pending, Decimal::new(5_000, 2));
        assert_eq!(balance.total, Decimal::new(14_700, 2));
    }

    #[test]
    fn available_can_go_negative() {
        let now = Timestamp::now();
        let entries = vec![
            entry(LedgerDirection::Credit, 10_000, now.add_days(30)),
            entry(LedgerDirection::Debit, 10_000, now.sub_days(1)),
        ];
        let balance = TreasuryBalance::from_entries(&entries, now.add_secs(1)).unwrap();
        assert_eq!(balance.available, Decimal::new(-10_000, 2));
        assert!(balance.total.is_zero());
    }
}
