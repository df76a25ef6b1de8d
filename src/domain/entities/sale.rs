//! # Sale
//!
//! A completed PDV sale.
//!
//! Totals are computed once, at construction, from the line items:
//!
//! ```text
//! line_total = unit_price × quantity
//! subtotal   = Σ line_total
//! total      = subtotal − discount        (discount ≤ subtotal)
//! ```
//!
//! # Examples
//!
//! ```
//! use eventos::domain::entities::sale::{Sale, SaleItem};
//! use eventos::domain::value_objects::{
//!     EventId, Money, PaymentMethod, ProductId, TenantId, UserId,
//! };
//!
//! let items = vec![
//!     SaleItem::new(ProductId::new_v4(), "Cerveja", Money::from_cents(1200), 2).unwrap(),
//!     SaleItem::new(ProductId::new_v4(), "Água", Money::from_cents(500), 1).unwrap(),
//! ];
//! let sale = Sale::new(
//!     TenantId::new_v4(),
//!     EventId::new_v4(),
//!     items,
//!     Money::from_cents(400),
//!     PaymentMethod::Pix,
//!     UserId::new_v4(),
//! )
//! .unwrap();
//!
//! assert_eq!(sale.subtotal(), Money::from_cents(2900));
//! assert_eq!(sale.total(), Money::from_cents(2500));
//! ```

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::value_objects::{
    ArithmeticResult, EventId, Money, PaymentMethod, ProductId, SaleId, SaleStatus, TenantId,
    Timestamp, UserId,
};
use serde::{Deserialize, Serialize};

/// One line of a sale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct SaleItem {
    product_id: ProductId,
    name: String,
    unit_price: Money,
    quantity: u32,
    line_total: Money,
}

impl SaleItem {
    /// Creates a line, snapshotting the product name and price.
    ///
    /// # Errors
    ///
    /// - `DomainError::Validation` for a zero quantity
    /// - `DomainError::Arithmetic` on overflow
    pub fn new(
        product_id: ProductId,
        name: impl Into<String>,
        unit_price: Money,
        quantity: u32,
    ) -> DomainResult<Self> {
        if quantity == 0 {
            return Err(DomainError::validation("item quantity must be positive"));
        }
        Ok(Self {
            product_id,
            name: name.into(),
            unit_price,
            quantity,
            line_total: unit_price.times(quantity)?,
        })
    }

    /// Returns the product.
    #[inline]
    #[must_use]
    pub fn product_id(&self) -> ProductId {
        self.product_id
    }

    /// Returns the product name at sale time.
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the unit price at sale time.
    #[inline]
    #[must_use]
    pub fn unit_price(&self) -> Money {
        self.unit_price
    }

    /// Returns the quantity.
    #[inline]
    #[must_use]
    pub fn quantity(&self) -> u32 {
        self.quantity
    }

    /// Returns `unit_price × quantity`.
    #[inline]
    #[must_use]
    pub fn line_total(&self) -> Money {
        self.line_total
    }
}

/// PDV sale aggregate.
///
/// # Invariants
///
/// - At least one line item
/// - `discount ≤ subtotal`
/// - `total = Σ line_total − discount`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sale {
    id: SaleId,
    tenant_id: TenantId,
    event_id: EventId,
    items: Vec<SaleItem>,
    subtotal: Money,
    discount: Money,
    total: Money,
    payment_method: PaymentMethod,
    operator_id: UserId,
    status: SaleStatus,
    created_at: Timestamp,
    cancelled_at: Option<Timestamp>,
}

impl Sale {
    /// Creates a completed sale.
    ///
    /// # Errors
    ///
    /// - `DomainError::Validation` with no items
    /// - `DomainError::InvalidAmount` if the discount exceeds the subtotal
    /// - `DomainError::Arithmetic` on overflow
    pub fn new(
        tenant_id: TenantId,
        event_id: EventId,
        items: Vec<SaleItem>,
        discount: Money,
        payment_method: PaymentMethod,
        operator_id: UserId,
    ) -> DomainResult<Self> {
        if items.is_empty() {
            return Err(DomainError::validation("a sale needs at least one item"));
        }
        let subtotal: ArithmeticResult<Money> = items.iter().map(|i| &i.line_total).sum();
        let subtotal = subtotal?;
        if discount > subtotal {
            return Err(DomainError::invalid_amount(format!(
                "discount {discount} exceeds subtotal {subtotal}"
            )));
        }
        let total = subtotal.checked_sub(discount)?;
        Ok(Self {
            id: SaleId::new_v4(),
            tenant_id,
            event_id,
            items,
            subtotal,
            discount,
            total,
            payment_method,
            operator_id,
            status: SaleStatus::Completed,
            created_at: Timestamp::now(),
            cancelled_at: None,
        })
    }

    /// Returns the sale ID.
    #[inline]
    #[must_use]
    pub fn id(&self) -> SaleId {
        self.id
    }

    /// Returns the owning tenant.
    #[inline]
    #[must_use]
    pub fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }

    /// Returns the event.
    #[inline]
    #[must_use]
    pub fn event_id(&self) -> EventId {
        self.event_id
    }

    /// Returns the line items.
    #[inline]
    #[must_use]
    pub fn items(&self) -> &[SaleItem] {
        &self.items
    }

    /// Returns the sum of line totals.
    #[inline]
    #[must_use]
    pub fn subtotal(&self) -> Money {
        self.subtotal
    }

    /// Returns the discount.
    #[inline]
    #[must_use]
    pub fn discount(&self) -> Money {
        self.discount
    }

    /// Returns the amount charged.
    #[inline]
    #[must_use]
    pub fn total(&self) -> Money {
        self.total
    }

    /// Returns the payment method.
    #[inline]
    #[must_use]
    pub fn payment_method(&self) -> PaymentMethod {
        self.payment_method
    }

    /// Returns the operator who rang the sale.
    #[inline]
    #[must_use]
    pub fn operator_id(&self) -> UserId {
        self.operator_id
    }

    /// Returns the status.
    #[inline]
    #[must_use]
    pub fn status(&self) -> SaleStatus {
        self.status
    }

    /// Returns the sale time.
    #[inline]
    #[must_use]
    pub fn created_at(&self) -> Timestamp {
        self.created_at
    }

    /// Returns when the sale was voided.
    #[inline]
    #[must_use]
    pub fn cancelled_at(&self) -> Option<Timestamp> {
        self.cancelled_at
    }

    /// Returns true unless voided.
    #[inline]
    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.status == SaleStatus::Completed
    }

    /// Voids the sale.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidStateTransition` if already cancelled.
    pub fn cancel(&mut self) -> DomainResult<()> {
        if self.status == SaleStatus::Cancelled {
            return Err(DomainError::invalid_transition(
                "sale",
                self.status,
                SaleStatus::Cancelled,
            ));
        }
        self.status = SaleStatus::Cancelled;
        self.cancelled_at = Some(Timestamp::now());
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn sale(items: Vec<SaleItem>, discount: Money) -> DomainResult<Sale> {
        Sale::new(
            TenantId::new_v4(),
            EventId::new_v4(),
            items,
            discount,
            PaymentMethod::Cash,
            UserId::new_v4(),
        )
    }

    #[test]
    fn empty_sale_is_rejected() {
        assert!(matches!(
            sale(vec![], Money::ZERO),
            Err(DomainError::Validation(_))
        ));
    }

    #[test]
    fn zero_quantity_item_is_rejected() {
        assert!(SaleItem::new(ProductId::new_v4(), "x", Money::from_cents(100), 0).is_err());
    }

    #[test]
    fn discount_larger_than_subtotal_is_rejected() {
        let item = SaleItem::new(ProductId::new_v4(), "x", Money::from_cents(100), 1).unwrap();
        assert!(matches!(
            sale(vec![item], Money::from_cents(101)),
            Err(DomainError::InvalidAmount(_))
        ));
    }

    #[test]
    fn full_discount_gives_zero_total() {
        let item = SaleItem::new(ProductId::new_v4(), "x", Money::from_cents(100), 2).unwrap();
        let s = sale(vec![item], Money::from_cents(200)).unwrap();
        assert!(s.total().is_zero());
    }

    #[test]
    fn cancel_twice_fails() {
        let item = SaleItem::new(ProductId::new_v4(), "x", Money::from_cents(100), 1).unwrap();
        let mut s = sale(vec![item], Money::ZERO).unwrap();
        s.cancel().unwrap();
        assert!(!s.is_completed());
        assert!(s.cancel().is_err());
    }

    proptest! {
        #[test]
        fn total_is_sum_of_lines_minus_discount(
            lines in proptest::collection::vec((1_i64..100_000, 1_u32..50), 1..8),
            discount_pct in 0_i64..=100,
        ) {
            let items: Vec<SaleItem> = lines
                .iter()
                .map(|(cents, qty)| {
                    SaleItem::new(ProductId::new_v4(), "p", Money::from_cents(*cents), *qty).unwrap()
                })
                .collect();
            let expected_subtotal: i64 = lines.iter().map(|(c, q)| c * i64::from(*q)).sum();
            let discount = Money::from_cents(expected_subtotal * discount_pct / 100);
            let s = sale(items, discount).unwrap();
            prop_assert_eq!(s.subtotal().cents(), expected_subtotal);
            prop_assert_eq!(s.total().cents(), expected_subtotal - discount.cents());
        }
    }
}
