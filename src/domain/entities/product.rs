//! # Product
//!
//! A PDV item sold at an event, with its own stock counter.

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::value_objects::{ArithmeticError, EventId, Money, ProductId, TenantId, Timestamp};
use serde::{Deserialize, Serialize};

/// Attributes supplied when creating a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct ProductDetails {
    /// Display name.
    pub name: String,
    /// Stock keeping unit, unique per event.
    pub sku: String,
    /// Grouping for reports (e.g. `BEBIDAS`).
    #[serde(default)]
    pub category: Option<String>,
    /// Price of one unit.
    pub unit_price: Money,
    /// Units on hand.
    #[serde(default)]
    pub stock: u32,
    /// Stock level at or below which the product is reported as low.
    #[serde(default)]
    pub low_stock_threshold: u32,
}

/// Partial update; absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct ProductUpdate {
    /// New name.
    pub name: Option<String>,
    /// New category.
    pub category: Option<String>,
    /// New unit price.
    pub unit_price: Option<Money>,
    /// New low-stock threshold.
    pub low_stock_threshold: Option<u32>,
    /// Enable or disable sales.
    pub active: Option<bool>,
}

/// PDV product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    id: ProductId,
    tenant_id: TenantId,
    event_id: EventId,
    name: String,
    sku: String,
    category: Option<String>,
    unit_price: Money,
    stock: u32,
    low_stock_threshold: u32,
    active: bool,
    version: u64,
    created_at: Timestamp,
    updated_at: Timestamp,
}

impl Product {
    /// Creates an active product.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` for a blank name or SKU.
    pub fn new(tenant_id: TenantId, event_id: EventId, details: ProductDetails) -> DomainResult<Self> {
        let name = details.name.trim().to_string();
        let sku = details.sku.trim().to_uppercase();
        if name.is_empty() {
            return Err(DomainError::validation("product name is required"));
        }
        if sku.is_empty() {
            return Err(DomainError::validation("product sku is required"));
        }
        let now = Timestamp::now();
        Ok(Self {
            id: ProductId::new_v4(),
            tenant_id,
            event_id,
            name,
            sku,
            category: details.category.map(|c| c.trim().to_uppercase()),
            unit_price: details.unit_price,
            stock: details.stock,
            low_stock_threshold: details.low_stock_threshold,
            active: true,
            version: 1,
            created_at: now,
            updated_at: now,
        })
    }

    fn touch(&mut self) {
        self.updated_at = Timestamp::now();
        self.version = self.version.saturating_add(1);
    }

    /// Returns the product ID.
    #[inline]
    #[must_use]
    pub fn id(&self) -> ProductId {
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

    /// Returns the name.
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the SKU.
    #[inline]
    #[must_use]
    pub fn sku(&self) -> &str {
        &self.sku
    }

    /// Returns the category.
    #[inline]
    #[must_use]
    pub fn category(&self) -> Option<&str> {
        self.category.as_deref()
    }

    /// Returns the unit price.
    #[inline]
    #[must_use]
    pub fn unit_price(&self) -> Money {
        self.unit_price
    }

    /// Returns the units on hand.
    #[inline]
    #[must_use]
    pub fn stock(&self) -> u32 {
        self.stock
    }

    /// Returns the low-stock threshold.
    #[inline]
    #[must_use]
    pub fn low_stock_threshold(&self) -> u32 {
        self.low_stock_threshold
    }

    /// Returns true if the product can be sold.
    #[inline]
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Returns the optimistic-lock version.
    #[inline]
    #[must_use]
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Returns the last update time.
    #[inline]
    #[must_use]
    pub fn updated_at(&self) -> Timestamp {
        self.updated_at
    }

    /// Returns true if the stock is at or below the threshold.
    #[must_use]
    pub fn is_low_stock(&self) -> bool {
        self.active && self.stock <= self.low_stock_threshold
    }

    /// Checks that `quantity` units could be reserved, without reserving.
    ///
    /// # Errors
    ///
    /// - `DomainError::Validation` for a zero quantity
    /// - `DomainError::NotAllowed` if the product is inactive
    /// - `DomainError::InsufficientStock` if not enough units are on hand
    pub fn ensure_available(&self, quantity: u32) -> DomainResult<()> {
        if quantity == 0 {
            return Err(DomainError::validation("quantity must be positive"));
        }
        if !self.active {
            return Err(DomainError::not_allowed(format!(
                "product {} is not active",
                self.sku
            )));
        }
        if quantity > self.stock {
            return Err(DomainError::InsufficientStock {
                product: self.name.clone(),
                requested: quantity,
                available: self.stock,
            });
        }
        Ok(())
    }

    /// Takes `quantity` units out of stock.
    ///
    /// # Errors
    ///
    /// Same as [`ensure_available`](Self::ensure_available).
    pub fn reserve(&mut self, quantity: u32) -> DomainResult<()> {
        self.ensure_available(quantity)?;
        self.stock -= quantity;
        self.touch();
        Ok(())
    }

    /// Puts `quantity` units back.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Arithmetic` on overflow.
    pub fn restock(&mut self, quantity: u32) -> DomainResult<()> {
        self.stock = self
            .stock
            .checked_add(quantity)
            .ok_or(ArithmeticError::Overflow)?;
        self.touch();
        Ok(())
    }

    /// Applies a signed stock correction (inventory count, breakage).
    ///
    /// # Errors
    ///
    /// - `DomainError::InsufficientStock` if the result would be negative
    /// - `DomainError::Arithmetic` on overflow
    pub fn adjust_stock(&mut self, delta: i64) -> DomainResult<()> {
        let next = i64::from(self.stock)
            .checked_add(delta)
            .ok_or(ArithmeticError::Overflow)?;
        if next < 0 {
            return Err(DomainError::InsufficientStock {
                product: self.name.clone(),
                requested: u32::try_from(delta.unsigned_abs()).unwrap_or(u32::MAX),
                available: self.stock,
            });
        }
        self.stock = u32::try_from(next)
            .map_err(|_| ArithmeticError::Overflow)?;
        self.touch();
        Ok(())
    }

    /// Applies a partial update.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` for a blank name.
    pub fn apply(&mut self, update: ProductUpdate) -> DomainResult<()> {
        if let Some(name) = update.name {
            let name = name.trim().to_string();
            if name.is_empty() {
                return Err(DomainError::validation("product name is required"));
            }
            self.name = name;
        }
        if let Some(category) = update.category {
            self.category = Some(category.trim().to_uppercase());
        }
        if let Some(price) = update.unit_price {
            self.unit_price = price;
        }
        if let Some(threshold) = update.low_stock_threshold {
            self.low_stock_threshold = threshold;
        }
        if let Some(active) = update.active {
            self.active = active;
        }
        self.touch();
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn product(stock: u32) -> Product {
        Product::new(
            TenantId::new_v4(),
            EventId::new_v4(),
            ProductDetails {
                name: "Água 500ml".into(),
                sku: "agua-500".into(),
                category: Some("bebidas".into()),
                unit_price: Money::from_cents(500),
                stock,
                low_stock_threshold: 3,
            },
        )
        .unwrap()
    }

    #[test]
    fn reserve_decrements_stock() {
        let mut p = product(10);
        p.reserve(4).unwrap();
        assert_eq!(p.stock(), 6);
        assert_eq!(p.sku(), "AGUA-500");
    }

    #[test]
    fn reserve_more_than_stock_fails() {
        let mut p = product(2);
        let err = p.reserve(3).unwrap_err();
        assert!(matches!(
            err,
            DomainError::InsufficientStock {
                requested: 3,
                available: 2,
                ..
            }
        ));
        assert_eq!(p.stock(), 2);
    }

    #[test]
    fn inactive_product_cannot_be_sold() {
        let mut p = product(10);
        p.apply(ProductUpdate {
            active: Some(false),
            ..ProductUpdate::default()
        })
        .unwrap();
        assert!(matches!(p.reserve(1), Err(DomainError::NotAllowed(_))));
    }

    #[test]
    fn adjust_stock_cannot_go_negative() {
        let mut p = product(2);
        assert!(p.adjust_stock(-3).is_err());
        p.adjust_stock(-2).unwrap();
        assert_eq!(p.stock(), 0);
        p.adjust_stock(5).unwrap();
        assert_eq!(p.stock(), 5);
    }

    #[test]
    fn low_stock_threshold() {
        let mut p = product(4);
        assert!(!p.is_low_stock());
        p.reserve(1).unwrap();
        assert!(p.is_low_stock());
    }
}
