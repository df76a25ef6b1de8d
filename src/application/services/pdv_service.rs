//! # PDV Service
//!
//! Point-of-sale products, inventory and sales.
//!
//! A sale is all-or-nothing: every line is checked against stock before any
//! unit is reserved, and the sale is built (discount validated) before the
//! products are written back. Stock mutations are serialized per process.

use crate::application::error::{ApplicationError, ApplicationResult};
use crate::application::services::audit::AuditLog;
use crate::application::services::treasury_service::TreasuryService;
use crate::domain::entities::{Product, ProductDetails, ProductUpdate, Sale, SaleItem};
use crate::domain::events::{SaleCancelled, SaleCompleted};
use crate::domain::value_objects::{
    EventId, Money, PaymentMethod, ProductId, SaleId, TenantId, UserId,
};
use crate::infrastructure::persistence::{EventRepository, ProductRepository, SaleRepository};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, instrument, warn};

/// One requested line of a sale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct SaleLine {
    /// Product sold.
    pub product_id: ProductId,
    /// Units sold.
    pub quantity: u32,
}

/// Sale request as entered at the register.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct SaleRequest {
    /// Lines; repeated products are merged.
    pub items: Vec<SaleLine>,
    /// Discount over the subtotal.
    #[serde(default)]
    pub discount: Money,
    /// How the customer paid.
    pub payment_method: PaymentMethod,
}

/// PDV use cases.
#[derive(Debug)]
pub struct PdvService {
    events: Arc<dyn EventRepository>,
    products: Arc<dyn ProductRepository>,
    sales: Arc<dyn SaleRepository>,
    treasury: Arc<TreasuryService>,
    audit: AuditLog,
    stock_lock: Mutex<()>,
}

impl PdvService {
    /// Creates a new PDV service.
    #[must_use]
    pub fn new(
        events: Arc<dyn EventRepository>,
        products: Arc<dyn ProductRepository>,
        sales: Arc<dyn SaleRepository>,
        treasury: Arc<TreasuryService>,
        audit: AuditLog,
    ) -> Self {
        Self {
            events,
            products,
            sales,
            treasury,
            audit,
            stock_lock: Mutex::new(()),
        }
    }

    async fn open_event(&self, tenant: TenantId, event_id: EventId) -> ApplicationResult<()> {
        let event = self
            .events
            .get(tenant, event_id)
            .await?
            .ok_or_else(|| ApplicationError::not_found("Event", event_id))?;
        if event.status().is_terminal() {
            return Err(ApplicationError::conflict(format!(
                "event {event_id} is {}",
                event.status()
            )));
        }
        Ok(())
    }

    // ========== Products ==========

    /// Adds a product to an event's catalog.
    ///
    /// # Errors
    ///
    /// - `ApplicationError::NotFound` for an unknown event
    /// - `ApplicationError::Conflict` for a closed event or a duplicate SKU
    #[instrument(skip(self, details), fields(sku = %details.sku))]
    pub async fn create_product(
        &self,
        tenant: TenantId,
        event_id: EventId,
        details: ProductDetails,
    ) -> ApplicationResult<Product> {
        self.open_event(tenant, event_id).await?;
        let product = Product::new(tenant, event_id, details)?;
        if self
            .products
            .find_by_sku(tenant, event_id, product.sku())
            .await?
            .is_some()
        {
            return Err(ApplicationError::conflict(format!(
                "sku {} already exists for this event",
                product.sku()
            )));
        }
        self.products.save(&product).await?;
        Ok(product)
    }

    /// Loads a product of the tenant.
    ///
    /// # Errors
    ///
    /// Returns `ApplicationError::NotFound` if it does not exist for the tenant.
    pub async fn get_product(&self, tenant: TenantId, id: ProductId) -> ApplicationResult<Product> {
        self.products
            .get(tenant, id)
            .await?
            .ok_or_else(|| ApplicationError::not_found("Product", id))
    }

    /// Lists an event's products by name.
    ///
    /// # Errors
    ///
    /// Returns an error if the repository fails.
    pub async fn list_products(
        &self,
        tenant: TenantId,
        event_id: EventId,
    ) -> ApplicationResult<Vec<Product>> {
        Ok(self.products.list_by_event(tenant, event_id).await?)
    }

    /// Active products at or below their low-stock threshold.
    ///
    /// # Errors
    ///
    /// Returns an error if the repository fails.
    pub async fn low_stock(&self, tenant: TenantId, event_id: EventId) -> ApplicationResult<Vec<Product>> {
        let mut products = self.list_products(tenant, event_id).await?;
        products.retain(Product::is_low_stock);
        products.sort_by_key(Product::stock);
        Ok(products)
    }

    /// Applies a partial update.
    ///
    /// # Errors
    ///
    /// Returns `ApplicationError::Domain` for a blank name.
    pub async fn update_product(
        &self,
        tenant: TenantId,
        id: ProductId,
        update: ProductUpdate,
    ) -> ApplicationResult<Product> {
        let mut product = self.get_product(tenant, id).await?;
        product.apply(update)?;
        self.products.save(&product).await?;
        Ok(product)
    }

    /// Applies a signed stock correction.
    ///
    /// # Errors
    ///
    /// Returns `ApplicationError::Domain` if the stock would go negative.
    #[instrument(skip(self))]
    pub async fn adjust_stock(
        &self,
        tenant: TenantId,
        id: ProductId,
        delta: i64,
    ) -> ApplicationResult<Product> {
        let _guard = self.stock_lock.lock().await;
        let mut product = self.get_product(tenant, id).await?;
        product.adjust_stock(delta)?;
        self.products.save(&product).await?;
        Ok(product)
    }

    // ========== Sales ==========

    /// Records a sale, reserving stock and posting revenue.
    ///
    /// # Errors
    ///
    /// - `ApplicationError::Validation` for an empty sale or a product from another event
    /// - `ApplicationError::NotFound` for an unknown product
    /// - `ApplicationError::Domain` for insufficient stock or an excessive discount
    #[instrument(skip(self, request), fields(lines = request.items.len()))]
    pub async fn create_sale(
        &self,
        tenant: TenantId,
        event_id: EventId,
        operator: UserId,
        request: SaleRequest,
    ) -> ApplicationResult<Sale> {
        if request.items.is_empty() {
            return Err(ApplicationError::validation("a sale needs at least one item"));
        }
        self.open_event(tenant, event_id).await?;

        let mut quantities: BTreeMap<ProductId, u32> = BTreeMap::new();
        for line in &request.items {
            if line.quantity == 0 {
                return Err(ApplicationError::validation("item quantity must be positive"));
            }
            let slot = quantities.entry(line.product_id).or_default();
            *slot = slot.checked_add(line.quantity).ok_or_else(|| {
                ApplicationError::validation("item quantity is too large")
            })?;
        }
        let units = quantities
            .values()
            .try_fold(0u32, |total, quantity| total.checked_add(*quantity))
            .ok_or_else(|| ApplicationError::validation("sale has too many units"))?;

        let _guard = self.stock_lock.lock().await;

        let mut products = Vec::with_capacity(quantities.len());
        for (product_id, quantity) in &quantities {
            let product = self.get_product(tenant, *product_id).await?;
            if product.event_id() != event_id {
                return Err(ApplicationError::validation(format!(
                    "product {product_id} does not belong to event {event_id}"
                )));
            }
            product.ensure_available(*quantity)?;
            products.push((product, *quantity));
        }

        let items = products
            .iter()
            .map(|(p, qty)| SaleItem::new(p.id(), p.name(), p.unit_price(), *qty))
            .collect::<Result<Vec<_>, _>>()?;
        let sale = Sale::new(
            tenant,
            event_id,
            items,
            request.discount,
            request.payment_method,
            operator,
        )?;

        for (product, quantity) in &mut products {
            product.reserve(*quantity)?;
            self.products.save(product).await?;
            if product.is_low_stock() {
                warn!(product_id = %product.id(), stock = product.stock(), "product low on stock");
            }
        }
        self.sales.save(&sale).await?;
        drop(_guard);

        self.treasury.record_sale(&sale).await?;
        self.audit
            .record(&SaleCompleted::new(
                tenant,
                sale.id(),
                event_id,
                sale.total(),
                sale.payment_method(),
                units,
            ))
            .await;
        info!(sale_id = %sale.id(), total = %sale.total(), "sale completed");
        Ok(sale)
    }

    /// Voids a sale, returning its units to stock and reversing revenue.
    ///
    /// # Errors
    ///
    /// Returns `ApplicationError::Domain` if the sale is already cancelled.
    #[instrument(skip(self))]
    pub async fn cancel_sale(&self, tenant: TenantId, id: SaleId) -> ApplicationResult<Sale> {
        let _guard = self.stock_lock.lock().await;
        let mut sale = self.get_sale(tenant, id).await?;
        sale.cancel()?;
        for item in sale.items() {
            match self.products.get(tenant, item.product_id()).await? {
                Some(mut product) => {
                    product.restock(item.quantity())?;
                    self.products.save(&product).await?;
                }
                None => warn!(product_id = %item.product_id(), "product of cancelled sale is gone"),
            }
        }
        self.sales.save(&sale).await?;
        drop(_guard);

        self.treasury.record_sale_reversal(&sale).await?;
        self.audit
            .record(&SaleCancelled::new(tenant, id, sale.total()))
            .await;
        info!(sale_id = %id, "sale cancelled");
        Ok(sale)
    }

    /// Loads a sale of the tenant.
    ///
    /// # Errors
    ///
    /// Returns `ApplicationError::NotFound` if it does not exist for the tenant.
    pub async fn get_sale(&self, tenant: TenantId, id: SaleId) -> ApplicationResult<Sale> {
        self.sales
            .get(tenant, id)
            .await?
            .ok_or_else(|| ApplicationError::not_found("Sale", id))
    }

    /// Lists an event's sales, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the repository fails.
    pub async fn list_sales(&self, tenant: TenantId, event_id: EventId) -> ApplicationResult<Vec<Sale>> {
        Ok(self.sales.list_by_event(tenant, event_id).await?)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::application::services::treasury_service::TreasuryConfig;
    use crate::domain::entities::{Event, EventDetails};
    use crate::domain::value_objects::{SaleStatus, Timestamp};
    use crate::infrastructure::persistence::in_memory::{
        InMemoryEventRepository, InMemoryEventStore, InMemoryLedgerRepository,
        InMemoryProductRepository, InMemorySaleRepository,
    };
    use rust_decimal::Decimal;

    struct Fixture {
        pdv: PdvService,
        treasury: Arc<TreasuryService>,
        tenant: TenantId,
        event: EventId,
    }

    async fn fixture() -> Fixture {
        let events = Arc::new(InMemoryEventRepository::new());
        let tenant = TenantId::new_v4();
        let starts_at = Timestamp::now().add_days(1);
        let mut event = Event::new(
            tenant,
            EventDetails {
                name: "Feira".into(),
                description: None,
                venue: "Pavilhão".into(),
                starts_at,
                ends_at: starts_at.add_hours(4),
                capacity: None,
            },
        )
        .unwrap();
        event.publish().unwrap();
        events.save(&event).await.unwrap();

        let treasury = Arc::new(TreasuryService::new(
            Arc::new(InMemoryLedgerRepository::new()),
            TreasuryConfig::default(),
        ));
        let pdv = PdvService::new(
            events,
            Arc::new(InMemoryProductRepository::new()),
            Arc::new(InMemorySaleRepository::new()),
            Arc::clone(&treasury),
            AuditLog::new(Arc::new(InMemoryEventStore::new())),
        );
        Fixture {
            pdv,
            treasury,
            tenant,
            event: event.id(),
        }
    }

    fn product(sku: &str, cents: i64, stock: u32) -> ProductDetails {
        ProductDetails {
            name: format!("Produto {sku}"),
            sku: sku.into(),
            category: Some("bebidas".into()),
            unit_price: Money::from_cents(cents),
            stock,
            low_stock_threshold: 2,
        }
    }

    fn line(product: &Product, quantity: u32) -> SaleLine {
        SaleLine {
            product_id: product.id(),
            quantity,
        }
    }

    #[tokio::test]
    async fn sale_total_is_lines_minus_discount() {
        let f = fixture().await;
        let water = f.pdv.create_product(f.tenant, f.event, product("AGUA", 500, 10)).await.unwrap();
        let beer = f.pdv.create_product(f.tenant, f.event, product("CERVEJA", 1_200, 10)).await.unwrap();

        let sale = f
            .pdv
            .create_sale(
                f.tenant,
                f.event,
                UserId::new_v4(),
                SaleRequest {
                    items: vec![line(&water, 2), line(&beer, 1), line(&water, 1)],
                    discount: Money::from_cents(300),
                    payment_method: PaymentMethod::Cash,
                },
            )
            .await
            .unwrap();

        assert_eq!(sale.subtotal(), Money::from_cents(2_700));
        assert_eq!(sale.total(), Money::from_cents(2_400));
        assert_eq!(sale.items().len(), 2);
        assert_eq!(f.pdv.get_product(f.tenant, water.id()).await.unwrap().stock(), 7);
        assert_eq!(
            f.treasury.balance(f.tenant).await.unwrap().available,
            Decimal::new(2_400, 2)
        );
    }

    #[tokio::test]
    async fn unit_count_overflow_is_refused() {
        let f = fixture().await;
        let bala = f.pdv.create_product(f.tenant, f.event, product("BALA", 1, u32::MAX)).await.unwrap();
        let chiclete = f.pdv.create_product(f.tenant, f.event, product("CHICLETE", 1, u32::MAX)).await.unwrap();

        let err = f
            .pdv
            .create_sale(
                f.tenant,
                f.event,
                UserId::new_v4(),
                SaleRequest {
                    items: vec![line(&bala, u32::MAX), line(&chiclete, 1)],
                    discount: Money::ZERO,
                    payment_method: PaymentMethod::Cash,
                },
            )
            .await
            .unwrap_err();
        assert!(err.is_validation());
        assert_eq!(f.pdv.get_product(f.tenant, bala.id()).await.unwrap().stock(), u32::MAX);
        assert!(f.pdv.list_sales(f.tenant, f.event).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn insufficient_stock_reserves_nothing() {
        let f = fixture().await;
        let water = f.pdv.create_product(f.tenant, f.event, product("AGUA", 500, 10)).await.unwrap();
        let beer = f.pdv.create_product(f.tenant, f.event, product("CERVEJA", 1_200, 1)).await.unwrap();

        let err = f
            .pdv
            .create_sale(
                f.tenant,
                f.event,
                UserId::new_v4(),
                SaleRequest {
                    items: vec![line(&water, 3), line(&beer, 2)],
                    discount: Money::ZERO,
                    payment_method: PaymentMethod::Pix,
                },
            )
            .await
            .unwrap_err();
        assert!(err.is_conflict());
        assert_eq!(f.pdv.get_product(f.tenant, water.id()).await.unwrap().stock(), 10);
        assert!(f.pdv.list_sales(f.tenant, f.event).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn excessive_discount_reserves_nothing() {
        let f = fixture().await;
        let water = f.pdv.create_product(f.tenant, f.event, product("AGUA", 500, 10)).await.unwrap();
        let result = f
            .pdv
            .create_sale(
                f.tenant,
                f.event,
                UserId::new_v4(),
                SaleRequest {
                    items: vec![line(&water, 1)],
                    discount: Money::from_cents(501),
                    payment_method: PaymentMethod::Cash,
                },
            )
            .await;
        assert!(result.is_err());
        assert_eq!(f.pdv.get_product(f.tenant, water.id()).await.unwrap().stock(), 10);
    }

    #[tokio::test]
    async fn cancel_restocks_and_reverses() {
        let f = fixture().await;
        let water = f.pdv.create_product(f.tenant, f.event, product("AGUA", 500, 5)).await.unwrap();
        let sale = f
            .pdv
            .create_sale(
                f.tenant,
                f.event,
                UserId::new_v4(),
                SaleRequest {
                    items: vec![line(&water, 4)],
                    discount: Money::ZERO,
                    payment_method: PaymentMethod::Cash,
                },
            )
            .await
            .unwrap();
        assert_eq!(f.pdv.low_stock(f.tenant, f.event).await.unwrap().len(), 1);

        let cancelled = f.pdv.cancel_sale(f.tenant, sale.id()).await.unwrap();
        assert_eq!(cancelled.status(), SaleStatus::Cancelled);
        assert_eq!(f.pdv.get_product(f.tenant, water.id()).await.unwrap().stock(), 5);
        assert_eq!(f.treasury.balance(f.tenant).await.unwrap().available, Decimal::ZERO);
        assert!(f.pdv.cancel_sale(f.tenant, sale.id()).await.unwrap_err().is_conflict());
    }

    #[tokio::test]
    async fn duplicate_sku_conflicts() {
        let f = fixture().await;
        f.pdv.create_product(f.tenant, f.event, product("agua", 500, 1)).await.unwrap();
        let err = f
            .pdv
            .create_product(f.tenant, f.event, product("AGUA", 600, 1))
            .await
            .unwrap_err();
        assert!(err.is_conflict());
    }

    #[tokio::test]
    async fn stock_adjustments_cannot_go_negative() {
        let f = fixture().await;
        let water = f.pdv.create_product(f.tenant, f.event, product("AGUA", 500, 3)).await.unwrap();
        assert_eq!(f.pdv.adjust_stock(f.tenant, water.id(), 7).await.unwrap().stock(), 10);
        assert!(f.pdv.adjust_stock(f.tenant, water.id(), -11).await.unwrap_err().is_conflict());
    }
}
