//! # In-Memory PDV Repositories
//!
//! Products and sales for tests and single-node development.

use crate::domain::entities::{Product, Sale};
use crate::domain::value_objects::{EventId, ProductId, SaleId, TenantId};
use crate::infrastructure::persistence::traits::{
    ProductRepository, RepositoryResult, SaleRepository,
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// In-memory implementation of [`ProductRepository`].
#[derive(Debug, Clone, Default)]
pub struct InMemoryProductRepository {
    storage: Arc<RwLock<HashMap<ProductId, Product>>>,
}

impl InMemoryProductRepository {
    /// Creates a new empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProductRepository for InMemoryProductRepository {
    async fn save(&self, product: &Product) -> RepositoryResult<()> {
        let mut storage = self.storage.write().await;
        storage.insert(product.id(), product.clone());
        Ok(())
    }

    async fn get(&self, tenant: TenantId, id: ProductId) -> RepositoryResult<Option<Product>> {
        let storage = self.storage.read().await;
        Ok(storage
            .get(&id)
            .filter(|p| p.tenant_id() == tenant)
            .cloned())
    }

    async fn find_by_sku(
        &self,
        tenant: TenantId,
        event_id: EventId,
        sku: &str,
    ) -> RepositoryResult<Option<Product>> {
        let sku = sku.trim().to_uppercase();
        let storage = self.storage.read().await;
        Ok(storage
            .values()
            .find(|p| p.tenant_id() == tenant && p.event_id() == event_id && p.sku() == sku)
            .cloned())
    }

    async fn list_by_event(
        &self,
        tenant: TenantId,
        event_id: EventId,
    ) -> RepositoryResult<Vec<Product>> {
        let storage = self.storage.read().await;
        let mut products: Vec<Product> = storage
            .values()
            .filter(|p| p.tenant_id() == tenant && p.event_id() == event_id)
            .cloned()
            .collect();
        products.sort_by(|a, b| a.name().cmp(b.name()));
        Ok(products)
    }
}

/// In-memory implementation of [`SaleRepository`].
#[derive(Debug, Clone, Default)]
pub struct InMemorySaleRepository {
    storage: Arc<RwLock<HashMap<SaleId, Sale>>>,
}

impl InMemorySaleRepository {
    /// Creates a new empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SaleRepository for InMemorySaleRepository {
    async fn save(&self, sale: &Sale) -> RepositoryResult<()> {
        let mut storage = self.storage.write().await;
        storage.insert(sale.id(), sale.clone());
        Ok(())
    }

    async fn get(&self, tenant: TenantId, id: SaleId) -> RepositoryResult<Option<Sale>> {
        let storage = self.storage.read().await;
        Ok(storage
            .get(&id)
            .filter(|s| s.tenant_id() == tenant)
            .cloned())
    }

    async fn list_by_event(
        &self,
        tenant: TenantId,
        event_id: EventId,
    ) -> RepositoryResult<Vec<Sale>> {
        let storage = self.storage.read().await;
        let mut sales: Vec<Sale> = storage
            .values()
            .filter(|s| s.tenant_id() == tenant && s.event_id() == event_id)
            .cloned()
            .collect();
        sales.sort_by(|a, b| b.created_at().cmp(&a.created_at()));
        Ok(sales)
    }
}
