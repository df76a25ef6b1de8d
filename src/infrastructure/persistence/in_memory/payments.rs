//! # In-Memory Payment Repositories
//!
//! Transactions and refunds with optimistic version checks.
//!
//! A write is accepted only when the incoming aggregate carries a higher
//! version than the stored copy. Two writers that loaded the same version
//! and each applied one change produce the same version number, so the
//! second one is refused.

use crate::domain::entities::{Refund, Transaction};
use crate::domain::value_objects::{RefundId, RefundState, TenantId, Timestamp, TransactionId};
use crate::infrastructure::persistence::traits::{
    Page, RefundRepository, RepositoryError, RepositoryResult, TransactionFilter,
    TransactionRepository,
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

fn check_version(
    entity_type: &'static str,
    id: impl ToString,
    stored: Option<u64>,
    incoming: u64,
) -> RepositoryResult<()> {
    match stored {
        Some(current) if current >= incoming => Err(RepositoryError::version_conflict(
            entity_type,
            id.to_string(),
            incoming.saturating_sub(1),
            current,
        )),
        _ => Ok(()),
    }
}

/// In-memory implementation of [`TransactionRepository`].
#[derive(Debug, Clone, Default)]
pub struct InMemoryTransactionRepository {
    storage: Arc<RwLock<HashMap<TransactionId, Transaction>>>,
}

impl InMemoryTransactionRepository {
    /// Creates a new empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TransactionRepository for InMemoryTransactionRepository {
    async fn save(&self, tx: &Transaction) -> RepositoryResult<()> {
        let mut storage = self.storage.write().await;
        check_version(
            "Transaction",
            tx.id(),
            storage.get(&tx.id()).map(Transaction::version),
            tx.version(),
        )?;
        storage.insert(tx.id(), tx.clone());
        Ok(())
    }

    async fn get(
        &self,
        tenant: TenantId,
        id: TransactionId,
    ) -> RepositoryResult<Option<Transaction>> {
        let storage = self.storage.read().await;
        Ok(storage
            .get(&id)
            .filter(|t| t.tenant_id() == tenant)
            .cloned())
    }

    async fn find_by_gateway_reference(
        &self,
        reference: &str,
    ) -> RepositoryResult<Option<Transaction>> {
        let storage = self.storage.read().await;
        Ok(storage
            .values()
            .find(|t| t.gateway_reference() == Some(reference))
            .cloned())
    }

    async fn list(
        &self,
        tenant: TenantId,
        filter: TransactionFilter,
        page: Page,
    ) -> RepositoryResult<Vec<Transaction>> {
        let storage = self.storage.read().await;
        let mut found: Vec<Transaction> = storage
            .values()
            .filter(|t| t.tenant_id() == tenant)
            .filter(|t| filter.event_id.is_none_or(|e| t.event_id() == e))
            .filter(|t| filter.status.is_none_or(|s| t.status() == s))
            .cloned()
            .collect();
        found.sort_by(|a, b| b.created_at().cmp(&a.created_at()));
        Ok(page.slice(found))
    }

    async fn list_by_payer(
        &self,
        tenant: TenantId,
        email: &str,
    ) -> RepositoryResult<Vec<Transaction>> {
        let storage = self.storage.read().await;
        Ok(storage
            .values()
            .filter(|t| t.tenant_id() == tenant && t.payer().email.eq_ignore_ascii_case(email))
            .cloned()
            .collect())
    }

    async fn count_by_payer_since(
        &self,
        tenant: TenantId,
        email: &str,
        since: Timestamp,
    ) -> RepositoryResult<u32> {
        let storage = self.storage.read().await;
        let count = storage
            .values()
            .filter(|t| {
                t.tenant_id() == tenant
                    && t.payer().email.eq_ignore_ascii_case(email)
                    && t.created_at().is_after(&since)
            })
            .count();
        Ok(u32::try_from(count).unwrap_or(u32::MAX))
    }
}

/// In-memory implementation of [`RefundRepository`].
#[derive(Debug, Clone, Default)]
pub struct InMemoryRefundRepository {
    storage: Arc<RwLock<HashMap<RefundId, Refund>>>,
}

impl InMemoryRefundRepository {
    /// Creates a new empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RefundRepository for InMemoryRefundRepository {
    async fn save(&self, refund: &Refund) -> RepositoryResult<()> {
        let mut storage = self.storage.write().await;
        check_version(
            "Refund",
            refund.id(),
            storage.get(&refund.id()).map(Refund::version),
            refund.version(),
        )?;
        storage.insert(refund.id(), refund.clone());
        Ok(())
    }

    async fn get(&self, tenant: TenantId, id: RefundId) -> RepositoryResult<Option<Refund>> {
        let storage = self.storage.read().await;
        Ok(storage
            .get(&id)
            .filter(|r| r.tenant_id() == tenant)
            .cloned())
    }

    async fn list_by_transaction(
        &self,
        tenant: TenantId,
        transaction_id: TransactionId,
    ) -> RepositoryResult<Vec<Refund>> {
        let storage = self.storage.read().await;
        let mut found: Vec<Refund> = storage
            .values()
            .filter(|r| r.tenant_id() == tenant && r.transaction_id() == transaction_id)
            .cloned()
            .collect();
        found.sort_by_key(Refund::created_at);
        Ok(found)
    }

    async fn list(
        &self,
        tenant: TenantId,
        state: Option<RefundState>,
        page: Page,
    ) -> RepositoryResult<Vec<Refund>> {
        let storage = self.storage.read().await;
        let mut found: Vec<Refund> = storage
            .values()
            .filter(|r| r.tenant_id() == tenant)
            .filter(|r| state.is_none_or(|s| r.state() == s))
            .cloned()
            .collect();
        found.sort_by(|a, b| b.created_at().cmp(&a.created_at()));
        Ok(page.slice(found))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::domain::entities::transaction::tests::paid;
    use crate::domain::value_objects::{Money, UserId};

    mod transactions {
        use super::*;

        #[tokio::test]
        async fn stale_write_is_refused() {
            let repo = InMemoryTransactionRepository::new();
            let tx = paid(10_000);
            repo.save(&tx).await.unwrap();

            let mut a = repo.get(tx.tenant_id(), tx.id()).await.unwrap().unwrap();
            let mut b = a.clone();
            a.apply_refund(Money::from_cents(1_000)).unwrap();
            b.apply_refund(Money::from_cents(2_000)).unwrap();

            repo.save(&a).await.unwrap();
            let err = repo.save(&b).await.unwrap_err();
            assert!(err.is_version_conflict());

            let stored = repo.get(tx.tenant_id(), tx.id()).await.unwrap().unwrap();
            assert_eq!(stored.refunded_amount(), Money::from_cents(1_000));
        }

        #[tokio::test]
        async fn payer_velocity() {
            let repo = InMemoryTransactionRepository::new();
            let tx = paid(10_000);
            repo.save(&tx).await.unwrap();
            let since = Timestamp::now().add_hours(-1);
            let email = tx.payer().email.to_uppercase();
            assert_eq!(
                repo.count_by_payer_since(tx.tenant_id(), &email, since)
                    .await
                    .unwrap(),
                1
            );
            assert_eq!(
                repo.count_by_payer_since(TenantId::new_v4(), &email, since)
                    .await
                    .unwrap(),
                0
            );
        }
    }

    mod refunds {
        use super::*;

        #[tokio::test]
        async fn listed_per_transaction_and_state() {
            let repo = InMemoryRefundRepository::new();
            let tx = paid(10_000);
            let refund = Refund::request(
                tx.tenant_id(),
                tx.id(),
                Money::from_cents(500),
                "duplicate purchase",
                UserId::new_v4(),
            )
            .unwrap();
            repo.save(&refund).await.unwrap();

            assert_eq!(
                repo.list_by_transaction(tx.tenant_id(), tx.id())
                    .await
                    .unwrap()
                    .len(),
                1
            );
            assert!(
                repo.list(tx.tenant_id(), Some(RefundState::Completed), Page::default())
                    .await
                    .unwrap()
                    .is_empty()
            );
        }
    }
}
