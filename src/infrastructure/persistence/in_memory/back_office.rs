//! # In-Memory Back-Office Repositories
//!
//! Notifications and the treasury ledger.

use crate::domain::entities::{LedgerEntry, Notification};
use crate::domain::value_objects::{NotificationId, NotificationStatus, TenantId, Timestamp};
use crate::infrastructure::persistence::traits::{
    LedgerRepository, NotificationRepository, Page, RepositoryResult,
};
use async_trait::async_trait;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;

/// In-memory implementation of [`NotificationRepository`].
#[derive(Debug, Clone, Default)]
pub struct InMemoryNotificationRepository {
    storage: Arc<RwLock<HashMap<NotificationId, Notification>>>,
}

impl InMemoryNotificationRepository {
    /// Creates a new empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl NotificationRepository for InMemoryNotificationRepository {
    async fn save(&self, notification: &Notification) -> RepositoryResult<()> {
        let mut storage = self.storage.write().await;
        storage.insert(notification.id(), notification.clone());
        Ok(())
    }

    async fn get(
        &self,
        tenant: TenantId,
        id: NotificationId,
    ) -> RepositoryResult<Option<Notification>> {
        let storage = self.storage.read().await;
        Ok(storage
            .get(&id)
            .filter(|n| n.tenant_id() == tenant)
            .cloned())
    }

    async fn list(
        &self,
        tenant: TenantId,
        status: Option<NotificationStatus>,
        page: Page,
    ) -> RepositoryResult<Vec<Notification>> {
        let storage = self.storage.read().await;
        let mut found: Vec<Notification> = storage
            .values()
            .filter(|n| n.tenant_id() == tenant)
            .filter(|n| status.is_none_or(|s| n.status() == s))
            .cloned()
            .collect();
        found.sort_by(|a, b| b.created_at().cmp(&a.created_at()));
        Ok(page.slice(found))
    }
}

/// In-memory implementation of [`LedgerRepository`].
///
/// Entries are kept in insertion order, which is also creation order.
#[derive(Debug, Clone, Default)]
pub struct InMemoryLedgerRepository {
    entries: Arc<RwLock<Vec<LedgerEntry>>>,
}

impl InMemoryLedgerRepository {
    /// Creates a new empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LedgerRepository for InMemoryLedgerRepository {
    async fn append(&self, entry: &LedgerEntry) -> RepositoryResult<()> {
        self.entries.write().await.push(entry.clone());
        Ok(())
    }

    async fn list(
        &self,
        tenant: TenantId,
        from: Option<Timestamp>,
        to: Option<Timestamp>,
    ) -> RepositoryResult<Vec<LedgerEntry>> {
        let entries = self.entries.read().await;
        Ok(entries
            .iter()
            .filter(|e| e.tenant_id() == tenant)
            .filter(|e| from.is_none_or(|f| !e.created_at().is_before(&f)))
            .filter(|e| to.is_none_or(|t| !e.created_at().is_after(&t)))
            .cloned()
            .collect())
    }

    async fn tenants(&self) -> RepositoryResult<Vec<TenantId>> {
        let entries = self.entries.read().await;
        let tenants: BTreeSet<TenantId> = entries.iter().map(LedgerEntry::tenant_id).collect();
        Ok(tenants.into_iter().collect())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::domain::entities::{LedgerDirection, LedgerEntryKind};
    use crate::domain::value_objects::{Money, NotificationChannel};

    #[tokio::test]
    async fn notifications_filter_by_status() {
        let repo = InMemoryNotificationRepository::new();
        let tenant = TenantId::new_v4();
        let mut sent = Notification::new(
            tenant,
            NotificationChannel::Sms,
            "+5511999990000",
            None,
            "Seu ingresso",
        )
        .unwrap();
        sent.mark_sent().unwrap();
        let pending =
            Notification::new(tenant, NotificationChannel::Push, "device-1", None, "Oi").unwrap();
        repo.save(&sent).await.unwrap();
        repo.save(&pending).await.unwrap();

        let found = repo
            .list(tenant, Some(NotificationStatus::Sent), Page::default())
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found.first().unwrap().id(), sent.id());
    }

    #[tokio::test]
    async fn ledger_window_and_tenants() {
        let repo = InMemoryLedgerRepository::new();
        let tenant = TenantId::new_v4();
        let entry = LedgerEntry::new(
            tenant,
            None,
            LedgerEntryKind::Adjustment,
            LedgerDirection::Credit,
            Money::from_cents(100),
            None,
            "opening balance",
            Timestamp::now(),
        );
        repo.append(&entry).await.unwrap();

        assert_eq!(repo.list(tenant, None, None).await.unwrap().len(), 1);
        let later = Timestamp::now().add_hours(1);
        assert!(repo.list(tenant, Some(later), None).await.unwrap().is_empty());

        let at = entry.created_at();
        let exact = repo.list(tenant, Some(at), Some(at)).await.unwrap();
        assert_eq!(exact.len(), 1, "both bounds are inclusive");
        assert_eq!(repo.tenants().await.unwrap(), vec![tenant]);
    }
}
