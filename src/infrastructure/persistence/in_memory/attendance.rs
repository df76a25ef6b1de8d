//! # In-Memory Attendance Repositories
//!
//! Events, participants and check-in logs kept in thread-safe maps.

use crate::domain::entities::{CheckinLog, Event, Participant};
use crate::domain::value_objects::{
    CheckinId, Cpf, EventId, EventStatus, ParticipantId, TenantId,
};
use crate::infrastructure::persistence::traits::{
    CheckinRepository, EventRepository, Page, ParticipantRepository, RepositoryError,
    RepositoryResult,
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// In-memory implementation of [`EventRepository`].
#[derive(Debug, Clone, Default)]
pub struct InMemoryEventRepository {
    storage: Arc<RwLock<HashMap<EventId, Event>>>,
}

impl InMemoryEventRepository {
    /// Creates a new empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored events across tenants.
    #[must_use]
    pub fn len(&self) -> usize {
        self.storage
            .try_read()
            .map(|guard| guard.len())
            .unwrap_or(0)
    }

    /// Returns true if nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl EventRepository for InMemoryEventRepository {
    async fn save(&self, event: &Event) -> RepositoryResult<()> {
        let mut storage = self.storage.write().await;
        storage.insert(event.id(), event.clone());
        Ok(())
    }

    async fn get(&self, tenant: TenantId, id: EventId) -> RepositoryResult<Option<Event>> {
        let storage = self.storage.read().await;
        Ok(storage
            .get(&id)
            .filter(|e| e.tenant_id() == tenant)
            .cloned())
    }

    async fn list(
        &self,
        tenant: TenantId,
        status: Option<EventStatus>,
        page: Page,
    ) -> RepositoryResult<Vec<Event>> {
        let storage = self.storage.read().await;
        let mut events: Vec<Event> = storage
            .values()
            .filter(|e| e.tenant_id() == tenant)
            .filter(|e| status.is_none_or(|s| e.status() == s))
            .cloned()
            .collect();
        events.sort_by_key(|e| (e.starts_at(), e.id()));
        Ok(page.slice(events))
    }

    async fn count(&self, tenant: TenantId, status: Option<EventStatus>) -> RepositoryResult<u64> {
        let storage = self.storage.read().await;
        Ok(storage
            .values()
            .filter(|e| e.tenant_id() == tenant)
            .filter(|e| status.is_none_or(|s| e.status() == s))
            .count() as u64)
    }
}

/// In-memory implementation of [`ParticipantRepository`].
#[derive(Debug, Clone, Default)]
pub struct InMemoryParticipantRepository {
    storage: Arc<RwLock<HashMap<ParticipantId, Participant>>>,
}

impl InMemoryParticipantRepository {
    /// Creates a new empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    async fn matching(
        &self,
        tenant: TenantId,
        pred: impl Fn(&Participant) -> bool,
    ) -> Vec<Participant> {
        let storage = self.storage.read().await;
        let mut found: Vec<Participant> = storage
            .values()
            .filter(|p| p.tenant_id() == tenant && pred(p))
            .cloned()
            .collect();
        found.sort_by_key(|p| (p.registered_at(), p.id()));
        found
    }
}

#[async_trait]
impl ParticipantRepository for InMemoryParticipantRepository {
    async fn save(&self, participant: &Participant) -> RepositoryResult<()> {
        let mut storage = self.storage.write().await;
        storage.insert(participant.id(), participant.clone());
        Ok(())
    }

    async fn get(
        &self,
        tenant: TenantId,
        id: ParticipantId,
    ) -> RepositoryResult<Option<Participant>> {
        let storage = self.storage.read().await;
        Ok(storage
            .get(&id)
            .filter(|p| p.tenant_id() == tenant)
            .cloned())
    }

    async fn find_by_qr_token(
        &self,
        tenant: TenantId,
        token: &str,
    ) -> RepositoryResult<Option<Participant>> {
        let token = token.trim().to_uppercase();
        Ok(self
            .matching(tenant, |p| p.qr_token() == token)
            .await
            .into_iter()
            .next())
    }

    async fn find_by_cpf(
        &self,
        tenant: TenantId,
        event_id: EventId,
        cpf: &Cpf,
    ) -> RepositoryResult<Vec<Participant>> {
        Ok(self
            .matching(tenant, |p| p.event_id() == event_id && p.cpf() == Some(cpf))
            .await)
    }

    async fn list_by_event(
        &self,
        tenant: TenantId,
        event_id: EventId,
    ) -> RepositoryResult<Vec<Participant>> {
        Ok(self.matching(tenant, |p| p.event_id() == event_id).await)
    }

    async fn count_active(&self, tenant: TenantId, event_id: EventId) -> RepositoryResult<usize> {
        let storage = self.storage.read().await;
        Ok(storage
            .values()
            .filter(|p| p.tenant_id() == tenant && p.event_id() == event_id && p.is_active())
            .count())
    }
}

/// In-memory implementation of [`CheckinRepository`].
#[derive(Debug, Clone, Default)]
pub struct InMemoryCheckinRepository {
    storage: Arc<RwLock<HashMap<CheckinId, CheckinLog>>>,
}

impl InMemoryCheckinRepository {
    /// Creates a new empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CheckinRepository for InMemoryCheckinRepository {
    async fn save(&self, log: &CheckinLog) -> RepositoryResult<()> {
        let mut storage = self.storage.write().await;
        storage.insert(log.id(), log.clone());
        Ok(())
    }

    async fn open_session(&self, log: &CheckinLog) -> RepositoryResult<()> {
        // Check and insert under one write lock so two doors cannot both admit.
        let mut storage = self.storage.write().await;
        let already_inside = storage
            .values()
            .any(|l| l.participant_id() == log.participant_id() && l.is_active());
        if already_inside {
            return Err(RepositoryError::duplicate(
                "CheckinSession",
                log.participant_id().to_string(),
            ));
        }
        storage.insert(log.id(), log.clone());
        Ok(())
    }

    async fn get(&self, tenant: TenantId, id: CheckinId) -> RepositoryResult<Option<CheckinLog>> {
        let storage = self.storage.read().await;
        Ok(storage
            .get(&id)
            .filter(|l| l.tenant_id() == tenant)
            .cloned())
    }

    async fn find_active(
        &self,
        tenant: TenantId,
        participant_id: ParticipantId,
    ) -> RepositoryResult<Option<CheckinLog>> {
        let storage = self.storage.read().await;
        Ok(storage
            .values()
            .find(|l| {
                l.tenant_id() == tenant && l.participant_id() == participant_id && l.is_active()
            })
            .cloned())
    }

    async fn list_by_event(
        &self,
        tenant: TenantId,
        event_id: EventId,
    ) -> RepositoryResult<Vec<CheckinLog>> {
        let storage = self.storage.read().await;
        let mut logs: Vec<CheckinLog> = storage
            .values()
            .filter(|l| l.tenant_id() == tenant && l.event_id() == event_id)
            .cloned()
            .collect();
        logs.sort_by(|a, b| b.checked_in_at().cmp(&a.checked_in_at()));
        Ok(logs)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::domain::entities::event::tests::details;
    use crate::domain::entities::ParticipantDetails;
    use crate::domain::value_objects::{CheckinMethod, UserId};

    fn participant(tenant: TenantId, event: EventId, cpf: Option<&str>) -> Participant {
        Participant::register(
            tenant,
            event,
            ParticipantDetails {
                name: "Maria".into(),
                email: "maria@example.com".into(),
                cpf: cpf.map(|c| c.parse().unwrap()),
                phone: None,
                ticket_type: None,
            },
        )
        .unwrap()
    }

    mod events {
        use super::*;

        #[tokio::test]
        async fn other_tenant_sees_nothing() {
            let repo = InMemoryEventRepository::new();
            let tenant = TenantId::new_v4();
            let event = Event::new(tenant, details()).unwrap();
            repo.save(&event).await.unwrap();

            assert!(repo.get(tenant, event.id()).await.unwrap().is_some());
            assert!(repo.get(TenantId::new_v4(), event.id()).await.unwrap().is_none());
            assert_eq!(repo.count(TenantId::new_v4(), None).await.unwrap(), 0);
        }

        #[tokio::test]
        async fn list_filters_by_status() {
            let repo = InMemoryEventRepository::new();
            let tenant = TenantId::new_v4();
            let draft = Event::new(tenant, details()).unwrap();
            let mut published = Event::new(tenant, details()).unwrap();
            published.publish().unwrap();
            repo.save(&draft).await.unwrap();
            repo.save(&published).await.unwrap();

            let found = repo
                .list(tenant, Some(EventStatus::Published), Page::default())
                .await
                .unwrap();
            assert_eq!(found.len(), 1);
            assert_eq!(repo.count(tenant, None).await.unwrap(), 2);
        }
    }

    mod participants {
        use super::*;

        #[tokio::test]
        async fn finds_by_token_and_cpf() {
            let repo = InMemoryParticipantRepository::new();
            let tenant = TenantId::new_v4();
            let event = EventId::new_v4();
            let p = participant(tenant, event, Some("111.444.777-35"));
            repo.save(&p).await.unwrap();

            let by_token = repo
                .find_by_qr_token(tenant, &p.qr_token().to_lowercase())
                .await
                .unwrap();
            assert_eq!(by_token.unwrap().id(), p.id());

            let cpf: Cpf = "11144477735".parse().unwrap();
            assert_eq!(repo.find_by_cpf(tenant, event, &cpf).await.unwrap().len(), 1);
            assert!(
                repo.find_by_cpf(tenant, EventId::new_v4(), &cpf)
                    .await
                    .unwrap()
                    .is_empty()
            );
        }

        #[tokio::test]
        async fn count_active_skips_cancelled() {
            let repo = InMemoryParticipantRepository::new();
            let tenant = TenantId::new_v4();
            let event = EventId::new_v4();
            let a = participant(tenant, event, None);
            let mut b = participant(tenant, event, None);
            b.cancel().unwrap();
            repo.save(&a).await.unwrap();
            repo.save(&b).await.unwrap();
            assert_eq!(repo.count_active(tenant, event).await.unwrap(), 1);
        }
    }

    mod checkins {
        use super::*;

        #[tokio::test]
        async fn second_open_session_is_duplicate() {
            let repo = InMemoryCheckinRepository::new();
            let tenant = TenantId::new_v4();
            let event = EventId::new_v4();
            let participant = ParticipantId::new_v4();
            let open = |method| {
                CheckinLog::open(tenant, event, participant, method, UserId::new_v4(), None)
            };

            let mut first = open(CheckinMethod::QrCode);
            repo.open_session(&first).await.unwrap();
            let err = repo.open_session(&open(CheckinMethod::Cpf)).await.unwrap_err();
            assert!(err.is_duplicate());

            first.check_out().unwrap();
            repo.save(&first).await.unwrap();
            repo.open_session(&open(CheckinMethod::Manual)).await.unwrap();
            assert_eq!(repo.list_by_event(tenant, event).await.unwrap().len(), 2);
        }
    }
}
