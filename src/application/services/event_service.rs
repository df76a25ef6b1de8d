//! # Event Service
//!
//! Event lifecycle and participant registration.
//!
//! # Registration Rules
//!
//! - The event must be `Published` or `InProgress`
//! - Active registrations (cancelled ones excluded) stay within capacity
//! - A CPF registers at most once per event while active
//!
//! Registrations are serialized per process so the capacity check and the
//! insert cannot interleave.

use crate::application::error::{ApplicationError, ApplicationResult};
use crate::application::services::audit::AuditLog;
use crate::application::services::notification_service::{NotificationRequest, NotificationService};
use crate::domain::entities::{Event, EventDetails, Participant, ParticipantDetails};
use crate::domain::events::{EventCancelled, EventPublished, ParticipantRegistered};
use crate::domain::value_objects::{EventId, EventStatus, ParticipantId, TenantId};
use crate::infrastructure::persistence::{EventRepository, Page, ParticipantRepository};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, instrument};

/// One page of events with the total count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventPage {
    /// Events on this page.
    pub items: Vec<Event>,
    /// Events matching the filter across all pages.
    pub total: u64,
    /// Rows skipped.
    pub offset: usize,
    /// Page size.
    pub limit: usize,
}

/// Result of cancelling an event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventCancellation {
    /// The cancelled event.
    pub event: Event,
    /// Participants that were sent a notice.
    pub participants_notified: usize,
}

/// Event and participant use cases.
#[derive(Debug)]
pub struct EventService {
    events: Arc<dyn EventRepository>,
    participants: Arc<dyn ParticipantRepository>,
    notifications: Arc<NotificationService>,
    audit: AuditLog,
    registration_lock: Mutex<()>,
}

impl EventService {
    /// Creates a new event service.
    #[must_use]
    pub fn new(
        events: Arc<dyn EventRepository>,
        participants: Arc<dyn ParticipantRepository>,
        notifications: Arc<NotificationService>,
        audit: AuditLog,
    ) -> Self {
        Self {
            events,
            participants,
            notifications,
            audit,
            registration_lock: Mutex::new(()),
        }
    }

    /// Creates a draft event.
    ///
    /// # Errors
    ///
    /// Returns `ApplicationError::Domain` for invalid details.
    #[instrument(skip(self, details), fields(name = %details.name))]
    pub async fn create(&self, tenant: TenantId, details: EventDetails) -> ApplicationResult<Event> {
        let event = Event::new(tenant, details)?;
        self.events.save(&event).await?;
        info!(event_id = %event.id(), "event created");
        Ok(event)
    }

    /// Loads an event of the tenant.
    ///
    /// # Errors
    ///
    /// Returns `ApplicationError::NotFound` if it does not exist for the tenant.
    pub async fn get(&self, tenant: TenantId, id: EventId) -> ApplicationResult<Event> {
        self.events
            .get(tenant, id)
            .await?
            .ok_or_else(|| ApplicationError::not_found("Event", id))
    }

    /// Lists events, soonest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the repository fails.
    pub async fn list(
        &self,
        tenant: TenantId,
        status: Option<EventStatus>,
        page: Page,
    ) -> ApplicationResult<EventPage> {
        let items = self.events.list(tenant, status, page).await?;
        let total = self.events.count(tenant, status).await?;
        Ok(EventPage {
            items,
            total,
            offset: page.offset,
            limit: page.limit,
        })
    }

    /// Replaces the editable details.
    ///
    /// # Errors
    ///
    /// - `ApplicationError::NotFound` for an unknown event
    /// - `ApplicationError::Domain` for invalid details or a closed event
    pub async fn update(
        &self,
        tenant: TenantId,
        id: EventId,
        details: EventDetails,
    ) -> ApplicationResult<Event> {
        let mut event = self.get(tenant, id).await?;
        event.update(details)?;
        self.events.save(&event).await?;
        Ok(event)
    }

    /// Opens registrations.
    ///
    /// # Errors
    ///
    /// Returns `ApplicationError::Domain` unless the event is a draft.
    pub async fn publish(&self, tenant: TenantId, id: EventId) -> ApplicationResult<Event> {
        let mut event = self.get(tenant, id).await?;
        event.publish()?;
        self.events.save(&event).await?;
        self.audit
            .record(&EventPublished::new(tenant, id, event.name()))
            .await;
        info!(event_id = %id, "event published");
        Ok(event)
    }

    /// Marks the event as running.
    ///
    /// # Errors
    ///
    /// Returns `ApplicationError::Domain` unless the event is published.
    pub async fn start(&self, tenant: TenantId, id: EventId) -> ApplicationResult<Event> {
        let mut event = self.get(tenant, id).await?;
        event.start()?;
        self.events.save(&event).await?;
        Ok(event)
    }

    /// Closes the event.
    ///
    /// # Errors
    ///
    /// Returns `ApplicationError::Domain` unless the event is in progress.
    pub async fn finish(&self, tenant: TenantId, id: EventId) -> ApplicationResult<Event> {
        let mut event = self.get(tenant, id).await?;
        event.finish()?;
        self.events.save(&event).await?;
        Ok(event)
    }

    /// Cancels the event and e-mails every active participant.
    ///
    /// # Errors
    ///
    /// - `ApplicationError::Domain` if the event is finished or already cancelled
    /// - `ApplicationError::Validation` for a blank reason
    #[instrument(skip(self, reason))]
    pub async fn cancel(
        &self,
        tenant: TenantId,
        id: EventId,
        reason: &str,
    ) -> ApplicationResult<EventCancellation> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(ApplicationError::validation("cancellation reason is required"));
        }
        let mut event = self.get(tenant, id).await?;
        event.cancel(reason)?;
        self.events.save(&event).await?;

        let notices: Vec<NotificationRequest> = self
            .participants
            .list_by_event(tenant, id)
            .await?
            .iter()
            .filter(|p| p.is_active())
            .map(|p| {
                NotificationRequest::email(
                    p.email(),
                    format!("{} foi cancelado", event.name()),
                    format!(
                        "Olá {}, o evento {} foi cancelado. Motivo: {reason}. \
                         O reembolso pode ser solicitado pelo organizador.",
                        p.name(),
                        event.name()
                    ),
                )
            })
            .collect();
        let participants_notified = self.notifications.broadcast(tenant, notices).await.len();

        self.audit
            .record(&EventCancelled::new(tenant, id, reason, participants_notified))
            .await;
        info!(event_id = %id, participants_notified, "event cancelled");
        Ok(EventCancellation {
            event,
            participants_notified,
        })
    }

    /// Registers a participant.
    ///
    /// # Errors
    ///
    /// - `ApplicationError::Conflict` when the event is not open, full, or the
    ///   CPF is already registered
    /// - `ApplicationError::Domain` for invalid participant data
    #[instrument(skip(self, details))]
    pub async fn register_participant(
        &self,
        tenant: TenantId,
        event_id: EventId,
        details: ParticipantDetails,
    ) -> ApplicationResult<Participant> {
        let _guard = self.registration_lock.lock().await;
        let event = self.get(tenant, event_id).await?;
        if !event.status().accepts_registrations() {
            return Err(ApplicationError::conflict(format!(
                "event {event_id} is {} and does not accept registrations",
                event.status()
            )));
        }
        let active = self.participants.count_active(tenant, event_id).await?;
        if !event.has_room_for(active) {
            return Err(ApplicationError::conflict(format!(
                "event {event_id} is full ({active} registrations)"
            )));
        }
        if let Some(cpf) = &details.cpf {
            let taken = self
                .participants
                .find_by_cpf(tenant, event_id, cpf)
                .await?
                .iter()
                .any(Participant::is_active);
            if taken {
                return Err(ApplicationError::conflict(format!(
                    "CPF {} is already registered for this event",
                    cpf.masked()
                )));
            }
        }

        let participant = Participant::register(tenant, event_id, details)?;
        self.participants.save(&participant).await?;
        self.audit
            .record(&ParticipantRegistered::new(
                tenant,
                participant.id(),
                event_id,
                participant.ticket_type(),
            ))
            .await;
        info!(participant_id = %participant.id(), "participant registered");
        Ok(participant)
    }

    /// Loads a participant of the tenant.
    ///
    /// # Errors
    ///
    /// Returns `ApplicationError::NotFound` if it does not exist for the tenant.
    pub async fn get_participant(
        &self,
        tenant: TenantId,
        id: ParticipantId,
    ) -> ApplicationResult<Participant> {
        self.participants
            .get(tenant, id)
            .await?
            .ok_or_else(|| ApplicationError::not_found("Participant", id))
    }

    /// Lists the participants of an event.
    ///
    /// # Errors
    ///
    /// Returns `ApplicationError::NotFound` for an unknown event.
    pub async fn list_participants(
        &self,
        tenant: TenantId,
        event_id: EventId,
    ) -> ApplicationResult<Vec<Participant>> {
        self.get(tenant, event_id).await?;
        Ok(self.participants.list_by_event(tenant, event_id).await?)
    }

    /// Cancels a registration, freeing its seat.
    ///
    /// # Errors
    ///
    /// Returns `ApplicationError::Domain` if it is already cancelled.
    pub async fn cancel_participant(
        &self,
        tenant: TenantId,
        id: ParticipantId,
    ) -> ApplicationResult<Participant> {
        let mut participant = self.get_participant(tenant, id).await?;
        participant.cancel()?;
        self.participants.save(&participant).await?;
        Ok(participant)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod tests {
    use super::*;
    use crate::application::services::notification_service::NotificationConfig;
    use crate::domain::value_objects::{Cpf, Timestamp};
    use crate::infrastructure::notifications::{LogSender, NotificationSender};
    use crate::infrastructure::persistence::in_memory::{
        InMemoryEventRepository, InMemoryEventStore, InMemoryNotificationRepository,
        InMemoryParticipantRepository,
    };

    pub(crate) fn details(capacity: Option<u32>) -> EventDetails {
        let starts_at = Timestamp::now().add_days(30);
        EventDetails {
            name: "Festival de Inverno".into(),
            description: Some("Música ao vivo".into()),
            venue: "Parque da Cidade".into(),
            starts_at,
            ends_at: starts_at.add_hours(6),
            capacity,
        }
    }

    pub(crate) fn person(name: &str, cpf: Option<&str>) -> ParticipantDetails {
        ParticipantDetails {
            name: name.into(),
            email: format!("{}@example.com", name.to_lowercase()),
            cpf: cpf.map(|c| c.parse::<Cpf>().unwrap()),
            phone: None,
            ticket_type: None,
        }
    }

    fn service() -> (EventService, Arc<LogSender>) {
        let log = Arc::new(LogSender::new());
        let sender: Arc<dyn NotificationSender> = log.clone();
        let notifications = Arc::new(NotificationService::new(
            Arc::new(InMemoryNotificationRepository::new()),
            vec![sender],
            NotificationConfig::default(),
        ));
        let svc = EventService::new(
            Arc::new(InMemoryEventRepository::new()),
            Arc::new(InMemoryParticipantRepository::new()),
            notifications,
            AuditLog::new(Arc::new(InMemoryEventStore::new())),
        );
        (svc, log)
    }

    #[tokio::test]
    async fn create_and_get_returns_same_fields() {
        let (svc, _) = service();
        let tenant = TenantId::new_v4();
        let created = svc.create(tenant, details(Some(10))).await.unwrap();
        let loaded = svc.get(tenant, created.id()).await.unwrap();
        assert_eq!(created, loaded);
        assert_eq!(loaded.status(), EventStatus::Draft);
    }

    #[tokio::test]
    async fn other_tenants_see_not_found() {
        let (svc, _) = service();
        let created = svc.create(TenantId::new_v4(), details(None)).await.unwrap();
        let err = svc.get(TenantId::new_v4(), created.id()).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn drafts_refuse_registrations() {
        let (svc, _) = service();
        let tenant = TenantId::new_v4();
        let event = svc.create(tenant, details(None)).await.unwrap();
        let err = svc
            .register_participant(tenant, event.id(), person("Ana", None))
            .await
            .unwrap_err();
        assert!(err.is_conflict());
    }

    #[tokio::test]
    async fn capacity_counts_only_active_registrations() {
        let (svc, _) = service();
        let tenant = TenantId::new_v4();
        let event = svc.create(tenant, details(Some(1))).await.unwrap();
        svc.publish(tenant, event.id()).await.unwrap();

        let ana = svc
            .register_participant(tenant, event.id(), person("Ana", None))
            .await
            .unwrap();
        assert!(
            svc.register_participant(tenant, event.id(), person("Bia", None))
                .await
                .unwrap_err()
                .is_conflict()
        );

        svc.cancel_participant(tenant, ana.id()).await.unwrap();
        svc.register_participant(tenant, event.id(), person("Bia", None))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn cpf_is_unique_per_event() {
        let (svc, _) = service();
        let tenant = TenantId::new_v4();
        let event = svc.create(tenant, details(None)).await.unwrap();
        svc.publish(tenant, event.id()).await.unwrap();

        svc.register_participant(tenant, event.id(), person("Ana", Some("529.982.247-25")))
            .await
            .unwrap();
        let err = svc
            .register_participant(tenant, event.id(), person("Outra", Some("52998224725")))
            .await
            .unwrap_err();
        assert!(err.is_conflict());
        assert!(err.to_string().contains("***.982.247-**"));
    }

    #[tokio::test]
    async fn cancel_notifies_active_participants() {
        let (svc, log) = service();
        let tenant = TenantId::new_v4();
        let event = svc.create(tenant, details(None)).await.unwrap();
        svc.publish(tenant, event.id()).await.unwrap();
        svc.register_participant(tenant, event.id(), person("Ana", None))
            .await
            .unwrap();
        let bia = svc
            .register_participant(tenant, event.id(), person("Bia", None))
            .await
            .unwrap();
        svc.cancel_participant(tenant, bia.id()).await.unwrap();

        let cancelled = svc.cancel(tenant, event.id(), "chuva forte").await.unwrap();
        assert_eq!(cancelled.participants_notified, 1);
        assert_eq!(cancelled.event.status(), EventStatus::Cancelled);
        assert_eq!(log.sent(), 1);

        assert!(svc.update(tenant, event.id(), details(None)).await.unwrap_err().is_conflict());
    }

    #[tokio::test]
    async fn list_reports_total() {
        let (svc, _) = service();
        let tenant = TenantId::new_v4();
        for _ in 0..3 {
            svc.create(tenant, details(None)).await.unwrap();
        }
        let page = svc.list(tenant, None, Page::new(1, 2)).await.unwrap();
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.total, 3);
        let published = svc
            .list(tenant, Some(EventStatus::Published), Page::default())
            .await
            .unwrap();
        assert_eq!(published.total, 0);
    }
}
