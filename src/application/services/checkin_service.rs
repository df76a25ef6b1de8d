//! # Check-in Service
//!
//! Door control: identifies a participant by QR token, CPF or id and opens a
//! check-in session.
//!
//! A participant has at most one open session. The service checks for an
//! open session first for a clear error, and the repository's
//! `open_session` enforces the same rule atomically for concurrent scans.

use crate::application::error::{ApplicationError, ApplicationResult};
use crate::application::services::audit::AuditLog;
use crate::domain::entities::{CheckinLog, Participant};
use crate::domain::errors::DomainError;
use crate::domain::events::{ParticipantCheckedIn, ParticipantCheckedOut};
use crate::domain::services::CheckinStats;
use crate::domain::value_objects::{
    CheckinId, CheckinMethod, Cpf, EventId, ParticipantId, TenantId, UserId,
};
use crate::infrastructure::persistence::{CheckinRepository, EventRepository, ParticipantRepository};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};

/// What the operator scanned or typed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct CheckinRequest {
    /// How `value` identifies the participant.
    pub method: CheckinMethod,
    /// QR token, CPF or participant id, according to `method`.
    pub value: String,
    /// Scanner or terminal name.
    #[serde(default)]
    pub device: Option<String>,
}

/// Check-in use cases.
#[derive(Debug)]
pub struct CheckinService {
    events: Arc<dyn EventRepository>,
    participants: Arc<dyn ParticipantRepository>,
    checkins: Arc<dyn CheckinRepository>,
    audit: AuditLog,
}

impl CheckinService {
    /// Creates a new check-in service.
    #[must_use]
    pub fn new(
        events: Arc<dyn EventRepository>,
        participants: Arc<dyn ParticipantRepository>,
        checkins: Arc<dyn CheckinRepository>,
        audit: AuditLog,
    ) -> Self {
        Self {
            events,
            participants,
            checkins,
            audit,
        }
    }

    async fn resolve(
        &self,
        tenant: TenantId,
        event_id: EventId,
        request: &CheckinRequest,
    ) -> ApplicationResult<Participant> {
        let value = request.value.trim();
        let found = match request.method {
            CheckinMethod::QrCode => self
                .participants
                .find_by_qr_token(tenant, &value.to_uppercase())
                .await?
                .filter(|p| p.event_id() == event_id),
            CheckinMethod::Cpf => {
                let cpf: Cpf = value
                    .parse()
                    .map_err(|e| ApplicationError::validation(format!("invalid CPF: {e}")))?;
                let matches = self.participants.find_by_cpf(tenant, event_id, &cpf).await?;
                let active = matches.iter().find(|p| p.is_active()).cloned();
                active.or_else(|| matches.into_iter().next())
            }
            CheckinMethod::Manual => {
                let id: ParticipantId = value
                    .parse()
                    .map_err(|_| ApplicationError::validation("invalid participant id"))?;
                self.participants
                    .get(tenant, id)
                    .await?
                    .filter(|p| p.event_id() == event_id)
            }
        };
        found.ok_or_else(|| {
            ApplicationError::not_found("Participant", format!("{}:{value}", request.method))
        })
    }

    /// Opens a check-in session.
    ///
    /// # Errors
    ///
    /// - `ApplicationError::NotFound` for an unknown event or participant
    /// - `ApplicationError::Conflict` if the event is not open for check-in
    /// - `ApplicationError::Domain` for a cancelled registration or an open session
    #[instrument(skip(self, request), fields(method = %request.method))]
    pub async fn check_in(
        &self,
        tenant: TenantId,
        event_id: EventId,
        operator: UserId,
        request: CheckinRequest,
    ) -> ApplicationResult<CheckinLog> {
        let event = self
            .events
            .get(tenant, event_id)
            .await?
            .ok_or_else(|| ApplicationError::not_found("Event", event_id))?;
        if !event.status().accepts_checkins() {
            return Err(ApplicationError::conflict(format!(
                "event {event_id} is {} and does not accept check-ins",
                event.status()
            )));
        }

        let participant = self.resolve(tenant, event_id, &request).await?;
        if !participant.is_active() {
            return Err(DomainError::not_allowed(format!(
                "registration of {} is cancelled",
                participant.name()
            ))
            .into());
        }
        if self.checkins.find_active(tenant, participant.id()).await?.is_some() {
            return Err(DomainError::DuplicateCheckin(participant.id().to_string()).into());
        }

        let log = CheckinLog::open(
            tenant,
            event_id,
            participant.id(),
            request.method,
            operator,
            request.device.filter(|d| !d.trim().is_empty()),
        );
        self.checkins.open_session(&log).await?;
        self.audit
            .record(&ParticipantCheckedIn::new(
                tenant,
                participant.id(),
                event_id,
                request.method,
                operator,
            ))
            .await;
        info!(participant_id = %participant.id(), checkin_id = %log.id(), "checked in");
        Ok(log)
    }

    /// Closes a session so the participant can enter again later.
    ///
    /// # Errors
    ///
    /// - `ApplicationError::NotFound` for an unknown session
    /// - `ApplicationError::Domain` if it is already closed
    pub async fn check_out(&self, tenant: TenantId, id: CheckinId) -> ApplicationResult<CheckinLog> {
        let mut log = self
            .checkins
            .get(tenant, id)
            .await?
            .ok_or_else(|| ApplicationError::not_found("Checkin", id))?;
        log.check_out()?;
        self.checkins.save(&log).await?;
        self.audit
            .record(&ParticipantCheckedOut::new(
                tenant,
                log.participant_id(),
                log.event_id(),
            ))
            .await;
        Ok(log)
    }

    /// Lists an event's check-ins, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the repository fails.
    pub async fn list(&self, tenant: TenantId, event_id: EventId) -> ApplicationResult<Vec<CheckinLog>> {
        Ok(self.checkins.list_by_event(tenant, event_id).await?)
    }

    /// Attendance figures of an event.
    ///
    /// # Errors
    ///
    /// Returns `ApplicationError::NotFound` for an unknown event.
    pub async fn stats(&self, tenant: TenantId, event_id: EventId) -> ApplicationResult<CheckinStats> {
        if self.events.get(tenant, event_id).await?.is_none() {
            return Err(ApplicationError::not_found("Event", event_id));
        }
        let participants = self.participants.list_by_event(tenant, event_id).await?;
        let checkins = self.checkins.list_by_event(tenant, event_id).await?;
        Ok(CheckinStats::compute(&participants, &checkins))
    }
}
