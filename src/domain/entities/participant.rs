//! # Participant
//!
//! A person registered for an event. Each registration receives an opaque QR
//! token printed on the ticket; the door scans it to check the participant in.

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::value_objects::{
    Cpf, EventId, ParticipantId, ParticipantStatus, TenantId, Timestamp,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Ticket type assigned when none is given.
pub const DEFAULT_TICKET_TYPE: &str = "GENERAL";

/// Registration data supplied by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct ParticipantDetails {
    /// Full name.
    pub name: String,
    /// Contact e-mail.
    pub email: String,
    /// Optional CPF; unique per event when present.
    #[serde(default)]
    pub cpf: Option<Cpf>,
    /// Optional phone number for SMS/WhatsApp.
    #[serde(default)]
    pub phone: Option<String>,
    /// Ticket category (e.g. `VIP`).
    #[serde(default)]
    pub ticket_type: Option<String>,
}

/// Participant entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    id: ParticipantId,
    tenant_id: TenantId,
    event_id: EventId,
    name: String,
    email: String,
    cpf: Option<Cpf>,
    phone: Option<String>,
    ticket_type: String,
    qr_token: String,
    status: ParticipantStatus,
    registered_at: Timestamp,
    updated_at: Timestamp,
}

impl Participant {
    /// Registers a participant and issues a fresh QR token.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` for a blank name or malformed e-mail.
    pub fn register(
        tenant_id: TenantId,
        event_id: EventId,
        details: ParticipantDetails,
    ) -> DomainResult<Self> {
        let name = details.name.trim().to_string();
        if name.is_empty() {
            return Err(DomainError::validation("participant name is required"));
        }
        let email = details.email.trim().to_lowercase();
        if !is_plausible_email(&email) {
            return Err(DomainError::validation("participant email is invalid"));
        }
        let now = Timestamp::now();
        Ok(Self {
            id: ParticipantId::new_v4(),
            tenant_id,
            event_id,
            name,
            email,
            cpf: details.cpf,
            phone: details.phone.filter(|p| !p.trim().is_empty()),
            ticket_type: details
                .ticket_type
                .filter(|t| !t.trim().is_empty())
                .map_or_else(|| DEFAULT_TICKET_TYPE.to_string(), |t| t.trim().to_uppercase()),
            qr_token: format!("QR-{}", Uuid::new_v4().simple()).to_uppercase(),
            status: ParticipantStatus::Registered,
            registered_at: now,
            updated_at: now,
        })
    }

    fn transition_to(&mut self, target: ParticipantStatus) -> DomainResult<()> {
        if !self.status.can_transition_to(target) {
            return Err(DomainError::invalid_transition(
                "participant",
                self.status,
                target,
            ));
        }
        self.status = target;
        self.updated_at = Timestamp::now();
        Ok(())
    }

    /// Returns the participant ID.
    #[inline]
    #[must_use]
    pub fn id(&self) -> ParticipantId {
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

    /// Returns the full name.
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the normalized e-mail.
    #[inline]
    #[must_use]
    pub fn email(&self) -> &str {
        &self.email
    }

    /// Returns the CPF.
    #[inline]
    #[must_use]
    pub fn cpf(&self) -> Option<&Cpf> {
        self.cpf.as_ref()
    }

    /// Returns the phone number.
    #[inline]
    #[must_use]
    pub fn phone(&self) -> Option<&str> {
        self.phone.as_deref()
    }

    /// Returns the ticket type.
    #[inline]
    #[must_use]
    pub fn ticket_type(&self) -> &str {
        &self.ticket_type
    }

    /// Returns the QR token printed on the ticket.
    #[inline]
    #[must_use]
    pub fn qr_token(&self) -> &str {
        &self.qr_token
    }

    /// Returns the registration status.
    #[inline]
    #[must_use]
    pub fn status(&self) -> ParticipantStatus {
        self.status
    }

    /// Returns the registration time.
    #[inline]
    #[must_use]
    pub fn registered_at(&self) -> Timestamp {
        self.registered_at
    }

    /// Returns the last update time.
    #[inline]
    #[must_use]
    pub fn updated_at(&self) -> Timestamp {
        self.updated_at
    }

    /// Returns true unless the registration was cancelled.
    #[inline]
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }

    /// Marks the ticket as paid.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidStateTransition` unless Registered.
    pub fn confirm(&mut self) -> DomainResult<()> {
        self.transition_to(ParticipantStatus::Confirmed)
    }

    /// Cancels the registration and frees the seat.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidStateTransition` if already cancelled.
    pub fn cancel(&mut self) -> DomainResult<()> {
        self.transition_to(ParticipantStatus::Cancelled)
    }
}

fn is_plausible_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.contains(char::is_whitespace)
        }
        None => false,
    }
}
