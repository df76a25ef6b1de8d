//! # SMTP Email Sender
//!
//! Delivers [`NotificationChannel::Email`] notifications with `lettre` over
//! an async SMTP transport (STARTTLS relay, or plain for local catchers).

use crate::domain::entities::Notification;
use crate::domain::value_objects::NotificationChannel;
use crate::infrastructure::notifications::traits::{
    DeliveryError, DeliveryResult, NotificationSender,
};
use async_trait::async_trait;
use lettre::message::Mailbox;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::debug;

/// SMTP connection settings.
#[derive(Debug, Clone)]
pub struct SmtpSettings {
    /// Relay host.
    pub host: String,
    /// Relay port.
    pub port: u16,
    /// Login, if the relay requires one.
    pub username: Option<String>,
    /// Password for `username`.
    pub password: Option<String>,
    /// `From` address.
    pub from: String,
    /// Use STARTTLS.
    pub starttls: bool,
}

const DEFAULT_SUBJECT: &str = "Notificação";

/// Email sender over SMTP.
#[derive(Debug, Clone)]
pub struct SmtpEmailSender {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpEmailSender {
    /// Builds the transport. No connection is opened until the first send.
    ///
    /// # Errors
    ///
    /// Returns `DeliveryError::Configuration` for an invalid host or sender
    /// address.
    pub fn new(settings: &SmtpSettings) -> DeliveryResult<Self> {
        let from: Mailbox = settings
            .from
            .parse()
            .map_err(|e| DeliveryError::Configuration(format!("invalid from address: {e}")))?;
        let mut builder = if settings.starttls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&settings.host)
                .map_err(|e| DeliveryError::Configuration(e.to_string()))?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&settings.host)
        }
        .port(settings.port);
        if let (Some(user), Some(pass)) = (&settings.username, &settings.password) {
            builder = builder.credentials(Credentials::new(user.clone(), pass.clone()));
        }
        Ok(Self {
            transport: builder.build(),
            from,
        })
    }

    fn message(&self, notification: &Notification) -> DeliveryResult<Message> {
        let to: Mailbox = notification
            .recipient()
            .parse()
            .map_err(|e| DeliveryError::Rejected(format!("invalid recipient: {e}")))?;
        Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(notification.subject().unwrap_or(DEFAULT_SUBJECT))
            .header(ContentType::TEXT_PLAIN)
            .body(notification.body().to_string())
            .map_err(|e| DeliveryError::Rejected(e.to_string()))
    }
}

#[async_trait]
impl NotificationSender for SmtpEmailSender {
    fn channels(&self) -> &[NotificationChannel] {
        &[NotificationChannel::Email]
    }

    async fn send(&self, notification: &Notification) -> DeliveryResult<()> {
        let message = self.message(notification)?;
        let response = self.transport.send(message).await.map_err(|e| {
            if e.is_permanent() {
                DeliveryError::Rejected(e.to_string())
            } else {
                DeliveryError::Unavailable(e.to_string())
            }
        })?;
        debug!(code = %response.code(), notification_id = %notification.id(), "email accepted");
        Ok(())
    }
}
