//! # Logging Sender
//!
//! Development sender that writes notifications to the log instead of
//! delivering them. Handles every channel.

use crate::domain::entities::Notification;
use crate::domain::value_objects::NotificationChannel;
use crate::infrastructure::notifications::traits::{DeliveryResult, NotificationSender};
use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::info;

const ALL_CHANNELS: [NotificationChannel; 4] = [
    NotificationChannel::Email,
    NotificationChannel::Sms,
    NotificationChannel::Push,
    NotificationChannel::WhatsApp,
];

/// Sender that only logs.
#[derive(Debug, Clone, Default)]
pub struct LogSender {
    sent: Arc<AtomicU64>,
}

impl LogSender {
    /// Creates a logging sender.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of messages logged.
    #[must_use]
    pub fn sent(&self) -> u64 {
        self.sent.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl NotificationSender for LogSender {
    fn channels(&self) -> &[NotificationChannel] {
        &ALL_CHANNELS
    }

    async fn send(&self, notification: &Notification) -> DeliveryResult<()> {
        self.sent.fetch_add(1, Ordering::Relaxed);
        info!(
            notification_id = %notification.id(),
            channel = %notification.channel(),
            recipient = notification.recipient(),
            subject = notification.subject().unwrap_or_default(),
            "notification (log sender)"
        );
        Ok(())
    }
}
