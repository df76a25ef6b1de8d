//! # Notification Service
//!
//! Persist-then-send delivery over the configured channel senders.
//!
//! Every message is stored as `Pending` before the first attempt, so a crash
//! or provider outage leaves a record that [`NotificationService::retry_failed`]
//! can pick up later. Outbound sends share one rate limiter; each send is
//! retried with [`RetryConfig`] backoff while the provider reports transient
//! errors.

use crate::application::error::{ApplicationError, ApplicationResult};
use crate::application::services::retry::RetryConfig;
use crate::domain::entities::Notification;
use crate::domain::value_objects::{NotificationChannel, NotificationId, NotificationStatus, TenantId};
use crate::infrastructure::notifications::{DeliveryError, NotificationSender};
use crate::infrastructure::persistence::{NotificationRepository, Page};
use futures::stream::{self, StreamExt};
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use tracing::{debug, instrument, warn};

/// Notification delivery settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationConfig {
    /// Backoff for a single message.
    pub retry: RetryConfig,
    /// Sustained outbound messages per second.
    pub rate_per_second: u32,
    /// Messages allowed in a burst.
    pub burst: u32,
    /// Messages delivered concurrently during a broadcast.
    pub broadcast_concurrency: usize,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            retry: RetryConfig::default(),
            rate_per_second: 20,
            burst: 40,
            broadcast_concurrency: 8,
        }
    }
}

/// A message to send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct NotificationRequest {
    /// Delivery channel.
    pub channel: NotificationChannel,
    /// Address, phone number or device token.
    pub recipient: String,
    /// Subject line (e-mail) or title (push).
    #[serde(default)]
    pub subject: Option<String>,
    /// Message text.
    pub body: String,
}

impl NotificationRequest {
    /// Creates an e-mail request.
    #[must_use]
    pub fn email(recipient: impl Into<String>, subject: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            channel: NotificationChannel::Email,
            recipient: recipient.into(),
            subject: Some(subject.into()),
            body: body.into(),
        }
    }
}

/// Outcome of [`NotificationService::retry_failed`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct RetryReport {
    /// Failed notifications picked up.
    pub retried: usize,
    /// Of those, delivered this time.
    pub sent: usize,
    /// Of those, still failing.
    pub failed: usize,
}

/// Persists and delivers notifications.
pub struct NotificationService {
    repository: Arc<dyn NotificationRepository>,
    senders: HashMap<NotificationChannel, Arc<dyn NotificationSender>>,
    limiter: DefaultDirectRateLimiter,
    config: NotificationConfig,
}

impl fmt::Debug for NotificationService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotificationService")
            .field("channels", &self.senders.keys().collect::<Vec<_>>())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl NotificationService {
    /// Creates a service. Later senders replace earlier ones for the channels
    /// they share.
    #[must_use]
    pub fn new(
        repository: Arc<dyn NotificationRepository>,
        senders: Vec<Arc<dyn NotificationSender>>,
        config: NotificationConfig,
    ) -> Self {
        let mut by_channel = HashMap::new();
        for sender in senders {
            for channel in sender.channels() {
                by_channel.insert(*channel, Arc::clone(&sender));
            }
        }
        let rate = NonZeroU32::new(config.rate_per_second).unwrap_or(NonZeroU32::MIN);
        let burst = NonZeroU32::new(config.burst).unwrap_or(rate);
        Self {
            repository,
            senders: by_channel,
            limiter: RateLimiter::direct(Quota::per_second(rate).allow_burst(burst)),
            config,
        }
    }

    /// Channels that have a sender.
    #[must_use]
    pub fn channels(&self) -> Vec<NotificationChannel> {
        let mut channels: Vec<_> = self.senders.keys().copied().collect();
        channels.sort();
        channels
    }

    /// Stores and delivers one message. Delivery failures are recorded on the
    /// notification, not returned as errors.
    ///
    /// # Errors
    ///
    /// - `ApplicationError::Validation` for an invalid recipient or body, or
    ///   a channel without a sender
    /// - `ApplicationError::Infrastructure` if the repository fails
    #[instrument(skip(self, request), fields(channel = %request.channel))]
    pub async fn send(
        &self,
        tenant: TenantId,
        request: NotificationRequest,
    ) -> ApplicationResult<Notification> {
        if !self.senders.contains_key(&request.channel) {
            return Err(ApplicationError::validation(format!(
                "no sender configured for {}",
                request.channel
            )));
        }
        let mut notification = Notification::new(
            tenant,
            request.channel,
            request.recipient,
            request.subject,
            request.body,
        )?;
        self.repository.save(&notification).await?;
        self.deliver(&mut notification).await?;
        Ok(notification)
    }

    /// Sends many messages concurrently. Invalid requests are skipped and
    /// logged.
    pub async fn broadcast(
        &self,
        tenant: TenantId,
        requests: Vec<NotificationRequest>,
    ) -> Vec<Notification> {
        let concurrency = self.config.broadcast_concurrency.max(1);
        stream::iter(requests)
            .map(|request| async move {
                let recipient = request.recipient.clone();
                match self.send(tenant, request).await {
                    Ok(notification) => Some(notification),
                    Err(e) => {
                        warn!(%recipient, error = %e, "broadcast message skipped");
                        None
                    }
                }
            })
            .buffer_unordered(concurrency)
            .filter_map(|n| async move { n })
            .collect()
            .await
    }

    /// Delivers every failed notification of a tenant again.
    ///
    /// # Errors
    ///
    /// Returns an error if the repository fails.
    #[instrument(skip(self))]
    pub async fn retry_failed(&self, tenant: TenantId) -> ApplicationResult<RetryReport> {
        let failed = self
            .repository
            .list(tenant, Some(NotificationStatus::Failed), Page::all())
            .await?;
        let mut report = RetryReport::default();
        for mut notification in failed {
            report.retried += 1;
            self.deliver(&mut notification).await?;
            if notification.status() == NotificationStatus::Sent {
                report.sent += 1;
            } else {
                report.failed += 1;
            }
        }
        Ok(report)
    }

    /// Returns one notification.
    ///
    /// # Errors
    ///
    /// Returns `ApplicationError::NotFound` if it does not exist for the tenant.
    pub async fn get(&self, tenant: TenantId, id: NotificationId) -> ApplicationResult<Notification> {
        self.repository
            .get(tenant, id)
            .await?
            .ok_or_else(|| ApplicationError::not_found("Notification", id))
    }

    /// Lists notifications, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the repository fails.
    pub async fn list(
        &self,
        tenant: TenantId,
        status: Option<NotificationStatus>,
        page: Page,
    ) -> ApplicationResult<Vec<Notification>> {
        Ok(self.repository.list(tenant, status, page).await?)
    }

    async fn deliver(&self, notification: &mut Notification) -> ApplicationResult<()> {
        let Some(sender) = self.senders.get(&notification.channel()).cloned() else {
            notification.mark_failed(format!("no sender for {}", notification.channel()))?;
            self.repository.save(notification).await?;
            return Ok(());
        };

        let attempts = AtomicU32::new(0);
        let outcome = {
            let snapshot: &Notification = notification;
            self.config
                .retry
                .run("notification.send", || {
                    attempts.fetch_add(1, Ordering::Relaxed);
                    let sender = Arc::clone(&sender);
                    async move {
                        self.limiter.until_ready().await;
                        sender.send(snapshot).await
                    }
                })
                .await
        };
        for _ in 0..attempts.load(Ordering::Relaxed) {
            notification.record_attempt();
        }

        match outcome {
            Ok(()) => {
                notification.mark_sent()?;
                debug!(id = %notification.id(), attempts = notification.attempts(), "notification sent");
            }
            Err(e) => {
                warn!(id = %notification.id(), error = %e, "notification delivery failed");
                notification.mark_failed(delivery_message(&e))?;
            }
        }
        self.repository.save(notification).await?;
        Ok(())
    }
}

fn delivery_message(e: &DeliveryError) -> String {
    match e {
        DeliveryError::Unavailable(m) => format!("unavailable: {m}"),
        DeliveryError::Rejected(m) => format!("rejected: {m}"),
        DeliveryError::Configuration(m) => format!("configuration: {m}"),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::infrastructure::notifications::{DeliveryResult, LogSender};
    use crate::infrastructure::persistence::in_memory::InMemoryNotificationRepository;
    use async_trait::async_trait;
    use parking_lot::Mutex;

    /// Fails the first `failures` sends with the given error.
    #[derive(Debug)]
    struct FlakySender {
        failures: Mutex<u32>,
        error: DeliveryError,
    }

    #[async_trait]
    impl NotificationSender for FlakySender {
        fn channels(&self) -> &[NotificationChannel] {
            &[NotificationChannel::Sms]
        }

        async fn send(&self, _notification: &Notification) -> DeliveryResult<()> {
            let mut failures = self.failures.lock();
            if *failures > 0 {
                *failures -= 1;
                return Err(self.error.clone());
            }
            Ok(())
        }
    }

    fn config() -> NotificationConfig {
        NotificationConfig {
            retry: RetryConfig::immediate(3),
            rate_per_second: 1_000,
            burst: 1_000,
            broadcast_concurrency: 4,
        }
    }

    fn sms(recipient: &str) -> NotificationRequest {
        NotificationRequest {
            channel: NotificationChannel::Sms,
            recipient: recipient.to_string(),
            subject: None,
            body: "Seu ingresso está confirmado".to_string(),
        }
    }

    fn service(sender: Arc<dyn NotificationSender>) -> (NotificationService, Arc<InMemoryNotificationRepository>) {
        let repo = Arc::new(InMemoryNotificationRepository::new());
        (NotificationService::new(repo.clone(), vec![sender], config()), repo)
    }

    #[tokio::test]
    async fn transient_failures_are_retried() {
        let (svc, _) = service(Arc::new(FlakySender {
            failures: Mutex::new(2),
            error: DeliveryError::Unavailable("503".into()),
        }));
        let sent = svc.send(TenantId::new_v4(), sms("11987654321")).await.unwrap();
        assert_eq!(sent.status(), NotificationStatus::Sent);
        assert_eq!(sent.attempts(), 3);
    }

    #[tokio::test]
    async fn rejected_messages_fail_without_retry() {
        let (svc, repo) = service(Arc::new(FlakySender {
            failures: Mutex::new(5),
            error: DeliveryError::Rejected("bad number".into()),
        }));
        let tenant = TenantId::new_v4();
        let failed = svc.send(tenant, sms("000")).await.unwrap();
        assert_eq!(failed.status(), NotificationStatus::Failed);
        assert_eq!(failed.attempts(), 1);
        assert!(failed.last_error().unwrap().contains("rejected"));

        let stored = repo.get(tenant, failed.id()).await.unwrap().unwrap();
        assert_eq!(stored.status(), NotificationStatus::Failed);
    }

    #[tokio::test]
    async fn retry_failed_redelivers() {
        let (svc, _) = service(Arc::new(FlakySender {
            failures: Mutex::new(3),
            error: DeliveryError::Unavailable("timeout".into()),
        }));
        let tenant = TenantId::new_v4();
        let first = svc.send(tenant, sms("11987654321")).await.unwrap();
        assert_eq!(first.status(), NotificationStatus::Failed);

        let report = svc.retry_failed(tenant).await.unwrap();
        assert_eq!(report, RetryReport { retried: 1, sent: 1, failed: 0 });
        assert_eq!(svc.get(tenant, first.id()).await.unwrap().status(), NotificationStatus::Sent);
    }

    #[tokio::test]
    async fn unknown_channel_is_a_validation_error() {
        let (svc, _) = service(Arc::new(FlakySender {
            failures: Mutex::new(0),
            error: DeliveryError::Unavailable(String::new()),
        }));
        let err = svc
            .send(TenantId::new_v4(), NotificationRequest::email("a@b.com", "Oi", "Olá"))
            .await
            .unwrap_err();
        assert!(err.is_validation());
    }

    #[tokio::test]
    async fn broadcast_skips_invalid_requests() {
        let log = Arc::new(LogSender::new());
        let repo = Arc::new(InMemoryNotificationRepository::new());
        let sender: Arc<dyn NotificationSender> = log.clone();
        let svc = NotificationService::new(repo, vec![sender], config());
        let sent = svc
            .broadcast(
                TenantId::new_v4(),
                vec![
                    NotificationRequest::email("a@example.com", "Aviso", "Evento adiado"),
                    NotificationRequest::email("not-an-email", "Aviso", "Evento adiado"),
                    sms("11987654321"),
                ],
            )
            .await;
        assert_eq!(sent.len(), 2);
        assert_eq!(log.sent(), 2);
    }
}
