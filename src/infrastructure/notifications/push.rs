//! # HTTP Push Sender
//!
//! Delivers push notifications to a device token through a REST push
//! service: `POST {base_url}/push` with `{"token", "title", "body"}`.

use crate::domain::entities::Notification;
use crate::domain::value_objects::NotificationChannel;
use crate::infrastructure::gateways::HttpClient;
use crate::infrastructure::notifications::traits::{
    DeliveryError, DeliveryResult, NotificationSender,
};
use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use serde::Serialize;

#[derive(Debug, Serialize)]
struct PushMessage<'a> {
    token: &'a str,
    title: &'a str,
    body: &'a str,
}

/// Push sender over HTTP.
#[derive(Debug, Clone)]
pub struct HttpPushSender {
    client: HttpClient,
    url: String,
    default_title: String,
}

impl HttpPushSender {
    /// Creates a sender for the service at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns `DeliveryError::Configuration` for an invalid server key.
    pub fn new(
        base_url: &str,
        server_key: &str,
        default_title: impl Into<String>,
        timeout_ms: u64,
    ) -> DeliveryResult<Self> {
        let mut headers = HeaderMap::new();
        let auth = HeaderValue::from_str(&format!("key={server_key}"))
            .map_err(|e| DeliveryError::Configuration(e.to_string()))?;
        headers.insert(AUTHORIZATION, auth);
        Ok(Self {
            client: HttpClient::with_headers(timeout_ms, headers)?,
            url: format!("{}/push", base_url.trim_end_matches('/')),
            default_title: default_title.into(),
        })
    }
}

#[async_trait]
impl NotificationSender for HttpPushSender {
    fn channels(&self) -> &[NotificationChannel] {
        &[NotificationChannel::Push]
    }

    async fn send(&self, notification: &Notification) -> DeliveryResult<()> {
        let message = PushMessage {
            token: notification.recipient(),
            title: notification.subject().unwrap_or(&self.default_title),
            body: notification.body(),
        };
        Ok(self
            .client
            .post_and_forget(&self.url, &message, HeaderMap::new())
            .await?)
    }
}
