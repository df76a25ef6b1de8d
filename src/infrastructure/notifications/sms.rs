//! # HTTP SMS Sender
//!
//! Delivers SMS and WhatsApp notifications through a REST messaging
//! provider: `POST {base_url}/messages` with
//! `{"channel", "to", "body"}` and a bearer API key.

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
struct OutboundSms<'a> {
    channel: &'static str,
    to: String,
    body: &'a str,
}

/// Normalizes a Brazilian phone number to E.164.
fn to_e164(raw: &str) -> DeliveryResult<String> {
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    let national = digits.strip_prefix("55").filter(|d| d.len() >= 10).unwrap_or(digits.as_str());
    if !(10..=11).contains(&national.len()) {
        return Err(DeliveryError::Rejected(format!("invalid phone number: {raw}")));
    }
    Ok(format!("+55{national}"))
}

/// SMS/WhatsApp sender over HTTP.
#[derive(Debug, Clone)]
pub struct HttpSmsSender {
    client: HttpClient,
    url: String,
}

impl HttpSmsSender {
    /// Creates a sender for the provider at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns `DeliveryError::Configuration` for an invalid API key.
    pub fn new(base_url: &str, api_key: &str, timeout_ms: u64) -> DeliveryResult<Self> {
        let mut headers = HeaderMap::new();
        let auth = HeaderValue::from_str(&format!("Bearer {api_key}"))
            .map_err(|e| DeliveryError::Configuration(e.to_string()))?;
        headers.insert(AUTHORIZATION, auth);
        let client = HttpClient::with_headers(timeout_ms, headers).map_err(DeliveryError::from)?;
        Ok(Self {
            client,
            url: format!("{}/messages", base_url.trim_end_matches('/')),
        })
    }
}

#[async_trait]
impl NotificationSender for HttpSmsSender {
    fn channels(&self) -> &[NotificationChannel] {
        &[NotificationChannel::Sms, NotificationChannel::WhatsApp]
    }

    async fn send(&self, notification: &Notification) -> DeliveryResult<()> {
        let body = OutboundSms {
            channel: match notification.channel() {
                NotificationChannel::WhatsApp => "whatsapp",
                _ => "sms",
            },
            to: to_e164(notification.recipient())?,
            body: notification.body(),
        };
        Ok(self
            .client
            .post_and_forget(&self.url, &body, HeaderMap::new())
            .await?)
    }
}
