//! # HTTP Client
//!
//! Shared outbound HTTP client for the payment gateway, SMS and push
//! providers.
//!
//! Wraps `reqwest` with a fixed timeout, JSON bodies and a mapping of
//! transport failures and HTTP status codes onto [`GatewayError`] so callers
//! can decide what is worth retrying.
//!
//! # Examples
//!
//! ```ignore
//! use eventos::infrastructure::gateways::http_client::HttpClient;
//!
//! let client = HttpClient::new(5000)?;
//! let status: ProviderStatus = client.get("https://api.example.com/status").await?;
//! ```

use crate::infrastructure::gateways::error::{GatewayError, GatewayResult};
use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::time::Duration;

/// HTTP client wrapper for provider adapters.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    timeout_ms: u64,
}

impl HttpClient {
    /// Creates a new HTTP client with the specified timeout.
    ///
    /// # Errors
    ///
    /// Returns `GatewayError::Internal` if the client cannot be created.
    pub fn new(timeout_ms: u64) -> GatewayResult<Self> {
        Self::with_headers(timeout_ms, HeaderMap::new())
    }

    /// Creates a new HTTP client sending `default_headers` on every request.
    ///
    /// # Errors
    ///
    /// Returns `GatewayError::Internal` if the client cannot be created.
    pub fn with_headers(timeout_ms: u64, default_headers: HeaderMap) -> GatewayResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .default_headers(default_headers)
            .build()
            .map_err(|e| GatewayError::internal(format!("failed to create HTTP client: {e}")))?;

        Ok(Self { client, timeout_ms })
    }

    /// Returns the configured timeout in milliseconds.
    #[inline]
    #[must_use]
    pub fn timeout_ms(&self) -> u64 {
        self.timeout_ms
    }

    /// Makes a GET request and deserializes the JSON response.
    ///
    /// # Errors
    ///
    /// Returns a transport or status error, or `GatewayError::Protocol` if
    /// the response cannot be parsed.
    pub async fn get<T: DeserializeOwned>(&self, url: &str) -> GatewayResult<T> {
        let response = self.send(self.client.get(url)).await?;
        Self::parse(response).await
    }

    /// Makes a POST request with a JSON body and deserializes the response.
    ///
    /// # Errors
    ///
    /// Returns a transport or status error, or `GatewayError::Protocol` if
    /// the response cannot be parsed.
    pub async fn post<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        url: &str,
        body: &B,
    ) -> GatewayResult<T> {
        self.post_with_headers(url, body, HeaderMap::new()).await
    }

    /// Makes a POST request with a JSON body and extra headers.
    ///
    /// # Errors
    ///
    /// Returns a transport or status error, or `GatewayError::Protocol` if
    /// the response cannot be parsed.
    pub async fn post_with_headers<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        url: &str,
        body: &B,
        headers: HeaderMap,
    ) -> GatewayResult<T> {
        let response = self
            .send(self.client.post(url).json(body).headers(headers))
            .await?;
        Self::parse(response).await
    }

    /// Makes a POST request and discards the response body.
    ///
    /// # Errors
    ///
    /// Returns a transport or status error.
    pub async fn post_and_forget<B: Serialize + ?Sized>(
        &self,
        url: &str,
        body: &B,
        headers: HeaderMap,
    ) -> GatewayResult<()> {
        self.send(self.client.post(url).json(body).headers(headers))
            .await
            .map(drop)
    }

    /// Returns `true` if a GET to `url` answers with a 2xx status.
    pub async fn health_check(&self, url: &str) -> bool {
        match self.client.get(url).send().await {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }

    async fn send(&self, request: RequestBuilder) -> GatewayResult<Response> {
        let response = request.send().await.map_err(map_reqwest_error)?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let retry_after_ms = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok())
            .map(|secs| secs.saturating_mul(1000));
        let body = response.text().await.unwrap_or_default();
        Err(map_status_error(status, &body, retry_after_ms))
    }

    async fn parse<T: DeserializeOwned>(response: Response) -> GatewayResult<T> {
        response
            .json::<T>()
            .await
            .map_err(|e| GatewayError::protocol(format!("failed to parse response: {e}")))
    }
}

fn map_reqwest_error(error: reqwest::Error) -> GatewayError {
    if error.is_timeout() {
        GatewayError::timeout("request timed out")
    } else if error.is_connect() {
        GatewayError::connection(format!("connection failed: {error}"))
    } else {
        GatewayError::connection(format!("HTTP request failed: {error}"))
    }
}

fn map_status_error(status: StatusCode, body: &str, retry_after_ms: Option<u64>) -> GatewayError {
    match status {
        StatusCode::BAD_REQUEST | StatusCode::NOT_FOUND | StatusCode::CONFLICT => {
            GatewayError::invalid_request(format!("{status}: {body}"))
        }
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            GatewayError::authentication(format!("authentication failed: {body}"))
        }
        StatusCode::PAYMENT_REQUIRED | StatusCode::UNPROCESSABLE_ENTITY => {
            GatewayError::declined(body.to_string(), None)
        }
        StatusCode::TOO_MANY_REQUESTS => {
            GatewayError::rate_limited("rate limit exceeded", retry_after_ms)
        }
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => {
            GatewayError::timeout(format!("provider timeout ({status})"))
        }
        s if s.is_server_error() => GatewayError::connection(format!("server error ({s}): {body}")),
        _ => GatewayError::protocol(format!("HTTP error ({status}): {body}")),
    }
}
