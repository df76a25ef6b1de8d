//! # HTTP Payment Gateway
//!
//! [`PaymentGateway`] for a REST payment provider.
//!
//! Endpoints, relative to the configured base URL:
//!
//! | Call | Request |
//! |---|---|
//! | charge | `POST /charges` |
//! | refund | `POST /refunds` |
//! | health | `GET /health` |
//!
//! Requests carry `Authorization: Bearer <api key>` and an
//! `Idempotency-Key` equal to our transaction or refund id.

use crate::infrastructure::gateways::error::{GatewayError, GatewayResult};
use crate::infrastructure::gateways::http_client::HttpClient;
use crate::infrastructure::gateways::traits::{
    ChargeRequest, ChargeResponse, GatewayRefundRequest, GatewayRefundResponse, PaymentGateway,
};
use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use tracing::{instrument, warn};

/// REST payment provider adapter.
#[derive(Debug, Clone)]
pub struct HttpPaymentGateway {
    client: HttpClient,
    base_url: String,
}

impl HttpPaymentGateway {
    /// Creates an adapter for the provider at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns `GatewayError::Internal` if the API key is not a valid header
    /// value or the client cannot be built.
    pub fn new(base_url: impl Into<String>, api_key: &str, timeout_ms: u64) -> GatewayResult<Self> {
        let mut headers = HeaderMap::new();
        let auth = HeaderValue::from_str(&format!("Bearer {api_key}"))
            .map_err(|e| GatewayError::internal(format!("invalid api key: {e}")))?;
        headers.insert(AUTHORIZATION, auth);
        Ok(Self {
            client: HttpClient::with_headers(timeout_ms, headers)?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn idempotency(key: impl ToString) -> GatewayResult<HeaderMap> {
        let mut headers = HeaderMap::new();
        let value = HeaderValue::from_str(&key.to_string())
            .map_err(|e| GatewayError::internal(e.to_string()))?;
        headers.insert("Idempotency-Key", value);
        Ok(headers)
    }
}

#[async_trait]
impl PaymentGateway for HttpPaymentGateway {
    fn name(&self) -> &str {
        "http"
    }

    #[instrument(skip(self, request), fields(transaction_id = %request.transaction_id, method = %request.method))]
    async fn charge(&self, request: &ChargeRequest) -> GatewayResult<ChargeResponse> {
        let headers = Self::idempotency(request.transaction_id)?;
        self.client
            .post_with_headers(&self.url("/charges"), request, headers)
            .await
            .inspect_err(|e| warn!(error = %e, "charge call failed"))
    }

    #[instrument(skip(self, request), fields(refund_id = %request.refund_id))]
    async fn refund(
        &self,
        request: &GatewayRefundRequest,
    ) -> GatewayResult<GatewayRefundResponse> {
        let headers = Self::idempotency(request.refund_id)?;
        self.client
            .post_with_headers(&self.url("/refunds"), request, headers)
            .await
    }

    async fn health_check(&self) -> bool {
        self.client.health_check(&self.url("/health")).await
    }
}
