//! # Payment Gateways
//!
//! Adapters to payment providers behind the [`PaymentGateway`] port.
//!
//! - [`SimulatedGateway`]: in-process sandbox
//! - [`HttpPaymentGateway`]: REST provider over the shared [`HttpClient`]
//! - [`WebhookVerifier`]: signed settlement callbacks

pub mod error;
pub mod http_client;
pub mod http_gateway;
pub mod simulated;
pub mod traits;
pub mod webhook;

pub use error::{GatewayError, GatewayResult};
pub use http_client::HttpClient;
pub use http_gateway::HttpPaymentGateway;
pub use simulated::SimulatedGateway;
pub use traits::{
    ChargeRequest, ChargeResponse, ChargeStatus, GatewayRefundRequest, GatewayRefundResponse,
    PaymentGateway,
};
pub use webhook::{SIGNATURE_HEADER, WebhookEvent, WebhookStatus, WebhookVerifier};
