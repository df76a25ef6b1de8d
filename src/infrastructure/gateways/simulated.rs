//! # Simulated Gateway
//!
//! Sandbox [`PaymentGateway`] used in development and tests.
//!
//! - Cards are approved unless the card token contains `decline`.
//! - PIX and boleto charges are pending and carry generated payment codes.
//! - Failures can be injected for the next N charges or refunds.

use crate::domain::value_objects::PaymentMethod;
use crate::infrastructure::gateways::error::{GatewayError, GatewayResult};
use crate::infrastructure::gateways::traits::{
    ChargeRequest, ChargeResponse, ChargeStatus, GatewayRefundRequest, GatewayRefundResponse,
    PaymentGateway,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;
use uuid::Uuid;

#[derive(Debug, Default)]
struct Injected {
    charge_failures: u32,
    refund_failures: u32,
    unhealthy: bool,
}

/// In-process sandbox gateway.
#[derive(Debug, Clone, Default)]
pub struct SimulatedGateway {
    injected: Arc<Mutex<Injected>>,
    charges: Arc<AtomicU64>,
    refunds: Arc<AtomicU64>,
}

impl SimulatedGateway {
    /// Creates a gateway that approves everything.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next `count` charges fail with a connection error.
    pub fn fail_next_charges(&self, count: u32) {
        self.injected.lock().charge_failures = count;
    }

    /// Makes the next `count` refunds fail with a connection error.
    pub fn fail_next_refunds(&self, count: u32) {
        self.injected.lock().refund_failures = count;
    }

    /// Sets the health check result.
    pub fn set_unhealthy(&self, unhealthy: bool) {
        self.injected.lock().unhealthy = unhealthy;
    }

    /// Number of charge calls received.
    #[must_use]
    pub fn charge_calls(&self) -> u64 {
        self.charges.load(Ordering::Relaxed)
    }

    /// Number of refund calls received.
    #[must_use]
    pub fn refund_calls(&self) -> u64 {
        self.refunds.load(Ordering::Relaxed)
    }

    fn take_failure(counter: &mut u32) -> bool {
        if *counter > 0 {
            *counter -= 1;
            true
        } else {
            false
        }
    }
}

/// PIX "copia e cola" payload for a charge.
fn pix_code(reference: &str, request: &ChargeRequest) -> String {
    format!(
        "00020126580014BR.GOV.BCB.PIX0136{reference}5204000053039865406{}5802BR6009SAO PAULO6304",
        request.amount.amount()
    )
}

/// 47-digit boleto line derived from the reference.
fn boleto_line(reference: &Uuid) -> String {
    let digits: String = reference
        .as_bytes()
        .iter()
        .map(|b| char::from(b'0' + b % 10))
        .collect();
    format!("23790{digits}{}", "0".repeat(26))
        .chars()
        .take(47)
        .collect()
}

#[async_trait]
impl PaymentGateway for SimulatedGateway {
    fn name(&self) -> &str {
        "simulated"
    }

    async fn charge(&self, request: &ChargeRequest) -> GatewayResult<ChargeResponse> {
        self.charges.fetch_add(1, Ordering::Relaxed);
        if Self::take_failure(&mut self.injected.lock().charge_failures) {
            return Err(GatewayError::connection("simulated charge failure"));
        }
        if request.amount.is_zero() {
            return Err(GatewayError::invalid_request("amount must be positive"));
        }

        let id = Uuid::new_v4();
        let reference = format!("sim_ch_{}", id.simple());
        debug!(%reference, method = %request.method, "simulated charge");

        let response = match request.method {
            PaymentMethod::CreditCard | PaymentMethod::DebitCard => {
                let declined = request
                    .card_token
                    .as_deref()
                    .is_some_and(|t| t.to_ascii_lowercase().contains("decline"));
                ChargeResponse {
                    reference,
                    status: if declined {
                        ChargeStatus::Declined
                    } else {
                        ChargeStatus::Approved
                    },
                    pix_code: None,
                    boleto_line: None,
                    message: declined.then(|| "card declined by issuer".to_string()),
                }
            }
            PaymentMethod::Pix => ChargeResponse {
                pix_code: Some(pix_code(&reference, request)),
                reference,
                status: ChargeStatus::Pending,
                boleto_line: None,
                message: None,
            },
            PaymentMethod::Boleto => ChargeResponse {
                reference,
                status: ChargeStatus::Pending,
                pix_code: None,
                boleto_line: Some(boleto_line(&id)),
                message: None,
            },
            PaymentMethod::BankTransfer | PaymentMethod::Cash => {
                return Err(GatewayError::invalid_request(format!(
                    "{} is not processed by the gateway",
                    request.method
                )));
            }
        };
        Ok(response)
    }

    async fn refund(
        &self,
        request: &GatewayRefundRequest,
    ) -> GatewayResult<GatewayRefundResponse> {
        self.refunds.fetch_add(1, Ordering::Relaxed);
        if Self::take_failure(&mut self.injected.lock().refund_failures) {
            return Err(GatewayError::connection("simulated refund failure"));
        }
        Ok(GatewayRefundResponse {
            reference: format!("sim_rf_{}", request.refund_id.as_uuid().simple()),
        })
    }

    async fn health_check(&self) -> bool {
        !self.injected.lock().unhealthy
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::domain::value_objects::{Money, RefundId, TransactionId};

    fn request(method: PaymentMethod, token: Option<&str>) -> ChargeRequest {
        ChargeRequest {
            transaction_id: TransactionId::new_v4(),
            amount: Money::from_cents(5_000),
            method,
            installments: 1,
            payer_name: "Ana".to_string(),
            payer_email: "ana@example.com".to_string(),
            payer_cpf: None,
            card_token: token.map(str::to_string),
            description: None,
        }
    }

    #[tokio::test]
    async fn cards_approve_unless_token_declines() {
        let gateway = SimulatedGateway::new();
        let ok = gateway
            .charge(&request(PaymentMethod::CreditCard, Some("tok_visa")))
            .await
            .unwrap();
        assert_eq!(ok.status, ChargeStatus::Approved);

        let declined = gateway
            .charge(&request(PaymentMethod::DebitCard, Some("tok_decline")))
            .await
            .unwrap();
        assert_eq!(declined.status, ChargeStatus::Declined);
        assert_eq!(gateway.charge_calls(), 2);
    }

    #[tokio::test]
    async fn pix_and_boleto_are_pending_with_codes() {
        let gateway = SimulatedGateway::new();
        let pix = gateway.charge(&request(PaymentMethod::Pix, None)).await.unwrap();
        assert_eq!(pix.status, ChargeStatus::Pending);
        assert!(pix.pix_code.unwrap().contains(&pix.reference));

        let boleto = gateway
            .charge(&request(PaymentMethod::Boleto, None))
            .await
            .unwrap();
        assert_eq!(boleto.boleto_line.unwrap().len(), 47);
    }

    #[tokio::test]
    async fn manual_methods_are_refused() {
        let gateway = SimulatedGateway::new();
        let err = gateway
            .charge(&request(PaymentMethod::Cash, None))
            .await
            .unwrap_err();
        assert!(err.is_client_error());
    }

    #[tokio::test]
    async fn injected_refund_failures_run_out() {
        let gateway = SimulatedGateway::new();
        gateway.fail_next_refunds(1);
        let req = GatewayRefundRequest {
            refund_id: RefundId::new_v4(),
            charge_reference: "sim_ch_1".to_string(),
            amount: Money::from_cents(100),
        };
        assert!(gateway.refund(&req).await.unwrap_err().is_retryable());
        assert!(gateway.refund(&req).await.is_ok());
        assert_eq!(gateway.refund_calls(), 2);
    }
}
