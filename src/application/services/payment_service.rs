//! # Payment Service
//!
//! Charges payers through the [`PaymentGateway`] and keeps the transaction,
//! the treasury and the linked participant in step.
//!
//! # Flow
//!
//! 1. Validate the request and score it with the [`FraudScorer`].
//!    High-risk payments are stored as failed and refused.
//! 2. Store the transaction as Pending, so a webhook racing the response
//!    can find it.
//! 3. Gateway methods are charged with retry; the transaction id doubles
//!    as idempotency key so a retried charge is not duplicated.
//! 4. Approved charges are marked paid, posted to the treasury and confirm
//!    the participant. PIX and boleto stay Pending until a webhook or a
//!    manual confirmation arrives.

use crate::application::error::{ApplicationError, ApplicationResult};
use crate::application::services::audit::AuditLog;
use crate::application::services::retry::RetryConfig;
use crate::application::services::treasury_service::TreasuryService;
use crate::domain::entities::{Payer, PaymentTarget, Transaction};
use crate::domain::errors::DomainError;
use crate::domain::events::{PaymentConfirmed, PaymentFailed};
use crate::domain::services::{FraudScorer, PaymentRiskInput, RiskLevel};
use crate::domain::value_objects::{
    EventId, Money, ParticipantId, PaymentMethod, SaleId, TenantId, Timestamp, TransactionId,
    TransactionStatus,
};
use crate::infrastructure::gateways::{
    ChargeRequest, ChargeStatus, GatewayError, PaymentGateway, WebhookStatus, WebhookVerifier,
};
use crate::infrastructure::persistence::{
    EventRepository, Page, ParticipantRepository, SaleRepository, TransactionFilter,
    TransactionRepository,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Payment settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaymentConfig {
    /// Backoff for gateway charges.
    pub retry: RetryConfig,
    /// Window, in hours, of the payer velocity check.
    pub velocity_window_hours: i64,
}

impl Default for PaymentConfig {
    fn default() -> Self {
        Self {
            retry: RetryConfig::default(),
            velocity_window_hours: 1,
        }
    }
}

/// Body of a new payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct CreatePayment {
    /// Event the money belongs to.
    pub event_id: EventId,
    /// Ticket being paid, if any.
    #[serde(default)]
    pub participant_id: Option<ParticipantId>,
    /// PDV sale being paid, if any.
    #[serde(default)]
    pub sale_id: Option<SaleId>,
    /// Amount to charge.
    pub amount: Money,
    /// Payment method.
    pub method: PaymentMethod,
    /// Card installments; 1 for everything else.
    #[serde(default = "one")]
    pub installments: u8,
    /// Who pays.
    pub payer: Payer,
    /// Free text shown on the statement.
    #[serde(default)]
    pub description: Option<String>,
    /// Tokenized card, for card payments.
    #[serde(default)]
    pub card_token: Option<String>,
}

const fn one() -> u8 {
    1
}

/// What a webhook did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WebhookOutcome {
    /// The transaction changed state.
    Applied,
    /// The transaction was already in that state or past it.
    Ignored,
}

/// Payment use cases.
#[derive(Debug)]
pub struct PaymentService {
    events: Arc<dyn EventRepository>,
    participants: Arc<dyn ParticipantRepository>,
    sales: Arc<dyn SaleRepository>,
    transactions: Arc<dyn TransactionRepository>,
    gateway: Arc<dyn PaymentGateway>,
    treasury: Arc<TreasuryService>,
    webhooks: WebhookVerifier,
    scorer: FraudScorer,
    audit: AuditLog,
    config: PaymentConfig,
}

impl PaymentService {
    /// Creates a payment service.
    #[allow(clippy::too_many_arguments)]
    #[must_use]
    pub fn new(
        events: Arc<dyn EventRepository>,
        participants: Arc<dyn ParticipantRepository>,
        sales: Arc<dyn SaleRepository>,
        transactions: Arc<dyn TransactionRepository>,
        gateway: Arc<dyn PaymentGateway>,
        treasury: Arc<TreasuryService>,
        webhooks: WebhookVerifier,
        audit: AuditLog,
        config: PaymentConfig,
    ) -> Self {
        Self {
            events,
            participants,
            sales,
            transactions,
            gateway,
            treasury,
            webhooks,
            scorer: FraudScorer::default(),
            audit,
            config,
        }
    }

    /// Name of the configured gateway.
    #[must_use]
    pub fn gateway_name(&self) -> &str {
        self.gateway.name()
    }

    async fn check_target(&self, tenant: TenantId, request: &CreatePayment) -> ApplicationResult<()> {
        let event = self
            .events
            .get(tenant, request.event_id)
            .await?
            .ok_or_else(|| ApplicationError::not_found("Event", request.event_id))?;
        if event.status().is_terminal() {
            return Err(ApplicationError::conflict(format!(
                "event {} is {} and takes no payments",
                event.id(),
                event.status()
            )));
        }
        if let Some(pid) = request.participant_id {
            let participant = self
                .participants
                .get(tenant, pid)
                .await?
                .filter(|p| p.event_id() == request.event_id)
                .ok_or_else(|| ApplicationError::not_found("Participant", pid))?;
            if !participant.is_active() {
                return Err(DomainError::not_allowed("registration is cancelled").into());
            }
        }
        if let Some(sale_id) = request.sale_id {
            self.sales
                .get(tenant, sale_id)
                .await?
                .filter(|s| s.event_id() == request.event_id)
                .ok_or_else(|| ApplicationError::not_found("Sale", sale_id))?;
        }
        Ok(())
    }

    async fn prior_refunds(&self, tenant: TenantId, email: &str) -> ApplicationResult<u32> {
        let history = self.transactions.list_by_payer(tenant, email).await?;
        let refunded = history
            .iter()
            .filter(|t| {
                matches!(
                    t.status(),
                    TransactionStatus::PartiallyRefunded | TransactionStatus::Refunded
                )
            })
            .count();
        Ok(u32::try_from(refunded).unwrap_or(u32::MAX))
    }

    /// Creates and charges a payment.
    ///
    /// Declined charges are returned as Failed transactions, not errors.
    ///
    /// # Errors
    ///
    /// - `ApplicationError::Domain` for invalid amounts, installments or payer,
    ///   and for payments refused as high risk
    /// - `ApplicationError::NotFound` for an unknown event, participant or sale
    /// - `ApplicationError::Gateway` if the gateway stays unreachable
    #[instrument(skip(self, request), fields(method = %request.method, amount = %request.amount))]
    pub async fn create(&self, tenant: TenantId, request: CreatePayment) -> ApplicationResult<Transaction> {
        self.check_target(tenant, &request).await?;

        let mut tx = Transaction::new(
            tenant,
            request.event_id,
            PaymentTarget {
                participant_id: request.participant_id,
                sale_id: request.sale_id,
            },
            request.amount,
            request.method,
            request.installments,
            request.payer,
            request.description,
        )?;

        let since = Timestamp::now().add_hours(-self.config.velocity_window_hours);
        let email = tx.payer().email.clone();
        let recent = self.transactions.count_by_payer_since(tenant, &email, since).await?;
        let assessment = self.scorer.assess(&PaymentRiskInput {
            amount: tx.amount(),
            method: tx.method(),
            installments: tx.installments(),
            has_cpf: tx.payer().cpf.is_some(),
            recent_payer_transactions: recent,
            prior_refunds: self.prior_refunds(tenant, &email).await?,
        });
        tx.set_fraud_score(assessment.score);

        if assessment.level == RiskLevel::High {
            let reason = format!("refused by fraud screening: {}", assessment.reasons.join(", "));
            tx.mark_failed(reason.clone())?;
            self.transactions.save(&tx).await?;
            self.audit.record(&PaymentFailed::new(tenant, tx.id(), &reason)).await;
            warn!(transaction_id = %tx.id(), score = assessment.score, "payment refused");
            return Err(DomainError::not_allowed(reason).into());
        }

        self.transactions.save(&tx).await?;
        if !tx.method().uses_gateway() {
            info!(transaction_id = %tx.id(), "awaiting manual confirmation");
            return Ok(tx);
        }

        let charge = ChargeRequest::from_transaction(&tx, request.card_token);
        let result = self
            .config
            .retry
            .run("gateway.charge", || self.gateway.charge(&charge))
            .await;

        let response = match result {
            Ok(response) => response,
            Err(e) => {
                tx.mark_failed(e.to_string())?;
                self.transactions.save(&tx).await?;
                self.audit.record(&PaymentFailed::new(tenant, tx.id(), e.to_string())).await;
                if matches!(
                    e,
                    GatewayError::Declined { .. } | GatewayError::InvalidRequest { .. }
                ) {
                    return Ok(tx);
                }
                return Err(e.into());
            }
        };

        tx.attach_gateway_response(
            response.reference.clone(),
            response.pix_code.clone(),
            response.boleto_line.clone(),
        );
        match response.status {
            ChargeStatus::Approved => {
                tx.mark_paid()?;
                self.transactions.save(&tx).await?;
                self.settle(&tx, "gateway").await?;
            }
            ChargeStatus::Authorized => {
                tx.authorize()?;
                self.transactions.save(&tx).await?;
                info!(transaction_id = %tx.id(), reference = %response.reference, "charge authorized");
            }
            ChargeStatus::Pending => {
                self.transactions.save(&tx).await?;
                info!(transaction_id = %tx.id(), reference = %response.reference, "charge pending");
            }
            ChargeStatus::Declined => {
                let reason = response.message.unwrap_or_else(|| "declined".to_string());
                tx.mark_failed(reason.clone())?;
                self.transactions.save(&tx).await?;
                self.audit.record(&PaymentFailed::new(tenant, tx.id(), reason)).await;
            }
        }
        Ok(tx)
    }

    /// Posts a freshly paid transaction everywhere it matters.
    async fn settle(&self, tx: &Transaction, source: &str) -> ApplicationResult<()> {
        self.treasury.record_payment(tx).await?;
        if let Some(pid) = tx.target().participant_id
            && let Some(mut participant) = self.participants.get(tx.tenant_id(), pid).await?
        {
            match participant.confirm() {
                Ok(()) => self.participants.save(&participant).await?,
                Err(e) => warn!(participant_id = %pid, error = %e, "participant not confirmed"),
            }
        }
        self.audit
            .record(&PaymentConfirmed::new(
                tx.tenant_id(),
                tx.id(),
                tx.amount(),
                tx.method(),
                source,
            ))
            .await;
        info!(transaction_id = %tx.id(), source, "payment confirmed");
        Ok(())
    }

    async fn load(&self, tenant: TenantId, id: TransactionId) -> ApplicationResult<Transaction> {
        self.transactions
            .get(tenant, id)
            .await?
            .ok_or_else(|| ApplicationError::not_found("Transaction", id))
    }

    /// Gets a transaction.
    ///
    /// # Errors
    ///
    /// Returns `ApplicationError::NotFound` if it does not exist in the tenant.
    pub async fn get(&self, tenant: TenantId, id: TransactionId) -> ApplicationResult<Transaction> {
        self.load(tenant, id).await
    }

    /// Lists transactions, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the repository fails.
    pub async fn list(
        &self,
        tenant: TenantId,
        filter: TransactionFilter,
        page: Page,
    ) -> ApplicationResult<Vec<Transaction>> {
        Ok(self.transactions.list(tenant, filter, page).await?)
    }

    /// Confirms a bank transfer or cash payment by hand.
    ///
    /// # Errors
    ///
    /// - `ApplicationError::Validation` for gateway methods
    /// - `ApplicationError::Domain` unless the transaction is pending
    #[instrument(skip(self))]
    pub async fn confirm(&self, tenant: TenantId, id: TransactionId) -> ApplicationResult<Transaction> {
        let mut tx = self.load(tenant, id).await?;
        if !tx.method().requires_manual_confirmation() {
            return Err(ApplicationError::validation(format!(
                "{} payments are confirmed by the gateway",
                tx.method()
            )));
        }
        tx.mark_paid()?;
        self.transactions.save(&tx).await?;
        self.settle(&tx, "manual").await?;
        Ok(tx)
    }

    /// Cancels a payment that has not been captured.
    ///
    /// # Errors
    ///
    /// Returns `ApplicationError::Domain` unless Pending or Authorized.
    pub async fn cancel(&self, tenant: TenantId, id: TransactionId) -> ApplicationResult<Transaction> {
        let mut tx = self.load(tenant, id).await?;
        tx.cancel()?;
        self.transactions.save(&tx).await?;
        info!(transaction_id = %id, "payment cancelled");
        Ok(tx)
    }

    /// Applies a signed provider notification.
    ///
    /// Replays are harmless: a transaction already past Pending is left
    /// alone and the call reports [`WebhookOutcome::Ignored`]. The
    /// transaction is returned either way.
    ///
    /// # Errors
    ///
    /// - `ApplicationError::Gateway` for a bad signature or body
    /// - `ApplicationError::NotFound` for an unknown reference
    #[instrument(skip(self, signature, body))]
    pub async fn apply_webhook(
        &self,
        signature: &str,
        body: &[u8],
    ) -> ApplicationResult<(WebhookOutcome, Transaction)> {
        let event = self.webhooks.open(signature, body)?;
        let mut tx = self
            .transactions
            .find_by_gateway_reference(&event.reference)
            .await?
            .ok_or_else(|| ApplicationError::not_found("Transaction", &event.reference))?;

        if !matches!(
            tx.status(),
            TransactionStatus::Pending | TransactionStatus::Authorized
        ) {
            info!(reference = %event.reference, status = %tx.status(), "webhook replay ignored");
            return Ok((WebhookOutcome::Ignored, tx));
        }

        match event.status {
            WebhookStatus::Paid => {
                tx.mark_paid()?;
                self.transactions.save(&tx).await?;
                self.settle(&tx, "webhook").await?;
            }
            WebhookStatus::Failed => {
                let reason = event.reason.unwrap_or_else(|| "failed at provider".to_string());
                tx.mark_failed(reason.clone())?;
                self.transactions.save(&tx).await?;
                self.audit.record(&PaymentFailed::new(tx.tenant_id(), tx.id(), reason)).await;
            }
            WebhookStatus::Cancelled => {
                tx.cancel()?;
                self.transactions.save(&tx).await?;
            }
        }
        Ok((WebhookOutcome::Applied, tx))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod tests {
    use super::*;
    use crate::application::services::treasury_service::TreasuryConfig;
    use crate::domain::entities::{Event, EventDetails, Participant, ParticipantDetails};
    use crate::domain::value_objects::ParticipantStatus;
    use crate::infrastructure::gateways::SimulatedGateway;
    use crate::infrastructure::persistence::in_memory::{
        InMemoryEventRepository, InMemoryEventStore, InMemoryLedgerRepository,
        InMemoryParticipantRepository, InMemorySaleRepository, InMemoryTransactionRepository,
    };

    pub(crate) const SECRET: &str = "whsec_test";

    pub(crate) struct Fixture {
        pub(crate) service: PaymentService,
        pub(crate) gateway: SimulatedGateway,
        pub(crate) participants: Arc<InMemoryParticipantRepository>,
        pub(crate) transactions: Arc<InMemoryTransactionRepository>,
        pub(crate) events: Arc<InMemoryEventRepository>,
        pub(crate) treasury: Arc<TreasuryService>,
        pub(crate) audit: AuditLog,
        pub(crate) tenant: TenantId,
        pub(crate) event: Event,
    }

    pub(crate) async fn fixture() -> Fixture {
        let tenant = TenantId::new_v4();
        let events = Arc::new(InMemoryEventRepository::new());
        let starts_at = Timestamp::now().add_days(20);
        let mut event = Event::new(
            tenant,
            EventDetails {
                name: "Festival".into(),
                description: None,
                venue: "Parque".into(),
                starts_at,
                ends_at: starts_at.add_hours(10),
                capacity: None,
            },
        )
        .unwrap();
        event.publish().unwrap();
        events.save(&event).await.unwrap();

        let gateway = SimulatedGateway::new();
        let participants = Arc::new(InMemoryParticipantRepository::new());
        let transactions = Arc::new(InMemoryTransactionRepository::new());
        let treasury = Arc::new(TreasuryService::new(
            Arc::new(InMemoryLedgerRepository::new()),
            TreasuryConfig::default(),
        ));
        let audit = AuditLog::new(Arc::new(InMemoryEventStore::new()));
        let service = PaymentService::new(
            events.clone(),
            participants.clone(),
            Arc::new(InMemorySaleRepository::new()),
            transactions.clone(),
            Arc::new(gateway.clone()),
            treasury.clone(),
            WebhookVerifier::new(SECRET),
            audit.clone(),
            PaymentConfig {
                retry: RetryConfig::immediate(3),
                velocity_window_hours: 1,
            },
        );
        Fixture {
            service,
            gateway,
            participants,
            transactions,
            events,
            treasury,
            audit,
            tenant,
            event,
        }
    }

    pub(crate) fn request(event: EventId, method: PaymentMethod, cents: i64) -> CreatePayment {
        CreatePayment {
            event_id: event,
            participant_id: None,
            sale_id: None,
            amount: Money::from_cents(cents),
            method,
            installments: 1,
            payer: Payer {
                name: "Ana Lima".into(),
                email: "ana@example.com".into(),
                cpf: Some("529.982.247-25".parse().unwrap()),
            },
            description: None,
            card_token: Some("tok_visa".into()),
        }
    }

    #[tokio::test]
    async fn approved_card_is_paid_and_confirms_the_ticket() {
        let f = fixture().await;
        let participant = Participant::register(
            f.tenant,
            f.event.id(),
            ParticipantDetails {
                name: "Ana Lima".into(),
                email: "ana@example.com".into(),
                cpf: None,
                phone: None,
                ticket_type: None,
            },
        )
        .unwrap();
        f.participants.save(&participant).await.unwrap();

        let mut req = request(f.event.id(), PaymentMethod::CreditCard, 20_000);
        req.participant_id = Some(participant.id());
        let tx = f.service.create(f.tenant, req).await.unwrap();

        assert_eq!(tx.status(), TransactionStatus::Paid);
        assert!(tx.gateway_reference().is_some());
        let stored = f.participants.get(f.tenant, participant.id()).await.unwrap().unwrap();
        assert_eq!(stored.status(), ParticipantStatus::Confirmed);
        let balance = f.treasury.balance(f.tenant).await.unwrap();
        assert!(balance.pending > rust_decimal::Decimal::ZERO);
    }

    #[tokio::test]
    async fn declined_card_is_a_failed_transaction() {
        let f = fixture().await;
        let mut req = request(f.event.id(), PaymentMethod::CreditCard, 5_000);
        req.card_token = Some("tok_decline".into());
        let tx = f.service.create(f.tenant, req).await.unwrap();
        assert_eq!(tx.status(), TransactionStatus::Failed);
        assert_eq!(tx.failure_reason(), Some("card declined by issuer"));
    }

    #[tokio::test]
    async fn transient_gateway_failures_are_retried() {
        let f = fixture().await;
        f.gateway.fail_next_charges(2);
        let tx = f
            .service
            .create(f.tenant, request(f.event.id(), PaymentMethod::DebitCard, 5_000))
            .await
            .unwrap();
        assert_eq!(tx.status(), TransactionStatus::Paid);
        assert_eq!(f.gateway.charge_calls(), 3);
    }

    #[tokio::test]
    async fn unreachable_gateway_fails_the_transaction() {
        let f = fixture().await;
        f.gateway.fail_next_charges(5);
        let err = f
            .service
            .create(f.tenant, request(f.event.id(), PaymentMethod::DebitCard, 5_000))
            .await
            .unwrap_err();
        assert!(matches!(err, ApplicationError::Gateway(_)));
        let stored = f
            .service
            .list(f.tenant, TransactionFilter::default(), Page::default())
            .await
            .unwrap();
        assert_eq!(stored.first().unwrap().status(), TransactionStatus::Failed);
    }

    #[tokio::test]
    async fn pix_waits_for_the_webhook() {
        let f = fixture().await;
        let tx = f
            .service
            .create(f.tenant, request(f.event.id(), PaymentMethod::Pix, 7_500))
            .await
            .unwrap();
        assert_eq!(tx.status(), TransactionStatus::Pending);
        assert!(tx.pix_code().is_some());

        let body = serde_json::to_vec(&serde_json::json!({
            "reference": tx.gateway_reference().unwrap(),
            "status": "PAID",
        }))
        .unwrap();
        let signature = WebhookVerifier::new(SECRET).sign(&body).unwrap();

        assert_eq!(
            f.service.apply_webhook(&signature, &body).await.unwrap().0,
            WebhookOutcome::Applied
        );
        assert_eq!(
            f.service.apply_webhook(&signature, &body).await.unwrap().0,
            WebhookOutcome::Ignored
        );
        let stored = f.service.get(f.tenant, tx.id()).await.unwrap();
        assert_eq!(stored.status(), TransactionStatus::Paid);
        let statement = f
            .treasury
            .statement(f.tenant, Some(Timestamp::now().sub_days(1)), Some(Timestamp::now().add_days(1)))
            .await
            .unwrap();
        assert_eq!(statement.entries.len(), 2);
    }

    #[tokio::test]
    async fn forged_webhooks_are_rejected() {
        let f = fixture().await;
        let body = br#"{"reference":"sim_ch_x","status":"PAID"}"#;
        let signature = WebhookVerifier::new("other").sign(body).unwrap();
        let err = f.service.apply_webhook(&signature, body).await.unwrap_err();
        assert!(matches!(err, ApplicationError::Gateway(_)));
    }

    #[tokio::test]
    async fn cash_needs_manual_confirmation() {
        let f = fixture().await;
        let tx = f
            .service
            .create(f.tenant, request(f.event.id(), PaymentMethod::Cash, 3_000))
            .await
            .unwrap();
        assert_eq!(tx.status(), TransactionStatus::Pending);
        assert_eq!(f.gateway.charge_calls(), 0);

        let paid = f.service.confirm(f.tenant, tx.id()).await.unwrap();
        assert!(paid.is_paid());
        assert!(f.service.confirm(f.tenant, tx.id()).await.unwrap_err().is_conflict());
    }

    #[tokio::test]
    async fn card_payments_cannot_be_confirmed_by_hand() {
        let f = fixture().await;
        let tx = f
            .service
            .create(f.tenant, request(f.event.id(), PaymentMethod::Pix, 3_000))
            .await
            .unwrap();
        assert!(f.service.confirm(f.tenant, tx.id()).await.unwrap_err().is_validation());
        let cancelled = f.service.cancel(f.tenant, tx.id()).await.unwrap();
        assert_eq!(cancelled.status(), TransactionStatus::Cancelled);
    }

    #[tokio::test]
    async fn high_risk_payments_are_refused() {
        let f = fixture().await;
        let mut req = request(f.event.id(), PaymentMethod::CreditCard, 600_000);
        req.installments = 12;
        req.payer.cpf = None;
        let err = f.service.create(f.tenant, req).await.unwrap_err();
        assert!(matches!(
            err,
            ApplicationError::Domain(DomainError::NotAllowed(_))
        ));
        assert_eq!(f.gateway.charge_calls(), 0);
        let failed = f
            .transactions
            .list(
                f.tenant,
                TransactionFilter {
                    status: Some(TransactionStatus::Failed),
                    ..TransactionFilter::default()
                },
                Page::default(),
            )
            .await
            .unwrap();
        assert_eq!(failed.len(), 1);
        assert!(f.audit.count().await.unwrap() >= 1);
    }

    #[tokio::test]
    async fn cancelled_events_take_no_payments() {
        let f = fixture().await;
        let mut event = f.event.clone();
        event.cancel("chuva").unwrap();
        f.events.save(&event).await.unwrap();
        let err = f
            .service
            .create(f.tenant, request(event.id(), PaymentMethod::Pix, 1_000))
            .await
            .unwrap_err();
        assert!(err.is_conflict());
    }
}
