//! # Refund Orchestrator
//!
//! Drives a refund from request to money back in the payer's account.
//!
//! ```text
//! request ─► RefundPolicy ─┬─ Reject ──────────────► Rejected
//!                          ├─ Review ──► UnderReview ─► approve / reject
//!                          └─ AutoApprove ─► Approved ─► process
//!
//! process: Processing ─► gateway (retry) ─┬─► Completed ─► transaction, treasury, payer
//!                                         └─► Failed ─► retry
//! ```
//!
//! Requests are serialized so two concurrent requests cannot both fit in the
//! same refundable amount: the amount still held by open refunds is
//! subtracted before the policy runs.

use crate::application::error::{ApplicationError, ApplicationResult};
use crate::application::services::audit::AuditLog;
use crate::application::services::notification_service::{NotificationRequest, NotificationService};
use crate::application::services::retry::RetryConfig;
use crate::application::services::treasury_service::TreasuryService;
use crate::domain::entities::{Refund, Transaction};
use crate::domain::events::{RefundCompleted, RefundRejected, RefundRequested};
use crate::domain::services::{
    FraudScorer, RefundDecision, RefundPolicy, RefundRequestContext, RefundRiskInput,
};
use crate::domain::value_objects::{
    Money, RefundId, RefundState, TenantId, Timestamp, TransactionId, TransactionStatus, UserId,
};
use crate::infrastructure::gateways::{GatewayRefundRequest, PaymentGateway};
use crate::infrastructure::persistence::{
    EventRepository, Page, RefundRepository, RepositoryError, TransactionRepository,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, instrument, warn};

/// Attempts at writing the refunded amount when the transaction changes
/// underneath.
const TRANSACTION_WRITE_ATTEMPTS: u32 = 3;

/// Body of a refund request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct RefundRequest {
    /// Transaction to refund.
    pub transaction_id: TransactionId,
    /// Amount to return; everything still refundable when omitted.
    #[serde(default)]
    pub amount: Option<Money>,
    /// Why the payer wants the money back.
    pub reason: String,
}

/// Refund use cases.
#[derive(Debug)]
pub struct RefundOrchestrator {
    refunds: Arc<dyn RefundRepository>,
    transactions: Arc<dyn TransactionRepository>,
    events: Arc<dyn EventRepository>,
    gateway: Arc<dyn PaymentGateway>,
    treasury: Arc<TreasuryService>,
    notifications: Arc<NotificationService>,
    audit: AuditLog,
    policy: RefundPolicy,
    scorer: FraudScorer,
    retry: RetryConfig,
    request_lock: Mutex<()>,
}

impl RefundOrchestrator {
    /// Creates an orchestrator.
    #[allow(clippy::too_many_arguments)]
    #[must_use]
    pub fn new(
        refunds: Arc<dyn RefundRepository>,
        transactions: Arc<dyn TransactionRepository>,
        events: Arc<dyn EventRepository>,
        gateway: Arc<dyn PaymentGateway>,
        treasury: Arc<TreasuryService>,
        notifications: Arc<NotificationService>,
        audit: AuditLog,
        policy: RefundPolicy,
        retry: RetryConfig,
    ) -> Self {
        Self {
            refunds,
            transactions,
            events,
            gateway,
            treasury,
            notifications,
            audit,
            policy,
            scorer: FraudScorer::default(),
            retry,
            request_lock: Mutex::new(()),
        }
    }

    /// Policy in force.
    #[must_use]
    pub fn policy(&self) -> &RefundPolicy {
        &self.policy
    }

    async fn transaction(&self, tenant: TenantId, id: TransactionId) -> ApplicationResult<Transaction> {
        self.transactions
            .get(tenant, id)
            .await?
            .ok_or_else(|| ApplicationError::not_found("Transaction", id))
    }

    async fn load(&self, tenant: TenantId, id: RefundId) -> ApplicationResult<Refund> {
        self.refunds
            .get(tenant, id)
            .await?
            .ok_or_else(|| ApplicationError::not_found("Refund", id))
    }

    /// Sum of refunds on the transaction that may still move money.
    fn outstanding(refunds: &[Refund]) -> ApplicationResult<Money> {
        refunds
            .iter()
            .filter(|r| r.state().is_outstanding())
            .try_fold(Money::ZERO, |acc, r| acc.checked_add(r.amount()))
            .map_err(ApplicationError::from)
    }

    async fn payer_refunds(&self, tx: &Transaction) -> ApplicationResult<u32> {
        let history = self
            .transactions
            .list_by_payer(tx.tenant_id(), &tx.payer().email)
            .await?;
        let count = history
            .iter()
            .filter(|t| {
                t.id() != tx.id()
                    && matches!(
                        t.status(),
                        TransactionStatus::PartiallyRefunded | TransactionStatus::Refunded
                    )
            })
            .count();
        Ok(u32::try_from(count).unwrap_or(u32::MAX))
    }

    /// Requests a refund and runs it through the policy.
    ///
    /// Auto-approved refunds are processed before returning; the returned
    /// refund is then Completed or Failed.
    ///
    /// # Errors
    ///
    /// - `ApplicationError::NotFound` for an unknown transaction
    /// - `ApplicationError::Domain` if the transaction is not refundable or
    ///   the amount exceeds what is left
    #[instrument(skip(self, request), fields(transaction_id = %request.transaction_id))]
    pub async fn request(
        &self,
        tenant: TenantId,
        requested_by: UserId,
        request: RefundRequest,
    ) -> ApplicationResult<Refund> {
        let guard = self.request_lock.lock().await;

        let tx = self.transaction(tenant, request.transaction_id).await?;
        let event = self
            .events
            .get(tenant, tx.event_id())
            .await?
            .ok_or_else(|| ApplicationError::not_found("Event", tx.event_id()))?;
        let existing = self.refunds.list_by_transaction(tenant, tx.id()).await?;
        let outstanding = Self::outstanding(&existing)?;
        let amount = request
            .amount
            .unwrap_or_else(|| tx.refundable_amount().saturating_sub(outstanding));

        let mut refund = Refund::request(tenant, tx.id(), amount, request.reason, requested_by)?;
        let now = Timestamp::now();
        let paid_at = tx.paid_at().unwrap_or_else(|| tx.created_at());
        let risk = self.scorer.assess_refund(&RefundRiskInput {
            amount,
            transaction_amount: tx.amount(),
            hours_since_payment: paid_at.hours_until(&now),
            prior_refunds: self.payer_refunds(&tx).await?,
            transaction_fraud_score: tx.fraud_score(),
        });
        refund.set_risk_score(risk.score);

        let decision = self.policy.evaluate(&RefundRequestContext {
            transaction: &tx,
            event_starts_at: event.starts_at(),
            amount,
            outstanding,
            risk_score: risk.score,
            now,
        })?;

        match decision {
            RefundDecision::Reject(reason) => {
                refund.reject(None, reason.clone())?;
                self.refunds.save(&refund).await?;
                self.audit
                    .record(&RefundRejected::new(tenant, refund.id(), reason))
                    .await;
                info!(refund_id = %refund.id(), "refund rejected by policy");
                Ok(refund)
            }
            RefundDecision::Review(note) => {
                refund.send_to_review(note)?;
                self.refunds.save(&refund).await?;
                self.record_requested(&refund).await;
                info!(refund_id = %refund.id(), score = risk.score, "refund sent to review");
                Ok(refund)
            }
            RefundDecision::AutoApprove => {
                refund.approve(None)?;
                self.refunds.save(&refund).await?;
                self.record_requested(&refund).await;
                drop(guard);
                self.process(refund).await
            }
        }
    }

    async fn record_requested(&self, refund: &Refund) {
        self.audit
            .record(&RefundRequested::new(
                refund.tenant_id(),
                refund.id(),
                refund.transaction_id(),
                refund.amount(),
                refund.risk_score(),
            ))
            .await;
    }

    /// Approves a refund under review and processes it.
    ///
    /// # Errors
    ///
    /// Returns `ApplicationError::Domain` unless the refund is under review.
    #[instrument(skip(self))]
    pub async fn approve(&self, tenant: TenantId, id: RefundId, reviewer: UserId) -> ApplicationResult<Refund> {
        let mut refund = self.load(tenant, id).await?;
        refund.approve(Some(reviewer))?;
        self.refunds.save(&refund).await?;
        self.process(refund).await
    }

    /// Rejects a refund under review.
    ///
    /// # Errors
    ///
    /// - `ApplicationError::Validation` for a blank reason
    /// - `ApplicationError::Domain` unless the refund is under review
    #[instrument(skip(self, reason))]
    pub async fn reject(
        &self,
        tenant: TenantId,
        id: RefundId,
        reviewer: UserId,
        reason: &str,
    ) -> ApplicationResult<Refund> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(ApplicationError::validation("rejection reason is required"));
        }
        let mut refund = self.load(tenant, id).await?;
        refund.reject(Some(reviewer), reason)?;
        self.refunds.save(&refund).await?;
        self.audit
            .record(&RefundRejected::new(tenant, id, reason))
            .await;
        Ok(refund)
    }

    /// Sends a failed refund to the gateway again.
    ///
    /// # Errors
    ///
    /// Returns `ApplicationError::Domain` unless the refund failed before.
    pub async fn retry(&self, tenant: TenantId, id: RefundId) -> ApplicationResult<Refund> {
        let refund = self.load(tenant, id).await?;
        if refund.state() != RefundState::Failed {
            return Err(ApplicationError::conflict(format!(
                "refund {id} is {} and cannot be retried",
                refund.state()
            )));
        }
        self.process(refund).await
    }

    /// Gets a refund.
    ///
    /// # Errors
    ///
    /// Returns `ApplicationError::NotFound` if it does not exist in the tenant.
    pub async fn get(&self, tenant: TenantId, id: RefundId) -> ApplicationResult<Refund> {
        self.load(tenant, id).await
    }

    /// Lists refunds, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the repository fails.
    pub async fn list(
        &self,
        tenant: TenantId,
        state: Option<RefundState>,
        page: Page,
    ) -> ApplicationResult<Vec<Refund>> {
        Ok(self.refunds.list(tenant, state, page).await?)
    }

    /// Refunds of one transaction, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the repository fails.
    pub async fn list_for_transaction(
        &self,
        tenant: TenantId,
        transaction_id: TransactionId,
    ) -> ApplicationResult<Vec<Refund>> {
        Ok(self.refunds.list_by_transaction(tenant, transaction_id).await?)
    }

    /// Runs one gateway attempt for an approved or failed refund.
    ///
    /// A gateway failure is stored on the refund, which is returned in the
    /// Failed state rather than as an error.
    #[instrument(skip(self, refund), fields(refund_id = %refund.id()))]
    async fn process(&self, mut refund: Refund) -> ApplicationResult<Refund> {
        let tenant = refund.tenant_id();
        let tx = self.transaction(tenant, refund.transaction_id()).await?;
        refund.start_processing()?;
        self.refunds.save(&refund).await?;

        let gateway_refund_id = match tx.gateway_reference() {
            Some(charge_reference) => {
                let call = GatewayRefundRequest {
                    refund_id: refund.id(),
                    charge_reference: charge_reference.to_string(),
                    amount: refund.amount(),
                };
                match self
                    .retry
                    .run("gateway.refund", || self.gateway.refund(&call))
                    .await
                {
                    Ok(response) => response.reference,
                    Err(e) => {
                        refund.fail(e.to_string())?;
                        self.refunds.save(&refund).await?;
                        warn!(attempts = refund.attempts(), error = %e, "refund failed");
                        return Ok(refund);
                    }
                }
            }
            // Cash and transfers are returned over the counter.
            None => format!("manual-{}", refund.id()),
        };

        let tx = self.apply_to_transaction(&refund).await?;
        refund.complete(gateway_refund_id.clone())?;
        self.refunds.save(&refund).await?;
        self.treasury.record_refund(&refund, &tx).await?;
        self.audit
            .record(&RefundCompleted::new(
                tenant,
                refund.id(),
                refund.amount(),
                gateway_refund_id,
            ))
            .await;
        self.notify_payer(&refund, &tx).await;
        info!(amount = %refund.amount(), "refund completed");
        Ok(refund)
    }

    /// Adds the refund to the transaction, reloading it when a concurrent
    /// writer got there first.
    async fn apply_to_transaction(&self, refund: &Refund) -> ApplicationResult<Transaction> {
        let mut attempt = 1;
        loop {
            let mut tx = self.transaction(refund.tenant_id(), refund.transaction_id()).await?;
            tx.apply_refund(refund.amount())?;
            match self.transactions.save(&tx).await {
                Ok(()) => return Ok(tx),
                Err(RepositoryError::VersionConflict { .. }) if attempt < TRANSACTION_WRITE_ATTEMPTS => {
                    attempt += 1;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    async fn notify_payer(&self, refund: &Refund, tx: &Transaction) {
        let message = NotificationRequest::email(
            tx.payer().email.clone(),
            "Reembolso concluído",
            format!(
                "Olá {}, o reembolso de {} referente ao pagamento {} foi concluído.",
                tx.payer().name,
                refund.amount(),
                tx.id()
            ),
        );
        if let Err(e) = self.notifications.send(refund.tenant_id(), message).await {
            warn!(refund_id = %refund.id(), error = %e, "payer not notified");
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::application::services::notification_service::NotificationConfig;
    use crate::application::services::treasury_service::TreasuryConfig;
    use crate::domain::entities::transaction::tests::payer;
    use crate::domain::entities::{Event, EventDetails, PaymentTarget};
    use crate::domain::services::RefundPolicyConfig;
    use crate::domain::value_objects::{EventId, PaymentMethod};
    use crate::infrastructure::gateways::SimulatedGateway;
    use crate::infrastructure::notifications::{LogSender, NotificationSender};
    use crate::infrastructure::persistence::in_memory::{
        InMemoryEventRepository, InMemoryEventStore, InMemoryLedgerRepository,
        InMemoryNotificationRepository, InMemoryRefundRepository, InMemoryTransactionRepository,
    };

    struct Fixture {
        orchestrator: RefundOrchestrator,
        gateway: SimulatedGateway,
        transactions: Arc<InMemoryTransactionRepository>,
        treasury: Arc<TreasuryService>,
        log: Arc<LogSender>,
        tenant: TenantId,
        event: EventId,
    }

    async fn fixture(starts_in_days: i64) -> Fixture {
        let tenant = TenantId::new_v4();
        let events = Arc::new(InMemoryEventRepository::new());
        let starts_at = Timestamp::now().add_days(starts_in_days);
        let event = Event::new(
            tenant,
            EventDetails {
                name: "Feira".into(),
                description: None,
                venue: "Pavilhão".into(),
                starts_at,
                ends_at: starts_at.add_hours(6),
                capacity: None,
            },
        )
        .unwrap();
        events.save(&event).await.unwrap();

        let gateway = SimulatedGateway::new();
        let transactions = Arc::new(InMemoryTransactionRepository::new());
        let treasury = Arc::new(TreasuryService::new(
            Arc::new(InMemoryLedgerRepository::new()),
            TreasuryConfig::default(),
        ));
        let log = Arc::new(LogSender::new());
        let sender: Arc<dyn NotificationSender> = log.clone();
        let notifications = Arc::new(NotificationService::new(
            Arc::new(InMemoryNotificationRepository::new()),
            vec![sender],
            NotificationConfig::default(),
        ));
        let orchestrator = RefundOrchestrator::new(
            Arc::new(InMemoryRefundRepository::new()),
            transactions.clone(),
            events,
            Arc::new(gateway.clone()),
            treasury.clone(),
            notifications,
            AuditLog::new(Arc::new(InMemoryEventStore::new())),
            RefundPolicy::new(RefundPolicyConfig::default()),
            RetryConfig::immediate(2),
        );
        Fixture {
            orchestrator,
            gateway,
            transactions,
            treasury,
            log,
            tenant,
            event: event.id(),
        }
    }

    async fn paid(f: &Fixture, cents: i64) -> Transaction {
        let mut tx = Transaction::new(
            f.tenant,
            f.event,
            PaymentTarget::default(),
            Money::from_cents(cents),
            PaymentMethod::Pix,
            1,
            payer(),
            None,
        )
        .unwrap();
        tx.attach_gateway_response("sim_ch_1", None, None);
        tx.mark_paid().unwrap();
        f.transactions.save(&tx).await.unwrap();
        tx
    }

    fn ask(tx: &Transaction, cents: Option<i64>) -> RefundRequest {
        RefundRequest {
            transaction_id: tx.id(),
            amount: cents.map(Money::from_cents),
            reason: "desistência".into(),
        }
    }

    #[tokio::test]
    async fn small_refund_is_approved_and_completed() {
        let f = fixture(30).await;
        let tx = paid(&f, 10_000).await;
        let refund = f
            .orchestrator
            .request(f.tenant, UserId::new_v4(), ask(&tx, Some(4_000)))
            .await
            .unwrap();

        assert_eq!(refund.state(), RefundState::Completed);
        assert!(refund.gateway_refund_id().is_some());
        let stored = f.transactions.get(f.tenant, tx.id()).await.unwrap().unwrap();
        assert_eq!(stored.status(), TransactionStatus::PartiallyRefunded);
        assert_eq!(stored.refunded_amount(), Money::from_cents(4_000));
        assert_eq!(f.log.sent(), 1);
        let balance = f.treasury.balance(f.tenant).await.unwrap();
        assert!(balance.total < rust_decimal::Decimal::ZERO);
    }

    #[tokio::test]
    async fn large_refund_waits_for_review() {
        let f = fixture(30).await;
        let tx = paid(&f, 100_000).await;
        let refund = f
            .orchestrator
            .request(f.tenant, UserId::new_v4(), ask(&tx, None))
            .await
            .unwrap();
        assert_eq!(refund.state(), RefundState::UnderReview);
        assert_eq!(refund.amount(), Money::from_cents(100_000));
        assert_eq!(f.gateway.refund_calls(), 0);

        let done = f
            .orchestrator
            .approve(f.tenant, refund.id(), UserId::new_v4())
            .await
            .unwrap();
        assert_eq!(done.state(), RefundState::Completed);
        let stored = f.transactions.get(f.tenant, tx.id()).await.unwrap().unwrap();
        assert_eq!(stored.status(), TransactionStatus::Refunded);
    }

    #[tokio::test]
    async fn pending_refunds_count_against_the_refundable_amount() {
        let f = fixture(30).await;
        let tx = paid(&f, 100_000).await;
        f.orchestrator
            .request(f.tenant, UserId::new_v4(), ask(&tx, Some(80_000)))
            .await
            .unwrap();
        let err = f
            .orchestrator
            .request(f.tenant, UserId::new_v4(), ask(&tx, Some(30_000)))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ApplicationError::Domain(crate::domain::errors::DomainError::RefundExceedsAvailable { .. })
        ));
    }

    #[tokio::test]
    async fn gateway_failure_leaves_a_retryable_refund() {
        let f = fixture(30).await;
        let tx = paid(&f, 5_000).await;
        f.gateway.fail_next_refunds(2);
        let refund = f
            .orchestrator
            .request(f.tenant, UserId::new_v4(), ask(&tx, Some(1_000)))
            .await
            .unwrap();
        assert_eq!(refund.state(), RefundState::Failed);
        assert_eq!(refund.attempts(), 1);
        assert!(refund.last_error().is_some());

        let retried = f.orchestrator.retry(f.tenant, refund.id()).await.unwrap();
        assert_eq!(retried.state(), RefundState::Completed);
        assert_eq!(retried.attempts(), 2);
        assert!(f.orchestrator.retry(f.tenant, refund.id()).await.unwrap_err().is_conflict());
    }

    #[tokio::test]
    async fn reviewer_can_reject() {
        let f = fixture(30).await;
        let tx = paid(&f, 100_000).await;
        let refund = f
            .orchestrator
            .request(f.tenant, UserId::new_v4(), ask(&tx, None))
            .await
            .unwrap();
        assert!(
            f.orchestrator
                .reject(f.tenant, refund.id(), UserId::new_v4(), "  ")
                .await
                .unwrap_err()
                .is_validation()
        );
        let rejected = f
            .orchestrator
            .reject(f.tenant, refund.id(), UserId::new_v4(), "ingresso utilizado")
            .await
            .unwrap();
        assert_eq!(rejected.state(), RefundState::Rejected);
        assert_eq!(rejected.rejection_reason(), Some("ingresso utilizado"));
        let listed = f
            .orchestrator
            .list(f.tenant, Some(RefundState::Rejected), Page::default())
            .await
            .unwrap();
        assert_eq!(listed.len(), 1);
    }

    #[tokio::test]
    async fn unknown_transaction_is_not_found() {
        let f = fixture(30).await;
        let err = f
            .orchestrator
            .request(
                f.tenant,
                UserId::new_v4(),
                RefundRequest {
                    transaction_id: TransactionId::new_v4(),
                    amount: None,
                    reason: "x".into(),
                },
            )
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }
}
