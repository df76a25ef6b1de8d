//! # Treasury Service
//!
//! Posts money movements to the ledger and answers balance questions.
//!
//! # Posting Rules
//!
//! | Source | Entries |
//! |---|---|
//! | Ticket payment captured | credit gross (available after settlement days), debit fee (same date) |
//! | PDV sale | credit gross, debit fee; cash is available at once |
//! | PDV sale voided | debit the sale total immediately |
//! | Refund completed | debit the refund amount immediately |
//! | Cash sweep | debit available balance above the minimum |
//!
//! Payments attached to a PDV sale are skipped by [`TreasuryService::record_payment`];
//! the sale itself carries the revenue.

use crate::application::error::{ApplicationError, ApplicationResult};
use crate::domain::entities::{
    FeeSchedule, LedgerDirection, LedgerEntry, LedgerEntryKind, Refund, Sale, Transaction,
    TreasuryBalance,
};
use crate::domain::value_objects::{
    CheckedArithmetic, EventId, Money, PaymentMethod, TenantId, Timestamp,
};
use crate::infrastructure::persistence::LedgerRepository;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{info, instrument, warn};

/// Treasury settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TreasuryConfig {
    /// Fee per payment method.
    pub fees: FeeSchedule,
    /// Balance kept in the platform account after a sweep.
    pub sweep_minimum_balance: Money,
    /// Destination recorded on sweep entries.
    pub bank_account: String,
    /// Seconds between automatic sweeps; zero disables the loop.
    pub sweep_interval_secs: u64,
}

impl Default for TreasuryConfig {
    fn default() -> Self {
        Self {
            fees: FeeSchedule::default(),
            sweep_minimum_balance: Money::from_cents(100_000),
            bank_account: "0001/00000-0".to_string(),
            sweep_interval_secs: 3_600,
        }
    }
}

/// Ledger lines of a period with their totals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct Statement {
    /// Start of the period, inclusive.
    pub from: Option<Timestamp>,
    /// End of the period, inclusive.
    pub to: Option<Timestamp>,
    /// Entries in posting order.
    pub entries: Vec<LedgerEntry>,
    /// Sum of credits.
    pub total_credits: Money,
    /// Sum of debits.
    pub total_debits: Money,
    /// Credits minus debits.
    pub net: Decimal,
}

/// Ledger postings, balances and sweeps.
#[derive(Debug)]
pub struct TreasuryService {
    ledger: Arc<dyn LedgerRepository>,
    config: TreasuryConfig,
    sweep_lock: Mutex<()>,
}

impl TreasuryService {
    /// Creates a new treasury service.
    #[must_use]
    pub fn new(ledger: Arc<dyn LedgerRepository>, config: TreasuryConfig) -> Self {
        Self {
            ledger,
            config,
            sweep_lock: Mutex::new(()),
        }
    }

    /// Returns the configuration.
    #[inline]
    #[must_use]
    pub fn config(&self) -> &TreasuryConfig {
        &self.config
    }

    /// Fee charged for `amount` paid with `method`.
    ///
    /// # Errors
    ///
    /// Returns `ApplicationError::Domain` on arithmetic overflow.
    pub fn fee_for(&self, method: PaymentMethod, amount: Money) -> ApplicationResult<Money> {
        Ok(self.config.fees.fee_for(method, amount)?)
    }

    /// Posts a captured ticket payment. Returns the entries written, which are
    /// empty for payments that belong to a PDV sale.
    ///
    /// # Errors
    ///
    /// Returns an error if the transaction is not paid or the ledger fails.
    #[instrument(skip(self, tx), fields(transaction_id = %tx.id()))]
    pub async fn record_payment(&self, tx: &Transaction) -> ApplicationResult<Vec<LedgerEntry>> {
        if !tx.is_paid() {
            return Err(ApplicationError::validation(format!(
                "transaction {} is not paid",
                tx.id()
            )));
        }
        if tx.target().sale_id.is_some() {
            return Ok(Vec::new());
        }
        let reference = tx.id().to_string();
        self.post_revenue(
            tx.tenant_id(),
            Some(tx.event_id()),
            LedgerEntryKind::PaymentReceived,
            tx.method(),
            tx.amount(),
            &reference,
            format!("payment {reference} ({})", tx.method()),
        )
        .await
    }

    /// Posts the revenue of a PDV sale.
    ///
    /// # Errors
    ///
    /// Returns an error if the ledger fails.
    #[instrument(skip(self, sale), fields(sale_id = %sale.id()))]
    pub async fn record_sale(&self, sale: &Sale) -> ApplicationResult<Vec<LedgerEntry>> {
        if sale.total().is_zero() {
            return Ok(Vec::new());
        }
        let reference = sale.id().to_string();
        self.post_revenue(
            sale.tenant_id(),
            Some(sale.event_id()),
            LedgerEntryKind::SaleRevenue,
            sale.payment_method(),
            sale.total(),
            &reference,
            format!("pdv sale {reference} ({})", sale.payment_method()),
        )
        .await
    }

    /// Reverses a voided PDV sale.
    ///
    /// # Errors
    ///
    /// Returns an error if the ledger fails.
    #[instrument(skip(self, sale), fields(sale_id = %sale.id()))]
    pub async fn record_sale_reversal(&self, sale: &Sale) -> ApplicationResult<Option<LedgerEntry>> {
        if sale.total().is_zero() {
            return Ok(None);
        }
        let entry = LedgerEntry::new(
            sale.tenant_id(),
            Some(sale.event_id()),
            LedgerEntryKind::SaleReversal,
            LedgerDirection::Debit,
            sale.total(),
            Some(sale.id().to_string()),
            format!("pdv sale {} cancelled", sale.id()),
            Timestamp::now(),
        );
        self.ledger.append(&entry).await?;
        Ok(Some(entry))
    }

    /// Posts money returned to a payer.
    ///
    /// # Errors
    ///
    /// Returns an error if the ledger fails.
    #[instrument(skip(self, refund, tx), fields(refund_id = %refund.id()))]
    pub async fn record_refund(
        &self,
        refund: &Refund,
        tx: &Transaction,
    ) -> ApplicationResult<LedgerEntry> {
        let entry = LedgerEntry::new(
            refund.tenant_id(),
            Some(tx.event_id()),
            LedgerEntryKind::RefundIssued,
            LedgerDirection::Debit,
            refund.amount(),
            Some(refund.id().to_string()),
            format!("refund {} of payment {}", refund.id(), tx.id()),
            Timestamp::now(),
        );
        self.ledger.append(&entry).await?;
        Ok(entry)
    }

    /// Current balance of a tenant.
    ///
    /// # Errors
    ///
    /// Returns an error if the ledger fails.
    pub async fn balance(&self, tenant: TenantId) -> ApplicationResult<TreasuryBalance> {
        let entries = self.ledger.list(tenant, None, None).await?;
        Ok(TreasuryBalance::from_entries(&entries, Timestamp::now())?)
    }

    /// Entries created within `[from, to]` and their totals.
    ///
    /// # Errors
    ///
    /// Returns `ApplicationError::Validation` if `from` is after `to`.
    pub async fn statement(
        &self,
        tenant: TenantId,
        from: Option<Timestamp>,
        to: Option<Timestamp>,
    ) -> ApplicationResult<Statement> {
        if let (Some(from), Some(to)) = (from, to)
            && from.is_after(&to)
        {
            return Err(ApplicationError::validation("from must not be after to"));
        }
        let entries = self.ledger.list(tenant, from, to).await?;
        let mut total_credits = Money::ZERO;
        let mut total_debits = Money::ZERO;
        for entry in &entries {
            match entry.direction() {
                LedgerDirection::Credit => total_credits = total_credits.checked_add(entry.amount())?,
                LedgerDirection::Debit => total_debits = total_debits.checked_add(entry.amount())?,
            }
        }
        let net = total_credits.amount().safe_sub(total_debits.amount())?;
        Ok(Statement {
            from,
            to,
            entries,
            total_credits,
            total_debits,
            net,
        })
    }

    /// Moves the available balance above the configured minimum to the bank
    /// account. Returns `None` when there is nothing to sweep.
    ///
    /// Sweeps are serialized, so a manual sweep racing the periodic loop
    /// moves the excess only once.
    ///
    /// # Errors
    ///
    /// Returns an error if the ledger fails.
    #[instrument(skip(self))]
    pub async fn sweep(&self, tenant: TenantId) -> ApplicationResult<Option<LedgerEntry>> {
        let _guard = self.sweep_lock.lock().await;
        let balance = self.balance(tenant).await?;
        let excess = balance
            .available
            .safe_sub(self.config.sweep_minimum_balance.amount())?;
        if excess <= Decimal::ZERO {
            return Ok(None);
        }
        let amount = Money::new(excess.round_dp(2))?;
        let entry = LedgerEntry::new(
            tenant,
            None::<EventId>,
            LedgerEntryKind::CashSweep,
            LedgerDirection::Debit,
            amount,
            Some(self.config.bank_account.clone()),
            format!("sweep to {}", self.config.bank_account),
            Timestamp::now(),
        );
        self.ledger.append(&entry).await?;
        info!(%tenant, amount = %amount, "cash swept");
        Ok(Some(entry))
    }

    /// Sweeps every tenant with ledger activity. Failures are logged and the
    /// loop moves on to the next tenant.
    ///
    /// # Errors
    ///
    /// Returns an error only if the tenant list cannot be read.
    pub async fn sweep_all(&self) -> ApplicationResult<usize> {
        let mut swept = 0;
        for tenant in self.ledger.tenants().await? {
            match self.sweep(tenant).await {
                Ok(Some(_)) => swept += 1,
                Ok(None) => {}
                Err(e) => warn!(%tenant, error = %e, "sweep failed"),
            }
        }
        Ok(swept)
    }

    /// Spawns the periodic sweep. Returns `None` when the interval is zero.
    #[must_use]
    pub fn spawn_sweep_loop(self: Arc<Self>) -> Option<JoinHandle<()>> {
        if self.config.sweep_interval_secs == 0 {
            return None;
        }
        let period = Duration::from_secs(self.config.sweep_interval_secs);
        Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                match self.sweep_all().await {
                    Ok(swept) => info!(swept, "scheduled sweep finished"),
                    Err(e) => warn!(error = %e, "scheduled sweep failed"),
                }
            }
        }))
    }

    #[allow(clippy::too_many_arguments)]
    async fn post_revenue(
        &self,
        tenant: TenantId,
        event_id: Option<EventId>,
        kind: LedgerEntryKind,
        method: PaymentMethod,
        gross: Money,
        reference: &str,
        description: String,
    ) -> ApplicationResult<Vec<LedgerEntry>> {
        let available_at = Timestamp::now().add_days(method.settlement_days());
        let mut entries = vec![LedgerEntry::new(
            tenant,
            event_id,
            kind,
            LedgerDirection::Credit,
            gross,
            Some(reference.to_string()),
            description,
            available_at,
        )];
        let fee = self.fee_for(method, gross)?;
        if !fee.is_zero() {
            entries.push(LedgerEntry::new(
                tenant,
                event_id,
                LedgerEntryKind::ProcessingFee,
                LedgerDirection::Debit,
                fee,
                Some(reference.to_string()),
                format!("{method} fee for {reference}"),
                available_at,
            ));
        }
        for entry in &entries {
            self.ledger.append(entry).await?;
        }
        Ok(entries)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::domain::entities::{Payer, PaymentTarget, SaleItem};
    use crate::domain::value_objects::{ProductId, SaleId, UserId};
    use crate::infrastructure::persistence::in_memory::InMemoryLedgerRepository;
    use crate::infrastructure::persistence::RepositoryResult;
    use async_trait::async_trait;

    /// Ledger whose reads are slow enough for two sweeps to interleave.
    #[derive(Debug, Default)]
    struct SlowLedger {
        inner: InMemoryLedgerRepository,
    }

    #[async_trait]
    impl LedgerRepository for SlowLedger {
        async fn append(&self, entry: &LedgerEntry) -> RepositoryResult<()> {
            self.inner.append(entry).await
        }

        async fn list(
            &self,
            tenant: TenantId,
            from: Option<Timestamp>,
            to: Option<Timestamp>,
        ) -> RepositoryResult<Vec<LedgerEntry>> {
            tokio::time::sleep(Duration::from_millis(20)).await;
            self.inner.list(tenant, from, to).await
        }

        async fn tenants(&self) -> RepositoryResult<Vec<TenantId>> {
            self.inner.tenants().await
        }
    }

    fn service(minimum_cents: i64) -> TreasuryService {
        TreasuryService::new(
            Arc::new(InMemoryLedgerRepository::new()),
            TreasuryConfig {
                sweep_minimum_balance: Money::from_cents(minimum_cents),
                ..TreasuryConfig::default()
            },
        )
    }

    fn paid(tenant: TenantId, method: PaymentMethod, cents: i64, sale: Option<SaleId>) -> Transaction {
        let mut tx = Transaction::new(
            tenant,
            EventId::new_v4(),
            PaymentTarget {
                participant_id: None,
                sale_id: sale,
            },
            Money::from_cents(cents),
            method,
            1,
            Payer {
                name: "Ana".into(),
                email: "ana@example.com".into(),
                cpf: None,
            },
            None,
        )
        .unwrap();
        tx.mark_paid().unwrap();
        tx
    }

    fn cash_sale(tenant: TenantId, cents: i64) -> Sale {
        let item = SaleItem::new(ProductId::new_v4(), "Água", Money::from_cents(cents), 1).unwrap();
        Sale::new(
            tenant,
            EventId::new_v4(),
            vec![item],
            Money::ZERO,
            PaymentMethod::Cash,
            UserId::new_v4(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn card_payment_is_pending_until_settlement() {
        let treasury = service(0);
        let tenant = TenantId::new_v4();
        let entries = treasury
            .record_payment(&paid(tenant, PaymentMethod::CreditCard, 10_000, None))
            .await
            .unwrap();
        assert_eq!(entries.len(), 2);

        let balance = treasury.balance(tenant).await.unwrap();
        assert_eq!(balance.available, Decimal::ZERO);
        assert_eq!(balance.pending, Decimal::new(9_601, 2));
    }

    #[tokio::test]
    async fn sale_payments_are_not_double_counted() {
        let treasury = service(0);
        let tenant = TenantId::new_v4();
        let entries = treasury
            .record_payment(&paid(tenant, PaymentMethod::Pix, 5_000, Some(SaleId::new_v4())))
            .await
            .unwrap();
        assert!(entries.is_empty());
    }

    #[tokio::test]
    async fn cash_sale_and_reversal_net_to_zero() {
        let treasury = service(0);
        let tenant = TenantId::new_v4();
        let sale = cash_sale(tenant, 1_500);
        treasury.record_sale(&sale).await.unwrap();
        assert_eq!(
            treasury.balance(tenant).await.unwrap().available,
            Decimal::new(1_500, 2)
        );
        treasury.record_sale_reversal(&sale).await.unwrap();
        assert_eq!(treasury.balance(tenant).await.unwrap().available, Decimal::ZERO);
    }

    #[tokio::test]
    async fn sweep_keeps_the_minimum() {
        let treasury = service(1_000);
        let tenant = TenantId::new_v4();
        treasury.record_sale(&cash_sale(tenant, 4_000)).await.unwrap();

        let entry = treasury.sweep(tenant).await.unwrap().unwrap();
        assert_eq!(entry.amount(), Money::from_cents(3_000));
        assert_eq!(entry.kind(), LedgerEntryKind::CashSweep);
        assert_eq!(
            treasury.balance(tenant).await.unwrap().available,
            Decimal::new(1_000, 2)
        );
        assert!(treasury.sweep(tenant).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn concurrent_sweeps_move_the_excess_once() {
        let treasury = TreasuryService::new(
            Arc::new(SlowLedger::default()),
            TreasuryConfig {
                sweep_minimum_balance: Money::from_cents(100_000),
                ..TreasuryConfig::default()
            },
        );
        let tenant = TenantId::new_v4();
        treasury.record_sale(&cash_sale(tenant, 300_000)).await.unwrap();

        let (first, second) = tokio::join!(treasury.sweep(tenant), treasury.sweep(tenant));
        let swept: Vec<LedgerEntry> = [first.unwrap(), second.unwrap()]
            .into_iter()
            .flatten()
            .collect();
        assert_eq!(swept.len(), 1);
        assert_eq!(swept.first().unwrap().amount(), Money::from_cents(200_000));
        assert_eq!(
            treasury.balance(tenant).await.unwrap().available,
            Decimal::new(100_000, 2)
        );
    }

    #[tokio::test]
    async fn statement_totals() {
        let treasury = service(0);
        let tenant = TenantId::new_v4();
        treasury
            .record_payment(&paid(tenant, PaymentMethod::DebitCard, 10_000, None))
            .await
            .unwrap();
        let statement = treasury.statement(tenant, None, None).await.unwrap();
        assert_eq!(statement.total_credits, Money::from_cents(10_000));
        assert_eq!(statement.total_debits, Money::from_cents(199));
        assert_eq!(statement.net, Decimal::new(9_801, 2));

        let later = Timestamp::now().add_days(1);
        assert!(
            treasury
                .statement(tenant, Some(later), Some(Timestamp::now()))
                .await
                .unwrap_err()
                .is_validation()
        );
    }

    #[tokio::test]
    async fn unpaid_transactions_are_refused() {
        let treasury = service(0);
        let tenant = TenantId::new_v4();
        let tx = Transaction::new(
            tenant,
            EventId::new_v4(),
            PaymentTarget::default(),
            Money::from_cents(100),
            PaymentMethod::Pix,
            1,
            Payer {
                name: "Ana".into(),
                email: "ana@example.com".into(),
                cpf: None,
            },
            None,
        )
        .unwrap();
        assert!(treasury.record_payment(&tx).await.is_err());
    }
}
