//! # Event Analytics
//!
//! Aggregations behind the event dashboard and the door statistics.
//!
//! Both are pure folds over already-loaded rows so they can be cached and
//! tested without a store.

use crate::domain::entities::{CheckinLog, Event, Participant, Refund, Sale, Transaction};
use crate::domain::value_objects::{
    ArithmeticResult, CheckinMethod, EventId, Money, PaymentMethod, ProductId, RefundState,
    Timestamp,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};

/// Number of products listed in [`EventDashboard::top_products`].
pub const TOP_PRODUCTS: usize = 5;

/// Door statistics for one event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct CheckinStats {
    /// Active registrations.
    pub registered: usize,
    /// Distinct participants who entered at least once.
    pub checked_in: usize,
    /// Participants currently inside.
    pub currently_inside: usize,
    /// `checked_in / registered` as a percentage with two decimals.
    pub attendance_rate: Decimal,
    /// Entries per identification method.
    pub by_method: BTreeMap<CheckinMethod, usize>,
    /// Entries per UTC hour of day.
    pub by_hour: BTreeMap<u32, usize>,
}

impl CheckinStats {
    /// Folds participants and check-in logs of one event.
    #[must_use]
    pub fn compute(participants: &[Participant], checkins: &[CheckinLog]) -> Self {
        let registered = participants.iter().filter(|p| p.is_active()).count();
        let distinct: HashSet<_> = checkins.iter().map(CheckinLog::participant_id).collect();
        let currently_inside = checkins.iter().filter(|c| c.is_active()).count();

        let mut by_method = BTreeMap::new();
        let mut by_hour = BTreeMap::new();
        for log in checkins {
            *by_method.entry(log.method()).or_insert(0) += 1;
            *by_hour.entry(log.checked_in_at().hour()).or_insert(0) += 1;
        }

        Self {
            registered,
            checked_in: distinct.len(),
            currently_inside,
            attendance_rate: percentage(distinct.len(), registered),
            by_method,
            by_hour,
        }
    }
}

/// Units and revenue of one product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct ProductSales {
    /// Product.
    pub product_id: ProductId,
    /// Name at sale time.
    pub name: String,
    /// Units sold.
    pub quantity: u32,
    /// Revenue before sale-level discounts.
    pub revenue: Money,
}

/// Dashboard of one event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct EventDashboard {
    /// Event.
    pub event_id: EventId,
    /// Event name.
    pub event_name: String,
    /// Door statistics.
    pub attendance: CheckinStats,
    /// Cancelled registrations.
    pub cancelled_participants: usize,
    /// Completed PDV sales.
    pub sales_count: usize,
    /// Revenue of completed PDV sales.
    pub pdv_revenue: Money,
    /// Captured payments not tied to a PDV sale.
    pub ticket_revenue: Money,
    /// `pdv_revenue + ticket_revenue`.
    pub gross_revenue: Money,
    /// Completed refunds.
    pub refunded: Money,
    /// `gross_revenue − refunded`, floored at zero.
    pub net_revenue: Money,
    /// Gross revenue per payment method.
    pub revenue_by_method: BTreeMap<PaymentMethod, Money>,
    /// Best sellers by units.
    pub top_products: Vec<ProductSales>,
    /// When the dashboard was computed.
    pub generated_at: Timestamp,
}

/// Rows an [`EventDashboard`] is folded from.
#[derive(Debug, Clone, Copy)]
pub struct DashboardInput<'a> {
    /// The event.
    pub event: &'a Event,
    /// All participants, cancelled included.
    pub participants: &'a [Participant],
    /// All check-in logs.
    pub checkins: &'a [CheckinLog],
    /// All sales, cancelled included.
    pub sales: &'a [Sale],
    /// All transactions of the event.
    pub transactions: &'a [Transaction],
    /// All refunds of those transactions.
    pub refunds: &'a [Refund],
}

impl EventDashboard {
    /// Folds the dashboard.
    ///
    /// # Errors
    ///
    /// Returns an `ArithmeticError` on overflow.
    pub fn compute(input: &DashboardInput<'_>) -> ArithmeticResult<Self> {
        let attendance = CheckinStats::compute(input.participants, input.checkins);
        let mut revenue_by_method: BTreeMap<PaymentMethod, Money> = BTreeMap::new();

        let completed_sales: Vec<&Sale> = input.sales.iter().filter(|s| s.is_completed()).collect();
        let mut pdv_revenue = Money::ZERO;
        let mut products: HashMap<ProductId, ProductSales> = HashMap::new();
        for sale in &completed_sales {
            pdv_revenue = pdv_revenue.checked_add(sale.total())?;
            let slot = revenue_by_method.entry(sale.payment_method()).or_default();
            *slot = slot.checked_add(sale.total())?;
            for item in sale.items() {
                let entry = products
                    .entry(item.product_id())
                    .or_insert_with(|| ProductSales {
                        product_id: item.product_id(),
                        name: item.name().to_string(),
                        quantity: 0,
                        revenue: Money::ZERO,
                    });
                entry.quantity = entry.quantity.saturating_add(item.quantity());
                entry.revenue = entry.revenue.checked_add(item.line_total())?;
            }
        }

        let mut ticket_revenue = Money::ZERO;
        for tx in input
            .transactions
            .iter()
            .filter(|t| t.is_paid() && t.target().sale_id.is_none())
        {
            ticket_revenue = ticket_revenue.checked_add(tx.amount())?;
            let slot = revenue_by_method.entry(tx.method()).or_default();
            *slot = slot.checked_add(tx.amount())?;
        }

        let mut refunded = Money::ZERO;
        for refund in input
            .refunds
            .iter()
            .filter(|r| r.state() == RefundState::Completed)
        {
            refunded = refunded.checked_add(refund.amount())?;
        }

        let mut top_products: Vec<ProductSales> = products.into_values().collect();
        top_products.sort_by(|a, b| {
            b.quantity
                .cmp(&a.quantity)
                .then_with(|| b.revenue.cmp(&a.revenue))
                .then_with(|| a.name.cmp(&b.name))
        });
        top_products.truncate(TOP_PRODUCTS);

        let gross_revenue = pdv_revenue.checked_add(ticket_revenue)?;
        Ok(Self {
            event_id: input.event.id(),
            event_name: input.event.name().to_string(),
            attendance,
            cancelled_participants: input
                .participants
                .iter()
                .filter(|p| !p.is_active())
                .count(),
            sales_count: completed_sales.len(),
            pdv_revenue,
            ticket_revenue,
            gross_revenue,
            refunded,
            net_revenue: gross_revenue.saturating_sub(refunded),
            revenue_by_method,
            top_products,
            generated_at: Timestamp::now(),
        })
    }
}

fn percentage(part: usize, whole: usize) -> Decimal {
    if whole == 0 {
        return Decimal::ZERO;
    }
    let rate = Decimal::from(part) * Decimal::ONE_HUNDRED / Decimal::from(whole);
    rate.round_dp(2)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::domain::entities::event::tests::details;
    use crate::domain::entities::{ParticipantDetails, SaleItem};
    use crate::domain::value_objects::{ParticipantId, TenantId, UserId};

    fn participant(tenant: TenantId, event: EventId) -> Participant {
        Participant::register(
            tenant,
            event,
            ParticipantDetails {
                name: "Ana".into(),
                email: "ana@example.com".into(),
                cpf: None,
                phone: None,
                ticket_type: None,
            },
        )
        .unwrap()
    }

    fn checkin(tenant: TenantId, event: EventId, p: ParticipantId, method: CheckinMethod) -> CheckinLog {
        CheckinLog::open(tenant, event, p, method, UserId::new_v4(), None)
    }

    #[test]
    fn checkin_stats_count_distinct_participants() {
        let tenant = TenantId::new_v4();
        let event = EventId::new_v4();
        let mut ps: Vec<Participant> = (0..4).map(|_| participant(tenant, event)).collect();
        ps[3].cancel().unwrap();

        let mut first = checkin(tenant, event, ps[0].id(), CheckinMethod::QrCode);
        first.check_out().unwrap();
        let logs = vec![
            first,
            checkin(tenant, event, ps[0].id(), CheckinMethod::Cpf),
            checkin(tenant, event, ps[1].id(), CheckinMethod::QrCode),
        ];

        let stats = CheckinStats::compute(&ps, &logs);
        assert_eq!(stats.registered, 3);
        assert_eq!(stats.checked_in, 2);
        assert_eq!(stats.currently_inside, 2);
        assert_eq!(stats.attendance_rate, Decimal::new(6667, 2));
        assert_eq!(stats.by_method.get(&CheckinMethod::QrCode), Some(&2));
        assert_eq!(stats.by_hour.values().sum::<usize>(), 3);
    }

    #[test]
    fn empty_event_has_zero_rate() {
        let stats = CheckinStats::compute(&[], &[]);
        assert!(stats.attendance_rate.is_zero());
    }

    #[test]
    fn dashboard_revenue_and_top_products() {
        let tenant = TenantId::new_v4();
        let event = Event::new(tenant, details()).unwrap();
        let beer = ProductId::new_v4();
        let water = ProductId::new_v4();
        let sale = |items: Vec<SaleItem>| {
            Sale::new(
                tenant,
                event.id(),
                items,
                Money::ZERO,
                PaymentMethod::Cash,
                UserId::new_v4(),
            )
            .unwrap()
        };
        let s1 = sale(vec![
            SaleItem::new(beer, "Cerveja", Money::from_cents(1_000), 3).unwrap(),
            SaleItem::new(water, "Água", Money::from_cents(500), 1).unwrap(),
        ]);
        let mut s2 = sale(vec![
            SaleItem::new(water, "Água", Money::from_cents(500), 10).unwrap(),
        ]);
        s2.cancel().unwrap();

        let tx = crate::domain::entities::transaction::tests::paid(20_000);

        let dashboard = EventDashboard::compute(&DashboardInput {
            event: &event,
            participants: &[],
            checkins: &[],
            sales: &[s1, s2],
            transactions: &[tx],
            refunds: &[],
        })
        .unwrap();

        assert_eq!(dashboard.sales_count, 1);
        assert_eq!(dashboard.pdv_revenue, Money::from_cents(3_500));
        assert_eq!(dashboard.ticket_revenue, Money::from_cents(20_000));
        assert_eq!(dashboard.gross_revenue, Money::from_cents(23_500));
        assert_eq!(dashboard.net_revenue, dashboard.gross_revenue);
        assert_eq!(dashboard.top_products.first().unwrap().name, "Cerveja");
        assert_eq!(
            dashboard.revenue_by_method.get(&PaymentMethod::Cash),
            Some(&Money::from_cents(3_500))
        );
    }
}
