//! # Domain Services
//!
//! Business rules that span several aggregates and have no I/O.
//!
//! ## Services
//!
//! - [`refund_policy::RefundPolicy`]: decides what happens to a refund request
//! - [`fraud_scoring::FraudScorer`]: heuristic risk scores for payments and refunds
//! - [`analytics::EventDashboard`]: per-event aggregations

pub mod analytics;
pub mod fraud_scoring;
pub mod refund_policy;

pub use analytics::{CheckinStats, DashboardInput, EventDashboard, ProductSales};
pub use fraud_scoring::{
    FraudScorer, PaymentRiskInput, RefundRiskInput, RiskAssessment, RiskLevel,
};
pub use refund_policy::{RefundDecision, RefundPolicy, RefundPolicyConfig, RefundRequestContext};
