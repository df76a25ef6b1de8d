//! # Fraud Scoring
//!
//! Deterministic heuristic risk scores for payments and refund requests.
//!
//! Scores run from 0 to 100 and are additive: each signal contributes a fixed
//! number of points and the total is capped at 100. Every signal that fired
//! is reported as a reason so reviewers can see why a score is high.
//!
//! | Level  | Score   | Effect                       |
//! |--------|---------|------------------------------|
//! | Low    | 0..40   | none                         |
//! | Medium | 40..70  | logged                       |
//! | High   | 70..=100| payment refused, refund reviewed |
//!
//! # Examples
//!
//! ```
//! use eventos::domain::services::fraud_scoring::{FraudScorer, PaymentRiskInput, RiskLevel};
//! use eventos::domain::value_objects::{Money, PaymentMethod};
//!
//! let assessment = FraudScorer::default().assess(&PaymentRiskInput {
//!     amount: Money::from_cents(8_000),
//!     method: PaymentMethod::Pix,
//!     installments: 1,
//!     has_cpf: true,
//!     recent_payer_transactions: 0,
//!     prior_refunds: 0,
//! });
//! assert_eq!(assessment.level, RiskLevel::Low);
//! ```

use crate::domain::value_objects::{Money, PaymentMethod};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Coarse risk bucket.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
    schemars::JsonSchema,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskLevel {
    /// Below the medium threshold.
    Low,
    /// Between medium and high thresholds.
    Medium,
    /// At or above the high threshold.
    High,
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Low => write!(f, "LOW"),
            Self::Medium => write!(f, "MEDIUM"),
            Self::High => write!(f, "HIGH"),
        }
    }
}

/// Score with the signals that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct RiskAssessment {
    /// 0..=100.
    pub score: u8,
    /// Bucket of `score`.
    pub level: RiskLevel,
    /// Signals that contributed points.
    pub reasons: Vec<String>,
}

/// Signals available when a payment is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaymentRiskInput {
    /// Charged amount.
    pub amount: Money,
    /// Payment method.
    pub method: PaymentMethod,
    /// Installment count.
    pub installments: u8,
    /// Whether the payer supplied a CPF.
    pub has_cpf: bool,
    /// Payments by the same payer e-mail in the last hour.
    pub recent_payer_transactions: u32,
    /// Refunds previously requested by the same payer.
    pub prior_refunds: u32,
}

/// Signals available when a refund is requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefundRiskInput {
    /// Requested amount.
    pub amount: Money,
    /// Original transaction amount.
    pub transaction_amount: Money,
    /// Hours since the payment was captured.
    pub hours_since_payment: i64,
    /// Refunds previously requested by the same payer.
    pub prior_refunds: u32,
    /// Score the payment received at creation.
    pub transaction_fraud_score: u8,
}

/// Heuristic scorer with configurable level thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FraudScorer {
    medium_threshold: u8,
    high_threshold: u8,
}

impl Default for FraudScorer {
    fn default() -> Self {
        Self {
            medium_threshold: 40,
            high_threshold: 70,
        }
    }
}

struct Tally {
    score: u32,
    reasons: Vec<String>,
}

impl Tally {
    fn new() -> Self {
        Self {
            score: 0,
            reasons: Vec::new(),
        }
    }

    fn add(&mut self, points: u32, reason: impl Into<String>) {
        if points > 0 {
            self.score = self.score.saturating_add(points);
            self.reasons.push(reason.into());
        }
    }

    fn capped(&self) -> u8 {
        u8::try_from(self.score.min(100)).unwrap_or(100)
    }
}

impl FraudScorer {
    /// Creates a scorer with custom thresholds.
    #[must_use]
    pub fn new(medium_threshold: u8, high_threshold: u8) -> Self {
        Self {
            medium_threshold,
            high_threshold: high_threshold.max(medium_threshold),
        }
    }

    /// Returns the bucket for a score.
    #[must_use]
    pub fn level(&self, score: u8) -> RiskLevel {
        if score >= self.high_threshold {
            RiskLevel::High
        } else if score >= self.medium_threshold {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }

    /// Scores a payment about to be charged.
    #[must_use]
    pub fn assess(&self, input: &PaymentRiskInput) -> RiskAssessment {
        let mut tally = Tally::new();
        let cents = input.amount.cents();

        if cents >= 500_000 {
            tally.add(30, "amount at or above R$ 5000");
        } else if cents >= 100_000 {
            tally.add(15, "amount at or above R$ 1000");
        }

        match input.method {
            PaymentMethod::CreditCard => tally.add(10, "credit card"),
            PaymentMethod::DebitCard => tally.add(5, "debit card"),
            _ => {}
        }

        if input.installments >= 10 {
            tally.add(15, "10 or more installments");
        } else if input.installments >= 6 {
            tally.add(10, "6 or more installments");
        }

        if !input.has_cpf {
            tally.add(15, "payer without CPF");
        }

        if input.recent_payer_transactions >= 5 {
            tally.add(30, "5 or more payments by this payer in the last hour");
        } else if input.recent_payer_transactions >= 3 {
            tally.add(15, "3 or more payments by this payer in the last hour");
        }

        tally.add(
            input.prior_refunds.saturating_mul(10).min(30),
            format!("{} prior refunds", input.prior_refunds),
        );

        let score = tally.capped();
        RiskAssessment {
            score,
            level: self.level(score),
            reasons: tally.reasons,
        }
    }

    /// Scores a refund request.
    #[must_use]
    pub fn assess_refund(&self, input: &RefundRiskInput) -> RiskAssessment {
        let mut tally = Tally::new();

        if input.amount == input.transaction_amount {
            tally.add(10, "full refund");
        }
        if input.amount.cents() > 100_000 {
            tally.add(10, "refund above R$ 1000");
        }
        if input.hours_since_payment < 1 {
            tally.add(25, "refund requested within an hour of payment");
        }
        tally.add(
            input.prior_refunds.saturating_mul(15).min(45),
            format!("{} prior refunds", input.prior_refunds),
        );
        tally.add(
            u32::from(input.transaction_fraud_score / 2),
            format!("payment fraud score {}", input.transaction_fraud_score),
        );

        let score = tally.capped();
        RiskAssessment {
            score,
            level: self.level(score),
            reasons: tally.reasons,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn payment() -> PaymentRiskInput {
        PaymentRiskInput {
            amount: Money::from_cents(10_000),
            method: PaymentMethod::Pix,
            installments: 1,
            has_cpf: true,
            recent_payer_transactions: 0,
            prior_refunds: 0,
        }
    }

    mod payments {
        use super::*;

        #[test]
        fn clean_pix_is_zero() {
            let a = FraudScorer::default().assess(&payment());
            assert_eq!(a.score, 0);
            assert!(a.reasons.is_empty());
        }

        #[test]
        fn stacked_signals_are_high() {
            let a = FraudScorer::default().assess(&PaymentRiskInput {
                amount: Money::from_cents(600_000),
                method: PaymentMethod::CreditCard,
                installments: 12,
                has_cpf: false,
                recent_payer_transactions: 1,
                prior_refunds: 0,
            });
            assert_eq!(a.score, 70);
            assert_eq!(a.level, RiskLevel::High);
            assert_eq!(a.reasons.len(), 4);
        }

        #[test]
        fn velocity_counts() {
            let mut input = payment();
            input.recent_payer_transactions = 3;
            assert_eq!(FraudScorer::default().assess(&input).score, 15);
            input.recent_payer_transactions = 6;
            assert_eq!(FraudScorer::default().assess(&input).score, 30);
        }

        #[test]
        fn score_is_capped() {
            let a = FraudScorer::default().assess(&PaymentRiskInput {
                amount: Money::from_cents(900_000),
                method: PaymentMethod::CreditCard,
                installments: 12,
                has_cpf: false,
                recent_payer_transactions: 10,
                prior_refunds: 10,
            });
            assert_eq!(a.score, 100);
        }
    }

    mod refunds {
        use super::*;

        #[test]
        fn quick_full_refund_by_repeat_refunder() {
            let a = FraudScorer::default().assess_refund(&RefundRiskInput {
                amount: Money::from_cents(20_000),
                transaction_amount: Money::from_cents(20_000),
                hours_since_payment: 0,
                prior_refunds: 3,
                transaction_fraud_score: 20,
            });
            assert_eq!(a.score, 10 + 25 + 45 + 10);
            assert_eq!(a.level, RiskLevel::High);
        }

        #[test]
        fn ordinary_partial_refund_is_low() {
            let a = FraudScorer::default().assess_refund(&RefundRiskInput {
                amount: Money::from_cents(5_000),
                transaction_amount: Money::from_cents(20_000),
                hours_since_payment: 72,
                prior_refunds: 0,
                transaction_fraud_score: 0,
            });
            assert_eq!(a.score, 0);
            assert_eq!(a.level, RiskLevel::Low);
        }
    }

    #[test]
    fn levels() {
        let s = FraudScorer::default();
        assert_eq!(s.level(39), RiskLevel::Low);
        assert_eq!(s.level(40), RiskLevel::Medium);
        assert_eq!(s.level(70), RiskLevel::High);
    }
}
