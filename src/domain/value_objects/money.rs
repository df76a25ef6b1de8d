//! # Money Value Object
//!
//! Non-negative BRL amount with cent precision.
//!
//! # Examples
//!
//! ```
//! use eventos::domain::value_objects::Money;
//!
//! let ticket = Money::from_cents(10_000); // R$ 100,00
//! let parts = ticket.split(3).unwrap();
//! assert_eq!(parts.len(), 3);
//! assert_eq!(parts[0], Money::from_cents(3_334));
//! assert_eq!(parts[2], Money::from_cents(3_333));
//! ```

use crate::domain::value_objects::arithmetic::{
    round_to_cents, ArithmeticError, ArithmeticResult, CheckedArithmetic, Rounding, CENTS_SCALE,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;

/// A non-negative amount in Brazilian reais with at most two decimal places.
///
/// # Invariants
///
/// - Never negative
/// - Never above [`Money::MAX`]
/// - Scale never exceeds two decimal places
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
    schemars::JsonSchema,
)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Money(Decimal);

/// Largest accepted amount in cents: R$ 999.999.999.999,99.
const MAX_CENTS: i64 = 99_999_999_999_999;

impl Money {
    /// Zero reais.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Largest amount the platform handles.
    pub const MAX: Self = Self(Decimal::from_parts(
        MAX_CENTS as u32,
        (MAX_CENTS >> 32) as u32,
        0,
        false,
        CENTS_SCALE,
    ));

    /// Creates an amount from a decimal value.
    ///
    /// # Errors
    ///
    /// Returns `ArithmeticError::InvalidValue` if the value is negative,
    /// above [`Money::MAX`] or carries more than two decimal places.
    pub fn new(amount: Decimal) -> ArithmeticResult<Self> {
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(ArithmeticError::InvalidValue("amount must not be negative"));
        }
        if amount > Self::MAX.0 {
            return Err(ArithmeticError::InvalidValue("amount exceeds the maximum"));
        }
        let normalized = amount.normalize();
        if normalized.scale() > CENTS_SCALE {
            return Err(ArithmeticError::InvalidValue(
                "amount must have at most two decimal places",
            ));
        }
        Ok(Self(round_to_cents(amount, Rounding::HalfEven)))
    }

    /// Creates an amount from an integer number of cents.
    ///
    /// Inputs clamp to `0..=MAX`.
    #[must_use]
    pub fn from_cents(cents: i64) -> Self {
        Self(Decimal::new(cents.clamp(0, MAX_CENTS), CENTS_SCALE))
    }

    /// Wraps an arithmetic result, refusing values above [`Money::MAX`].
    fn bounded(value: Decimal) -> ArithmeticResult<Self> {
        if value > Self::MAX.0 {
            return Err(ArithmeticError::Overflow);
        }
        Ok(Self(value))
    }

    /// Returns the decimal amount.
    #[inline]
    #[must_use]
    pub fn amount(&self) -> Decimal {
        self.0
    }

    /// Returns the amount in cents.
    #[must_use]
    pub fn cents(&self) -> i64 {
        self.0
            .checked_mul(Decimal::ONE_HUNDRED)
            .and_then(|scaled| i64::try_from(scaled.trunc()).ok())
            .unwrap_or(MAX_CENTS)
    }

    /// Returns true if the amount is zero.
    #[inline]
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Adds two amounts.
    ///
    /// # Errors
    ///
    /// Returns `ArithmeticError::Overflow` above [`Money::MAX`].
    pub fn checked_add(self, rhs: Self) -> ArithmeticResult<Self> {
        Self::bounded(self.0.safe_add(rhs.0)?)
    }

    /// Subtracts `rhs`, refusing to go below zero.
    ///
    /// # Errors
    ///
    /// Returns `ArithmeticError::Underflow` if `rhs` is greater than `self`.
    pub fn checked_sub(self, rhs: Self) -> ArithmeticResult<Self> {
        if rhs.0 > self.0 {
            return Err(ArithmeticError::Underflow);
        }
        self.0.safe_sub(rhs.0).map(Self)
    }

    /// Subtracts `rhs`, clamping at zero.
    #[must_use]
    pub fn saturating_sub(self, rhs: Self) -> Self {
        self.checked_sub(rhs).unwrap_or(Self::ZERO)
    }

    /// Multiplies by a whole quantity.
    ///
    /// # Errors
    ///
    /// Returns `ArithmeticError::Overflow` above [`Money::MAX`].
    pub fn times(self, quantity: u32) -> ArithmeticResult<Self> {
        Self::bounded(self.0.safe_mul(Decimal::from(quantity))?)
    }

    /// Applies a rate (e.g. `0.0399` for 3.99%) and rounds back to cents.
    ///
    /// # Errors
    ///
    /// Returns `ArithmeticError::InvalidValue` for negative rates and
    /// `ArithmeticError::Overflow` on overflow.
    pub fn percentage(self, rate: Decimal, rounding: Rounding) -> ArithmeticResult<Self> {
        if rate.is_sign_negative() && !rate.is_zero() {
            return Err(ArithmeticError::InvalidValue("rate must not be negative"));
        }
        let raw = self.0.safe_mul(rate)?;
        Self::bounded(round_to_cents(raw, rounding))
    }

    /// Splits the amount into `parts` installments that sum exactly to it.
    ///
    /// Leftover cents go to the first installments.
    ///
    /// # Errors
    ///
    /// Returns `ArithmeticError::DivisionByZero` when `parts` is zero.
    pub fn split(self, parts: u32) -> ArithmeticResult<Vec<Self>> {
        if parts == 0 {
            return Err(ArithmeticError::DivisionByZero);
        }
        let total = self.cents();
        let parts_i64 = i64::from(parts);
        let base = total / parts_i64;
        let remainder = total % parts_i64;
        Ok((0..parts_i64)
            .map(|i| Self::from_cents(base + i64::from(i < remainder)))
            .collect())
    }
}

impl TryFrom<Decimal> for Money {
    type Error = ArithmeticError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Money> for Decimal {
    fn from(money: Money) -> Self {
        money.0
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "R$ {:.2}", self.0)
    }
}

impl<'a> Sum<&'a Money> for ArithmeticResult<Money> {
    fn sum<I: Iterator<Item = &'a Money>>(mut iter: I) -> Self {
        iter.try_fold(Money::ZERO, |acc, m| acc.checked_add(*m))
    }
}
