//! # Checked Arithmetic
//!
//! Traits and utilities for safe monetary arithmetic.
//!
//! This module provides:
//! - [`ArithmeticError`] - Error type for arithmetic failures
//! - [`CheckedArithmetic`] - Trait for safe arithmetic operations
//! - [`Rounding`] - Explicit rounding direction
//! - [`round_to_cents`] - Rounds a decimal to two places
//!
//! # Examples
//!
//! ```
//! use eventos::domain::value_objects::arithmetic::{round_to_cents, Rounding};
//! use rust_decimal::Decimal;
//!
//! let value = Decimal::new(10_005, 3); // 10.005
//! assert_eq!(round_to_cents(value, Rounding::Down), Decimal::new(1000, 2));
//! assert_eq!(round_to_cents(value, Rounding::Up), Decimal::new(1001, 2));
//! assert_eq!(round_to_cents(value, Rounding::HalfEven), Decimal::new(1000, 2));
//! ```

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Number of decimal places carried by BRL amounts.
pub const CENTS_SCALE: u32 = 2;

/// Error type for arithmetic operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum ArithmeticError {
    /// Arithmetic operation resulted in overflow.
    #[error("arithmetic overflow")]
    Overflow,

    /// Arithmetic operation resulted in a negative amount.
    #[error("arithmetic underflow")]
    Underflow,

    /// Division by zero attempted.
    #[error("division by zero")]
    DivisionByZero,

    /// Invalid value provided (e.g., negative when positive required).
    #[error("invalid value: {0}")]
    InvalidValue(&'static str),
}

/// Result type for arithmetic operations.
pub type ArithmeticResult<T> = Result<T, ArithmeticError>;

/// Rounding direction used when an amount has to be brought back to cents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Rounding {
    /// Round towards zero (truncate).
    Down,
    /// Round away from zero.
    Up,
    /// Banker's rounding: halves go to the even neighbour.
    #[default]
    HalfEven,
}

impl fmt::Display for Rounding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Down => write!(f, "DOWN"),
            Self::Up => write!(f, "UP"),
            Self::HalfEven => write!(f, "HALF_EVEN"),
        }
    }
}

/// Rounds a decimal value to cents with an explicit direction.
#[inline]
#[must_use]
pub fn round_to_cents(value: Decimal, rounding: Rounding) -> Decimal {
    let strategy = match rounding {
        Rounding::Down => RoundingStrategy::ToZero,
        Rounding::Up => RoundingStrategy::AwayFromZero,
        Rounding::HalfEven => RoundingStrategy::MidpointNearestEven,
    };
    value.round_dp_with_strategy(CENTS_SCALE, strategy)
}

/// Trait for checked arithmetic operations.
///
/// Implementors never panic: overflow, negative results where they are not
/// allowed, and division by zero are all reported as [`ArithmeticError`].
pub trait CheckedArithmetic: Sized {
    /// Safely add two values.
    ///
    /// # Errors
    ///
    /// Returns `ArithmeticError::Overflow` if the result would overflow.
    fn safe_add(self, rhs: Self) -> ArithmeticResult<Self>;

    /// Safely subtract two values.
    ///
    /// # Errors
    ///
    /// Returns `ArithmeticError::Underflow` if the result would underflow.
    fn safe_sub(self, rhs: Self) -> ArithmeticResult<Self>;

    /// Safely multiply two values.
    ///
    /// # Errors
    ///
    /// Returns `ArithmeticError::Overflow` if the result would overflow.
    fn safe_mul(self, rhs: Self) -> ArithmeticResult<Self>;

    /// Safely divide two values.
    ///
    /// # Errors
    ///
    /// Returns `ArithmeticError::DivisionByZero` if the divisor is zero.
    fn safe_div(self, rhs: Self) -> ArithmeticResult<Self>;
}

impl CheckedArithmetic for Decimal {
    #[inline]
    fn safe_add(self, rhs: Self) -> ArithmeticResult<Self> {
        self.checked_add(rhs).ok_or(ArithmeticError::Overflow)
    }

    #[inline]
    fn safe_sub(self, rhs: Self) -> ArithmeticResult<Self> {
        self.checked_sub(rhs).ok_or(ArithmeticError::Underflow)
    }

    #[inline]
    fn safe_mul(self, rhs: Self) -> ArithmeticResult<Self> {
        self.checked_mul(rhs).ok_or(ArithmeticError::Overflow)
    }

    #[inline]
    fn safe_div(self, rhs: Self) -> ArithmeticResult<Self> {
        if rhs.is_zero() {
            return Err(ArithmeticError::DivisionByZero);
        }
        self.checked_div(rhs).ok_or(ArithmeticError::Overflow)
    }
}

impl CheckedArithmetic for u32 {
    #[inline]
    fn safe_add(self, rhs: Self) -> ArithmeticResult<Self> {
        self.checked_add(rhs).ok_or(ArithmeticError::Overflow)
    }

    #[inline]
    fn safe_sub(self, rhs: Self) -> ArithmeticResult<Self> {
        self.checked_sub(rhs).ok_or(ArithmeticError::Underflow)
    }

    #[inline]
    fn safe_mul(self, rhs: Self) -> ArithmeticResult<Self> {
        self.checked_mul(rhs).ok_or(ArithmeticError::Overflow)
    }

    #[inline]
    fn safe_div(self, rhs: Self) -> ArithmeticResult<Self> {
        self.checked_div(rhs).ok_or(ArithmeticError::DivisionByZero)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        assert_eq!(ArithmeticError::Overflow.to_string(), "arithmetic overflow");
        assert_eq!(
            ArithmeticError::InvalidValue("negative").to_string(),
            "invalid value: negative"
        );
    }

    #[test]
    fn round_half_even_goes_to_even_neighbour() {
        assert_eq!(
            round_to_cents(Decimal::new(10_015, 3), Rounding::HalfEven),
            Decimal::new(1002, 2)
        );
        assert_eq!(
            round_to_cents(Decimal::new(10_025, 3), Rounding::HalfEven),
            Decimal::new(1002, 2)
        );
    }

    #[test]
    fn round_up_moves_away_from_zero() {
        assert_eq!(
            round_to_cents(Decimal::new(10_001, 3), Rounding::Up),
            Decimal::new(1001, 2)
        );
    }

    #[test]
    fn decimal_safe_div_by_zero() {
        assert_eq!(
            Decimal::ONE.safe_div(Decimal::ZERO),
            Err(ArithmeticError::DivisionByZero)
        );
    }

    #[test]
    fn u32_safe_sub_underflow() {
        assert_eq!(3_u32.safe_sub(5), Err(ArithmeticError::Underflow));
        assert_eq!(5_u32.safe_sub(3).unwrap(), 2);
    }
}
