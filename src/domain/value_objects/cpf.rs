//! # CPF
//!
//! Brazilian individual taxpayer registry number.
//!
//! A CPF has nine base digits followed by two mod-11 check digits. Input may
//! be formatted (`123.456.789-09`) or bare (`12345678909`); it is stored bare.
//! Sequences of a single repeated digit pass the checksum but are not issued,
//! so they are rejected.
//!
//! Responses that leave the platform should use [`Cpf::masked`] to keep only
//! the middle digits visible.
//!
//! # Examples
//!
//! ```
//! use eventos::domain::value_objects::Cpf;
//!
//! let cpf: Cpf = "529.982.247-25".parse().unwrap();
//! assert_eq!(cpf.as_str(), "52998224725");
//! assert_eq!(cpf.formatted(), "529.982.247-25");
//! assert_eq!(cpf.masked(), "***.982.247-**");
//! assert!("111.111.111-11".parse::<Cpf>().is_err());
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Reasons a CPF can be rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CpfError {
    /// Wrong number of digits after stripping punctuation.
    #[error("CPF must have 11 digits, got {0}")]
    Length(usize),
    /// Characters other than digits, dots, dashes or spaces.
    #[error("CPF contains invalid characters")]
    InvalidCharacters,
    /// All digits are the same.
    #[error("CPF cannot be a repeated digit sequence")]
    RepeatedDigits,
    /// Check digits do not match.
    #[error("CPF check digits do not match")]
    Checksum,
}

/// A validated CPF, stored as 11 bare digits.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(try_from = "String", into = "String")]
pub struct Cpf(String);

impl Cpf {
    /// Parses and validates a CPF.
    ///
    /// # Errors
    ///
    /// Returns a [`CpfError`] describing the first failed rule.
    pub fn parse(input: &str) -> Result<Self, CpfError> {
        let mut digits: Vec<u32> = Vec::with_capacity(11);
        for c in input.chars() {
            match c {
                '0'..='9' => digits.push(c.to_digit(10).unwrap_or_default()),
                '.' | '-' | ' ' => {}
                _ => return Err(CpfError::InvalidCharacters),
            }
        }
        if digits.len() != 11 {
            return Err(CpfError::Length(digits.len()));
        }
        if digits.windows(2).all(|w| w.first() == w.last()) {
            return Err(CpfError::RepeatedDigits);
        }
        let first = check_digit(digits.iter().take(9));
        let second = check_digit(digits.iter().take(10));
        if digits.get(9) != Some(&first) || digits.get(10) != Some(&second) {
            return Err(CpfError::Checksum);
        }
        Ok(Self(digits.iter().map(|d| d.to_string()).collect()))
    }

    /// Returns the 11 bare digits.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the conventional `000.000.000-00` rendering.
    #[must_use]
    pub fn formatted(&self) -> String {
        let s = &self.0;
        format!(
            "{}.{}.{}-{}",
            s.get(0..3).unwrap_or_default(),
            s.get(3..6).unwrap_or_default(),
            s.get(6..9).unwrap_or_default(),
            s.get(9..11).unwrap_or_default()
        )
    }

    /// Returns an LGPD-safe rendering that hides the first three and the
    /// check digits.
    #[must_use]
    pub fn masked(&self) -> String {
        let s = &self.0;
        format!(
            "***.{}.{}-**",
            s.get(3..6).unwrap_or_default(),
            s.get(6..9).unwrap_or_default()
        )
    }
}

/// Weighted mod-11 check digit over the given prefix.
fn check_digit<'a>(digits: impl Iterator<Item = &'a u32> + Clone) -> u32 {
    let len = u32::try_from(digits.clone().count()).unwrap_or(0);
    let sum: u32 = digits
        .enumerate()
        .map(|(i, d)| d * (len + 1 - u32::try_from(i).unwrap_or(0)))
        .sum();
    let rest = (sum * 10) % 11;
    if rest == 10 { 0 } else { rest }
}

impl FromStr for Cpf {
    type Err = CpfError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Cpf {
    type Error = CpfError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Cpf> for String {
    fn from(cpf: Cpf) -> Self {
        cpf.0
    }
}

impl fmt::Display for Cpf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.masked())
    }
}
