//! # Quantity Type
//!
//! Fixed-point stock quantity with two decimal places.
//!
//! ## Why Integer Hundredths?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Floating Point Drift                                 │
//! │                                                                         │
//! │  ❌ WRONG: f64 kilograms                                               │
//! │     0.1 + 0.2 = 0.30000000000000004                                    │
//! │     After 10,000 feedings the balance no longer matches the lots       │
//! │                                                                         │
//! │  ✅ CORRECT: i64 hundredths                                            │
//! │     10 + 20 = 30  (0.10 kg + 0.20 kg = 0.30 kg)                        │
//! │     Σ lots == product balance, exactly, forever                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Stock columns are `INTEGER` hundredths in SQLite. The unit of measure
//! (kg, litre, dose, ...) lives on the product; `Quantity` is unit-agnostic.

use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use ts_rs::TS;

/// Number of hundredths in one whole unit.
const SCALE: i64 = 100;

/// A stock quantity stored as integer hundredths of the product's unit.
///
/// ## Example
/// ```rust
/// use zoo_core::quantity::Quantity;
///
/// let received = Quantity::from_units(100);
/// let fed: Quantity = "12.5".parse().unwrap();
///
/// assert_eq!((received - fed).to_string(), "87.50");
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize, TS,
)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(transparent))]
#[serde(transparent)]
#[ts(export)]
pub struct Quantity(#[ts(type = "number")] i64);

impl Quantity {
    /// Creates a quantity from hundredths (1250 = 12.50).
    #[inline]
    pub const fn from_hundredths(hundredths: i64) -> Self {
        Quantity(hundredths)
    }

    /// Creates a quantity from whole units.
    #[inline]
    pub const fn from_units(units: i64) -> Self {
        Quantity(units * SCALE)
    }

    /// Returns the raw hundredths value.
    #[inline]
    pub const fn hundredths(&self) -> i64 {
        self.0
    }

    /// Zero quantity.
    #[inline]
    pub const fn zero() -> Self {
        Quantity(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Subtraction that refuses to go below zero.
    ///
    /// Lot balances are never negative, so lot arithmetic goes through this.
    pub fn checked_sub(self, other: Quantity) -> Option<Quantity> {
        let result = self.0.checked_sub(other.0)?;
        (result >= 0).then_some(Quantity(result))
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let text = format!("{}{}.{:02}", sign, abs / SCALE as u64, abs % SCALE as u64);
        f.pad(&text)
    }
}

/// Error returned when a decimal string cannot be read as a [`Quantity`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseQuantityError {
    #[error("quantity is empty")]
    Empty,

    #[error("'{0}' is not a decimal number")]
    Malformed(String),

    #[error("'{0}' has more than two decimal places")]
    TooPrecise(String),

    #[error("'{0}' is too large")]
    Overflow(String),
}

/// Parses `"12"`, `"12.5"`, `"12.50"` or `"-3.25"`.
impl FromStr for Quantity {
    type Err = ParseQuantityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(ParseQuantityError::Empty);
        }

        let (negative, digits) = match trimmed.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, trimmed),
        };

        let (whole, frac) = match digits.split_once('.') {
            Some((whole, frac)) => (whole, frac),
            None => (digits, ""),
        };

        let all_digits = |part: &str| part.chars().all(|c| c.is_ascii_digit());
        if whole.is_empty() || !all_digits(whole) || !all_digits(frac) {
            return Err(ParseQuantityError::Malformed(trimmed.to_string()));
        }
        if frac.len() > 2 {
            return Err(ParseQuantityError::TooPrecise(trimmed.to_string()));
        }

        let overflow = || ParseQuantityError::Overflow(trimmed.to_string());
        let whole: i64 = whole.parse().map_err(|_| overflow())?;
        let frac: i64 = match frac.len() {
            0 => 0,
            1 => frac.parse::<i64>().map_err(|_| overflow())? * 10,
            _ => frac.parse().map_err(|_| overflow())?,
        };

        let hundredths = whole
            .checked_mul(SCALE)
            .and_then(|w| w.checked_add(frac))
            .ok_or_else(overflow)?;

        Ok(Quantity(if negative { -hundredths } else { hundredths }))
    }
}

impl Add for Quantity {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Quantity(self.0 + other.0)
    }
}

impl AddAssign for Quantity {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Quantity {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Quantity(self.0 - other.0)
    }
}

impl SubAssign for Quantity {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

impl Neg for Quantity {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Quantity(-self.0)
    }
}

impl Sum for Quantity {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Quantity::zero(), Add::add)
    }
}

impl<'a> Sum<&'a Quantity> for Quantity {
    fn sum<I: Iterator<Item = &'a Quantity>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
