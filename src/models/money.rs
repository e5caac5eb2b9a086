//! Money type for representing currency amounts
//!
//! The budget server counts money in milliunits: one thousandth of the
//! currency unit, so `1.00` is `1000`. Amounts are stored as `i64` to avoid
//! floating-point drift when many transactions are summed.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};

const MILLIUNITS_PER_UNIT: i64 = 1000;

/// A monetary amount in milliunits
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    /// Create a Money amount from milliunits
    ///
    /// # Examples
    /// ```
    /// use nynab::models::Money;
    /// let amount = Money::from_milliunits(10_500); // 10.50
    /// assert_eq!(amount.to_string(), "10.50");
    /// ```
    pub const fn from_milliunits(milliunits: i64) -> Self {
        Self(milliunits)
    }

    /// Create a Money amount from a decimal value, rounding to the nearest milliunit
    ///
    /// # Examples
    /// ```
    /// use nynab::models::Money;
    /// assert_eq!(Money::from_decimal(100.0).milliunits(), 100_000);
    /// ```
    pub fn from_decimal(amount: f64) -> Self {
        Self((amount * MILLIUNITS_PER_UNIT as f64).round() as i64)
    }

    /// Create a zero Money amount
    pub const fn zero() -> Self {
        Self(0)
    }

    /// Get the amount in milliunits
    pub const fn milliunits(&self) -> i64 {
        self.0
    }

    /// Get the amount as a decimal value
    pub fn to_decimal(&self) -> f64 {
        self.0 as f64 / MILLIUNITS_PER_UNIT as f64
    }

    /// Check if the amount is zero
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Check if the amount is positive
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Check if the amount is negative
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Parse a money amount from a decimal string
    ///
    /// Accepts "10.50", "-10.5", "$10.505" and "10". At most three
    /// fractional digits are kept. Only one leading sign is allowed.
    pub fn parse(s: &str) -> Result<Self, MoneyParseError> {
        let s = s.trim();
        let invalid = || MoneyParseError::InvalidFormat(s.to_string());

        let (negative, rest) = match s.strip_prefix('-') {
            Some(stripped) => (true, stripped),
            None => (false, s),
        };
        let rest = rest.strip_prefix('$').unwrap_or(rest);

        let (units, fraction) = match rest.split_once('.') {
            Some((units, fraction)) => (units, fraction),
            None => (rest, ""),
        };
        let is_digits = |part: &str| part.chars().all(|c| c.is_ascii_digit());
        if units.is_empty() || !is_digits(units) || fraction.len() > 3 || !is_digits(fraction) {
            return Err(invalid());
        }

        let overflow = || MoneyParseError::Overflow(s.to_string());
        let units: i64 = units.parse().map_err(|_| overflow())?;
        let fraction: i64 = if fraction.is_empty() {
            0
        } else {
            format!("{:0<3}", fraction).parse().map_err(|_| invalid())?
        };

        let milliunits = units
            .checked_mul(MILLIUNITS_PER_UNIT)
            .and_then(|m| m.checked_add(fraction))
            .ok_or_else(overflow)?;
        Ok(Self(if negative { -milliunits } else { milliunits }))
    }
}

impl Default for Money {
    fn default() -> Self {
        Self::zero()
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let abs = self.0.abs();
        let units = abs / MILLIUNITS_PER_UNIT;
        let cents = (abs % MILLIUNITS_PER_UNIT) / 10;
        let sign = if self.is_negative() { "-" } else { "" };
        write!(f, "{}{}.{:02}", sign, units, cents)
    }
}

impl Add for Money {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self(self.0 + other.0)
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    fn sub(self, other: Self) -> Self {
        Self(self.0 - other.0)
    }
}

impl SubAssign for Money {
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

impl Neg for Money {
    type Output = Self;

    fn neg(self) -> Self {
        Self(-self.0)
    }
}

impl std::iter::Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

/// Error type for money parsing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoneyParseError {
    InvalidFormat(String),
    /// The amount does not fit in milliunits
    Overflow(String),
}

impl fmt::Display for MoneyParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MoneyParseError::InvalidFormat(s) => write!(f, "Invalid money format: {}", s),
            MoneyParseError::Overflow(s) => write!(f, "Money amount out of range: {}", s),
        }
    }
}

impl std::error::Error for MoneyParseError {}
