//! Fixed-precision monetary arithmetic
//!
//! All amounts are held as integer minor units (cents). The public
//! boundary speaks `rust_decimal::Decimal` with two fractional digits;
//! conversion happens exactly once at the edge. Division never loses or
//! invents a cent: equal splits and proportional allocations both use the
//! largest-remainder method.

use crate::error::{Error, Result};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};

/// Number of fractional digits carried by monetary values
pub const SCALE: u32 = 2;

/// Monetary amount in integer minor units (cents)
///
/// Signed: obligations are non-negative, balances may be negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Money(i64);

impl Money {
    /// Zero amount
    pub const ZERO: Money = Money(0);

    /// Default comparison tolerance: one minor unit (0.01)
    pub const EPSILON: Money = Money(1);

    /// Create from minor units (cents)
    pub fn from_minor(minor: i64) -> Self {
        Self(minor)
    }

    /// Convert from a boundary decimal
    ///
    /// Rounds to two fractional digits (midpoint away from zero) to absorb
    /// float noise from upstream inputs, then rejects magnitudes that do
    /// not fit the minor-unit range.
    pub fn try_from_decimal(value: Decimal) -> Result<Self> {
        let scaled = value
            .round_dp_with_strategy(SCALE, rust_decimal::RoundingStrategy::MidpointAwayFromZero)
            * Decimal::from(100u32);

        let minor = scaled
            .to_i64()
            .ok_or_else(|| Error::InvalidAmount(format!("amount {} out of range", value)))?;

        Ok(Self(minor))
    }

    /// Convert back to a two-digit decimal for the boundary
    pub fn to_decimal(self) -> Decimal {
        Decimal::new(self.0, SCALE)
    }

    /// Minor units (cents)
    pub fn minor(self) -> i64 {
        self.0
    }

    /// Absolute value
    pub fn abs(self) -> Self {
        Self(self.0.abs())
    }

    /// True if strictly greater than zero
    pub fn is_positive(self) -> bool {
        self.0 > 0
    }

    /// True if strictly less than zero
    pub fn is_negative(self) -> bool {
        self.0 < 0
    }

    /// True if within `epsilon` of zero
    pub fn is_zero_within(self, epsilon: Money) -> bool {
        self.0.abs() <= epsilon.0
    }

    /// Equality within `epsilon`
    pub fn approx_eq(self, other: Money, epsilon: Money) -> bool {
        (self - other).is_zero_within(epsilon)
    }

    /// Reject non-positive amounts
    ///
    /// Used at the boundary for item and payment amounts, which must be
    /// strictly positive money values.
    pub fn require_positive(self, what: &str) -> Result<Self> {
        if self.is_positive() {
            Ok(self)
        } else {
            Err(Error::InvalidAmount(format!(
                "{} must be positive, got {}",
                what, self
            )))
        }
    }

    /// Reject negative amounts (zero allowed, e.g. tax)
    pub fn require_non_negative(self, what: &str) -> Result<Self> {
        if self.is_negative() {
            Err(Error::InvalidAmount(format!(
                "{} must not be negative, got {}",
                what, self
            )))
        } else {
            Ok(self)
        }
    }

    /// Equal split across `parts` via largest remainder
    ///
    /// `base = total / parts` truncated; the `total % parts` residual minor
    /// units go one each to the first parts. The returned vector always
    /// sums exactly to `self`. Callers supply parts in a stable order
    /// (ascending participant id) so the residual assignment is
    /// deterministic.
    pub fn split_even(self, parts: usize) -> Vec<Money> {
        if parts == 0 {
            return Vec::new();
        }

        let count = parts as i64;
        let base = self.0.div_euclid(count);
        let remainder = self.0.rem_euclid(count) as usize;

        (0..parts)
            .map(|idx| {
                if idx < remainder {
                    Money(base + 1)
                } else {
                    Money(base)
                }
            })
            .collect()
    }

    /// Proportional allocation by weights via largest remainder
    ///
    /// Each slot receives `self * weight / weight_total` truncated; the
    /// residual minor units are handed out by descending fractional
    /// remainder, ties broken by ascending position. The result sums
    /// exactly to `self`. Zero weights receive nothing unless every weight
    /// is zero, in which case the allocation degenerates to an even split.
    pub fn allocate(self, weights: &[Money]) -> Vec<Money> {
        if weights.is_empty() {
            return Vec::new();
        }

        let weight_total: i128 = weights.iter().map(|w| w.0 as i128).sum();
        if weight_total == 0 {
            return self.split_even(weights.len());
        }

        let total = self.0 as i128;
        let mut allocated: Vec<i64> = Vec::with_capacity(weights.len());
        let mut remainders: Vec<(usize, i128)> = Vec::with_capacity(weights.len());

        for (idx, weight) in weights.iter().enumerate() {
            let numerator = total * weight.0 as i128;
            allocated.push((numerator / weight_total) as i64);
            remainders.push((idx, numerator % weight_total));
        }

        let residual = self.0 - allocated.iter().sum::<i64>();
        remainders.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));

        for &(idx, _) in remainders.iter().take(residual.unsigned_abs() as usize) {
            allocated[idx] += residual.signum();
        }

        allocated.into_iter().map(Money).collect()
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_decimal())
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, rhs: Money) -> Money {
        Money(self.0 + rhs.0)
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Money) {
        self.0 += rhs.0;
    }
}

impl Sub for Money {
    type Output = Money;

    fn sub(self, rhs: Money) -> Money {
        Money(self.0 - rhs.0)
    }
}

impl SubAssign for Money {
    fn sub_assign(&mut self, rhs: Money) {
        self.0 -= rhs.0;
    }
}

impl Neg for Money {
    type Output = Money;

    fn neg(self) -> Money {
        Money(-self.0)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
        iter.fold(Money::ZERO, Add::add)
    }
}

// Serialize as a two-digit decimal so boundary payloads read "12.34",
// never raw minor units.

impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        Serialize::serialize(&self.to_decimal(), serializer)
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = <Decimal as Deserialize>::deserialize(deserializer)?;
        Money::try_from_decimal(value).map_err(serde::de::Error::custom)
    }
}
