//! Fixed-point money and percentage values.
//!
//! Amounts are integer cents and percentages are basis points (1/100 of a
//! percent). Fee splits round half-to-even at the cent boundary.
//!
//! On the wire both are decimal numbers: `Money::from_cents(12_050)` is
//! `120.5` and `Percentage::from_basis_points(1_500)` is `15.0`.

use core::fmt;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{DomainError, DomainResult};

const BASIS_POINTS_PER_WHOLE: i128 = 10_000;

/// Amount in the smallest currency unit (cents).
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Money(i64);

impl Money {
    pub const ZERO: Money = Money(0);

    pub const fn from_cents(cents: i64) -> Self {
        Self(cents)
    }

    pub const fn cents(&self) -> i64 {
        self.0
    }

    pub fn is_negative(&self) -> bool {
        self.0 < 0
    }

    pub fn checked_add(self, other: Money) -> Option<Money> {
        self.0.checked_add(other.0).map(Money)
    }

    pub fn checked_sub(self, other: Money) -> Option<Money> {
        self.0.checked_sub(other.0).map(Money)
    }

    /// Parse a decimal amount such as `"100"`, `"100.5"` or `"100.50"`.
    ///
    /// More than two fractional digits is rejected rather than rounded.
    pub fn parse_decimal(input: &str) -> DomainResult<Self> {
        let s = input.trim();
        let (negative, digits) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s),
        };
        let (whole, frac) = match digits.split_once('.') {
            Some((w, f)) => (w, f),
            None => (digits, ""),
        };

        if whole.is_empty() || !whole.bytes().all(|b| b.is_ascii_digit()) {
            return Err(DomainError::validation(format!("invalid amount '{input}'")));
        }
        if frac.len() > 2 || !frac.bytes().all(|b| b.is_ascii_digit()) {
            return Err(DomainError::validation(format!(
                "invalid amount '{input}': at most two decimal places"
            )));
        }

        let whole: i64 = whole
            .parse()
            .map_err(|_| DomainError::validation(format!("amount out of range '{input}'")))?;
        let frac_cents: i64 = match frac.len() {
            0 => 0,
            1 => frac.parse::<i64>().unwrap_or(0) * 10,
            _ => frac.parse::<i64>().unwrap_or(0),
        };

        let cents = whole
            .checked_mul(100)
            .and_then(|c| c.checked_add(frac_cents))
            .ok_or_else(|| DomainError::validation(format!("amount out of range '{input}'")))?;

        Ok(Self(if negative { -cents } else { cents }))
    }
}

impl core::fmt::Display for Money {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{}{}.{:02}", sign, abs / 100, abs % 100)
    }
}

/// Percentage stored as basis points (`1500` = 15%).
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Percentage(u32);

impl Percentage {
    pub const fn from_basis_points(bp: u32) -> Self {
        Self(bp)
    }

    pub const fn from_whole_percent(pct: u32) -> Self {
        Self(pct * 100)
    }

    /// Convert a decimal percentage (e.g. `2.5`) read from configuration.
    ///
    /// Must be finite and within `0..=100`.
    pub fn from_percent(pct: f64) -> DomainResult<Self> {
        if !pct.is_finite() || !(0.0..=100.0).contains(&pct) {
            return Err(DomainError::validation(format!(
                "percentage must be within 0..=100, got {pct}"
            )));
        }
        Ok(Self((pct * 100.0).round() as u32))
    }

    pub const fn basis_points(&self) -> u32 {
        self.0
    }

    pub fn as_percent(&self) -> f64 {
        f64::from(self.0) / 100.0
    }

    /// Apply this percentage to `amount`, rounding half-to-even at the cent.
    pub fn of(&self, amount: Money) -> Money {
        let numerator = i128::from(amount.cents()) * i128::from(self.0);
        Money(round_half_even(numerator, BASIS_POINTS_PER_WHOLE) as i64)
    }
}

impl core::fmt::Display for Percentage {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let whole = self.0 / 100;
        let frac = self.0 % 100;
        if frac == 0 {
            write!(f, "{whole}%")
        } else {
            write!(f, "{whole}.{frac:02}%")
        }
    }
}

impl Money {
    fn from_decimal_f64(v: f64) -> DomainResult<Self> {
        let cents = (v * 100.0).round();
        if !cents.is_finite() || cents < i64::MIN as f64 || cents > i64::MAX as f64 {
            return Err(DomainError::validation(format!("amount out of range '{v}'")));
        }
        Ok(Self(cents as i64))
    }
}

impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.0 as f64 / 100.0)
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(MoneyVisitor)
    }
}

struct MoneyVisitor;

impl Visitor<'_> for MoneyVisitor {
    type Value = Money;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a decimal amount")
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Money, E> {
        v.checked_mul(100)
            .map(Money)
            .ok_or_else(|| E::custom(format!("amount out of range '{v}'")))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Money, E> {
        i64::try_from(v)
            .map_err(|_| E::custom(format!("amount out of range '{v}'")))
            .and_then(|v| self.visit_i64(v))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Money, E> {
        Money::from_decimal_f64(v).map_err(E::custom)
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Money, E> {
        Money::parse_decimal(v).map_err(E::custom)
    }
}

impl Serialize for Percentage {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.as_percent())
    }
}

impl<'de> Deserialize<'de> for Percentage {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let pct = f64::deserialize(deserializer)?;
        Percentage::from_percent(pct).map_err(de::Error::custom)
    }
}

/// Platform fee / detailer payout split of a booking total.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeSplit {
    pub total: Money,
    pub percentage: Percentage,
    pub fee: Money,
    pub payout: Money,
}

impl FeeSplit {
    /// `fee = total × pct`, `payout = total − fee`. Negative totals are rejected.
    pub fn compute(total: Money, percentage: Percentage) -> DomainResult<Self> {
        if total.is_negative() {
            return Err(DomainError::validation("amount must be non-negative"));
        }
        if percentage.basis_points() > 10_000 {
            return Err(DomainError::validation("percentage must not exceed 100%"));
        }
        let fee = percentage.of(total);
        let payout = total
            .checked_sub(fee)
            .ok_or_else(|| DomainError::validation("amount out of range"))?;
        Ok(Self {
            total,
            percentage,
            fee,
            payout,
        })
    }
}

fn round_half_even(numerator: i128, denominator: i128) -> i128 {
    let quotient = numerator.div_euclid(denominator);
    let remainder = numerator.rem_euclid(denominator);
    let twice = remainder * 2;
    if twice > denominator || (twice == denominator && quotient % 2 != 0) {
        quotient + 1
    } else {
        quotient
    }
}
