use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, Neg, Sub};

/// Signed amount of money as recorded by the document store.
/// Negative means money left the account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(Decimal);

impl Money {
    pub fn from_cents(cents: i64) -> Self {
        Money(Decimal::from(cents) / Decimal::from(100))
    }

    pub fn to_cents(self) -> i64 {
        (self.0 * Decimal::from(100)).to_i64().unwrap_or(0)
    }

    /// Thousandths of a unit. Matching deltas are allowed to be sub-cent.
    pub fn from_millis(millis: i64) -> Self {
        Money(Decimal::from(millis) / Decimal::from(1000))
    }

    pub fn from_decimal(decimal: Decimal) -> Self {
        Money(decimal)
    }

    pub fn zero() -> Self {
        Money(Decimal::ZERO)
    }

    pub fn is_zero(self) -> bool {
        self.0.is_zero()
    }

    pub fn is_negative(self) -> bool {
        self.0.is_sign_negative() && !self.0.is_zero()
    }

    pub fn abs(self) -> Self {
        Money(self.0.abs())
    }

    pub fn to_f64(self) -> f64 {
        self.0.to_f64().unwrap_or(0.0)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

impl Add for Money {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Money(self.0 + rhs.0)
    }
}

impl Sub for Money {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Money(self.0 - rhs.0)
    }
}

impl Neg for Money {
    type Output = Self;
    fn neg(self) -> Self {
        Money(-self.0)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
        iter.fold(Money::zero(), Add::add)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cents_round_trip() {
        assert_eq!(Money::from_cents(2050).to_cents(), 2050);
        assert_eq!(Money::from_cents(-3000).to_cents(), -3000);
    }

    #[test]
    fn millis_are_sub_cent() {
        let delta = Money::from_millis(1);
        assert!(delta > Money::zero());
        assert!(delta < Money::from_cents(1));
    }

    #[test]
    fn negation_and_abs() {
        let m = Money::from_cents(-2000);
        assert!(m.is_negative());
        assert_eq!(-m, Money::from_cents(2000));
        assert_eq!(m.abs(), Money::from_cents(2000));
        assert!(!Money::zero().is_negative());
    }

    #[test]
    fn sums_like_a_ledger() {
        let total: Money = [10, 10, 750]
            .iter()
            .map(|&c| Money::from_cents(c))
            .sum();
        assert_eq!(total, Money::from_cents(770));
    }

    #[test]
    fn serializes_as_a_bare_number() {
        let json = serde_json::to_value(Money::from_cents(-5750)).unwrap();
        assert_eq!(json, serde_json::json!(-57.5));
    }

    #[test]
    fn display_two_decimal_places() {
        assert_eq!(Money::from_cents(550).to_string(), "5.50");
        assert_eq!(Money::from_cents(-12000).to_string(), "-120.00");
    }
}
