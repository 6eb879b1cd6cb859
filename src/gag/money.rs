use crate::Result;

use std::fmt;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum MoneyError {
    #[error("Overflow error while applying {0} operation on {1:?} and {2:?}")]
    Overflow(&'static str, Money, Money),

    #[error("Underflow error while applying {0} operation on {1:?} and {2:?}")]
    Underflow(&'static str, Money, Money),

    #[error("Amount out of range for minor units: {0}")]
    OutOfRange(Decimal),
}

/// Amount expressed in minor currency units (pence, cents)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Money(pub i64);

impl Money {
    pub const ZERO: Self = Self(0);
    pub const MAX: Self = Self(i64::MAX);
    pub const MIN: Self = Self(i64::MIN);

    /// Converts a major-unit decimal into minor units, rounding half to even.
    ///
    /// `12.345` becomes `1234` and `12.355` becomes `1236`, so accumulated balances
    /// never depend on float representation.
    pub fn from_decimal(amount: Decimal) -> Result<Self> {
        let minor = amount
            .checked_mul(Decimal::ONE_HUNDRED)
            .ok_or(MoneyError::OutOfRange(amount))?
            .round_dp_with_strategy(0, RoundingStrategy::MidpointNearestEven);

        let minor = minor.to_i64().ok_or(MoneyError::OutOfRange(amount))?;

        Ok(Money(minor))
    }

    /// Adds `other` in place; the value is left untouched when the sum does not fit.
    pub fn add(&mut self, other: &Self) -> Result {
        let a = self.0;
        let b = other.0;

        match a.checked_add(b) {
            Some(sum) => self.0 = sum,
            None if b > 0 => Err(MoneyError::Overflow("add", Money(a), *other))?,
            None => Err(MoneyError::Underflow("add", Money(a), *other))?,
        }

        return Ok(());
    }

    pub fn minor_units(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();

        return write!(f, "{sign}{}.{:02}", abs / 100, abs % 100);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::str::FromStr;

    fn decimal(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn from_decimal_whole_and_fractional() {
        assert_eq!(Money::from_decimal(decimal("12")).unwrap(), Money(1200));
        assert_eq!(Money::from_decimal(decimal("0.07")).unwrap(), Money(7));
        assert_eq!(Money::from_decimal(decimal("99.99")).unwrap(), Money(9999));
    }

    #[test]
    fn from_decimal_rounds_half_to_even() {
        assert_eq!(Money::from_decimal(decimal("0.125")).unwrap(), Money(12));
        assert_eq!(Money::from_decimal(decimal("0.135")).unwrap(), Money(14));
        assert_eq!(Money::from_decimal(decimal("1.015")).unwrap(), Money(102));
        assert_eq!(Money::from_decimal(decimal("1.0151")).unwrap(), Money(102));
        assert_eq!(Money::from_decimal(decimal("-0.125")).unwrap(), Money(-12));
    }

    #[test]
    fn from_decimal_out_of_range() {
        let err = Money::from_decimal(Decimal::MAX).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<MoneyError>(),
            Some(MoneyError::OutOfRange(_))
        ));
    }

    #[test]
    fn add() {
        let mut money = Money(500);
        money.add(&Money(250)).unwrap();
        assert_eq!(money, Money(750));

        money.add(&Money(-1000)).unwrap();
        assert_eq!(money, Money(-250));
    }

    #[test]
    fn add_overflow_leaves_value() {
        let mut money = Money::MAX;
        let err = money.add(&Money(1)).unwrap_err();

        assert!(matches!(
            err.downcast_ref::<MoneyError>(),
            Some(MoneyError::Overflow(..))
        ));
        assert_eq!(money, Money::MAX);

        let mut money = Money::MIN;
        let err = money.add(&Money(-1)).unwrap_err();

        assert!(matches!(
            err.downcast_ref::<MoneyError>(),
            Some(MoneyError::Underflow(..))
        ));
        assert_eq!(money, Money::MIN);
    }

    #[test]
    fn display() {
        assert_eq!(Money(0).to_string(), "0.00");
        assert_eq!(Money(7).to_string(), "0.07");
        assert_eq!(Money(123456).to_string(), "1234.56");
        assert_eq!(Money(-250).to_string(), "-2.50");
    }
}
