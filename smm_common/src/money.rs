use std::{
    fmt::Display,
    iter::Sum,
    ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign},
    str::FromStr,
};

use serde::{Deserialize, Serialize};
use sqlx::Type;
use thiserror::Error;

/// The number of fixed-point fractional digits carried by [`Money`].
pub const MONEY_DECIMALS: u32 = 4;
const SCALE: i64 = 10_000;
// 100 * SCALE, the divisor for percentage arithmetic.
const PERCENT_SCALE: i128 = 1_000_000;

//--------------------------------------      Money       ------------------------------------------------------------
/// A currency amount with 4 fixed decimal digits, stored as an `i64`.
///
/// SMM panels quote rates per 1000 units with two to four fractional digits, and those rates get multiplied by large
/// quantities on every order. All arithmetic here is integer arithmetic (widened to `i128` where products can
/// overflow), so repeated markup application and per-mille pricing never accumulate binary floating point drift.
#[derive(Debug, Clone, Copy, Default, Type, PartialEq, Eq, Ord, PartialOrd, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct Money(i64);

#[derive(Debug, Clone, Error)]
#[error("Not a valid currency amount: {0}")]
pub struct MoneyParseError(String);

impl Money {
    pub const ZERO: Money = Money(0);

    /// The raw fixed-point value (1 == 0.0001 currency units).
    pub fn value(&self) -> i64 {
        self.0
    }

    pub fn from_raw(value: i64) -> Self {
        Self(value)
    }

    /// A whole number of currency units.
    pub fn from_units(units: i64) -> Self {
        Self(units * SCALE)
    }

    /// A value with two fractional digits, e.g. `from_cents(12, 34)` == 12.34.
    pub fn from_cents(units: i64, cents: i64) -> Self {
        Self(units * SCALE + cents.signum() * (cents.abs() % 100) * (SCALE / 100))
    }

    pub fn is_positive(&self) -> bool {
        self.0 > 0
    }

    pub fn is_negative(&self) -> bool {
        self.0 < 0
    }

    pub fn abs(&self) -> Self {
        Self(self.0.abs())
    }

    /// Per-mille pricing: the amount due for `quantity` units at `self` per 1000.
    ///
    /// The product is computed in `i128` and truncated toward zero at the 4th decimal.
    pub fn per_thousand(&self, quantity: i64) -> Self {
        let raw = (self.0 as i128) * (quantity as i128) / 1000;
        Self(raw as i64)
    }

    /// Applies a percentage markup: `self * (1 + percent / 100)`.
    ///
    /// `percent` is itself a [`Money`] value ("25.0000" means 25%), so fractional markups are exact. Re-applying the
    /// same markup to an unchanged base always yields the same result.
    pub fn with_markup(&self, percent: Money) -> Self {
        let raw = (self.0 as i128) * (PERCENT_SCALE + percent.0 as i128) / PERCENT_SCALE;
        Self(raw as i64)
    }

    /// Best-effort conversion from a JSON float. Rounds to 4 decimals. Upstream panels report balances as JSON
    /// numbers often enough that refusing floats outright is not an option; this is only used at the gateway boundary.
    pub fn try_from_f64(value: f64) -> Result<Self, MoneyParseError> {
        if !value.is_finite() {
            return Err(MoneyParseError(value.to_string()));
        }
        let scaled = value * SCALE as f64;
        if scaled >= i64::MAX as f64 || scaled <= i64::MIN as f64 {
            return Err(MoneyParseError(value.to_string()));
        }
        Ok(Self(scaled.round() as i64))
    }
}

impl FromStr for Money {
    type Err = MoneyParseError;

    /// Parses decimal literals like `"12"`, `"12.34"`, `"-0.9"`. Fractional digits beyond the 4th are truncated.
    /// Panels are known to return rates as strings, so this parser is the norm, not a fallback.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let err = || MoneyParseError(s.to_string());
        let (negative, body) = match trimmed.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, trimmed),
        };
        if body.is_empty() {
            return Err(err());
        }
        let (whole_part, frac_part) = match body.split_once('.') {
            Some((w, f)) => (w, f),
            None => (body, ""),
        };
        let whole: i64 = if whole_part.is_empty() { 0 } else { whole_part.parse().map_err(|_| err())? };
        let mut frac: i64 = 0;
        let mut scale = SCALE / 10;
        for c in frac_part.chars().take(MONEY_DECIMALS as usize) {
            let digit = c.to_digit(10).ok_or_else(err)? as i64;
            frac += digit * scale;
            scale /= 10;
        }
        if frac_part.len() > MONEY_DECIMALS as usize && frac_part[MONEY_DECIMALS as usize..].chars().any(|c| !c.is_ascii_digit()) {
            return Err(err());
        }
        let raw = whole.checked_mul(SCALE).and_then(|w| w.checked_add(frac)).ok_or_else(err)?;
        Ok(Self(if negative { -raw } else { raw }))
    }
}

impl Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let whole = abs / SCALE as u64;
        let mut frac = abs % SCALE as u64;
        let mut digits = MONEY_DECIMALS;
        // trim trailing zeros, but never below 2 decimals
        while digits > 2 && frac % 10 == 0 {
            frac /= 10;
            digits -= 1;
        }
        write!(f, "{sign}{whole}.{frac:0width$}", width = digits as usize)
    }
}

impl From<i64> for Money {
    fn from(units: i64) -> Self {
        Self::from_units(units)
    }
}

impl Add for Money {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl Sub for Money {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0 - rhs.0)
    }
}

impl SubAssign for Money {
    fn sub_assign(&mut self, rhs: Self) {
        self.0 -= rhs.0;
    }
}

impl Neg for Money {
    type Output = Self;

    fn neg(self) -> Self::Output {
        Self(-self.0)
    }
}

impl Mul<i64> for Money {
    type Output = Self;

    fn mul(self, rhs: i64) -> Self::Output {
        Self(self.0 * rhs)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parse_whole_and_decimal() {
        assert_eq!("12".parse::<Money>().unwrap(), Money::from_units(12));
        assert_eq!("12.34".parse::<Money>().unwrap(), Money::from_raw(123_400));
        assert_eq!("0.9".parse::<Money>().unwrap(), Money::from_raw(9_000));
        assert_eq!("-4.25".parse::<Money>().unwrap(), Money::from_raw(-42_500));
        assert_eq!(".5".parse::<Money>().unwrap(), Money::from_raw(5_000));
    }

    #[test]
    fn parse_truncates_extra_digits() {
        assert_eq!("1.23456789".parse::<Money>().unwrap(), Money::from_raw(12_345));
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!("".parse::<Money>().is_err());
        assert!("1.2.3".parse::<Money>().is_err());
        assert!("12,50".parse::<Money>().is_err());
        assert!("abc".parse::<Money>().is_err());
    }

    #[test]
    fn display_trims_to_at_least_two_decimals() {
        assert_eq!(Money::from_raw(9_000).to_string(), "0.90");
        assert_eq!(Money::from_raw(123_456).to_string(), "12.3456");
        assert_eq!(Money::from_units(5000).to_string(), "5000.00");
        assert_eq!(Money::from_raw(-42_500).to_string(), "-4.25");
    }

    #[test]
    fn per_thousand_pricing() {
        // 0.90 per 1000, quantity 1000 => 0.90
        let rate = "0.90".parse::<Money>().unwrap();
        assert_eq!(rate.per_thousand(1000), rate);
        // 1.50 per 1000, quantity 250 => 0.375
        let rate = "1.50".parse::<Money>().unwrap();
        assert_eq!(rate.per_thousand(250), Money::from_raw(3_750));
        // large quantities stay exact
        let rate = "12.3456".parse::<Money>().unwrap();
        assert_eq!(rate.per_thousand(1_000_000), Money::from_raw(123_456_000));
    }

    #[test]
    fn markup_is_exact_and_stable() {
        let cost = "1.00".parse::<Money>().unwrap();
        let markup = Money::from_units(25);
        assert_eq!(cost.with_markup(markup), "1.25".parse::<Money>().unwrap());
        // fractional markup
        let markup = "12.5".parse::<Money>().unwrap();
        assert_eq!(cost.with_markup(markup), "1.125".parse::<Money>().unwrap());
        // re-applying to the same base never drifts
        let once = cost.with_markup(markup);
        let again = cost.with_markup(markup);
        assert_eq!(once, again);
    }

    #[test]
    fn zero_markup_is_identity() {
        let cost = "3.1415".parse::<Money>().unwrap();
        assert_eq!(cost.with_markup(Money::ZERO), cost);
    }

    #[test]
    fn float_conversion_rounds_to_four_decimals() {
        assert_eq!(Money::try_from_f64(0.9).unwrap(), Money::from_raw(9_000));
        assert_eq!(Money::try_from_f64(1.00005).unwrap(), Money::from_raw(10_001));
        assert!(Money::try_from_f64(f64::NAN).is_err());
        assert!(Money::try_from_f64(f64::INFINITY).is_err());
    }
}
