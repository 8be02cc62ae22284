use std::{
    fmt,
    iter::Sum,
    ops::{Add, AddAssign},
};

use serde::{Deserialize, Deserializer, Serialize, Serializer, de};

/// Monetary amount in integer cents.
///
/// On the wire amounts are numbers in major units. Negative and non-finite
/// values are rejected when decoding.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Money(i64);

impl Money {
    pub const ZERO: Money = Money(0);

    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    pub const fn cents(self) -> i64 {
        self.0
    }

    /// Whole units, e.g. dollars.
    pub const fn from_units(units: i64) -> Self {
        Money(units.saturating_mul(100))
    }

    pub fn from_major(amount: f64) -> Option<Self> {
        if !amount.is_finite() || amount < 0.0 {
            return None;
        }
        let cents = (amount * 100.0).round();
        if cents > i64::MAX as f64 {
            return None;
        }
        Some(Money(cents as i64))
    }

    pub fn to_major(self) -> f64 {
        self.0 as f64 / 100.0
    }

    pub fn is_positive(self) -> bool {
        self.0 > 0
    }

    /// `$12,500`: whole dollars, half-up rounding.
    pub fn format_usd(self) -> String {
        let sign = if self.0 < 0 { "-" } else { "" };
        let dollars = (self.0.unsigned_abs() + 50) / 100;
        let digits = dollars.to_string();
        let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
        for (idx, ch) in digits.chars().enumerate() {
            if idx > 0 && (digits.len() - idx) % 3 == 0 {
                grouped.push(',');
            }
            grouped.push(ch);
        }
        format!("{sign}${grouped}")
    }

    /// Integer division in cents, rounded to the nearest cent.
    pub fn div_round(self, divisor: u64) -> Money {
        if divisor == 0 {
            return Money::ZERO;
        }
        let divisor = divisor as i128;
        let cents = self.0 as i128;
        Money(((cents * 2 + divisor) / (divisor * 2)) as i64)
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, rhs: Money) -> Money {
        Money(self.0.saturating_add(rhs.0))
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Money) {
        *self = *self + rhs;
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
        iter.fold(Money::ZERO, Add::add)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Money {
        iter.copied().sum()
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format_usd())
    }
}

impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if self.0 % 100 == 0 {
            serializer.serialize_i64(self.0 / 100)
        } else {
            serializer.serialize_f64(self.to_major())
        }
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(MoneyVisitor)
    }
}

struct MoneyVisitor;

impl MoneyVisitor {
    fn checked<E: de::Error>(amount: f64) -> Result<Money, E> {
        Money::from_major(amount)
            .ok_or_else(|| E::custom(format!("amount {amount} must be a non-negative number")))
    }
}

impl de::Visitor<'_> for MoneyVisitor {
    type Value = Money;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a non-negative amount")
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Money, E> {
        i64::try_from(v)
            .ok()
            .and_then(|units| units.checked_mul(100))
            .map(Money)
            .ok_or_else(|| E::custom(format!("amount {v} is out of range")))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Money, E> {
        if v < 0 {
            return Err(E::custom(format!("amount {v} must be a non-negative number")));
        }
        self.visit_u64(v as u64)
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Money, E> {
        Self::checked(v)
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Money, E> {
        let amount: f64 = v
            .trim()
            .parse()
            .map_err(|_| E::custom(format!("amount {v:?} is not a number")))?;
        Self::checked(amount)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_whole_dollars_with_grouping() {
        assert_eq!(Money::from_units(0).format_usd(), "$0");
        assert_eq!(Money::from_units(500).format_usd(), "$500");
        assert_eq!(Money::from_units(3000).format_usd(), "$3,000");
        assert_eq!(Money::from_cents(123_456_789).format_usd(), "$1,234,568");
    }

    #[test]
    fn decodes_numbers_and_numeric_strings() {
        let whole: Money = serde_json::from_str("1000").unwrap();
        assert_eq!(whole, Money::from_units(1000));
        let fractional: Money = serde_json::from_str("1250.5").unwrap();
        assert_eq!(fractional.cents(), 125_050);
        let text: Money = serde_json::from_str("\" 75.25 \"").unwrap();
        assert_eq!(text.cents(), 7_525);
    }

    #[test]
    fn rejects_negative_amounts() {
        assert!(serde_json::from_str::<Money>("-5").is_err());
        assert!(serde_json::from_str::<Money>("-0.5").is_err());
        assert!(serde_json::from_str::<Money>("\"abc\"").is_err());
    }

    #[test]
    fn serializes_major_units() {
        assert_eq!(serde_json::to_string(&Money::from_units(2000)).unwrap(), "2000");
        assert_eq!(serde_json::to_string(&Money::from_cents(1050)).unwrap(), "10.5");
    }

    #[test]
    fn sums_and_divides() {
        let total: Money = [Money::from_units(1000), Money::from_units(2000)]
            .iter()
            .sum();
        assert_eq!(total, Money::from_units(3000));
        assert_eq!(Money::from_units(10).div_round(3).cents(), 333);
        assert_eq!(Money::from_units(10).div_round(0), Money::ZERO);
    }
}
