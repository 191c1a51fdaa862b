//! Decimal numbers with not-a-number and infinity sentinels
//!
//! Formula arithmetic runs on [`rust_decimal::Decimal`]. The decimal type has
//! no representation for the results of `1/0`, `0/0` or an overflowing
//! multiplication, so [`Number`] wraps it with the sentinels those operations
//! produce. Sentinels propagate through every operator instead of raising.

use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::{Decimal, MathematicalOps};
use std::fmt;
use std::ops::{Add, Div, Mul, Neg, Rem, Sub};
use std::str::FromStr;

/// A formula value
///
/// Equality is structural: finite values compare numerically (`2.0 == 2`),
/// infinities compare by sign and `NaN == NaN`. This makes numbers usable as
/// cache keys; it is not IEEE-754 comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Number {
    /// A finite decimal value
    Finite(Decimal),
    /// Positive or negative infinity
    Infinite { negative: bool },
    /// Not a number
    NaN,
}

impl Number {
    /// Zero
    pub const ZERO: Number = Number::Finite(Decimal::ZERO);
    /// One
    pub const ONE: Number = Number::Finite(Decimal::ONE);
    /// Positive infinity
    pub const INFINITY: Number = Number::Infinite { negative: false };
    /// Negative infinity
    pub const NEG_INFINITY: Number = Number::Infinite { negative: true };

    /// Parse a numeric-like string, yielding `NaN` for anything unparsable
    pub fn parse(text: &str) -> Number {
        let text = text.trim();
        match text {
            "NaN" => return Number::NaN,
            "Infinity" | "+Infinity" => return Number::INFINITY,
            "-Infinity" => return Number::NEG_INFINITY,
            _ => {}
        }

        // "12." is accepted the way numeric coercion accepts it
        let trimmed = match text.strip_suffix('.') {
            Some(rest) if !rest.is_empty() && !rest.ends_with('.') => rest,
            _ => text,
        };

        if let Ok(d) = Decimal::from_str(trimmed) {
            return Number::Finite(d);
        }
        if let Ok(d) = Decimal::from_scientific(trimmed) {
            return Number::Finite(d);
        }

        // Out of decimal range but still a number
        match trimmed.parse::<f64>() {
            Ok(f) if trimmed.bytes().any(|b| b.is_ascii_digit()) => Number::from(f),
            _ => Number::NaN,
        }
    }

    /// The decimal value, if finite
    pub fn as_decimal(&self) -> Option<Decimal> {
        match self {
            Number::Finite(d) => Some(*d),
            _ => None,
        }
    }

    /// Check if this is `NaN`
    pub fn is_nan(&self) -> bool {
        matches!(self, Number::NaN)
    }

    /// Check if this is a finite value
    pub fn is_finite(&self) -> bool {
        matches!(self, Number::Finite(_))
    }

    /// Check if this is a finite whole number
    pub fn is_integer(&self) -> bool {
        match self {
            Number::Finite(d) => d.fract().is_zero(),
            _ => false,
        }
    }

    /// Check if this is zero
    pub fn is_zero(&self) -> bool {
        matches!(self, Number::Finite(d) if d.is_zero())
    }

    /// Approximate as a float
    pub fn to_f64(&self) -> f64 {
        match self {
            Number::Finite(d) => d.to_f64().unwrap_or(f64::NAN),
            Number::Infinite { negative: false } => f64::INFINITY,
            Number::Infinite { negative: true } => f64::NEG_INFINITY,
            Number::NaN => f64::NAN,
        }
    }

    /// Sign of a non-NaN value, treating zero as positive
    fn is_negative(&self) -> bool {
        match self {
            Number::Finite(d) => d.is_sign_negative() && !d.is_zero(),
            Number::Infinite { negative } => *negative,
            Number::NaN => false,
        }
    }

    fn infinity(negative: bool) -> Number {
        Number::Infinite { negative }
    }

    /// Raise to a power
    ///
    /// Integer exponents use exact decimal exponentiation. Fractional
    /// exponents go through `f64::powf`, so the result is an approximation.
    pub fn pow(self, exponent: Number) -> Number {
        if self.is_nan() || exponent.is_nan() {
            return Number::NaN;
        }

        let whole = match exponent {
            Number::Finite(e) if e.fract().is_zero() => e.to_i64(),
            _ => None,
        };

        match (self, whole) {
            (_, Some(0)) => Number::ONE,
            (Number::Finite(_), Some(i64::MIN)) => self.powf(exponent),
            (Number::Finite(base), Some(n)) => {
                let magnitude = match base.checked_powi(n.abs()) {
                    Some(d) => Number::Finite(d),
                    None => {
                        // Overflow; a base in (-1, 1) would have underflowed instead
                        if base.abs() < Decimal::ONE {
                            Number::ZERO
                        } else {
                            Number::infinity(base.is_sign_negative() && n % 2 != 0)
                        }
                    }
                };
                if n < 0 {
                    Number::ONE / magnitude
                } else {
                    magnitude
                }
            }
            (Number::Infinite { negative }, Some(n)) => {
                if n < 0 {
                    Number::ZERO
                } else {
                    Number::infinity(negative && n % 2 != 0)
                }
            }
            _ => self.powf(exponent),
        }
    }

    fn powf(self, exponent: Number) -> Number {
        Number::from(self.to_f64().powf(exponent.to_f64()))
    }
}

impl Default for Number {
    fn default() -> Self {
        Number::ZERO
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Number::Finite(d) if d.is_zero() => f.write_str("0"),
            Number::Finite(d) => write!(f, "{}", d.normalize()),
            Number::Infinite { negative: false } => f.write_str("Infinity"),
            Number::Infinite { negative: true } => f.write_str("-Infinity"),
            Number::NaN => f.write_str("NaN"),
        }
    }
}

impl FromStr for Number {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Number::parse(s))
    }
}

impl From<Decimal> for Number {
    fn from(value: Decimal) -> Self {
        Number::Finite(value)
    }
}

impl From<f64> for Number {
    fn from(value: f64) -> Self {
        if value.is_nan() {
            Number::NaN
        } else if value.is_infinite() {
            Number::infinity(value < 0.0)
        } else {
            match Decimal::from_f64(value) {
                Some(d) => Number::Finite(d),
                None => Number::infinity(value < 0.0),
            }
        }
    }
}

macro_rules! impl_from_integer {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Number {
                fn from(value: $t) -> Self {
                    Number::Finite(Decimal::from(value))
                }
            }
        )*
    };
}

impl_from_integer!(i32, i64, u32, u64, usize);

impl From<&str> for Number {
    fn from(value: &str) -> Self {
        Number::parse(value)
    }
}

impl From<String> for Number {
    fn from(value: String) -> Self {
        Number::parse(&value)
    }
}

impl Neg for Number {
    type Output = Number;

    fn neg(self) -> Number {
        match self {
            Number::Finite(d) => Number::Finite(-d),
            Number::Infinite { negative } => Number::infinity(!negative),
            Number::NaN => Number::NaN,
        }
    }
}

impl Add for Number {
    type Output = Number;

    fn add(self, rhs: Number) -> Number {
        match (self, rhs) {
            (Number::NaN, _) | (_, Number::NaN) => Number::NaN,
            (Number::Infinite { negative: a }, Number::Infinite { negative: b }) => {
                if a == b {
                    self
                } else {
                    Number::NaN
                }
            }
            (Number::Infinite { .. }, _) => self,
            (_, Number::Infinite { .. }) => rhs,
            (Number::Finite(a), Number::Finite(b)) => match a.checked_add(b) {
                Some(d) => Number::Finite(d),
                None => Number::infinity(a.is_sign_negative()),
            },
        }
    }
}

impl Sub for Number {
    type Output = Number;

    fn sub(self, rhs: Number) -> Number {
        self + (-rhs)
    }
}

impl Mul for Number {
    type Output = Number;

    fn mul(self, rhs: Number) -> Number {
        match (self, rhs) {
            (Number::NaN, _) | (_, Number::NaN) => Number::NaN,
            (Number::Finite(a), Number::Finite(b)) => match a.checked_mul(b) {
                Some(d) => Number::Finite(d),
                None => Number::infinity(self.is_negative() != rhs.is_negative()),
            },
            // Infinity times zero
            _ if self.is_zero() || rhs.is_zero() => Number::NaN,
            _ => Number::infinity(self.is_negative() != rhs.is_negative()),
        }
    }
}

impl Div for Number {
    type Output = Number;

    fn div(self, rhs: Number) -> Number {
        match (self, rhs) {
            (Number::NaN, _) | (_, Number::NaN) => Number::NaN,
            (Number::Infinite { .. }, Number::Infinite { .. }) => Number::NaN,
            (Number::Infinite { .. }, _) => {
                Number::infinity(self.is_negative() != rhs.is_negative())
            }
            (Number::Finite(_), Number::Infinite { .. }) => Number::ZERO,
            (Number::Finite(a), Number::Finite(b)) => {
                if b.is_zero() {
                    if a.is_zero() {
                        Number::NaN
                    } else {
                        Number::infinity(self.is_negative())
                    }
                } else {
                    match a.checked_div(b) {
                        Some(d) => Number::Finite(d),
                        None => Number::infinity(self.is_negative() != rhs.is_negative()),
                    }
                }
            }
        }
    }
}

impl Rem for Number {
    type Output = Number;

    /// Truncated remainder; the result takes the sign of the dividend
    fn rem(self, rhs: Number) -> Number {
        match (self, rhs) {
            (Number::Finite(a), Number::Finite(b)) => match a.checked_rem(b) {
                Some(d) => Number::Finite(d),
                None => Number::NaN,
            },
            (Number::Finite(_), Number::Infinite { .. }) => self,
            _ => Number::NaN,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn n(text: &str) -> Number {
        Number::parse(text)
    }

    #[test]
    fn test_parse() {
        assert_eq!(n("12.5"), Number::Finite(Decimal::new(125, 1)));
        assert_eq!(n("7."), Number::from(7));
        assert_eq!(n("-3"), Number::from(-3));
        assert_eq!(n("1.2.3"), Number::NaN);
        assert_eq!(n("abc"), Number::NaN);
        assert_eq!(n(""), Number::NaN);
        assert_eq!(n("NaN"), Number::NaN);
        assert_eq!(n("-Infinity"), Number::NEG_INFINITY);
        assert_eq!(n("1e40"), Number::INFINITY);
    }

    #[test]
    fn test_display() {
        assert_eq!(n("2.50").to_string(), "2.5");
        assert_eq!(n("1024").to_string(), "1024");
        assert_eq!((n("-1") * n("0")).to_string(), "0");
        assert_eq!(Number::NaN.to_string(), "NaN");
        assert_eq!(Number::NEG_INFINITY.to_string(), "-Infinity");
    }

    #[test]
    fn test_equality_is_numeric_for_finite_values() {
        assert_eq!(n("2.0"), n("2"));
        assert_eq!(Number::NaN, Number::NaN);
        assert_ne!(Number::INFINITY, Number::NEG_INFINITY);
    }

    #[test]
    fn test_division_by_zero() {
        assert_eq!(n("1") / n("0"), Number::INFINITY);
        assert_eq!(n("-1") / n("0"), Number::NEG_INFINITY);
        assert_eq!(n("0") / n("0"), Number::NaN);
        assert_eq!(n("5") % n("0"), Number::NaN);
    }

    #[test]
    fn test_remainder_sign_follows_dividend() {
        assert_eq!(n("7") % n("3"), n("1"));
        assert_eq!(n("-7") % n("3"), n("-1"));
        assert_eq!(n("7.5") % n("2"), n("1.5"));
    }

    #[test]
    fn test_exact_decimal_arithmetic() {
        assert_eq!(n("0.1") + n("0.2"), n("0.3"));
        assert_eq!(n("1") / n("4"), n("0.25"));
        assert_eq!(n("3") - n("2") - n("1"), Number::ZERO);
    }

    #[test]
    fn test_sentinels_propagate() {
        assert_eq!(Number::NaN + n("1"), Number::NaN);
        assert_eq!(n("1") * Number::NaN, Number::NaN);
        assert_eq!(Number::INFINITY + Number::NEG_INFINITY, Number::NaN);
        assert_eq!(Number::INFINITY * n("0"), Number::NaN);
        assert_eq!(Number::INFINITY * n("-2"), Number::NEG_INFINITY);
        assert_eq!(n("3") / Number::INFINITY, Number::ZERO);
        assert_eq!(n("3") % Number::INFINITY, n("3"));
    }

    #[test]
    fn test_overflow_becomes_infinity() {
        let max = Number::Finite(Decimal::MAX);
        assert_eq!(max + max, Number::INFINITY);
        assert_eq!(max * n("-2"), Number::NEG_INFINITY);
    }

    #[test]
    fn test_integer_power_is_exact() {
        assert_eq!(n("2").pow(n("10")), n("1024"));
        assert_eq!(n("1.5").pow(n("2")), n("2.25"));
        assert_eq!(n("-2").pow(n("3")), n("-8"));
        assert_eq!(n("2").pow(n("-2")), n("0.25"));
        assert_eq!(n("0").pow(n("-1")), Number::INFINITY);
        assert_eq!(n("9").pow(n("0")), Number::ONE);
    }

    #[test]
    fn test_fractional_power_is_approximate() {
        let root = n("4").pow(n("0.5"));
        assert!((root.to_f64() - 2.0).abs() < 1e-9);
        assert_eq!(n("-4").pow(n("0.5")), Number::NaN);
    }

    #[test]
    fn test_from_f64() {
        assert_eq!(Number::from(f64::NAN), Number::NaN);
        assert_eq!(Number::from(f64::NEG_INFINITY), Number::NEG_INFINITY);
        assert_eq!(Number::from(1e40), Number::INFINITY);
        assert_eq!(Number::from(0.5), n("0.5"));
    }
}
