//! Numeric values recorded by instruments.

use std::fmt;

use serde::Deserialize;

/// The numeric kind of an instrument.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum NumberKind {
    /// Signed 64-bit integers.
    Integer,

    /// 64-bit floating-point numbers.
    Float,
}

impl NumberKind {
    /// Widens a number to `f64` for sketch math, first coercing it to this kind.
    ///
    /// A float recorded against an integer instrument is truncated toward zero before widening.
    pub fn to_f64(self, number: Number) -> f64 {
        match self {
            Self::Integer => number.as_i64() as f64,
            Self::Float => number.as_f64(),
        }
    }

    /// Narrows an `f64` back to a number of this kind.
    ///
    /// Integer results are truncated toward zero, saturating at the bounds of `i64`. NaN narrows to zero.
    pub fn from_f64(self, value: f64) -> Number {
        match self {
            Self::Integer => Number::Integer(value as i64),
            Self::Float => Number::Float(value),
        }
    }

    /// Returns the zero value of this kind.
    pub fn zero(self) -> Number {
        match self {
            Self::Integer => Number::Integer(0),
            Self::Float => Number::Float(0.0),
        }
    }

    /// Returns the name of this kind.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Integer => "integer",
            Self::Float => "float",
        }
    }
}

impl fmt::Display for NumberKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A number recorded by, or read back from, an instrument.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Number {
    /// An integer value.
    Integer(i64),

    /// A floating-point value.
    Float(f64),
}

impl Number {
    /// Returns the kind of this number.
    pub fn kind(&self) -> NumberKind {
        match self {
            Self::Integer(_) => NumberKind::Integer,
            Self::Float(_) => NumberKind::Float,
        }
    }

    /// Returns this number as an `f64`.
    pub fn as_f64(&self) -> f64 {
        match self {
            Self::Integer(n) => *n as f64,
            Self::Float(n) => *n,
        }
    }

    /// Returns this number as an `i64`, truncating floats toward zero.
    pub fn as_i64(&self) -> i64 {
        match self {
            Self::Integer(n) => *n,
            Self::Float(n) => *n as i64,
        }
    }
}

impl From<i64> for Number {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<f64> for Number {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(n) => write!(f, "{}", n),
            Self::Float(n) => write!(f, "{}", n),
        }
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn widen() {
        assert_eq!(NumberKind::Integer.to_f64(Number::Integer(-7)), -7.0);
        assert_eq!(NumberKind::Float.to_f64(Number::Float(2.5)), 2.5);
        assert_eq!(NumberKind::Float.to_f64(Number::Integer(3)), 3.0);

        // Coerced to the instrument's kind first.
        assert_eq!(NumberKind::Integer.to_f64(Number::Float(2.9)), 2.0);
        assert_eq!(NumberKind::Integer.to_f64(Number::Float(-2.9)), -2.0);
    }

    #[test]
    fn narrow_truncates_toward_zero() {
        assert_eq!(NumberKind::Integer.from_f64(2.99), Number::Integer(2));
        assert_eq!(NumberKind::Integer.from_f64(-2.99), Number::Integer(-2));
        assert_eq!(NumberKind::Integer.from_f64(f64::NAN), Number::Integer(0));
        assert_eq!(NumberKind::Integer.from_f64(1e300), Number::Integer(i64::MAX));
        assert_eq!(NumberKind::Float.from_f64(2.99), Number::Float(2.99));
    }

    #[test]
    fn kinds() {
        assert_eq!(Number::from(1i64).kind(), NumberKind::Integer);
        assert_eq!(Number::from(1.0f64).kind(), NumberKind::Float);
        assert_eq!(NumberKind::Integer.zero(), Number::Integer(0));
        assert_eq!(NumberKind::Float.to_string(), "float");
    }

    proptest! {
        #[test]
        fn property_test_integers_survive_widening(n in -(1i64 << 53)..(1i64 << 53)) {
            let kind = NumberKind::Integer;
            prop_assert_eq!(kind.from_f64(kind.to_f64(Number::Integer(n))), Number::Integer(n));
        }

        #[test]
        fn property_test_narrowing_truncates(value in -1e15f64..1e15) {
            let Number::Integer(n) = NumberKind::Integer.from_f64(value) else {
                panic!("integer kind should narrow to an integer");
            };
            prop_assert!((value - n as f64).abs() < 1.0);
            prop_assert!(n == 0 || n.signum() as f64 == value.signum());
        }
    }
}
