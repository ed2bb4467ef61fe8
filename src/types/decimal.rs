//! Fixed-Point Decimal
//!
//! Exchange rates are stored with 18 fractional digits over a `u128`, the
//! same precision the controller chain uses for its `Dec` type. Values are
//! never negative and never pass through floating point.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Number of fractional digits
pub const DECIMAL_PLACES: u32 = 18;

const UNIT: u128 = 1_000_000_000_000_000_000;

/// Non-negative fixed-point decimal
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Dec(u128);

impl Dec {
    pub const fn zero() -> Self {
        Self(0)
    }

    pub const fn one() -> Self {
        Self(UNIT)
    }

    /// Build from raw atomics (value * 10^18)
    pub const fn from_atomics(atomics: u128) -> Self {
        Self(atomics)
    }

    pub fn from_int(value: u64) -> Self {
        Self(value as u128 * UNIT)
    }

    /// `numerator / denominator`, `None` on a zero denominator or overflow
    pub fn from_ratio(numerator: u128, denominator: u128) -> Option<Self> {
        if denominator == 0 {
            return None;
        }
        numerator.checked_mul(UNIT).map(|n| Self(n / denominator))
    }

    pub fn atomics(&self) -> u128 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn checked_add(self, other: Self) -> Option<Self> {
        self.0.checked_add(other.0).map(Self)
    }

    pub fn checked_sub(self, other: Self) -> Option<Self> {
        self.0.checked_sub(other.0).map(Self)
    }

    /// Truncating multiplication
    pub fn checked_mul(self, other: Self) -> Option<Self> {
        self.0.checked_mul(other.0).map(|p| Self(p / UNIT))
    }

    /// Truncating division
    pub fn checked_div(self, other: Self) -> Option<Self> {
        if other.0 == 0 {
            return None;
        }
        self.0.checked_mul(UNIT).map(|n| Self(n / other.0))
    }

    /// Apply this rate to an integer amount, truncating toward zero
    pub fn mul_int(&self, amount: u64) -> Option<u64> {
        (amount as u128)
            .checked_mul(self.0)
            .map(|p| p / UNIT)
            .and_then(|v| u64::try_from(v).ok())
    }
}

impl fmt::Display for Dec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{:0width$}",
            self.0 / UNIT,
            self.0 % UNIT,
            width = DECIMAL_PLACES as usize
        )
    }
}

/// Decimal parse errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecParseError {
    #[error("empty decimal string")]
    Empty,

    #[error("invalid decimal: {0}")]
    Invalid(String),

    #[error("too many fractional digits (max 18): {0}")]
    TooPrecise(String),

    #[error("decimal out of range: {0}")]
    Overflow(String),
}

impl FromStr for Dec {
    type Err = DecParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(DecParseError::Empty);
        }

        let (whole, frac) = match s.split_once('.') {
            Some((w, f)) => (w, f),
            None => (s, ""),
        };

        let all_digits = |part: &str| part.chars().all(|c| c.is_ascii_digit());
        if whole.is_empty() || !all_digits(whole) || !all_digits(frac) {
            return Err(DecParseError::Invalid(s.to_string()));
        }
        if frac.len() > DECIMAL_PLACES as usize {
            return Err(DecParseError::TooPrecise(s.to_string()));
        }

        let whole: u128 = whole
            .parse()
            .map_err(|_| DecParseError::Overflow(s.to_string()))?;
        let frac_atomics: u128 = if frac.is_empty() {
            0
        } else {
            let padded = format!("{:0<width$}", frac, width = DECIMAL_PLACES as usize);
            padded
                .parse()
                .map_err(|_| DecParseError::Invalid(s.to_string()))?
        };

        whole
            .checked_mul(UNIT)
            .and_then(|w| w.checked_add(frac_atomics))
            .map(Self)
            .ok_or_else(|| DecParseError::Overflow(s.to_string()))
    }
}

impl Serialize for Dec {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Dec {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_is_exact() {
        assert_eq!(Dec::one().to_string(), "1.000000000000000000");
        assert_eq!("1".parse::<Dec>().unwrap(), Dec::one());
        assert_eq!(Dec::from_int(1), Dec::one());
    }

    #[test]
    fn test_parse() {
        assert_eq!(
            "0.5".parse::<Dec>().unwrap(),
            Dec::from_atomics(500_000_000_000_000_000)
        );
        assert_eq!(
            "0.000000000000000001".parse::<Dec>().unwrap(),
            Dec::from_atomics(1)
        );
        assert!("-1".parse::<Dec>().is_err());
        assert!("".parse::<Dec>().is_err());
        assert!(".5".parse::<Dec>().is_err());
        assert!(matches!(
            "0.0000000000000000001".parse::<Dec>(),
            Err(DecParseError::TooPrecise(_))
        ));
    }

    #[test]
    fn test_repeated_multiplication_has_no_drift() {
        let mut rate = Dec::one();
        for _ in 0..1000 {
            rate = rate.checked_mul(Dec::one()).unwrap();
        }
        assert_eq!(rate, Dec::one());
    }

    #[test]
    fn test_ratio_and_mul_int() {
        let rate = Dec::from_ratio(105, 100).unwrap();
        assert_eq!(rate.to_string(), "1.050000000000000000");
        assert_eq!(rate.mul_int(1_000_000), Some(1_050_000));
        assert!(Dec::from_ratio(1, 0).is_none());
        assert!(Dec::one().checked_div(Dec::zero()).is_none());
    }

    #[test]
    fn test_serde_as_string() {
        let json = serde_json::to_string(&Dec::one()).unwrap();
        assert_eq!(json, "\"1.000000000000000000\"");
        let back: Dec = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Dec::one());
    }
}
