//! Exact NEAR amount handling.
//!
//! Balances on NEAR are `u128` yoctoNEAR values serialized as decimal strings
//! in JSON (`"1000000000000000000000000"`). [`NearToken`] wraps the raw value
//! so that yocto and NEAR amounts cannot be mixed by accident, and all
//! conversions go through exact integer/decimal-string arithmetic.
//!
//! - 1 NEAR = 10^24 yoctoNEAR
//! - `"0.3".parse::<NearToken>()` is exactly `300_000_000_000_000_000_000_000` yocto

use crate::core::constants::{NEAR_DECIMALS, NEAR_SYMBOL, YOCTO_PER_NEAR};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::ops::{Add, Sub};
use std::str::FromStr;
use thiserror::Error;

/// Errors produced while parsing a human-readable NEAR amount
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AmountParseError {
    #[error("amount is empty")]
    Empty,
    #[error("invalid digit in amount '{0}'")]
    InvalidDigit(String),
    #[error("amount '{0}' has more than {1} fractional digits")]
    TooPrecise(String, u32),
    #[error("amount '{0}' overflows u128 yoctoNEAR")]
    Overflow(String),
}

/// A NEAR amount stored as yoctoNEAR.
///
/// # Examples
/// ```
/// use sputnik_treasury::utils::balance::NearToken;
/// let limit: NearToken = "0.3".parse().unwrap();
/// assert_eq!(limit.as_yocto(), 300_000_000_000_000_000_000_000);
/// assert_eq!(limit.to_string(), "0.3 N");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct NearToken(u128);

impl NearToken {
    /// Zero NEAR.
    pub const ZERO: Self = Self(0);

    /// Exactly one NEAR.
    pub const ONE_NEAR: Self = Self(YOCTO_PER_NEAR);

    /// Create from raw yoctoNEAR.
    pub const fn from_yocto(yocto: u128) -> Self {
        Self(yocto)
    }

    /// Create from whole NEAR, saturating on overflow.
    pub const fn from_near(near: u128) -> Self {
        Self(near.saturating_mul(YOCTO_PER_NEAR))
    }

    /// Raw yoctoNEAR value.
    pub const fn as_yocto(self) -> u128 {
        self.0
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    pub fn checked_add(self, other: Self) -> Option<Self> {
        self.0.checked_add(other.0).map(Self)
    }

    pub fn checked_sub(self, other: Self) -> Option<Self> {
        self.0.checked_sub(other.0).map(Self)
    }

    pub fn saturating_add(self, other: Self) -> Self {
        Self(self.0.saturating_add(other.0))
    }

    pub fn saturating_sub(self, other: Self) -> Self {
        Self(self.0.saturating_sub(other.0))
    }

    /// Parse a yoctoNEAR decimal string as returned by the RPC (`"12500"`).
    pub fn parse_yocto(s: &str) -> Result<Self, AmountParseError> {
        let s = s.trim();
        if s.is_empty() {
            return Err(AmountParseError::Empty);
        }
        if !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(AmountParseError::InvalidDigit(s.to_string()));
        }
        s.parse::<u128>()
            .map(Self)
            .map_err(|_| AmountParseError::Overflow(s.to_string()))
    }

    /// Format as a NEAR decimal string without trailing zeros (`"1.5"`).
    pub fn format_near(self) -> String {
        format_units(self.0, NEAR_DECIMALS)
    }

    /// Format with at most `precision` fractional digits, truncating.
    pub fn format_near_truncated(self, precision: u32) -> String {
        let precision = precision.min(NEAR_DECIMALS);
        let scale = 10u128.pow(NEAR_DECIMALS - precision);
        format_units((self.0 / scale) * scale, NEAR_DECIMALS)
    }
}

/// Format an integer amount with `decimals` implied fractional digits.
///
/// Used for NEAR as well as fungible tokens, whose decimals come from
/// `ft_metadata`.
pub fn format_units(amount: u128, decimals: u32) -> String {
    if decimals == 0 {
        return amount.to_string();
    }
    // A scale past u128::MAX leaves every amount in the fractional part
    let (whole, fraction) = match 10u128.checked_pow(decimals) {
        Some(scale) => (amount / scale, amount % scale),
        None => (0, amount),
    };
    if fraction == 0 {
        return whole.to_string();
    }
    let fraction = format!("{:0width$}", fraction, width = decimals as usize);
    format!("{}.{}", whole, fraction.trim_end_matches('0'))
}

/// Parse a decimal string with at most `decimals` fractional digits into
/// integer units.
pub fn parse_units(s: &str, decimals: u32) -> Result<u128, AmountParseError> {
    let s = s.trim();
    if s.is_empty() {
        return Err(AmountParseError::Empty);
    }
    let (whole, fraction) = match s.split_once('.') {
        Some((w, f)) => (w, f),
        None => (s, ""),
    };
    let digits_ok = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
    if !digits_ok(whole) || !digits_ok(fraction) || (whole.is_empty() && fraction.is_empty()) {
        return Err(AmountParseError::InvalidDigit(s.to_string()));
    }
    if fraction.len() > decimals as usize {
        return Err(AmountParseError::TooPrecise(s.to_string(), decimals));
    }

    let overflow = || AmountParseError::Overflow(s.to_string());
    let whole: u128 = if whole.is_empty() {
        0
    } else {
        whole.parse().map_err(|_| overflow())?
    };
    let padded = format!("{:0<width$}", fraction, width = decimals as usize);
    let fraction: u128 = if padded.is_empty() {
        0
    } else {
        padded.parse().map_err(|_| overflow())?
    };

    let scaled = match 10u128.checked_pow(decimals) {
        Some(scale) => whole.checked_mul(scale),
        None if whole == 0 => Some(0),
        None => None,
    };
    scaled
        .and_then(|w| w.checked_add(fraction))
        .ok_or_else(overflow)
}

impl FromStr for NearToken {
    type Err = AmountParseError;

    /// Parse a human-readable NEAR amount (`"0.3"`, `"12"`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_units(s, NEAR_DECIMALS).map(Self)
    }
}

impl fmt::Display for NearToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.format_near(), NEAR_SYMBOL)
    }
}

impl Add for NearToken {
    type Output = Self;
    fn add(self, other: Self) -> Self {
        self.saturating_add(other)
    }
}

impl Sub for NearToken {
    type Output = Self;
    fn sub(self, other: Self) -> Self {
        self.saturating_sub(other)
    }
}

impl From<u128> for NearToken {
    fn from(value: u128) -> Self {
        Self(value)
    }
}

impl Serialize for NearToken {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0.to_string())
    }
}

impl<'de> Deserialize<'de> for NearToken {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        NearToken::parse_yocto(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_near_amounts() {
        assert_eq!(
            "0.3".parse::<NearToken>().unwrap().as_yocto(),
            300_000_000_000_000_000_000_000
        );
        assert_eq!("1".parse::<NearToken>().unwrap(), NearToken::ONE_NEAR);
        assert_eq!(
            ".5".parse::<NearToken>().unwrap().as_yocto(),
            YOCTO_PER_NEAR / 2
        );
        assert!("".parse::<NearToken>().is_err());
        assert!("1.2.3".parse::<NearToken>().is_err());
        assert!("-1".parse::<NearToken>().is_err());
        assert!(matches!(
            "0.0000000000000000000000001".parse::<NearToken>(),
            Err(AmountParseError::TooPrecise(_, 24))
        ));
    }

    #[test]
    fn test_format_near() {
        assert_eq!(NearToken::ZERO.format_near(), "0");
        assert_eq!(NearToken::from_near(12).format_near(), "12");
        assert_eq!(
            NearToken::from_yocto(50_000_000_000_000_000_000_000).format_near(),
            "0.05"
        );
        assert_eq!(NearToken::from_yocto(1).format_near(), "0.000000000000000000000001");
        assert_eq!(
            NearToken::from_yocto(1_234_567_000_000_000_000_000_000).format_near_truncated(2),
            "1.23"
        );
    }

    #[test]
    fn test_format_units_for_tokens() {
        assert_eq!(format_units(1_500_000, 6), "1.5");
        assert_eq!(format_units(42, 0), "42");
    }

    #[test]
    fn test_units_beyond_u128_scale() {
        assert_eq!(format_units(0, 40), "0");
        assert_eq!(format_units(15, 40), format!("0.{}15", "0".repeat(38)));
        assert_eq!(format_units(u128::MAX, 255).len(), 2 + 255);

        assert_eq!(parse_units(&format!("0.{}15", "0".repeat(38)), 40).unwrap(), 15);
        assert!(matches!(parse_units("1", 40), Err(AmountParseError::Overflow(_))));
        assert_eq!(parse_units("1.5", 6).unwrap(), 1_500_000);
    }

    #[test]
    fn test_serde_as_yocto_string() {
        let token = NearToken::from_yocto(12_500);
        assert_eq!(serde_json::to_string(&token).unwrap(), "\"12500\"");
        let back: NearToken = serde_json::from_str("\"12500\"").unwrap();
        assert_eq!(back, token);
        assert!(serde_json::from_str::<NearToken>("\"1.5\"").is_err());
    }

    #[test]
    fn test_saturating_ops() {
        let a = NearToken::from_near(1);
        let b = NearToken::from_near(2);
        assert_eq!(a - b, NearToken::ZERO);
        assert_eq!((a + b).format_near(), "3");
        assert_eq!(a.checked_sub(b), None);
    }
}
