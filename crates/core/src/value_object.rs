//! Value objects: equality by value, not identity.

use core::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::decimal::Decimal;
use crate::error::DomainError;

/// Marker trait for value objects.
///
/// Value objects are immutable and compared by their attribute values. To
/// "modify" one, build a new one.
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}

/// A strictly positive price with two decimal places (`decimal(10, 2)`).
///
/// Stored as an integer number of cents. Serialized as a decimal string
/// (`"1299.99"`) so JSON consumers never see binary float artifacts.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Price(i64);

impl ValueObject for Price {}

impl Price {
    /// Largest representable price: `99999999.99`.
    pub const MAX_CENTS: i64 = 9_999_999_999;

    pub fn from_cents(cents: i64) -> Result<Self, DomainError> {
        if cents <= 0 {
            return Err(DomainError::validation(format!(
                "price must be positive, got {cents} cents"
            )));
        }
        if cents > Self::MAX_CENTS {
            return Err(DomainError::invariant(format!(
                "price exceeds {} cents: {cents}",
                Self::MAX_CENTS
            )));
        }
        Ok(Self(cents))
    }

    /// Quantize an exact decimal to cents (ties to even) and validate the range.
    pub fn from_decimal(value: &Decimal) -> Result<Self, DomainError> {
        let cents = value
            .round_cents_half_even()
            .ok_or_else(|| DomainError::invariant("price out of range"))?;
        let cents = i64::try_from(cents).map_err(|_| DomainError::invariant("price out of range"))?;
        Self::from_cents(cents)
    }

    pub fn cents(&self) -> i64 {
        self.0
    }
}

/// Format an integer amount of cents as `units.cc`.
pub fn format_cents(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.unsigned_abs();
    format!("{sign}{}.{:02}", abs / 100, abs % 100)
}

impl core::fmt::Display for Price {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&format_cents(self.0))
    }
}

impl FromStr for Price {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_decimal(&s.parse::<Decimal>()?)
    }
}

impl Serialize for Price {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Price {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
