//! Exact decimal numbers parsed from text.
//!
//! Feed prices and filter bounds arrive as text. Parsing them into binary floats
//! and back loses exactness at the cent boundary (`0.29 * 100.0 != 29.0`), so
//! values are kept as an integer mantissa with a power-of-ten scale and rounded
//! to cents with integer arithmetic only.

use core::str::FromStr;

use crate::error::DomainError;

/// Maximum number of significant digits accepted in the mantissa.
const MAX_DIGITS: usize = 30;

/// Rescaling by more than this many powers of ten yields a magnitude below one cent.
const MAX_RESCALE: u32 = 36;

/// An exact decimal value `mantissa * 10^-scale`.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Decimal {
    mantissa: i128,
    scale: u32,
}

impl Decimal {
    pub fn new(mantissa: i128, scale: u32) -> Self {
        Self { mantissa, scale }
    }

    pub fn mantissa(&self) -> i128 {
        self.mantissa
    }

    pub fn scale(&self) -> u32 {
        self.scale
    }

    pub fn is_positive(&self) -> bool {
        self.mantissa > 0
    }

    /// Round to an integer number of cents, ties to even.
    ///
    /// Returns `None` when the result does not fit in an `i128`.
    pub fn round_cents_half_even(&self) -> Option<i128> {
        if self.scale <= 2 {
            return self.mantissa.checked_mul(10_i128.checked_pow(2 - self.scale)?);
        }

        let shift = self.scale - 2;
        if shift > MAX_RESCALE {
            return Some(0);
        }
        let divisor = 10_i128.pow(shift);

        let magnitude = self.mantissa.checked_abs()?;
        let mut quotient = magnitude / divisor;
        let remainder = magnitude % divisor;
        let rest = divisor - remainder;

        if remainder > rest || (remainder == rest && quotient % 2 == 1) {
            quotient += 1;
        }

        Some(if self.mantissa < 0 { -quotient } else { quotient })
    }

    /// Smallest integer number of cents that is `>=` this value.
    pub fn ceil_cents(&self) -> Option<i128> {
        if self.scale <= 2 {
            return self.round_cents_half_even();
        }

        let shift = self.scale - 2;
        if shift > MAX_RESCALE {
            return Some(if self.mantissa > 0 { 1 } else { 0 });
        }
        let divisor = 10_i128.pow(shift);
        Some(-(self.mantissa.checked_neg()?.div_euclid(divisor)))
    }

    /// Largest integer number of cents that is `<=` this value.
    pub fn floor_cents(&self) -> Option<i128> {
        if self.scale <= 2 {
            return self.round_cents_half_even();
        }

        let shift = self.scale - 2;
        if shift > MAX_RESCALE {
            return Some(if self.mantissa < 0 { -1 } else { 0 });
        }
        let divisor = 10_i128.pow(shift);
        Some(self.mantissa.div_euclid(divisor))
    }
}

impl FromStr for Decimal {
    type Err = DomainError;

    /// Accepts `[+-]digits[.digits][(e|E)[+-]digits]` with at least one digit in
    /// the significand. Infinity and NaN spellings are rejected.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || DomainError::validation(format!("not a number: {s:?}"));

        let text = s.trim();
        let (negative, text) = match text.as_bytes().first() {
            Some(b'-') => (true, &text[1..]),
            Some(b'+') => (false, &text[1..]),
            _ => (false, text),
        };

        let (significand, exponent) = match text.find(['e', 'E']) {
            Some(pos) => (&text[..pos], Some(&text[pos + 1..])),
            None => (text, None),
        };

        let (int_part, frac_part) = match significand.split_once('.') {
            Some((i, f)) => (i, f),
            None => (significand, ""),
        };

        if int_part.is_empty() && frac_part.is_empty() {
            return Err(invalid());
        }
        if !int_part.bytes().all(|b| b.is_ascii_digit())
            || !frac_part.bytes().all(|b| b.is_ascii_digit())
        {
            return Err(invalid());
        }

        // Trailing fractional zeros carry no value.
        let frac_part = frac_part.trim_end_matches('0');
        let digits: String = format!("{int_part}{frac_part}");
        let digits = digits.trim_start_matches('0');
        if digits.len() > MAX_DIGITS {
            return Err(DomainError::validation(format!("too many digits: {s:?}")));
        }

        let mut mantissa: i128 = if digits.is_empty() {
            0
        } else {
            digits.parse::<i128>().map_err(|_| invalid())?
        };
        if negative {
            mantissa = -mantissa;
        }

        let exponent: i64 = match exponent {
            Some(e) => {
                let (sign, body) = match e.as_bytes().first() {
                    Some(b'-') => (-1, &e[1..]),
                    Some(b'+') => (1, &e[1..]),
                    _ => (1, e),
                };
                if body.is_empty() || body.len() > 6 || !body.bytes().all(|b| b.is_ascii_digit()) {
                    return Err(invalid());
                }
                sign * body.parse::<i64>().map_err(|_| invalid())?
            }
            None => 0,
        };

        let scale = frac_part.len() as i64 - exponent;
        if scale >= 0 {
            let scale = u32::try_from(scale).map_err(|_| invalid())?;
            Ok(Self { mantissa, scale })
        } else {
            let factor = u32::try_from(-scale)
                .ok()
                .and_then(|p| 10_i128.checked_pow(p))
                .ok_or_else(|| DomainError::validation(format!("number out of range: {s:?}")))?;
            let mantissa = mantissa
                .checked_mul(factor)
                .ok_or_else(|| DomainError::validation(format!("number out of range: {s:?}")))?;
            Ok(Self { mantissa, scale: 0 })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn parses_plain_and_fractional_numbers() {
        assert_eq!(d("1299.99"), Decimal::new(129999, 2));
        assert_eq!(d("42"), Decimal::new(42, 0));
        assert_eq!(d("-50"), Decimal::new(-50, 0));
        assert_eq!(d(".5"), Decimal::new(5, 1));
        assert_eq!(d("5."), Decimal::new(5, 0));
        assert_eq!(d(" +7.25 "), Decimal::new(725, 2));
    }

    #[test]
    fn trailing_fraction_zeros_do_not_count_as_digits() {
        let long = format!("10.{}", "0".repeat(30));
        assert_eq!(d(&long), Decimal::new(10, 0));
        assert_eq!(d(&long).round_cents_half_even(), Some(1000));
        assert_eq!(d("10.00"), Decimal::new(10, 0));
        assert_eq!(d("0.500"), Decimal::new(5, 1));

        let too_long = format!("1.{}1", "0".repeat(30));
        assert!(too_long.parse::<Decimal>().is_err());
    }

    #[test]
    fn parses_exponents() {
        assert_eq!(d("1e3"), Decimal::new(1000, 0));
        assert_eq!(d("1.5E-2"), Decimal::new(15, 3));
    }

    #[test]
    fn rejects_garbage() {
        for s in ["", "invalid", "inf", "NaN", "1.2.3", "e5", "1e", "12,50", "--1"] {
            assert!(s.parse::<Decimal>().is_err(), "{s:?} should be rejected");
        }
    }

    #[test]
    fn rounds_half_even_to_cents() {
        assert_eq!(d("10.005").round_cents_half_even(), Some(1000));
        assert_eq!(d("10.015").round_cents_half_even(), Some(1002));
        assert_eq!(d("10.0151").round_cents_half_even(), Some(1002));
        assert_eq!(d("-10.015").round_cents_half_even(), Some(-1002));
        assert_eq!(d("29.99").round_cents_half_even(), Some(2999));
        assert_eq!(d("0.001").round_cents_half_even(), Some(0));
    }

    #[test]
    fn ceil_and_floor_cents() {
        assert_eq!(d("29.995").ceil_cents(), Some(3000));
        assert_eq!(d("29.995").floor_cents(), Some(2999));
        assert_eq!(d("-0.001").ceil_cents(), Some(0));
        assert_eq!(d("-0.001").floor_cents(), Some(-1));
        assert_eq!(d("100").ceil_cents(), Some(10000));
        assert_eq!(d("0.29").floor_cents(), Some(29));
    }
}
