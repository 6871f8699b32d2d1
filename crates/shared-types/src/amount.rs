//! Decimal-string amounts.
//!
//! Values travel as base-10 strings in the smallest unit (wei, lamports,
//! token units). Numeric work goes through [`U256`], which is also the range
//! of the durable `NUMERIC(78,0)` column; anything wider is not a valid
//! amount.

use primitive_types::U256;
use std::cmp::Ordering;
use std::fmt;

/// Parse a plain run of ASCII digits into a [`U256`].
///
/// Signs, separators, exponents and values above `U256::MAX` yield `None`.
pub fn parse_unsigned(value: &str) -> Option<U256> {
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    U256::from_dec_str(value).ok()
}

/// True if `value` is a non-empty run of ASCII digits within U256 range.
pub fn is_unsigned_integer(value: &str) -> bool {
    parse_unsigned(value).is_some()
}

/// Numeric comparison of two unsigned integer strings.
///
/// Returns `None` when either side is not an unsigned integer.
pub fn compare_unsigned(a: &str, b: &str) -> Option<Ordering> {
    Some(parse_unsigned(a)?.cmp(&parse_unsigned(b)?))
}

/// Lower bound for the `min_value` filter.
///
/// Accepts integer or fractional decimal input (`"100"`, `"1.5"`, `"-3"`).
/// Since stored values are integers, a fractional bound is rounded up and a
/// negative bound admits everything. A bound above `U256::MAX` saturates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValueThreshold {
    bound: U256,
}

impl ValueThreshold {
    /// Parse a user-supplied bound; `None` if it is not a plain decimal.
    pub fn parse(input: &str) -> Option<Self> {
        let input = input.trim();
        let (negative, body) = match input.as_bytes().first() {
            Some(b'-') => (true, &input[1..]),
            Some(b'+') => (false, &input[1..]),
            _ => (false, input),
        };

        let (int_part, frac_part) = body.split_once('.').unwrap_or((body, ""));
        if int_part.is_empty() && frac_part.is_empty() {
            return None;
        }
        let digits_ok = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
        if !digits_ok(int_part) || !digits_ok(frac_part) {
            return None;
        }

        if negative {
            return Some(Self { bound: U256::zero() });
        }

        let whole = if int_part.is_empty() {
            U256::zero()
        } else {
            U256::from_dec_str(int_part).unwrap_or(U256::MAX)
        };
        let bound = if frac_part.bytes().any(|b| b != b'0') {
            whole.saturating_add(U256::one())
        } else {
            whole
        };
        Some(Self { bound })
    }

    pub fn bound(&self) -> U256 {
        self.bound
    }

    /// True if `value` is numeric and at least the bound.
    pub fn admits(&self, value: &str) -> bool {
        parse_unsigned(value).is_some_and(|v| v >= self.bound)
    }
}

impl fmt::Display for ValueThreshold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.bound)
    }
}
