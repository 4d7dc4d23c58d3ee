//! Decimal scaling at the engine boundary
//!
//! Snapshots carry human decimal strings; engines work on fixed18 integers;
//! callers receive smallest-unit integers in the token's native decimals.

use lyfe_core::MathError;
use num_bigint::BigInt;
use num_traits::{FromPrimitive, Signed, ToPrimitive, Zero};

use crate::fixed_point::pow10;
use crate::MathResult;

/// Parse a decimal string into an integer scaled by `10^decimals`.
///
/// Digits beyond `decimals` are truncated.
pub fn parse_fixed(value: &str, decimals: u8) -> MathResult<BigInt> {
    let invalid = || MathError::InvalidDecimal {
        value: value.to_string(),
    };

    let trimmed = value.trim();
    let (negative, unsigned) = match trimmed.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, trimmed),
    };
    let (whole, fraction) = match unsigned.split_once('.') {
        Some((w, f)) => (w, f),
        None => (unsigned, ""),
    };
    if whole.is_empty() && fraction.is_empty() {
        return Err(invalid());
    }
    if !whole.chars().all(|c| c.is_ascii_digit()) || !fraction.chars().all(|c| c.is_ascii_digit())
    {
        return Err(invalid());
    }

    let decimals = decimals as usize;
    let mut digits = String::with_capacity(whole.len() + decimals);
    digits.push_str(whole);
    let kept: String = fraction.chars().take(decimals).collect();
    digits.push_str(&kept);
    for _ in kept.len()..decimals {
        digits.push('0');
    }
    if digits.is_empty() {
        digits.push('0');
    }

    let parsed: BigInt = digits.parse().map_err(|_| invalid())?;
    Ok(if negative { -parsed } else { parsed })
}

/// Render an integer scaled by `10^decimals` as a decimal string
pub fn format_fixed(value: &BigInt, decimals: u8) -> String {
    let factor = pow10(decimals as u32);
    let magnitude = value.abs();
    let whole = &magnitude / &factor;
    let fraction = &magnitude % &factor;
    let sign = if value.is_negative() { "-" } else { "" };

    if fraction.is_zero() {
        return format!("{}{}", sign, whole);
    }
    let fraction = format!("{:0>width$}", fraction.to_string(), width = decimals as usize);
    format!("{}{}.{}", sign, whole, fraction.trim_end_matches('0'))
}

/// Truncate a fixed18 amount to `decimals` digits of precision
pub fn round_down_to_decimals(amount: &BigInt, decimals: u8) -> BigInt {
    if decimals >= 18 {
        return amount.clone();
    }
    let factor = pow10(18 - decimals as u32);
    (amount / &factor) * factor
}

/// Round a non-negative fixed18 amount up to `decimals` digits of precision
pub fn round_up_to_decimals(amount: &BigInt, decimals: u8) -> BigInt {
    if decimals >= 18 {
        return amount.clone();
    }
    let factor = pow10(18 - decimals as u32);
    let truncated = (amount / &factor) * &factor;
    if truncated == *amount {
        truncated
    } else {
        truncated + factor
    }
}

/// Fixed18 amount to smallest units of a token with `decimals`, rounding down
pub fn to_native(amount: &BigInt, decimals: u8) -> BigInt {
    if decimals >= 18 {
        return amount * pow10(decimals as u32 - 18);
    }
    amount / pow10(18 - decimals as u32)
}

/// Smallest units of a token with `decimals` to fixed18
pub fn from_native(amount: &BigInt, decimals: u8) -> BigInt {
    if decimals >= 18 {
        return amount / pow10(decimals as u32 - 18);
    }
    amount * pow10(18 - decimals as u32)
}

/// Lossy conversion of a scaled integer to `f64`, used for ranking math only
pub fn to_f64(value: &BigInt, decimals: u8) -> f64 {
    value.to_f64().unwrap_or(f64::NAN) / 10f64.powi(decimals as i32)
}

/// Lossy conversion of an `f64` to a fixed18 integer, truncating toward zero.
///
/// NaN and infinities (including products that overflow) are rejected.
pub fn from_f64(value: f64) -> MathResult<BigInt> {
    BigInt::from_f64(value * 1e18).ok_or_else(|| MathError::FloatOutOfRange {
        value: value.to_string(),
    })
}
