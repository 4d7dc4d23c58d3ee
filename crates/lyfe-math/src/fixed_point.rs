//! Fixed18 arithmetic
//!
//! Values are integers scaled by 10^18. Every operation names its rounding
//! direction; pricing formulas pick the direction that favors the pool.

use lyfe_core::MathError;
use num_bigint::BigInt;
use num_traits::{One, Zero};

use crate::log_exp;
use crate::MathResult;

/// 1.0 in fixed18, as a primitive
pub const ONE_U128: u128 = 1_000_000_000_000_000_000;

/// Relative error allowed in `log_exp::pow`, in wei per unit (1e-14)
pub const MAX_POW_RELATIVE_ERROR: u64 = 10_000;

/// 1.0 in fixed18
pub fn one() -> BigInt {
    BigInt::from(ONE_U128)
}

/// `value * 10^decimals`
pub fn pow10(decimals: u32) -> BigInt {
    BigInt::from(10u8).pow(decimals)
}

pub fn add(a: &BigInt, b: &BigInt) -> BigInt {
    a + b
}

/// Checked subtraction: fails if the result would be negative
pub fn sub(a: &BigInt, b: &BigInt) -> MathResult<BigInt> {
    if b > a {
        return Err(MathError::SubOverflow);
    }
    Ok(a - b)
}

pub fn mul_down_fixed(a: &BigInt, b: &BigInt) -> BigInt {
    (a * b) / one()
}

pub fn mul_up_fixed(a: &BigInt, b: &BigInt) -> BigInt {
    let product = a * b;
    if product.is_zero() {
        return product;
    }
    (product - 1) / one() + 1
}

pub fn div_down_fixed(a: &BigInt, b: &BigInt) -> MathResult<BigInt> {
    if b.is_zero() {
        return Err(MathError::DivisionByZero);
    }
    if a.is_zero() {
        return Ok(BigInt::zero());
    }
    Ok((a * one()) / b)
}

pub fn div_up_fixed(a: &BigInt, b: &BigInt) -> MathResult<BigInt> {
    if b.is_zero() {
        return Err(MathError::DivisionByZero);
    }
    if a.is_zero() {
        return Ok(BigInt::zero());
    }
    Ok((a * one() - 1) / b + 1)
}

/// Unscaled integer division rounding down
pub fn div_down(a: &BigInt, b: &BigInt) -> MathResult<BigInt> {
    if b.is_zero() {
        return Err(MathError::DivisionByZero);
    }
    Ok(a / b)
}

/// Unscaled integer division rounding up
pub fn div_up(a: &BigInt, b: &BigInt) -> MathResult<BigInt> {
    if b.is_zero() {
        return Err(MathError::DivisionByZero);
    }
    if a.is_zero() {
        return Ok(BigInt::zero());
    }
    Ok(BigInt::one() + (a - 1) / b)
}

/// `1 - x`, floored at zero
pub fn complement_fixed(x: &BigInt) -> BigInt {
    let one = one();
    if *x < one {
        one - x
    } else {
        BigInt::zero()
    }
}

/// `x^y` rounded down, with exact shortcuts for y in {1, 2, 4}
pub fn pow_down_fixed(x: &BigInt, y: &BigInt) -> MathResult<BigInt> {
    let one = one();
    if *y == one {
        return Ok(x.clone());
    }
    if *y == &one * 2 {
        return Ok(mul_down_fixed(x, x));
    }
    if *y == &one * 4 {
        let square = mul_down_fixed(x, x);
        return Ok(mul_down_fixed(&square, &square));
    }
    let raw = log_exp::pow(x, y)?;
    let max_error = mul_up_fixed(&raw, &BigInt::from(MAX_POW_RELATIVE_ERROR)) + 1;
    if raw < max_error {
        Ok(BigInt::zero())
    } else {
        Ok(raw - max_error)
    }
}

/// `x^y` rounded up, with exact shortcuts for y in {1, 2, 4}
pub fn pow_up_fixed(x: &BigInt, y: &BigInt) -> MathResult<BigInt> {
    let one = one();
    if *y == one {
        return Ok(x.clone());
    }
    if *y == &one * 2 {
        return Ok(mul_up_fixed(x, x));
    }
    if *y == &one * 4 {
        let square = mul_up_fixed(x, x);
        return Ok(mul_up_fixed(&square, &square));
    }
    let raw = log_exp::pow(x, y)?;
    let max_error = mul_up_fixed(&raw, &BigInt::from(MAX_POW_RELATIVE_ERROR)) + 1;
    Ok(raw + max_error)
}
