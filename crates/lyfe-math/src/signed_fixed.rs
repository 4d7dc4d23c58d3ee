//! Signed fixed-point arithmetic for the elliptic pools
//!
//! "Mag" operations round the magnitude (toward or away from zero) rather
//! than toward negative infinity. "Xp" values carry 38 decimals; the
//! `*_xp_to_np` helpers multiply an 18 decimal value by a 38 decimal one and
//! return 18 decimals. `BigInt` division truncates toward zero, matching the
//! contracts.

use lyfe_core::MathError;
use num_bigint::BigInt;
use num_traits::{Signed, Zero};

use crate::fixed_point::one;
use crate::MathResult;

/// 1.0 with 38 decimals
pub fn one_xp() -> BigInt {
    BigInt::from(10u8).pow(38)
}

fn ten_19() -> BigInt {
    BigInt::from(10u8).pow(19)
}

pub fn mul_down_mag(a: &BigInt, b: &BigInt) -> BigInt {
    (a * b) / one()
}

pub fn mul_up_mag(a: &BigInt, b: &BigInt) -> BigInt {
    let product = a * b;
    if product.is_positive() {
        (product - 1) / one() + 1
    } else if product.is_negative() {
        (product + 1) / one() - 1
    } else {
        BigInt::zero()
    }
}

pub fn div_down_mag(a: &BigInt, b: &BigInt) -> MathResult<BigInt> {
    if b.is_zero() {
        return Err(MathError::DivisionByZero);
    }
    if a.is_zero() {
        return Ok(BigInt::zero());
    }
    Ok((a * one()) / b)
}

pub fn div_up_mag(a: &BigInt, b: &BigInt) -> MathResult<BigInt> {
    if b.is_zero() {
        return Err(MathError::DivisionByZero);
    }
    if a.is_zero() {
        return Ok(BigInt::zero());
    }
    let (a, b) = if b.is_negative() { (-a, -b) } else { (a.clone(), b.clone()) };
    let a_inflated = a * one();
    if a_inflated.is_positive() {
        Ok((a_inflated - 1) / b + 1)
    } else {
        Ok((a_inflated + 1) / b - 1)
    }
}

pub fn mul_xp(a: &BigInt, b: &BigInt) -> BigInt {
    (a * b) / one_xp()
}

pub fn div_xp(a: &BigInt, b: &BigInt) -> MathResult<BigInt> {
    if b.is_zero() {
        return Err(MathError::DivisionByZero);
    }
    if a.is_zero() {
        return Ok(BigInt::zero());
    }
    Ok((a * one_xp()) / b)
}

/// `a * b` with `a` in 18 and `b` in 38 decimals, rounded down, 18 decimals out
pub fn mul_down_xp_to_np(a: &BigInt, b: &BigInt) -> BigInt {
    let e19 = ten_19();
    let b1 = b / &e19;
    let b2 = b % &e19;
    let prod1 = a * b1;
    let prod2 = a * b2;
    if !prod1.is_negative() && !prod2.is_negative() {
        (prod1 + prod2 / &e19) / &e19
    } else {
        (prod1 + prod2 / &e19 + 1) / &e19 - 1
    }
}

/// `a * b` with `a` in 18 and `b` in 38 decimals, rounded up, 18 decimals out
pub fn mul_up_xp_to_np(a: &BigInt, b: &BigInt) -> BigInt {
    let e19 = ten_19();
    let b1 = b / &e19;
    let b2 = b % &e19;
    let prod1 = a * b1;
    let prod2 = a * b2;
    if !prod1.is_positive() && !prod2.is_positive() {
        (prod1 + prod2 / &e19) / &e19
    } else {
        (prod1 + prod2 / &e19 - 1) / &e19 + 1
    }
}
