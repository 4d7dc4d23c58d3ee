//! Fixed-point exponentiation via natural logarithm and exponent series
//!
//! Arguments and results are fixed18. Internally the exponent series runs in
//! 20 decimals and `ln` near 1 runs in 36 decimals to keep `pow` accurate
//! for bases close to one.

use lyfe_core::MathError;
use num_bigint::BigInt;
use num_traits::{One, Signed, Zero};

use crate::MathResult;

const ONE_18: u128 = 1_000_000_000_000_000_000;
const ONE_20: u128 = 100_000_000_000_000_000_000;

fn one_18() -> BigInt {
    BigInt::from(ONE_18)
}

fn one_20() -> BigInt {
    BigInt::from(ONE_20)
}

fn one_36() -> BigInt {
    BigInt::from(ONE_18) * BigInt::from(ONE_18)
}

fn max_natural_exponent() -> BigInt {
    BigInt::from(130u32) * one_18()
}

fn min_natural_exponent() -> BigInt {
    BigInt::from(-41i32) * one_18()
}

// Bounds of the band where ln is computed with 36 decimals
fn ln_36_lower_bound() -> BigInt {
    one_18() - BigInt::from(ONE_18 / 10)
}

fn ln_36_upper_bound() -> BigInt {
    one_18() + BigInt::from(ONE_18 / 10)
}

fn mild_exponent_bound() -> BigInt {
    (BigInt::one() << 254) / one_20()
}

fn big(digits: &str) -> BigInt {
    // constant table below is all decimal literals
    digits.parse().unwrap_or_default()
}

// 18 decimal constants
fn x0() -> BigInt {
    BigInt::from(128u32) * one_18()
}
fn a0() -> BigInt {
    big("38877084059945950922200000000000000000000000000000000000") // e^(x0), no decimals
}
fn x1() -> BigInt {
    BigInt::from(64u32) * one_18()
}
fn a1() -> BigInt {
    big("6235149080811616882910000000") // e^(x1), no decimals
}

/// 20 decimal constants: (x_n, e^(x_n)) for x_n = 32, 16, 8, 4, 2, 1, 1/2, 1/4, 1/8, 1/16
fn series_table() -> [(BigInt, BigInt); 10] {
    [
        (big("3200000000000000000000"), big("7896296018268069516100000000000000")),
        (big("1600000000000000000000"), big("888611052050787263676000000")),
        (big("800000000000000000000"), big("298095798704172827474000")),
        (big("400000000000000000000"), big("5459815003314423907810")),
        (big("200000000000000000000"), big("738905609893065022723")),
        (big("100000000000000000000"), big("271828182845904523536")),
        (big("50000000000000000000"), big("164872127070012814685")),
        (big("25000000000000000000"), big("128402541668774148407")),
        (big("12500000000000000000"), big("113314845306682631683")),
        (big("6250000000000000000"), big("106449445891785942956")),
    ]
}

/// `x^y` for fixed18 `x` and `y`
pub fn pow(x: &BigInt, y: &BigInt) -> MathResult<BigInt> {
    if y.is_zero() {
        return Ok(one_18());
    }
    if x.is_zero() {
        return Ok(BigInt::zero());
    }
    if (x >> 255u32) != BigInt::zero() {
        return Err(MathError::BaseOutOfBounds);
    }
    if *y >= mild_exponent_bound() {
        return Err(MathError::ExponentOutOfBounds);
    }

    let mut logx_times_y = if ln_36_lower_bound() < *x && *x < ln_36_upper_bound() {
        let ln_36_x = ln_36(x);
        // split to avoid overflowing the 36 decimal product on-chain
        (&ln_36_x / one_18()) * y + ((&ln_36_x % one_18()) * y) / one_18()
    } else {
        ln_inner(x)? * y
    };
    logx_times_y /= one_18();

    if logx_times_y < min_natural_exponent() || logx_times_y > max_natural_exponent() {
        return Err(MathError::ProductOutOfBounds);
    }
    exp(&logx_times_y)
}

/// Natural exponent `e^x` for fixed18 `x` in [-41, 130]
pub fn exp(x: &BigInt) -> MathResult<BigInt> {
    if *x < min_natural_exponent() || *x > max_natural_exponent() {
        return Err(MathError::InvalidExponent);
    }
    if x.is_negative() {
        let positive = exp(&-x)?;
        return Ok((one_18() * one_18()) / positive);
    }

    let mut x = x.clone();
    let first_an = if x >= x0() {
        x -= x0();
        a0()
    } else if x >= x1() {
        x -= x1();
        a1()
    } else {
        BigInt::one()
    };

    // 20 decimals from here on
    x *= 100;

    let mut product = one_20();
    for (xn, an) in series_table().iter().take(8) {
        if x >= *xn {
            x -= xn;
            product = (product * an) / one_20();
        }
    }

    // Taylor series up to the 12th term
    let mut series_sum = one_20();
    let mut term = x.clone();
    series_sum += &term;
    for n in 2u32..=12 {
        term = ((&term * &x) / one_20()) / n;
        series_sum += &term;
    }

    Ok((((product * series_sum) / one_20()) * first_an) / 100)
}

/// Natural logarithm of fixed18 `a`, `a > 0`
pub fn ln(a: &BigInt) -> MathResult<BigInt> {
    if !a.is_positive() {
        return Err(MathError::BaseOutOfBounds);
    }
    if ln_36_lower_bound() < *a && *a < ln_36_upper_bound() {
        Ok(ln_36(a) / one_18())
    } else {
        ln_inner(a)
    }
}

fn ln_inner(a: &BigInt) -> MathResult<BigInt> {
    if a.is_zero() {
        return Err(MathError::BaseOutOfBounds);
    }
    if *a < one_18() {
        let inverse = (one_18() * one_18()) / a;
        return Ok(-ln_inner(&inverse)?);
    }

    let mut a = a.clone();
    let mut sum = BigInt::zero();
    if a >= a0() * one_18() {
        a /= a0();
        sum += x0();
    }
    if a >= a1() * one_18() {
        a /= a1();
        sum += x1();
    }

    sum *= 100;
    a *= 100;

    for (xn, an) in series_table().iter() {
        if a >= *an {
            a = (a * one_20()) / an;
            sum += xn;
        }
    }

    // ln(a) = 2 * atanh(z), z = (a - 1) / (a + 1)
    let z = ((&a - one_20()) * one_20()) / (&a + one_20());
    let z_squared = (&z * &z) / one_20();

    let mut num = z.clone();
    let mut series_sum = num.clone();
    for d in [3u32, 5, 7, 9, 11] {
        num = (num * &z_squared) / one_20();
        series_sum += &num / d;
    }
    series_sum *= 2;

    Ok((sum + series_sum) / 100)
}

// ln with 36 decimals of precision, for x close to one
fn ln_36(x: &BigInt) -> BigInt {
    let x = x * one_18();

    let z = ((&x - one_36()) * one_36()) / (&x + one_36());
    let z_squared = (&z * &z) / one_36();

    let mut num = z.clone();
    let mut series_sum = num.clone();
    for d in [3u32, 5, 7, 9, 11, 13, 15] {
        num = (num * &z_squared) / one_36();
        series_sum += &num / d;
    }
    series_sum * 2
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixed(v: i64) -> BigInt {
        BigInt::from(v) * one_18()
    }

    #[test]
    fn test_exp_one() {
        let e = exp(&one_18()).unwrap();
        let truth = BigInt::from(2_718_281_828_459_045_235u128);
        assert!((&e - &truth).abs() < BigInt::from(1_000));
    }

    #[test]
    fn test_exp_negative_is_reciprocal() {
        let pos = exp(&fixed(3)).unwrap();
        let neg = exp(&fixed(-3)).unwrap();
        assert_eq!(neg, (one_18() * one_18()) / pos);
    }

    #[test]
    fn test_exp_bounds() {
        assert_eq!(exp(&fixed(131)), Err(MathError::InvalidExponent));
        assert_eq!(exp(&fixed(-42)), Err(MathError::InvalidExponent));
    }

    #[test]
    fn test_ln_of_ten() {
        let l = ln(&fixed(10)).unwrap();
        let truth = BigInt::from(2_302_585_092_994_045_684u128);
        assert!((&l - &truth).abs() < BigInt::from(1_000));
    }

    #[test]
    fn test_ln_below_one_is_negative() {
        let half = BigInt::from(ONE_18 / 2);
        let l = ln(&half).unwrap();
        let truth = BigInt::from(-693_147_180_559_945_309i128);
        assert!((&l - &truth).abs() < BigInt::from(1_000));
    }

    #[test]
    fn test_pow_trivial_cases() {
        assert_eq!(pow(&fixed(5), &BigInt::zero()).unwrap(), one_18());
        assert_eq!(pow(&BigInt::zero(), &fixed(2)).unwrap(), BigInt::zero());
    }

    #[test]
    fn test_pow_near_one_uses_high_precision() {
        // 1.001^2 = 1.002001
        let x = BigInt::from(ONE_18 + ONE_18 / 1000);
        let result = pow(&x, &fixed(2)).unwrap();
        let truth = BigInt::from(1_002_001_000_000_000_000u128);
        assert!((&result - &truth).abs() < BigInt::from(100));
    }

    #[test]
    fn test_pow_out_of_bounds() {
        // 1e18^200 overflows the natural exponent range
        assert_eq!(
            pow(&(fixed(1) * BigInt::from(10u64).pow(18)), &fixed(200)),
            Err(MathError::ProductOutOfBounds)
        );
    }
}
