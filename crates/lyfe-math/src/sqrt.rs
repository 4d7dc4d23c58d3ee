//! Fixed18 square root (Newton iteration with a tabulated initial guess)

use lyfe_core::MathError;
use num_bigint::BigInt;
use num_traits::{One, Zero};

use crate::fixed_point::{mul_up_fixed, one};
use crate::MathResult;

const NEWTON_STEPS: usize = 7;

/// Square root of a fixed18 value.
///
/// The result is checked to square back to `input` within
/// `guess * tolerance` (in wei); otherwise `SqrtFailed`.
pub fn sqrt(input: &BigInt, tolerance: u64) -> MathResult<BigInt> {
    if input.is_zero() {
        return Ok(BigInt::zero());
    }
    if input.sign() == num_bigint::Sign::Minus {
        return Err(MathError::SqrtFailed);
    }

    let one = one();
    let mut guess = initial_guess(input);
    for _ in 0..NEWTON_STEPS {
        guess = (&guess + (&one * input) / &guess) / 2;
    }

    let guess_squared = (&guess * &guess) / &one;
    let margin = mul_up_fixed(&guess, &BigInt::from(tolerance));
    if guess_squared > input + &margin || guess_squared < input - &margin {
        return Err(MathError::SqrtFailed);
    }
    Ok(guess)
}

fn initial_guess(input: &BigInt) -> BigInt {
    let one = one();
    if *input >= one {
        let exponent = int_log2_halved(&(input / &one));
        return (BigInt::one() << exponent) * one;
    }

    // sqrt(10^-k) in fixed18 for odd k, 10^((18-k)/2) for even k
    const GUESSES: [(u64, u64); 17] = [
        (10, 3_162_277_660),
        (100, 10_000_000_000),
        (1_000, 31_622_776_601),
        (10_000, 100_000_000_000),
        (100_000, 316_227_766_016),
        (1_000_000, 1_000_000_000_000),
        (10_000_000, 3_162_277_660_168),
        (100_000_000, 10_000_000_000_000),
        (1_000_000_000, 31_622_776_601_683),
        (10_000_000_000, 100_000_000_000_000),
        (100_000_000_000, 316_227_766_016_837),
        (1_000_000_000_000, 1_000_000_000_000_000),
        (10_000_000_000_000, 3_162_277_660_168_379),
        (100_000_000_000_000, 10_000_000_000_000_000),
        (1_000_000_000_000_000, 31_622_776_601_683_793),
        (10_000_000_000_000_000, 100_000_000_000_000_000),
        (100_000_000_000_000_000, 316_227_766_016_837_933),
    ];
    for (bound, guess) in GUESSES {
        if *input <= BigInt::from(bound) {
            return BigInt::from(guess);
        }
    }
    one
}

// floor(log2(x) / 2)
fn int_log2_halved(x: &BigInt) -> u64 {
    if x.is_zero() {
        return 0;
    }
    (x.bits() - 1) / 2
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixed(v: u64) -> BigInt {
        BigInt::from(v) * one()
    }

    #[test]
    fn test_sqrt_perfect_squares() {
        assert_eq!(sqrt(&fixed(4), 5).unwrap(), fixed(2));
        assert_eq!(sqrt(&fixed(1_000_000), 5).unwrap(), fixed(1_000));
        assert_eq!(sqrt(&BigInt::zero(), 5).unwrap(), BigInt::zero());
    }

    #[test]
    fn test_sqrt_small_values() {
        // sqrt(0.25) = 0.5
        let quarter = one() / 4;
        assert_eq!(sqrt(&quarter, 5).unwrap(), one() / 2);
    }

    #[test]
    fn test_sqrt_two() {
        let root = sqrt(&fixed(2), 5).unwrap();
        let truth = BigInt::from(1_414_213_562_373_095_048u64);
        assert!(root == truth || root == &truth + 1 || root == &truth - 1);
    }
}
