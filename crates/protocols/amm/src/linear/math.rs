//! Linear pool math
//!
//! Balances are "real"; the invariant is computed on "nominal" main
//! balances, which charge the swap fee on the part of the main balance
//! outside `[lower_target, upper_target]`. All values are fixed18.

use lyfe_core::MathError;
use lyfe_math::{
    complement_fixed, div_down, div_down_fixed, div_up, div_up_fixed, mul_down_fixed,
    mul_up_fixed, one, sub, MathResult,
};
use num_bigint::BigInt;
use num_traits::{Signed, Zero};

/// Pool-level parameters shared by every linear formula
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinearParams {
    pub fee: BigInt,
    /// Price rate of the wrapped token
    pub rate: BigInt,
    pub lower_target: BigInt,
    pub upper_target: BigInt,
}

impl LinearParams {
    pub fn to_nominal(&self, real: &BigInt) -> MathResult<BigInt> {
        if *real < self.lower_target {
            let fees = mul_down_fixed(&(&self.lower_target - real), &self.fee);
            sub(real, &fees)
        } else if *real <= self.upper_target {
            Ok(real.clone())
        } else {
            let fees = mul_down_fixed(&(real - &self.upper_target), &self.fee);
            sub(real, &fees)
        }
    }

    pub fn from_nominal(&self, nominal: &BigInt) -> MathResult<BigInt> {
        if *nominal < self.lower_target {
            div_down_fixed(
                &(nominal + mul_down_fixed(&self.fee, &self.lower_target)),
                &(one() + &self.fee),
            )
        } else if *nominal <= self.upper_target {
            Ok(nominal.clone())
        } else {
            div_down_fixed(
                &(nominal - mul_down_fixed(&self.fee, &self.upper_target)),
                &(one() - &self.fee),
            )
        }
    }

    fn invariant_up(&self, nominal_main: &BigInt, wrapped: &BigInt) -> BigInt {
        nominal_main + mul_up_fixed(wrapped, &self.rate)
    }

    fn invariant_down(&self, nominal_main: &BigInt, wrapped: &BigInt) -> BigInt {
        nominal_main + mul_down_fixed(wrapped, &self.rate)
    }

    // Slopes of the real->nominal map. "Left" includes the band edge in the
    // lower segment, "right" in the upper one.
    fn left_derivative_to_nominal(&self, amount: &BigInt) -> BigInt {
        if *amount <= self.lower_target {
            one() + &self.fee
        } else if *amount <= self.upper_target {
            one()
        } else {
            complement_fixed(&self.fee)
        }
    }

    fn right_derivative_to_nominal(&self, amount: &BigInt) -> BigInt {
        if *amount < self.lower_target {
            one() + &self.fee
        } else if *amount < self.upper_target {
            one()
        } else {
            complement_fixed(&self.fee)
        }
    }

    fn left_derivative_from_nominal(&self, amount: &BigInt) -> MathResult<BigInt> {
        if *amount <= self.lower_target {
            div_up_fixed(&one(), &(one() + &self.fee))
        } else if *amount <= self.upper_target {
            Ok(one())
        } else {
            div_up_fixed(&one(), &complement_fixed(&self.fee))
        }
    }

    fn right_derivative_from_nominal(&self, amount: &BigInt) -> MathResult<BigInt> {
        if *amount < self.lower_target {
            div_up_fixed(&one(), &(one() + &self.fee))
        } else if *amount < self.upper_target {
            Ok(one())
        } else {
            div_up_fixed(&one(), &complement_fixed(&self.fee))
        }
    }
}

// A real balance the pool would have to go below zero to reach
fn non_negative(balance: BigInt) -> MathResult<BigInt> {
    if balance.is_negative() {
        return Err(MathError::SubOverflow);
    }
    Ok(balance)
}

/// Balances a linear formula runs against
#[derive(Debug, Clone, Copy)]
pub struct LinearBalances<'a> {
    pub main: &'a BigInt,
    pub wrapped: &'a BigInt,
    /// Virtual share supply
    pub supply: &'a BigInt,
}

// Amounts

pub fn lbpt_out_per_main_in(
    main_in: &BigInt,
    b: LinearBalances<'_>,
    p: &LinearParams,
) -> MathResult<BigInt> {
    if b.supply.is_zero() {
        return p.to_nominal(main_in);
    }
    let previous = p.to_nominal(b.main)?;
    let after = p.to_nominal(&(b.main + main_in))?;
    let invariant = p.invariant_up(&previous, b.wrapped);
    div_down(&(b.supply * (after - &previous)), &invariant)
}

pub fn lbpt_in_per_main_out(
    main_out: &BigInt,
    b: LinearBalances<'_>,
    p: &LinearParams,
) -> MathResult<BigInt> {
    let previous = p.to_nominal(b.main)?;
    let after = p.to_nominal(&(b.main - main_out))?;
    let invariant = p.invariant_down(&previous, b.wrapped);
    div_up(&(b.supply * (&previous - after)), &invariant)
}

pub fn lbpt_in_per_wrapped_out(
    wrapped_out: &BigInt,
    b: LinearBalances<'_>,
    p: &LinearParams,
) -> MathResult<BigInt> {
    let nominal_main = p.to_nominal(b.main)?;
    let previous_invariant = p.invariant_up(&nominal_main, b.wrapped);
    let new_invariant = p.invariant_down(&nominal_main, &(b.wrapped - wrapped_out));
    let new_supply = div_down(&(b.supply * new_invariant), &previous_invariant)?;
    Ok(b.supply - new_supply)
}

pub fn wrapped_out_per_main_in(
    main_in: &BigInt,
    b: LinearBalances<'_>,
    p: &LinearParams,
) -> MathResult<BigInt> {
    let previous = p.to_nominal(b.main)?;
    let after = p.to_nominal(&(b.main + main_in))?;
    div_down_fixed(&(after - previous), &p.rate)
}

pub fn wrapped_in_per_main_out(
    main_out: &BigInt,
    b: LinearBalances<'_>,
    p: &LinearParams,
) -> MathResult<BigInt> {
    let previous = p.to_nominal(b.main)?;
    let after = p.to_nominal(&(b.main - main_out))?;
    div_up_fixed(&(previous - after), &p.rate)
}

pub fn main_in_per_lbpt_out(
    lbpt_out: &BigInt,
    b: LinearBalances<'_>,
    p: &LinearParams,
) -> MathResult<BigInt> {
    if b.supply.is_zero() {
        return p.from_nominal(lbpt_out);
    }
    let previous = p.to_nominal(b.main)?;
    let invariant = p.invariant_up(&previous, b.wrapped);
    let delta = div_up(&(invariant * lbpt_out), b.supply)?;
    let new_main = p.from_nominal(&(previous + delta))?;
    Ok(new_main - b.main)
}

pub fn main_out_per_lbpt_in(
    lbpt_in: &BigInt,
    b: LinearBalances<'_>,
    p: &LinearParams,
) -> MathResult<BigInt> {
    let previous = p.to_nominal(b.main)?;
    let invariant = p.invariant_down(&previous, b.wrapped);
    let delta = div_down(&(invariant * lbpt_in), b.supply)?;
    let new_main = non_negative(p.from_nominal(&(previous - delta))?)?;
    Ok(b.main - new_main)
}

pub fn main_out_per_wrapped_in(
    wrapped_in: &BigInt,
    b: LinearBalances<'_>,
    p: &LinearParams,
) -> MathResult<BigInt> {
    let previous = p.to_nominal(b.main)?;
    let delta = mul_down_fixed(wrapped_in, &p.rate);
    let new_main = non_negative(p.from_nominal(&(previous - delta))?)?;
    Ok(b.main - new_main)
}

pub fn main_in_per_wrapped_out(
    wrapped_out: &BigInt,
    b: LinearBalances<'_>,
    p: &LinearParams,
) -> MathResult<BigInt> {
    let previous = p.to_nominal(b.main)?;
    let delta = mul_up_fixed(wrapped_out, &p.rate);
    let new_main = p.from_nominal(&(previous + delta))?;
    Ok(new_main - b.main)
}

pub fn lbpt_out_per_wrapped_in(
    wrapped_in: &BigInt,
    b: LinearBalances<'_>,
    p: &LinearParams,
) -> MathResult<BigInt> {
    if b.supply.is_zero() {
        return Ok(mul_down_fixed(wrapped_in, &p.rate));
    }
    let nominal_main = p.to_nominal(b.main)?;
    let previous_invariant = p.invariant_up(&nominal_main, b.wrapped);
    let new_invariant = p.invariant_down(&nominal_main, &(b.wrapped + wrapped_in));
    let new_supply = div_down(&(b.supply * new_invariant), &previous_invariant)?;
    Ok(new_supply - b.supply)
}

pub fn wrapped_in_per_lbpt_out(
    lbpt_out: &BigInt,
    b: LinearBalances<'_>,
    p: &LinearParams,
) -> MathResult<BigInt> {
    if b.supply.is_zero() {
        return div_up_fixed(lbpt_out, &p.rate);
    }
    let nominal_main = p.to_nominal(b.main)?;
    let previous_invariant = p.invariant_up(&nominal_main, b.wrapped);
    let new_supply = b.supply + lbpt_out;
    let new_wrapped = div_up_fixed(
        &(div_up(&(new_supply * previous_invariant), b.supply)? - nominal_main),
        &p.rate,
    )?;
    Ok(new_wrapped - b.wrapped)
}

pub fn wrapped_out_per_lbpt_in(
    lbpt_in: &BigInt,
    b: LinearBalances<'_>,
    p: &LinearParams,
) -> MathResult<BigInt> {
    let nominal_main = p.to_nominal(b.main)?;
    let previous_invariant = p.invariant_up(&nominal_main, b.wrapped);
    let new_supply = sub(b.supply, lbpt_in)?;
    let new_wrapped = non_negative(div_up_fixed(
        &(div_up(&(new_supply * previous_invariant), b.supply)? - nominal_main),
        &p.rate,
    )?)?;
    Ok(b.wrapped - new_wrapped)
}

// Spot prices after the swap, token in per token out

fn pool_factor_up(invariant: &BigInt, supply: &BigInt) -> MathResult<BigInt> {
    if supply.is_zero() {
        Ok(one())
    } else {
        div_up_fixed(invariant, supply)
    }
}

pub fn spot_lbpt_out_per_main_in(
    main_in: &BigInt,
    b: LinearBalances<'_>,
    p: &LinearParams,
) -> MathResult<BigInt> {
    let previous = p.to_nominal(b.main)?;
    let factor = pool_factor_up(&p.invariant_down(&previous, b.wrapped), b.supply)?;
    div_up_fixed(&factor, &p.right_derivative_to_nominal(&(b.main + main_in)))
}

pub fn spot_main_in_per_lbpt_out(
    lbpt_out: &BigInt,
    b: LinearBalances<'_>,
    p: &LinearParams,
) -> MathResult<BigInt> {
    let previous = p.to_nominal(b.main)?;
    let factor = pool_factor_up(&p.invariant_down(&previous, b.wrapped), b.supply)?;
    let after = previous + mul_up_fixed(lbpt_out, &factor);
    Ok(mul_up_fixed(&factor, &p.right_derivative_from_nominal(&after)?))
}

pub fn spot_main_out_per_lbpt_in(
    lbpt_in: &BigInt,
    b: LinearBalances<'_>,
    p: &LinearParams,
) -> MathResult<BigInt> {
    let previous = p.to_nominal(b.main)?;
    let factor = div_down_fixed(&p.invariant_down(&previous, b.wrapped), b.supply)?;
    let after = sub(&previous, &mul_down_fixed(lbpt_in, &factor))?;
    div_up_fixed(
        &one(),
        &mul_up_fixed(&factor, &p.left_derivative_from_nominal(&after)?),
    )
}

pub fn spot_lbpt_in_per_main_out(
    main_out: &BigInt,
    b: LinearBalances<'_>,
    p: &LinearParams,
) -> MathResult<BigInt> {
    let after_main = sub(b.main, main_out)?;
    let previous = p.to_nominal(b.main)?;
    let factor = div_up_fixed(&p.invariant_down(&previous, b.wrapped), b.supply)?;
    div_up_fixed(&p.left_derivative_to_nominal(&after_main), &factor)
}

pub fn spot_main_in_per_wrapped_out(
    wrapped_out: &BigInt,
    b: LinearBalances<'_>,
    p: &LinearParams,
) -> MathResult<BigInt> {
    let previous = p.to_nominal(b.main)?;
    let after = previous + mul_up_fixed(wrapped_out, &p.rate);
    Ok(mul_up_fixed(&p.right_derivative_from_nominal(&after)?, &p.rate))
}

pub fn spot_wrapped_in_per_main_out(
    main_out: &BigInt,
    b: LinearBalances<'_>,
    p: &LinearParams,
) -> MathResult<BigInt> {
    let after_main = b.main - main_out;
    div_up_fixed(&p.left_derivative_to_nominal(&after_main), &p.rate)
}

pub fn spot_wrapped_out_per_main_in(
    main_in: &BigInt,
    b: LinearBalances<'_>,
    p: &LinearParams,
) -> MathResult<BigInt> {
    div_down_fixed(&p.rate, &p.right_derivative_to_nominal(&(b.main + main_in)))
}

pub fn spot_main_out_per_wrapped_in(
    wrapped_in: &BigInt,
    b: LinearBalances<'_>,
    p: &LinearParams,
) -> MathResult<BigInt> {
    let previous = p.to_nominal(b.main)?;
    let after = previous - mul_down_fixed(wrapped_in, &p.rate);
    let inverse = mul_up_fixed(&p.left_derivative_from_nominal(&after)?, &p.rate);
    div_up_fixed(&one(), &inverse)
}

pub fn spot_lbpt_out_per_wrapped_in(
    _wrapped_in: &BigInt,
    b: LinearBalances<'_>,
    p: &LinearParams,
) -> MathResult<BigInt> {
    if b.supply.is_zero() {
        return Ok(p.rate.clone());
    }
    let nominal_main = p.to_nominal(b.main)?;
    let invariant = p.invariant_up(&nominal_main, b.wrapped);
    div_up_fixed(&invariant, &mul_up_fixed(b.supply, &p.rate))
}

pub fn spot_wrapped_out_per_lbpt_in(
    _lbpt_in: &BigInt,
    b: LinearBalances<'_>,
    p: &LinearParams,
) -> MathResult<BigInt> {
    let nominal_main = p.to_nominal(b.main)?;
    let invariant = p.invariant_up(&nominal_main, b.wrapped);
    div_up(&(b.supply * &p.rate), &invariant)
}

pub fn spot_wrapped_in_per_lbpt_out(
    _lbpt_out: &BigInt,
    b: LinearBalances<'_>,
    p: &LinearParams,
) -> MathResult<BigInt> {
    if b.supply.is_zero() {
        return div_up_fixed(&one(), &p.rate);
    }
    let nominal_main = p.to_nominal(b.main)?;
    let invariant = p.invariant_up(&nominal_main, b.wrapped);
    div_up_fixed(&invariant, &mul_up_fixed(b.supply, &p.rate))
}

pub fn spot_lbpt_in_per_wrapped_out(
    _wrapped_out: &BigInt,
    b: LinearBalances<'_>,
    p: &LinearParams,
) -> MathResult<BigInt> {
    let nominal_main = p.to_nominal(b.main)?;
    let invariant = p.invariant_up(&nominal_main, b.wrapped);
    div_down(&(b.supply * &p.rate), &invariant)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lyfe_math::parse_fixed;

    fn fx(v: &str) -> BigInt {
        parse_fixed(v, 18).unwrap()
    }

    fn make_params() -> LinearParams {
        LinearParams {
            fee: fx("0.01"),
            rate: fx("1.1"),
            lower_target: fx("1000"),
            upper_target: fx("2000"),
        }
    }

    #[test]
    fn test_nominal_transform_band() {
        let p = make_params();
        // Inside the band nothing changes
        assert_eq!(p.to_nominal(&fx("1500")).unwrap(), fx("1500"));
        assert_eq!(p.to_nominal(&fx("1000")).unwrap(), fx("1000"));
        assert_eq!(p.to_nominal(&fx("2000")).unwrap(), fx("2000"));
        // Below: 900 - 1% of 100
        assert_eq!(p.to_nominal(&fx("900")).unwrap(), fx("899"));
        // Above: 2100 - 1% of 100
        assert_eq!(p.to_nominal(&fx("2100")).unwrap(), fx("2099"));
        assert_eq!(p.from_nominal(&fx("899")).unwrap(), fx("900"));
        assert_eq!(p.from_nominal(&fx("2099")).unwrap(), fx("2100"));
    }

    #[test]
    fn test_band_edge_derivatives() {
        let p = make_params();
        let edge = fx("1000");
        assert_eq!(p.left_derivative_to_nominal(&edge), fx("1.01"));
        assert_eq!(p.right_derivative_to_nominal(&edge), one());
        let top = fx("2000");
        assert_eq!(p.left_derivative_to_nominal(&top), one());
        assert_eq!(p.right_derivative_to_nominal(&top), fx("0.99"));
    }

    #[test]
    fn test_main_wrapped_inside_band() {
        let p = make_params();
        let (main, wrapped, supply) = (fx("1500"), fx("1000"), fx("2600"));
        let b = LinearBalances {
            main: &main,
            wrapped: &wrapped,
            supply: &supply,
        };
        // 110 main buys 100 wrapped at rate 1.1
        assert_eq!(wrapped_out_per_main_in(&fx("110"), b, &p).unwrap(), fx("100"));
        assert_eq!(main_out_per_wrapped_in(&fx("100"), b, &p).unwrap(), fx("110"));
        assert_eq!(main_in_per_wrapped_out(&fx("100"), b, &p).unwrap(), fx("110"));
        assert_eq!(wrapped_in_per_main_out(&fx("110"), b, &p).unwrap(), fx("100"));
    }

    #[test]
    fn test_main_wrapped_below_band_pays_fee() {
        let p = make_params();
        let (main, wrapped, supply) = (fx("900"), fx("1000"), fx("2000"));
        let b = LinearBalances {
            main: &main,
            wrapped: &wrapped,
            supply: &supply,
        };
        // Removing main below the lower target costs 1% extra nominal
        let wrapped_in = wrapped_in_per_main_out(&fx("100"), b, &p).unwrap();
        assert_eq!(wrapped_in, div_up_fixed(&fx("101"), &p.rate).unwrap());
        // Adding main below the target earns the fee back
        let wrapped_out = wrapped_out_per_main_in(&fx("100"), b, &p).unwrap();
        assert_eq!(wrapped_out, div_down_fixed(&fx("101"), &p.rate).unwrap());
    }

    #[test]
    fn test_share_token_round_trip() {
        let p = make_params();
        let (main, wrapped, supply) = (fx("1500"), fx("1000"), fx("2600"));
        let b = LinearBalances {
            main: &main,
            wrapped: &wrapped,
            supply: &supply,
        };
        // invariant = 1500 + 1100 = 2600 = supply, so 1 main = 1 LBPT
        assert_eq!(lbpt_out_per_main_in(&fx("100"), b, &p).unwrap(), fx("100"));
        assert_eq!(main_in_per_lbpt_out(&fx("100"), b, &p).unwrap(), fx("100"));
        assert_eq!(main_out_per_lbpt_in(&fx("100"), b, &p).unwrap(), fx("100"));
        assert_eq!(lbpt_in_per_main_out(&fx("100"), b, &p).unwrap(), fx("100"));
        // 1 wrapped = 1.1 LBPT
        assert_eq!(lbpt_out_per_wrapped_in(&fx("100"), b, &p).unwrap(), fx("110"));
        assert_eq!(lbpt_in_per_wrapped_out(&fx("100"), b, &p).unwrap(), fx("110"));
        assert_eq!(wrapped_in_per_lbpt_out(&fx("110"), b, &p).unwrap(), fx("100"));
        assert_eq!(wrapped_out_per_lbpt_in(&fx("110"), b, &p).unwrap(), fx("100"));
    }

    type AmountFn = fn(&BigInt, LinearBalances<'_>, &LinearParams) -> MathResult<BigInt>;

    // (pair, exact-in amount out, exact-out amount in)
    const PAIRS: [(&str, AmountFn, AmountFn); 6] = [
        ("main->wrapped", wrapped_out_per_main_in, main_in_per_wrapped_out),
        ("wrapped->main", main_out_per_wrapped_in, wrapped_in_per_main_out),
        ("main->lbpt", lbpt_out_per_main_in, main_in_per_lbpt_out),
        ("lbpt->main", main_out_per_lbpt_in, lbpt_in_per_main_out),
        ("wrapped->lbpt", lbpt_out_per_wrapped_in, wrapped_in_per_lbpt_out),
        ("lbpt->wrapped", wrapped_out_per_lbpt_in, lbpt_in_per_wrapped_out),
    ];

    #[test]
    fn test_round_trip_outside_band_never_pays_out_extra() {
        let p = make_params();
        let wrapped = fx("1000");
        let amounts = [
            BigInt::from(3),
            BigInt::from(1_000_000_000_000u64),
            fx("1"),
            fx("10"),
            fx("123.456789123456789123"),
            fx("450"),
        ];
        // Below and above the band
        for (main, supply) in [(fx("900"), fx("2000")), (fx("2100"), fx("3200"))] {
            let b = LinearBalances {
                main: &main,
                wrapped: &wrapped,
                supply: &supply,
            };
            for (pair, amount_out, amount_in) in PAIRS {
                for x in &amounts {
                    // One wei of slack for the truncated output at a non-unit rate
                    let out = amount_out(x, b, &p).unwrap();
                    assert!(out.is_positive(), "{pair}: nothing out for {x}");
                    let back = amount_in(&out, b, &p).unwrap();
                    assert!(&back + 1 >= *x, "{pair}: {x} in, {back} to buy it back");
                    let cost = amount_in(x, b, &p).unwrap();
                    let forward = amount_out(&cost, b, &p).unwrap();
                    assert!(forward <= x + 1, "{pair}: {x} out costs {cost}, which buys {forward}");
                }
            }
        }
    }

    #[test]
    fn test_empty_supply_mints_nominal() {
        let p = make_params();
        let zero = BigInt::zero();
        let b = LinearBalances {
            main: &zero,
            wrapped: &zero,
            supply: &zero,
        };
        // Below the lower target the first join pays the fee on the gap
        assert_eq!(lbpt_out_per_main_in(&fx("500"), b, &p).unwrap(), fx("495"));
        assert_eq!(lbpt_out_per_wrapped_in(&fx("10"), b, &p).unwrap(), fx("11"));
        assert_eq!(spot_lbpt_out_per_wrapped_in(&zero, b, &p).unwrap(), p.rate);
    }

    #[test]
    fn test_spot_prices_inside_band() {
        let p = make_params();
        let (main, wrapped, supply) = (fx("1500"), fx("1000"), fx("2600"));
        let b = LinearBalances {
            main: &main,
            wrapped: &wrapped,
            supply: &supply,
        };
        let amount = fx("10");
        assert_eq!(spot_lbpt_out_per_main_in(&amount, b, &p).unwrap(), one());
        assert_eq!(spot_main_in_per_lbpt_out(&amount, b, &p).unwrap(), one());
        assert_eq!(spot_main_out_per_lbpt_in(&amount, b, &p).unwrap(), one());
        assert_eq!(spot_lbpt_in_per_main_out(&amount, b, &p).unwrap(), one());
        assert_eq!(spot_main_in_per_wrapped_out(&amount, b, &p).unwrap(), fx("1.1"));
        assert_eq!(spot_wrapped_out_per_main_in(&amount, b, &p).unwrap(), fx("1.1"));
        let wrapped_per_main = spot_wrapped_in_per_main_out(&amount, b, &p).unwrap();
        assert_eq!(wrapped_per_main, div_up_fixed(&one(), &fx("1.1")).unwrap());
        let lbpt_per_wrapped = spot_lbpt_in_per_wrapped_out(&amount, b, &p).unwrap();
        assert_eq!(lbpt_per_wrapped, fx("1.1"));
    }

    #[test]
    fn test_spot_price_steps_at_upper_target() {
        let p = make_params();
        let (main, wrapped, supply) = (fx("1990"), fx("0"), fx("1990"));
        let b = LinearBalances {
            main: &main,
            wrapped: &wrapped,
            supply: &supply,
        };
        let inside = spot_lbpt_out_per_main_in(&fx("5"), b, &p).unwrap();
        let above = spot_lbpt_out_per_main_in(&fx("10"), b, &p).unwrap();
        assert_eq!(inside, one());
        // Past the upper target each main token mints 1% less
        assert_eq!(above, div_up_fixed(&one(), &fx("0.99")).unwrap());
    }
}
