//! Weighted pool math
//!
//! Closed-form constant weighted product formulas on fixed18 integers,
//! rounding in the pool's favor. Float functions are for ranking only.

use lyfe_core::MathError;
use lyfe_math::{
    add, complement_fixed, div_down_fixed, div_up_fixed, mul_down_fixed, mul_up_fixed, one,
    pow_down_fixed, pow_up_fixed, sub, MathResult, ONE_U128,
};
use num_bigint::BigInt;
use num_traits::Zero;

/// Largest invariant growth a single-token join may cause
pub const MAX_INVARIANT_RATIO: u128 = 3 * ONE_U128;

fn subtract_fee(amount: &BigInt, fee: &BigInt) -> BigInt {
    amount - mul_up_fixed(amount, fee)
}

fn add_fee(amount: &BigInt, fee: &BigInt) -> MathResult<BigInt> {
    div_up_fixed(amount, &complement_fixed(fee))
}

/// Amount out for an exact amount in
///
/// Formula: aO = bO * (1 - (bI / (bI + aI))^(wI / wO))
pub fn calc_out_given_in(
    balance_in: &BigInt,
    weight_in: &BigInt,
    balance_out: &BigInt,
    weight_out: &BigInt,
    amount_in: &BigInt,
    fee: &BigInt,
) -> MathResult<BigInt> {
    let amount_in = subtract_fee(amount_in, fee);
    let exponent = div_down_fixed(weight_in, weight_out)?;
    let denominator = add(balance_in, &amount_in);
    let base = div_up_fixed(balance_in, &denominator)?;
    let power = pow_up_fixed(&base, &exponent)?;
    Ok(mul_down_fixed(balance_out, &complement_fixed(&power)))
}

/// Amount in for an exact amount out
///
/// Formula: aI = bI * ((bO / (bO - aO))^(wO / wI) - 1) / (1 - fee)
pub fn calc_in_given_out(
    balance_in: &BigInt,
    weight_in: &BigInt,
    balance_out: &BigInt,
    weight_out: &BigInt,
    amount_out: &BigInt,
    fee: &BigInt,
) -> MathResult<BigInt> {
    let base = div_up_fixed(balance_out, &sub(balance_out, amount_out)?)?;
    let exponent = div_up_fixed(weight_out, weight_in)?;
    let power = pow_up_fixed(&base, &exponent)?;
    let ratio = sub(&power, &one())?;
    add_fee(&mul_up_fixed(balance_in, &ratio), fee)
}

/// Share tokens minted for a (possibly unbalanced) join
pub fn lbpt_out_given_exact_tokens_in(
    balances: &[BigInt],
    weights: &[BigInt],
    amounts_in: &[BigInt],
    total_supply: &BigInt,
    fee: &BigInt,
) -> MathResult<BigInt> {
    let one = one();
    let mut ratios_with_fee = Vec::with_capacity(balances.len());
    let mut invariant_ratio_with_fees = BigInt::zero();
    for ((balance, weight), amount) in balances.iter().zip(weights).zip(amounts_in) {
        let ratio = div_down_fixed(&add(balance, amount), balance)?;
        invariant_ratio_with_fees += mul_down_fixed(&ratio, weight);
        ratios_with_fee.push(ratio);
    }

    let mut invariant_ratio = one.clone();
    for (i, ((balance, weight), amount)) in balances.iter().zip(weights).zip(amounts_in).enumerate()
    {
        let amount_without_fee = if ratios_with_fee[i] > invariant_ratio_with_fees {
            let non_taxable = mul_down_fixed(balance, &sub(&invariant_ratio_with_fees, &one)?);
            let taxable = sub(amount, &non_taxable)?;
            let swap_fee = mul_up_fixed(&taxable, fee);
            add(&non_taxable, &sub(&taxable, &swap_fee)?)
        } else {
            amount.clone()
        };
        let balance_ratio = div_down_fixed(&add(balance, &amount_without_fee), balance)?;
        invariant_ratio = mul_down_fixed(&invariant_ratio, &pow_down_fixed(&balance_ratio, weight)?);
    }

    if invariant_ratio > one {
        Ok(mul_down_fixed(total_supply, &(invariant_ratio - one)))
    } else {
        Ok(BigInt::zero())
    }
}

/// Proportional exit: every token out for an exact share amount in
pub fn tokens_out_given_exact_lbpt_in(
    balances: &[BigInt],
    lbpt_in: &BigInt,
    total_supply: &BigInt,
) -> MathResult<Vec<BigInt>> {
    let ratio = div_down_fixed(lbpt_in, total_supply)?;
    Ok(balances.iter().map(|b| mul_down_fixed(b, &ratio)).collect())
}

/// Single-token exit for an exact share amount in
///
/// Formula: aO = b * (1 - ((supply - lbptIn) / supply)^(1 / w)), fee on the taxable share
pub fn token_out_given_exact_lbpt_in(
    balance: &BigInt,
    weight: &BigInt,
    lbpt_in: &BigInt,
    total_supply: &BigInt,
    fee: &BigInt,
) -> MathResult<BigInt> {
    let invariant_ratio = div_up_fixed(&sub(total_supply, lbpt_in)?, total_supply)?;
    let balance_ratio = pow_up_fixed(&invariant_ratio, &div_down_fixed(&one(), weight)?)?;
    let amount_without_fee = mul_down_fixed(balance, &complement_fixed(&balance_ratio));

    let taxable = mul_up_fixed(&amount_without_fee, &complement_fixed(weight));
    let non_taxable = sub(&amount_without_fee, &taxable)?;
    let swap_fee = mul_up_fixed(&taxable, fee);
    Ok(add(&non_taxable, &sub(&taxable, &swap_fee)?))
}

/// Share tokens burned for an exact (possibly unbalanced) exit
pub fn lbpt_in_given_exact_tokens_out(
    balances: &[BigInt],
    weights: &[BigInt],
    amounts_out: &[BigInt],
    total_supply: &BigInt,
    fee: &BigInt,
) -> MathResult<BigInt> {
    let mut ratios_without_fee = Vec::with_capacity(balances.len());
    let mut invariant_ratio_without_fees = BigInt::zero();
    for ((balance, weight), amount) in balances.iter().zip(weights).zip(amounts_out) {
        let ratio = div_up_fixed(&sub(balance, amount)?, balance)?;
        invariant_ratio_without_fees += mul_up_fixed(&ratio, weight);
        ratios_without_fee.push(ratio);
    }

    let mut invariant_ratio = one();
    for (i, ((balance, weight), amount)) in balances.iter().zip(weights).zip(amounts_out).enumerate()
    {
        let amount_with_fee = if invariant_ratio_without_fees > ratios_without_fee[i] {
            let non_taxable =
                mul_down_fixed(balance, &complement_fixed(&invariant_ratio_without_fees));
            let taxable = sub(amount, &non_taxable)?;
            add(&non_taxable, &add_fee(&taxable, fee)?)
        } else {
            amount.clone()
        };
        let balance_ratio = div_down_fixed(&sub(balance, &amount_with_fee)?, balance)?;
        invariant_ratio = mul_down_fixed(&invariant_ratio, &pow_down_fixed(&balance_ratio, weight)?);
    }

    Ok(mul_up_fixed(total_supply, &complement_fixed(&invariant_ratio)))
}

/// Single-token join for an exact share amount out
pub fn token_in_given_exact_lbpt_out(
    balance: &BigInt,
    weight: &BigInt,
    lbpt_out: &BigInt,
    total_supply: &BigInt,
    fee: &BigInt,
) -> MathResult<BigInt> {
    let invariant_ratio = div_up_fixed(&add(total_supply, lbpt_out), total_supply)?;
    if invariant_ratio > BigInt::from(MAX_INVARIANT_RATIO) {
        return Err(MathError::MaxInRatio);
    }
    let balance_ratio = pow_up_fixed(&invariant_ratio, &div_up_fixed(&one(), weight)?)?;
    let amount_without_fee = mul_up_fixed(balance, &sub(&balance_ratio, &one())?);

    let taxable = mul_up_fixed(&amount_without_fee, &complement_fixed(weight));
    let non_taxable = sub(&amount_without_fee, &taxable)?;
    Ok(add(&non_taxable, &add_fee(&taxable, fee)?))
}

/// Formula: I = Π b_i^w_i, rounded down
pub fn calculate_invariant(weights: &[BigInt], balances: &[BigInt]) -> MathResult<BigInt> {
    let mut invariant = one();
    for (weight, balance) in weights.iter().zip(balances) {
        invariant = mul_down_fixed(&invariant, &pow_down_fixed(balance, weight)?);
    }
    Ok(invariant)
}

/// Share tokens owed to the protocol for invariant growth since `previous`
pub fn due_protocol_swap_fee_lbpt_amount(
    total_supply: &BigInt,
    previous_invariant: &BigInt,
    current_invariant: &BigInt,
    protocol_fee: &BigInt,
) -> MathResult<BigInt> {
    let one = one();
    let growth = div_down_fixed(current_invariant, previous_invariant)?;
    if growth <= one {
        return Ok(BigInt::zero());
    }
    let k = div_down_fixed(&mul_down_fixed(protocol_fee, &(&growth - &one)), &growth)?;
    let numerator = mul_down_fixed(total_supply, &k);
    let denominator = complement_fixed(&k);
    if denominator.is_zero() {
        return Ok(BigInt::zero());
    }
    div_down_fixed(&numerator, &denominator)
}

// ----------------------------------------------------------------------------
// Fixed18 spot prices
// ----------------------------------------------------------------------------

pub fn spot_price_after_exact_token_in(
    balance_in: &BigInt,
    weight_in: &BigInt,
    balance_out: &BigInt,
    weight_out: &BigInt,
    amount_in: &BigInt,
    fee: &BigInt,
) -> MathResult<BigInt> {
    let numerator = mul_up_fixed(balance_in, weight_out);
    let fee_complement = complement_fixed(fee);
    let mut denominator = mul_up_fixed(&mul_up_fixed(balance_out, weight_in), &fee_complement);
    let base = div_up_fixed(
        balance_in,
        &add(&mul_up_fixed(amount_in, &fee_complement), balance_in),
    )?;
    let exponent = div_up_fixed(&(weight_in + weight_out), weight_out)?;
    denominator = mul_up_fixed(&denominator, &pow_up_fixed(&base, &exponent)?);
    div_up_fixed(&numerator, &denominator)
}

pub fn spot_price_after_exact_token_out(
    balance_in: &BigInt,
    weight_in: &BigInt,
    balance_out: &BigInt,
    weight_out: &BigInt,
    amount_out: &BigInt,
    fee: &BigInt,
) -> MathResult<BigInt> {
    let base = div_up_fixed(balance_out, &sub(balance_out, amount_out)?)?;
    let exponent = div_up_fixed(&(weight_in + weight_out), weight_in)?;
    let numerator = mul_up_fixed(
        &mul_up_fixed(balance_in, weight_out),
        &pow_up_fixed(&base, &exponent)?,
    );
    let denominator = mul_up_fixed(&mul_up_fixed(balance_out, weight_in), &complement_fixed(fee));
    div_up_fixed(&numerator, &denominator)
}

/// Price of the share token after an exact single-token join
pub fn spot_price_after_exact_token_in_for_lbpt(
    balance_in: &BigInt,
    balance_out: &BigInt,
    weight_in: &BigInt,
    amount_in: &BigInt,
    fee: &BigInt,
) -> MathResult<BigInt> {
    let one = one();
    if balance_in.is_zero() {
        return Err(MathError::DivisionByZero);
    }
    let fee_factor = &one - mul_down_fixed(&complement_fixed(weight_in), fee);
    let denominator_factor = pow_down_fixed(
        &(&one + (amount_in * &fee_factor) / balance_in),
        &complement_fixed(weight_in),
    )?;
    let divisor = balance_in * denominator_factor;
    if divisor.is_zero() {
        return Err(MathError::DivisionByZero);
    }
    div_down_fixed(&one, &((balance_out * weight_in * fee_factor) / divisor))
}

// ----------------------------------------------------------------------------
// Float spot prices and derivatives (human units)
// ----------------------------------------------------------------------------

/// Balances, weights, fee and amount in human units
#[derive(Debug, Clone, Copy)]
pub struct FloatInputs {
    pub balance_in: f64,
    pub balance_out: f64,
    pub weight_in: f64,
    pub weight_out: f64,
    pub fee: f64,
    pub amount: f64,
}

pub fn spot_price_after_token_in_for_exact_lbpt_out(p: FloatInputs) -> f64 {
    let (bi, bbpt, wi, ao, f) = (p.balance_in, p.balance_out, p.weight_in, p.amount, p.fee);
    (((ao + bbpt) / bbpt).powf(1.0 / wi) * bi) / ((ao + bbpt) * (1.0 + f * (wi - 1.0)) * wi)
}

pub fn spot_price_after_exact_lbpt_in_for_token_out(p: FloatInputs) -> f64 {
    let (bbpt, bo, wo, ai, f) = (p.balance_in, p.balance_out, p.weight_out, p.amount, p.fee);
    ((1.0 - ai / bbpt).powf((wo - 1.0) / wo) * bbpt * (1.0 + f * (wo - 1.0)) * wo) / bo
}

pub fn spot_price_after_lbpt_in_for_exact_token_out(p: FloatInputs) -> f64 {
    let (bbpt, bo, wo, ao, f) = (p.balance_in, p.balance_out, p.weight_out, p.amount, p.fee);
    (bbpt * (1.0 + f * (wo - 1.0)) * wo * (1.0 + (ao * (-1.0 + f - f * wo)) / bo).powf(wo - 1.0))
        / bo
}

pub fn derivative_after_exact_token_in(p: FloatInputs) -> f64 {
    let (bi, bo, wi, wo, ai, f) =
        (p.balance_in, p.balance_out, p.weight_in, p.weight_out, p.amount, p.fee);
    (wi + wo) / (bo * (bi / (ai + bi - ai * f)).powf(wi / wo) * wi)
}

pub fn derivative_after_exact_token_out(p: FloatInputs) -> f64 {
    let (bi, bo, wi, wo, ao, f) =
        (p.balance_in, p.balance_out, p.weight_in, p.weight_out, p.amount, p.fee);
    -((bi * (bo / (bo - ao)).powf(wo / wi) * wo * (wi + wo))
        / ((ao - bo).powi(2) * (f - 1.0) * wi.powi(2)))
}

pub fn derivative_after_exact_token_in_for_lbpt(p: FloatInputs) -> f64 {
    let (bi, bbpt, wi, ai, f) = (p.balance_in, p.balance_out, p.weight_in, p.amount, p.fee);
    -((wi - 1.0) / (bbpt * ((ai + bi + ai * f * (wi - 1.0)) / bi).powf(wi) * wi))
}

pub fn derivative_after_token_in_for_exact_lbpt_out(p: FloatInputs) -> f64 {
    let (bi, bbpt, wi, ao, f) = (p.balance_in, p.balance_out, p.weight_in, p.amount, p.fee);
    -((((ao + bbpt) / bbpt).powf(1.0 / wi) * bi * (wi - 1.0))
        / ((ao + bbpt).powi(2) * (1.0 + f * (wi - 1.0)) * wi.powi(2)))
}

pub fn derivative_after_exact_lbpt_in_for_token_out(p: FloatInputs) -> f64 {
    let (bbpt, bo, wo, ai, f) = (p.balance_in, p.balance_out, p.weight_out, p.amount, p.fee);
    -((1.0 + f * (wo - 1.0)) * (wo - 1.0)) / ((1.0 - ai / bbpt).powf(1.0 / wo) * bo)
}

pub fn derivative_after_lbpt_in_for_exact_token_out(p: FloatInputs) -> f64 {
    let (bbpt, bo, wo, ao, f) = (p.balance_in, p.balance_out, p.weight_out, p.amount, p.fee);
    -(bbpt
        * (1.0 + f * (wo - 1.0)).powi(2)
        * (wo - 1.0)
        * wo
        * (1.0 + (ao * (-1.0 + f - f * wo)) / bo).powf(wo - 2.0))
        / bo.powi(2)
}
