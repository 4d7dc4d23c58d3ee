//! Stable pool math
//!
//! Amplified invariant with Newton iteration, mirroring the contracts'
//! integer arithmetic (truncating division, explicit ±1 wei adjustments).
//! Amplification is carried ×1000 (`AMP_PRECISION`).

use lyfe_core::MathError;
use lyfe_math::scale::to_f64;
use lyfe_math::{
    add, complement_fixed, div_down, div_down_fixed, div_up, div_up_fixed, mul_down_fixed,
    mul_up_fixed, one, sub, MathResult,
};
use num_bigint::BigInt;
use num_traits::{Signed, Zero};

pub const AMP_PRECISION: u64 = 1_000;

/// Solver iteration cap
pub const MAX_ITERATIONS: usize = 255;

fn amp_precision() -> BigInt {
    BigInt::from(AMP_PRECISION)
}

fn converged(current: &BigInt, previous: &BigInt) -> bool {
    (current - previous).abs() <= BigInt::from(1)
}

/// Invariant D for `balances`, rounded down
pub fn calculate_invariant(amp: &BigInt, balances: &[BigInt]) -> MathResult<BigInt> {
    let sum: BigInt = balances.iter().sum();
    if sum.is_zero() {
        return Ok(BigInt::zero());
    }
    let n = BigInt::from(balances.len());
    let amp_times_total = amp * &n;
    let precision = amp_precision();

    let mut invariant = sum.clone();
    for _ in 0..MAX_ITERATIONS {
        let mut d_p = invariant.clone();
        for balance in balances {
            d_p = div_down(&(&d_p * &invariant), &(balance * &n))?;
        }
        let previous = invariant.clone();
        let numerator = (div_down(&(&amp_times_total * &sum), &precision)? + &d_p * &n) * &invariant;
        let denominator = div_down(&((&amp_times_total - &precision) * &invariant), &precision)?
            + (&n + 1) * &d_p;
        invariant = div_down(&numerator, &denominator)?;
        if converged(&invariant, &previous) {
            return Ok(invariant);
        }
    }
    Err(MathError::StableInvariantDidNotConverge)
}

/// Balance of `token_index` that keeps `invariant` given all other balances,
/// rounded up
pub fn get_token_balance_given_invariant_and_all_other_balances(
    amp: &BigInt,
    balances: &[BigInt],
    invariant: &BigInt,
    token_index: usize,
) -> MathResult<BigInt> {
    let n = BigInt::from(balances.len());
    let amp_times_total = amp * &n;
    let precision = amp_precision();

    let mut sum = balances[0].clone();
    let mut p_d = &balances[0] * &n;
    for balance in &balances[1..] {
        p_d = div_down(&(&p_d * balance * &n), invariant)?;
        sum += balance;
    }
    sum -= &balances[token_index];

    let inv2 = invariant * invariant;
    let c = div_up(&inv2, &(&amp_times_total * &p_d))? * &precision * &balances[token_index];
    let b = sum + div_down(invariant, &amp_times_total)? * &precision;

    let mut token_balance = div_up(&(&inv2 + &c), &(invariant + &b))?;
    for _ in 0..MAX_ITERATIONS {
        let previous = token_balance.clone();
        token_balance = div_up(
            &(&token_balance * &token_balance + &c),
            &(&token_balance * 2 + &b - invariant),
        )?;
        if converged(&token_balance, &previous) {
            return Ok(token_balance);
        }
    }
    Err(MathError::StableGetBalanceDidNotConverge)
}

fn subtract_fee(amount: &BigInt, fee: &BigInt) -> BigInt {
    amount - mul_up_fixed(amount, fee)
}

fn add_fee(amount: &BigInt, fee: &BigInt) -> MathResult<BigInt> {
    div_up_fixed(amount, &complement_fixed(fee))
}

/// Amount out for an exact amount in. May be negative for dust trades.
pub fn calc_out_given_in(
    amp: &BigInt,
    balances: &[BigInt],
    index_in: usize,
    index_out: usize,
    amount_in: &BigInt,
    fee: &BigInt,
) -> MathResult<BigInt> {
    let amount_in = subtract_fee(amount_in, fee);
    let invariant = calculate_invariant(amp, balances)?;
    let mut balances = balances.to_vec();
    balances[index_in] += amount_in;
    let final_balance_out =
        get_token_balance_given_invariant_and_all_other_balances(amp, &balances, &invariant, index_out)?;
    Ok(&balances[index_out] - final_balance_out - 1)
}

/// Amount in for an exact amount out
pub fn calc_in_given_out(
    amp: &BigInt,
    balances: &[BigInt],
    index_in: usize,
    index_out: usize,
    amount_out: &BigInt,
    fee: &BigInt,
) -> MathResult<BigInt> {
    let invariant = calculate_invariant(amp, balances)?;
    let mut balances = balances.to_vec();
    balances[index_out] = sub(&balances[index_out], amount_out)?;
    let final_balance_in =
        get_token_balance_given_invariant_and_all_other_balances(amp, &balances, &invariant, index_in)?;
    let amount_in = add(&sub(&final_balance_in, &balances[index_in])?, &BigInt::from(1));
    add_fee(&amount_in, fee)
}

/// Share tokens minted for a join of `amounts_in`
pub fn lbpt_out_given_exact_tokens_in(
    amp: &BigInt,
    balances: &[BigInt],
    amounts_in: &[BigInt],
    total_supply: &BigInt,
    fee: &BigInt,
) -> MathResult<BigInt> {
    let one = one();
    let sum: BigInt = balances.iter().sum();

    let mut ratios_with_fee = Vec::with_capacity(balances.len());
    let mut invariant_ratio_with_fees = BigInt::zero();
    for (balance, amount) in balances.iter().zip(amounts_in) {
        let weight = div_down_fixed(balance, &sum)?;
        let ratio = div_down_fixed(&(balance + amount), balance)?;
        invariant_ratio_with_fees += mul_down_fixed(&ratio, &weight);
        ratios_with_fee.push(ratio);
    }

    let mut new_balances = Vec::with_capacity(balances.len());
    for (i, (balance, amount)) in balances.iter().zip(amounts_in).enumerate() {
        let amount_without_fee = if ratios_with_fee[i] > invariant_ratio_with_fees {
            let non_taxable = mul_down_fixed(balance, &(&invariant_ratio_with_fees - &one));
            let taxable = amount - &non_taxable;
            non_taxable + mul_down_fixed(&taxable, &(&one - fee))
        } else {
            amount.clone()
        };
        new_balances.push(balance + amount_without_fee);
    }

    let current = calculate_invariant(amp, balances)?;
    let next = calculate_invariant(amp, &new_balances)?;
    let ratio = div_down_fixed(&next, &current)?;
    if ratio > one {
        Ok(mul_down_fixed(total_supply, &(ratio - one)))
    } else {
        Ok(BigInt::zero())
    }
}

/// Single-token join amount for an exact share amount out
pub fn token_in_given_exact_lbpt_out(
    amp: &BigInt,
    balances: &[BigInt],
    token_index: usize,
    lbpt_out: &BigInt,
    total_supply: &BigInt,
    fee: &BigInt,
) -> MathResult<BigInt> {
    let current = calculate_invariant(amp, balances)?;
    let next = mul_up_fixed(&div_up_fixed(&add(total_supply, lbpt_out), total_supply)?, &current);
    let new_balance =
        get_token_balance_given_invariant_and_all_other_balances(amp, balances, &next, token_index)?;
    let amount_without_fee = sub(&new_balance, &balances[token_index])?;

    let sum: BigInt = balances.iter().sum();
    let weight = div_down_fixed(&balances[token_index], &sum)?;
    let taxable = mul_up_fixed(&amount_without_fee, &complement_fixed(&weight));
    let non_taxable = sub(&amount_without_fee, &taxable)?;
    Ok(add(&non_taxable, &div_up_fixed(&taxable, &sub(&one(), fee)?)?))
}

/// Share tokens burned for an exact exit of `amounts_out`
pub fn lbpt_in_given_exact_tokens_out(
    amp: &BigInt,
    balances: &[BigInt],
    amounts_out: &[BigInt],
    total_supply: &BigInt,
    fee: &BigInt,
) -> MathResult<BigInt> {
    let one = one();
    let sum: BigInt = balances.iter().sum();

    let mut ratios_without_fee = Vec::with_capacity(balances.len());
    let mut invariant_ratio_without_fees = BigInt::zero();
    for (balance, amount) in balances.iter().zip(amounts_out) {
        let weight = div_up_fixed(balance, &sum)?;
        let ratio = div_up_fixed(&(balance - amount), balance)?;
        invariant_ratio_without_fees += mul_up_fixed(&ratio, &weight);
        ratios_without_fee.push(ratio);
    }

    let mut new_balances = Vec::with_capacity(balances.len());
    for (i, (balance, amount)) in balances.iter().zip(amounts_out).enumerate() {
        let amount_with_fee = if invariant_ratio_without_fees > ratios_without_fee[i] {
            let non_taxable =
                mul_down_fixed(balance, &complement_fixed(&invariant_ratio_without_fees));
            let taxable = amount - &non_taxable;
            non_taxable + div_up_fixed(&taxable, &(&one - fee))?
        } else {
            amount.clone()
        };
        new_balances.push(balance - amount_with_fee);
    }

    let current = calculate_invariant(amp, balances)?;
    let next = calculate_invariant(amp, &new_balances)?;
    let ratio = div_down_fixed(&next, &current)?;
    Ok(mul_up_fixed(total_supply, &complement_fixed(&ratio)))
}

/// Single-token exit amount for an exact share amount in
pub fn token_out_given_exact_lbpt_in(
    amp: &BigInt,
    balances: &[BigInt],
    token_index: usize,
    lbpt_in: &BigInt,
    total_supply: &BigInt,
    fee: &BigInt,
) -> MathResult<BigInt> {
    let current = calculate_invariant(amp, balances)?;
    let next = mul_up_fixed(&div_up_fixed(&(total_supply - lbpt_in), total_supply)?, &current);
    let new_balance =
        get_token_balance_given_invariant_and_all_other_balances(amp, balances, &next, token_index)?;
    let amount_without_fee = &balances[token_index] - new_balance;

    let sum: BigInt = balances.iter().sum();
    let weight = div_down_fixed(&balances[token_index], &sum)?;
    let taxable = mul_up_fixed(&amount_without_fee, &complement_fixed(&weight));
    let non_taxable = &amount_without_fee - &taxable;
    Ok(non_taxable + mul_down_fixed(&taxable, &(one() - fee)))
}

/// Proportional exit
pub fn tokens_out_given_exact_lbpt_in(
    balances: &[BigInt],
    lbpt_in: &BigInt,
    total_supply: &BigInt,
) -> MathResult<Vec<BigInt>> {
    let ratio = div_down_fixed(lbpt_in, total_supply)?;
    Ok(balances.iter().map(|b| mul_down_fixed(b, &ratio)).collect())
}

// ----------------------------------------------------------------------------
// Curve derivatives
// ----------------------------------------------------------------------------

/// Partial derivatives of the two-token section of the invariant curve
struct CurvePartials {
    x: BigInt,
    y: BigInt,
    a: BigInt,
    b: BigInt,
}

impl CurvePartials {
    fn at(amp: &BigInt, balances: &[BigInt], index_in: usize, index_out: usize) -> MathResult<Self> {
        let invariant = calculate_invariant(amp, balances)?;
        let others: BigInt = balances
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != index_in && *i != index_out)
            .map(|(_, b)| b)
            .sum();
        let a = amp * BigInt::from(balances.len());
        let b = &a * (others - &invariant) + &invariant * amp_precision();
        Ok(Self {
            x: balances[index_in].clone(),
            y: balances[index_out].clone(),
            a,
            b,
        })
    }

    fn partial_x(&self) -> BigInt {
        BigInt::from(2) * &self.a * &self.x * &self.y + &self.a * &self.y * &self.y + &self.b * &self.y
    }

    fn partial_y(&self) -> BigInt {
        BigInt::from(2) * &self.a * &self.x * &self.y + &self.a * &self.x * &self.x + &self.b * &self.x
    }
}

/// Marginal out-per-in rate on the curve, `∂x / ∂y`, fixed18
pub fn pool_derivative(
    amp: &BigInt,
    balances: &[BigInt],
    index_in: usize,
    index_out: usize,
) -> MathResult<BigInt> {
    let partials = CurvePartials::at(amp, balances, index_in, index_out)?;
    div_up_fixed(&partials.partial_x(), &partials.partial_y())
}

/// Change of the invariant-per-share ratio with the balance of `index`
pub fn pool_derivative_lbpt(
    amp: &BigInt,
    balances: &[BigInt],
    total_supply: &BigInt,
    index: usize,
) -> MathResult<BigInt> {
    let n = BigInt::from(balances.len());
    let invariant = calculate_invariant(amp, balances)?;
    let mut others = BigInt::zero();
    let mut d_p = div_down(&invariant, &n)?;
    for (i, balance) in balances.iter().enumerate() {
        if i != index {
            others += balance;
            d_p = div_down(&(&d_p * &invariant), &(&n * balance))?;
        }
    }
    let x = &balances[index];
    let alpha = amp * &n;
    let beta = &alpha * others;
    let gamma = amp_precision() - &alpha;
    let partial_x = BigInt::from(2) * &alpha * x + beta + &gamma * &invariant;
    let minus_partial_d: BigInt = d_p * (&n + 1) * amp_precision() - gamma * x;
    if minus_partial_d.is_zero() {
        return Err(MathError::DivisionByZero);
    }
    div_up_fixed(&((partial_x * total_supply) / minus_partial_d), &invariant)
}

/// Rate of change of the fee-less price (in per out) as the in balance grows
/// along the curve, in human units
pub fn price_derivative(
    amp: &BigInt,
    balances: &[BigInt],
    index_in: usize,
    index_out: usize,
) -> MathResult<f64> {
    let p = CurvePartials::at(amp, balances, index_in, index_out)?;
    // Work in human units: balances /1e18, amplification /1000
    let x = to_f64(&p.x, 18);
    let y = to_f64(&p.y, 18);
    let a = to_f64(&p.a, 3);
    let b = to_f64(&p.b, 21);

    let g_x = 2.0 * a * x * y + a * y * y + b * y;
    let g_y = 2.0 * a * x * y + a * x * x + b * x;
    let g_xx = 2.0 * a * y;
    let g_yy = 2.0 * a * x;
    let g_xy = 2.0 * a * x + 2.0 * a * y + b;
    Ok((2.0 * g_x * g_y * g_xy - g_yy * g_x * g_x - g_xx * g_y * g_y) / (g_x * g_x * g_y))
}

/// Fee-less curve price (in per out) in human units
pub fn curve_price(amp: &BigInt, balances: &[BigInt], index_in: usize, index_out: usize) -> MathResult<f64> {
    let p = CurvePartials::at(amp, balances, index_in, index_out)?;
    Ok(to_f64(&p.partial_y(), 0) / to_f64(&p.partial_x(), 0))
}

// ----------------------------------------------------------------------------
// Spot prices after swap (fixed18, token in per token out)
// ----------------------------------------------------------------------------

pub fn spot_price_after_exact_token_in(
    amp: &BigInt,
    balances: &[BigInt],
    index_in: usize,
    index_out: usize,
    amount_in: &BigInt,
    fee: &BigInt,
) -> MathResult<BigInt> {
    let fee_complement = complement_fixed(fee);
    let out = calc_out_given_in(amp, balances, index_in, index_out, amount_in, fee)?;
    let mut after = balances.to_vec();
    after[index_in] = add(&after[index_in], &mul_up_fixed(amount_in, &fee_complement));
    after[index_out] = sub(&after[index_out], &out)?;
    let derivative = pool_derivative(amp, &after, index_in, index_out)?;
    div_down_fixed(&one(), &mul_down_fixed(&derivative, &fee_complement))
}

pub fn spot_price_after_exact_token_out(
    amp: &BigInt,
    balances: &[BigInt],
    index_in: usize,
    index_out: usize,
    amount_out: &BigInt,
    fee: &BigInt,
) -> MathResult<BigInt> {
    let amount_in = calc_in_given_out(amp, balances, index_in, index_out, amount_out, fee)?;
    let mut after = balances.to_vec();
    after[index_in] += amount_in;
    after[index_out] = sub(&after[index_out], amount_out)?;
    let derivative = pool_derivative(amp, &after, index_in, index_out)?;
    div_up_fixed(&one(), &mul_up_fixed(&derivative, &complement_fixed(fee)))
}

fn single(len: usize, index: usize, amount: &BigInt) -> Vec<BigInt> {
    let mut amounts = vec![BigInt::zero(); len];
    amounts[index] = amount.clone();
    amounts
}

/// Fee-less price of the share token after an exact single-token join
pub fn spot_price_after_exact_token_in_for_lbpt(
    amp: &BigInt,
    balances: &[BigInt],
    index_in: usize,
    total_supply: &BigInt,
    amount_in: &BigInt,
) -> MathResult<BigInt> {
    let amounts = single(balances.len(), index_in, amount_in);
    let minted = lbpt_out_given_exact_tokens_in(amp, balances, &amounts, total_supply, &BigInt::zero())?;
    let mut after = balances.to_vec();
    after[index_in] += amount_in;
    let derivative = pool_derivative_lbpt(amp, &after, &(total_supply + minted), index_in)?;
    div_up_fixed(&one(), &derivative)
}

/// Fee-less price of the share token after minting an exact amount
pub fn spot_price_after_token_in_for_exact_lbpt_out(
    amp: &BigInt,
    balances: &[BigInt],
    index_in: usize,
    total_supply: &BigInt,
    amount_out: &BigInt,
) -> MathResult<BigInt> {
    let amount_in = token_in_given_exact_lbpt_out(
        amp,
        balances,
        index_in,
        amount_out,
        total_supply,
        &BigInt::zero(),
    )?;
    let mut after = balances.to_vec();
    after[index_in] += amount_in;
    let derivative = pool_derivative_lbpt(amp, &after, &(total_supply + amount_out), index_in)?;
    div_up_fixed(&one(), &derivative)
}

/// Fee-less price of a token in share tokens after an exact share burn
pub fn spot_price_after_exact_lbpt_in_for_token_out(
    amp: &BigInt,
    balances: &[BigInt],
    index_out: usize,
    total_supply: &BigInt,
    amount_in: &BigInt,
) -> MathResult<BigInt> {
    let out = token_out_given_exact_lbpt_in(
        amp,
        balances,
        index_out,
        amount_in,
        total_supply,
        &BigInt::zero(),
    )?;
    let mut after = balances.to_vec();
    after[index_out] = sub(&after[index_out], &out)?;
    pool_derivative_lbpt(amp, &after, &sub(total_supply, amount_in)?, index_out)
}

/// Fee-less price of a token in share tokens after an exact token exit
pub fn spot_price_after_lbpt_in_for_exact_token_out(
    amp: &BigInt,
    balances: &[BigInt],
    index_out: usize,
    total_supply: &BigInt,
    amount_out: &BigInt,
) -> MathResult<BigInt> {
    let amounts = single(balances.len(), index_out, amount_out);
    let burned =
        lbpt_in_given_exact_tokens_out(amp, balances, &amounts, total_supply, &BigInt::zero())?;
    let mut after = balances.to_vec();
    after[index_out] = sub(&after[index_out], amount_out)?;
    pool_derivative_lbpt(amp, &after, &sub(total_supply, &burned)?, index_out)
}

/// Share tokens a join of `amounts` would mint at the current marginal
/// prices, ignoring price impact and fees
pub fn lbpt_for_tokens_zero_price_impact(
    amp: &BigInt,
    balances: &[BigInt],
    amounts: &[BigInt],
    total_supply: &BigInt,
) -> MathResult<BigInt> {
    let mut total = BigInt::zero();
    for (index, amount) in amounts.iter().enumerate() {
        let price = spot_price_after_token_in_for_exact_lbpt_out(
            amp,
            balances,
            index,
            total_supply,
            &BigInt::zero(),
        )?;
        total += div_down_fixed(amount, &price)?;
    }
    Ok(total)
}
