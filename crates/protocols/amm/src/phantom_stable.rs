//! Phantom-stable pools
//!
//! Stable pools whose share token is itself one of the pool tokens and
//! whose members carry price rates. The share token is removed from the
//! balance vector before the stable math runs; token amounts and balances
//! are converted through each token's rate. The swap fee is charged outside
//! the invariant math.

use lyfe_core::{Address, PoolError, PoolType, Result, SwapType};
use lyfe_math::{
    div_down, div_up_fixed, mul_down_fixed, mul_up_fixed, one, round_down_to_decimals,
    round_up_to_decimals, sub, MathResult, ONE_U128,
};
use num_bigint::BigInt;
use num_traits::Zero;

use crate::helpers::{
    forward_difference, foreign_view, human, liquidity_from_derivative, unsupported_pair,
};
use crate::pair::{PairExtra, PairKind, PoolPairView};
use crate::pool::{settle, PricingEngine, SwapOutcome};
use crate::stable::math;
use crate::state::{parse_field, PoolSnapshot, PoolState};

#[derive(Debug, Clone)]
pub struct PhantomStablePool {
    state: PoolState,
    /// Amplification ×1000
    amp: BigInt,
    /// Price rate per token, aligned with `state.tokens`
    rates: Vec<BigInt>,
}

/// `amount` less the swap fee, fee rounded up
pub fn subtract_swap_fee_amount(amount: &BigInt, fee: &BigInt) -> BigInt {
    let fee_amount = (amount * fee + one() - 1) / one();
    amount - fee_amount
}

/// Gross amount whose net after the swap fee is `amount`, rounded up
pub fn add_swap_fee_amount(amount: &BigInt, fee: &BigInt) -> MathResult<BigInt> {
    let complement = one() - fee;
    div_down(&(amount * one() + &complement - 1), &complement)
}

/// Position of `index` once the share token at `lbpt_index` is removed
fn shift_index(index: usize, lbpt_index: Option<usize>) -> usize {
    match lbpt_index {
        Some(lbpt) if index > lbpt => index - 1,
        _ => index,
    }
}

struct PhantomInputs<'a> {
    amp: &'a BigInt,
    balances: &'a [BigInt],
    index_in: usize,
    index_out: usize,
    rate_in: &'a BigInt,
    rate_out: &'a BigInt,
    supply: &'a BigInt,
}

fn phantom_extra(view: &PoolPairView) -> Result<PhantomInputs<'_>> {
    match &view.extra {
        PairExtra::PhantomStable {
            amp,
            balances,
            index_in,
            index_out,
            rate_in,
            rate_out,
            virtual_supply,
        } => Ok(PhantomInputs {
            amp,
            balances,
            index_in: *index_in,
            index_out: *index_out,
            rate_in,
            rate_out,
            supply: virtual_supply,
        }),
        _ => Err(foreign_view(view)),
    }
}

impl PhantomStablePool {
    pub fn from_snapshot(snapshot: &PoolSnapshot) -> Result<Self> {
        let state = PoolState::from_snapshot(snapshot)?;
        let amp = parse_field(snapshot.require(&snapshot.amp, "amp")?, 3, "amp")?;
        let rates = snapshot
            .tokens
            .iter()
            .map(|t| match &t.price_rate {
                Some(rate) => parse_field(rate, 18, "priceRate"),
                None => Ok(one()),
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { state, amp, rates })
    }

    pub fn amp(&self) -> &BigInt {
        &self.amp
    }

    /// Share supply in circulation
    pub fn virtual_supply(&self) -> &BigInt {
        &self.state.total_shares
    }

    fn lbpt_index(&self) -> Option<usize> {
        self.state.index_of(&self.state.address)
    }

    /// Rate-adjusted balances without the share token
    fn scaled_balances(&self) -> Vec<BigInt> {
        let lbpt = self.lbpt_index();
        self.state
            .tokens
            .iter()
            .zip(&self.rates)
            .enumerate()
            .filter(|(i, _)| Some(*i) != lbpt)
            .map(|(_, (t, rate))| mul_down_fixed(&t.balance, rate))
            .collect()
    }

    /// Share tokens a join of `amounts` would mint at current prices.
    ///
    /// `amounts` follow the pool's token order without the share token.
    pub fn lbpt_for_tokens_zero_price_impact(&self, amounts: &[BigInt]) -> Result<BigInt> {
        let balances = self.scaled_balances();
        if amounts.len() != balances.len() {
            return Err(PoolError::LengthMismatch {
                expected: balances.len(),
                found: amounts.len(),
            }
            .into());
        }
        let lbpt = self.lbpt_index();
        let rates = self
            .rates
            .iter()
            .enumerate()
            .filter(|(i, _)| Some(*i) != lbpt)
            .map(|(_, r)| r);
        let adjusted: Vec<BigInt> = amounts
            .iter()
            .zip(rates)
            .map(|(amount, rate)| {
                let net = amount - mul_down_fixed(amount, &self.state.swap_fee);
                mul_down_fixed(&net, rate)
            })
            .collect();
        Ok(math::lbpt_for_tokens_zero_price_impact(
            &self.amp,
            &balances,
            &adjusted,
            self.virtual_supply(),
        )?)
    }

    // Fee-less spot price in rate-adjusted units
    fn raw_spot_exact_in(view: &PoolPairView, p: &PhantomInputs<'_>, amount: &BigInt) -> MathResult<BigInt> {
        let zero = BigInt::zero();
        match view.kind {
            PairKind::TokenToLbpt => math::spot_price_after_exact_token_in_for_lbpt(
                p.amp, p.balances, p.index_in, p.supply, amount,
            ),
            PairKind::LbptToToken => math::spot_price_after_exact_lbpt_in_for_token_out(
                p.amp, p.balances, p.index_out, p.supply, amount,
            ),
            _ => math::spot_price_after_exact_token_in(
                p.amp, p.balances, p.index_in, p.index_out, amount, &zero,
            ),
        }
    }

    fn raw_spot_exact_out(view: &PoolPairView, p: &PhantomInputs<'_>, amount: &BigInt) -> MathResult<BigInt> {
        let zero = BigInt::zero();
        match view.kind {
            PairKind::TokenToLbpt => math::spot_price_after_token_in_for_exact_lbpt_out(
                p.amp, p.balances, p.index_in, p.supply, amount,
            ),
            PairKind::LbptToToken => math::spot_price_after_lbpt_in_for_exact_token_out(
                p.amp, p.balances, p.index_out, p.supply, amount,
            ),
            _ => math::spot_price_after_exact_token_out(
                p.amp, p.balances, p.index_in, p.index_out, amount, &zero,
            ),
        }
    }

    // Rate-adjusted price to token units, with the fee put back in
    fn to_token_price(view: &PoolPairView, p: &PhantomInputs<'_>, raw: &BigInt) -> Result<BigInt> {
        let with_fee = div_up_fixed(raw, &(one() - &view.swap_fee))?;
        Ok(div_up_fixed(&mul_up_fixed(&with_fee, p.rate_out), p.rate_in)?)
    }

    /// Finite-difference step for the share-token derivatives
    fn step(p: &PhantomInputs<'_>, kind: PairKind) -> BigInt {
        let base = if kind.is_lbpt_in() {
            p.supply
        } else {
            &p.balances[p.index_in]
        };
        let step = base / BigInt::from(1_000_000u32);
        if step.is_zero() {
            BigInt::from(1)
        } else {
            step
        }
    }
}

impl PricingEngine for PhantomStablePool {
    fn state(&self) -> &PoolState {
        &self.state
    }

    fn pair_view(&self, token_in: &Address, token_out: &Address) -> Result<PoolPairView> {
        if token_in == token_out {
            return Err(unsupported_pair(&self.state, token_in, token_out));
        }
        let index_in = self.state.require_index(token_in)?;
        let index_out = self.state.require_index(token_out)?;
        let t_in = &self.state.tokens[index_in];
        let t_out = &self.state.tokens[index_out];
        let rate_in = &self.rates[index_in];
        let rate_out = &self.rates[index_out];

        let kind = if self.state.is_share_token(token_in) {
            PairKind::LbptToToken
        } else if self.state.is_share_token(token_out) {
            PairKind::TokenToLbpt
        } else {
            PairKind::TokenToToken
        };
        let lbpt = self.lbpt_index();

        Ok(PoolPairView {
            pool_id: self.state.id.clone(),
            pool_type: PoolType::PhantomStable,
            token_in: token_in.clone(),
            token_out: token_out.clone(),
            decimals_in: t_in.decimals,
            decimals_out: t_out.decimals,
            balance_in: round_down_to_decimals(&mul_down_fixed(&t_in.balance, rate_in), t_in.decimals),
            balance_out: round_down_to_decimals(
                &mul_down_fixed(&t_out.balance, rate_out),
                t_out.decimals,
            ),
            swap_fee: self.state.swap_fee.clone(),
            kind,
            extra: PairExtra::PhantomStable {
                amp: self.amp.clone(),
                balances: self.scaled_balances(),
                index_in: shift_index(index_in, lbpt),
                index_out: shift_index(index_out, lbpt),
                rate_in: rate_in.clone(),
                rate_out: rate_out.clone(),
                virtual_supply: self.virtual_supply().clone(),
            },
        })
    }

    fn exact_in(&self, view: &PoolPairView, amount_in: &BigInt) -> Result<SwapOutcome> {
        if amount_in.is_zero() {
            return Ok(SwapOutcome::Amount(BigInt::zero()));
        }
        let p = phantom_extra(view)?;
        let net = subtract_swap_fee_amount(amount_in, &view.swap_fee);
        let converted = mul_down_fixed(&net, p.rate_in);
        let zero = BigInt::zero();

        let raw = match view.kind {
            PairKind::TokenToLbpt => {
                let mut amounts = vec![BigInt::zero(); p.balances.len()];
                amounts[p.index_in] = converted;
                math::lbpt_out_given_exact_tokens_in(p.amp, p.balances, &amounts, p.supply, &zero)
            }
            PairKind::LbptToToken => math::token_out_given_exact_lbpt_in(
                p.amp, p.balances, p.index_out, &converted, p.supply, &zero,
            ),
            _ => math::calc_out_given_in(p.amp, p.balances, p.index_in, p.index_out, &converted, &zero),
        };
        let out = raw
            .and_then(|r| div_down(&(r * one()), p.rate_out))
            .map(|a| round_down_to_decimals(&a, view.decimals_out));
        settle(&self.state.id, out)
    }

    fn exact_out(&self, view: &PoolPairView, amount_out: &BigInt) -> Result<SwapOutcome> {
        if amount_out.is_zero() {
            return Ok(SwapOutcome::Amount(BigInt::zero()));
        }
        let p = phantom_extra(view)?;
        let converted = mul_down_fixed(amount_out, p.rate_out);
        let zero = BigInt::zero();

        let raw = match view.kind {
            PairKind::TokenToLbpt => math::token_in_given_exact_lbpt_out(
                p.amp, p.balances, p.index_in, &converted, p.supply, &zero,
            ),
            PairKind::LbptToToken => {
                let mut amounts = vec![BigInt::zero(); p.balances.len()];
                amounts[p.index_out] = converted;
                math::lbpt_in_given_exact_tokens_out(p.amp, p.balances, &amounts, p.supply, &zero)
            }
            _ => math::calc_in_given_out(p.amp, p.balances, p.index_in, p.index_out, &converted, &zero),
        };
        let amount_in = raw
            .and_then(|r| div_down(&(r * one()), p.rate_in))
            .and_then(|a| add_swap_fee_amount(&a, &view.swap_fee))
            .map(|a| round_up_to_decimals(&a, view.decimals_in));
        settle(&self.state.id, amount_in)
    }

    fn spot_price_after_exact_in(&self, view: &PoolPairView, amount_in: &BigInt) -> Result<BigInt> {
        let p = phantom_extra(view)?;
        let net = subtract_swap_fee_amount(amount_in, &view.swap_fee);
        let raw = Self::raw_spot_exact_in(view, &p, &mul_down_fixed(&net, p.rate_in))?;
        Self::to_token_price(view, &p, &raw)
    }

    fn spot_price_after_exact_out(
        &self,
        view: &PoolPairView,
        amount_out: &BigInt,
    ) -> Result<BigInt> {
        let p = phantom_extra(view)?;
        let raw = Self::raw_spot_exact_out(view, &p, &mul_down_fixed(amount_out, p.rate_out))?;
        Self::to_token_price(view, &p, &raw)
    }

    fn derivative_after_exact_in(&self, view: &PoolPairView, amount_in: &BigInt) -> Result<f64> {
        let p = phantom_extra(view)?;
        if view.kind != PairKind::TokenToToken {
            let step = Self::step(&p, view.kind);
            return forward_difference(|a| self.spot_price_after_exact_in(view, a), amount_in, &step);
        }
        let zero = BigInt::zero();
        let net = subtract_swap_fee_amount(amount_in, &view.swap_fee);
        let converted = mul_down_fixed(&net, p.rate_in);
        let out = math::calc_out_given_in(p.amp, p.balances, p.index_in, p.index_out, &converted, &zero)?;
        let mut after = p.balances.to_vec();
        after[p.index_in] += &converted;
        after[p.index_out] = sub(&after[p.index_out], &out.max(BigInt::zero()))?;
        Ok(math::price_derivative(p.amp, &after, p.index_in, p.index_out)? * human(p.rate_out))
    }

    fn derivative_after_exact_out(&self, view: &PoolPairView, amount_out: &BigInt) -> Result<f64> {
        let p = phantom_extra(view)?;
        if view.kind != PairKind::TokenToToken {
            let step = Self::step(&p, view.kind);
            return forward_difference(|a| self.spot_price_after_exact_out(view, a), amount_out, &step);
        }
        let zero = BigInt::zero();
        let converted = mul_down_fixed(amount_out, p.rate_out);
        let amount_in = math::calc_in_given_out(p.amp, p.balances, p.index_in, p.index_out, &converted, &zero)?;
        let mut after = p.balances.to_vec();
        after[p.index_in] += amount_in;
        after[p.index_out] = sub(&after[p.index_out], &converted)?;
        let derivative = math::price_derivative(p.amp, &after, p.index_in, p.index_out)?;
        let price = math::curve_price(p.amp, &after, p.index_in, p.index_out)?;
        let rate_out = human(p.rate_out);
        Ok(derivative * price / (1.0 - human(&view.swap_fee)) * rate_out * rate_out / human(p.rate_in))
    }

    fn normalized_liquidity(&self, view: &PoolPairView) -> f64 {
        liquidity_from_derivative(
            self.derivative_after_exact_in(view, &BigInt::zero())
                .unwrap_or(f64::NAN),
        )
    }

    fn limit_amount(&self, view: &PoolPairView, _swap_type: SwapType) -> BigInt {
        let almost_one = BigInt::from(ONE_U128 / 100 * 99);
        match &view.extra {
            PairExtra::PhantomStable { rate_out, .. } => {
                div_down(&(&view.balance_out * almost_one), rate_out).unwrap_or_default()
            }
            _ => BigInt::zero(),
        }
    }

    fn with_balance(&self, token: &Address, balance: &BigInt) -> Result<Self> {
        let mut next = self.clone();
        if self.state.is_share_token(token) {
            let current = self.balance_of(token)?;
            next.state.total_shares = &self.state.total_shares + current - balance;
        }
        next.state = next.state.with_token_balance(token, balance)?;
        Ok(next)
    }
}
