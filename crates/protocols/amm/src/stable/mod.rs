//! Stable pools
//!
//! Amplified-invariant pools of like-valued tokens. Only token↔token pairs
//! are tradeable; the share-token math in [`math`] is shared with the
//! phantom-stable family.

pub mod math;

use lyfe_core::{Address, PoolType, Result, SwapType};
use lyfe_math::{mul_up_fixed, one, round_down_to_decimals, round_up_to_decimals, sub};
use num_bigint::BigInt;
use num_traits::Zero;

use crate::helpers::{
    foreign_view, human, liquidity_from_derivative, ninety_nine_percent, unsupported_pair,
};
use crate::pair::{PairExtra, PairKind, PoolPairView};
use crate::pool::{settle, PricingEngine, SwapOutcome};
use crate::state::{parse_field, PoolSnapshot, PoolState};

#[derive(Debug, Clone)]
pub struct StablePool {
    state: PoolState,
    /// Amplification ×1000
    amp: BigInt,
}

/// Stable extras of a view: (amp, balances, index in, index out)
pub(crate) fn stable_extra(view: &PoolPairView) -> Result<(&BigInt, &[BigInt], usize, usize)> {
    match &view.extra {
        PairExtra::Stable {
            amp,
            balances,
            index_in,
            index_out,
        } => Ok((amp, balances, *index_in, *index_out)),
        _ => Err(foreign_view(view)),
    }
}

impl StablePool {
    pub fn from_snapshot(snapshot: &PoolSnapshot) -> Result<Self> {
        let state = PoolState::from_snapshot(snapshot)?;
        let amp = parse_field(snapshot.require(&snapshot.amp, "amp")?, 3, "amp")?;
        Ok(Self { state, amp })
    }

    pub fn amp(&self) -> &BigInt {
        &self.amp
    }

    fn balances(&self) -> Vec<BigInt> {
        self.state.tokens.iter().map(|t| t.balance.clone()).collect()
    }

    /// Share tokens a join of `amounts` would mint at current prices
    pub fn lbpt_for_tokens_zero_price_impact(&self, amounts: &[BigInt]) -> Result<BigInt> {
        if amounts.len() != self.state.tokens.len() {
            return Err(lyfe_core::PoolError::LengthMismatch {
                expected: self.state.tokens.len(),
                found: amounts.len(),
            }
            .into());
        }
        Ok(math::lbpt_for_tokens_zero_price_impact(
            &self.amp,
            &self.balances(),
            amounts,
            &self.state.total_shares,
        )?)
    }
}

impl PricingEngine for StablePool {
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

        Ok(PoolPairView {
            pool_id: self.state.id.clone(),
            pool_type: PoolType::Stable,
            token_in: token_in.clone(),
            token_out: token_out.clone(),
            decimals_in: t_in.decimals,
            decimals_out: t_out.decimals,
            balance_in: round_down_to_decimals(&t_in.balance, t_in.decimals),
            balance_out: round_down_to_decimals(&t_out.balance, t_out.decimals),
            swap_fee: self.state.swap_fee.clone(),
            kind: PairKind::TokenToToken,
            extra: PairExtra::Stable {
                amp: self.amp.clone(),
                balances: self.balances(),
                index_in,
                index_out,
            },
        })
    }

    fn exact_in(&self, view: &PoolPairView, amount_in: &BigInt) -> Result<SwapOutcome> {
        let (amp, balances, i, o) = stable_extra(view)?;
        let out = math::calc_out_given_in(amp, balances, i, o, amount_in, &view.swap_fee)
            .map(|a| round_down_to_decimals(&a, view.decimals_out));
        settle(&self.state.id, out)
    }

    fn exact_out(&self, view: &PoolPairView, amount_out: &BigInt) -> Result<SwapOutcome> {
        let (amp, balances, i, o) = stable_extra(view)?;
        let amount_in = math::calc_in_given_out(amp, balances, i, o, amount_out, &view.swap_fee)
            .map(|a| round_up_to_decimals(&a, view.decimals_in));
        settle(&self.state.id, amount_in)
    }

    fn spot_price_after_exact_in(&self, view: &PoolPairView, amount_in: &BigInt) -> Result<BigInt> {
        let (amp, balances, i, o) = stable_extra(view)?;
        Ok(math::spot_price_after_exact_token_in(
            amp,
            balances,
            i,
            o,
            amount_in,
            &view.swap_fee,
        )?)
    }

    fn spot_price_after_exact_out(
        &self,
        view: &PoolPairView,
        amount_out: &BigInt,
    ) -> Result<BigInt> {
        let (amp, balances, i, o) = stable_extra(view)?;
        Ok(math::spot_price_after_exact_token_out(
            amp,
            balances,
            i,
            o,
            amount_out,
            &view.swap_fee,
        )?)
    }

    fn derivative_after_exact_in(&self, view: &PoolPairView, amount_in: &BigInt) -> Result<f64> {
        let (amp, balances, i, o) = stable_extra(view)?;
        let fee = &view.swap_fee;
        let out = math::calc_out_given_in(amp, balances, i, o, amount_in, fee)?;
        let mut after = balances.to_vec();
        after[i] += mul_up_fixed(amount_in, &(one() - fee));
        after[o] = sub(&after[o], &out.max(BigInt::zero()))?;
        Ok(math::price_derivative(amp, &after, i, o)?)
    }

    fn derivative_after_exact_out(&self, view: &PoolPairView, amount_out: &BigInt) -> Result<f64> {
        let (amp, balances, i, o) = stable_extra(view)?;
        let fee = &view.swap_fee;
        let amount_in = math::calc_in_given_out(amp, balances, i, o, amount_out, fee)?;
        let mut after = balances.to_vec();
        after[i] += mul_up_fixed(&amount_in, &(one() - fee));
        after[o] = sub(&after[o], amount_out)?;
        let derivative = math::price_derivative(amp, &after, i, o)?;
        let price = math::curve_price(amp, &after, i, o)?;
        Ok(derivative * price / (1.0 - human(fee)))
    }

    fn normalized_liquidity(&self, view: &PoolPairView) -> f64 {
        liquidity_from_derivative(
            self.derivative_after_exact_in(view, &BigInt::zero())
                .unwrap_or(f64::NAN),
        )
    }

    fn limit_amount(&self, view: &PoolPairView, _swap_type: SwapType) -> BigInt {
        ninety_nine_percent(&view.balance_out)
    }

    fn with_balance(&self, token: &Address, balance: &BigInt) -> Result<Self> {
        Ok(Self {
            state: self.state.with_token_balance(token, balance)?,
            amp: self.amp.clone(),
        })
    }
}
