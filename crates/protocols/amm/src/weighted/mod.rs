//! Weighted pools
//!
//! Constant weighted product pools. The pool's own address is the share
//! token, so besides token↔token pairs a weighted pool also prices
//! single-token joins (token → LBPT) and exits (LBPT → token).

pub mod math;

use lyfe_core::{Address, PoolError, PoolType, Result, SwapType};
use lyfe_math::scale::from_f64;
use lyfe_math::{
    div_down_fixed, mul_down_fixed, one, round_down_to_decimals, round_up_to_decimals, sub,
    ONE_U128,
};
use num_bigint::BigInt;
use num_traits::Zero;

use crate::helpers::{foreign_view, human, liquidity_from_derivative, unsupported_pair, FloatPair};
use crate::pair::{PairExtra, PairKind, PoolPairView};
use crate::pool::{settle, PricingEngine, SwapOutcome};
use crate::state::{parse_field, PoolSnapshot, PoolState};
use math::FloatInputs;

/// Fraction of a balance a single swap may move
const MAX_SWAP_RATIO: u128 = ONE_U128 * 3 / 10;

#[derive(Debug, Clone)]
pub struct WeightedPool {
    state: PoolState,
    /// Normalized weights, fixed18, in token order
    weights: Vec<BigInt>,
}

impl WeightedPool {
    pub fn from_snapshot(snapshot: &PoolSnapshot) -> Result<Self> {
        let state = PoolState::from_snapshot(snapshot)?;
        let weights = snapshot
            .tokens
            .iter()
            .map(|t| {
                let raw = t.weight.as_deref().ok_or_else(|| snapshot.missing("weight"))?;
                parse_field(raw, 18, "weight")
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { state, weights })
    }

    pub fn weights(&self) -> &[BigInt] {
        &self.weights
    }

    /// Balances truncated to each token's decimals
    fn scaled_balances(&self) -> Vec<BigInt> {
        self.state
            .tokens
            .iter()
            .map(|t| round_down_to_decimals(&t.balance, t.decimals))
            .collect()
    }

    /// (balance, decimals, weight, is share token) of one side of a pair
    fn side(&self, token: &Address) -> Result<(BigInt, u8, BigInt, bool)> {
        if self.state.is_share_token(token) {
            return Ok((self.state.total_shares.clone(), 18, one(), true));
        }
        let index = self.state.require_index(token)?;
        let t = &self.state.tokens[index];
        Ok((
            round_down_to_decimals(&t.balance, t.decimals),
            t.decimals,
            self.weights[index].clone(),
            false,
        ))
    }

    /// Vector with `amount` at `token`'s position and zeros elsewhere
    fn single_amount(&self, token: &Address, amount: &BigInt) -> Result<Vec<BigInt>> {
        let index = self.state.require_index(token)?;
        let mut amounts = vec![BigInt::zero(); self.state.tokens.len()];
        amounts[index] = amount.clone();
        Ok(amounts)
    }

    /// Share tokens a join of `amounts` would mint at current prices, ignoring
    /// price impact and fees
    pub fn lbpt_for_tokens_zero_price_impact(&self, amounts: &[BigInt]) -> Result<BigInt> {
        if amounts.len() != self.state.tokens.len() {
            return Err(PoolError::LengthMismatch {
                expected: self.state.tokens.len(),
                found: amounts.len(),
            }
            .into());
        }
        let supply = &self.state.total_shares;
        let mut total = BigInt::zero();
        for ((balance, weight), amount) in
            self.scaled_balances().iter().zip(&self.weights).zip(amounts)
        {
            let price = div_down_fixed(balance, &mul_down_fixed(supply, weight))?;
            total += div_down_fixed(amount, &price)?;
        }
        Ok(total)
    }

    fn weights_of(view: &PoolPairView) -> Result<(&BigInt, &BigInt)> {
        match &view.extra {
            PairExtra::Weighted {
                weight_in,
                weight_out,
            } => Ok((weight_in, weight_out)),
            _ => Err(foreign_view(view)),
        }
    }

    fn float_inputs(view: &PoolPairView, amount: &BigInt) -> Result<FloatInputs> {
        let (w_in, w_out) = Self::weights_of(view)?;
        let pair = FloatPair::of(view);
        Ok(FloatInputs {
            balance_in: pair.balance_in,
            balance_out: pair.balance_out,
            weight_in: human(w_in),
            weight_out: human(w_out),
            fee: pair.fee,
            amount: human(amount),
        })
    }
}

impl PricingEngine for WeightedPool {
    fn state(&self) -> &PoolState {
        &self.state
    }

    fn pair_view(&self, token_in: &Address, token_out: &Address) -> Result<PoolPairView> {
        if token_in == token_out {
            return Err(unsupported_pair(&self.state, token_in, token_out));
        }
        let (balance_in, decimals_in, weight_in, lbpt_in) = self.side(token_in)?;
        let (balance_out, decimals_out, weight_out, lbpt_out) = self.side(token_out)?;
        let kind = match (lbpt_in, lbpt_out) {
            (false, false) => PairKind::TokenToToken,
            (false, true) => PairKind::TokenToLbpt,
            (true, false) => PairKind::LbptToToken,
            (true, true) => return Err(unsupported_pair(&self.state, token_in, token_out)),
        };

        Ok(PoolPairView {
            pool_id: self.state.id.clone(),
            pool_type: PoolType::Weighted,
            token_in: token_in.clone(),
            token_out: token_out.clone(),
            decimals_in,
            decimals_out,
            balance_in,
            balance_out,
            swap_fee: self.state.swap_fee.clone(),
            kind,
            extra: PairExtra::Weighted {
                weight_in,
                weight_out,
            },
        })
    }

    fn exact_in(&self, view: &PoolPairView, amount_in: &BigInt) -> Result<SwapOutcome> {
        let (w_in, w_out) = Self::weights_of(view)?;
        let fee = &view.swap_fee;
        let supply = &self.state.total_shares;
        let out = match view.kind {
            PairKind::TokenToLbpt => {
                let amounts = self.single_amount(&view.token_in, amount_in)?;
                math::lbpt_out_given_exact_tokens_in(
                    &self.scaled_balances(),
                    &self.weights,
                    &amounts,
                    supply,
                    fee,
                )
            }
            PairKind::LbptToToken => math::token_out_given_exact_lbpt_in(
                &view.balance_out,
                w_out,
                amount_in,
                supply,
                fee,
            ),
            _ => math::calc_out_given_in(
                &view.balance_in,
                w_in,
                &view.balance_out,
                w_out,
                amount_in,
                fee,
            ),
        };
        settle(
            &self.state.id,
            out.map(|a| round_down_to_decimals(&a, view.decimals_out)),
        )
    }

    fn exact_out(&self, view: &PoolPairView, amount_out: &BigInt) -> Result<SwapOutcome> {
        let (w_in, w_out) = Self::weights_of(view)?;
        let fee = &view.swap_fee;
        let supply = &self.state.total_shares;
        let amount_in = match view.kind {
            PairKind::TokenToLbpt => math::token_in_given_exact_lbpt_out(
                &view.balance_in,
                w_in,
                amount_out,
                supply,
                fee,
            ),
            PairKind::LbptToToken => {
                let amounts = self.single_amount(&view.token_out, amount_out)?;
                math::lbpt_in_given_exact_tokens_out(
                    &self.scaled_balances(),
                    &self.weights,
                    &amounts,
                    supply,
                    fee,
                )
            }
            _ => math::calc_in_given_out(
                &view.balance_in,
                w_in,
                &view.balance_out,
                w_out,
                amount_out,
                fee,
            ),
        };
        settle(
            &self.state.id,
            amount_in.map(|a| round_up_to_decimals(&a, view.decimals_in)),
        )
    }

    fn spot_price_after_exact_in(&self, view: &PoolPairView, amount_in: &BigInt) -> Result<BigInt> {
        let (w_in, w_out) = Self::weights_of(view)?;
        Ok(match view.kind {
            PairKind::TokenToLbpt => math::spot_price_after_exact_token_in_for_lbpt(
                &view.balance_in,
                &view.balance_out,
                w_in,
                amount_in,
                &view.swap_fee,
            )?,
            PairKind::LbptToToken => from_f64(math::spot_price_after_exact_lbpt_in_for_token_out(
                Self::float_inputs(view, amount_in)?,
            ))?,
            _ => math::spot_price_after_exact_token_in(
                &view.balance_in,
                w_in,
                &view.balance_out,
                w_out,
                amount_in,
                &view.swap_fee,
            )?,
        })
    }

    fn spot_price_after_exact_out(
        &self,
        view: &PoolPairView,
        amount_out: &BigInt,
    ) -> Result<BigInt> {
        let (w_in, w_out) = Self::weights_of(view)?;
        let inputs = Self::float_inputs(view, amount_out)?;
        Ok(match view.kind {
            PairKind::TokenToLbpt => {
                from_f64(math::spot_price_after_token_in_for_exact_lbpt_out(inputs))?
            }
            PairKind::LbptToToken => {
                from_f64(math::spot_price_after_lbpt_in_for_exact_token_out(inputs))?
            }
            _ => math::spot_price_after_exact_token_out(
                &view.balance_in,
                w_in,
                &view.balance_out,
                w_out,
                amount_out,
                &view.swap_fee,
            )?,
        })
    }

    fn derivative_after_exact_in(&self, view: &PoolPairView, amount_in: &BigInt) -> Result<f64> {
        let inputs = Self::float_inputs(view, amount_in)?;
        Ok(match view.kind {
            PairKind::TokenToLbpt => math::derivative_after_exact_token_in_for_lbpt(inputs),
            PairKind::LbptToToken => math::derivative_after_exact_lbpt_in_for_token_out(inputs),
            _ => math::derivative_after_exact_token_in(inputs),
        })
    }

    fn derivative_after_exact_out(&self, view: &PoolPairView, amount_out: &BigInt) -> Result<f64> {
        let inputs = Self::float_inputs(view, amount_out)?;
        Ok(match view.kind {
            PairKind::TokenToLbpt => math::derivative_after_token_in_for_exact_lbpt_out(inputs),
            PairKind::LbptToToken => math::derivative_after_lbpt_in_for_exact_token_out(inputs),
            _ => math::derivative_after_exact_token_out(inputs),
        })
    }

    fn normalized_liquidity(&self, view: &PoolPairView) -> f64 {
        match view.kind {
            PairKind::TokenToToken => match Self::weights_of(view) {
                Ok((w_in, w_out)) => {
                    let (w_in, w_out) = (human(w_in), human(w_out));
                    human(&view.balance_out) * w_in / (w_in + w_out)
                }
                Err(_) => 0.0,
            },
            _ => liquidity_from_derivative(
                self.derivative_after_exact_in(view, &BigInt::zero())
                    .unwrap_or(f64::NAN),
            ),
        }
    }

    fn limit_amount(&self, view: &PoolPairView, swap_type: SwapType) -> BigInt {
        let ratio = BigInt::from(MAX_SWAP_RATIO);
        match swap_type {
            SwapType::ExactIn => mul_down_fixed(&view.balance_in, &ratio),
            SwapType::ExactOut => mul_down_fixed(&view.balance_out, &ratio),
        }
    }

    fn with_balance(&self, token: &Address, balance: &BigInt) -> Result<Self> {
        if self.state.is_share_token(token) {
            let mut next = self.clone();
            next.state.total_shares = balance.clone();
            return Ok(next);
        }
        Ok(Self {
            state: self.state.with_token_balance(token, balance)?,
            weights: self.weights.clone(),
        })
    }

    fn balance_of(&self, token: &Address) -> Result<BigInt> {
        if self.state.is_share_token(token) {
            return Ok(self.state.total_shares.clone());
        }
        let index = self.state.require_index(token)?;
        Ok(self.state.tokens[index].balance.clone())
    }

    /// Joins mint share tokens and exits burn them
    fn apply_swap(&self, view: &PoolPairView, amount_in: &BigInt, amount_out: &BigInt) -> Result<Self> {
        let supply = &self.state.total_shares;
        match view.kind {
            PairKind::TokenToLbpt => {
                let balance_in = self.balance_of(&view.token_in)? + amount_in;
                self.with_balance(&view.token_in, &balance_in)?
                    .with_balance(&view.token_out, &(supply + amount_out))
            }
            PairKind::LbptToToken => {
                let balance_out = sub(&self.balance_of(&view.token_out)?, amount_out)?;
                self.with_balance(&view.token_out, &balance_out)?
                    .with_balance(&view.token_in, &sub(supply, amount_in)?)
            }
            _ => {
                let balance_in = self.balance_of(&view.token_in)? + amount_in;
                let balance_out = sub(&self.balance_of(&view.token_out)?, amount_out)?;
                self.with_balance(&view.token_in, &balance_in)?
                    .with_balance(&view.token_out, &balance_out)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::fixtures::{addr, assert_fee_never_favours_trader, make_snapshot, make_token};
    use lyfe_core::Error;
    use lyfe_math::parse_fixed;

    fn fx(v: &str) -> BigInt {
        parse_fixed(v, 18).unwrap()
    }

    fn make_weighted_pool() -> WeightedPool {
        let mut tokens = vec![make_token(1, "1000", 18), make_token(2, "3000.1234567", 6)];
        tokens[0].weight = Some("0.4".into());
        tokens[1].weight = Some("0.6".into());
        let snapshot =
            make_snapshot("w", addr(100), PoolType::Weighted, "0.003", "5000", tokens);
        WeightedPool::from_snapshot(&snapshot).unwrap()
    }

    #[test]
    fn test_missing_weight() {
        let snapshot = make_snapshot(
            "w",
            addr(100),
            PoolType::Weighted,
            "0.003",
            "1",
            vec![make_token(1, "1", 18)],
        );
        assert!(matches!(
            WeightedPool::from_snapshot(&snapshot),
            Err(Error::Pool(PoolError::MissingParameter { param: "weight", .. }))
        ));
    }

    #[test]
    fn test_pair_view_truncates_balances() {
        let pool = make_weighted_pool();
        let view = pool.pair_view(&addr(1), &addr(2)).unwrap();
        assert_eq!(view.kind, PairKind::TokenToToken);
        assert_eq!(view.balance_out, fx("3000.123456"));
        assert_eq!(view.decimals_out, 6);
        assert!(matches!(
            pool.pair_view(&addr(1), &addr(9)),
            Err(Error::Pool(PoolError::TokenNotInPool { .. }))
        ));
    }

    #[test]
    fn test_share_token_pairs() {
        let pool = make_weighted_pool();
        let join = pool.pair_view(&addr(1), &addr(100)).unwrap();
        assert_eq!(join.kind, PairKind::TokenToLbpt);
        assert_eq!(join.balance_out, fx("5000"));
        let exit = pool.pair_view(&addr(100), &addr(2)).unwrap();
        assert_eq!(exit.kind, PairKind::LbptToToken);
        assert!(pool.pair_view(&addr(100), &addr(100)).is_err());
    }

    #[test]
    fn test_exact_in_rounds_to_output_decimals() {
        let pool = make_weighted_pool();
        let view = pool.pair_view(&addr(1), &addr(2)).unwrap();
        let out = pool.exact_in(&view, &fx("10")).unwrap().into_amount().unwrap();
        assert_eq!(&out % BigInt::from(1_000_000_000_000u64), BigInt::zero());
        assert!(out > BigInt::zero());

        let back = pool.exact_out(&view, &out).unwrap().into_amount().unwrap();
        assert!(back <= fx("10"));
        assert!(back > fx("9.99"));
    }

    #[test]
    fn test_exact_out_beyond_balance_is_no_liquidity() {
        let pool = make_weighted_pool();
        let view = pool.pair_view(&addr(1), &addr(2)).unwrap();
        assert!(pool.exact_out(&view, &fx("4000")).unwrap().is_no_liquidity());
    }

    #[test]
    fn test_join_then_exit_loses_fees() {
        let pool = make_weighted_pool();
        let join = pool.pair_view(&addr(1), &addr(100)).unwrap();
        let minted = pool.exact_in(&join, &fx("10")).unwrap().into_amount().unwrap();
        let joined = pool.apply_swap(&join, &fx("10"), &minted).unwrap();
        assert_eq!(joined.state().total_shares, fx("5000") + &minted);

        let exit = joined.pair_view(&addr(100), &addr(1)).unwrap();
        let back = joined.exact_in(&exit, &minted).unwrap().into_amount().unwrap();
        assert!(back < fx("10"));
        let exited = joined.apply_swap(&exit, &minted, &back).unwrap();
        assert_eq!(exited.state().total_shares, fx("5000"));
    }

    #[test]
    fn test_spot_price_at_zero_matches_ratio() {
        let pool = make_weighted_pool();
        let view = pool.pair_view(&addr(1), &addr(2)).unwrap();
        let spot = pool.spot_price_after_exact_in(&view, &BigInt::zero()).unwrap();
        // (Bi / wi) / (Bo / wo) / (1 - f)
        let expected = (1000.0 / 0.4) / (3000.123456 / 0.6) / 0.997;
        assert!((lyfe_math::to_f64(&spot, 18) - expected).abs() < 1e-9);
    }

    #[test]
    fn test_lbpt_spot_price_finite_difference() {
        let pool = make_weighted_pool();
        let view = pool.pair_view(&addr(1), &addr(100)).unwrap();
        let at = |a: &str| {
            lyfe_math::to_f64(&pool.spot_price_after_exact_in(&view, &fx(a)).unwrap(), 18)
        };
        let numeric = (at("10.1") - at("10")) / 0.1;
        let analytic = pool.derivative_after_exact_in(&view, &fx("10")).unwrap();
        assert!((numeric - analytic).abs() / analytic.abs() < 1e-2);
    }

    #[test]
    fn test_lbpt_spot_price_past_balance_is_error() {
        let pool = make_weighted_pool();
        let exit = pool.pair_view(&addr(100), &addr(2)).unwrap();
        // Withdrawing more than the balance drives the float price to NaN
        assert!(matches!(
            pool.spot_price_after_exact_out(&exit, &fx("5000")),
            Err(Error::Math(lyfe_core::MathError::FloatOutOfRange { .. }))
        ));
        assert!(pool.spot_price_after_exact_out(&exit, &fx("10")).is_ok());
    }

    #[test]
    fn test_normalized_liquidity_and_limits() {
        let pool = make_weighted_pool();
        let view = pool.pair_view(&addr(1), &addr(2)).unwrap();
        let liquidity = pool.normalized_liquidity(&view);
        assert!((liquidity - 3000.123456 * 0.4).abs() < 1e-6);
        assert_eq!(pool.limit_amount(&view, SwapType::ExactIn), fx("300"));
        assert_eq!(
            pool.limit_amount(&view, SwapType::ExactOut),
            fx("900.0370368")
        );
        let join = pool.pair_view(&addr(1), &addr(100)).unwrap();
        assert!(pool.normalized_liquidity(&join) > 0.0);
    }

    #[test]
    fn test_with_balance_is_value_semantic() {
        let pool = make_weighted_pool();
        let next = pool.with_balance(&addr(1), &fx("1")).unwrap();
        assert_eq!(next.balance_of(&addr(1)).unwrap(), fx("1"));
        assert_eq!(pool.balance_of(&addr(1)).unwrap(), fx("1000"));
        let shares = pool.with_balance(&addr(100), &fx("7")).unwrap();
        assert_eq!(shares.state().total_shares, fx("7"));
    }

    #[test]
    fn test_zero_price_impact() {
        let pool = make_weighted_pool();
        // 1% of each balance mints 1% of supply
        let lbpt = pool
            .lbpt_for_tokens_zero_price_impact(&[fx("10"), fx("30.00123456")])
            .unwrap();
        assert!((lyfe_math::to_f64(&lbpt, 18) - 50.0).abs() < 1e-6);
        assert!(pool.lbpt_for_tokens_zero_price_impact(&[fx("1")]).is_err());
    }

    #[test]
    fn test_fee_never_favours_trader() {
        let pool = make_weighted_pool();
        let view = pool.pair_view(&addr(1), &addr(2)).unwrap();
        assert_fee_never_favours_trader(&pool, &view, &["0.001", "10", "250"], &["0.001", "10", "800"]);
        let view = pool.pair_view(&addr(2), &addr(1)).unwrap();
        assert_fee_never_favours_trader(&pool, &view, &["0.001", "10", "800"], &["0.001", "10", "250"]);
    }
}
