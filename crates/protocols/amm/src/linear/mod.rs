//! Linear pools
//!
//! Three-token pools holding a main token, its yield-bearing wrapped
//! version and the pool's own share token. Prices are linear in the main
//! balance inside the target band; outside it the swap fee applies to the
//! distance from the band. Every pair involves two of the three tokens.

pub mod math;

use lyfe_core::{Address, PoolError, PoolType, Result, SwapType};
use lyfe_math::{round_down_to_decimals, round_up_to_decimals, MathResult};
use num_bigint::BigInt;
use num_traits::Zero;

use self::math::{LinearBalances, LinearParams};
use crate::helpers::{foreign_view, ninety_nine_percent, unsupported_pair};
use crate::pair::{PairExtra, PairKind, PoolPairView};
use crate::pool::{settle, PricingEngine, SwapOutcome};
use crate::state::{parse_field, PoolSnapshot, PoolState};

/// Pre-minted share balance; the virtual supply is what has left the pool
pub fn max_token_balance() -> BigInt {
    (BigInt::from(1u8) << 112) - 1
}

/// Exact-out into the share token may ask for up to this multiple of the
/// pool's share balance
const MAX_RATIO: u32 = 10;

type LinearFn = fn(&BigInt, LinearBalances<'_>, &LinearParams) -> MathResult<BigInt>;

#[derive(Debug, Clone)]
pub struct LinearPool {
    state: PoolState,
    main_index: usize,
    wrapped_index: usize,
    lower_target: BigInt,
    upper_target: BigInt,
    /// Price rate of the wrapped token
    rate: BigInt,
}

fn check_index(snapshot: &PoolSnapshot, index: usize, field: &'static str) -> Result<usize> {
    if index >= snapshot.tokens.len() {
        return Err(PoolError::InvalidNumber {
            field,
            value: index.to_string(),
        }
        .into());
    }
    Ok(index)
}

impl LinearPool {
    pub fn from_snapshot(snapshot: &PoolSnapshot) -> Result<Self> {
        let state = PoolState::from_snapshot(snapshot)?;
        let main_index = snapshot
            .main_index
            .ok_or_else(|| snapshot.missing("mainIndex"))?;
        let main_index = check_index(snapshot, main_index, "mainIndex")?;
        let wrapped_index = snapshot
            .wrapped_index
            .ok_or_else(|| snapshot.missing("wrappedIndex"))?;
        let wrapped_index = check_index(snapshot, wrapped_index, "wrappedIndex")?;
        let lower_target = parse_field(
            snapshot.require(&snapshot.lower_target, "lowerTarget")?,
            18,
            "lowerTarget",
        )?;
        let upper_target = parse_field(
            snapshot.require(&snapshot.upper_target, "upperTarget")?,
            18,
            "upperTarget",
        )?;
        let rate = parse_field(
            snapshot.require(&snapshot.tokens[wrapped_index].price_rate, "priceRate")?,
            18,
            "priceRate",
        )?;

        Ok(Self {
            state,
            main_index,
            wrapped_index,
            lower_target,
            upper_target,
            rate,
        })
    }

    pub fn main_token(&self) -> &Address {
        &self.state.tokens[self.main_index].address
    }

    pub fn wrapped_token(&self) -> &Address {
        &self.state.tokens[self.wrapped_index].address
    }

    /// Share supply held outside the pool. Falls back to the reported
    /// total shares when the share token is not listed.
    pub fn virtual_supply(&self) -> BigInt {
        match self.state.index_of(&self.state.address) {
            Some(index) => max_token_balance() - &self.state.tokens[index].balance,
            None => self.state.total_shares.clone(),
        }
    }

    fn classify(&self, token_in: &Address, token_out: &Address) -> PairKind {
        let wrapped = self.wrapped_token();
        if self.state.is_share_token(token_in) {
            if token_out == wrapped {
                PairKind::LbptToWrapped
            } else {
                PairKind::LbptToMain
            }
        } else if self.state.is_share_token(token_out) {
            if token_in == wrapped {
                PairKind::WrappedToLbpt
            } else {
                PairKind::MainToLbpt
            }
        } else if token_in == wrapped {
            PairKind::WrappedToMain
        } else {
            PairKind::MainToWrapped
        }
    }

    fn inputs<'a>(view: &'a PoolPairView) -> Result<(LinearBalances<'a>, LinearParams)> {
        match &view.extra {
            PairExtra::Linear {
                rate,
                lower_target,
                upper_target,
                main_balance,
                wrapped_balance,
                virtual_supply,
            } => Ok((
                LinearBalances {
                    main: main_balance,
                    wrapped: wrapped_balance,
                    supply: virtual_supply,
                },
                LinearParams {
                    fee: view.swap_fee.clone(),
                    rate: rate.clone(),
                    lower_target: lower_target.clone(),
                    upper_target: upper_target.clone(),
                },
            )),
            _ => Err(foreign_view(view)),
        }
    }

    fn run(view: &PoolPairView, f: LinearFn, amount: &BigInt) -> Result<MathResult<BigInt>> {
        let (balances, params) = Self::inputs(view)?;
        Ok(f(amount, balances, &params))
    }
}

fn exact_in_fn(kind: PairKind) -> LinearFn {
    match kind {
        PairKind::MainToLbpt => math::lbpt_out_per_main_in,
        PairKind::LbptToMain => math::main_out_per_lbpt_in,
        PairKind::WrappedToLbpt => math::lbpt_out_per_wrapped_in,
        PairKind::LbptToWrapped => math::wrapped_out_per_lbpt_in,
        PairKind::WrappedToMain => math::main_out_per_wrapped_in,
        _ => math::wrapped_out_per_main_in,
    }
}

fn exact_out_fn(kind: PairKind) -> LinearFn {
    match kind {
        PairKind::MainToLbpt => math::main_in_per_lbpt_out,
        PairKind::LbptToMain => math::lbpt_in_per_main_out,
        PairKind::WrappedToLbpt => math::wrapped_in_per_lbpt_out,
        PairKind::LbptToWrapped => math::lbpt_in_per_wrapped_out,
        PairKind::WrappedToMain => math::wrapped_in_per_main_out,
        _ => math::main_in_per_wrapped_out,
    }
}

fn spot_exact_in_fn(kind: PairKind) -> LinearFn {
    match kind {
        PairKind::MainToLbpt => math::spot_lbpt_out_per_main_in,
        PairKind::LbptToMain => math::spot_main_out_per_lbpt_in,
        PairKind::WrappedToLbpt => math::spot_lbpt_out_per_wrapped_in,
        PairKind::LbptToWrapped => math::spot_wrapped_out_per_lbpt_in,
        PairKind::WrappedToMain => math::spot_main_out_per_wrapped_in,
        _ => math::spot_wrapped_out_per_main_in,
    }
}

fn spot_exact_out_fn(kind: PairKind) -> LinearFn {
    match kind {
        PairKind::MainToLbpt => math::spot_main_in_per_lbpt_out,
        PairKind::LbptToMain => math::spot_lbpt_in_per_main_out,
        PairKind::WrappedToLbpt => math::spot_wrapped_in_per_lbpt_out,
        PairKind::LbptToWrapped => math::spot_lbpt_in_per_wrapped_out,
        PairKind::WrappedToMain => math::spot_wrapped_in_per_main_out,
        _ => math::spot_main_in_per_wrapped_out,
    }
}

impl PricingEngine for LinearPool {
    fn state(&self) -> &PoolState {
        &self.state
    }

    fn pair_view(&self, token_in: &Address, token_out: &Address) -> Result<PoolPairView> {
        if token_in == token_out {
            return Err(unsupported_pair(&self.state, token_in, token_out));
        }
        let t_in = &self.state.tokens[self.state.require_index(token_in)?];
        let t_out = &self.state.tokens[self.state.require_index(token_out)?];

        Ok(PoolPairView {
            pool_id: self.state.id.clone(),
            pool_type: PoolType::Linear,
            token_in: token_in.clone(),
            token_out: token_out.clone(),
            decimals_in: t_in.decimals,
            decimals_out: t_out.decimals,
            balance_in: t_in.balance.clone(),
            balance_out: t_out.balance.clone(),
            swap_fee: self.state.swap_fee.clone(),
            kind: self.classify(token_in, token_out),
            extra: PairExtra::Linear {
                rate: self.rate.clone(),
                lower_target: self.lower_target.clone(),
                upper_target: self.upper_target.clone(),
                main_balance: self.state.tokens[self.main_index].balance.clone(),
                wrapped_balance: self.state.tokens[self.wrapped_index].balance.clone(),
                virtual_supply: self.virtual_supply(),
            },
        })
    }

    fn exact_in(&self, view: &PoolPairView, amount_in: &BigInt) -> Result<SwapOutcome> {
        let out = Self::run(view, exact_in_fn(view.kind), amount_in)?
            .map(|a| round_down_to_decimals(&a, view.decimals_out));
        settle(&self.state.id, out)
    }

    fn exact_out(&self, view: &PoolPairView, amount_out: &BigInt) -> Result<SwapOutcome> {
        let amount_in = Self::run(view, exact_out_fn(view.kind), amount_out)?
            .map(|a| round_up_to_decimals(&a, view.decimals_in));
        settle(&self.state.id, amount_in)
    }

    fn spot_price_after_exact_in(&self, view: &PoolPairView, amount_in: &BigInt) -> Result<BigInt> {
        Ok(Self::run(view, spot_exact_in_fn(view.kind), amount_in)??)
    }

    fn spot_price_after_exact_out(
        &self,
        view: &PoolPairView,
        amount_out: &BigInt,
    ) -> Result<BigInt> {
        Ok(Self::run(view, spot_exact_out_fn(view.kind), amount_out)??)
    }

    fn derivative_after_exact_in(&self, _view: &PoolPairView, _amount_in: &BigInt) -> Result<f64> {
        Ok(0.0)
    }

    fn derivative_after_exact_out(&self, _view: &PoolPairView, _amount_out: &BigInt) -> Result<f64> {
        Ok(0.0)
    }

    /// Linear pools have no price impact beyond the fee band
    fn normalized_liquidity(&self, _view: &PoolPairView) -> f64 {
        f64::INFINITY
    }

    fn limit_amount(&self, view: &PoolPairView, swap_type: SwapType) -> BigInt {
        let almost_all_out = ninety_nine_percent(&view.balance_out);
        match swap_type {
            SwapType::ExactIn => {
                let cost_of = |f: LinearFn| -> BigInt {
                    match Self::run(view, f, &almost_all_out) {
                        Ok(Ok(amount)) => round_up_to_decimals(&amount, view.decimals_in),
                        _ => BigInt::zero(),
                    }
                };
                match view.kind {
                    PairKind::MainToLbpt => cost_of(math::main_in_per_lbpt_out),
                    PairKind::WrappedToLbpt => max_token_balance(),
                    PairKind::LbptToMain => cost_of(math::lbpt_in_per_main_out),
                    PairKind::LbptToWrapped => cost_of(math::lbpt_in_per_wrapped_out),
                    _ => almost_all_out,
                }
            }
            SwapType::ExactOut if view.kind.is_lbpt_out() => &view.balance_out * MAX_RATIO,
            SwapType::ExactOut => almost_all_out,
        }
    }

    fn with_balance(&self, token: &Address, balance: &BigInt) -> Result<Self> {
        let mut next = self.clone();
        next.state = self.state.with_token_balance(token, balance)?;
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::fixtures::{addr, assert_fee_never_favours_trader, make_snapshot, make_token};
    use lyfe_core::Error;
    use lyfe_math::{one, parse_fixed};

    fn fx(v: &str) -> BigInt {
        parse_fixed(v, 18).unwrap()
    }

    // Main 1500 (6 decimals), wrapped 1000 at rate 1.1, virtual supply 2600
    fn make_linear_pool() -> LinearPool {
        let lbpt_balance = max_token_balance() - fx("2600");
        let mut wrapped = make_token(2, "1000", 18);
        wrapped.price_rate = Some("1.1".to_string());
        let mut snapshot = make_snapshot(
            "lin",
            addr(10),
            PoolType::Linear,
            "0.01",
            "2600",
            vec![
                make_token(1, "1500", 6),
                wrapped,
                make_token(10, &lyfe_math::format_fixed(&lbpt_balance, 18), 18),
            ],
        );
        snapshot.main_index = Some(0);
        snapshot.wrapped_index = Some(1);
        snapshot.lower_target = Some("1000".to_string());
        snapshot.upper_target = Some("2000".to_string());
        LinearPool::from_snapshot(&snapshot).unwrap()
    }

    #[test]
    fn test_missing_parameters() {
        let mut snapshot = make_snapshot(
            "lin",
            addr(10),
            PoolType::Linear,
            "0.01",
            "0",
            vec![make_token(1, "1", 18), make_token(2, "1", 18)],
        );
        snapshot.main_index = Some(0);
        snapshot.wrapped_index = Some(1);
        snapshot.lower_target = Some("0".to_string());
        snapshot.upper_target = Some("1".to_string());
        assert!(matches!(
            LinearPool::from_snapshot(&snapshot),
            Err(Error::Pool(PoolError::MissingParameter { param: "priceRate", .. }))
        ));
        snapshot.wrapped_index = Some(5);
        assert!(matches!(
            LinearPool::from_snapshot(&snapshot),
            Err(Error::Pool(PoolError::InvalidNumber { field: "wrappedIndex", .. }))
        ));
        snapshot.main_index = None;
        assert!(LinearPool::from_snapshot(&snapshot).is_err());
    }

    #[test]
    fn test_pair_classification() {
        let pool = make_linear_pool();
        assert_eq!(pool.virtual_supply(), fx("2600"));
        let kinds = [
            (1, 10, PairKind::MainToLbpt),
            (10, 1, PairKind::LbptToMain),
            (2, 10, PairKind::WrappedToLbpt),
            (10, 2, PairKind::LbptToWrapped),
            (1, 2, PairKind::MainToWrapped),
            (2, 1, PairKind::WrappedToMain),
        ];
        for (a, b, kind) in kinds {
            assert_eq!(pool.pair_view(&addr(a), &addr(b)).unwrap().kind, kind);
        }
        assert!(pool.pair_view(&addr(1), &addr(1)).is_err());
        assert!(pool.pair_view(&addr(1), &addr(3)).is_err());
    }

    #[test]
    fn test_swaps_inside_band() {
        let pool = make_linear_pool();
        let view = pool.pair_view(&addr(1), &addr(10)).unwrap();
        assert_eq!(
            pool.exact_in(&view, &fx("100")).unwrap(),
            SwapOutcome::Amount(fx("100"))
        );
        let view = pool.pair_view(&addr(2), &addr(1)).unwrap();
        assert_eq!(
            pool.exact_in(&view, &fx("100")).unwrap(),
            SwapOutcome::Amount(fx("110"))
        );
        assert_eq!(
            pool.exact_out(&view, &fx("110")).unwrap(),
            SwapOutcome::Amount(fx("100"))
        );
    }

    #[test]
    fn test_exact_out_rounds_up_to_main_decimals() {
        let pool = make_linear_pool();
        let view = pool.pair_view(&addr(1), &addr(2)).unwrap();
        // 1 wei of wrapped costs 2 wei of main, rounded up to 1e-6
        let amount_in = pool.exact_out(&view, &BigInt::from(1)).unwrap();
        assert_eq!(amount_in, SwapOutcome::Amount(BigInt::from(1_000_000_000_000u64)));
    }

    #[test]
    fn test_draining_main_is_no_liquidity() {
        let pool = make_linear_pool();
        let view = pool.pair_view(&addr(2), &addr(1)).unwrap();
        assert!(pool.exact_in(&view, &fx("5000")).unwrap().is_no_liquidity());
    }

    #[test]
    fn test_derivative_and_liquidity() {
        let pool = make_linear_pool();
        let view = pool.pair_view(&addr(1), &addr(10)).unwrap();
        assert_eq!(pool.derivative_after_exact_in(&view, &fx("1")).unwrap(), 0.0);
        assert_eq!(pool.derivative_after_exact_out(&view, &fx("1")).unwrap(), 0.0);
        assert_eq!(pool.normalized_liquidity(&view), f64::INFINITY);
        assert_eq!(pool.spot_price_after_exact_in(&view, &fx("1")).unwrap(), one());
    }

    #[test]
    fn test_limits() {
        let pool = make_linear_pool();
        let main_wrapped = pool.pair_view(&addr(1), &addr(2)).unwrap();
        assert_eq!(pool.limit_amount(&main_wrapped, SwapType::ExactIn), fx("990"));
        assert_eq!(pool.limit_amount(&main_wrapped, SwapType::ExactOut), fx("990"));

        let wrapped_lbpt = pool.pair_view(&addr(2), &addr(10)).unwrap();
        assert_eq!(pool.limit_amount(&wrapped_lbpt, SwapType::ExactIn), max_token_balance());
        assert_eq!(
            pool.limit_amount(&wrapped_lbpt, SwapType::ExactOut),
            &wrapped_lbpt.balance_out * 10
        );

        // Taking 99% of the main balance drops it below the lower target,
        // which costs 1% of the shortfall on top
        let lbpt_main = pool.pair_view(&addr(10), &addr(1)).unwrap();
        assert_eq!(pool.limit_amount(&lbpt_main, SwapType::ExactIn), fx("1494.85"));
    }

    #[test]
    fn test_apply_swap_grows_virtual_supply() {
        let pool = make_linear_pool();
        let view = pool.pair_view(&addr(1), &addr(10)).unwrap();
        let next = pool.apply_swap(&view, &fx("100"), &fx("100")).unwrap();
        assert_eq!(next.virtual_supply(), fx("2700"));
        assert_eq!(next.balance_of(&addr(1)).unwrap(), fx("1600"));
        assert_eq!(pool.virtual_supply(), fx("2600"));
    }

    #[test]
    fn test_fee_never_favours_trader() {
        // Main starts inside the band, so every trade is fee-free or charged:
        // 700 main in crosses the upper target, 700 main out the lower one
        let pool = make_linear_pool();
        for (a, b) in [(1, 2), (2, 1), (1, 10), (10, 1), (2, 10), (10, 2)] {
            let view = pool.pair_view(&addr(a), &addr(b)).unwrap();
            assert_fee_never_favours_trader(&pool, &view, &["0.001", "100", "700"], &["0.001", "100", "700"]);
        }
    }
}
