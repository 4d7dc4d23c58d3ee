//! Pricing engine capability and the pool tagged union

use lyfe_core::{Address, PoolId, PoolType, Result, SwapType};
use lyfe_math::{sub, MathResult};
use num_bigint::BigInt;
use num_traits::Signed;
use serde::Serialize;
use tracing::debug;

use crate::linear::LinearPool;
use crate::multi_e::MultiEPool;
use crate::pair::PoolPairView;
use crate::phantom_stable::PhantomStablePool;
use crate::stable::StablePool;
use crate::state::{PoolSnapshot, PoolState};
use crate::weighted::WeightedPool;

/// Result of a swap simulation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SwapOutcome {
    /// Fixed18 amount, rounded to the counter token's decimals
    Amount(BigInt),
    /// The pool cannot fill the trade
    NoLiquidity,
}

impl SwapOutcome {
    pub fn amount(&self) -> Option<&BigInt> {
        match self {
            Self::Amount(a) => Some(a),
            Self::NoLiquidity => None,
        }
    }

    pub fn into_amount(self) -> Option<BigInt> {
        match self {
            Self::Amount(a) => Some(a),
            Self::NoLiquidity => None,
        }
    }

    pub fn is_no_liquidity(&self) -> bool {
        matches!(self, Self::NoLiquidity)
    }
}

/// Map raw swap math into an outcome.
///
/// Negative amounts and ordinary math failures mean the pool cannot fill the
/// trade; solver non-convergence is an error for the caller.
pub(crate) fn settle(pool: &PoolId, result: MathResult<BigInt>) -> Result<SwapOutcome> {
    match result {
        Ok(amount) if amount.is_negative() => Ok(SwapOutcome::NoLiquidity),
        Ok(amount) => Ok(SwapOutcome::Amount(amount)),
        Err(e) if e.is_convergence() => Err(e.into()),
        Err(e) => {
            debug!(pool = %pool, error = %e, "swap math failed, treating as no liquidity");
            Ok(SwapOutcome::NoLiquidity)
        }
    }
}

/// Capability shared by every pool family.
///
/// Amounts and balances are fixed18. Pools are values: balance updates
/// return a new pool and leave `self` untouched.
pub trait PricingEngine: Sized {
    fn state(&self) -> &PoolState;

    /// Build the pricing view for `token_in -> token_out`
    fn pair_view(&self, token_in: &Address, token_out: &Address) -> Result<PoolPairView>;

    /// Amount out for an exact `amount_in`
    fn exact_in(&self, view: &PoolPairView, amount_in: &BigInt) -> Result<SwapOutcome>;

    /// Amount in for an exact `amount_out`
    fn exact_out(&self, view: &PoolPairView, amount_out: &BigInt) -> Result<SwapOutcome>;

    /// Price (token in per token out) after swapping `amount_in`
    fn spot_price_after_exact_in(&self, view: &PoolPairView, amount_in: &BigInt) -> Result<BigInt>;

    /// Price (token in per token out) after receiving `amount_out`
    fn spot_price_after_exact_out(&self, view: &PoolPairView, amount_out: &BigInt)
        -> Result<BigInt>;

    fn derivative_after_exact_in(&self, view: &PoolPairView, amount_in: &BigInt) -> Result<f64>;

    fn derivative_after_exact_out(&self, view: &PoolPairView, amount_out: &BigInt)
        -> Result<f64>;

    /// Depth measure used to rank pools for the same pair
    fn normalized_liquidity(&self, view: &PoolPairView) -> f64;

    /// Largest amount the pool accepts for `swap_type`
    fn limit_amount(&self, view: &PoolPairView, swap_type: SwapType) -> BigInt;

    /// Copy of the pool with `token`'s balance replaced
    fn with_balance(&self, token: &Address, balance: &BigInt) -> Result<Self>;

    fn balance_of(&self, token: &Address) -> Result<BigInt> {
        let state = self.state();
        Ok(state.tokens[state.require_index(token)?].balance.clone())
    }

    /// Pool after a swap of `amount_in` for `amount_out` on `view`'s pair
    fn apply_swap(&self, view: &PoolPairView, amount_in: &BigInt, amount_out: &BigInt) -> Result<Self> {
        let balance_in = self.balance_of(&view.token_in)? + amount_in;
        let next = self.with_balance(&view.token_in, &balance_in)?;
        let balance_out = sub(&next.balance_of(&view.token_out)?, amount_out)?;
        next.with_balance(&view.token_out, &balance_out)
    }

    fn swap(&self, view: &PoolPairView, swap_type: SwapType, amount: &BigInt) -> Result<SwapOutcome> {
        match swap_type {
            SwapType::ExactIn => self.exact_in(view, amount),
            SwapType::ExactOut => self.exact_out(view, amount),
        }
    }

    fn spot_price_after_swap(
        &self,
        view: &PoolPairView,
        swap_type: SwapType,
        amount: &BigInt,
    ) -> Result<BigInt> {
        match swap_type {
            SwapType::ExactIn => self.spot_price_after_exact_in(view, amount),
            SwapType::ExactOut => self.spot_price_after_exact_out(view, amount),
        }
    }
}

/// Any supported pool
#[derive(Debug, Clone)]
pub enum Pool {
    Weighted(WeightedPool),
    Stable(StablePool),
    Linear(LinearPool),
    PhantomStable(PhantomStablePool),
    MultiElliptic(MultiEPool),
}

macro_rules! dispatch {
    ($self:ident, $pool:ident => $body:expr) => {
        match $self {
            Pool::Weighted($pool) => $body,
            Pool::Stable($pool) => $body,
            Pool::Linear($pool) => $body,
            Pool::PhantomStable($pool) => $body,
            Pool::MultiElliptic($pool) => $body,
        }
    };
}

impl Pool {
    pub fn from_snapshot(snapshot: &PoolSnapshot) -> Result<Self> {
        Ok(match snapshot.pool_type {
            PoolType::Weighted => Self::Weighted(WeightedPool::from_snapshot(snapshot)?),
            PoolType::Stable => Self::Stable(StablePool::from_snapshot(snapshot)?),
            PoolType::Linear => Self::Linear(LinearPool::from_snapshot(snapshot)?),
            PoolType::PhantomStable => {
                Self::PhantomStable(PhantomStablePool::from_snapshot(snapshot)?)
            }
            PoolType::MultiElliptic => Self::MultiElliptic(MultiEPool::from_snapshot(snapshot)?),
        })
    }

    pub fn id(&self) -> &PoolId {
        &self.state().id
    }

    pub fn address(&self) -> &Address {
        &self.state().address
    }

    pub fn pool_type(&self) -> PoolType {
        self.state().pool_type
    }

    /// Tokens tradeable through this pool, including the share token when
    /// it can be swapped
    pub fn tradeable_tokens(&self) -> Vec<Address> {
        let mut tokens = self.state().token_addresses();
        if let Self::Weighted(_) = self {
            tokens.push(self.address().clone());
        }
        tokens
    }

    pub fn contains(&self, token: &Address) -> bool {
        self.tradeable_tokens().contains(token)
    }

    /// Share tokens a proportional join of `amounts` would mint, for the
    /// families that price joins
    pub fn lbpt_for_tokens_zero_price_impact(&self, amounts: &[BigInt]) -> Result<Option<BigInt>> {
        match self {
            Self::Weighted(p) => p.lbpt_for_tokens_zero_price_impact(amounts).map(Some),
            Self::Stable(p) => p.lbpt_for_tokens_zero_price_impact(amounts).map(Some),
            Self::PhantomStable(p) => p.lbpt_for_tokens_zero_price_impact(amounts).map(Some),
            Self::Linear(_) | Self::MultiElliptic(_) => Ok(None),
        }
    }

    pub fn as_linear(&self) -> Option<&LinearPool> {
        match self {
            Self::Linear(pool) => Some(pool),
            _ => None,
        }
    }

    /// Normalized liquidity of `token_in -> token_out`, zero when the pair
    /// cannot be priced
    pub fn pair_liquidity(&self, token_in: &Address, token_out: &Address) -> f64 {
        match self.pair_view(token_in, token_out) {
            Ok(view) => self.normalized_liquidity(&view),
            Err(e) => {
                debug!(pool = %self.id(), error = %e, "pair view failed");
                0.0
            }
        }
    }
}

impl PricingEngine for Pool {
    fn state(&self) -> &PoolState {
        dispatch!(self, p => p.state())
    }

    fn pair_view(&self, token_in: &Address, token_out: &Address) -> Result<PoolPairView> {
        dispatch!(self, p => p.pair_view(token_in, token_out))
    }

    fn exact_in(&self, view: &PoolPairView, amount_in: &BigInt) -> Result<SwapOutcome> {
        dispatch!(self, p => p.exact_in(view, amount_in))
    }

    fn exact_out(&self, view: &PoolPairView, amount_out: &BigInt) -> Result<SwapOutcome> {
        dispatch!(self, p => p.exact_out(view, amount_out))
    }

    fn spot_price_after_exact_in(&self, view: &PoolPairView, amount_in: &BigInt) -> Result<BigInt> {
        dispatch!(self, p => p.spot_price_after_exact_in(view, amount_in))
    }

    fn spot_price_after_exact_out(
        &self,
        view: &PoolPairView,
        amount_out: &BigInt,
    ) -> Result<BigInt> {
        dispatch!(self, p => p.spot_price_after_exact_out(view, amount_out))
    }

    fn derivative_after_exact_in(&self, view: &PoolPairView, amount_in: &BigInt) -> Result<f64> {
        dispatch!(self, p => p.derivative_after_exact_in(view, amount_in))
    }

    fn derivative_after_exact_out(&self, view: &PoolPairView, amount_out: &BigInt) -> Result<f64> {
        dispatch!(self, p => p.derivative_after_exact_out(view, amount_out))
    }

    fn normalized_liquidity(&self, view: &PoolPairView) -> f64 {
        dispatch!(self, p => p.normalized_liquidity(view))
    }

    fn limit_amount(&self, view: &PoolPairView, swap_type: SwapType) -> BigInt {
        dispatch!(self, p => p.limit_amount(view, swap_type))
    }

    fn with_balance(&self, token: &Address, balance: &BigInt) -> Result<Self> {
        Ok(match self {
            Self::Weighted(p) => Self::Weighted(p.with_balance(token, balance)?),
            Self::Stable(p) => Self::Stable(p.with_balance(token, balance)?),
            Self::Linear(p) => Self::Linear(p.with_balance(token, balance)?),
            Self::PhantomStable(p) => Self::PhantomStable(p.with_balance(token, balance)?),
            Self::MultiElliptic(p) => Self::MultiElliptic(p.with_balance(token, balance)?),
        })
    }

    fn balance_of(&self, token: &Address) -> Result<BigInt> {
        dispatch!(self, p => p.balance_of(token))
    }

    fn apply_swap(&self, view: &PoolPairView, amount_in: &BigInt, amount_out: &BigInt) -> Result<Self> {
        Ok(match self {
            Self::Weighted(p) => Self::Weighted(p.apply_swap(view, amount_in, amount_out)?),
            Self::Stable(p) => Self::Stable(p.apply_swap(view, amount_in, amount_out)?),
            Self::Linear(p) => Self::Linear(p.apply_swap(view, amount_in, amount_out)?),
            Self::PhantomStable(p) => {
                Self::PhantomStable(p.apply_swap(view, amount_in, amount_out)?)
            }
            Self::MultiElliptic(p) => {
                Self::MultiElliptic(p.apply_swap(view, amount_in, amount_out)?)
            }
        })
    }
}
