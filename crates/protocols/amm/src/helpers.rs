//! Shared pricing helpers

use lyfe_core::{Address, Error, PoolError};
use lyfe_math::{mul_down_fixed, to_f64, ONE_U128};
use num_bigint::BigInt;

use crate::pair::PoolPairView;
use crate::state::PoolState;

/// 99% of a balance, the usual swap limit
pub(crate) fn ninety_nine_percent(balance: &BigInt) -> BigInt {
    mul_down_fixed(balance, &BigInt::from(ONE_U128 / 100 * 99))
}

pub(crate) fn unsupported_pair(state: &PoolState, token_in: &Address, token_out: &Address) -> Error {
    PoolError::UnsupportedPair {
        pool: state.id.to_string(),
        token_in: token_in.to_string(),
        token_out: token_out.to_string(),
    }
    .into()
}

/// A view built by a different pool family was passed in
pub(crate) fn foreign_view(view: &PoolPairView) -> Error {
    PoolError::UnsupportedPair {
        pool: view.pool_id.to_string(),
        token_in: view.token_in.to_string(),
        token_out: view.token_out.to_string(),
    }
    .into()
}

/// Normalized liquidity from the spot-price derivative at zero amount
pub(crate) fn liquidity_from_derivative(derivative: f64) -> f64 {
    if derivative == 0.0 {
        f64::INFINITY
    } else if derivative.is_nan() || derivative < 0.0 {
        0.0
    } else {
        1.0 / derivative
    }
}

/// Human-scale `f64` of a fixed18 amount
pub(crate) fn human(amount: &BigInt) -> f64 {
    to_f64(amount, 18)
}

/// Float-view of the pair's balances and fee, in human units
#[derive(Debug, Clone, Copy)]
pub(crate) struct FloatPair {
    pub balance_in: f64,
    pub balance_out: f64,
    pub fee: f64,
}

impl FloatPair {
    pub fn of(view: &PoolPairView) -> Self {
        Self {
            balance_in: human(&view.balance_in),
            balance_out: human(&view.balance_out),
            fee: human(&view.swap_fee),
        }
    }
}

/// Forward difference of `price` at `amount` with step `step`, in human units
pub(crate) fn forward_difference(
    price_at: impl Fn(&BigInt) -> lyfe_core::Result<BigInt>,
    amount: &BigInt,
    step: &BigInt,
) -> lyfe_core::Result<f64> {
    let here = price_at(amount)?;
    let there = price_at(&(amount + step))?;
    let rise = human(&(there - here));
    let run = human(step);
    if run == 0.0 {
        return Ok(0.0);
    }
    Ok(rise / run)
}
