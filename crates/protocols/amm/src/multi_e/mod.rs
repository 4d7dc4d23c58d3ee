//! Multi-elliptic (E-CLP) pools
//!
//! Two-token pools whose liquidity is concentrated on a price band
//! `[alpha, beta]` along a rotated, stretched ellipse. The invariant is
//! recomputed from the view's balances on every call; swaps run against
//! the vector `(invariant + 2 * err, invariant)`.

pub mod math;

use lyfe_core::{Address, PoolError, PoolType, Result, SwapType};
use lyfe_math::{
    div_down_fixed, mul_down_fixed, one, round_down_to_decimals, round_up_to_decimals, sub,
    MathResult, ONE_U128,
};
use num_bigint::BigInt;
use num_traits::Zero;
use tracing::debug;

use crate::helpers::{foreign_view, human, liquidity_from_derivative, unsupported_pair};
use crate::pair::{PairExtra, PairKind, PoolPairView};
use crate::pool::{settle, PricingEngine, SwapOutcome};
use crate::state::{parse_field, PoolSnapshot, PoolState};
use math::{DerivedParams, EllipticParams, Vector2};

/// Fraction of the theoretical maximum a single swap may use
const SWAP_LIMIT_FACTOR: u128 = ONE_U128 / 1_000_000 * 999_999;

#[derive(Debug, Clone)]
pub struct MultiEPool {
    state: PoolState,
    params: EllipticParams,
    derived: DerivedParams,
}

/// `amount` less the swap fee
fn reduce_fee(amount: &BigInt, fee: &BigInt) -> BigInt {
    amount - mul_down_fixed(amount, fee)
}

/// Gross amount whose net after the swap fee is `amount`
fn add_fee(amount: &BigInt, fee: &BigInt) -> MathResult<BigInt> {
    div_down_fixed(amount, &(one() - fee))
}

fn token_in_is_token0(view: &PoolPairView) -> Result<bool> {
    match view.extra {
        PairExtra::MultiElliptic { token_in_is_token0 } => Ok(token_in_is_token0),
        _ => Err(foreign_view(view)),
    }
}

/// View balances in token order
fn ordered_balances(view: &PoolPairView, in_is_0: bool) -> [BigInt; 2] {
    if in_is_0 {
        [view.balance_in.clone(), view.balance_out.clone()]
    } else {
        [view.balance_out.clone(), view.balance_in.clone()]
    }
}

/// Balances after `amount_in` enters and `amount_out` leaves
fn moved_balances(balances: &[BigInt; 2], in_is_0: bool, amount_in: &BigInt, amount_out: &BigInt) -> [BigInt; 2] {
    if in_is_0 {
        [&balances[0] + amount_in, &balances[1] - amount_out]
    } else {
        [&balances[0] - amount_out, &balances[1] + amount_in]
    }
}

impl MultiEPool {
    pub fn from_snapshot(snapshot: &PoolSnapshot) -> Result<Self> {
        let state = PoolState::from_snapshot(snapshot)?;
        if state.tokens.len() != 2 {
            return Err(PoolError::LengthMismatch {
                expected: 2,
                found: state.tokens.len(),
            }
            .into());
        }

        let base = |value: &Option<String>, name: &'static str| -> Result<BigInt> {
            parse_field(snapshot.require(value, name)?, 18, name)
        };
        let extended = |value: &Option<String>, name: &'static str| -> Result<BigInt> {
            parse_field(snapshot.require(value, name)?, 38, name)
        };

        let params = EllipticParams {
            alpha: base(&snapshot.alpha, "alpha")?,
            beta: base(&snapshot.beta, "beta")?,
            c: base(&snapshot.c, "c")?,
            s: base(&snapshot.s, "s")?,
            lambda: base(&snapshot.lambda, "lambda")?,
        };
        let derived = DerivedParams {
            tau_alpha: Vector2::new(
                extended(&snapshot.tau_alpha_x, "tauAlphaX")?,
                extended(&snapshot.tau_alpha_y, "tauAlphaY")?,
            ),
            tau_beta: Vector2::new(
                extended(&snapshot.tau_beta_x, "tauBetaX")?,
                extended(&snapshot.tau_beta_y, "tauBetaY")?,
            ),
            u: extended(&snapshot.u, "u")?,
            v: extended(&snapshot.v, "v")?,
            w: extended(&snapshot.w, "w")?,
            z: extended(&snapshot.z, "z")?,
            d_sq: extended(&snapshot.d_sq, "dSq")?,
        };
        Ok(Self {
            state,
            params,
            derived,
        })
    }

    pub fn params(&self) -> &EllipticParams {
        &self.params
    }

    /// Invariant vector `(invariant + 2 * err, invariant)` of `balances`
    fn invariant(&self, balances: &[BigInt; 2]) -> MathResult<Vector2> {
        let (invariant, err) =
            math::calculate_invariant_with_error(&balances[0], &balances[1], &self.params, &self.derived)?;
        Ok(Vector2::new(&invariant + err * 2, invariant))
    }

    fn spot_price_at(&self, balances: &[BigInt; 2], r: &Vector2, in_is_0: bool, fee: &BigInt) -> MathResult<BigInt> {
        let px = math::calculate_price(balances, &self.params, &self.derived, r)?;
        let f = one() - fee;
        if in_is_0 {
            div_down_fixed(&one(), &mul_down_fixed(&px, &f))
        } else {
            div_down_fixed(&px, &f)
        }
    }

    fn amount_out(&self, view: &PoolPairView, in_is_0: bool, amount_in: &BigInt) -> MathResult<BigInt> {
        let balances = ordered_balances(view, in_is_0);
        let r = self.invariant(&balances)?;
        let net = reduce_fee(amount_in, &view.swap_fee);
        math::calc_out_given_in(&balances, &net, in_is_0, &self.params, &self.derived, &r)
    }

    fn amount_in(&self, view: &PoolPairView, in_is_0: bool, amount_out: &BigInt) -> MathResult<BigInt> {
        let balances = ordered_balances(view, in_is_0);
        let r = self.invariant(&balances)?;
        let net = math::calc_in_given_out(&balances, amount_out, in_is_0, &self.params, &self.derived, &r)?;
        add_fee(&net, &view.swap_fee)
    }

    /// Balances and invariant after `amount_in` is swapped in
    fn after_exact_in(&self, view: &PoolPairView, in_is_0: bool, amount_in: &BigInt) -> MathResult<([BigInt; 2], Vector2)> {
        let balances = ordered_balances(view, in_is_0);
        let r = self.invariant(&balances)?;
        let net = reduce_fee(amount_in, &view.swap_fee);
        if net.is_zero() {
            return Ok((balances, r));
        }
        let out = math::calc_out_given_in(&balances, &net, in_is_0, &self.params, &self.derived, &r)?;
        Ok((moved_balances(&balances, in_is_0, &net, &out), r))
    }

    /// Balances and invariant after `amount_out` is swapped out
    fn after_exact_out(&self, view: &PoolPairView, in_is_0: bool, amount_out: &BigInt) -> MathResult<([BigInt; 2], Vector2)> {
        let balances = ordered_balances(view, in_is_0);
        let r = self.invariant(&balances)?;
        if amount_out.is_zero() {
            return Ok((balances, r));
        }
        let net_in = math::calc_in_given_out(&balances, amount_out, in_is_0, &self.params, &self.derived, &r)?;
        Ok((moved_balances(&balances, in_is_0, &net_in, amount_out), r))
    }

    fn max_amount_in(&self, view: &PoolPairView, in_is_0: bool) -> MathResult<BigInt> {
        let balances = ordered_balances(view, in_is_0);
        let r = self.invariant(&balances)?;
        let (p, d) = (&self.params, &self.derived);
        let span = if in_is_0 {
            math::virtual_offset0(p, d, &r, &d.tau_beta)? - math::virtual_offset0(p, d, &r, &d.tau_alpha)?
        } else {
            math::virtual_offset1(p, d, &r, &d.tau_alpha)? - math::virtual_offset1(p, d, &r, &d.tau_beta)?
        };
        let room = sub(&span, &view.balance_in)?;
        let gross = div_down_fixed(&room, &(one() - &view.swap_fee))?;
        Ok(mul_down_fixed(&gross, &BigInt::from(SWAP_LIMIT_FACTOR)))
    }
}

impl PricingEngine for MultiEPool {
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
            pool_type: PoolType::MultiElliptic,
            token_in: token_in.clone(),
            token_out: token_out.clone(),
            decimals_in: t_in.decimals,
            decimals_out: t_out.decimals,
            balance_in: round_down_to_decimals(&t_in.balance, t_in.decimals),
            balance_out: round_down_to_decimals(&t_out.balance, t_out.decimals),
            swap_fee: self.state.swap_fee.clone(),
            kind: PairKind::TokenToToken,
            extra: PairExtra::MultiElliptic {
                token_in_is_token0: index_in == 0,
            },
        })
    }

    fn exact_in(&self, view: &PoolPairView, amount_in: &BigInt) -> Result<SwapOutcome> {
        let in_is_0 = token_in_is_token0(view)?;
        if amount_in.is_zero() {
            return Ok(SwapOutcome::Amount(BigInt::zero()));
        }
        let out = self
            .amount_out(view, in_is_0, amount_in)
            .map(|a| round_down_to_decimals(&a, view.decimals_out));
        settle(&self.state.id, out)
    }

    fn exact_out(&self, view: &PoolPairView, amount_out: &BigInt) -> Result<SwapOutcome> {
        let in_is_0 = token_in_is_token0(view)?;
        if amount_out.is_zero() {
            return Ok(SwapOutcome::Amount(BigInt::zero()));
        }
        let amount_in = self
            .amount_in(view, in_is_0, amount_out)
            .map(|a| round_up_to_decimals(&a, view.decimals_in));
        settle(&self.state.id, amount_in)
    }

    fn spot_price_after_exact_in(&self, view: &PoolPairView, amount_in: &BigInt) -> Result<BigInt> {
        let in_is_0 = token_in_is_token0(view)?;
        let (after, r) = self.after_exact_in(view, in_is_0, amount_in)?;
        Ok(self.spot_price_at(&after, &r, in_is_0, &view.swap_fee)?)
    }

    fn spot_price_after_exact_out(
        &self,
        view: &PoolPairView,
        amount_out: &BigInt,
    ) -> Result<BigInt> {
        let in_is_0 = token_in_is_token0(view)?;
        let (after, r) = self.after_exact_out(view, in_is_0, amount_out)?;
        Ok(self.spot_price_at(&after, &r, in_is_0, &view.swap_fee)?)
    }

    fn derivative_after_exact_in(&self, view: &PoolPairView, amount_in: &BigInt) -> Result<f64> {
        let in_is_0 = token_in_is_token0(view)?;
        let (after, r) = self.after_exact_in(view, in_is_0, amount_in)?;
        let point = math::curve_point(&after, &self.params, &self.derived, &r)?;
        let (grad_in, grad_out) = if in_is_0 {
            (point.grad_x, point.grad_y)
        } else {
            (point.grad_y, point.grad_x)
        };
        Ok(point.curvature() / (grad_out.abs() * grad_in * grad_in))
    }

    fn derivative_after_exact_out(&self, view: &PoolPairView, amount_out: &BigInt) -> Result<f64> {
        let in_is_0 = token_in_is_token0(view)?;
        let (after, r) = self.after_exact_out(view, in_is_0, amount_out)?;
        let point = math::curve_point(&after, &self.params, &self.derived, &r)?;
        let grad_in = if in_is_0 { point.grad_x } else { point.grad_y };
        let f = 1.0 - human(&view.swap_fee);
        Ok(point.curvature() / (f * grad_in.abs().powi(3)))
    }

    fn normalized_liquidity(&self, view: &PoolPairView) -> f64 {
        liquidity_from_derivative(
            self.derivative_after_exact_in(view, &BigInt::zero())
                .unwrap_or(f64::NAN),
        )
    }

    fn limit_amount(&self, view: &PoolPairView, swap_type: SwapType) -> BigInt {
        match swap_type {
            SwapType::ExactIn => {
                let in_is_0 = matches!(view.extra, PairExtra::MultiElliptic { token_in_is_token0: true });
                self.max_amount_in(view, in_is_0).unwrap_or_else(|e| {
                    debug!(pool = %self.state.id, error = %e, "elliptic limit failed");
                    BigInt::zero()
                })
            }
            SwapType::ExactOut => mul_down_fixed(&view.balance_out, &BigInt::from(SWAP_LIMIT_FACTOR)),
        }
    }

    fn with_balance(&self, token: &Address, balance: &BigInt) -> Result<Self> {
        let mut next = self.clone();
        if self.state.is_share_token(token) {
            next.state.total_shares = balance.clone();
        } else {
            next.state = self.state.with_token_balance(token, balance)?;
        }
        Ok(next)
    }
}
