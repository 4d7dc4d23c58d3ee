//! Elliptic concentrated-liquidity invariant
//!
//! Balances `(x, y)` shifted by virtual offsets lie on the ellipse
//! `|A t| = r`, where `A` rotates by the angle `(c, s)` and stretches by
//! `lambda`. Base parameters carry 18 decimals; derived parameters (`tau`,
//! `u`, `v`, `w`, `z`, `dSq`) carry 38. All rounding is chosen so that the
//! pool never pays out more than the curve allows.

use lyfe_core::MathError;
use lyfe_math::signed_fixed::{
    div_down_mag, div_up_mag, div_xp, mul_down_mag, mul_down_xp_to_np, mul_up_mag,
    mul_up_xp_to_np, mul_xp, one_xp,
};
use lyfe_math::sqrt::sqrt;
use lyfe_math::{one, pow10, to_f64, MathResult};
use num_bigint::BigInt;
use num_traits::{Signed, Zero};

/// Upper bound on the sum of both balances
pub fn max_balances() -> BigInt {
    pow10(34)
}

/// Upper bound on the invariant plus its error
pub fn max_invariant() -> BigInt {
    BigInt::from(3u8) * pow10(37)
}

const SQRT_TOLERANCE: u64 = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vector2 {
    pub x: BigInt,
    pub y: BigInt,
}

impl Vector2 {
    pub fn new(x: BigInt, y: BigInt) -> Self {
        Self { x, y }
    }
}

/// Curve shape, 18 decimals
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EllipticParams {
    pub alpha: BigInt,
    pub beta: BigInt,
    pub c: BigInt,
    pub s: BigInt,
    pub lambda: BigInt,
}

/// Precomputed curve constants, 38 decimals
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivedParams {
    pub tau_alpha: Vector2,
    pub tau_beta: Vector2,
    pub u: BigInt,
    pub v: BigInt,
    pub w: BigInt,
    pub z: BigInt,
    pub d_sq: BigInt,
}

fn pow_xp(d_sq: &BigInt, n: usize) -> BigInt {
    let mut acc = d_sq.clone();
    for _ in 1..n {
        acc = mul_xp(&acc, d_sq);
    }
    acc
}

/// x-offset of the ellipse centre for the given `tau` (normally `tau_beta`)
pub fn virtual_offset0(
    p: &EllipticParams,
    d: &DerivedParams,
    r: &Vector2,
    tau: &Vector2,
) -> MathResult<BigInt> {
    let term_xp = div_xp(&tau.x, &d.d_sq)?;
    let a = if tau.x.is_positive() {
        mul_up_xp_to_np(&mul_up_mag(&mul_up_mag(&r.x, &p.lambda), &p.c), &term_xp)
    } else {
        mul_up_xp_to_np(&mul_down_mag(&mul_down_mag(&r.y, &p.lambda), &p.c), &term_xp)
    };
    Ok(a + mul_up_xp_to_np(&mul_up_mag(&r.x, &p.s), &div_xp(&tau.y, &d.d_sq)?))
}

/// y-offset of the ellipse centre for the given `tau` (normally `tau_alpha`)
pub fn virtual_offset1(
    p: &EllipticParams,
    d: &DerivedParams,
    r: &Vector2,
    tau: &Vector2,
) -> MathResult<BigInt> {
    let term_xp = div_xp(&tau.x, &d.d_sq)?;
    let b = if tau.x.is_negative() {
        mul_up_xp_to_np(&mul_up_mag(&mul_up_mag(&r.x, &p.lambda), &p.s), &-term_xp)
    } else {
        mul_up_xp_to_np(&mul_down_mag(&mul_down_mag(&-&r.y, &p.lambda), &p.s), &term_xp)
    };
    Ok(b + mul_up_xp_to_np(&mul_up_mag(&r.x, &p.c), &div_xp(&tau.y, &d.d_sq)?))
}

/// Both offsets `(a, b)` of the curve for invariant `r`
pub fn virtual_offsets(
    p: &EllipticParams,
    d: &DerivedParams,
    r: &Vector2,
) -> MathResult<(BigInt, BigInt)> {
    Ok((
        virtual_offset0(p, d, r, &d.tau_beta)?,
        virtual_offset1(p, d, r, &d.tau_alpha)?,
    ))
}

fn calc_at_a_chi(x: &BigInt, y: &BigInt, p: &EllipticParams, d: &DerivedParams) -> MathResult<BigInt> {
    let d_sq2 = mul_xp(&d.d_sq, &d.d_sq);

    // (cx - sy) * (w/lambda + z) / lambda
    let term_xp = div_xp(
        &div_down_mag(&(div_down_mag(&d.w, &p.lambda)? + &d.z), &p.lambda)?,
        &d_sq2,
    )?;
    let mut val = mul_down_xp_to_np(&(mul_down_mag(x, &p.c) - mul_down_mag(y, &p.s)), &term_xp);

    // (x lambda s + y lambda c) * u
    let term_np = mul_down_mag(&mul_down_mag(x, &p.lambda), &p.s)
        + mul_down_mag(&mul_down_mag(y, &p.lambda), &p.c);
    val += mul_down_xp_to_np(&term_np, &div_xp(&d.u, &d_sq2)?);

    // (sx + cy) * v
    let term_np = mul_down_mag(x, &p.s) + mul_down_mag(y, &p.c);
    val += mul_down_xp_to_np(&term_np, &div_xp(&d.v, &d_sq2)?);
    Ok(val)
}

fn calc_a_chi_a_chi_in_xp(p: &EllipticParams, d: &DerivedParams) -> MathResult<BigInt> {
    let d_sq3 = pow_xp(&d.d_sq, 3);

    // (A chi)_y^2 = lambda^2 u^2 + lambda 2 u v + v^2
    let mut val = mul_up_mag(&p.lambda, &div_xp(&mul_xp(&(&d.u * 2), &d.v), &d_sq3)?);
    let u_up = &d.u + 1;
    val += mul_up_mag(
        &mul_up_mag(&div_xp(&mul_xp(&u_up, &u_up), &d_sq3)?, &p.lambda),
        &p.lambda,
    );
    val += div_xp(&mul_xp(&d.v, &d.v), &d_sq3)?;

    // (A chi)_x^2 = (w/lambda + z)^2
    let term_xp = div_up_mag(&d.w, &p.lambda)? + &d.z;
    val += div_xp(&mul_xp(&term_xp, &term_xp), &d_sq3)?;
    Ok(val)
}

fn calc_min_atx_a_chiy_sq_plus_atx_sq(
    x: &BigInt,
    y: &BigInt,
    p: &EllipticParams,
    d: &DerivedParams,
) -> MathResult<BigInt> {
    let mut term_np = mul_up_mag(&mul_up_mag(&mul_up_mag(x, x), &p.c), &p.c)
        + mul_up_mag(&mul_up_mag(&mul_up_mag(y, y), &p.s), &p.s);
    term_np -= mul_down_mag(&mul_down_mag(&mul_down_mag(x, y), &(&p.c * 2)), &p.s);

    let mut term_xp = mul_xp(&d.u, &d.u)
        + div_down_mag(&mul_xp(&(&d.u * 2), &d.v), &p.lambda)?
        + div_down_mag(&div_down_mag(&mul_xp(&d.v, &d.v), &p.lambda)?, &p.lambda)?;
    term_xp = div_xp(&term_xp, &pow_xp(&d.d_sq, 4))?;

    let mut val = mul_down_xp_to_np(&-&term_np, &term_xp);
    // (At)_x^2, rounded down
    val += mul_down_xp_to_np(
        &div_down_mag(&div_down_mag(&(term_np - 9), &p.lambda)?, &p.lambda)?,
        &div_xp(&one_xp(), &d.d_sq)?,
    );
    Ok(val)
}

fn calc_2_atx_aty_a_chix_a_chiy(
    x: &BigInt,
    y: &BigInt,
    p: &EllipticParams,
    d: &DerivedParams,
) -> MathResult<BigInt> {
    let mut term_np = mul_down_mag(
        &mul_down_mag(&(mul_down_mag(x, x) - mul_up_mag(y, y)), &(&p.c * 2)),
        &p.s,
    );
    let xy = mul_down_mag(y, &(x * 2));
    term_np += mul_down_mag(&mul_down_mag(&xy, &p.c), &p.c)
        - mul_down_mag(&mul_down_mag(&xy, &p.s), &p.s);

    let mut term_xp = mul_xp(&d.z, &d.u) + div_down_mag(&mul_xp(&d.w, &d.v), &p.lambda)?;
    term_xp += div_down_mag(&(mul_xp(&d.w, &d.u) + mul_xp(&d.z, &d.v)), &p.lambda)?;
    term_xp = div_xp(&term_xp, &pow_xp(&d.d_sq, 4))?;
    Ok(mul_down_xp_to_np(&term_np, &term_xp))
}

fn calc_min_aty_a_chix_sq_plus_aty_sq(
    x: &BigInt,
    y: &BigInt,
    p: &EllipticParams,
    d: &DerivedParams,
) -> MathResult<BigInt> {
    let mut term_np = mul_up_mag(&mul_up_mag(&mul_up_mag(x, x), &p.s), &p.s)
        + mul_up_mag(&mul_up_mag(&mul_up_mag(y, y), &p.c), &p.c);
    term_np += mul_up_mag(&mul_up_mag(&mul_up_mag(x, y), &(&p.s * 2)), &p.c);

    let mut term_xp = mul_xp(&d.z, &d.z)
        + div_down_mag(&div_down_mag(&mul_xp(&d.w, &d.w), &p.lambda)?, &p.lambda)?;
    term_xp += div_down_mag(&mul_xp(&(&d.z * 2), &d.w), &p.lambda)?;
    term_xp = div_xp(&term_xp, &pow_xp(&d.d_sq, 4))?;

    let mut val = mul_down_xp_to_np(&-&term_np, &term_xp);
    val += mul_down_xp_to_np(&(term_np - 9), &div_xp(&one_xp(), &d.d_sq)?);
    Ok(val)
}

// Square-root term of the invariant and the error carried into it
fn calc_invariant_sqrt(
    x: &BigInt,
    y: &BigInt,
    p: &EllipticParams,
    d: &DerivedParams,
) -> MathResult<(BigInt, BigInt)> {
    let val = calc_min_atx_a_chiy_sq_plus_atx_sq(x, y, p, d)?
        + calc_2_atx_aty_a_chix_a_chiy(x, y, p, d)?
        + calc_min_aty_a_chix_sq_plus_aty_sq(x, y, p, d)?;
    let err = (mul_up_mag(x, x) + mul_up_mag(y, y)) / one_xp();
    let val = if val.is_positive() {
        sqrt(&val, SQRT_TOLERANCE)?
    } else {
        BigInt::zero()
    };
    Ok((val, err))
}

/// Invariant of balances `(x, y)` and a bound on its absolute error.
///
/// Swaps use the vector `(invariant + 2 * err, invariant)` so each offset
/// can be over- or under-estimated as the rounding direction requires.
pub fn calculate_invariant_with_error(
    x: &BigInt,
    y: &BigInt,
    p: &EllipticParams,
    d: &DerivedParams,
) -> MathResult<(BigInt, BigInt)> {
    if x + y > max_balances() {
        return Err(MathError::MaxAssetsExceeded);
    }
    let at_a_chi = calc_at_a_chi(x, y, p, d)?;
    let (root, err) = calc_invariant_sqrt(x, y, p, d)?;

    let err = if root.is_positive() {
        div_up_mag(&(err + 1), &(&root * 2))?
    } else if err.is_positive() {
        sqrt(&err, SQRT_TOLERANCE)?
    } else {
        pow10(9)
    };
    let err = (mul_up_mag(&p.lambda, &(x + y)) / one_xp() + err + 1) * 20;

    let mul_denominator = div_xp(&one_xp(), &(calc_a_chi_a_chi_in_xp(p, d)? - one_xp()))?;
    let invariant = mul_down_xp_to_np(&(at_a_chi + root - &err), &mul_denominator);

    // relative error from the denominator grows with lambda^2
    let err = mul_up_xp_to_np(&err, &mul_denominator);
    let lambda_sq = (&p.lambda * &p.lambda) / pow10(36);
    let err = err + (mul_up_xp_to_np(&invariant, &mul_denominator) * lambda_sq * 40) / one_xp() + 1;

    if &invariant + &err > max_invariant() {
        return Err(MathError::MaxInvariantExceeded);
    }
    Ok((invariant, err))
}

// x'x' / lambda^2, where x' is x shifted by its offset
#[allow(clippy::too_many_arguments)]
fn calc_xp_xp_div_lambda_lambda(
    x: &BigInt,
    r: &Vector2,
    lambda: &BigInt,
    s: &BigInt,
    c: &BigInt,
    tau_beta: &Vector2,
    d_sq: &BigInt,
) -> MathResult<BigInt> {
    let d_sq2 = mul_xp(d_sq, d_sq);
    let rx_sq = mul_up_mag(&r.x, &r.x);

    // r^2 2sc tau_x tau_y
    let term_xp = div_xp(&mul_xp(&tau_beta.x, &tau_beta.y), &d_sq2)?;
    let mut qa = if term_xp.is_positive() {
        let a = mul_up_mag(&rx_sq, &(s * 2));
        mul_up_xp_to_np(&mul_up_mag(&a, c), &(term_xp + 7))
    } else {
        let a = mul_down_mag(&mul_down_mag(&r.y, &r.y), &(s * 2));
        mul_up_xp_to_np(&mul_down_mag(&a, c), &term_xp)
    };

    // -r x 2c tau_x
    let qb = if tau_beta.x.is_negative() {
        mul_up_xp_to_np(
            &mul_up_mag(&mul_up_mag(&r.x, x), &(c * 2)),
            &(-div_xp(&tau_beta.x, d_sq)? + 3),
        )
    } else {
        mul_up_xp_to_np(
            &mul_down_mag(&mul_down_mag(&-&r.y, x), &(c * 2)),
            &div_xp(&tau_beta.x, d_sq)?,
        )
    };
    qa += qb;

    // r^2 s^2 tau_y^2
    let term_xp = div_xp(&mul_xp(&tau_beta.y, &tau_beta.y), &d_sq2)? + 7;
    let mut qb = mul_up_xp_to_np(&mul_up_mag(&mul_up_mag(&rx_sq, s), s), &term_xp);

    // -r x 2s tau_y
    let qc = mul_up_xp_to_np(
        &mul_down_mag(&mul_down_mag(&-&r.y, x), &(s * 2)),
        &div_xp(&tau_beta.y, d_sq)?,
    );

    qb = qb + qc + mul_up_mag(x, x);
    qb = if qb.is_positive() {
        div_up_mag(&qb, lambda)?
    } else {
        div_down_mag(&qb, lambda)?
    };

    qa += qb;
    qa = if qa.is_positive() {
        div_up_mag(&qa, lambda)?
    } else {
        div_down_mag(&qa, lambda)?
    };

    // r^2 c^2 tau_x^2
    let term_xp = div_xp(&mul_xp(&tau_beta.x, &tau_beta.x), &d_sq2)? + 7;
    let val = mul_up_mag(&mul_up_mag(&rx_sq, c), c);
    Ok(mul_up_xp_to_np(&val, &term_xp) + qa)
}

// Solve the curve for the other coordinate given `x`; `ab` are the
// offsets ordered (given, solved)
#[allow(clippy::too_many_arguments)]
fn solve_quadratic_swap(
    lambda: &BigInt,
    x: &BigInt,
    s: &BigInt,
    c: &BigInt,
    r: &Vector2,
    ab: &Vector2,
    tau_beta: &Vector2,
    d_sq: &BigInt,
) -> MathResult<BigInt> {
    let one_xp = one_xp();
    let lam_bar_x = &one_xp - div_down_mag(&div_down_mag(&one_xp, lambda)?, lambda)?;
    let lam_bar_y = &one_xp - div_up_mag(&div_up_mag(&one_xp, lambda)?, lambda)?;

    let xp = x - &ab.x;
    let qb = if xp.is_positive() {
        mul_up_xp_to_np(
            &mul_down_mag(&mul_down_mag(&-&xp, s), c),
            &div_xp(&lam_bar_y, d_sq)?,
        )
    } else {
        mul_up_xp_to_np(
            &mul_up_mag(&mul_up_mag(&-&xp, s), c),
            &(div_xp(&lam_bar_x, d_sq)? + 1),
        )
    };

    let s_term_x = div_xp(&mul_down_mag(&mul_down_mag(&lam_bar_y, s), s), d_sq)?;
    let s_term_y = div_xp(&mul_up_mag(&mul_up_mag(&lam_bar_x, s), s), &(d_sq + 1))? + 1;
    let s_term_x = &one_xp - s_term_x;
    let s_term_y = &one_xp - s_term_y;

    let mut qc = -calc_xp_xp_div_lambda_lambda(x, r, lambda, s, c, tau_beta, d_sq)?;
    qc += mul_down_xp_to_np(&mul_down_mag(&r.y, &r.y), &s_term_y);
    // rounding may push the radicand below zero
    let qc = if qc.is_positive() {
        sqrt(&qc, SQRT_TOLERANCE)?
    } else {
        BigInt::zero()
    };

    let diff = qb - qc;
    let qa = if diff.is_positive() {
        mul_up_xp_to_np(&diff, &(div_xp(&one_xp, &s_term_y)? + 1))
    } else {
        mul_up_xp_to_np(&diff, &div_xp(&one_xp, &s_term_x)?)
    };
    Ok(qa + &ab.y)
}

/// Balance of token 1 on the curve given balance `x` of token 0
pub fn calc_y_given_x(
    x: &BigInt,
    p: &EllipticParams,
    d: &DerivedParams,
    r: &Vector2,
) -> MathResult<BigInt> {
    let (a, b) = virtual_offsets(p, d, r)?;
    solve_quadratic_swap(&p.lambda, x, &p.s, &p.c, r, &Vector2::new(a, b), &d.tau_beta, &d.d_sq)
}

/// Balance of token 0 on the curve given balance `y` of token 1
pub fn calc_x_given_y(
    y: &BigInt,
    p: &EllipticParams,
    d: &DerivedParams,
    r: &Vector2,
) -> MathResult<BigInt> {
    let (a, b) = virtual_offsets(p, d, r)?;
    let mirrored = Vector2::new(-&d.tau_alpha.x, d.tau_alpha.y.clone());
    solve_quadratic_swap(&p.lambda, y, &p.c, &p.s, r, &Vector2::new(b, a), &mirrored, &d.d_sq)
}

/// Largest balance of token 0 the curve admits
pub fn max_balances0(p: &EllipticParams, d: &DerivedParams, r: &Vector2) -> MathResult<BigInt> {
    let term_xp1 = div_xp(&(&d.tau_beta.x - &d.tau_alpha.x), &d.d_sq)?;
    let term_xp2 = div_xp(&(&d.tau_beta.y - &d.tau_alpha.y), &d.d_sq)?;
    let xp = mul_down_xp_to_np(&mul_down_mag(&mul_down_mag(&r.y, &p.lambda), &p.c), &term_xp1);
    let scale = if term_xp2.is_positive() {
        mul_down_mag(&r.y, &p.s)
    } else {
        mul_up_mag(&r.x, &p.s)
    };
    Ok(xp + mul_down_xp_to_np(&scale, &term_xp2))
}

/// Largest balance of token 1 the curve admits
pub fn max_balances1(p: &EllipticParams, d: &DerivedParams, r: &Vector2) -> MathResult<BigInt> {
    let term_xp1 = div_xp(&(&d.tau_beta.x - &d.tau_alpha.x), &d.d_sq)?;
    let term_xp2 = div_xp(&(&d.tau_alpha.y - &d.tau_beta.y), &d.d_sq)?;
    let yp = mul_down_xp_to_np(&mul_down_mag(&mul_down_mag(&r.y, &p.lambda), &p.s), &term_xp1);
    let scale = if term_xp2.is_positive() {
        mul_down_mag(&r.y, &p.c)
    } else {
        mul_up_mag(&r.x, &p.c)
    };
    Ok(yp + mul_down_xp_to_np(&scale, &term_xp2))
}

fn check_asset_bounds(
    p: &EllipticParams,
    d: &DerivedParams,
    r: &Vector2,
    new_balance: &BigInt,
    index: usize,
) -> MathResult<()> {
    let bound = if index == 0 {
        max_balances0(p, d, r)?
    } else {
        max_balances1(p, d, r)?
    };
    if *new_balance > max_balances() || *new_balance > bound {
        return Err(MathError::AssetBoundsExceeded);
    }
    Ok(())
}

fn indices(token_in_is_token0: bool) -> (usize, usize) {
    if token_in_is_token0 {
        (0, 1)
    } else {
        (1, 0)
    }
}

/// Amount out for `amount_in` (fee already removed)
pub fn calc_out_given_in(
    balances: &[BigInt; 2],
    amount_in: &BigInt,
    token_in_is_token0: bool,
    p: &EllipticParams,
    d: &DerivedParams,
    r: &Vector2,
) -> MathResult<BigInt> {
    let (ix_in, ix_out) = indices(token_in_is_token0);
    let bal_in_new = &balances[ix_in] + amount_in;
    check_asset_bounds(p, d, r, &bal_in_new, ix_in)?;
    let bal_out_new = if token_in_is_token0 {
        calc_y_given_x(&bal_in_new, p, d, r)?
    } else {
        calc_x_given_y(&bal_in_new, p, d, r)?
    };
    let amount_out = &balances[ix_out] - bal_out_new;
    if amount_out.is_negative() {
        return Err(MathError::AssetBoundsExceeded);
    }
    Ok(amount_out)
}

/// Amount in (before fee) needed to receive `amount_out`
pub fn calc_in_given_out(
    balances: &[BigInt; 2],
    amount_out: &BigInt,
    token_in_is_token0: bool,
    p: &EllipticParams,
    d: &DerivedParams,
    r: &Vector2,
) -> MathResult<BigInt> {
    let (ix_in, ix_out) = indices(token_in_is_token0);
    if *amount_out > balances[ix_out] {
        return Err(MathError::AssetBoundsExceeded);
    }
    let bal_out_new = &balances[ix_out] - amount_out;
    let bal_in_new = if token_in_is_token0 {
        calc_x_given_y(&bal_out_new, p, d, r)?
    } else {
        calc_y_given_x(&bal_out_new, p, d, r)?
    };
    check_asset_bounds(p, d, r, &bal_in_new, ix_in)?;
    let amount_in = bal_in_new - &balances[ix_in];
    if amount_in.is_negative() {
        return Err(MathError::AssetBoundsExceeded);
    }
    Ok(amount_in)
}

fn mul_a(p: &EllipticParams, t: &Vector2) -> MathResult<Vector2> {
    let x = div_down_mag(&mul_down_mag(&p.c, &t.x), &p.lambda)?
        - div_down_mag(&mul_down_mag(&p.s, &t.y), &p.lambda)?;
    let y = mul_down_mag(&p.s, &t.x) + mul_down_mag(&p.c, &t.y);
    Ok(Vector2::new(x, y))
}

fn scalar_prod(a: &Vector2, b: &Vector2) -> BigInt {
    mul_down_mag(&a.x, &b.x) + mul_down_mag(&a.y, &b.y)
}

/// Marginal price of token 0 in units of token 1, fixed18
pub fn calculate_price(
    balances: &[BigInt; 2],
    p: &EllipticParams,
    d: &DerivedParams,
    r: &Vector2,
) -> MathResult<BigInt> {
    let (a, b) = virtual_offsets(p, d, r)?;
    let t = Vector2::new(&balances[0] - a, &balances[1] - b);
    let at = mul_a(p, &t)?;
    let pc = Vector2::new(div_down_mag(&at.x, &at.y)?, one());
    let pgx = scalar_prod(&pc, &mul_a(p, &Vector2::new(one(), BigInt::zero()))?);
    div_down_mag(&pgx, &scalar_prod(&pc, &mul_a(p, &Vector2::new(BigInt::zero(), one()))?))
}

/// Curve geometry at a point, in floats
#[derive(Debug, Clone, Copy)]
pub struct CurvePoint {
    /// Gradient of `|A t|^2 / 2` along token 0
    pub grad_x: f64,
    /// Gradient of `|A t|^2 / 2` along token 1
    pub grad_y: f64,
    /// `|A t|^2`
    pub radius_sq: f64,
    pub lambda: f64,
}

impl CurvePoint {
    /// Second derivative of the solved coordinate w.r.t. the given one,
    /// scaled by the gradient of the solved side: `r^2 / lambda^2`
    pub fn curvature(&self) -> f64 {
        self.radius_sq / (self.lambda * self.lambda)
    }
}

/// Gradient and radius of the curve at `balances`
pub fn curve_point(
    balances: &[BigInt; 2],
    p: &EllipticParams,
    d: &DerivedParams,
    r: &Vector2,
) -> MathResult<CurvePoint> {
    let (a, b) = virtual_offsets(p, d, r)?;
    let tx = to_f64(&(&balances[0] - a), 18);
    let ty = to_f64(&(&balances[1] - b), 18);
    let c = to_f64(&p.c, 18);
    let s = to_f64(&p.s, 18);
    let lambda = to_f64(&p.lambda, 18);

    let at_x = (c * tx - s * ty) / lambda;
    let at_y = s * tx + c * ty;
    Ok(CurvePoint {
        grad_x: c / lambda * at_x + s * at_y,
        grad_y: -s / lambda * at_x + c * at_y,
        radius_sq: at_x * at_x + at_y * at_y,
        lambda,
    })
}

#[cfg(test)]
pub(crate) mod fixtures {
    //! A curve concentrated on prices [0.05, 0.397] with lambda ~ 7.5e5

    use super::*;
    use lyfe_math::parse_fixed;

    fn fixed(value: &str, decimals: u8) -> BigInt {
        parse_fixed(value, decimals).unwrap()
    }

    pub const ALPHA: &str = "0.05";
    pub const BETA: &str = "0.397316269897841178";
    pub const C: &str = "0.9551573261744535";
    pub const S: &str = "0.29609877111408056";
    pub const LAMBDA: &str = "748956.475";
    pub const TAU_ALPHA_X: &str = "-0.99999999998640215756916355288859258617";
    pub const TAU_ALPHA_Y: &str = "0.00000521494821273308455316100065698456";
    pub const TAU_BETA_X: &str = "0.99999999985251224250815767562683395034";
    pub const TAU_BETA_Y: &str = "0.00001717485123551095012908560245809441";
    pub const U: &str = "0.56564182095617501517075527401619276230";
    pub const V: &str = "0.00000626352651807835674708225863501675";
    pub const W: &str = "0.00000338251066240410377681247502080538";
    pub const Z: &str = "0.82465103535609802401827600986813987563";
    pub const D_SQ: &str = "1.00000000000000002140811391783216360000";

    pub fn make_params() -> (EllipticParams, DerivedParams) {
        let params = EllipticParams {
            alpha: fixed(ALPHA, 18),
            beta: fixed(BETA, 18),
            c: fixed(C, 18),
            s: fixed(S, 18),
            lambda: fixed(LAMBDA, 18),
        };
        let derived = DerivedParams {
            tau_alpha: Vector2::new(fixed(TAU_ALPHA_X, 38), fixed(TAU_ALPHA_Y, 38)),
            tau_beta: Vector2::new(fixed(TAU_BETA_X, 38), fixed(TAU_BETA_Y, 38)),
            u: fixed(U, 38),
            v: fixed(V, 38),
            w: fixed(W, 38),
            z: fixed(Z, 38),
            d_sq: fixed(D_SQ, 38),
        };
        (params, derived)
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::make_params;
    use super::*;
    use lyfe_math::parse_fixed;

    fn fx(v: &str) -> BigInt {
        parse_fixed(v, 18).unwrap()
    }

    fn assert_close(actual: &BigInt, expected: &str, tolerance: u64) {
        let expected: BigInt = expected.parse().unwrap();
        assert!(
            (actual - &expected).abs() <= BigInt::from(tolerance),
            "{} vs {}",
            actual,
            expected
        );
    }

    fn make_curve() -> (EllipticParams, DerivedParams, [BigInt; 2], Vector2) {
        let (p, d) = make_params();
        let balances = [fx("100"), fx("100")];
        let (invariant, err) = calculate_invariant_with_error(&balances[0], &balances[1], &p, &d).unwrap();
        let r = Vector2::new(&invariant + &err * 2, invariant);
        (p, d, balances, r)
    }

    #[test]
    fn test_invariant_of_balanced_pool() {
        let (p, d) = make_params();
        let (invariant, err) = calculate_invariant_with_error(&fx("100"), &fx("100"), &p, &d).unwrap();
        assert_close(&invariant, "295358168772127", 100);
        assert!(err.is_positive() && err < BigInt::from(100));
    }

    #[test]
    fn test_invariant_rejects_oversized_balances() {
        let (p, d) = make_params();
        let huge = pow10(34);
        assert_eq!(
            calculate_invariant_with_error(&huge, &BigInt::from(1), &p, &d),
            Err(MathError::MaxAssetsExceeded)
        );
    }

    #[test]
    fn test_price_inside_band() {
        let (p, d, balances, r) = make_curve();
        let price = calculate_price(&balances, &p, &d, &r).unwrap();
        assert_close(&price, "310000906844110252", 1_000);
        assert!(price > p.alpha && price < p.beta);
    }

    #[test]
    fn test_swaps_both_directions() {
        let (p, d, balances, r) = make_curve();
        let y_out = calc_out_given_in(&balances, &fx("10"), true, &p, &d, &r).unwrap();
        assert_close(&y_out, "3100008522843919292", 1_000_000);
        let x_out = calc_out_given_in(&balances, &fx("10"), false, &p, &d, &r).unwrap();
        assert_close(&x_out, "32257948545126329217", 1_000_000);
    }

    #[test]
    fn test_round_trip_favours_pool() {
        let (p, d, balances, r) = make_curve();
        let out = calc_out_given_in(&balances, &fx("10"), true, &p, &d, &r).unwrap();
        let back = calc_in_given_out(&balances, &out, true, &p, &d, &r).unwrap();
        assert!(back >= fx("10"));
        assert!(back - fx("10") < BigInt::from(1_000_000));
    }

    #[test]
    fn test_asset_bounds() {
        let (p, d, balances, r) = make_curve();
        // 50 token 1 buys more token 0 than the curve holds
        assert_eq!(
            calc_out_given_in(&balances, &fx("50"), false, &p, &d, &r),
            Err(MathError::AssetBoundsExceeded)
        );
        assert_eq!(
            calc_in_given_out(&balances, &fx("101"), true, &p, &d, &r),
            Err(MathError::AssetBoundsExceeded)
        );
        let max0 = max_balances0(&p, &d, &r).unwrap();
        assert!(max0 > fx("422") && max0 < fx("423"));
    }

    #[test]
    fn test_offsets_span_the_band() {
        let (p, d, _, r) = make_curve();
        let (a, b) = virtual_offsets(&p, &d, &r).unwrap();
        let a_switched = virtual_offset0(&p, &d, &r, &d.tau_alpha).unwrap();
        let b_switched = virtual_offset1(&p, &d, &r, &d.tau_beta).unwrap();
        // token 0 can grow to ~422.58, token 1 to ~131
        assert!((&a - &a_switched - fx("422.58")).abs() < fx("0.01"));
        assert!((&b - &b_switched - fx("131.00")).abs() < fx("0.01"));
    }

    #[test]
    fn test_curve_point_gradient_ratio_is_price() {
        let (p, d, balances, r) = make_curve();
        let point = curve_point(&balances, &p, &d, &r).unwrap();
        assert!((point.grad_x / point.grad_y - 0.31).abs() < 1e-4);
        assert!(point.curvature() > 0.0);
    }
}
