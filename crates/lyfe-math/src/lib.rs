//! Lyfe-math: Fixed-point arithmetic kernel
//!
//! Integer arithmetic reproducing the on-chain contracts to the wei:
//! fixed18 multiply/divide with explicit rounding, fixed-point powers via
//! log/exp, signed extra-precision helpers for the elliptic pools, and
//! decimal-string scaling at the boundaries.

pub mod fixed_point;
pub mod log_exp;
pub mod scale;
pub mod signed_fixed;
pub mod sqrt;

pub use fixed_point::*;
pub use scale::{
    format_fixed, parse_fixed, round_down_to_decimals, round_up_to_decimals, to_f64,
};

pub type MathResult<T> = Result<T, lyfe_core::MathError>;
