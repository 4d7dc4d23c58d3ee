//! Error types for Lyfe

use thiserror::Error;

/// Core errors that can occur in Lyfe
#[derive(Debug, Error)]
pub enum Error {
    #[error("Math error: {0}")]
    Math(#[from] MathError),

    #[error("Pool error: {0}")]
    Pool(#[from] PoolError),

    #[error("Routing error: {0}")]
    Routing(#[from] RoutingError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Fixed-point and invariant math failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MathError {
    #[error("Division by zero")]
    DivisionByZero,

    #[error("Subtraction underflow")]
    SubOverflow,

    #[error("Base out of bounds for ln/pow")]
    BaseOutOfBounds,

    #[error("Exponent out of bounds for pow")]
    ExponentOutOfBounds,

    #[error("Product of ln(x) and y out of bounds")]
    ProductOutOfBounds,

    #[error("Argument out of bounds for exp")]
    InvalidExponent,

    #[error("Invariant ratio above maximum")]
    MaxInRatio,

    #[error("Invariant ratio below minimum")]
    MinInvariantRatio,

    #[error("Stable invariant did not converge")]
    StableInvariantDidNotConverge,

    #[error("Stable balance did not converge")]
    StableGetBalanceDidNotConverge,

    #[error("Asset bounds exceeded")]
    AssetBoundsExceeded,

    #[error("Max assets exceeded")]
    MaxAssetsExceeded,

    #[error("Max invariant exceeded")]
    MaxInvariantExceeded,

    #[error("Square root did not meet tolerance")]
    SqrtFailed,

    #[error("Invalid decimal value: {value}")]
    InvalidDecimal { value: String },

    #[error("Float not representable as fixed point: {value}")]
    FloatOutOfRange { value: String },
}

impl MathError {
    /// Non-convergence of the stable solvers is fatal for a pricing call and
    /// must reach the caller; everything else means "no liquidity".
    pub fn is_convergence(&self) -> bool {
        matches!(
            self,
            Self::StableInvariantDidNotConverge | Self::StableGetBalanceDidNotConverge
        )
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            Self::DivisionByZero => "division_by_zero",
            Self::SubOverflow => "sub_overflow",
            Self::BaseOutOfBounds => "base_out_of_bounds",
            Self::ExponentOutOfBounds => "exponent_out_of_bounds",
            Self::ProductOutOfBounds => "product_out_of_bounds",
            Self::InvalidExponent => "invalid_exponent",
            Self::MaxInRatio => "max_in_ratio",
            Self::MinInvariantRatio => "min_invariant_ratio",
            Self::StableInvariantDidNotConverge => "stable_invariant_didnt_converge",
            Self::StableGetBalanceDidNotConverge => "stable_get_balance_didnt_converge",
            Self::AssetBoundsExceeded => "asset_bounds_exceeded",
            Self::MaxAssetsExceeded => "max_assets_exceeded",
            Self::MaxInvariantExceeded => "max_invariant_exceeded",
            Self::SqrtFailed => "sqrt_failed",
            Self::InvalidDecimal { .. } => "invalid_decimal",
            Self::FloatOutOfRange { .. } => "float_out_of_range",
        }
    }
}

/// Pool construction and pair resolution errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PoolError {
    #[error("Pool {pool} does not contain token {token}")]
    TokenNotInPool { pool: String, token: String },

    #[error("Pool {pool} is missing parameter: {param}")]
    MissingParameter { pool: String, param: &'static str },

    #[error("Invalid number for {field}: {value}")]
    InvalidNumber { field: &'static str, value: String },

    #[error("Length mismatch: expected {expected}, found {found}")]
    LengthMismatch { expected: usize, found: usize },

    #[error("Invalid address: {address}")]
    InvalidAddress { address: String },

    #[error("Unsupported pair {token_in} -> {token_out} in pool {pool}")]
    UnsupportedPair {
        pool: String,
        token_in: String,
        token_out: String,
    },

    #[error("Unknown pool: {0}")]
    UnknownPool(String),

    #[error("Duplicate pool id: {0}")]
    DuplicatePool(String),
}

impl PoolError {
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::TokenNotInPool { .. } => "token_not_in_pool",
            Self::MissingParameter { .. } => "missing_parameter",
            Self::InvalidNumber { .. } => "invalid_number",
            Self::LengthMismatch { .. } => "length_mismatch",
            Self::InvalidAddress { .. } => "invalid_address",
            Self::UnsupportedPair { .. } => "unsupported_pair",
            Self::UnknownPool(_) => "unknown_pool",
            Self::DuplicatePool(_) => "duplicate_pool",
        }
    }
}

/// Route search and swap plan errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RoutingError {
    #[error("Token in and token out are the same: {0}")]
    SameToken(String),

    #[error("Invalid amount: {message}")]
    InvalidAmount { message: String },

    #[error("Empty path")]
    EmptyPath,

    #[error("Path is not connected at hop {hop}")]
    Disconnected { hop: usize },

    #[error("max_splits {max_splits} exceeds the limit of {limit}")]
    SplitLimitExceeded { max_splits: usize, limit: usize },
}

impl RoutingError {
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::SameToken(_) => "same_token",
            Self::InvalidAmount { .. } => "invalid_amount",
            Self::EmptyPath => "empty_path",
            Self::Disconnected { .. } => "disconnected_path",
            Self::SplitLimitExceeded { .. } => "split_limit_exceeded",
        }
    }
}

impl Error {
    /// Stable string code for any error in the workspace
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Math(e) => e.error_code(),
            Self::Pool(e) => e.error_code(),
            Self::Routing(e) => e.error_code(),
            Self::Config(_) => "config",
            Self::Serialization(_) => "serialization",
        }
    }
}

/// Result type alias for Lyfe operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        let err = PoolError::TokenNotInPool {
            pool: "p1".into(),
            token: "0xabc".into(),
        };
        assert_eq!(err.error_code(), "token_not_in_pool");

        let err: Error = MathError::StableInvariantDidNotConverge.into();
        assert_eq!(err.error_code(), "stable_invariant_didnt_converge");

        let err: Error = RoutingError::EmptyPath.into();
        assert_eq!(err.error_code(), "empty_path");
    }

    #[test]
    fn test_convergence_classification() {
        assert!(MathError::StableInvariantDidNotConverge.is_convergence());
        assert!(MathError::StableGetBalanceDidNotConverge.is_convergence());
        assert!(!MathError::DivisionByZero.is_convergence());
        assert!(!MathError::AssetBoundsExceeded.is_convergence());
    }
}
