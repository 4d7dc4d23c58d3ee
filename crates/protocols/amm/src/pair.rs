//! Pool-pair views
//!
//! A `PoolPairView` is the per-(pool, token in, token out) snapshot every
//! pricing call consumes: balances scaled to fixed18, decimals for output
//! rounding, the pair classification and the family-specific extras.

use lyfe_core::{Address, PoolId, PoolType};
use num_bigint::BigInt;
use serde::Serialize;

/// Which sides of the trade are the pool's share token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum PairKind {
    TokenToToken,
    TokenToLbpt,
    LbptToToken,
    MainToLbpt,
    LbptToMain,
    WrappedToLbpt,
    LbptToWrapped,
    MainToWrapped,
    WrappedToMain,
}

impl PairKind {
    pub fn is_lbpt_out(&self) -> bool {
        matches!(self, Self::TokenToLbpt | Self::MainToLbpt | Self::WrappedToLbpt)
    }

    pub fn is_lbpt_in(&self) -> bool {
        matches!(self, Self::LbptToToken | Self::LbptToMain | Self::LbptToWrapped)
    }
}

/// Family-specific pair data
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PairExtra {
    Weighted {
        weight_in: BigInt,
        weight_out: BigInt,
    },
    Stable {
        /// Amplification ×1000
        amp: BigInt,
        balances: Vec<BigInt>,
        index_in: usize,
        index_out: usize,
    },
    Linear {
        rate: BigInt,
        lower_target: BigInt,
        upper_target: BigInt,
        main_balance: BigInt,
        wrapped_balance: BigInt,
        virtual_supply: BigInt,
    },
    PhantomStable {
        amp: BigInt,
        /// Rate-adjusted balances with the share token removed
        balances: Vec<BigInt>,
        /// Indices into `balances`; meaningless on the share-token side
        index_in: usize,
        index_out: usize,
        rate_in: BigInt,
        rate_out: BigInt,
        virtual_supply: BigInt,
    },
    MultiElliptic {
        token_in_is_token0: bool,
    },
}

/// Pricing inputs for one directed pair of one pool
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolPairView {
    pub pool_id: PoolId,
    pub pool_type: PoolType,
    pub token_in: Address,
    pub token_out: Address,
    pub decimals_in: u8,
    pub decimals_out: u8,
    /// Fixed18
    pub balance_in: BigInt,
    /// Fixed18
    pub balance_out: BigInt,
    /// Fixed18 fraction
    pub swap_fee: BigInt,
    pub kind: PairKind,
    pub extra: PairExtra,
}
