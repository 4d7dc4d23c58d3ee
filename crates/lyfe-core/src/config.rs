//! Configuration types for Lyfe

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_MAX_POOLS, DEFAULT_MAX_SPLITS, MAX_SPLITS_LIMIT};
use crate::{Address, PoolFilter, PoolId, Result, RoutingError};

/// Aggregator pool that joins several linear pools ("bb-a-usd")
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoostedConfig {
    /// Pool id of the aggregator
    pub pool_id: PoolId,

    /// Address of the aggregator's share token
    pub address: Address,
}

/// Connector pool bridging meta pools of the stable share token to USDC
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectorConfig {
    /// Share token of the stable base pool that meta pools pair against
    pub sta_bal_address: Address,

    /// Pool connecting the stable share token and USDC
    pub usdc_pool_id: PoolId,

    /// USDC address
    pub usdc: Address,
}

/// Route search configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouterConfig {
    /// Maximum pools (hops) per path
    #[serde(default = "default_max_pools")]
    pub max_pools: usize,

    /// Pool families a path may use
    #[serde(default)]
    pub pool_filter: PoolFilter,

    /// Tokens allowed as intermediate hops (empty allows any)
    #[serde(default)]
    pub connecting_tokens: Vec<Address>,

    /// Wrapped native asset, used to reach the aggregator through weighted pools
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weth: Option<Address>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub boosted: Option<BoostedConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connector: Option<ConnectorConfig>,

    /// Precomputed gas cost of one hop, in output-token units
    #[serde(default)]
    pub hop_cost: f64,

    /// Maximum number of paths an amount is split across
    #[serde(default = "default_max_splits")]
    pub max_splits: usize,
}

fn default_max_pools() -> usize {
    DEFAULT_MAX_POOLS
}

fn default_max_splits() -> usize {
    DEFAULT_MAX_SPLITS
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            max_pools: default_max_pools(),
            pool_filter: PoolFilter::All,
            connecting_tokens: Vec::new(),
            weth: None,
            boosted: None,
            connector: None,
            hop_cost: 0.0,
            max_splits: default_max_splits(),
        }
    }
}

impl RouterConfig {
    /// Whether `token` may appear as an intermediate hop
    pub fn is_connecting(&self, token: &Address) -> bool {
        self.connecting_tokens.is_empty() || self.connecting_tokens.contains(token)
    }

    /// Reject settings the router cannot honour in bounded time
    pub fn validate(&self) -> Result<()> {
        if self.max_splits > MAX_SPLITS_LIMIT {
            return Err(RoutingError::SplitLimitExceeded {
                max_splits: self.max_splits,
                limit: MAX_SPLITS_LIMIT,
            }
            .into());
        }
        Ok(())
    }
}
