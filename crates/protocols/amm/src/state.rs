//! Pool snapshot types
//!
//! Wire shape of the pool state delivered by the data service, and the
//! parsed per-pool state shared by every pricing engine.

use lyfe_core::{Address, Error, PoolError, PoolId, PoolType, Result};
use lyfe_math::parse_fixed;
use num_bigint::BigInt;
use serde::{Deserialize, Serialize};

/// One token entry of a pool snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenSnapshot {
    pub address: Address,
    /// Human-scale decimal string
    pub balance: String,
    pub decimals: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_rate: Option<String>,
}

/// Raw pool state as delivered by the indexer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolSnapshot {
    pub id: PoolId,
    pub address: Address,
    pub pool_type: PoolType,
    pub swap_fee: String,
    pub total_shares: String,
    #[serde(default)]
    pub tokens_list: Vec<Address>,
    pub tokens: Vec<TokenSnapshot>,

    // Stable family
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amp: Option<String>,

    // Linear
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub main_index: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wrapped_index: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lower_target: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upper_target: Option<String>,

    // Multi-Elliptic
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alpha: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub beta: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub c: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub s: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lambda: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tau_alpha_x: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tau_alpha_y: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tau_beta_x: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tau_beta_y: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub u: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub v: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub w: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub z: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub d_sq: Option<String>,
}

impl PoolSnapshot {
    /// Fetch an optional decimal parameter, failing with `MissingParameter`
    pub(crate) fn require<'a>(
        &self,
        value: &'a Option<String>,
        param: &'static str,
    ) -> Result<&'a str> {
        value.as_deref().ok_or_else(|| {
            PoolError::MissingParameter {
                pool: self.id.to_string(),
                param,
            }
            .into()
        })
    }

    pub(crate) fn missing(&self, param: &'static str) -> Error {
        PoolError::MissingParameter {
            pool: self.id.to_string(),
            param,
        }
        .into()
    }
}

/// Parse a list of pool snapshots from JSON
pub fn parse_snapshots(json: &str) -> Result<Vec<PoolSnapshot>> {
    serde_json::from_str(json).map_err(|e| Error::Serialization(e.to_string()))
}

/// Parse a decimal string field into fixed-N, reporting the field on failure
pub(crate) fn parse_field(value: &str, decimals: u8, field: &'static str) -> Result<BigInt> {
    parse_fixed(value, decimals).map_err(|_| {
        PoolError::InvalidNumber {
            field,
            value: value.to_string(),
        }
        .into()
    })
}

/// Token state inside a parsed pool. Balances are fixed18.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolToken {
    pub address: Address,
    pub decimals: u8,
    pub balance: BigInt,
}

/// State common to every pool family
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolState {
    pub id: PoolId,
    pub address: Address,
    pub pool_type: PoolType,
    /// Fixed18 fraction
    pub swap_fee: BigInt,
    /// Fixed18 share supply
    pub total_shares: BigInt,
    pub tokens: Vec<PoolToken>,
}

impl PoolState {
    pub fn from_snapshot(snapshot: &PoolSnapshot) -> Result<Self> {
        if !snapshot.tokens_list.is_empty() && snapshot.tokens_list.len() != snapshot.tokens.len() {
            return Err(PoolError::LengthMismatch {
                expected: snapshot.tokens.len(),
                found: snapshot.tokens_list.len(),
            }
            .into());
        }
        let swap_fee = parse_field(&snapshot.swap_fee, 18, "swapFee")?;
        let total_shares = parse_field(&snapshot.total_shares, 18, "totalShares")?;
        let tokens = snapshot
            .tokens
            .iter()
            .map(|t| {
                Ok(PoolToken {
                    address: t.address.clone(),
                    decimals: t.decimals,
                    balance: parse_field(&t.balance, 18, "balance")?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            id: snapshot.id.clone(),
            address: snapshot.address.clone(),
            pool_type: snapshot.pool_type,
            swap_fee,
            total_shares,
            tokens,
        })
    }

    pub fn index_of(&self, token: &Address) -> Option<usize> {
        self.tokens.iter().position(|t| &t.address == token)
    }

    /// Index of `token`, or `TokenNotInPool`
    pub fn require_index(&self, token: &Address) -> Result<usize> {
        self.index_of(token).ok_or_else(|| {
            PoolError::TokenNotInPool {
                pool: self.id.to_string(),
                token: token.to_string(),
            }
            .into()
        })
    }

    pub fn is_share_token(&self, token: &Address) -> bool {
        &self.address == token
    }

    /// Copy with one token balance replaced
    pub fn with_token_balance(&self, token: &Address, balance: &BigInt) -> Result<Self> {
        let index = self.require_index(token)?;
        let mut next = self.clone();
        next.tokens[index].balance = balance.clone();
        Ok(next)
    }

    pub fn token_addresses(&self) -> Vec<Address> {
        self.tokens.iter().map(|t| t.address.clone()).collect()
    }
}
