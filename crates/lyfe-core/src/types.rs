//! Core type definitions for Lyfe

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::errors::PoolError;

/// Token or pool address (20 bytes, hex-encoded with `0x` prefix).
///
/// Stored lowercase so that checksummed and plain forms compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address(String);

impl Address {
    /// Build an address without validation, normalizing case.
    pub fn new(addr: impl Into<String>) -> Self {
        Self(addr.into().to_lowercase())
    }

    /// Parse and validate a `0x`-prefixed 20-byte hex address.
    pub fn parse(addr: &str) -> Result<Self, PoolError> {
        let body = addr
            .strip_prefix("0x")
            .or_else(|| addr.strip_prefix("0X"))
            .ok_or_else(|| PoolError::InvalidAddress {
                address: addr.to_string(),
            })?;
        match hex::decode(body) {
            Ok(bytes) if bytes.len() == 20 => Ok(Self::new(addr)),
            _ => Err(PoolError::InvalidAddress {
                address: addr.to_string(),
            }),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Address {
    type Error = PoolError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Address> for String {
    fn from(addr: Address) -> Self {
        addr.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Pool ID as reported by the indexer (hex-encoded)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PoolId(pub String);

impl PoolId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PoolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Pool family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PoolType {
    /// Constant weighted product
    Weighted,
    /// Amplified stable invariant
    Stable,
    /// Main/wrapped pair with a fee band, share token tradeable
    Linear,
    /// Stable invariant with the share token as a pool member
    PhantomStable,
    /// Two-token elliptic concentrated liquidity
    #[serde(rename = "MultiE")]
    MultiElliptic,
}

impl PoolType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Weighted => "Weighted",
            Self::Stable => "Stable",
            Self::Linear => "Linear",
            Self::PhantomStable => "PhantomStable",
            Self::MultiElliptic => "MultiE",
        }
    }
}

impl fmt::Display for PoolType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Swap direction: which side of the trade is fixed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SwapType {
    /// Amount in is given, amount out is computed
    ExactIn,
    /// Amount out is given, amount in is computed
    ExactOut,
}

impl fmt::Display for SwapType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ExactIn => write!(f, "exactIn"),
            Self::ExactOut => write!(f, "exactOut"),
        }
    }
}

/// Restricts which pool families a route may use
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PoolFilter {
    #[default]
    All,
    Weighted,
    Stable,
    Linear,
    PhantomStable,
    #[serde(rename = "MultiE")]
    MultiElliptic,
}

impl PoolFilter {
    /// Whether a pool of `pool_type` passes this filter
    pub fn allows(&self, pool_type: PoolType) -> bool {
        match self {
            Self::All => true,
            Self::Weighted => pool_type == PoolType::Weighted,
            Self::Stable => pool_type == PoolType::Stable,
            Self::Linear => pool_type == PoolType::Linear,
            Self::PhantomStable => pool_type == PoolType::PhantomStable,
            Self::MultiElliptic => pool_type == PoolType::MultiElliptic,
        }
    }
}

/// Constants
pub mod constants {
    /// Decimals of the fixed-point representation used by every pricing engine
    pub const FIXED_DECIMALS: u8 = 18;

    /// Maximum token decimals accepted in a snapshot
    pub const MAX_TOKEN_DECIMALS: u8 = 18;

    /// Default cap on hops per path
    pub const DEFAULT_MAX_POOLS: usize = 4;

    /// Default number of paths an amount may be split across
    pub const DEFAULT_MAX_SPLITS: usize = 3;

    /// Largest accepted `max_splits`; the split grid grows as C(19 + k, k - 1)
    pub const MAX_SPLITS_LIMIT: usize = 4;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_normalization() {
        let checksummed = Address::parse("0x6B175474E89094C44Da98b954EedeAC495271d0F").unwrap();
        let lower = Address::new("0x6b175474e89094c44da98b954eedeac495271d0f");
        assert_eq!(checksummed, lower);
        assert_eq!(checksummed.to_string(), lower.as_str());
    }

    #[test]
    fn test_address_validation() {
        assert!(Address::parse("0x1234").is_err());
        assert!(Address::parse("6b175474e89094c44da98b954eedeac495271d0f").is_err());
        assert!(Address::parse("0xzz175474e89094c44da98b954eedeac495271d0f").is_err());
    }

    #[test]
    fn test_address_serde() {
        let json = "\"0x6B175474E89094C44Da98b954EedeAC495271d0F\"";
        let addr: Address = serde_json::from_str(json).unwrap();
        assert_eq!(addr.as_str(), "0x6b175474e89094c44da98b954eedeac495271d0f");
        assert!(serde_json::from_str::<Address>("\"dai\"").is_err());
    }

    #[test]
    fn test_pool_filter() {
        assert!(PoolFilter::All.allows(PoolType::Linear));
        assert!(PoolFilter::Weighted.allows(PoolType::Weighted));
        assert!(!PoolFilter::Weighted.allows(PoolType::Stable));
        assert!(PoolFilter::MultiElliptic.allows(PoolType::MultiElliptic));
    }

    #[test]
    fn test_pool_type_serde() {
        let parsed: PoolType = serde_json::from_str("\"MultiE\"").unwrap();
        assert_eq!(parsed, PoolType::MultiElliptic);
        assert_eq!(PoolType::PhantomStable.as_str(), "PhantomStable");
        assert_eq!(
            serde_json::to_string(&SwapType::ExactOut).unwrap(),
            "\"exactOut\""
        );
    }
}
