//! Proportional join estimate

use anyhow::{bail, Context, Result};
use lyfe_amm::{PoolDictionary, PricingEngine};
use lyfe_core::constants::FIXED_DECIMALS;
use lyfe_core::{Address, PoolId};
use lyfe_math::{format_fixed, parse_fixed};
use num_bigint::BigInt;
use serde::Serialize;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinEstimate {
    pub pool_id: PoolId,
    /// Token order the amounts were matched against
    pub tokens: Vec<Address>,
    pub lbpt_amount: String,
}

/// Share tokens minted for `amounts` at current prices, ignoring price
/// impact and fees.
///
/// `amounts` are decimal strings in pool token order, share token excluded.
pub fn estimate_join(dict: &PoolDictionary, pool_id: &PoolId, amounts: &[String]) -> Result<JoinEstimate> {
    let pool = dict.require(pool_id)?;
    let state = pool.state();
    let tokens: Vec<Address> = state
        .token_addresses()
        .into_iter()
        .filter(|t| !state.is_share_token(t))
        .collect();
    if amounts.len() != tokens.len() {
        bail!("pool {} has {} tokens, got {} amounts", pool_id, tokens.len(), amounts.len());
    }

    let amounts = amounts
        .iter()
        .map(|a| parse_fixed(a.trim(), FIXED_DECIMALS).with_context(|| format!("invalid amount {:?}", a)))
        .collect::<Result<Vec<BigInt>>>()?;

    let Some(lbpt) = pool.lbpt_for_tokens_zero_price_impact(&amounts)? else {
        bail!("{} pools do not price joins", pool.pool_type());
    };
    tracing::debug!(pool = %pool_id, lbpt = %lbpt, "join estimated");

    Ok(JoinEstimate {
        pool_id: pool_id.clone(),
        tokens,
        lbpt_amount: format_fixed(&lbpt, FIXED_DECIMALS),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::POOLS_JSON;
    use crate::pools_from_json;

    fn amounts(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_weighted_join() {
        let dict = pools_from_json(POOLS_JSON).unwrap();
        let estimate = estimate_join(&dict, &PoolId::new("w12"), &amounts(&["10", "10"])).unwrap();
        // Each share is worth two of either token
        assert_eq!(estimate.lbpt_amount, "10");
        assert_eq!(estimate.tokens.len(), 2);
    }

    #[test]
    fn test_stable_join_balanced() {
        let dict = pools_from_json(POOLS_JSON).unwrap();
        let estimate = estimate_join(&dict, &PoolId::new("s23"), &amounts(&["10", "10"])).unwrap();
        let lbpt: f64 = estimate.lbpt_amount.parse().unwrap();
        assert!((lbpt - 20.0).abs() < 0.01);
    }

    #[test]
    fn test_join_rejects_bad_input() {
        let dict = pools_from_json(POOLS_JSON).unwrap();
        let err = estimate_join(&dict, &PoolId::new("w12"), &amounts(&["10"])).unwrap_err();
        assert!(err.to_string().contains("got 1 amounts"));
        assert!(estimate_join(&dict, &PoolId::new("w12"), &amounts(&["10", "x"])).is_err());
        assert!(estimate_join(&dict, &PoolId::new("nope"), &amounts(&["1", "1"])).is_err());
    }
}
