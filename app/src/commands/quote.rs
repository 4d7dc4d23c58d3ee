//! Single pool-pair quote

use anyhow::{Context, Result};
use lyfe_amm::{PoolDictionary, PricingEngine};
use lyfe_core::constants::FIXED_DECIMALS;
use lyfe_core::{Address, PoolId, PoolType, SwapType};
use lyfe_math::format_fixed;
use lyfe_math::scale::to_native;
use lyfe_router::{quote_path, Hop, Path, SwapRequest};
use num_bigint::BigInt;
use serde::Serialize;

/// Amounts in smallest units, prices as decimals (token in per token out)
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PairQuote {
    pub pool_id: PoolId,
    pub pool_type: PoolType,
    pub swap_type: SwapType,
    pub amount: String,
    /// Zero when the pool cannot fill the trade
    pub result: String,
    pub spot_price: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spot_price_after: Option<String>,
    pub limit: String,
    pub normalized_liquidity: f64,
}

pub fn quote_pair(
    dict: &PoolDictionary,
    pool_id: &PoolId,
    token_in: &str,
    token_out: &str,
    swap_type: SwapType,
    amount: &str,
) -> Result<PairQuote> {
    let token_in = Address::parse(token_in).context("invalid token in")?;
    let token_out = Address::parse(token_out).context("invalid token out")?;
    let pool = dict.require(pool_id)?;
    let view = pool
        .pair_view(&token_in, &token_out)
        .with_context(|| format!("pool {} cannot price this pair", pool_id))?;

    let (fixed_decimals, result_decimals) = match swap_type {
        SwapType::ExactIn => (view.decimals_in, view.decimals_out),
        SwapType::ExactOut => (view.decimals_out, view.decimals_in),
    };
    let request = SwapRequest {
        token_in: token_in.clone(),
        token_out: token_out.clone(),
        swap_type,
        amount: amount.to_string(),
    };
    request.validate()?;
    let amount = request.parse_amount(fixed_decimals)?;

    let path = Path::new(vec![Hop::new(pool_id.clone(), token_in, token_out)]);
    let quote = quote_path(dict, &path, swap_type, &amount)?;
    let spot_price = pool.spot_price_after_swap(&view, swap_type, &BigInt::from(0u8))?;
    let result = if quote.is_filled() {
        quote.result().clone()
    } else {
        BigInt::from(0u8)
    };

    Ok(PairQuote {
        pool_id: pool_id.clone(),
        pool_type: pool.pool_type(),
        swap_type,
        amount: to_native(&amount, fixed_decimals).to_string(),
        result: to_native(&result, result_decimals).to_string(),
        spot_price: format_fixed(&spot_price, FIXED_DECIMALS),
        spot_price_after: quote
            .hops
            .first()
            .map(|h| format_fixed(&h.spot_price_after, FIXED_DECIMALS)),
        limit: to_native(&pool.limit_amount(&view, swap_type), fixed_decimals).to_string(),
        normalized_liquidity: pool.normalized_liquidity(&view),
    })
}
