//! Swap planning
//!
//! Quotes candidate paths hop by hop on private pool copies, ranks them by
//! what the trader gets net of hop costs, and splits the amount across the
//! best few by grid search.

use std::cmp::Ordering;
use std::collections::HashMap;

use lyfe_amm::{Pool, PoolDictionary, PricingEngine, SwapOutcome};
use lyfe_core::constants::{FIXED_DECIMALS, MAX_SPLITS_LIMIT};
use lyfe_core::{Address, PoolId, PoolType, Result, RouterConfig, RoutingError, SwapType};
use lyfe_math::scale::{from_native, to_native};
use lyfe_math::{
    div_up_fixed, format_fixed, mul_up_fixed, one, parse_fixed, round_down_to_decimals, to_f64,
};
use num_bigint::BigInt;
use num_traits::{Signed, Zero};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::path::{Hop, Path};
use crate::proposer::propose_paths;

/// Grid resolution of the split search
const SPLIT_STEPS: u32 = 20;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// A swap to plan
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapRequest {
    pub token_in: Address,
    pub token_out: Address,
    pub swap_type: SwapType,
    /// Human decimal amount of the fixed side: token in for exact-in,
    /// token out for exact-out
    pub amount: String,
}

impl SwapRequest {
    /// Token whose amount the request fixes
    pub fn fixed_token(&self) -> &Address {
        match self.swap_type {
            SwapType::ExactIn => &self.token_in,
            SwapType::ExactOut => &self.token_out,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.token_in == self.token_out {
            return Err(RoutingError::SameToken(self.token_in.to_string()).into());
        }
        Ok(())
    }

    /// Fixed18 amount, truncated to the fixed token's decimals
    pub fn parse_amount(&self, decimals: u8) -> Result<BigInt> {
        let native = parse_fixed(&self.amount, decimals).map_err(|e| RoutingError::InvalidAmount {
            message: e.to_string(),
        })?;
        if !native.is_positive() {
            return Err(RoutingError::InvalidAmount {
                message: format!("amount must be positive, got {}", self.amount),
            }
            .into());
        }
        Ok(from_native(&native, decimals))
    }
}

/// One evaluated hop. Amounts and prices are fixed18.
#[derive(Debug, Clone, PartialEq)]
pub struct HopQuote {
    pub hop: Hop,
    pub pool_type: PoolType,
    pub decimals_in: u8,
    pub decimals_out: u8,
    pub amount_in: BigInt,
    pub amount_out: BigInt,
    /// Token in per token out before the swap
    pub spot_price: BigInt,
    pub spot_price_after: BigInt,
}

/// An evaluated path. A path that cannot fill the trade quotes zero on
/// the computed side and has no hops.
#[derive(Debug, Clone, PartialEq)]
pub struct PathQuote {
    pub path: Path,
    pub swap_type: SwapType,
    pub hops: Vec<HopQuote>,
    pub amount_in: BigInt,
    pub amount_out: BigInt,
    /// Product of the hop spot prices before the swap
    pub spot_price: BigInt,
    /// Amount in per amount out
    pub effective_price: BigInt,
}

impl PathQuote {
    fn unfilled(path: &Path, swap_type: SwapType, amount: &BigInt) -> Self {
        let (amount_in, amount_out) = match swap_type {
            SwapType::ExactIn => (amount.clone(), BigInt::zero()),
            SwapType::ExactOut => (BigInt::zero(), amount.clone()),
        };
        Self {
            path: path.clone(),
            swap_type,
            hops: Vec::new(),
            amount_in,
            amount_out,
            spot_price: BigInt::zero(),
            effective_price: BigInt::zero(),
        }
    }

    fn from_hops(path: &Path, swap_type: SwapType, hops: Vec<HopQuote>) -> Self {
        let amount_in = hops.first().map(|h| h.amount_in.clone()).unwrap_or_default();
        let amount_out = hops.last().map(|h| h.amount_out.clone()).unwrap_or_default();
        let spot_price = hops
            .iter()
            .fold(one(), |acc, h| mul_up_fixed(&acc, &h.spot_price));
        let effective_price = div_up_fixed(&amount_in, &amount_out).unwrap_or_default();
        Self {
            path: path.clone(),
            swap_type,
            hops,
            amount_in,
            amount_out,
            spot_price,
            effective_price,
        }
    }

    /// Whether every hop priced the trade
    pub fn is_filled(&self) -> bool {
        !self.hops.is_empty() && self.amount_in.is_positive() && self.amount_out.is_positive()
    }

    /// The computed side: output for exact-in, input for exact-out
    pub fn result(&self) -> &BigInt {
        match self.swap_type {
            SwapType::ExactIn => &self.amount_out,
            SwapType::ExactOut => &self.amount_in,
        }
    }
}

/// Legs of a split swap
#[derive(Debug, Clone, PartialEq)]
pub struct SplitPlan {
    pub swap_type: SwapType,
    /// Quotes with their share of the amount
    pub legs: Vec<(f64, PathQuote)>,
    pub total_in: BigInt,
    pub total_out: BigInt,
}

impl SplitPlan {
    fn empty(swap_type: SwapType) -> Self {
        Self {
            swap_type,
            legs: Vec::new(),
            total_in: BigInt::zero(),
            total_out: BigInt::zero(),
        }
    }

    pub fn hop_count(&self) -> usize {
        self.legs.iter().map(|(_, q)| q.hops.len()).sum()
    }

    /// The computed side summed over legs
    pub fn result(&self) -> &BigInt {
        match self.swap_type {
            SwapType::ExactIn => &self.total_out,
            SwapType::ExactOut => &self.total_in,
        }
    }
}

/// Hop of a planned route, amounts in smallest token units
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HopAmounts {
    pub pool_id: PoolId,
    pub pool_type: PoolType,
    pub token_in: Address,
    pub token_out: Address,
    pub amount_in: String,
    pub amount_out: String,
    pub spot_price: String,
    pub spot_price_after: String,
}

/// One path of a planned swap
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteAllocation {
    pub fraction: f64,
    pub amount_in: String,
    pub amount_out: String,
    pub spot_price: String,
    pub hops: Vec<HopAmounts>,
}

impl RouteAllocation {
    pub fn from_quote(quote: &PathQuote, fraction: f64) -> Self {
        let hops: Vec<HopAmounts> = quote
            .hops
            .iter()
            .map(|h| HopAmounts {
                pool_id: h.hop.pool_id.clone(),
                pool_type: h.pool_type,
                token_in: h.hop.token_in.clone(),
                token_out: h.hop.token_out.clone(),
                amount_in: to_native(&h.amount_in, h.decimals_in).to_string(),
                amount_out: to_native(&h.amount_out, h.decimals_out).to_string(),
                spot_price: format_fixed(&h.spot_price, FIXED_DECIMALS),
                spot_price_after: format_fixed(&h.spot_price_after, FIXED_DECIMALS),
            })
            .collect();
        let amount_in = quote
            .hops
            .first()
            .map(|h| to_native(&quote.amount_in, h.decimals_in))
            .unwrap_or_default();
        let amount_out = quote
            .hops
            .last()
            .map(|h| to_native(&quote.amount_out, h.decimals_out))
            .unwrap_or_default();
        Self {
            fraction,
            amount_in: amount_in.to_string(),
            amount_out: amount_out.to_string(),
            spot_price: format_fixed(&quote.spot_price, FIXED_DECIMALS),
            hops,
        }
    }
}

/// Result of a route search
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapPlan {
    pub token_in: Address,
    pub token_out: Address,
    pub swap_type: SwapType,
    /// Fixed side in smallest units
    pub swap_amount: String,
    /// Computed side in smallest units, zero when nothing fills the trade
    pub return_amount: String,
    /// Spot price of the best single path before the swap
    pub market_spot_price: String,
    /// Total in per total out
    pub effective_price: String,
    pub candidate_paths: usize,
    pub routes: Vec<RouteAllocation>,
}

// ---------------------------------------------------------------------------
// Quoting
// ---------------------------------------------------------------------------

/// Pools as updated by simulated hops, falling back to the dictionary
struct PoolOverlay<'a> {
    dict: &'a PoolDictionary,
    touched: HashMap<PoolId, Pool>,
}

impl<'a> PoolOverlay<'a> {
    fn new(dict: &'a PoolDictionary) -> Self {
        Self {
            dict,
            touched: HashMap::new(),
        }
    }

    fn pool(&self, id: &PoolId) -> Result<&Pool> {
        match self.touched.get(id) {
            Some(pool) => Ok(pool),
            None => self.dict.require(id),
        }
    }

    fn commit(&mut self, pools: Vec<Pool>) {
        for pool in pools {
            self.touched.insert(pool.id().clone(), pool);
        }
    }
}

/// Decimals of `token` as listed by the first pool holding it. Share tokens
/// that no pool lists are fixed18.
pub fn token_decimals(dict: &PoolDictionary, token: &Address) -> u8 {
    dict.iter()
        .find_map(|pool| {
            let state = pool.state();
            state.index_of(token).map(|i| state.tokens[i].decimals)
        })
        .unwrap_or(FIXED_DECIMALS)
}

/// Quote `path` for a fixed18 `amount` without touching `dict`.
///
/// Malformed paths and unknown pools are errors; a hop that cannot fill the
/// trade makes the whole path quote zero.
pub fn quote_path(
    dict: &PoolDictionary,
    path: &Path,
    swap_type: SwapType,
    amount: &BigInt,
) -> Result<PathQuote> {
    path.validate()?;
    for hop in &path.hops {
        dict.require(&hop.pool_id)?;
    }
    let mut overlay = PoolOverlay::new(dict);
    Ok(quote_on(&mut overlay, path, swap_type, amount))
}

/// Quote on the overlay, committing the pool updates when the path fills
fn quote_on(
    overlay: &mut PoolOverlay<'_>,
    path: &Path,
    swap_type: SwapType,
    amount: &BigInt,
) -> PathQuote {
    match quote_hops(overlay, path, swap_type, amount) {
        Ok(Some((hops, updated))) => {
            overlay.commit(updated);
            PathQuote::from_hops(path, swap_type, hops)
        }
        Ok(None) => PathQuote::unfilled(path, swap_type, amount),
        Err(e) => {
            debug!(path = %path, error = %e, "path quote failed, treating as no liquidity");
            PathQuote::unfilled(path, swap_type, amount)
        }
    }
}

type HopResults = (Vec<HopQuote>, Vec<Pool>);

fn quote_hops(
    overlay: &PoolOverlay<'_>,
    path: &Path,
    swap_type: SwapType,
    amount: &BigInt,
) -> Result<Option<HopResults>> {
    let mut hops = Vec::with_capacity(path.len());
    let mut updated = Vec::with_capacity(path.len());
    let mut amount = amount.clone();

    let ordered: Vec<&Hop> = match swap_type {
        SwapType::ExactIn => path.hops.iter().collect(),
        SwapType::ExactOut => path.hops.iter().rev().collect(),
    };
    for hop in ordered {
        let pool = overlay.pool(&hop.pool_id)?;
        let Some((quote, next)) = quote_hop(pool, hop, swap_type, &amount)? else {
            return Ok(None);
        };
        amount = match swap_type {
            SwapType::ExactIn => quote.amount_out.clone(),
            SwapType::ExactOut => quote.amount_in.clone(),
        };
        hops.push(quote);
        updated.push(next);
    }

    if swap_type == SwapType::ExactOut {
        hops.reverse();
    }
    Ok(Some((hops, updated)))
}

fn quote_hop(
    pool: &Pool,
    hop: &Hop,
    swap_type: SwapType,
    amount: &BigInt,
) -> Result<Option<(HopQuote, Pool)>> {
    let view = pool.pair_view(&hop.token_in, &hop.token_out)?;
    let limit = pool.limit_amount(&view, swap_type);
    if amount > &limit {
        debug!(pool = %pool.id(), amount = %amount, limit = %limit, "amount above pool limit");
        return Ok(None);
    }

    let spot_price = pool.spot_price_after_swap(&view, swap_type, &BigInt::zero())?;
    let counter = match pool.swap(&view, swap_type, amount)? {
        SwapOutcome::Amount(a) if a.is_positive() => a,
        _ => return Ok(None),
    };
    let (amount_in, amount_out) = match swap_type {
        SwapType::ExactIn => (amount.clone(), counter),
        SwapType::ExactOut => (counter, amount.clone()),
    };
    let spot_price_after = pool.spot_price_after_swap(&view, swap_type, amount)?;
    let next = pool.apply_swap(&view, &amount_in, &amount_out)?;

    Ok(Some((
        HopQuote {
            hop: hop.clone(),
            pool_type: pool.pool_type(),
            decimals_in: view.decimals_in,
            decimals_out: view.decimals_out,
            amount_in,
            amount_out,
            spot_price,
            spot_price_after,
        },
        next,
    )))
}

// ---------------------------------------------------------------------------
// Ranking
// ---------------------------------------------------------------------------

/// Ranking cost: lower is better.
///
/// Exact-in pays for output net of hop costs. Exact-out pays for input,
/// with hop costs converted from output units at the effective price.
fn cost(
    swap_type: SwapType,
    total_in: &BigInt,
    total_out: &BigInt,
    hops: usize,
    hop_cost: f64,
) -> f64 {
    let amount_in = to_f64(total_in, FIXED_DECIMALS);
    let amount_out = to_f64(total_out, FIXED_DECIMALS);
    let gas = hops as f64 * hop_cost;
    match swap_type {
        SwapType::ExactIn => -(amount_out - gas),
        SwapType::ExactOut => {
            if amount_out > 0.0 {
                amount_in + gas * amount_in / amount_out
            } else {
                f64::INFINITY
            }
        }
    }
}

/// Quote every path and rank the filled ones, best first. Equal costs keep
/// discovery order.
pub fn find_best_paths(
    dict: &PoolDictionary,
    paths: &[Path],
    swap_type: SwapType,
    amount: &BigInt,
    config: &RouterConfig,
) -> Vec<PathQuote> {
    let mut quotes: Vec<(f64, PathQuote)> = paths
        .iter()
        .filter_map(|path| match quote_path(dict, path, swap_type, amount) {
            Ok(quote) if quote.is_filled() => Some(quote),
            Ok(_) => None,
            Err(e) => {
                debug!(path = %path, error = %e, "skipping path");
                None
            }
        })
        .map(|q| {
            let c = cost(swap_type, &q.amount_in, &q.amount_out, q.hops.len(), config.hop_cost);
            (c, q)
        })
        .collect();
    quotes.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(Ordering::Equal));
    quotes.into_iter().map(|(_, q)| q).collect()
}

// ---------------------------------------------------------------------------
// Splitting
// ---------------------------------------------------------------------------

/// Every way to share `steps` across `parts` slots, the first slot taking
/// the most first
fn compositions(steps: u32, parts: usize) -> Vec<Vec<u32>> {
    if parts == 1 {
        return vec![vec![steps]];
    }
    let mut out = Vec::new();
    for first in (0..=steps).rev() {
        for mut rest in compositions(steps - first, parts - 1) {
            rest.insert(0, first);
            out.push(rest);
        }
    }
    out
}

/// Quote one share vector; `None` when any used leg cannot fill
fn evaluate_split(
    dict: &PoolDictionary,
    paths: &[&Path],
    shares: &[u32],
    swap_type: SwapType,
    amount: &BigInt,
    decimals: u8,
) -> Option<SplitPlan> {
    let last = shares.iter().rposition(|&s| s > 0)?;
    let mut overlay = PoolOverlay::new(dict);
    let mut remaining = amount.clone();
    let mut plan = SplitPlan::empty(swap_type);

    for (i, (&share, path)) in shares.iter().zip(paths).enumerate() {
        if share == 0 {
            continue;
        }
        let leg_amount = if i == last {
            remaining.clone()
        } else {
            round_down_to_decimals(&(amount * share / SPLIT_STEPS), decimals)
        };
        remaining -= &leg_amount;
        if !leg_amount.is_positive() {
            return None;
        }

        let quote = quote_on(&mut overlay, path, swap_type, &leg_amount);
        if !quote.is_filled() {
            return None;
        }
        plan.total_in += &quote.amount_in;
        plan.total_out += &quote.amount_out;
        plan.legs.push((share as f64 / SPLIT_STEPS as f64, quote));
    }
    Some(plan)
}

/// Split `amount` across the first `max_splits` ranked quotes, at most
/// `MAX_SPLITS_LIMIT` of them.
///
/// Grid search in steps of 1/20; legs are quoted in turn on shared pool
/// copies, so paths through the same pool see each other's trades.
pub fn optimize_split(
    dict: &PoolDictionary,
    ranked: &[PathQuote],
    swap_type: SwapType,
    amount: &BigInt,
    config: &RouterConfig,
) -> SplitPlan {
    let paths: Vec<&Path> = ranked
        .iter()
        .take(config.max_splits.clamp(1, MAX_SPLITS_LIMIT))
        .map(|q| &q.path)
        .collect();
    if paths.is_empty() {
        return SplitPlan::empty(swap_type);
    }

    let fixed_token = match swap_type {
        SwapType::ExactIn => paths[0].token_in(),
        SwapType::ExactOut => paths[0].token_out(),
    };
    let decimals = fixed_token
        .map(|t| token_decimals(dict, t))
        .unwrap_or(FIXED_DECIMALS);

    let mut best: Option<(f64, SplitPlan)> = None;
    let mut evaluated = 0usize;
    for shares in compositions(SPLIT_STEPS, paths.len()) {
        let Some(plan) = evaluate_split(dict, &paths, &shares, swap_type, amount, decimals) else {
            continue;
        };
        evaluated += 1;
        let c = cost(
            swap_type,
            &plan.total_in,
            &plan.total_out,
            plan.hop_count(),
            config.hop_cost,
        );
        if best.as_ref().map_or(true, |(top, _)| c < *top) {
            best = Some((c, plan));
        }
    }

    debug!(paths = paths.len(), evaluated, "split search finished");
    best.map(|(_, plan)| plan)
        .unwrap_or_else(|| SplitPlan::empty(swap_type))
}

// ---------------------------------------------------------------------------
// Planning
// ---------------------------------------------------------------------------

/// Propose, quote, rank and split a swap
pub fn plan_swap(
    dict: &PoolDictionary,
    request: &SwapRequest,
    config: &RouterConfig,
) -> Result<SwapPlan> {
    config.validate()?;
    request.validate()?;
    let decimals_in = token_decimals(dict, &request.token_in);
    let decimals_out = token_decimals(dict, &request.token_out);
    let fixed_decimals = match request.swap_type {
        SwapType::ExactIn => decimals_in,
        SwapType::ExactOut => decimals_out,
    };
    let amount = request.parse_amount(fixed_decimals)?;

    let paths = propose_paths(
        &request.token_in,
        &request.token_out,
        request.swap_type,
        dict,
        config,
    );
    let ranked = find_best_paths(dict, &paths, request.swap_type, &amount, config);
    let split = optimize_split(dict, &ranked, request.swap_type, &amount, config);

    let (swap_amount, return_amount) = match request.swap_type {
        SwapType::ExactIn => (
            to_native(&amount, decimals_in),
            to_native(&split.total_out, decimals_out),
        ),
        SwapType::ExactOut => (
            to_native(&amount, decimals_out),
            to_native(&split.total_in, decimals_in),
        ),
    };
    let market_spot_price = ranked
        .first()
        .map(|q| q.spot_price.clone())
        .unwrap_or_default();
    let effective_price = div_up_fixed(&split.total_in, &split.total_out).unwrap_or_default();

    info!(
        token_in = %request.token_in,
        token_out = %request.token_out,
        swap_type = %request.swap_type,
        candidates = paths.len(),
        filled = ranked.len(),
        legs = split.legs.len(),
        return_amount = %return_amount,
        "swap planned"
    );

    Ok(SwapPlan {
        token_in: request.token_in.clone(),
        token_out: request.token_out.clone(),
        swap_type: request.swap_type,
        swap_amount: swap_amount.to_string(),
        return_amount: return_amount.to_string(),
        market_spot_price: format_fixed(&market_spot_price, FIXED_DECIMALS),
        effective_price: format_fixed(&effective_price, FIXED_DECIMALS),
        candidate_paths: paths.len(),
        routes: split
            .legs
            .iter()
            .map(|(fraction, quote)| RouteAllocation::from_quote(quote, *fraction))
            .collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{make_dictionary, make_weighted_json, token};
    use lyfe_core::{Error, PoolError};

    fn fx(v: &str) -> BigInt {
        parse_fixed(v, 18).unwrap()
    }

    fn make_path(hops: &[(&str, u8, u8)]) -> Path {
        Path::new(
            hops.iter()
                .map(|(id, a, b)| Hop::new(PoolId::new(*id), token(*a), token(*b)))
                .collect(),
        )
    }

    // Direct 1-3 pool of moderate depth, and a deep 1-2-3 route
    fn make_ranking_pools() -> PoolDictionary {
        make_dictionary(&[
            make_weighted_json("p13", 1, 3, "1000", "1000"),
            make_weighted_json("p12", 1, 2, "1000000", "1000000"),
            make_weighted_json("p23", 2, 3, "1000000", "1000000"),
        ])
    }

    #[test]
    fn test_quote_single_hop_exact_in() {
        let dict = make_ranking_pools();
        let quote = quote_path(&dict, &make_path(&[("p13", 1, 3)]), SwapType::ExactIn, &fx("10")).unwrap();
        assert!(quote.is_filled());
        assert_eq!(quote.amount_in, fx("10"));
        // 1000 * 9.97 / 1009.97
        assert!(quote.amount_out > fx("9.8715") && quote.amount_out < fx("9.8716"));
        // 1 / 0.997 before the swap
        assert!(quote.spot_price > fx("1.00300") && quote.spot_price < fx("1.00301"));
        assert!(quote.hops[0].spot_price_after > quote.hops[0].spot_price);
        assert!(quote.effective_price > quote.spot_price);
        assert_eq!(quote.result(), &quote.amount_out);
    }

    #[test]
    fn test_quote_exact_out_round_trip() {
        let dict = make_ranking_pools();
        let path = make_path(&[("p13", 1, 3)]);
        let forward = quote_path(&dict, &path, SwapType::ExactIn, &fx("10")).unwrap();
        let back = quote_path(&dict, &path, SwapType::ExactOut, &forward.amount_out).unwrap();
        assert!(back.is_filled());
        assert_eq!(back.amount_out, forward.amount_out);
        assert!(back.amount_in > fx("9.9999") && back.amount_in < fx("10.0001"));
        assert_eq!(back.result(), &back.amount_in);
    }

    #[test]
    fn test_quote_multi_hop_chains_amounts() {
        let dict = make_ranking_pools();
        let path = make_path(&[("p12", 1, 2), ("p23", 2, 3)]);
        let quote = quote_path(&dict, &path, SwapType::ExactIn, &fx("10")).unwrap();
        assert_eq!(quote.hops.len(), 2);
        assert_eq!(quote.hops[0].amount_out, quote.hops[1].amount_in);
        assert_eq!(quote.amount_out, quote.hops[1].amount_out);
        assert!(quote.amount_out > fx("9.93") && quote.amount_out < fx("9.95"));

        let reverse = quote_path(&dict, &path, SwapType::ExactOut, &fx("5")).unwrap();
        assert_eq!(reverse.hops[0].hop.pool_id, PoolId::new("p12"));
        assert_eq!(reverse.hops[0].amount_out, reverse.hops[1].amount_in);
        assert_eq!(reverse.amount_out, fx("5"));
    }

    #[test]
    fn test_quote_leaves_dictionary_untouched() {
        let dict = make_ranking_pools();
        let path = make_path(&[("p13", 1, 3)]);
        let first = quote_path(&dict, &path, SwapType::ExactIn, &fx("10")).unwrap();
        let second = quote_path(&dict, &path, SwapType::ExactIn, &fx("10")).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_oversized_hop_quotes_zero() {
        let dict = make_ranking_pools();
        let path = make_path(&[("p13", 1, 3)]);
        let quote = quote_path(&dict, &path, SwapType::ExactIn, &fx("5000")).unwrap();
        assert!(!quote.is_filled());
        assert!(quote.amount_out.is_zero());
        assert!(quote.hops.is_empty());
    }

    #[test]
    fn test_quote_input_errors() {
        let dict = make_ranking_pools();
        let unknown = make_path(&[("nope", 1, 3)]);
        assert!(matches!(
            quote_path(&dict, &unknown, SwapType::ExactIn, &fx("1")),
            Err(Error::Pool(PoolError::UnknownPool(_)))
        ));
        let broken = make_path(&[("p12", 1, 2), ("p13", 1, 3)]);
        assert!(matches!(
            quote_path(&dict, &broken, SwapType::ExactIn, &fx("1")),
            Err(Error::Routing(RoutingError::Disconnected { hop: 1 }))
        ));
    }

    #[test]
    fn test_find_best_paths_ranks_by_output() {
        let dict = make_ranking_pools();
        let paths = vec![
            make_path(&[("p13", 1, 3)]),
            make_path(&[("p12", 1, 2), ("p23", 2, 3)]),
        ];
        let config = RouterConfig::default();
        let ranked = find_best_paths(&dict, &paths, SwapType::ExactIn, &fx("10"), &config);
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].path.len(), 2);
        assert!(ranked[0].amount_out > ranked[1].amount_out);
    }

    #[test]
    fn test_hop_cost_favors_shorter_path() {
        let dict = make_ranking_pools();
        let paths = vec![
            make_path(&[("p12", 1, 2), ("p23", 2, 3)]),
            make_path(&[("p13", 1, 3)]),
        ];
        let config = RouterConfig {
            hop_cost: 0.1,
            ..RouterConfig::default()
        };
        let ranked = find_best_paths(&dict, &paths, SwapType::ExactIn, &fx("10"), &config);
        assert_eq!(ranked[0].path.len(), 1);
    }

    #[test]
    fn test_find_best_paths_exact_out_prefers_less_input() {
        let dict = make_ranking_pools();
        let paths = vec![
            make_path(&[("p13", 1, 3)]),
            make_path(&[("p12", 1, 2), ("p23", 2, 3)]),
        ];
        let ranked = find_best_paths(&dict, &paths, SwapType::ExactOut, &fx("10"), &RouterConfig::default());
        assert_eq!(ranked.len(), 2);
        assert!(ranked[0].amount_in < ranked[1].amount_in);
        assert_eq!(ranked[0].path.len(), 2);
    }

    #[test]
    fn test_find_best_paths_drops_unfilled() {
        let dict = make_ranking_pools();
        let paths = vec![make_path(&[("p13", 1, 3)]), make_path(&[("nope", 1, 3)])];
        let ranked = find_best_paths(&dict, &paths, SwapType::ExactIn, &fx("5000"), &RouterConfig::default());
        assert!(ranked.is_empty());
    }

    #[test]
    fn test_compositions() {
        assert_eq!(compositions(2, 1), vec![vec![2]]);
        assert_eq!(
            compositions(2, 2),
            vec![vec![2, 0], vec![1, 1], vec![0, 2]]
        );
        assert_eq!(compositions(SPLIT_STEPS, 3).len(), 231);
    }

    fn make_twin_pools() -> PoolDictionary {
        make_dictionary(&[
            make_weighted_json("a", 1, 2, "1000", "1000"),
            make_weighted_json("b", 1, 2, "1000", "1000"),
        ])
    }

    #[test]
    fn test_split_across_twin_pools() {
        let dict = make_twin_pools();
        let paths = vec![make_path(&[("a", 1, 2)]), make_path(&[("b", 1, 2)])];
        let config = RouterConfig::default();
        let ranked = find_best_paths(&dict, &paths, SwapType::ExactIn, &fx("100"), &config);
        let split = optimize_split(&dict, &ranked, SwapType::ExactIn, &fx("100"), &config);

        assert_eq!(split.legs.len(), 2);
        assert_eq!(split.legs[0].0, 0.5);
        assert_eq!(split.legs[1].0, 0.5);
        assert_eq!(split.total_in, fx("100"));
        // Single pool: 1000 * 99.7 / 1099.7 ~ 90.66; halves: 2 * 47.48
        assert!(split.total_out > ranked[0].amount_out);
        assert!(split.total_out > fx("94.9") && split.total_out < fx("95.0"));
    }

    #[test]
    fn test_split_limited_to_one_path() {
        let dict = make_twin_pools();
        let paths = vec![make_path(&[("a", 1, 2)]), make_path(&[("b", 1, 2)])];
        let config = RouterConfig {
            max_splits: 1,
            ..RouterConfig::default()
        };
        let ranked = find_best_paths(&dict, &paths, SwapType::ExactIn, &fx("100"), &config);
        let split = optimize_split(&dict, &ranked, SwapType::ExactIn, &fx("100"), &config);
        assert_eq!(split.legs.len(), 1);
        assert_eq!(split.legs[0].0, 1.0);
        assert_eq!(split.total_out, ranked[0].amount_out);
    }

    #[test]
    fn test_split_same_pool_sees_earlier_legs() {
        // Both paths end in pool "a"; sequential quoting must not double count it
        let dict = make_dictionary(&[
            make_weighted_json("a", 2, 3, "1000", "1000"),
            make_weighted_json("x", 1, 2, "1000000", "1000000"),
            make_weighted_json("y", 1, 2, "1000000", "1000000"),
        ]);
        let paths = vec![
            make_path(&[("x", 1, 2), ("a", 2, 3)]),
            make_path(&[("y", 1, 2), ("a", 2, 3)]),
        ];
        let config = RouterConfig::default();
        let ranked = find_best_paths(&dict, &paths, SwapType::ExactIn, &fx("100"), &config);
        let split = optimize_split(&dict, &ranked, SwapType::ExactIn, &fx("100"), &config);
        // Splitting cannot beat the single path by more than the x/y slippage saved
        let single = &ranked[0].amount_out;
        assert!(split.total_out <= single + fx("0.1"));
    }

    #[test]
    fn test_split_exact_out_reduces_input() {
        let dict = make_twin_pools();
        let paths = vec![make_path(&[("a", 1, 2)]), make_path(&[("b", 1, 2)])];
        let config = RouterConfig::default();
        let ranked = find_best_paths(&dict, &paths, SwapType::ExactOut, &fx("100"), &config);
        let split = optimize_split(&dict, &ranked, SwapType::ExactOut, &fx("100"), &config);
        assert_eq!(split.total_out, fx("100"));
        assert!(split.total_in < ranked[0].amount_in);
        assert_eq!(split.result(), &split.total_in);
    }

    #[test]
    fn test_split_never_exceeds_leg_limit() {
        let ids = ["a", "b", "c", "d", "e", "f"];
        let dict = make_dictionary(
            &ids.iter()
                .map(|id| make_weighted_json(id, 1, 2, "1000", "1000"))
                .collect::<Vec<_>>(),
        );
        let paths: Vec<Path> = ids.iter().map(|id| make_path(&[(*id, 1, 2)])).collect();
        let config = RouterConfig {
            max_splits: 10,
            ..RouterConfig::default()
        };
        let ranked = find_best_paths(&dict, &paths, SwapType::ExactIn, &fx("100"), &config);
        assert_eq!(ranked.len(), 6);
        let split = optimize_split(&dict, &ranked, SwapType::ExactIn, &fx("100"), &config);
        assert_eq!(split.legs.len(), MAX_SPLITS_LIMIT);
        assert!(split.legs.iter().all(|(fraction, _)| *fraction == 0.25));
    }

    #[test]
    fn test_plan_swap_rejects_oversized_split_config() {
        let dict = make_ranking_pools();
        let config = RouterConfig {
            max_splits: 5,
            ..RouterConfig::default()
        };
        assert!(matches!(
            plan_swap(&dict, &make_request(1, 3, SwapType::ExactIn, "10"), &config),
            Err(Error::Routing(RoutingError::SplitLimitExceeded { max_splits: 5, limit: 4 }))
        ));
    }

    #[test]
    fn test_split_with_nothing_to_split() {
        let dict = make_twin_pools();
        let split = optimize_split(&dict, &[], SwapType::ExactIn, &fx("1"), &RouterConfig::default());
        assert!(split.legs.is_empty());
        assert!(split.total_out.is_zero());
    }

    fn make_request(token_in: u8, token_out: u8, swap_type: SwapType, amount: &str) -> SwapRequest {
        SwapRequest {
            token_in: token(token_in),
            token_out: token(token_out),
            swap_type,
            amount: amount.to_string(),
        }
    }

    #[test]
    fn test_plan_swap_end_to_end() {
        let dict = make_ranking_pools();
        let request = make_request(1, 3, SwapType::ExactIn, "10");
        let plan = plan_swap(&dict, &request, &RouterConfig::default()).unwrap();

        assert_eq!(plan.swap_amount, "10000000000000000000");
        assert!(!plan.routes.is_empty());
        assert_eq!(plan.candidate_paths, 2);
        let total: f64 = plan.routes.iter().map(|r| r.fraction).sum();
        assert!((total - 1.0).abs() < 1e-9);
        let returned: BigInt = plan.return_amount.parse().unwrap();
        assert!(returned > fx("9.9"));

        let json = serde_json::to_value(&plan).unwrap();
        assert_eq!(json["swapType"], "exactIn");
        assert!(json["routes"][0]["hops"][0]["poolId"].is_string());
        assert!(json["returnAmount"].is_string());
    }

    #[test]
    fn test_plan_swap_without_route() {
        let dict = make_ranking_pools();
        let request = make_request(1, 9, SwapType::ExactOut, "1");
        let plan = plan_swap(&dict, &request, &RouterConfig::default()).unwrap();
        assert!(plan.routes.is_empty());
        assert_eq!(plan.return_amount, "0");
        assert_eq!(plan.candidate_paths, 0);
    }

    #[test]
    fn test_plan_swap_rejects_bad_requests() {
        let dict = make_ranking_pools();
        let config = RouterConfig::default();
        assert!(matches!(
            plan_swap(&dict, &make_request(1, 1, SwapType::ExactIn, "1"), &config),
            Err(Error::Routing(RoutingError::SameToken(_)))
        ));
        assert!(matches!(
            plan_swap(&dict, &make_request(1, 3, SwapType::ExactIn, "abc"), &config),
            Err(Error::Routing(RoutingError::InvalidAmount { .. }))
        ));
        assert!(matches!(
            plan_swap(&dict, &make_request(1, 3, SwapType::ExactIn, "0"), &config),
            Err(Error::Routing(RoutingError::InvalidAmount { .. }))
        ));
    }

    #[test]
    fn test_request_from_json() {
        let json = r#"{
            "tokenIn": "0x0000000000000000000000000000000000000001",
            "tokenOut": "0x0000000000000000000000000000000000000003",
            "swapType": "exactOut",
            "amount": "2.5"
        }"#;
        let request: SwapRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.fixed_token(), &token(3));
        assert_eq!(request.parse_amount(6).unwrap(), fx("2.5"));
        assert_eq!(
            SwapRequest { amount: "1.23456789".to_string(), ..request }
                .parse_amount(6)
                .unwrap(),
            fx("1.234567")
        );
    }
}
