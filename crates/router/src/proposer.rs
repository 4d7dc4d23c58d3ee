//! Route proposal
//!
//! Candidate paths for a token pair: generic depth-first search over the
//! pool graph, plus two synthesized shapes the search cannot find under the
//! connecting-token and depth limits:
//!
//! * boosted paths through linear pools and the aggregator pool that joins
//!   their share tokens,
//! * connector paths through the meta pools of the stable share token and
//!   the connector pool pairing it with USDC.

use lyfe_amm::{Pool, PoolDictionary};
use lyfe_core::{Address, PoolId, RouterConfig, SwapType};
use tracing::debug;

use crate::graph::PoolGraph;
use crate::path::{Hop, Path};

/// Route proposer bound to one configuration
#[derive(Debug, Clone, Default)]
pub struct RouteProposer {
    config: RouterConfig,
}

impl RouteProposer {
    pub fn new(config: RouterConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    pub fn candidate_paths(
        &self,
        token_in: &Address,
        token_out: &Address,
        swap_type: SwapType,
        dict: &PoolDictionary,
    ) -> Vec<Path> {
        propose_paths(token_in, token_out, swap_type, dict, &self.config)
    }
}

/// Candidate paths for `token_in -> token_out`, synthesized shapes first,
/// then generic paths in discovery order. No route is an empty list.
pub fn propose_paths(
    token_in: &Address,
    token_out: &Address,
    swap_type: SwapType,
    dict: &PoolDictionary,
    config: &RouterConfig,
) -> Vec<Path> {
    if token_in == token_out {
        return Vec::new();
    }

    let graph = PoolGraph::build(dict, config.pool_filter);
    let generic = graph.find_paths(token_in, token_out, config.max_pools, |t| {
        config.is_connecting(t)
    });

    let mut augmented = boosted_paths(token_in, token_out, dict, config);
    augmented.extend(connector_paths(token_in, token_out, dict, config));

    let mut paths: Vec<Path> = Vec::with_capacity(augmented.len() + generic.len());
    for path in augmented {
        let known = generic.iter().chain(&paths).any(|p| p.same_pools(&path));
        if !known {
            paths.push(path);
        }
    }
    let synthesized = paths.len();
    paths.extend(generic);

    paths.retain(|path| {
        path.is_well_formed(config.max_pools)
            && path.hops.iter().all(|hop| {
                dict.get(&hop.pool_id)
                    .is_some_and(|pool| config.pool_filter.allows(pool.pool_type()))
            })
    });

    debug!(
        token_in = %token_in,
        token_out = %token_out,
        swap_type = %swap_type,
        pools = graph.pool_count,
        synthesized,
        paths = paths.len(),
        "route proposal finished"
    );
    paths
}

/// Most liquid pool trading `token_in -> token_out`. Ties go to the later
/// pool in snapshot order.
pub fn highest_liquidity_pool(
    dict: &PoolDictionary,
    token_in: &Address,
    token_out: &Address,
) -> Option<PoolId> {
    most_liquid(dict.iter(), token_in, token_out).map(|p| p.id().clone())
}

fn most_liquid<'a>(
    pools: impl Iterator<Item = &'a Pool>,
    token_in: &Address,
    token_out: &Address,
) -> Option<&'a Pool> {
    let mut best: Option<(&'a Pool, f64)> = None;
    for pool in pools {
        if !pool.contains(token_in) || !pool.contains(token_out) {
            continue;
        }
        let liquidity = pool.pair_liquidity(token_in, token_out);
        if best.map_or(true, |(_, top)| liquidity >= top) {
            best = Some((pool, liquidity));
        }
    }
    best.map(|(pool, _)| pool)
}

fn allowed_pools<'a>(
    dict: &'a PoolDictionary,
    config: &'a RouterConfig,
) -> impl Iterator<Item = &'a Pool> + 'a {
    dict.iter()
        .filter(move |p| config.pool_filter.allows(p.pool_type()))
}

// ---------------------------------------------------------------------------
// Boosted paths
// ---------------------------------------------------------------------------

/// Paths through linear pools and the configured aggregator pool.
///
/// Each endpoint reaches the aggregator share token through a linear pool
/// it is the main or wrapped token of, through any other pool holding both,
/// or through the wrapped native asset. Every entry is combined with every
/// exit; hops sharing the aggregator pool merge into one.
pub fn boosted_paths(
    token_in: &Address,
    token_out: &Address,
    dict: &PoolDictionary,
    config: &RouterConfig,
) -> Vec<Path> {
    let Some(boosted) = &config.boosted else {
        return Vec::new();
    };
    let Some(aggregator) = dict.get(&boosted.pool_id) else {
        debug!(pool = %boosted.pool_id, "aggregator pool not in snapshot");
        return Vec::new();
    };

    let shared_linear = dict
        .iter()
        .filter_map(Pool::as_linear)
        .any(|l| linear_endpoint(l, token_in) && linear_endpoint(l, token_out));
    if shared_linear {
        return Vec::new();
    }

    let entries = semi_paths(token_in, aggregator, &boosted.address, dict, config);
    let exits: Vec<Path> = semi_paths(token_out, aggregator, &boosted.address, dict, config)
        .iter()
        .map(reversed)
        .collect();

    let mut paths: Vec<Path> = Vec::new();
    for entry in &entries {
        for exit in &exits {
            let path = entry.join(exit);
            if path.is_empty() || path.has_repeated_token() || path.has_repeated_pool() {
                continue;
            }
            if !paths.contains(&path) {
                paths.push(path);
            }
        }
    }
    paths
}

fn linear_endpoint(pool: &lyfe_amm::LinearPool, token: &Address) -> bool {
    pool.main_token() == token || pool.wrapped_token() == token
}

/// Paths from `token` to the aggregator share token
fn semi_paths(
    token: &Address,
    aggregator: &Pool,
    aggregator_token: &Address,
    dict: &PoolDictionary,
    config: &RouterConfig,
) -> Vec<Path> {
    if token == aggregator_token {
        return vec![Path::default()];
    }

    let mut semis = Vec::new();
    for pool in allowed_pools(dict, config) {
        match pool.as_linear() {
            Some(linear) => {
                let lbpt = pool.address();
                if linear_endpoint(linear, token) && aggregator.contains(lbpt) {
                    semis.push(Path::new(vec![
                        Hop::new(pool.id().clone(), token.clone(), lbpt.clone()),
                        Hop::new(aggregator.id().clone(), lbpt.clone(), aggregator_token.clone()),
                    ]));
                }
            }
            None => {
                if pool.contains(token) && pool.contains(aggregator_token) {
                    semis.push(Path::new(vec![Hop::new(
                        pool.id().clone(),
                        token.clone(),
                        aggregator_token.clone(),
                    )]));
                }
            }
        }
    }

    if let Some(weth) = &config.weth {
        if token != weth {
            let to_weth = most_liquid(allowed_pools(dict, config), token, weth);
            let weth_to_aggregator =
                most_liquid(allowed_pools(dict, config), weth, aggregator_token);
            if let (Some(first), Some(second)) = (to_weth, weth_to_aggregator) {
                semis.push(Path::new(vec![
                    Hop::new(first.id().clone(), token.clone(), weth.clone()),
                    Hop::new(second.id().clone(), weth.clone(), aggregator_token.clone()),
                ]));
            }
        }
    }
    semis
}

/// The same pools walked backwards
fn reversed(path: &Path) -> Path {
    Path::new(
        path.hops
            .iter()
            .rev()
            .map(|h| Hop::new(h.pool_id.clone(), h.token_out.clone(), h.token_in.clone()))
            .collect(),
    )
}

// ---------------------------------------------------------------------------
// Connector paths
// ---------------------------------------------------------------------------

/// Path through the connector pool when exactly one endpoint trades against
/// the stable share token.
///
/// `[meta in, connector, most liquid usdc -> out]` or
/// `[most liquid in -> usdc, connector, meta out]`.
pub fn connector_paths(
    token_in: &Address,
    token_out: &Address,
    dict: &PoolDictionary,
    config: &RouterConfig,
) -> Vec<Path> {
    let Some(connector) = &config.connector else {
        return Vec::new();
    };
    let Some(connecting) = dict.get(&connector.usdc_pool_id) else {
        debug!(pool = %connector.usdc_pool_id, "connector pool not in snapshot");
        return Vec::new();
    };
    let sta_bal = &connector.sta_bal_address;
    let usdc = &connector.usdc;

    let meta_pool = |token: &Address| {
        most_liquid(
            allowed_pools(dict, config).filter(|p| p.id() != connecting.id()),
            token,
            sta_bal,
        )
    };

    let hops = match (meta_pool(token_in), meta_pool(token_out)) {
        (Some(meta_in), None) => {
            let Some(last) = most_liquid(allowed_pools(dict, config), usdc, token_out) else {
                return Vec::new();
            };
            vec![
                Hop::new(meta_in.id().clone(), token_in.clone(), sta_bal.clone()),
                Hop::new(connecting.id().clone(), sta_bal.clone(), usdc.clone()),
                Hop::new(last.id().clone(), usdc.clone(), token_out.clone()),
            ]
        }
        (None, Some(meta_out)) => {
            let Some(first) = most_liquid(allowed_pools(dict, config), token_in, usdc) else {
                return Vec::new();
            };
            vec![
                Hop::new(first.id().clone(), token_in.clone(), usdc.clone()),
                Hop::new(connecting.id().clone(), usdc.clone(), sta_bal.clone()),
                Hop::new(meta_out.id().clone(), sta_bal.clone(), token_out.clone()),
            ]
        }
        _ => return Vec::new(),
    };

    let path = Path::new(hops);
    if path.has_repeated_token() || path.has_repeated_pool() {
        return Vec::new();
    }
    vec![path]
}
