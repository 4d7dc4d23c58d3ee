//! Token graph over the pool dictionary and generic path search

use std::collections::{HashMap, HashSet};

use lyfe_amm::{Pool, PoolDictionary};
use lyfe_core::{Address, PoolFilter, PoolId};

use crate::path::{Hop, Path};

/// Adjacency from each token to the pools that trade it, in snapshot order
#[derive(Debug, Clone)]
pub struct PoolGraph<'a> {
    adjacency: HashMap<Address, Vec<&'a Pool>>,
    pub pool_count: usize,
}

impl<'a> PoolGraph<'a> {
    /// Build the graph from every pool passing `filter`
    pub fn build(dict: &'a PoolDictionary, filter: PoolFilter) -> Self {
        let mut adjacency: HashMap<Address, Vec<&'a Pool>> = HashMap::new();
        let mut pool_count = 0;

        for pool in dict.iter() {
            if !filter.allows(pool.pool_type()) {
                continue;
            }
            for token in pool.tradeable_tokens() {
                adjacency.entry(token).or_default().push(pool);
            }
            pool_count += 1;
        }

        Self {
            adjacency,
            pool_count,
        }
    }

    pub fn pools_for(&self, token: &Address) -> &[&'a Pool] {
        self.adjacency.get(token).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn token_count(&self) -> usize {
        self.adjacency.len()
    }

    /// All simple paths from `token_in` to `token_out` with at most
    /// `max_pools` hops, depth first.
    ///
    /// No token or pool repeats within a path. Intermediate tokens must pass
    /// `is_connecting`.
    pub fn find_paths<F>(
        &self,
        token_in: &Address,
        token_out: &Address,
        max_pools: usize,
        is_connecting: F,
    ) -> Vec<Path>
    where
        F: Fn(&Address) -> bool,
    {
        let mut results = Vec::new();
        if token_in == token_out || max_pools == 0 {
            return results;
        }

        let mut search = Search {
            graph: self,
            token_out,
            max_pools,
            is_connecting: &is_connecting,
            hops: Vec::new(),
            visited: HashSet::from([token_in.clone()]),
            used_pools: HashSet::new(),
            results: &mut results,
        };
        search.visit(token_in);
        results
    }
}

struct Search<'g, 'a, F> {
    graph: &'g PoolGraph<'a>,
    token_out: &'g Address,
    max_pools: usize,
    is_connecting: &'g F,
    hops: Vec<Hop>,
    visited: HashSet<Address>,
    used_pools: HashSet<PoolId>,
    results: &'g mut Vec<Path>,
}

impl<F> Search<'_, '_, F>
where
    F: Fn(&Address) -> bool,
{
    fn visit(&mut self, current: &Address) {
        let graph = self.graph;
        for pool in graph.pools_for(current) {
            if self.used_pools.contains(pool.id()) {
                continue;
            }
            for next in pool.tradeable_tokens() {
                if &next == current {
                    continue;
                }
                let hop = Hop::new(pool.id().clone(), current.clone(), next.clone());

                if &next == self.token_out {
                    let mut hops = self.hops.clone();
                    hops.push(hop);
                    self.results.push(Path::new(hops));
                    continue;
                }
                if self.hops.len() + 1 >= self.max_pools
                    || self.visited.contains(&next)
                    || !(self.is_connecting)(&next)
                {
                    continue;
                }

                self.hops.push(hop);
                self.visited.insert(next.clone());
                self.used_pools.insert(pool.id().clone());
                self.visit(&next);
                self.used_pools.remove(pool.id());
                self.visited.remove(&next);
                self.hops.pop();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{make_dictionary, make_weighted_json, token};

    fn make_chain() -> PoolDictionary {
        // 1-2, 2-3, 3-4, and a direct 1-4
        make_dictionary(&[
            make_weighted_json("p12", 1, 2, "1000", "1000"),
            make_weighted_json("p23", 2, 3, "1000", "1000"),
            make_weighted_json("p34", 3, 4, "1000", "1000"),
            make_weighted_json("p14", 1, 4, "1000", "1000"),
        ])
    }

    #[test]
    fn test_build_adjacency() {
        let dict = make_chain();
        let graph = PoolGraph::build(&dict, PoolFilter::All);
        assert_eq!(graph.pool_count, 4);
        let ids: Vec<_> = graph.pools_for(&token(1)).iter().map(|p| p.id().as_str()).collect();
        assert_eq!(ids, vec!["p12", "p14"]);
        assert!(graph.pools_for(&token(9)).is_empty());
    }

    #[test]
    fn test_filter_excludes_pools() {
        let dict = make_chain();
        let graph = PoolGraph::build(&dict, PoolFilter::Stable);
        assert_eq!(graph.pool_count, 0);
        assert_eq!(graph.token_count(), 0);
    }

    #[test]
    fn test_find_paths_depth_first() {
        let dict = make_chain();
        let graph = PoolGraph::build(&dict, PoolFilter::All);
        let paths = graph.find_paths(&token(1), &token(4), 3, |_| true);
        let shapes: Vec<String> = paths.iter().map(|p| p.to_string()).collect();
        assert_eq!(shapes, vec!["[p12 > p23 > p34]", "[p14]"]);
        for path in &paths {
            assert!(path.is_well_formed(3));
            assert_eq!(path.token_in(), Some(&token(1)));
            assert_eq!(path.token_out(), Some(&token(4)));
        }
    }

    #[test]
    fn test_find_paths_respects_max_pools() {
        let dict = make_chain();
        let graph = PoolGraph::build(&dict, PoolFilter::All);
        let paths = graph.find_paths(&token(1), &token(4), 2, |_| true);
        assert_eq!(paths.len(), 1);
        assert_eq!(paths[0].len(), 1);
        assert!(graph.find_paths(&token(1), &token(4), 0, |_| true).is_empty());
    }

    #[test]
    fn test_find_paths_connecting_tokens() {
        let dict = make_chain();
        let graph = PoolGraph::build(&dict, PoolFilter::All);
        // Token 3 may not be crossed, so only the direct pool remains
        let paths = graph.find_paths(&token(1), &token(4), 4, |t| t != &token(3));
        assert_eq!(paths.len(), 1);
        assert_eq!(paths[0].to_string(), "[p14]");
    }

    #[test]
    fn test_find_paths_same_token_is_empty() {
        let dict = make_chain();
        let graph = PoolGraph::build(&dict, PoolFilter::All);
        assert!(graph.find_paths(&token(1), &token(1), 4, |_| true).is_empty());
    }
}
