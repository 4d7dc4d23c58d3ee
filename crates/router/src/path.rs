//! Swap paths: ordered hops through pools

use std::collections::HashSet;
use std::fmt;

use lyfe_core::{Address, PoolId, Result, RoutingError};
use serde::{Deserialize, Serialize};

/// One pool traversal
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hop {
    pub pool_id: PoolId,
    pub token_in: Address,
    pub token_out: Address,
}

impl Hop {
    pub fn new(pool_id: PoolId, token_in: Address, token_out: Address) -> Self {
        Self {
            pool_id,
            token_in,
            token_out,
        }
    }
}

/// Ordered hops from a token in to a token out
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Path {
    pub hops: Vec<Hop>,
}

impl Path {
    pub fn new(hops: Vec<Hop>) -> Self {
        Self { hops }
    }

    pub fn len(&self) -> usize {
        self.hops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hops.is_empty()
    }

    pub fn token_in(&self) -> Option<&Address> {
        self.hops.first().map(|h| &h.token_in)
    }

    pub fn token_out(&self) -> Option<&Address> {
        self.hops.last().map(|h| &h.token_out)
    }

    pub fn pool_ids(&self) -> Vec<&PoolId> {
        self.hops.iter().map(|h| &h.pool_id).collect()
    }

    /// Token sequence visited: the first token in, then every token out
    pub fn tokens(&self) -> Vec<&Address> {
        let mut tokens = Vec::with_capacity(self.hops.len() + 1);
        if let Some(first) = self.hops.first() {
            tokens.push(&first.token_in);
        }
        tokens.extend(self.hops.iter().map(|h| &h.token_out));
        tokens
    }

    /// Check the path is non-empty and each hop starts where the last ended
    pub fn validate(&self) -> Result<()> {
        if self.hops.is_empty() {
            return Err(RoutingError::EmptyPath.into());
        }
        for (i, pair) in self.hops.windows(2).enumerate() {
            if pair[0].token_out != pair[1].token_in {
                return Err(RoutingError::Disconnected { hop: i + 1 }.into());
            }
        }
        Ok(())
    }

    pub fn has_repeated_token(&self) -> bool {
        let tokens = self.tokens();
        let unique: HashSet<_> = tokens.iter().collect();
        unique.len() != tokens.len()
    }

    pub fn has_repeated_pool(&self) -> bool {
        let unique: HashSet<_> = self.hops.iter().map(|h| &h.pool_id).collect();
        unique.len() != self.hops.len()
    }

    /// Connected, no token or pool visited twice, at most `max_pools` hops
    pub fn is_well_formed(&self, max_pools: usize) -> bool {
        self.validate().is_ok()
            && self.hops.len() <= max_pools
            && !self.has_repeated_token()
            && !self.has_repeated_pool()
    }

    /// Append `other`, merging the seam into one hop when both sides
    /// trade through the same pool
    pub fn join(&self, other: &Path) -> Path {
        let mut hops = self.hops.clone();
        for hop in &other.hops {
            match hops.last_mut() {
                Some(last) if last.pool_id == hop.pool_id => {
                    last.token_out = hop.token_out.clone();
                }
                _ => hops.push(hop.clone()),
            }
        }
        Path::new(hops)
    }

    /// Whether both paths use the same pools in the same order
    pub fn same_pools(&self, other: &Path) -> bool {
        self.hops.len() == other.hops.len()
            && self
                .hops
                .iter()
                .zip(&other.hops)
                .all(|(a, b)| a.pool_id == b.pool_id)
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ids: Vec<&str> = self.hops.iter().map(|h| h.pool_id.as_str()).collect();
        write!(f, "[{}]", ids.join(" > "))
    }
}
