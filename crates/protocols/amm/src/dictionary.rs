//! Pool dictionary: the parsed pool set a routing call works on

use std::collections::HashMap;

use lyfe_core::{Address, PoolError, PoolId, Result};
use tracing::{debug, warn};

use crate::pool::Pool;
use crate::state::PoolSnapshot;

/// Pools keyed by id, iterated in snapshot order
#[derive(Debug, Clone, Default)]
pub struct PoolDictionary {
    pools: Vec<Pool>,
    index: HashMap<PoolId, usize>,
}

impl PoolDictionary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse every snapshot into a pool.
    ///
    /// Snapshots that fail to parse are skipped with a warning; a repeated
    /// pool id is an error.
    pub fn from_snapshots(snapshots: &[PoolSnapshot]) -> Result<Self> {
        let mut dict = Self::new();
        for snapshot in snapshots {
            match Pool::from_snapshot(snapshot) {
                Ok(pool) => dict.insert(pool)?,
                Err(e) => {
                    warn!(pool = %snapshot.id, pool_type = %snapshot.pool_type, error = %e, "skipping pool");
                }
            }
        }
        debug!(pools = dict.len(), skipped = snapshots.len() - dict.len(), "pool dictionary built");
        Ok(dict)
    }

    pub fn insert(&mut self, pool: Pool) -> Result<()> {
        let id = pool.id().clone();
        if self.index.contains_key(&id) {
            return Err(PoolError::DuplicatePool(id.to_string()).into());
        }
        self.index.insert(id, self.pools.len());
        self.pools.push(pool);
        Ok(())
    }

    pub fn get(&self, id: &PoolId) -> Option<&Pool> {
        self.index.get(id).map(|&i| &self.pools[i])
    }

    /// Pool by id, or `UnknownPool`
    pub fn require(&self, id: &PoolId) -> Result<&Pool> {
        self.get(id)
            .ok_or_else(|| PoolError::UnknownPool(id.to_string()).into())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Pool> {
        self.pools.iter()
    }

    /// Pools that can trade `token`, in snapshot order
    pub fn pools_with(&self, token: &Address) -> Vec<&Pool> {
        self.pools.iter().filter(|p| p.contains(token)).collect()
    }

    pub fn len(&self) -> usize {
        self.pools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pools.is_empty()
    }
}
