//! Lyfe router: route proposal and swap planning
//!
//! Finds candidate paths across the heterogeneous pool graph, adds the
//! boosted and connector shapes generic search cannot reach, and plans a
//! swap by quoting, ranking and splitting across the best paths.

pub mod graph;
pub mod path;
pub mod plan;
pub mod proposer;

// Re-exports
pub use graph::PoolGraph;
pub use path::{Hop, Path};
pub use plan::{
    find_best_paths, optimize_split, plan_swap, quote_path, HopQuote, PathQuote, RouteAllocation,
    SplitPlan, SwapPlan, SwapRequest,
};
pub use proposer::{
    boosted_paths, connector_paths, highest_liquidity_pool, propose_paths, RouteProposer,
};

#[cfg(test)]
pub(crate) mod fixtures {
    //! Pool sets built from JSON snapshots

    use lyfe_amm::{PoolDictionary, PoolSnapshot};
    use lyfe_core::Address;
    use serde_json::{json, Value};

    pub fn token(n: u8) -> Address {
        Address::new(format!("0x{:040x}", n))
    }

    /// Address derived from the pool id so every fixture pool has its own
    pub fn pool_address(id: &str) -> Address {
        let hex: String = id.bytes().map(|b| format!("{:02x}", b)).collect();
        Address::new(format!("0x{:0>40}", hex))
    }

    /// Virtual supply 2000 below the linear pre-minted balance
    pub const LINEAR_LBPT_BALANCE: &str = "5192296858534825.628530496329220095";

    pub fn make_weighted_json(id: &str, a: u8, b: u8, balance_a: &str, balance_b: &str) -> Value {
        make_weighted_between(id, &token(a), &token(b), balance_a, balance_b)
    }

    pub fn make_weighted_between(
        id: &str,
        a: &Address,
        b: &Address,
        balance_a: &str,
        balance_b: &str,
    ) -> Value {
        json!({
            "id": id,
            "address": pool_address(id),
            "poolType": "Weighted",
            "swapFee": "0.003",
            "totalShares": "1000",
            "tokens": [
                {"address": a, "balance": balance_a, "decimals": 18, "weight": "0.5"},
                {"address": b, "balance": balance_b, "decimals": 18, "weight": "0.5"}
            ]
        })
    }

    pub fn make_stable_json(id: &str, tokens: &[(&Address, &str)]) -> Value {
        let tokens: Vec<Value> = tokens
            .iter()
            .map(|(address, balance)| json!({"address": address, "balance": balance, "decimals": 18}))
            .collect();
        json!({
            "id": id,
            "address": pool_address(id),
            "poolType": "Stable",
            "swapFee": "0.0004",
            "totalShares": "3000",
            "amp": "200",
            "tokens": tokens
        })
    }

    /// Linear pool of `main` and `wrapped` with its share token last
    pub fn make_linear_json(id: &str, main: &Address, wrapped: &Address) -> Value {
        json!({
            "id": id,
            "address": pool_address(id),
            "poolType": "Linear",
            "swapFee": "0.0001",
            "totalShares": "2000",
            "mainIndex": 0,
            "wrappedIndex": 1,
            "lowerTarget": "0",
            "upperTarget": "5000",
            "tokens": [
                {"address": main, "balance": "1000", "decimals": 18},
                {"address": wrapped, "balance": "1000", "decimals": 18, "priceRate": "1"},
                {"address": pool_address(id), "balance": LINEAR_LBPT_BALANCE, "decimals": 18}
            ]
        })
    }

    /// Phantom stable pool over `members` plus its own share token
    pub fn make_phantom_json(id: &str, members: &[&Address]) -> Value {
        let mut tokens: Vec<Value> = members
            .iter()
            .map(|address| json!({"address": address, "balance": "2000", "decimals": 18, "priceRate": "1"}))
            .collect();
        tokens.push(json!({
            "address": pool_address(id),
            "balance": "5192296858528827",
            "decimals": 18
        }));
        json!({
            "id": id,
            "address": pool_address(id),
            "poolType": "PhantomStable",
            "swapFee": "0.0001",
            "totalShares": "6000",
            "amp": "1500",
            "tokens": tokens
        })
    }

    pub fn make_dictionary(pools: &[Value]) -> PoolDictionary {
        let snapshots: Vec<PoolSnapshot> =
            serde_json::from_value(Value::Array(pools.to_vec())).unwrap();
        let dict = PoolDictionary::from_snapshots(&snapshots).unwrap();
        assert_eq!(dict.len(), snapshots.len(), "every fixture pool must parse");
        dict
    }
}
