//! Lyfe AMM pricing engines
//!
//! Exact integer pricing for the five pool families. Each family module
//! parses its snapshot, builds per-pair views and implements
//! [`PricingEngine`]; the [`Pool`] enum dispatches over them and the
//! [`PoolDictionary`] holds the parsed pool set of one routing call.

pub mod dictionary;
mod helpers;
pub mod linear;
pub mod multi_e;
pub mod pair;
pub mod phantom_stable;
pub mod pool;
pub mod stable;
pub mod state;
pub mod weighted;

// Re-exports
pub use dictionary::PoolDictionary;
pub use linear::LinearPool;
pub use multi_e::MultiEPool;
pub use pair::{PairExtra, PairKind, PoolPairView};
pub use phantom_stable::PhantomStablePool;
pub use pool::{Pool, PricingEngine, SwapOutcome};
pub use stable::StablePool;
pub use state::{parse_snapshots, PoolSnapshot, PoolState, PoolToken, TokenSnapshot};
pub use weighted::WeightedPool;
