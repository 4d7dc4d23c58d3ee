//! Lyfe command-line host
//!
//! Loads a pool snapshot, a swap request and an optional router
//! configuration from JSON files and runs the router over them.

pub mod commands;

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use lyfe_amm::{parse_snapshots, PoolDictionary};
use lyfe_core::RouterConfig;
use serde::de::DeserializeOwned;
use tracing_subscriber::EnvFilter;

/// Initialize logging; `RUST_LOG` overrides the defaults
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("lyfe=debug,lyfe_app=debug,info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Read and deserialize a JSON file
pub fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("invalid JSON in {}", path.display()))
}

/// Parse a pool snapshot file into a dictionary
pub fn load_pools(path: &Path) -> Result<PoolDictionary> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read pool snapshot {}", path.display()))?;
    pools_from_json(&text).with_context(|| format!("invalid pool snapshot {}", path.display()))
}

pub fn pools_from_json(json: &str) -> Result<PoolDictionary> {
    let snapshots = parse_snapshots(json)?;
    let dict = PoolDictionary::from_snapshots(&snapshots)?;
    tracing::info!(pools = dict.len(), snapshots = snapshots.len(), "pools loaded");
    Ok(dict)
}

/// Router configuration from `path`, or the defaults
pub fn load_config(path: Option<&Path>) -> Result<RouterConfig> {
    let config: RouterConfig = match path {
        Some(path) => load_json(path).context("failed to load router configuration")?,
        None => RouterConfig::default(),
    };
    config.validate().context("invalid router configuration")?;
    Ok(config)
}
