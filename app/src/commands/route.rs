//! Route search over the whole snapshot

use anyhow::{Context, Result};
use lyfe_amm::PoolDictionary;
use lyfe_core::RouterConfig;
use lyfe_router::{plan_swap, propose_paths, Path, SwapPlan, SwapRequest};
use serde::Serialize;

/// Candidate paths for a request, before quoting
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PathsReport {
    pub count: usize,
    pub paths: Vec<Path>,
}

pub fn candidate_paths(
    dict: &PoolDictionary,
    request: &SwapRequest,
    config: &RouterConfig,
) -> Result<PathsReport> {
    request.validate()?;
    let paths = propose_paths(
        &request.token_in,
        &request.token_out,
        request.swap_type,
        dict,
        config,
    );
    Ok(PathsReport {
        count: paths.len(),
        paths,
    })
}

pub fn route(dict: &PoolDictionary, request: &SwapRequest, config: &RouterConfig) -> Result<SwapPlan> {
    plan_swap(dict, request, config).with_context(|| {
        format!(
            "failed to plan {} swap {} -> {}",
            request.swap_type, request.token_in, request.token_out
        )
    })
}
