//! `rrf_blend_frontier`/`rrf_mutate_run` (spec.md §6): assemble a
//! fully-resolved [`Recipe`]/[`MutateDelta`] from the tool surface's loose
//! parameters and hand them to the engine's `blend`/`mutate`.

use fastmcp::prelude::*;
use fusion_core::models::{FacetSpec, MutateDelta, Recipe, Representative, Weights};
use fusion_engine::BlendRequest;
use serde_json::Value;

use crate::adapter;
use crate::bootstrap::engine;

/// `rrf_blend_frontier(request) -> run_handle` (spec.md §6): fuse >=1 lane
/// runs into a ranked, frontier-scored fusion run.
#[allow(clippy::too_many_arguments)]
#[tool(
    description = "Fuse one or more lane-search run handles via weighted RRF + code/facet/lane-consistency scoring, returning the frontier-scored fusion run."
)]
pub fn rrf_blend_frontier(
    _ctx: &McpContext,
    runs: Vec<String>,
    weights: Option<Value>,
    rrf_k: Option<f64>,
    beta: Option<f64>,
    target_profile: Option<Value>,
    facets: Option<Value>,
    top_m_per_lane: Option<Value>,
    k_grid: Option<Vec<usize>>,
    peek: Option<Value>,
    representatives: Option<Value>,
    family_fold: Option<bool>,
) -> McpResult<String> {
    let defaults = Recipe::default();
    let weights: Weights = adapter::from_value_or_default(weights, "weights")?;
    let facets: Vec<FacetSpec> = adapter::from_value_or_default(facets, "facets")?;
    let top_m_per_lane = adapter::from_value_or_default(top_m_per_lane, "top_m_per_lane")?;
    let peek = adapter::from_value_opt(peek, "peek")?;
    let representatives: Vec<Representative> = adapter::from_value_or_default(representatives, "representatives")?;

    let recipe = Recipe {
        weights,
        rrf_k: rrf_k.unwrap_or(defaults.rrf_k),
        beta: beta.unwrap_or(defaults.beta),
        target_profile: adapter::lift_target_profile(target_profile),
        facets,
        top_m_per_lane,
        k_grid: k_grid.unwrap_or(defaults.k_grid),
        peek,
        representatives,
        family_fold: family_fold.unwrap_or(defaults.family_fold),
        delta: None,
    };

    let response = engine()
        .blend(BlendRequest { runs, recipe, parent_meta: None })
        .map_err(|e| adapter::error_to_mcp(&e))?;
    adapter::to_json(&response)
}

/// `rrf_mutate_run(run_id, delta) -> run_handle` (spec.md §6): re-blend a
/// parent fusion run with an overlay delta, producing a lineage child.
#[tool(
    description = "Re-blend a fusion run with an overlaid weights/rrf_k/beta/target_profile delta, producing a new lineage-linked run handle."
)]
pub fn rrf_mutate_run(
    _ctx: &McpContext,
    run_id: String,
    weights: Option<Value>,
    rrf_k: Option<f64>,
    beta: Option<f64>,
    target_profile: Option<Value>,
    add_ipc: Option<Vec<String>>,
    drop_ipc: Option<Vec<String>>,
    rollup_change: Option<String>,
) -> McpResult<String> {
    let weights: Option<Weights> = adapter::from_value_opt(weights, "weights")?;
    let delta = MutateDelta {
        weights,
        rrf_k,
        beta,
        target_profile: target_profile.map(|v| adapter::lift_target_profile(Some(v))),
        add_ipc: add_ipc.unwrap_or_default(),
        drop_ipc: drop_ipc.unwrap_or_default(),
        rollup_change,
    };
    let response = engine().mutate(&run_id, delta).map_err(|e| adapter::error_to_mcp(&e))?;
    adapter::to_json(&response)
}
