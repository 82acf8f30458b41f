//! `get_provenance`/`register_representatives` (spec.md §4.4, §4.5, §6).

use std::collections::HashMap;

use fastmcp::prelude::*;
use fusion_core::models::{Representative, TopKFreq};
use serde_json::Value;

use crate::adapter;
use crate::bootstrap::engine;

fn truncate_topk_freq(freq: &TopKFreq, n: usize) -> TopKFreq {
    freq.iter().map(|(taxonomy, codes)| (taxonomy.clone(), codes.iter().take(n).cloned().collect())).collect()
}

fn truncate_contributions(contributions: &HashMap<String, HashMap<String, f64>>, n: usize) -> HashMap<String, HashMap<String, f64>> {
    contributions
        .iter()
        .map(|(doc_id, buckets)| {
            let mut pairs: Vec<(String, f64)> = buckets.iter().map(|(k, v)| (k.clone(), *v)).collect();
            pairs.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
            pairs.truncate(n);
            (doc_id.clone(), pairs.into_iter().collect())
        })
        .collect()
}

/// `get_provenance(run_id, top_k_lane, top_k_code) -> provenance response`
/// (spec.md §4.5, §6): lineage, contributions, code distributions, recipe
/// snapshot, metrics, representative status. `top_k_lane`/`top_k_code` trim
/// the contribution/code-distribution maps the tool surface hands back;
/// the engine's own `provenance()` has no truncation knobs.
#[tool(
    description = "Lineage, per-lane contributions, code distributions, recipe snapshot, fusion-quality metrics, and representative status for a fusion run."
)]
pub fn get_provenance(
    _ctx: &McpContext,
    run_id: String,
    top_k_lane: Option<usize>,
    top_k_code: Option<usize>,
) -> McpResult<String> {
    let mut response = engine().provenance(&run_id).map_err(|e| adapter::error_to_mcp(&e))?;
    if let Some(n) = top_k_lane {
        response.lane_contributions = response.lane_contributions.as_ref().map(|c| truncate_contributions(c, n));
    }
    if let Some(n) = top_k_code {
        response.code_distributions = response.code_distributions.as_ref().map(|f| truncate_topk_freq(f, n));
    }
    adapter::to_json(&response)
}

/// `register_representatives(run_id, representatives)` (spec.md §4.4, ninth
/// bullet): replace a run's representative set, re-sorting presentation
/// order without touching the canonical ranking.
#[tool(
    description = "Replace a fusion run's representative set and recompute presentation-only priority ordering. The canonical ranking is untouched."
)]
pub fn register_representatives(_ctx: &McpContext, run_id: String, representatives: Value) -> McpResult<String> {
    let representatives: Vec<Representative> =
        serde_json::from_value(representatives).map_err(|e| adapter::parse_error("representatives", e))?;
    let response = engine().register_representatives(&run_id, representatives).map_err(|e| adapter::error_to_mcp(&e))?;
    adapter::to_json(&response)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn freq(pairs: &[(&str, &[(&str, u64)])]) -> TopKFreq {
        pairs.iter().map(|(tax, codes)| ((*tax).to_string(), codes.iter().map(|(c, n)| ((*c).to_string(), *n)).collect())).collect()
    }

    #[test]
    fn truncate_topk_freq_keeps_the_first_n_codes_per_taxonomy() {
        let full = freq(&[("ipc", &[("H04L", 5), ("G06F", 3), ("A61B", 1)])]);
        let truncated = truncate_topk_freq(&full, 2);
        assert_eq!(truncated["ipc"].len(), 2);
        assert_eq!(truncated["ipc"][0], ("H04L".to_string(), 5));
        assert_eq!(truncated["ipc"][1], ("G06F".to_string(), 3));
    }

    #[test]
    fn truncate_topk_freq_is_a_no_op_when_n_exceeds_the_list() {
        let full = freq(&[("cpc", &[("Y02E", 2)])]);
        assert_eq!(truncate_topk_freq(&full, 10), full);
    }

    #[test]
    fn truncate_contributions_sorts_descending_and_caps_per_doc() {
        let mut contributions = HashMap::new();
        contributions.insert(
            "doc-1".to_string(),
            HashMap::from([("recall".to_string(), 0.1), ("code".to_string(), 0.9), ("semantic".to_string(), 0.4)]),
        );
        let truncated = truncate_contributions(&contributions, 2);
        let doc = &truncated["doc-1"];
        assert_eq!(doc.len(), 2);
        assert!(doc.contains_key("code"));
        assert!(doc.contains_key("semantic"));
        assert!(!doc.contains_key("recall"));
    }
}
