//! Lane search tools (spec.md §6): `search_fulltext`/`search_semantic` are
//! convenience wrappers returning bare doc-id lists; the `_raw` variants
//! expose the full lane-search contract and hand back the run handle so a
//! caller can feed it into `rrf_blend_frontier`. `run_multilane_search` fans
//! a batch of entries out to whichever lane each one names.

use fastmcp::prelude::*;
use fusion_core::models::{FeatureScope, Filters, Lane, PeekStrategy, SearchParams, SemanticStyle};
use fusion_engine::{MultiLaneEntry, MultiLaneTool, PeekRequest};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::adapter;
use crate::bootstrap::engine;

const DOC_ID_PEEK_BUDGET_BYTES: usize = 8 * 1024 * 1024;

fn build_filters(raw: Option<Value>) -> McpResult<Filters> {
    let mut filters = adapter::parse_filters(raw.as_ref()).map_err(|e| adapter::error_to_mcp(&e))?;
    adapter::ensure_country_default(&mut filters);
    Ok(filters)
}

/// Window a run's ranking down to a bare `doc_id` list via `peek_snippets`
/// with an empty field set, discarding the shaped text.
fn doc_ids_for_run(run_id: &str, top_k: usize) -> McpResult<Vec<String>> {
    let peek = engine()
        .peek_snippets(PeekRequest {
            run_id: run_id.to_string(),
            offset: 0,
            limit: top_k,
            fields: Vec::new(),
            per_field_chars: Some(1),
            budget_bytes: DOC_ID_PEEK_BUDGET_BYTES,
            strategy: PeekStrategy::Linear,
        })
        .map_err(|e| adapter::error_to_mcp(&e))?;
    Ok(peek.snippets.into_iter().map(|s| s.doc_id).collect())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocIdsResponse {
    pub run_id: String,
    pub doc_ids: Vec<String>,
    pub took_ms: u64,
}

/// Full-text search over a lane's fulltext backend (spec.md §6).
#[tool(
    description = "Full-text patent search. Returns a bare doc_id list windowed over the underlying lane run; use rrf_search_fulltext_raw if you need the run handle and full lane-search metadata."
)]
pub fn search_fulltext(
    _ctx: &McpContext,
    query: String,
    filters: Option<Value>,
    top_k: Option<usize>,
    fields: Option<Vec<String>>,
    field_boosts: Option<Value>,
) -> McpResult<String> {
    let (result, took_ms) = adapter::timed(|| -> McpResult<DocIdsResponse> {
        let filters = build_filters(filters)?;
        let field_boosts: Option<fusion_core::models::FieldBoosts> = adapter::from_value_opt(field_boosts, "field_boosts")?;
        let top_k = top_k.unwrap_or(20);
        let params = SearchParams::Fulltext {
            query,
            filters,
            fields: fields.unwrap_or_default(),
            top_k,
            field_boosts,
            trace_id: None,
        };
        let summary = engine().lane_search(Lane::Fulltext, params).map_err(|e| adapter::error_to_mcp(&e))?;
        let doc_ids = doc_ids_for_run(&summary.run_id, top_k)?;
        Ok(DocIdsResponse { run_id: summary.run_id, doc_ids, took_ms: 0 })
    });
    let mut result = result?;
    result.took_ms = took_ms;
    adapter::to_json(&result)
}

/// Semantic/dense search over a lane's embedding backend (spec.md §6).
#[tool(
    description = "Semantic patent search. Returns a bare doc_id list windowed over the underlying lane run; use rrf_search_semantic_raw if you need the run handle and full lane-search metadata."
)]
pub fn search_semantic(
    _ctx: &McpContext,
    text: String,
    filters: Option<Value>,
    top_k: Option<usize>,
    fields: Option<Vec<String>>,
    style: Option<String>,
    feature_scope: Option<String>,
) -> McpResult<String> {
    let (result, took_ms) = adapter::timed(|| -> McpResult<DocIdsResponse> {
        let filters = build_filters(filters)?;
        let top_k = top_k.unwrap_or(20);
        let style = match style.as_deref() {
            Some("original_dense") => SemanticStyle::OriginalDense,
            _ => SemanticStyle::Default,
        };
        let feature_scope = match feature_scope.as_deref() {
            Some("wide") => Some(FeatureScope::Wide),
            Some("title_abst_claims") => Some(FeatureScope::TitleAbstClaims),
            Some("claims_only") => Some(FeatureScope::ClaimsOnly),
            Some("top_claim") => Some(FeatureScope::TopClaim),
            Some("background_jp") => Some(FeatureScope::BackgroundJp),
            _ => None,
        };
        let params = SearchParams::Semantic {
            text,
            filters,
            fields: fields.unwrap_or_default(),
            top_k,
            style,
            feature_scope,
            trace_id: None,
        };
        let summary = engine().lane_search(Lane::Semantic, params).map_err(|e| adapter::error_to_mcp(&e))?;
        let doc_ids = doc_ids_for_run(&summary.run_id, top_k)?;
        Ok(DocIdsResponse { run_id: summary.run_id, doc_ids, took_ms: 0 })
    });
    let mut result = result?;
    result.took_ms = took_ms;
    adapter::to_json(&result)
}

/// `rrf_search_fulltext_raw(params) -> run_handle` (spec.md §6): the full
/// lane-search contract, returning the persisted run's summary.
#[tool(
    description = "Full-text lane search exposing the full parameter set. Returns the persisted run handle (run_id, top_k, count_returned, truncated, took_ms) for use as a rrf_blend_frontier input."
)]
pub fn rrf_search_fulltext_raw(
    _ctx: &McpContext,
    query: String,
    filters: Option<Value>,
    top_k: Option<usize>,
    fields: Option<Vec<String>>,
    field_boosts: Option<Value>,
    trace_id: Option<String>,
) -> McpResult<String> {
    let filters = build_filters(filters)?;
    let field_boosts: Option<fusion_core::models::FieldBoosts> = adapter::from_value_opt(field_boosts, "field_boosts")?;
    let params = SearchParams::Fulltext {
        query,
        filters,
        fields: fields.unwrap_or_default(),
        top_k: top_k.unwrap_or(20),
        field_boosts,
        trace_id,
    };
    let summary = engine().lane_search(Lane::Fulltext, params).map_err(|e| adapter::error_to_mcp(&e))?;
    adapter::to_json(&summary)
}

/// `rrf_search_semantic_raw(params) -> run_handle` (spec.md §6): the full
/// semantic/dense lane-search contract.
#[tool(
    description = "Semantic/dense lane search exposing the full parameter set. Returns the persisted run handle for use as a rrf_blend_frontier input."
)]
pub fn rrf_search_semantic_raw(
    _ctx: &McpContext,
    text: String,
    filters: Option<Value>,
    top_k: Option<usize>,
    fields: Option<Vec<String>>,
    style: Option<String>,
    feature_scope: Option<String>,
    use_original_dense_lane: Option<bool>,
    trace_id: Option<String>,
) -> McpResult<String> {
    let filters = build_filters(filters)?;
    let style = match style.as_deref() {
        Some("original_dense") => SemanticStyle::OriginalDense,
        _ => SemanticStyle::Default,
    };
    let feature_scope = match feature_scope.as_deref() {
        Some("wide") => Some(FeatureScope::Wide),
        Some("title_abst_claims") => Some(FeatureScope::TitleAbstClaims),
        Some("claims_only") => Some(FeatureScope::ClaimsOnly),
        Some("top_claim") => Some(FeatureScope::TopClaim),
        Some("background_jp") => Some(FeatureScope::BackgroundJp),
        _ => None,
    };
    let params = SearchParams::Semantic {
        text,
        filters,
        fields: fields.unwrap_or_default(),
        top_k: top_k.unwrap_or(20),
        style,
        feature_scope,
        trace_id,
    };
    let lane = if use_original_dense_lane.unwrap_or(false) { Lane::OriginalDense } else { Lane::Semantic };
    let summary = engine().lane_search(lane, params).map_err(|e| adapter::error_to_mcp(&e))?;
    adapter::to_json(&summary)
}

fn parse_multilane_entry(raw: &Value) -> McpResult<MultiLaneEntry> {
    let obj = raw.as_object().ok_or_else(|| adapter::parse_error("lane entry", "expected a JSON object"))?;
    let alias = obj
        .get("alias")
        .and_then(Value::as_str)
        .ok_or_else(|| adapter::parse_error("lane entry", "missing 'alias'"))?
        .to_string();
    let tool_str = obj
        .get("tool")
        .and_then(Value::as_str)
        .ok_or_else(|| adapter::parse_error("lane entry", "missing 'tool'"))?;
    let tool = match tool_str {
        "fulltext" => MultiLaneTool::Fulltext,
        "semantic" => MultiLaneTool::Semantic,
        other => return Err(adapter::parse_error("lane entry", format!("unknown tool: {other}"))),
    };
    let lane =
        obj.get("lane").and_then(Value::as_str).ok_or_else(|| adapter::parse_error("lane entry", "missing 'lane'"))?.to_string();
    let params_raw = obj.get("params").cloned().ok_or_else(|| adapter::parse_error("lane entry", "missing 'params'"))?;
    let mut params: SearchParams = serde_json::from_value(params_raw).map_err(|e| adapter::parse_error("lane entry params", e))?;
    adapter::ensure_country_default(params.filters_mut());
    Ok(MultiLaneEntry { alias, tool, lane, params })
}

/// `run_multilane_search(lanes[], trace_id) -> lane summaries` (spec.md §6):
/// runs every entry strictly sequentially; one entry's failure never aborts
/// the batch.
#[tool(
    description = "Run a batch of lane searches sequentially. Each entry is {alias, tool: \"fulltext\"|\"semantic\", lane, params}; one entry's error never aborts the others."
)]
pub fn run_multilane_search(_ctx: &McpContext, lanes: Value, trace_id: Option<String>) -> McpResult<String> {
    let items = lanes.as_array().ok_or_else(|| adapter::parse_error("lanes", "expected a JSON array"))?;
    let entries: Vec<MultiLaneEntry> = items.iter().map(parse_multilane_entry).collect::<McpResult<_>>()?;
    let summary = engine().multi_lane_search(entries, trace_id);
    adapter::to_json(&summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_entry() -> Value {
        serde_json::json!({
            "alias": "lane-a",
            "tool": "fulltext",
            "lane": "fulltext",
            "params": {
                "kind": "fulltext",
                "query": "widget",
                "filters": [],
                "fields": ["title"],
                "top_k": 10,
            },
        })
    }

    #[test]
    fn parse_multilane_entry_accepts_a_well_formed_object() {
        let entry = parse_multilane_entry(&valid_entry()).unwrap();
        assert_eq!(entry.alias, "lane-a");
        assert_eq!(entry.tool, MultiLaneTool::Fulltext);
        assert_eq!(entry.lane, "fulltext");
    }

    #[test]
    fn parse_multilane_entry_injects_a_country_default_when_absent() {
        let entry = parse_multilane_entry(&valid_entry()).unwrap();
        assert!(entry.params.filters().iter().any(|c| c.field == fusion_core::models::FilterField::Country));
    }

    #[test]
    fn parse_multilane_entry_leaves_an_explicit_country_filter_untouched() {
        let mut raw = valid_entry();
        raw["params"]["filters"] = serde_json::json!([
            {"logical_op": "and", "field": "country", "op": "in", "value": ["US"]},
        ]);
        let entry = parse_multilane_entry(&raw).unwrap();
        let country_filters: Vec<_> =
            entry.params.filters().iter().filter(|c| c.field == fusion_core::models::FilterField::Country).collect();
        assert_eq!(country_filters.len(), 1);
        assert_eq!(country_filters[0].value, serde_json::json!(["US"]));
    }

    #[test]
    fn parse_multilane_entry_rejects_a_non_object() {
        assert!(parse_multilane_entry(&serde_json::json!("not-an-object")).is_err());
    }

    #[test]
    fn parse_multilane_entry_rejects_an_unknown_tool() {
        let mut raw = valid_entry();
        raw["tool"] = serde_json::json!("graph");
        assert!(parse_multilane_entry(&raw).is_err());
    }

    #[test]
    fn parse_multilane_entry_rejects_a_missing_alias() {
        let mut raw = valid_entry();
        raw.as_object_mut().unwrap().remove("alias");
        assert!(parse_multilane_entry(&raw).is_err());
    }

    #[test]
    fn parse_multilane_entry_rejects_params_that_do_not_match_the_union() {
        let mut raw = valid_entry();
        raw["params"] = serde_json::json!({"kind": "not_a_real_variant"});
        assert!(parse_multilane_entry(&raw).is_err());
    }
}
