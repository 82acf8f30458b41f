//! `peek_snippets`/`get_snippets`/`get_publication` (spec.md §4.5, §6).

use fastmcp::prelude::*;
use fusion_core::models::PeekStrategy;
use fusion_engine::PeekRequest;
use std::collections::HashMap;

use crate::adapter;
use crate::bootstrap::engine;

const DEFAULT_BUDGET_BYTES: usize = 32 * 1024;

fn parse_strategy(s: Option<&str>) -> PeekStrategy {
    match s {
        Some("diverse") => PeekStrategy::Diverse,
        _ => PeekStrategy::Linear,
    }
}

/// `peek_snippets(run_id, offset, limit, fields, per_field_chars, budget_bytes, strategy)`
/// (spec.md §4.5, §6).
#[allow(clippy::too_many_arguments)]
#[tool(
    description = "Window a run's ranking and shape byte-budgeted text snippets over it. Identifier fields are always included even when not requested."
)]
pub fn peek_snippets(
    _ctx: &McpContext,
    run_id: String,
    offset: Option<usize>,
    limit: Option<usize>,
    fields: Option<Vec<String>>,
    per_field_chars: Option<usize>,
    budget_bytes: Option<usize>,
    strategy: Option<String>,
) -> McpResult<String> {
    let response = engine()
        .peek_snippets(PeekRequest {
            run_id,
            offset: offset.unwrap_or(0),
            limit: limit.unwrap_or(10),
            fields: fields.unwrap_or_default(),
            per_field_chars,
            budget_bytes: budget_bytes.unwrap_or(DEFAULT_BUDGET_BYTES),
            strategy: parse_strategy(strategy.as_deref()),
        })
        .map_err(|e| adapter::error_to_mcp(&e))?;
    adapter::to_json(&response)
}

/// `get_snippets(ids, fields, per_field_chars) -> map` (spec.md §4.5, §6):
/// shape snippets for already-known doc ids with no ranking window.
#[tool(description = "Shape text snippets for an explicit doc_id list, keyed by doc_id. No ranking window or byte budget.")]
pub fn get_snippets(
    _ctx: &McpContext,
    ids: Vec<String>,
    fields: Option<Vec<String>>,
    per_field_chars: Option<usize>,
) -> McpResult<String> {
    let snippets = engine()
        .get_snippets(&ids, &fields.unwrap_or_default(), per_field_chars)
        .map_err(|e| adapter::error_to_mcp(&e))?;
    let map: HashMap<String, HashMap<String, String>> =
        snippets.into_iter().map(|s| (s.doc_id, s.fields)).collect();
    adapter::to_json(&map)
}

/// `get_publication(ids, id_type, fields) -> map` (spec.md §4.5, §6): resolve
/// publication identifiers through a named lane backend.
#[tool(
    description = "Resolve publication identifiers (by pub_id/app_id/app_doc_id, as named by id_type) through a lane backend and persist the returned documents."
)]
pub fn get_publication(
    _ctx: &McpContext,
    ids: Vec<String>,
    id_type: Option<String>,
    lane: Option<String>,
    fields: Option<Vec<String>>,
) -> McpResult<String> {
    let lane = lane.unwrap_or_else(|| "fulltext".to_string());
    let docs = engine()
        .get_publication(&lane, &ids, id_type.as_deref(), &fields.unwrap_or_default())
        .map_err(|e| adapter::error_to_mcp(&e))?;
    adapter::to_json(&docs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_strategy_recognizes_diverse() {
        assert_eq!(parse_strategy(Some("diverse")), PeekStrategy::Diverse);
    }

    #[test]
    fn parse_strategy_defaults_to_linear_for_anything_else() {
        assert_eq!(parse_strategy(None), PeekStrategy::Linear);
        assert_eq!(parse_strategy(Some("linear")), PeekStrategy::Linear);
        assert_eq!(parse_strategy(Some("bogus")), PeekStrategy::Linear);
    }
}
