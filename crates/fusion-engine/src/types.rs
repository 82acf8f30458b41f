//! Request/response DTOs for the orchestrator operations (spec.md §4.5).
//! These sit above `fusion-core::models` (the persisted entities) and carry
//! the per-call shape the tool surface hands the engine.

use std::collections::HashMap;

use fusion_core::models::{
    Document, FrontierPoint, FusionMetrics, FusionRun, InlinePeekConfig, PeekStrategy, Recipe,
    Representative, Snippet, TopKFreq,
};
use serde::{Deserialize, Serialize};

/// Summary returned by `lane_search`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LaneSearchSummary {
    pub run_id: String,
    pub top_k: usize,
    pub count_returned: usize,
    pub truncated: bool,
    pub took_ms: u64,
}

/// One entry in a `multi_lane_search` batch.
#[derive(Debug, Clone)]
pub struct MultiLaneEntry {
    pub alias: String,
    pub tool: MultiLaneTool,
    pub lane: String,
    pub params: fusion_core::models::SearchParams,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MultiLaneTool {
    Fulltext,
    Semantic,
}

/// Outcome of one `multi_lane_search` entry. Errors in one entry never abort
/// the batch (spec.md §4.5).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MultiLaneEntryResult {
    pub alias: String,
    pub tool: MultiLaneTool,
    pub lane: String,
    pub status: EntryStatus,
    pub took_ms: u64,
    #[serde(default)]
    pub handle: Option<LaneSearchSummary>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryStatus {
    Success,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MultiLaneSummary {
    pub entries: Vec<MultiLaneEntryResult>,
    pub success_count: usize,
    pub error_count: usize,
    pub took_ms_total: u64,
    pub trace_id: Option<String>,
}

/// Lineage context passed from `mutate` into its `blend` re-invocation so the
/// child run's lineage extends the parent's rather than starting fresh.
#[derive(Debug, Clone)]
pub struct ParentMeta {
    pub parent_run_id: String,
    pub lineage: Vec<String>,
}

/// A `blend` request: which lane runs to fuse plus a fully-resolved recipe
/// (default-filling is the tool surface's job, per spec.md §9 ambiguity 3).
#[derive(Debug, Clone)]
pub struct BlendRequest {
    pub runs: Vec<String>,
    pub recipe: Recipe,
    pub parent_meta: Option<ParentMeta>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FusionResponse {
    pub run_id: String,
    pub source_run_ids: Vec<String>,
    pub ranking: Vec<(String, f64)>,
    pub priority_pairs: Vec<(String, f64)>,
    pub frontier: Vec<FrontierPoint>,
    pub topk_freq: TopKFreq,
    pub contributions: HashMap<String, HashMap<String, f64>>,
    pub recipe: Recipe,
    pub parent_run_id: Option<String>,
    pub lineage: Vec<String>,
    pub metrics: FusionMetrics,
    #[serde(default)]
    pub peek: Option<PeekResponse>,
    pub took_ms: u64,
}

impl FusionResponse {
    #[must_use]
    pub fn from_run(run: &FusionRun, priority_pairs: Vec<(String, f64)>, peek: Option<PeekResponse>, took_ms: u64) -> Self {
        Self {
            run_id: run.run_id.clone(),
            source_run_ids: run.source_run_ids.clone(),
            ranking: run.ranking.clone(),
            priority_pairs,
            frontier: run.frontier.clone(),
            topk_freq: run.topk_freq.clone(),
            contributions: run.contributions.clone(),
            recipe: run.recipe.clone(),
            parent_run_id: run.parent_run_id.clone(),
            lineage: run.lineage.clone(),
            metrics: run.metrics,
            peek,
            took_ms,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MutateResponse {
    pub new_run_id: String,
    pub frontier: Vec<FrontierPoint>,
    pub recipe: Recipe,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PeekMeta {
    pub used_bytes: usize,
    pub truncated: bool,
    pub peek_cursor: Option<i64>,
    pub total_docs: u64,
    pub retrieved: usize,
    pub returned: usize,
    pub took_ms: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PeekResponse {
    pub snippets: Vec<Snippet>,
    pub meta: PeekMeta,
}

/// Inputs to `peek_snippets`, mirroring spec.md §4.5's parameter list.
#[derive(Debug, Clone)]
pub struct PeekRequest {
    pub run_id: String,
    pub offset: usize,
    pub limit: usize,
    pub fields: Vec<String>,
    pub per_field_chars: Option<usize>,
    pub budget_bytes: usize,
    pub strategy: PeekStrategy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigSnapshot {
    #[serde(flatten)]
    pub value: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepresentativeStatus {
    pub doc_id: String,
    pub label: fusion_core::models::FacetLabel,
    pub rank: Option<usize>,
    pub score: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvenanceResponse {
    pub run_id: String,
    pub created_at_epoch_secs: i64,
    pub took_ms: u64,
    pub lineage: Vec<String>,
    #[serde(default)]
    pub lane_contributions: Option<HashMap<String, HashMap<String, f64>>>,
    #[serde(default)]
    pub code_distributions: Option<TopKFreq>,
    pub config_snapshot: serde_json::Value,
    #[serde(default)]
    pub metrics: Option<FusionMetrics>,
    #[serde(default)]
    pub representatives: Vec<RepresentativeStatus>,
}

/// Inline `InlinePeekConfig` re-exported for callers that need it alongside
/// the other engine DTOs.
pub type InlinePeek = InlinePeekConfig;
pub type RepresentativeInput = Representative;
pub type DocumentMap = HashMap<String, Document>;
