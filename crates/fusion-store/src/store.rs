//! The `StateStore` trait: durable, TTL-bounded storage for lane/fusion
//! runs, doc records, and code-frequency summaries (spec.md §4.1).

use std::collections::HashMap;

use fusion_core::error::Result;
use fusion_core::models::{Document, FusionRun, LaneRun};
use serde::{Deserialize, Serialize};

/// The `run/{run_id}` meta blob: either a lane run or a fusion run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "run_type", rename_all = "snake_case")]
pub enum RunRecord {
    Lane(LaneRun),
    Fusion(FusionRun),
}

impl RunRecord {
    #[must_use]
    pub const fn run_id(&self) -> &String {
        match self {
            Self::Lane(r) => &r.run_id,
            Self::Fusion(r) => &r.run_id,
        }
    }
}

/// Durable storage for ranked runs, document metadata, code-frequency
/// summaries, run metadata, and the code-string-to-id vocabulary.
///
/// Contracts exactly as spec.md §4.1's operations table: `put_lane_run`
/// atomically replaces the lane ranking and upserts doc records with
/// `snippet_ttl`; reads tolerate missing doc records; `upsert_docs` is an
/// idempotent per-field merge; a missing run on read is "not found", not an
/// error, except where the method signature returns `Option`.
pub trait StateStore: Send + Sync {
    fn put_lane_run(&self, snapshot: &str, run: &LaneRun, docs: &[Document]) -> Result<()>;

    fn put_fusion_run(&self, run: &FusionRun) -> Result<()>;

    fn upsert_docs(&self, docs: &[Document]) -> Result<()>;

    fn get_run_meta(&self, run_id: &str) -> Result<Option<RunRecord>>;

    fn set_run_meta(&self, run_id: &str, record: &RunRecord) -> Result<()>;

    /// Returns only the records that exist; silently skips misses.
    fn get_docs(&self, doc_ids: &[String]) -> Result<HashMap<String, Document>>;

    /// Ordered `(doc_id, score)` rows in `[start, stop]` (inclusive);
    /// `stop = -1` means to the end. `desc` controls sort direction.
    fn ranking_slice(&self, key: &str, start: i64, stop: i64, desc: bool) -> Result<Vec<(String, f64)>>;

    fn ranking_size(&self, key: &str) -> Result<u64>;
}
