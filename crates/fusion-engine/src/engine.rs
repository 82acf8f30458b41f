//! The `Engine`: owns the state-store handle, the backend registry, and
//! engine-wide configuration; exposes `lane_search`/`multi_lane_search`
//! (spec.md §4.5). `blend`/`mutate` live in `blend.rs`, `peek_snippets`/
//! `get_snippets`/`get_publication` in `peek.rs`, `provenance`/representative
//! registration in `provenance.rs` — all as additional `impl Engine` blocks.

use std::sync::Arc;
use std::time::Instant;

use fusion_backends::BackendRegistry;
use fusion_core::error::Error;
use fusion_core::ids::{mint_lane_run_id, query_hash};
use fusion_core::models::{FreqSummary, Lane, LaneRun, SearchParams};
use fusion_core::{Config, Result};
use fusion_store::{RunRecord, StateStore};

use crate::types::{
    EntryStatus, LaneSearchSummary, MultiLaneEntry, MultiLaneEntryResult, MultiLaneSummary,
    MultiLaneTool,
};

pub struct Engine {
    pub(crate) store: Arc<dyn StateStore>,
    pub(crate) backends: BackendRegistry,
    pub(crate) config: Config,
}

impl Engine {
    #[must_use]
    pub fn new(store: Arc<dyn StateStore>, backends: BackendRegistry, config: Config) -> Self {
        Self { store, backends, config }
    }

    pub(crate) fn snapshot(&self) -> &str {
        &self.config.snapshot
    }

    fn taxonomy_freq(docs: &[fusion_core::models::Document]) -> FreqSummary {
        let mut freq = FreqSummary::new();
        for doc in docs {
            for (taxonomy, codes) in [
                ("ipc", &doc.codes.ipc),
                ("cpc", &doc.codes.cpc),
                ("fi", &doc.codes.fi),
                ("ft", &doc.codes.ft),
            ] {
                let bucket = freq.entry(taxonomy.to_string()).or_default();
                for code in codes {
                    *bucket.entry(code.clone()).or_insert(0) += 1;
                }
            }
        }
        freq
    }

    /// `lane_search(lane, params) -> run_handle` (spec.md §4.5).
    pub fn lane_search(&self, lane: Lane, params: SearchParams) -> Result<LaneSearchSummary> {
        let started = Instant::now();
        let lane_tag = lane.prefix();
        let backend = self
            .backends
            .get(lane_tag)
            .ok_or_else(|| Error::validation(format!("no backend registered for lane: {lane_tag}")))?;

        let response = backend.search(&params, lane_tag)?;
        let top_k = params.top_k();
        let hash = query_hash(params.query_text(), params.filters());
        let run_id = mint_lane_run_id(lane_tag);

        let ranking: Vec<(String, f64)> = response.docs.iter().map(|d| (d.doc_id.clone(), d.score)).collect();
        let freq = Self::taxonomy_freq(&response.docs);
        let count_returned = ranking.len();

        let run = LaneRun {
            run_id: run_id.clone(),
            lane,
            query_hash: hash,
            ranking,
            freq,
            params,
            created_at_epoch_secs: current_epoch_secs(),
        };
        self.store.put_lane_run(self.snapshot(), &run, &response.docs)?;
        self.store.set_run_meta(&run_id, &RunRecord::Lane(run))?;

        Ok(LaneSearchSummary {
            run_id,
            top_k,
            count_returned,
            truncated: count_returned < top_k,
            took_ms: elapsed_ms(started),
        })
    }

    /// `multi_lane_search(entries, trace_id) -> lane summaries` (spec.md
    /// §4.5). Entries run strictly sequentially to respect upstream rate
    /// limits; one entry's error never aborts the batch.
    pub fn multi_lane_search(&self, entries: Vec<MultiLaneEntry>, trace_id: Option<String>) -> MultiLaneSummary {
        let batch_started = Instant::now();
        let mut results = Vec::with_capacity(entries.len());
        let mut success_count = 0usize;
        let mut error_count = 0usize;

        for entry in entries {
            let entry_started = Instant::now();
            let outcome = self.run_compatible_entry(&entry);
            let took_ms = elapsed_ms(entry_started);
            match outcome {
                Ok(handle) => {
                    success_count += 1;
                    results.push(MultiLaneEntryResult {
                        alias: entry.alias,
                        tool: entry.tool,
                        lane: entry.lane,
                        status: EntryStatus::Success,
                        took_ms,
                        handle: Some(handle),
                        error: None,
                    });
                }
                Err(e) => {
                    error_count += 1;
                    results.push(MultiLaneEntryResult {
                        alias: entry.alias,
                        tool: entry.tool,
                        lane: entry.lane,
                        status: EntryStatus::Error,
                        took_ms,
                        handle: None,
                        error: Some(e.to_string()),
                    });
                }
            }
        }

        MultiLaneSummary {
            entries: results,
            success_count,
            error_count,
            took_ms_total: elapsed_ms(batch_started),
            trace_id,
        }
    }

    fn run_compatible_entry(&self, entry: &MultiLaneEntry) -> Result<LaneSearchSummary> {
        let lane = Lane::from_prefix(&entry.lane)
            .ok_or_else(|| Error::validation(format!("unknown lane: {}", entry.lane)))?;
        match (entry.tool, lane) {
            (MultiLaneTool::Fulltext, Lane::Fulltext) => {}
            (MultiLaneTool::Semantic, Lane::Semantic | Lane::OriginalDense) => {}
            _ => {
                return Err(Error::validation(format!(
                    "tool/lane mismatch: tool={:?} lane={}",
                    entry.tool, entry.lane
                )));
            }
        }
        self.lane_search(lane, entry.params.clone())
    }
}

pub(crate) fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

pub(crate) fn current_epoch_secs() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}
