//! `provenance` and representative registration (spec.md §4.5, §4.4 ninth
//! bullet).

use fusion_core::error::Error;
use fusion_core::models::Representative;
use fusion_core::Result;
use fusion_search::priority_pairs;
use fusion_store::RunRecord;

use crate::engine::{elapsed_ms, Engine};
use crate::types::{FusionResponse, ProvenanceResponse, RepresentativeStatus};

impl Engine {
    fn load_fusion_run(&self, run_id: &str) -> Result<fusion_core::models::FusionRun> {
        match self.store.get_run_meta(run_id)? {
            Some(RunRecord::Fusion(run)) => Ok(run),
            Some(RunRecord::Lane(_)) => {
                Err(Error::precondition(format!("{run_id} is a lane run, not a fusion run")))
            }
            None => Err(Error::not_found("run", run_id)),
        }
    }

    /// `provenance(run_id)` (spec.md §4.5). Lane runs and fusion runs report
    /// different shapes of the same envelope: a lane run has no lineage
    /// beyond itself, no contributions, and its `code_distributions` is the
    /// stored lane frequency summary sorted descending; a fusion run reports
    /// full lineage, contribution shares, fusion-quality metrics, and
    /// representative status.
    pub fn provenance(&self, run_id: &str) -> Result<ProvenanceResponse> {
        let started = std::time::Instant::now();
        match self.store.get_run_meta(run_id)?.ok_or_else(|| Error::not_found("run", run_id))? {
            RunRecord::Lane(run) => {
                let code_distributions: fusion_core::models::TopKFreq = run
                    .freq
                    .iter()
                    .map(|(taxonomy, counts)| {
                        let mut pairs: Vec<(String, u64)> = counts.iter().map(|(c, n)| (c.clone(), *n)).collect();
                        pairs.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
                        (taxonomy.clone(), pairs)
                    })
                    .collect();
                let config_snapshot = serde_json::json!({
                    "lane": run.lane.prefix(),
                    "query": run.params.query_text(),
                    "filters": run.params.filters(),
                    "top_k": run.params.top_k(),
                    "params": run.params,
                });
                Ok(ProvenanceResponse {
                    run_id: run.run_id.clone(),
                    created_at_epoch_secs: run.created_at_epoch_secs,
                    took_ms: elapsed_ms(started),
                    lineage: vec![run.run_id],
                    lane_contributions: None,
                    code_distributions: Some(code_distributions),
                    config_snapshot,
                    metrics: None,
                    representatives: Vec::new(),
                })
            }
            RunRecord::Fusion(run) => {
                let rank_of: std::collections::HashMap<&str, usize> = run
                    .ranking
                    .iter()
                    .enumerate()
                    .map(|(i, (id, _))| (id.as_str(), i + 1))
                    .collect();
                let representatives = run
                    .recipe
                    .representatives
                    .iter()
                    .map(|r| RepresentativeStatus {
                        doc_id: r.doc_id.clone(),
                        label: r.label,
                        rank: rank_of.get(r.doc_id.as_str()).copied(),
                        score: run.ranking.iter().find(|(id, _)| *id == r.doc_id).map(|(_, s)| *s),
                    })
                    .collect();

                Ok(ProvenanceResponse {
                    run_id: run.run_id.clone(),
                    created_at_epoch_secs: run.created_at_epoch_secs,
                    took_ms: elapsed_ms(started),
                    lineage: run.lineage.clone(),
                    lane_contributions: Some(run.contributions.clone()),
                    code_distributions: Some(run.topk_freq.clone()),
                    config_snapshot: serde_json::to_value(&run.recipe).unwrap_or(serde_json::Value::Null),
                    metrics: Some(run.metrics),
                    representatives,
                })
            }
        }
    }

    /// `register_representatives(run_id, representatives)` (spec.md §4.4,
    /// ninth bullet): replace the run's representative set and recompute the
    /// presentation-only priority ordering. The canonical `ranking` and every
    /// other derived field are left untouched.
    ///
    /// Enforced once per fusion run: a second call on a run that already
    /// carries representatives fails with `precondition` (spec.md §8,
    /// "Representative single-registration"). Entry count (1..=30),
    /// doc-id uniqueness, and the implicit `label ∈ {A, B, C}` (enforced by
    /// `Representative`'s own type) are validated before the store is
    /// touched.
    pub fn register_representatives(
        &self,
        run_id: &str,
        representatives: Vec<Representative>,
    ) -> Result<FusionResponse> {
        let started = std::time::Instant::now();
        let mut run = self.load_fusion_run(run_id)?;

        if !run.recipe.representatives.is_empty() {
            return Err(Error::precondition(format!(
                "representatives already registered for run {run_id}"
            )));
        }
        if representatives.is_empty() || representatives.len() > 30 {
            return Err(Error::validation(format!(
                "representatives must number 1..=30, got {}",
                representatives.len()
            )));
        }
        let mut seen = std::collections::HashSet::with_capacity(representatives.len());
        for r in &representatives {
            if r.doc_id.is_empty() {
                return Err(Error::validation("representative doc_id must be non-empty"));
            }
            if !seen.insert(r.doc_id.as_str()) {
                return Err(Error::validation(format!("duplicate representative doc_id: {}", r.doc_id)));
            }
        }

        run.recipe.representatives = representatives;
        self.store.put_fusion_run(&run)?;
        self.store.set_run_meta(&run.run_id, &RunRecord::Fusion(run.clone()))?;

        let pairs = priority_pairs(&run.ranking, &run.recipe.representatives);
        Ok(FusionResponse::from_run(&run, pairs, None, elapsed_ms(started)))
    }
}
