//! `blend`/`mutate`: the 7-step fusion procedure and its delta-overlay
//! reinvocation (spec.md §4.4 + §4.5).

use std::collections::{HashMap, HashSet};

use fusion_core::error::Error;
use fusion_core::ids::mint_fusion_run_id;
use fusion_core::models::{CodeLists, ContributionShares, FusionRun, MutateDelta, Weights};
use fusion_core::Result;
use fusion_store::RunRecord;
use fusion_search::{
    aggregate_topk_freq, compute_frontier, compute_metrics, facet_score, fold_lanes, family_key,
    lane_consistency, normalized_code_scores, pi_prime, priority_pairs, rrf_score, score_doc_codes,
    stable_sort_desc, weighted_addition, LaneInput,
};

use crate::engine::{current_epoch_secs, elapsed_ms, Engine};
use crate::types::{BlendRequest, FusionResponse, MutateResponse, ParentMeta, PeekRequest};

const TOP_N: usize = 50;
const TOP_CONTRIBUTIONS: usize = 20;
const CONTRIBUTION_ROUND: f64 = 1000.0;

impl Engine {
    /// `blend(runs, recipe) -> fusion run` (spec.md §4.5).
    pub fn blend(&self, req: BlendRequest) -> Result<FusionResponse> {
        let started = std::time::Instant::now();
        let recipe = req.recipe;

        let lane_runs = self.load_lane_runs(&req.runs)?;
        let mut lanes: Vec<LaneInput> = lane_runs
            .iter()
            .map(|run| {
                let lane_name = run.lane.prefix().to_string();
                let weight = recipe.weights.lanes.get(&lane_name).copied().unwrap_or(1.0);
                let mut doc_ids: Vec<String> = run.ranking.iter().map(|(id, _)| id.clone()).collect();
                if let Some(&cap) = recipe.top_m_per_lane.get(&lane_name) {
                    doc_ids.truncate(cap);
                }
                LaneInput {
                    lane_name,
                    role: run.lane.role(),
                    weight,
                    doc_ids,
                }
            })
            .collect();

        let all_doc_ids: Vec<String> = lanes
            .iter()
            .flat_map(|l| l.doc_ids.iter().cloned())
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        let docs_map = self.store.get_docs(&all_doc_ids)?;

        if recipe.family_fold {
            let families: HashMap<String, String> = all_doc_ids
                .iter()
                .map(|id| {
                    let app_doc_id = docs_map
                        .get(id)
                        .and_then(|d| d.fields.app_doc_id.as_deref())
                        .unwrap_or(id.as_str());
                    (id.clone(), family_key(app_doc_id))
                })
                .collect();
            lanes = fold_lanes(&lanes, &families);
        }

        let mut rrf = rrf_score(&lanes, recipe.rrf_k);

        for doc_id in rrf.order.clone() {
            let Some(doc) = docs_map.get(&doc_id) else {
                continue;
            };
            let boost = score_doc_codes(&doc.codes, &recipe.target_profile);
            let code_addition = weighted_addition(boost, recipe.weights.code, recipe.weights.code_secondary);
            if code_addition != 0.0 {
                rrf.add(&doc_id, code_addition, "code");
            }
            let facet = facet_score(&doc.fields, &recipe.facets, None);
            let facet_addition = facet * recipe.weights.facet;
            if facet_addition != 0.0 {
                rrf.add(&doc_id, facet_addition, "facet");
            }
        }

        let lane_weights: HashMap<String, f64> = lanes.iter().map(|l| (l.lane_name.clone(), l.weight)).collect();
        let consistency = lane_consistency(&rrf.lane_ranks, &lane_weights);
        for (doc_id, lc) in &consistency {
            let addition = lc * recipe.weights.lane_consistency;
            if addition != 0.0 {
                rrf.add(doc_id, addition, "lane_consistency");
            }
        }

        let ranking = stable_sort_desc(&rrf.order, &rrf.scores);
        let ordering: Vec<String> = ranking.iter().map(|(id, _)| id.clone()).collect();

        let codes_for_pi_prime: HashMap<String, CodeLists> =
            docs_map.iter().map(|(id, d)| (id.clone(), d.codes.clone())).collect();
        let pi_prime_code_scores = normalized_code_scores(&codes_for_pi_prime, &recipe.target_profile);

        let pi_prime_map: HashMap<String, f64> = ordering
            .iter()
            .map(|doc_id| {
                let code_score = pi_prime_code_scores.get(doc_id).copied().unwrap_or(1.0);
                let facet = docs_map
                    .get(doc_id)
                    .map(|d| facet_score(&d.fields, &recipe.facets, None))
                    .unwrap_or(1.0);
                let lc = consistency.get(doc_id).copied().unwrap_or(0.0);
                let value = pi_prime(
                    code_score,
                    facet,
                    lc,
                    recipe.weights.code,
                    recipe.weights.facet,
                    recipe.weights.lane_consistency,
                );
                (doc_id.clone(), value)
            })
            .collect();

        let frontier = compute_frontier(&ordering, &pi_prime_map, &recipe.k_grid, recipe.beta);

        let lane_top_sets: Vec<Vec<String>> = lanes
            .iter()
            .map(|l| l.doc_ids.iter().take(TOP_N).cloned().collect())
            .collect();
        let first_fi_codes: Vec<String> = ordering
            .iter()
            .take(TOP_N)
            .filter_map(|id| docs_map.get(id).and_then(|d| d.codes.fi_norm.first().cloned()))
            .collect();
        let top_50_scores: Vec<f64> = ranking.iter().take(TOP_N).map(|(_, s)| *s).collect();
        let metrics = compute_metrics(&lane_top_sets, &first_fi_codes, &top_50_scores);

        let topk_freq = aggregate_topk_freq(&ordering, &codes_for_pi_prime, &recipe.k_grid);

        let contributions = shape_contributions(&ordering, &rrf.contributions);
        let pairs = priority_pairs(&ranking, &recipe.representatives);

        let run_id = mint_fusion_run_id();
        let (parent_run_id, lineage) = match &req.parent_meta {
            Some(ParentMeta { parent_run_id, lineage }) => {
                let mut l = lineage.clone();
                l.push(run_id.clone());
                (Some(parent_run_id.clone()), l)
            }
            None => (None, vec![run_id.clone()]),
        };

        let run = FusionRun {
            run_id: run_id.clone(),
            source_run_ids: req.runs,
            ranking,
            frontier,
            topk_freq,
            contributions,
            recipe: recipe.clone(),
            parent_run_id,
            lineage,
            metrics,
            created_at_epoch_secs: current_epoch_secs(),
        };
        self.store.put_fusion_run(&run)?;
        self.store.set_run_meta(&run_id, &RunRecord::Fusion(run.clone()))?;

        let peek = match &recipe.peek {
            Some(cfg) => Some(self.peek_snippets(PeekRequest {
                run_id: run_id.clone(),
                offset: 0,
                limit: cfg.count,
                fields: cfg.fields.clone(),
                per_field_chars: cfg.per_field_chars,
                budget_bytes: cfg.budget_bytes,
                strategy: fusion_core::models::PeekStrategy::default(),
            })?),
            None => None,
        };

        Ok(FusionResponse::from_run(&run, pairs, peek, elapsed_ms(started)))
    }

    /// `mutate(parent_run_id, delta) -> new fusion run` (spec.md §4.5).
    pub fn mutate(&self, parent_run_id: &str, delta: MutateDelta) -> Result<MutateResponse> {
        let parent = match self.store.get_run_meta(parent_run_id)? {
            Some(RunRecord::Fusion(run)) => run,
            Some(RunRecord::Lane(_)) => {
                return Err(Error::precondition(format!("{parent_run_id} is a lane run, not a fusion run")));
            }
            None => return Err(Error::not_found("run", parent_run_id)),
        };

        let mut recipe = parent.recipe.clone();
        if let Some(delta_weights) = &delta.weights {
            recipe.weights = merge_weights(&recipe.weights, delta_weights);
        }
        if let Some(rrf_k) = delta.rrf_k {
            recipe.rrf_k = rrf_k;
        }
        if let Some(beta) = delta.beta {
            recipe.beta = beta;
        }
        if !delta.add_ipc.is_empty() || !delta.drop_ipc.is_empty() {
            let ipc = recipe.target_profile.entry("ipc".to_string()).or_default();
            for code in &delta.add_ipc {
                ipc.insert(code.clone(), 1.0);
            }
            for code in &delta.drop_ipc {
                ipc.remove(code);
            }
        }
        if let Some(target_profile) = &delta.target_profile {
            recipe.target_profile = target_profile.clone();
        }
        recipe.delta = serde_json::to_value(&delta).ok();

        let response = self.blend(BlendRequest {
            runs: parent.source_run_ids.clone(),
            recipe,
            parent_meta: Some(ParentMeta {
                parent_run_id: parent_run_id.to_string(),
                lineage: parent.lineage.clone(),
            }),
        })?;

        Ok(MutateResponse {
            new_run_id: response.run_id,
            frontier: response.frontier,
            recipe: response.recipe,
        })
    }

    fn load_lane_runs(&self, run_ids: &[String]) -> Result<Vec<fusion_core::models::LaneRun>> {
        run_ids
            .iter()
            .map(|id| match self.store.get_run_meta(id)? {
                Some(RunRecord::Lane(run)) => Ok(run),
                Some(RunRecord::Fusion(_)) => {
                    Err(Error::validation(format!("{id} is a fusion run, not a lane run")))
                }
                None => Err(Error::not_found("run", id.clone())),
            })
            .collect()
    }
}

fn merge_weights(parent: &Weights, delta: &Weights) -> Weights {
    let mut lanes = parent.lanes.clone();
    for (lane, weight) in &delta.lanes {
        lanes.insert(lane.clone(), *weight);
    }
    Weights {
        lanes,
        code: if delta.code != 0.0 { delta.code } else { parent.code },
        code_secondary: if delta.code_secondary != 0.0 { delta.code_secondary } else { parent.code_secondary },
        facet: if delta.facet != 0.0 { delta.facet } else { parent.facet },
        lane_consistency: if delta.lane_consistency != 0.0 {
            delta.lane_consistency
        } else {
            parent.lane_consistency
        },
    }
}

fn shape_contributions(ordering: &[String], raw: &ContributionShares) -> ContributionShares {
    let mut out = ContributionShares::new();
    for doc_id in ordering.iter().take(TOP_CONTRIBUTIONS) {
        let Some(buckets) = raw.get(doc_id) else {
            continue;
        };
        let rounded: HashMap<String, f64> = buckets
            .iter()
            .map(|(k, v)| (k.clone(), (v * CONTRIBUTION_ROUND).round() / CONTRIBUTION_ROUND))
            .collect();
        out.insert(doc_id.clone(), rounded);
    }
    out
}
