//! The orchestrator: wires `fusion-store`, `fusion-backends`, and the pure
//! scoring functions in `fusion-search` into the run-id lifecycle spec.md §4.5
//! describes — lane search, blend/mutate, peek, and provenance.

#![forbid(unsafe_code)]

pub mod blend;
pub mod engine;
pub mod peek;
pub mod provenance;
pub mod types;

pub use engine::Engine;
pub use types::{
    BlendRequest, ConfigSnapshot, EntryStatus, FusionResponse, LaneSearchSummary, MultiLaneEntry,
    MultiLaneEntryResult, MultiLaneSummary, MultiLaneTool, MutateResponse, ParentMeta, PeekMeta,
    PeekRequest, PeekResponse, ProvenanceResponse, RepresentativeStatus,
};

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use fusion_backends::{BackendRegistry, LocalStubBackend};
    use fusion_core::models::{Filters, Lane, Recipe, SearchParams};
    use fusion_core::Config;
    use fusion_store::MemoryStore;

    use super::*;

    fn engine() -> Engine {
        let store: Arc<dyn fusion_store::StateStore> = Arc::new(MemoryStore::new());
        let mut backends = BackendRegistry::new();
        backends.register("fulltext", Arc::new(LocalStubBackend::default()));
        backends.register("semantic", Arc::new(LocalStubBackend::default()));
        Engine::new(store, backends, Config::default())
    }

    fn fulltext_params(query: &str, top_k: usize) -> SearchParams {
        SearchParams::Fulltext {
            query: query.to_string(),
            filters: Filters::new(),
            fields: vec!["title".to_string(), "abst".to_string()],
            top_k,
            field_boosts: None,
            trace_id: None,
        }
    }

    #[test]
    fn lane_search_persists_a_run_and_reports_counts() {
        let engine = engine();
        let summary = engine.lane_search(Lane::Fulltext, fulltext_params("widget gearbox", 10)).unwrap();
        assert_eq!(summary.top_k, 10);
        assert!(summary.count_returned > 0);
    }

    #[test]
    fn blend_fuses_two_lane_runs_into_a_ranked_response() {
        let engine = engine();
        let fulltext = engine.lane_search(Lane::Fulltext, fulltext_params("widget gearbox", 10)).unwrap();
        let semantic = engine
            .lane_search(
                Lane::Semantic,
                SearchParams::Semantic {
                    text: "widget gearbox".to_string(),
                    filters: Filters::new(),
                    fields: vec!["title".to_string()],
                    top_k: 10,
                    style: fusion_core::models::SemanticStyle::Default,
                    feature_scope: None,
                    trace_id: None,
                },
            )
            .unwrap();

        let response = engine
            .blend(BlendRequest {
                runs: vec![fulltext.run_id, semantic.run_id],
                recipe: Recipe::default(),
                parent_meta: None,
            })
            .unwrap();

        assert!(!response.ranking.is_empty());
        assert_eq!(response.frontier.len(), Recipe::default().k_grid.len());
        assert_eq!(response.lineage, vec![response.run_id.clone()]);
    }

    #[test]
    fn mutate_produces_a_child_run_with_overridden_weights() {
        let engine = engine();
        let fulltext = engine.lane_search(Lane::Fulltext, fulltext_params("widget gearbox", 10)).unwrap();
        let parent = engine
            .blend(BlendRequest {
                runs: vec![fulltext.run_id],
                recipe: Recipe::default(),
                parent_meta: None,
            })
            .unwrap();

        let delta = fusion_core::models::MutateDelta {
            weights: Some(fusion_core::models::Weights {
                lanes: std::collections::HashMap::from([("semantic".to_string(), 1.25)]),
                ..Default::default()
            }),
            rrf_k: Some(45.0),
            ..Default::default()
        };
        let mutated = engine.mutate(&parent.run_id, delta).unwrap();
        assert_eq!(mutated.recipe.weights.lanes.get("semantic"), Some(&1.25));
        assert_eq!(mutated.recipe.rrf_k, 45.0);
        assert_eq!(mutated.recipe.delta.is_some(), true);
        assert_ne!(mutated.new_run_id, parent.run_id);
    }

    #[test]
    fn peek_snippets_shapes_and_budgets_the_top_window() {
        let engine = engine();
        let fulltext = engine.lane_search(Lane::Fulltext, fulltext_params("widget gearbox", 10)).unwrap();
        let fused = engine
            .blend(BlendRequest {
                runs: vec![fulltext.run_id],
                recipe: Recipe::default(),
                parent_meta: None,
            })
            .unwrap();

        let peek = engine
            .peek_snippets(PeekRequest {
                run_id: fused.run_id,
                offset: 0,
                limit: 3,
                fields: vec!["title".to_string()],
                per_field_chars: Some(50),
                budget_bytes: 4096,
                strategy: fusion_core::models::PeekStrategy::Linear,
            })
            .unwrap();
        assert!(peek.snippets.len() <= 3);
        assert_eq!(peek.meta.total_docs, 10);
    }

    #[test]
    fn peek_snippets_diverse_strategy_returns_distinct_docs_within_the_limit() {
        let engine = engine();
        let fulltext = engine.lane_search(Lane::Fulltext, fulltext_params("widget gearbox", 10)).unwrap();
        let fused = engine
            .blend(BlendRequest {
                runs: vec![fulltext.run_id],
                recipe: Recipe::default(),
                parent_meta: None,
            })
            .unwrap();

        let peek = engine
            .peek_snippets(PeekRequest {
                run_id: fused.run_id,
                offset: 0,
                limit: 5,
                fields: vec!["title".to_string()],
                per_field_chars: Some(50),
                budget_bytes: 4096,
                strategy: fusion_core::models::PeekStrategy::Diverse,
            })
            .unwrap();
        assert!(peek.snippets.len() <= 5);
        assert_eq!(peek.meta.total_docs, 10);
        let ids: std::collections::HashSet<_> = peek.snippets.iter().map(|s| s.doc_id.clone()).collect();
        assert_eq!(ids.len(), peek.snippets.len());
    }

    #[test]
    fn provenance_on_a_lane_run_reports_its_frequency_summary_not_fusion_metrics() {
        let engine = engine();
        let fulltext = engine.lane_search(Lane::Fulltext, fulltext_params("widget gearbox", 10)).unwrap();

        let prov = engine.provenance(&fulltext.run_id).unwrap();
        assert_eq!(prov.lineage, vec![fulltext.run_id]);
        assert!(prov.metrics.is_none());
        assert!(prov.lane_contributions.is_none());
        assert!(prov.code_distributions.is_some());
        assert_eq!(prov.config_snapshot["lane"], "fulltext");
    }

    #[test]
    fn provenance_reports_lineage_and_metrics() {
        let engine = engine();
        let fulltext = engine.lane_search(Lane::Fulltext, fulltext_params("widget gearbox", 10)).unwrap();
        let fused = engine
            .blend(BlendRequest {
                runs: vec![fulltext.run_id],
                recipe: Recipe::default(),
                parent_meta: None,
            })
            .unwrap();

        let prov = engine.provenance(&fused.run_id).unwrap();
        assert_eq!(prov.lineage, vec![fused.run_id]);
        assert!(prov.metrics.is_some());
    }

    #[test]
    fn register_representatives_rejects_a_second_call() {
        let engine = engine();
        let fulltext = engine.lane_search(Lane::Fulltext, fulltext_params("widget gearbox", 10)).unwrap();
        let fused = engine
            .blend(BlendRequest { runs: vec![fulltext.run_id], recipe: Recipe::default(), parent_meta: None })
            .unwrap();

        let reps = vec![fusion_core::models::Representative {
            doc_id: fused.ranking[0].0.clone(),
            label: fusion_core::models::FacetLabel::A,
            reason: None,
        }];
        engine.register_representatives(&fused.run_id, reps.clone()).unwrap();

        let err = engine.register_representatives(&fused.run_id, reps).unwrap_err();
        assert_eq!(err.error_code(), "precondition");
    }

    #[test]
    fn multi_lane_search_continues_past_one_bad_entry() {
        let engine = engine();
        let entries = vec![
            MultiLaneEntry {
                alias: "good".to_string(),
                tool: MultiLaneTool::Fulltext,
                lane: "fulltext".to_string(),
                params: fulltext_params("widget", 5),
            },
            MultiLaneEntry {
                alias: "mismatched".to_string(),
                tool: MultiLaneTool::Fulltext,
                lane: "semantic".to_string(),
                params: fulltext_params("widget", 5),
            },
        ];
        let summary = engine.multi_lane_search(entries, Some("trace-1".to_string()));
        assert_eq!(summary.success_count, 1);
        assert_eq!(summary.error_count, 1);
        assert_eq!(summary.entries.len(), 2);
    }
}
