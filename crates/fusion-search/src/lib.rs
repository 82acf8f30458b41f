//! Pure scoring algorithms for the fusion pipeline: RRF, classification-code
//! boosts, facet coverage, lane consistency, the π' proxy-relevance
//! combination, the precision/recall/Fβ frontier, fusion-quality
//! diagnostics, top-k code-frequency aggregation, representative
//! re-prioritization, family folding, and snippet shaping.
//!
//! Every function here is pure: no I/O, no state-store or backend access.
//! `fusion-engine` wires these over live data.

pub mod code_boost;
pub mod facet;
pub mod family_fold;
pub mod frontier;
pub mod lane_consistency;
pub mod pi_prime;
pub mod quality_metrics;
pub mod representatives;
pub mod rrf;
pub mod snippet;
pub mod topk_freq;

pub use code_boost::{normalized_code_scores, score_doc_codes, weighted_addition, CodeBoost};
pub use facet::facet_score;
pub use family_fold::{fold_lanes, family_key};
pub use frontier::compute_frontier;
pub use lane_consistency::lane_consistency;
pub use pi_prime::{logistic, pi_prime};
pub use quality_metrics::{
    code_concentration_weight, compute_metrics, lane_agreement_score, s_shape,
};
pub use representatives::priority_pairs;
pub use rrf::{rrf_score, stable_sort_desc, LaneInput, RrfResult};
pub use snippet::{adjust_caps_for_budget, budget_snippets, shape_snippet, truncate_field, BudgetedSnippets};
pub use topk_freq::aggregate_topk_freq;
