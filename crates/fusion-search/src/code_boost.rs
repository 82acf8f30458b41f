//! Classification-code boosts: IPC/CPC/FT and FI (subgroup + exact) priors
//! against a target profile (spec.md §4.4, second bullet).

use std::collections::HashMap;

use fusion_core::models::{CodeLists, TargetProfile};

/// Per-doc code-boost contributions, split into the primary bucket (IPC,
/// CPC, FT, FI-subgroup) and the secondary bucket (FI exact form).
#[derive(Debug, Clone, Copy, Default)]
pub struct CodeBoost {
    pub primary: f64,
    pub secondary: f64,
}

/// Sum the target profile's weight over a doc's codes in one taxonomy.
fn profile_sum(profile: &HashMap<String, f64>, codes: &[String]) -> f64 {
    codes.iter().filter_map(|c| profile.get(c)).sum()
}

/// Compute the raw (pre-weight) code-boost contribution for one document. A
/// zero/absent target profile yields `CodeBoost::default()` (scores
/// untouched), matching spec.md's stated no-op for an empty profile.
#[must_use]
pub fn score_doc_codes(codes: &CodeLists, target_profile: &TargetProfile) -> CodeBoost {
    let mut primary = 0.0;
    if let Some(ipc) = target_profile.get("ipc") {
        primary += profile_sum(ipc, &codes.ipc);
    }
    if let Some(cpc) = target_profile.get("cpc") {
        primary += profile_sum(cpc, &codes.cpc);
    }
    if let Some(ft) = target_profile.get("ft") {
        primary += profile_sum(ft, &codes.ft);
    }
    if let Some(fi) = target_profile.get("fi") {
        primary += profile_sum(fi, &codes.fi_norm);
    }

    let mut secondary = 0.0;
    if let Some(fi) = target_profile.get("fi") {
        secondary += profile_sum(fi, &codes.fi);
    }

    CodeBoost { primary, secondary }
}

/// Apply `code` / `code_secondary` weights to a raw [`CodeBoost`], returning
/// the amount to add to the doc's cumulative fusion score.
#[must_use]
pub fn weighted_addition(boost: CodeBoost, code_weight: f64, code_secondary_weight: f64) -> f64 {
    boost.primary * code_weight + boost.secondary * code_secondary_weight
}

/// Raw (pre-normalization) code-overlap score used by [`normalized_code_scores`]:
/// IPC/CPC/FT codes plus FI in *subgroup-normalized* form only (no FI-exact/
/// secondary term), matching `original_source/rrfusion/fusion.py`'s
/// `compute_code_scores`.
fn raw_pi_prime_code_score(codes: &CodeLists, target_profile: &TargetProfile) -> f64 {
    let mut score = 0.0;
    if let Some(ipc) = target_profile.get("ipc") {
        score += profile_sum(ipc, &codes.ipc);
    }
    if let Some(cpc) = target_profile.get("cpc") {
        score += profile_sum(cpc, &codes.cpc);
    }
    if let Some(ft) = target_profile.get("ft") {
        score += profile_sum(ft, &codes.ft);
    }
    if let Some(fi) = target_profile.get("fi") {
        score += profile_sum(fi, &codes.fi_norm);
    }
    score
}

/// π'-input code scores, normalized to `[0, 1]` by dividing every doc's raw
/// score by the max raw score across `docs` (`original_source`'s
/// `compute_code_scores`). An empty `target_profile`, or a max raw score of
/// zero, yields `1.0` for every doc — a true no-op on the code axis, as
/// opposed to [`score_doc_codes`]'s raw additive value (used for the RRF
/// score boost, not for π').
#[must_use]
pub fn normalized_code_scores(docs: &HashMap<String, CodeLists>, target_profile: &TargetProfile) -> HashMap<String, f64> {
    if target_profile.is_empty() {
        return docs.keys().map(|id| (id.clone(), 1.0)).collect();
    }

    let raw: HashMap<String, f64> =
        docs.iter().map(|(id, codes)| (id.clone(), raw_pi_prime_code_score(codes, target_profile))).collect();
    let max_score = raw.values().copied().fold(0.0_f64, f64::max);

    if max_score <= 0.0 {
        return docs.keys().map(|id| (id.clone(), 1.0)).collect();
    }
    raw.into_iter().map(|(id, score)| (id, score / max_score)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(pairs: &[(&str, f64)]) -> TargetProfile {
        let mut tp = TargetProfile::new();
        let mut ipc = HashMap::new();
        for (k, v) in pairs {
            ipc.insert((*k).to_string(), *v);
        }
        tp.insert("ipc".to_string(), ipc);
        tp
    }

    /// Scenario 2 of spec.md §8: code boost increases d1's score by 0.3.
    #[test]
    fn code_boost_scenario() {
        let target_profile = profile(&[("H04L", 1.0)]);
        let codes = CodeLists {
            ipc: vec!["H04L".to_string()],
            ..Default::default()
        };
        let boost = score_doc_codes(&codes, &target_profile);
        let addition = weighted_addition(boost, 0.3, 0.0);
        assert!((addition - 0.3).abs() < 1e-9);
    }

    #[test]
    fn empty_target_profile_leaves_scores_untouched() {
        let codes = CodeLists {
            ipc: vec!["H04L".to_string()],
            ..Default::default()
        };
        let boost = score_doc_codes(&codes, &TargetProfile::new());
        assert_eq!(boost.primary, 0.0);
        assert_eq!(boost.secondary, 0.0);
    }

    #[test]
    fn fi_exact_and_subgroup_are_split_into_separate_buckets() {
        let mut tp = TargetProfile::new();
        let mut fi = HashMap::new();
        fi.insert("H04L1/00".to_string(), 1.0);
        tp.insert("fi".to_string(), fi);

        let codes = CodeLists {
            fi: vec!["H04L1/00".to_string()],
            fi_norm: vec!["H04L1/00".to_string()],
            ..Default::default()
        };
        let boost = score_doc_codes(&codes, &tp);
        assert!((boost.primary - 1.0).abs() < 1e-9);
        assert!((boost.secondary - 1.0).abs() < 1e-9);
    }

    fn codes_with_ipc(ipc: &[&str]) -> CodeLists {
        CodeLists { ipc: ipc.iter().map(|s| (*s).to_string()).collect(), ..Default::default() }
    }

    #[test]
    fn normalized_code_scores_is_uniformly_one_for_an_empty_target_profile() {
        let docs = HashMap::from([
            ("d1".to_string(), codes_with_ipc(&["H04L"])),
            ("d2".to_string(), codes_with_ipc(&[])),
        ]);
        let scores = normalized_code_scores(&docs, &TargetProfile::new());
        assert_eq!(scores["d1"], 1.0);
        assert_eq!(scores["d2"], 1.0);
    }

    #[test]
    fn normalized_code_scores_is_uniformly_one_when_no_doc_matches_the_profile() {
        let docs = HashMap::from([("d1".to_string(), codes_with_ipc(&["A61B"]))]);
        let scores = normalized_code_scores(&docs, &profile(&[("H04L", 1.0)]));
        assert_eq!(scores["d1"], 1.0);
    }

    #[test]
    fn normalized_code_scores_divides_by_the_max_raw_score_across_docs() {
        let docs = HashMap::from([
            ("d1".to_string(), codes_with_ipc(&["H04L"])),
            ("d2".to_string(), codes_with_ipc(&["H04L", "H04L"])),
        ]);
        let mut tp = TargetProfile::new();
        tp.insert("ipc".to_string(), HashMap::from([("H04L".to_string(), 1.0)]));
        let scores = normalized_code_scores(&docs, &tp);
        assert!((scores["d2"] - 1.0).abs() < 1e-9);
        assert!((scores["d1"] - 0.5).abs() < 1e-9);
    }

    #[test]
    fn normalized_code_scores_ignores_fi_exact_and_only_uses_fi_norm() {
        let mut tp = TargetProfile::new();
        tp.insert("fi".to_string(), HashMap::from([("H04L1/00".to_string(), 1.0)]));
        let docs = HashMap::from([(
            "d1".to_string(),
            CodeLists { fi: vec!["H04L1/00A".to_string()], fi_norm: vec!["H04L1/00".to_string()], ..Default::default() },
        )]);
        let scores = normalized_code_scores(&docs, &tp);
        assert!((scores["d1"] - 1.0).abs() < 1e-9);
    }
}
