//! Fusion-quality diagnostics computed purely from lane agreement, code
//! concentration, and score shape — no ground truth (spec.md §4.4, seventh
//! bullet).

use std::collections::HashMap;

use fusion_core::models::FusionMetrics;

const TOP_N: usize = 50;
const BETA_DEFAULT: f64 = 1.0;
const LAMBDA_DEFAULT: f64 = 0.5;

/// Mean pairwise Jaccard similarity over all lane top-50 sets. `0.0` if
/// there is only one lane (or none).
#[must_use]
pub fn lane_agreement_score(lane_top_sets: &[Vec<String>]) -> f64 {
    if lane_top_sets.len() < 2 {
        return 0.0;
    }
    let sets: Vec<std::collections::HashSet<&str>> = lane_top_sets
        .iter()
        .map(|v| v.iter().map(String::as_str).collect())
        .collect();
    let mut total = 0.0;
    let mut pairs = 0usize;
    for i in 0..sets.len() {
        for j in (i + 1)..sets.len() {
            let inter = sets[i].intersection(&sets[j]).count();
            let union = sets[i].union(&sets[j]).count();
            let jaccard = if union == 0 { 0.0 } else { inter as f64 / union as f64 };
            total += jaccard;
            pairs += 1;
        }
    }
    if pairs == 0 { 0.0 } else { total / pairs as f64 }
}

/// Code-concentration weight: `1 - H/log(n_unique)` over the distribution of
/// the first FI-subgroup code per doc. `0.0` if no docs have codes, `1.0` if
/// only a single distinct code appears.
#[must_use]
pub fn code_concentration_weight(first_fi_codes: &[String]) -> f64 {
    if first_fi_codes.is_empty() {
        return 0.0;
    }
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for code in first_fi_codes {
        *counts.entry(code.as_str()).or_insert(0) += 1;
    }
    if counts.len() == 1 {
        return 1.0;
    }
    let total = first_fi_codes.len() as f64;
    let entropy: f64 = counts
        .values()
        .map(|&c| {
            let p = c as f64 / total;
            -p * p.ln()
        })
        .sum();
    let max_entropy = (counts.len() as f64).ln();
    if max_entropy <= 0.0 {
        1.0
    } else {
        (1.0 - entropy / max_entropy).clamp(0.0, 1.0)
    }
}

/// Ratio of sum-of-top-3 fused scores to sum-of-top-50 fused scores. `0.0`
/// if the top-50 total is non-positive.
#[must_use]
pub fn s_shape(top_50_scores: &[f64]) -> f64 {
    let top3: f64 = top_50_scores.iter().take(3).sum();
    let total: f64 = top_50_scores.iter().take(TOP_N).sum();
    if total <= 0.0 { 0.0 } else { top3 / total }
}

fn f_beta_shaped(las: f64, ccw: f64, beta: f64) -> f64 {
    let beta_sq = beta * beta;
    let denom = beta_sq * las + ccw;
    if denom <= 0.0 {
        0.0
    } else {
        (1.0 + beta_sq) * las * ccw / denom
    }
}

/// Compute the full [`FusionMetrics`] bundle over the top-50 fused docs.
#[must_use]
pub fn compute_metrics(
    lane_top_sets: &[Vec<String>],
    first_fi_codes: &[String],
    top_50_scores: &[f64],
) -> FusionMetrics {
    let las = lane_agreement_score(lane_top_sets);
    let ccw = code_concentration_weight(first_fi_codes);
    let shape = s_shape(top_50_scores);
    let f_struct = f_beta_shaped(las, ccw, BETA_DEFAULT);
    let fproxy = f_struct * (1.0 - LAMBDA_DEFAULT * shape).max(0.0);
    FusionMetrics {
        las,
        ccw,
        s_shape: shape,
        f_struct,
        beta_struct: BETA_DEFAULT,
        fproxy,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn las_is_zero_for_single_lane() {
        assert_eq!(lane_agreement_score(&[vec!["d1".into()]]), 0.0);
    }

    #[test]
    fn las_is_one_for_identical_sets() {
        let a = vec!["d1".to_string(), "d2".to_string()];
        let b = a.clone();
        assert!((lane_agreement_score(&[a, b]) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn ccw_is_zero_with_no_codes() {
        assert_eq!(code_concentration_weight(&[]), 0.0);
    }

    #[test]
    fn ccw_is_one_with_single_code() {
        let codes = vec!["H04L1/00".to_string(); 5];
        assert_eq!(code_concentration_weight(&codes), 1.0);
    }

    #[test]
    fn ccw_is_between_zero_and_one_for_mixed_codes() {
        let codes = vec![
            "H04L1/00".to_string(),
            "H04L1/00".to_string(),
            "G06F17/00".to_string(),
        ];
        let v = code_concentration_weight(&codes);
        assert!(v >= 0.0 && v < 1.0);
    }

    #[test]
    fn s_shape_zero_for_nonpositive_total() {
        assert_eq!(s_shape(&[0.0, 0.0]), 0.0);
    }

    #[test]
    fn s_shape_ratio_of_top3_to_top50() {
        let scores = vec![10.0, 5.0, 5.0, 1.0, 1.0];
        let shape = s_shape(&scores);
        assert!((shape - 20.0 / 22.0).abs() < 1e-9);
    }
}
