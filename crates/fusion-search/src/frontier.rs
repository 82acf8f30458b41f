//! Precision/recall/Fβ frontier over the fused ranking (spec.md §4.4, sixth
//! bullet).

use std::collections::HashMap;

use fusion_core::models::FrontierPoint;

/// Compute the frontier at each `k` in `k_grid` against the fused
/// `ordering` and per-doc π' scores. `(0, 0)` precision/recall yields an
/// `f_beta` of 0 rather than `NaN`.
#[must_use]
pub fn compute_frontier(
    ordering: &[String],
    pi_prime: &HashMap<String, f64>,
    k_grid: &[usize],
    beta: f64,
) -> Vec<FrontierPoint> {
    let total: f64 = ordering.iter().map(|d| pi_prime.get(d).copied().unwrap_or(0.0)).sum();
    let beta_sq = beta * beta;

    let mut points = Vec::with_capacity(k_grid.len());
    for &k in k_grid {
        let take = k.min(ordering.len());
        let sum_top: f64 = ordering[..take]
            .iter()
            .map(|d| pi_prime.get(d).copied().unwrap_or(0.0))
            .sum();
        let precision = if k > 0 { sum_top / k as f64 } else { 0.0 };
        let recall = if total > 0.0 { sum_top / total } else { 0.0 };
        let f_beta = if precision <= 0.0 && recall <= 0.0 {
            0.0
        } else {
            (1.0 + beta_sq) * precision * recall / (beta_sq * precision + recall)
        };
        points.push(FrontierPoint {
            k,
            precision,
            recall,
            f_beta,
        });
    }
    points
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Scenario 3 of spec.md §8.
    #[test]
    fn frontier_at_k2_with_binary_pi_prime() {
        let ordering: Vec<String> = ["d1", "d2", "d3", "d4"].iter().map(|s| s.to_string()).collect();
        let pi = HashMap::from([
            ("d1".to_string(), 1.0),
            ("d2".to_string(), 0.0),
            ("d3".to_string(), 1.0),
            ("d4".to_string(), 0.0),
        ]);
        let frontier = compute_frontier(&ordering, &pi, &[2], 1.0);
        assert_eq!(frontier.len(), 1);
        let p = frontier[0];
        assert!((p.precision - 0.5).abs() < 1e-9);
        assert!((p.recall - 0.5).abs() < 1e-9);
        assert!((p.f_beta - 0.5).abs() < 1e-9);
    }

    #[test]
    fn zero_precision_and_recall_yields_zero_f_beta() {
        let ordering: Vec<String> = ["d1"].iter().map(|s| s.to_string()).collect();
        let pi = HashMap::from([("d1".to_string(), 0.0)]);
        let frontier = compute_frontier(&ordering, &pi, &[1], 1.0);
        assert_eq!(frontier[0].f_beta, 0.0);
    }

    /// Frontier monotonicity property, spec.md §8.
    #[test]
    fn recall_is_monotonically_non_decreasing_in_k() {
        let ordering: Vec<String> = (0..10).map(|i| format!("d{i}")).collect();
        let pi: HashMap<String, f64> = ordering
            .iter()
            .enumerate()
            .map(|(i, d)| (d.clone(), if i % 2 == 0 { 1.0 } else { 0.0 }))
            .collect();
        let k_grid = vec![1, 2, 3, 4, 5, 6, 7, 8, 9, 10];
        let frontier = compute_frontier(&ordering, &pi, &k_grid, 1.0);
        for pair in frontier.windows(2) {
            assert!(pair[1].recall >= pair[0].recall - 1e-12);
        }
    }
}
