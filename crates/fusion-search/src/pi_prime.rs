//! π' (pi-prime): per-doc proxy relevance combining code, facet, and
//! lane-consistency scores through a logistic transform (spec.md §4.4, fifth
//! bullet).

/// Logistic transform `1 / (1 + e^(-x))`.
#[must_use]
pub fn logistic(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// Combine the three component scores with their weights and squash through
/// the logistic function so π' lies in `(0, 1)`.
#[must_use]
pub fn pi_prime(
    code_score: f64,
    facet_score: f64,
    lane_consistency: f64,
    weight_code: f64,
    weight_facet: f64,
    weight_lane: f64,
) -> f64 {
    let raw = weight_code * code_score + weight_facet * facet_score + weight_lane * lane_consistency;
    logistic(raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn logistic_of_zero_is_one_half() {
        assert!((logistic(0.0) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn logistic_stays_in_open_unit_interval() {
        for x in [-100.0, -1.0, 0.0, 1.0, 100.0] {
            let v = logistic(x);
            assert!(v > 0.0 && v < 1.0, "logistic({x}) = {v}");
        }
    }

    #[test]
    fn higher_component_scores_increase_pi_prime() {
        let low = pi_prime(0.0, 0.0, 0.0, 1.0, 1.0, 1.0);
        let high = pi_prime(1.0, 1.0, 1.0, 1.0, 1.0, 1.0);
        assert!(high > low);
    }
}
