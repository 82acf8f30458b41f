//! Lane-consistency scoring: how uniformly a doc ranks across lanes
//! (spec.md §4.4, fourth bullet).

use std::collections::HashMap;

/// `Σ weight/(rank+1)` across the lanes a doc appears in, normalized by the
/// maximum over all docs so values lie in `[0, 1]`.
#[must_use]
pub fn lane_consistency(
    lane_ranks: &HashMap<String, HashMap<String, usize>>,
    lane_weights: &HashMap<String, f64>,
) -> HashMap<String, f64> {
    let mut raw: HashMap<String, f64> = HashMap::new();
    for (doc_id, ranks) in lane_ranks {
        let mut sum = 0.0;
        for (lane_name, rank) in ranks {
            let weight = lane_weights.get(lane_name).copied().unwrap_or(1.0);
            sum += weight / (*rank as f64 + 1.0);
        }
        raw.insert(doc_id.clone(), sum);
    }
    let max = raw.values().copied().fold(0.0_f64, f64::max);
    if max <= 0.0 {
        return raw.into_keys().map(|k| (k, 0.0)).collect();
    }
    raw.into_iter().map(|(k, v)| (k, v / max)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_into_zero_one_range() {
        let mut ranks = HashMap::new();
        let mut d1 = HashMap::new();
        d1.insert("A".to_string(), 1usize);
        d1.insert("B".to_string(), 1usize);
        ranks.insert("d1".to_string(), d1);
        let mut d2 = HashMap::new();
        d2.insert("A".to_string(), 5usize);
        ranks.insert("d2".to_string(), d2);

        let weights = HashMap::from([("A".to_string(), 1.0), ("B".to_string(), 1.0)]);
        let result = lane_consistency(&ranks, &weights);
        assert_eq!(result["d1"], 1.0);
        assert!(result["d2"] < 1.0);
        assert!(result["d2"] > 0.0);
    }

    #[test]
    fn empty_input_yields_empty_output() {
        let result = lane_consistency(&HashMap::new(), &HashMap::new());
        assert!(result.is_empty());
    }
}
