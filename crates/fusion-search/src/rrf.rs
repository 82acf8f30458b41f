//! Reciprocal Rank Fusion with per-lane weights and role-bucketed
//! contributions (spec.md §4.4, first bullet).

use std::collections::HashMap;

/// One lane's ranked doc-id list as fed into RRF. Rank is derived from
/// position (1-based); the lane's own scores are not used by RRF itself.
#[derive(Debug, Clone)]
pub struct LaneInput {
    pub lane_name: String,
    /// Contribution-bucket role: `"recall"` for fulltext lanes, `"semantic"`
    /// for semantic/dense lanes.
    pub role: &'static str,
    pub weight: f64,
    pub doc_ids: Vec<String>,
}

/// Result of RRF scoring: cumulative score per doc, the rank (1-based) each
/// doc held in each lane, and per-role contribution shares.
#[derive(Debug, Clone, Default)]
pub struct RrfResult {
    /// Score accumulated so far per doc, in first-seen order.
    pub order: Vec<String>,
    pub scores: HashMap<String, f64>,
    /// doc_id -> lane_name -> 1-based rank.
    pub lane_ranks: HashMap<String, HashMap<String, usize>>,
    /// doc_id -> role -> contribution.
    pub contributions: HashMap<String, HashMap<String, f64>>,
}

impl RrfResult {
    fn touch(&mut self, doc_id: &str) {
        if !self.scores.contains_key(doc_id) {
            self.order.push(doc_id.to_string());
            self.scores.insert(doc_id.to_string(), 0.0);
        }
    }

    pub fn add(&mut self, doc_id: &str, amount: f64, bucket: &str) {
        self.touch(doc_id);
        *self.scores.get_mut(doc_id).expect("just touched") += amount;
        let bucket_map = self.contributions.entry(doc_id.to_string()).or_default();
        *bucket_map.entry(bucket.to_string()).or_insert(0.0) += amount;
    }
}

/// Score every doc appearing in any lane: `Σ weight / (rrf_k + rank)`,
/// 1-based rank, bucketed by lane role.
#[must_use]
pub fn rrf_score(lanes: &[LaneInput], rrf_k: f64) -> RrfResult {
    let mut result = RrfResult::default();
    for lane in lanes {
        for (idx, doc_id) in lane.doc_ids.iter().enumerate() {
            let rank = idx + 1;
            result
                .lane_ranks
                .entry(doc_id.clone())
                .or_default()
                .insert(lane.lane_name.clone(), rank);
            let contribution = lane.weight / (rrf_k + rank as f64);
            result.add(doc_id, contribution, lane.role);
        }
    }
    result
}

/// Stable-sort doc ids descending by score, breaking ties by first-seen
/// (insertion) order — invariant #2 of spec.md §3.
#[must_use]
pub fn stable_sort_desc(order: &[String], scores: &HashMap<String, f64>) -> Vec<(String, f64)> {
    let mut indexed: Vec<(usize, &String)> = order.iter().enumerate().collect();
    indexed.sort_by(|(ia, a), (ib, b)| {
        let sa = scores.get(*a).copied().unwrap_or(0.0);
        let sb = scores.get(*b).copied().unwrap_or(0.0);
        sb.partial_cmp(&sa)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(ia.cmp(ib))
    });
    indexed
        .into_iter()
        .map(|(_, doc_id)| (doc_id.clone(), scores.get(doc_id).copied().unwrap_or(0.0)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lane(name: &str, role: &'static str, weight: f64, docs: &[&str]) -> LaneInput {
        LaneInput {
            lane_name: name.to_string(),
            role,
            weight,
            doc_ids: docs.iter().map(|s| (*s).to_string()).collect(),
        }
    }

    /// Scenario 1 of spec.md §8: deterministic RRF fused top-4 ordering.
    #[test]
    fn deterministic_rrf_scenario() {
        let lanes = vec![
            lane("A", "recall", 1.0, &["d1", "d2", "d3"]),
            lane("B", "recall", 1.0, &["d2", "d3", "d4"]),
        ];
        let result = rrf_score(&lanes, 60.0);
        let fused = stable_sort_desc(&result.order, &result.scores);
        let ids: Vec<&str> = fused.iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(ids, vec!["d2", "d3", "d1", "d4"]);

        let d2 = result.scores["d2"];
        assert!((d2 - (1.0 / 61.0 + 1.0 / 61.0)).abs() < 1e-9);
        let d3 = result.scores["d3"];
        assert!((d3 - (1.0 / 63.0 + 1.0 / 62.0)).abs() < 1e-9);
    }

    #[test]
    fn rrf_is_deterministic_across_runs() {
        let lanes = vec![lane("A", "recall", 1.0, &["d1", "d2"])];
        let r1 = rrf_score(&lanes, 60.0);
        let r2 = rrf_score(&lanes, 60.0);
        assert_eq!(r1.scores, r2.scores);
    }

    #[test]
    fn ties_break_by_insertion_order() {
        let lanes = vec![lane("A", "recall", 1.0, &["d1", "d2"])];
        let mut result = rrf_score(&lanes, 60.0);
        // Force a tie.
        result.scores.insert("d1".to_string(), 0.5);
        result.scores.insert("d2".to_string(), 0.5);
        let fused = stable_sort_desc(&result.order, &result.scores);
        assert_eq!(fused[0].0, "d1");
        assert_eq!(fused[1].0, "d2");
    }
}
