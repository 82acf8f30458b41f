//! Representative re-prioritization: a presentation-only re-sort of the
//! fused ranking, never touching the canonical list (spec.md §4.4, ninth
//! bullet).

use fusion_core::models::Representative;

/// Re-sort `ordering` by `(label_priority, -score)`, where docs without a
/// registered representative get priority `3` (lowest). The canonical
/// `ordering`/`scores` pair passed in is never mutated by the caller; this
/// returns a fresh `priority_pairs` list.
#[must_use]
pub fn priority_pairs(
    ordering: &[(String, f64)],
    representatives: &[Representative],
) -> Vec<(String, f64)> {
    let priority_of = |doc_id: &str| -> u8 {
        representatives
            .iter()
            .find(|r| r.doc_id == doc_id)
            .map_or(3, |r| r.label.priority())
    };
    let mut out = ordering.to_vec();
    out.sort_by(|(a_id, a_score), (b_id, b_score)| {
        priority_of(a_id)
            .cmp(&priority_of(b_id))
            .then_with(|| b_score.partial_cmp(a_score).unwrap_or(std::cmp::Ordering::Equal))
    });
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use fusion_core::models::FacetLabel;

    #[test]
    fn representatives_float_to_front_by_label() {
        let ordering = vec![
            ("d1".to_string(), 0.9),
            ("d2".to_string(), 0.8),
            ("d3".to_string(), 0.7),
        ];
        let reps = vec![Representative {
            doc_id: "d3".to_string(),
            label: FacetLabel::A,
            reason: None,
        }];
        let result = priority_pairs(&ordering, &reps);
        assert_eq!(result[0].0, "d3");
        assert_eq!(result[1].0, "d1");
        assert_eq!(result[2].0, "d2");
    }

    #[test]
    fn no_representatives_preserves_score_order() {
        let ordering = vec![("d1".to_string(), 0.9), ("d2".to_string(), 0.5)];
        let result = priority_pairs(&ordering, &[]);
        assert_eq!(result, ordering);
    }
}
