//! Family folding: a pre-RRF de-duplication pass that collapses documents
//! sharing the same normalized application family into one candidate,
//! retaining the best per-lane rank (SPEC_FULL.md §4.5, grounded on
//! `original_source/recipes.py`/`service.py`'s family-fragmentation
//! handling). On by default (`Recipe::family_fold == true`), matching
//! `service.py`'s own `blend(family_fold: bool = True)`; callers that want
//! fragmented (un-folded) families must opt out explicitly.

use std::collections::HashMap;

use crate::rrf::LaneInput;

/// Normalize an `app_doc_id` to its family key by stripping a trailing
/// `-NN` generation suffix (one or two digits), if present.
#[must_use]
pub fn family_key(app_doc_id: &str) -> String {
    if let Some(dash) = app_doc_id.rfind('-') {
        let suffix = &app_doc_id[dash + 1..];
        if !suffix.is_empty() && suffix.len() <= 2 && suffix.chars().all(|c| c.is_ascii_digit()) {
            return app_doc_id[..dash].to_string();
        }
    }
    app_doc_id.to_string()
}

/// Fold lane rankings: for each lane, when several doc ids resolve to the
/// same family, keep only the first (best-ranked) occurrence, rewritten to
/// a single representative doc id shared across all lanes. Docs with no
/// entry in `families` pass through unfolded (each is its own family).
#[must_use]
pub fn fold_lanes(lanes: &[LaneInput], families: &HashMap<String, String>) -> Vec<LaneInput> {
    let mut representative_of: HashMap<String, String> = HashMap::new();
    for lane in lanes {
        for doc_id in &lane.doc_ids {
            let key = families.get(doc_id).cloned().unwrap_or_else(|| doc_id.clone());
            representative_of.entry(key).or_insert_with(|| doc_id.clone());
        }
    }

    lanes
        .iter()
        .map(|lane| {
            let mut seen = std::collections::HashSet::new();
            let mut folded = Vec::with_capacity(lane.doc_ids.len());
            for doc_id in &lane.doc_ids {
                let key = families.get(doc_id).cloned().unwrap_or_else(|| doc_id.clone());
                let rep = representative_of.get(&key).cloned().unwrap_or_else(|| doc_id.clone());
                if seen.insert(rep.clone()) {
                    folded.push(rep);
                }
            }
            LaneInput {
                lane_name: lane.lane_name.clone(),
                role: lane.role,
                weight: lane.weight,
                doc_ids: folded,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn family_key_strips_generation_suffix() {
        assert_eq!(family_key("JP2020-123456-01"), "JP2020-123456");
        assert_eq!(family_key("JP2020-123456"), "JP2020-123456");
    }

    #[test]
    fn folding_collapses_family_members_to_one_representative() {
        let lanes = vec![LaneInput {
            lane_name: "A".to_string(),
            role: "recall",
            weight: 1.0,
            doc_ids: vec!["fam-01".to_string(), "other".to_string(), "fam-02".to_string()],
        }];
        let families = HashMap::from([
            ("fam-01".to_string(), "fam".to_string()),
            ("fam-02".to_string(), "fam".to_string()),
        ]);
        let folded = fold_lanes(&lanes, &families);
        assert_eq!(folded[0].doc_ids, vec!["fam-01".to_string(), "other".to_string()]);
    }

    #[test]
    fn no_families_leaves_lanes_unchanged() {
        let lanes = vec![LaneInput {
            lane_name: "A".to_string(),
            role: "recall",
            weight: 1.0,
            doc_ids: vec!["d1".to_string(), "d2".to_string()],
        }];
        let folded = fold_lanes(&lanes, &HashMap::new());
        assert_eq!(folded[0].doc_ids, lanes[0].doc_ids);
    }
}
