//! Facet coverage scoring: per-doc, per-facet synonym matching against
//! weighted text fields (spec.md §4.4, third bullet).

use fusion_core::models::{DocumentFields, FacetLabel, FacetSpec};

const CLAIM_WEIGHT: f64 = 0.5;
const ABST_WEIGHT: f64 = 0.3;
const DESC_WEIGHT: f64 = 0.2;

/// Whether any synonym in the cluster appears (case-insensitively) in the
/// text as a substring.
fn matches_any(text: &str, synonyms: &[String]) -> bool {
    let lower = text.to_lowercase();
    synonyms.iter().any(|s| lower.contains(&s.to_lowercase()))
}

/// Per-facet coverage: `1.0` if any synonym matches claim/abst/desc
/// (weighted 0.5/0.3/0.2), else the weighted sum of matching fields only —
/// i.e. a weighted OR across the three fields.
fn facet_field_score(fields: &DocumentFields, synonyms: &[String]) -> f64 {
    let mut score = 0.0;
    if let Some(claim) = fields.claim.as_deref() {
        if matches_any(claim, synonyms) {
            score += CLAIM_WEIGHT;
        }
    }
    if let Some(abst) = fields.abst.as_deref() {
        if matches_any(abst, synonyms) {
            score += ABST_WEIGHT;
        }
    }
    if let Some(desc) = fields.desc.as_deref() {
        if matches_any(desc, synonyms) {
            score += DESC_WEIGHT;
        }
    }
    score
}

/// Combine per-facet scores into one doc-level facet score, weighted by the
/// facet weights (default A=0.5, B=0.3, C=0.2, configurable). Empty facet
/// input yields a uniform score of 1.0, per spec.md §4.4.
#[must_use]
pub fn facet_score(
    fields: &DocumentFields,
    facets: &[FacetSpec],
    facet_weights: Option<&[(FacetLabel, f64)]>,
) -> f64 {
    if facets.is_empty() {
        return 1.0;
    }
    let weight_of = |label: FacetLabel| -> f64 {
        facet_weights
            .and_then(|ws| ws.iter().find(|(l, _)| *l == label).map(|(_, w)| *w))
            .unwrap_or_else(|| label.default_weight())
    };
    let mut weighted_sum = 0.0;
    let mut weight_total = 0.0;
    for facet in facets {
        let w = weight_of(facet.label);
        weighted_sum += w * facet_field_score(fields, &facet.synonyms);
        weight_total += w;
    }
    if weight_total <= 0.0 {
        return 1.0;
    }
    weighted_sum / weight_total
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_facets_yield_uniform_score() {
        let fields = DocumentFields::default();
        assert_eq!(facet_score(&fields, &[], None), 1.0);
    }

    #[test]
    fn case_insensitive_substring_match_in_claim() {
        let fields = DocumentFields {
            claim: Some("A Widget Assembly".to_string()),
            ..Default::default()
        };
        let facets = vec![FacetSpec {
            label: FacetLabel::A,
            synonyms: vec!["widget".to_string()],
        }];
        let score = facet_score(&fields, &facets, None);
        assert!((score - 1.0).abs() < 1e-9);
    }

    #[test]
    fn no_match_yields_zero() {
        let fields = DocumentFields {
            claim: Some("unrelated text".to_string()),
            ..Default::default()
        };
        let facets = vec![FacetSpec {
            label: FacetLabel::A,
            synonyms: vec!["widget".to_string()],
        }];
        assert_eq!(facet_score(&fields, &facets, None), 0.0);
    }

    #[test]
    fn weighted_sum_across_multiple_facets() {
        let fields = DocumentFields {
            claim: Some("widget".to_string()),
            abst: Some("gadget".to_string()),
            ..Default::default()
        };
        let facets = vec![
            FacetSpec {
                label: FacetLabel::A,
                synonyms: vec!["widget".to_string()],
            },
            FacetSpec {
                label: FacetLabel::B,
                synonyms: vec!["gadget".to_string()],
            },
        ];
        // A matches claim (0.5) weighted 0.5; B matches abst (0.3) weighted 0.3.
        let score = facet_score(&fields, &facets, None);
        let expected = (0.5 * 0.5 + 0.3 * 0.3) / (0.5 + 0.3);
        assert!((score - expected).abs() < 1e-9);
    }
}
