//! Top-k classification-code frequency aggregation over the fused ranking
//! (spec.md §4.4, eighth bullet).

use std::collections::HashMap;

use fusion_core::models::{CodeLists, Taxonomy, TopKFreq};

const TAXONOMIES: [Taxonomy; 4] = [Taxonomy::Ipc, Taxonomy::Cpc, Taxonomy::Fi, Taxonomy::Ft];

/// Count occurrences per taxonomy per code over the first `max(k_grid)`
/// fused docs, sorted descending by count (ties broken by code string for
/// determinism).
#[must_use]
pub fn aggregate_topk_freq(
    ordering: &[String],
    codes_by_doc: &HashMap<String, CodeLists>,
    k_grid: &[usize],
) -> TopKFreq {
    let cutoff = k_grid.iter().copied().max().unwrap_or(0).min(ordering.len());
    let mut counts: HashMap<Taxonomy, HashMap<String, u64>> = HashMap::new();

    for doc_id in &ordering[..cutoff] {
        let Some(codes) = codes_by_doc.get(doc_id) else {
            continue;
        };
        for taxonomy in TAXONOMIES {
            for code in codes.for_taxonomy(taxonomy) {
                *counts
                    .entry(taxonomy)
                    .or_default()
                    .entry(code.clone())
                    .or_insert(0) += 1;
            }
        }
    }

    let mut out = TopKFreq::new();
    for taxonomy in TAXONOMIES {
        let map = counts.remove(&taxonomy).unwrap_or_default();
        let mut pairs: Vec<(String, u64)> = map.into_iter().collect();
        pairs.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        out.insert(taxonomy.as_str().to_string(), pairs);
    }
    out
}
