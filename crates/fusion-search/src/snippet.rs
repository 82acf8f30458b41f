//! Snippet shaping: per-field truncation and global byte-budget capping with
//! a deterministic fallback for oversized first snippets (spec.md §4.3).

use fusion_core::models::{DocumentFields, Snippet};

/// Fields that ride along in every snippet regardless of what was requested.
const ALWAYS_INCLUDED: [&str; 3] = ["app_doc_id", "app_id", "pub_id"];

/// Minimum per-field character cap the proportional-shrink fallback will
/// not go below.
const MIN_FIELD_CHARS: usize = 16;

/// Truncate `text` to `cap` characters: `cap <= 0` yields `""`; `cap` at or
/// above the string's length is a no-op; otherwise keep `cap - 3` chars and
/// append `"..."`.
#[must_use]
pub fn truncate_field(text: &str, cap: i64) -> String {
    if cap <= 0 {
        return String::new();
    }
    let cap = cap as usize;
    let chars: Vec<char> = text.chars().collect();
    if chars.len() <= cap {
        return text.to_string();
    }
    let keep = cap.saturating_sub(3);
    let mut out: String = chars[..keep].iter().collect();
    out.push_str("...");
    out
}

/// Build one doc's snippet from its fields, requested field names, and
/// per-field caps. Identifier fields are always included even when absent
/// from `requested_fields`.
#[must_use]
pub fn shape_snippet(
    doc_id: &str,
    fields: &DocumentFields,
    requested_fields: &[String],
    per_field_caps: &std::collections::HashMap<String, i64>,
) -> Snippet {
    let mut wanted: Vec<String> = requested_fields.to_vec();
    for always in ALWAYS_INCLUDED {
        if !wanted.iter().any(|f| f == always) {
            wanted.push(always.to_string());
        }
    }

    let mut out = Snippet {
        doc_id: doc_id.to_string(),
        fields: std::collections::HashMap::new(),
    };
    for field in wanted {
        let Some(raw) = fields.get(&field) else {
            continue;
        };
        let cap = per_field_caps.get(&field).copied().unwrap_or(i64::MAX);
        out.fields.insert(field, truncate_field(raw, cap));
    }
    out
}

/// Scale `per_field_caps` down proportionally when the naive sum of caps
/// exceeds `budget - overhead` (`overhead = 64 + 24 * field_count`), never
/// below [`MIN_FIELD_CHARS`].
#[must_use]
pub fn adjust_caps_for_budget(
    per_field_caps: &std::collections::HashMap<String, i64>,
    budget_bytes: usize,
) -> std::collections::HashMap<String, i64> {
    let field_count = per_field_caps.len();
    if field_count == 0 {
        return per_field_caps.clone();
    }
    let overhead = 64 + 24 * field_count;
    let naive_sum: i64 = per_field_caps.values().sum();
    let available = budget_bytes as i64 - overhead as i64;
    if available <= 0 || naive_sum <= available {
        return per_field_caps.clone();
    }
    let ratio = available as f64 / naive_sum as f64;
    per_field_caps
        .iter()
        .map(|(field, &cap)| {
            let scaled = ((cap as f64) * ratio).floor() as i64;
            (field.clone(), scaled.max(MIN_FIELD_CHARS as i64))
        })
        .collect()
}

fn encoded_len(snippet: &Snippet) -> usize {
    serde_json::to_vec(snippet).map(|bytes| bytes.len()).unwrap_or(usize::MAX)
}

/// Result of byte-budgeting an ordered snippet sequence.
#[derive(Debug, Clone, Default)]
pub struct BudgetedSnippets {
    pub snippets: Vec<Snippet>,
    pub used_bytes: usize,
    pub truncated: bool,
}

/// Accumulate `snippets` in order, stopping at the first one that would push
/// the running JSON-encoded byte total past `budget_bytes`. If the very
/// first snippet alone exceeds the budget, fall back to progressively
/// smaller field sets (dropping non-identifier fields one at a time) down to
/// a single-element result, or an empty result if nothing fits.
#[must_use]
pub fn budget_snippets(snippets: Vec<Snippet>, budget_bytes: usize) -> BudgetedSnippets {
    let mut out = Vec::new();
    let mut used = 0usize;
    for snippet in snippets {
        let len = encoded_len(&snippet);
        if used + len > budget_bytes {
            if out.is_empty() {
                return fallback_shrink(snippet, budget_bytes);
            }
            return BudgetedSnippets {
                snippets: out,
                used_bytes: used,
                truncated: true,
            };
        }
        used += len;
        out.push(snippet);
    }
    BudgetedSnippets {
        snippets: out,
        used_bytes: used,
        truncated: false,
    }
}

/// Retry a single oversized snippet with progressively fewer non-identifier
/// fields, shrinking each remaining field's text down to [`MIN_FIELD_CHARS`].
fn fallback_shrink(mut snippet: Snippet, budget_bytes: usize) -> BudgetedSnippets {
    let mut droppable: Vec<String> = snippet
        .fields
        .keys()
        .filter(|f| !ALWAYS_INCLUDED.contains(&f.as_str()))
        .cloned()
        .collect();
    droppable.sort();

    loop {
        for (_, text) in snippet.fields.iter_mut() {
            *text = truncate_field(text, MIN_FIELD_CHARS as i64);
        }
        let len = encoded_len(&snippet);
        if len <= budget_bytes {
            return BudgetedSnippets {
                snippets: vec![snippet],
                used_bytes: len,
                truncated: true,
            };
        }
        let Some(next) = droppable.pop() else {
            return BudgetedSnippets {
                snippets: Vec::new(),
                used_bytes: 0,
                truncated: true,
            };
        };
        snippet.fields.remove(&next);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_is_noop_below_cap() {
        assert_eq!(truncate_field("hello", 10), "hello");
    }

    #[test]
    fn truncate_keeps_cap_minus_three_plus_ellipsis() {
        assert_eq!(truncate_field("hello world", 8), "hello...");
    }

    #[test]
    fn nonpositive_cap_yields_empty() {
        assert_eq!(truncate_field("hello", 0), "");
        assert_eq!(truncate_field("hello", -5), "");
    }

    #[test]
    fn identifier_fields_always_included() {
        let fields = DocumentFields {
            app_doc_id: Some("JP2020-1".to_string()),
            title: Some("A title".to_string()),
            ..Default::default()
        };
        let snippet = shape_snippet("d1", &fields, &[], &std::collections::HashMap::new());
        assert!(snippet.fields.contains_key("app_doc_id"));
        assert!(!snippet.fields.contains_key("title"));
    }

    #[test]
    fn budgeting_stops_before_exceeding() {
        let mut fields_a = std::collections::HashMap::new();
        fields_a.insert("title".to_string(), "x".repeat(200));
        let snippets = vec![
            Snippet {
                doc_id: "d1".to_string(),
                fields: fields_a.clone(),
            },
            Snippet {
                doc_id: "d2".to_string(),
                fields: fields_a,
            },
        ];
        let result = budget_snippets(snippets, 250);
        assert_eq!(result.snippets.len(), 1);
        assert!(result.truncated);
    }

    #[test]
    fn oversized_first_snippet_falls_back_to_shrunk_single_element() {
        let mut fields = std::collections::HashMap::new();
        fields.insert("title".to_string(), "x".repeat(5000));
        fields.insert("app_doc_id".to_string(), "JP2020-1".to_string());
        let snippet = Snippet {
            doc_id: "d1".to_string(),
            fields,
        };
        let result = budget_snippets(vec![snippet], 500);
        assert_eq!(result.snippets.len(), 1);
        assert!(result.used_bytes <= 500);
    }

    #[test]
    fn caps_scale_down_proportionally_over_budget() {
        let mut caps = std::collections::HashMap::new();
        caps.insert("title".to_string(), 1000);
        caps.insert("abst".to_string(), 1000);
        let adjusted = adjust_caps_for_budget(&caps, 300);
        assert!(adjusted["title"] < 1000);
        assert!(adjusted["title"] >= MIN_FIELD_CHARS as i64);
    }

    #[test]
    fn caps_unchanged_when_within_budget() {
        let mut caps = std::collections::HashMap::new();
        caps.insert("title".to_string(), 50);
        let adjusted = adjust_caps_for_budget(&caps, 10_000);
        assert_eq!(adjusted["title"], 50);
    }
}
