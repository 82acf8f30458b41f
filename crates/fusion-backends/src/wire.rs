//! Wire-format translation between the canonical doc model and an upstream
//! patent API's field/column naming (spec.md §4.2, grounded on
//! `original_source/mcp/backends/patentfield.py`).

use std::collections::HashMap;

use fusion_core::models::{CodeLists, Document, DocumentFields};
use fusion_core::ids::normalize_fi;
use serde_json::Value;

/// Internal field name -> upstream column name.
pub const FIELD_COLUMN_MAP: &[(&str, &str)] = &[
    ("title", "title"),
    ("abst", "abstract"),
    ("claim", "claims"),
    ("desc", "description"),
    ("app_doc_id", "app_id"),
    ("pub_id", "pub_id"),
    ("exam_id", "exam_id"),
];

#[must_use]
pub fn translate_field(internal: &str) -> &str {
    FIELD_COLUMN_MAP
        .iter()
        .find(|(k, _)| *k == internal)
        .map_or(internal, |(_, v)| *v)
}

/// Extract a list-of-object payload from a response body that may wrap its
/// records under `records`, `results`, or `items`, or be a bare array.
#[must_use]
pub fn extract_records(payload: &Value) -> Vec<&serde_json::Map<String, Value>> {
    if let Some(obj) = payload.as_object() {
        for key in ["records", "results", "items"] {
            if let Some(Value::Array(items)) = obj.get(key) {
                return items.iter().filter_map(Value::as_object).collect();
            }
        }
    }
    if let Some(items) = payload.as_array() {
        return items.iter().filter_map(Value::as_object).collect();
    }
    Vec::new()
}

fn doc_id_from_record(record: &serde_json::Map<String, Value>) -> Option<String> {
    for key in ["app_id", "doc_id", "pub_id", "exam_id"] {
        if let Some(v) = record.get(key) {
            if let Some(s) = v.as_str() {
                if !s.is_empty() {
                    return Some(s.to_string());
                }
            }
        }
    }
    None
}

fn score_from_record(record: &serde_json::Map<String, Value>) -> f64 {
    record
        .get("_score")
        .or_else(|| record.get("score"))
        .and_then(Value::as_f64)
        .unwrap_or(0.0)
}

fn codes_from_record(record: &serde_json::Map<String, Value>, key: &str) -> Vec<String> {
    record
        .get(key)
        .and_then(Value::as_array)
        .map(|arr| arr.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
        .unwrap_or_default()
}

fn text_from_record(record: &serde_json::Map<String, Value>, key: &str) -> Option<String> {
    record.get(key).and_then(Value::as_str).map(str::to_string).filter(|s| !s.is_empty())
}

/// Translate one upstream record into the canonical [`Document`] model,
/// undoing the `FIELD_COLUMN_MAP` translation and deriving `fi_norm`.
#[must_use]
pub fn record_to_document(record: &serde_json::Map<String, Value>) -> Option<Document> {
    let doc_id = doc_id_from_record(record)?;
    let fi = codes_from_record(record, "fis");
    let fi_norm = fi.iter().map(|c| normalize_fi(c)).collect();
    Some(Document {
        doc_id,
        score: score_from_record(record),
        codes: CodeLists {
            ipc: codes_from_record(record, "ipcs"),
            cpc: codes_from_record(record, "cpcs"),
            fi,
            fi_norm,
            ft: codes_from_record(record, "fts"),
        },
        fields: DocumentFields {
            title: text_from_record(record, "title"),
            abst: text_from_record(record, "abstract"),
            claim: text_from_record(record, "claims"),
            desc: text_from_record(record, "description"),
            app_date: text_from_record(record, "app_date"),
            pub_date: text_from_record(record, "pub_date"),
            applicants: text_from_record(record, "applicants"),
            pub_id: text_from_record(record, "pub_id"),
            app_id: text_from_record(record, "app_id"),
            app_doc_id: text_from_record(record, "app_id"),
            exam_id: text_from_record(record, "exam_id"),
        },
    })
}

/// Parse a `fetch_snippets`/`fetch_publication` style response
/// (`doc_id -> {field -> text}`) into a `Document` map with empty code
/// lists (those endpoints return text only).
#[must_use]
pub fn parse_field_map_response(payload: &Value) -> HashMap<String, Document> {
    let Some(obj) = payload.as_object() else {
        return HashMap::new();
    };
    let mut out = HashMap::new();
    for (doc_id, fields) in obj {
        let Some(field_map) = fields.as_object() else {
            continue;
        };
        out.insert(
            doc_id.clone(),
            Document {
                doc_id: doc_id.clone(),
                score: 0.0,
                codes: CodeLists::default(),
                fields: DocumentFields {
                    title: text_from_record(field_map, "title"),
                    abst: text_from_record(field_map, "abstract"),
                    claim: text_from_record(field_map, "claims"),
                    desc: text_from_record(field_map, "description"),
                    app_date: text_from_record(field_map, "app_date"),
                    pub_date: text_from_record(field_map, "pub_date"),
                    applicants: text_from_record(field_map, "applicants"),
                    pub_id: text_from_record(field_map, "pub_id"),
                    app_id: text_from_record(field_map, "app_id"),
                    app_doc_id: text_from_record(field_map, "app_id"),
                    exam_id: text_from_record(field_map, "exam_id"),
                },
            },
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn translate_known_field_maps_to_upstream_column() {
        assert_eq!(translate_field("abst"), "abstract");
        assert_eq!(translate_field("claim"), "claims");
        assert_eq!(translate_field("unknown_field"), "unknown_field");
    }

    #[test]
    fn extract_records_unwraps_records_key() {
        let payload = serde_json::json!({"records": [{"app_id": "JP1"}]});
        let records = extract_records(&payload);
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn extract_records_accepts_bare_array() {
        let payload = serde_json::json!([{"app_id": "JP1"}]);
        assert_eq!(extract_records(&payload).len(), 1);
    }

    #[test]
    fn record_to_document_derives_fi_norm() {
        let payload = serde_json::json!({"app_id": "JP1", "fis": ["H04L1/00A"]});
        let record = payload.as_object().unwrap();
        let doc = record_to_document(record).unwrap();
        assert_eq!(doc.codes.fi_norm, vec!["H04L1/00".to_string()]);
    }
}
