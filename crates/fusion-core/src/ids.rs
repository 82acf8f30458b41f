//! Identifiers & hashing: stable query hashes, run-id minting, and
//! FI-subgroup normalization (spec.md component #1).

use rand::Rng;
use sha1::{Digest, Sha1};

use crate::models::Filters;

/// Stable hash over `(query_text, filters)`, used as the lane-ranking key
/// segment. Mirrors the original implementation's canonical-JSON + SHA-1
/// scheme: `sha1(json(payload, sorted keys))[:16]`.
#[must_use]
pub fn query_hash(query_text: &str, filters: &Filters) -> String {
    let filters_json = serde_json::to_value(filters).unwrap_or(serde_json::Value::Null);
    let payload = serde_json::json!({ "q": query_text, "filters": filters_json });
    let canonical = canonical_json(&payload);
    let mut hasher = Sha1::new();
    hasher.update(canonical.as_bytes());
    let digest = hasher.finalize();
    hex::encode(digest)[..16].to_string()
}

/// Serialize a JSON value with object keys sorted, matching Python's
/// `json.dumps(..., sort_keys=True, separators=(",", ":"))`.
fn canonical_json(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let mut parts = Vec::with_capacity(keys.len());
            for k in keys {
                let v = &map[k];
                parts.push(format!("{}:{}", serde_json::to_string(k).unwrap(), canonical_json(v)));
            }
            format!("{{{}}}", parts.join(","))
        }
        serde_json::Value::Array(items) => {
            let parts: Vec<String> = items.iter().map(canonical_json).collect();
            format!("[{}]", parts.join(","))
        }
        other => serde_json::to_string(other).unwrap_or_default(),
    }
}

/// Mint a lane run id: `{lane_prefix}-{8 hex}`.
#[must_use]
pub fn mint_lane_run_id(lane_prefix: &str) -> String {
    format!("{lane_prefix}-{}", random_hex(8))
}

/// Mint a fusion run id: `fusion-{10 hex}`.
#[must_use]
pub fn mint_fusion_run_id() -> String {
    format!("fusion-{}", random_hex(10))
}

fn random_hex(len: usize) -> String {
    let mut rng = rand::thread_rng();
    let bytes: Vec<u8> = (0..len.div_ceil(2)).map(|_| rng.r#gen::<u8>()).collect();
    hex::encode(bytes)[..len].to_string()
}

/// Normalize an FI code to subgroup form by stripping a trailing single
/// alphabetic edition letter (e.g. `H04L1/00A` -> `H04L1/00`). Idempotent:
/// `normalize_fi(normalize_fi(x)) == normalize_fi(x)`.
#[must_use]
pub fn normalize_fi(code: &str) -> String {
    let trimmed = code.trim();
    let mut chars = trimmed.chars();
    match chars.next_back() {
        Some(last) if last.is_ascii_alphabetic() => {
            let rest = &trimmed[..trimmed.len() - last.len_utf8()];
            if rest.ends_with(|c: char| c.is_ascii_digit()) {
                rest.to_string()
            } else {
                trimmed.to_string()
            }
        }
        _ => trimmed.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_hash_is_deterministic_and_order_independent() {
        let filters_a: Filters = vec![];
        let h1 = query_hash("widget", &filters_a);
        let h2 = query_hash("widget", &filters_a);
        assert_eq!(h1, h2);
        assert_eq!(h1.len(), 16);
    }

    #[test]
    fn query_hash_differs_for_different_queries() {
        let filters: Filters = vec![];
        assert_ne!(query_hash("a", &filters), query_hash("b", &filters));
    }

    #[test]
    fn lane_run_id_has_expected_shape() {
        let id = mint_lane_run_id("fulltext");
        assert!(id.starts_with("fulltext-"));
        assert_eq!(id.len(), "fulltext-".len() + 8);
    }

    #[test]
    fn fusion_run_id_has_expected_shape() {
        let id = mint_fusion_run_id();
        assert!(id.starts_with("fusion-"));
        assert_eq!(id.len(), "fusion-".len() + 10);
    }

    #[test]
    fn run_ids_are_unique_across_many_mints() {
        let mut seen = std::collections::HashSet::new();
        for _ in 0..500 {
            assert!(seen.insert(mint_fusion_run_id()));
        }
    }

    #[test]
    fn normalize_fi_strips_trailing_edition_letter() {
        assert_eq!(normalize_fi("H04L1/00A"), "H04L1/00");
    }

    #[test]
    fn normalize_fi_idempotent() {
        assert_eq!(normalize_fi("H04L1/00"), "H04L1/00");
        let once = normalize_fi("H04L1/00A");
        assert_eq!(normalize_fi(&once), once);
    }

    #[test]
    fn normalize_fi_leaves_codes_without_trailing_letter_unchanged() {
        assert_eq!(normalize_fi("H04L1/00"), "H04L1/00");
    }
}
