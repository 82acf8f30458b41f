//! Tool-surface argument normalization, country default injection, error
//! shaping, and timing (spec.md §4.6, §9).

use std::collections::HashMap;
use std::time::Instant;

use fastmcp::McpErrorCode;
use fastmcp::prelude::*;
use fusion_core::error::Error as EngineError;
use fusion_core::models::{FilterCondition, FilterField, Filters, Lane, LogicalOp, FilterOp, TargetProfile};
use serde_json::{Value, json};

/// `fusion_core::error::Error` -> `McpError`, per spec.md §6 ("Exit / error
/// codes") and §7. The `error_type()`/`error_code()` classifiers already
/// carry the taxonomy; this only picks the JSON-RPC-level code bucket.
#[must_use]
pub fn error_to_mcp(e: &EngineError) -> McpError {
    let code = match e {
        EngineError::Validation(_) => McpErrorCode::InvalidParams,
        EngineError::Internal(_) => McpErrorCode::InternalError,
        EngineError::NotFound { .. }
        | EngineError::Precondition(_)
        | EngineError::BackendHttp { .. }
        | EngineError::BackendTransport(_)
        | EngineError::Integrity(_) => McpErrorCode::ToolExecutionError,
    };
    McpError::with_data(
        code,
        e.to_string(),
        json!({
            "error_type": e.error_type(),
            "error_code": e.error_code(),
            "recoverable": e.is_recoverable(),
        }),
    )
}

/// Record `took_ms` onto a response envelope. Tools call this around their
/// engine invocation rather than relying on the engine's own per-operation
/// timers, since the adapter is the boundary spec.md §4.6 assigns timing to.
pub fn timed<T>(f: impl FnOnce() -> T) -> (T, u64) {
    let started = Instant::now();
    let out = f();
    let took_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
    (out, took_ms)
}

/// Empty strings/arrays/objects for optional arguments collapse to `None`
/// (spec.md §4.6 "argument coercion").
#[must_use]
pub fn collapse_empty(v: Option<Value>) -> Option<Value> {
    match v {
        None => None,
        Some(Value::String(s)) if s.is_empty() => None,
        Some(Value::Array(a)) if a.is_empty() => None,
        Some(Value::Object(o)) if o.is_empty() => None,
        Some(Value::Null) => None,
        Some(other) => Some(other),
    }
}

/// `YYYYMMDD` -> `YYYY-MM-DD`; anything else passes through unchanged.
#[must_use]
pub fn coerce_date_string(s: &str) -> String {
    let bytes = s.as_bytes();
    if bytes.len() == 8 && bytes.iter().all(u8::is_ascii_digit) {
        format!("{}-{}-{}", &s[0..4], &s[4..6], &s[6..8])
    } else {
        s.to_string()
    }
}

fn coerce_date_value(v: &Value) -> Value {
    match v {
        Value::String(s) => Value::String(coerce_date_string(s)),
        Value::Array(items) => Value::Array(items.iter().map(coerce_date_value).collect()),
        other => other.clone(),
    }
}

fn parse_filter_field(s: &str) -> Result<FilterField, EngineError> {
    match s {
        "ipc" => Ok(FilterField::Ipc),
        "fi" => Ok(FilterField::Fi),
        "cpc" => Ok(FilterField::Cpc),
        "pubyear" => Ok(FilterField::Pubyear),
        "assignee" => Ok(FilterField::Assignee),
        "country" => Ok(FilterField::Country),
        "ft" => Ok(FilterField::Ft),
        other => Err(EngineError::validation(format!("unknown filter field: {other}"))),
    }
}

fn parse_logical_op(s: &str) -> Result<LogicalOp, EngineError> {
    match s {
        "and" => Ok(LogicalOp::And),
        "or" => Ok(LogicalOp::Or),
        "not" => Ok(LogicalOp::Not),
        other => Err(EngineError::validation(format!("unknown logical op: {other}"))),
    }
}

fn parse_filter_op(s: &str) -> Result<FilterOp, EngineError> {
    match s {
        "in" => Ok(FilterOp::In),
        "range" => Ok(FilterOp::Range),
        "eq" => Ok(FilterOp::Eq),
        "neq" => Ok(FilterOp::Neq),
        other => Err(EngineError::validation(format!("unknown filter op: {other}"))),
    }
}

/// Parse one filter condition, accepting either the flat canonical shape
/// (`{lop|logical_op, field, op, value}`) or the looser
/// `{field, include_values|include_codes|include_range}` shape the adapter
/// tolerates (spec.md §9 "loose filter normalization -> explicit parser").
fn parse_one_filter(obj: &serde_json::Map<String, Value>) -> Result<FilterCondition, EngineError> {
    let field_str = obj
        .get("field")
        .and_then(Value::as_str)
        .ok_or_else(|| EngineError::validation("filter condition missing 'field'"))?;
    let field = parse_filter_field(field_str)?;

    let logical_op = obj
        .get("logical_op")
        .or_else(|| obj.get("lop"))
        .and_then(Value::as_str)
        .map(parse_logical_op)
        .transpose()?
        .unwrap_or(LogicalOp::And);

    let (op, mut value) = if let (Some(op_str), Some(value)) = (obj.get("op").and_then(Value::as_str), obj.get("value")) {
        (parse_filter_op(op_str)?, value.clone())
    } else if let Some(values) = obj.get("include_values").or_else(|| obj.get("include_codes")) {
        (FilterOp::In, values.clone())
    } else if let Some(range) = obj.get("include_range") {
        (FilterOp::Range, range.clone())
    } else {
        return Err(EngineError::validation(
            "filter condition must carry 'op'+'value' or an include_* shorthand",
        ));
    };

    if matches!(field, FilterField::Pubyear) {
        value = coerce_date_value(&value);
    }

    Ok(FilterCondition {
        logical_op,
        field,
        op,
        value,
    })
}

/// Parse a JSON filter array into `Filters`, tolerating the loose shapes
/// documented in spec.md §4.6 and §9.
pub fn parse_filters(raw: Option<&Value>) -> Result<Filters, EngineError> {
    let Some(raw) = raw else {
        return Ok(Filters::new());
    };
    let Value::Array(items) = raw else {
        return Err(EngineError::validation("filters must be a JSON array"));
    };
    items
        .iter()
        .map(|item| {
            item.as_object()
                .ok_or_else(|| EngineError::validation("each filter condition must be a JSON object"))
                .and_then(parse_one_filter)
        })
        .collect()
}

/// Append `and / country / in / ["JP"]` when no condition already filters on
/// `country` (spec.md §4.6, testable property "country default").
pub fn ensure_country_default(filters: &mut Filters) {
    let has_country = filters.iter().any(|c| matches!(c.field, FilterField::Country));
    if !has_country {
        filters.push(FilterCondition {
            logical_op: LogicalOp::And,
            field: FilterField::Country,
            op: FilterOp::In,
            value: json!(["JP"]),
        });
    }
}

/// Lift a flat `code -> weight` dict into `{ipc: {code: weight}}` (spec.md
/// §9 ambiguity (3): "adapter sugar, not a core requirement"). Any value
/// already shaped as `{taxonomy: {code: weight}}` passes through unchanged.
#[must_use]
pub fn lift_target_profile(raw: Option<Value>) -> TargetProfile {
    let Some(Value::Object(obj)) = raw else {
        return TargetProfile::new();
    };
    let looks_nested = obj.values().all(Value::is_object);
    if looks_nested {
        return obj
            .into_iter()
            .map(|(taxonomy, codes)| {
                let codes: HashMap<String, f64> = codes
                    .as_object()
                    .into_iter()
                    .flat_map(|m| m.iter())
                    .map(|(code, w)| (code.clone(), w.as_f64().unwrap_or(0.0)))
                    .collect();
                (taxonomy, codes)
            })
            .collect();
    }
    let flat: HashMap<String, f64> = obj.into_iter().map(|(code, w)| (code, w.as_f64().unwrap_or(0.0))).collect();
    let mut profile = TargetProfile::new();
    profile.insert("ipc".to_string(), flat);
    profile
}

/// A `run_id`'s lane prefix determines its lane when a caller hands the
/// adapter a raw run-handle string (spec.md §4.6 "run handles may be
/// provided as strings").
#[must_use]
pub fn lane_from_run_id(run_id: &str) -> Option<Lane> {
    let prefix = run_id.split('-').next().unwrap_or(run_id);
    Lane::from_prefix(prefix)
}

/// Malformed-argument shaping: a loose JSON payload that fails to parse into
/// the type a tool needs becomes `InvalidParams`, not `InternalError`.
pub fn parse_error(context: &str, e: impl std::fmt::Display) -> McpError {
    McpError::new(McpErrorCode::InvalidParams, format!("{context}: {e}"))
}

/// Serialize a tool's response DTO to the JSON string `McpResult<String>`
/// expects.
pub fn to_json<T: serde::Serialize>(value: &T) -> McpResult<String> {
    serde_json::to_string(value).map_err(|e| McpError::internal_error(format!("response serialization error: {e}")))
}

/// Deserialize an optional loose JSON value into `T`, defaulting when absent.
pub fn from_value_or_default<T: serde::de::DeserializeOwned + Default>(
    raw: Option<Value>,
    context: &str,
) -> Result<T, McpError> {
    match raw {
        None => Ok(T::default()),
        Some(v) => serde_json::from_value(v).map_err(|e| parse_error(context, e)),
    }
}

/// Deserialize an optional loose JSON value into `Option<T>`, collapsing
/// `None`/absent to `None` rather than `T::default()`.
pub fn from_value_opt<T: serde::de::DeserializeOwned>(raw: Option<Value>, context: &str) -> Result<Option<T>, McpError> {
    raw.map(|v| serde_json::from_value(v).map_err(|e| parse_error(context, e))).transpose()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn date_coercion_reformats_compact_dates_only() {
        assert_eq!(coerce_date_string("20230101"), "2023-01-01");
        assert_eq!(coerce_date_string("2023-01-01"), "2023-01-01");
        assert_eq!(coerce_date_string("abc"), "abc");
    }

    #[test]
    fn empty_optional_args_collapse_to_none() {
        assert_eq!(collapse_empty(Some(Value::String(String::new()))), None);
        assert_eq!(collapse_empty(Some(json!([]))), None);
        assert_eq!(collapse_empty(Some(json!({}))), None);
        assert_eq!(collapse_empty(Some(json!("x"))), Some(json!("x")));
    }

    #[test]
    fn flat_filter_condition_parses() {
        let raw = json!([{"logical_op": "and", "field": "ipc", "op": "in", "value": ["H04L"]}]);
        let filters = parse_filters(Some(&raw)).unwrap();
        assert_eq!(filters.len(), 1);
        assert_eq!(filters[0].field, FilterField::Ipc);
    }

    #[test]
    fn loose_include_values_shorthand_parses_as_in() {
        let raw = json!([{"field": "cpc", "include_values": ["H01L21/00"]}]);
        let filters = parse_filters(Some(&raw)).unwrap();
        assert_eq!(filters.len(), 1);
        assert_eq!(filters[0].op, FilterOp::In);
    }

    #[test]
    fn pubyear_range_dates_are_reformatted() {
        let raw = json!([{"field": "pubyear", "op": "range", "value": ["20200101", "20211231"]}]);
        let filters = parse_filters(Some(&raw)).unwrap();
        assert_eq!(filters[0].value, json!(["2020-01-01", "2021-12-31"]));
    }

    #[test]
    fn country_default_appends_when_absent() {
        let mut filters: Filters = vec![];
        ensure_country_default(&mut filters);
        assert_eq!(filters.len(), 1);
        assert_eq!(filters[0].field, FilterField::Country);
        ensure_country_default(&mut filters);
        assert_eq!(filters.len(), 1, "must not duplicate an existing country filter");
    }

    #[test]
    fn flat_target_profile_lifts_into_ipc() {
        let raw = json!({"H04L": 1.0, "H01L21": 0.5});
        let profile = lift_target_profile(Some(raw));
        assert_eq!(profile.get("ipc").and_then(|m| m.get("H04L")), Some(&1.0));
    }

    #[test]
    fn nested_target_profile_passes_through() {
        let raw = json!({"fi": {"H04L1/00": 1.0}});
        let profile = lift_target_profile(Some(raw));
        assert_eq!(profile.get("fi").and_then(|m| m.get("H04L1/00")), Some(&1.0));
    }

    #[test]
    fn lane_prefix_detection_from_run_id() {
        assert_eq!(lane_from_run_id("fulltext-a1b2c3d4"), Some(Lane::Fulltext));
        assert_eq!(lane_from_run_id("semantic-a1b2c3d4"), Some(Lane::Semantic));
        assert_eq!(lane_from_run_id("fusion-a1b2c3d4aa"), None);
    }
}
