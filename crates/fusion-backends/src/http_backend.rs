//! `HttpLaneBackend`: shared HTTP plumbing for the upstream and
//! internal-dense backends (spec.md §4.2, grounded on
//! `original_source/mcp/backends/base.py`'s `HttpLaneBackend`).

use std::collections::HashMap;
use std::time::Duration;

use fusion_core::error::{Error, Result};
use fusion_core::models::{Document, SearchParams};

use crate::backend::{LaneBackend, LaneSearchResponse};
use crate::wire;

pub struct HttpLaneBackend {
    client: reqwest::blocking::Client,
    base_url: String,
    search_path: String,
    snippets_path: String,
    publications_path: String,
    numbers_path: String,
}

impl HttpLaneBackend {
    pub fn new(base_url: impl Into<String>, api_token: Option<&str>, timeout_secs: u64) -> Result<Self> {
        let mut headers = reqwest::header::HeaderMap::new();
        if let Some(token) = api_token {
            let value = format!("Bearer {token}");
            let mut header_value = reqwest::header::HeaderValue::from_str(&value)
                .map_err(|e| Error::Internal(format!("invalid api token: {e}")))?;
            header_value.set_sensitive(true);
            headers.insert(reqwest::header::AUTHORIZATION, header_value);
        }
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .default_headers(headers)
            .build()
            .map_err(|e| Error::Internal(format!("failed to build http client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.into(),
            search_path: "/search".to_string(),
            snippets_path: "/snippets".to_string(),
            publications_path: "/publications".to_string(),
            numbers_path: "/numbers".to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    fn post(&self, path: &str, body: &serde_json::Value) -> Result<Option<serde_json::Value>> {
        let response = self
            .client
            .post(self.url(path))
            .json(body)
            .send()
            .map_err(|e| Error::BackendTransport(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            let body_text = response.text().unwrap_or_default();
            let truncated: String = body_text.chars().take(512).collect();
            return Err(Error::BackendHttp {
                status: status.as_u16(),
                body: truncated,
            });
        }
        let json = response
            .json::<serde_json::Value>()
            .map_err(|e| Error::BackendTransport(e.to_string()))?;
        Ok(Some(json))
    }

    /// Resolve raw identifiers (of unknown type) to app-doc ids via the
    /// backend's "numbers search" endpoint. Fails explicitly if any
    /// identifier has no match (spec.md §4.2, §7 scenario "Integrity").
    fn resolve_via_numbers_search(&self, ids: &[String]) -> Result<Vec<String>> {
        let body = serde_json::json!({ "numbers": ids });
        let Some(payload) = self.post(&self.numbers_path, &body)? else {
            return Err(Error::Integrity(format!(
                "numbers search returned no matches for: {}",
                ids.join(", ")
            )));
        };
        let Some(mapping) = payload.as_object() else {
            return Err(Error::Integrity("numbers search returned a malformed response".to_string()));
        };
        let mut resolved = Vec::with_capacity(ids.len());
        for id in ids {
            match mapping.get(id).and_then(serde_json::Value::as_str) {
                Some(app_doc_id) if !app_doc_id.is_empty() => resolved.push(app_doc_id.to_string()),
                _ => return Err(Error::Integrity(format!("could not resolve identifier: {id}"))),
            }
        }
        Ok(resolved)
    }
}

impl LaneBackend for HttpLaneBackend {
    fn search(&self, params: &SearchParams, lane: &str) -> Result<LaneSearchResponse> {
        let path = format!("{}/{lane}", self.search_path);
        let body = serde_json::to_value(params).map_err(|e| Error::Internal(e.to_string()))?;
        let Some(payload) = self.post(&path, &body)? else {
            return Ok(LaneSearchResponse::default());
        };
        let docs = wire::extract_records(&payload)
            .into_iter()
            .filter_map(wire::record_to_document)
            .collect();
        Ok(LaneSearchResponse { docs })
    }

    fn fetch_snippets(
        &self,
        ids: &[String],
        fields: &[String],
        per_field_chars: Option<usize>,
    ) -> Result<HashMap<String, Document>> {
        let translated_fields: Vec<&str> = fields.iter().map(|f| wire::translate_field(f)).collect();
        let body = serde_json::json!({
            "ids": ids,
            "fields": translated_fields,
            "per_field_chars": per_field_chars,
        });
        let Some(payload) = self.post(&self.snippets_path, &body)? else {
            return Ok(HashMap::new());
        };
        Ok(wire::parse_field_map_response(&payload))
    }

    fn fetch_publication(
        &self,
        ids: &[String],
        id_type: Option<&str>,
        fields: &[String],
    ) -> Result<HashMap<String, Document>> {
        let resolved_ids = match id_type {
            Some(_) => ids.to_vec(),
            None => self.resolve_via_numbers_search(ids)?,
        };
        let translated_fields: Vec<&str> = fields.iter().map(|f| wire::translate_field(f)).collect();
        let body = serde_json::json!({
            "ids": resolved_ids,
            "id_type": id_type.unwrap_or("app_id"),
            "fields": translated_fields,
        });
        let Some(payload) = self.post(&self.publications_path, &body)? else {
            return Ok(HashMap::new());
        };
        Ok(wire::parse_field_map_response(&payload))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_joins_base_and_path_without_double_slash() {
        let backend = HttpLaneBackend::new("https://api.example.com/", None, 30).unwrap();
        assert_eq!(backend.url("/search/fulltext"), "https://api.example.com/search/fulltext");
    }
}
