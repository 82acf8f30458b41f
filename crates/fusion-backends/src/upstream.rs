//! Thin, lane-tagged wrappers over [`HttpLaneBackend`] (spec.md §4.2).

use std::collections::HashMap;

use fusion_core::error::Result;
use fusion_core::models::{Document, SearchParams};

use crate::backend::{LaneBackend, LaneSearchResponse};
use crate::http_backend::HttpLaneBackend;

/// Primary patent-search backend: fulltext and semantic lanes.
pub struct UpstreamBackend {
    inner: HttpLaneBackend,
}

impl UpstreamBackend {
    pub fn new(base_url: impl Into<String>, api_token: Option<&str>, timeout_secs: u64) -> Result<Self> {
        Ok(Self {
            inner: HttpLaneBackend::new(base_url, api_token, timeout_secs)?,
        })
    }
}

impl LaneBackend for UpstreamBackend {
    fn search(&self, params: &SearchParams, lane: &str) -> Result<LaneSearchResponse> {
        self.inner.search(params, lane)
    }

    fn fetch_snippets(
        &self,
        ids: &[String],
        fields: &[String],
        per_field_chars: Option<usize>,
    ) -> Result<HashMap<String, Document>> {
        self.inner.fetch_snippets(ids, fields, per_field_chars)
    }

    fn fetch_publication(
        &self,
        ids: &[String],
        id_type: Option<&str>,
        fields: &[String],
    ) -> Result<HashMap<String, Document>> {
        self.inner.fetch_publication(ids, id_type, fields)
    }
}

/// Same interface as [`UpstreamBackend`], distinct endpoint, lane tag
/// `original_dense`, expects shorter prompts than the fulltext/semantic lanes.
pub struct InternalDenseBackend {
    inner: HttpLaneBackend,
}

impl InternalDenseBackend {
    pub fn new(base_url: impl Into<String>, api_token: Option<&str>, timeout_secs: u64) -> Result<Self> {
        Ok(Self {
            inner: HttpLaneBackend::new(base_url, api_token, timeout_secs)?,
        })
    }
}

impl LaneBackend for InternalDenseBackend {
    fn search(&self, params: &SearchParams, lane: &str) -> Result<LaneSearchResponse> {
        self.inner.search(params, lane)
    }

    fn fetch_snippets(
        &self,
        ids: &[String],
        fields: &[String],
        per_field_chars: Option<usize>,
    ) -> Result<HashMap<String, Document>> {
        self.inner.fetch_snippets(ids, fields, per_field_chars)
    }

    fn fetch_publication(
        &self,
        ids: &[String],
        id_type: Option<&str>,
        fields: &[String],
    ) -> Result<HashMap<String, Document>> {
        self.inner.fetch_publication(ids, id_type, fields)
    }
}
