//! `LaneBackend`: the trait adapters implement to serve a lane's search,
//! snippet, and publication-lookup requests (spec.md §4.2).

use std::collections::HashMap;

use fusion_core::error::Result;
use fusion_core::models::{Document, SearchParams};

/// A backend's raw search response: ranked docs plus any echoed trace id.
#[derive(Debug, Clone, Default)]
pub struct LaneSearchResponse {
    pub docs: Vec<Document>,
}

/// Capability a lane search/snippet/publication adapter implements.
/// `close()` must be idempotent — the registry may call it once per unique
/// instance even when that instance serves several lanes.
pub trait LaneBackend: Send + Sync {
    fn search(&self, params: &SearchParams, lane: &str) -> Result<LaneSearchResponse>;

    /// Back-fill doc text for `ids`; `per_field_chars` caps each field's
    /// length at the backend's own truncation (informational — shaping
    /// happens again downstream in `fusion-search::snippet`).
    fn fetch_snippets(
        &self,
        ids: &[String],
        fields: &[String],
        per_field_chars: Option<usize>,
    ) -> Result<HashMap<String, Document>>;

    /// Resolve publication identifiers (of `id_type`, when given) to full
    /// doc records. When `id_type` is absent the implementation resolves
    /// each raw identifier via its own "numbers search" first, failing with
    /// `Error::Integrity` if any identifier cannot be resolved.
    fn fetch_publication(
        &self,
        ids: &[String],
        id_type: Option<&str>,
        fields: &[String],
    ) -> Result<HashMap<String, Document>>;

    fn close(&self) -> Result<()> {
        Ok(())
    }
}
