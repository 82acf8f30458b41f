//! Deterministic pseudorandom backend used in tests and local dev
//! (spec.md §4.2): given a query string and lane, produces a reproducible
//! ranked list, fixed text fields, and code lists. No network access.

use std::collections::HashMap;

use fusion_core::error::Result;
use fusion_core::ids::normalize_fi;
use fusion_core::models::{CodeLists, Document, DocumentFields, SearchParams};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sha1::{Digest, Sha1};

use crate::backend::{LaneBackend, LaneSearchResponse};

const IPC_PREFIXES: [&str; 5] = ["H04L", "G06F", "H01L", "G06N", "A61B"];
const CPC_PREFIXES: [&str; 5] = ["H04L29", "G06F17", "H01L21", "G06N3", "A61B5"];
const FT_PREFIXES: [&str; 3] = ["3K", "4C", "5B"];

fn seed_for(query: &str, lane: &str, salt: u64) -> u64 {
    let mut hasher = Sha1::new();
    hasher.update(query.as_bytes());
    hasher.update([0u8]);
    hasher.update(lane.as_bytes());
    hasher.update(salt.to_le_bytes());
    let digest = hasher.finalize();
    u64::from_le_bytes(digest[0..8].try_into().expect("sha1 digest is at least 8 bytes"))
}

fn rng_for(query: &str, lane: &str, salt: u64) -> StdRng {
    StdRng::seed_from_u64(seed_for(query, lane, salt))
}

fn query_text(params: &SearchParams) -> &str {
    match params {
        SearchParams::Fulltext { query, .. } => query,
        SearchParams::Semantic { text, .. } => text,
    }
}

fn top_k(params: &SearchParams) -> usize {
    match params {
        SearchParams::Fulltext { top_k, .. } | SearchParams::Semantic { top_k, .. } => *top_k,
    }
}

fn gen_codes(rng: &mut StdRng, prefixes: &[&str], count: usize, suffix_max: u32) -> Vec<String> {
    (0..count)
        .map(|_| {
            let prefix = prefixes[rng.r#gen::<usize>() % prefixes.len()];
            let suffix = rng.r#gen::<u32>() % suffix_max;
            format!("{prefix}/{suffix:04}")
        })
        .collect()
}

fn stub_document(doc_id: &str, rank: usize, rng: &mut StdRng) -> Document {
    let score = 1.0 / (1.0 + rank as f64 * 0.1);
    let ipc = gen_codes(rng, &IPC_PREFIXES, 2, 9999);
    let cpc = gen_codes(rng, &CPC_PREFIXES, 2, 9999);
    let fi_raw: Vec<String> = ipc.iter().map(|c| format!("{c}A")).collect();
    let fi_norm = fi_raw.iter().map(|c| normalize_fi(c)).collect();
    let ft = gen_codes(rng, &FT_PREFIXES, 1, 999);
    Document {
        doc_id: doc_id.to_string(),
        score,
        codes: CodeLists {
            ipc,
            cpc,
            fi: fi_raw,
            fi_norm,
            ft,
        },
        fields: DocumentFields {
            title: Some(format!("Stub patent title for {doc_id}")),
            abst: Some(format!("Stub abstract describing {doc_id} in deterministic detail.")),
            claim: Some(format!("1. A stub claim referencing {doc_id}.")),
            desc: Some(format!("Stub description body for {doc_id}.")),
            app_date: Some("2020-01-01".to_string()),
            pub_date: Some("2021-06-15".to_string()),
            applicants: Some("Stub Applicant Co., Ltd.".to_string()),
            pub_id: Some(format!("PUB-{doc_id}")),
            app_id: Some(doc_id.to_string()),
            app_doc_id: Some(doc_id.to_string()),
            exam_id: Some(format!("EX-{doc_id}")),
        },
    }
}

/// Deterministic pseudorandom generator backend; no network calls.
pub struct LocalStubBackend {
    doc_pool_size: usize,
}

impl LocalStubBackend {
    #[must_use]
    pub const fn new() -> Self {
        Self { doc_pool_size: 500 }
    }
}

impl Default for LocalStubBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl LaneBackend for LocalStubBackend {
    fn search(&self, params: &SearchParams, lane: &str) -> Result<LaneSearchResponse> {
        let query = query_text(params);
        let n = top_k(params).min(self.doc_pool_size);
        let mut selector = rng_for(query, lane, 0);
        let mut doc_rng = rng_for(query, lane, 1);
        let docs = (0..n)
            .map(|rank| {
                let doc_ordinal = selector.r#gen::<u32>() % self.doc_pool_size as u32;
                let doc_id = format!("STUB-{lane}-{doc_ordinal:06}");
                stub_document(&doc_id, rank, &mut doc_rng)
            })
            .collect();
        Ok(LaneSearchResponse { docs })
    }

    fn fetch_snippets(
        &self,
        ids: &[String],
        _fields: &[String],
        _per_field_chars: Option<usize>,
    ) -> Result<HashMap<String, Document>> {
        let mut rng = rng_for("snippets", "stub", 2);
        Ok(ids
            .iter()
            .map(|id| (id.clone(), stub_document(id, 0, &mut rng)))
            .collect())
    }

    fn fetch_publication(
        &self,
        ids: &[String],
        _id_type: Option<&str>,
        _fields: &[String],
    ) -> Result<HashMap<String, Document>> {
        let mut rng = rng_for("publication", "stub", 3);
        Ok(ids
            .iter()
            .map(|id| (id.clone(), stub_document(id, 0, &mut rng)))
            .collect())
    }
}
