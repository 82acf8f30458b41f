//! `MemoryStore`: a `HashMap`/sorted-`Vec`-based `StateStore` for hermetic
//! unit tests that don't want a live Redis (spec.md §4.1, SPEC_FULL.md §4.1).

use std::collections::HashMap;
use std::sync::Mutex;

use fusion_core::error::Result;
use fusion_core::models::{Document, FusionRun, LaneRun};

use crate::store::{RunRecord, StateStore};

#[derive(Default)]
struct Inner {
    rankings: HashMap<String, Vec<(String, f64)>>,
    docs: HashMap<String, Document>,
    runs: HashMap<String, RunRecord>,
}

/// An in-process `StateStore` with no TTL enforcement (entries live for the
/// store's lifetime), suited to orchestrator unit tests.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn sorted(mut ranking: Vec<(String, f64)>) -> Vec<(String, f64)> {
        ranking.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        ranking
    }
}

impl StateStore for MemoryStore {
    fn put_lane_run(&self, snapshot: &str, run: &LaneRun, docs: &[Document]) -> Result<()> {
        let key = crate::keys::lane_ranking(snapshot, &run.query_hash, run.lane.prefix());
        let mut inner = self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        inner.rankings.insert(key, Self::sorted(run.ranking.clone()));
        for doc in docs {
            inner.docs.insert(doc.doc_id.clone(), doc.clone());
        }
        inner.runs.insert(run.run_id.clone(), RunRecord::Lane(run.clone()));
        Ok(())
    }

    fn put_fusion_run(&self, run: &FusionRun) -> Result<()> {
        let key = crate::keys::fusion_ranking(&run.run_id);
        let mut inner = self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        inner.rankings.insert(key, Self::sorted(run.ranking.clone()));
        inner.runs.insert(run.run_id.clone(), RunRecord::Fusion(run.clone()));
        Ok(())
    }

    fn upsert_docs(&self, docs: &[Document]) -> Result<()> {
        let mut inner = self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        for doc in docs {
            inner
                .docs
                .entry(doc.doc_id.clone())
                .and_modify(|existing| existing.fields.merge_from(&doc.fields))
                .or_insert_with(|| doc.clone());
        }
        Ok(())
    }

    fn get_run_meta(&self, run_id: &str) -> Result<Option<RunRecord>> {
        let inner = self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        Ok(inner.runs.get(run_id).cloned())
    }

    fn set_run_meta(&self, run_id: &str, record: &RunRecord) -> Result<()> {
        let mut inner = self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        inner.runs.insert(run_id.to_string(), record.clone());
        Ok(())
    }

    fn get_docs(&self, doc_ids: &[String]) -> Result<HashMap<String, Document>> {
        let inner = self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        Ok(doc_ids
            .iter()
            .filter_map(|id| inner.docs.get(id).map(|d| (id.clone(), d.clone())))
            .collect())
    }

    fn ranking_slice(&self, key: &str, start: i64, stop: i64, desc: bool) -> Result<Vec<(String, f64)>> {
        let inner = self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let Some(ranking) = inner.rankings.get(key) else {
            return Ok(Vec::new());
        };
        let mut rows = ranking.clone();
        if !desc {
            rows.reverse();
        }
        let start = start.max(0) as usize;
        let end = if stop < 0 { rows.len() } else { (stop as usize + 1).min(rows.len()) };
        if start >= rows.len() || start >= end {
            return Ok(Vec::new());
        }
        Ok(rows[start..end].to_vec())
    }

    fn ranking_size(&self, key: &str) -> Result<u64> {
        let inner = self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        Ok(inner.rankings.get(key).map_or(0, |v| v.len() as u64))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fusion_core::models::{CodeLists, DocumentFields, FreqSummary, Lane, SearchParams};

    fn lane_run(run_id: &str, docs: &[(&str, f64)]) -> LaneRun {
        LaneRun {
            run_id: run_id.to_string(),
            lane: Lane::Fulltext,
            query_hash: "qh".to_string(),
            ranking: docs.iter().map(|(id, s)| ((*id).to_string(), *s)).collect(),
            freq: FreqSummary::new(),
            params: SearchParams::Fulltext {
                query: "widget".to_string(),
                filters: Vec::new(),
                fields: Vec::new(),
                top_k: 20,
                field_boosts: None,
                trace_id: None,
            },
            created_at_epoch_secs: 0,
        }
    }

    #[test]
    fn put_and_slice_round_trip() {
        let store = MemoryStore::new();
        let run = lane_run("fulltext-abcd1234", &[("d1", 0.9), ("d2", 0.5)]);
        let docs = vec![Document {
            doc_id: "d1".to_string(),
            score: 0.9,
            codes: CodeLists::default(),
            fields: DocumentFields::default(),
        }];
        store.put_lane_run("snap", &run, &docs).unwrap();
        let key = crate::keys::lane_ranking("snap", "qh", "fulltext");
        let slice = store.ranking_slice(&key, 0, -1, true).unwrap();
        assert_eq!(slice, vec![("d1".to_string(), 0.9), ("d2".to_string(), 0.5)]);
        assert_eq!(store.ranking_size(&key).unwrap(), 2);
    }

    #[test]
    fn upsert_docs_merges_fields() {
        let store = MemoryStore::new();
        let d1 = Document {
            doc_id: "d1".to_string(),
            score: 0.0,
            codes: CodeLists::default(),
            fields: DocumentFields {
                title: Some("Original".to_string()),
                ..Default::default()
            },
        };
        store.upsert_docs(&[d1]).unwrap();
        let d1_update = Document {
            doc_id: "d1".to_string(),
            score: 0.0,
            codes: CodeLists::default(),
            fields: DocumentFields {
                abst: Some("New abstract".to_string()),
                ..Default::default()
            },
        };
        store.upsert_docs(&[d1_update]).unwrap();
        let fetched = store.get_docs(&["d1".to_string()]).unwrap();
        let doc = &fetched["d1"];
        assert_eq!(doc.fields.title.as_deref(), Some("Original"));
        assert_eq!(doc.fields.abst.as_deref(), Some("New abstract"));
    }

    #[test]
    fn missing_run_meta_returns_none() {
        let store = MemoryStore::new();
        assert!(store.get_run_meta("nope").unwrap().is_none());
    }
}
