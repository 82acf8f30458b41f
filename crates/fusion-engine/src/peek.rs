//! `peek_snippets`, `get_snippets`, `get_publication` (spec.md §4.5, §4.3).

use std::collections::HashMap;

use fusion_core::error::Error;
use fusion_core::models::{Document, PeekStrategy, Snippet};
use fusion_core::Result;
use fusion_search::{adjust_caps_for_budget, budget_snippets, shape_snippet};
use fusion_store::RunRecord;

use crate::engine::{elapsed_ms, Engine};
use crate::types::{PeekMeta, PeekRequest, PeekResponse};

const DEFAULT_PEEK_FIELDS: [&str; 2] = ["title", "abst"];
const DEFAULT_FIELD_CAP: i64 = 280;

impl Engine {
    fn ranking_key_for_run(&self, run_id: &str) -> Result<String> {
        match self.store.get_run_meta(run_id)? {
            Some(RunRecord::Fusion(run)) => Ok(fusion_store::keys::fusion_ranking(&run.run_id)),
            Some(RunRecord::Lane(run)) => {
                Ok(fusion_store::keys::lane_ranking(self.snapshot(), &run.query_hash, run.lane.prefix()))
            }
            None => Err(Error::not_found("run", run_id)),
        }
    }

    /// `peek_snippets(run_id, offset, limit, fields, budget_bytes, strategy)`
    /// (spec.md §4.5): resolve the window over a run's ranking, fetch docs,
    /// shape and byte-budget their snippets.
    pub fn peek_snippets(&self, req: PeekRequest) -> Result<PeekResponse> {
        let started = std::time::Instant::now();
        let key = self.ranking_key_for_run(&req.run_id)?;
        let total_docs = self.store.ranking_size(&key)?;

        let wanted_fields: Vec<String> = if req.fields.is_empty() {
            DEFAULT_PEEK_FIELDS.iter().map(|s| (*s).to_string()).collect()
        } else {
            req.fields.clone()
        };
        let cap = req.per_field_chars.map_or(DEFAULT_FIELD_CAP, |c| c as i64);
        let per_field_caps: HashMap<String, i64> = wanted_fields.iter().map(|f| (f.clone(), cap)).collect();
        let adjusted_caps = adjust_caps_for_budget(&per_field_caps, req.budget_bytes);

        let window_ids = self.resolve_window(&key, req.offset, req.limit, req.strategy)?;
        let docs = self.backfill_missing_docs(&window_ids, &wanted_fields)?;

        let snippets: Vec<Snippet> = window_ids
            .iter()
            .filter_map(|id| docs.get(id))
            .map(|doc| shape_snippet(&doc.doc_id, &doc.fields, &wanted_fields, &adjusted_caps))
            .collect();
        let retrieved = snippets.len();

        let budgeted = budget_snippets(snippets, req.budget_bytes);
        let returned = budgeted.snippets.len();
        let peek_cursor = if budgeted.truncated || returned < window_ids.len() {
            Some(req.offset as i64 + returned as i64)
        } else {
            None
        };

        Ok(PeekResponse {
            snippets: budgeted.snippets,
            meta: PeekMeta {
                used_bytes: budgeted.used_bytes,
                truncated: budgeted.truncated,
                peek_cursor,
                total_docs,
                retrieved,
                returned,
                took_ms: elapsed_ms(started),
            },
        })
    }

    /// Load persisted doc fields for `ids`, then back-fill any doc whose
    /// identifier fields or requested text fields are missing by calling
    /// `fetch_snippets` on the snippet-lane backend and upserting the
    /// result (spec.md §4.5 step 5).
    fn backfill_missing_docs(&self, ids: &[String], wanted_fields: &[String]) -> Result<HashMap<String, Document>> {
        let mut docs = self.store.get_docs(ids)?;
        let check_fields: Vec<&str> = wanted_fields
            .iter()
            .map(String::as_str)
            .chain(["app_doc_id", "app_id", "pub_id"])
            .collect();
        let missing: Vec<String> = ids
            .iter()
            .filter(|id| match docs.get(*id) {
                None => true,
                Some(doc) => check_fields.iter().any(|f| doc.fields.get(f).is_none()),
            })
            .cloned()
            .collect();
        if missing.is_empty() {
            return Ok(docs);
        }
        let Some(backend) = self.backends.get("fulltext") else {
            return Ok(docs);
        };
        let fetched = backend.fetch_snippets(&missing, wanted_fields, None)?;
        if !fetched.is_empty() {
            let values: Vec<Document> = fetched.values().cloned().collect();
            self.store.upsert_docs(&values)?;
            for (id, doc) in fetched {
                docs.insert(id, doc);
            }
        }
        Ok(docs)
    }

    fn resolve_window(
        &self,
        key: &str,
        offset: usize,
        limit: usize,
        strategy: PeekStrategy,
    ) -> Result<Vec<String>> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        match strategy {
            PeekStrategy::Linear => {
                let stop = offset as i64 + limit as i64 - 1;
                let rows = self.store.ranking_slice(key, offset as i64, stop, true)?;
                Ok(rows.into_iter().map(|(id, _)| id).collect())
            }
            PeekStrategy::Diverse => {
                let rows = self.store.ranking_slice(key, offset as i64, -1, true)?;
                if rows.is_empty() {
                    return Ok(Vec::new());
                }
                let ids: Vec<String> = rows.into_iter().map(|(id, _)| id).collect();
                let docs = self.store.get_docs(&ids)?;

                let mut bucket_order: Vec<String> = Vec::new();
                let mut buckets: HashMap<String, Vec<String>> = HashMap::new();
                for id in &ids {
                    let code = docs
                        .get(id)
                        .and_then(|d| d.codes.fi_norm.first().cloned())
                        .unwrap_or_else(|| "_unclassified".to_string());
                    if !buckets.contains_key(&code) {
                        bucket_order.push(code.clone());
                    }
                    buckets.entry(code).or_default().push(id.clone());
                }

                let mut cursors: HashMap<String, usize> = HashMap::new();
                let mut out = Vec::with_capacity(limit);
                loop {
                    if out.len() >= limit {
                        break;
                    }
                    let mut advanced = false;
                    for bucket_key in &bucket_order {
                        if out.len() >= limit {
                            break;
                        }
                        let bucket = &buckets[bucket_key];
                        let cursor = cursors.entry(bucket_key.clone()).or_insert(0);
                        if *cursor < bucket.len() {
                            out.push(bucket[*cursor].clone());
                            *cursor += 1;
                            advanced = true;
                        }
                    }
                    if !advanced {
                        break;
                    }
                }
                Ok(out)
            }
        }
    }

    /// `get_snippets(ids, fields, per_field_chars)` (spec.md §4.5): shape
    /// snippets for already-persisted docs with no ranking window or budget.
    pub fn get_snippets(
        &self,
        ids: &[String],
        fields: &[String],
        per_field_chars: Option<usize>,
    ) -> Result<Vec<Snippet>> {
        let wanted_fields: Vec<String> = if fields.is_empty() {
            DEFAULT_PEEK_FIELDS.iter().map(|s| (*s).to_string()).collect()
        } else {
            fields.to_vec()
        };
        let cap = per_field_chars.map_or(DEFAULT_FIELD_CAP, |c| c as i64);
        let per_field_caps: HashMap<String, i64> = wanted_fields.iter().map(|f| (f.clone(), cap)).collect();

        let docs = self.backfill_missing_docs(ids, &wanted_fields)?;
        Ok(ids
            .iter()
            .filter_map(|id| docs.get(id))
            .map(|doc| shape_snippet(&doc.doc_id, &doc.fields, &wanted_fields, &per_field_caps))
            .collect())
    }

    /// `get_publication(lane, ids, id_type, fields)` (spec.md §4.5): resolve
    /// publication identifiers through the named lane's backend and persist
    /// the returned doc records.
    pub fn get_publication(
        &self,
        lane: &str,
        ids: &[String],
        id_type: Option<&str>,
        fields: &[String],
    ) -> Result<HashMap<String, Document>> {
        let backend = self
            .backends
            .get(lane)
            .ok_or_else(|| Error::validation(format!("no backend registered for lane: {lane}")))?;
        let docs = backend.fetch_publication(ids, id_type, fields)?;
        let values: Vec<Document> = docs.values().cloned().collect();
        self.store.upsert_docs(&values)?;
        Ok(docs)
    }
}
