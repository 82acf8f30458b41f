//! `RedisStore`: the production `StateStore`, backed by Redis sorted sets
//! and hashes (spec.md §4.1).
//!
//! Ambient supplement (SPEC_FULL.md §4.1, grounded on `original_source`
//! `storage.py`): raw Redis keys are prefixed with a single-letter type tag
//! (`z:` sorted sets, `h:` hashes, `n:` integer counters) ahead of the
//! slash-delimited path spec.md names. This is a storage-layer convention
//! only — it never changes the path segments the namespace contract governs.
//! The same source also interns classification-code strings into small
//! integers in a snapshot-scoped vocabulary before writing doc records, and
//! decodes them back on read; `RedisStore` keeps that behavior.

use std::collections::HashMap;
use std::sync::Mutex;

use fusion_core::error::{Error, Result};
use fusion_core::models::{CodeLists, Document, DocumentFields, FusionRun, LaneRun, Taxonomy};
use redis::Commands;

use crate::keys;
use crate::store::{RunRecord, StateStore};

const TAXONOMIES: [Taxonomy; 4] = [Taxonomy::Ipc, Taxonomy::Cpc, Taxonomy::Fi, Taxonomy::Ft];

#[derive(Debug, Clone, Copy)]
enum KeyKind {
    SortedSet,
    Hash,
    Counter,
}

impl KeyKind {
    const fn prefix(self) -> &'static str {
        match self {
            Self::SortedSet => "z:",
            Self::Hash => "h:",
            Self::Counter => "n:",
        }
    }
}

fn raw(kind: KeyKind, path: &str) -> String {
    format!("{}{path}", kind.prefix())
}

fn map_err(e: redis::RedisError) -> Error {
    Error::Internal(format!("redis error: {e}"))
}

pub struct RedisStore {
    conn: Mutex<redis::Connection>,
    snapshot: String,
    data_ttl_secs: u64,
    snippet_ttl_secs: u64,
}

impl RedisStore {
    pub fn connect(url: &str, snapshot: impl Into<String>, data_ttl_secs: u64, snippet_ttl_secs: u64) -> Result<Self> {
        let client = redis::Client::open(url).map_err(map_err)?;
        let conn = client.get_connection().map_err(map_err)?;
        Ok(Self {
            conn: Mutex::new(conn),
            snapshot: snapshot.into(),
            data_ttl_secs,
            snippet_ttl_secs,
        })
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, redis::Connection> {
        self.conn.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Map each distinct code string to an integer id, minting new ids via
    /// an atomic `INCRBY` when a code hasn't been seen before in this
    /// snapshot.
    fn intern_codes(&self, codes: &[String]) -> Result<HashMap<String, u64>> {
        if codes.is_empty() {
            return Ok(HashMap::new());
        }
        let mut con = self.lock();
        let forward_key = raw(KeyKind::Hash, &keys::code_vocab(&self.snapshot));
        let rev_key = raw(KeyKind::Hash, &keys::code_vocab_rev(&self.snapshot));
        let seq_key = raw(KeyKind::Counter, &keys::code_vocab_seq(&self.snapshot));

        let mut unique: Vec<String> = codes.to_vec();
        unique.sort();
        unique.dedup();

        let mut mapping = HashMap::new();
        let mut missing = Vec::new();
        for code in &unique {
            let existing: Option<u64> = con.hget(&forward_key, code).map_err(map_err)?;
            match existing {
                Some(id) => {
                    mapping.insert(code.clone(), id);
                }
                None => missing.push(code.clone()),
            }
        }
        if !missing.is_empty() {
            let count = missing.len() as i64;
            let next: i64 = con.incr(&seq_key, count).map_err(map_err)?;
            let start = next - count + 1;
            let mut pipe = redis::pipe();
            for (offset, code) in missing.iter().enumerate() {
                #[allow(clippy::cast_sign_loss)]
                let id = (start + offset as i64) as u64;
                mapping.insert(code.clone(), id);
                pipe.hset(&forward_key, code, id).ignore();
                pipe.hset(&rev_key, id, code).ignore();
            }
            pipe.query::<()>(&mut *con).map_err(map_err)?;
        }
        Ok(mapping)
    }

    fn decode_codes(&self, ids: &[u64]) -> Result<HashMap<u64, String>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let mut con = self.lock();
        let rev_key = raw(KeyKind::Hash, &keys::code_vocab_rev(&self.snapshot));
        let mut out = HashMap::new();
        for &id in ids {
            let code: Option<String> = con.hget(&rev_key, id).map_err(map_err)?;
            out.insert(id, code.unwrap_or_else(|| id.to_string()));
        }
        Ok(out)
    }

    fn encode_code_list(&self, mapping: &HashMap<String, u64>, codes: &[String]) -> String {
        let ids: Vec<u64> = codes.iter().filter_map(|c| mapping.get(c).copied()).collect();
        serde_json::to_string(&ids).unwrap_or_else(|_| "[]".to_string())
    }

    fn doc_payload(&self, doc: &Document, mapping: &HashMap<String, u64>) -> Vec<(String, String)> {
        let f = &doc.fields;
        let text = |s: &Option<String>| s.clone().unwrap_or_default();
        vec![
            ("title".to_string(), text(&f.title)),
            ("abst".to_string(), text(&f.abst)),
            ("claim".to_string(), text(&f.claim)),
            ("desc".to_string(), text(&f.desc)),
            ("app_date".to_string(), text(&f.app_date)),
            ("pub_date".to_string(), text(&f.pub_date)),
            ("applicants".to_string(), text(&f.applicants)),
            ("pub_id".to_string(), text(&f.pub_id)),
            ("app_id".to_string(), text(&f.app_id)),
            ("app_doc_id".to_string(), text(&f.app_doc_id)),
            ("exam_id".to_string(), text(&f.exam_id)),
            ("ipc_ids".to_string(), self.encode_code_list(mapping, &doc.codes.ipc)),
            ("cpc_ids".to_string(), self.encode_code_list(mapping, &doc.codes.cpc)),
            ("fi_ids".to_string(), self.encode_code_list(mapping, &doc.codes.fi)),
            ("fi_norm_ids".to_string(), self.encode_code_list(mapping, &doc.codes.fi_norm)),
            ("ft_ids".to_string(), self.encode_code_list(mapping, &doc.codes.ft)),
        ]
    }

    fn all_codes<'a>(docs: impl Iterator<Item = &'a Document>) -> Vec<String> {
        let mut all = Vec::new();
        for doc in docs {
            all.extend(doc.codes.ipc.iter().cloned());
            all.extend(doc.codes.cpc.iter().cloned());
            all.extend(doc.codes.fi.iter().cloned());
            all.extend(doc.codes.fi_norm.iter().cloned());
            all.extend(doc.codes.ft.iter().cloned());
        }
        all
    }
}

impl StateStore for RedisStore {
    fn put_lane_run(&self, snapshot: &str, run: &LaneRun, docs: &[Document]) -> Result<()> {
        let lane_key = raw(
            KeyKind::SortedSet,
            &keys::lane_ranking(snapshot, &run.query_hash, run.lane.prefix()),
        );
        let freq_key = raw(KeyKind::Hash, &keys::freq(&run.run_id, run.lane.prefix()));
        let run_key = raw(KeyKind::Hash, &keys::run(&run.run_id));

        let mapping = self.intern_codes(&Self::all_codes(docs.iter()))?;

        let mut con = self.lock();
        let mut pipe = redis::pipe();
        pipe.del(&lane_key).ignore();
        for (doc_id, score) in &run.ranking {
            pipe.zadd(&lane_key, doc_id, *score).ignore();
        }
        pipe.expire(&lane_key, self.data_ttl_secs as i64).ignore();

        for doc in docs {
            let doc_key = raw(KeyKind::Hash, &keys::doc(&doc.doc_id));
            pipe.hset_multiple(&doc_key, &self.doc_payload(doc, &mapping)).ignore();
            pipe.expire(&doc_key, self.snippet_ttl_secs as i64).ignore();
        }

        let empty_freq: HashMap<String, u64> = HashMap::new();
        for taxonomy in TAXONOMIES {
            let per_code = run.freq.get(taxonomy.as_str()).unwrap_or(&empty_freq);
            let json = serde_json::to_string(per_code).unwrap_or_else(|_| "{}".to_string());
            pipe.hset(&freq_key, taxonomy.as_str(), json).ignore();
        }
        pipe.expire(&freq_key, self.data_ttl_secs as i64).ignore();

        let record = RunRecord::Lane(run.clone());
        let meta_json = serde_json::to_string(&record).map_err(|e| Error::Internal(e.to_string()))?;
        pipe.hset(&run_key, "meta", meta_json).ignore();
        pipe.expire(&run_key, self.data_ttl_secs as i64).ignore();

        pipe.query::<()>(&mut *con).map_err(map_err)?;
        Ok(())
    }

    fn put_fusion_run(&self, run: &FusionRun) -> Result<()> {
        let ranking_key = raw(KeyKind::SortedSet, &keys::fusion_ranking(&run.run_id));
        let run_key = raw(KeyKind::Hash, &keys::run(&run.run_id));

        let mut con = self.lock();
        let mut pipe = redis::pipe();
        pipe.del(&ranking_key).ignore();
        for (doc_id, score) in &run.ranking {
            pipe.zadd(&ranking_key, doc_id, *score).ignore();
        }
        pipe.expire(&ranking_key, self.data_ttl_secs as i64).ignore();

        let record = RunRecord::Fusion(run.clone());
        let meta_json = serde_json::to_string(&record).map_err(|e| Error::Internal(e.to_string()))?;
        pipe.hset(&run_key, "meta", meta_json).ignore();
        pipe.expire(&run_key, self.data_ttl_secs as i64).ignore();

        pipe.query::<()>(&mut *con).map_err(map_err)?;
        Ok(())
    }

    fn upsert_docs(&self, docs: &[Document]) -> Result<()> {
        if docs.is_empty() {
            return Ok(());
        }
        let mapping = self.intern_codes(&Self::all_codes(docs.iter()))?;
        let mut con = self.lock();
        let mut pipe = redis::pipe();
        for doc in docs {
            let doc_key = raw(KeyKind::Hash, &keys::doc(&doc.doc_id));
            let payload = self.doc_payload(doc, &mapping);
            // Idempotent merge (spec.md §4.1 `upsert_docs`): only overwrite a
            // field the caller actually supplied a value for.
            let present: Vec<(String, String)> = payload
                .into_iter()
                .filter(|(field, value)| match field.as_str() {
                    "ipc_ids" => !doc.codes.ipc.is_empty(),
                    "cpc_ids" => !doc.codes.cpc.is_empty(),
                    "fi_ids" => !doc.codes.fi.is_empty(),
                    "fi_norm_ids" => !doc.codes.fi_norm.is_empty(),
                    "ft_ids" => !doc.codes.ft.is_empty(),
                    _ => !value.is_empty(),
                })
                .collect();
            pipe.hset_multiple(&doc_key, &present).ignore();
            pipe.expire(&doc_key, self.snippet_ttl_secs as i64).ignore();
        }
        pipe.query::<()>(&mut *con).map_err(map_err)?;
        Ok(())
    }

    fn get_run_meta(&self, run_id: &str) -> Result<Option<RunRecord>> {
        let run_key = raw(KeyKind::Hash, &keys::run(run_id));
        let mut con = self.lock();
        let raw_meta: Option<String> = con.hget(&run_key, "meta").map_err(map_err)?;
        match raw_meta {
            None => Ok(None),
            Some(json) => {
                let record: RunRecord = serde_json::from_str(&json).map_err(|e| Error::Internal(e.to_string()))?;
                Ok(Some(record))
            }
        }
    }

    fn set_run_meta(&self, run_id: &str, record: &RunRecord) -> Result<()> {
        let run_key = raw(KeyKind::Hash, &keys::run(run_id));
        let json = serde_json::to_string(record).map_err(|e| Error::Internal(e.to_string()))?;
        let mut con = self.lock();
        let _: () = con.hset(&run_key, "meta", json).map_err(map_err)?;
        let _: () = con.expire(&run_key, self.data_ttl_secs as i64).map_err(map_err)?;
        Ok(())
    }

    fn get_docs(&self, doc_ids: &[String]) -> Result<HashMap<String, Document>> {
        let mut con = self.lock();
        let mut out = HashMap::new();
        let mut all_ids: Vec<u64> = Vec::new();
        let mut raw_rows: Vec<(String, HashMap<String, String>)> = Vec::new();

        for doc_id in doc_ids {
            let doc_key = raw(KeyKind::Hash, &keys::doc(doc_id));
            let fields: HashMap<String, String> = con.hgetall(&doc_key).map_err(map_err)?;
            if fields.is_empty() {
                continue;
            }
            for suffix in ["ipc_ids", "cpc_ids", "fi_ids", "fi_norm_ids", "ft_ids"] {
                if let Some(json) = fields.get(suffix) {
                    if let Ok(ids) = serde_json::from_str::<Vec<u64>>(json) {
                        all_ids.extend(ids);
                    }
                }
            }
            raw_rows.push((doc_id.clone(), fields));
        }
        drop(con);

        let decoded = self.decode_codes(&all_ids)?;

        for (doc_id, fields) in raw_rows {
            let decode_list = |suffix: &str| -> Vec<String> {
                fields
                    .get(suffix)
                    .and_then(|json| serde_json::from_str::<Vec<u64>>(json).ok())
                    .unwrap_or_default()
                    .into_iter()
                    .map(|id| decoded.get(&id).cloned().unwrap_or_else(|| id.to_string()))
                    .collect()
            };
            let opt = |field: &str| -> Option<String> {
                fields.get(field).filter(|s| !s.is_empty()).cloned()
            };
            let doc_fields = DocumentFields {
                title: opt("title"),
                abst: opt("abst"),
                claim: opt("claim"),
                desc: opt("desc"),
                app_date: opt("app_date"),
                pub_date: opt("pub_date"),
                applicants: opt("applicants"),
                pub_id: opt("pub_id"),
                app_id: opt("app_id"),
                app_doc_id: opt("app_doc_id"),
                exam_id: opt("exam_id"),
            };
            let codes = CodeLists {
                ipc: decode_list("ipc_ids"),
                cpc: decode_list("cpc_ids"),
                fi: decode_list("fi_ids"),
                fi_norm: decode_list("fi_norm_ids"),
                ft: decode_list("ft_ids"),
            };
            out.insert(
                doc_id.clone(),
                Document {
                    doc_id,
                    score: 0.0,
                    codes,
                    fields: doc_fields,
                },
            );
        }
        Ok(out)
    }

    fn ranking_slice(&self, key: &str, start: i64, stop: i64, desc: bool) -> Result<Vec<(String, f64)>> {
        let raw_key = raw(KeyKind::SortedSet, key);
        let mut con = self.lock();
        let rows: Vec<(String, f64)> = if desc {
            con.zrevrange_withscores(&raw_key, start as isize, stop as isize).map_err(map_err)?
        } else {
            con.zrange_withscores(&raw_key, start as isize, stop as isize).map_err(map_err)?
        };
        Ok(rows)
    }

    fn ranking_size(&self, key: &str) -> Result<u64> {
        let raw_key = raw(KeyKind::SortedSet, key);
        let mut con = self.lock();
        let size: u64 = con.zcard(&raw_key).map_err(map_err)?;
        Ok(size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_prefixes_match_original_source_convention() {
        assert_eq!(raw(KeyKind::SortedSet, "fusion-ranking/x"), "z:fusion-ranking/x");
        assert_eq!(raw(KeyKind::Hash, "doc/x"), "h:doc/x");
        assert_eq!(raw(KeyKind::Counter, "code-vocab-seq/x"), "n:code-vocab-seq/x");
    }
}
