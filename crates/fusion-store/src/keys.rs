//! Namespace key builders (spec.md §4.1). These produce the path-segment
//! keys spec.md names; `RedisStore` layers a Redis-type-prefix byte on top
//! (SPEC_FULL.md §4.1 ambient supplement) without changing these segments.

/// `lane-ranking/{snapshot}/{query_hash}/{lane}`
#[must_use]
pub fn lane_ranking(snapshot: &str, query_hash: &str, lane: &str) -> String {
    format!("lane-ranking/{snapshot}/{query_hash}/{lane}")
}

/// `fusion-ranking/{run_id}`
#[must_use]
pub fn fusion_ranking(run_id: &str) -> String {
    format!("fusion-ranking/{run_id}")
}

/// `doc/{doc_id}`
#[must_use]
pub fn doc(doc_id: &str) -> String {
    format!("doc/{doc_id}")
}

/// `freq/{run_id}/{lane}`
#[must_use]
pub fn freq(run_id: &str, lane: &str) -> String {
    format!("freq/{run_id}/{lane}")
}

/// `run/{run_id}`
#[must_use]
pub fn run(run_id: &str) -> String {
    format!("run/{run_id}")
}

/// `code-vocab/{snapshot}` forward map (code string -> integer id).
#[must_use]
pub fn code_vocab(snapshot: &str) -> String {
    format!("code-vocab/{snapshot}")
}

/// `code-vocab-rev/{snapshot}` reverse map (integer id -> code string).
#[must_use]
pub fn code_vocab_rev(snapshot: &str) -> String {
    format!("code-vocab-rev/{snapshot}")
}

/// `code-vocab-seq/{snapshot}` monotonic id counter.
#[must_use]
pub fn code_vocab_seq(snapshot: &str) -> String {
    format!("code-vocab-seq/{snapshot}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lane_ranking_key_has_expected_segments() {
        assert_eq!(lane_ranking("snap1", "abc123", "fulltext"), "lane-ranking/snap1/abc123/fulltext");
    }

    #[test]
    fn fusion_ranking_key_is_run_id_scoped() {
        assert_eq!(fusion_ranking("fusion-deadbeef01"), "fusion-ranking/fusion-deadbeef01");
    }
}
