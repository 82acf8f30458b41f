//! Data model for the patent fusion engine.
//!
//! These types mirror spec.md §3 directly: lanes, filter conditions, the
//! `Fulltext | Semantic` search-parameter union, documents, lane/fusion runs,
//! representatives, recipes, and snippets.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// One of the three fixed retrieval channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Lane {
    Fulltext,
    Semantic,
    OriginalDense,
}

impl Lane {
    /// The prefix used when minting a lane run's `run_id`.
    #[must_use]
    pub const fn prefix(self) -> &'static str {
        match self {
            Self::Fulltext => "fulltext",
            Self::Semantic => "semantic",
            Self::OriginalDense => "original_dense",
        }
    }

    /// RRF contribution-bucket role: fulltext lanes recall, semantic lanes
    /// (including the dense variant) semantic. See spec.md §4.4.
    #[must_use]
    pub const fn role(self) -> &'static str {
        match self {
            Self::Fulltext => "recall",
            Self::Semantic | Self::OriginalDense => "semantic",
        }
    }

    #[must_use]
    pub fn from_prefix(s: &str) -> Option<Self> {
        match s {
            "fulltext" => Some(Self::Fulltext),
            "semantic" => Some(Self::Semantic),
            "original_dense" => Some(Self::OriginalDense),
            _ => None,
        }
    }
}

/// Classification taxonomies a document's codes may belong to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Taxonomy {
    Ipc,
    Cpc,
    Fi,
    Ft,
}

impl Taxonomy {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ipc => "ipc",
            Self::Cpc => "cpc",
            Self::Fi => "fi",
            Self::Ft => "ft",
        }
    }
}

/// Filterable fields on a filter condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterField {
    Ipc,
    Fi,
    Cpc,
    Pubyear,
    Assignee,
    Country,
    Ft,
}

/// Boolean conjunction role of a filter condition. No nested groups; a
/// `Filter` is a flat `Vec<FilterCondition>` evaluated left to right.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogicalOp {
    And,
    Or,
    Not,
}

/// Comparison applied between a field and its value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterOp {
    In,
    Range,
    Eq,
    Neq,
}

/// A single flat filter condition. `value` is left as JSON since its shape
/// depends on `op` (a list for `in`, a `[lo, hi]` pair for `range`, a scalar
/// otherwise).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterCondition {
    pub logical_op: LogicalOp,
    pub field: FilterField,
    pub op: FilterOp,
    pub value: serde_json::Value,
}

/// A flat conjunction of filter conditions. `field = fi` values are expected
/// to already carry both raw and normalized forms upstream of this type;
/// normalization itself lives in [`crate::ids::normalize_fi`].
pub type Filters = Vec<FilterCondition>;

/// Semantic-lane embedding style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SemanticStyle {
    Default,
    OriginalDense,
}

/// Semantic-lane feature scope: which document fields the embedding was
/// computed over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureScope {
    Wide,
    TitleAbstClaims,
    ClaimsOnly,
    TopClaim,
    BackgroundJp,
}

/// Per-field boost weights for a fulltext query.
pub type FieldBoosts = HashMap<String, f64>;

/// Search-parameter discriminated union. One variant per lane family (spec.md
/// §3, §9 "Dynamic union params -> tagged variant").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SearchParams {
    Fulltext {
        query: String,
        #[serde(default)]
        filters: Filters,
        #[serde(default)]
        fields: Vec<String>,
        #[serde(default = "default_top_k")]
        top_k: usize,
        #[serde(default)]
        field_boosts: Option<FieldBoosts>,
        #[serde(default)]
        trace_id: Option<String>,
    },
    Semantic {
        text: String,
        #[serde(default)]
        filters: Filters,
        #[serde(default)]
        fields: Vec<String>,
        #[serde(default = "default_top_k")]
        top_k: usize,
        #[serde(default)]
        style: SemanticStyle,
        #[serde(default)]
        feature_scope: Option<FeatureScope>,
        #[serde(default)]
        trace_id: Option<String>,
    },
}

impl Default for SemanticStyle {
    fn default() -> Self {
        Self::Default
    }
}

const fn default_top_k() -> usize {
    20
}

impl SearchParams {
    #[must_use]
    pub fn query_text(&self) -> &str {
        match self {
            Self::Fulltext { query, .. } => query,
            Self::Semantic { text, .. } => text,
        }
    }

    #[must_use]
    pub const fn filters(&self) -> &Filters {
        match self {
            Self::Fulltext { filters, .. } | Self::Semantic { filters, .. } => filters,
        }
    }

    pub fn filters_mut(&mut self) -> &mut Filters {
        match self {
            Self::Fulltext { filters, .. } | Self::Semantic { filters, .. } => filters,
        }
    }

    #[must_use]
    pub const fn top_k(&self) -> usize {
        match self {
            Self::Fulltext { top_k, .. } | Self::Semantic { top_k, .. } => *top_k,
        }
    }

    #[must_use]
    pub fn trace_id(&self) -> Option<&str> {
        match self {
            Self::Fulltext { trace_id, .. } | Self::Semantic { trace_id, .. } => {
                trace_id.as_deref()
            }
        }
    }
}

/// A document's classification codes, keyed by taxonomy. FI codes also carry
/// a derived `fi_norm` list (subgroup-normalized, edition letter stripped).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CodeLists {
    #[serde(default)]
    pub ipc: Vec<String>,
    #[serde(default)]
    pub cpc: Vec<String>,
    #[serde(default)]
    pub fi: Vec<String>,
    #[serde(default)]
    pub fi_norm: Vec<String>,
    #[serde(default)]
    pub ft: Vec<String>,
}

impl CodeLists {
    #[must_use]
    pub fn for_taxonomy(&self, t: Taxonomy) -> &[String] {
        match t {
            Taxonomy::Ipc => &self.ipc,
            Taxonomy::Cpc => &self.cpc,
            Taxonomy::Fi => &self.fi,
            Taxonomy::Ft => &self.ft,
        }
    }
}

/// Optional text fields and public identifiers for a document. Identifier
/// fields are always present in shaped snippets (possibly empty), per
/// spec.md §4.3.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentFields {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub abst: Option<String>,
    #[serde(default)]
    pub claim: Option<String>,
    #[serde(default)]
    pub desc: Option<String>,
    #[serde(default)]
    pub app_date: Option<String>,
    #[serde(default)]
    pub pub_date: Option<String>,
    #[serde(default)]
    pub applicants: Option<String>,
    #[serde(default)]
    pub pub_id: Option<String>,
    #[serde(default)]
    pub app_id: Option<String>,
    #[serde(default)]
    pub app_doc_id: Option<String>,
    #[serde(default)]
    pub exam_id: Option<String>,
}

impl DocumentFields {
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&str> {
        match field {
            "title" => self.title.as_deref(),
            "abst" => self.abst.as_deref(),
            "claim" => self.claim.as_deref(),
            "desc" => self.desc.as_deref(),
            "app_date" => self.app_date.as_deref(),
            "pub_date" => self.pub_date.as_deref(),
            "applicants" => self.applicants.as_deref(),
            "pub_id" => self.pub_id.as_deref(),
            "app_id" => self.app_id.as_deref(),
            "app_doc_id" => self.app_doc_id.as_deref(),
            "exam_id" => self.exam_id.as_deref(),
            _ => None,
        }
    }

    /// Merge incoming field values into `self`, overwriting only fields
    /// present (non-`None`) in `other` (spec.md §4.1 `upsert_docs`).
    pub fn merge_from(&mut self, other: &Self) {
        macro_rules! merge {
            ($($f:ident),*) => {
                $(if other.$f.is_some() { self.$f = other.$f.clone(); })*
            };
        }
        merge!(
            title, abst, claim, desc, app_date, pub_date, applicants, pub_id, app_id, app_doc_id,
            exam_id
        );
    }
}

/// A document as returned by a lane backend: a stable external id, a
/// relevance score in `[0, inf)`, classification codes, and optional text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub doc_id: String,
    pub score: f64,
    pub codes: CodeLists,
    #[serde(default)]
    pub fields: DocumentFields,
}

/// Per-taxonomy, per-code occurrence counts.
pub type FreqSummary = HashMap<String, HashMap<String, u64>>;

/// Result of executing one lane search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LaneRun {
    pub run_id: String,
    pub lane: Lane,
    pub query_hash: String,
    pub ranking: Vec<(String, f64)>,
    pub freq: FreqSummary,
    pub params: SearchParams,
    pub created_at_epoch_secs: i64,
}

/// Weights applied during RRF + code-boost scoring. `code_secondary` is
/// optional sugar: per spec.md §9 ambiguity (1), adopted as a weights-map key
/// defaulting to 0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Weights {
    #[serde(default)]
    pub lanes: HashMap<String, f64>,
    #[serde(default)]
    pub code: f64,
    #[serde(default)]
    pub code_secondary: f64,
    #[serde(default)]
    pub facet: f64,
    #[serde(default)]
    pub lane_consistency: f64,
}

impl Default for Weights {
    fn default() -> Self {
        Self {
            lanes: HashMap::new(),
            code: 0.0,
            code_secondary: 0.0,
            facet: 0.0,
            lane_consistency: 0.0,
        }
    }
}

/// Target profile: a prior over classification codes, by taxonomy.
pub type TargetProfile = HashMap<String, HashMap<String, f64>>;

/// A named facet with its synonym cluster, used for π' facet scoring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FacetSpec {
    pub label: FacetLabel,
    pub synonyms: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FacetLabel {
    A,
    B,
    C,
}

impl FacetLabel {
    #[must_use]
    pub const fn default_weight(self) -> f64 {
        match self {
            Self::A => 0.5,
            Self::B => 0.3,
            Self::C => 0.2,
        }
    }

    #[must_use]
    pub const fn priority(self) -> u8 {
        match self {
            Self::A => 0,
            Self::B => 1,
            Self::C => 2,
        }
    }
}

/// Inline peek config embedded in a `blend` request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InlinePeekConfig {
    pub count: usize,
    #[serde(default)]
    pub fields: Vec<String>,
    #[serde(default)]
    pub per_field_chars: Option<usize>,
    pub budget_bytes: usize,
}

/// A user-selected representative document, re-prioritizing presentation
/// order without altering the canonical fused ranking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Representative {
    pub doc_id: String,
    pub label: FacetLabel,
    #[serde(default)]
    pub reason: Option<String>,
}

/// Peek-ranking strategy. `Diverse` is a net-new addition with no
/// `original_source/` basis (SPEC_FULL.md §4.5): it interleaves docs
/// round-robin by their first FI-subgroup code instead of strict rank order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PeekStrategy {
    Linear,
    Diverse,
}

impl Default for PeekStrategy {
    fn default() -> Self {
        Self::Linear
    }
}

/// The immutable configuration that produced a fusion run. `mutate`
/// overlays a subset of these fields via [`MutateDelta`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recipe {
    pub weights: Weights,
    pub rrf_k: f64,
    pub beta: f64,
    #[serde(default)]
    pub target_profile: TargetProfile,
    #[serde(default)]
    pub facets: Vec<FacetSpec>,
    #[serde(default)]
    pub top_m_per_lane: HashMap<String, usize>,
    pub k_grid: Vec<usize>,
    #[serde(default)]
    pub peek: Option<InlinePeekConfig>,
    #[serde(default)]
    pub representatives: Vec<Representative>,
    /// Ambient sugar (SPEC_FULL.md §4.5): fold same-family documents before
    /// RRF scoring. On by default, matching `original_source/rrfusion/mcp/
    /// service.py`'s `blend(family_fold: bool = True)`; does not alter
    /// spec.md invariants.
    #[serde(default = "default_family_fold")]
    pub family_fold: bool,
    /// Raw delta payload, set only when this recipe was produced by `mutate`.
    #[serde(default)]
    pub delta: Option<serde_json::Value>,
}

const fn default_family_fold() -> bool {
    true
}

impl Default for Recipe {
    fn default() -> Self {
        Self {
            weights: Weights::default(),
            rrf_k: 60.0,
            beta: 1.0,
            target_profile: HashMap::new(),
            facets: Vec::new(),
            top_m_per_lane: HashMap::new(),
            k_grid: vec![5, 10, 20, 50],
            peek: None,
            representatives: Vec::new(),
            family_fold: default_family_fold(),
            delta: None,
        }
    }
}

/// Overlay applied to a parent recipe by `mutate`. `weights` merges
/// key-by-key; `rrf_k`/`beta` replace outright.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MutateDelta {
    #[serde(default)]
    pub weights: Option<Weights>,
    #[serde(default)]
    pub rrf_k: Option<f64>,
    #[serde(default)]
    pub beta: Option<f64>,
    #[serde(default)]
    pub target_profile: Option<TargetProfile>,
    /// Convenience sugar (SPEC_FULL.md §4.5): codes to add to/remove from
    /// `target_profile.ipc` before the rest of the delta applies.
    #[serde(default)]
    pub add_ipc: Vec<String>,
    #[serde(default)]
    pub drop_ipc: Vec<String>,
    /// Free-text annotation persisted into the child's `recipe.delta` for
    /// audit only; never read back by any operation.
    #[serde(default)]
    pub rollup_change: Option<String>,
}

/// Precision/recall/Fβ at one cutoff `k`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrontierPoint {
    pub k: usize,
    pub precision: f64,
    pub recall: f64,
    pub f_beta: f64,
}

/// Fusion-quality diagnostics, computed over the top-50 fused docs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FusionMetrics {
    pub las: f64,
    pub ccw: f64,
    pub s_shape: f64,
    pub f_struct: f64,
    /// The β used for `f_struct` (spec.md §3 stores it alongside `F_struct`
    /// even though today's only producer is the fixed default of 1.0).
    pub beta_struct: f64,
    pub fproxy: f64,
}

/// Per-doc, per-bucket contribution share (RRF role buckets plus `code` and
/// `code_secondary`), rounded to 3 dp, top 20 docs only.
pub type ContributionShares = HashMap<String, HashMap<String, f64>>;

/// Per-taxonomy, per-code frequency over the first `max(k_grid)` fused docs.
pub type TopKFreq = HashMap<String, Vec<(String, u64)>>;

/// Result of blending >=1 lane runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FusionRun {
    pub run_id: String,
    pub source_run_ids: Vec<String>,
    pub ranking: Vec<(String, f64)>,
    pub frontier: Vec<FrontierPoint>,
    pub topk_freq: TopKFreq,
    pub contributions: ContributionShares,
    pub recipe: Recipe,
    pub parent_run_id: Option<String>,
    pub lineage: Vec<String>,
    pub metrics: FusionMetrics,
    pub created_at_epoch_secs: i64,
}

/// A mapping `doc_id -> {field_name -> text}` with budgeting metadata.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Snippet {
    pub doc_id: String,
    pub fields: HashMap<String, String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lane_prefix_and_role() {
        assert_eq!(Lane::Fulltext.prefix(), "fulltext");
        assert_eq!(Lane::Fulltext.role(), "recall");
        assert_eq!(Lane::Semantic.role(), "semantic");
        assert_eq!(Lane::OriginalDense.role(), "semantic");
        assert_eq!(Lane::from_prefix("semantic"), Some(Lane::Semantic));
        assert_eq!(Lane::from_prefix("bogus"), None);
    }

    #[test]
    fn search_params_accessors() {
        let p = SearchParams::Fulltext {
            query: "q".into(),
            filters: vec![],
            fields: vec![],
            top_k: 10,
            field_boosts: None,
            trace_id: Some("t1".into()),
        };
        assert_eq!(p.query_text(), "q");
        assert_eq!(p.top_k(), 10);
        assert_eq!(p.trace_id(), Some("t1"));
    }

    #[test]
    fn document_fields_merge_only_present() {
        let mut base = DocumentFields {
            title: Some("old title".into()),
            abst: Some("abstract".into()),
            ..Default::default()
        };
        let incoming = DocumentFields {
            title: Some("new title".into()),
            ..Default::default()
        };
        base.merge_from(&incoming);
        assert_eq!(base.title.as_deref(), Some("new title"));
        assert_eq!(base.abst.as_deref(), Some("abstract"));
    }

    #[test]
    fn facet_label_defaults() {
        assert_eq!(FacetLabel::A.default_weight(), 0.5);
        assert_eq!(FacetLabel::B.default_weight(), 0.3);
        assert_eq!(FacetLabel::C.default_weight(), 0.2);
        assert_eq!(FacetLabel::A.priority(), 0);
        assert_eq!(FacetLabel::C.priority(), 2);
    }

    #[test]
    fn search_params_round_trip_json() {
        let p = SearchParams::Semantic {
            text: "widget".into(),
            filters: vec![],
            fields: vec!["claim".into()],
            top_k: 5,
            style: SemanticStyle::OriginalDense,
            feature_scope: Some(FeatureScope::ClaimsOnly),
            trace_id: None,
        };
        let json = serde_json::to_string(&p).unwrap();
        let back: SearchParams = serde_json::from_str(&json).unwrap();
        assert_eq!(p, back);
    }
}
