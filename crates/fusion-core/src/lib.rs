//! Core types, configuration, and error taxonomy for the patent fusion engine.
//!
//! This crate provides:
//! - Configuration management (`Config`, environment parsing)
//! - Data models (lanes, filters, search params, documents, runs, recipes)
//! - Identifiers & hashing (query hash, run-id minting, FI normalization)
//! - The 7-kind error taxonomy shared by every other crate in the workspace

#![forbid(unsafe_code)]

pub mod config;
pub mod error;
pub mod ids;
pub mod models;

pub use config::Config;
pub use error::{Error, Result};
pub use ids::{mint_fusion_run_id, mint_lane_run_id, normalize_fi, query_hash};
pub use models::{
    CodeLists, ContributionShares, Document, DocumentFields, FacetLabel, FacetSpec, FeatureScope,
    FieldBoosts, FilterCondition, FilterField, FilterOp, Filters, FreqSummary, FrontierPoint,
    FusionMetrics, FusionRun, InlinePeekConfig, Lane, LaneRun, LogicalOp, MutateDelta,
    PeekStrategy, Recipe, Representative, SearchParams, SemanticStyle, Snippet, Taxonomy,
    TargetProfile, TopKFreq, Weights,
};
