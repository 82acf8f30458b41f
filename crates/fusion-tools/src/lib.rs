//! MCP tool-surface adapter for the patent fusion engine (spec.md §4.6, §6).
//!
//! Every tool in this crate does the same three things before/after calling
//! into [`fusion_engine::Engine`]: coerce the caller's loose JSON arguments
//! into the engine's strict types, time the call, and shape engine errors
//! into the MCP error taxonomy. `adapter` holds that shared machinery;
//! `bootstrap` holds the process-wide `Engine` handle; one module per
//! operation cluster holds the `#[tool]`-annotated handlers themselves.

#![forbid(unsafe_code)]

pub mod adapter;
pub mod blend;
pub mod bootstrap;
pub mod peek;
pub mod provenance;
pub mod search;

pub use blend::*;
pub use peek::*;
pub use provenance::*;
pub use search::*;
