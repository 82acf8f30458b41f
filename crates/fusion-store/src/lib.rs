//! TTL-bounded state store for lane runs, fusion runs, document records,
//! code-frequency summaries, and the classification-code vocabulary
//! (spec.md §4.1).

#![forbid(unsafe_code)]

pub mod keys;
pub mod memory;
pub mod redis_store;
pub mod store;

pub use memory::MemoryStore;
pub use redis_store::RedisStore;
pub use store::{RunRecord, StateStore};
