//! Maps lane tags to backend instances and closes each unique instance once
//! (spec.md §4.2: "a `BackendRegistry` maps lane tag → backend, `close()` is
//! idempotent per unique instance").

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use fusion_core::error::Result;

use crate::backend::LaneBackend;

pub struct BackendRegistry {
    by_lane: HashMap<String, Arc<dyn LaneBackend>>,
}

impl BackendRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self {
            by_lane: HashMap::new(),
        }
    }

    pub fn register(&mut self, lane: impl Into<String>, backend: Arc<dyn LaneBackend>) {
        self.by_lane.insert(lane.into(), backend);
    }

    #[must_use]
    pub fn get(&self, lane: &str) -> Option<Arc<dyn LaneBackend>> {
        self.by_lane.get(lane).cloned()
    }

    #[must_use]
    pub fn lanes(&self) -> Vec<String> {
        self.by_lane.keys().cloned().collect()
    }

    /// Close every distinct backend instance exactly once, even when the
    /// same `Arc` is registered under more than one lane tag.
    pub fn close_all(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for backend in self.by_lane.values() {
            let ptr = Arc::as_ptr(backend).cast::<()>();
            if seen.insert(ptr) {
                backend.close()?;
            }
        }
        Ok(())
    }
}

impl Default for BackendRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::local_stub::LocalStubBackend;

    #[test]
    fn get_returns_none_for_unregistered_lane() {
        let registry = BackendRegistry::new();
        assert!(registry.get("fulltext").is_none());
    }

    #[test]
    fn register_and_get_round_trip() {
        let mut registry = BackendRegistry::new();
        let backend: Arc<dyn LaneBackend> = Arc::new(LocalStubBackend::new());
        registry.register("fulltext", backend.clone());
        registry.register("semantic", backend);
        assert_eq!(registry.lanes().len(), 2);
        assert!(registry.get("fulltext").is_some());
    }

    #[test]
    fn close_all_is_idempotent_across_shared_instances() {
        let mut registry = BackendRegistry::new();
        let backend: Arc<dyn LaneBackend> = Arc::new(LocalStubBackend::new());
        registry.register("fulltext", backend.clone());
        registry.register("semantic", backend);
        assert!(registry.close_all().is_ok());
    }
}
