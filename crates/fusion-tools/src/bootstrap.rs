//! Process-wide `Engine` construction (spec.md §9 "global state -> injected
//! components"). `fusion-server` builds one `Engine` at startup and the tool
//! handlers in this crate reach it through a single lazily-initialized
//! handle rather than rebuilding state-store/backend connections per call.

use std::sync::{Arc, OnceLock};

use fusion_backends::{BackendRegistry, InternalDenseBackend, LocalStubBackend, UpstreamBackend};
use fusion_core::Config;
use fusion_engine::Engine;
use fusion_store::{MemoryStore, RedisStore, StateStore};

static ENGINE: OnceLock<Arc<Engine>> = OnceLock::new();

/// Build the backend registry for a loaded [`Config`]: real upstream/dense
/// backends when base URLs are configured, otherwise the deterministic
/// local stub (spec.md §4.2) for every lane so the engine stays usable
/// without network access.
fn build_backends(config: &Config) -> BackendRegistry {
    let mut registry = BackendRegistry::new();

    if config.use_local_stub {
        let stub: Arc<dyn fusion_backends::LaneBackend> = Arc::new(LocalStubBackend::new());
        registry.register("fulltext", Arc::clone(&stub));
        registry.register("semantic", Arc::clone(&stub));
        registry.register("original_dense", stub);
        return registry;
    }

    if let Some(base_url) = config.upstream_base_url.as_deref() {
        match UpstreamBackend::new(base_url, config.upstream_api_token.as_deref(), config.backend_timeout_secs) {
            Ok(backend) => {
                let backend: Arc<dyn fusion_backends::LaneBackend> = Arc::new(backend);
                registry.register("fulltext", Arc::clone(&backend));
                registry.register("semantic", backend);
            }
            Err(e) => tracing::error!("failed to construct upstream backend: {e}"),
        }
    }

    if let Some(base_url) = config.internal_dense_base_url.as_deref() {
        match InternalDenseBackend::new(
            base_url,
            config.internal_dense_api_token.as_deref(),
            config.backend_timeout_secs,
        ) {
            Ok(backend) => registry.register("original_dense", Arc::new(backend)),
            Err(e) => tracing::error!("failed to construct internal-dense backend: {e}"),
        }
    }

    registry
}

fn build_store(config: &Config) -> Arc<dyn StateStore> {
    if config.use_local_stub {
        return Arc::new(MemoryStore::new());
    }
    let data_ttl_secs = config.data_ttl_hours * 3600;
    let snippet_ttl_secs = config.snippet_ttl_hours * 3600;
    match RedisStore::connect(&config.state_store_url, config.snapshot.clone(), data_ttl_secs, snippet_ttl_secs) {
        Ok(store) => Arc::new(store),
        Err(e) => {
            tracing::error!("failed to connect to state store, falling back to an in-memory store: {e}");
            Arc::new(MemoryStore::new())
        }
    }
}

/// Build (once) and return the process-wide [`Engine`] handle.
pub fn engine() -> Arc<Engine> {
    Arc::clone(ENGINE.get_or_init(|| {
        let config = Config::from_env();
        let backends = build_backends(&config);
        Arc::new(Engine::new(build_store(&config), backends, config))
    }))
}
