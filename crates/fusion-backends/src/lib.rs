#![forbid(unsafe_code)]

pub mod backend;
pub mod http_backend;
pub mod local_stub;
pub mod registry;
pub mod upstream;
pub mod wire;

pub use backend::{LaneBackend, LaneSearchResponse};
pub use local_stub::LocalStubBackend;
pub use registry::BackendRegistry;
pub use upstream::{InternalDenseBackend, UpstreamBackend};
