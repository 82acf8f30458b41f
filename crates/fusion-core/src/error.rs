//! Error taxonomy for the fusion engine.
//!
//! Seven kinds, exactly: validation, not-found, precondition, backend HTTP,
//! backend transport, integrity, internal. No operation returns a partial
//! success outside `multi_lane_search`, which carries per-entry status instead.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    // ==========================================================================
    // Validation
    // ==========================================================================
    #[error("validation error: {0}")]
    Validation(String),

    // ==========================================================================
    // Not-found
    // ==========================================================================
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    // ==========================================================================
    // Precondition
    // ==========================================================================
    #[error("precondition failed: {0}")]
    Precondition(String),

    // ==========================================================================
    // Backend HTTP (non-2xx, non-404)
    // ==========================================================================
    #[error("backend returned HTTP {status}: {body}")]
    BackendHttp { status: u16, body: String },

    // ==========================================================================
    // Backend transport (timeout, DNS, TLS)
    // ==========================================================================
    #[error("backend transport error: {0}")]
    BackendTransport(String),

    // ==========================================================================
    // Integrity (identifier resolution failure, e.g. publication lookup)
    // ==========================================================================
    #[error("integrity error: {0}")]
    Integrity(String),

    // ==========================================================================
    // Internal (unexpected state)
    // ==========================================================================
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    #[must_use]
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    #[must_use]
    pub fn precondition(message: impl Into<String>) -> Self {
        Self::Precondition(message.into())
    }

    /// SCREAMING_CASE classifier used by the tool-surface error adapter.
    #[must_use]
    pub const fn error_type(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION",
            Self::NotFound { .. } => "NOT_FOUND",
            Self::Precondition(_) => "PRECONDITION",
            Self::BackendHttp { .. } => "BACKEND_HTTP",
            Self::BackendTransport(_) => "BACKEND_TRANSPORT",
            Self::Integrity(_) => "INTEGRITY",
            Self::Internal(_) => "INTERNAL",
        }
    }

    /// Adapter-facing error code, per spec.md §6 ("Exit / error codes").
    #[must_use]
    pub fn error_code(&self) -> String {
        match self {
            Self::Validation(_) => "validation_error".to_string(),
            Self::NotFound { .. } => "not_found".to_string(),
            Self::Precondition(_) => "precondition".to_string(),
            Self::BackendHttp { status, .. } => format!("backend_{status}"),
            Self::BackendTransport(_) => "backend_transport".to_string(),
            Self::Integrity(_) => "integrity".to_string(),
            Self::Internal(_) => "internal".to_string(),
        }
    }

    /// Whether a caller might reasonably retry the operation unchanged.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::BackendTransport(_) | Self::BackendHttp { status: 500..=599, .. }
        )
    }

    /// Whether the error reflects caller-correctable input rather than a
    /// server-side fault.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Validation(_)
                | Self::NotFound { .. }
                | Self::Precondition(_)
                | Self::BackendHttp { .. }
                | Self::BackendTransport(_)
                | Self::Integrity(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_variants() -> Vec<Error> {
        vec![
            Error::Validation("x".into()),
            Error::not_found("run", "fusion-deadbeef"),
            Error::Precondition("x".into()),
            Error::BackendHttp {
                status: 500,
                body: "x".into(),
            },
            Error::BackendTransport("x".into()),
            Error::Integrity("x".into()),
            Error::Internal("x".into()),
        ]
    }

    #[test]
    fn test_error_type_mapping_exhaustive() {
        let expected = [
            "VALIDATION",
            "NOT_FOUND",
            "PRECONDITION",
            "BACKEND_HTTP",
            "BACKEND_TRANSPORT",
            "INTEGRITY",
            "INTERNAL",
        ];
        for (err, expect) in all_variants().iter().zip(expected.iter()) {
            assert_eq!(err.error_type(), *expect);
        }
    }

    #[test]
    fn test_error_code_mapping() {
        assert_eq!(Error::Validation("x".into()).error_code(), "validation_error");
        assert_eq!(Error::not_found("run", "x").error_code(), "not_found");
        assert_eq!(Error::Precondition("x".into()).error_code(), "precondition");
        assert_eq!(
            Error::BackendHttp {
                status: 404,
                body: String::new()
            }
            .error_code(),
            "backend_404"
        );
        assert_eq!(
            Error::BackendHttp {
                status: 502,
                body: String::new()
            }
            .error_code(),
            "backend_502"
        );
        assert_eq!(Error::BackendTransport("x".into()).error_code(), "backend_transport");
        assert_eq!(Error::Integrity("x".into()).error_code(), "integrity");
        assert_eq!(Error::Internal("x".into()).error_code(), "internal");
    }

    #[test]
    fn test_retryable_classification() {
        assert!(Error::BackendTransport("x".into()).is_retryable());
        assert!(
            Error::BackendHttp {
                status: 503,
                body: String::new()
            }
            .is_retryable()
        );
        assert!(!Error::Validation("x".into()).is_retryable());
        assert!(
            !Error::BackendHttp {
                status: 404,
                body: String::new()
            }
            .is_retryable()
        );
    }

    #[test]
    fn test_recoverable_vs_internal() {
        for err in all_variants() {
            if matches!(err, Error::Internal(_)) {
                assert!(!err.is_recoverable());
            } else {
                assert!(err.is_recoverable(), "{err:?} should be recoverable");
            }
        }
    }

    #[test]
    fn test_display_non_empty() {
        for err in all_variants() {
            assert!(!err.to_string().is_empty());
        }
    }
}
