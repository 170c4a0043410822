//! Backend-error classification.
//!
//! Centralizes the mapping from raw store failures into the closed domain
//! taxonomy. Every operation that touches the backend goes through
//! [`scoped`], so callers only ever observe [`DomainError`] shapes.

use std::future::Future;

use scribehub_core::{DomainError, ErrorCode};

use crate::backend::BackendError;

/// SQLSTATE-style codes reported by the hosted store.
pub mod codes {
    pub const UNIQUE_VIOLATION: &str = "23505";
    pub const FOREIGN_KEY_VIOLATION: &str = "23503";
    pub const UNDEFINED_TABLE: &str = "42P01";
    pub const INSUFFICIENT_PRIVILEGE: &str = "42501";
}

/// Translate a backend failure into the domain taxonomy, keeping the
/// original error as source.
pub fn classify(err: BackendError, resource: &str) -> DomainError {
    match err.code() {
        Some(codes::UNIQUE_VIOLATION) => DomainError::with_source(
            ErrorCode::Duplicate,
            format!("{resource}: duplicate record"),
            err,
        ),
        Some(codes::FOREIGN_KEY_VIOLATION) => DomainError::with_source(
            ErrorCode::ForeignKey,
            format!("{resource}: referenced record does not exist"),
            err,
        ),
        Some(codes::UNDEFINED_TABLE) => {
            DomainError::with_source(ErrorCode::NotFound, format!("{resource} not found"), err)
        }
        Some(codes::INSUFFICIENT_PRIVILEGE) => DomainError::with_source(
            ErrorCode::Permission,
            format!("{resource}: permission denied by store"),
            err,
        ),
        _ => DomainError::with_source(
            ErrorCode::Unknown,
            format!("{resource}: store operation failed"),
            err,
        ),
    }
}

/// Await a backend operation and surface only classified domain errors.
///
/// The uniform wrapper every store-touching path runs through; `operation`
/// names the step for logs.
pub async fn scoped<T, F>(resource: &str, operation: &str, fut: F) -> Result<T, DomainError>
where
    F: Future<Output = Result<T, BackendError>>,
{
    match fut.await {
        Ok(value) => Ok(value),
        Err(err) => {
            let classified = classify(err, resource);
            tracing::debug!(
                resource,
                operation,
                code = %classified.code(),
                "store operation failed"
            );
            Err(classified)
        }
    }
}
