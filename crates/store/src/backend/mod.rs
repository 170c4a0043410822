//! Hosted-store boundary.
//!
//! The hosted relational store is an external collaborator. [`Backend`] is
//! the only contact surface: a handful of table-scoped operations driven by a
//! [`QuerySpec`](crate::query::QuerySpec). Implementations must enforce the
//! spec's tenant scope on every operation; the rest of the crate treats a
//! backend as opaque.

pub mod memory;
pub mod postgres;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::query::QuerySpec;

pub use memory::InMemoryBackend;
pub use postgres::PostgresBackend;

/// A stored row in transit: a JSON object keyed by column name.
pub type Row = serde_json::Map<String, serde_json::Value>;

/// Error reported by a backend.
///
/// `Store` failures carry the backend's SQLSTATE-style code so the error
/// module can classify them into the domain taxonomy; everything else is
/// transport or query-shape trouble.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("store error [{}]: {message}", code.as_deref().unwrap_or("-"))]
    Store {
        code: Option<String>,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The query referenced something the backend cannot express
    /// (malformed identifier, missing cursor column, ...). Programmer error,
    /// surfaced fail-fast.
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    #[error("{0}")]
    Other(String),
}

impl BackendError {
    pub fn store(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Store {
            code: Some(code.into()),
            message: message.into(),
            source: None,
        }
    }

    pub fn code(&self) -> Option<&str> {
        match self {
            BackendError::Store { code, .. } => code.as_deref(),
            BackendError::InvalidQuery(_) | BackendError::Other(_) => None,
        }
    }
}

/// Table-scoped operations against the hosted store.
///
/// Implementations must:
/// - apply `spec.tenant_id` as an equality predicate on `tenant_id` whenever
///   it is set (reads **and** writes)
/// - evaluate filters, OR branches, ordering, limit and offset as described
///   by the spec
/// - return written rows as stored (inserts and updates echo the full row)
#[async_trait]
pub trait Backend: Send + Sync {
    async fn select(&self, spec: &QuerySpec) -> Result<Vec<Row>, BackendError>;

    /// Count rows matching the spec's predicates (limit/offset ignored).
    async fn count(&self, spec: &QuerySpec) -> Result<u64, BackendError>;

    async fn insert(&self, table: &str, rows: Vec<Row>) -> Result<Vec<Row>, BackendError>;

    /// Apply `changes` to every row matching the spec, returning the updated
    /// rows.
    async fn update(&self, spec: &QuerySpec, changes: Row) -> Result<Vec<Row>, BackendError>;

    /// Delete rows matching the spec, returning the number removed.
    async fn delete(&self, spec: &QuerySpec) -> Result<u64, BackendError>;
}

#[async_trait]
impl<B> Backend for Arc<B>
where
    B: Backend + ?Sized,
{
    async fn select(&self, spec: &QuerySpec) -> Result<Vec<Row>, BackendError> {
        (**self).select(spec).await
    }

    async fn count(&self, spec: &QuerySpec) -> Result<u64, BackendError> {
        (**self).count(spec).await
    }

    async fn insert(&self, table: &str, rows: Vec<Row>) -> Result<Vec<Row>, BackendError> {
        (**self).insert(table, rows).await
    }

    async fn update(&self, spec: &QuerySpec, changes: Row) -> Result<Vec<Row>, BackendError> {
        (**self).update(spec, changes).await
    }

    async fn delete(&self, spec: &QuerySpec) -> Result<u64, BackendError> {
        (**self).delete(spec).await
    }
}
