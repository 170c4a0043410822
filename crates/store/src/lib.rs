//! `scribehub-store` — the tenant-scoped data-access toolkit.
//!
//! Composes five pieces:
//!
//! 1. validation ([`validate`]) — declarative checks over JSON payloads
//! 2. error classification ([`errors`]) — backend failures → the closed
//!    domain taxonomy
//! 3. tenant isolation ([`tenant`] + scoped query construction)
//! 4. the query builder ([`query`]) over an injected [`Backend`]
//! 5. the transaction manager ([`tx`]) with compensating rollback
//!
//! plus the typed [`Repository`] tying them together for resource modules.

pub mod backend;
pub mod config;
pub mod errors;
pub mod query;
pub mod repo;
pub mod tenant;
pub mod tx;
pub mod validate;

use std::sync::Arc;

use scribehub_core::{DomainResult, RecordId, TenantId};
use serde_json::json;

pub use backend::{Backend, BackendError, InMemoryBackend, PostgresBackend, Row};
pub use config::StoreConfig;
pub use query::{CursorPage, Direction, Filter, FilterOp, Page, PageMeta, Query, QuerySpec};
pub use repo::Repository;
pub use tx::{execute_transaction, TxOperation};

/// Cloneable handle around the injected backend. Everything in this crate is
/// constructed from one of these; there is no ambient store state.
#[derive(Clone)]
pub struct Store {
    backend: Arc<dyn Backend>,
}

impl Store {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self { backend }
    }

    /// In-memory wiring for dev/tests.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryBackend::new()))
    }

    /// Query a table without tenant scope. Reserved for by-id lookups that
    /// run the post-lookup tenant verification, and for non-tenant tables.
    pub fn from(&self, table: &str) -> Query {
        Query::new(self.clone(), table, None)
    }

    /// Query a table with the tenant predicate pinned for the lifetime of
    /// the query.
    pub fn from_tenant(&self, table: &str, tenant_id: TenantId) -> Query {
        Query::new(self.clone(), table, Some(tenant_id))
    }

    /// Sequential foreign-entity existence check: does `id` exist in `table`
    /// under this tenant? Not a store-enforced constraint — resource modules
    /// run this before inserts that reference other entities.
    pub async fn exists(
        &self,
        table: &str,
        tenant_id: TenantId,
        id: RecordId,
    ) -> DomainResult<bool> {
        let spec = self
            .from_tenant(table, tenant_id)
            .filter("id", FilterOp::Eq, json!(id))
            .into_spec();
        let count = errors::scoped(table, "exists", self.backend.count(&spec)).await?;
        Ok(count > 0)
    }

    /// Escape hatch: the raw backend handle, for cases the builder does not
    /// abstract. Callers bypass classification and tenant stamping here.
    pub fn backend(&self) -> &Arc<dyn Backend> {
        &self.backend
    }
}
