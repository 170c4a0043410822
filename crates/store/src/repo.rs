//! Typed generic repository.
//!
//! One abstraction carrying both the fluent query ergonomics and the
//! tenant/validation guarantees: inserts stamp the tenant id, by-id reads
//! run the post-lookup tenant verification, writes are tenant-scoped, and
//! every backend failure is classified before it reaches the caller.

use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};

use scribehub_core::{DomainError, DomainResult, ErrorCode, RecordId, TenantId};

use crate::backend::{Backend, Row};
use crate::errors::scoped;
use crate::query::{Filter, Query};
use crate::tenant::{stamp_tenant, verify_tenant_access};
use crate::Store;

/// Columns the repository owns; payloads cannot override them on update.
const PROTECTED_COLUMNS: [&str; 3] = ["id", "tenant_id", "created_at"];

pub struct Repository<T> {
    store: Store,
    table: &'static str,
    resource: &'static str,
    _row: PhantomData<fn() -> T>,
}

impl<T> Clone for Repository<T> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            table: self.table,
            resource: self.resource,
            _row: PhantomData,
        }
    }
}

impl<T> Repository<T>
where
    T: Serialize + DeserializeOwned + Send,
{
    /// `table` is the backing table; `resource` names the entity in error
    /// messages.
    pub fn new(store: Store, table: &'static str, resource: &'static str) -> Self {
        Self {
            store,
            table,
            resource,
            _row: PhantomData,
        }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn resource(&self) -> &'static str {
        self.resource
    }

    /// Tenant-scoped query builder over the backing table.
    pub fn query(&self, tenant_id: TenantId) -> Query {
        self.store.from_tenant(self.table, tenant_id)
    }

    fn decode(&self, row: Row) -> DomainResult<T> {
        serde_json::from_value(Value::Object(row)).map_err(|e| {
            DomainError::with_source(
                ErrorCode::Unknown,
                format!("{}: failed to decode stored row", self.resource),
                e,
            )
        })
    }

    pub fn decode_rows(&self, rows: Vec<Row>) -> DomainResult<Vec<T>> {
        rows.into_iter().map(|row| self.decode(row)).collect()
    }

    /// Insert one row: assigns `id`/`created_at` when absent, stamps the
    /// tenant id, returns the stored row.
    pub async fn insert(&self, tenant_id: TenantId, mut row: Row) -> DomainResult<T> {
        if !row.contains_key("id") {
            row.insert("id".to_string(), json!(RecordId::new()));
        }
        if !row.contains_key("created_at") {
            row.insert("created_at".to_string(), json!(chrono::Utc::now()));
        }
        let row = stamp_tenant(row, tenant_id);

        let mut stored = scoped(
            self.resource,
            "insert",
            self.store.backend().insert(self.table, vec![row]),
        )
        .await?;

        if stored.is_empty() {
            return Err(DomainError::new(
                ErrorCode::Unknown,
                format!("{}: insert returned no row", self.resource),
            ));
        }
        self.decode(stored.swap_remove(0))
    }

    /// Lookup by id, then verify tenant ownership.
    ///
    /// The lookup itself is deliberately not tenant-filtered so that the
    /// NotFound/Permission split of [`verify_tenant_access`] applies.
    pub async fn find_by_id(&self, tenant_id: TenantId, id: RecordId) -> DomainResult<T> {
        let row = self
            .store
            .from(self.table)
            .filter("id", crate::query::FilterOp::Eq, json!(id))
            .fetch_optional()
            .await?;

        let row = verify_tenant_access(row.as_ref(), tenant_id, self.resource)?;
        self.decode(row.clone())
    }

    /// Existence check used for sequential foreign-entity verification.
    /// Tenant-scoped: a foreign tenant's record does not exist here.
    pub async fn exists(&self, tenant_id: TenantId, id: RecordId) -> DomainResult<bool> {
        let spec = self
            .query(tenant_id)
            .filter("id", crate::query::FilterOp::Eq, json!(id))
            .into_spec();
        let count = scoped(self.resource, "exists", self.store.backend().count(&spec)).await?;
        Ok(count > 0)
    }

    /// Update by id after tenant verification; protected columns are
    /// stripped from the changes and `updated_at` is stamped.
    pub async fn update_by_id(
        &self,
        tenant_id: TenantId,
        id: RecordId,
        mut changes: Row,
    ) -> DomainResult<T> {
        // Runs the NotFound/Permission split before touching anything.
        self.find_by_id(tenant_id, id).await?;

        for column in PROTECTED_COLUMNS {
            changes.remove(column);
        }
        changes.insert("updated_at".to_string(), json!(chrono::Utc::now()));

        let spec = self
            .query(tenant_id)
            .filter("id", crate::query::FilterOp::Eq, json!(id))
            .into_spec();

        let mut updated = scoped(
            self.resource,
            "update",
            self.store.backend().update(&spec, changes),
        )
        .await?;

        if updated.is_empty() {
            return Err(DomainError::not_found(self.resource));
        }
        self.decode(updated.swap_remove(0))
    }

    /// Delete by id after tenant verification.
    pub async fn delete_by_id(&self, tenant_id: TenantId, id: RecordId) -> DomainResult<()> {
        self.find_by_id(tenant_id, id).await?;

        let spec = self
            .query(tenant_id)
            .filter("id", crate::query::FilterOp::Eq, json!(id))
            .into_spec();
        scoped(
            self.resource,
            "delete",
            self.store.backend().delete(&spec),
        )
        .await?;
        Ok(())
    }

    /// Conditional update used for optimistic writes: applies `changes` to
    /// rows matching `id` plus every extra filter, returning the number of
    /// rows that matched.
    pub async fn update_where(
        &self,
        tenant_id: TenantId,
        id: RecordId,
        extra: Vec<Filter>,
        changes: Row,
    ) -> DomainResult<usize> {
        let mut query = self
            .query(tenant_id)
            .filter("id", crate::query::FilterOp::Eq, json!(id));
        for Filter { column, op, value } in extra {
            query = query.filter(&column, op, value);
        }
        let spec = query.into_spec();

        let updated = scoped(
            self.resource,
            "update",
            self.store.backend().update(&spec, changes),
        )
        .await?;
        Ok(updated.len())
    }
}
