//! Tenant-scoped query builder.
//!
//! A [`Query`] accumulates a [`QuerySpec`] through a fluent chain and
//! materializes it against the injected backend. Constructing the query with
//! a tenant id pins a `tenant_id` predicate that no later call can remove.

use serde_json::Value;

use scribehub_core::{DomainError, DomainResult, ErrorCode, TenantId};

use crate::backend::{Backend, Row};
use crate::errors::scoped;
use crate::Store;

/// Filter operator. Closed set, matched exhaustively by every backend.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Neq,
    Gt,
    Gte,
    Lt,
    Lte,
    /// SQL LIKE with `%` wildcards.
    Like,
    /// Case-insensitive LIKE.
    ILike,
    /// Membership in an array value.
    In,
    /// Array/object containment (row value contains the filter value).
    Contains,
    /// Inverse containment (row value contained by the filter value).
    ContainedBy,
    /// Case-insensitive substring match.
    TextSearch,
}

/// One predicate: column, operator, comparison value.
#[derive(Debug, Clone)]
pub struct Filter {
    pub column: String,
    pub op: FilterOp,
    pub value: Value,
}

impl Filter {
    pub fn new(column: impl Into<String>, op: FilterOp, value: Value) -> Self {
        Self {
            column: column.into(),
            op,
            value,
        }
    }

    pub fn eq(column: impl Into<String>, value: Value) -> Self {
        Self::new(column, FilterOp::Eq, value)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

/// Cursor-based window: strict inequality on the cursor column in scan
/// direction, ordered by that column in the same direction.
#[derive(Debug, Clone)]
pub struct CursorPage {
    pub limit: u64,
    pub cursor: Option<Value>,
    pub column: String,
    pub ascending: bool,
}

impl CursorPage {
    /// Defaults mirror the common listing shape: newest first on
    /// `created_at`.
    pub fn new(limit: u64) -> Self {
        Self {
            limit,
            cursor: None,
            column: "created_at".to_string(),
            ascending: false,
        }
    }

    pub fn after(mut self, cursor: Value) -> Self {
        self.cursor = Some(cursor);
        self
    }

    pub fn on_column(mut self, column: impl Into<String>) -> Self {
        self.column = column.into();
        self
    }

    pub fn ascending(mut self, ascending: bool) -> Self {
        self.ascending = ascending;
        self
    }
}

/// Exactly one pagination mode per query; setting a second replaces the
/// first.
#[derive(Debug, Clone, Default)]
pub enum Pagination {
    #[default]
    None,
    Offset {
        page: u64,
        page_size: u64,
    },
    Cursor(CursorPage),
}

/// Accumulated description of one query. What backends consume.
#[derive(Debug, Clone)]
pub struct QuerySpec {
    pub table: String,
    /// Projection; `None` selects all columns.
    pub columns: Option<Vec<String>>,
    /// Conjunctive predicates.
    pub filters: Vec<Filter>,
    /// One disjunction: each branch is a conjunction of predicates. The
    /// disjunction ANDs with `filters`.
    pub or_branches: Vec<Vec<Filter>>,
    pub order: Vec<(String, Direction)>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
    /// Tenant scope. Backends must apply this on every operation when set.
    pub tenant_id: Option<TenantId>,
}

impl QuerySpec {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            columns: None,
            filters: Vec::new(),
            or_branches: Vec::new(),
            order: Vec::new(),
            limit: None,
            offset: None,
            tenant_id: None,
        }
    }

    pub fn scoped(table: impl Into<String>, tenant_id: TenantId) -> Self {
        let mut spec = Self::new(table);
        spec.tenant_id = Some(tenant_id);
        spec
    }
}

/// Page of rows plus listing metadata.
#[derive(Debug, Clone)]
pub struct Page {
    pub rows: Vec<Row>,
    pub meta: PageMeta,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct PageMeta {
    /// Rows matching the query's predicates, irrespective of the window.
    pub total: u64,
    pub returned: usize,
    /// Exact: the data query fetches one row past the window and trims.
    pub has_more: bool,
}

/// Fluent query over one table.
#[derive(Clone)]
pub struct Query {
    store: Store,
    spec: QuerySpec,
    pagination: Pagination,
}

impl Query {
    pub(crate) fn new(store: Store, table: &str, tenant_id: Option<TenantId>) -> Self {
        let mut spec = QuerySpec::new(table);
        spec.tenant_id = tenant_id;
        Self {
            store,
            spec,
            pagination: Pagination::None,
        }
    }

    pub fn select(mut self, columns: &[&str]) -> Self {
        self.spec.columns = Some(columns.iter().map(|c| (*c).to_string()).collect());
        self
    }

    pub fn filter(mut self, column: &str, op: FilterOp, value: Value) -> Self {
        self.spec.filters.push(Filter::new(column, op, value));
        self
    }

    /// Bulk-apply predicates: full triples via [`Filter::new`], plain
    /// equality via [`Filter::eq`].
    pub fn filters<I>(mut self, filters: I) -> Self
    where
        I: IntoIterator<Item = Filter>,
    {
        self.spec.filters.extend(filters);
        self
    }

    /// Add OR branches: each branch is a conjunction of its filters, the
    /// branches combine disjunctively, and the whole disjunction ANDs with
    /// the rest of the query. Repeated calls extend the same disjunction.
    pub fn or_any<I>(mut self, branches: I) -> Self
    where
        I: IntoIterator<Item = Vec<Filter>>,
    {
        self.spec.or_branches.extend(branches);
        self
    }

    pub fn order_by(mut self, column: &str, direction: Direction) -> Self {
        self.spec.order.push((column.to_string(), direction));
        self
    }

    /// Offset window, 1-based page number.
    pub fn paginate(mut self, page: u64, page_size: u64) -> Self {
        self.pagination = Pagination::Offset { page, page_size };
        self
    }

    pub fn paginate_by_cursor(mut self, cursor: CursorPage) -> Self {
        self.pagination = Pagination::Cursor(cursor);
        self
    }

    /// Escape hatch for backend-specific needs the builder does not
    /// abstract.
    pub fn into_spec(self) -> QuerySpec {
        self.spec
    }

    /// Materialize: one count query for `total`, one data query fetching a
    /// single row past the window so `has_more` is exact.
    pub async fn execute(self) -> DomainResult<Page> {
        let Query {
            store,
            mut spec,
            pagination,
        } = self;
        let resource = spec.table.clone();

        let total = scoped(&resource, "count", store.backend().count(&spec)).await?;

        let window = match &pagination {
            Pagination::None => None,
            Pagination::Offset { page, page_size } => {
                let page = (*page).max(1);
                spec.offset = Some((page - 1) * page_size);
                Some(*page_size)
            }
            Pagination::Cursor(cursor) => {
                let op = if cursor.ascending {
                    FilterOp::Gt
                } else {
                    FilterOp::Lt
                };
                if let Some(value) = &cursor.cursor {
                    spec.filters
                        .push(Filter::new(cursor.column.clone(), op, value.clone()));
                }
                let direction = if cursor.ascending {
                    Direction::Asc
                } else {
                    Direction::Desc
                };
                spec.order.insert(0, (cursor.column.clone(), direction));
                Some(cursor.limit)
            }
        };

        if let Some(limit) = window {
            spec.limit = Some(limit + 1);
        }

        let mut rows = scoped(&resource, "select", store.backend().select(&spec)).await?;

        let has_more = match window {
            Some(limit) => {
                let over = rows.len() as u64 > limit;
                rows.truncate(limit as usize);
                over
            }
            None => false,
        };

        let returned = rows.len();
        Ok(Page {
            rows,
            meta: PageMeta {
                total,
                returned,
                has_more,
            },
        })
    }

    /// Fetch all matching rows without pagination metadata.
    pub async fn fetch_all(self) -> DomainResult<Vec<Row>> {
        let resource = self.spec.table.clone();
        scoped(&resource, "select", self.store.backend().select(&self.spec)).await
    }

    /// Fetch at most one row.
    pub async fn fetch_optional(mut self) -> DomainResult<Option<Row>> {
        self.spec.limit = Some(1);
        let resource = self.spec.table.clone();
        let mut rows = scoped(&resource, "select", self.store.backend().select(&self.spec)).await?;
        Ok(if rows.is_empty() {
            None
        } else {
            Some(rows.swap_remove(0))
        })
    }

    /// Batched scan ordered by the `id` column (UUIDv7, so id order is
    /// insertion-time order). The callback runs synchronously per batch; an
    /// error from the callback or a fetch aborts the scan and propagates.
    pub async fn stream<F>(self, batch_size: u64, mut callback: F) -> DomainResult<()>
    where
        F: FnMut(&[Row]) -> DomainResult<()>,
    {
        let resource = self.spec.table.clone();
        let mut last_id: Option<Value> = None;

        loop {
            let mut spec = self.spec.clone();
            spec.order = vec![("id".to_string(), Direction::Asc)];
            spec.limit = Some(batch_size);
            if let Some(id) = &last_id {
                spec.filters
                    .push(Filter::new("id", FilterOp::Gt, id.clone()));
            }

            let batch = scoped(&resource, "stream", self.store.backend().select(&spec)).await?;
            if batch.is_empty() {
                return Ok(());
            }

            last_id = match batch.last().and_then(|row| row.get("id")) {
                Some(id) => Some(id.clone()),
                None => {
                    return Err(DomainError::new(
                        ErrorCode::Unknown,
                        format!("{resource}: stream requires rows with an id column"),
                    ));
                }
            };

            callback(&batch)?;

            if (batch.len() as u64) < batch_size {
                return Ok(());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::InMemoryBackend;
    use proptest::prelude::*;
    use serde_json::json;
    use std::sync::Arc;

    fn store() -> Store {
        Store::new(Arc::new(InMemoryBackend::new()))
    }

    fn row(n: u64) -> Row {
        let mut row = Row::new();
        row.insert("n".to_string(), json!(n));
        row.insert("name".to_string(), json!(format!("row-{n:04}")));
        row
    }

    async fn seed(store: &Store, tenant: TenantId, count: u64) {
        for n in 0..count {
            let mut r = row(n);
            r.insert(
                "id".to_string(),
                json!(scribehub_core::RecordId::new().to_string()),
            );
            r.insert("tenant_id".to_string(), json!(tenant));
            store.backend().insert("items", vec![r]).await.unwrap();
        }
    }

    #[tokio::test]
    async fn filters_are_conjunctive() {
        let store = store();
        let tenant = TenantId::new();
        seed(&store, tenant, 10).await;

        let rows = store
            .from_tenant("items", tenant)
            .filter("n", FilterOp::Gte, json!(3))
            .filter("n", FilterOp::Lt, json!(6))
            .order_by("n", Direction::Asc)
            .fetch_all()
            .await
            .unwrap();

        let ns: Vec<u64> = rows.iter().map(|r| r["n"].as_u64().unwrap()).collect();
        assert_eq!(ns, vec![3, 4, 5]);
    }

    #[tokio::test]
    async fn or_branches_are_disjunctive() {
        let store = store();
        let tenant = TenantId::new();
        seed(&store, tenant, 10).await;

        let rows = store
            .from_tenant("items", tenant)
            .or_any(vec![
                vec![Filter::new("n", FilterOp::Lt, json!(2))],
                vec![Filter::new("n", FilterOp::Gte, json!(8))],
            ])
            .order_by("n", Direction::Asc)
            .fetch_all()
            .await
            .unwrap();

        let ns: Vec<u64> = rows.iter().map(|r| r["n"].as_u64().unwrap()).collect();
        assert_eq!(ns, vec![0, 1, 8, 9]);
    }

    #[tokio::test]
    async fn offset_pagination_windows_and_has_more_is_exact() {
        let store = store();
        let tenant = TenantId::new();
        seed(&store, tenant, 10).await;

        let page = store
            .from_tenant("items", tenant)
            .order_by("n", Direction::Asc)
            .paginate(2, 4)
            .execute()
            .await
            .unwrap();
        assert_eq!(page.meta.total, 10);
        assert_eq!(page.meta.returned, 4);
        assert!(page.meta.has_more);

        // Final page fills the window exactly: ten rows, page size five.
        let last = store
            .from_tenant("items", tenant)
            .order_by("n", Direction::Asc)
            .paginate(2, 5)
            .execute()
            .await
            .unwrap();
        assert_eq!(last.meta.returned, 5);
        assert!(!last.meta.has_more);
    }

    #[tokio::test]
    async fn projection_restricts_columns() {
        let store = store();
        let tenant = TenantId::new();
        seed(&store, tenant, 1).await;

        let rows = store
            .from_tenant("items", tenant)
            .select(&["n"])
            .fetch_all()
            .await
            .unwrap();
        assert!(rows[0].contains_key("n"));
        assert!(!rows[0].contains_key("name"));
    }

    #[tokio::test]
    async fn stream_visits_every_row_once_in_id_order() {
        let store = store();
        let tenant = TenantId::new();
        seed(&store, tenant, 25).await;

        let mut seen: Vec<String> = Vec::new();
        store
            .from_tenant("items", tenant)
            .stream(10, |batch| {
                assert!(batch.len() <= 10);
                for row in batch {
                    seen.push(row["id"].as_str().unwrap().to_string());
                }
                Ok(())
            })
            .await
            .unwrap();

        let mut sorted = seen.clone();
        sorted.sort();
        sorted.dedup();
        assert_eq!(seen.len(), 25);
        assert_eq!(seen, sorted);
    }

    #[tokio::test]
    async fn stream_aborts_on_callback_error() {
        let store = store();
        let tenant = TenantId::new();
        seed(&store, tenant, 25).await;

        let mut batches = 0;
        let err = store
            .from_tenant("items", tenant)
            .stream(10, |_batch| {
                batches += 1;
                Err(DomainError::unknown("consumer failed"))
            })
            .await
            .unwrap_err();

        assert_eq!(err.code(), ErrorCode::Unknown);
        assert_eq!(batches, 1);
    }

    async fn collect_cursor_pages(
        store: &Store,
        tenant: TenantId,
        limit: u64,
        ascending: bool,
    ) -> Vec<u64> {
        let mut cursor: Option<Value> = None;
        let mut all: Vec<u64> = Vec::new();

        loop {
            let mut window = CursorPage::new(limit).on_column("n").ascending(ascending);
            if let Some(c) = cursor.take() {
                window = window.after(c);
            }
            let page = store
                .from_tenant("items", tenant)
                .paginate_by_cursor(window)
                .execute()
                .await
                .unwrap();

            for row in &page.rows {
                all.push(row["n"].as_u64().unwrap());
            }
            match page.rows.last() {
                Some(last) if page.meta.has_more => cursor = Some(last["n"].clone()),
                _ => return all,
            }
        }
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 64,
            ..ProptestConfig::default()
        })]

        /// Property: concatenating cursor pages, feeding the last row's
        /// cursor back each time, yields every row exactly once in the
        /// requested order (fixed snapshot, no concurrent writes).
        #[test]
        fn cursor_pagination_yields_every_row_exactly_once(
            rows in 0u64..40,
            limit in 1u64..9,
            ascending in any::<bool>(),
        ) {
            let rt = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap();

            let collected = rt.block_on(async {
                let store = store();
                let tenant = TenantId::new();
                seed(&store, tenant, rows).await;
                collect_cursor_pages(&store, tenant, limit, ascending).await
            });

            let expected: Vec<u64> = if ascending {
                (0..rows).collect()
            } else {
                (0..rows).rev().collect()
            };
            prop_assert_eq!(collected, expected);
        }
    }
}
