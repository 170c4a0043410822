//! Postgres-backed implementation of the store boundary.
//!
//! Translates a [`QuerySpec`] into SQL with bound parameters. Rows travel as
//! `to_jsonb(t.*)` so the adapter stays schema-agnostic; projection is
//! applied on the decoded JSON. Every query includes `tenant_id` in the
//! WHERE clause whenever the spec is tenant-scoped.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::postgres::{PgPool, Postgres};
use sqlx::{QueryBuilder, Row as SqlxRow};
use uuid::Uuid;

use crate::query::{Direction, Filter, FilterOp, QuerySpec};

use super::{Backend, BackendError, Row};

pub struct PostgresBackend {
    pool: PgPool,
}

impl PostgresBackend {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(url: &str) -> Result<Self, BackendError> {
        let pool = PgPool::connect(url).await.map_err(map_sqlx)?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn map_sqlx(err: sqlx::Error) -> BackendError {
    if let sqlx::Error::Database(db) = &err {
        let code = db.code().map(|c| c.to_string());
        let message = db.message().to_string();
        return BackendError::Store {
            code,
            message,
            source: Some(Box::new(err)),
        };
    }
    BackendError::Other(err.to_string())
}

/// Guard identifiers interpolated into SQL text. Tables and columns come
/// from code, not users, but the check keeps the escape hatch honest.
fn ident(name: &str) -> Result<&str, BackendError> {
    let valid = !name.is_empty()
        && !name.starts_with(|c: char| c.is_ascii_digit())
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
    if valid {
        Ok(name)
    } else {
        Err(BackendError::InvalidQuery(format!(
            "invalid identifier '{name}'"
        )))
    }
}

/// Bind a JSON scalar as its closest Postgres type. Strings that parse as
/// UUIDs or RFC 3339 timestamps bind as those types so comparisons against
/// `uuid`/`timestamptz` columns work without per-table type knowledge.
fn bind_value(qb: &mut QueryBuilder<'_, Postgres>, value: &Value) {
    match value {
        Value::Null => {
            qb.push("NULL");
        }
        Value::Bool(b) => {
            qb.push_bind(*b);
        }
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                qb.push_bind(i);
            } else {
                qb.push_bind(n.as_f64().unwrap_or(0.0));
            }
        }
        Value::String(s) => {
            if let Ok(uuid) = s.parse::<Uuid>() {
                qb.push_bind(uuid);
            } else if let Ok(ts) = s.parse::<DateTime<Utc>>() {
                qb.push_bind(ts);
            } else {
                qb.push_bind(s.clone());
            }
        }
        Value::Array(_) | Value::Object(_) => {
            qb.push_bind(sqlx::types::Json(value.clone()));
        }
    }
}

fn push_filter(qb: &mut QueryBuilder<'_, Postgres>, filter: &Filter) -> Result<(), BackendError> {
    let column = ident(&filter.column)?;

    // NULL comparisons need IS [NOT] NULL, not `= NULL`.
    if filter.value.is_null() && matches!(filter.op, FilterOp::Eq | FilterOp::Neq) {
        qb.push(format!("t.{column} IS "));
        if filter.op == FilterOp::Neq {
            qb.push("NOT ");
        }
        qb.push("NULL");
        return Ok(());
    }

    match filter.op {
        FilterOp::Eq => {
            qb.push(format!("t.{column} = "));
            bind_value(qb, &filter.value);
        }
        FilterOp::Neq => {
            qb.push(format!("t.{column} <> "));
            bind_value(qb, &filter.value);
        }
        FilterOp::Gt => {
            qb.push(format!("t.{column} > "));
            bind_value(qb, &filter.value);
        }
        FilterOp::Gte => {
            qb.push(format!("t.{column} >= "));
            bind_value(qb, &filter.value);
        }
        FilterOp::Lt => {
            qb.push(format!("t.{column} < "));
            bind_value(qb, &filter.value);
        }
        FilterOp::Lte => {
            qb.push(format!("t.{column} <= "));
            bind_value(qb, &filter.value);
        }
        FilterOp::Like => {
            qb.push(format!("t.{column} LIKE "));
            bind_value(qb, &filter.value);
        }
        FilterOp::ILike => {
            qb.push(format!("t.{column} ILIKE "));
            bind_value(qb, &filter.value);
        }
        FilterOp::In => {
            // Membership via jsonb containment: scalar <@ array.
            qb.push(format!("to_jsonb(t.{column}) <@ "));
            qb.push_bind(sqlx::types::Json(filter.value.clone()));
        }
        FilterOp::Contains => {
            qb.push(format!("to_jsonb(t.{column}) @> "));
            qb.push_bind(sqlx::types::Json(filter.value.clone()));
        }
        FilterOp::ContainedBy => {
            qb.push(format!("to_jsonb(t.{column}) <@ "));
            qb.push_bind(sqlx::types::Json(filter.value.clone()));
        }
        FilterOp::TextSearch => {
            qb.push(format!("t.{column} ILIKE '%' || "));
            bind_value(qb, &filter.value);
            qb.push(" || '%'");
        }
    }
    Ok(())
}

fn push_where(qb: &mut QueryBuilder<'_, Postgres>, spec: &QuerySpec) -> Result<(), BackendError> {
    qb.push(" WHERE TRUE");

    if let Some(tenant_id) = spec.tenant_id {
        qb.push(" AND t.tenant_id = ");
        qb.push_bind(*tenant_id.as_uuid());
    }

    for filter in &spec.filters {
        qb.push(" AND ");
        push_filter(qb, filter)?;
    }

    if !spec.or_branches.is_empty() {
        qb.push(" AND (");
        for (i, branch) in spec.or_branches.iter().enumerate() {
            if i > 0 {
                qb.push(" OR ");
            }
            qb.push("(");
            if branch.is_empty() {
                qb.push("TRUE");
            }
            for (j, filter) in branch.iter().enumerate() {
                if j > 0 {
                    qb.push(" AND ");
                }
                push_filter(qb, filter)?;
            }
            qb.push(")");
        }
        qb.push(")");
    }
    Ok(())
}

fn push_order_window(
    qb: &mut QueryBuilder<'_, Postgres>,
    spec: &QuerySpec,
) -> Result<(), BackendError> {
    if !spec.order.is_empty() {
        qb.push(" ORDER BY ");
        for (i, (column, direction)) in spec.order.iter().enumerate() {
            if i > 0 {
                qb.push(", ");
            }
            qb.push(format!("t.{}", ident(column)?));
            qb.push(match direction {
                Direction::Asc => " ASC",
                Direction::Desc => " DESC",
            });
        }
    }
    if let Some(limit) = spec.limit {
        qb.push(" LIMIT ");
        qb.push_bind(limit as i64);
    }
    if let Some(offset) = spec.offset {
        qb.push(" OFFSET ");
        qb.push_bind(offset as i64);
    }
    Ok(())
}

fn decode_row(value: Value) -> Result<Row, BackendError> {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(BackendError::Other(format!(
            "expected a JSON object row, got {other}"
        ))),
    }
}

fn project(spec: &QuerySpec, mut row: Row) -> Row {
    match &spec.columns {
        None => row,
        Some(columns) => {
            row.retain(|key, _| columns.iter().any(|c| c == key));
            row
        }
    }
}

#[async_trait]
impl Backend for PostgresBackend {
    async fn select(&self, spec: &QuerySpec) -> Result<Vec<Row>, BackendError> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT to_jsonb(t.*) AS row FROM ");
        qb.push(ident(&spec.table)?);
        qb.push(" AS t");
        push_where(&mut qb, spec)?;
        push_order_window(&mut qb, spec)?;

        let rows = qb.build().fetch_all(&self.pool).await.map_err(map_sqlx)?;
        rows.into_iter()
            .map(|row| {
                let value: Value = row.try_get("row").map_err(map_sqlx)?;
                decode_row(value).map(|row| project(spec, row))
            })
            .collect()
    }

    async fn count(&self, spec: &QuerySpec) -> Result<u64, BackendError> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) AS total FROM ");
        qb.push(ident(&spec.table)?);
        qb.push(" AS t");
        push_where(&mut qb, spec)?;

        let row = qb.build().fetch_one(&self.pool).await.map_err(map_sqlx)?;
        let total: i64 = row.try_get("total").map_err(map_sqlx)?;
        Ok(total.max(0) as u64)
    }

    async fn insert(&self, table: &str, rows: Vec<Row>) -> Result<Vec<Row>, BackendError> {
        let Some(first) = rows.first() else {
            return Ok(Vec::new());
        };
        let columns: Vec<String> = first.keys().cloned().collect();

        let table = ident(table)?;
        let mut qb = QueryBuilder::<Postgres>::new(format!("INSERT INTO {table} ("));
        for (i, column) in columns.iter().enumerate() {
            if i > 0 {
                qb.push(", ");
            }
            qb.push(ident(column)?);
        }
        qb.push(") VALUES ");

        for (i, row) in rows.iter().enumerate() {
            if i > 0 {
                qb.push(", ");
            }
            qb.push("(");
            for (j, column) in columns.iter().enumerate() {
                if j > 0 {
                    qb.push(", ");
                }
                bind_value(&mut qb, row.get(column).unwrap_or(&Value::Null));
            }
            qb.push(")");
        }
        qb.push(format!(" RETURNING to_jsonb({table}.*) AS row"));

        let rows = qb.build().fetch_all(&self.pool).await.map_err(map_sqlx)?;
        rows.into_iter()
            .map(|row| {
                let value: Value = row.try_get("row").map_err(map_sqlx)?;
                decode_row(value)
            })
            .collect()
    }

    async fn update(&self, spec: &QuerySpec, changes: Row) -> Result<Vec<Row>, BackendError> {
        if changes.is_empty() {
            return self.select(spec).await;
        }

        let mut qb = QueryBuilder::<Postgres>::new("UPDATE ");
        qb.push(ident(&spec.table)?);
        qb.push(" AS t SET ");
        for (i, (column, value)) in changes.iter().enumerate() {
            if i > 0 {
                qb.push(", ");
            }
            qb.push(ident(column)?);
            qb.push(" = ");
            bind_value(&mut qb, value);
        }
        push_where(&mut qb, spec)?;
        qb.push(" RETURNING to_jsonb(t.*) AS row");

        let rows = qb.build().fetch_all(&self.pool).await.map_err(map_sqlx)?;
        rows.into_iter()
            .map(|row| {
                let value: Value = row.try_get("row").map_err(map_sqlx)?;
                decode_row(value)
            })
            .collect()
    }

    async fn delete(&self, spec: &QuerySpec) -> Result<u64, BackendError> {
        let mut qb = QueryBuilder::<Postgres>::new("DELETE FROM ");
        qb.push(ident(&spec.table)?);
        qb.push(" AS t");
        push_where(&mut qb, spec)?;

        let result = qb.build().execute(&self.pool).await.map_err(map_sqlx)?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifiers_are_guarded() {
        assert!(ident("transcripts").is_ok());
        assert!(ident("output_files").is_ok());
        assert!(ident("7days").is_err());
        assert!(ident("users; DROP TABLE users").is_err());
        assert!(ident("").is_err());
    }

    #[test]
    fn where_clause_covers_tenant_filters_and_or_branches() {
        let tenant = scribehub_core::TenantId::new();
        let mut spec = QuerySpec::scoped("transcripts", tenant);
        spec.filters
            .push(Filter::eq("status", serde_json::json!("ready")));
        spec.or_branches.push(vec![Filter::new(
            "source_kind",
            FilterOp::Eq,
            serde_json::json!("audio"),
        )]);
        spec.or_branches.push(vec![Filter::new(
            "source_kind",
            FilterOp::Eq,
            serde_json::json!("video"),
        )]);

        let mut qb = QueryBuilder::<Postgres>::new("SELECT 1 FROM t");
        push_where(&mut qb, &spec).unwrap();
        let sql = qb.sql();

        assert!(sql.contains("t.tenant_id = $1"));
        assert!(sql.contains("t.status = $2"));
        assert!(sql.contains("OR"));
        assert!(sql.contains("t.source_kind = $3"));
    }

    #[test]
    fn null_equality_becomes_is_null() {
        let mut spec = QuerySpec::new("transcripts");
        spec.filters
            .push(Filter::eq("deleted_at", serde_json::Value::Null));

        let mut qb = QueryBuilder::<Postgres>::new("SELECT 1 FROM t");
        push_where(&mut qb, &spec).unwrap();
        assert!(qb.sql().contains("t.deleted_at IS NULL"));
    }
}
