//! In-memory backend.
//!
//! Intended for tests/dev. Not optimized for performance. Evaluates the full
//! operator set over JSON rows and simulates unique indexes so duplicate
//! classification can be exercised without a live store.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use serde_json::Value;

use scribehub_core::TenantId;

use crate::query::{Direction, Filter, FilterOp, QuerySpec};

use super::{Backend, BackendError, Row};

/// SQLSTATE unique-violation, what a relational store reports on a unique
/// index conflict.
const UNIQUE_VIOLATION: &str = "23505";

#[derive(Debug, Default)]
pub struct InMemoryBackend {
    tables: RwLock<HashMap<String, Vec<Row>>>,
    unique_indexes: RwLock<HashMap<String, Vec<Vec<String>>>>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a unique index over `columns` (scoped per tenant, like the
    /// hosted schema's composite indexes).
    pub fn with_unique_index(self, table: &str, columns: &[&str]) -> Self {
        self.unique_indexes
            .write()
            .expect("index lock poisoned")
            .entry(table.to_string())
            .or_default()
            .push(columns.iter().map(|c| (*c).to_string()).collect());
        self
    }

    fn lock_err() -> BackendError {
        BackendError::Other("table lock poisoned".to_string())
    }

    fn tenant_matches(row: &Row, tenant_id: Option<TenantId>) -> bool {
        match tenant_id {
            None => true,
            Some(tenant) => row
                .get("tenant_id")
                .and_then(Value::as_str)
                .is_some_and(|t| t == tenant.to_string()),
        }
    }

    fn matches(spec: &QuerySpec, row: &Row) -> bool {
        if !Self::tenant_matches(row, spec.tenant_id) {
            return false;
        }
        if !spec.filters.iter().all(|f| eval_filter(f, row)) {
            return false;
        }
        if spec.or_branches.is_empty() {
            return true;
        }
        spec.or_branches
            .iter()
            .any(|branch| branch.iter().all(|f| eval_filter(f, row)))
    }

    fn apply_order(spec: &QuerySpec, rows: &mut [Row]) {
        if spec.order.is_empty() {
            return;
        }
        rows.sort_by(|a, b| {
            for (column, direction) in &spec.order {
                let ord = compare_values(
                    a.get(column).unwrap_or(&Value::Null),
                    b.get(column).unwrap_or(&Value::Null),
                )
                .unwrap_or(Ordering::Equal);
                let ord = match direction {
                    Direction::Asc => ord,
                    Direction::Desc => ord.reverse(),
                };
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            Ordering::Equal
        });
    }

    fn apply_window(spec: &QuerySpec, rows: Vec<Row>) -> Vec<Row> {
        let offset = spec.offset.unwrap_or(0) as usize;
        let rows: Vec<Row> = rows.into_iter().skip(offset).collect();
        match spec.limit {
            Some(limit) => rows.into_iter().take(limit as usize).collect(),
            None => rows,
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

    fn check_unique(&self, table: &str, existing: &[Row], candidate: &Row) -> Result<(), BackendError> {
        let indexes = self.unique_indexes.read().map_err(|_| Self::lock_err())?;
        let Some(indexes) = indexes.get(table) else {
            return Ok(());
        };

        for columns in indexes {
            let candidate_key: Vec<&Value> = columns
                .iter()
                .map(|c| candidate.get(c).unwrap_or(&Value::Null))
                .collect();
            if candidate_key.iter().any(|v| v.is_null()) {
                continue;
            }
            let tenant = candidate.get("tenant_id");
            let clash = existing.iter().any(|row| {
                row.get("tenant_id") == tenant
                    && columns
                        .iter()
                        .zip(&candidate_key)
                        .all(|(c, v)| row.get(c) == Some(*v))
            });
            if clash {
                return Err(BackendError::store(
                    UNIQUE_VIOLATION,
                    format!(
                        "duplicate key value violates unique index on {table}({})",
                        columns.join(", ")
                    ),
                ));
            }
        }
        Ok(())
    }
}

#[async_trait]
impl Backend for InMemoryBackend {
    async fn select(&self, spec: &QuerySpec) -> Result<Vec<Row>, BackendError> {
        let tables = self.tables.read().map_err(|_| Self::lock_err())?;
        let mut rows: Vec<Row> = tables
            .get(&spec.table)
            .map(|rows| {
                rows.iter()
                    .filter(|row| Self::matches(spec, row))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        Self::apply_order(spec, &mut rows);
        let rows = Self::apply_window(spec, rows);
        Ok(rows
            .into_iter()
            .map(|row| Self::project(spec, row))
            .collect())
    }

    async fn count(&self, spec: &QuerySpec) -> Result<u64, BackendError> {
        let tables = self.tables.read().map_err(|_| Self::lock_err())?;
        Ok(tables
            .get(&spec.table)
            .map(|rows| rows.iter().filter(|row| Self::matches(spec, row)).count() as u64)
            .unwrap_or(0))
    }

    async fn insert(&self, table: &str, rows: Vec<Row>) -> Result<Vec<Row>, BackendError> {
        let mut tables = self.tables.write().map_err(|_| Self::lock_err())?;
        let stored = tables.entry(table.to_string()).or_default();

        // Validate the whole batch before mutating: all or nothing.
        for row in &rows {
            self.check_unique(table, stored, row)?;
        }

        for row in &rows {
            stored.push(row.clone());
        }
        Ok(rows)
    }

    async fn update(&self, spec: &QuerySpec, changes: Row) -> Result<Vec<Row>, BackendError> {
        let mut tables = self.tables.write().map_err(|_| Self::lock_err())?;
        let Some(stored) = tables.get_mut(&spec.table) else {
            return Ok(Vec::new());
        };

        let mut updated = Vec::new();
        for row in stored.iter_mut() {
            if Self::matches(spec, row) {
                for (key, value) in &changes {
                    row.insert(key.clone(), value.clone());
                }
                updated.push(row.clone());
            }
        }
        Ok(updated)
    }

    async fn delete(&self, spec: &QuerySpec) -> Result<u64, BackendError> {
        let mut tables = self.tables.write().map_err(|_| Self::lock_err())?;
        let Some(stored) = tables.get_mut(&spec.table) else {
            return Ok(0);
        };

        let before = stored.len();
        stored.retain(|row| !Self::matches(spec, row));
        Ok((before - stored.len()) as u64)
    }
}

fn eval_filter(filter: &Filter, row: &Row) -> bool {
    let actual = row.get(&filter.column).unwrap_or(&Value::Null);
    let expected = &filter.value;

    match filter.op {
        FilterOp::Eq => actual == expected,
        FilterOp::Neq => actual != expected,
        FilterOp::Gt => compare_values(actual, expected) == Some(Ordering::Greater),
        FilterOp::Gte => matches!(
            compare_values(actual, expected),
            Some(Ordering::Greater | Ordering::Equal)
        ),
        FilterOp::Lt => compare_values(actual, expected) == Some(Ordering::Less),
        FilterOp::Lte => matches!(
            compare_values(actual, expected),
            Some(Ordering::Less | Ordering::Equal)
        ),
        FilterOp::Like => match (actual.as_str(), expected.as_str()) {
            (Some(text), Some(pattern)) => like_match(text, pattern, false),
            _ => false,
        },
        FilterOp::ILike => match (actual.as_str(), expected.as_str()) {
            (Some(text), Some(pattern)) => like_match(text, pattern, true),
            _ => false,
        },
        FilterOp::In => expected
            .as_array()
            .is_some_and(|allowed| allowed.contains(actual)),
        FilterOp::Contains => contains(actual, expected),
        FilterOp::ContainedBy => contains(expected, actual),
        FilterOp::TextSearch => match (actual.as_str(), expected.as_str()) {
            (Some(text), Some(needle)) => text.to_lowercase().contains(&needle.to_lowercase()),
            _ => false,
        },
    }
}

/// Containment in the relational-store sense: arrays contain all elements of
/// the other array, objects contain all entries of the other object.
fn contains(outer: &Value, inner: &Value) -> bool {
    match (outer, inner) {
        (Value::Array(outer), Value::Array(inner)) => {
            inner.iter().all(|item| outer.contains(item))
        }
        (Value::Object(outer), Value::Object(inner)) => inner
            .iter()
            .all(|(key, value)| outer.get(key) == Some(value)),
        _ => false,
    }
}

/// Partial order across JSON scalars; cross-type comparisons are undefined.
/// Strings that both parse as RFC 3339 timestamps compare chronologically —
/// lexicographic order breaks down across differing sub-second precision.
fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(a), Value::Number(b)) => a.as_f64().partial_cmp(&b.as_f64()),
        (Value::String(a), Value::String(b)) => {
            if let (Ok(a), Ok(b)) = (
                a.parse::<chrono::DateTime<chrono::Utc>>(),
                b.parse::<chrono::DateTime<chrono::Utc>>(),
            ) {
                return Some(a.cmp(&b));
            }
            Some(a.cmp(b))
        }
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        (Value::Null, Value::Null) => Some(Ordering::Equal),
        _ => None,
    }
}

/// `%`-wildcard matching; `_` is treated literally (unused in practice).
fn like_match(text: &str, pattern: &str, case_insensitive: bool) -> bool {
    let (text, pattern) = if case_insensitive {
        (text.to_lowercase(), pattern.to_lowercase())
    } else {
        (text.to_string(), pattern.to_string())
    };

    let parts: Vec<&str> = pattern.split('%').collect();
    if parts.len() == 1 {
        return text == pattern;
    }

    let mut remaining = text.as_str();

    if let Some(first) = parts.first() {
        if !first.is_empty() {
            match remaining.strip_prefix(first) {
                Some(rest) => remaining = rest,
                None => return false,
            }
        }
    }

    if let Some(last) = parts.last() {
        if !last.is_empty() {
            match remaining.strip_suffix(last) {
                Some(rest) => remaining = rest,
                None => return false,
            }
        }
    }

    for middle in &parts[1..parts.len() - 1] {
        if middle.is_empty() {
            continue;
        }
        match remaining.find(middle) {
            Some(pos) => remaining = &remaining[pos + middle.len()..],
            None => return false,
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(pairs: &[(&str, Value)]) -> Row {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn like_matching_handles_wildcards() {
        assert!(like_match("weekly standup", "weekly%", false));
        assert!(like_match("weekly standup", "%standup", false));
        assert!(like_match("weekly standup", "%ly sta%", false));
        assert!(like_match("weekly standup", "weekly%standup", false));
        assert!(!like_match("weekly standup", "daily%", false));
        assert!(like_match("Weekly Standup", "weekly%", true));
        assert!(!like_match("Weekly Standup", "weekly%", false));
    }

    #[test]
    fn containment_covers_arrays_and_objects() {
        assert!(contains(&json!(["a", "b", "c"]), &json!(["a", "c"])));
        assert!(!contains(&json!(["a"]), &json!(["a", "b"])));
        assert!(contains(&json!({"a": 1, "b": 2}), &json!({"a": 1})));
        assert!(!contains(&json!({"a": 1}), &json!({"a": 2})));
    }

    #[tokio::test]
    async fn tenant_scope_is_applied_to_every_operation() {
        let backend = InMemoryBackend::new();
        let tenant_a = TenantId::new();
        let tenant_b = TenantId::new();

        backend
            .insert(
                "things",
                vec![
                    row(&[("id", json!("1")), ("tenant_id", json!(tenant_a.to_string()))]),
                    row(&[("id", json!("2")), ("tenant_id", json!(tenant_b.to_string()))]),
                ],
            )
            .await
            .unwrap();

        let spec = QuerySpec::scoped("things", tenant_a);
        assert_eq!(backend.select(&spec).await.unwrap().len(), 1);
        assert_eq!(backend.count(&spec).await.unwrap(), 1);
        assert_eq!(backend.delete(&spec).await.unwrap(), 1);

        // Tenant B's row survived tenant A's blanket delete.
        let spec_b = QuerySpec::scoped("things", tenant_b);
        assert_eq!(backend.count(&spec_b).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn unique_index_reports_unique_violation_code() {
        let backend =
            InMemoryBackend::new().with_unique_index("transcript_types", &["category", "type"]);
        let tenant = TenantId::new();

        let first = row(&[
            ("tenant_id", json!(tenant.to_string())),
            ("category", json!("Meetings")),
            ("type", json!("Standup")),
        ]);
        backend
            .insert("transcript_types", vec![first.clone()])
            .await
            .unwrap();

        let err = backend
            .insert("transcript_types", vec![first])
            .await
            .unwrap_err();
        assert_eq!(err.code(), Some(UNIQUE_VIOLATION));

        // Same key under another tenant is fine: indexes are tenant-scoped.
        let other = TenantId::new();
        backend
            .insert(
                "transcript_types",
                vec![row(&[
                    ("tenant_id", json!(other.to_string())),
                    ("category", json!("Meetings")),
                    ("type", json!("Standup")),
                ])],
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn update_merges_changes_into_matching_rows() {
        let backend = InMemoryBackend::new();
        let tenant = TenantId::new();
        backend
            .insert(
                "things",
                vec![row(&[
                    ("id", json!("1")),
                    ("tenant_id", json!(tenant.to_string())),
                    ("status", json!("pending")),
                ])],
            )
            .await
            .unwrap();

        let mut spec = QuerySpec::scoped("things", tenant);
        spec.filters.push(Filter::eq("id", json!("1")));
        let updated = backend
            .update(&spec, row(&[("status", json!("ready"))]))
            .await
            .unwrap();

        assert_eq!(updated.len(), 1);
        assert_eq!(updated[0]["status"], json!("ready"));
        assert_eq!(updated[0]["id"], json!("1"));
    }
}
