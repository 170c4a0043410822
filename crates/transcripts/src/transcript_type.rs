//! Transcript type catalog.
//!
//! Per-tenant taxonomy rows: category / type / sub-type. All three fields
//! are required; an empty string counts as missing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

use scribehub_core::{DomainResult, RecordId, TenantId};
use scribehub_store::validate::{validate_required, validate_types, ValueKind};
use scribehub_store::{Direction, FilterOp, Repository, Row, Store};

const RESOURCE: &str = "TranscriptType";
const TABLE: &str = "transcript_types";

const REQUIRED: &[&str] = &["category", "type", "sub_type"];
const TYPES: &[(&str, ValueKind)] = &[
    ("category", ValueKind::String),
    ("type", ValueKind::String),
    ("sub_type", ValueKind::String),
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptType {
    pub id: RecordId,
    pub tenant_id: TenantId,
    pub category: String,
    #[serde(rename = "type")]
    pub type_name: String,
    pub sub_type: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct TranscriptTypeService {
    repo: Repository<TranscriptType>,
}

impl TranscriptTypeService {
    pub fn new(store: Store) -> Self {
        Self {
            repo: Repository::new(store, TABLE, RESOURCE),
        }
    }

    pub async fn create(&self, tenant_id: TenantId, payload: Row) -> DomainResult<TranscriptType> {
        validate_required(&payload, REQUIRED, RESOURCE)?;
        validate_types(&payload, TYPES, RESOURCE)?;
        self.repo.insert(tenant_id, payload).await
    }

    pub async fn get(&self, tenant_id: TenantId, id: RecordId) -> DomainResult<TranscriptType> {
        self.repo.find_by_id(tenant_id, id).await
    }

    /// Full catalog for a tenant, optionally narrowed to one category.
    pub async fn list(
        &self,
        tenant_id: TenantId,
        category: Option<&str>,
    ) -> DomainResult<Vec<TranscriptType>> {
        let mut query = self
            .repo
            .query(tenant_id)
            .order_by("category", Direction::Asc)
            .order_by("type", Direction::Asc);
        if let Some(category) = category {
            query = query.filter("category", FilterOp::Eq, json!(category));
        }
        let rows = query.fetch_all().await?;
        self.repo.decode_rows(rows)
    }

    pub async fn delete(&self, tenant_id: TenantId, id: RecordId) -> DomainResult<()> {
        self.repo.delete_by_id(tenant_id, id).await
    }
}
