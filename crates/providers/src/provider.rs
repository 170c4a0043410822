//! AI provider catalog.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use scribehub_core::{DomainResult, RecordId, TenantId};
use scribehub_store::validate::{validate_required, validate_types, ValueKind};
use scribehub_store::{Direction, Repository, Row, Store};

const RESOURCE: &str = "AiProvider";
const TABLE: &str = "ai_providers";

const REQUIRED: &[&str] = &["name"];
const TYPES: &[(&str, ValueKind)] = &[
    ("name", ValueKind::String),
    ("api_base", ValueKind::String),
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiProvider {
    pub id: RecordId,
    pub tenant_id: TenantId,
    pub name: String,
    #[serde(default)]
    pub api_base: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Clone)]
pub struct AiProviderService {
    repo: Repository<AiProvider>,
}

impl AiProviderService {
    pub fn new(store: Store) -> Self {
        Self {
            repo: Repository::new(store, TABLE, RESOURCE),
        }
    }

    pub async fn create(&self, tenant_id: TenantId, payload: Row) -> DomainResult<AiProvider> {
        validate_required(&payload, REQUIRED, RESOURCE)?;
        validate_types(&payload, TYPES, RESOURCE)?;
        self.repo.insert(tenant_id, payload).await
    }

    pub async fn get(&self, tenant_id: TenantId, id: RecordId) -> DomainResult<AiProvider> {
        self.repo.find_by_id(tenant_id, id).await
    }

    pub async fn list(&self, tenant_id: TenantId) -> DomainResult<Vec<AiProvider>> {
        let rows = self
            .repo
            .query(tenant_id)
            .order_by("name", Direction::Asc)
            .fetch_all()
            .await?;
        self.repo.decode_rows(rows)
    }

    pub async fn update(
        &self,
        tenant_id: TenantId,
        id: RecordId,
        payload: Row,
    ) -> DomainResult<AiProvider> {
        validate_types(&payload, TYPES, RESOURCE)?;
        self.repo.update_by_id(tenant_id, id, payload).await
    }

    pub async fn delete(&self, tenant_id: TenantId, id: RecordId) -> DomainResult<()> {
        self.repo.delete_by_id(tenant_id, id).await
    }
}
