//! Output type catalog.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

use scribehub_core::{DomainResult, RecordId, TenantId};
use scribehub_store::validate::{validate_enum, validate_required, validate_types, ValueKind};
use scribehub_store::{Direction, FilterOp, Repository, Row, Store};

const RESOURCE: &str = "OutputType";
const TABLE: &str = "output_types";

const REQUIRED: &[&str] = &["name", "format"];
const TYPES: &[(&str, ValueKind)] = &[
    ("name", ValueKind::String),
    ("format", ValueKind::String),
    ("description", ValueKind::String),
];

pub const FORMATS: &[&str] = &["summary", "slides", "audio", "video"];

/// Derivative artifact format.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Summary,
    Slides,
    Audio,
    Video,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputType {
    pub id: RecordId,
    pub tenant_id: TenantId,
    pub name: String,
    pub format: OutputFormat,
    #[serde(default)]
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct OutputTypeService {
    repo: Repository<OutputType>,
}

impl OutputTypeService {
    pub fn new(store: Store) -> Self {
        Self {
            repo: Repository::new(store, TABLE, RESOURCE),
        }
    }

    pub async fn create(&self, tenant_id: TenantId, payload: Row) -> DomainResult<OutputType> {
        validate_required(&payload, REQUIRED, RESOURCE)?;
        validate_types(&payload, TYPES, RESOURCE)?;
        if let Some(format) = payload.get("format").and_then(|v| v.as_str()) {
            validate_enum(format, FORMATS, "format", RESOURCE)?;
        }
        self.repo.insert(tenant_id, payload).await
    }

    pub async fn get(&self, tenant_id: TenantId, id: RecordId) -> DomainResult<OutputType> {
        self.repo.find_by_id(tenant_id, id).await
    }

    pub async fn list(
        &self,
        tenant_id: TenantId,
        format: Option<&str>,
    ) -> DomainResult<Vec<OutputType>> {
        let mut query = self
            .repo
            .query(tenant_id)
            .order_by("name", Direction::Asc);
        if let Some(format) = format {
            query = query.filter("format", FilterOp::Eq, json!(format));
        }
        let rows = query.fetch_all().await?;
        self.repo.decode_rows(rows)
    }

    pub async fn delete(&self, tenant_id: TenantId, id: RecordId) -> DomainResult<()> {
        self.repo.delete_by_id(tenant_id, id).await
    }
}
