//! Output files: generated artifacts.
//!
//! Creation verifies both referenced entities (transcript, output type)
//! exist in the same tenant before inserting. Sequential checks, not a
//! store-enforced constraint.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

use scribehub_core::{DomainError, DomainResult, RecordId, TenantId};
use scribehub_store::validate::{validate_enum, validate_required, validate_types, ValueKind};
use scribehub_store::{Direction, FilterOp, Repository, Row, Store};

const RESOURCE: &str = "OutputFile";
const TABLE: &str = "output_files";
const TRANSCRIPTS_TABLE: &str = "transcripts";
const OUTPUT_TYPES_TABLE: &str = "output_types";

const REQUIRED: &[&str] = &["transcript_id", "output_type_id"];
const TYPES: &[(&str, ValueKind)] = &[
    ("transcript_id", ValueKind::String),
    ("output_type_id", ValueKind::String),
    ("status", ValueKind::String),
    ("storage_path", ValueKind::String),
];

pub const STATUSES: &[&str] = &["pending", "generating", "ready", "failed"];

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFileStatus {
    Pending,
    Generating,
    Ready,
    Failed,
}

impl OutputFileStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            OutputFileStatus::Pending => "pending",
            OutputFileStatus::Generating => "generating",
            OutputFileStatus::Ready => "ready",
            OutputFileStatus::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputFile {
    pub id: RecordId,
    pub tenant_id: TenantId,
    pub transcript_id: RecordId,
    pub output_type_id: RecordId,
    pub status: OutputFileStatus,
    #[serde(default)]
    pub storage_path: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Clone)]
pub struct OutputFileService {
    repo: Repository<OutputFile>,
}

impl OutputFileService {
    pub fn new(store: Store) -> Self {
        Self {
            repo: Repository::new(store, TABLE, RESOURCE),
        }
    }

    fn parse_id(payload: &Row, field: &str) -> DomainResult<RecordId> {
        payload
            .get(field)
            .and_then(|v| v.as_str())
            .ok_or_else(|| DomainError::validation(RESOURCE, format!("{field} must be an id string")))?
            .parse()
    }

    pub async fn create(&self, tenant_id: TenantId, mut payload: Row) -> DomainResult<OutputFile> {
        validate_required(&payload, REQUIRED, RESOURCE)?;
        validate_types(&payload, TYPES, RESOURCE)?;
        if let Some(status) = payload.get("status").and_then(|v| v.as_str()) {
            validate_enum(status, STATUSES, "status", RESOURCE)?;
        }

        let transcript_id = Self::parse_id(&payload, "transcript_id")?;
        let output_type_id = Self::parse_id(&payload, "output_type_id")?;

        let store = self.repo.store();
        if !store.exists(TRANSCRIPTS_TABLE, tenant_id, transcript_id).await? {
            return Err(DomainError::foreign_key(
                RESOURCE,
                format!("referenced transcript {transcript_id} does not exist"),
            ));
        }
        if !store
            .exists(OUTPUT_TYPES_TABLE, tenant_id, output_type_id)
            .await?
        {
            return Err(DomainError::foreign_key(
                RESOURCE,
                format!("referenced output type {output_type_id} does not exist"),
            ));
        }

        payload
            .entry("status".to_string())
            .or_insert_with(|| json!(OutputFileStatus::Pending.as_str()));
        self.repo.insert(tenant_id, payload).await
    }

    pub async fn get(&self, tenant_id: TenantId, id: RecordId) -> DomainResult<OutputFile> {
        self.repo.find_by_id(tenant_id, id).await
    }

    /// Files for one transcript, newest first.
    pub async fn list_for_transcript(
        &self,
        tenant_id: TenantId,
        transcript_id: RecordId,
    ) -> DomainResult<Vec<OutputFile>> {
        let rows = self
            .repo
            .query(tenant_id)
            .filter("transcript_id", FilterOp::Eq, json!(transcript_id))
            .order_by("created_at", Direction::Desc)
            .fetch_all()
            .await?;
        self.repo.decode_rows(rows)
    }

    pub async fn mark_status(
        &self,
        tenant_id: TenantId,
        id: RecordId,
        status: OutputFileStatus,
    ) -> DomainResult<OutputFile> {
        let mut changes = Row::new();
        changes.insert("status".to_string(), json!(status.as_str()));
        self.repo.update_by_id(tenant_id, id, changes).await
    }

    pub async fn delete(&self, tenant_id: TenantId, id: RecordId) -> DomainResult<()> {
        self.repo.delete_by_id(tenant_id, id).await
    }
}
