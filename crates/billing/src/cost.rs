//! Cost records: what a transcript cost to process.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

use scribehub_core::{DomainError, DomainResult, RecordId, TenantId};
use scribehub_store::validate::{
    validate_enum, validate_range, validate_required, validate_types, Bounds, ValueKind,
};
use scribehub_store::{Direction, FilterOp, Repository, Row, Store};

const RESOURCE: &str = "CostRecord";
const TABLE: &str = "cost_records";
const TRANSCRIPTS_TABLE: &str = "transcripts";

const REQUIRED: &[&str] = &["transcript_id", "amount_cents", "kind"];
const TYPES: &[(&str, ValueKind)] = &[
    ("transcript_id", ValueKind::String),
    ("amount_cents", ValueKind::Number),
    ("kind", ValueKind::String),
];

pub const KINDS: &[&str] = &["transcription", "generation", "storage"];

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CostKind {
    Transcription,
    Generation,
    Storage,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostRecord {
    pub id: RecordId,
    pub tenant_id: TenantId,
    pub transcript_id: RecordId,
    pub amount_cents: i64,
    pub kind: CostKind,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct CostService {
    repo: Repository<CostRecord>,
}

impl CostService {
    pub fn new(store: Store) -> Self {
        Self {
            repo: Repository::new(store, TABLE, RESOURCE),
        }
    }

    pub async fn create(&self, tenant_id: TenantId, payload: Row) -> DomainResult<CostRecord> {
        validate_required(&payload, REQUIRED, RESOURCE)?;
        validate_types(&payload, TYPES, RESOURCE)?;
        if let Some(kind) = payload.get("kind").and_then(|v| v.as_str()) {
            validate_enum(kind, KINDS, "kind", RESOURCE)?;
        }
        if let Some(amount) = payload.get("amount_cents").and_then(|v| v.as_f64()) {
            validate_range(amount, Bounds::at_least(0.0), "amount_cents", RESOURCE)?;
        }

        let transcript_id: RecordId = payload
            .get("transcript_id")
            .and_then(|v| v.as_str())
            .ok_or_else(|| {
                DomainError::validation(RESOURCE, "transcript_id must be an id string")
            })?
            .parse()?;

        if !self
            .repo
            .store()
            .exists(TRANSCRIPTS_TABLE, tenant_id, transcript_id)
            .await?
        {
            return Err(DomainError::foreign_key(
                RESOURCE,
                format!("referenced transcript {transcript_id} does not exist"),
            ));
        }

        self.repo.insert(tenant_id, payload).await
    }

    pub async fn list_for_transcript(
        &self,
        tenant_id: TenantId,
        transcript_id: RecordId,
    ) -> DomainResult<Vec<CostRecord>> {
        let rows = self
            .repo
            .query(tenant_id)
            .filter("transcript_id", FilterOp::Eq, json!(transcript_id))
            .order_by("created_at", Direction::Asc)
            .fetch_all()
            .await?;
        self.repo.decode_rows(rows)
    }

    /// Total spend for a tenant, in cents, scanned in batches.
    pub async fn total_cents(&self, tenant_id: TenantId) -> DomainResult<i64> {
        let mut total: i64 = 0;
        self.repo
            .query(tenant_id)
            .stream(200, |batch| {
                for row in batch {
                    total += row.get("amount_cents").and_then(|v| v.as_i64()).unwrap_or(0);
                }
                Ok(())
            })
            .await?;
        Ok(total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scribehub_core::ErrorCode;
    use scribehub_transcripts::TranscriptService;
    use serde_json::Value;

    fn payload(value: Value) -> Row {
        match value {
            Value::Object(map) => map,
            _ => panic!("test payload must be an object"),
        }
    }

    async fn transcript(store: &Store, tenant: TenantId) -> RecordId {
        TranscriptService::new(store.clone())
            .create(
                tenant,
                payload(json!({"title": "episode", "source_kind": "audio"})),
            )
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn create_verifies_transcript_reference() {
        let store = Store::in_memory();
        let service = CostService::new(store.clone());
        let tenant = TenantId::new();
        let transcript_id = transcript(&store, tenant).await;

        service
            .create(
                tenant,
                payload(json!({
                    "transcript_id": transcript_id.to_string(),
                    "amount_cents": 125,
                    "kind": "transcription"
                })),
            )
            .await
            .unwrap();

        let err = service
            .create(
                tenant,
                payload(json!({
                    "transcript_id": RecordId::new().to_string(),
                    "amount_cents": 125,
                    "kind": "transcription"
                })),
            )
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::ForeignKey);
    }

    #[tokio::test]
    async fn negative_amounts_and_unknown_kinds_are_rejected() {
        let store = Store::in_memory();
        let service = CostService::new(store.clone());
        let tenant = TenantId::new();
        let transcript_id = transcript(&store, tenant).await;

        let err = service
            .create(
                tenant,
                payload(json!({
                    "transcript_id": transcript_id.to_string(),
                    "amount_cents": -5,
                    "kind": "transcription"
                })),
            )
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::Validation);

        let err = service
            .create(
                tenant,
                payload(json!({
                    "transcript_id": transcript_id.to_string(),
                    "amount_cents": 5,
                    "kind": "consulting"
                })),
            )
            .await
            .unwrap_err();
        assert!(err.message().contains("transcription, generation, storage"));
    }

    #[tokio::test]
    async fn totals_stream_across_batches() {
        let store = Store::in_memory();
        let service = CostService::new(store.clone());
        let tenant = TenantId::new();
        let transcript_id = transcript(&store, tenant).await;

        for _ in 0..250 {
            service
                .create(
                    tenant,
                    payload(json!({
                        "transcript_id": transcript_id.to_string(),
                        "amount_cents": 3,
                        "kind": "storage"
                    })),
                )
                .await
                .unwrap();
        }

        assert_eq!(service.total_cents(tenant).await.unwrap(), 750);
    }
}
