//! Playlists: ordered collections of transcripts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

use scribehub_core::{DomainError, DomainResult, RecordId, TenantId};
use scribehub_store::validate::{
    validate_array_length, validate_required, validate_types, Bounds, ValueKind,
};
use scribehub_store::{Direction, Repository, Row, Store};

const RESOURCE: &str = "Playlist";
const TABLE: &str = "playlists";
const TRANSCRIPTS_TABLE: &str = "transcripts";

const REQUIRED: &[&str] = &["name"];
const TYPES: &[(&str, ValueKind)] = &[
    ("name", ValueKind::String),
    ("transcript_ids", ValueKind::Array),
];

/// Hard cap on playlist size.
const MAX_ITEMS: usize = 100;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Playlist {
    pub id: RecordId,
    pub tenant_id: TenantId,
    pub name: String,
    /// Stored order is presentation order.
    #[serde(default)]
    pub transcript_ids: Vec<RecordId>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Clone)]
pub struct PlaylistService {
    repo: Repository<Playlist>,
}

impl PlaylistService {
    pub fn new(store: Store) -> Self {
        Self {
            repo: Repository::new(store, TABLE, RESOURCE),
        }
    }

    fn validate(payload: &Row) -> DomainResult<()> {
        validate_types(payload, TYPES, RESOURCE)?;
        if let Some(ids) = payload.get("transcript_ids").and_then(|v| v.as_array()) {
            validate_array_length(ids, Bounds::at_most(MAX_ITEMS), "transcript_ids", RESOURCE)?;
        }
        Ok(())
    }

    /// Every referenced transcript must exist in the same tenant.
    async fn verify_transcripts(&self, tenant_id: TenantId, ids: &[RecordId]) -> DomainResult<()> {
        for id in ids {
            if !self
                .repo
                .store()
                .exists(TRANSCRIPTS_TABLE, tenant_id, *id)
                .await?
            {
                return Err(DomainError::foreign_key(
                    RESOURCE,
                    format!("referenced transcript {id} does not exist"),
                ));
            }
        }
        Ok(())
    }

    fn parse_ids(payload: &Row) -> DomainResult<Vec<RecordId>> {
        let Some(values) = payload.get("transcript_ids").and_then(|v| v.as_array()) else {
            return Ok(Vec::new());
        };
        values
            .iter()
            .map(|value| {
                value
                    .as_str()
                    .ok_or_else(|| {
                        DomainError::validation(RESOURCE, "transcript_ids must contain id strings")
                    })?
                    .parse()
            })
            .collect()
    }

    pub async fn create(&self, tenant_id: TenantId, mut payload: Row) -> DomainResult<Playlist> {
        validate_required(&payload, REQUIRED, RESOURCE)?;
        Self::validate(&payload)?;

        let ids = Self::parse_ids(&payload)?;
        self.verify_transcripts(tenant_id, &ids).await?;

        payload
            .entry("transcript_ids".to_string())
            .or_insert_with(|| json!([]));
        self.repo.insert(tenant_id, payload).await
    }

    pub async fn get(&self, tenant_id: TenantId, id: RecordId) -> DomainResult<Playlist> {
        self.repo.find_by_id(tenant_id, id).await
    }

    pub async fn list(&self, tenant_id: TenantId) -> DomainResult<Vec<Playlist>> {
        let rows = self
            .repo
            .query(tenant_id)
            .order_by("created_at", Direction::Desc)
            .fetch_all()
            .await?;
        self.repo.decode_rows(rows)
    }

    pub async fn update(
        &self,
        tenant_id: TenantId,
        id: RecordId,
        payload: Row,
    ) -> DomainResult<Playlist> {
        Self::validate(&payload)?;
        let ids = Self::parse_ids(&payload)?;
        self.verify_transcripts(tenant_id, &ids).await?;
        self.repo.update_by_id(tenant_id, id, payload).await
    }

    pub async fn delete(&self, tenant_id: TenantId, id: RecordId) -> DomainResult<()> {
        self.repo.delete_by_id(tenant_id, id).await
    }

    /// Append transcripts, preserving order and re-validating the size cap.
    pub async fn add_transcripts(
        &self,
        tenant_id: TenantId,
        id: RecordId,
        transcript_ids: &[RecordId],
    ) -> DomainResult<Playlist> {
        self.verify_transcripts(tenant_id, transcript_ids).await?;

        let playlist = self.get(tenant_id, id).await?;
        let mut combined = playlist.transcript_ids;
        for transcript_id in transcript_ids {
            if !combined.contains(transcript_id) {
                combined.push(*transcript_id);
            }
        }

        let as_values: Vec<serde_json::Value> =
            combined.iter().map(|id| json!(id)).collect();
        validate_array_length(
            &as_values,
            Bounds::at_most(MAX_ITEMS),
            "transcript_ids",
            RESOURCE,
        )?;

        let mut changes = Row::new();
        changes.insert("transcript_ids".to_string(), json!(combined));
        self.repo.update_by_id(tenant_id, id, changes).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcript::TranscriptService;
    use scribehub_core::ErrorCode;
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
    async fn create_requires_name() {
        let service = PlaylistService::new(Store::in_memory());
        let err = service
            .create(TenantId::new(), payload(json!({})))
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::Validation);
        assert_eq!(err.message(), "Playlist: missing required fields: name");
    }

    #[tokio::test]
    async fn create_rejects_unknown_transcripts() {
        let service = PlaylistService::new(Store::in_memory());
        let err = service
            .create(
                TenantId::new(),
                payload(json!({
                    "name": "Favorites",
                    "transcript_ids": [RecordId::new().to_string()]
                })),
            )
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::ForeignKey);
    }

    #[tokio::test]
    async fn add_transcripts_appends_in_order_without_duplicates() {
        let store = Store::in_memory();
        let service = PlaylistService::new(store.clone());
        let tenant = TenantId::new();

        let first = transcript(&store, tenant).await;
        let second = transcript(&store, tenant).await;

        let playlist = service
            .create(
                tenant,
                payload(json!({
                    "name": "Favorites",
                    "transcript_ids": [first.to_string()]
                })),
            )
            .await
            .unwrap();

        let updated = service
            .add_transcripts(tenant, playlist.id, &[first, second])
            .await
            .unwrap();
        assert_eq!(updated.transcript_ids, vec![first, second]);
    }

    #[tokio::test]
    async fn cross_tenant_transcripts_do_not_count_as_existing() {
        let store = Store::in_memory();
        let service = PlaylistService::new(store.clone());
        let tenant_a = TenantId::new();
        let tenant_b = TenantId::new();

        let foreign = transcript(&store, tenant_b).await;
        let err = service
            .create(
                tenant_a,
                payload(json!({
                    "name": "Favorites",
                    "transcript_ids": [foreign.to_string()]
                })),
            )
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::ForeignKey);
    }
}
