//! AI model catalog. Each model belongs to a provider in the same tenant.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

use scribehub_core::{DomainError, DomainResult, RecordId, TenantId};
use scribehub_store::validate::{validate_enum, validate_required, validate_types, ValueKind};
use scribehub_store::{Direction, FilterOp, Repository, Row, Store};

const RESOURCE: &str = "AiModel";
const TABLE: &str = "ai_models";
const PROVIDERS_TABLE: &str = "ai_providers";

const REQUIRED: &[&str] = &["provider_id", "name", "modality"];
const TYPES: &[(&str, ValueKind)] = &[
    ("provider_id", ValueKind::String),
    ("name", ValueKind::String),
    ("modality", ValueKind::String),
];

pub const MODALITIES: &[&str] = &["chat", "transcription", "speech", "vision"];

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Modality {
    Chat,
    Transcription,
    Speech,
    Vision,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiModel {
    pub id: RecordId,
    pub tenant_id: TenantId,
    pub provider_id: RecordId,
    pub name: String,
    pub modality: Modality,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Clone)]
pub struct AiModelService {
    repo: Repository<AiModel>,
}

impl AiModelService {
    pub fn new(store: Store) -> Self {
        Self {
            repo: Repository::new(store, TABLE, RESOURCE),
        }
    }

    pub async fn create(&self, tenant_id: TenantId, payload: Row) -> DomainResult<AiModel> {
        validate_required(&payload, REQUIRED, RESOURCE)?;
        validate_types(&payload, TYPES, RESOURCE)?;
        if let Some(modality) = payload.get("modality").and_then(|v| v.as_str()) {
            validate_enum(modality, MODALITIES, "modality", RESOURCE)?;
        }

        let provider_id: RecordId = payload
            .get("provider_id")
            .and_then(|v| v.as_str())
            .ok_or_else(|| {
                DomainError::validation(RESOURCE, "provider_id must be an id string")
            })?
            .parse()?;

        if !self
            .repo
            .store()
            .exists(PROVIDERS_TABLE, tenant_id, provider_id)
            .await?
        {
            return Err(DomainError::foreign_key(
                RESOURCE,
                format!("referenced provider {provider_id} does not exist"),
            ));
        }

        self.repo.insert(tenant_id, payload).await
    }

    pub async fn get(&self, tenant_id: TenantId, id: RecordId) -> DomainResult<AiModel> {
        self.repo.find_by_id(tenant_id, id).await
    }

    pub async fn list_for_provider(
        &self,
        tenant_id: TenantId,
        provider_id: RecordId,
    ) -> DomainResult<Vec<AiModel>> {
        let rows = self
            .repo
            .query(tenant_id)
            .filter("provider_id", FilterOp::Eq, json!(provider_id))
            .order_by("name", Direction::Asc)
            .fetch_all()
            .await?;
        self.repo.decode_rows(rows)
    }

    pub async fn delete(&self, tenant_id: TenantId, id: RecordId) -> DomainResult<()> {
        self.repo.delete_by_id(tenant_id, id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::AiProviderService;
    use scribehub_core::ErrorCode;
    use serde_json::Value;

    fn payload(value: Value) -> Row {
        match value {
            Value::Object(map) => map,
            _ => panic!("test payload must be an object"),
        }
    }

    #[tokio::test]
    async fn create_checks_provider_in_same_tenant() {
        let store = Store::in_memory();
        let providers = AiProviderService::new(store.clone());
        let models = AiModelService::new(store);

        let tenant = TenantId::new();
        let provider = providers
            .create(tenant, payload(json!({"name": "whisperer"})))
            .await
            .unwrap();

        let model = models
            .create(
                tenant,
                payload(json!({
                    "provider_id": provider.id.to_string(),
                    "name": "whisper-large",
                    "modality": "transcription"
                })),
            )
            .await
            .unwrap();
        assert_eq!(model.modality, Modality::Transcription);

        // Same provider id under another tenant does not exist.
        let err = models
            .create(
                TenantId::new(),
                payload(json!({
                    "provider_id": provider.id.to_string(),
                    "name": "whisper-large",
                    "modality": "transcription"
                })),
            )
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::ForeignKey);
    }

    #[tokio::test]
    async fn modality_is_enum_checked() {
        let store = Store::in_memory();
        let providers = AiProviderService::new(store.clone());
        let models = AiModelService::new(store);

        let tenant = TenantId::new();
        let provider = providers
            .create(tenant, payload(json!({"name": "whisperer"})))
            .await
            .unwrap();

        let err = models
            .create(
                tenant,
                payload(json!({
                    "provider_id": provider.id.to_string(),
                    "name": "mystery",
                    "modality": "telepathy"
                })),
            )
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::Validation);
        assert!(err.message().contains("chat, transcription, speech, vision"));
    }
}
