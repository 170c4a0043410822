//! Transcript operations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

use scribehub_core::{DomainResult, RecordId, TenantId};
use scribehub_store::validate::{
    validate_enum, validate_length, validate_range, validate_required, validate_types, Bounds,
    ValueKind,
};
use scribehub_store::{CursorPage, Direction, Filter, FilterOp, PageMeta, Repository, Row, Store};

const RESOURCE: &str = "Transcript";
const TABLE: &str = "transcripts";

const REQUIRED: &[&str] = &["title", "source_kind"];
const TYPES: &[(&str, ValueKind)] = &[
    ("title", ValueKind::String),
    ("source_kind", ValueKind::String),
    ("status", ValueKind::String),
    ("duration_seconds", ValueKind::Number),
    ("language", ValueKind::String),
];

pub const SOURCE_KINDS: &[&str] = &["audio", "video", "text"];
pub const STATUSES: &[&str] = &["uploaded", "processing", "transcribed", "failed"];

/// What kind of content the transcript was derived from.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Audio,
    Video,
    Text,
}

/// Processing lifecycle.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TranscriptStatus {
    Uploaded,
    Processing,
    Transcribed,
    Failed,
}

impl TranscriptStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            TranscriptStatus::Uploaded => "uploaded",
            TranscriptStatus::Processing => "processing",
            TranscriptStatus::Transcribed => "transcribed",
            TranscriptStatus::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transcript {
    pub id: RecordId,
    pub tenant_id: TenantId,
    pub title: String,
    pub source_kind: SourceKind,
    pub status: TranscriptStatus,
    #[serde(default)]
    pub duration_seconds: Option<f64>,
    #[serde(default)]
    pub language: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Listing parameters. One pagination mode per call: a cursor wins over the
/// offset pair when both are given.
#[derive(Debug, Clone, Default)]
pub struct TranscriptFilter {
    pub status: Option<String>,
    pub source_kind: Option<String>,
    /// Case-insensitive substring match on the title.
    pub search: Option<String>,
    pub cursor: Option<CursorPage>,
    pub page: Option<u64>,
    pub page_size: Option<u64>,
}

#[derive(Clone)]
pub struct TranscriptService {
    repo: Repository<Transcript>,
}

impl TranscriptService {
    pub fn new(store: Store) -> Self {
        Self {
            repo: Repository::new(store, TABLE, RESOURCE),
        }
    }

    fn validate(payload: &Row, creating: bool) -> DomainResult<()> {
        if creating {
            validate_required(payload, REQUIRED, RESOURCE)?;
        }
        validate_types(payload, TYPES, RESOURCE)?;

        if let Some(kind) = payload.get("source_kind").and_then(|v| v.as_str()) {
            validate_enum(kind, SOURCE_KINDS, "source_kind", RESOURCE)?;
        }
        if let Some(status) = payload.get("status").and_then(|v| v.as_str()) {
            validate_enum(status, STATUSES, "status", RESOURCE)?;
        }
        if let Some(duration) = payload.get("duration_seconds").and_then(|v| v.as_f64()) {
            validate_range(duration, Bounds::at_least(0.0), "duration_seconds", RESOURCE)?;
        }
        if let Some(language) = payload.get("language") {
            if !language.is_null() {
                validate_length(language, Bounds::between(2, 16), "language", RESOURCE)?;
            }
        }
        Ok(())
    }

    pub async fn create(&self, tenant_id: TenantId, mut payload: Row) -> DomainResult<Transcript> {
        Self::validate(&payload, true)?;
        payload
            .entry("status".to_string())
            .or_insert_with(|| json!(TranscriptStatus::Uploaded.as_str()));
        self.repo.insert(tenant_id, payload).await
    }

    pub async fn get(&self, tenant_id: TenantId, id: RecordId) -> DomainResult<Transcript> {
        self.repo.find_by_id(tenant_id, id).await
    }

    pub async fn list(
        &self,
        tenant_id: TenantId,
        filter: TranscriptFilter,
    ) -> DomainResult<(Vec<Transcript>, PageMeta)> {
        let mut predicates = Vec::new();
        if let Some(status) = &filter.status {
            predicates.push(Filter::eq("status", json!(status)));
        }
        if let Some(kind) = &filter.source_kind {
            predicates.push(Filter::eq("source_kind", json!(kind)));
        }
        if let Some(search) = &filter.search {
            predicates.push(Filter::new("title", FilterOp::TextSearch, json!(search)));
        }
        let mut query = self.repo.query(tenant_id).filters(predicates);

        query = match filter.cursor {
            Some(cursor) => query.paginate_by_cursor(cursor),
            None => {
                let page = filter.page.unwrap_or(1);
                let page_size = filter.page_size.unwrap_or(25);
                query
                    .order_by("created_at", Direction::Desc)
                    .paginate(page, page_size)
            }
        };

        let page = query.execute().await?;
        Ok((self.repo.decode_rows(page.rows)?, page.meta))
    }

    pub async fn update(
        &self,
        tenant_id: TenantId,
        id: RecordId,
        payload: Row,
    ) -> DomainResult<Transcript> {
        Self::validate(&payload, false)?;
        self.repo.update_by_id(tenant_id, id, payload).await
    }

    pub async fn delete(&self, tenant_id: TenantId, id: RecordId) -> DomainResult<()> {
        self.repo.delete_by_id(tenant_id, id).await
    }

    /// Status transition used by the processing pipeline boundary.
    pub async fn mark_status(
        &self,
        tenant_id: TenantId,
        id: RecordId,
        status: TranscriptStatus,
    ) -> DomainResult<Transcript> {
        let mut changes = Row::new();
        changes.insert("status".to_string(), json!(status.as_str()));
        self.repo.update_by_id(tenant_id, id, changes).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scribehub_core::ErrorCode;
    use serde_json::Value;

    fn service() -> TranscriptService {
        TranscriptService::new(Store::in_memory())
    }

    fn payload(value: Value) -> Row {
        match value {
            Value::Object(map) => map,
            _ => panic!("test payload must be an object"),
        }
    }

    #[tokio::test]
    async fn create_defaults_status_and_round_trips() {
        let service = service();
        let tenant = TenantId::new();

        let transcript = service
            .create(
                tenant,
                payload(json!({
                    "title": "Weekly standup",
                    "source_kind": "audio",
                    "duration_seconds": 1800.0,
                    "language": "en"
                })),
            )
            .await
            .unwrap();

        assert_eq!(transcript.status, TranscriptStatus::Uploaded);
        assert_eq!(transcript.source_kind, SourceKind::Audio);

        let found = service.get(tenant, transcript.id).await.unwrap();
        assert_eq!(found, transcript);
    }

    #[tokio::test]
    async fn create_names_every_missing_required_field() {
        let service = service();
        let err = service
            .create(TenantId::new(), payload(json!({"title": ""})))
            .await
            .unwrap_err();

        assert_eq!(err.code(), ErrorCode::Validation);
        assert_eq!(
            err.message(),
            "Transcript: missing required fields: title, source_kind"
        );
    }

    #[tokio::test]
    async fn create_rejects_unknown_source_kind() {
        let service = service();
        let err = service
            .create(
                TenantId::new(),
                payload(json!({"title": "Spec review", "source_kind": "pdf"})),
            )
            .await
            .unwrap_err();

        assert_eq!(err.code(), ErrorCode::Validation);
        assert!(err.message().contains("audio, video, text"));
    }

    #[tokio::test]
    async fn create_rejects_wrong_primitive_types_in_one_error() {
        let service = service();
        let err = service
            .create(
                TenantId::new(),
                payload(json!({
                    "title": 42,
                    "source_kind": "audio",
                    "duration_seconds": "long"
                })),
            )
            .await
            .unwrap_err();

        assert_eq!(err.code(), ErrorCode::Validation);
        assert!(err.message().contains("title (expected string, got number)"));
        assert!(err
            .message()
            .contains("duration_seconds (expected number, got string)"));
    }

    #[tokio::test]
    async fn list_filters_and_paginates() {
        let service = service();
        let tenant = TenantId::new();

        for n in 0..6 {
            let kind = if n % 2 == 0 { "audio" } else { "video" };
            service
                .create(
                    tenant,
                    payload(json!({"title": format!("rec {n}"), "source_kind": kind})),
                )
                .await
                .unwrap();
        }

        let (rows, meta) = service
            .list(
                tenant,
                TranscriptFilter {
                    source_kind: Some("audio".to_string()),
                    page: Some(1),
                    page_size: Some(2),
                    ..TranscriptFilter::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(meta.total, 3);
        assert!(meta.has_more);
        assert!(rows.iter().all(|t| t.source_kind == SourceKind::Audio));
    }

    #[tokio::test]
    async fn lookups_never_cross_tenants() {
        let service = service();
        let tenant_a = TenantId::new();
        let tenant_b = TenantId::new();

        let transcript = service
            .create(
                tenant_a,
                payload(json!({"title": "Board meeting", "source_kind": "video"})),
            )
            .await
            .unwrap();

        let err = service.get(tenant_b, transcript.id).await.unwrap_err();
        assert!(matches!(
            err.code(),
            ErrorCode::NotFound | ErrorCode::Permission
        ));

        let (rows, _) = service
            .list(tenant_b, TranscriptFilter::default())
            .await
            .unwrap();
        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn mark_status_transitions() {
        let service = service();
        let tenant = TenantId::new();
        let transcript = service
            .create(
                tenant,
                payload(json!({"title": "Interview", "source_kind": "audio"})),
            )
            .await
            .unwrap();

        let updated = service
            .mark_status(tenant, transcript.id, TranscriptStatus::Processing)
            .await
            .unwrap();
        assert_eq!(updated.status, TranscriptStatus::Processing);
        assert!(updated.updated_at.is_some());
    }
}
