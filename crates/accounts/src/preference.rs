//! Per-user preferences.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

use scribehub_core::{DomainResult, RecordId, TenantId, UserId};
use scribehub_store::validate::{validate_enum, validate_length, validate_types, Bounds, ValueKind};
use scribehub_store::{FilterOp, Repository, Row, Store};

const RESOURCE: &str = "Preference";
const TABLE: &str = "preferences";

const TYPES: &[(&str, ValueKind)] = &[
    ("theme", ValueKind::String),
    ("language", ValueKind::String),
];

pub const THEMES: &[&str] = &["light", "dark", "system"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preference {
    pub id: RecordId,
    pub tenant_id: TenantId,
    pub user_id: UserId,
    #[serde(default = "default_theme")]
    pub theme: String,
    #[serde(default)]
    pub language: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

fn default_theme() -> String {
    "system".to_string()
}

#[derive(Clone)]
pub struct PreferenceService {
    repo: Repository<Preference>,
}

impl PreferenceService {
    pub fn new(store: Store) -> Self {
        Self {
            repo: Repository::new(store, TABLE, RESOURCE),
        }
    }

    fn validate(payload: &Row) -> DomainResult<()> {
        validate_types(payload, TYPES, RESOURCE)?;
        if let Some(theme) = payload.get("theme").and_then(|v| v.as_str()) {
            validate_enum(theme, THEMES, "theme", RESOURCE)?;
        }
        if let Some(language) = payload.get("language") {
            if !language.is_null() {
                validate_length(language, Bounds::between(2, 16), "language", RESOURCE)?;
            }
        }
        Ok(())
    }

    /// Read, falling back to defaults when the user never saved any.
    pub async fn get(&self, tenant_id: TenantId, user_id: UserId) -> DomainResult<Option<Preference>> {
        let row = self
            .repo
            .query(tenant_id)
            .filter("user_id", FilterOp::Eq, json!(user_id))
            .fetch_optional()
            .await?;
        match row {
            None => Ok(None),
            Some(row) => Ok(self.repo.decode_rows(vec![row])?.pop()),
        }
    }

    /// Create-or-update by user.
    pub async fn upsert(
        &self,
        tenant_id: TenantId,
        user_id: UserId,
        mut payload: Row,
    ) -> DomainResult<Preference> {
        Self::validate(&payload)?;

        match self.get(tenant_id, user_id).await? {
            Some(existing) => self.repo.update_by_id(tenant_id, existing.id, payload).await,
            None => {
                payload.insert("user_id".to_string(), json!(user_id));
                payload
                    .entry("theme".to_string())
                    .or_insert_with(|| json!("system"));
                self.repo.insert(tenant_id, payload).await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scribehub_core::ErrorCode;
    use serde_json::Value;

    fn payload(value: Value) -> Row {
        match value {
            Value::Object(map) => map,
            _ => panic!("test payload must be an object"),
        }
    }

    #[tokio::test]
    async fn upsert_creates_then_updates() {
        let service = PreferenceService::new(Store::in_memory());
        let tenant = TenantId::new();
        let user = UserId::new();

        assert!(service.get(tenant, user).await.unwrap().is_none());

        let created = service
            .upsert(tenant, user, payload(json!({"language": "en"})))
            .await
            .unwrap();
        assert_eq!(created.theme, "system");

        let updated = service
            .upsert(tenant, user, payload(json!({"theme": "dark"})))
            .await
            .unwrap();
        assert_eq!(updated.id, created.id);
        assert_eq!(updated.theme, "dark");
        assert_eq!(updated.language.as_deref(), Some("en"));
    }

    #[tokio::test]
    async fn unknown_theme_is_rejected() {
        let service = PreferenceService::new(Store::in_memory());
        let err = service
            .upsert(
                TenantId::new(),
                UserId::new(),
                payload(json!({"theme": "solarized"})),
            )
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::Validation);
        assert!(err.message().contains("light, dark, system"));
    }
}
