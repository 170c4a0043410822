//! User profiles.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

use scribehub_core::{DomainError, DomainResult, RecordId, TenantId, UserId};
use scribehub_store::validate::{validate_length, validate_required, validate_types, Bounds, ValueKind};
use scribehub_store::{FilterOp, Repository, Row, Store};

const RESOURCE: &str = "Profile";
const TABLE: &str = "profiles";

const REQUIRED: &[&str] = &["email"];
const TYPES: &[(&str, ValueKind)] = &[
    ("email", ValueKind::String),
    ("display_name", ValueKind::String),
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: RecordId,
    pub tenant_id: TenantId,
    pub user_id: UserId,
    pub email: String,
    #[serde(default)]
    pub display_name: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Clone)]
pub struct ProfileService {
    repo: Repository<Profile>,
}

impl ProfileService {
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

        if let Some(email) = payload.get("email").and_then(|v| v.as_str()) {
            // Not a full address parser; rejects the obviously malformed.
            if !email.contains('@') || email.starts_with('@') || email.ends_with('@') {
                return Err(DomainError::validation(
                    RESOURCE,
                    format!("invalid email '{email}'"),
                ));
            }
        }
        if let Some(name) = payload.get("display_name") {
            if !name.is_null() {
                validate_length(name, Bounds::between(1, 120), "display_name", RESOURCE)?;
            }
        }
        Ok(())
    }

    pub async fn create(
        &self,
        tenant_id: TenantId,
        user_id: UserId,
        mut payload: Row,
    ) -> DomainResult<Profile> {
        Self::validate(&payload, true)?;
        payload.insert("user_id".to_string(), json!(user_id));
        self.repo.insert(tenant_id, payload).await
    }

    pub async fn get_by_user(&self, tenant_id: TenantId, user_id: UserId) -> DomainResult<Profile> {
        let row = self
            .repo
            .query(tenant_id)
            .filter("user_id", FilterOp::Eq, json!(user_id))
            .fetch_optional()
            .await?
            .ok_or_else(|| DomainError::not_found(RESOURCE))?;
        let mut decoded = self.repo.decode_rows(vec![row])?;
        decoded.pop().ok_or_else(|| DomainError::not_found(RESOURCE))
    }

    pub async fn update(
        &self,
        tenant_id: TenantId,
        user_id: UserId,
        payload: Row,
    ) -> DomainResult<Profile> {
        Self::validate(&payload, false)?;
        let profile = self.get_by_user(tenant_id, user_id).await?;
        self.repo.update_by_id(tenant_id, profile.id, payload).await
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
    async fn create_then_update_profile() {
        let service = ProfileService::new(Store::in_memory());
        let tenant = TenantId::new();
        let user = UserId::new();

        let profile = service
            .create(
                tenant,
                user,
                payload(json!({"email": "alice@example.com", "display_name": "Alice"})),
            )
            .await
            .unwrap();
        assert_eq!(profile.user_id, user);

        let updated = service
            .update(tenant, user, payload(json!({"display_name": "Alice Smith"})))
            .await
            .unwrap();
        assert_eq!(updated.display_name.as_deref(), Some("Alice Smith"));
        assert_eq!(updated.email, "alice@example.com");
    }

    #[tokio::test]
    async fn malformed_email_is_rejected() {
        let service = ProfileService::new(Store::in_memory());
        for email in ["not-an-email", "@example.com", "alice@"] {
            let err = service
                .create(TenantId::new(), UserId::new(), payload(json!({"email": email})))
                .await
                .unwrap_err();
            assert_eq!(err.code(), ErrorCode::Validation);
        }
    }
}
