//! Subscriptions and feature gates.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

use scribehub_core::{DomainResult, RecordId, TenantId};
use scribehub_store::validate::{validate_enum, validate_required, validate_types, ValueKind};
use scribehub_store::{Direction, FilterOp, Repository, Row, Store};

const RESOURCE: &str = "Subscription";
const TABLE: &str = "subscriptions";

const REQUIRED: &[&str] = &["tier", "status"];
const TYPES: &[(&str, ValueKind)] = &[
    ("tier", ValueKind::String),
    ("status", ValueKind::String),
    ("features", ValueKind::Object),
];

pub const STATUSES: &[&str] = &["active", "canceled", "past_due"];

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Active,
    Canceled,
    PastDue,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subscription {
    pub id: RecordId,
    pub tenant_id: TenantId,
    pub tier: String,
    pub status: SubscriptionStatus,
    /// Tier feature flags, consulted by key.
    #[serde(default)]
    pub features: serde_json::Map<String, serde_json::Value>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Clone)]
pub struct SubscriptionService {
    repo: Repository<Subscription>,
}

impl SubscriptionService {
    pub fn new(store: Store) -> Self {
        Self {
            repo: Repository::new(store, TABLE, RESOURCE),
        }
    }

    fn validate(payload: &Row) -> DomainResult<()> {
        validate_types(payload, TYPES, RESOURCE)?;
        if let Some(status) = payload.get("status").and_then(|v| v.as_str()) {
            validate_enum(status, STATUSES, "status", RESOURCE)?;
        }
        Ok(())
    }

    pub async fn create(&self, tenant_id: TenantId, mut payload: Row) -> DomainResult<Subscription> {
        validate_required(&payload, REQUIRED, RESOURCE)?;
        Self::validate(&payload)?;
        payload
            .entry("features".to_string())
            .or_insert_with(|| json!({}));
        self.repo.insert(tenant_id, payload).await
    }

    pub async fn update(
        &self,
        tenant_id: TenantId,
        id: RecordId,
        payload: Row,
    ) -> DomainResult<Subscription> {
        Self::validate(&payload)?;
        self.repo.update_by_id(tenant_id, id, payload).await
    }

    /// The tenant's current subscription: the most recent active one.
    pub async fn active(&self, tenant_id: TenantId) -> DomainResult<Option<Subscription>> {
        let row = self
            .repo
            .query(tenant_id)
            .filter("status", FilterOp::Eq, json!("active"))
            .order_by("created_at", Direction::Desc)
            .fetch_optional()
            .await?;
        match row {
            None => Ok(None),
            Some(row) => Ok(self.repo.decode_rows(vec![row])?.pop()),
        }
    }

    /// Feature gate: look the key up in the active subscription's features
    /// object. No active subscription, absent key, or a non-true value all
    /// gate the feature off.
    pub async fn feature_enabled(&self, tenant_id: TenantId, key: &str) -> DomainResult<bool> {
        Ok(self
            .active(tenant_id)
            .await?
            .and_then(|sub| sub.features.get(key).cloned())
            .and_then(|value| value.as_bool())
            .unwrap_or(false))
    }

    pub async fn cancel(&self, tenant_id: TenantId, id: RecordId) -> DomainResult<Subscription> {
        let mut changes = Row::new();
        changes.insert("status".to_string(), json!("canceled"));
        self.repo.update_by_id(tenant_id, id, changes).await
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
    async fn feature_gate_reads_active_subscription() {
        let service = SubscriptionService::new(Store::in_memory());
        let tenant = TenantId::new();

        assert!(!service.feature_enabled(tenant, "video_recaps").await.unwrap());

        service
            .create(
                tenant,
                payload(json!({
                    "tier": "pro",
                    "status": "active",
                    "features": {"video_recaps": true, "slides": false}
                })),
            )
            .await
            .unwrap();

        assert!(service.feature_enabled(tenant, "video_recaps").await.unwrap());
        assert!(!service.feature_enabled(tenant, "slides").await.unwrap());
        assert!(!service.feature_enabled(tenant, "unknown").await.unwrap());
    }

    #[tokio::test]
    async fn canceled_subscriptions_do_not_gate_features_on() {
        let service = SubscriptionService::new(Store::in_memory());
        let tenant = TenantId::new();

        let sub = service
            .create(
                tenant,
                payload(json!({
                    "tier": "pro",
                    "status": "active",
                    "features": {"video_recaps": true}
                })),
            )
            .await
            .unwrap();
        assert!(service.feature_enabled(tenant, "video_recaps").await.unwrap());

        service.cancel(tenant, sub.id).await.unwrap();
        assert!(!service.feature_enabled(tenant, "video_recaps").await.unwrap());
    }

    #[tokio::test]
    async fn status_is_enum_checked() {
        let service = SubscriptionService::new(Store::in_memory());
        let err = service
            .create(
                TenantId::new(),
                payload(json!({"tier": "pro", "status": "paused"})),
            )
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::Validation);
        assert!(err.message().contains("active, canceled, past_due"));
    }

    #[tokio::test]
    async fn feature_gates_are_tenant_scoped() {
        let service = SubscriptionService::new(Store::in_memory());
        let tenant_a = TenantId::new();
        let tenant_b = TenantId::new();

        service
            .create(
                tenant_a,
                payload(json!({
                    "tier": "pro",
                    "status": "active",
                    "features": {"video_recaps": true}
                })),
            )
            .await
            .unwrap();

        assert!(service.feature_enabled(tenant_a, "video_recaps").await.unwrap());
        assert!(!service.feature_enabled(tenant_b, "video_recaps").await.unwrap());
    }
}
