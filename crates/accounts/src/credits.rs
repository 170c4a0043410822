//! Credit grants and consumption.
//!
//! Credits arrive as grants with an expiry. Consumption drains active grants
//! earliest-expiry-first; each grant write carries an optimistic version
//! check, and the whole consumption runs through the transaction manager so
//! a conflicting write compensates the deductions already applied.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use scribehub_core::{DomainError, DomainResult, RecordId, TenantId, UserId};
use scribehub_store::validate::{
    validate_date_range, validate_range, validate_required, validate_types, Bounds, ValueKind,
};
use scribehub_store::{
    execute_transaction, Direction, Filter, FilterOp, Repository, Row, Store, TxOperation,
};

const RESOURCE: &str = "CreditGrant";
const TABLE: &str = "credit_grants";

const REQUIRED: &[&str] = &["amount", "expires_at"];
const TYPES: &[(&str, ValueKind)] = &[
    ("amount", ValueKind::Number),
    ("expires_at", ValueKind::String),
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreditGrant {
    pub id: RecordId,
    pub tenant_id: TenantId,
    pub user_id: UserId,
    /// Remaining credits on this grant.
    pub amount: i64,
    pub expires_at: DateTime<Utc>,
    /// Optimistic concurrency counter, bumped on every write.
    pub version: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditDeduction {
    pub grant_id: RecordId,
    pub consumed: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsumeReceipt {
    pub requested: i64,
    pub deductions: Vec<CreditDeduction>,
}

#[derive(Clone)]
pub struct CreditService {
    repo: Repository<CreditGrant>,
}

impl CreditService {
    pub fn new(store: Store) -> Self {
        Self {
            repo: Repository::new(store, TABLE, RESOURCE),
        }
    }

    pub async fn grant(
        &self,
        tenant_id: TenantId,
        user_id: UserId,
        mut payload: Row,
    ) -> DomainResult<CreditGrant> {
        validate_required(&payload, REQUIRED, RESOURCE)?;
        validate_types(&payload, TYPES, RESOURCE)?;

        if let Some(amount) = payload.get("amount").and_then(|v| v.as_f64()) {
            validate_range(amount, Bounds::at_least(1.0), "amount", RESOURCE)?;
        }
        if let Some(expires) = payload.get("expires_at").and_then(|v| v.as_str()) {
            validate_date_range(
                expires,
                Bounds::at_least(Utc::now()),
                "expires_at",
                RESOURCE,
            )?;
        }

        payload.insert("user_id".to_string(), json!(user_id));
        payload.insert("version".to_string(), json!(0));
        self.repo.insert(tenant_id, payload).await
    }

    /// Active grants: unexpired, with credits remaining, earliest expiry
    /// first.
    pub async fn active_grants(
        &self,
        tenant_id: TenantId,
        user_id: UserId,
    ) -> DomainResult<Vec<CreditGrant>> {
        let rows = self
            .repo
            .query(tenant_id)
            .filter("user_id", FilterOp::Eq, json!(user_id))
            .filter("amount", FilterOp::Gt, json!(0))
            .filter("expires_at", FilterOp::Gt, json!(Utc::now()))
            .order_by("expires_at", Direction::Asc)
            .fetch_all()
            .await?;
        self.repo.decode_rows(rows)
    }

    pub async fn balance(&self, tenant_id: TenantId, user_id: UserId) -> DomainResult<i64> {
        Ok(self
            .active_grants(tenant_id, user_id)
            .await?
            .iter()
            .map(|g| g.amount)
            .sum())
    }

    /// Consume `amount` credits across the user's active grants.
    ///
    /// Fails with a validation error — touching nothing — when the request
    /// exceeds the available total. A concurrent write to any planned grant
    /// surfaces as a Transaction-coded error after the already-applied
    /// deductions are compensated.
    pub async fn consume(
        &self,
        tenant_id: TenantId,
        user_id: UserId,
        amount: i64,
    ) -> DomainResult<ConsumeReceipt> {
        if amount <= 0 {
            return Err(DomainError::validation(
                RESOURCE,
                "amount must be at least 1",
            ));
        }

        let grants = self.active_grants(tenant_id, user_id).await?;
        let available: i64 = grants.iter().map(|g| g.amount).sum();
        if available < amount {
            return Err(DomainError::validation(
                RESOURCE,
                format!("insufficient credits: requested {amount}, available {available}"),
            ));
        }

        let mut plan: Vec<(CreditGrant, i64)> = Vec::new();
        let mut remaining = amount;
        for grant in grants {
            if remaining == 0 {
                break;
            }
            let take = remaining.min(grant.amount);
            remaining -= take;
            plan.push((grant, take));
        }

        let deductions = plan
            .iter()
            .map(|(grant, take)| CreditDeduction {
                grant_id: grant.id,
                consumed: *take,
            })
            .collect();

        self.apply_planned(tenant_id, plan).await?;

        Ok(ConsumeReceipt {
            requested: amount,
            deductions,
        })
    }

    /// Execute one planned deduction per grant through the transaction
    /// manager. Each write checks the grant version it planned against; a
    /// miss means a concurrent writer won, and the compensation walk
    /// restores the grants already drained.
    async fn apply_planned(
        &self,
        tenant_id: TenantId,
        plan: Vec<(CreditGrant, i64)>,
    ) -> DomainResult<Vec<Value>> {
        let mut operations = Vec::with_capacity(plan.len());

        for (grant, take) in plan {
            let repo = self.repo.clone();
            let rollback_repo = self.repo.clone();
            let grant_id = grant.id;
            let old_amount = grant.amount;
            let version = grant.version;

            let operation = TxOperation::new("consume_credit_grant", move || async move {
                let mut changes = Row::new();
                changes.insert("amount".to_string(), json!(old_amount - take));
                changes.insert("version".to_string(), json!(version + 1));

                let matched = repo
                    .update_where(
                        tenant_id,
                        grant_id,
                        vec![Filter::eq("version", json!(version))],
                        changes,
                    )
                    .await?;
                if matched == 0 {
                    return Err(DomainError::transaction(format!(
                        "credit grant {grant_id} was modified concurrently"
                    )));
                }
                Ok(json!({ "grant_id": grant_id, "consumed": take }))
            })
            .with_rollback(move || async move {
                let mut changes = Row::new();
                changes.insert("amount".to_string(), json!(old_amount));
                changes.insert("version".to_string(), json!(version + 2));

                // Best-effort: a zero match here means yet another writer
                // got in; the manager logs and keeps walking.
                let matched = rollback_repo
                    .update_where(
                        tenant_id,
                        grant_id,
                        vec![Filter::eq("version", json!(version + 1))],
                        changes,
                    )
                    .await?;
                if matched == 0 {
                    return Err(DomainError::transaction(format!(
                        "credit grant {grant_id} changed again during compensation"
                    )));
                }
                Ok(())
            });

            operations.push(operation);
        }

        execute_transaction(operations).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use scribehub_core::ErrorCode;

    fn grant_payload(amount: i64, expires_in_days: i64) -> Row {
        let mut row = Row::new();
        row.insert("amount".to_string(), json!(amount));
        row.insert(
            "expires_at".to_string(),
            json!(Utc::now() + Duration::days(expires_in_days)),
        );
        row
    }

    #[tokio::test]
    async fn consume_drains_earliest_expiry_first() {
        let service = CreditService::new(Store::in_memory());
        let tenant = TenantId::new();
        let user = UserId::new();

        // Inserted out of expiry order on purpose.
        let later = service
            .grant(tenant, user, grant_payload(100, 30))
            .await
            .unwrap();
        let sooner = service
            .grant(tenant, user, grant_payload(50, 7))
            .await
            .unwrap();

        let receipt = service.consume(tenant, user, 120).await.unwrap();
        assert_eq!(
            receipt.deductions,
            vec![
                CreditDeduction {
                    grant_id: sooner.id,
                    consumed: 50
                },
                CreditDeduction {
                    grant_id: later.id,
                    consumed: 70
                },
            ]
        );

        assert_eq!(service.balance(tenant, user).await.unwrap(), 30);
    }

    #[tokio::test]
    async fn over_consumption_fails_and_touches_nothing() {
        let service = CreditService::new(Store::in_memory());
        let tenant = TenantId::new();
        let user = UserId::new();

        service
            .grant(tenant, user, grant_payload(40, 7))
            .await
            .unwrap();
        service
            .grant(tenant, user, grant_payload(30, 14))
            .await
            .unwrap();

        let err = service.consume(tenant, user, 500).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::Validation);
        assert!(err
            .message()
            .contains("insufficient credits: requested 500, available 70"));

        // Amounts unchanged.
        assert_eq!(service.balance(tenant, user).await.unwrap(), 70);
        let grants = service.active_grants(tenant, user).await.unwrap();
        assert!(grants.iter().all(|g| g.version == 0));
    }

    #[tokio::test]
    async fn expired_grants_do_not_count() {
        let service = CreditService::new(Store::in_memory());
        let tenant = TenantId::new();
        let user = UserId::new();

        let err = service
            .grant(tenant, user, grant_payload(40, -1))
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::Validation);

        service
            .grant(tenant, user, grant_payload(25, 7))
            .await
            .unwrap();
        assert_eq!(service.balance(tenant, user).await.unwrap(), 25);
    }

    #[tokio::test]
    async fn concurrent_write_compensates_applied_deductions() {
        let service = CreditService::new(Store::in_memory());
        let tenant = TenantId::new();
        let user = UserId::new();

        let first = service
            .grant(tenant, user, grant_payload(50, 7))
            .await
            .unwrap();
        let second = service
            .grant(tenant, user, grant_payload(100, 30))
            .await
            .unwrap();

        // Stale snapshot of the plan, then a competing writer bumps the
        // second grant's version.
        let snapshot = service.active_grants(tenant, user).await.unwrap();
        assert_eq!(snapshot[0].id, first.id);

        let mut bump = Row::new();
        bump.insert("version".to_string(), json!(1));
        service
            .repo
            .update_where(
                tenant,
                second.id,
                vec![Filter::eq("version", json!(0))],
                bump,
            )
            .await
            .unwrap();

        let plan = vec![(snapshot[0].clone(), 50), (snapshot[1].clone(), 70)];
        let err = service.apply_planned(tenant, plan).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::Transaction);

        // First grant was drained then restored by the compensation walk.
        let grants = service.active_grants(tenant, user).await.unwrap();
        let restored = grants.iter().find(|g| g.id == first.id).unwrap();
        assert_eq!(restored.amount, 50);
        assert_eq!(restored.version, 2);
        assert_eq!(service.balance(tenant, user).await.unwrap(), 150);
    }

    #[tokio::test]
    async fn grant_requires_amount_and_expiry() {
        let service = CreditService::new(Store::in_memory());
        let err = service
            .grant(TenantId::new(), UserId::new(), Row::new())
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::Validation);
        assert_eq!(
            err.message(),
            "CreditGrant: missing required fields: amount, expires_at"
        );
    }
}
