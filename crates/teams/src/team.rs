//! Team operations with membership role gating.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

use scribehub_auth::{Role, Session};
use scribehub_core::{DomainError, DomainResult, ErrorCode, RecordId, TenantId, UserId};
use scribehub_store::errors::scoped;
use scribehub_store::validate::{validate_enum, validate_required, validate_types, ValueKind};
use scribehub_store::{
    execute_transaction, Backend, Direction, FilterOp, Repository, Row, Store, TxOperation,
};

const RESOURCE: &str = "Team";
const MEMBER_RESOURCE: &str = "TeamMember";
const TABLE: &str = "teams";
const MEMBERS_TABLE: &str = "team_members";

const REQUIRED: &[&str] = &["name"];
const TYPES: &[(&str, ValueKind)] = &[("name", ValueKind::String)];

const MEMBER_ROLES: &[&str] = &["admin", "member"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Team {
    pub id: RecordId,
    pub tenant_id: TenantId,
    pub name: String,
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamMember {
    pub id: RecordId,
    pub tenant_id: TenantId,
    pub team_id: RecordId,
    pub user_id: UserId,
    pub role: Role,
    pub added_by: UserId,
    pub created_at: DateTime<Utc>,
}

fn encode<T: Serialize>(value: &T) -> DomainResult<serde_json::Value> {
    serde_json::to_value(value)
        .map_err(|e| DomainError::with_source(ErrorCode::Unknown, "failed to encode row", e))
}

fn decode<T: serde::de::DeserializeOwned>(value: serde_json::Value) -> DomainResult<T> {
    serde_json::from_value(value)
        .map_err(|e| DomainError::with_source(ErrorCode::Unknown, "failed to decode row", e))
}

#[derive(Clone)]
pub struct TeamService {
    teams: Repository<Team>,
    members: Repository<TeamMember>,
}

impl TeamService {
    pub fn new(store: Store) -> Self {
        Self {
            teams: Repository::new(store.clone(), TABLE, RESOURCE),
            members: Repository::new(store, MEMBERS_TABLE, MEMBER_RESOURCE),
        }
    }

    /// Create a team and its Owner membership as a unit: if the membership
    /// insert fails, the team insert is compensated away.
    pub async fn create(
        &self,
        tenant_id: TenantId,
        session: &Session,
        mut payload: Row,
    ) -> DomainResult<Team> {
        validate_required(&payload, REQUIRED, RESOURCE)?;
        validate_types(&payload, TYPES, RESOURCE)?;

        let team_id = RecordId::new();
        let user_id = session.user_id;
        payload.insert("id".to_string(), json!(team_id));
        payload.insert("created_by".to_string(), json!(user_id));

        let create_team = {
            let teams = self.teams.clone();
            let rollback_teams = self.teams.clone();
            TxOperation::new("create_team", move || async move {
                let team = teams.insert(tenant_id, payload).await?;
                encode(&team)
            })
            .with_rollback(move || async move {
                rollback_teams.delete_by_id(tenant_id, team_id).await
            })
        };

        let add_owner = {
            let members = self.members.clone();
            TxOperation::new("add_owner_membership", move || async move {
                let mut row = Row::new();
                row.insert("team_id".to_string(), json!(team_id));
                row.insert("user_id".to_string(), json!(user_id));
                row.insert("role".to_string(), json!(Role::Owner));
                row.insert("added_by".to_string(), json!(user_id));
                let member = members.insert(tenant_id, row).await?;
                encode(&member)
            })
        };

        let mut results = execute_transaction(vec![create_team, add_owner]).await?;
        decode(results.swap_remove(0))
    }

    pub async fn get(&self, tenant_id: TenantId, id: RecordId) -> DomainResult<Team> {
        self.teams.find_by_id(tenant_id, id).await
    }

    pub async fn list(&self, tenant_id: TenantId) -> DomainResult<Vec<Team>> {
        let rows = self
            .teams
            .query(tenant_id)
            .order_by("created_at", Direction::Desc)
            .fetch_all()
            .await?;
        self.teams.decode_rows(rows)
    }

    pub async fn update(
        &self,
        tenant_id: TenantId,
        session: &Session,
        id: RecordId,
        payload: Row,
    ) -> DomainResult<Team> {
        validate_types(&payload, TYPES, RESOURCE)?;
        self.require_member_role(
            tenant_id,
            id,
            session.user_id,
            &[Role::Owner, Role::Admin],
            "Only team admins can update the team.",
        )
        .await?;
        self.teams.update_by_id(tenant_id, id, payload).await
    }

    /// Deleting a team removes its memberships first. Owner only.
    pub async fn delete(
        &self,
        tenant_id: TenantId,
        session: &Session,
        id: RecordId,
    ) -> DomainResult<()> {
        self.require_member_role(
            tenant_id,
            id,
            session.user_id,
            &[Role::Owner],
            "Only the team owner can delete a team.",
        )
        .await?;

        let members_spec = self
            .members
            .query(tenant_id)
            .filter("team_id", FilterOp::Eq, json!(id))
            .into_spec();
        scoped(
            MEMBER_RESOURCE,
            "delete",
            self.members.store().backend().delete(&members_spec),
        )
        .await?;

        self.teams.delete_by_id(tenant_id, id).await
    }

    /// Role of `user_id` within the team, if they are a member.
    pub async fn member_role(
        &self,
        tenant_id: TenantId,
        team_id: RecordId,
        user_id: UserId,
    ) -> DomainResult<Option<Role>> {
        let row = self
            .members
            .query(tenant_id)
            .filter("team_id", FilterOp::Eq, json!(team_id))
            .filter("user_id", FilterOp::Eq, json!(user_id))
            .fetch_optional()
            .await?;

        match row {
            None => Ok(None),
            Some(row) => {
                let mut decoded = self.members.decode_rows(vec![row])?;
                Ok(decoded.pop().map(|m| m.role))
            }
        }
    }

    async fn require_member_role(
        &self,
        tenant_id: TenantId,
        team_id: RecordId,
        user_id: UserId,
        allowed: &[Role],
        denial_message: &str,
    ) -> DomainResult<Role> {
        let role = self
            .member_role(tenant_id, team_id, user_id)
            .await?
            .ok_or_else(|| DomainError::permission(denial_message))?;

        if allowed.contains(&role) {
            Ok(role)
        } else {
            Err(DomainError::permission(denial_message))
        }
    }

    pub async fn members(
        &self,
        tenant_id: TenantId,
        session: &Session,
        team_id: RecordId,
    ) -> DomainResult<Vec<TeamMember>> {
        self.require_member_role(
            tenant_id,
            team_id,
            session.user_id,
            &[Role::Owner, Role::Admin, Role::Member],
            "Only team members can view the member list.",
        )
        .await?;

        let rows = self
            .members
            .query(tenant_id)
            .filter("team_id", FilterOp::Eq, json!(team_id))
            .order_by("created_at", Direction::Asc)
            .fetch_all()
            .await?;
        self.members.decode_rows(rows)
    }

    /// Add a member. Owner/Admin only; the Owner role is assigned once, at
    /// team creation, and cannot be granted here.
    pub async fn add_member(
        &self,
        tenant_id: TenantId,
        session: &Session,
        team_id: RecordId,
        user_id: UserId,
        role: Role,
    ) -> DomainResult<TeamMember> {
        self.require_member_role(
            tenant_id,
            team_id,
            session.user_id,
            &[Role::Owner, Role::Admin],
            "Only team admins can add members.",
        )
        .await?;

        validate_enum(role.as_str(), MEMBER_ROLES, "role", MEMBER_RESOURCE)?;

        if self
            .member_role(tenant_id, team_id, user_id)
            .await?
            .is_some()
        {
            return Err(DomainError::duplicate(
                MEMBER_RESOURCE,
                "user is already a member of this team",
            ));
        }

        let mut row = Row::new();
        row.insert("team_id".to_string(), json!(team_id));
        row.insert("user_id".to_string(), json!(user_id));
        row.insert("role".to_string(), json!(role));
        row.insert("added_by".to_string(), json!(session.user_id));
        self.members.insert(tenant_id, row).await
    }

    /// Change a member's role. Owner only; the Owner's own role is fixed.
    pub async fn update_member_role(
        &self,
        tenant_id: TenantId,
        session: &Session,
        team_id: RecordId,
        user_id: UserId,
        role: Role,
    ) -> DomainResult<TeamMember> {
        self.require_member_role(
            tenant_id,
            team_id,
            session.user_id,
            &[Role::Owner],
            "Only the team owner can change member roles.",
        )
        .await?;

        validate_enum(role.as_str(), MEMBER_ROLES, "role", MEMBER_RESOURCE)?;

        let current = self
            .member_role(tenant_id, team_id, user_id)
            .await?
            .ok_or_else(|| DomainError::not_found(MEMBER_RESOURCE))?;
        if current == Role::Owner {
            return Err(DomainError::permission(
                "The team owner's role cannot be changed.",
            ));
        }

        let member = self.find_member(tenant_id, team_id, user_id).await?;
        let mut changes = Row::new();
        changes.insert("role".to_string(), json!(role));
        self.members.update_by_id(tenant_id, member.id, changes).await
    }

    /// Remove a member. Owner/Admin only; the Owner cannot be removed.
    pub async fn remove_member(
        &self,
        tenant_id: TenantId,
        session: &Session,
        team_id: RecordId,
        user_id: UserId,
    ) -> DomainResult<()> {
        self.require_member_role(
            tenant_id,
            team_id,
            session.user_id,
            &[Role::Owner, Role::Admin],
            "Only team admins can remove members.",
        )
        .await?;

        let member = self.find_member(tenant_id, team_id, user_id).await?;
        if member.role == Role::Owner {
            return Err(DomainError::permission("The team owner cannot be removed."));
        }

        self.members.delete_by_id(tenant_id, member.id).await
    }

    async fn find_member(
        &self,
        tenant_id: TenantId,
        team_id: RecordId,
        user_id: UserId,
    ) -> DomainResult<TeamMember> {
        let row = self
            .members
            .query(tenant_id)
            .filter("team_id", FilterOp::Eq, json!(team_id))
            .filter("user_id", FilterOp::Eq, json!(user_id))
            .fetch_optional()
            .await?
            .ok_or_else(|| DomainError::not_found(MEMBER_RESOURCE))?;

        let mut decoded = self.members.decode_rows(vec![row])?;
        decoded
            .pop()
            .ok_or_else(|| DomainError::not_found(MEMBER_RESOURCE))
    }
}
