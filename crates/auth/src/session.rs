//! Resolved request identity and pure role policy checks.

use serde::{Deserialize, Serialize};

use scribehub_core::{DomainError, DomainResult, TenantId, UserId};

use crate::roles::Role;

/// A fully resolved session for authorization decisions.
///
/// Construction is decoupled from transport: the API layer derives this from
/// a bearer token via [`crate::IdentityProvider`], workers and tests build it
/// directly.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub user_id: UserId,
    pub tenant_id: TenantId,
    pub role: Role,
}

impl Session {
    pub fn new(user_id: UserId, tenant_id: TenantId, role: Role) -> Self {
        Self {
            user_id,
            tenant_id,
            role,
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn has_role(&self, allowed: &[Role]) -> bool {
        allowed.contains(&self.role)
    }

    pub fn has_admin_access(&self) -> bool {
        self.role.is_admin()
    }
}

/// Authorize a session against an allowed role set.
///
/// - No IO
/// - No panics
/// - No business logic (pure policy check)
///
/// `denial_message` is surfaced verbatim; several call sites carry
/// contract-level wording.
pub fn verify_role(session: &Session, allowed: &[Role], denial_message: &str) -> DomainResult<()> {
    if session.has_role(allowed) {
        Ok(())
    } else {
        Err(DomainError::permission(denial_message))
    }
}
