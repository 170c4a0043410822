//! Identity-provider seam.
//!
//! The hosted identity provider (sign-in, sign-up, session retrieval) is an
//! external collaborator. This trait is the only contact surface: given an
//! opaque bearer token, resolve the session or reject.

use std::collections::HashMap;
use std::sync::RwLock;

use thiserror::Error;

use crate::session::Session;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid or expired token")]
    InvalidToken,
}

pub trait IdentityProvider: Send + Sync {
    fn resolve(&self, token: &str) -> Result<Session, AuthError>;
}

/// Static token → session mapping.
///
/// Intended for tests/dev wiring where no hosted provider is reachable.
#[derive(Debug, Default)]
pub struct StaticTokenProvider {
    sessions: RwLock<HashMap<String, Session>>,
}

impl StaticTokenProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, token: impl Into<String>, session: Session) {
        self.sessions
            .write()
            .expect("token map lock poisoned")
            .insert(token.into(), session);
    }
}

impl IdentityProvider for StaticTokenProvider {
    fn resolve(&self, token: &str) -> Result<Session, AuthError> {
        self.sessions
            .read()
            .expect("token map lock poisoned")
            .get(token)
            .copied()
            .ok_or(AuthError::InvalidToken)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roles::Role;
    use scribehub_core::{TenantId, UserId};

    #[test]
    fn static_provider_resolves_registered_tokens_only() {
        let provider = StaticTokenProvider::new();
        let session = Session::new(UserId::new(), TenantId::new(), Role::Owner);
        provider.register("tok-1", session);

        assert_eq!(provider.resolve("tok-1").unwrap(), session);
        assert!(matches!(
            provider.resolve("tok-2"),
            Err(AuthError::InvalidToken)
        ));
    }
}
