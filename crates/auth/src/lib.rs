//! `scribehub-auth` — sessions, roles, and the identity-provider seam.
//!
//! Token issuance and verification belong to the hosted identity provider;
//! this crate only defines the resolved [`Session`] shape and pure role
//! policy checks over it.

pub mod identity;
pub mod roles;
pub mod session;

pub use identity::{AuthError, IdentityProvider, StaticTokenProvider};
pub use roles::Role;
pub use session::{verify_role, Session};
