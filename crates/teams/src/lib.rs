//! `scribehub-teams` — teams and team membership.
//!
//! Role gating contract:
//! - Owner or Admin may add, update, or remove members
//! - only the Owner may delete the team or change a member's role
//! - the Owner cannot be removed as a member

pub mod team;

pub use team::{Team, TeamMember, TeamService};
