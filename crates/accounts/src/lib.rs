//! `scribehub-accounts` — user profiles, preferences, and credits.

pub mod credits;
pub mod preference;
pub mod profile;

pub use credits::{ConsumeReceipt, CreditDeduction, CreditGrant, CreditService};
pub use preference::{Preference, PreferenceService};
pub use profile::{Profile, ProfileService};
