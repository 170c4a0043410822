//! `scribehub-billing` — cost records, subscriptions, feature gates.

pub mod cost;
pub mod subscription;

pub use cost::{CostKind, CostRecord, CostService};
pub use subscription::{Subscription, SubscriptionService, SubscriptionStatus};
