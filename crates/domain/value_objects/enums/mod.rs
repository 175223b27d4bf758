pub mod billing_intervals;
pub mod feature_flags;
pub mod plan_tiers;
pub mod resource_kinds;
pub mod subscription_statuses;
