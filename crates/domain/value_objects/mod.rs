pub mod billing_events;
pub mod entitlements;
pub mod enums;
pub mod plans;
pub mod subscriptions;
pub mod usage;
