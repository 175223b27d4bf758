pub mod billing;
pub mod errors;
pub mod plan_catalog;
pub mod plan_resolver;
pub mod usage_guard;
