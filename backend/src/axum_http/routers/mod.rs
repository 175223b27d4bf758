pub mod billing;
pub mod entitlements;
pub mod resources;
