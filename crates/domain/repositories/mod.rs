pub mod billing_customers;
pub mod resources;
pub mod subscriptions;
