pub mod billing_customers;
pub mod billing_events;
pub mod plans;
pub mod subscriptions;
