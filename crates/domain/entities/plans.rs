use serde::Serialize;

use crate::domain::value_objects::{
    enums::{billing_intervals::BillingInterval, plan_tiers::PlanTierId},
    plans::ResourceLimits,
};

/// One subscription tier. Built once at startup and never mutated.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PlanTierEntity {
    pub id: PlanTierId,
    pub name: String,
    pub price_minor: i64,
    pub currency: String,
    pub interval: BillingInterval,
    /// Marketing bullet points, in display order.
    pub features: Vec<String>,
    pub limits: ResourceLimits,
    /// Stripe price the checkout charges. `None` means the tier cannot be bought.
    pub stripe_price_id: Option<String>,
}
