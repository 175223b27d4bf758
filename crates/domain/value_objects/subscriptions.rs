use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::entities::plans::PlanTierEntity;
use crate::domain::value_objects::enums::{
    billing_intervals::BillingInterval, plan_tiers::PlanTierId,
    subscription_statuses::SubscriptionStatus,
};
use crate::domain::value_objects::plans::ResourceLimits;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PlanDto {
    pub id: PlanTierId,
    pub name: String,
    pub price_minor: i64,
    pub currency: String,
    pub interval: BillingInterval,
    pub features: Vec<String>,
    pub limits: ResourceLimits,
    pub purchasable: bool,
}

impl From<&PlanTierEntity> for PlanDto {
    fn from(value: &PlanTierEntity) -> Self {
        Self {
            id: value.id,
            name: value.name.clone(),
            price_minor: value.price_minor,
            currency: value.currency.clone(),
            interval: value.interval,
            features: value.features.clone(),
            limits: value.limits,
            purchasable: value.stripe_price_id.is_some(),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CurrentSubscriptionDto {
    pub plan_id: PlanTierId,
    pub plan_name: String,
    pub status: SubscriptionStatus,
    pub current_period_end: Option<DateTime<Utc>>,
    pub has_billing_portal: bool,
}

#[derive(Debug, Deserialize)]
pub struct CreateCheckoutRequest {
    pub plan_id: String,
    pub success_url: String,
    pub cancel_url: String,
}

#[derive(Debug, Deserialize)]
pub struct CreatePortalRequest {
    pub return_url: String,
}

/// Processor-hosted redirect target for a checkout or portal session.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SessionUrl {
    pub url: String,
}
