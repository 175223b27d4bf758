use crates::domain::{
    entities::plans::PlanTierEntity,
    value_objects::{
        enums::{billing_intervals::BillingInterval, plan_tiers::PlanTierId},
        plans::{InvalidLimit, ResourceLimits},
    },
};
use tracing::debug;

use crate::config::config_model::Stripe;

/// Fixed registry of plan tiers, built once at startup and shared read-only.
///
/// Lookups never fail: an unknown tier id resolves to the free tier so a bad id can
/// only ever lower a user's access.
#[derive(Debug, Clone)]
pub struct PlanCatalog {
    free: PlanTierEntity,
    pro: PlanTierEntity,
    creator_plus: PlanTierEntity,
}

impl PlanCatalog {
    pub fn new(
        price_pro: Option<String>,
        price_creator_plus: Option<String>,
    ) -> Result<Self, InvalidLimit> {
        Ok(Self {
            free: PlanTierEntity {
                id: PlanTierId::Free,
                name: "Free".to_string(),
                price_minor: 0,
                currency: "usd".to_string(),
                interval: BillingInterval::Month,
                features: vec![
                    "Up to 5 content ideas".to_string(),
                    "3 content pillars".to_string(),
                    "Track 2 brand deals".to_string(),
                    "Filming calendar".to_string(),
                ],
                limits: ResourceLimits::new(5, 3, 2, 0)?,
                stripe_price_id: None,
            },
            pro: PlanTierEntity {
                id: PlanTierId::Pro,
                name: "Pro".to_string(),
                price_minor: 1_900,
                currency: "usd".to_string(),
                interval: BillingInterval::Month,
                features: vec![
                    "Up to 100 content ideas".to_string(),
                    "10 content pillars".to_string(),
                    "Track 25 brand deals".to_string(),
                    "Brand CRM".to_string(),
                    "Revenue analytics".to_string(),
                ],
                limits: ResourceLimits::new(100, 10, 25, 0)?,
                stripe_price_id: price_pro,
            },
            creator_plus: PlanTierEntity {
                id: PlanTierId::CreatorPlus,
                name: "Creator+".to_string(),
                price_minor: 4_900,
                currency: "usd".to_string(),
                interval: BillingInterval::Month,
                features: vec![
                    "Unlimited ideas, pillars and brand deals".to_string(),
                    "Unlimited connected email accounts".to_string(),
                    "Brand CRM".to_string(),
                    "Revenue analytics".to_string(),
                    "Brand email outreach".to_string(),
                    "AI script assistant".to_string(),
                ],
                limits: ResourceLimits::unlimited(),
                stripe_price_id: price_creator_plus,
            },
        })
    }

    pub fn from_config(stripe: &Stripe) -> Result<Self, InvalidLimit> {
        Self::new(stripe.price_pro.clone(), stripe.price_creator_plus.clone())
    }

    pub fn get(&self, id: PlanTierId) -> &PlanTierEntity {
        match id {
            PlanTierId::Free => &self.free,
            PlanTierId::Pro => &self.pro,
            PlanTierId::CreatorPlus => &self.creator_plus,
        }
    }

    /// Looks up a tier by its string id, failing closed to the free tier.
    pub fn get_plan(&self, tier_id: &str) -> &PlanTierEntity {
        match PlanTierId::from_str(tier_id) {
            Some(id) => self.get(id),
            None => {
                debug!(tier_id, "plan_catalog: unknown tier id, using free tier");
                &self.free
            }
        }
    }

    pub fn free(&self) -> &PlanTierEntity {
        &self.free
    }

    /// Tiers in display order, cheapest first.
    pub fn list(&self) -> Vec<&PlanTierEntity> {
        PlanTierId::ALL.iter().map(|id| self.get(*id)).collect()
    }

    /// Maps a Stripe price back to the tier that sells it.
    pub fn find_by_price_reference(&self, price_id: &str) -> Option<&PlanTierEntity> {
        self.list()
            .into_iter()
            .find(|plan| plan.stripe_price_id.as_deref() == Some(price_id))
    }
}
