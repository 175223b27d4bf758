use serde::Serialize;

use crate::domain::value_objects::enums::{feature_flags::FeatureFlag, plan_tiers::PlanTierId};
use crate::domain::value_objects::plans::ResourceLimits;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct EntitlementsDto {
    pub plan_id: PlanTierId,
    pub plan_name: String,
    pub limits: ResourceLimits,
    pub features: Vec<FeatureFlag>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct FeatureAccessDto {
    pub feature: String,
    pub allowed: bool,
}
