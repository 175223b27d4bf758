use crates::domain::{
    entities::{plans::PlanTierEntity, subscriptions::SubscriptionEntity},
    repositories::subscriptions::SubscriptionRepository,
    value_objects::{
        entitlements::{EntitlementsDto, FeatureAccessDto},
        enums::{feature_flags::FeatureFlag, plan_tiers::PlanTierId},
    },
};
use std::sync::Arc;
use tracing::{debug, error};
use uuid::Uuid;

use crate::usecases::{
    errors::{UseCaseError, UseCaseResult},
    plan_catalog::PlanCatalog,
};

/// Effective plan for a subscription: its tier when active, the free tier otherwise.
pub fn resolve_effective_plan<'a>(
    catalog: &'a PlanCatalog,
    subscription: Option<&SubscriptionEntity>,
) -> &'a PlanTierEntity {
    match subscription {
        Some(subscription) if subscription.status().is_active() => {
            catalog.get_plan(&subscription.plan_tier)
        }
        _ => catalog.free(),
    }
}

pub fn tier_has_feature(tier: PlanTierId, feature: FeatureFlag) -> bool {
    match feature {
        FeatureFlag::Crm | FeatureFlag::Analytics => {
            matches!(tier, PlanTierId::Pro | PlanTierId::CreatorPlus)
        }
        FeatureFlag::Email | FeatureFlag::Ai => tier == PlanTierId::CreatorPlus,
    }
}

/// Feature gate by name. Names outside the known feature set are denied.
pub fn can_access_feature(tier: PlanTierId, feature: &str) -> bool {
    FeatureFlag::from_str(feature)
        .map(|feature| tier_has_feature(tier, feature))
        .unwrap_or(false)
}

/// Resolves the effective plan for a user from their stored subscription.
pub struct PlanResolver<S>
where
    S: SubscriptionRepository + Send + Sync + 'static,
{
    catalog: Arc<PlanCatalog>,
    subscription_repo: Arc<S>,
}

impl<S> PlanResolver<S>
where
    S: SubscriptionRepository + Send + Sync + 'static,
{
    pub fn new(catalog: Arc<PlanCatalog>, subscription_repo: Arc<S>) -> Self {
        Self {
            catalog,
            subscription_repo,
        }
    }

    pub async fn resolve_effective_plan_for_user(
        &self,
        user_id: Uuid,
    ) -> UseCaseResult<PlanTierEntity> {
        let subscription = self
            .subscription_repo
            .find_current_by_user_id(user_id)
            .await
            .map_err(|err| {
                error!(
                    %user_id,
                    db_error = ?err,
                    "plan_resolver: failed to load subscription"
                );
                UseCaseError::Internal(err)
            })?;

        let plan = resolve_effective_plan(&self.catalog, subscription.as_ref());
        debug!(
            %user_id,
            plan = %plan.id,
            subscription_status = ?subscription.as_ref().map(|s| s.status()),
            "plan_resolver: resolved effective plan"
        );

        Ok(plan.clone())
    }

    pub async fn entitlements_for_user(&self, user_id: Uuid) -> UseCaseResult<EntitlementsDto> {
        let plan = self.resolve_effective_plan_for_user(user_id).await?;

        Ok(EntitlementsDto {
            plan_id: plan.id,
            plan_name: plan.name,
            limits: plan.limits,
            features: FeatureFlag::ALL
                .into_iter()
                .filter(|feature| tier_has_feature(plan.id, *feature))
                .collect(),
        })
    }

    pub async fn feature_access(
        &self,
        user_id: Uuid,
        feature: &str,
    ) -> UseCaseResult<FeatureAccessDto> {
        let plan = self.resolve_effective_plan_for_user(user_id).await?;

        Ok(FeatureAccessDto {
            feature: feature.to_string(),
            allowed: can_access_feature(plan.id, feature),
        })
    }
}
