use std::sync::Arc;

use crates::domain::{
    entities::plans::PlanTierEntity,
    repositories::{resources::ResourceRepository, subscriptions::SubscriptionRepository},
    value_objects::{
        enums::resource_kinds::ResourceKind,
        usage::{CreatedResourceDto, GuardedInsert, UsageDecision},
    },
};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::usecases::{
    errors::{UseCaseError, UseCaseResult},
    plan_resolver::{tier_has_feature, PlanResolver},
};

pub fn check_limit(tier: &PlanTierEntity, resource: ResourceKind, current_count: i64) -> UsageDecision {
    let limit = tier.limits.limit_for(resource);
    if tier.limits.is_unlimited(resource) || current_count < limit {
        UsageDecision::Allow
    } else {
        UsageDecision::limit_reached(limit, current_count)
    }
}

pub struct UsageGuardUseCase<S, R>
where
    S: SubscriptionRepository + Send + Sync + 'static,
    R: ResourceRepository + Send + Sync + 'static,
{
    plan_resolver: Arc<PlanResolver<S>>,
    resource_repo: Arc<R>,
}

impl<S, R> UsageGuardUseCase<S, R>
where
    S: SubscriptionRepository + Send + Sync + 'static,
    R: ResourceRepository + Send + Sync + 'static,
{
    pub fn new(plan_resolver: Arc<PlanResolver<S>>, resource_repo: Arc<R>) -> Self {
        Self {
            plan_resolver,
            resource_repo,
        }
    }

    /// Creates a guarded resource for the user if their effective plan still has room.
    pub async fn create_resource(
        &self,
        user_id: Uuid,
        kind: &str,
        name: String,
    ) -> UseCaseResult<CreatedResourceDto> {
        let kind = ResourceKind::from_str(kind).ok_or_else(|| {
            let err = UseCaseError::UnknownResource(kind.to_string());
            warn!(
                %user_id,
                kind,
                status = err.status_code().as_u16(),
                "usage_guard: unknown resource kind"
            );
            err
        })?;

        let plan = self.plan_resolver.resolve_effective_plan_for_user(user_id).await?;

        if let Some(feature) = kind.required_feature() {
            if !tier_has_feature(plan.id, feature) {
                info!(
                    %user_id,
                    plan = %plan.id,
                    resource = %kind,
                    %feature,
                    "usage_guard: feature locked for plan"
                );
                return Err(UseCaseError::FeatureLocked(feature));
            }
        }

        let current = self
            .resource_repo
            .count_resources(user_id, kind)
            .await
            .map_err(|err| {
                error!(
                    %user_id,
                    resource = %kind,
                    db_error = ?err,
                    "usage_guard: failed to count resources"
                );
                UseCaseError::Internal(err)
            })?;

        if let UsageDecision::Deny { limit, current, .. } = check_limit(&plan, kind, current) {
            info!(
                %user_id,
                plan = %plan.id,
                resource = %kind,
                limit,
                current,
                "usage_guard: limit reached"
            );
            return Err(UseCaseError::LimitReached {
                resource: kind,
                limit,
                current,
            });
        }

        let limit = plan.limits.limit_for(kind);
        let inserted = self
            .resource_repo
            .insert_within_limit(user_id, kind, limit, name.clone())
            .await
            .map_err(|err| {
                error!(
                    %user_id,
                    resource = %kind,
                    db_error = ?err,
                    "usage_guard: failed to insert resource"
                );
                UseCaseError::Internal(err)
            })?;

        match inserted {
            GuardedInsert::Inserted(id) => {
                info!(
                    %user_id,
                    plan = %plan.id,
                    resource = %kind,
                    resource_id = %id,
                    "usage_guard: resource created"
                );
                Ok(CreatedResourceDto { id, kind, name })
            }
            GuardedInsert::LimitReached { current } => {
                info!(
                    %user_id,
                    plan = %plan.id,
                    resource = %kind,
                    limit,
                    current,
                    "usage_guard: limit reached by a concurrent request"
                );
                Err(UseCaseError::LimitReached {
                    resource: kind,
                    limit,
                    current,
                })
            }
        }
    }
}
