use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use diesel::{
    Connection, OptionalExtension, RunQueryDsl, dsl::exists, insert_into, prelude::*, select,
    update,
};
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::{
    domain,
    infra::db::postgres::{
        postgres_connection::PgPoolSquad,
        schema::{billing_events, subscriptions},
    },
};
use domain::{
    entities::{
        billing_events::InsertBillingEventEntity,
        subscriptions::{InsertSubscriptionEntity, SubscriptionChangeset, SubscriptionEntity},
    },
    repositories::subscriptions::SubscriptionRepository,
    value_objects::{
        billing_events::{ApplyOutcome, ChangeTarget, SubscriptionStatusChange},
        enums::{plan_tiers::PlanTierId, subscription_statuses::SubscriptionStatus},
    },
};

pub struct SubscriptionPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl SubscriptionPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl SubscriptionRepository for SubscriptionPostgres {
    async fn find_current_by_user_id(&self, user_id: Uuid) -> Result<Option<SubscriptionEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let active = subscriptions::table
            .filter(subscriptions::user_id.eq(user_id))
            .filter(subscriptions::status.eq(SubscriptionStatus::Active.to_string()))
            .order(subscriptions::updated_at.desc())
            .select(SubscriptionEntity::as_select())
            .first::<SubscriptionEntity>(&mut conn)
            .optional()?;

        if active.is_some() {
            return Ok(active);
        }

        let latest = subscriptions::table
            .filter(subscriptions::user_id.eq(user_id))
            .order(subscriptions::updated_at.desc())
            .select(SubscriptionEntity::as_select())
            .first::<SubscriptionEntity>(&mut conn)
            .optional()?;

        Ok(latest)
    }

    async fn is_event_recorded(&self, event_id: String) -> Result<bool> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let recorded = select(exists(
            billing_events::table.filter(billing_events::event_id.eq(event_id)),
        ))
        .get_result::<bool>(&mut conn)?;

        Ok(recorded)
    }

    async fn apply_status_change(&self, change: SubscriptionStatusChange) -> Result<ApplyOutcome> {
        let mut conn = Arc::clone(&self.db_pool).get()?;
        let now = Utc::now();

        conn.transaction::<ApplyOutcome, anyhow::Error, _>(|conn| {
            let recorded = insert_into(billing_events::table)
                .values(&InsertBillingEventEntity {
                    event_id: change.event_id.clone(),
                    event_type: change.event_type.clone(),
                    provider_subscription_id: change.provider_subscription_id.clone(),
                    processed_at: now,
                })
                .on_conflict(billing_events::event_id)
                .do_nothing()
                .execute(conn)?;

            if recorded == 0 {
                debug!(
                    event_id = %change.event_id,
                    "subscriptions: billing event already applied"
                );
                return Ok(ApplyOutcome::Duplicate);
            }

            let existing = subscriptions::table
                .filter(
                    subscriptions::provider_subscription_id.eq(&change.provider_subscription_id),
                )
                .select(SubscriptionEntity::as_select())
                .for_update()
                .first::<SubscriptionEntity>(conn)
                .optional()?;

            match change.target(existing.as_ref()) {
                ChangeTarget::Stale => {
                    debug!(
                        event_id = %change.event_id,
                        provider_subscription_id = %change.provider_subscription_id,
                        "subscriptions: skipping out-of-order billing event"
                    );
                    Ok(ApplyOutcome::Stale)
                }
                ChangeTarget::Update(id) => {
                    update(subscriptions::table.filter(subscriptions::id.eq(id)))
                        .set(&SubscriptionChangeset {
                            plan_tier: change.plan_tier.map(|tier| tier.to_string()),
                            status: change.status.to_string(),
                            provider_customer_id: change.provider_customer_id.clone(),
                            current_period_end: change.current_period_end,
                            last_event_at: change.occurred_at,
                            updated_at: now,
                        })
                        .execute(conn)?;
                    Ok(ApplyOutcome::Applied)
                }
                ChangeTarget::Insert(user_id) => {
                    insert_into(subscriptions::table)
                        .values(&InsertSubscriptionEntity {
                            user_id,
                            plan_tier: change.plan_tier.unwrap_or(PlanTierId::Free).to_string(),
                            status: change.status.to_string(),
                            provider_customer_id: change.provider_customer_id.clone(),
                            provider_subscription_id: change.provider_subscription_id.clone(),
                            current_period_end: change.current_period_end,
                            last_event_at: change.occurred_at,
                        })
                        .execute(conn)?;
                    Ok(ApplyOutcome::Applied)
                }
                ChangeTarget::Unmatched => {
                    warn!(
                        event_id = %change.event_id,
                        provider_subscription_id = %change.provider_subscription_id,
                        "subscriptions: no local subscription and no user id on event"
                    );
                    Ok(ApplyOutcome::Unmatched)
                }
            }
        })
    }
}
