use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::domain::value_objects::enums::subscription_statuses::SubscriptionStatus;
use crate::infra::db::postgres::schema::subscriptions;

#[derive(Debug, Clone, PartialEq, Identifiable, Selectable, Queryable)]
#[diesel(table_name = subscriptions)]
pub struct SubscriptionEntity {
    pub id: Uuid,
    pub user_id: Uuid,
    pub plan_tier: String,
    pub status: String,
    pub provider_customer_id: Option<String>,
    pub provider_subscription_id: String,
    pub current_period_end: Option<DateTime<Utc>>,
    pub last_event_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SubscriptionEntity {
    pub fn status(&self) -> SubscriptionStatus {
        SubscriptionStatus::from_str(&self.status)
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = subscriptions)]
pub struct InsertSubscriptionEntity {
    pub user_id: Uuid,
    pub plan_tier: String,
    pub status: String,
    pub provider_customer_id: Option<String>,
    pub provider_subscription_id: String,
    pub current_period_end: Option<DateTime<Utc>>,
    pub last_event_at: DateTime<Utc>,
}

/// Partial update applied by reconciliation. `None` fields are left untouched.
#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = subscriptions)]
pub struct SubscriptionChangeset {
    pub plan_tier: Option<String>,
    pub status: String,
    pub provider_customer_id: Option<String>,
    pub current_period_end: Option<DateTime<Utc>>,
    pub last_event_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
