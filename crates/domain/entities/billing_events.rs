use chrono::{DateTime, Utc};
use diesel::prelude::*;

use crate::infra::db::postgres::schema::billing_events;

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = billing_events)]
pub struct InsertBillingEventEntity {
    pub event_id: String,
    pub event_type: String,
    pub provider_subscription_id: String,
    pub processed_at: DateTime<Utc>,
}
