use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{
    entities::subscriptions::SubscriptionEntity,
    value_objects::enums::{plan_tiers::PlanTierId, subscription_statuses::SubscriptionStatus},
};

/// A subscription state change reported by the payment processor, normalised from
/// whichever webhook carried it. `event_id` is the processor's event id and is the
/// idempotency key for applying the change.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SubscriptionStatusChange {
    pub event_id: String,
    pub event_type: String,
    pub occurred_at: DateTime<Utc>,
    pub provider_subscription_id: String,
    pub status: SubscriptionStatus,
    pub user_id: Option<Uuid>,
    pub plan_tier: Option<PlanTierId>,
    pub provider_customer_id: Option<String>,
    pub current_period_end: Option<DateTime<Utc>>,
}

/// Where a change lands relative to the stored subscription row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeTarget {
    /// Update the row with this id.
    Update(Uuid),
    /// No row yet; create one for this user.
    Insert(Uuid),
    Stale,
    Unmatched,
}

impl SubscriptionStatusChange {
    /// A change older than the row's `last_event_at` never overwrites it.
    pub fn target(&self, existing: Option<&SubscriptionEntity>) -> ChangeTarget {
        match (existing, self.user_id) {
            (Some(current), _) if current.last_event_at > self.occurred_at => ChangeTarget::Stale,
            (Some(current), _) => ChangeTarget::Update(current.id),
            (None, Some(user_id)) => ChangeTarget::Insert(user_id),
            (None, None) => ChangeTarget::Unmatched,
        }
    }
}

/// Result of recording a change in storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    Applied,
    Duplicate,
    Stale,
    Unmatched,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WebhookOutcome {
    Applied,
    Duplicate,
    Stale,
    Ignored,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn at(ts: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(ts, 0).unwrap()
    }

    fn change(occurred_at: DateTime<Utc>, user_id: Option<Uuid>) -> SubscriptionStatusChange {
        SubscriptionStatusChange {
            event_id: "evt_1".to_string(),
            event_type: "customer.subscription.updated".to_string(),
            occurred_at,
            provider_subscription_id: "sub_1".to_string(),
            status: SubscriptionStatus::Active,
            user_id,
            plan_tier: Some(PlanTierId::Pro),
            provider_customer_id: Some("cus_1".to_string()),
            current_period_end: None,
        }
    }

    fn row(last_event_at: DateTime<Utc>) -> SubscriptionEntity {
        SubscriptionEntity {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            plan_tier: "pro".to_string(),
            status: "past_due".to_string(),
            provider_customer_id: Some("cus_1".to_string()),
            provider_subscription_id: "sub_1".to_string(),
            current_period_end: None,
            last_event_at,
            created_at: last_event_at,
            updated_at: last_event_at,
        }
    }

    #[test]
    fn newer_event_updates_existing_row() {
        let existing = row(at(1_700_000_000));

        let target = change(at(1_700_000_060), None).target(Some(&existing));

        assert_eq!(target, ChangeTarget::Update(existing.id));
    }

    #[test]
    fn event_in_the_same_second_still_updates() {
        let existing = row(at(1_700_000_000));

        let target = change(at(1_700_000_000), None).target(Some(&existing));

        assert_eq!(target, ChangeTarget::Update(existing.id));
    }

    #[test]
    fn older_event_is_stale() {
        let existing = row(at(1_700_000_000));
        let older = at(1_700_000_000) - Duration::seconds(1);

        assert_eq!(
            change(older, Some(existing.user_id)).target(Some(&existing)),
            ChangeTarget::Stale
        );
    }

    #[test]
    fn missing_row_is_inserted_for_known_user() {
        let user_id = Uuid::new_v4();

        assert_eq!(
            change(at(1_700_000_000), Some(user_id)).target(None),
            ChangeTarget::Insert(user_id)
        );
    }

    #[test]
    fn missing_row_without_user_is_unmatched() {
        assert_eq!(
            change(at(1_700_000_000), None).target(None),
            ChangeTarget::Unmatched
        );
    }
}
