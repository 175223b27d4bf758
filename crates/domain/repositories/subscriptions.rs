use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;
use uuid::Uuid;

use crate::domain::entities::subscriptions::SubscriptionEntity;
use crate::domain::value_objects::billing_events::{ApplyOutcome, SubscriptionStatusChange};

#[automock]
#[async_trait]
pub trait SubscriptionRepository {
    /// The user's most relevant subscription: an active one if any, otherwise the most
    /// recently updated.
    async fn find_current_by_user_id(&self, user_id: Uuid) -> Result<Option<SubscriptionEntity>>;

    async fn is_event_recorded(&self, event_id: String) -> Result<bool>;

    /// Records `change.event_id` and upserts the subscription keyed by its provider id,
    /// atomically. A recorded event id or an out-of-order change leaves the row as is.
    async fn apply_status_change(&self, change: SubscriptionStatusChange) -> Result<ApplyOutcome>;
}
