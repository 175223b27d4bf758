use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;
use uuid::Uuid;

use crate::domain::value_objects::{
    enums::resource_kinds::ResourceKind, usage::GuardedInsert,
};

#[automock]
#[async_trait]
pub trait ResourceRepository {
    async fn count_resources(&self, user_id: Uuid, kind: ResourceKind) -> Result<i64>;

    /// Inserts a resource only if the user's count of `kind` is still below `limit`
    /// (`-1` skips the check). Counting and inserting happen under one per-user lock, so
    /// two concurrent requests can never both take the last slot.
    async fn insert_within_limit(
        &self,
        user_id: Uuid,
        kind: ResourceKind,
        limit: i64,
        name: String,
    ) -> Result<GuardedInsert>;
}
