use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;
use uuid::Uuid;

#[automock]
#[async_trait]
pub trait BillingCustomerRepository {
    async fn find_customer_ref(&self, user_id: Uuid) -> Result<Option<String>>;

    async fn upsert_customer_ref(&self, user_id: Uuid, customer_ref: String) -> Result<()>;
}
