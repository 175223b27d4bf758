use anyhow::Result;
use async_trait::async_trait;
use diesel::{OptionalExtension, RunQueryDsl, insert_into, prelude::*};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    domain,
    infra::db::postgres::{postgres_connection::PgPoolSquad, schema::billing_customers},
};
use domain::{
    entities::billing_customers::InsertBillingCustomerEntity,
    repositories::billing_customers::BillingCustomerRepository,
};

const PROVIDER: &str = "stripe";

pub struct BillingCustomerPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl BillingCustomerPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl BillingCustomerRepository for BillingCustomerPostgres {
    async fn find_customer_ref(&self, user_id: Uuid) -> Result<Option<String>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let customer_ref = billing_customers::table
            .filter(billing_customers::user_id.eq(user_id))
            .filter(billing_customers::provider.eq(PROVIDER))
            .select(billing_customers::customer_ref)
            .first::<String>(&mut conn)
            .optional()?;

        Ok(customer_ref)
    }

    async fn upsert_customer_ref(&self, user_id: Uuid, customer_ref: String) -> Result<()> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let insert_entity = InsertBillingCustomerEntity {
            user_id,
            provider: PROVIDER.to_string(),
            customer_ref: customer_ref.clone(),
        };

        insert_into(billing_customers::table)
            .values(&insert_entity)
            .on_conflict((billing_customers::user_id, billing_customers::provider))
            .do_update()
            .set(billing_customers::customer_ref.eq(customer_ref))
            .execute(&mut conn)?;

        Ok(())
    }
}
