use diesel::prelude::*;
use uuid::Uuid;

use crate::infra::db::postgres::schema::billing_customers;

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = billing_customers)]
pub struct InsertBillingCustomerEntity {
    pub user_id: Uuid,
    pub provider: String,
    pub customer_ref: String,
}
