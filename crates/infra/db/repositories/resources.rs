use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::{
    Connection, PgConnection, QueryResult, RunQueryDsl, insert_into, prelude::*, sql_query,
    sql_types::Text,
};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use crate::{
    domain,
    infra::db::postgres::{
        postgres_connection::PgPoolSquad,
        schema::{brands, content_pillars, email_accounts, ideas},
    },
};
use domain::{
    repositories::resources::ResourceRepository,
    value_objects::{enums::resource_kinds::ResourceKind, plans::UNLIMITED, usage::GuardedInsert},
};

pub struct ResourcePostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl ResourcePostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

fn count_for(conn: &mut PgConnection, user_id: Uuid, kind: ResourceKind) -> QueryResult<i64> {
    match kind {
        ResourceKind::Ideas => ideas::table
            .filter(ideas::user_id.eq(user_id))
            .count()
            .get_result(conn),
        ResourceKind::Pillars => content_pillars::table
            .filter(content_pillars::user_id.eq(user_id))
            .count()
            .get_result(conn),
        ResourceKind::Brands => brands::table
            .filter(brands::user_id.eq(user_id))
            .count()
            .get_result(conn),
        ResourceKind::EmailAccounts => email_accounts::table
            .filter(email_accounts::user_id.eq(user_id))
            .count()
            .get_result(conn),
    }
}

fn insert_for(
    conn: &mut PgConnection,
    user_id: Uuid,
    kind: ResourceKind,
    name: &str,
    now: DateTime<Utc>,
) -> QueryResult<Uuid> {
    match kind {
        ResourceKind::Ideas => insert_into(ideas::table)
            .values((
                ideas::user_id.eq(user_id),
                ideas::name.eq(name),
                ideas::created_at.eq(now),
            ))
            .returning(ideas::id)
            .get_result(conn),
        ResourceKind::Pillars => insert_into(content_pillars::table)
            .values((
                content_pillars::user_id.eq(user_id),
                content_pillars::name.eq(name),
                content_pillars::created_at.eq(now),
            ))
            .returning(content_pillars::id)
            .get_result(conn),
        ResourceKind::Brands => insert_into(brands::table)
            .values((
                brands::user_id.eq(user_id),
                brands::name.eq(name),
                brands::created_at.eq(now),
            ))
            .returning(brands::id)
            .get_result(conn),
        ResourceKind::EmailAccounts => insert_into(email_accounts::table)
            .values((
                email_accounts::user_id.eq(user_id),
                email_accounts::name.eq(name),
                email_accounts::created_at.eq(now),
            ))
            .returning(email_accounts::id)
            .get_result(conn),
    }
}

#[async_trait]
impl ResourceRepository for ResourcePostgres {
    async fn count_resources(&self, user_id: Uuid, kind: ResourceKind) -> Result<i64> {
        let mut conn = Arc::clone(&self.db_pool).get()?;
        Ok(count_for(&mut conn, user_id, kind)?)
    }

    async fn insert_within_limit(
        &self,
        user_id: Uuid,
        kind: ResourceKind,
        limit: i64,
        name: String,
    ) -> Result<GuardedInsert> {
        let mut conn = Arc::clone(&self.db_pool).get()?;
        let now = Utc::now();

        conn.transaction::<GuardedInsert, anyhow::Error, _>(|conn| {
            if limit != UNLIMITED {
                // Serialises count-and-insert per (user, kind) until the transaction ends.
                sql_query("SELECT pg_advisory_xact_lock(hashtextextended($1, 0))")
                    .bind::<Text, _>(format!("{user_id}:{kind}"))
                    .execute(conn)?;

                let current = count_for(conn, user_id, kind)?;
                if current >= limit {
                    debug!(
                        %user_id,
                        resource = %kind,
                        limit,
                        current,
                        "resources: limit reached under lock"
                    );
                    return Ok(GuardedInsert::LimitReached { current });
                }
            }

            let id = insert_for(conn, user_id, kind, &name, now)?;
            Ok(GuardedInsert::Inserted(id))
        })
    }
}
