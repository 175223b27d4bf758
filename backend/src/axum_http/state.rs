use std::sync::Arc;

use axum::extract::FromRef;
use crates::{
    infra::db::repositories::{
        billing_customers::BillingCustomerPostgres, resources::ResourcePostgres,
        subscriptions::SubscriptionPostgres,
    },
    payments::stripe_client::StripeClient,
};

use crate::{
    auth::AuthSettings,
    usecases::{
        billing::BillingSessionUseCase, plan_resolver::PlanResolver,
        usage_guard::UsageGuardUseCase,
    },
};

pub type AppPlanResolver = PlanResolver<SubscriptionPostgres>;
pub type AppUsageGuard = UsageGuardUseCase<SubscriptionPostgres, ResourcePostgres>;
pub type AppBilling =
    BillingSessionUseCase<SubscriptionPostgres, BillingCustomerPostgres, StripeClient>;

/// Shared by every router; use cases are built once at startup.
#[derive(Clone)]
pub struct AppState {
    pub auth: AuthSettings,
    pub plan_resolver: Arc<AppPlanResolver>,
    pub usage_guard: Arc<AppUsageGuard>,
    pub billing: Arc<AppBilling>,
}

impl FromRef<AppState> for AuthSettings {
    fn from_ref(state: &AppState) -> Self {
        state.auth.clone()
    }
}
