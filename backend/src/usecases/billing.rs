use std::{collections::HashMap, sync::Arc};

use anyhow::{Result as AnyResult, anyhow};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use crates::{
    domain::{
        repositories::{
            billing_customers::BillingCustomerRepository,
            subscriptions::SubscriptionRepository,
        },
        value_objects::{
            billing_events::{ApplyOutcome, SubscriptionStatusChange, WebhookOutcome},
            enums::{plan_tiers::PlanTierId, subscription_statuses::SubscriptionStatus},
            subscriptions::{CurrentSubscriptionDto, PlanDto, SessionUrl},
        },
    },
    payments::stripe_client::{
        CheckoutSessionParams, StripeClient, StripeEvent, StripeSession, StripeSubscription,
    },
};
use tracing::{debug, error, info, warn};
use url::Url;
use uuid::Uuid;

use crate::usecases::{
    errors::{UseCaseError, UseCaseResult},
    plan_catalog::PlanCatalog,
};

const METADATA_USER_ID: &str = "user_id";
const METADATA_PLAN_ID: &str = "plan_id";

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BillingGateway: Send + Sync {
    async fn create_checkout_session(
        &self,
        params: CheckoutSessionParams,
    ) -> AnyResult<StripeSession>;

    async fn create_portal_session(
        &self,
        customer_id: String,
        return_url: String,
    ) -> AnyResult<StripeSession>;

    async fn retrieve_subscription(&self, subscription_id: String)
    -> AnyResult<StripeSubscription>;

    async fn cancel_subscription(&self, subscription_id: String) -> AnyResult<StripeSubscription>;

    fn verify_webhook_signature(&self, payload: &[u8], signature: &str) -> AnyResult<StripeEvent>;
}

#[async_trait]
impl BillingGateway for StripeClient {
    async fn create_checkout_session(
        &self,
        params: CheckoutSessionParams,
    ) -> AnyResult<StripeSession> {
        self.create_checkout_session(params).await
    }

    async fn create_portal_session(
        &self,
        customer_id: String,
        return_url: String,
    ) -> AnyResult<StripeSession> {
        self.create_portal_session(&customer_id, &return_url).await
    }

    async fn retrieve_subscription(
        &self,
        subscription_id: String,
    ) -> AnyResult<StripeSubscription> {
        self.retrieve_subscription(&subscription_id).await
    }

    async fn cancel_subscription(&self, subscription_id: String) -> AnyResult<StripeSubscription> {
        self.cancel_subscription(&subscription_id).await
    }

    fn verify_webhook_signature(&self, payload: &[u8], signature: &str) -> AnyResult<StripeEvent> {
        self.verify_webhook_signature(payload, signature)
    }
}

/// Accepts only absolute http(s) URLs with a host.
pub fn validate_redirect_url(raw: &str) -> UseCaseResult<Url> {
    let url = Url::parse(raw).map_err(|_| UseCaseError::InvalidRedirectUrl(raw.to_string()))?;

    match url.scheme() {
        "http" | "https" if url.has_host() => Ok(url),
        _ => Err(UseCaseError::InvalidRedirectUrl(raw.to_string())),
    }
}

fn session_url(session: StripeSession) -> UseCaseResult<SessionUrl> {
    match session.url {
        Some(url) => Ok(SessionUrl { url }),
        None => Err(UseCaseError::UpstreamError(anyhow!(
            "stripe session {} returned without a url",
            session.id
        ))),
    }
}

fn ts_to_datetime(ts: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_opt(ts, 0).single()
}

fn invalid_webhook(reason: &str) -> UseCaseError {
    let err = UseCaseError::InvalidWebhook(reason.to_string());
    warn!(
        status = err.status_code().as_u16(),
        reason,
        "billing: rejected webhook payload"
    );
    err
}

pub struct BillingSessionUseCase<S, C, G>
where
    S: SubscriptionRepository + Send + Sync + 'static,
    C: BillingCustomerRepository + Send + Sync + 'static,
    G: BillingGateway + Send + Sync + 'static,
{
    catalog: Arc<PlanCatalog>,
    subscription_repo: Arc<S>,
    customer_repo: Arc<C>,
    gateway: Arc<G>,
}

impl<S, C, G> BillingSessionUseCase<S, C, G>
where
    S: SubscriptionRepository + Send + Sync + 'static,
    C: BillingCustomerRepository + Send + Sync + 'static,
    G: BillingGateway + Send + Sync + 'static,
{
    pub fn new(
        catalog: Arc<PlanCatalog>,
        subscription_repo: Arc<S>,
        customer_repo: Arc<C>,
        gateway: Arc<G>,
    ) -> Self {
        Self {
            catalog,
            subscription_repo,
            customer_repo,
            gateway,
        }
    }

    pub fn list_plans(&self) -> Vec<PlanDto> {
        self.catalog.list().into_iter().map(PlanDto::from).collect()
    }

    pub async fn get_current_subscription(
        &self,
        user_id: Uuid,
    ) -> UseCaseResult<Option<CurrentSubscriptionDto>> {
        let subscription = match self
            .subscription_repo
            .find_current_by_user_id(user_id)
            .await
            .map_err(|err| {
                error!(
                    %user_id,
                    db_error = ?err,
                    "billing: failed to load current subscription"
                );
                UseCaseError::Internal(err)
            })? {
            Some(subscription) => subscription,
            None => {
                debug!(%user_id, "billing: no subscription on file");
                return Ok(None);
            }
        };

        let plan = self.catalog.get_plan(&subscription.plan_tier);

        Ok(Some(CurrentSubscriptionDto {
            plan_id: plan.id,
            plan_name: plan.name.clone(),
            status: subscription.status(),
            current_period_end: subscription.current_period_end,
            has_billing_portal: subscription.provider_customer_id.is_some(),
        }))
    }

    pub async fn create_checkout_session(
        &self,
        user_id: Uuid,
        user_email: Option<String>,
        plan_id: &str,
        success_url: &str,
        cancel_url: &str,
    ) -> UseCaseResult<SessionUrl> {
        info!(%user_id, plan_id, "billing: create checkout session requested");

        let plan = PlanTierId::from_str(plan_id).map(|id| self.catalog.get(id));
        let (plan, price_id) = match plan {
            Some(plan) => match plan.stripe_price_id.clone() {
                Some(price_id) => (plan, price_id),
                None => {
                    let err = UseCaseError::InvalidPlan(plan_id.to_string());
                    warn!(
                        %user_id,
                        plan_id,
                        status = err.status_code().as_u16(),
                        "billing: plan has no price reference"
                    );
                    return Err(err);
                }
            },
            None => {
                let err = UseCaseError::InvalidPlan(plan_id.to_string());
                warn!(
                    %user_id,
                    plan_id,
                    status = err.status_code().as_u16(),
                    "billing: unknown plan requested for checkout"
                );
                return Err(err);
            }
        };

        let success_url = validate_redirect_url(success_url)?;
        let cancel_url = validate_redirect_url(cancel_url)?;

        let customer_id = self
            .customer_repo
            .find_customer_ref(user_id)
            .await
            .map_err(|err| {
                error!(
                    %user_id,
                    db_error = ?err,
                    "billing: failed to load billing customer"
                );
                UseCaseError::Internal(err)
            })?;

        let params = CheckoutSessionParams {
            price_id: price_id.clone(),
            customer_email: if customer_id.is_none() { user_email } else { None },
            customer_id,
            client_reference_id: user_id.to_string(),
            success_url: success_url.to_string(),
            cancel_url: cancel_url.to_string(),
            metadata: HashMap::from([
                (METADATA_USER_ID.to_string(), user_id.to_string()),
                (METADATA_PLAN_ID.to_string(), plan.id.to_string()),
            ]),
        };

        let session = self
            .gateway
            .create_checkout_session(params)
            .await
            .map_err(|err| {
                error!(
                    %user_id,
                    plan = %plan.id,
                    price_id = %price_id,
                    error = ?err,
                    "billing: stripe checkout session creation failed"
                );
                UseCaseError::UpstreamError(err)
            })?;

        info!(
            %user_id,
            plan = %plan.id,
            session_id = %session.id,
            "billing: checkout session created"
        );

        session_url(session)
    }

    pub async fn create_portal_session(
        &self,
        customer_id: Option<String>,
        return_url: &str,
    ) -> UseCaseResult<SessionUrl> {
        let customer_id = customer_id.ok_or_else(|| {
            let err = UseCaseError::NoActiveSubscription;
            info!(
                status = err.status_code().as_u16(),
                "billing: no billing customer for portal session"
            );
            err
        })?;
        let return_url = validate_redirect_url(return_url)?;

        let session = self
            .gateway
            .create_portal_session(customer_id.clone(), return_url.to_string())
            .await
            .map_err(|err| {
                error!(
                    %customer_id,
                    error = ?err,
                    "billing: stripe portal session creation failed"
                );
                UseCaseError::UpstreamError(err)
            })?;

        session_url(session)
    }

    /// Opens the billing portal for the user's processor customer, if they have one.
    pub async fn create_portal_session_for_user(
        &self,
        user_id: Uuid,
        return_url: &str,
    ) -> UseCaseResult<SessionUrl> {
        let subscription_customer = self
            .subscription_repo
            .find_current_by_user_id(user_id)
            .await
            .map_err(|err| {
                error!(
                    %user_id,
                    db_error = ?err,
                    "billing: failed to load subscription for portal"
                );
                UseCaseError::Internal(err)
            })?
            .and_then(|subscription| subscription.provider_customer_id);

        let customer_id = match subscription_customer {
            Some(customer_id) => Some(customer_id),
            None => self
                .customer_repo
                .find_customer_ref(user_id)
                .await
                .map_err(|err| {
                    error!(
                        %user_id,
                        db_error = ?err,
                        "billing: failed to load billing customer for portal"
                    );
                    UseCaseError::Internal(err)
                })?,
        };

        info!(
            %user_id,
            has_customer = customer_id.is_some(),
            "billing: portal session requested"
        );

        self.create_portal_session(customer_id, return_url).await
    }

    pub async fn get_subscription(&self, subscription_id: &str) -> UseCaseResult<StripeSubscription> {
        self.gateway
            .retrieve_subscription(subscription_id.to_string())
            .await
            .map_err(|err| {
                error!(
                    subscription_id,
                    error = ?err,
                    "billing: stripe retrieve subscription failed"
                );
                UseCaseError::UpstreamError(err)
            })
    }

    pub async fn cancel_subscription(
        &self,
        subscription_id: &str,
    ) -> UseCaseResult<StripeSubscription> {
        self.gateway
            .cancel_subscription(subscription_id.to_string())
            .await
            .map_err(|err| {
                error!(
                    subscription_id,
                    error = ?err,
                    "billing: stripe cancel subscription failed"
                );
                UseCaseError::UpstreamError(err)
            })
    }

    /// Schedules the user's active subscription to end with the current period.
    pub async fn cancel_for_user(&self, user_id: Uuid) -> UseCaseResult<()> {
        let subscription = self
            .subscription_repo
            .find_current_by_user_id(user_id)
            .await
            .map_err(|err| {
                error!(
                    %user_id,
                    db_error = ?err,
                    "billing: failed to load subscription for cancel"
                );
                UseCaseError::Internal(err)
            })?
            .filter(|subscription| subscription.status().is_active())
            .ok_or_else(|| {
                let err = UseCaseError::NoActiveSubscription;
                info!(
                    %user_id,
                    status = err.status_code().as_u16(),
                    "billing: no active subscription to cancel"
                );
                err
            })?;

        let provider_subscription_id = subscription.provider_subscription_id;
        self.cancel_subscription(&provider_subscription_id).await?;

        info!(
            %user_id,
            %provider_subscription_id,
            "billing: subscription set to cancel at period end"
        );

        Ok(())
    }

    pub async fn handle_webhook(
        &self,
        payload: &[u8],
        signature: &str,
    ) -> UseCaseResult<WebhookOutcome> {
        let event = self
            .gateway
            .verify_webhook_signature(payload, signature)
            .map_err(|err| {
                warn!(error = %err, "billing: stripe webhook verification failed");
                UseCaseError::InvalidWebhook("signature verification failed".to_string())
            })?;

        info!(
            event_id = %event.id,
            event_type = %event.type_,
            "billing: stripe webhook verified"
        );

        let change = match event.type_.as_str() {
            "checkout.session.completed" => {
                if self.is_recorded(&event.id).await? {
                    info!(event_id = %event.id, "billing: duplicate webhook event ignored");
                    return Ok(WebhookOutcome::Duplicate);
                }
                self.change_from_checkout(&event).await?
            }
            "customer.subscription.created"
            | "customer.subscription.updated"
            | "customer.subscription.deleted" => Some(self.change_from_subscription(&event)?),
            "invoice.payment_failed" => {
                Self::change_from_invoice(&event, SubscriptionStatus::PastDue)?
            }
            "invoice.payment_succeeded" => {
                Self::change_from_invoice(&event, SubscriptionStatus::Active)?
            }
            _ => {
                debug!(event_type = %event.type_, "billing: unhandled stripe event type");
                None
            }
        };

        let change = match change {
            Some(change) => change,
            None => return Ok(WebhookOutcome::Ignored),
        };

        let event_id = change.event_id.clone();
        let provider_subscription_id = change.provider_subscription_id.clone();
        let status = change.status;

        let outcome = self
            .subscription_repo
            .apply_status_change(change)
            .await
            .map_err(|err| {
                error!(
                    %event_id,
                    %provider_subscription_id,
                    db_error = ?err,
                    "billing: failed to apply subscription change"
                );
                UseCaseError::Internal(err)
            })?;

        match outcome {
            ApplyOutcome::Applied => {
                info!(
                    %event_id,
                    %provider_subscription_id,
                    %status,
                    "billing: subscription change applied"
                );
                Ok(WebhookOutcome::Applied)
            }
            ApplyOutcome::Duplicate => {
                info!(%event_id, "billing: duplicate webhook event ignored");
                Ok(WebhookOutcome::Duplicate)
            }
            ApplyOutcome::Stale => {
                info!(
                    %event_id,
                    %provider_subscription_id,
                    "billing: out-of-order webhook event recorded without changes"
                );
                Ok(WebhookOutcome::Stale)
            }
            ApplyOutcome::Unmatched => {
                warn!(
                    %event_id,
                    %provider_subscription_id,
                    "billing: webhook event matched no subscription"
                );
                Ok(WebhookOutcome::Ignored)
            }
        }
    }

    async fn is_recorded(&self, event_id: &str) -> UseCaseResult<bool> {
        self.subscription_repo
            .is_event_recorded(event_id.to_string())
            .await
            .map_err(|err| {
                error!(
                    %event_id,
                    db_error = ?err,
                    "billing: failed to look up billing event"
                );
                UseCaseError::Internal(err)
            })
    }

    fn occurred_at(event: &StripeEvent) -> UseCaseResult<DateTime<Utc>> {
        ts_to_datetime(event.created).ok_or_else(|| invalid_webhook("invalid event timestamp"))
    }

    /// Tier sold by the subscription's price, else the tier recorded at checkout.
    fn tier_for(
        &self,
        price_id: Option<&str>,
        metadata: Option<&HashMap<String, String>>,
    ) -> Option<PlanTierId> {
        price_id
            .and_then(|price_id| self.catalog.find_by_price_reference(price_id))
            .map(|plan| plan.id)
            .or_else(|| {
                metadata
                    .and_then(|metadata| metadata.get(METADATA_PLAN_ID))
                    .and_then(|plan_id| PlanTierId::from_str(plan_id))
            })
    }

    async fn change_from_checkout(
        &self,
        event: &StripeEvent,
    ) -> UseCaseResult<Option<SubscriptionStatusChange>> {
        let session = StripeClient::extract_checkout_session(event)
            .ok_or_else(|| invalid_webhook("missing checkout session"))?;

        if session.mode.as_deref() != Some("subscription") {
            debug!(mode = ?session.mode, "billing: ignoring non-subscription checkout");
            return Ok(None);
        }

        let user_id = session
            .client_reference_id
            .as_deref()
            .or_else(|| {
                session
                    .metadata
                    .as_ref()
                    .and_then(|metadata| metadata.get(METADATA_USER_ID))
                    .map(String::as_str)
            })
            .and_then(|value| Uuid::parse_str(value).ok())
            .ok_or_else(|| invalid_webhook("missing user_id"))?;

        let subscription_id = session
            .subscription
            .clone()
            .ok_or_else(|| invalid_webhook("checkout session missing subscription id"))?;

        if let Some(customer_id) = session.customer.clone() {
            self.customer_repo
                .upsert_customer_ref(user_id, customer_id)
                .await
                .map_err(|err| {
                    error!(
                        %user_id,
                        db_error = ?err,
                        "billing: failed to store billing customer"
                    );
                    UseCaseError::Internal(err)
                })?;
        }

        let subscription = self.get_subscription(&subscription_id).await?;
        let plan_tier = self
            .tier_for(subscription.price_id(), session.metadata.as_ref())
            .unwrap_or(PlanTierId::Free);

        Ok(Some(SubscriptionStatusChange {
            event_id: event.id.clone(),
            event_type: event.type_.clone(),
            occurred_at: Self::occurred_at(event)?,
            provider_subscription_id: subscription.id.clone(),
            status: SubscriptionStatus::from_stripe_status(&subscription.status),
            user_id: Some(user_id),
            plan_tier: Some(plan_tier),
            provider_customer_id: session.customer.or(subscription.customer.clone()),
            current_period_end: subscription.period_end().and_then(ts_to_datetime),
        }))
    }

    fn change_from_subscription(
        &self,
        event: &StripeEvent,
    ) -> UseCaseResult<SubscriptionStatusChange> {
        let subscription = StripeClient::extract_subscription(event)
            .ok_or_else(|| invalid_webhook("invalid subscription payload"))?;

        let status = if event.type_ == "customer.subscription.deleted" {
            SubscriptionStatus::Canceled
        } else {
            SubscriptionStatus::from_stripe_status(&subscription.status)
        };

        let user_id = subscription
            .metadata
            .get(METADATA_USER_ID)
            .and_then(|value| Uuid::parse_str(value).ok());

        Ok(SubscriptionStatusChange {
            event_id: event.id.clone(),
            event_type: event.type_.clone(),
            occurred_at: Self::occurred_at(event)?,
            provider_subscription_id: subscription.id.clone(),
            status,
            user_id,
            plan_tier: self.tier_for(subscription.price_id(), Some(&subscription.metadata)),
            provider_customer_id: subscription.customer.clone(),
            current_period_end: subscription.period_end().and_then(ts_to_datetime),
        })
    }

    fn change_from_invoice(
        event: &StripeEvent,
        status: SubscriptionStatus,
    ) -> UseCaseResult<Option<SubscriptionStatusChange>> {
        let invoice = StripeClient::extract_invoice(event)
            .ok_or_else(|| invalid_webhook("invalid invoice payload"))?;

        let subscription_id = match invoice.subscription {
            Some(subscription_id) => subscription_id,
            None => {
                debug!(invoice_id = ?invoice.id, "billing: invoice without subscription");
                return Ok(None);
            }
        };

        Ok(Some(SubscriptionStatusChange {
            event_id: event.id.clone(),
            event_type: event.type_.clone(),
            occurred_at: Self::occurred_at(event)?,
            provider_subscription_id: subscription_id,
            status,
            user_id: None,
            plan_tier: None,
            provider_customer_id: invoice.customer,
            current_period_end: None,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crates::domain::{
        entities::subscriptions::SubscriptionEntity,
        repositories::{
            billing_customers::MockBillingCustomerRepository,
            subscriptions::MockSubscriptionRepository,
        },
        value_objects::billing_events::ChangeTarget,
    };
    use serde_json::json;
    use std::{collections::HashSet, sync::Mutex};

    fn catalog() -> Arc<PlanCatalog> {
        Arc::new(
            PlanCatalog::new(
                Some("price_pro".to_string()),
                Some("price_creator_plus".to_string()),
            )
            .unwrap(),
        )
    }

    fn subscription(user_id: Uuid, status: &str, customer: Option<&str>) -> SubscriptionEntity {
        let now = Utc.timestamp_opt(1_690_000_000, 0).unwrap();
        SubscriptionEntity {
            id: Uuid::new_v4(),
            user_id,
            plan_tier: "pro".to_string(),
            status: status.to_string(),
            provider_customer_id: customer.map(str::to_string),
            provider_subscription_id: "sub_123".to_string(),
            current_period_end: None,
            last_event_at: now,
            created_at: now,
            updated_at: now,
        }
    }

    fn event(id: &str, type_: &str, object: serde_json::Value) -> StripeEvent {
        serde_json::from_value(json!({
            "id": id,
            "type": type_,
            "created": 1_700_000_000,
            "data": { "object": object }
        }))
        .unwrap()
    }

    fn usecase<S: SubscriptionRepository + Send + Sync + 'static>(
        subscription_repo: S,
        customer_repo: MockBillingCustomerRepository,
        gateway: MockBillingGateway,
    ) -> BillingSessionUseCase<S, MockBillingCustomerRepository, MockBillingGateway> {
        BillingSessionUseCase::new(
            catalog(),
            Arc::new(subscription_repo),
            Arc::new(customer_repo),
            Arc::new(gateway),
        )
    }

    /// Keeps subscriptions keyed by provider id and remembers applied event ids.
    #[derive(Default)]
    struct InMemorySubscriptions {
        rows: Mutex<HashMap<String, SubscriptionEntity>>,
        events: Mutex<HashSet<String>>,
    }

    #[async_trait]
    impl SubscriptionRepository for InMemorySubscriptions {
        async fn find_current_by_user_id(
            &self,
            user_id: Uuid,
        ) -> AnyResult<Option<SubscriptionEntity>> {
            Ok(self
                .rows
                .lock()
                .unwrap()
                .values()
                .find(|row| row.user_id == user_id)
                .cloned())
        }

        async fn is_event_recorded(&self, event_id: String) -> AnyResult<bool> {
            Ok(self.events.lock().unwrap().contains(&event_id))
        }

        async fn apply_status_change(
            &self,
            change: SubscriptionStatusChange,
        ) -> AnyResult<ApplyOutcome> {
            if !self.events.lock().unwrap().insert(change.event_id.clone()) {
                return Ok(ApplyOutcome::Duplicate);
            }

            let mut rows = self.rows.lock().unwrap();
            let target = change.target(rows.get(&change.provider_subscription_id));
            match target {
                ChangeTarget::Stale => return Ok(ApplyOutcome::Stale),
                ChangeTarget::Unmatched => return Ok(ApplyOutcome::Unmatched),
                ChangeTarget::Update(_) => {
                    if let Some(row) = rows.get_mut(&change.provider_subscription_id) {
                        row.status = change.status.to_string();
                        if let Some(tier) = change.plan_tier {
                            row.plan_tier = tier.to_string();
                        }
                        row.last_event_at = change.occurred_at;
                    }
                }
                ChangeTarget::Insert(user_id) => {
                    rows.insert(
                        change.provider_subscription_id.clone(),
                        SubscriptionEntity {
                            id: Uuid::new_v4(),
                            user_id,
                            plan_tier: change.plan_tier.unwrap_or(PlanTierId::Free).to_string(),
                            status: change.status.to_string(),
                            provider_customer_id: change.provider_customer_id.clone(),
                            provider_subscription_id: change.provider_subscription_id.clone(),
                            current_period_end: change.current_period_end,
                            last_event_at: change.occurred_at,
                            created_at: change.occurred_at,
                            updated_at: change.occurred_at,
                        },
                    );
                }
            }

            Ok(ApplyOutcome::Applied)
        }
    }

    #[test]
    fn redirect_urls_must_be_absolute_http() {
        assert!(validate_redirect_url("https://app.example.com/billing?ok=1").is_ok());
        assert!(validate_redirect_url("http://localhost:3000/billing").is_ok());
        assert!(validate_redirect_url("/billing").is_err());
        assert!(validate_redirect_url("javascript:alert(1)").is_err());
        assert!(validate_redirect_url("ftp://example.com").is_err());
    }

    #[tokio::test]
    async fn checkout_for_free_plan_is_invalid() {
        let mut gateway = MockBillingGateway::new();
        gateway.expect_create_checkout_session().never();

        let err = usecase(
            MockSubscriptionRepository::new(),
            MockBillingCustomerRepository::new(),
            gateway,
        )
        .create_checkout_session(
            Uuid::new_v4(),
            None,
            "free",
            "https://app.example.com/ok",
            "https://app.example.com/cancel",
        )
        .await
        .unwrap_err();

        assert!(matches!(err, UseCaseError::InvalidPlan(plan) if plan == "free"));
    }

    #[tokio::test]
    async fn checkout_for_unknown_plan_is_invalid() {
        let err = usecase(
            MockSubscriptionRepository::new(),
            MockBillingCustomerRepository::new(),
            MockBillingGateway::new(),
        )
        .create_checkout_session(
            Uuid::new_v4(),
            None,
            "enterprise",
            "https://app.example.com/ok",
            "https://app.example.com/cancel",
        )
        .await
        .unwrap_err();

        assert!(matches!(err, UseCaseError::InvalidPlan(_)));
    }

    #[tokio::test]
    async fn checkout_rejects_relative_redirect_before_calling_stripe() {
        let mut gateway = MockBillingGateway::new();
        gateway.expect_create_checkout_session().never();

        let err = usecase(
            MockSubscriptionRepository::new(),
            MockBillingCustomerRepository::new(),
            gateway,
        )
        .create_checkout_session(
            Uuid::new_v4(),
            None,
            "pro",
            "/billing/success",
            "https://app.example.com/cancel",
        )
        .await
        .unwrap_err();

        assert!(matches!(err, UseCaseError::InvalidRedirectUrl(_)));
    }

    #[tokio::test]
    async fn checkout_reuses_known_customer_and_returns_url() {
        let user_id = Uuid::new_v4();

        let mut customer_repo = MockBillingCustomerRepository::new();
        customer_repo
            .expect_find_customer_ref()
            .returning(|_| Ok(Some("cus_9".to_string())));

        let mut gateway = MockBillingGateway::new();
        gateway
            .expect_create_checkout_session()
            .withf(move |params| {
                params.price_id == "price_creator_plus"
                    && params.customer_id.as_deref() == Some("cus_9")
                    && params.customer_email.is_none()
                    && params.client_reference_id == user_id.to_string()
                    && params.metadata.get("plan_id").map(String::as_str) == Some("creator_plus")
            })
            .returning(|_| {
                Ok(StripeSession {
                    id: "cs_1".to_string(),
                    url: Some("https://checkout.stripe.com/c/cs_1".to_string()),
                })
            });

        let session = usecase(MockSubscriptionRepository::new(), customer_repo, gateway)
            .create_checkout_session(
                user_id,
                Some("creator@example.com".to_string()),
                "creator_plus",
                "https://app.example.com/ok",
                "https://app.example.com/cancel",
            )
            .await
            .unwrap();

        assert_eq!(session.url, "https://checkout.stripe.com/c/cs_1");
    }

    #[tokio::test]
    async fn checkout_processor_failure_is_upstream_error() {
        let mut customer_repo = MockBillingCustomerRepository::new();
        customer_repo
            .expect_find_customer_ref()
            .returning(|_| Ok(None));

        let mut gateway = MockBillingGateway::new();
        gateway
            .expect_create_checkout_session()
            .returning(|_| Err(anyhow!("operation timed out")));

        let err = usecase(MockSubscriptionRepository::new(), customer_repo, gateway)
            .create_checkout_session(
                Uuid::new_v4(),
                Some("creator@example.com".to_string()),
                "pro",
                "https://app.example.com/ok",
                "https://app.example.com/cancel",
            )
            .await
            .unwrap_err();

        assert!(matches!(err, UseCaseError::UpstreamError(_)));
    }

    #[tokio::test]
    async fn portal_without_customer_is_no_active_subscription() {
        let mut subscription_repo = MockSubscriptionRepository::new();
        subscription_repo
            .expect_find_current_by_user_id()
            .returning(|_| Ok(None));

        let mut customer_repo = MockBillingCustomerRepository::new();
        customer_repo
            .expect_find_customer_ref()
            .returning(|_| Ok(None));

        let mut gateway = MockBillingGateway::new();
        gateway.expect_create_portal_session().never();

        let err = usecase(subscription_repo, customer_repo, gateway)
            .create_portal_session_for_user(Uuid::new_v4(), "https://app.example.com/billing")
            .await
            .unwrap_err();

        assert!(matches!(err, UseCaseError::NoActiveSubscription));
    }

    #[tokio::test]
    async fn portal_uses_subscription_customer() {
        let user_id = Uuid::new_v4();
        let current = subscription(user_id, "past_due", Some("cus_42"));

        let mut subscription_repo = MockSubscriptionRepository::new();
        subscription_repo
            .expect_find_current_by_user_id()
            .returning(move |_| Ok(Some(current.clone())));

        let mut customer_repo = MockBillingCustomerRepository::new();
        customer_repo.expect_find_customer_ref().never();

        let mut gateway = MockBillingGateway::new();
        gateway
            .expect_create_portal_session()
            .withf(|customer_id, return_url| {
                customer_id == "cus_42" && return_url == "https://app.example.com/billing"
            })
            .returning(|_, _| {
                Ok(StripeSession {
                    id: "bps_1".to_string(),
                    url: Some("https://billing.stripe.com/p/session/bps_1".to_string()),
                })
            });

        let session = usecase(subscription_repo, customer_repo, gateway)
            .create_portal_session_for_user(user_id, "https://app.example.com/billing")
            .await
            .unwrap();

        assert_eq!(session.url, "https://billing.stripe.com/p/session/bps_1");
    }

    #[tokio::test]
    async fn cancel_without_active_subscription_is_rejected() {
        let user_id = Uuid::new_v4();
        let canceled = subscription(user_id, "canceled", Some("cus_1"));

        let mut subscription_repo = MockSubscriptionRepository::new();
        subscription_repo
            .expect_find_current_by_user_id()
            .returning(move |_| Ok(Some(canceled.clone())));

        let mut gateway = MockBillingGateway::new();
        gateway.expect_cancel_subscription().never();

        let err = usecase(
            subscription_repo,
            MockBillingCustomerRepository::new(),
            gateway,
        )
        .cancel_for_user(user_id)
        .await
        .unwrap_err();

        assert!(matches!(err, UseCaseError::NoActiveSubscription));
    }

    #[tokio::test]
    async fn rejects_webhook_with_bad_signature() {
        let mut gateway = MockBillingGateway::new();
        gateway
            .expect_verify_webhook_signature()
            .returning(|_, _| Err(anyhow!("invalid webhook signature")));

        let err = usecase(
            MockSubscriptionRepository::new(),
            MockBillingCustomerRepository::new(),
            gateway,
        )
        .handle_webhook(b"{}", "t=1,v1=00")
        .await
        .unwrap_err();

        assert!(matches!(err, UseCaseError::InvalidWebhook(_)));
    }

    #[tokio::test]
    async fn replayed_subscription_event_is_applied_once() {
        let user_id = Uuid::new_v4();
        let updated = event(
            "evt_1",
            "customer.subscription.updated",
            json!({
                "id": "sub_123",
                "status": "active",
                "customer": "cus_1",
                "metadata": { "user_id": user_id.to_string() },
                "items": { "data": [
                    { "current_period_end": 1_702_592_000, "price": { "id": "price_pro" } }
                ] }
            }),
        );

        let mut gateway = MockBillingGateway::new();
        gateway
            .expect_verify_webhook_signature()
            .returning(move |_, _| Ok(updated.clone()));

        let usecase = usecase(
            InMemorySubscriptions::default(),
            MockBillingCustomerRepository::new(),
            gateway,
        );

        let first = usecase.handle_webhook(b"{}", "sig").await.unwrap();
        let after_first = usecase.get_current_subscription(user_id).await.unwrap();
        let second = usecase.handle_webhook(b"{}", "sig").await.unwrap();
        let after_second = usecase.get_current_subscription(user_id).await.unwrap();

        assert_eq!(first, WebhookOutcome::Applied);
        assert_eq!(second, WebhookOutcome::Duplicate);
        assert_eq!(after_first, after_second);

        let current = after_second.unwrap();
        assert_eq!(current.plan_id, PlanTierId::Pro);
        assert_eq!(current.status, SubscriptionStatus::Active);
        assert!(current.has_billing_portal);
    }

    #[tokio::test]
    async fn deleted_subscription_flips_to_canceled() {
        let user_id = Uuid::new_v4();
        let repo = InMemorySubscriptions::default();
        repo.rows
            .lock()
            .unwrap()
            .insert("sub_123".to_string(), subscription(user_id, "active", Some("cus_1")));

        let deleted = event(
            "evt_2",
            "customer.subscription.deleted",
            json!({ "id": "sub_123", "status": "canceled", "customer": "cus_1" }),
        );

        let mut gateway = MockBillingGateway::new();
        gateway
            .expect_verify_webhook_signature()
            .returning(move |_, _| Ok(deleted.clone()));

        let usecase = usecase(repo, MockBillingCustomerRepository::new(), gateway);

        assert_eq!(
            usecase.handle_webhook(b"{}", "sig").await.unwrap(),
            WebhookOutcome::Applied
        );
        let current = usecase.get_current_subscription(user_id).await.unwrap().unwrap();
        assert_eq!(current.status, SubscriptionStatus::Canceled);
    }

    #[tokio::test]
    async fn checkout_completion_records_customer_and_subscription() {
        let user_id = Uuid::new_v4();
        let completed = event(
            "evt_3",
            "checkout.session.completed",
            json!({
                "id": "cs_1",
                "mode": "subscription",
                "subscription": "sub_777",
                "customer": "cus_777",
                "client_reference_id": user_id.to_string(),
                "metadata": { "user_id": user_id.to_string(), "plan_id": "creator_plus" }
            }),
        );

        let mut gateway = MockBillingGateway::new();
        gateway
            .expect_verify_webhook_signature()
            .returning(move |_, _| Ok(completed.clone()));
        gateway
            .expect_retrieve_subscription()
            .withf(|subscription_id| subscription_id == "sub_777")
            .returning(|_| {
                Ok(serde_json::from_value(json!({
                    "id": "sub_777",
                    "status": "trialing",
                    "customer": "cus_777",
                    "current_period_end": 1_702_592_000
                }))
                .unwrap())
            });

        let mut customer_repo = MockBillingCustomerRepository::new();
        customer_repo
            .expect_upsert_customer_ref()
            .withf(move |id, customer| *id == user_id && customer == "cus_777")
            .times(1)
            .returning(|_, _| Ok(()));

        let usecase = usecase(InMemorySubscriptions::default(), customer_repo, gateway);

        assert_eq!(
            usecase.handle_webhook(b"{}", "sig").await.unwrap(),
            WebhookOutcome::Applied
        );
        let current = usecase.get_current_subscription(user_id).await.unwrap().unwrap();
        assert_eq!(current.plan_id, PlanTierId::CreatorPlus);
        assert_eq!(current.status, SubscriptionStatus::Active);
    }

    #[tokio::test]
    async fn out_of_order_event_leaves_subscription_untouched() {
        let user_id = Uuid::new_v4();
        let repo = InMemorySubscriptions::default();
        let mut current = subscription(user_id, "active", Some("cus_1"));
        current.last_event_at = Utc.timestamp_opt(1_700_000_100, 0).unwrap();
        repo.rows
            .lock()
            .unwrap()
            .insert("sub_123".to_string(), current);

        let late = event(
            "evt_5",
            "invoice.payment_failed",
            json!({ "id": "in_1", "subscription": "sub_123", "customer": "cus_1" }),
        );

        let mut gateway = MockBillingGateway::new();
        gateway
            .expect_verify_webhook_signature()
            .returning(move |_, _| Ok(late.clone()));

        let usecase = usecase(repo, MockBillingCustomerRepository::new(), gateway);

        assert_eq!(
            usecase.handle_webhook(b"{}", "sig").await.unwrap(),
            WebhookOutcome::Stale
        );
        let current = usecase.get_current_subscription(user_id).await.unwrap().unwrap();
        assert_eq!(current.status, SubscriptionStatus::Active);
    }

    #[tokio::test]
    async fn replayed_checkout_completion_skips_stripe() {
        let completed = event(
            "evt_6",
            "checkout.session.completed",
            json!({
                "id": "cs_1",
                "mode": "subscription",
                "subscription": "sub_777",
                "customer": "cus_777",
                "client_reference_id": Uuid::new_v4().to_string()
            }),
        );

        let mut gateway = MockBillingGateway::new();
        gateway
            .expect_verify_webhook_signature()
            .returning(move |_, _| Ok(completed.clone()));
        gateway.expect_retrieve_subscription().never();

        let mut customer_repo = MockBillingCustomerRepository::new();
        customer_repo.expect_upsert_customer_ref().never();

        let mut subscription_repo = MockSubscriptionRepository::new();
        subscription_repo
            .expect_is_event_recorded()
            .withf(|event_id| event_id == "evt_6")
            .returning(|_| Ok(true));
        subscription_repo.expect_apply_status_change().never();

        let outcome = usecase(subscription_repo, customer_repo, gateway)
            .handle_webhook(b"{}", "sig")
            .await
            .unwrap();

        assert_eq!(outcome, WebhookOutcome::Duplicate);
    }

    #[tokio::test]
    async fn unhandled_event_type_is_ignored() {
        let mut gateway = MockBillingGateway::new();
        gateway
            .expect_verify_webhook_signature()
            .returning(|_, _| Ok(event("evt_4", "customer.created", json!({ "id": "cus_1" }))));

        let mut subscription_repo = MockSubscriptionRepository::new();
        subscription_repo.expect_apply_status_change().never();

        let outcome = usecase(
            subscription_repo,
            MockBillingCustomerRepository::new(),
            gateway,
        )
        .handle_webhook(b"{}", "sig")
        .await
        .unwrap();

        assert_eq!(outcome, WebhookOutcome::Ignored);
    }
}
