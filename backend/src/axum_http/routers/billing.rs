use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use crates::domain::value_objects::subscriptions::{CreateCheckoutRequest, CreatePortalRequest};
use serde_json::json;
use tracing::info;

use crate::{auth::AuthUser, axum_http::state::AppState, usecases::errors::UseCaseError};

const STRIPE_SIGNATURE_HEADER: &str = "stripe-signature";

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/plans", get(list_plans))
        .route("/current", get(current_subscription))
        .route("/checkout", post(create_checkout_session))
        .route("/portal", post(create_portal_session))
        .route("/cancel", post(cancel_subscription))
        .route("/webhook", post(stripe_webhook))
        .with_state(state)
}

pub async fn list_plans(State(state): State<AppState>) -> Response {
    Json(state.billing.list_plans()).into_response()
}

pub async fn current_subscription(State(state): State<AppState>, auth: AuthUser) -> Response {
    match state.billing.get_current_subscription(auth.user_id).await {
        Ok(subscription) => Json(subscription).into_response(),
        Err(err) => err.into_response(),
    }
}

pub async fn create_checkout_session(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(payload): Json<CreateCheckoutRequest>,
) -> Response {
    match state
        .billing
        .create_checkout_session(
            auth.user_id,
            auth.email,
            &payload.plan_id,
            &payload.success_url,
            &payload.cancel_url,
        )
        .await
    {
        Ok(session) => Json(session).into_response(),
        Err(err) => err.into_response(),
    }
}

pub async fn create_portal_session(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(payload): Json<CreatePortalRequest>,
) -> Response {
    match state
        .billing
        .create_portal_session_for_user(auth.user_id, &payload.return_url)
        .await
    {
        Ok(session) => Json(session).into_response(),
        Err(err) => err.into_response(),
    }
}

pub async fn cancel_subscription(State(state): State<AppState>, auth: AuthUser) -> Response {
    match state.billing.cancel_for_user(auth.user_id).await {
        Ok(()) => (
            StatusCode::ACCEPTED,
            Json(json!({ "cancel_at_period_end": true })),
        )
            .into_response(),
        Err(err) => err.into_response(),
    }
}

/// Stripe webhook endpoint. The raw body is needed for signature verification.
pub async fn stripe_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let signature = match headers
        .get(STRIPE_SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok())
    {
        Some(signature) => signature,
        None => {
            return UseCaseError::InvalidWebhook("missing stripe-signature header".to_string())
                .into_response();
        }
    };

    match state.billing.handle_webhook(&body, signature).await {
        Ok(outcome) => {
            info!(?outcome, "billing router: stripe webhook acknowledged");
            Json(json!({ "received": true, "outcome": outcome })).into_response()
        }
        Err(err) => err.into_response(),
    }
}
