use axum::{
    Json, Router,
    extract::{Path, State},
    response::{IntoResponse, Response},
    routing::get,
};

use crate::{auth::AuthUser, axum_http::state::AppState};

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/", get(entitlements))
        .route("/features/:feature", get(feature_access))
        .with_state(state)
}

pub async fn entitlements(State(state): State<AppState>, auth: AuthUser) -> Response {
    match state.plan_resolver.entitlements_for_user(auth.user_id).await {
        Ok(entitlements) => Json(entitlements).into_response(),
        Err(err) => err.into_response(),
    }
}

pub async fn feature_access(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(feature): Path<String>,
) -> Response {
    match state
        .plan_resolver
        .feature_access(auth.user_id, &feature)
        .await
    {
        Ok(access) => Json(access).into_response(),
        Err(err) => err.into_response(),
    }
}
