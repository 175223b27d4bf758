use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
};
use serde::Deserialize;

use crate::{auth::AuthUser, axum_http::state::AppState};

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/:kind", post(create_resource))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
pub struct CreateResourceRequest {
    pub name: String,
}

/// Creates an idea, pillar, brand or email account if the caller's plan allows another one.
pub async fn create_resource(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(kind): Path<String>,
    Json(payload): Json<CreateResourceRequest>,
) -> Response {
    match state
        .usage_guard
        .create_resource(auth.user_id, &kind, payload.name)
        .await
    {
        Ok(created) => (StatusCode::CREATED, Json(created)).into_response(),
        Err(err) => err.into_response(),
    }
}
