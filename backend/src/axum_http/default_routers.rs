use axum::{Json, http::StatusCode, response::IntoResponse};
use serde_json::json;
use tracing::{debug, info};

pub async fn not_found() -> impl IntoResponse {
    info!("backend router: not_found handler invoked");
    (StatusCode::NOT_FOUND, Json(json!({ "error": "not_found" })))
}

pub async fn health_check() -> impl IntoResponse {
    debug!("backend router: health_check handler invoked");
    (StatusCode::OK, Json(json!({ "status": "ok" })))
}
