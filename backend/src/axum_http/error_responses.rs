use axum::{
    Json,
    response::{IntoResponse, Response},
};
use crates::domain::value_objects::enums::{
    feature_flags::FeatureFlag, resource_kinds::ResourceKind,
};
use serde::Serialize;

use crate::usecases::errors::UseCaseError;

/// Where the dashboard sends callers without a valid session.
pub const SIGN_IN_PATH: &str = "/login";

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: u16,
    pub error: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource: Option<ResourceKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feature: Option<FeatureFlag>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect_to: Option<&'static str>,
}

impl From<&UseCaseError> for ErrorResponse {
    fn from(err: &UseCaseError) -> Self {
        let mut body = ErrorResponse {
            code: err.status_code().as_u16(),
            error: err.code(),
            message: err.to_string(),
            resource: None,
            limit: None,
            current: None,
            feature: None,
            redirect_to: None,
        };

        match err {
            UseCaseError::Unauthenticated => {
                body.redirect_to = Some(SIGN_IN_PATH);
            }
            UseCaseError::LimitReached {
                resource,
                limit,
                current,
            } => {
                body.resource = Some(*resource);
                body.limit = Some(*limit);
                body.current = Some(*current);
                body.message = format!(
                    "You have reached the {} limit of your plan ({}/{}). Upgrade to add more.",
                    resource, current, limit
                );
            }
            UseCaseError::FeatureLocked(feature) => {
                body.feature = Some(*feature);
                body.message = format!("{} is not included in your plan. Upgrade to unlock it.", feature);
            }
            // Processor and storage details stay in the logs.
            UseCaseError::UpstreamError(_) => {
                body.message = "Payment provider is unavailable, please try again.".to_string();
            }
            UseCaseError::Internal(_) => {
                body.message = "Internal server error".to_string();
            }
            _ => {}
        }

        body
    }
}

impl IntoResponse for UseCaseError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        (status, Json(ErrorResponse::from(&self))).into_response()
    }
}
