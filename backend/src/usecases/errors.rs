use axum::http::StatusCode;
use crates::domain::value_objects::enums::{
    feature_flags::FeatureFlag, resource_kinds::ResourceKind,
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum UseCaseError {
    #[error("authentication required")]
    Unauthenticated,
    #[error("plan {0} cannot be purchased")]
    InvalidPlan(String),
    #[error("no active subscription on file")]
    NoActiveSubscription,
    #[error("{resource} limit reached ({current}/{limit})")]
    LimitReached {
        resource: ResourceKind,
        limit: i64,
        current: i64,
    },
    #[error("{0} is not included in your plan")]
    FeatureLocked(FeatureFlag),
    #[error("invalid redirect url: {0}")]
    InvalidRedirectUrl(String),
    #[error("unknown resource: {0}")]
    UnknownResource(String),
    #[error("invalid webhook payload: {0}")]
    InvalidWebhook(String),
    #[error("payment processor request failed")]
    UpstreamError(#[source] anyhow::Error),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl UseCaseError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            UseCaseError::Unauthenticated => StatusCode::UNAUTHORIZED,
            UseCaseError::InvalidPlan(_)
            | UseCaseError::InvalidRedirectUrl(_)
            | UseCaseError::UnknownResource(_)
            | UseCaseError::InvalidWebhook(_) => StatusCode::BAD_REQUEST,
            UseCaseError::NoActiveSubscription => StatusCode::NOT_FOUND,
            UseCaseError::LimitReached { .. } | UseCaseError::FeatureLocked(_) => {
                StatusCode::FORBIDDEN
            }
            UseCaseError::UpstreamError(_) => StatusCode::BAD_GATEWAY,
            UseCaseError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable machine-readable code for clients.
    pub fn code(&self) -> &'static str {
        match self {
            UseCaseError::Unauthenticated => "unauthenticated",
            UseCaseError::InvalidPlan(_) => "invalid_plan",
            UseCaseError::NoActiveSubscription => "no_active_subscription",
            UseCaseError::LimitReached { .. } => "limit_reached",
            UseCaseError::FeatureLocked(_) => "feature_locked",
            UseCaseError::InvalidRedirectUrl(_) => "invalid_redirect_url",
            UseCaseError::UnknownResource(_) => "unknown_resource",
            UseCaseError::InvalidWebhook(_) => "invalid_webhook",
            UseCaseError::UpstreamError(_) => "upstream_error",
            UseCaseError::Internal(_) => "internal",
        }
    }
}

pub type UseCaseResult<T> = std::result::Result<T, UseCaseError>;
