use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
};
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::usecases::errors::UseCaseError;

const SUPABASE_AUDIENCE: &str = "authenticated";

#[derive(Debug, Serialize, Deserialize)]
pub struct SupabaseClaims {
    pub sub: String,
    pub aud: String,
    pub role: String,
    pub email: Option<String>,
    pub exp: usize,
}

/// Verified identity of the caller.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub email: Option<String>,
}

#[derive(Clone)]
pub struct AuthSettings {
    pub jwt_secret: String,
}

pub fn validate_supabase_jwt(token: &str, jwt_secret: &str) -> anyhow::Result<SupabaseClaims> {
    let decoding_key = DecodingKey::from_secret(jwt_secret.as_bytes());
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_audience(&[SUPABASE_AUDIENCE]);

    let token_data = decode::<SupabaseClaims>(token, &decoding_key, &validation)
        .map_err(|e| anyhow::anyhow!("JWT validation failed: {}", e))?;

    Ok(token_data.claims)
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    AuthSettings: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = UseCaseError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|err| {
                    debug!(error = %err, "auth: missing or malformed bearer token");
                    UseCaseError::Unauthenticated
                })?;

        let settings = AuthSettings::from_ref(state);
        let claims = validate_supabase_jwt(bearer.token(), &settings.jwt_secret).map_err(|err| {
            debug!(error = %err, "auth: token rejected");
            UseCaseError::Unauthenticated
        })?;

        let user_id = Uuid::parse_str(&claims.sub).map_err(|_| {
            debug!(sub = %claims.sub, "auth: token subject is not a user id");
            UseCaseError::Unauthenticated
        })?;

        Ok(AuthUser {
            user_id,
            email: claims.email,
        })
    }
}
