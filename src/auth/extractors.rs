use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use tracing::warn;

use crate::{
    auth::{repo_types::AuthUser, services::PgAuthService},
    error::AppError,
    state::AppState,
};

/// The live, active account behind the request's bearer token.
pub struct CurrentUser(pub AuthUser);

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .ok_or_else(|| {
                warn!("missing Authorization header");
                AppError::InvalidToken
            })?;

        // Expect "Bearer <token>"
        let token = auth
            .strip_prefix("Bearer ")
            .or_else(|| auth.strip_prefix("bearer "))
            .ok_or_else(|| {
                warn!("invalid auth scheme");
                AppError::InvalidToken
            })?
            .trim()
            .to_owned();

        let user = PgAuthService::from_ref(state).current_user(&token).await?;
        Ok(CurrentUser(user))
    }
}
