use axum::{
    extract::State,
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use tracing::{instrument, warn};

use crate::{
    auth::{
        dto::{
            AuthUserView, ChangePasswordRequest, DeleteUserQuery, DetailResponse, LoginRequest,
            RegisterRequest, Token, UserInfo,
        },
        extractors::CurrentUser,
        repo_types::AuthUser,
        services::{PgAuthService, UserIdentifier},
    },
    error::AppError,
    extract::{ApiJson, ApiQuery},
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/change-password", post(change_password))
        .route("/auth/delete-user", delete(delete_user))
}

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/auth/me", get(get_me))
}

/// Only the account itself or a superuser may act on `target`.
fn ensure_may_act_on(current: &AuthUser, target: &UserIdentifier) -> Result<(), AppError> {
    if current.is_superuser || target.matches(current) {
        Ok(())
    } else {
        warn!(user_id = %current.id, ?target, "refused to act on another user");
        Err(AppError::Forbidden)
    }
}

#[instrument(skip(svc, payload))]
pub async fn register(
    State(svc): State<PgAuthService>,
    ApiJson(mut payload): ApiJson<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthUserView>), AppError> {
    payload.validate()?;
    let user = svc.register(payload).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

#[instrument(skip(svc, payload))]
pub async fn login(
    State(svc): State<PgAuthService>,
    ApiJson(payload): ApiJson<LoginRequest>,
) -> Result<Json<Token>, AppError> {
    let user = svc.authenticate(&payload.username, &payload.password).await?;
    Ok(Json(svc.issue_token_for(&user)?))
}

#[instrument(skip(svc, current, payload))]
pub async fn change_password(
    State(svc): State<PgAuthService>,
    CurrentUser(current): CurrentUser,
    ApiJson(payload): ApiJson<ChangePasswordRequest>,
) -> Result<Json<AuthUserView>, AppError> {
    payload.validate()?;
    let target = UserIdentifier::parse(&payload.identifier);
    ensure_may_act_on(&current, &target)?;
    Ok(Json(svc.change_password(&target, &payload.new_password).await?))
}

#[instrument(skip(svc, current))]
pub async fn delete_user(
    State(svc): State<PgAuthService>,
    CurrentUser(current): CurrentUser,
    ApiQuery(q): ApiQuery<DeleteUserQuery>,
) -> Result<Json<DetailResponse>, AppError> {
    let target = UserIdentifier::parse(&q.identifier);
    ensure_may_act_on(&current, &target)?;
    svc.delete(&target).await?;
    Ok(Json(DetailResponse {
        detail: "User deleted successfully",
    }))
}

#[instrument(skip(current))]
pub async fn get_me(CurrentUser(current): CurrentUser) -> Json<UserInfo> {
    Json(current.into())
}
