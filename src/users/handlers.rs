use axum::{
    extract::State,
    http::StatusCode,
    routing::get,
    Json, Router,
};
use tracing::instrument;
use uuid::Uuid;

use crate::{
    error::AppError,
    extract::{ApiJson, ApiPath, ApiQuery},
    state::AppState,
    users::{
        dto::{DateRangeQuery, UserCreate, UserUpdate},
        repo_types::User,
        services::PgUserService,
    },
};

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users).post(create_user))
        .route("/users/created", get(list_users_created_between))
        .route(
            "/users/:id",
            get(get_user).put(update_user).delete(delete_user),
        )
}

#[instrument(skip(svc))]
pub async fn get_user(
    State(svc): State<PgUserService>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<User>, AppError> {
    Ok(Json(svc.get(id).await?))
}

#[instrument(skip(svc))]
pub async fn list_users(State(svc): State<PgUserService>) -> Result<Json<Vec<User>>, AppError> {
    Ok(Json(svc.list().await?))
}

#[instrument(skip(svc))]
pub async fn list_users_created_between(
    State(svc): State<PgUserService>,
    ApiQuery(q): ApiQuery<DateRangeQuery>,
) -> Result<Json<Vec<User>>, AppError> {
    q.validate()?;
    Ok(Json(
        svc.created_between(q.start, q.end, q.include_deleted)
            .await?,
    ))
}

#[instrument(skip(svc, payload))]
pub async fn create_user(
    State(svc): State<PgUserService>,
    ApiJson(mut payload): ApiJson<UserCreate>,
) -> Result<(StatusCode, Json<User>), AppError> {
    payload.validate()?;
    let user = svc.create(payload).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

#[instrument(skip(svc, payload))]
pub async fn update_user(
    State(svc): State<PgUserService>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(mut payload): ApiJson<UserUpdate>,
) -> Result<Json<User>, AppError> {
    payload.validate()?;
    Ok(Json(svc.update(id, payload).await?))
}

#[instrument(skip(svc))]
pub async fn delete_user(
    State(svc): State<PgUserService>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<User>, AppError> {
    Ok(Json(svc.delete(id).await?))
}
