use axum::extract::FromRef;
use time::OffsetDateTime;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    error::AppError,
    repository::Repository,
    state::AppState,
    users::{
        dto::{UserCreate, UserUpdate},
        repo::PgUserRepository,
        repo_types::{NewUser, User, UserChanges},
    },
};

/// Plain CRUD over [`User`] records.
#[derive(Clone)]
pub struct UserService<R> {
    repo: R,
}

pub type PgUserService = UserService<PgUserRepository>;

impl FromRef<AppState> for PgUserService {
    fn from_ref(state: &AppState) -> Self {
        UserService::new(PgUserRepository::new(state.db.clone()))
    }
}

impl<R> UserService<R>
where
    R: Repository<Entity = User, New = NewUser, Changes = UserChanges>,
{
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    pub async fn get(&self, id: Uuid) -> Result<User, AppError> {
        self.repo.get_by_id(id).await?.ok_or(AppError::NotFound)
    }

    pub async fn list(&self) -> Result<Vec<User>, AppError> {
        self.repo.get_all().await
    }

    pub async fn created_between(
        &self,
        start: OffsetDateTime,
        end: OffsetDateTime,
        include_deleted: bool,
    ) -> Result<Vec<User>, AppError> {
        self.repo.filter_by_dates(start, end, include_deleted).await
    }

    #[instrument(skip(self, input), fields(username = %input.username))]
    pub async fn create(&self, input: UserCreate) -> Result<User, AppError> {
        let user = self
            .repo
            .create(NewUser {
                id: None,
                username: input.username,
                email: input.email,
            })
            .await?;
        info!(user_id = %user.id, "user created");
        Ok(user)
    }

    #[instrument(skip(self, input))]
    pub async fn update(&self, id: Uuid, input: UserUpdate) -> Result<User, AppError> {
        let changes = UserChanges {
            username: input.username,
            email: input.email,
        };
        self.repo.update(id, changes).await?.ok_or(AppError::NotFound)
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, id: Uuid) -> Result<User, AppError> {
        let user = self.repo.soft_delete(id).await?.ok_or(AppError::NotFound)?;
        info!(user_id = %user.id, "user soft-deleted");
        Ok(user)
    }
}
