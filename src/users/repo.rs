use async_trait::async_trait;
use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::repository::{RepoResult, Repository};
use crate::users::repo_types::{NewUser, User, UserChanges};

#[derive(Clone)]
pub struct PgUserRepository {
    db: PgPool,
}

impl PgUserRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl Repository for PgUserRepository {
    type Entity = User;
    type New = NewUser;
    type Changes = UserChanges;

    async fn get_by_id(&self, id: Uuid) -> RepoResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, email, created_at, updated_at, is_deleted
            FROM users
            WHERE id = $1 AND NOT is_deleted
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn get_all(&self) -> RepoResult<Vec<User>> {
        let users = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, email, created_at, updated_at, is_deleted
            FROM users
            WHERE NOT is_deleted
            ORDER BY created_at, id
            "#,
        )
        .fetch_all(&self.db)
        .await?;
        Ok(users)
    }

    async fn filter_by_dates(
        &self,
        start: OffsetDateTime,
        end: OffsetDateTime,
        include_deleted: bool,
    ) -> RepoResult<Vec<User>> {
        let users = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, email, created_at, updated_at, is_deleted
            FROM users
            WHERE created_at >= $1 AND created_at <= $2
              AND ($3 OR NOT is_deleted)
            ORDER BY created_at, id
            "#,
        )
        .bind(start)
        .bind(end)
        .bind(include_deleted)
        .fetch_all(&self.db)
        .await?;
        Ok(users)
    }

    async fn create(&self, new: NewUser) -> RepoResult<User> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, username, email)
            VALUES ($1, $2, $3)
            RETURNING id, username, email, created_at, updated_at, is_deleted
            "#,
        )
        .bind(new.id.unwrap_or_else(Uuid::new_v4))
        .bind(&new.username)
        .bind(&new.email)
        .fetch_one(&self.db)
        .await?;
        Ok(user)
    }

    async fn update(&self, id: Uuid, changes: UserChanges) -> RepoResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET username   = COALESCE($2, username),
                email      = COALESCE($3, email),
                updated_at = now()
            WHERE id = $1 AND NOT is_deleted
            RETURNING id, username, email, created_at, updated_at, is_deleted
            "#,
        )
        .bind(id)
        .bind(changes.username)
        .bind(changes.email)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn soft_delete(&self, id: Uuid) -> RepoResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET is_deleted = TRUE
            WHERE id = $1 AND NOT is_deleted
            RETURNING id, username, email, created_at, updated_at, is_deleted
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }
}
