use async_trait::async_trait;
use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::auth::repo_types::{AuthUser, AuthUserChanges, NewAuthUser};
use crate::repository::{RepoResult, Repository};

/// Lookups the auth flows need on top of the generic contract.
#[async_trait]
pub trait AuthUserRepository:
    Repository<Entity = AuthUser, New = NewAuthUser, Changes = AuthUserChanges>
{
    async fn get_by_username(&self, username: &str) -> RepoResult<Option<AuthUser>>;

    async fn get_by_email(&self, email: &str) -> RepoResult<Option<AuthUser>>;

    async fn update_password(&self, id: Uuid, hashed_password: String) -> RepoResult<Option<AuthUser>> {
        let changes = AuthUserChanges {
            hashed_password: Some(hashed_password),
            ..Default::default()
        };
        self.update(id, changes).await
    }
}

#[derive(Clone)]
pub struct PgAuthUserRepository {
    db: PgPool,
}

impl PgAuthUserRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl Repository for PgAuthUserRepository {
    type Entity = AuthUser;
    type New = NewAuthUser;
    type Changes = AuthUserChanges;

    async fn get_by_id(&self, id: Uuid) -> RepoResult<Option<AuthUser>> {
        let user = sqlx::query_as::<_, AuthUser>(
            r#"
            SELECT id, username, email, hashed_password, is_active, is_superuser,
                   created_at, updated_at, is_deleted
            FROM auth_users
            WHERE id = $1 AND NOT is_deleted
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn get_all(&self) -> RepoResult<Vec<AuthUser>> {
        let users = sqlx::query_as::<_, AuthUser>(
            r#"
            SELECT id, username, email, hashed_password, is_active, is_superuser,
                   created_at, updated_at, is_deleted
            FROM auth_users
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
    ) -> RepoResult<Vec<AuthUser>> {
        let users = sqlx::query_as::<_, AuthUser>(
            r#"
            SELECT id, username, email, hashed_password, is_active, is_superuser,
                   created_at, updated_at, is_deleted
            FROM auth_users
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

    async fn create(&self, new: NewAuthUser) -> RepoResult<AuthUser> {
        let user = sqlx::query_as::<_, AuthUser>(
            r#"
            INSERT INTO auth_users (id, username, email, hashed_password, is_active, is_superuser)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, username, email, hashed_password, is_active, is_superuser,
                      created_at, updated_at, is_deleted
            "#,
        )
        .bind(new.id.unwrap_or_else(Uuid::new_v4))
        .bind(&new.username)
        .bind(&new.email)
        .bind(&new.hashed_password)
        .bind(new.is_active)
        .bind(new.is_superuser)
        .fetch_one(&self.db)
        .await?;
        Ok(user)
    }

    async fn update(&self, id: Uuid, changes: AuthUserChanges) -> RepoResult<Option<AuthUser>> {
        let user = sqlx::query_as::<_, AuthUser>(
            r#"
            UPDATE auth_users
            SET username        = COALESCE($2, username),
                email           = COALESCE($3, email),
                hashed_password = COALESCE($4, hashed_password),
                is_active       = COALESCE($5, is_active),
                is_superuser    = COALESCE($6, is_superuser),
                updated_at      = now()
            WHERE id = $1 AND NOT is_deleted
            RETURNING id, username, email, hashed_password, is_active, is_superuser,
                      created_at, updated_at, is_deleted
            "#,
        )
        .bind(id)
        .bind(changes.username)
        .bind(changes.email)
        .bind(changes.hashed_password)
        .bind(changes.is_active)
        .bind(changes.is_superuser)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn soft_delete(&self, id: Uuid) -> RepoResult<Option<AuthUser>> {
        let user = sqlx::query_as::<_, AuthUser>(
            r#"
            UPDATE auth_users
            SET is_deleted = TRUE
            WHERE id = $1 AND NOT is_deleted
            RETURNING id, username, email, hashed_password, is_active, is_superuser,
                      created_at, updated_at, is_deleted
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }
}

#[async_trait]
impl AuthUserRepository for PgAuthUserRepository {
    async fn get_by_username(&self, username: &str) -> RepoResult<Option<AuthUser>> {
        let user = sqlx::query_as::<_, AuthUser>(
            r#"
            SELECT id, username, email, hashed_password, is_active, is_superuser,
                   created_at, updated_at, is_deleted
            FROM auth_users
            WHERE username = $1 AND NOT is_deleted
            "#,
        )
        .bind(username)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn get_by_email(&self, email: &str) -> RepoResult<Option<AuthUser>> {
        let user = sqlx::query_as::<_, AuthUser>(
            r#"
            SELECT id, username, email, hashed_password, is_active, is_superuser,
                   created_at, updated_at, is_deleted
            FROM auth_users
            WHERE email = $1 AND NOT is_deleted
            "#,
        )
        .bind(email)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }
}
