use serde::Serialize;
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// Auth-capable user record in the database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct AuthUser {
    pub id: Uuid,
    pub username: String,             // unique among live rows
    pub email: String,                // unique among live rows
    #[serde(skip_serializing)]
    pub hashed_password: String,      // Argon2 PHC string, never exposed in JSON
    pub is_active: bool,
    pub is_superuser: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
    pub is_deleted: bool,
}

#[derive(Debug, Clone)]
pub struct NewAuthUser {
    pub id: Option<Uuid>,
    pub username: String,
    pub email: String,
    pub hashed_password: String,
    pub is_active: bool,
    pub is_superuser: bool,
}

#[derive(Debug, Clone, Default)]
pub struct AuthUserChanges {
    pub username: Option<String>,
    pub email: Option<String>,
    pub hashed_password: Option<String>,
    pub is_active: Option<bool>,
    pub is_superuser: Option<bool>,
}
