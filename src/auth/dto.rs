use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::auth::repo_types::AuthUser;
use crate::error::AppError;
use crate::validation::Checker;

/// Request body for user registration.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

impl RegisterRequest {
    pub fn validate(&mut self) -> Result<(), AppError> {
        Checker::new()
            .username("username", &mut self.username)
            .email("email", &mut self.email)
            .password("password", &self.password)
            .finish()
    }
}

/// Request body for login.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    /// User id, email or username.
    pub identifier: String,
    pub new_password: String,
}

impl ChangePasswordRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        Checker::new()
            .require("identifier", !self.identifier.trim().is_empty(), "Identifier is required")
            .password("new_password", &self.new_password)
            .finish()
    }
}

#[derive(Debug, Deserialize)]
pub struct DeleteUserQuery {
    pub identifier: String,
}

/// Public part of an auth user, returned after register and password change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthUserView {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub is_active: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl From<AuthUser> for AuthUserView {
    fn from(u: AuthUser) -> Self {
        Self {
            id: u.id,
            username: u.username,
            email: u.email,
            is_active: u.is_active,
            created_at: u.created_at,
            updated_at: u.updated_at,
        }
    }
}

/// Returned by `GET /auth/me`.
#[derive(Debug, Serialize)]
pub struct UserInfo {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub is_superuser: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl From<AuthUser> for UserInfo {
    fn from(u: AuthUser) -> Self {
        Self {
            id: u.id,
            username: u.username,
            email: u.email,
            is_superuser: u.is_superuser,
            created_at: u.created_at,
            updated_at: u.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Token {
    pub access_token: String,
    pub token_type: String,
}

impl Token {
    pub fn bearer(access_token: String) -> Self {
        Self {
            access_token,
            token_type: "bearer".into(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DetailResponse {
    pub detail: &'static str,
}
