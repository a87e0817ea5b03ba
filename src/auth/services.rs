use std::sync::Arc;

use axum::extract::FromRef;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    auth::{
        dto::{AuthUserView, RegisterRequest, Token},
        jwt::{subject_claims, TokenIssuer},
        password::CredentialHasher,
        repo::{AuthUserRepository, PgAuthUserRepository},
        repo_types::{AuthUser, NewAuthUser},
    },
    error::AppError,
    state::AppState,
};

/// How callers name an existing auth user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserIdentifier {
    Id(Uuid),
    Email(String),
    Username(String),
}

impl UserIdentifier {
    /// A UUID is an id, anything with `@` is an email, the rest are usernames.
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        if let Ok(id) = Uuid::parse_str(raw) {
            UserIdentifier::Id(id)
        } else if raw.contains('@') {
            UserIdentifier::Email(raw.to_lowercase())
        } else {
            UserIdentifier::Username(raw.to_string())
        }
    }

    pub fn matches(&self, user: &AuthUser) -> bool {
        match self {
            UserIdentifier::Id(id) => user.id == *id,
            UserIdentifier::Email(email) => user.email == *email,
            UserIdentifier::Username(username) => user.username == *username,
        }
    }
}

/// Registration, login, password change and deletion over one repository.
#[derive(Clone)]
pub struct AuthService<R> {
    repo: R,
    hasher: Arc<CredentialHasher>,
    tokens: TokenIssuer,
}

pub type PgAuthService = AuthService<PgAuthUserRepository>;

impl FromRef<AppState> for PgAuthService {
    fn from_ref(state: &AppState) -> Self {
        AuthService::new(
            PgAuthUserRepository::new(state.db.clone()),
            state.hasher.clone(),
            state.tokens.clone(),
        )
    }
}

impl<R: AuthUserRepository> AuthService<R> {
    pub fn new(repo: R, hasher: Arc<CredentialHasher>, tokens: TokenIssuer) -> Self {
        Self {
            repo,
            hasher,
            tokens,
        }
    }

    /// Expects an already validated request.
    #[instrument(skip(self, req), fields(username = %req.username))]
    pub async fn register(&self, req: RegisterRequest) -> Result<AuthUserView, AppError> {
        let hashed_password = self.hash_password(&req.password).await?;
        let user = self
            .repo
            .create(NewAuthUser {
                id: None,
                username: req.username,
                email: req.email,
                hashed_password,
                is_active: true,
                is_superuser: false,
            })
            .await
            .map_err(|e| {
                if matches!(e, AppError::DuplicateIdentity) {
                    warn!("username or email already registered");
                }
                e
            })?;

        info!(user_id = %user.id, "user registered");
        Ok(user.into())
    }

    /// Absent, inactive and wrong-password users all fail the same way.
    #[instrument(skip(self, password))]
    pub async fn authenticate(&self, username: &str, password: &str) -> Result<AuthUserView, AppError> {
        let user = self.repo.get_by_username(username.trim()).await?;
        let stored = user.as_ref().map(|u| u.hashed_password.clone());
        let verified = self.verify_password(password, stored).await?;

        let Some(user) = user else {
            warn!("login unknown username");
            return Err(AppError::AuthenticationFailed);
        };

        if !verified {
            warn!(user_id = %user.id, "login invalid password");
            return Err(AppError::AuthenticationFailed);
        }

        if !user.is_active {
            warn!(user_id = %user.id, "login on inactive account");
            return Err(AppError::AuthenticationFailed);
        }

        info!(user_id = %user.id, "user logged in");
        Ok(user.into())
    }

    /// The caller must have authenticated `user` already.
    pub fn issue_token_for(&self, user: &AuthUserView) -> Result<Token, AppError> {
        let token = self.tokens.issue(subject_claims(&user.username))?;
        Ok(Token::bearer(token))
    }

    #[instrument(skip(self, new_password))]
    pub async fn change_password(
        &self,
        identifier: &UserIdentifier,
        new_password: &str,
    ) -> Result<AuthUserView, AppError> {
        let user = self.find(identifier).await?.ok_or(AppError::NotFound)?;
        let hashed_password = self.hash_password(new_password).await?;
        let updated = self
            .repo
            .update_password(user.id, hashed_password)
            .await?
            .ok_or(AppError::NotFound)?;

        info!(user_id = %updated.id, "password changed");
        Ok(updated.into())
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, identifier: &UserIdentifier) -> Result<(), AppError> {
        let user = self.find(identifier).await?.ok_or(AppError::NotFound)?;
        let deleted = self
            .repo
            .soft_delete(user.id)
            .await?
            .ok_or(AppError::NotFound)?;

        info!(user_id = %deleted.id, "user soft-deleted");
        Ok(())
    }

    /// Resolves a bearer token to its live, active owner.
    pub async fn current_user(&self, token: &str) -> Result<AuthUser, AppError> {
        let claims = self.tokens.validate(token)?;
        let username = claims
            .get("sub")
            .and_then(|v| v.as_str())
            .ok_or(AppError::InvalidToken)?;

        match self.repo.get_by_username(username).await? {
            Some(user) if user.is_active => Ok(user),
            _ => {
                warn!("token subject is gone or inactive");
                Err(AppError::InvalidToken)
            }
        }
    }

    async fn hash_password(&self, plain: &str) -> Result<String, AppError> {
        let hasher = Arc::clone(&self.hasher);
        let plain = plain.to_owned();
        tokio::task::spawn_blocking(move || hasher.hash(&plain))
            .await
            .map_err(|e| AppError::Internal(format!("hash task: {e}")))?
    }

    /// Runs Argon2 on the blocking pool; `None` verifies against the decoy.
    async fn verify_password(&self, plain: &str, stored: Option<String>) -> Result<bool, AppError> {
        let hasher = Arc::clone(&self.hasher);
        let plain = plain.to_owned();
        tokio::task::spawn_blocking(move || hasher.verify_stored(&plain, stored.as_deref()))
            .await
            .map_err(|e| AppError::Internal(format!("verify task: {e}")))
    }

    async fn find(&self, identifier: &UserIdentifier) -> Result<Option<AuthUser>, AppError> {
        match identifier {
            UserIdentifier::Id(id) => self.repo.get_by_id(*id).await,
            UserIdentifier::Email(email) => self.repo.get_by_email(email).await,
            UserIdentifier::Username(username) => self.repo.get_by_username(username).await,
        }
    }
}
