use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::{debug, error};

/// A single problem with one field of an incoming request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Every failure the services can produce.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("User not found")]
    NotFound,

    #[error("Username or email already registered")]
    DuplicateIdentity,

    #[error("Incorrect username or password")]
    AuthenticationFailed,

    #[error("Could not validate credentials")]
    InvalidToken,

    #[error("Not allowed to act on this user")]
    Forbidden,

    #[error("Request validation failed")]
    Validation(Vec<FieldError>),

    #[error("store error: {0}")]
    Store(#[source] sqlx::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.is_unique_violation() {
                debug!(constraint = ?db_err.constraint(), "unique constraint violated");
                return AppError::DuplicateIdentity;
            }
        }
        AppError::Store(err)
    }
}

// Malformed requests are reported in the same body shape as every other failure.
impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        debug!(error = %rejection, "json body rejected");
        AppError::Validation(vec![FieldError::new("body", rejection.body_text())])
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        debug!(error = %rejection, "path rejected");
        AppError::Validation(vec![FieldError::new("path", rejection.body_text())])
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        debug!(error = %rejection, "query rejected");
        AppError::Validation(vec![FieldError::new("query", rejection.body_text())])
    }
}

#[derive(Debug, Serialize)]
struct ErrorItem {
    #[serde(rename = "type")]
    kind: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    field: Option<&'static str>,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    detail: String,
    errors: Vec<ErrorItem>,
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::DuplicateIdentity => StatusCode::CONFLICT,
            AppError::AuthenticationFailed | AppError::InvalidToken => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Store(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            AppError::NotFound => "not_found",
            AppError::DuplicateIdentity => "duplicate_identity",
            AppError::AuthenticationFailed => "authentication_failed",
            AppError::InvalidToken => "invalid_token",
            AppError::Forbidden => "forbidden",
            AppError::Validation(_) => "validation_error",
            AppError::Store(_) | AppError::Internal(_) => "internal_error",
        }
    }

    fn body(&self) -> ErrorBody {
        match self {
            AppError::Validation(fields) => ErrorBody {
                detail: self.to_string(),
                errors: fields
                    .iter()
                    .map(|f| ErrorItem {
                        kind: self.kind(),
                        message: f.message.clone(),
                        field: Some(f.field),
                    })
                    .collect(),
            },
            AppError::Store(_) | AppError::Internal(_) => ErrorBody {
                detail: "An internal server error occurred.".into(),
                errors: vec![ErrorItem {
                    kind: self.kind(),
                    message: "An internal server error occurred.".into(),
                    field: None,
                }],
            },
            _ => ErrorBody {
                detail: self.to_string(),
                errors: vec![ErrorItem {
                    kind: self.kind(),
                    message: self.to_string(),
                    field: None,
                }],
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self, "request failed");
        }

        let mut response = (status, Json(self.body())).into_response();
        if status == StatusCode::UNAUTHORIZED {
            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }
        response
    }
}
