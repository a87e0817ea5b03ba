use serde::Deserialize;
use time::OffsetDateTime;

use crate::error::AppError;
use crate::validation::Checker;

/// Request body for `POST /users`.
#[derive(Debug, Deserialize)]
pub struct UserCreate {
    pub username: String,
    pub email: String,
}

impl UserCreate {
    pub fn validate(&mut self) -> Result<(), AppError> {
        Checker::new()
            .username("username", &mut self.username)
            .email("email", &mut self.email)
            .finish()
    }
}

/// Request body for `PUT /users/:id`. Absent fields keep their value.
#[derive(Debug, Default, Deserialize)]
pub struct UserUpdate {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

impl UserUpdate {
    pub fn validate(&mut self) -> Result<(), AppError> {
        let mut checker = Checker::new();
        if let Some(username) = self.username.as_mut() {
            checker.username("username", username);
        }
        if let Some(email) = self.email.as_mut() {
            checker.email("email", email);
        }
        checker.finish()
    }
}

/// Query for `GET /users/created`.
#[derive(Debug, Deserialize)]
pub struct DateRangeQuery {
    #[serde(with = "time::serde::rfc3339")]
    pub start: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub end: OffsetDateTime,
    #[serde(default)]
    pub include_deleted: bool,
}

impl DateRangeQuery {
    pub fn validate(&self) -> Result<(), AppError> {
        Checker::new()
            .require("end", self.start <= self.end, "end must not be before start")
            .finish()
    }
}
