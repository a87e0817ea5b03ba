use lazy_static::lazy_static;
use regex::Regex;

use crate::error::{AppError, FieldError};

pub const MIN_PASSWORD_LEN: usize = 8;
pub const MAX_USERNAME_LEN: usize = 64;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Collects field problems so a request reports all of them at once.
#[derive(Debug, Default)]
pub struct Checker {
    errors: Vec<FieldError>,
}

impl Checker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Trims and lower-cases `email` in place before checking it.
    pub fn email(&mut self, field: &'static str, email: &mut String) -> &mut Self {
        *email = email.trim().to_lowercase();
        if !is_valid_email(email) {
            self.errors.push(FieldError::new(field, "Invalid email"));
        }
        self
    }

    /// Trims `username` in place before checking it.
    pub fn username(&mut self, field: &'static str, username: &mut String) -> &mut Self {
        *username = username.trim().to_string();
        if username.is_empty() {
            self.errors.push(FieldError::new(field, "Username is required"));
        } else if username.chars().count() > MAX_USERNAME_LEN {
            self.errors.push(FieldError::new(
                field,
                format!("Username must be at most {MAX_USERNAME_LEN} characters"),
            ));
        } else if username.contains('@') || username.chars().any(char::is_whitespace) {
            self.errors.push(FieldError::new(
                field,
                "Username must not contain '@' or whitespace",
            ));
        }
        self
    }

    pub fn password(&mut self, field: &'static str, password: &str) -> &mut Self {
        if password.chars().count() < MIN_PASSWORD_LEN {
            self.errors.push(FieldError::new(
                field,
                format!("Password must be at least {MIN_PASSWORD_LEN} characters"),
            ));
        }
        self
    }

    pub fn require(&mut self, field: &'static str, ok: bool, message: &str) -> &mut Self {
        if !ok {
            self.errors.push(FieldError::new(field, message));
        }
        self
    }

    pub fn finish(&mut self) -> Result<(), AppError> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(AppError::Validation(std::mem::take(&mut self.errors)))
        }
    }
}
