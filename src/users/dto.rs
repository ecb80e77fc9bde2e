use std::fmt;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;
use validator::Validate;

use crate::error::AppResult;
use crate::users::repo_types::User;
use crate::validation::{
    check_password, check_username, field_errors, finish, normalize_email, FieldError,
};

/// Public view of a user returned to the client.
#[derive(Debug, Clone, Serialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub is_active: bool,
    pub is_verified: bool,
    #[serde(with = "time::serde::rfc3339::option")]
    pub last_login: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl From<User> for UserResponse {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            username: u.username,
            email: u.email,
            first_name: u.first_name,
            last_name: u.last_name,
            is_active: u.is_active,
            is_verified: u.is_verified,
            last_login: u.last_login,
            created_at: u.created_at,
            updated_at: u.updated_at,
        }
    }
}

/// Request body for `PATCH /me`. Absent fields stay unchanged.
#[derive(Default, Deserialize, Validate)]
#[serde(default)]
pub struct UpdateUserRequest {
    #[validate(length(
        min = 1,
        max = 50,
        message = "First name must be between 1 and 50 characters"
    ))]
    pub first_name: Option<String>,
    #[validate(length(
        min = 1,
        max = 50,
        message = "Last name must be between 1 and 50 characters"
    ))]
    pub last_name: Option<String>,
    #[validate(
        email(message = "Invalid email address"),
        length(max = 120, message = "Email must be at most 120 characters")
    )]
    pub email: Option<String>,
    #[validate(length(min = 3, max = 50, message = "Username must be between 3 and 50 characters"))]
    pub username: Option<String>,
    #[validate(length(
        min = 6,
        max = 128,
        message = "Password must be between 6 and 128 characters"
    ))]
    pub password: Option<String>,
}

/// A validated profile update; `password` is still plaintext here and is
/// hashed by the service before it reaches the store.
pub struct ProfileChanges {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl UpdateUserRequest {
    pub fn validated(self) -> AppResult<ProfileChanges> {
        let trim = |v: Option<String>| v.map(|s| s.trim().to_string());
        let req = UpdateUserRequest {
            first_name: trim(self.first_name),
            last_name: trim(self.last_name),
            email: self.email.map(|e| normalize_email(&e)),
            username: trim(self.username),
            password: self.password,
        };

        let mut errors = match Validate::validate(&req) {
            Ok(()) => Vec::new(),
            Err(e) => field_errors(&e),
        };
        if let Some(username) = &req.username {
            check_username(username, &mut errors);
        }
        if let Some(password) = &req.password {
            check_password(password, &mut errors);
        }
        let nothing = req.first_name.is_none()
            && req.last_name.is_none()
            && req.email.is_none()
            && req.username.is_none()
            && req.password.is_none();
        if nothing {
            errors.push(FieldError::new("body", "At least one field must be provided"));
        }

        finish(errors, || ProfileChanges {
            first_name: req.first_name,
            last_name: req.last_name,
            email: req.email,
            username: req.username,
            password: req.password,
        })
    }
}

impl fmt::Debug for ProfileChanges {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProfileChanges")
            .field("first_name", &self.first_name)
            .field("last_name", &self.last_name)
            .field("email", &self.email)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}
