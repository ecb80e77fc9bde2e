use std::fmt;

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::AppResult;
use crate::users::dto::UserResponse;
use crate::validation::{
    check_password, check_username, clean, field_errors, finish, normalize_email,
};

/// Request body for user registration. Every field is optional at the serde
/// level so that a missing field is reported alongside the other failures.
#[derive(Default, Deserialize, Validate)]
#[serde(default)]
pub struct RegisterRequest {
    #[validate(
        required(message = "First name is required"),
        length(min = 1, max = 50, message = "First name must be at most 50 characters")
    )]
    pub first_name: Option<String>,
    #[validate(
        required(message = "Last name is required"),
        length(min = 1, max = 50, message = "Last name must be at most 50 characters")
    )]
    pub last_name: Option<String>,
    #[validate(
        required(message = "Email is required"),
        email(message = "Invalid email address"),
        length(max = 120, message = "Email must be at most 120 characters")
    )]
    pub email: Option<String>,
    #[validate(
        required(message = "Username is required"),
        length(min = 3, max = 50, message = "Username must be between 3 and 50 characters")
    )]
    pub username: Option<String>,
    #[validate(
        required(message = "Password is required"),
        length(min = 6, max = 128, message = "Password must be between 6 and 128 characters")
    )]
    pub password: Option<String>,
}

/// A registration that passed validation. Email is normalized.
pub struct Registration {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub username: String,
    pub password: String,
}

impl RegisterRequest {
    pub fn validated(self) -> AppResult<Registration> {
        let req = RegisterRequest {
            first_name: clean(self.first_name),
            last_name: clean(self.last_name),
            email: clean(self.email).map(|e| normalize_email(&e)),
            username: clean(self.username),
            password: self.password.filter(|p| !p.is_empty()),
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

        finish(errors, || Registration {
            first_name: req.first_name.unwrap_or_default(),
            last_name: req.last_name.unwrap_or_default(),
            email: req.email.unwrap_or_default(),
            username: req.username.unwrap_or_default(),
            password: req.password.unwrap_or_default(),
        })
    }
}

/// Request body for login; `username` accepts a username or an email.
#[derive(Default, Deserialize, Validate)]
#[serde(default)]
pub struct LoginRequest {
    #[validate(
        required(message = "Username or email is required"),
        length(min = 3, max = 120, message = "Username must be between 3 and 120 characters")
    )]
    pub username: Option<String>,
    #[validate(
        required(message = "Password is required"),
        length(min = 1, max = 128, message = "Password must be at most 128 characters")
    )]
    pub password: Option<String>,
}

pub struct Credentials {
    pub login: String,
    pub password: String,
}

impl LoginRequest {
    pub fn validated(self) -> AppResult<Credentials> {
        let req = LoginRequest {
            username: clean(self.username),
            password: self.password.filter(|p| !p.is_empty()),
        };
        let errors = match Validate::validate(&req) {
            Ok(()) => Vec::new(),
            Err(e) => field_errors(&e),
        };
        finish(errors, || Credentials {
            login: req.username.unwrap_or_default(),
            password: req.password.unwrap_or_default(),
        })
    }
}

/// Response returned after a successful login.
#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: &'static str,
    pub user: UserResponse,
}

impl TokenResponse {
    pub fn bearer(access_token: String, user: UserResponse) -> Self {
        Self {
            access_token,
            token_type: "bearer",
            user,
        }
    }
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("first_name", &self.first_name)
            .field("last_name", &self.last_name)
            .field("email", &self.email)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("login", &self.login)
            .field("password", &"<redacted>")
            .finish()
    }
}
