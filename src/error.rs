use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

use crate::validation::FieldError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("validation failed: {}", summarize(.0))]
    Validation(Vec<FieldError>),

    #[error("{0} already exists")]
    Conflict(String),

    #[error("{0}")]
    Authentication(String),

    #[error("user {0} not found")]
    NotFound(Uuid),

    #[error("inactive user")]
    InactiveUser,

    #[error("database error: {0}")]
    Store(#[from] sqlx::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type AppResult<T> = Result<T, AppError>;

pub const INVALID_CREDENTIALS: &str = "Invalid credentials";
pub const INVALID_TOKEN: &str = "Could not validate credentials";

impl AppError {
    pub fn invalid_credentials() -> Self {
        Self::Authentication(INVALID_CREDENTIALS.into())
    }

    pub fn invalid_token() -> Self {
        Self::Authentication(INVALID_TOKEN.into())
    }

    pub fn internal(e: impl std::fmt::Display) -> Self {
        Self::Internal(e.to_string())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Authentication(_) => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::InactiveUser => StatusCode::BAD_REQUEST,
            AppError::Store(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "validation_error",
            AppError::Conflict(_) => "conflict",
            AppError::Authentication(_) => "unauthorized",
            AppError::NotFound(_) => "not_found",
            AppError::InactiveUser => "inactive_user",
            AppError::Store(_) | AppError::Internal(_) => "internal_error",
        }
    }
}

fn summarize(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| format!("{}: {}", e.field, e.message))
        .collect::<Vec<_>>()
        .join("; ")
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            AppError::Validation(errors) => json!({
                "error": self.code(),
                "message": "Request validation failed",
                "details": errors,
            }),
            AppError::Conflict(field) => json!({
                "error": self.code(),
                "message": format!("A user with this {field} already exists"),
                "field": field,
            }),
            AppError::Authentication(msg) => json!({ "error": self.code(), "message": msg }),
            AppError::NotFound(id) => json!({
                "error": self.code(),
                "message": format!("User {id} not found"),
            }),
            AppError::InactiveUser => json!({ "error": self.code(), "message": "Inactive user" }),
            AppError::Store(e) => {
                tracing::error!(error = %e, "database error");
                json!({ "error": self.code(), "message": "An internal error occurred" })
            }
            AppError::Internal(msg) => {
                tracing::error!(error = %msg, "internal error");
                json!({ "error": self.code(), "message": "An internal error occurred" })
            }
        };

        let mut response = (status, Json(body)).into_response();
        if status == StatusCode::UNAUTHORIZED {
            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }
        response
    }
}
