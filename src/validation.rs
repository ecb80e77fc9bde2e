//! Shared pieces of request validation.
//!
//! Payload structs derive [`validator::Validate`] for the declarative rules
//! (required, length, email). Checks the derive cannot express are written
//! here and appended to the same list, so a caller always receives every
//! failing field at once.

use axum::{
    async_trait,
    extract::{FromRequest, Request},
    Json,
};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{de::DeserializeOwned, Serialize};
use tracing::warn;
use validator::ValidationErrors;

use crate::error::AppError;

pub const PASSWORD_MIN_LEN: usize = 6;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// `Json<T>` whose rejections (bad syntax, wrong field types, missing
/// content type) come back as a validation error on `body` instead of
/// axum's plain-text 4xx.
pub struct JsonBody<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(JsonBody(value)),
            Err(rejection) => {
                warn!(status = %rejection.status(), "request body rejected");
                let message = rejection.body_text();
                Err(AppError::Validation(vec![FieldError::new("body", message)]))
            }
        }
    }
}

/// Flattens the derive's error map into field errors.
pub fn field_errors(errors: &ValidationErrors) -> Vec<FieldError> {
    let mut out = Vec::new();
    for (field, errs) in errors.field_errors() {
        for err in errs.iter() {
            let message = err
                .message
                .as_ref()
                .map(|m| m.to_string())
                .unwrap_or_else(|| format!("failed `{}` check", err.code));
            out.push(FieldError::new(field.to_string(), message));
        }
    }
    out
}

/// Turns the collected errors into the final outcome: `Ok(value)` only when
/// nothing failed.
pub fn finish<T>(mut errors: Vec<FieldError>, value: impl FnOnce() -> T) -> Result<T, AppError> {
    if errors.is_empty() {
        return Ok(value());
    }
    errors.sort_by(|a, b| a.field.cmp(&b.field).then_with(|| a.message.cmp(&b.message)));
    errors.dedup();
    Err(AppError::Validation(errors))
}

/// Complexity rules on top of the length bounds declared on the payload.
pub fn check_password(password: &str, errors: &mut Vec<FieldError>) {
    if password.chars().count() < PASSWORD_MIN_LEN {
        // the length rule already reports this
        return;
    }
    if !password.chars().any(|c| c.is_uppercase()) {
        errors.push(FieldError::new(
            "password",
            "Password must contain at least one uppercase letter",
        ));
    }
    if !password.chars().any(|c| c.is_lowercase()) {
        errors.push(FieldError::new(
            "password",
            "Password must contain at least one lowercase letter",
        ));
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        errors.push(FieldError::new("password", "Password must contain at least one digit"));
    }
}

pub fn check_username(username: &str, errors: &mut Vec<FieldError>) {
    lazy_static! {
        static ref USERNAME_RE: Regex = Regex::new(r"^[A-Za-z0-9_.\-]*$").unwrap();
    }
    if !USERNAME_RE.is_match(username) {
        errors.push(FieldError::new(
            "username",
            "Username may only contain letters, digits, '_', '-' and '.'",
        ));
    }
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Trims surrounding whitespace and drops values that end up empty, so that
/// `"   "` is treated like a missing field.
pub fn clean(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::header::CONTENT_TYPE};
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Payload {
        #[allow(dead_code)]
        username: Option<String>,
    }

    fn json_request(body: &str, content_type: Option<&str>) -> Request {
        let mut req = axum::http::Request::builder().method("POST").uri("/");
        if let Some(ct) = content_type {
            req = req.header(CONTENT_TYPE, ct);
        }
        req.body(Body::from(body.to_string())).unwrap()
    }

    async fn body_error(req: Request) -> Vec<FieldError> {
        match JsonBody::<Payload>::from_request(req, &()).await {
            Err(AppError::Validation(list)) => list,
            Err(other) => panic!("unexpected {other:?}"),
            Ok(_) => panic!("body should be rejected"),
        }
    }

    #[tokio::test]
    async fn json_body_accepts_valid_payload() {
        let req = json_request(r#"{"username":"alice"}"#, Some("application/json"));
        assert!(JsonBody::<Payload>::from_request(req, &()).await.is_ok());
    }

    #[tokio::test]
    async fn wrong_field_type_is_a_body_error() {
        let list = body_error(json_request(r#"{"username":42}"#, Some("application/json"))).await;
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].field, "body");
        assert!(list[0].message.contains("username"), "{}", list[0].message);
    }

    #[tokio::test]
    async fn malformed_json_and_missing_content_type_are_body_errors() {
        let list = body_error(json_request("{not json", Some("application/json"))).await;
        assert_eq!(list[0].field, "body");
        let list = body_error(json_request(r#"{"username":"alice"}"#, None)).await;
        assert_eq!(list[0].field, "body");
    }

    #[test]
    fn password_complexity_reports_each_missing_class() {
        let mut errors = Vec::new();
        check_password("alllowercase", &mut errors);
        assert_eq!(errors.len(), 2);
        assert!(errors.iter().any(|e| e.message.contains("uppercase")));
        assert!(errors.iter().any(|e| e.message.contains("digit")));
    }

    #[test]
    fn password_complexity_accepts_mixed() {
        let mut errors = Vec::new();
        check_password("Secret123", &mut errors);
        assert!(errors.is_empty());
    }

    #[test]
    fn short_password_skips_complexity() {
        let mut errors = Vec::new();
        check_password("ab", &mut errors);
        assert!(errors.is_empty());
    }

    #[test]
    fn username_charset() {
        let mut errors = Vec::new();
        check_username("john_doe-1.x", &mut errors);
        assert!(errors.is_empty());
        check_username("john doe", &mut errors);
        check_username("jöhn", &mut errors);
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn finish_sorts_and_fails() {
        let errs = vec![
            FieldError::new("username", "b"),
            FieldError::new("email", "a"),
        ];
        match finish(errs, || ()) {
            Err(AppError::Validation(list)) => {
                assert_eq!(list[0].field, "email");
                assert_eq!(list[1].field, "username");
            }
            other => panic!("unexpected: {other:?}"),
        }
        assert!(finish(Vec::new(), || 5).is_ok());
    }

    #[test]
    fn clean_drops_blank() {
        assert_eq!(clean(Some("  ".into())), None);
        assert_eq!(clean(Some(" bob ".into())), Some("bob".into()));
        assert_eq!(clean(None), None);
    }
}
