use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts},
};
use tracing::warn;
use uuid::Uuid;

use super::jwt::JwtKeys;
use crate::error::AppError;
use crate::state::AppState;
use crate::users::repo_types::User;

/// Extracts and validates the bearer token, yielding the user ID it names.
pub struct AuthUser(pub Uuid);

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    JwtKeys: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts).ok_or_else(|| {
            warn!("missing or malformed Authorization header");
            AppError::invalid_token()
        })?;

        let keys = JwtKeys::from_ref(state);
        match keys.validate(token) {
            Ok(user_id) => Ok(AuthUser(user_id)),
            Err(reason) => {
                warn!(%reason, "token rejected");
                Err(AppError::invalid_token())
            }
        }
    }
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    let value = parts.headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

/// The authenticated user, loaded from the store. A valid token for a user
/// that no longer exists is rejected like a bad token.
pub struct CurrentUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let AuthUser(user_id) = AuthUser::from_request_parts(parts, state).await?;
        match state.users.find_by_id(user_id).await? {
            Some(user) => Ok(CurrentUser(user)),
            None => {
                warn!(%user_id, "token subject no longer exists");
                Err(AppError::invalid_token())
            }
        }
    }
}

/// [`CurrentUser`] restricted to active accounts.
pub struct ActiveUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for ActiveUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let CurrentUser(user) = CurrentUser::from_request_parts(parts, state).await?;
        if !user.is_active {
            warn!(user_id = %user.id, "inactive user");
            return Err(AppError::InactiveUser);
        }
        Ok(ActiveUser(user))
    }
}
