use tracing::{info, instrument, warn};

use crate::auth::dto::{Credentials, Registration, TokenResponse};
use crate::error::{AppError, AppResult};
use crate::state::AppState;
use crate::users::repo_types::{NewUser, User};

/// Hash the password and persist a validated registration.
#[instrument(skip(state, reg), fields(username = %reg.username))]
pub async fn register(state: &AppState, reg: Registration) -> AppResult<User> {
    let password_hash = state.passwords.hash_async(reg.password).await?;
    let user = state
        .users
        .create(NewUser {
            first_name: reg.first_name,
            last_name: reg.last_name,
            email: reg.email,
            username: reg.username,
            password_hash,
        })
        .await
        .map_err(|e| {
            if let AppError::Conflict(field) = &e {
                warn!(%field, "registration conflict");
            }
            e
        })?;
    info!(user_id = %user.id, "user registered");
    Ok(user)
}

/// Verify credentials, stamp the login time and issue an access token.
/// Unknown users and wrong passwords fail identically.
#[instrument(skip(state, creds), fields(login = %creds.login))]
pub async fn login(state: &AppState, creds: Credentials) -> AppResult<TokenResponse> {
    let Some(mut user) = state.users.find_by_username_or_email(&creds.login).await? else {
        state.passwords.verify_dummy_async(creds.password).await?;
        warn!("login for unknown user");
        return Err(AppError::invalid_credentials());
    };

    let ok = state
        .passwords
        .verify_async(creds.password, user.password_hash.clone())
        .await?;
    if !ok {
        warn!(user_id = %user.id, "login invalid password");
        return Err(AppError::invalid_credentials());
    }

    state.users.record_login(user.id).await?;
    user.last_login = Some(time::OffsetDateTime::now_utc());

    let access_token = state.tokens.issue(user.id)?;
    info!(user_id = %user.id, "user logged in");
    Ok(TokenResponse::bearer(access_token, user.into()))
}
