use tracing::{info, instrument};
use uuid::Uuid;

use crate::error::AppResult;
use crate::state::AppState;
use crate::users::dto::ProfileChanges;
use crate::users::repo_types::{User, UserChanges};

/// Apply a validated profile update, re-hashing the password if it changed.
#[instrument(skip(state, changes))]
pub async fn update_profile(
    state: &AppState,
    id: Uuid,
    changes: ProfileChanges,
) -> AppResult<User> {
    let password_hash = match changes.password {
        Some(plain) => Some(state.passwords.hash_async(plain).await?),
        None => None,
    };
    let rehashed = password_hash.is_some();
    let user = state
        .users
        .update(
            id,
            UserChanges {
                first_name: changes.first_name,
                last_name: changes.last_name,
                email: changes.email,
                username: changes.username,
                password_hash,
            },
        )
        .await?;
    info!(user_id = %user.id, password_changed = rehashed, "user updated");
    Ok(user)
}

#[instrument(skip(state))]
pub async fn delete_account(state: &AppState, id: Uuid) -> AppResult<()> {
    state.users.delete(id).await?;
    info!(user_id = %id, "user deleted");
    Ok(())
}
