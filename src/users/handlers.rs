use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use tracing::instrument;

use crate::{
    auth::extractors::ActiveUser,
    error::AppResult,
    state::AppState,
    users::{
        dto::{UpdateUserRequest, UserResponse},
        services,
    },
    validation::JsonBody,
};

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/me", get(get_me).patch(update_me).delete(delete_me))
}

#[instrument(skip_all)]
pub async fn get_me(ActiveUser(user): ActiveUser) -> Json<UserResponse> {
    Json(user.into())
}

#[instrument(skip_all)]
pub async fn update_me(
    State(state): State<AppState>,
    ActiveUser(user): ActiveUser,
    JsonBody(payload): JsonBody<UpdateUserRequest>,
) -> AppResult<Json<UserResponse>> {
    let changes = payload.validated()?;
    let updated = services::update_profile(&state, user.id, changes).await?;
    Ok(Json(updated.into()))
}

#[instrument(skip_all)]
pub async fn delete_me(
    State(state): State<AppState>,
    ActiveUser(user): ActiveUser,
) -> AppResult<StatusCode> {
    services::delete_account(&state, user.id).await?;
    Ok(StatusCode::NO_CONTENT)
}
