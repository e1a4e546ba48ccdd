// handlers/protected/users.rs - /users/me, sessions and avatar upload

use axum::{
    extract::{rejection::JsonRejection, Multipart, State},
    Extension, Json,
};
use serde_json::{Map, Value};

use crate::database::models::UserView;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::ServiceError;
use crate::state::AppState;

/// POST /users/logout - Revoke the session that made this request
pub async fn logout(State(state): State<AppState>, Extension(auth): Extension<AuthUser>) -> ApiResult<()> {
    state.users.revoke_session(&auth.user, &auth.token).await?;
    Ok(ApiResponse::no_content())
}

/// POST /users/logoutAll - Revoke every session of the caller
pub async fn logout_all(State(state): State<AppState>, Extension(auth): Extension<AuthUser>) -> ApiResult<()> {
    state.users.revoke_all_sessions(&auth.user).await?;
    Ok(ApiResponse::no_content())
}

/// GET /users/me
pub async fn me(Extension(auth): Extension<AuthUser>) -> ApiResult<UserView> {
    Ok(ApiResponse::success(auth.user.view()))
}

/// PATCH /users/me - Partial profile update
///
/// Allowed keys: `name`, `email`, `password`, `age`. Any other key rejects
/// the whole request with "Invalid Updates!".
pub async fn me_patch(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    payload: Result<Json<Map<String, Value>>, JsonRejection>,
) -> ApiResult<UserView> {
    let Json(updates) = payload?;
    let updated = state.users.update_profile(&auth.user, updates).await?;
    Ok(ApiResponse::success(updated.view()))
}

/// DELETE /users/me - Remove the caller and every task they own
pub async fn me_delete(State(state): State<AppState>, Extension(auth): Extension<AuthUser>) -> ApiResult<UserView> {
    let removed = state.users.remove(&auth.user).await?;
    Ok(ApiResponse::success(removed))
}

/// POST /users/me/avatar - multipart/form-data with an `avatar` file field
pub async fn avatar_post(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    mut multipart: Multipart,
) -> ApiResult<()> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("avatar") {
            continue;
        }
        let file_name = field.file_name().unwrap_or_default().to_string();
        let bytes = field.bytes().await?;

        state.users.set_avatar(&auth.user, &file_name, bytes.to_vec()).await?;
        return Ok(ApiResponse::no_content());
    }

    Err(ServiceError::field("avatar", "Please upload an image").into())
}

/// DELETE /users/me/avatar
pub async fn avatar_delete(State(state): State<AppState>, Extension(auth): Extension<AuthUser>) -> ApiResult<()> {
    state.users.clear_avatar(&auth.user).await?;
    Ok(ApiResponse::no_content())
}
