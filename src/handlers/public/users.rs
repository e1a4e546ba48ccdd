// handlers/public/users.rs - POST /users, POST /users/login, GET /users/:id/avatar

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};

use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::{LoginInput, RegisterInput, Session};
use crate::state::AppState;

/// POST /users - Register and open a first session
///
/// Expected Input:
/// ```json
/// { "name": "Ada", "email": "ada@example.com", "password": "analytical1", "age": 36 }
/// ```
///
/// Expected Output (201):
/// ```json
/// { "success": true, "data": { "user": { "id": "...", "name": "Ada", ... }, "token": "eyJ..." } }
/// ```
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterInput>, JsonRejection>,
) -> ApiResult<Session> {
    let Json(input) = payload?;
    let user = state.users.register(input).await?;
    let token = state.users.issue_session(&user).await?;

    Ok(ApiResponse::created(Session {
        user: user.view(),
        token,
    }))
}

/// POST /users/login - Exchange credentials for a new session token
///
/// Wrong email and wrong password both answer 400 "Unable to Login".
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginInput>, JsonRejection>,
) -> ApiResult<Session> {
    let Json(input) = payload?;
    let user = state.users.authenticate(&input.email, &input.password).await?;
    let token = state.users.issue_session(&user).await?;

    Ok(ApiResponse::success(Session {
        user: user.view(),
        token,
    }))
}

/// GET /users/:id/avatar - Raw PNG bytes
pub async fn avatar_get(State(state): State<AppState>, Path(id): Path<String>) -> Result<Response, ApiError> {
    let png = state.users.avatar(&id).await?;
    Ok(([(header::CONTENT_TYPE, "image/png")], png).into_response())
}
