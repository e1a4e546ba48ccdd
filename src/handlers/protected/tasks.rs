// handlers/protected/tasks.rs - /tasks and /tasks/:id

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    Extension, Json,
};
use serde_json::{Map, Value};

use crate::database::models::Task;
use crate::filter::ListParams;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::state::AppState;

/// POST /tasks
///
/// Expected Input:
/// ```json
/// { "description": "Buy milk", "completed": false }
/// ```
/// The owner is always the caller; an `owner` key in the body is ignored.
pub async fn create(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    payload: Result<Json<Map<String, Value>>, JsonRejection>,
) -> ApiResult<Task> {
    let Json(body) = payload?;
    let task = state.tasks.create(&auth.user, &body).await?;
    Ok(ApiResponse::created(task))
}

/// GET /tasks?completed=true&sortBy=createdAt:desc&limit=10&skip=20
pub async fn list(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Query(params): Query<ListParams>,
) -> ApiResult<Vec<Task>> {
    let query = state.tasks.parse_query(&params)?;
    let tasks = state.tasks.list(&auth.user, &query).await?;
    Ok(ApiResponse::success(tasks))
}

/// GET /tasks/:id
pub async fn get(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<String>,
) -> ApiResult<Task> {
    Ok(ApiResponse::success(state.tasks.get(&auth.user, &id).await?))
}

/// PATCH /tasks/:id - Allowed keys: `description`, `completed`
pub async fn patch(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<String>,
    payload: Result<Json<Map<String, Value>>, JsonRejection>,
) -> ApiResult<Task> {
    let Json(updates) = payload?;
    Ok(ApiResponse::success(state.tasks.update(&auth.user, &id, updates).await?))
}

/// DELETE /tasks/:id - Returns the deleted task
pub async fn delete(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<String>,
) -> ApiResult<Task> {
    Ok(ApiResponse::success(state.tasks.delete(&auth.user, &id).await?))
}
