use axum::{
    extract::{DefaultBodyLimit, State},
    http::StatusCode,
    middleware,
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use serde_json::{json, Value};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::handlers::{protected, public};
use crate::middleware::jwt_auth_middleware;
use crate::state::AppState;

/// Room for multipart boundaries and headers on top of the file itself, so an
/// oversized file still reaches the avatar processor and is reported as such.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

pub fn app(state: AppState) -> Router {
    let mut router = Router::new()
        // Public
        .route("/", get(root))
        .route("/health", get(health))
        .merge(public_routes())
        // Protected
        .merge(protected_routes(state.clone()))
        .layer(TraceLayer::new_for_http());

    if state.config.security.enable_cors {
        router = router.layer(CorsLayer::permissive());
    }

    router.with_state(state)
}

fn public_routes() -> Router<AppState> {
    use public::users;

    Router::new()
        .route("/users", post(users::register))
        .route("/users/login", post(users::login))
        .route("/users/:id/avatar", get(users::avatar_get))
}

fn protected_routes(state: AppState) -> Router<AppState> {
    use protected::{tasks, users};

    let avatar_limit = state.users.avatar_limit() + MULTIPART_OVERHEAD;

    Router::new()
        .route("/users/logout", post(users::logout))
        .route("/users/logoutAll", post(users::logout_all))
        .route("/users/me", get(users::me).patch(users::me_patch).delete(users::me_delete))
        .route(
            "/users/me/avatar",
            post(users::avatar_post)
                .delete(users::avatar_delete)
                .layer(DefaultBodyLimit::max(avatar_limit)),
        )
        .route("/tasks", post(tasks::create).get(tasks::list))
        .route("/tasks/:id", get(tasks::get).patch(tasks::patch).delete(tasks::delete))
        .route_layer(middleware::from_fn_with_state(state, jwt_auth_middleware))
}

async fn root() -> Json<Value> {
    Json(json!({
        "success": true,
        "data": {
            "name": "Task Manager API",
            "version": env!("CARGO_PKG_VERSION"),
            "endpoints": {
                "users": "/users, /users/login (public); /users/me, /users/logout, /users/logoutAll, /users/me/avatar (protected)",
                "avatars": "/users/:id/avatar (public)",
                "tasks": "/tasks[/:id] (protected)",
                "health": "/health (public)"
            }
        }
    }))
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let now = chrono::Utc::now();

    match state.store.health_check().await {
        Ok(_) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "storage": "ok"
                }
            })),
        ),
        Err(e) => {
            tracing::error!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "success": false,
                    "error": "storage unavailable",
                    "data": {
                        "status": "degraded",
                        "timestamp": now
                    }
                })),
            )
        }
    }
}
