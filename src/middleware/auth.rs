use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

use crate::auth::CredentialStore;
use crate::database::models::User;
use crate::database::Store;
use crate::error::ApiError;
use crate::services::ServiceError;
use crate::state::AppState;

/// Why the gate turned a request away.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateRejection {
    MissingToken,
    InvalidToken,
    UnknownIdentity,
    RevokedSession,
}

impl GateRejection {
    pub fn reason(&self) -> &'static str {
        match self {
            GateRejection::MissingToken => "missing token",
            GateRejection::InvalidToken => "invalid token",
            GateRejection::UnknownIdentity => "unknown identity",
            GateRejection::RevokedSession => "revoked or unrecognized session",
        }
    }
}

/// Authenticated request context: the live identity and the exact session
/// token it presented.
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub user: User,
    pub token: String,
}

/// Resolves bearer tokens to a live identity holding that session.
#[derive(Clone)]
pub struct AuthGate {
    store: Arc<dyn Store>,
    credentials: Arc<CredentialStore>,
}

impl AuthGate {
    pub fn new(store: Arc<dyn Store>, credentials: Arc<CredentialStore>) -> Self {
        Self { store, credentials }
    }

    pub async fn authenticate(&self, token: Option<&str>) -> Result<AuthUser, ServiceError> {
        let token = token
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(ServiceError::Unauthorized(GateRejection::MissingToken))?;

        let user_id = self.credentials.validate_token(token).map_err(|e| {
            tracing::debug!("Gate rejected token: {}", e);
            ServiceError::Unauthorized(GateRejection::InvalidToken)
        })?;

        let user = self
            .store
            .find_user(user_id)
            .await?
            .ok_or(ServiceError::Unauthorized(GateRejection::UnknownIdentity))?;

        if !user.has_session(token) {
            tracing::debug!("Gate rejected revoked session for user {}", user.id);
            return Err(ServiceError::Unauthorized(GateRejection::RevokedSession));
        }

        Ok(AuthUser {
            user,
            token: token.to_string(),
        })
    }
}

/// Runs the gate and injects [`AuthUser`] into the request extensions.
pub async fn jwt_auth_middleware(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_bearer(&headers);
    let auth_user = state.gate.authenticate(token).await?;
    request.extensions_mut().insert(auth_user);
    Ok(next.run(request).await)
}

/// `None` when the header is absent, unreadable or not a Bearer token.
fn extract_bearer(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(axum::http::header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}
