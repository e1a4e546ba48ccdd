use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use uuid::Uuid;

use super::avatar::AvatarProcessor;
use super::error::ServiceError;
use super::validation::{self, Validator};
use crate::auth::CredentialStore;
use crate::database::models::{Task, User, UserView};
use crate::database::{Store, StoreError};
use crate::filter::TaskQuery;

const PROFILE_FIELDS: &[&str] = &["name", "email", "password", "age"];

/// Registration body. Fields are optional so missing ones are reported
/// alongside invalid ones.
#[derive(Debug, Default, Deserialize)]
pub struct RegisterInput {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub age: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LoginInput {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// Returned by register and login.
#[derive(Debug, Serialize)]
pub struct Session {
    pub user: UserView,
    pub token: String,
}

/// Identity lifecycle: registration, login, sessions, profile, avatar and
/// removal.
#[derive(Clone)]
pub struct UserService {
    store: Arc<dyn Store>,
    credentials: Arc<CredentialStore>,
    avatars: Arc<dyn AvatarProcessor>,
}

impl UserService {
    pub fn new(store: Arc<dyn Store>, credentials: Arc<CredentialStore>, avatars: Arc<dyn AvatarProcessor>) -> Self {
        Self {
            store,
            credentials,
            avatars,
        }
    }

    pub fn avatar_limit(&self) -> usize {
        self.avatars.max_upload_bytes()
    }

    pub async fn register(&self, input: RegisterInput) -> Result<User, ServiceError> {
        let mut v = Validator::new();
        let name = v.check("name", validation::required(input.name).and_then(|n| validation::name(&n)));
        let email = v.check("email", validation::required(input.email).and_then(|e| validation::email(&e)));
        let password = v.check(
            "password",
            validation::required(input.password).and_then(|p| validation::password(&p)),
        );
        let age = match input.age {
            None | Some(Value::Null) => Some(0),
            Some(raw) => v.check("age", validation::age(&raw)),
        };

        // A taken email is listed with the other bad fields; on its own it is
        // a conflict.
        let taken = match &email {
            Some(email) => self.store.find_user_by_email(email).await?.is_some(),
            None => false,
        };
        if taken && !v.is_clean() {
            v.check::<()>("email", Err("An account with this email already exists".to_string()));
        }
        v.finish()?;
        if taken {
            return Err(StoreError::Duplicate("email").into());
        }

        let (Some(name), Some(email), Some(password), Some(age)) = (name, email, password, age) else {
            return Err(ServiceError::internal("validator passed with missing fields"));
        };

        let password_hash = self.hash_password(password).await?;
        let user = User::new(name, email, password_hash, age);
        self.store.insert_user(&user).await?;

        tracing::info!("Registered user {}", user.id);
        Ok(user)
    }

    /// Unknown emails and wrong passwords fail with the same error after the
    /// same Argon2 work.
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<User, ServiceError> {
        let email = email.trim().to_lowercase();
        let user = self.store.find_user_by_email(&email).await?;

        let credentials = self.credentials.clone();
        let hash = user.as_ref().map(|u| u.password_hash.clone());
        let attempt = password.trim().to_string();
        let verified = tokio::task::spawn_blocking(move || match hash {
            Some(hash) => credentials.verify(&attempt, &hash),
            None => credentials.verify_absent(&attempt),
        })
        .await?;

        match user {
            Some(user) if verified => Ok(user),
            Some(user) => {
                tracing::warn!("Login rejected for user {}: bad password", user.id);
                Err(ServiceError::Auth)
            }
            None => {
                tracing::warn!("Login rejected: unknown email");
                Err(ServiceError::Auth)
            }
        }
    }

    /// Appends a fresh token and drops the ones that can no longer pass the
    /// gate.
    pub async fn issue_session(&self, user: &User) -> Result<String, ServiceError> {
        let token = self.credentials.issue_token(user.id)?;
        let stale: Vec<String> = user
            .tokens
            .iter()
            .filter(|t| self.credentials.is_stale(t))
            .cloned()
            .collect();

        self.store.push_session(user.id, &token, &stale).await?;
        if !stale.is_empty() {
            tracing::debug!("Pruned {} stale sessions for user {}", stale.len(), user.id);
        }
        tracing::debug!("Issued session for user {}", user.id);
        Ok(token)
    }

    pub async fn revoke_session(&self, user: &User, token: &str) -> Result<(), ServiceError> {
        self.store.pull_session(user.id, token).await?;
        tracing::debug!("Revoked one session for user {}", user.id);
        Ok(())
    }

    pub async fn revoke_all_sessions(&self, user: &User) -> Result<(), ServiceError> {
        self.store.clear_sessions(user.id).await?;
        tracing::info!("Revoked all sessions for user {}", user.id);
        Ok(())
    }

    /// Applies `updates` to a copy of `user` and persists it once.
    ///
    /// Unknown keys reject the whole call before any field is looked at.
    pub async fn update_profile(&self, user: &User, updates: Map<String, Value>) -> Result<User, ServiceError> {
        validation::check_allowed_keys(&updates, PROFILE_FIELDS)?;

        let mut updated = user.clone();
        let mut new_password = None;
        let mut v = Validator::new();

        for (key, value) in updates.iter() {
            match key.as_str() {
                "name" => {
                    if let Some(name) = v.check("name", validation::as_string(value).and_then(|n| validation::name(&n))) {
                        updated.name = name;
                    }
                }
                "email" => {
                    if let Some(email) = v.check("email", validation::as_string(value).and_then(|e| validation::email(&e))) {
                        updated.email = email;
                    }
                }
                "password" => {
                    new_password = v.check(
                        "password",
                        validation::as_string(value).and_then(|p| validation::password(&p)),
                    );
                }
                "age" => {
                    if let Some(age) = v.check("age", validation::age(value)) {
                        updated.age = age;
                    }
                }
                _ => return Err(ServiceError::invalid_updates()),
            }
        }
        v.finish()?;

        if let Some(password) = new_password {
            updated.password_hash = self.hash_password(password).await?;
        }
        updated.updated_at = Utc::now();

        self.store.update_profile(&updated).await?;
        Ok(updated)
    }

    /// Deletes the identity together with every task it owns.
    pub async fn remove(&self, user: &User) -> Result<UserView, ServiceError> {
        let removed = self.store.delete_user_cascade(user.id).await?;
        tracing::info!("Removed user {} and {} owned tasks", user.id, removed);
        Ok(user.view())
    }

    pub async fn set_avatar(&self, user: &User, file_name: &str, bytes: Vec<u8>) -> Result<(), ServiceError> {
        let avatars = self.avatars.clone();
        let file_name = file_name.to_string();
        let png = tokio::task::spawn_blocking(move || avatars.process(&file_name, &bytes)).await??;

        self.store.set_avatar(user.id, Some(png)).await?;
        tracing::info!("Stored avatar for user {}", user.id);
        Ok(())
    }

    pub async fn clear_avatar(&self, user: &User) -> Result<(), ServiceError> {
        self.store.set_avatar(user.id, None).await?;
        Ok(())
    }

    /// Public avatar lookup. Unknown ids and users without an avatar are
    /// both `NotFound`.
    pub async fn avatar(&self, id: &str) -> Result<Vec<u8>, ServiceError> {
        let id = Uuid::parse_str(id).map_err(|_| ServiceError::NotFound)?;
        let user = self.store.find_user(id).await?.ok_or(ServiceError::NotFound)?;
        user.avatar.ok_or(ServiceError::NotFound)
    }

    pub async fn find_owned_records(&self, identity_id: Uuid) -> Result<Vec<Task>, ServiceError> {
        Ok(self.store.find_tasks(identity_id, &TaskQuery::default()).await?)
    }

    async fn hash_password(&self, password: String) -> Result<String, ServiceError> {
        let credentials = self.credentials.clone();
        Ok(tokio::task::spawn_blocking(move || credentials.hash(&password)).await??)
    }
}
